//! 下游 SSE 连接句柄
//!
//! `SseConnection` 是写往下游客户端的有序字节通道，`SseBody` 是与之配对的
//! 响应体，交给 axum 作为 `Body::from_stream` 的数据源。
//!
//! 连接有两种结束通知：
//! - closed: 下游离开（响应体被丢弃，或写入时发现接收端已关闭）
//! - finished: `end_stream` 已写出终止帧并关闭发送端
//!
//! 所有写入都经过同一把异步锁，每次写入是通道中的一个完整元素，
//! 因此心跳帧与数据帧之间不会出现半帧交错；发送端被取走之后不会再有任何写入。

use crate::streaming::error::StreamError;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// 默认通道缓冲区大小（帧数）
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// 下游 SSE 连接
#[derive(Debug)]
pub struct SseConnection {
    /// 发送端；`None` 表示流已结束
    sender: Mutex<Option<mpsc::Sender<Bytes>>>,
    /// 响应头（旁路通道，在转换为响应时取出）
    headers: parking_lot::Mutex<HeaderMap>,
    /// 是否已写出终止帧
    ended: AtomicBool,
    /// 下游离开通知
    closed: CancellationToken,
    /// 流结束通知
    finished: CancellationToken,
}

impl SseConnection {
    /// 创建新的连接和配对的响应体
    pub fn new() -> (Arc<Self>, SseBody) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 使用指定通道容量创建连接
    ///
    /// 容量为 0 时按 1 处理。
    pub fn with_capacity(capacity: usize) -> (Arc<Self>, SseBody) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let closed = CancellationToken::new();

        let connection = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
            headers: parking_lot::Mutex::new(HeaderMap::new()),
            ended: AtomicBool::new(false),
            closed: closed.clone(),
            finished: CancellationToken::new(),
        });

        let body = SseBody {
            receiver: rx,
            _guard: closed.drop_guard(),
        };

        (connection, body)
    }

    /// 是否已写出终止帧
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// 下游是否已离开
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// 连接是否仍可写
    pub fn is_open(&self) -> bool {
        !self.is_ended() && !self.is_closed()
    }

    /// 等待下游离开
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// 等待流结束
    pub async fn finished(&self) {
        self.finished.cancelled().await
    }

    /// 设置响应头
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.headers.lock().insert(name, value);
    }

    /// 获取当前响应头的副本
    pub fn headers(&self) -> HeaderMap {
        self.headers.lock().clone()
    }

    /// 将响应体包装为 axum 响应
    ///
    /// 响应头取自 `set_streaming_headers` 等调用写入的旁路通道。
    pub fn into_response(&self, body: SseBody) -> Response {
        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = StatusCode::OK;
        *response.headers_mut() = self.headers();
        response
    }

    /// 写入一个完整的帧
    ///
    /// 流已结束或下游已离开时返回 `ClientDisconnected`。
    pub(crate) async fn write_bytes(&self, bytes: Bytes) -> Result<(), StreamError> {
        let guard = self.sender.lock().await;
        let Some(sender) = guard.as_ref() else {
            return Err(StreamError::ClientDisconnected);
        };
        if self.closed.is_cancelled() {
            return Err(StreamError::ClientDisconnected);
        }

        sender.send(bytes).await.map_err(|_| {
            self.closed.cancel();
            StreamError::ClientDisconnected
        })
    }

    /// 写出终止帧并关闭发送端
    ///
    /// 只有第一次调用生效，返回是否由本次调用完成关闭。
    pub(crate) async fn close_with(&self, terminal: Bytes) -> bool {
        let mut guard = self.sender.lock().await;
        let Some(sender) = guard.take() else {
            return false;
        };
        self.ended.store(true, Ordering::SeqCst);

        if !self.closed.is_cancelled() && sender.send(terminal).await.is_err() {
            self.closed.cancel();
            debug!("写出终止帧时下游已离开");
        }

        drop(sender);
        self.finished.cancel();
        true
    }
}

/// SSE 响应体
///
/// 被丢弃时触发连接的 closed 通知。
#[derive(Debug)]
pub struct SseBody {
    receiver: mpsc::Receiver<Bytes>,
    _guard: DropGuard,
}

impl Stream for SseBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}
