//! SSE 心跳保活
//!
//! 代理和负载均衡器（如 Cloudflare、nginx）会在连接空闲超时后断开连接。
//! 心跳任务按固定间隔写出 `: heartbeat` 注释帧，下游 SSE 解析器会忽略它。
//!
//! 心跳任务在以下任一情况发生时结束：
//! - 写入失败（下游已离开）
//! - 连接的 closed / finished 通知
//! - 调用 `HeartbeatHandle::cancel`

use crate::config::ServerConfig;
use crate::streaming::connection::SseConnection;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 心跳帧
pub const SSE_HEARTBEAT: &[u8] = b": heartbeat\n\n";

/// 最小心跳间隔
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

/// 心跳任务句柄
///
/// 丢弃句柄不会停止心跳，心跳随连接结束而结束。
#[derive(Debug)]
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// 停止心跳
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 心跳任务是否已结束
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待心跳任务结束
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// 按配置的间隔启动心跳
pub fn start_heartbeat_with_config(
    connection: Arc<SseConnection>,
    config: &ServerConfig,
) -> HeartbeatHandle {
    start_heartbeat(connection, config.heartbeat_interval())
}

/// 启动心跳任务
///
/// 每次调用分配一个新任务，同一连接重复启动不做检查。
/// 第一次心跳在一个间隔之后写出。
pub fn start_heartbeat(connection: Arc<SseConnection>, interval: Duration) -> HeartbeatHandle {
    let interval = interval.max(MIN_HEARTBEAT_INTERVAL);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut beats: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = connection.closed() => break,
                _ = connection.finished() => break,
                _ = ticker.tick() => {
                    if !connection.is_open() {
                        break;
                    }
                    // 写入失败说明下游已离开，属于正常结束
                    if connection
                        .write_bytes(Bytes::from_static(SSE_HEARTBEAT))
                        .await
                        .is_err()
                    {
                        break;
                    }
                    beats += 1;
                }
            }
        }

        debug!(beats, interval_ms = interval.as_millis() as u64, "心跳已停止");
    });

    HeartbeatHandle { cancel, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::writer::{end_stream, write_frame, SSE_DONE};
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_written_after_interval() {
        let (conn, mut body) = SseConnection::new();
        let handle = start_heartbeat(conn.clone(), Duration::from_millis(100));

        let start = Instant::now();
        let frame = body.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], SSE_HEARTBEAT);
        assert!(start.elapsed() >= Duration::from_millis(100));

        let frame = body.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], SSE_HEARTBEAT);

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_on_end_stream() {
        let (conn, mut body) = SseConnection::new();
        let handle = start_heartbeat(conn.clone(), Duration::from_millis(50));

        assert_eq!(&body.next().await.unwrap().unwrap()[..], SSE_HEARTBEAT);
        end_stream(&conn).await;
        handle.join().await;

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(&body.next().await.unwrap().unwrap()[..], SSE_DONE);
        assert!(body.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_when_client_leaves() {
        let (conn, body) = SseConnection::new();
        let handle = start_heartbeat(conn.clone(), Duration::from_millis(50));

        drop(body);
        handle.join().await;
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_interleaves_with_frames() {
        let (conn, mut body) = SseConnection::new();
        let handle = start_heartbeat(conn.clone(), Duration::from_millis(100));

        write_frame(&conn, &json!({"n": 1})).await.unwrap();
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"data: {\"n\":1}\n\n");
        assert_eq!(&body.next().await.unwrap().unwrap()[..], SSE_HEARTBEAT);

        end_stream(&conn).await;
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_uses_configured_interval() {
        let (conn, mut body) = SseConnection::new();
        let config = ServerConfig::default().with_heartbeat_interval_ms(Some(250));
        let handle = start_heartbeat_with_config(conn.clone(), &config);

        let start = Instant::now();
        body.next().await.unwrap().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));

        handle.cancel();
        handle.join().await;
        assert!(conn.is_open());
    }
}
