//! SSE 帧写入
//!
//! 负责设置流式响应头、写出 `data: ...` 数据帧以及写出终止帧。
//! `end_stream` 是唯一关闭下游流的途径。

use crate::streaming::connection::SseConnection;
use crate::streaming::error::StreamError;
use axum::http::{header, HeaderName, HeaderValue};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

// ==================== 预编译的常量帧 ====================

/// 数据帧前缀
pub const SSE_PREFIX: &[u8] = b"data: ";
/// 数据帧结束符
pub const SSE_SUFFIX: &[u8] = b"\n\n";
/// 终止帧
pub const SSE_DONE: &[u8] = b"data: [DONE]\n\n";

/// 禁用 nginx 缓冲的响应头
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// 设置流式响应头
///
/// 必须在第一次 `write_frame` 之前调用。
pub fn set_streaming_headers(connection: &SseConnection) {
    connection.insert_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    connection.insert_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    connection.insert_header(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    connection.insert_header(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
}

/// 将已序列化的负载编码为一个完整的数据帧
pub fn encode_frame(json: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(SSE_PREFIX.len() + json.len() + SSE_SUFFIX.len());
    frame.put_slice(SSE_PREFIX);
    frame.put_slice(json);
    frame.put_slice(SSE_SUFFIX);
    frame.freeze()
}

/// 序列化负载并写出数据帧
///
/// 整个帧作为一次写入送达下游，不会与心跳帧交错。
pub async fn write_frame<T>(connection: &SseConnection, payload: &T) -> Result<(), StreamError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(payload)?;
    connection.write_bytes(encode_frame(&json)).await
}

/// 写出已序列化的 JSON 数据帧
///
/// 用于直接透传上游的 OpenAI 格式 chunk。
pub async fn write_raw_frame(connection: &SseConnection, json: &str) -> Result<(), StreamError> {
    connection
        .write_bytes(encode_frame(json.as_bytes()))
        .await
}

/// 结束流式响应
///
/// 幂等：流已结束时什么也不做；否则写出 `data: [DONE]` 并关闭连接。
pub async fn end_stream(connection: &SseConnection) {
    if connection.is_ended() {
        return;
    }
    if connection.close_with(Bytes::from_static(SSE_DONE)).await {
        debug!("流式响应已结束");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(br#"{"a":1}"#);
        assert_eq!(&frame[..], b"data: {\"a\":1}\n\n");
    }

    #[tokio::test]
    async fn test_set_streaming_headers() {
        let (conn, _body) = SseConnection::new();
        set_streaming_headers(&conn);

        let headers = conn.headers();
        assert_eq!(headers.get("content-type").unwrap(), "text/event-stream");
        assert_eq!(headers.get("cache-control").unwrap(), "no-cache");
        assert_eq!(headers.get("connection").unwrap(), "keep-alive");
        assert_eq!(headers.get("x-accel-buffering").unwrap(), "no");
    }

    #[tokio::test]
    async fn test_headers_frame_done_sequence() {
        let (conn, mut body) = SseConnection::new();
        set_streaming_headers(&conn);
        write_frame(&conn, &json!({"a": 1})).await.unwrap();
        end_stream(&conn).await;

        let frames: Vec<Bytes> = (&mut body).map(|frame| frame.unwrap()).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"data: {\"a\":1}\n\n");
        assert_eq!(&frames[1][..], SSE_DONE);
    }

    #[tokio::test]
    async fn test_end_stream_idempotent() {
        let (conn, mut body) = SseConnection::new();
        end_stream(&conn).await;
        end_stream(&conn).await;

        assert_eq!(&body.next().await.unwrap().unwrap()[..], SSE_DONE);
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_write_frame_after_end_rejected() {
        let (conn, _body) = SseConnection::new();
        end_stream(&conn).await;

        let result = write_frame(&conn, &json!({"late": true})).await;
        assert_eq!(result, Err(StreamError::ClientDisconnected));
    }

    #[tokio::test]
    async fn test_write_raw_frame() {
        let (conn, mut body) = SseConnection::new();
        write_raw_frame(&conn, r#"{"id":"x"}"#).await.unwrap();

        assert_eq!(
            &body.next().await.unwrap().unwrap()[..],
            b"data: {\"id\":\"x\"}\n\n"
        );
    }

    #[tokio::test]
    async fn test_end_stream_after_client_left() {
        let (conn, body) = SseConnection::new();
        drop(body);

        end_stream(&conn).await;
        assert!(conn.is_ended());
    }
}
