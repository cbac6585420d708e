//! 流式响应投递核心模块
//!
//! 将上游响应变成写往下游的 SSE 事件流，并在投递开始前透明处理上游限流。
//!
//! # 主要组件
//!
//! - `connection`: 下游 SSE 连接句柄与响应体
//! - `writer`: 流式响应头、数据帧和终止帧
//! - `heartbeat`: 心跳保活，防止代理空闲超时断开
//! - `pool`: 可复用的 chunk 对象池
//! - `retry`: 429 限流重试执行器
//! - `metadata`: 响应 id 与创建时间
//! - `error`: 流式错误类型
//!
//! # 典型用法
//!
//! ```ignore
//! let meta = new_metadata();
//! let upstream = with_rate_limit_retry(|attempt| call_upstream(attempt), 3, "[OpenAI] ").await?;
//!
//! let (conn, body) = SseConnection::new();
//! set_streaming_headers(&conn);
//! let heartbeat = start_heartbeat_with_config(conn.clone(), &config.server);
//!
//! tokio::spawn(async move {
//!     while let Some(delta) = upstream.next().await {
//!         let mut chunk = pool.acquire();
//!         chunk.stamp(&meta, &model);
//!         chunk.delta_mut().content = Some(delta);
//!         let written = write_frame(&conn, &chunk).await;
//!         chunk.reset();
//!         pool.release(chunk);
//!         if written.is_err() {
//!             break;
//!         }
//!     }
//!     end_stream(&conn).await;
//! });
//!
//! return conn.into_response(body);
//! ```

pub mod chunk;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod metadata;
pub mod pool;
pub mod retry;
pub mod writer;

// 重新导出核心类型
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, CHUNK_OBJECT};
pub use connection::{SseBody, SseConnection, DEFAULT_CHANNEL_CAPACITY};
pub use error::StreamError;
pub use heartbeat::{start_heartbeat, start_heartbeat_with_config, HeartbeatHandle, SSE_HEARTBEAT};
pub use metadata::{new_metadata, ResponseMeta, RESPONSE_ID_PREFIX};
pub use pool::{ChunkPool, CHUNK_POOL_NAME};
pub use retry::{
    failure_status, is_rate_limited, with_configured_retry, with_rate_limit_retry, RetryBudget,
    StatusField, UpstreamFailure, RATE_LIMIT_STATUS,
};
pub use writer::{
    encode_frame, end_stream, set_streaming_headers, write_frame, write_raw_frame, SSE_DONE,
    SSE_PREFIX, SSE_SUFFIX,
};
