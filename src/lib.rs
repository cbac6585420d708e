//! chat-relay: OpenAI 兼容网关的流式投递与限流重试核心
//!
//! 翻译层（请求/响应字段映射、路由、认证）调用本库完成：
//! - SSE 流式响应头、数据帧和终止帧的写出
//! - 心跳保活
//! - chunk 对象复用
//! - 上游 429 限流重试
//! - 响应元数据生成

pub mod config;
pub mod memory;
pub mod streaming;
pub mod telemetry;
pub mod upstream;

pub use config::Config;
pub use memory::{CapacitySource, MemoryManager, MemoryPressure, PoolSizes, ReclaimablePool};
pub use streaming::{
    end_stream, new_metadata, set_streaming_headers, start_heartbeat, with_rate_limit_retry,
    write_frame, ChatCompletionChunk, ChunkPool, HeartbeatHandle, ResponseMeta, SseBody,
    SseConnection, StreamError,
};
pub use upstream::UpstreamError;
