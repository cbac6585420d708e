//! 流式传输错误类型
//!
//! 定义向下游写出 SSE 流时可能发生的错误。
//!
//! 写入已关闭的连接在心跳和 `end_stream` 路径上不视为错误，
//! 只有显式的 `write_frame` 会以 `ClientDisconnected` 通知调用方停止推送。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 流式传输错误类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type", content = "details")]
pub enum StreamError {
    /// 网络错误
    ///
    /// 上游连接失败、连接被重置等。
    #[error("网络错误: {0}")]
    Network(String),

    /// 序列化/解析错误
    ///
    /// 负载无法序列化为 JSON，或上游数据无法解析。
    #[error("解析错误: {0}")]
    ParseError(String),

    /// Provider 错误
    ///
    /// 上游 Provider 返回了非成功状态码。
    #[error("Provider 错误 ({status}): {message}")]
    ProviderError {
        /// HTTP 状态码
        status: u16,
        /// 错误消息
        message: String,
    },

    /// 客户端断开连接
    ///
    /// 连接已结束或下游已离开，写入被拒绝。
    #[error("客户端已断开连接")]
    ClientDisconnected,

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

// ============================================================================
// From trait 实现 - 用于错误转换
// ============================================================================

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            StreamError::provider_error(status.as_u16(), err.to_string())
        } else if err.is_connect() {
            StreamError::Network(format!("连接失败: {}", err))
        } else {
            StreamError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::ParseError(err.to_string())
    }
}

// ============================================================================
// 辅助方法
// ============================================================================

impl StreamError {
    /// 创建 Provider 错误
    pub fn provider_error(status: u16, message: impl Into<String>) -> Self {
        StreamError::ProviderError {
            status,
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        StreamError::Internal(msg.into())
    }

    /// 是否因下游离开而失败
    pub fn is_client_error(&self) -> bool {
        matches!(self, StreamError::ClientDisconnected)
    }

    /// 返回给下游的 HTTP 状态码（如果适用）
    ///
    /// 网络错误映射为 502；重试判断只看上游给出的状态，见 `retry::failure_status`。
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            StreamError::ProviderError { status, .. } => Some(*status),
            StreamError::Network(_) => Some(502), // Bad Gateway
            _ => None,
        }
    }
}
