//! 上游调用错误类型
//!
//! 翻译层调用上游 Provider 时可直接使用的错误类型。它实现了
//! `UpstreamFailure`，可以交给 `with_rate_limit_retry` 判断是否限流。

use crate::streaming::retry::{StatusField, UpstreamFailure, RATE_LIMIT_STATUS};
use thiserror::Error;

/// 错误消息中保留的响应体长度
const BODY_PREVIEW_LEN: usize = 200;

/// 上游调用错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// 上游返回了非成功状态码
    #[error("上游返回错误 HTTP {status} - {body}")]
    Http {
        /// HTTP 状态码
        status: u16,
        /// 截断后的响应体
        body: String,
    },

    /// 网络错误
    #[error("网络连接失败: {0}")]
    Network(String),

    /// 响应解析失败
    #[error("数据解析失败: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// 从 HTTP 状态码创建错误
    pub fn from_http_status(status: u16, body: &str) -> Self {
        UpstreamError::Http {
            status,
            body: truncate_message(body, BODY_PREVIEW_LEN),
        }
    }

    /// 从 reqwest 错误创建
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            UpstreamError::from_http_status(status.as_u16(), &err.to_string())
        } else if err.is_timeout() {
            UpstreamError::Network("请求超时".to_string())
        } else if err.is_connect() {
            UpstreamError::Network("无法连接到服务器".to_string())
        } else if err.is_decode() {
            UpstreamError::Parse("响应解码失败".to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }

    /// HTTP 状态码（如果有）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 是否为限流错误
    pub fn is_rate_limited(&self) -> bool {
        self.http_status() == Some(RATE_LIMIT_STATUS)
    }
}

impl UpstreamFailure for UpstreamError {
    fn status(&self) -> StatusField {
        self.http_status().into()
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::from_reqwest_error(&err)
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Parse(err.to_string())
    }
}

/// 按字符截断消息
fn truncate_message(msg: &str, max_chars: usize) -> String {
    match msg.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &msg[..idx]),
        None => msg.to_string(),
    }
}
