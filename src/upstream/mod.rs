//! 上游 Provider 调用辅助类型

mod error;

pub use error::UpstreamError;
