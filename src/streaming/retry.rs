//! 429 限流重试
//!
//! `with_rate_limit_retry` 包装一次上游调用：调用因限流（HTTP 429）失败且
//! 尚有重试次数时立即重新调用，其他任何失败原样返回，不包装、不吞掉。
//!
//! 两次尝试之间不等待，需要退避的调用方在 `operation` 内部自行处理。

use crate::config::RetrySettings;
use crate::streaming::error::StreamError;
use std::future::Future;
use tracing::warn;

/// 限流状态码
pub const RATE_LIMIT_STATUS: u16 = 429;

// ============================================================================
// 失败形态
// ============================================================================

/// 失败对象上某个状态字段的取值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusField {
    /// 字段不存在，或为空值（`null`、`false`、`0`、空字符串）
    #[default]
    Absent,
    /// 字段有值但不是合法的状态码
    Unparseable,
    /// 状态码
    Code(u16),
}

impl From<Option<u16>> for StatusField {
    fn from(value: Option<u16>) -> Self {
        match value {
            Some(0) | None => StatusField::Absent,
            Some(code) => StatusField::Code(code),
        }
    }
}

/// 上游失败的状态码探测
///
/// 上游失败可能把状态码放在不同位置：直接的状态字段、备用状态码字段，
/// 或嵌套的响应状态。未提供的位置返回 `StatusField::Absent`。
pub trait UpstreamFailure {
    /// 直接的状态字段
    fn status(&self) -> StatusField {
        StatusField::Absent
    }

    /// 备用状态码字段
    fn status_code(&self) -> StatusField {
        StatusField::Absent
    }

    /// 嵌套响应中的状态
    fn response_status(&self) -> StatusField {
        StatusField::Absent
    }
}

/// 提取上游失败的状态码
///
/// 依次检查 `status`、`status_code`、`response_status`，由第一个有值的字段决定结果：
/// 该字段无法解析时返回 `None`，不再查看后面的字段。
pub fn failure_status<E>(err: &E) -> Option<u16>
where
    E: UpstreamFailure + ?Sized,
{
    let fields = [err.status(), err.status_code(), err.response_status()];
    match fields.into_iter().find(|field| {
        !matches!(field, StatusField::Absent | StatusField::Code(0))
    })? {
        StatusField::Code(code) => Some(code),
        _ => None,
    }
}

/// 是否为限流失败
pub fn is_rate_limited<E>(err: &E) -> bool
where
    E: UpstreamFailure + ?Sized,
{
    failure_status(err) == Some(RATE_LIMIT_STATUS)
}

impl UpstreamFailure for StreamError {
    fn status(&self) -> StatusField {
        match self {
            StreamError::ProviderError { status, .. } => Some(*status).into(),
            _ => StatusField::Absent,
        }
    }
}

impl UpstreamFailure for reqwest::Error {
    fn response_status(&self) -> StatusField {
        reqwest::Error::status(self)
            .map(|status| status.as_u16())
            .into()
    }
}

/// JSON 形态的失败：`status`、`statusCode`、`response.status`
impl UpstreamFailure for serde_json::Value {
    fn status(&self) -> StatusField {
        json_status(self.get("status"))
    }

    fn status_code(&self) -> StatusField {
        json_status(self.get("statusCode"))
    }

    fn response_status(&self) -> StatusField {
        json_status(self.pointer("/response/status"))
    }
}

/// 整数值的数字或数字字符串；`429.0` 与 `"429"` 都是 429
fn json_status(value: Option<&serde_json::Value>) -> StatusField {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => StatusField::Absent,
        Some(Value::Bool(true)) => StatusField::Code(1),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f == 0.0 => StatusField::Absent,
            Some(f) => float_status(f),
            None => StatusField::Unparseable,
        },
        Some(Value::String(s)) if s.is_empty() => StatusField::Absent,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            // 非空字符串即使解析为 0 也算有值
            Ok(f) if f == 0.0 => StatusField::Unparseable,
            Ok(f) => float_status(f),
            Err(_) => StatusField::Unparseable,
        },
        Some(_) => StatusField::Unparseable,
    }
}

fn float_status(value: f64) -> StatusField {
    if value.is_finite() && value.fract() == 0.0 && (1.0..=f64::from(u16::MAX)).contains(&value) {
        StatusField::Code(value as u16)
    } else {
        StatusField::Unparseable
    }
}

impl<E> UpstreamFailure for Box<E>
where
    E: UpstreamFailure + ?Sized,
{
    fn status(&self) -> StatusField {
        (**self).status()
    }

    fn status_code(&self) -> StatusField {
        (**self).status_code()
    }

    fn response_status(&self) -> StatusField {
        (**self).response_status()
    }
}

// ============================================================================
// 重试次数
// ============================================================================

/// 规范化后的最大重试次数
///
/// 非有限值、非正值和 `None` 都视为 0 次重试；小数向下取整。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetryBudget(u32);

impl RetryBudget {
    /// 创建重试次数
    pub fn new(retries: u32) -> Self {
        Self(retries)
    }

    /// 最大重试次数
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for RetryBudget {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<usize> for RetryBudget {
    fn from(value: usize) -> Self {
        Self(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl From<i32> for RetryBudget {
    fn from(value: i32) -> Self {
        Self::from(i64::from(value))
    }
}

impl From<i64> for RetryBudget {
    fn from(value: i64) -> Self {
        if value <= 0 {
            Self(0)
        } else {
            Self(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl From<f64> for RetryBudget {
    fn from(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            Self(0)
        } else {
            // 浮点到整数的 as 转换是饱和的
            Self(value.floor() as u32)
        }
    }
}

impl<T> From<Option<T>> for RetryBudget
where
    T: Into<RetryBudget>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

// ============================================================================
// 执行器
// ============================================================================

/// 带 429 重试的执行器
///
/// `operation` 接收从 0 开始的尝试序号。限流失败最多重试 `max_retries` 次，
/// 即最多调用 `max_retries + 1` 次；其他失败只调用一次。
/// 每次重试前输出一条 warn 日志，`log_prefix` 作为消息前缀。
pub async fn with_rate_limit_retry<T, E, F, Fut>(
    mut operation: F,
    max_retries: impl Into<RetryBudget>,
    log_prefix: &str,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: UpstreamFailure,
{
    let retries = max_retries.into().get();
    let mut attempt: u32 = 0;

    // 首次执行 + 最多 retries 次重试
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if is_rate_limited(&err) && attempt < retries {
                    let next_attempt = attempt + 1;
                    warn!(
                        attempt = next_attempt,
                        max_retries = retries,
                        "{}收到 429，正在进行第 {} 次重试（共 {} 次）",
                        log_prefix,
                        next_attempt,
                        retries
                    );
                    attempt = next_attempt;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

/// 使用配置中的重试次数执行
pub async fn with_configured_retry<T, E, F, Fut>(
    operation: F,
    settings: &RetrySettings,
    log_prefix: &str,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: UpstreamFailure,
{
    with_rate_limit_retry(operation, settings.max_retries, log_prefix).await
}
