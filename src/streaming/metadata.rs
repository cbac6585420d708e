//! 响应元数据生成
//!
//! id 由固定前缀和当前毫秒时间组成。同一毫秒内的并发请求会得到相同的 id，
//! 下游可能依赖该格式，因此不追加随机后缀。

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 响应 id 前缀
pub const RESPONSE_ID_PREFIX: &str = "chatcmpl-";

/// 响应元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// 响应 id
    pub id: String,
    /// 创建时间（Unix 秒）
    pub created: i64,
}

impl ResponseMeta {
    /// 生成新的响应元数据
    pub fn new() -> Self {
        let now_ms = Utc::now().timestamp_millis();
        Self {
            id: format!("{}{}", RESPONSE_ID_PREFIX, now_ms),
            created: now_ms.div_euclid(1000),
        }
    }
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// 生成新的响应元数据
pub fn new_metadata() -> ResponseMeta {
    ResponseMeta::new()
}
