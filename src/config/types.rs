//! 配置类型定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认心跳间隔（毫秒）
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 15_000;

/// 默认 429 最大重试次数
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// 默认 chunk 对象池容量
pub const DEFAULT_CHUNK_POOL_SIZE: usize = 200;

/// 主配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 重试配置
    #[serde(default)]
    pub retry: RetrySettings,
    /// 内存配置
    #[serde(default)]
    pub memory: MemoryConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 服务配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 心跳间隔（毫秒），缺省或为 0 时使用默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_ms: Option<u64>,
}

impl ServerConfig {
    /// 设置心跳间隔
    pub fn with_heartbeat_interval_ms(mut self, interval_ms: Option<u64>) -> Self {
        self.heartbeat_interval_ms = interval_ms;
        self
    }

    /// 生效的心跳间隔
    pub fn heartbeat_interval(&self) -> Duration {
        let ms = match self.heartbeat_interval_ms {
            Some(ms) if ms > 0 => ms,
            _ => DEFAULT_HEARTBEAT_INTERVAL_MS,
        };
        Duration::from_millis(ms)
    }
}

/// 429 重试配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// 最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// 内存配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// 无内存压力时 chunk 对象池的容量
    #[serde(default = "default_chunk_pool_size")]
    pub chunk_pool_size: usize,
}

fn default_chunk_pool_size() -> usize {
    DEFAULT_CHUNK_POOL_SIZE
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            chunk_pool_size: default_chunk_pool_size(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别：trace / debug / info / warn / error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
