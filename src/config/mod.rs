//! 配置管理模块
//!
//! 提供 YAML 配置文件支持：心跳间隔、429 重试次数、对象池容量和日志级别。

mod types;
mod yaml;

pub use types::{
    Config, LoggingConfig, MemoryConfig, RetrySettings, ServerConfig, DEFAULT_CHUNK_POOL_SIZE,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_RETRIES,
};
pub use yaml::{load_config, save_config, ConfigError};
