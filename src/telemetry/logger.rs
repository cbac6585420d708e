//! 日志初始化
//!
//! 使用 `tracing-subscriber` 的 fmt 订阅器输出结构化日志。

use crate::config::LoggingConfig;
use tracing::Level;

/// 解析日志级别，无法识别时回退到 info
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// 初始化全局日志订阅器
///
/// 已存在全局订阅器时不做任何事，返回 `false`。
pub fn init_logging(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level(" error "), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        // 本测试二进制中只有这里设置全局订阅器
        assert!(init_logging(&config));
        // 第二次初始化一定失败（全局订阅器只能设置一次）
        assert!(!init_logging(&config));
    }
}
