//! YAML 配置加载与保存

use super::types::Config;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),
    /// YAML 解析或序列化失败
    #[error("YAML 解析失败: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Config {
    /// 从 YAML 字符串解析配置
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// 序列化为 YAML 字符串
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// 加载配置文件
///
/// 文件不存在时返回默认配置。
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "配置文件不存在，使用默认配置");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    Config::from_yaml_str(&content)
}

/// 保存配置文件
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_yaml_string()?)?;
    Ok(())
}
