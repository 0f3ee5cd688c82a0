//! 日志初始化

use crate::errors::{ConfigError, ConfigResult, InfrastructureError};
use serde::Deserialize;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    pub level: String,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            show_thread_ids: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            show_target: true,
            show_thread_ids: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            show_target: false,
            show_thread_ids: false,
            json_format: true,
        }
    }

    /// 解析日志级别
    pub fn max_level(&self) -> ConfigResult<tracing::Level> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| ConfigError::validation(format!("未知的日志级别: {}", self.level)))
    }
}

/// 初始化全局日志订阅者
///
/// 已经存在全局订阅者时返回 `BootstrapFailed`，调用方可以忽略该错误。
pub fn init_logging(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let level = config.max_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids);

    if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    tracing::info!("日志系统初始化完成");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(
            LoggingConfig::development().max_level().unwrap(),
            tracing::Level::DEBUG
        );
        let invalid = LoggingConfig {
            level: "verbose".to_string(),
            ..LoggingConfig::default()
        };
        assert!(invalid.max_level().is_err());
    }

    #[test]
    fn test_init_twice_reports_error() {
        let _ = init_logging(&LoggingConfig::development());
        assert!(init_logging(&LoggingConfig::production()).is_err());
    }
}
