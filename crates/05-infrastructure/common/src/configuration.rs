//! 组件管理器配置
//!
//! 通过 `config` crate 从可选配置文件和环境变量加载

use crate::errors::{ConfigError, ConfigResult};
use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error};

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "PLUGINS";

/// 组件管理器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeanManagerConfig {
    /// 加载组件后是否立即校验全部注入点
    pub enable_validation: bool,
    /// 单条解析链允许的最大深度
    pub max_resolution_depth: usize,
    /// 额外注册的缓存型作用域名称
    pub scopes: Vec<String>,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl Default for BeanManagerConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            max_resolution_depth: 100,
            scopes: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BeanManagerConfig {
    /// 从配置文件（可选）和环境变量加载配置
    ///
    /// 环境变量使用 `{prefix}__` 前缀和 `__` 分隔嵌套键，例如
    /// `PLUGINS__MAX_RESOLUTION_DEPTH=32`。
    pub fn load(file: Option<&Path>, env_prefix: &str) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("加载组件管理器配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scopes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                error!("配置构建失败: {}", e);
                ConfigError::ParseError {
                    source: Box::new(e),
                }
            })?;

        let loaded: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// 校验配置取值
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::validation("max_resolution_depth 必须大于 0"));
        }

        let mut seen = HashSet::new();
        for scope in &self.scopes {
            if scope.trim().is_empty() {
                return Err(ConfigError::validation("作用域名称不能为空"));
            }
            if !seen.insert(scope.as_str()) {
                return Err(ConfigError::validation(format!("作用域重复声明: {scope}")));
            }
        }

        self.logging.max_level()?;
        Ok(())
    }

    /// 设置是否启用校验
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// 添加缓存型作用域
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BeanManagerConfig::default();
        assert!(config.enable_validation);
        assert_eq!(config.max_resolution_depth, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "enable_validation = false\nmax_resolution_depth = 16\nscopes = [\"ConfigurationScoped\"]\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = BeanManagerConfig::load(Some(file.path()), "PLUGINS_TEST_FILE").unwrap();
        assert!(!config.enable_validation);
        assert_eq!(config.max_resolution_depth, 16);
        assert_eq!(config.scopes, vec!["ConfigurationScoped".to_string()]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = BeanManagerConfig::load(
            Some(Path::new("/nonexistent/plugins.toml")),
            "PLUGINS_TEST_MISSING",
        );
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_depth = BeanManagerConfig::default().with_max_resolution_depth(0);
        assert!(zero_depth.validate().is_err());

        let duplicate = BeanManagerConfig::default()
            .with_scope("ConfigurationScoped")
            .with_scope("ConfigurationScoped");
        assert!(duplicate.validate().is_err());

        let blank = BeanManagerConfig::default().with_scope("  ");
        assert!(blank.validate().is_err());
    }
}
