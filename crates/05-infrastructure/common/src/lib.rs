//! # Infrastructure Common
//!
//! 插件组件管理器的公共基础设施：错误类型、容器配置和日志初始化。
//!
//! ## 核心内容
//!
//! - [`InjectionError`] - 依赖注入错误分类
//! - [`BeanManagerConfig`] - 组件管理器配置
//! - [`LoggingConfig`] - 日志配置

pub mod configuration;
pub mod errors;
pub mod logging;

pub use configuration::*;
pub use errors::*;
pub use logging::*;
