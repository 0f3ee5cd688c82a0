//! # 依赖注入具体实现
//!
//! 插件组件管理器：从元数据加载组件，预先校验注入点，按作用域创建和缓存实例，
//! 并在关闭时按创建的逆序销毁实例。
//!
//! ## 核心组件
//!
//! - [`DefaultBeanManager`] - 组件注册表与解析流程
//! - [`Bean`] - 注入目标组件、生产者组件和系统组件
//! - [`InitializationContext`] - 一次解析的工作单元
//! - [`ScopeContext`] - 作用域上下文（依赖作用域、缓存作用域）
//! - [`InjectionTarget`] / [`ProducerFactory`] - 实例的构造方式

pub mod bean;
pub mod context;
pub mod injection_target;
pub mod injector;
pub mod manager;
pub mod producer;
pub mod scope;

pub use bean::{Bean, BeanKind, SystemBean, SystemKind};
pub use context::{InitializationContext, ScopedInstance};
pub use injection_target::InjectionTarget;
pub use injector::Injector;
pub use manager::DefaultBeanManager;
pub use producer::{Disposer, ProducerFactory, ProducerMember};
pub use scope::{DependentScopeContext, ScopeContext, SingletonScopeContext};
