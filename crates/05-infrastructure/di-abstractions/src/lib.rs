//! # Dependency Injection Abstractions
//!
//! 组件管理器消费的元数据模型。元数据由外部的内省适配层生成，
//! 依赖注入核心只读取这些描述，从不自行扫描或加载类。
//!
//! ## 核心类型
//!
//! - [`TypeDescriptor`] - 结构化类型描述与匹配规则
//! - [`Qualifiers`] - 限定符集合
//! - [`ScopeType`] - 作用域类型
//! - [`MetaClass`] / [`MetaField`] / [`MetaMethod`] / [`MetaConstructor`] / [`MetaParameter`] - 元数据元素
//! - [`Variable`] - 元素的解析视图
//! - [`InjectionPoint`] - 注入点
//! - [`ElementManager`] - 元数据适配接口
//! - [`Provider`] - 延迟获取实例的提供者

pub mod element_manager;
pub mod injection_point;
pub mod model;
pub mod provider;
pub mod qualifiers;
pub mod scope;
pub mod types;
pub mod variable;

pub use element_manager::*;
pub use injection_point::*;
pub use model::*;
pub use provider::*;
pub use qualifiers::*;
pub use scope::*;
pub use types::*;
pub use variable::*;
