//! 作用域上下文
//!
//! 每种作用域类型对应一个上下文，决定实例的缓存和销毁时机。

mod dependent;
mod singleton;

pub use dependent::DependentScopeContext;
pub use singleton::SingletonScopeContext;

use std::fmt::Debug;
use std::sync::Arc;

use di_abstractions::{Instance, ScopeType};
use infrastructure_common::InjectionResult;

use crate::bean::Bean;
use crate::context::InitializationContext;

/// 作用域上下文接口
pub trait ScopeContext: Send + Sync + Debug {
    /// 管理的作用域类型
    fn scope_type(&self) -> &ScopeType;

    /// 获取已有实例，不存在时用 `context` 创建
    fn get_or_create(
        &self,
        bean: &Arc<Bean>,
        context: InitializationContext,
    ) -> InjectionResult<Instance>;

    /// 获取已有实例
    fn get_if_exists(&self, bean: &Bean) -> Option<Instance>;

    /// 销毁组件在本作用域中的实例
    fn destroy(&self, bean: &Bean);

    /// 销毁全部实例
    fn close(&self);
}
