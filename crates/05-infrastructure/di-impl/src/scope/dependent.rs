//! 依赖作用域

use std::sync::Arc;

use di_abstractions::{Instance, ScopeType};
use infrastructure_common::InjectionResult;

use super::ScopeContext;
use crate::bean::Bean;
use crate::context::InitializationContext;

/// 依赖作用域上下文，每次都创建新实例，需要时交给父上下文跟踪
#[derive(Debug)]
pub struct DependentScopeContext {
    scope_type: ScopeType,
}

impl DependentScopeContext {
    pub fn new() -> Self {
        Self {
            scope_type: ScopeType::DEPENDENT,
        }
    }
}

impl Default for DependentScopeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeContext for DependentScopeContext {
    fn scope_type(&self) -> &ScopeType {
        &self.scope_type
    }

    fn get_or_create(
        &self,
        bean: &Arc<Bean>,
        context: InitializationContext,
    ) -> InjectionResult<Instance> {
        let instance = bean.create(&context)?;
        if context.is_tracking_dependencies(bean) {
            context.add_dependent_instance(Arc::clone(&instance));
        }
        Ok(instance)
    }

    fn get_if_exists(&self, _bean: &Bean) -> Option<Instance> {
        None
    }

    fn destroy(&self, _bean: &Bean) {}

    fn close(&self) {}
}
