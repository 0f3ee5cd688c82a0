//! `Provider<T>` 注入值

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use infrastructure_common::InjectionResult;

use crate::model::{downcast_instance, Instance};
use crate::types::TypeDescriptor;

type Supplier = Arc<dyn Fn() -> InjectionResult<Instance> + Send + Sync>;

/// 延迟获取组件实例的提供者，每次调用 [`Provider::get`] 都会重新解析
#[derive(Clone)]
pub struct Provider {
    target: TypeDescriptor,
    supplier: Supplier,
}

impl Provider {
    pub fn new<F>(target: TypeDescriptor, supplier: F) -> Self
    where
        F: Fn() -> InjectionResult<Instance> + Send + Sync + 'static,
    {
        Self {
            target,
            supplier: Arc::new(supplier),
        }
    }

    /// 提供的类型
    pub fn target(&self) -> &TypeDescriptor {
        &self.target
    }

    /// 获取实例
    pub fn get(&self) -> InjectionResult<Instance> {
        (self.supplier)()
    }

    /// 获取指定类型的实例
    pub fn get_as<T: Any + Send + Sync>(&self) -> InjectionResult<Arc<T>> {
        downcast_instance(&self.get()?)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("target", &self.target)
            .field("supplier", &"<function>")
            .finish()
    }
}
