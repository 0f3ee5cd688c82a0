//! 注入器：为构造器、字段和方法解析参数并调用

use std::sync::{Arc, Weak};

use di_abstractions::{
    Arguments, InjectionPoint, Instance, MetaConstructor, MetaField, MetaMethod, MetaParameter,
};
use infrastructure_common::{InjectionError, InjectionResult};

use crate::context::InitializationContext;
use crate::manager::DefaultBeanManager;

/// 注入器，持有组件管理器的弱引用
#[derive(Debug, Clone)]
pub struct Injector {
    manager: Weak<DefaultBeanManager>,
}

impl Injector {
    pub(crate) fn new(manager: Weak<DefaultBeanManager>) -> Self {
        Self { manager }
    }

    pub(crate) fn manager(&self) -> InjectionResult<Arc<DefaultBeanManager>> {
        self.manager.upgrade().ok_or(InjectionError::ManagerClosed)
    }

    /// 按参数顺序解析调用参数，`disposed` 绑定到 `@Disposes` 参数
    fn arguments(
        &self,
        parameters: &[Arc<MetaParameter>],
        points: &[InjectionPoint],
        disposed: Option<&Instance>,
        context: &InitializationContext,
    ) -> InjectionResult<Arguments> {
        if parameters.is_empty() {
            return Ok(Arguments::default());
        }
        let manager = self.manager()?;
        let mut values = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            if parameter.element.annotations.disposer_target {
                let instance = disposed.ok_or_else(|| {
                    InjectionError::definition(format!(
                        "@Disposes 参数 {} 只能在销毁时绑定",
                        parameter.name()
                    ))
                })?;
                values.push(Arc::clone(instance));
                continue;
            }
            let point = points
                .iter()
                .find(|p| p.parameter().is_some_and(|p| Arc::ptr_eq(p, parameter)))
                .ok_or_else(|| {
                    InjectionError::definition(format!("参数 {} 没有对应的注入点", parameter.name()))
                })?;
            values.push(manager.get_injectable_value(point, context)?);
        }
        Ok(Arguments::new(values))
    }

    /// 调用构造器
    pub fn construct(
        &self,
        constructor: &MetaConstructor,
        points: &[InjectionPoint],
        context: &InitializationContext,
    ) -> InjectionResult<Instance> {
        let arguments = self.arguments(&constructor.parameters, points, None, context)?;
        constructor.invoke(arguments)
    }

    /// 注入字段
    pub fn set_field(
        &self,
        instance: &Instance,
        field: &MetaField,
        point: &InjectionPoint,
        context: &InitializationContext,
    ) -> InjectionResult<()> {
        let value = self.manager()?.get_injectable_value(point, context)?;
        let receiver = (!field.is_static).then_some(instance);
        field.set(receiver, value)
    }

    /// 调用方法
    pub fn invoke(
        &self,
        receiver: Option<&Instance>,
        method: &MetaMethod,
        points: &[InjectionPoint],
        context: &InitializationContext,
    ) -> InjectionResult<Option<Instance>> {
        let arguments = self.arguments(&method.parameters, points, None, context)?;
        method.invoke(receiver.filter(|_| !method.is_static), arguments)
    }

    /// 调用销毁方法，被销毁的实例绑定到 `@Disposes` 参数
    pub fn dispose(
        &self,
        receiver: Option<&Instance>,
        method: &MetaMethod,
        points: &[InjectionPoint],
        disposed: &Instance,
        context: &InitializationContext,
    ) -> InjectionResult<()> {
        let arguments = self.arguments(&method.parameters, points, Some(disposed), context)?;
        method
            .invoke(receiver.filter(|_| !method.is_static), arguments)
            .map(|_| ())
    }
}
