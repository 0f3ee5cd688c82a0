//! 注入目标：构造器注入、字段和方法注入、生命周期回调

use std::sync::Arc;

use di_abstractions::{
    Arguments, InjectionElement, InjectionPoint, Instance, MetaClass, MetaConstructor, MetaMethod,
};
use infrastructure_common::InjectionResult;
use tracing::debug;

use crate::context::InitializationContext;
use crate::injector::Injector;

/// 注入目标
#[derive(Debug)]
pub struct InjectionTarget {
    class: Arc<MetaClass>,
    constructor: Arc<MetaConstructor>,
    post_construct: Vec<Arc<MetaMethod>>,
    pre_destroy: Vec<Arc<MetaMethod>>,
    injector: Injector,
}

impl InjectionTarget {
    pub fn new(class: Arc<MetaClass>, constructor: Arc<MetaConstructor>, injector: Injector) -> Self {
        Self {
            post_construct: class.post_construct_methods(),
            pre_destroy: class.pre_destroy_methods(),
            class,
            constructor,
            injector,
        }
    }

    pub fn class(&self) -> &Arc<MetaClass> {
        &self.class
    }

    pub fn constructor(&self) -> &Arc<MetaConstructor> {
        &self.constructor
    }

    pub(crate) fn injector(&self) -> &Injector {
        &self.injector
    }

    /// 有销毁回调的实例需要被跟踪
    pub fn has_pre_destroy(&self) -> bool {
        !self.pre_destroy.is_empty()
    }

    /// 用构造器参数注入点调用构造器
    pub fn produce(
        &self,
        points: &[InjectionPoint],
        context: &InitializationContext,
    ) -> InjectionResult<Instance> {
        let constructor_points: Vec<InjectionPoint> = points
            .iter()
            .filter(|p| p.is_constructor_parameter())
            .cloned()
            .collect();
        self.injector
            .construct(&self.constructor, &constructor_points, context)
    }

    /// 字段注入，然后方法注入（每个方法只调用一次），最后调用无参的 `@Inject` 方法
    pub fn inject(
        &self,
        instance: &Instance,
        points: &[InjectionPoint],
        context: &InitializationContext,
    ) -> InjectionResult<()> {
        for point in points {
            if let InjectionElement::Field(field) = &point.element {
                self.injector.set_field(instance, field, point, context)?;
            }
        }

        let mut injected: Vec<&Arc<MetaMethod>> = Vec::new();
        for method in points.iter().filter_map(InjectionPoint::method) {
            if injected.iter().any(|m| Arc::ptr_eq(m, method)) {
                continue;
            }
            injected.push(method);
            let method_points: Vec<InjectionPoint> = points
                .iter()
                .filter(|p| p.method().is_some_and(|m| Arc::ptr_eq(m, method)))
                .cloned()
                .collect();
            self.injector
                .invoke(Some(instance), method, &method_points, context)?;
        }

        for method in self
            .class
            .methods
            .iter()
            .filter(|m| m.element.annotations.injectable && m.parameters.is_empty())
        {
            self.injector.invoke(Some(instance), method, &[], context)?;
        }
        Ok(())
    }

    pub fn post_construct(&self, instance: &Instance) -> InjectionResult<()> {
        Self::invoke_callbacks(&self.post_construct, instance)
    }

    pub fn pre_destroy(&self, instance: &Instance) -> InjectionResult<()> {
        Self::invoke_callbacks(&self.pre_destroy, instance)
    }

    fn invoke_callbacks(methods: &[Arc<MetaMethod>], instance: &Instance) -> InjectionResult<()> {
        for method in methods {
            debug!("调用生命周期方法 {}", method);
            method.invoke(Some(instance), Arguments::default())?;
        }
        Ok(())
    }
}
