//! 组件定义
//!
//! 组件可以创建和销毁实例，并公开类型闭包、限定符、作用域和注入点。
//! 三种组件：注入目标组件、生产者组件和容器自动合成的系统组件。

use std::fmt;
use std::sync::{Arc, Weak};

use di_abstractions::{
    instance, BeanId, InjectionPoint, Instance, Provider, Qualifiers, ScopeType, TypeDescriptor,
    Variable,
};
use infrastructure_common::{InjectionError, InjectionResult};

use crate::context::InitializationContext;
use crate::injection_target::InjectionTarget;
use crate::manager::DefaultBeanManager;
use crate::producer::ProducerFactory;

/// 组件种类
#[derive(Debug)]
pub enum BeanKind {
    InjectionTarget(InjectionTarget),
    Producer(ProducerFactory),
    System(SystemBean),
}

/// 组件
#[derive(Debug)]
pub struct Bean {
    id: BeanId,
    variable: Variable,
    declaring_class: Option<TypeDescriptor>,
    injection_points: Vec<InjectionPoint>,
    kind: BeanKind,
}

impl Bean {
    pub(crate) fn new(
        id: BeanId,
        variable: Variable,
        declaring_class: Option<TypeDescriptor>,
        injection_points: Vec<InjectionPoint>,
        kind: BeanKind,
    ) -> Self {
        Self {
            id,
            variable,
            declaring_class,
            injection_points,
            kind,
        }
    }

    pub fn id(&self) -> BeanId {
        self.id
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn name(&self) -> &str {
        self.variable.name()
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        self.variable.types()
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        self.variable.qualifiers()
    }

    pub fn scope(&self) -> &ScopeType {
        self.variable.scope()
    }

    pub fn is_dependent_scoped(&self) -> bool {
        self.variable.is_dependent_scoped()
    }

    /// 声明类，系统组件没有
    pub fn declaring_class(&self) -> Option<&TypeDescriptor> {
        self.declaring_class.as_ref()
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    /// 全部注入点，包括销毁方法的注入点
    pub fn all_injection_points(&self) -> impl Iterator<Item = &InjectionPoint> {
        let disposer_points: &[InjectionPoint] = match &self.kind {
            BeanKind::Producer(factory) => factory
                .disposer()
                .map(|d| d.injection_points())
                .unwrap_or_default(),
            _ => &[],
        };
        self.injection_points.iter().chain(disposer_points)
    }

    pub fn kind(&self) -> &BeanKind {
        &self.kind
    }

    pub fn is_system(&self) -> bool {
        matches!(self.kind, BeanKind::System(_))
    }

    /// 实例是否需要由创建它的上下文跟踪，以便级联销毁
    pub fn is_tracking_dependencies(&self) -> bool {
        match &self.kind {
            BeanKind::InjectionTarget(target) => target.has_pre_destroy(),
            BeanKind::Producer(factory) => factory.has_disposer(),
            BeanKind::System(system) => matches!(system.kind, SystemKind::Provider { .. }),
        }
    }

    /// 创建实例
    pub fn create(&self, context: &InitializationContext) -> InjectionResult<Instance> {
        let _guard = context.begin_construction(self);
        match &self.kind {
            BeanKind::InjectionTarget(target) => self.create_injection_target(target, context),
            BeanKind::Producer(factory) => factory.produce(self, context),
            BeanKind::System(system) => system.create(context),
        }
    }

    fn create_injection_target(
        &self,
        target: &InjectionTarget,
        context: &InitializationContext,
    ) -> InjectionResult<Instance> {
        let instance = target.produce(&self.injection_points, context)?;
        context.add_incomplete_instance(self.id, Arc::clone(&instance));
        let result = target
            .inject(&instance, &self.injection_points, context)
            .and_then(|()| target.post_construct(&instance));
        context.remove_incomplete_instance(self.id);
        result.map(|()| instance)
    }

    /// 销毁实例并关闭创建它的上下文
    pub fn destroy(&self, instance: &Instance, context: &InitializationContext) -> InjectionResult<()> {
        let result = match &self.kind {
            BeanKind::InjectionTarget(target) => target.pre_destroy(instance),
            BeanKind::Producer(factory) => factory.dispose(instance, context),
            BeanKind::System(_) => Ok(()),
        };
        context.close();
        result
    }
}

impl fmt::Display for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            BeanKind::InjectionTarget(_) => "InjectionTargetBean",
            BeanKind::Producer(_) => "ProducerBean",
            BeanKind::System(system) => system.kind.label(),
        };
        write!(f, "{kind}{} [{}]", self.id, self.variable)
    }
}

/// 系统组件种类
#[derive(Debug)]
pub enum SystemKind {
    /// `Provider<T>`，每次 `get` 重新解析目标
    Provider {
        target: TypeDescriptor,
        qualifiers: Qualifiers,
    },
    /// 由 `Provider<T>` 组件提供的 `T`
    Provided { provider_bean: Arc<Bean> },
    /// `Optional<T>`，每次创建时解析目标
    Optional {
        target: TypeDescriptor,
        qualifiers: Qualifiers,
    },
}

impl SystemKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "ProviderBean",
            Self::Provided { .. } => "ProvidedBean",
            Self::Optional { .. } => "OptionalBean",
        }
    }
}

/// 容器合成的组件
#[derive(Debug)]
pub struct SystemBean {
    kind: SystemKind,
    manager: Weak<DefaultBeanManager>,
}

impl SystemBean {
    pub(crate) fn new(kind: SystemKind, manager: Weak<DefaultBeanManager>) -> Self {
        Self { kind, manager }
    }

    pub fn kind(&self) -> &SystemKind {
        &self.kind
    }

    fn manager(&self) -> InjectionResult<Arc<DefaultBeanManager>> {
        self.manager.upgrade().ok_or(InjectionError::ManagerClosed)
    }

    fn create(&self, context: &InitializationContext) -> InjectionResult<Instance> {
        match &self.kind {
            SystemKind::Provider { target, qualifiers } => {
                let manager = self.manager.clone();
                let (ty, q) = (target.clone(), qualifiers.clone());
                // 提供的实例挂在提供者自己的上下文上，随提供者一起销毁
                let context = context.clone();
                Ok(instance(Provider::new(target.clone(), move || {
                    manager
                        .upgrade()
                        .ok_or(InjectionError::ManagerClosed)?
                        .provide(&ty, &q, &context)
                })))
            }
            SystemKind::Provided { provider_bean } => {
                let manager = self.manager()?;
                let provider = manager.get_value(provider_bean, context)?;
                if let Ok(provider) = Arc::clone(&provider).downcast::<Provider>() {
                    return provider.get();
                }
                let BeanKind::InjectionTarget(target) = provider_bean.kind() else {
                    return Err(InjectionError::definition(format!(
                        "{provider_bean} 不是可用的提供者"
                    )));
                };
                let supplier = target
                    .class()
                    .methods
                    .iter()
                    .find(|m| m.element.annotations.supplier)
                    .ok_or_else(|| {
                        InjectionError::definition(format!("{provider_bean} 没有提供方法"))
                    })?;
                target
                    .injector()
                    .invoke(Some(&provider), supplier, &[], context)?
                    .ok_or_else(|| InjectionError::definition(format!("提供方法 {supplier} 没有返回值")))
            }
            SystemKind::Optional { target, qualifiers } => {
                let manager = self.manager()?;
                let value = match manager.resolve(target, qualifiers)? {
                    Some(bean) => Some(manager.get_value(&bean, context)?),
                    None => None,
                };
                Ok(instance(value))
            }
        }
    }
}
