//! 元素管理器
//!
//! 从元数据推导组件定义所需的信息：可注入性、构造器选择、变量和注入点

use std::sync::Arc;

use infrastructure_common::{InjectionError, InjectionResult};
use tracing::debug;

use crate::injection_point::{BeanOwner, InjectionPoint};
use crate::model::{ElementInfo, MetaClass, MetaConstructor, MetaMethod};
use crate::scope::ScopeType;
use crate::variable::Variable;

/// 元素管理器接口
pub trait ElementManager: Send + Sync {
    /// 类是否可以作为注入目标组件
    fn is_injectable(&self, class: &MetaClass) -> bool;

    /// 选择可注入构造器
    fn injectable_constructor(&self, class: &MetaClass) -> InjectionResult<Arc<MetaConstructor>>;

    /// 创建元素的变量视图，`declaring_scope` 为声明类的作用域
    fn create_variable(&self, element: &ElementInfo, declaring_scope: Option<&ScopeType>)
        -> Variable;

    /// 创建注入目标的注入点：构造器参数、可注入字段、可注入方法的参数
    fn create_injection_points(
        &self,
        class: &MetaClass,
        constructor: &Arc<MetaConstructor>,
        owner: &BeanOwner,
    ) -> Vec<InjectionPoint>;

    /// 创建方法参数的注入点，`@Disposes` 参数除外
    fn create_executable_injection_points(
        &self,
        method: &Arc<MetaMethod>,
        owner: Option<&BeanOwner>,
    ) -> Vec<InjectionPoint>;
}

/// 默认元素管理器
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultElementManager;

impl DefaultElementManager {
    pub fn new() -> Self {
        Self
    }

    fn inject_constructors(class: &MetaClass) -> Vec<&Arc<MetaConstructor>> {
        class
            .constructors
            .iter()
            .filter(|c| c.annotations.injectable)
            .collect()
    }

    fn select_constructor(class: &MetaClass) -> Option<&Arc<MetaConstructor>> {
        let inject = Self::inject_constructors(class);
        if let [constructor] = inject.as_slice() {
            return Some(*constructor);
        }
        if !inject.is_empty() {
            return None;
        }
        if let Some(no_arg) = class.constructors.iter().find(|c| c.parameters.is_empty()) {
            return Some(no_arg);
        }
        match class.constructors.as_slice() {
            [only]
                if only
                    .parameters
                    .iter()
                    .all(|p| !p.element.qualifiers.has_default_qualifier()) =>
            {
                Some(only)
            }
            _ => None,
        }
    }
}

impl ElementManager for DefaultElementManager {
    fn is_injectable(&self, class: &MetaClass) -> bool {
        !class.is_abstract
            && (!Self::inject_constructors(class).is_empty()
                || Self::select_constructor(class).is_some())
    }

    fn injectable_constructor(&self, class: &MetaClass) -> InjectionResult<Arc<MetaConstructor>> {
        let inject = Self::inject_constructors(class);
        if inject.len() > 1 {
            return Err(InjectionError::definition(format!(
                "{class} 有 {} 个 @Inject 构造器, 只允许一个",
                inject.len()
            )));
        }
        Self::select_constructor(class)
            .cloned()
            .ok_or_else(|| InjectionError::definition(format!("{class} 没有可注入的构造器")))
    }

    fn create_variable(
        &self,
        element: &ElementInfo,
        declaring_scope: Option<&ScopeType>,
    ) -> Variable {
        let scope = element
            .scope
            .clone()
            .or_else(|| declaring_scope.cloned())
            .unwrap_or_default();
        Variable::new(
            element.name.clone(),
            element.type_closure.clone(),
            element.qualifiers.clone(),
            scope,
        )
    }

    fn create_injection_points(
        &self,
        class: &MetaClass,
        constructor: &Arc<MetaConstructor>,
        owner: &BeanOwner,
    ) -> Vec<InjectionPoint> {
        let mut points: Vec<InjectionPoint> = constructor
            .parameters
            .iter()
            .map(|p| InjectionPoint::constructor_parameter(constructor, p, Some(owner.clone())))
            .collect();

        points.extend(
            class
                .fields
                .iter()
                .filter(|f| f.element.annotations.injectable)
                .map(|f| InjectionPoint::field(f, Some(owner.clone()))),
        );

        for method in class.methods.iter().filter(|m| m.element.annotations.injectable) {
            points.extend(self.create_executable_injection_points(method, Some(owner)));
        }

        debug!("{} 共有 {} 个注入点", class, points.len());
        points
    }

    fn create_executable_injection_points(
        &self,
        method: &Arc<MetaMethod>,
        owner: Option<&BeanOwner>,
    ) -> Vec<InjectionPoint> {
        method
            .parameters
            .iter()
            .filter(|p| !p.element.annotations.disposer_target)
            .map(|p| InjectionPoint::method_parameter(method, p, owner.cloned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection_point::{BeanId, OwnerKind};
    use crate::model::{MetaField, MetaParameter};
    use crate::qualifiers::Qualifiers;
    use crate::types::TypeDescriptor;

    fn owner_of(class: &MetaClass) -> BeanOwner {
        BeanOwner {
            id: BeanId(1),
            scope: ScopeType::DEPENDENT,
            declared_type: class.class_type().clone(),
            kind: OwnerKind::InjectionTarget,
        }
    }

    fn constructor_with(param_qualifiers: Qualifiers) -> MetaConstructor {
        MetaConstructor::new(|_| Ok(crate::model::instance(())))
            .with_parameter(
                MetaParameter::new("dep", TypeDescriptor::class("Dep"))
                    .with_qualifiers(param_qualifiers),
            )
    }

    #[test]
    fn test_constructor_selection_rules() {
        let manager = DefaultElementManager::new();

        let no_arg = MetaClass::new(TypeDescriptor::class("A"))
            .with_constructor(constructor_with(Qualifiers::none()))
            .with_constructor(MetaConstructor::new(|_| Ok(crate::model::instance(()))));
        assert_eq!(manager.injectable_constructor(&no_arg).unwrap().parameters.len(), 0);

        let inject = MetaClass::new(TypeDescriptor::class("B"))
            .with_constructor(MetaConstructor::new(|_| Ok(crate::model::instance(()))))
            .with_constructor(constructor_with(Qualifiers::none()).inject());
        assert_eq!(manager.injectable_constructor(&inject).unwrap().parameters.len(), 1);

        let qualified = MetaClass::new(TypeDescriptor::class("C"))
            .with_constructor(constructor_with(Qualifiers::named("primary")));
        assert!(manager.is_injectable(&qualified));

        let unqualified = MetaClass::new(TypeDescriptor::class("D"))
            .with_constructor(constructor_with(Qualifiers::none()));
        assert!(!manager.is_injectable(&unqualified));
        assert!(manager.injectable_constructor(&unqualified).is_err());
    }

    #[test]
    fn test_multiple_inject_constructors_rejected() {
        let class = MetaClass::new(TypeDescriptor::class("E"))
            .with_constructor(MetaConstructor::new(|_| Ok(crate::model::instance(()))).inject())
            .with_constructor(constructor_with(Qualifiers::none()).inject());

        let manager = DefaultElementManager::new();
        assert!(manager.is_injectable(&class));
        assert!(matches!(
            manager.injectable_constructor(&class),
            Err(InjectionError::Definition { .. })
        ));
    }

    #[test]
    fn test_abstract_class_not_injectable() {
        let class = MetaClass::new(TypeDescriptor::class("F"))
            .abstract_class()
            .with_constructor(MetaConstructor::new(|_| Ok(crate::model::instance(()))));
        assert!(!DefaultElementManager::new().is_injectable(&class));
    }

    #[test]
    fn test_variable_scope_defaults() {
        let manager = DefaultElementManager::new();
        let element = ElementInfo::new("logger", TypeDescriptor::class("Logger"));

        assert_eq!(*manager.create_variable(&element, None).scope(), ScopeType::DEPENDENT);
        assert_eq!(
            *manager.create_variable(&element, Some(&ScopeType::SINGLETON)).scope(),
            ScopeType::SINGLETON
        );

        let mut scoped = element;
        scoped.scope = Some(ScopeType::new("Request"));
        assert_eq!(
            manager.create_variable(&scoped, Some(&ScopeType::SINGLETON)).scope().name(),
            "Request"
        );
    }

    #[test]
    fn test_injection_points_order_and_disposes_skipped() {
        let class = MetaClass::new(TypeDescriptor::class("Holder"))
            .with_constructor(constructor_with(Qualifiers::named("x")))
            .with_field(MetaField::new("config", TypeDescriptor::class("Config")).inject())
            .with_field(MetaField::new("ignored", TypeDescriptor::class("Other")))
            .with_method(
                MetaMethod::new("setup", TypeDescriptor::unit(), |_, _| Ok(None))
                    .inject()
                    .with_parameter(MetaParameter::new("clock", TypeDescriptor::class("Clock"))),
            )
            .with_method(
                MetaMethod::new("close", TypeDescriptor::unit(), |_, _| Ok(None))
                    .with_parameter(
                        MetaParameter::new("logger", TypeDescriptor::class("Logger")).disposes(),
                    )
                    .with_parameter(MetaParameter::new("config", TypeDescriptor::class("Config"))),
            );

        let manager = DefaultElementManager::new();
        let constructor = manager.injectable_constructor(&class).unwrap();
        let points = manager.create_injection_points(&class, &constructor, &owner_of(&class));

        let types: Vec<String> = points.iter().map(|p| p.required_type.to_string()).collect();
        assert_eq!(types, vec!["Dep", "Config", "Clock"]);
        assert!(points[0].is_constructor_parameter());

        let disposer_points = manager.create_executable_injection_points(&class.methods[1], None);
        assert_eq!(disposer_points.len(), 1);
        assert_eq!(disposer_points[0].required_type, TypeDescriptor::class("Config"));
    }
}
