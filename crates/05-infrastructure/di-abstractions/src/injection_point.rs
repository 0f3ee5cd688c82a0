//! 注入点

use std::fmt;
use std::sync::Arc;

use crate::model::{MetaConstructor, MetaField, MetaMethod, MetaParameter};
use crate::qualifiers::Qualifiers;
use crate::scope::ScopeType;
use crate::types::TypeDescriptor;

/// 组件标识，在一个组件管理器内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeanId(pub u64);

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 拥有注入点的组件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    InjectionTarget,
    Producer,
}

/// 注入点所属组件的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanOwner {
    pub id: BeanId,
    pub scope: ScopeType,
    pub declared_type: TypeDescriptor,
    pub kind: OwnerKind,
}

impl BeanOwner {
    pub fn is_dependent_scoped(&self) -> bool {
        self.scope.is_dependent()
    }
}

/// 注入点所在的元素
#[derive(Debug, Clone)]
pub enum InjectionElement {
    Field(Arc<MetaField>),
    ConstructorParameter {
        constructor: Arc<MetaConstructor>,
        parameter: Arc<MetaParameter>,
    },
    MethodParameter {
        method: Arc<MetaMethod>,
        parameter: Arc<MetaParameter>,
    },
}

impl InjectionElement {
    /// 元素是否标注了 `@Produces`
    pub fn is_producer(&self) -> bool {
        match self {
            Self::Field(field) => field.element.annotations.producer,
            Self::ConstructorParameter { parameter, .. }
            | Self::MethodParameter { parameter, .. } => parameter.element.annotations.producer,
        }
    }
}

impl fmt::Display for InjectionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{field}"),
            Self::ConstructorParameter {
                constructor,
                parameter,
            } => write!(f, "{constructor} 参数 {}", parameter.name()),
            Self::MethodParameter { method, parameter } => {
                write!(f, "{method} 参数 {}", parameter.name())
            }
        }
    }
}

/// 注入点：所需类型、限定符、所属组件和元素
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    pub required_type: TypeDescriptor,
    pub qualifiers: Qualifiers,
    pub owner: Option<BeanOwner>,
    pub element: InjectionElement,
}

impl InjectionPoint {
    pub fn field(field: &Arc<MetaField>, owner: Option<BeanOwner>) -> Self {
        Self {
            required_type: field.element.base_type.clone(),
            qualifiers: field.element.qualifiers.clone(),
            owner,
            element: InjectionElement::Field(Arc::clone(field)),
        }
    }

    pub fn constructor_parameter(
        constructor: &Arc<MetaConstructor>,
        parameter: &Arc<MetaParameter>,
        owner: Option<BeanOwner>,
    ) -> Self {
        Self {
            required_type: parameter.element.base_type.clone(),
            qualifiers: parameter.element.qualifiers.clone(),
            owner,
            element: InjectionElement::ConstructorParameter {
                constructor: Arc::clone(constructor),
                parameter: Arc::clone(parameter),
            },
        }
    }

    pub fn method_parameter(
        method: &Arc<MetaMethod>,
        parameter: &Arc<MetaParameter>,
        owner: Option<BeanOwner>,
    ) -> Self {
        Self {
            required_type: parameter.element.base_type.clone(),
            qualifiers: parameter.element.qualifiers.clone(),
            owner,
            element: InjectionElement::MethodParameter {
                method: Arc::clone(method),
                parameter: Arc::clone(parameter),
            },
        }
    }

    /// 所在方法，仅方法参数有
    pub fn method(&self) -> Option<&Arc<MetaMethod>> {
        match &self.element {
            InjectionElement::MethodParameter { method, .. } => Some(method),
            _ => None,
        }
    }

    /// 所在参数，字段注入点没有
    pub fn parameter(&self) -> Option<&Arc<MetaParameter>> {
        match &self.element {
            InjectionElement::ConstructorParameter { parameter, .. }
            | InjectionElement::MethodParameter { parameter, .. } => Some(parameter),
            InjectionElement::Field(_) => None,
        }
    }

    /// 是否为构造器参数
    pub fn is_constructor_parameter(&self) -> bool {
        matches!(self.element, InjectionElement::ConstructorParameter { .. })
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.qualifiers, self.required_type, self.element)
    }
}
