//! 类型描述符
//!
//! 以结构化的方式描述被注入的类型，替代运行时反射的类型比较

use std::fmt;

/// `Provider<T>` 的原始类型名
pub const PROVIDER: &str = "Provider";
/// `Optional<T>` 的原始类型名
pub const OPTIONAL: &str = "Optional";
/// 注入点元数据类型名
pub const INJECTION_POINT: &str = "InjectionPoint";
/// 组件元数据类型名
pub const BEAN: &str = "Bean";

/// 基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
}

impl Primitive {
    /// 基本类型名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
        }
    }

    /// 根据名称识别基本类型
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "char" => Self::Char,
            _ => return None,
        })
    }
}

/// 类型描述符
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDescriptor {
    /// 普通类型
    Class(String),
    /// 基本类型
    Primitive(Primitive),
    /// 基本类型的装箱形式
    Boxed(Primitive),
    /// 参数化类型
    Parameterized {
        raw: String,
        arguments: Vec<TypeDescriptor>,
    },
    /// 类型变量
    Variable(String),
    /// 通配符
    Wildcard,
}

impl TypeDescriptor {
    /// 普通类型
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// 参数化类型
    pub fn parameterized(raw: impl Into<String>, arguments: Vec<TypeDescriptor>) -> Self {
        Self::Parameterized {
            raw: raw.into(),
            arguments,
        }
    }

    /// `Provider<T>`
    pub fn provider_of(target: TypeDescriptor) -> Self {
        Self::parameterized(PROVIDER, vec![target])
    }

    /// `Optional<T>`
    pub fn optional_of(target: TypeDescriptor) -> Self {
        Self::parameterized(OPTIONAL, vec![target])
    }

    /// `Bean<T>`
    pub fn bean_of(target: TypeDescriptor) -> Self {
        Self::parameterized(BEAN, vec![target])
    }

    /// 注入点元数据类型
    pub fn injection_point() -> Self {
        Self::class(INJECTION_POINT)
    }

    /// 无返回值
    pub fn unit() -> Self {
        Self::class("()")
    }

    /// 从 Rust 类型获取类型描述符
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        match Primitive::from_name(name) {
            Some(primitive) => Self::Primitive(primitive),
            None => Self::Class(name.to_string()),
        }
    }

    /// 原始类型名称
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            Self::Class(name) | Self::Parameterized { raw: name, .. } => Some(name),
            Self::Primitive(p) | Self::Boxed(p) => Some(p.name()),
            Self::Variable(_) | Self::Wildcard => None,
        }
    }

    /// 参数化类型的原始形式
    pub fn raw_type(&self) -> Option<TypeDescriptor> {
        match self {
            Self::Parameterized { raw, .. } => Some(Self::Class(raw.clone())),
            _ => None,
        }
    }

    /// 类型参数
    pub fn arguments(&self) -> &[TypeDescriptor] {
        match self {
            Self::Parameterized { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// 原始类型为 `raw` 且只有一个类型参数时返回该参数
    pub fn single_argument_of(&self, raw: &str) -> Option<&TypeDescriptor> {
        match self {
            Self::Parameterized {
                raw: name,
                arguments,
            } if name == raw && arguments.len() == 1 => arguments.first(),
            _ => None,
        }
    }

    /// 原始类型名称是否为 `raw`
    pub fn has_raw_name(&self, raw: &str) -> bool {
        self.raw_name() == Some(raw)
    }

    /// 是否为类型变量
    pub fn is_type_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// 基本类型转换为装箱形式，其它类型保持不变
    pub fn reference_type(&self) -> TypeDescriptor {
        match self {
            Self::Primitive(p) => Self::Boxed(*p),
            other => other.clone(),
        }
    }

    /// 检查本类型（所需类型）是否可以由 `bean_type` 满足
    pub fn matches(&self, bean_type: &TypeDescriptor) -> bool {
        if self == bean_type || self.reference_type() == bean_type.reference_type() {
            return true;
        }
        match (self, bean_type) {
            (
                Self::Parameterized {
                    raw: required_raw,
                    arguments: required_args,
                },
                Self::Parameterized {
                    raw: bean_raw,
                    arguments: bean_args,
                },
            ) => {
                required_raw == bean_raw
                    && required_args.len() == bean_args.len()
                    && required_args
                        .iter()
                        .zip(bean_args)
                        .all(|(required, actual)| required.matches_argument(actual))
            }
            (
                Self::Parameterized {
                    raw: required_raw,
                    arguments,
                },
                Self::Class(bean_raw),
            ) => required_raw == bean_raw && arguments.iter().all(Self::is_unbounded),
            _ => false,
        }
    }

    fn matches_argument(&self, actual: &TypeDescriptor) -> bool {
        self.is_unbounded() || self.matches(actual)
    }

    fn is_unbounded(&self) -> bool {
        matches!(self, Self::Wildcard | Self::Variable(_))
    }

    /// 注册组件时使用的索引键：类型本身、参数化类型的原始形式、基本类型的装箱形式
    pub fn index_keys(&self) -> Vec<TypeDescriptor> {
        let mut keys = vec![self.clone()];
        match self {
            Self::Parameterized { .. } => keys.extend(self.raw_type()),
            Self::Primitive(p) => keys.push(Self::Boxed(*p)),
            _ => {}
        }
        keys
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) | Self::Variable(name) => f.write_str(name),
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Boxed(p) => write!(f, "Box<{}>", p.name()),
            Self::Parameterized { raw, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{raw}<{arguments}>")
            }
            Self::Wildcard => f.write_str("?"),
        }
    }
}

/// 计算类型闭包：基础类型加上所有超类型，保持顺序并去重
pub fn type_closure(base: &TypeDescriptor, supertypes: &[TypeDescriptor]) -> Vec<TypeDescriptor> {
    let mut closure = Vec::with_capacity(supertypes.len() + 1);
    for candidate in std::iter::once(base).chain(supertypes) {
        if !closure.contains(candidate) {
            closure.push(candidate.clone());
        }
    }
    closure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_maps_primitives() {
        assert_eq!(TypeDescriptor::of::<i32>(), TypeDescriptor::Primitive(Primitive::I32));
        assert_eq!(TypeDescriptor::of::<String>(), TypeDescriptor::class("alloc::string::String"));
    }

    #[test]
    fn test_primitive_matches_boxed() {
        let int = TypeDescriptor::Primitive(Primitive::I32);
        let boxed = TypeDescriptor::Boxed(Primitive::I32);
        assert!(int.matches(&boxed));
        assert!(boxed.matches(&int));
        assert!(!int.matches(&TypeDescriptor::Primitive(Primitive::I64)));
    }

    #[test]
    fn test_parameterized_matching() {
        let list_of_string =
            TypeDescriptor::parameterized("List", vec![TypeDescriptor::class("String")]);
        let list_of_any = TypeDescriptor::parameterized("List", vec![TypeDescriptor::Wildcard]);
        let list_of_int =
            TypeDescriptor::parameterized("List", vec![TypeDescriptor::class("Integer")]);

        assert!(list_of_any.matches(&list_of_string));
        assert!(!list_of_int.matches(&list_of_string));
        assert!(list_of_any.matches(&TypeDescriptor::class("List")));
        assert!(!list_of_int.matches(&TypeDescriptor::class("List")));
    }

    #[test]
    fn test_index_keys() {
        let provider = TypeDescriptor::provider_of(TypeDescriptor::class("Widget"));
        assert_eq!(
            provider.index_keys(),
            vec![provider.clone(), TypeDescriptor::class(PROVIDER)]
        );
        assert_eq!(
            TypeDescriptor::Primitive(Primitive::Bool).index_keys(),
            vec![
                TypeDescriptor::Primitive(Primitive::Bool),
                TypeDescriptor::Boxed(Primitive::Bool)
            ]
        );
    }

    #[test]
    fn test_type_closure_dedups() {
        let widget = TypeDescriptor::class("Widget");
        let closure = type_closure(
            &widget,
            &[TypeDescriptor::class("Component"), widget.clone()],
        );
        assert_eq!(closure, vec![widget, TypeDescriptor::class("Component")]);
    }

    #[test]
    fn test_display() {
        let ty = TypeDescriptor::optional_of(TypeDescriptor::Primitive(Primitive::I64));
        assert_eq!(ty.to_string(), "Optional<i64>");
    }
}
