//! 变量：元素的类型、限定符和作用域视图

use std::fmt;

use crate::qualifiers::Qualifiers;
use crate::scope::ScopeType;
use crate::types::TypeDescriptor;

/// 组件或注入点的解析视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    types: Vec<TypeDescriptor>,
    qualifiers: Qualifiers,
    scope: ScopeType,
}

impl Variable {
    /// 创建变量，`types` 的第一个元素为声明类型
    pub fn new(
        name: impl Into<String>,
        types: Vec<TypeDescriptor>,
        qualifiers: Qualifiers,
        scope: ScopeType,
    ) -> Self {
        Self {
            name: name.into(),
            types,
            qualifiers,
            scope,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 类型闭包
    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// 声明类型
    pub fn declared_type(&self) -> Option<&TypeDescriptor> {
        self.types.first()
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    pub fn scope(&self) -> &ScopeType {
        &self.scope
    }

    pub fn is_dependent_scoped(&self) -> bool {
        self.scope.is_dependent()
    }

    /// 类型闭包中是否有类型满足 `required`
    pub fn has_matching_type(&self, required: &TypeDescriptor) -> bool {
        self.types.iter().any(|t| required.matches(t))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declared_type() {
            Some(declared) => write!(f, "{} {} {} {}", self.scope, self.qualifiers, declared, self.name),
            None => write!(f, "{} {} {}", self.scope, self.qualifiers, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn test_has_matching_type_across_closure() {
        let variable = Variable::new(
            "count",
            vec![
                TypeDescriptor::Primitive(Primitive::I32),
                TypeDescriptor::class("Number"),
            ],
            Qualifiers::none(),
            ScopeType::DEPENDENT,
        );

        assert!(variable.has_matching_type(&TypeDescriptor::Boxed(Primitive::I32)));
        assert!(variable.has_matching_type(&TypeDescriptor::class("Number")));
        assert!(!variable.has_matching_type(&TypeDescriptor::class("String")));
        assert!(variable.is_dependent_scoped());
    }
}
