//! 作用域类型

use std::borrow::Cow;
use std::fmt;

/// 作用域类型，按名称区分
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeType(Cow<'static, str>);

impl ScopeType {
    /// 依赖作用域 - 每次注入都创建新实例，随所属上下文销毁
    pub const DEPENDENT: ScopeType = ScopeType(Cow::Borrowed("Dependent"));

    /// 单例作用域 - 组件管理器生命周期内只创建一个实例
    pub const SINGLETON: ScopeType = ScopeType(Cow::Borrowed("Singleton"));

    /// 自定义作用域
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_dependent(&self) -> bool {
        *self == Self::DEPENDENT
    }
}

impl Default for ScopeType {
    fn default() -> Self {
        Self::DEPENDENT
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_scope_equals_builtin_by_name() {
        assert_eq!(ScopeType::new("Singleton"), ScopeType::SINGLETON);
        assert!(ScopeType::new("Dependent").is_dependent());
        assert!(!ScopeType::SINGLETON.is_dependent());
    }
}
