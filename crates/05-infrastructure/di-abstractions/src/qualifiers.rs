//! 限定符
//!
//! 区分同一类型的多个组件，比较采用结构相等

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// `@Named` 限定符名称
pub const NAMED: &str = "Named";

/// 单个限定符：名称加属性
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifier {
    name: String,
    attributes: BTreeMap<String, String>,
}

impl Qualifier {
    /// 创建无属性限定符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// `@Named(value)`
    pub fn named(value: impl Into<String>) -> Self {
        Self::new(NAMED).with_attribute("value", value)
    }

    /// 添加属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 限定符名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取属性
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "({attributes})")?;
        }
        Ok(())
    }
}

/// 限定符集合，空集合即默认限定符
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Qualifiers(BTreeSet<Qualifier>);

impl Qualifiers {
    /// 默认限定符（空集合）
    pub fn none() -> Self {
        Self::default()
    }

    /// 从限定符列表创建
    pub fn of(qualifiers: impl IntoIterator<Item = Qualifier>) -> Self {
        Self(qualifiers.into_iter().collect())
    }

    /// 只包含 `@Named(value)` 的集合
    pub fn named(value: impl Into<String>) -> Self {
        Self::of([Qualifier::named(value)])
    }

    /// 添加限定符
    pub fn with(mut self, qualifier: Qualifier) -> Self {
        self.0.insert(qualifier);
        self
    }

    /// 是否为默认限定符
    pub fn has_default_qualifier(&self) -> bool {
        self.0.is_empty()
    }

    /// 遍历限定符
    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("@Default");
        }
        let joined = self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_ignores_order() {
        let a = Qualifiers::of([Qualifier::new("Primary"), Qualifier::named("console")]);
        let b = Qualifiers::of([Qualifier::named("console"), Qualifier::new("Primary")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_attributes_take_part_in_equality() {
        assert_ne!(Qualifiers::named("console"), Qualifiers::named("file"));
        assert_ne!(Qualifiers::named("console"), Qualifiers::none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Qualifiers::none().to_string(), "@Default");
        assert_eq!(Qualifiers::named("x").to_string(), "@Named(value=\"x\")");
    }
}
