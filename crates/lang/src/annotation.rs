use crate::types::TypeRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Annotation instance attached to a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation class name (e.g. "Provides", "Named")
    pub class: String,

    /// Attribute values by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AnnotationValue>,
}

/// Constant value of an annotation attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Type(TypeRef),
    Enum(String),
    Annotation(Annotation),
    Array(Vec<AnnotationValue>),
}

impl Annotation {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AnnotationValue> {
        self.attributes.get(name)
    }

    pub fn bool_attr(&self, name: &str) -> Option<bool> {
        match self.attr(name) {
            Some(AnnotationValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        match self.attr(name) {
            Some(AnnotationValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn type_attr(&self, name: &str) -> Option<&TypeRef> {
        match self.attr(name) {
            Some(AnnotationValue::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    /// Type list attribute; a single type is accepted as a one-element list
    pub fn type_list(&self, name: &str) -> Vec<TypeRef> {
        match self.attr(name) {
            Some(AnnotationValue::Type(ty)) => vec![ty.clone()],
            Some(AnnotationValue::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    AnnotationValue::Type(ty) => Some(ty.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested annotation list attribute; a single annotation counts as one element
    pub fn annotation_list(&self, name: &str) -> Vec<&Annotation> {
        match self.attr(name) {
            Some(AnnotationValue::Annotation(nested)) => vec![nested],
            Some(AnnotationValue::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    AnnotationValue::Annotation(nested) => Some(nested),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl AnnotationValue {
    pub fn types(types: impl IntoIterator<Item = TypeRef>) -> Self {
        Self::Array(types.into_iter().map(Self::Type).collect())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Type(ty) => write!(f, "{ty}"),
            Self::Enum(value) => write!(f, "{value}"),
            Self::Annotation(nested) => write!(f, "{nested}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.class)?;
        if self.attributes.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

/// Anything that carries annotations
pub trait Annotated {
    fn annotations(&self) -> &[Annotation];

    fn annotation(&self, class: &str) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.class == class)
    }

    fn has_annotation(&self, class: &str) -> bool {
        self.annotation(class).is_some()
    }

    /// All annotations of one class, in declaration order
    fn annotations_of<'a>(&'a self, class: &'a str) -> Box<dyn Iterator<Item = &'a Annotation> + 'a> {
        Box::new(self.annotations().iter().filter(move |a| a.class == class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_list_accepts_single_value() {
        let ann = Annotation::new("Component").with("modules", AnnotationValue::Type(TypeRef::named("M")));
        assert_eq!(ann.type_list("modules"), vec![TypeRef::named("M")]);
        assert!(ann.type_list("dependencies").is_empty());
    }

    #[test]
    fn test_display() {
        let ann = Annotation::new("Named").with("value", AnnotationValue::str("db"));
        assert_eq!(ann.to_string(), "@Named(value=\"db\")");
        assert_eq!(Annotation::new("Inject").to_string(), "@Inject");
    }
}
