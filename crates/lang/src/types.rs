use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a type as reported by the front-end
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// A declared (or primitive) type with optional type arguments
    Declared {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeRef>,
    },

    /// Absence of a value (function return only)
    Void,

    /// Type the front-end failed to resolve
    Error { reason: String },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Declared {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Declared {
            name: name.into(),
            args,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Declared name, `None` for void and error types
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            Self::Declared { args, .. } => args,
            _ => &[],
        }
    }

    /// Last dotted segment of the name (`a.b.Foo` -> `Foo`)
    pub fn simple_name(&self) -> &str {
        match self.name() {
            Some(name) => name.rsplit('.').next().unwrap_or(name),
            None => "",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// `Wrapper<T>` -> `T` when this type is exactly the given one-argument wrapper
    pub fn unwrap(&self, wrapper: &str) -> Option<&TypeRef> {
        match self {
            Self::Declared { name, args } if name == wrapper && args.len() == 1 => args.first(),
            _ => None,
        }
    }

    /// True when any part of this type is unresolved
    pub fn contains_error(&self) -> bool {
        match self {
            Self::Error { .. } => true,
            Self::Declared { args, .. } => args.iter().any(TypeRef::contains_error),
            Self::Void => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Self::Void => write!(f, "void"),
            Self::Error { reason } => write!(f, "<error: {reason}>"),
        }
    }
}
