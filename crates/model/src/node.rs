use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;
use wiring_lang::{Annotation, TypeRef};

/// A (type, qualifier) pair: the unit of dependency resolution.
#[derive(Debug)]
pub struct NodeModel {
    ty: TypeRef,
    qualifier: Option<Annotation>,
}

impl NodeModel {
    pub(crate) fn new(ty: TypeRef, qualifier: Option<Annotation>) -> Self {
        Self { ty, qualifier }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn qualifier(&self) -> Option<&Annotation> {
        self.qualifier.as_ref()
    }

    /// Placeholder nodes stand for unresolved or non-injectable types
    pub fn is_valid(&self) -> bool {
        !self.ty.contains_error()
    }
}

/// Interned handle to a [`NodeModel`].
///
/// Equality and hashing are by identity; the context guarantees one instance
/// per (type, qualifier). Ordering is structural so that output is stable.
#[derive(Clone)]
pub struct Node(Rc<NodeModel>);

impl Node {
    pub(crate) fn from_model(model: Rc<NodeModel>) -> Self {
        Self(model)
    }
}

impl Deref for Node {
    type Target = NodeModel;

    fn deref(&self) -> &NodeModel {
        &self.0
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ty
            .cmp(&other.ty)
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} {}", qualifier, self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({self})")
    }
}

/// How a dependency is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    Direct,
    Lazy,
    Provider,
    Optional,
    OptionalLazy,
    OptionalProvider,
}

impl DependencyKind {
    /// Optional requests tolerate an absent binding
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalLazy | Self::OptionalProvider)
    }

    /// Deferred requests do not participate in construction-order loops
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            Self::Lazy | Self::Provider | Self::OptionalLazy | Self::OptionalProvider
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub node: Node,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn direct(node: Node) -> Self {
        Self {
            node,
            kind: DependencyKind::Direct,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DependencyKind::Direct => write!(f, "{}", self.node),
            DependencyKind::Lazy => write!(f, "Lazy<{}>", self.node),
            DependencyKind::Provider => write!(f, "Provider<{}>", self.node),
            DependencyKind::Optional => write!(f, "Optional<{}>", self.node),
            DependencyKind::OptionalLazy => write!(f, "Optional<Lazy<{}>>", self.node),
            DependencyKind::OptionalProvider => write!(f, "Optional<Provider<{}>>", self.node),
        }
    }
}
