//! Bindings declared as module members.

use crate::condition::Conditional;
use crate::context::ModelContext;
use crate::issue::Issue;
use crate::node::{Dependency, DependencyKind, Node};
use std::fmt;
use wiring_lang::{
    names, Annotated, Annotation, AnnotationValue, BuiltinAnnotations, FunctionDecl, TypeDecl,
    TypeRef, Visibility,
};

/// A declaring member, rendered as `Owner::member`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberRef {
    pub owner: TypeRef,
    pub name: String,
}

impl MemberRef {
    pub fn new(owner: TypeRef, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner.simple_name(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingScope {
    Unscoped,
    /// One instance per hosting component
    Cached(Vec<Annotation>),
    /// Caching allowed but not required
    Reusable,
}

impl BindingScope {
    pub fn scopes(&self) -> &[Annotation] {
        match self {
            Self::Cached(scopes) => scopes,
            _ => &[],
        }
    }

    pub fn is_unscoped(&self) -> bool {
        matches!(self, Self::Unscoped)
    }
}

impl fmt::Display for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unscoped => write!(f, "unscoped"),
            Self::Reusable => write!(f, "@{}", names::REUSABLE),
            Self::Cached(scopes) => {
                let rendered: Vec<String> = scopes.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    List,
    Set,
    Map,
}

impl CollectionKind {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::List => names::LIST,
            Self::Set => names::SET,
            Self::Map => names::MAP,
        }
    }

    /// Kind of a `List<T>` / `Set<T>` / `Map<K, V>` type
    pub fn of_type(ty: &TypeRef) -> Option<Self> {
        match (ty.name()?, ty.args().len()) {
            (names::LIST, 1) => Some(Self::List),
            (names::SET, 1) => Some(Self::Set),
            (names::MAP, 2) => Some(Self::Map),
            _ => None,
        }
    }
}

/// Key of a map contribution: the value of its single `@IntoMap.Key`
/// annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapKey {
    pub annotation: Annotation,
    pub key_type: TypeRef,
    pub value: AnnotationValue,
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.annotation)
    }
}

/// What a binding produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    Plain(Node),
    /// One element into `List<T>` / `Set<T>`
    DirectContribution {
        collection: CollectionKind,
        element: Node,
    },
    /// A collection of elements merged into `List<T>` / `Set<T>`
    FlattenContribution {
        collection: CollectionKind,
        element: Node,
    },
    /// One entry into `Map<K, V>`
    MappingContribution { key: MapKey, value: Node },
}

impl BindingTarget {
    /// The plain node, element node or map value node
    pub fn node(&self) -> &Node {
        match self {
            Self::Plain(node) => node,
            Self::DirectContribution { element, .. } | Self::FlattenContribution { element, .. } => {
                element
            }
            Self::MappingContribution { value, .. } => value,
        }
    }

    pub fn is_contribution(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    /// Aggregate node this target contributes to
    pub fn collection_node(&self, cx: &ModelContext) -> Option<Node> {
        match self {
            Self::Plain(_) => None,
            Self::DirectContribution {
                collection,
                element,
            }
            | Self::FlattenContribution {
                collection,
                element,
            } => Some(cx.node(
                &TypeRef::generic(collection.type_name(), vec![element.ty().clone()]),
                element.qualifier().cloned(),
            )),
            Self::MappingContribution { key, value } => Some(cx.node(
                &TypeRef::generic(names::MAP, vec![key.key_type.clone(), value.ty().clone()]),
                value.qualifier().cloned(),
            )),
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(node) => write!(f, "{node}"),
            Self::DirectContribution {
                collection,
                element,
            } => write!(f, "{element} into {}", collection.type_name()),
            Self::FlattenContribution {
                collection,
                element,
            } => write!(f, "{element}... into {}", collection.type_name()),
            Self::MappingContribution { key, value } => write!(f, "{value} into Map by {key}"),
        }
    }
}

/// Binding marker found on a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberMarker {
    Alias,
    Provision,
    InjectConstructor,
}

/// Classifies a member by its binding marker.
///
/// `@Binds` wins over `@Provides`, which wins over `@Inject`; losing markers
/// are reported as ignored.
pub fn classify(member: &FunctionDecl) -> (Option<MemberMarker>, Vec<Issue>) {
    let found: Vec<(MemberMarker, &str)> = [
        (MemberMarker::Alias, names::BINDS),
        (MemberMarker::Provision, names::PROVIDES),
        (MemberMarker::InjectConstructor, names::INJECT),
    ]
    .into_iter()
    .filter(|(_, class)| member.has_annotation(class))
    .collect();

    let Some(&(winner, winner_class)) = found.first() else {
        return (None, Vec::new());
    };
    let issues = found[1..]
        .iter()
        .map(|(_, ignored)| {
            Issue::warning(format!(
                "@{ignored} on '{}' is ignored because @{winner_class} takes priority",
                member.name
            ))
        })
        .collect();
    (Some(winner), issues)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingDeclKind {
    Provides {
        params: Vec<Dependency>,
        requires_module_instance: bool,
    },
    /// Zero sources is an explicitly absent binding, several are
    /// alternatives tried in order
    Binds { sources: Vec<Node> },
}

/// A `@Provides` or `@Binds` member of a module
#[derive(Debug)]
pub struct BindingDecl {
    pub origin: MemberRef,
    pub kind: BindingDeclKind,
    pub target: BindingTarget,
    pub scope: BindingScope,
    pub conditionals: Vec<Conditional>,
    pub issues: Vec<Issue>,
}

impl BindingDecl {
    pub(crate) fn build(
        cx: &ModelContext,
        owner: &TypeDecl,
        member: &FunctionDecl,
        marker: MemberMarker,
        mut issues: Vec<Issue>,
    ) -> Self {
        let origin = MemberRef::new(owner.as_type(), &member.name);
        if member.visibility == Visibility::Private {
            issues.push(Issue::error(format!("binding {origin} is not accessible")));
        }

        let target = binding_target(cx, member, &origin, &mut issues);
        let scope = cx.binding_scope(member);

        let kind = match marker {
            MemberMarker::Alias => {
                if !member.is_abstract {
                    issues.push(Issue::error(format!("@Binds {origin} must be abstract")));
                }
                if !scope.is_unscoped() {
                    issues.push(Issue::warning(format!(
                        "scope {scope} on @Binds {origin} is ignored"
                    )));
                }
                let sources = member
                    .params
                    .iter()
                    .map(|param| {
                        let dependency = cx.dependency(&param.ty, &param.annotations);
                        if dependency.kind != DependencyKind::Direct {
                            issues.push(Issue::error(format!(
                                "alias source {dependency} of {origin} must be a plain type"
                            )));
                        }
                        if !cx.oracle().is_assignable(dependency.node.ty(), target.node().ty()) {
                            issues.push(Issue::error(format!(
                                "{} is not assignable to {}, as required by {origin}",
                                dependency.node.ty(),
                                target.node().ty()
                            )));
                        }
                        dependency.node
                    })
                    .collect();
                BindingDeclKind::Binds { sources }
            }
            MemberMarker::Provision | MemberMarker::InjectConstructor => {
                if member.is_abstract {
                    issues.push(Issue::error(format!("@Provides {origin} must have a body")));
                }
                BindingDeclKind::Provides {
                    params: member
                        .params
                        .iter()
                        .map(|param| cx.dependency(&param.ty, &param.annotations))
                        .collect(),
                    requires_module_instance: !(member.is_static || owner.is_object()),
                }
            }
        };

        Self {
            origin,
            kind,
            target,
            scope: if marker == MemberMarker::Alias {
                BindingScope::Unscoped
            } else {
                scope
            },
            conditionals: cx.conditionals(member),
            issues,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(&self.kind, BindingDeclKind::Binds { sources } if sources.len() == 1)
    }

    /// Nodes this declaration depends on, in declaration order
    pub fn dependencies(&self) -> Vec<Dependency> {
        match &self.kind {
            BindingDeclKind::Provides { params, .. } => params.clone(),
            BindingDeclKind::Binds { sources } => {
                sources.iter().cloned().map(Dependency::direct).collect()
            }
        }
    }
}

fn binding_target(
    cx: &ModelContext,
    member: &FunctionDecl,
    origin: &MemberRef,
    issues: &mut Vec<Issue>,
) -> BindingTarget {
    let returned = &member.return_type;
    if returned.is_void() {
        issues.push(Issue::error(format!("binding {origin} must return a value")));
        return BindingTarget::Plain(cx.invalid_node());
    }

    let qualifier = cx.qualifier_of(member);
    let into_list = member.into_collection_flatten(names::INTO_LIST);
    let into_set = member.into_collection_flatten(names::INTO_SET);
    let into_map = member.has_annotation(names::INTO_MAP);

    let markers = [into_list.is_some(), into_set.is_some(), into_map]
        .iter()
        .filter(|m| **m)
        .count();
    if markers > 1 {
        issues.push(Issue::error(format!(
            "{origin} declares more than one multi-binding marker"
        )));
        return BindingTarget::Plain(cx.invalid_node());
    }

    let collection = match (into_list, into_set) {
        (Some(flatten), _) => Some((CollectionKind::List, flatten)),
        (_, Some(flatten)) => Some((CollectionKind::Set, flatten)),
        _ => None,
    };
    if let Some((collection, flatten)) = collection {
        if !flatten {
            return BindingTarget::DirectContribution {
                collection,
                element: cx.node(returned, qualifier),
            };
        }
        let element = [names::LIST, names::SET, names::COLLECTION]
            .iter()
            .find_map(|wrapper| returned.unwrap(wrapper));
        return match element {
            Some(element) => BindingTarget::FlattenContribution {
                collection,
                element: cx.node(element, qualifier),
            },
            None => {
                issues.push(Issue::error(format!(
                    "flattening {origin} must return a collection, found {returned}"
                )));
                BindingTarget::Plain(cx.invalid_node())
            }
        };
    }

    // Malformed contributions target the invalid node and bind nothing
    if into_map {
        return match map_key(cx, member, origin, issues) {
            Some(key) => BindingTarget::MappingContribution {
                key,
                value: cx.node(returned, qualifier),
            },
            None => BindingTarget::Plain(cx.invalid_node()),
        };
    }

    BindingTarget::Plain(cx.node(returned, qualifier))
}

fn map_key(
    cx: &ModelContext,
    member: &FunctionDecl,
    origin: &MemberRef,
    issues: &mut Vec<Issue>,
) -> Option<MapKey> {
    let keys: Vec<(&Annotation, Option<std::sync::Arc<TypeDecl>>)> = member
        .annotations()
        .iter()
        .filter_map(|ann| {
            let decl = cx.oracle().declaration(&ann.class);
            let is_key = decl
                .as_ref()
                .is_some_and(|d| d.has_annotation(names::INTO_MAP_KEY));
            is_key.then_some((ann, decl))
        })
        .collect();

    let [(annotation, decl)] = keys.as_slice() else {
        issues.push(Issue::error(format!(
            "map contribution {origin} needs exactly one map key annotation, found {}",
            keys.len()
        )));
        return None;
    };

    let mut attributes = annotation.attributes.iter();
    let (Some((name, value)), None) = (attributes.next(), attributes.next()) else {
        issues.push(Issue::error(format!(
            "map key {annotation} on {origin} must have exactly one value"
        )));
        return None;
    };

    let declared_type = decl.as_ref().and_then(|d| {
        d.methods
            .iter()
            .find(|m| &m.name == name)
            .map(|m| m.return_type.clone())
    });
    let key_type = declared_type.unwrap_or_else(|| match value {
        AnnotationValue::Str(_) => TypeRef::named("String"),
        AnnotationValue::Int(_) => TypeRef::named("int"),
        AnnotationValue::Bool(_) => TypeRef::named(names::BOOLEAN),
        AnnotationValue::Type(_) => TypeRef::named("Class"),
        _ => TypeRef::error(format!("key type of {annotation}")),
    });

    Some(MapKey {
        annotation: (*annotation).clone(),
        key_type,
        value: value.clone(),
    })
}

/// `@Multibinds` / `@DeclareList`: declares a possibly empty collection
#[derive(Debug, Clone)]
pub struct MultiDeclaration {
    pub origin: MemberRef,
    pub collection: Node,
    pub kind: CollectionKind,
    /// Only meaningful for lists; `None` when not stated
    pub order_dependent: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiring_lang::ParamDecl;

    fn ann(class: &str) -> Annotation {
        Annotation::new(class)
    }

    #[test]
    fn test_binds_takes_priority_over_provides() {
        let member = FunctionDecl::new("api", TypeRef::named("Api"))
            .annotated(ann(names::PROVIDES))
            .annotated(ann(names::BINDS));
        let (marker, issues) = classify(&member);
        assert_eq!(marker, Some(MemberMarker::Alias));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("@Provides on 'api' is ignored"));
    }

    #[test]
    fn test_provides_over_inject() {
        let member = FunctionDecl::new("api", TypeRef::named("Api"))
            .annotated(ann(names::INJECT))
            .annotated(ann(names::PROVIDES));
        let (marker, issues) = classify(&member);
        assert_eq!(marker, Some(MemberMarker::Provision));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_unmarked_member() {
        let member = FunctionDecl::new("helper", TypeRef::named("Api"))
            .param_with(ParamDecl::new("x", TypeRef::named("X")));
        assert_eq!(classify(&member), (None, Vec::new()));
    }

    #[test]
    fn test_collection_kind_of_type() {
        let list = TypeRef::generic(names::LIST, vec![TypeRef::named("A")]);
        let map = TypeRef::generic(names::MAP, vec![TypeRef::named("K"), TypeRef::named("V")]);
        assert_eq!(CollectionKind::of_type(&list), Some(CollectionKind::List));
        assert_eq!(CollectionKind::of_type(&map), Some(CollectionKind::Map));
        assert_eq!(CollectionKind::of_type(&TypeRef::named(names::LIST)), None);
    }
}
