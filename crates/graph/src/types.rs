use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use wiring_lang::TypeRef;
use wiring_model::{
    AssistedFactoryModel, BindingDecl, BindingScope, CollectionKind, ComponentModel, Dependency,
    DependencyKind, InjectConstructorModel, Issue, MemberRef, ModuleModel, MultiDeclaration, Node,
    Scope, Variant,
};

/// Index of a [`BindingGraph`] in its forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphId(pub usize);

/// Index of a [`Binding`] in the forest's binding arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingId(pub usize);

/// One list/set/map contribution as seen from a particular graph
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Aggregate node the contribution goes into
    pub collection: Node,
    pub decl: Rc<BindingDecl>,
    /// Graph whose modules declare the contribution
    pub host: GraphId,
    /// Presence in the host graph, after variant filtering
    pub presence: Scope,
}

impl Contribution {
    /// The alias source, used to order list elements
    pub fn anchor(&self) -> Option<&Node> {
        match &self.decl.kind {
            wiring_model::BindingDeclKind::Binds { sources } if sources.len() == 1 => sources.first(),
            _ => None,
        }
    }
}

/// Aggregated collection binding
#[derive(Debug, Clone)]
pub struct MultiBinding {
    pub kind: CollectionKind,
    /// Ancestor contributions first, then declaration order
    pub contributions: Vec<Contribution>,
    /// `@Multibinds` / `@DeclareList` declarations for this collection
    pub declarations: Vec<MultiDeclaration>,
}

impl MultiBinding {
    /// Explicit `orderDependent` from the innermost `@DeclareList`, if any
    pub fn order_dependent(&self) -> Option<bool> {
        self.declarations.iter().rev().find_map(|d| d.order_dependent)
    }
}

#[derive(Debug, Clone)]
pub enum BindingKind {
    InjectConstructor(Rc<InjectConstructorModel>),
    Provides(Rc<BindingDecl>),
    Alias { decl: Rc<BindingDecl>, source: Node },
    /// First present source wins
    Alternatives { decl: Rc<BindingDecl>, sources: Vec<Node> },
    /// Explicitly absent node
    Empty(Rc<BindingDecl>),
    /// `@BindsInstance` creator input
    Instance { input: String },
    ComponentInstance,
    ComponentDependency { ty: TypeRef },
    ComponentDependencyEntryPoint { dependency: TypeRef, getter: String },
    AssistedInjectFactory(Rc<AssistedFactoryModel>),
    SubComponentCreator { child: GraphId },
    Multi(MultiBinding),
}

/// A resolved way to obtain one node inside one graph
#[derive(Debug)]
pub struct Binding {
    pub id: BindingId,
    /// Hosting graph; dependencies resolve from here
    pub owner: GraphId,
    pub target: Node,
    pub kind: BindingKind,
    pub scope: BindingScope,
    /// Own `@Conditional`s resolved against the owner's variant
    pub presence: Scope,
    pub issues: Vec<Issue>,
}

impl Binding {
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, BindingKind::Alias { .. })
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.kind, BindingKind::Multi(_))
    }

    pub fn is_implicit(&self) -> bool {
        matches!(
            self.kind,
            BindingKind::InjectConstructor(_) | BindingKind::AssistedInjectFactory(_)
        )
    }

    /// Declaring module member, for explicit bindings
    pub fn declaration(&self) -> Option<&MemberRef> {
        match &self.kind {
            BindingKind::Provides(decl)
            | BindingKind::Alias { decl, .. }
            | BindingKind::Alternatives { decl, .. }
            | BindingKind::Empty(decl) => Some(&decl.origin),
            _ => None,
        }
    }

    /// Dependencies declared by the binding itself, without condition
    /// holders; contributions of a multi-binding are flattened in order.
    pub fn own_dependencies(&self) -> Vec<Dependency> {
        match &self.kind {
            BindingKind::InjectConstructor(model) => model.dependencies(),
            BindingKind::Provides(decl) => decl.dependencies(),
            BindingKind::Alias { source, .. } => vec![Dependency::direct(source.clone())],
            BindingKind::Alternatives { sources, .. } => sources
                .iter()
                .map(|node| Dependency {
                    node: node.clone(),
                    kind: DependencyKind::Optional,
                })
                .collect(),
            BindingKind::AssistedInjectFactory(model) => model.dependencies.clone(),
            BindingKind::Multi(multi) => multi
                .contributions
                .iter()
                .flat_map(|c| c.decl.dependencies())
                .collect(),
            BindingKind::Empty(_)
            | BindingKind::Instance { .. }
            | BindingKind::ComponentInstance
            | BindingKind::ComponentDependency { .. }
            | BindingKind::ComponentDependencyEntryPoint { .. }
            | BindingKind::SubComponentCreator { .. } => Vec::new(),
        }
    }

    /// Short human description of where the binding comes from
    pub fn origin(&self) -> String {
        match &self.kind {
            BindingKind::InjectConstructor(_) => "@Inject constructor".to_string(),
            BindingKind::Provides(decl) => format!("@Provides {}", decl.origin),
            BindingKind::Alias { decl, .. } => format!("@Binds {}", decl.origin),
            BindingKind::Alternatives { decl, .. } => format!("@Binds (alternatives) {}", decl.origin),
            BindingKind::Empty(decl) => format!("@Binds (absent) {}", decl.origin),
            BindingKind::Instance { input } => format!("@BindsInstance {input}"),
            BindingKind::ComponentInstance => "component instance".to_string(),
            BindingKind::ComponentDependency { ty } => format!("component dependency {ty}"),
            BindingKind::ComponentDependencyEntryPoint { dependency, getter } => {
                format!("{}::{getter}", dependency.simple_name())
            }
            BindingKind::AssistedInjectFactory(model) => {
                format!("@AssistedFactory for {}", model.target)
            }
            BindingKind::SubComponentCreator { .. } => "child component creator".to_string(),
            BindingKind::Multi(multi) => format!(
                "multi-bound {} with {} contribution(s)",
                multi.kind.type_name(),
                multi.contributions.len()
            ),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.target, self.origin())
    }
}

/// One component placement: a root component, or a child installed into a
/// particular parent
#[derive(Debug)]
pub struct BindingGraph {
    pub(crate) id: GraphId,
    pub(crate) component: Rc<ComponentModel>,
    pub(crate) parent: Option<GraphId>,
    pub(crate) children: Vec<GraphId>,
    pub(crate) variant: Variant,
    pub(crate) condition: Scope,
    /// Module closure minus modules already installed in ancestors
    pub(crate) modules: Vec<Rc<ModuleModel>>,
    pub(crate) local: HashMap<Node, BindingId>,
    /// Explicit bindings in creation order
    pub(crate) local_order: Vec<BindingId>,
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) declarations: Vec<MultiDeclaration>,
    pub(crate) issues: Vec<Issue>,
}

impl BindingGraph {
    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn component(&self) -> &Rc<ComponentModel> {
        &self.component
    }

    pub fn parent(&self) -> Option<GraphId> {
        self.parent
    }

    pub fn children(&self) -> &[GraphId] {
        &self.children
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Conjunction of the ancestors' conditions and this component's own
    pub fn condition(&self) -> &Scope {
        &self.condition
    }

    pub fn modules(&self) -> &[Rc<ModuleModel>] {
        &self.modules
    }

    /// Explicit bindings hosted here, in creation order
    pub fn local_bindings(&self) -> &[BindingId] {
        &self.local_order
    }

    pub fn local_binding(&self, node: &Node) -> Option<BindingId> {
        self.local.get(node).copied()
    }

    /// Structural problems found while building the graph
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

/// A dependency together with the graph it resolves from and the condition
/// under which its presence is required (`None`: no presence requirement).
#[derive(Debug, Clone)]
pub struct GuardedDependency {
    pub dependency: Dependency,
    pub graph: GraphId,
    pub guard: Option<Scope>,
}
