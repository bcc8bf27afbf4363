use crate::cache::Interner;
use crate::binding::BindingScope;
use crate::component::ComponentModel;
use crate::condition::{ConditionModel, ConditionRef, Conditional, FeatureModel};
use crate::implicit::{AssistedFactoryModel, InjectConstructorModel};
use crate::module::ModuleModel;
use crate::node::{Dependency, DependencyKind, Node, NodeModel};
use crate::variant::FlavorModel;
use std::rc::Rc;
use wiring_lang::{names, Annotated, Annotation, BuiltinAnnotations, TypeOracle, TypeRef};
use wiring_logic::Solver;

/// Arena for one processing pass.
///
/// Owns the type oracle and every interned model. Dropping the context
/// releases all models, so nothing leaks between passes.
pub struct ModelContext {
    oracle: Box<dyn TypeOracle>,
    solver: Solver<ConditionRef>,
    nodes: Interner<(TypeRef, Option<Annotation>), NodeModel>,
    conditions: Interner<(TypeRef, Vec<String>), ConditionModel>,
    features: Interner<TypeRef, FeatureModel>,
    flavors: Interner<TypeRef, FlavorModel>,
    modules: Interner<TypeRef, ModuleModel>,
    components: Interner<TypeRef, ComponentModel>,
    inject_constructors: Interner<TypeRef, Option<Rc<InjectConstructorModel>>>,
    assisted_factories: Interner<TypeRef, Option<Rc<AssistedFactoryModel>>>,
}

impl ModelContext {
    pub fn new(oracle: impl TypeOracle + 'static) -> Self {
        Self {
            oracle: Box::new(oracle),
            solver: Solver::new(),
            nodes: Interner::new(),
            conditions: Interner::new(),
            features: Interner::new(),
            flavors: Interner::new(),
            modules: Interner::new(),
            components: Interner::new(),
            inject_constructors: Interner::new(),
            assisted_factories: Interner::new(),
        }
    }

    pub fn oracle(&self) -> &dyn TypeOracle {
        self.oracle.as_ref()
    }

    /// Shared solver; its memo table lives as long as the pass
    pub fn solver(&self) -> &Solver<ConditionRef> {
        &self.solver
    }

    /// Interned node for (type, qualifier). `void` is not injectable and maps
    /// to the invalid placeholder.
    pub fn node(&self, ty: &TypeRef, qualifier: Option<Annotation>) -> Node {
        if ty.is_void() {
            return self.invalid_node();
        }
        let key = (ty.clone(), qualifier);
        let model = self
            .nodes
            .get_or_create(&key, || NodeModel::new(key.0.clone(), key.1.clone()));
        Node::from_model(model)
    }

    pub fn invalid_node(&self) -> Node {
        self.node(&TypeRef::error("void is not injectable"), None)
    }

    /// Node and request kind of a declared dependency, unwrapping `Lazy`,
    /// `Provider` and `Optional` (itself optionally around `Lazy`/`Provider`).
    pub fn dependency(&self, ty: &TypeRef, annotations: &[Annotation]) -> Dependency {
        let (inner, kind) = if let Some(optional) = ty.unwrap(names::OPTIONAL) {
            if let Some(inner) = optional.unwrap(names::LAZY) {
                (inner, DependencyKind::OptionalLazy)
            } else if let Some(inner) = optional.unwrap(names::PROVIDER) {
                (inner, DependencyKind::OptionalProvider)
            } else {
                (optional, DependencyKind::Optional)
            }
        } else if let Some(inner) = ty.unwrap(names::LAZY) {
            (inner, DependencyKind::Lazy)
        } else if let Some(inner) = ty.unwrap(names::PROVIDER) {
            (inner, DependencyKind::Provider)
        } else {
            (ty, DependencyKind::Direct)
        };

        Dependency {
            node: self.node(inner, self.qualifier_among(annotations)),
            kind,
        }
    }

    /// First qualifier annotation: `@Named` or any annotation whose class is
    /// meta-annotated with `@Qualifier`
    pub fn qualifier_of(&self, decl: &(impl Annotated + ?Sized)) -> Option<Annotation> {
        self.qualifier_among(decl.annotations())
    }

    fn qualifier_among(&self, annotations: &[Annotation]) -> Option<Annotation> {
        annotations
            .iter()
            .find(|ann| ann.class == names::NAMED || self.is_meta_annotated(ann, names::QUALIFIER))
            .cloned()
    }

    fn is_meta_annotated(&self, annotation: &Annotation, meta: &str) -> bool {
        self.oracle
            .declaration(&annotation.class)
            .is_some_and(|decl| decl.has_annotation(meta))
    }

    pub fn binding_scope(&self, decl: &(impl Annotated + ?Sized)) -> BindingScope {
        if decl.has_annotation(names::REUSABLE) {
            return BindingScope::Reusable;
        }
        let scopes: Vec<Annotation> = decl
            .annotations()
            .iter()
            .filter(|ann| self.is_meta_annotated(ann, names::SCOPE))
            .cloned()
            .collect();
        if scopes.is_empty() {
            BindingScope::Unscoped
        } else {
            BindingScope::Cached(scopes)
        }
    }

    pub fn condition(&self, holder: &TypeRef, path: &[String]) -> ConditionRef {
        let key = (holder.clone(), path.to_vec());
        let model = self
            .conditions
            .get_or_create(&key, || ConditionModel::resolve(self.oracle(), holder, path));
        ConditionRef::from_model(model)
    }

    /// Placeholder variable standing for a condition that failed to parse or
    /// resolve
    pub fn invalid_condition(&self, reason: &str) -> ConditionRef {
        let key = (TypeRef::error(reason), Vec::new());
        let model = self
            .conditions
            .get_or_create(&key, || ConditionModel::invalid(reason));
        ConditionRef::from_model(model)
    }

    pub fn feature(&self, ty: &TypeRef) -> Rc<FeatureModel> {
        self.features.get_or_create(ty, || FeatureModel::build(self, ty))
    }

    pub fn flavor(&self, ty: &TypeRef) -> Rc<FlavorModel> {
        self.flavors.get_or_create(ty, || FlavorModel::build(self, ty))
    }

    pub fn conditionals(&self, decl: &(impl Annotated + ?Sized)) -> Vec<Conditional> {
        decl.conditional_annotations()
            .iter()
            .map(|c| Conditional::build(self, &c.features, &c.only_in))
            .collect()
    }

    pub fn module(&self, ty: &TypeRef) -> Rc<ModuleModel> {
        self.modules.get_or_create(ty, || ModuleModel::build(self, ty))
    }

    pub fn component(&self, ty: &TypeRef) -> Rc<ComponentModel> {
        self.components.get_or_create(ty, || ComponentModel::build(self, ty))
    }

    pub fn inject_constructor(&self, ty: &TypeRef) -> Option<Rc<InjectConstructorModel>> {
        let model = self
            .inject_constructors
            .get_or_create(ty, || InjectConstructorModel::build(self, ty).map(Rc::new));
        Option::clone(&model)
    }

    pub fn assisted_factory(&self, ty: &TypeRef) -> Option<Rc<AssistedFactoryModel>> {
        let model = self
            .assisted_factories
            .get_or_create(ty, || AssistedFactoryModel::build(self, ty).map(Rc::new));
        Option::clone(&model)
    }

    /// Declared components with `isRoot = true`, sorted by name
    pub fn root_components(&self) -> Vec<TypeRef> {
        self.oracle
            .declared_names()
            .into_iter()
            .filter_map(|name| self.oracle.declaration(&name))
            .filter(|decl| decl.component_annotation().is_some_and(|c| c.is_root))
            .map(|decl| decl.as_type())
            .collect()
    }

    /// Number of interned nodes; used by tests and debug logging
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

