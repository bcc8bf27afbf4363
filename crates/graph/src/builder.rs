use crate::types::*;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use wiring_lang::TypeRef;
use wiring_model::{
    resolve_conditionals, BindingDecl, BindingDeclKind, BindingScope, BindingTarget, ClassBacked,
    CollectionKind, Conditional, ConditionalPresence, CreatorInputKind, Issue, ModelContext, Node,
    Scope, Variant,
};

/// How a module-declared binding fares in a particular graph
enum DeclPresence {
    Present(Scope),
    /// Condition can never hold; excluded but still claims its node
    Never,
    /// `onlyIn` does not match the graph's variant
    Filtered,
}

/// Builds every component placement and its explicit bindings.
///
/// Implicit bindings are not created here; the forest creates them on first
/// lookup.
pub(crate) struct ForestBuilder<'cx> {
    cx: &'cx ModelContext,
    graphs: Vec<BindingGraph>,
    bindings: Vec<Rc<Binding>>,
    /// Never-excluded explicit bindings per graph: node -> origin
    excluded: HashMap<(GraphId, Node), String>,
}

impl<'cx> ForestBuilder<'cx> {
    pub(crate) fn new(cx: &'cx ModelContext) -> Self {
        Self {
            cx,
            graphs: Vec::new(),
            bindings: Vec::new(),
            excluded: HashMap::new(),
        }
    }

    pub(crate) fn build_root(&mut self, component: &TypeRef) -> GraphId {
        self.build_graph(component, None, &[component.clone()])
    }

    pub(crate) fn finish(self) -> (Vec<BindingGraph>, Vec<Rc<Binding>>) {
        (self.graphs, self.bindings)
    }

    fn build_graph(&mut self, ty: &TypeRef, parent: Option<GraphId>, lineage: &[TypeRef]) -> GraphId {
        let cx = self.cx;
        let component = cx.component(ty);
        let id = GraphId(self.graphs.len());
        let mut issues = Vec::new();

        // Phase 1: variant and condition accumulated from the parent
        let (parent_variant, parent_condition) = match parent {
            Some(p) => (self.graphs[p.0].variant.clone(), self.graphs[p.0].condition.clone()),
            None => (Variant::empty(), Scope::Always),
        };
        let variant =
            parent_variant.plus(&Variant::from_flavors(component.own_variant().iter().cloned()));
        let presence = resolve_conditionals(component.conditionals(), &variant);
        missing_dimensions(&mut issues, &presence, &format!("component {ty}"));
        let condition = parent_condition.and(&presence.scope);

        // Phase 2: modules, minus those an ancestor already installs
        let inherited: HashSet<TypeRef> = self
            .lineage(parent)
            .into_iter()
            .flat_map(|g| self.graphs[g.0].modules.iter().map(|m| m.ty().clone()))
            .collect();
        let modules: Vec<_> = match component.module_closure(cx) {
            Ok(closure) => closure
                .iter()
                .filter(|m| !inherited.contains(m.ty()))
                .cloned()
                .collect(),
            Err(err) => {
                issues.push(Issue::error(err.to_string()));
                Vec::new()
            }
        };

        // Phase 3: own multi-binding contributions and declarations
        let mut contributions = Vec::new();
        let mut declarations = Vec::new();
        for module in &modules {
            for decl in module.bindings() {
                let Some(collection) = decl.target.collection_node(cx) else {
                    continue;
                };
                if let DeclPresence::Present(presence) =
                    self.decl_presence(decl, &variant, &mut issues, &component)
                {
                    contributions.push(Contribution {
                        collection,
                        decl: Rc::clone(decl),
                        host: id,
                        presence,
                    });
                }
            }
            declarations.extend(module.multi_declarations().iter().cloned());
        }

        self.graphs.push(BindingGraph {
            id,
            component: Rc::clone(&component),
            parent,
            children: Vec::new(),
            variant,
            condition,
            modules,
            local: HashMap::new(),
            local_order: Vec::new(),
            contributions,
            declarations,
            issues,
        });

        // Phase 4: child placements
        match component.child_components(cx) {
            Ok(children) => {
                for child in children {
                    if let Some(child_id) = self.place_child(id, &child, lineage) {
                        self.graphs[id.0].children.push(child_id);
                    }
                }
            }
            Err(err) => self.graphs[id.0].issues.push(Issue::error(err.to_string())),
        }

        // Phase 5: explicit bindings
        self.populate(id);

        log::debug!(
            "Built graph for {} ({} explicit bindings, {} children, variant {})",
            ty,
            self.graphs[id.0].local_order.len(),
            self.graphs[id.0].children.len(),
            self.graphs[id.0].variant
        );
        id
    }

    fn place_child(&mut self, parent: GraphId, child: &TypeRef, lineage: &[TypeRef]) -> Option<GraphId> {
        if lineage.contains(child) {
            let path: Vec<&str> = lineage
                .iter()
                .chain(std::iter::once(child))
                .map(|t| t.simple_name())
                .collect();
            self.graphs[parent.0].issues.push(Issue::error(format!(
                "component hierarchy loop: {}",
                path.join(" -> ")
            )));
            return None;
        }
        if self.cx.component(child).is_root() {
            let parent_ty = self.graphs[parent.0].component.ty().clone();
            self.graphs[parent.0].issues.push(Issue::error(format!(
                "root component {child} cannot be installed as a child of {parent_ty}"
            )));
            return None;
        }

        let mut child_lineage = lineage.to_vec();
        child_lineage.push(child.clone());
        Some(self.build_graph(child, Some(parent), &child_lineage))
    }

    fn populate(&mut self, id: GraphId) {
        let cx = self.cx;
        let component = Rc::clone(&self.graphs[id.0].component);
        let modules = self.graphs[id.0].modules.clone();
        let variant = self.graphs[id.0].variant.clone();
        let children = self.graphs[id.0].children.clone();

        self.add(
            id,
            cx.node(component.ty(), None),
            BindingKind::ComponentInstance,
            Scope::Always,
            Vec::new(),
        );

        if let Some(creator) = component.creator() {
            for input in creator.inputs() {
                if let CreatorInputKind::Instance(node) = &input.kind {
                    self.add(
                        id,
                        node.clone(),
                        BindingKind::Instance {
                            input: input.name.clone(),
                        },
                        Scope::Always,
                        Vec::new(),
                    );
                }
            }
        }

        for dependency in component.dependencies() {
            self.add(
                id,
                cx.node(&dependency.ty, None),
                BindingKind::ComponentDependency {
                    ty: dependency.ty.clone(),
                },
                Scope::Always,
                Vec::new(),
            );
            for (getter, node) in &dependency.exposed {
                self.add(
                    id,
                    node.clone(),
                    BindingKind::ComponentDependencyEntryPoint {
                        dependency: dependency.ty.clone(),
                        getter: getter.clone(),
                    },
                    Scope::Always,
                    Vec::new(),
                );
            }
        }

        for module in &modules {
            for decl in module.bindings() {
                if !decl.target.node().is_valid() {
                    let issues = declaration_issues(decl);
                    self.graphs[id.0].issues.extend(issues);
                    continue;
                }
                if decl.target.is_contribution() {
                    continue;
                }
                let mut issues = Vec::new();
                let presence = self.decl_presence(decl, &variant, &mut issues, &component);
                self.graphs[id.0].issues.extend(issues);
                match presence {
                    DeclPresence::Present(scope) => self.add_declared(id, decl, scope),
                    DeclPresence::Never => self.claim_excluded(id, decl),
                    DeclPresence::Filtered => {}
                }
            }
        }

        for child in children {
            let child_component = Rc::clone(&self.graphs[child.0].component);
            if let Some(creator) = child_component.creator() {
                self.add(
                    id,
                    cx.node(creator.ty(), None),
                    BindingKind::SubComponentCreator { child },
                    Scope::Always,
                    Vec::new(),
                );
            }
        }

        self.populate_multibindings(id);
    }

    fn add_declared(&mut self, id: GraphId, decl: &Rc<BindingDecl>, presence: Scope) {
        let kind = match &decl.kind {
            BindingDeclKind::Provides { .. } => BindingKind::Provides(Rc::clone(decl)),
            BindingDeclKind::Binds { sources } => match sources.as_slice() {
                [] => BindingKind::Empty(Rc::clone(decl)),
                [source] => BindingKind::Alias {
                    decl: Rc::clone(decl),
                    source: source.clone(),
                },
                _ => BindingKind::Alternatives {
                    decl: Rc::clone(decl),
                    sources: sources.clone(),
                },
            },
        };
        self.add_scoped(
            id,
            decl.target.node().clone(),
            kind,
            decl.scope.clone(),
            presence,
            declaration_issues(decl),
        );
    }

    fn populate_multibindings(&mut self, id: GraphId) {
        let mut collections: Vec<Node> = Vec::new();
        let graph = &self.graphs[id.0];
        for node in graph
            .contributions
            .iter()
            .map(|c| &c.collection)
            .chain(graph.declarations.iter().map(|d| &d.collection))
        {
            if !collections.contains(node) {
                collections.push(node.clone());
            }
        }

        let lineage = self.lineage(Some(id));
        for collection in collections {
            let mut contributions: Vec<Contribution> = Vec::new();
            let mut declarations = Vec::new();
            for g in &lineage {
                let graph = &self.graphs[g.0];
                for contribution in graph.contributions.iter().filter(|c| c.collection == collection) {
                    let duplicate_alias = contribution.anchor().is_some_and(|anchor| {
                        contributions.iter().any(|seen| seen.anchor() == Some(anchor))
                    });
                    if duplicate_alias {
                        log::trace!("Dropping duplicate alias contribution {}", contribution.decl.origin);
                        continue;
                    }
                    contributions.push(contribution.clone());
                }
                declarations.extend(
                    graph
                        .declarations
                        .iter()
                        .filter(|d| d.collection == collection)
                        .cloned(),
                );
            }

            let issues = contributions
                .iter()
                .filter(|c| c.host == id)
                .flat_map(|c| declaration_issues(&c.decl))
                .collect();
            let kind = CollectionKind::of_type(collection.ty()).unwrap_or(CollectionKind::List);
            self.add(
                id,
                collection,
                BindingKind::Multi(MultiBinding {
                    kind,
                    contributions,
                    declarations,
                }),
                Scope::Always,
                issues,
            );
        }
    }

    fn decl_presence(
        &self,
        decl: &BindingDecl,
        variant: &Variant,
        issues: &mut Vec<Issue>,
        component: &wiring_model::ComponentModel,
    ) -> DeclPresence {
        let presence = resolve_conditionals(&decl.conditionals, variant);
        missing_dimensions(issues, &presence, &decl.origin.to_string());
        if presence.variant_excluded {
            log::trace!("{} filtered out of {} by variant", decl.origin, component.ty());
            return DeclPresence::Filtered;
        }
        if self.cx.solver().contradiction(&presence.scope) {
            let mut message = format!(
                "{} is excluded from {}: its condition {} can never be satisfied",
                decl.origin,
                component.ty(),
                presence.scope
            );
            if let Some(fallback) = self.implicit_fallback(decl) {
                message.push_str(&format!("; {} is provided by {fallback} instead", decl.target));
            }
            issues.push(Issue::warning(message));
            return DeclPresence::Never;
        }
        DeclPresence::Present(presence.scope)
    }

    /// Implicit binding that lookups reach once an explicit one is excluded
    fn implicit_fallback(&self, decl: &BindingDecl) -> Option<&'static str> {
        let BindingTarget::Plain(node) = &decl.target else {
            return None;
        };
        if !node.is_valid() || node.qualifier().is_some() {
            return None;
        }
        if self.cx.inject_constructor(node.ty()).is_some() {
            Some("its @Inject constructor")
        } else if self.cx.assisted_factory(node.ty()).is_some() {
            Some("its @AssistedFactory")
        } else {
            None
        }
    }

    fn claim_excluded(&mut self, id: GraphId, decl: &BindingDecl) {
        let node = decl.target.node().clone();
        if let Some(existing) = self.graphs[id.0].local.get(&node) {
            let existing = &self.bindings[existing.0];
            let issue = conflict(&node, &existing.origin(), &excluded_origin(decl));
            self.graphs[id.0].issues.push(issue);
            return;
        }
        self.excluded.insert((id, node), excluded_origin(decl));
    }

    fn add(&mut self, id: GraphId, target: Node, kind: BindingKind, presence: Scope, issues: Vec<Issue>) {
        self.add_scoped(id, target, kind, BindingScope::Unscoped, presence, issues);
    }

    /// Registers an explicit binding, unless it conflicts with one already
    /// bound for the same node in this graph or an ancestor.
    fn add_scoped(
        &mut self,
        id: GraphId,
        target: Node,
        kind: BindingKind,
        scope: BindingScope,
        presence: Scope,
        issues: Vec<Issue>,
    ) {
        let binding = Binding {
            id: BindingId(self.bindings.len()),
            owner: id,
            target,
            kind,
            scope,
            presence,
            issues,
        };

        if let Some(&existing) = self.graphs[id.0].local.get(&binding.target) {
            let existing = &self.bindings[existing.0];
            if same_alias(existing, &binding) {
                log::trace!("Dropping duplicate alias {binding}");
                return;
            }
            let issue = conflict(&binding.target, &existing.origin(), &binding.origin());
            self.graphs[id.0].issues.push(issue);
            return;
        }
        if let Some(origin) = self.excluded.get(&(id, binding.target.clone())) {
            let issue = conflict(&binding.target, origin, &binding.origin());
            self.graphs[id.0].issues.push(issue);
        }
        if !binding.is_multi() {
            for ancestor in self.lineage(self.graphs[id.0].parent) {
                let Some(&existing) = self.graphs[ancestor.0].local.get(&binding.target) else {
                    continue;
                };
                let existing = &self.bindings[existing.0];
                if existing.is_multi() || same_alias(existing, &binding) {
                    continue;
                }
                let issue = Issue::error(format!(
                    "{} in {} conflicts with {} bound in parent {}",
                    binding,
                    self.graphs[id.0].component.ty(),
                    existing.origin(),
                    self.graphs[ancestor.0].component.ty()
                ));
                self.graphs[id.0].issues.push(issue);
                return;
            }
        }

        let binding_id = binding.id;
        let graph = &mut self.graphs[id.0];
        graph.local.insert(binding.target.clone(), binding_id);
        graph.local_order.push(binding_id);
        self.bindings.push(Rc::new(binding));
    }

    /// `graph` and its ancestors, root first
    fn lineage(&self, graph: Option<GraphId>) -> Vec<GraphId> {
        let mut chain = Vec::new();
        let mut current = graph;
        while let Some(id) = current {
            chain.push(id);
            current = self.graphs[id.0].parent;
        }
        chain.reverse();
        chain
    }
}

fn same_alias(a: &Binding, b: &Binding) -> bool {
    match (&a.kind, &b.kind) {
        (BindingKind::Alias { source: x, .. }, BindingKind::Alias { source: y, .. }) => {
            x == y && a.target == b.target
        }
        _ => false,
    }
}

fn conflict(node: &Node, first: &str, second: &str) -> Issue {
    Issue::error(format!("conflicting bindings for {node}: {first} and {second}"))
}

fn excluded_origin(decl: &BindingDecl) -> String {
    format!("{} (excluded by its condition)", decl.origin)
}

/// Declaration problems plus problems of the features it is conditional on
pub(crate) fn declaration_issues(decl: &BindingDecl) -> Vec<Issue> {
    let mut issues = decl.issues.clone();
    issues.extend(conditional_issues(&decl.conditionals));
    issues
}

pub(crate) fn conditional_issues(conditionals: &[Conditional]) -> Vec<Issue> {
    conditionals.iter().flat_map(|c| c.issues()).collect()
}

pub(crate) fn missing_dimensions(issues: &mut Vec<Issue>, presence: &ConditionalPresence, subject: &str) {
    for dimension in &presence.missing_dimensions {
        issues.push(Issue::error(format!(
            "{subject} is filtered by flavors of dimension {dimension}, which the component variant does not specify"
        )));
    }
}
