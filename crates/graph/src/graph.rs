use crate::builder::{conditional_issues, missing_dimensions, ForestBuilder};
use crate::error::{GraphError, Result};
use crate::multibinding::ContributionOrder;
use crate::types::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wiring_lang::TypeRef;
use wiring_model::{
    instance_holders, resolve_conditionals, BindingScope, ClassBacked, Conditional, Dependency,
    Issue, Memo, ModelContext, Node, Scope,
};

/// Tuning knobs for forest construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestOptions {
    /// Whether lists without an explicit `@DeclareList(orderDependent)` are
    /// sorted by inter-element dependencies
    pub order_lists_by_default: bool,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            order_lists_by_default: true,
        }
    }
}

/// Every binding graph of one pass: a tree per root component.
///
/// Graph shapes and explicit bindings are fixed at construction. Implicit
/// bindings, binding conditions and list orders are computed on first request
/// and cached, so a forest is cheap to build even for large declaration sets.
pub struct GraphForest<'cx> {
    cx: &'cx ModelContext,
    options: ForestOptions,
    graphs: Vec<BindingGraph>,
    roots: Vec<GraphId>,
    bindings: RefCell<Vec<Rc<Binding>>>,
    implicit: RefCell<HashMap<(GraphId, Node), BindingId>>,
    resolved: RefCell<HashMap<(GraphId, Node), Option<BindingId>>>,
    conditions: RefCell<HashMap<BindingId, Rc<Memo<Scope>>>>,
    pub(crate) orders: RefCell<HashMap<BindingId, Rc<ContributionOrder>>>,
}

impl<'cx> GraphForest<'cx> {
    /// Builds graphs for every declared root component
    pub fn build(cx: &'cx ModelContext) -> Self {
        Self::build_with(cx, ForestOptions::default())
    }

    pub fn build_with(cx: &'cx ModelContext, options: ForestOptions) -> Self {
        let roots = cx.root_components();
        Self::assemble(cx, &roots, options)
    }

    /// Builds graphs for the given roots only
    pub fn build_from_roots(cx: &'cx ModelContext, roots: &[TypeRef], options: ForestOptions) -> Result<Self> {
        for root in roots {
            if !cx.component(root).is_root() {
                return Err(GraphError::NotAComponent(root.to_string()));
            }
        }
        Ok(Self::assemble(cx, roots, options))
    }

    fn assemble(cx: &'cx ModelContext, roots: &[TypeRef], options: ForestOptions) -> Self {
        let mut builder = ForestBuilder::new(cx);
        let root_ids: Vec<GraphId> = roots.iter().map(|ty| builder.build_root(ty)).collect();
        let (graphs, bindings) = builder.finish();

        log::info!(
            "Built {} binding graph(s) for {} root component(s), {} explicit bindings",
            graphs.len(),
            root_ids.len(),
            bindings.len()
        );

        Self {
            cx,
            options,
            graphs,
            roots: root_ids,
            bindings: RefCell::new(bindings),
            implicit: RefCell::new(HashMap::new()),
            resolved: RefCell::new(HashMap::new()),
            conditions: RefCell::new(HashMap::new()),
            orders: RefCell::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &'cx ModelContext {
        self.cx
    }

    pub fn options(&self) -> ForestOptions {
        self.options
    }

    pub fn roots(&self) -> &[GraphId] {
        &self.roots
    }

    pub fn graph(&self, id: GraphId) -> &BindingGraph {
        &self.graphs[id.0]
    }

    /// All graphs, parents before their children
    pub fn graphs(&self) -> &[BindingGraph] {
        &self.graphs
    }

    pub fn binding(&self, id: BindingId) -> Rc<Binding> {
        Rc::clone(&self.bindings.borrow()[id.0])
    }

    /// Number of bindings created so far, implicit ones included
    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    /// `graph` followed by its ancestors, innermost first
    pub fn ancestry(&self, graph: GraphId) -> Vec<GraphId> {
        let mut chain = vec![graph];
        let mut current = self.graphs[graph.0].parent;
        while let Some(id) = current {
            chain.push(id);
            current = self.graphs[id.0].parent;
        }
        chain
    }

    /// Component names from the root down to `graph`
    pub fn graph_path(&self, graph: GraphId) -> Vec<String> {
        let mut path: Vec<String> = self
            .ancestry(graph)
            .into_iter()
            .map(|g| self.graphs[g.0].component.ty().to_string())
            .collect();
        path.reverse();
        path
    }

    /// Explicit bindings of `graph` followed by implicit bindings created in
    /// it so far, each group in creation order
    pub fn bindings_hosted_in(&self, graph: GraphId) -> Vec<BindingId> {
        let mut hosted = self.graphs[graph.0].local_order.clone();
        let mut implicit: Vec<BindingId> = self
            .implicit
            .borrow()
            .iter()
            .filter(|((host, _), _)| *host == graph)
            .map(|(_, id)| *id)
            .collect();
        implicit.sort();
        hosted.extend(implicit);
        hosted
    }

    /// The binding that supplies `node` when requested from `graph`.
    ///
    /// Explicit bindings are searched from the innermost graph outwards.
    /// Unqualified nodes then fall back to an `@Inject` constructor, then to
    /// an `@AssistedFactory`.
    pub fn resolve(&self, graph: GraphId, node: &Node) -> Option<BindingId> {
        let key = (graph, node.clone());
        if let Some(cached) = self.resolved.borrow().get(&key) {
            return *cached;
        }
        let found = self.lookup(graph, node);
        self.resolved.borrow_mut().insert(key, found);
        found
    }

    fn lookup(&self, graph: GraphId, node: &Node) -> Option<BindingId> {
        for g in self.ancestry(graph) {
            if let Some(id) = self.graphs[g.0].local_binding(node) {
                return Some(id);
            }
        }
        if !node.is_valid() || node.qualifier().is_some() {
            return None;
        }

        if let Some(model) = self.cx.inject_constructor(node.ty()) {
            let mut issues = model.issues.clone();
            let host = match &model.scope {
                BindingScope::Cached(scopes) => match self.scope_host(graph, scopes) {
                    Some(host) => host,
                    None => {
                        issues.push(Issue::error(format!(
                            "no component in {} declares scope {} required by {}",
                            self.graph_path(graph).join(" > "),
                            model.scope,
                            node
                        )));
                        graph
                    }
                },
                BindingScope::Unscoped | BindingScope::Reusable => graph,
            };
            let conditionals = model.conditionals.clone();
            return Some(self.implicit_binding(
                host,
                node,
                BindingKind::InjectConstructor(Rc::clone(&model)),
                model.scope.clone(),
                &conditionals,
                issues,
            ));
        }

        if let Some(model) = self.cx.assisted_factory(node.ty()) {
            let conditionals = model.conditionals.clone();
            let issues = model.issues.clone();
            return Some(self.implicit_binding(
                graph,
                node,
                BindingKind::AssistedInjectFactory(model),
                BindingScope::Unscoped,
                &conditionals,
                issues,
            ));
        }
        None
    }

    /// Nearest graph, innermost first, whose component declares one of
    /// `scopes`
    fn scope_host(&self, graph: GraphId, scopes: &[wiring_lang::Annotation]) -> Option<GraphId> {
        self.ancestry(graph).into_iter().find(|g| {
            let declared = self.graphs[g.0].component.scopes();
            scopes.iter().any(|s| declared.contains(s))
        })
    }

    fn implicit_binding(
        &self,
        host: GraphId,
        node: &Node,
        kind: BindingKind,
        scope: BindingScope,
        conditionals: &[Conditional],
        mut issues: Vec<Issue>,
    ) -> BindingId {
        let key = (host, node.clone());
        if let Some(&id) = self.implicit.borrow().get(&key) {
            return id;
        }

        let presence = resolve_conditionals(conditionals, &self.graphs[host.0].variant);
        missing_dimensions(&mut issues, &presence, &node.to_string());
        issues.extend(conditional_issues(conditionals));
        let presence = if presence.variant_excluded {
            Scope::Never
        } else {
            presence.scope
        };

        let mut bindings = self.bindings.borrow_mut();
        let id = BindingId(bindings.len());
        bindings.push(Rc::new(Binding {
            id,
            owner: host,
            target: node.clone(),
            kind,
            scope,
            presence,
            issues,
        }));
        self.implicit.borrow_mut().insert(key, id);
        log::trace!("Created implicit binding for {} in {}", node, self.graphs[host.0].component.ty());
        id
    }

    /// Condition under which the binding is present, relative to its owner
    /// graph. Cyclic alias chains evaluate to `Always`; the validator reports
    /// the loop itself.
    pub fn condition_of(&self, id: BindingId) -> Scope {
        let memo = Rc::clone(
            self.conditions
                .borrow_mut()
                .entry(id)
                .or_insert_with(|| Rc::new(Memo::new("binding condition"))),
        );
        match memo.get_or_compute(|| self.compute_condition(id)) {
            Ok(scope) => scope.clone(),
            Err(err) => {
                log::debug!("{err} for {}", self.binding(id));
                Scope::Always
            }
        }
    }

    fn compute_condition(&self, id: BindingId) -> Scope {
        let binding = self.binding(id);
        match &binding.kind {
            BindingKind::Alias { source, .. } => match self.resolve(binding.owner, source) {
                Some(source) => binding.presence.and(&self.condition_of(source)),
                None => binding.presence.clone(),
            },
            BindingKind::Alternatives { sources, .. } => {
                let any = Scope::any(
                    sources
                        .iter()
                        .filter_map(|s| self.resolve(binding.owner, s))
                        .map(|s| self.condition_of(s))
                        .collect::<Vec<_>>(),
                );
                binding.presence.and(&any)
            }
            BindingKind::Empty(_) => Scope::Never,
            BindingKind::SubComponentCreator { child } => self.graphs[child.0].condition.clone(),
            _ => binding.presence.clone(),
        }
    }

    /// Condition a consumer must check at runtime before using the binding:
    /// `Always` when the owner graph's condition already implies it.
    pub fn runtime_condition(&self, id: BindingId) -> Scope {
        let binding = self.binding(id);
        let condition = self.condition_of(id);
        let graph_condition = &self.graphs[binding.owner.0].condition;
        if self.cx.solver().implies(graph_condition, &condition) {
            Scope::Always
        } else {
            self.cx.solver().minimize(&condition)
        }
    }

    /// Every dependency of a binding with the graph it resolves from.
    ///
    /// Aliases carry no presence requirement: their condition follows the
    /// source. Instance holders of the binding's own conditions are added as
    /// plain dependencies.
    pub fn dependencies(&self, id: BindingId) -> Vec<GuardedDependency> {
        let binding = self.binding(id);
        let owner = binding.owner;
        let mut result = Vec::new();

        match &binding.kind {
            BindingKind::Multi(multi) => {
                for contribution in &multi.contributions {
                    let guard = (!contribution.decl.is_alias()).then(|| {
                        self.graphs[contribution.host.0]
                            .condition
                            .and(&contribution.presence)
                    });
                    for dependency in contribution.decl.dependencies() {
                        result.push(GuardedDependency {
                            dependency,
                            graph: contribution.host,
                            guard: guard.clone(),
                        });
                    }
                    self.push_holders(&mut result, &contribution.presence, contribution.host);
                }
            }
            BindingKind::Alias { .. } | BindingKind::Alternatives { .. } => {
                result.extend(binding.own_dependencies().into_iter().map(|dependency| {
                    GuardedDependency {
                        dependency,
                        graph: owner,
                        guard: None,
                    }
                }));
            }
            _ => {
                let guard = self.graphs[owner.0].condition.and(&self.condition_of(id));
                result.extend(binding.own_dependencies().into_iter().map(|dependency| {
                    GuardedDependency {
                        dependency,
                        graph: owner,
                        guard: Some(guard.clone()),
                    }
                }));
            }
        }

        self.push_holders(&mut result, &binding.presence, owner);
        result
    }

    fn push_holders(&self, result: &mut Vec<GuardedDependency>, scope: &Scope, graph: GraphId) {
        for holder in instance_holders(scope) {
            result.push(GuardedDependency {
                dependency: Dependency::direct(self.cx.node(&holder, None)),
                graph,
                guard: None,
            });
        }
    }
}
