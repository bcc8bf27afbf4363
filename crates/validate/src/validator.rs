use crate::diagnostic::{Collector, Diagnostic, DiagnosticSink, ValidationReport};
use crate::encounter::{EncounterGraph, Entity};
use crate::error::Result;
use crate::options::ValidationOptions;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use wiring_graph::{Binding, BindingGraph, BindingId, BindingKind, GraphForest, GraphId, GuardedDependency};
use wiring_lang::TypeRef;
use wiring_model::{
    BindingScope, BindingTarget, ClassBacked, CollectionKind, CreatorInputKind, Dependency, Issue,
    MapKey, MemberRef, ModelContext, Node, Scope, Severity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Validated,
}

/// Validates every graph of the forest and collects the diagnostics,
/// grouped by message.
pub fn validate(forest: &GraphForest<'_>, options: &ValidationOptions) -> ValidationReport {
    let mut collector = Collector::new();
    validate_into(forest, options, &mut collector);
    collector.into_report()
}

/// Builds the forest of the given root components and validates it.
///
/// Fails when the options are inconsistent or a root is not a root component.
pub fn validate_roots(cx: &ModelContext, roots: &[TypeRef], options: &ValidationOptions) -> Result<ValidationReport> {
    options.validate()?;
    let forest = GraphForest::build_from_roots(cx, roots, options.forest_options())?;
    Ok(validate(&forest, options))
}

/// Validates every graph of the forest, reporting each problem to `sink` as
/// it is resolved into encounter paths.
pub fn validate_into(forest: &GraphForest<'_>, options: &ValidationOptions, sink: &mut dyn DiagnosticSink) {
    let mut validator = Validator::new(forest, options);
    validator.run();
    validator.flush(sink);
}

struct Validator<'f, 'cx> {
    forest: &'f GraphForest<'cx>,
    options: &'f ValidationOptions,
    encounters: EncounterGraph,
    /// Absent means unvisited
    states: HashMap<BindingId, VisitState>,
    /// Bindings being validated, outermost first
    stack: Vec<BindingId>,
    /// Targets of `Lazy` / `Provider` edges, validated on a fresh stack
    deferred: VecDeque<BindingId>,
    /// Reported loops, rotated to start at their smallest binding
    loops: HashSet<Vec<BindingId>>,
    missing: HashSet<Entity>,
    pending: Vec<(Entity, Issue)>,
}

impl<'f, 'cx> Validator<'f, 'cx> {
    fn new(forest: &'f GraphForest<'cx>, options: &'f ValidationOptions) -> Self {
        Self {
            forest,
            options,
            encounters: EncounterGraph::new(),
            states: HashMap::new(),
            stack: Vec::new(),
            deferred: VecDeque::new(),
            loops: HashSet::new(),
            missing: HashSet::new(),
            pending: Vec::new(),
        }
    }

    fn run(&mut self) {
        let forest = self.forest;

        // Phase 1: everything reachable from entry points and injectors
        for graph in forest.graphs() {
            let entity = self.enter_graph(graph);
            self.check_graph(graph);
            let guard = Some(graph.condition().clone());

            for (i, entry_point) in graph.component().entry_points().iter().enumerate() {
                let from = Entity::EntryPoint(graph.id(), i);
                self.encounters.add(&from, || entry_point.to_string());
                self.encounters.record(&entity, &from);
                self.visit_dependency(
                    &from,
                    GuardedDependency {
                        dependency: entry_point.dependency.clone(),
                        graph: graph.id(),
                        guard: guard.clone(),
                    },
                );
                self.drain_deferred();
            }

            for (i, injector) in graph.component().members_injectors().iter().enumerate() {
                let from = Entity::MembersInjector(graph.id(), i);
                self.encounters.add(&from, || injector.to_string());
                self.encounters.record(&entity, &from);
                for member in &injector.members {
                    self.visit_dependency(
                        &from,
                        GuardedDependency {
                            dependency: member.dependency.clone(),
                            graph: graph.id(),
                            guard: guard.clone(),
                        },
                    );
                }
                self.drain_deferred();
            }
            log::debug!("Validated entry points of {}", graph.component().ty());
        }

        // Phase 2: instance inputs nothing asked for
        for graph in forest.graphs() {
            for &id in graph.local_bindings() {
                let binding = forest.binding(id);
                if let BindingKind::Instance { input } = &binding.kind {
                    if !self.states.contains_key(&id) {
                        self.pending.push((
                            Entity::Graph(graph.id()),
                            Issue::mandatory_warning(format!(
                                "@BindsInstance input {input} of {} is never used",
                                graph.component().ty()
                            )),
                        ));
                    }
                }
            }
        }

        // Phase 3: explicit bindings no entry point reaches
        for graph in forest.graphs() {
            let entity = Entity::Graph(graph.id());
            for &id in graph.local_bindings() {
                if self.states.contains_key(&id) {
                    continue;
                }
                self.register_binding(id);
                self.encounters.record(&entity, &Entity::Binding(id));
                self.visit_binding(id);
                self.drain_deferred();
            }
        }
    }

    fn enter_graph(&mut self, graph: &BindingGraph) -> Entity {
        let entity = Entity::Graph(graph.id());
        self.encounters
            .add(&entity, || graph.component().ty().to_string());
        if let Some(parent) = graph.parent() {
            self.encounters.record(&Entity::Graph(parent), &entity);
        }
        entity
    }

    fn register_binding(&mut self, id: BindingId) {
        let forest = self.forest;
        self.encounters
            .add(&Entity::Binding(id), || forest.binding(id).to_string());
    }

    fn drain_deferred(&mut self) {
        while let Some(id) = self.deferred.pop_front() {
            self.stack.clear();
            self.visit_binding(id);
        }
    }

    fn visit_dependency(&mut self, from: &Entity, request: GuardedDependency) {
        let GuardedDependency {
            dependency,
            graph,
            guard,
        } = request;
        let optional = dependency.kind.is_optional();

        if !dependency.node.is_valid() {
            if !optional {
                let requester = self.label(from);
                self.pending.push((
                    from.clone(),
                    Issue::error(format!("{requester} depends on an unresolved type")),
                ));
            }
            return;
        }

        let Some(id) = self.forest.resolve(graph, &dependency.node) else {
            if !optional {
                self.report_missing(from, graph, &dependency.node);
            }
            return;
        };

        self.register_binding(id);
        self.encounters.record(from, &Entity::Binding(id));
        if let (Some(guard), false) = (&guard, optional) {
            self.check_condition(from, &dependency, guard, id);
        }
        if dependency.kind.is_deferred() {
            self.deferred.push_back(id);
            return;
        }
        self.visit_binding(id);
    }

    fn visit_binding(&mut self, id: BindingId) {
        match self.states.get(&id) {
            Some(VisitState::Validated) => return,
            Some(VisitState::Visiting) => {
                self.report_loop(id);
                return;
            }
            None => {}
        }

        self.states.insert(id, VisitState::Visiting);
        self.stack.push(id);
        self.check_binding(id);

        let entity = Entity::Binding(id);
        for dependency in self.forest.dependencies(id) {
            self.visit_dependency(&entity, dependency);
        }

        self.stack.pop();
        self.states.insert(id, VisitState::Validated);
    }

    fn report_loop(&mut self, id: BindingId) {
        let Some(start) = self.stack.iter().position(|&b| b == id) else {
            return;
        };
        let cycle = self.stack[start..].to_vec();
        let mut canonical = cycle.clone();
        if let Some(min) = canonical.iter().enumerate().min_by_key(|(_, b)| **b).map(|(i, _)| i) {
            canonical.rotate_left(min);
        }
        if !self.loops.insert(canonical) {
            return;
        }

        let bindings: Vec<Rc<Binding>> = cycle.iter().map(|&b| self.forest.binding(b)).collect();
        let mut chain: Vec<String> = bindings.iter().map(|b| b.target.to_string()).collect();
        chain.push(bindings[0].target.to_string());

        let self_dependent = bindings.len() == 1 || bindings.iter().all(|b| b.is_alias());
        let issue = if self_dependent {
            Issue::error(format!("self-dependent binding: {}", chain.join(" -> ")))
                .with_note(format!("{} ultimately depends on its own target", bindings[0]))
        } else {
            Issue::error(format!("dependency loop: {}", chain.join(" -> ")))
                .with_note("request one of the dependencies as Lazy or Provider to break the loop")
        };
        log::debug!("{}", issue.message);
        self.pending.push((Entity::Binding(id), issue));
    }

    fn report_missing(&mut self, from: &Entity, graph: GraphId, node: &Node) {
        let entity = Entity::Missing(graph, node.clone());
        self.encounters.add(&entity, || node.to_string());
        self.encounters.record(from, &entity);
        if !self.missing.insert(entity.clone()) {
            return;
        }

        let issue = Issue::error(format!("missing binding for {node}"));
        let oracle = self.forest.context().oracle();
        let issue = if node.qualifier().is_some() {
            issue.with_note("qualified nodes are only supplied by explicit bindings")
        } else if oracle.declaration_of(node.ty()).is_some() {
            issue.with_note(format!(
                "{} has no @Inject constructor and no module binds it",
                node.ty()
            ))
        } else {
            issue.with_note(format!("{} is not declared", node.ty()))
        };
        self.pending.push((entity, issue));
    }

    /// A required dependency must be present whenever its requester is
    fn check_condition(&mut self, from: &Entity, dependency: &Dependency, guard: &Scope, id: BindingId) {
        let condition = self.forest.condition_of(id);
        let solver = self.forest.context().solver();
        if solver.implies(guard, &condition) {
            return;
        }
        let issue = Issue::error(format!(
            "{dependency} is required under {} but is only present under {}",
            solver.minimize(guard),
            solver.minimize(&condition)
        ))
        .with_note("request it as Optional, or narrow the requester's condition");
        self.pending.push((from.clone(), issue));
    }

    fn check_binding(&mut self, id: BindingId) {
        let binding = self.forest.binding(id);
        let entity = Entity::Binding(id);
        let mut issues = binding.issues.clone();

        let component = self.forest.graph(binding.owner).component();
        if let (false, BindingScope::Cached(scopes)) = (binding.is_implicit(), &binding.scope) {
            if !scopes.iter().any(|s| component.scopes().contains(s)) {
                issues.push(Issue::error(format!(
                    "{binding} is scoped with {}, which {} does not declare",
                    binding.scope,
                    component.ty()
                )));
            }
        }

        if let BindingKind::Multi(multi) = &binding.kind {
            let order = self.forest.contribution_order(id);
            if order.has_cycle() {
                let elements: Vec<String> = order
                    .cycle
                    .iter()
                    .map(|&i| multi.contributions[i].decl.origin.to_string())
                    .collect();
                issues.push(
                    Issue::error(format!(
                        "elements of {} depend on each other: {}",
                        binding.target,
                        elements.join(", ")
                    ))
                    .with_note("no list order satisfies these dependencies"),
                );
            }

            if multi.kind == CollectionKind::Map {
                let mut keys: Vec<(&MapKey, &MemberRef)> = Vec::new();
                for contribution in &multi.contributions {
                    let BindingTarget::MappingContribution { key, .. } = &contribution.decl.target else {
                        continue;
                    };
                    let origin = &contribution.decl.origin;
                    match keys.iter().find(|(seen, _)| seen.value == key.value) {
                        Some((_, first)) => issues.push(Issue::error(format!(
                            "duplicate key {key} in {}: {first} and {origin}",
                            binding.target
                        ))),
                        None => keys.push((key, origin)),
                    }
                }
            }
        }

        self.pending
            .extend(issues.into_iter().map(|issue| (entity.clone(), issue)));
    }

    fn check_graph(&mut self, graph: &BindingGraph) {
        let component = graph.component();
        let mut issues: Vec<Issue> = component.issues().to_vec();
        for flavor in component.own_variant() {
            issues.extend(flavor.issues().iter().cloned());
        }
        for conditional in component.conditionals() {
            issues.extend(conditional.issues());
        }
        for module in graph.modules() {
            issues.extend(module.issues().iter().cloned());
        }
        issues.extend(graph.issues().iter().cloned());

        for (dimension, flavors) in graph.variant().conflicts() {
            let names: Vec<String> = flavors.iter().map(|f| f.ty().to_string()).collect();
            issues.push(Issue::error(format!(
                "conflicting flavors for dimension {dimension} in {}: {}",
                component.ty(),
                names.join(", ")
            )));
        }

        issues.extend(self.creator_issues(graph));
        let entity = Entity::Graph(graph.id());
        self.pending
            .extend(issues.into_iter().map(|issue| (entity.clone(), issue)));
    }

    fn creator_issues(&self, graph: &BindingGraph) -> Vec<Issue> {
        let cx = self.forest.context();
        let component = graph.component();
        let ty = component.ty();
        let mut issues = Vec::new();

        if component.creators().len() > 1 {
            issues.push(Issue::error(format!(
                "component {ty} declares {} creators, at most one is allowed",
                component.creators().len()
            )));
        }

        // Modules installed by an ancestor are supplied there
        let unconstructable: Vec<_> = graph
            .modules()
            .iter()
            .filter(|m| m.requires_instance() && !m.is_trivially_constructable())
            .collect();

        let Some(creator) = component.creator() else {
            if !component.is_root() {
                issues.push(Issue::error(format!("child component {ty} has no creator")));
            } else if !component.dependencies().is_empty() {
                issues.push(Issue::error(format!(
                    "component {ty} has dependencies but no creator to supply them"
                )));
            }
            for module in unconstructable {
                issues.push(Issue::error(format!(
                    "module {} cannot be constructed and {ty} has no creator to supply it",
                    module.ty()
                )));
            }
            return issues;
        };

        issues.extend(creator.issues().iter().cloned());
        let creator_ty = creator.ty();
        let closure: Vec<_> = component
            .module_closure(cx)
            .map(|modules| modules.iter().map(|m| m.ty().clone()).collect::<Vec<_>>())
            .unwrap_or_default();

        let inputs = creator.inputs();
        for (i, input) in inputs.iter().enumerate() {
            if inputs[..i].iter().any(|earlier| earlier.kind == input.kind) {
                issues.push(Issue::error(format!(
                    "creator {creator_ty} supplies {input} more than once"
                )));
                continue;
            }
            match &input.kind {
                CreatorInputKind::Unknown(_) => issues.push(Issue::error(format!(
                    "creator input {input} of {creator_ty} is not a module or a component dependency and is not marked @BindsInstance"
                ))),
                CreatorInputKind::Module(module) if !closure.contains(module) => {
                    issues.push(Issue::error(format!(
                        "creator {creator_ty} supplies module {module}, which {ty} does not install"
                    )))
                }
                _ => {}
            }
        }

        for dependency in component.dependencies() {
            let supplied = CreatorInputKind::Dependency(dependency.ty.clone());
            if !inputs.iter().any(|input| input.kind == supplied) {
                issues.push(Issue::error(format!(
                    "creator {creator_ty} does not supply component dependency {}",
                    dependency.ty
                )));
            }
        }
        for module in unconstructable {
            let supplied = CreatorInputKind::Module(module.ty().clone());
            if !inputs.iter().any(|input| input.kind == supplied) {
                issues.push(Issue::error(format!(
                    "creator {creator_ty} does not supply module {}, which cannot be constructed",
                    module.ty()
                )));
            }
        }
        issues
    }

    fn label(&self, entity: &Entity) -> String {
        self.encounters.label(entity).unwrap_or_default().to_string()
    }

    fn flush(self, sink: &mut dyn DiagnosticSink) {
        let strict = self.options.strict_mode;
        let limit = self.options.max_issue_encounter_paths;
        let mut seen = HashSet::new();
        let (mut errors, mut warnings) = (0usize, 0usize);

        for (entity, issue) in self.pending {
            if !seen.insert((entity.clone(), issue.clone())) {
                continue;
            }
            let (encounter_paths, omitted) = self.encounters.paths_to(&entity, limit);
            let severity = match issue.severity {
                Severity::MandatoryWarning if strict => Severity::Error,
                severity => severity,
            };
            let mut notes = issue.notes;
            if omitted > 0 {
                notes.push(format!("{omitted} more encounter path(s) not shown"));
            }

            if severity == Severity::Error {
                errors += 1;
            } else {
                warnings += 1;
            }
            sink.report(Diagnostic {
                severity,
                message: issue.message,
                encounter_paths,
                notes,
            });
        }

        log::info!(
            "Validation finished: {} error(s), {} warning(s), {} binding(s) visited",
            errors,
            warnings,
            self.states.len()
        );
    }
}
