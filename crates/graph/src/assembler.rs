use crate::graph::GraphForest;
use crate::types::{BindingId, BindingKind, GraphId};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use wiring_model::ClassBacked;

/// Resolved graphs in the shape a code generator consumes
#[derive(Debug, Clone, Serialize)]
pub struct ForestSummary {
    pub components: Vec<ComponentSummary>,
}

/// One component placement
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub component: String,
    /// Components from the root down to this one
    pub path: Vec<String>,
    /// Dimension -> flavors
    pub variant: BTreeMap<String, Vec<String>>,
    pub requires_synchronized_access: bool,
    /// Minimised condition of the whole placement; `None` when always present
    pub condition: Option<String>,
    pub bindings: Vec<BindingSummary>,
    pub multibindings: Vec<MultiBindingSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindingSummary {
    pub node: String,
    pub origin: String,
    /// Runtime check needed before use; `None` when implied by the component
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiBindingSummary {
    pub node: String,
    /// Contribution origins in resolved order
    pub elements: Vec<String>,
    pub cycle: bool,
}

impl<'cx> GraphForest<'cx> {
    /// Summarises every graph: bindings hosted in it, ordered lists and
    /// runtime conditions.
    ///
    /// Implicit bindings are created on lookup, so everything reachable from
    /// entry points, members-injectors and explicit bindings is resolved
    /// first.
    pub fn summary(&self) -> ForestSummary {
        self.resolve_reachable();
        let components = (0..self.graphs().len())
            .map(|i| self.component_summary(GraphId(i)))
            .collect();
        ForestSummary { components }
    }

    pub fn summary_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }

    fn resolve_reachable(&self) {
        let mut queue: Vec<BindingId> = Vec::new();
        for graph in self.graphs() {
            let component = graph.component();
            let requests = component
                .entry_points()
                .iter()
                .map(|entry_point| &entry_point.dependency)
                .chain(
                    component
                        .members_injectors()
                        .iter()
                        .flat_map(|injector| injector.members.iter().map(|member| &member.dependency)),
                );
            queue.extend(requests.filter_map(|dependency| self.resolve(graph.id(), &dependency.node)));
            queue.extend(graph.local_bindings().iter().copied());
        }

        let mut seen = HashSet::new();
        while let Some(id) = queue.pop() {
            if !seen.insert(id) {
                continue;
            }
            for request in self.dependencies(id) {
                if let Some(next) = self.resolve(request.graph, &request.dependency.node) {
                    queue.push(next);
                }
            }
        }
        log::debug!("Resolved {} reachable binding(s) for the summary", seen.len());
    }

    fn component_summary(&self, id: GraphId) -> ComponentSummary {
        let graph = self.graph(id);
        let solver = self.context().solver();

        let mut variant = BTreeMap::new();
        for dimension in graph.variant().dimensions() {
            let flavors = graph
                .variant()
                .flavors(dimension)
                .iter()
                .map(|f| f.ty().to_string())
                .collect();
            variant.insert(dimension.to_string(), flavors);
        }

        let condition = (!graph.condition().is_always())
            .then(|| solver.minimize(graph.condition()).to_string());

        let mut bindings = Vec::new();
        let mut multibindings = Vec::new();
        for binding_id in self.bindings_hosted_in(id) {
            let binding = self.binding(binding_id);
            let runtime = self.runtime_condition(binding_id);
            bindings.push(BindingSummary {
                node: binding.target.to_string(),
                origin: binding.origin(),
                condition: (!runtime.is_always()).then(|| runtime.to_string()),
            });

            if let BindingKind::Multi(multi) = &binding.kind {
                let order = self.contribution_order(binding_id);
                multibindings.push(MultiBindingSummary {
                    node: binding.target.to_string(),
                    elements: order
                        .ordered
                        .iter()
                        .map(|&i| multi.contributions[i].decl.origin.to_string())
                        .collect(),
                    cycle: order.has_cycle(),
                });
            }
        }

        ComponentSummary {
            component: graph.component().ty().to_string(),
            path: self.graph_path(id),
            variant,
            requires_synchronized_access: graph.component().requires_synchronized_access(),
            condition,
            bindings,
            multibindings,
        }
    }
}
