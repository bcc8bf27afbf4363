//! Records how each validated entity was reached.
//!
//! Every time the traversal steps from one entity to another the edge is
//! added to a petgraph graph. Diagnostics are attached to entities and
//! resolved into root-to-entity paths only once the whole pass is over, so a
//! problem reached from several entry points lists all of them.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use wiring_graph::{BindingId, GraphId};
use wiring_model::Node;

/// Upper bound on paths counted past the listed ones
const PATH_COUNT_LIMIT: usize = 10_000;

/// Something the validator visits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Graph(GraphId),
    EntryPoint(GraphId, usize),
    MembersInjector(GraphId, usize),
    Binding(BindingId),
    /// A node with no binding, as requested from a graph
    Missing(GraphId, Node),
}

#[derive(Debug)]
struct Encounter {
    label: String,
}

#[derive(Debug, Default)]
pub struct EncounterGraph {
    graph: DiGraph<Encounter, ()>,
    index: HashMap<Entity, NodeIndex>,
    edges: HashSet<(NodeIndex, NodeIndex)>,
}

impl EncounterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entity` with a label on first sight
    pub fn add(&mut self, entity: &Entity, label: impl FnOnce() -> String) -> NodeIndex {
        if let Some(&idx) = self.index.get(entity) {
            return idx;
        }
        let idx = self.graph.add_node(Encounter { label: label() });
        self.index.insert(entity.clone(), idx);
        idx
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        self.index.contains_key(entity)
    }

    pub fn label(&self, entity: &Entity) -> Option<&str> {
        self.index
            .get(entity)
            .map(|&idx| self.graph[idx].label.as_str())
    }

    /// Records that `to` was reached from `from`; both must be registered
    pub fn record(&mut self, from: &Entity, to: &Entity) {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if self.edges.insert((a, b)) {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Distinct paths from an unreached-from entity (a root) to `entity`,
    /// in discovery order, at most `limit` of them; plus the number of paths
    /// left out.
    pub fn paths_to(&self, entity: &Entity, limit: usize) -> (Vec<Vec<String>>, usize) {
        let Some(&target) = self.index.get(entity) else {
            return (Vec::new(), 0);
        };

        let mut found = Vec::new();
        let mut total = 0;
        let mut trail = vec![target];
        let mut on_trail: HashSet<NodeIndex> = HashSet::from([target]);
        self.walk_back(target, &mut trail, &mut on_trail, &mut found, &mut total, limit);

        (found, total.saturating_sub(limit))
    }

    fn walk_back(
        &self,
        at: NodeIndex,
        trail: &mut Vec<NodeIndex>,
        on_trail: &mut HashSet<NodeIndex>,
        found: &mut Vec<Vec<String>>,
        total: &mut usize,
        limit: usize,
    ) {
        if *total >= PATH_COUNT_LIMIT {
            return;
        }

        let mut sources: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(at, Direction::Incoming)
            .collect();
        if sources.is_empty() {
            *total += 1;
            if found.len() < limit {
                found.push(
                    trail
                        .iter()
                        .rev()
                        .map(|&idx| self.graph[idx].label.clone())
                        .collect(),
                );
            }
            return;
        }

        sources.sort_unstable();
        for source in sources {
            // Cycles are reported separately; a path never revisits an entity
            if !on_trail.insert(source) {
                continue;
            }
            trail.push(source);
            self.walk_back(source, trail, on_trail, found, total, limit);
            trail.pop();
            on_trail.remove(&source);
        }
    }
}
