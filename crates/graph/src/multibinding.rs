//! Dependency-aware ordering of list contributions.

use crate::graph::GraphForest;
use crate::types::{BindingId, BindingKind, Contribution, GraphId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::rc::Rc;
use wiring_model::{CollectionKind, Node};

/// Resolved element order of one multi-binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionOrder {
    /// Indices into the binding's contributions
    pub ordered: Vec<usize>,
    /// Contributions that depend on each other in a loop, ascending.
    /// They are still part of `ordered`, placed after everything sortable.
    pub cycle: Vec<usize>,
}

impl ContributionOrder {
    pub fn has_cycle(&self) -> bool {
        !self.cycle.is_empty()
    }
}

impl<'cx> GraphForest<'cx> {
    /// Order of the contributions of a multi-binding.
    ///
    /// Order-dependent lists are sorted so that an element comes after every
    /// element its dependencies reach; ties keep declaration order. Sets, maps
    /// and unordered lists keep declaration order.
    pub fn contribution_order(&self, id: BindingId) -> Rc<ContributionOrder> {
        if let Some(order) = self.orders.borrow().get(&id) {
            return Rc::clone(order);
        }
        let order = Rc::new(self.compute_order(id));
        self.orders.borrow_mut().insert(id, Rc::clone(&order));
        order
    }

    fn compute_order(&self, id: BindingId) -> ContributionOrder {
        let binding = self.binding(id);
        let BindingKind::Multi(multi) = &binding.kind else {
            return ContributionOrder::default();
        };
        let contributions = &multi.contributions;
        let count = contributions.len();

        let sorted = multi.kind == CollectionKind::List
            && multi
                .order_dependent()
                .unwrap_or(self.options().order_lists_by_default);
        if !sorted {
            return ContributionOrder {
                ordered: (0..count).collect(),
                cycle: Vec::new(),
            };
        }

        // Edge y -> x: y must be placed before x
        let mut graph = DiGraph::<usize, ()>::new();
        let indices: Vec<NodeIndex> = (0..count).map(|i| graph.add_node(i)).collect();
        for (x, contribution) in contributions.iter().enumerate() {
            let reach = self.reachable_nodes(contribution);
            for (y, other) in contributions.iter().enumerate() {
                if x == y {
                    continue;
                }
                if other.anchor().is_some_and(|anchor| reach.contains(anchor)) {
                    graph.add_edge(indices[y], indices[x], ());
                }
            }
        }

        let mut in_degree: Vec<usize> = indices
            .iter()
            .map(|&i| graph.neighbors_directed(i, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
            .filter(|&i| in_degree[i] == 0)
            .map(Reverse)
            .collect();
        let mut ordered = Vec::with_capacity(count);
        while let Some(Reverse(next)) = ready.pop() {
            ordered.push(next);
            for successor in graph.neighbors_directed(indices[next], Direction::Outgoing) {
                let successor = graph[successor];
                in_degree[successor] -= 1;
                if in_degree[successor] == 0 {
                    ready.push(Reverse(successor));
                }
            }
        }

        let mut cycle = Vec::new();
        if ordered.len() < count {
            for component in tarjan_scc(&graph) {
                if component.len() > 1 {
                    cycle.extend(component.iter().map(|&i| graph[i]));
                }
            }
            cycle.sort_unstable();
            let placed: HashSet<usize> = ordered.iter().copied().collect();
            ordered.extend((0..count).filter(|i| !placed.contains(i)));
            log::debug!(
                "{} has {} contribution(s) in a dependency cycle",
                binding.target,
                cycle.len()
            );
        }

        ContributionOrder { ordered, cycle }
    }

    /// Nodes reachable from a contribution's dependencies, through resolved
    /// bindings
    fn reachable_nodes(&self, contribution: &Contribution) -> HashSet<Node> {
        let mut seen: HashSet<(GraphId, Node)> = HashSet::new();
        let mut queue: VecDeque<(GraphId, Node)> = contribution
            .decl
            .dependencies()
            .into_iter()
            .map(|d| (contribution.host, d.node))
            .collect();

        while let Some((graph, node)) = queue.pop_front() {
            if !seen.insert((graph, node.clone())) {
                continue;
            }
            let Some(binding) = self.resolve(graph, &node) else {
                continue;
            };
            for dependency in self.dependencies(binding) {
                queue.push_back((dependency.graph, dependency.dependency.node));
            }
        }

        seen.into_iter().map(|(_, node)| node).collect()
    }
}
