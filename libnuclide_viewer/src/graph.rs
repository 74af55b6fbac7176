use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use super::error::GraphError;

/// A fixed directed acyclic graph of derivations.
///
/// Nodes are declared together with the nodes they read from. The topological order is
/// computed once at construction and every update pass walks it front to back, so a node is
/// never evaluated before all of its upstream nodes have settled.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    order: Vec<K>,
    upstream: HashMap<K, Vec<K>>,
}

impl<K> DependencyGraph<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Build the graph from `(node, upstream nodes)` declarations
    pub fn new(declarations: &[(K, &[K])]) -> Result<Self, GraphError> {
        let mut graph = DiGraph::<K, ()>::new();
        let mut index: HashMap<K, NodeIndex> = HashMap::new();
        for (node, _) in declarations {
            if index.insert(*node, graph.add_node(*node)).is_some() {
                return Err(GraphError::DuplicateNode(format!("{node:?}")));
            }
        }

        let mut upstream = HashMap::new();
        for (node, deps) in declarations {
            for dep in deps.iter() {
                let from = index
                    .get(dep)
                    .ok_or_else(|| GraphError::UnknownUpstream(format!("{node:?}")))?;
                graph.add_edge(*from, index[node], ());
            }
            upstream.insert(*node, deps.to_vec());
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| GraphError::Cycle(format!("{:?}", graph[cycle.node_id()])))?
            .into_iter()
            .map(|idx| graph[idx])
            .collect();

        Ok(Self { order, upstream })
    }

    pub fn order(&self) -> &[K] {
        &self.order
    }

    pub fn upstream(&self, node: K) -> &[K] {
        self.upstream.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Nodes nothing else feeds into, i.e. the inputs
    pub fn roots(&self) -> Vec<K> {
        self.order
            .iter()
            .copied()
            .filter(|node| self.upstream(*node).is_empty())
            .collect()
    }

    /// Run one update pass.
    ///
    /// `changed` seeds the pass with the nodes that were written from outside. Walking the
    /// topological order, a node is handed to `recompute` iff one of its upstream nodes changed
    /// during this pass; `recompute` returns whether the node's value actually changed, which
    /// decides whether its own dependents run. Every node is recomputed at most once.
    ///
    /// Returns the recomputed nodes in evaluation order.
    pub fn propagate<I, F>(&self, changed: I, mut recompute: F) -> Vec<K>
    where
        I: IntoIterator<Item = K>,
        F: FnMut(K) -> bool,
    {
        let mut dirty: HashSet<K> = changed.into_iter().collect();
        let mut recomputed = Vec::new();
        for node in self.order.iter().copied() {
            if dirty.contains(&node) {
                continue;
            }
            if self.upstream(node).iter().any(|dep| dirty.contains(dep)) {
                recomputed.push(node);
                if recompute(node) {
                    dirty.insert(node);
                }
            }
        }
        recomputed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum N {
        A,
        B,
        C,
        D,
    }

    // A -> B, A -> C, {B, C} -> D
    fn diamond() -> DependencyGraph<N> {
        DependencyGraph::<N>::new(&[
            (N::D, &[N::B, N::C]),
            (N::B, &[N::A]),
            (N::C, &[N::A]),
            (N::A, &[]),
        ])
        .unwrap()
    }

    fn position(graph: &DependencyGraph<N>, node: N) -> usize {
        graph.order().iter().position(|n| *n == node).unwrap()
    }

    #[test]
    fn order_respects_dependencies() {
        let graph = diamond();
        assert!(position(&graph, N::A) < position(&graph, N::B));
        assert!(position(&graph, N::A) < position(&graph, N::C));
        assert!(position(&graph, N::B) < position(&graph, N::D));
        assert!(position(&graph, N::C) < position(&graph, N::D));
        assert_eq!(graph.roots(), vec![N::A]);
    }

    #[test]
    fn diamond_join_recomputes_once_after_both_parents() {
        let graph = diamond();
        let mut seen = Vec::new();
        let recomputed = graph.propagate([N::A], |node| {
            seen.push(node);
            true
        });
        assert_eq!(recomputed.iter().filter(|n| **n == N::D).count(), 1);
        assert_eq!(*recomputed.last().unwrap(), N::D);
        assert_eq!(seen, recomputed);
    }

    #[test]
    fn unchanged_value_stops_propagation() {
        let graph = diamond();
        let recomputed = graph.propagate([N::A], |_| false);
        assert_eq!(recomputed.len(), 2);
        assert!(!recomputed.contains(&N::D));
    }

    #[test]
    fn only_affected_nodes_recompute() {
        let graph = diamond();
        let recomputed = graph.propagate([N::B], |_| true);
        assert_eq!(recomputed, vec![N::D]);
    }

    #[test]
    fn cycles_are_rejected() {
        let err = DependencyGraph::<N>::new(&[(N::A, &[N::B]), (N::B, &[N::A])]).unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }

    #[test]
    fn undeclared_upstream_is_rejected() {
        let err = DependencyGraph::<N>::new(&[(N::A, &[N::C])]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownUpstream(_)));
    }
}
