//! Graph builder
//!
//! A small directed multigraph over plan node ids. It is rebuilt from the
//! current node/edge lists on every pass and never cached across structural updates.

use crate::services::plan_analyzer::models::{NodeId, PlanEdge};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Directed plan graph, nodes kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    nodes: Vec<NodeId>,
    node_set: HashSet<NodeId>,
    edges: Vec<PlanEdge>,
}

impl PlanGraph {
    /// Build a graph from an edge list and the node ids it may reference.
    ///
    /// Edges pointing at unknown nodes and self-loops are dropped. Parallel
    /// edges between the same pair are kept.
    pub fn build(edges: &[PlanEdge], node_ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut graph = PlanGraph::default();
        for id in node_ids {
            if graph.node_set.insert(id) {
                graph.nodes.push(id);
            }
        }

        for edge in edges {
            if edge.from_id == edge.to_id {
                debug!("Dropping self-loop on node {}", edge.from_id);
                continue;
            }
            if !graph.contains(edge.from_id) || !graph.contains(edge.to_id) {
                debug!("Dropping edge {} -> {} with unknown endpoint", edge.from_id, edge.to_id);
                continue;
            }
            graph.edges.push(*edge);
        }
        graph
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.node_set.contains(&node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[PlanEdge] {
        &self.edges
    }

    pub fn in_edges(&self, node_id: NodeId) -> Vec<PlanEdge> {
        self.edges.iter().filter(|e| e.to_id == node_id).copied().collect()
    }

    pub fn out_edges(&self, node_id: NodeId) -> Vec<PlanEdge> {
        self.edges.iter().filter(|e| e.from_id == node_id).copied().collect()
    }

    /// Sources of the incoming edges, in edge order
    pub fn predecessors(&self, node_id: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|e| e.to_id == node_id).map(|e| e.from_id).collect()
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, node_id: NodeId) {
        if self.node_set.remove(&node_id) {
            self.nodes.retain(|id| *id != node_id);
            self.edges.retain(|e| e.from_id != node_id && e.to_id != node_id);
        }
    }

    /// Add `from -> to` unless it already exists. Self-loops and unknown nodes are ignored.
    pub fn set_edge(&mut self, from_id: NodeId, to_id: NodeId) {
        if from_id == to_id || !self.contains(from_id) || !self.contains(to_id) {
            return;
        }
        let edge = PlanEdge::new(from_id, to_id);
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// True when every node is reachable from the first one ignoring edge direction.
    /// An empty graph counts as connected.
    pub fn is_weakly_connected(&self) -> bool {
        let Some(&start) = self.nodes.first() else {
            return true;
        };

        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.from_id).or_default().push(edge.to_id);
            adjacency.entry(edge.to_id).or_default().push(edge.from_id);
        }

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in adjacency.get(&current).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen.len() == self.nodes.len()
    }
}
