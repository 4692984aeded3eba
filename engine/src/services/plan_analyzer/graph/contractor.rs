//! DAG contraction
//!
//! Collapses nodes that are not visible in a view by wiring their predecessors
//! straight to their successor, then builds the io/basic/advanced tiers.

use crate::services::plan_analyzer::AnalyzerOptions;
use crate::services::plan_analyzer::graph::PlanGraph;
use crate::services::plan_analyzer::models::{
    FilterTier, FilterTiers, NodeId, PlanEdge, PlanNode, Tier,
};
use std::collections::BTreeSet;

/// Reduce `edges` to the nodes in `visible`.
///
/// Each hidden node is replaced by edges from its predecessors to the target of
/// its first outgoing edge. A hidden node without outgoing edges is dropped along
/// with its incoming edges. Divergent paths behind the first outgoing edge of a
/// hidden node are not followed.
pub fn contract(edges: &[PlanEdge], all_nodes: &[NodeId], visible: &BTreeSet<NodeId>) -> Vec<PlanEdge> {
    let mut graph = PlanGraph::build(edges, all_nodes.iter().copied());

    for &node_id in all_nodes {
        if visible.contains(&node_id) || !graph.contains(node_id) {
            continue;
        }

        let successor = graph.out_edges(node_id).first().map(|e| e.to_id);
        if let Some(target) = successor {
            for edge in graph.in_edges(node_id) {
                graph.set_edge(edge.from_id, target);
            }
        }
        graph.remove_node(node_id);
    }

    graph
        .edges()
        .iter()
        .filter(|e| visible.contains(&e.from_id) && visible.contains(&e.to_id))
        .copied()
        .collect()
}

/// Nodes of `nodes` visible in `tier`. Codegen wrappers and hidden plumbing
/// operators never appear in any tier.
pub fn visible_nodes(nodes: &[PlanNode], tier: Tier, options: &AnalyzerOptions) -> BTreeSet<NodeId> {
    nodes
        .iter()
        .filter(|n| !n.is_codegen_node && !options.is_hidden(&n.normalized_name))
        .filter(|n| tier.includes(n.category))
        .map(|n| n.node_id)
        .collect()
}

pub fn build_tiers(nodes: &[PlanNode], edges: &[PlanEdge], options: &AnalyzerOptions) -> FilterTiers {
    let all_nodes: Vec<NodeId> = nodes.iter().map(|n| n.node_id).collect();
    let build = |tier: Tier| {
        let visible_node_ids = visible_nodes(nodes, tier, options);
        let edges = contract(edges, &all_nodes, &visible_node_ids);
        FilterTier { visible_node_ids, edges }
    };

    FilterTiers {
        io: build(Tier::Io),
        basic: build(Tier::Basic),
        advanced: build(Tier::Advanced),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::models::NodeCategory;

    fn edges(pairs: &[(NodeId, NodeId)]) -> Vec<PlanEdge> {
        pairs.iter().map(|(f, t)| PlanEdge::new(*f, *t)).collect()
    }

    fn visible(ids: &[NodeId]) -> BTreeSet<NodeId> {
        ids.iter().copied().collect()
    }

    fn node(node_id: NodeId, name: &str, category: NodeCategory) -> PlanNode {
        PlanNode {
            node_id,
            node_name: name.to_string(),
            normalized_name: name.to_string(),
            display_name: name.to_string(),
            category,
            parsed_plan: None,
            metrics: vec![],
            is_codegen_node: false,
            codegen_group_id: None,
            stage_id: None,
            exchange_durations: None,
            duration: None,
            commit: None,
            cached_storage: None,
        }
    }

    #[test]
    fn test_chain_of_hidden_nodes_becomes_direct_edge() {
        let result = contract(&edges(&[(0, 1), (1, 2), (2, 3)]), &[0, 1, 2, 3], &visible(&[0, 3]));
        assert_eq!(result, edges(&[(0, 3)]));
    }

    #[test]
    fn test_hidden_sink_is_dropped() {
        let result = contract(&edges(&[(0, 1), (1, 2)]), &[0, 1, 2], &visible(&[0, 1]));
        assert_eq!(result, edges(&[(0, 1)]));
    }

    #[test]
    fn test_multiple_predecessors_are_rewired() {
        // 0 -> 2, 1 -> 2, 2 -> 3 with 2 hidden
        let result = contract(&edges(&[(0, 2), (1, 2), (2, 3)]), &[0, 1, 2, 3], &visible(&[0, 1, 3]));
        assert_eq!(result, edges(&[(0, 3), (1, 3)]));
    }

    #[test]
    fn test_only_first_successor_is_used() {
        let result = contract(&edges(&[(0, 1), (1, 2), (1, 3)]), &[0, 1, 2, 3], &visible(&[0, 2, 3]));
        assert_eq!(result, edges(&[(0, 2)]));
    }

    #[test]
    fn test_endpoints_always_visible() {
        let all: Vec<NodeId> = (0..8).collect();
        let graph = edges(&[(0, 1), (1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 7), (2, 7), (0, 4)]);
        for mask in 0u32..256 {
            let shown: BTreeSet<NodeId> = all.iter().copied().filter(|id| mask & (1 << id) != 0).collect();
            for edge in contract(&graph, &all, &shown) {
                assert!(shown.contains(&edge.from_id) && shown.contains(&edge.to_id), "mask {mask:#b}");
                assert_ne!(edge.from_id, edge.to_id);
            }
        }
    }

    #[test]
    fn test_tiers_are_nested() {
        let nodes = vec![
            node(0, "Scan parquet db.t", NodeCategory::Input),
            node(1, "ColumnarToRow", NodeCategory::Other),
            node(2, "Filter", NodeCategory::Transformation),
            node(3, "Expand", NodeCategory::Other),
            node(4, "CollectLimit", NodeCategory::Output),
        ];
        let tiers = build_tiers(&nodes, &edges(&[(0, 1), (1, 2), (2, 3), (3, 4)]), &AnalyzerOptions::default());

        assert_eq!(tiers.io.visible_node_ids, visible(&[0, 4]));
        assert_eq!(tiers.basic.visible_node_ids, visible(&[0, 2, 4]));
        assert_eq!(tiers.advanced.visible_node_ids, visible(&[0, 2, 3, 4]));
        assert!(tiers.io.visible_node_ids.is_subset(&tiers.basic.visible_node_ids));
        assert!(tiers.basic.visible_node_ids.is_subset(&tiers.advanced.visible_node_ids));

        assert_eq!(tiers.io.edges, edges(&[(0, 4)]));
        assert_eq!(tiers.basic.edges, edges(&[(0, 2), (2, 4)]));
        let mut advanced = tiers.advanced.edges.clone();
        advanced.sort_by_key(|e| (e.from_id, e.to_id));
        assert_eq!(advanced, edges(&[(0, 2), (2, 3), (3, 4)]));
    }
}
