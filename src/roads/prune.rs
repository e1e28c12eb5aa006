//! Dead-end pruning

use std::collections::VecDeque;

use crate::core::types::{FlagId, RoadId};
use crate::roads::graph::RoadGraph;

/// A flag nothing depends on: no building and at most one road
fn is_dead_end(graph: &RoadGraph, flag: FlagId) -> bool {
    graph
        .node(flag)
        .is_some_and(|n| n.building.is_none() && !n.warehouse && n.degree() <= 1)
}

/// Remove dead-end flags at the ends of `roads` and follow each chain to a
/// fixed point. The snapshot is updated; returns the flags to remove in order.
pub fn prune_dead_ends(graph: &mut RoadGraph, roads: &[RoadId]) -> Vec<FlagId> {
    let mut removed = Vec::new();
    let mut worklist: VecDeque<FlagId> = VecDeque::new();
    for road in roads {
        if let Some(edge) = graph.edge(*road) {
            worklist.push_back(edge.start);
            worklist.push_back(edge.end);
        }
    }

    while let Some(flag) = worklist.pop_front() {
        if !is_dead_end(graph, flag) {
            continue;
        }
        let neighbors: Vec<FlagId> = graph
            .neighbors(flag)
            .into_iter()
            .map(|(_, other, _)| other)
            .collect();
        graph.remove_node(flag);
        removed.push(flag);
        worklist.extend(neighbors);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SiteId;
    use crate::roads::graph::tests::{edge, node};

    /// building(1) - 2 - 3 - 4, with 4 a dead end and 3 only leading to it
    fn chain() -> RoadGraph {
        let mut graph = RoadGraph::new();
        let mut home = node(1, 0);
        home.building = Some(SiteId(100));
        graph.insert_node(home);
        for i in 2..=4 {
            graph.insert_node(node(i, i as i32 * 2));
        }
        graph.insert_edge(edge(10, 1, 2, 2));
        graph.insert_edge(edge(11, 2, 3, 2));
        graph.insert_edge(edge(12, 3, 4, 2));
        graph
    }

    #[test]
    fn test_chain_pruned_to_building() {
        let mut graph = chain();
        let removed = prune_dead_ends(&mut graph, &[RoadId(12)]);
        assert_eq!(removed, vec![FlagId(4), FlagId(3), FlagId(2)]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let mut graph = chain();
        let all: Vec<RoadId> = graph.edges().map(|e| e.id).collect();
        prune_dead_ends(&mut graph, &all);
        let all: Vec<RoadId> = graph.edges().map(|e| e.id).collect();
        assert!(prune_dead_ends(&mut graph, &all).is_empty());
    }

    #[test]
    fn test_building_flags_survive() {
        let mut graph = chain();
        let mut end = node(4, 8);
        end.building = Some(SiteId(101));
        graph.remove_node(FlagId(4));
        graph.insert_node(end);
        graph.insert_edge(edge(12, 3, 4, 2));
        assert!(prune_dead_ends(&mut graph, &[RoadId(10), RoadId(12)]).is_empty());
    }
}
