//! Redundant road detection
//!
//! A road is extended through degree-2, building-free flags to the "full
//! road" it belongs to. If the rest of the network connects the two ends of
//! the full road almost as well, the tested road is not needed.

use std::collections::BTreeSet;

use crate::core::config::RoadConfig;
use crate::core::types::{FlagId, RoadId};
use crate::roads::graph::RoadGraph;

/// A chain of roads between two flags that matter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullRoad {
    pub ends: (FlagId, FlagId),
    pub roads: Vec<RoadId>,
    pub steps: u32,
    /// Wares on the roads plus wares waiting at the inner flags
    pub traffic: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep; a warehouse sits at one of the ends
    WarehouseEnd,
    /// Keep; no alternative route within the search radius
    NoAlternative,
    /// Keep; the alternative is too long for the traffic
    TooCostly { alternative: u32 },
    Dispensable { alternative: u32, full: FullRoad },
}

fn passes_through(graph: &RoadGraph, flag: FlagId) -> bool {
    graph
        .node(flag)
        .is_some_and(|n| n.degree() == 2 && n.building.is_none() && !n.warehouse)
}

/// Follow `road` through pass-through flags in both directions
pub fn full_road(graph: &RoadGraph, road: RoadId) -> Option<FullRoad> {
    let edge = graph.edge(road)?;
    let mut roads = vec![road];
    let mut seen: BTreeSet<RoadId> = [road].into_iter().collect();
    let mut steps = edge.steps;
    let mut traffic = edge.traffic;
    let mut ends = [edge.start, edge.end];

    for end in ends.iter_mut() {
        let mut last_road = road;
        while passes_through(graph, *end) {
            let Some((next_road, next_flag, next_steps)) = graph
                .neighbors(*end)
                .into_iter()
                .find(|(r, _, _)| *r != last_road)
            else {
                break;
            };
            if !seen.insert(next_road) {
                // Closed loop of pass-through flags
                break;
            }
            traffic += graph.node(*end).map_or(0, |n| n.wares_waiting);
            traffic += graph.edge(next_road).map_or(0, |e| e.traffic);
            steps += next_steps;
            roads.push(next_road);
            last_road = next_road;
            *end = next_flag;
        }
    }

    Some(FullRoad {
        ends: (ends[0], ends[1]),
        roads,
        steps,
        traffic,
    })
}

/// Decide whether `road` can be removed
pub fn check_road(graph: &RoadGraph, road: RoadId, config: &RoadConfig) -> Option<Verdict> {
    let edge = graph.edge(road)?;
    let is_warehouse = |f: FlagId| graph.node(f).is_some_and(|n| n.warehouse);
    if is_warehouse(edge.start) || is_warehouse(edge.end) {
        return Some(Verdict::WarehouseEnd);
    }
    let full = full_road(graph, road)?;
    if is_warehouse(full.ends.0) || is_warehouse(full.ends.1) {
        return Some(Verdict::WarehouseEnd);
    }
    if full.ends.0 == full.ends.1 {
        // A loop hanging off one flag
        return Some(Verdict::Dispensable {
            alternative: 0,
            full,
        });
    }

    let (a, b) = (graph.node(full.ends.0)?, graph.node(full.ends.1)?);
    let direct = a.coords.distance(&b.coords).max(1);
    let radius = (direct * config.dispensable_radius_factor + config.dispensable_margin)
        .min(config.max_graph_walk);

    let Some(alternative) = graph.distance(full.ends.0, full.ends.1, Some(radius), &full.roads)
    else {
        return Some(Verdict::NoAlternative);
    };
    if alternative + full.traffic <= full.steps + config.dispensable_margin {
        Some(Verdict::Dispensable { alternative, full })
    } else {
        Some(Verdict::TooCostly { alternative })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SiteId;
    use crate::roads::graph::tests::{edge, node};

    /// Buildings at 1 and 4. Direct chain 1-2-3-4 (2+2+2) and a bypass 1-5-4 (3+3)
    fn ladder() -> RoadGraph {
        let mut graph = RoadGraph::new();
        for i in 1..=5 {
            let mut n = node(i, i as i32 * 2);
            if i == 1 || i == 4 {
                n.building = Some(SiteId(100 + i));
            }
            graph.insert_node(n);
        }
        graph.insert_edge(edge(10, 1, 2, 2));
        graph.insert_edge(edge(11, 2, 3, 2));
        graph.insert_edge(edge(12, 3, 4, 2));
        graph.insert_edge(edge(13, 1, 5, 3));
        graph.insert_edge(edge(14, 5, 4, 3));
        graph
    }

    #[test]
    fn test_full_road_extends_through_plain_flags() {
        let graph = ladder();
        let full = full_road(&graph, RoadId(11)).unwrap();
        let mut ends = [full.ends.0, full.ends.1];
        ends.sort();
        assert_eq!(ends, [FlagId(1), FlagId(4)]);
        assert_eq!(full.steps, 6);
        assert_eq!(full.roads.len(), 3);
    }

    #[test]
    fn test_parallel_route_is_dispensable() {
        let graph = ladder();
        match check_road(&graph, RoadId(11), &RoadConfig::default()) {
            Some(Verdict::Dispensable { alternative, .. }) => assert_eq!(alternative, 6),
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_traffic_keeps_road() {
        let mut graph = ladder();
        let mut busy = edge(11, 2, 3, 2);
        busy.traffic = 5;
        graph.remove_edge(RoadId(11));
        graph.insert_edge(busy);
        assert!(matches!(
            check_road(&graph, RoadId(11), &RoadConfig::default()),
            Some(Verdict::TooCostly { .. })
        ));
    }

    #[test]
    fn test_warehouse_end_never_dispensable() {
        let mut graph = ladder();
        let mut warehouse = graph.node(FlagId(4)).unwrap().clone();
        warehouse.warehouse = true;
        warehouse.roads.clear();
        graph.remove_node(FlagId(4));
        graph.insert_node(warehouse);
        graph.insert_edge(edge(12, 3, 4, 2));
        graph.insert_edge(edge(14, 5, 4, 3));
        assert_eq!(
            check_road(&graph, RoadId(11), &RoadConfig::default()),
            Some(Verdict::WarehouseEnd)
        );
    }

    #[test]
    fn test_single_route_kept() {
        let mut graph = ladder();
        graph.remove_node(FlagId(5));
        assert_eq!(
            check_road(&graph, RoadId(11), &RoadConfig::default()),
            Some(Verdict::NoAlternative)
        );
    }
}
