//! Snapshot of the player's flag/road network
//!
//! Nodes are flags keyed by their engine id, edges are roads stored as flag id
//! pairs. A snapshot is taken at the start of a job and thrown away after it,
//! so it never outlives the engine's notion of a flag or road.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use crate::core::types::{BuildingTypeId, FlagId, RoadId, SiteId};
use crate::core::Coords;
use crate::engine::GameEngine;
use crate::planner::profile::BuildingCatalog;

#[derive(Debug, Clone, PartialEq)]
pub struct FlagNode {
    pub id: FlagId,
    pub coords: Coords,
    pub building: Option<SiteId>,
    pub building_type: Option<BuildingTypeId>,
    /// A complete warehouse stands at this flag
    pub warehouse: bool,
    /// A complete military site with soldiers stands at this flag
    pub occupied_military: bool,
    pub wares_waiting: u32,
    pub roads: Vec<RoadId>,
}

impl FlagNode {
    pub fn degree(&self) -> usize {
        self.roads.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub id: RoadId,
    pub start: FlagId,
    pub end: FlagId,
    pub steps: u32,
    pub traffic: u32,
    pub path: Vec<Coords>,
}

impl RoadEdge {
    pub fn other_end(&self, flag: FlagId) -> Option<FlagId> {
        if self.start == flag {
            Some(self.end)
        } else if self.end == flag {
            Some(self.start)
        } else {
            None
        }
    }
}

/// Entry in the Dijkstra open set
#[derive(Debug, Clone, PartialEq, Eq)]
struct WalkNode {
    flag: FlagId,
    cost: u32,
}

impl Ord for WalkNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties resolved by flag id for determinism
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.flag.cmp(&self.flag))
    }
}

impl PartialOrd for WalkNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of a multi-source walk: distance and the source it was reached from
pub type DistanceMap = BTreeMap<FlagId, (u32, FlagId)>;

#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    nodes: BTreeMap<FlagId, FlagNode>,
    edges: BTreeMap<RoadId, RoadEdge>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the player's current network
    pub fn snapshot(engine: &dyn GameEngine, catalog: &BuildingCatalog) -> Self {
        let mut graph = Self::new();
        for id in engine.own_flags() {
            let Some(flag) = engine.flag(id) else {
                continue;
            };
            let site = flag.building.and_then(|s| engine.site(s));
            let profile = site.as_ref().and_then(|s| catalog.get(s.building_type));
            let complete = site.as_ref().is_some_and(|s| s.is_complete());
            graph.nodes.insert(
                id,
                FlagNode {
                    id,
                    coords: flag.coords,
                    building: flag.building,
                    building_type: site.as_ref().map(|s| s.building_type),
                    warehouse: complete && profile.is_some_and(|p| p.is_warehouse()),
                    occupied_military: complete
                        && profile.is_some_and(|p| p.is_military())
                        && site.as_ref().is_some_and(|s| s.soldiers > 0),
                    wares_waiting: flag.wares_waiting,
                    roads: Vec::new(),
                },
            );
        }
        for id in engine.own_roads() {
            if let Some(road) = engine.road(id) {
                graph.insert_edge(RoadEdge {
                    id,
                    start: road.start,
                    end: road.end,
                    steps: road.steps(),
                    traffic: road.wares_in_transit,
                    path: road.path,
                });
            }
        }
        graph
    }

    pub fn insert_node(&mut self, node: FlagNode) {
        self.nodes.insert(node.id, node);
    }

    /// Add an edge between two known nodes; ignored otherwise
    pub fn insert_edge(&mut self, edge: RoadEdge) {
        if !self.nodes.contains_key(&edge.start) || !self.nodes.contains_key(&edge.end) {
            return;
        }
        for endpoint in [edge.start, edge.end] {
            if let Some(node) = self.nodes.get_mut(&endpoint) {
                node.roads.push(edge.id);
            }
        }
        self.edges.insert(edge.id, edge);
    }

    pub fn remove_edge(&mut self, id: RoadId) -> Option<RoadEdge> {
        let edge = self.edges.remove(&id)?;
        for endpoint in [edge.start, edge.end] {
            if let Some(node) = self.nodes.get_mut(&endpoint) {
                node.roads.retain(|r| *r != id);
            }
        }
        Some(edge)
    }

    /// Remove a flag and every road touching it
    pub fn remove_node(&mut self, id: FlagId) -> Option<FlagNode> {
        let roads = self.nodes.get(&id)?.roads.clone();
        for road in roads {
            self.remove_edge(road);
        }
        self.nodes.remove(&id)
    }

    pub fn node(&self, id: FlagId) -> Option<&FlagNode> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: RoadId) -> Option<&RoadEdge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlagNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RoadEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn warehouse_flags(&self) -> Vec<FlagId> {
        self.nodes
            .values()
            .filter(|n| n.warehouse)
            .map(|n| n.id)
            .collect()
    }

    /// Roads leaving `flag` as (road, other flag, steps)
    pub fn neighbors(&self, flag: FlagId) -> Vec<(RoadId, FlagId, u32)> {
        let Some(node) = self.nodes.get(&flag) else {
            return Vec::new();
        };
        node.roads
            .iter()
            .filter_map(|r| self.edges.get(r))
            .filter_map(|e| e.other_end(flag).map(|other| (e.id, other, e.steps)))
            .collect()
    }

    /// Flags reachable from `start`, including it
    pub fn component(&self, start: FlagId) -> BTreeSet<FlagId> {
        let mut seen = BTreeSet::new();
        if !self.nodes.contains_key(&start) {
            return seen;
        }
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for (_, next, _) in self.neighbors(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Multi-source Dijkstra over road steps.
    ///
    /// Flags further than `max_cost` are not expanded; roads in `excluded` are
    /// treated as absent.
    pub fn walk(&self, sources: &[FlagId], max_cost: Option<u32>, excluded: &[RoadId]) -> DistanceMap {
        let mut best: DistanceMap = BTreeMap::new();
        let mut open_set = BinaryHeap::new();
        for source in sources {
            if self.nodes.contains_key(source) {
                best.insert(*source, (0, *source));
                open_set.push(WalkNode {
                    flag: *source,
                    cost: 0,
                });
            }
        }

        while let Some(current) = open_set.pop() {
            let Some((known, origin)) = best.get(&current.flag).copied() else {
                continue;
            };
            if current.cost > known {
                continue;
            }
            for (road, next, steps) in self.neighbors(current.flag) {
                if excluded.contains(&road) {
                    continue;
                }
                let cost = current.cost + steps;
                if max_cost.is_some_and(|max| cost > max) {
                    continue;
                }
                let improves = best.get(&next).map_or(true, |(d, _)| cost < *d);
                if improves {
                    best.insert(next, (cost, origin));
                    open_set.push(WalkNode { flag: next, cost });
                }
            }
        }
        best
    }

    /// Shortest road distance between two flags
    pub fn distance(
        &self,
        from: FlagId,
        to: FlagId,
        max_cost: Option<u32>,
        excluded: &[RoadId],
    ) -> Option<u32> {
        self.walk(&[from], max_cost, excluded)
            .get(&to)
            .map(|(d, _)| *d)
    }
}
