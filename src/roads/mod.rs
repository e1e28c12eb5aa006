//! Road network maintenance
//!
//! Works on a fresh [`RoadGraph`] snapshot per call and issues flag/road
//! commands to the engine. Every call visits a rotating slice of roads, so
//! the whole network is covered over several calls instead of at once.

pub mod dispensable;
pub mod distance;
pub mod graph;
pub mod prune;
pub mod shortcut;

pub use distance::{DistanceReport, FlagDistance, FlagDistances};
pub use graph::{FlagNode, RoadEdge, RoadGraph};

use std::collections::{BTreeSet, VecDeque};

use crate::core::config::RoadConfig;
use crate::core::types::{FlagId, RoadId, Timestamp};
use crate::economy::EconomyGraph;
use crate::engine::{Command, GameEngine};
use dispensable::Verdict;
use shortcut::ShortcutContext;

/// Running totals of network changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoadStats {
    pub dead_ends_removed: u32,
    pub roads_split: u32,
    pub dispensable_removed: u32,
    pub shortcuts_built: u32,
    pub flags_destroyed: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RoadMaintainer {
    config: RoadConfig,
    road_cursor: VecDeque<RoadId>,
    flag_cursor: VecDeque<FlagId>,
    /// Stranded flags already searched in the current rotation
    stranded_tried: BTreeSet<FlagId>,
    distances: FlagDistances,
    pub stats: RoadStats,
}

impl RoadMaintainer {
    pub fn new(config: RoadConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RoadConfig {
        &self.config
    }

    pub fn distances(&self) -> &FlagDistances {
        &self.distances
    }

    /// Next slice of roads, refilled from the snapshot when exhausted
    fn next_roads(&mut self, graph: &RoadGraph) -> Vec<RoadId> {
        let mut slice = Vec::with_capacity(self.config.road_slice);
        while slice.len() < self.config.road_slice {
            if self.road_cursor.is_empty() {
                if !slice.is_empty() || graph.edge_count() == 0 {
                    break;
                }
                self.road_cursor.extend(graph.edges().map(|e| e.id));
            }
            let Some(road) = self.road_cursor.pop_front() else {
                break;
            };
            if graph.edge(road).is_some() {
                slice.push(road);
            }
        }
        slice
    }

    /// Flag to try a shortcut for.
    ///
    /// Flags of warehouse-less economies come first, oldest economy first and
    /// building flags before bare ones. An economy past its grace period is
    /// settled right away; otherwise each stranded flag gets one search per
    /// rotation and the normal rotation takes over once all were tried.
    fn next_flag(
        &mut self,
        graph: &RoadGraph,
        economies: &EconomyGraph,
        now: Timestamp,
    ) -> Option<FlagId> {
        let grace = self.config.disconnected_grace;
        let any_warehouse = economies.economies().any(|e| e.has_warehouse);
        let mut stranded: Vec<_> = economies
            .economies()
            .filter(|e| any_warehouse && !e.has_warehouse)
            .collect();
        stranded.sort_by_key(|e| (e.disconnected_since.unwrap_or(now), e.id));

        self.stranded_tried.retain(|f| {
            graph.node(*f).is_some() && economies.economy_of(*f).is_some_and(|e| !e.has_warehouse)
        });

        let mut untried = None;
        for economy in stranded {
            let expired = economy.lacks_warehouse_for(now, grace);
            let mut flags: Vec<FlagId> = economy
                .flags
                .iter()
                .copied()
                .filter(|f| graph.node(*f).is_some())
                .collect();
            flags.sort_by_key(|f| (graph.node(*f).map_or(true, |n| n.building.is_none()), *f));
            if expired {
                if let Some(flag) = flags.first() {
                    return Some(*flag);
                }
            }
            if untried.is_none() {
                untried = flags.into_iter().find(|f| !self.stranded_tried.contains(f));
            }
        }
        if let Some(flag) = untried {
            self.stranded_tried.insert(flag);
            return Some(flag);
        }

        for _ in 0..2 {
            while let Some(flag) = self.flag_cursor.pop_front() {
                if graph.node(flag).is_some_and(|n| n.building.is_some()) {
                    return Some(flag);
                }
            }
            self.flag_cursor.extend(graph.nodes().map(|n| n.id));
            self.stranded_tried.clear();
        }
        None
    }

    /// One round of network improvements. Returns true if the network changed.
    ///
    /// `graph` must be a fresh snapshot; economies must already be consistent
    /// with it.
    pub fn improve_roads(
        &mut self,
        engine: &mut dyn GameEngine,
        graph: &mut RoadGraph,
        economies: &EconomyGraph,
        spots_scarce: bool,
        now: Timestamp,
    ) -> bool {
        let slice = self.next_roads(graph);

        let removed = prune::prune_dead_ends(graph, &slice);
        if !removed.is_empty() {
            for flag in &removed {
                engine.send(Command::RemoveFlag { flag: *flag });
            }
            tracing::debug!("removed {} dead-end flags", removed.len());
            self.stats.dead_ends_removed += removed.len() as u32;
            return true;
        }

        if spots_scarce {
            for road in &slice {
                if let Some(at) = self.split_point(engine, graph, *road) {
                    engine.send(Command::BuildFlag { at });
                    tracing::debug!("splitting long road {:?} at {}", road, at);
                    self.stats.roads_split += 1;
                    return true;
                }
            }
        }

        for road in &slice {
            if let Some(Verdict::Dispensable { alternative, full }) =
                dispensable::check_road(graph, *road, &self.config)
            {
                engine.send(Command::RemoveRoad { road: *road });
                graph.remove_edge(*road);
                tracing::debug!(
                    "removed dispensable road {:?}: {} steps, detour {}",
                    road,
                    full.steps,
                    alternative
                );
                self.stats.dispensable_removed += 1;
                return true;
            }
        }

        self.connect_flag(engine, graph, economies, spots_scarce, now)
    }

    /// Midpoint flag position for a long road
    fn split_point(
        &self,
        engine: &dyn GameEngine,
        graph: &RoadGraph,
        road: RoadId,
    ) -> Option<crate::core::Coords> {
        let edge = graph.edge(road)?;
        if (edge.steps as usize) <= self.config.long_road_steps {
            return None;
        }
        let middle = edge.path.len() / 2;
        let mut offsets: Vec<usize> = (1..edge.path.len() - 1).collect();
        offsets.sort_by_key(|i| (i.abs_diff(middle), *i));
        offsets
            .into_iter()
            .map(|i| edge.path[i])
            .find(|c| engine.field(*c).is_some_and(|f| f.can_place_flag))
    }

    /// Shortcut search for one prioritised flag, destroying it as a last resort
    fn connect_flag(
        &mut self,
        engine: &mut dyn GameEngine,
        graph: &mut RoadGraph,
        economies: &EconomyGraph,
        spots_scarce: bool,
        now: Timestamp,
    ) -> bool {
        let Some(flag) = self.next_flag(graph, economies, now) else {
            return false;
        };
        let Some(economy) = economies.economy_of(flag) else {
            return false;
        };
        let disconnected = economy.lacks_warehouse_for(now, self.config.disconnected_grace);
        let context = ShortcutContext {
            disconnected,
            military: graph.node(flag).is_some_and(|n| n.occupied_military),
            spots_scarce,
        };

        if let Some(shortcut) =
            shortcut::find_shortcut(&*engine, graph, flag, &context, &self.config)
        {
            tracing::debug!(
                "shortcut from {:?}: {} new steps instead of {}",
                flag,
                shortcut.new_steps(),
                shortcut.graph_distance
            );
            engine.send(Command::BuildRoad {
                path: shortcut.path,
            });
            self.stats.shortcuts_built += 1;
            return true;
        }

        // Nothing reaches a warehouse; give the flag up if any warehouse exists at all
        let any_warehouse = economies.economies().any(|e| e.has_warehouse);
        if disconnected && any_warehouse {
            tracing::info!(
                "destroying flag {:?}: no warehouse reachable for {} ms",
                flag,
                now.saturating_sub(economy.disconnected_since.unwrap_or(now))
            );
            engine.send(Command::RemoveFlag { flag });
            graph.remove_node(flag);
            self.stats.flags_destroyed += 1;
            return true;
        }
        false
    }

    /// Refresh the flag -> warehouse distance table
    pub fn check_flag_distances(&mut self, graph: &RoadGraph, now: Timestamp) -> DistanceReport {
        let report = self
            .distances
            .update(graph, now, self.config.distance_retention);
        tracing::debug!(
            "flag distances: {} updated, {} evicted, {} warehouses",
            report.updated,
            report.evicted,
            report.warehouses
        );
        report
    }
}
