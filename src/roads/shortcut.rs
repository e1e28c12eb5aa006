//! Shortcut road search
//!
//! From one flag, look at own flags and road tiles nearby and weigh the
//! distance over the existing network against the cost of a new road.

use crate::core::config::RoadConfig;
use crate::core::types::FlagId;
use crate::core::Coords;
use crate::engine::GameEngine;
use crate::roads::graph::RoadGraph;

/// Best new road found for a flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub from: FlagId,
    /// Path including both ends
    pub path: Vec<Coords>,
    pub graph_distance: u32,
    pub score: i32,
}

impl Shortcut {
    pub fn new_steps(&self) -> u32 {
        self.path.len().saturating_sub(1) as u32
    }
}

/// Situation of the flag being connected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortcutContext {
    /// The flag's economy lacked a warehouse past the grace period
    pub disconnected: bool,
    /// The flag belongs to an occupied military site
    pub military: bool,
    /// Free building spots are scarce, so new roads cost more
    pub spots_scarce: bool,
}

pub fn search_radius(config: &RoadConfig, context: &ShortcutContext) -> u32 {
    let mut radius = config.shortcut_radius;
    if context.disconnected {
        radius += config.shortcut_radius_disconnected_bonus;
        if context.military {
            radius += config.shortcut_radius_military_bonus;
        }
    }
    radius
}

/// Find the best-scoring shortcut from `flag`, if any clears the threshold
pub fn find_shortcut(
    engine: &dyn GameEngine,
    graph: &RoadGraph,
    flag: FlagId,
    context: &ShortcutContext,
    config: &RoadConfig,
) -> Option<Shortcut> {
    let origin = graph.node(flag)?;
    let radius = search_radius(config, context);
    let distances = graph.walk(&[flag], Some(config.max_graph_walk), &[]);
    let graph_distance_to = |target: FlagId| {
        distances
            .get(&target)
            .map_or(config.unreachable_distance, |(d, _)| *d)
    };
    let directly_linked: Vec<FlagId> = graph
        .neighbors(flag)
        .into_iter()
        .map(|(_, other, _)| other)
        .collect();
    let cost_factor: i32 = if context.spots_scarce { 2 } else { 1 };

    let mut best: Option<Shortcut> = None;
    for coords in origin.coords.within(radius) {
        if coords == origin.coords {
            continue;
        }
        // Existing flag, or a road tile that can take a new flag
        let graph_distance = match engine.flag_at(coords) {
            Some(target) => {
                if graph.node(target).is_none() || directly_linked.contains(&target) {
                    continue;
                }
                graph_distance_to(target)
            }
            None => {
                let Some(road) = engine.road_at(coords).and_then(|r| graph.edge(r)) else {
                    continue;
                };
                if !engine.field(coords).is_some_and(|f| f.can_place_flag) {
                    continue;
                }
                let Some(position) = road.path.iter().position(|c| *c == coords) else {
                    continue;
                };
                let via_start = graph_distance_to(road.start).saturating_add(position as u32);
                let via_end = graph_distance_to(road.end)
                    .saturating_add((road.path.len() - 1 - position) as u32);
                via_start.min(via_end)
            }
        };

        let Some(path) = engine.find_path(origin.coords, coords, radius * 2) else {
            continue;
        };
        let new_steps = path.len().saturating_sub(1) as i32;
        let score = graph_distance as i32 - new_steps * cost_factor;
        let better = match &best {
            None => true,
            Some(current) => {
                score > current.score
                    || (score == current.score && (new_steps as u32) < current.new_steps())
            }
        };
        if better {
            best = Some(Shortcut {
                from: flag,
                path,
                graph_distance,
                score,
            });
        }
    }

    best.filter(|s| s.score >= config.shortcut_min_gain)
}
