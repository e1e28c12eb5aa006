//! Adaptive bounds for military site selection
//!
//! A candidate field is only worth a military site if its `military_score`
//! beats `least`. The floor creeps up while the player keeps expanding and
//! sinks while no spot qualifies. `target` is a faster-moving ceiling for
//! the floor; `upper_limit` is a personality value that only ever grows.

use serde::{Deserialize, Serialize};

use crate::core::config::PlannerConfig;

/// What happened in the last planning cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionPressure {
    /// A military site was committed this cycle
    pub expanded: bool,
    pub enemy_visible: bool,
    /// A visible enemy is stronger than us
    pub stronger_enemy: bool,
    /// Best military_score among the candidate fields, if any
    pub best_candidate: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitaryScoreBounds {
    least: i32,
    target: i32,
    upper_limit: i32,
}

impl MilitaryScoreBounds {
    pub fn new(upper_limit: i32, config: &PlannerConfig) -> Self {
        let mut bounds = Self {
            least: 0,
            target: upper_limit / 2,
            upper_limit,
        };
        bounds.normalize(config);
        bounds
    }

    /// Restore persisted values, repairing the ordering if needed
    pub fn from_parts(least: i32, target: i32, upper_limit: i32, config: &PlannerConfig) -> Self {
        let mut bounds = Self {
            least,
            target,
            upper_limit,
        };
        bounds.normalize(config);
        bounds
    }

    pub fn least(&self) -> i32 {
        self.least
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn upper_limit(&self) -> i32 {
        self.upper_limit
    }

    /// A field qualifies for a military site
    pub fn accepts(&self, military_score: i32) -> bool {
        military_score > self.least
    }

    /// Let the personality bound grow; never shrinks
    pub fn raise_upper_limit(&mut self, value: i32, config: &PlannerConfig) {
        if value > self.upper_limit {
            self.upper_limit = value;
        }
        self.normalize(config);
    }

    /// Move the bounds after a planning cycle
    pub fn adapt(&mut self, pressure: &ExpansionPressure, config: &PlannerConfig) {
        let step = config.military_least_step;
        let decay = config.military_target_decay;

        if let Some(best) = pressure.best_candidate {
            if best > self.upper_limit {
                self.upper_limit = best;
            }
        }

        if pressure.expanded {
            self.least = self.least.saturating_add(step);
            self.target = self.target.saturating_add(decay);
        } else {
            // Nothing qualified: lower the floor slowly, the ceiling faster
            let starved = pressure
                .best_candidate
                .map_or(true, |best| best <= self.least);
            if starved {
                self.least = self.least.saturating_sub(step);
            }
            self.target = self.target.saturating_sub(decay);
        }

        // Visible, stronger enemies keep the ceiling high so the floor can follow
        if pressure.enemy_visible {
            self.target = self.target.saturating_add(decay / 2 + 1);
            if pressure.stronger_enemy {
                self.target = self.target.saturating_add(decay);
            }
        }

        self.normalize(config);
    }

    /// Restore `floor_min <= least <= target <= upper_limit`
    fn normalize(&mut self, config: &PlannerConfig) {
        self.upper_limit = self.upper_limit.max(config.military_floor_min);
        self.target = self.target.clamp(config.military_floor_min, self.upper_limit);
        self.least = self.least.clamp(config.military_floor_min, self.target);
    }

    pub fn is_ordered(&self) -> bool {
        self.least <= self.target && self.target <= self.upper_limit
    }
}
