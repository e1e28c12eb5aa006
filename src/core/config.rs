//! Decision-core configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Times are game milliseconds.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{CoreError, Result};

/// Scheduler budget and observability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hard cap on jobs executed in one host tick
    pub max_jobs_per_tick: usize,

    /// Delay unit for catch-up batching.
    ///
    /// jobs_to_run = sqrt(delay / catchup_unit_ms), so a 2 s backlog runs
    /// two jobs per tick and an 8 s backlog hits the cap of four.
    pub catchup_unit_ms: u64,

    /// A tick whose earliest job is this late counts as "delayed"
    pub delay_warning_ms: u64,

    /// Consecutive-ish delayed ticks before a warning is logged.
    ///
    /// Delayed ticks increment the counter, punctual ones decrement it.
    pub delay_warning_count: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_tick: 4,
            catchup_unit_ms: 500,
            delay_warning_ms: 10_000,
            delay_warning_count: 30,
        }
    }
}

/// Regular interval of every job (see scheduler::JobId)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobIntervals {
    pub check_economies: u64,
    pub road_check: u64,
    /// Used instead of road_check when the last run changed the network
    pub road_check_busy: u64,
    pub construct_building: u64,
    /// Used instead of construct_building right after a commit
    pub construct_after_commit: u64,
    pub refresh_buildable: u64,
    pub refresh_mineable: u64,
    pub refresh_unusable: u64,
    pub review_productionsites: u64,
    pub review_militarysites: u64,
    pub review_mines: u64,
    pub review_trainingsites: u64,
    pub flag_distances: u64,
    pub count_military_vacant: u64,
    pub update_stats: u64,
    pub print_stats: u64,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self {
            check_economies: 8_000,
            road_check: 1_000,
            road_check_busy: 400,
            construct_building: 6_000,
            construct_after_commit: 2_000,
            refresh_buildable: 1_000,
            refresh_mineable: 7_000,
            refresh_unusable: 10_000,
            review_productionsites: 5_000,
            review_militarysites: 5_000,
            review_mines: 7_000,
            review_trainingsites: 30_000,
            flag_distances: 15_000,
            count_military_vacant: 25_000,
            update_stats: 60_000,
            print_stats: 60_000,
        }
    }
}

/// Field survey slicing and cache lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Buildable records visited per refresh_buildable call
    pub buildable_slice: usize,
    pub mineable_slice: usize,
    pub unusable_slice: usize,

    /// Extra out-of-rotation refreshes for big / border records per call
    pub priority_slice: usize,

    /// Lifetime of an interior buildable record
    pub buildable_ttl: u64,

    /// Lifetime of a record near the border.
    ///
    /// Much shorter than buildable_ttl: military relevance changes fastest
    /// at the border.
    pub border_ttl: u64,

    pub mineable_ttl: u64,

    /// How often refresh_unusable rescans the whole territory for new fields
    pub territory_scan_interval: u64,

    /// Radius for resource counts and the building histogram
    pub vicinity_radius: u32,

    /// Radius for enemy / own military presence
    pub military_radius: u32,

    /// A field is "near the border" if a foreign field is this close
    pub border_radius: u32,

    /// A field "has a road nearby" if an own flag or road is this close
    pub road_radius: u32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            buildable_slice: 25,
            mineable_slice: 10,
            unusable_slice: 30,
            priority_slice: 5,
            buildable_ttl: 30_000,
            border_ttl: 8_000,
            mineable_ttl: 60_000,
            territory_scan_interval: 30_000,
            vicinity_radius: 6,
            military_radius: 10,
            border_radius: 4,
            road_radius: 2,
        }
    }
}

/// Construction planning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Cool-down around a freshly placed military site
    pub blocked_cooldown_military: u64,
    /// Cool-down around a freshly placed farm-like site
    pub blocked_cooldown_space_consumer: u64,
    pub blocked_cooldown_default: u64,
    pub blocked_radius: u32,

    /// Minimum time between two new mines
    pub mine_interval: u64,

    /// Same-type buildings tolerated in the vicinity before a penalty kicks in
    pub density_threshold: u32,

    /// Below this many buildable spots the settlement counts as cramped
    pub spots_scarce: usize,
    /// Below this many big spots, big fields are reserved for big buildings
    pub big_spots_scarce: usize,

    pub forced_priority: i32,
    pub basic_priority: i32,
    pub needed_priority: i32,

    /// Construction sites of one (non-military) type allowed at once
    pub max_constructionsites_per_type: u32,

    /// Military construction sites allowed at once, plus one per
    /// `military_sites_per_extra_site` standing military sites
    pub max_military_constructionsites: u32,
    pub military_sites_per_extra_site: u32,

    /// Floor of least_military_score
    pub military_floor_min: i32,
    /// Step least_military_score moves by per cycle
    pub military_least_step: i32,
    /// Step target_military_score decays by per cycle without expansion
    pub military_target_decay: i32,

    /// Flags further than this from any warehouse ask for a new warehouse
    pub warehouse_flag_distance: u32,
    pub productionsites_per_warehouse: u32,

    /// Military sites required before the first trainingsite
    pub trainingsite_military_threshold: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            blocked_cooldown_military: 15_000,
            blocked_cooldown_space_consumer: 120_000,
            blocked_cooldown_default: 45_000,
            blocked_radius: 2,
            mine_interval: 30_000,
            density_threshold: 2,
            spots_scarce: 20,
            big_spots_scarce: 4,
            forced_priority: 300,
            basic_priority: 150,
            needed_priority: 100,
            max_constructionsites_per_type: 1,
            max_military_constructionsites: 2,
            military_sites_per_extra_site: 8,
            military_floor_min: -100,
            military_least_step: 1,
            military_target_decay: 3,
            warehouse_flag_distance: 12,
            productionsites_per_warehouse: 25,
            trainingsite_military_threshold: 10,
        }
    }
}

/// Road network maintenance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// Roads visited per improve_roads call
    pub road_slice: usize,

    /// Roads with more steps than this are candidates for a middle flag
    pub long_road_steps: usize,

    /// Allowed detour (steps) when removing a redundant road
    pub dispensable_margin: u32,

    /// Detour search radius as a multiple of the direct distance
    pub dispensable_radius_factor: u32,

    pub shortcut_radius: u32,
    pub shortcut_radius_disconnected_bonus: u32,
    pub shortcut_radius_military_bonus: u32,

    /// Minimum score a new road must reach to be built
    pub shortcut_min_gain: i32,

    /// Graph distance assumed for flags that cannot be reached at all
    pub unreachable_distance: u32,

    /// How long an economy may lack a warehouse before rescue measures
    pub disconnected_grace: u64,

    /// Upper bound for bounded graph walks (steps)
    pub max_graph_walk: u32,

    /// Distance-table entries not refreshed for this long are evicted
    pub distance_retention: u64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            road_slice: 6,
            long_road_steps: 3,
            dispensable_margin: 2,
            dispensable_radius_factor: 2,
            shortcut_radius: 8,
            shortcut_radius_disconnected_bonus: 4,
            shortcut_radius_military_bonus: 2,
            shortcut_min_gain: 6,
            unreachable_distance: 200,
            disconnected_grace: 60_000,
            max_graph_walk: 60,
            distance_retention: 120_000,
        }
    }
}

/// Built-site reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Minimum age before a production site may be dismantled
    pub min_age_production: u64,
    pub min_age_mine: u64,
    pub min_age_military: u64,
    pub min_age_trainingsite: u64,

    /// Minimum age before a site is enhanced
    pub upgrade_min_age: u64,
    /// Productivity (%) required for an enhancement
    pub upgrade_stats_threshold: u8,

    /// Productivity (%) at or below which a site counts as useless
    pub poor_stats_threshold: u8,

    /// Minimum time between two dismantles of the same type
    pub dismantle_grace: u64,

    /// Input queue target while a site is stopped
    pub stopped_input_target: u32,

    /// Productivity samples kept per site for the stop/start trend
    pub trend_window: usize,

    /// Interior military sites are only dismantled while more than this
    /// many military sites stand
    pub military_keep: u32,

    /// Fields beyond a military site's conquer radius that must also be
    /// own land for the site to count as interior
    pub interior_margin: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_age_production: 300_000,
            min_age_mine: 420_000,
            min_age_military: 600_000,
            min_age_trainingsite: 900_000,
            upgrade_min_age: 600_000,
            upgrade_stats_threshold: 75,
            poor_stats_threshold: 10,
            dismantle_grace: 120_000,
            stopped_input_target: 1,
            trend_window: 8,
            military_keep: 3,
            interior_margin: 3,
        }
    }
}

/// Configuration of one computer player's decision core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub scheduler: SchedulerConfig,
    pub intervals: JobIntervals,
    pub survey: SurveyConfig,
    pub planner: PlannerConfig,
    pub roads: RoadConfig,
    pub lifecycle: LifecycleConfig,
}

impl AiConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AiConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_jobs_per_tick == 0 {
            return Err(CoreError::InvalidConfig(
                "scheduler.max_jobs_per_tick must be at least 1".into(),
            ));
        }
        if self.scheduler.catchup_unit_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "scheduler.catchup_unit_ms must be positive".into(),
            ));
        }

        // Border records must refresh at least as often as interior ones
        if self.survey.border_ttl > self.survey.buildable_ttl {
            return Err(CoreError::InvalidConfig(format!(
                "survey.border_ttl ({}) should be <= survey.buildable_ttl ({})",
                self.survey.border_ttl, self.survey.buildable_ttl
            )));
        }

        if self.survey.buildable_slice == 0
            || self.survey.mineable_slice == 0
            || self.survey.unusable_slice == 0
        {
            return Err(CoreError::InvalidConfig("survey slices must be positive".into()));
        }

        if self.planner.blocked_cooldown_military > self.planner.blocked_cooldown_space_consumer {
            return Err(CoreError::InvalidConfig(format!(
                "planner.blocked_cooldown_military ({}) should be <= blocked_cooldown_space_consumer ({})",
                self.planner.blocked_cooldown_military,
                self.planner.blocked_cooldown_space_consumer
            )));
        }

        if self.planner.military_least_step <= 0 || self.planner.military_target_decay <= 0 {
            return Err(CoreError::InvalidConfig(
                "military score steps must be positive".into(),
            ));
        }

        if self.roads.road_slice == 0 {
            return Err(CoreError::InvalidConfig("roads.road_slice must be positive".into()));
        }

        Ok(())
    }
}
