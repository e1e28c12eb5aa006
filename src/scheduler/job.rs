//! Fixed job kinds of the decision core

use serde::{Deserialize, Serialize};

use crate::core::config::JobIntervals;
use crate::core::types::Timestamp;

/// Every periodic job the player runs. One live entry per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobId {
    CheckEconomies,
    RoadCheck,
    ConstructBuilding,
    RefreshBuildable,
    ReviewProductionsites,
    ReviewMilitarysites,
    RefreshMineable,
    ReviewMines,
    ReviewTrainingsites,
    FlagWarehouseDistances,
    RefreshUnusable,
    CountMilitaryVacant,
    UpdateStats,
    PrintStats,
}

impl JobId {
    pub const ALL: [JobId; 14] = [
        JobId::CheckEconomies,
        JobId::RoadCheck,
        JobId::ConstructBuilding,
        JobId::RefreshBuildable,
        JobId::ReviewProductionsites,
        JobId::ReviewMilitarysites,
        JobId::RefreshMineable,
        JobId::ReviewMines,
        JobId::ReviewTrainingsites,
        JobId::FlagWarehouseDistances,
        JobId::RefreshUnusable,
        JobId::CountMilitaryVacant,
        JobId::UpdateStats,
        JobId::PrintStats,
    ];

    /// Lower value runs first within a tick
    pub fn priority(&self) -> u8 {
        match self {
            JobId::CheckEconomies => 0,
            JobId::RoadCheck => 3,
            JobId::ConstructBuilding => 4,
            JobId::RefreshBuildable => 5,
            JobId::ReviewProductionsites
            | JobId::ReviewMilitarysites
            | JobId::RefreshMineable => 6,
            JobId::ReviewMines => 7,
            JobId::ReviewTrainingsites | JobId::FlagWarehouseDistances => 8,
            JobId::RefreshUnusable | JobId::CountMilitaryVacant | JobId::UpdateStats => 9,
            JobId::PrintStats => 10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobId::CheckEconomies => "check economies",
            JobId::RoadCheck => "road check",
            JobId::ConstructBuilding => "construct building",
            JobId::RefreshBuildable => "refresh buildable fields",
            JobId::ReviewProductionsites => "review productionsites",
            JobId::ReviewMilitarysites => "review militarysites",
            JobId::RefreshMineable => "refresh mineable fields",
            JobId::ReviewMines => "review mines",
            JobId::ReviewTrainingsites => "review trainingsites",
            JobId::FlagWarehouseDistances => "flag warehouse distances",
            JobId::RefreshUnusable => "refresh unusable fields",
            JobId::CountMilitaryVacant => "count military vacant",
            JobId::UpdateStats => "update stats",
            JobId::PrintStats => "print stats",
        }
    }

    /// Regular interval between two runs
    pub fn interval(&self, intervals: &JobIntervals) -> u64 {
        match self {
            JobId::CheckEconomies => intervals.check_economies,
            JobId::RoadCheck => intervals.road_check,
            JobId::ConstructBuilding => intervals.construct_building,
            JobId::RefreshBuildable => intervals.refresh_buildable,
            JobId::ReviewProductionsites => intervals.review_productionsites,
            JobId::ReviewMilitarysites => intervals.review_militarysites,
            JobId::RefreshMineable => intervals.refresh_mineable,
            JobId::ReviewMines => intervals.review_mines,
            JobId::ReviewTrainingsites => intervals.review_trainingsites,
            JobId::FlagWarehouseDistances => intervals.flag_distances,
            JobId::RefreshUnusable => intervals.refresh_unusable,
            JobId::CountMilitaryVacant => intervals.count_military_vacant,
            JobId::UpdateStats => intervals.update_stats,
            JobId::PrintStats => intervals.print_stats,
        }
    }
}

/// One entry of the job pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub id: JobId,
    pub priority: u8,
    pub due_time: Timestamp,
    pub label: &'static str,
}

impl ScheduledJob {
    pub fn new(id: JobId, due_time: Timestamp) -> Self {
        Self {
            id,
            priority: id.priority(),
            due_time,
            label: id.label(),
        }
    }
}
