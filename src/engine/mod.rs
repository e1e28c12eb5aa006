//! Boundary to the host game engine
//!
//! The decision core never touches simulation state directly. It reads the
//! world through [`GameEngine`] queries and answers with fire-and-forget
//! [`Command`]s. The engine may silently reject a command (terrain changed,
//! not enough space, ...); the next planning cycle re-evaluates anyway.

pub mod sandbox;

use serde::{Deserialize, Serialize};

use crate::core::types::{
    BuildSize, BuildingTypeId, Cover, FlagId, PlayerNumber, ResourceId, RoadId, SiteId,
    Timestamp, WareId, WorkerTypeId,
};
use crate::core::Coords;

pub use sandbox::{SandboxField, SandboxWorld};

/// Snapshot of one map field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub coords: Coords,
    pub owner: Option<PlayerNumber>,
    pub cover: Cover,
    /// Building capacity right now, accounting for occupation and ownership
    pub build_size: BuildSize,
    /// A mine could be placed here right now
    pub mineable: bool,
    pub can_place_flag: bool,
    /// Roads may pass this field
    pub walkable: bool,
    pub resource: Option<ResourceId>,
    pub resource_amount: u8,
}

/// Snapshot of one flag
#[derive(Debug, Clone, PartialEq)]
pub struct FlagInfo {
    pub id: FlagId,
    pub coords: Coords,
    pub owner: PlayerNumber,
    /// Building attached to this flag
    pub building: Option<SiteId>,
    pub roads: Vec<RoadId>,
    pub wares_waiting: u32,
}

impl FlagInfo {
    pub fn degree(&self) -> usize {
        self.roads.len()
    }
}

/// Snapshot of one road
#[derive(Debug, Clone, PartialEq)]
pub struct RoadInfo {
    pub id: RoadId,
    pub start: FlagId,
    pub end: FlagId,
    /// Every field of the road including both flags
    pub path: Vec<Coords>,
    pub wares_in_transit: u32,
}

impl RoadInfo {
    /// Length of the road in walking steps
    pub fn steps(&self) -> u32 {
        self.path.len().saturating_sub(1) as u32
    }

    /// The flag at the other end, or None if `flag` is not an endpoint
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteStage {
    UnderConstruction,
    Complete,
}

/// One working position of a site
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSlot {
    pub required: WorkerTypeId,
    pub required_level: u8,
    /// Worker type currently occupying the position
    pub assigned: Option<WorkerTypeId>,
    /// Experience level of the assigned worker
    pub level: u8,
}

/// Input buffer of a site
#[derive(Debug, Clone, PartialEq)]
pub struct InputQueue {
    pub ware: WareId,
    pub filled: u32,
    pub capacity: u32,
    pub target: u32,
}

/// Snapshot of a building or construction site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInfo {
    pub id: SiteId,
    pub owner: PlayerNumber,
    pub building_type: BuildingTypeId,
    pub coords: Coords,
    pub flag: FlagId,
    pub stage: SiteStage,
    /// When the current stage began
    pub since: Timestamp,
    /// Productivity over the recent window, 0..=100
    pub statistics_percent: u8,
    pub stopped: bool,
    /// The site reports it ran out of resources (mines, fishers, ...)
    pub resources_depleted: bool,
    pub workers: Vec<WorkerSlot>,
    pub soldiers: u32,
    pub soldier_capacity: u32,
    pub inputs: Vec<InputQueue>,
}

impl SiteInfo {
    pub fn is_complete(&self) -> bool {
        self.stage == SiteStage::Complete
    }

    /// All working positions filled (soldier count for military sites)
    pub fn is_occupied(&self) -> bool {
        if self.soldier_capacity > 0 {
            return self.soldiers > 0;
        }
        self.workers.iter().all(|slot| slot.assigned.is_some())
    }

    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.since)
    }
}

/// What this player knows about another player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStrength {
    pub player: PlayerNumber,
    pub is_enemy: bool,
    /// Some territory of this player has been seen
    pub visible: bool,
    pub military_strength: u32,
}

/// Fire-and-forget orders to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Build { building_type: BuildingTypeId, at: Coords },
    BuildFlag { at: Coords },
    /// `path` starts at an existing flag; the engine places a flag at the end if needed
    BuildRoad { path: Vec<Coords> },
    /// Removes the flag, its roads and its building
    RemoveFlag { flag: FlagId },
    RemoveRoad { road: RoadId },
    Dismantle { site: SiteId },
    /// Destroy in place, no wares are recovered
    Bulldoze { site: SiteId },
    SetStopped { site: SiteId, stopped: bool },
    SetInputTarget { site: SiteId, ware: WareId, target: u32 },
    EvictWorker { site: SiteId, slot: usize },
    Enhance { site: SiteId },
}

/// Query and command interface of the host engine
pub trait GameEngine {
    /// Current game time
    fn now(&self) -> Timestamp;

    /// The player this core decides for
    fn player(&self) -> PlayerNumber;

    fn field(&self, at: Coords) -> Option<FieldInfo>;

    /// Bounded-radius query; fields outside the map are skipped
    fn fields_within(&self, center: Coords, radius: u32) -> Vec<FieldInfo> {
        center
            .within(radius)
            .into_iter()
            .filter_map(|c| self.field(c))
            .collect()
    }

    /// Every field currently owned by this player
    fn owned_fields(&self) -> Vec<Coords>;

    fn flag(&self, id: FlagId) -> Option<FlagInfo>;
    fn flag_at(&self, at: Coords) -> Option<FlagId>;
    fn road(&self, id: RoadId) -> Option<RoadInfo>;
    /// Road passing over a field (flags excluded)
    fn road_at(&self, at: Coords) -> Option<RoadId>;
    fn own_flags(&self) -> Vec<FlagId>;
    fn own_roads(&self) -> Vec<RoadId>;

    fn site(&self, id: SiteId) -> Option<SiteInfo>;
    fn own_sites(&self) -> Vec<SiteId>;
    /// Sites of every player standing within `radius` of `center`
    fn sites_within(&self, center: Coords, radius: u32) -> Vec<SiteInfo>;

    /// Stock across all warehouses
    fn ware_stock(&self, ware: WareId) -> u32;
    fn worker_stock(&self, worker: WorkerTypeId) -> u32;

    fn player_strengths(&self) -> Vec<PlayerStrength>;

    /// Walkable path for a new road, including both endpoints
    fn find_path(&self, from: Coords, to: Coords, max_steps: u32) -> Option<Vec<Coords>>;

    fn send(&mut self, command: Command);
}
