//! In-memory engine for tests and the demo binary
//!
//! A small hex map with flags, roads and sites. Commands are applied
//! immediately and recorded in `issued` so tests can assert on them.

use ahash::AHashMap;
use std::collections::{BTreeMap, VecDeque};

use super::{
    Command, FieldInfo, FlagInfo, GameEngine, InputQueue, PlayerStrength, RoadInfo, SiteInfo,
    SiteStage,
};
use crate::core::types::{
    BuildSize, BuildingTypeId, Cover, FlagId, PlayerNumber, ResourceId, RoadId, SiteId,
    Timestamp, WareId, WorkerTypeId,
};
use crate::core::Coords;

/// Static description of a sandbox field
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxField {
    pub owner: Option<PlayerNumber>,
    pub cover: Cover,
    /// Capacity of the bare field, before occupation is considered
    pub base_size: BuildSize,
    pub mineable: bool,
    pub resource: Option<ResourceId>,
    pub resource_amount: u8,
}

impl Default for SandboxField {
    fn default() -> Self {
        Self {
            owner: None,
            cover: Cover::Open,
            base_size: BuildSize::Big,
            mineable: false,
            resource: None,
            resource_amount: 0,
        }
    }
}

/// A tiny game world implementing [`GameEngine`]
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    player: PlayerNumber,
    now: Timestamp,
    fields: AHashMap<Coords, SandboxField>,
    flags: BTreeMap<FlagId, FlagInfo>,
    roads: BTreeMap<RoadId, RoadInfo>,
    sites: BTreeMap<SiteId, SiteInfo>,
    flag_index: AHashMap<Coords, FlagId>,
    road_tiles: AHashMap<Coords, RoadId>,
    site_index: AHashMap<Coords, SiteId>,
    wares: AHashMap<WareId, u32>,
    workers: AHashMap<WorkerTypeId, u32>,
    strengths: Vec<PlayerStrength>,
    enhancements: AHashMap<BuildingTypeId, BuildingTypeId>,
    soldier_type: Option<WorkerTypeId>,
    next_id: u32,
    /// Every command received, in order
    pub issued: Vec<Command>,
}

impl SandboxWorld {
    pub fn new(player: PlayerNumber) -> Self {
        Self {
            player,
            now: 0,
            fields: AHashMap::new(),
            flags: BTreeMap::new(),
            roads: BTreeMap::new(),
            sites: BTreeMap::new(),
            flag_index: AHashMap::new(),
            road_tiles: AHashMap::new(),
            site_index: AHashMap::new(),
            wares: AHashMap::new(),
            workers: AHashMap::new(),
            strengths: Vec::new(),
            enhancements: AHashMap::new(),
            soldier_type: None,
            next_id: 1,
            issued: Vec::new(),
        }
    }

    // === WORLD SETUP ===

    /// Open, big-capacity land around `center` owned by `owner`
    pub fn add_land(&mut self, center: Coords, radius: u32, owner: Option<PlayerNumber>) {
        for c in center.within(radius) {
            let field = self.fields.entry(c).or_default();
            field.owner = owner;
        }
    }

    pub fn set_field(&mut self, at: Coords, field: SandboxField) {
        self.fields.insert(at, field);
    }

    pub fn field_mut(&mut self, at: Coords) -> Option<&mut SandboxField> {
        self.fields.get_mut(&at)
    }

    pub fn set_cover(&mut self, at: Coords, cover: Cover) {
        if let Some(field) = self.fields.get_mut(&at) {
            field.cover = cover;
        }
    }

    pub fn set_owner(&mut self, at: Coords, owner: Option<PlayerNumber>) {
        if let Some(field) = self.fields.get_mut(&at) {
            field.owner = owner;
        }
    }

    pub fn set_time(&mut self, now: Timestamp) {
        self.now = now;
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    pub fn set_ware_stock(&mut self, ware: WareId, amount: u32) {
        self.wares.insert(ware, amount);
    }

    pub fn set_worker_stock(&mut self, worker: WorkerTypeId, amount: u32) {
        self.workers.insert(worker, amount);
    }

    pub fn set_strengths(&mut self, strengths: Vec<PlayerStrength>) {
        self.strengths = strengths;
    }

    /// Successor type used by `Command::Enhance`
    pub fn set_enhancement(&mut self, from: BuildingTypeId, to: BuildingTypeId) {
        self.enhancements.insert(from, to);
    }

    /// Worker type soldiers return to when a military site is dismantled
    pub fn set_soldier_type(&mut self, soldier: WorkerTypeId) {
        self.soldier_type = Some(soldier);
    }

    /// Place a flag for the sandbox player, ignoring spacing rules
    pub fn place_flag(&mut self, at: Coords) -> Option<FlagId> {
        self.place_flag_for(self.player, at)
    }

    pub fn place_flag_for(&mut self, owner: PlayerNumber, at: Coords) -> Option<FlagId> {
        if let Some(existing) = self.flag_index.get(&at) {
            return Some(*existing);
        }
        if !self.fields.contains_key(&at) || self.site_index.contains_key(&at) {
            return None;
        }
        let id = FlagId(self.allocate_id());
        self.flags.insert(
            id,
            FlagInfo {
                id,
                coords: at,
                owner,
                building: None,
                roads: Vec::new(),
                wares_waiting: 0,
            },
        );
        self.flag_index.insert(at, id);
        if let Some(road) = self.road_tiles.get(&at).copied() {
            self.split_road(road, id);
        }
        Some(id)
    }

    /// Place a road along an explicit path whose endpoints carry flags
    pub fn place_road(&mut self, path: Vec<Coords>) -> Option<RoadId> {
        if path.len() < 2 {
            return None;
        }
        let start = *self.flag_index.get(path.first()?)?;
        let end = *self.flag_index.get(path.last()?)?;
        if start == end {
            return None;
        }
        let interior = &path[1..path.len() - 1];
        for c in interior {
            if self.flag_index.contains_key(c)
                || self.road_tiles.contains_key(c)
                || self.site_index.contains_key(c)
                || !self.fields.contains_key(c)
            {
                return None;
            }
        }
        let id = RoadId(self.allocate_id());
        for c in interior {
            self.road_tiles.insert(*c, id);
        }
        self.roads.insert(
            id,
            RoadInfo {
                id,
                start,
                end,
                path,
                wares_in_transit: 0,
            },
        );
        if let Some(flag) = self.flags.get_mut(&start) {
            flag.roads.push(id);
        }
        if let Some(flag) = self.flags.get_mut(&end) {
            flag.roads.push(id);
        }
        Some(id)
    }

    /// Connect two flags with the shortest free path
    pub fn connect(&mut self, a: FlagId, b: FlagId) -> Option<RoadId> {
        let from = self.flags.get(&a)?.coords;
        let to = self.flags.get(&b)?.coords;
        let path = self.find_path(from, to, 64)?;
        self.place_road(path)
    }

    /// Place a site for the sandbox player (flag is created when missing)
    pub fn place_site(
        &mut self,
        building_type: BuildingTypeId,
        at: Coords,
        complete: bool,
    ) -> Option<SiteId> {
        self.place_site_for(self.player, building_type, at, complete)
    }

    pub fn place_site_for(
        &mut self,
        owner: PlayerNumber,
        building_type: BuildingTypeId,
        at: Coords,
        complete: bool,
    ) -> Option<SiteId> {
        if self.site_index.contains_key(&at)
            || self.flag_index.contains_key(&at)
            || self.road_tiles.contains_key(&at)
            || !self.fields.contains_key(&at)
        {
            return None;
        }
        let flag = self.place_flag_for(owner, at.flag_position())?;
        let id = SiteId(self.allocate_id());
        let stage = if complete {
            SiteStage::Complete
        } else {
            SiteStage::UnderConstruction
        };
        self.sites.insert(
            id,
            SiteInfo {
                id,
                owner,
                building_type,
                coords: at,
                flag,
                stage,
                since: self.now,
                statistics_percent: 0,
                stopped: false,
                resources_depleted: false,
                workers: Vec::new(),
                soldiers: 0,
                soldier_capacity: 0,
                inputs: Vec::new(),
            },
        );
        self.site_index.insert(at, id);
        if let Some(flag_info) = self.flags.get_mut(&flag) {
            flag_info.building = Some(id);
        }
        Some(id)
    }

    pub fn site_mut(&mut self, id: SiteId) -> Option<&mut SiteInfo> {
        self.sites.get_mut(&id)
    }

    pub fn flag_mut(&mut self, id: FlagId) -> Option<&mut FlagInfo> {
        self.flags.get_mut(&id)
    }

    pub fn road_mut(&mut self, id: RoadId) -> Option<&mut RoadInfo> {
        self.roads.get_mut(&id)
    }

    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn has_flag(&self, id: FlagId) -> bool {
        self.flags.contains_key(&id)
    }

    pub fn has_road(&self, id: RoadId) -> bool {
        self.roads.contains_key(&id)
    }

    pub fn has_site(&self, id: SiteId) -> bool {
        self.sites.contains_key(&id)
    }

    /// Drain the command log
    pub fn take_issued(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.issued)
    }

    // === INTERNALS ===

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn is_occupied(&self, at: Coords) -> bool {
        self.site_index.contains_key(&at)
            || self.flag_index.contains_key(&at)
            || self.road_tiles.contains_key(&at)
    }

    fn owned_by_player(&self, at: Coords) -> bool {
        self.fields
            .get(&at)
            .is_some_and(|f| f.owner == Some(self.player))
    }

    fn flag_allowed(&self, at: Coords) -> bool {
        let Some(field) = self.fields.get(&at) else {
            return false;
        };
        if field.owner != Some(self.player) || field.cover != Cover::Open {
            return false;
        }
        if self.flag_index.contains_key(&at) || self.site_index.contains_key(&at) {
            return false;
        }
        // Flags need one free field between them
        !at.neighbors()
            .iter()
            .any(|n| self.flag_index.contains_key(n))
    }

    /// Flag position is usable for a building: own flag already there, or one may be placed
    fn flag_position_usable(&self, at: Coords) -> bool {
        let fp = at.flag_position();
        match self.flag_index.get(&fp) {
            Some(flag) => self.flags.get(flag).is_some_and(|f| f.owner == self.player),
            None => self.flag_allowed(fp),
        }
    }

    fn current_build_size(&self, at: Coords) -> BuildSize {
        let Some(field) = self.fields.get(&at) else {
            return BuildSize::None;
        };
        if field.owner != Some(self.player) || field.cover != Cover::Open || field.mineable {
            return BuildSize::None;
        }
        if self.is_occupied(at) || !self.flag_position_usable(at) {
            return BuildSize::None;
        }
        let crowded = at
            .neighbors()
            .iter()
            .any(|n| self.site_index.contains_key(n));
        if crowded {
            field.base_size.min(BuildSize::Small)
        } else {
            field.base_size
        }
    }

    fn current_mineable(&self, at: Coords) -> bool {
        let Some(field) = self.fields.get(&at) else {
            return false;
        };
        field.mineable
            && field.owner == Some(self.player)
            && !self.is_occupied(at)
            && self.flag_position_usable(at)
    }

    fn passable(&self, at: Coords) -> bool {
        self.fields
            .get(&at)
            .is_some_and(|f| f.cover == Cover::Open && f.owner == Some(self.player))
            && !self.site_index.contains_key(&at)
            && !self.road_tiles.contains_key(&at)
    }

    fn split_road(&mut self, road_id: RoadId, flag: FlagId) {
        let Some(road) = self.roads.remove(&road_id) else {
            return;
        };
        let Some(flag_coords) = self.flags.get(&flag).map(|f| f.coords) else {
            return;
        };
        let Some(split_at) = road.path.iter().position(|c| *c == flag_coords) else {
            self.roads.insert(road_id, road);
            return;
        };
        for c in &road.path[1..road.path.len() - 1] {
            self.road_tiles.remove(c);
        }
        for endpoint in [road.start, road.end] {
            if let Some(f) = self.flags.get_mut(&endpoint) {
                f.roads.retain(|r| *r != road_id);
            }
        }
        let first = road.path[..=split_at].to_vec();
        let second = road.path[split_at..].to_vec();
        self.place_road(first);
        self.place_road(second);
    }

    fn remove_road_internal(&mut self, road_id: RoadId) {
        let Some(road) = self.roads.remove(&road_id) else {
            return;
        };
        if road.path.len() > 2 {
            for c in &road.path[1..road.path.len() - 1] {
                self.road_tiles.remove(c);
            }
        }
        for endpoint in [road.start, road.end] {
            if let Some(f) = self.flags.get_mut(&endpoint) {
                f.roads.retain(|r| *r != road_id);
            }
        }
    }

    fn remove_site_internal(&mut self, site_id: SiteId) {
        let Some(site) = self.sites.remove(&site_id) else {
            return;
        };
        self.site_index.remove(&site.coords);
        if let Some(flag) = self.flags.get_mut(&site.flag) {
            flag.building = None;
        }
        for slot in &site.workers {
            if let Some(worker) = slot.assigned {
                *self.workers.entry(worker).or_insert(0) += 1;
            }
        }
        if let Some(soldier) = self.soldier_type {
            *self.workers.entry(soldier).or_insert(0) += site.soldiers;
        }
    }

    fn remove_flag_internal(&mut self, flag_id: FlagId) {
        let Some(flag) = self.flags.get(&flag_id).cloned() else {
            return;
        };
        for road in &flag.roads {
            self.remove_road_internal(*road);
        }
        if let Some(site) = flag.building {
            self.remove_site_internal(site);
        }
        self.flags.remove(&flag_id);
        self.flag_index.remove(&flag.coords);
    }

    fn apply(&mut self, command: &Command) {
        match command {
            Command::Build { building_type, at } => {
                if self.current_build_size(*at) != BuildSize::None || self.current_mineable(*at)
                {
                    self.place_site(*building_type, *at, false);
                }
            }
            Command::BuildFlag { at } => {
                if self.flag_allowed(*at) {
                    self.place_flag(*at);
                }
            }
            Command::BuildRoad { path } => {
                if let Some(last) = path.last() {
                    if !self.flag_index.contains_key(last) && self.flag_allowed(*last) {
                        self.place_flag(*last);
                    }
                }
                let all_owned = path.iter().all(|c| self.owned_by_player(*c));
                if all_owned {
                    self.place_road(path.clone());
                }
            }
            Command::RemoveFlag { flag } => self.remove_flag_internal(*flag),
            Command::RemoveRoad { road } => self.remove_road_internal(*road),
            Command::Dismantle { site } | Command::Bulldoze { site } => {
                self.remove_site_internal(*site)
            }
            Command::SetStopped { site, stopped } => {
                if let Some(s) = self.sites.get_mut(site) {
                    s.stopped = *stopped;
                }
            }
            Command::SetInputTarget { site, ware, target } => {
                if let Some(s) = self.sites.get_mut(site) {
                    for queue in s.inputs.iter_mut().filter(|q| q.ware == *ware) {
                        queue.target = (*target).min(queue.capacity);
                    }
                }
            }
            Command::EvictWorker { site, slot } => {
                let mut released = None;
                if let Some(s) = self.sites.get_mut(site) {
                    if let Some(position) = s.workers.get_mut(*slot) {
                        released = position.assigned.take();
                        position.level = 0;
                    }
                }
                if let Some(worker) = released {
                    *self.workers.entry(worker).or_insert(0) += 1;
                }
            }
            Command::Enhance { site } => {
                let now = self.now;
                let mut released = Vec::new();
                if let Some(s) = self.sites.get_mut(site) {
                    if let Some(next) = self.enhancements.get(&s.building_type) {
                        s.building_type = *next;
                        s.stage = SiteStage::UnderConstruction;
                        s.since = now;
                        s.statistics_percent = 0;
                        released.extend(s.workers.drain(..).filter_map(|w| w.assigned));
                        s.inputs.clear();
                    }
                }
                for worker in released {
                    *self.workers.entry(worker).or_insert(0) += 1;
                }
            }
        }
    }
}

impl GameEngine for SandboxWorld {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn player(&self) -> PlayerNumber {
        self.player
    }

    fn field(&self, at: Coords) -> Option<FieldInfo> {
        let field = self.fields.get(&at)?;
        Some(FieldInfo {
            coords: at,
            owner: field.owner,
            cover: field.cover,
            build_size: self.current_build_size(at),
            mineable: self.current_mineable(at),
            can_place_flag: self.flag_allowed(at),
            walkable: field.cover == Cover::Open && !self.site_index.contains_key(&at),
            resource: field.resource,
            resource_amount: field.resource_amount,
        })
    }

    fn owned_fields(&self) -> Vec<Coords> {
        let mut owned: Vec<Coords> = self
            .fields
            .iter()
            .filter(|(_, f)| f.owner == Some(self.player))
            .map(|(c, _)| *c)
            .collect();
        owned.sort();
        owned
    }

    fn flag(&self, id: FlagId) -> Option<FlagInfo> {
        self.flags.get(&id).cloned()
    }

    fn flag_at(&self, at: Coords) -> Option<FlagId> {
        self.flag_index.get(&at).copied()
    }

    fn road(&self, id: RoadId) -> Option<RoadInfo> {
        self.roads.get(&id).cloned()
    }

    fn road_at(&self, at: Coords) -> Option<RoadId> {
        self.road_tiles.get(&at).copied()
    }

    fn own_flags(&self) -> Vec<FlagId> {
        self.flags
            .values()
            .filter(|f| f.owner == self.player)
            .map(|f| f.id)
            .collect()
    }

    fn own_roads(&self) -> Vec<RoadId> {
        self.roads
            .values()
            .filter(|r| {
                self.flags
                    .get(&r.start)
                    .is_some_and(|f| f.owner == self.player)
            })
            .map(|r| r.id)
            .collect()
    }

    fn site(&self, id: SiteId) -> Option<SiteInfo> {
        self.sites.get(&id).cloned()
    }

    fn own_sites(&self) -> Vec<SiteId> {
        self.sites
            .values()
            .filter(|s| s.owner == self.player)
            .map(|s| s.id)
            .collect()
    }

    fn sites_within(&self, center: Coords, radius: u32) -> Vec<SiteInfo> {
        self.sites
            .values()
            .filter(|s| s.coords.distance(&center) <= radius)
            .cloned()
            .collect()
    }

    fn ware_stock(&self, ware: WareId) -> u32 {
        self.wares.get(&ware).copied().unwrap_or(0)
    }

    fn worker_stock(&self, worker: WorkerTypeId) -> u32 {
        self.workers.get(&worker).copied().unwrap_or(0)
    }

    fn player_strengths(&self) -> Vec<PlayerStrength> {
        self.strengths.clone()
    }

    fn find_path(&self, from: Coords, to: Coords, max_steps: u32) -> Option<Vec<Coords>> {
        if from == to {
            return None;
        }
        let mut came_from: AHashMap<Coords, Coords> = AHashMap::new();
        let mut depth: AHashMap<Coords, u32> = AHashMap::new();
        let mut queue = VecDeque::new();
        depth.insert(from, 0);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            let d = depth.get(&current).copied().unwrap_or(0);
            if d >= max_steps {
                continue;
            }
            for next in current.neighbors() {
                if depth.contains_key(&next) {
                    continue;
                }
                if next == to {
                    if !self.owned_by_player(to) {
                        return None;
                    }
                    let mut path = vec![to, current];
                    let mut cursor = current;
                    while let Some(prev) = came_from.get(&cursor) {
                        path.push(*prev);
                        cursor = *prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                if !self.passable(next) || self.flag_index.contains_key(&next) {
                    continue;
                }
                depth.insert(next, d + 1);
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
        None
    }

    fn send(&mut self, command: Command) {
        self.apply(&command);
        self.issued.push(command);
    }
}

/// Input queue helper for test setups
pub fn input_queue(ware: WareId, filled: u32, capacity: u32) -> InputQueue {
    InputQueue {
        ware,
        filled,
        capacity,
        target: capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WorkerSlot;

    fn world() -> SandboxWorld {
        let mut world = SandboxWorld::new(PlayerNumber(1));
        world.add_land(Coords::new(0, 0), 8, Some(PlayerNumber(1)));
        world
    }

    #[test]
    fn test_place_and_connect_flags() {
        let mut world = world();
        let a = world.place_flag(Coords::new(0, 0)).unwrap();
        let b = world.place_flag(Coords::new(4, 0)).unwrap();
        let road = world.connect(a, b).unwrap();
        assert_eq!(world.road(road).unwrap().steps(), 4);
        assert_eq!(world.flag(a).unwrap().degree(), 1);
        assert_eq!(world.road_at(Coords::new(2, 0)), Some(road));
    }

    #[test]
    fn test_flag_on_road_splits_it() {
        let mut world = world();
        let a = world.place_flag(Coords::new(0, 0)).unwrap();
        let b = world.place_flag(Coords::new(4, 0)).unwrap();
        world.connect(a, b).unwrap();
        world.send(Command::BuildFlag { at: Coords::new(2, 0) });
        assert_eq!(world.road_count(), 2);
        let middle = world.flag_at(Coords::new(2, 0)).unwrap();
        assert_eq!(world.flag(middle).unwrap().degree(), 2);
    }

    #[test]
    fn test_remove_flag_removes_building_and_roads() {
        let mut world = world();
        let site = world
            .place_site(BuildingTypeId(0), Coords::new(0, 0), true)
            .unwrap();
        let flag = world.site(site).unwrap().flag;
        let other = world.place_flag(Coords::new(4, 1)).unwrap();
        world.connect(flag, other).unwrap();

        world.send(Command::RemoveFlag { flag });
        assert!(!world.has_site(site));
        assert!(!world.has_flag(flag));
        assert_eq!(world.road_count(), 0);
        assert_eq!(world.flag(other).unwrap().degree(), 0);
    }

    #[test]
    fn test_build_size_respects_ownership_and_cover() {
        let mut world = world();
        world.add_land(Coords::new(20, 0), 2, None);
        assert_eq!(world.field(Coords::new(20, 0)).unwrap().build_size, BuildSize::None);
        assert_eq!(world.field(Coords::new(1, 1)).unwrap().build_size, BuildSize::Big);
        world.set_cover(Coords::new(1, 1), Cover::Tree);
        assert_eq!(world.field(Coords::new(1, 1)).unwrap().build_size, BuildSize::None);
    }

    #[test]
    fn test_path_avoids_sites() {
        let mut world = world();
        let a = world.place_flag(Coords::new(-3, 0)).unwrap();
        let b = world.place_flag(Coords::new(3, 0)).unwrap();
        world.place_site(BuildingTypeId(0), Coords::new(0, 0), true);
        let road = world.connect(a, b).unwrap();
        let path = world.road(road).unwrap().path;
        assert!(!path.contains(&Coords::new(0, 0)));
    }

    #[test]
    fn test_evict_worker_returns_to_stock() {
        let mut world = world();
        let site = world
            .place_site(BuildingTypeId(0), Coords::new(0, 0), true)
            .unwrap();
        world.site_mut(site).unwrap().workers.push(WorkerSlot {
            required: WorkerTypeId(1),
            required_level: 0,
            assigned: Some(WorkerTypeId(2)),
            level: 2,
        });
        world.send(Command::EvictWorker { site, slot: 0 });
        assert_eq!(world.worker_stock(WorkerTypeId(2)), 1);
        assert!(world.site(site).unwrap().workers[0].assigned.is_none());
    }
}
