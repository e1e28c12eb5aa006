//! Cached feature records of buildable and mineable spots

use ahash::{AHashMap, AHashSet};

use crate::core::config::SurveyConfig;
use crate::core::types::{
    BuildSize, BuildingTypeId, Cover, PlayerNumber, ResourceId, Timestamp,
};
use crate::core::Coords;
use crate::engine::{FieldInfo, GameEngine};
use crate::planner::profile::{BuildingCatalog, Capability};

/// Everything the planner wants to know about a buildable spot
#[derive(Debug, Clone, PartialEq)]
pub struct BuildableField {
    pub coords: Coords,
    pub size: BuildSize,
    /// False until the first full survey
    pub surveyed: bool,
    pub expires_at: Timestamp,

    // vicinity
    pub trees_nearby: u32,
    pub rocks_nearby: u32,
    pub water_nearby: u32,
    pub open_land_nearby: u32,
    /// Sum of resource amounts per resource in the vicinity
    pub resources_nearby: AHashMap<ResourceId, u32>,
    /// Own buildings (any stage) per type in the vicinity
    pub buildings_nearby: AHashMap<BuildingTypeId, u16>,
    pub space_consumers_nearby: u32,
    pub rangers_nearby: u32,
    pub road_nearby: bool,

    // territory
    pub unowned_land: u32,
    pub unowned_open_land: u32,
    pub unowned_mineable: u32,
    pub unowned_water: u32,
    pub enemy_land: u32,
    pub near_border: bool,
    /// Distance to the closest field we do not own
    pub border_distance: u32,

    // military
    pub enemy_military_sites: u32,
    pub enemy_soldiers: u32,
    /// Enemy soldiers weighted by closeness: a soldier at distance d counts
    /// `military_radius + 1 - d`
    pub enemy_soldier_pressure: u32,
    /// `military_radius + 1` minus the distance to the closest enemy military site
    pub enemy_closeness: u32,
    pub enemy_warehouse_nearby: bool,
    pub own_military_sites: u32,
    pub own_soldier_capacity: u32,
    pub own_soldiers_stationed: u32,
    pub military_under_construction: u32,
    /// Distance to the closest own military site, capped past the military radius
    pub loneliness: u32,

    pub military_score: i32,
}

impl BuildableField {
    pub fn new(coords: Coords, size: BuildSize) -> Self {
        Self {
            coords,
            size,
            surveyed: false,
            expires_at: 0,
            trees_nearby: 0,
            rocks_nearby: 0,
            water_nearby: 0,
            open_land_nearby: 0,
            resources_nearby: AHashMap::new(),
            buildings_nearby: AHashMap::new(),
            space_consumers_nearby: 0,
            rangers_nearby: 0,
            road_nearby: false,
            unowned_land: 0,
            unowned_open_land: 0,
            unowned_mineable: 0,
            unowned_water: 0,
            enemy_land: 0,
            near_border: false,
            border_distance: 0,
            enemy_military_sites: 0,
            enemy_soldiers: 0,
            enemy_soldier_pressure: 0,
            enemy_closeness: 0,
            enemy_warehouse_nearby: false,
            own_military_sites: 0,
            own_soldier_capacity: 0,
            own_soldiers_stationed: 0,
            military_under_construction: 0,
            loneliness: 0,
            military_score: 0,
        }
    }

    pub fn nearby_of_type(&self, building_type: BuildingTypeId) -> u32 {
        self.buildings_nearby
            .get(&building_type)
            .copied()
            .map(u32::from)
            .unwrap_or(0)
    }

    pub fn resource_nearby(&self, resource: ResourceId) -> u32 {
        self.resources_nearby.get(&resource).copied().unwrap_or(0)
    }

    /// Recompute every cached feature except the military score
    pub fn survey(
        &mut self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        enemies: &AHashSet<PlayerNumber>,
        config: &SurveyConfig,
    ) {
        let player = engine.player();
        let fields = engine.fields_within(self.coords, config.military_radius);
        self.survey_land(&fields, player, enemies, config);
        self.survey_sites(engine, catalog, player, enemies, config);
        self.road_nearby = has_road_nearby(engine, self.coords, config.road_radius);
        self.surveyed = true;
    }

    fn survey_land(
        &mut self,
        fields: &[FieldInfo],
        player: PlayerNumber,
        enemies: &AHashSet<PlayerNumber>,
        config: &SurveyConfig,
    ) {
        self.trees_nearby = 0;
        self.rocks_nearby = 0;
        self.water_nearby = 0;
        self.open_land_nearby = 0;
        self.resources_nearby.clear();
        self.unowned_land = 0;
        self.unowned_open_land = 0;
        self.unowned_mineable = 0;
        self.unowned_water = 0;
        self.enemy_land = 0;
        self.border_distance = config.military_radius + 1;

        for field in fields {
            let distance = field.coords.distance(&self.coords);
            if distance <= config.vicinity_radius {
                match field.cover {
                    Cover::Tree => self.trees_nearby += 1,
                    Cover::Rock => self.rocks_nearby += 1,
                    Cover::Water => self.water_nearby += 1,
                    Cover::Open => self.open_land_nearby += 1,
                    Cover::Blocked => {}
                }
                if let Some(resource) = field.resource {
                    *self.resources_nearby.entry(resource).or_insert(0) +=
                        u32::from(field.resource_amount);
                }
            }

            match field.owner {
                Some(owner) if owner == player => continue,
                None => {
                    self.unowned_land += 1;
                    match field.cover {
                        Cover::Open => self.unowned_open_land += 1,
                        Cover::Water => self.unowned_water += 1,
                        _ => {}
                    }
                    if field.resource.is_some() && field.cover != Cover::Water {
                        self.unowned_mineable += 1;
                    }
                }
                Some(owner) => {
                    if enemies.contains(&owner) {
                        self.enemy_land += 1;
                    }
                }
            }
            self.border_distance = self.border_distance.min(distance);
        }
        self.near_border = self.border_distance <= config.border_radius;
    }

    fn survey_sites(
        &mut self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        player: PlayerNumber,
        enemies: &AHashSet<PlayerNumber>,
        config: &SurveyConfig,
    ) {
        self.buildings_nearby.clear();
        self.space_consumers_nearby = 0;
        self.rangers_nearby = 0;
        self.enemy_military_sites = 0;
        self.enemy_soldiers = 0;
        self.enemy_soldier_pressure = 0;
        self.enemy_closeness = 0;
        self.enemy_warehouse_nearby = false;
        self.own_military_sites = 0;
        self.own_soldier_capacity = 0;
        self.own_soldiers_stationed = 0;
        self.military_under_construction = 0;
        self.loneliness = config.military_radius + 1;

        for site in engine.sites_within(self.coords, config.military_radius) {
            let Some(profile) = catalog.get(site.building_type) else {
                continue;
            };
            let distance = site.coords.distance(&self.coords);
            if site.owner == player {
                if distance <= config.vicinity_radius {
                    *self.buildings_nearby.entry(profile.id).or_insert(0) += 1;
                    if profile.has(Capability::SpaceConsumer) {
                        self.space_consumers_nearby += 1;
                    }
                    if profile.has(Capability::Ranger) {
                        self.rangers_nearby += 1;
                    }
                }
                if profile.is_military() {
                    self.loneliness = self.loneliness.min(distance);
                    if site.is_complete() {
                        self.own_military_sites += 1;
                        self.own_soldier_capacity += site.soldier_capacity;
                        self.own_soldiers_stationed += site.soldiers;
                    } else {
                        self.military_under_construction += 1;
                    }
                }
            } else if enemies.contains(&site.owner) {
                if profile.is_military() {
                    let closeness = (config.military_radius + 1).saturating_sub(distance);
                    self.enemy_military_sites += 1;
                    self.enemy_soldiers += site.soldiers;
                    self.enemy_soldier_pressure += site.soldiers * closeness;
                    self.enemy_closeness = self.enemy_closeness.max(closeness);
                }
                if profile.is_warehouse() {
                    self.enemy_warehouse_nearby = true;
                }
            }
        }
    }
}

/// Cached record of a spot where a mine could go
#[derive(Debug, Clone, PartialEq)]
pub struct MineableField {
    pub coords: Coords,
    pub surveyed: bool,
    pub expires_at: Timestamp,
    pub resource: Option<ResourceId>,
    /// Resource amount of the same kind within two fields
    pub amount: u32,
    /// Own mines of any kind in the vicinity
    pub mines_nearby: u32,
    pub near_border: bool,
    pub road_nearby: bool,
}

impl MineableField {
    pub fn new(coords: Coords) -> Self {
        Self {
            coords,
            surveyed: false,
            expires_at: 0,
            resource: None,
            amount: 0,
            mines_nearby: 0,
            near_border: false,
            road_nearby: false,
        }
    }

    pub fn survey(
        &mut self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        config: &SurveyConfig,
    ) {
        let player = engine.player();
        self.resource = engine.field(self.coords).and_then(|f| f.resource);
        self.amount = 0;
        self.near_border = false;
        for field in engine.fields_within(self.coords, config.border_radius) {
            if field.owner != Some(player) {
                self.near_border = true;
            }
            if field.coords.distance(&self.coords) <= 2
                && self.resource.is_some()
                && field.resource == self.resource
            {
                self.amount += u32::from(field.resource_amount);
            }
        }
        self.mines_nearby = engine
            .sites_within(self.coords, config.vicinity_radius)
            .iter()
            .filter(|s| s.owner == player)
            .filter(|s| catalog.get(s.building_type).is_some_and(|p| p.is_mine()))
            .count() as u32;
        self.road_nearby = has_road_nearby(engine, self.coords, config.road_radius);
        self.surveyed = true;
    }
}

/// Own flag or road within `radius`
pub fn has_road_nearby(engine: &dyn GameEngine, center: Coords, radius: u32) -> bool {
    let player = engine.player();
    center.within(radius).into_iter().any(|c| {
        engine
            .flag_at(c)
            .and_then(|id| engine.flag(id))
            .is_some_and(|f| f.owner == player)
            || engine.road_at(c).is_some()
    })
}
