//! Building catalog: static building type descriptors plus per-session counters
//!
//! Every building type is described by a closed role variant and an explicit
//! capability set. The catalog is loaded once per session (TOML or code) and
//! lives as long as the player; counters and priorities are refreshed every
//! planning cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::error::{CoreError, Result};
use crate::core::types::{
    BuildSize, BuildingTypeId, ResourceId, Timestamp, WareId, WorkerTypeId,
};
use crate::engine::SiteInfo;
use crate::planner::necessity::Necessity;

/// What a building type is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Producer,
    Mine { resource: ResourceId },
    Military { conquers: u32 },
    Warehouse { port: bool },
    Trainingsite,
}

/// Special behavior a building type has beyond its role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Needs open land around it (farms, reed yards)
    SpaceConsumer,
    Lumberjack,
    Ranger,
    Quarry,
    Fisher,
    Hunter,
    Well,
    /// Turns recruits into soldiers
    Barracks,
    NeedsWater,
}

/// Live counters of one building type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    pub built: u32,
    pub under_construction: u32,
    pub unoccupied: u32,
    pub stopped: u32,
}

impl SiteCounts {
    pub fn total(&self) -> u32 {
        self.built + self.under_construction
    }
}

#[derive(Debug, Clone)]
pub struct WareProfile {
    pub id: WareId,
    pub name: String,
    /// Stock level the economy tries to keep
    pub target: u32,
}

/// Descriptor of one building type
#[derive(Debug, Clone)]
pub struct BuildingTypeProfile {
    pub id: BuildingTypeId,
    pub name: String,
    pub size: BuildSize,
    pub role: Role,
    pub capabilities: BTreeSet<Capability>,
    pub inputs: Vec<WareId>,
    pub outputs: Vec<WareId>,
    /// Successor type reachable by enhancement
    pub enhancement: Option<BuildingTypeId>,
    pub enhanced_from: Option<BuildingTypeId>,
    /// False for types only obtainable by enhancement
    pub buildable: bool,
    /// Types whose presence makes this one unnecessary
    pub substitutes: Vec<BuildingTypeId>,
    /// Count required before the basic economy is complete
    pub basic_amount: u32,
    /// With zero instances after this time the type is forced
    pub forced_after: Option<Timestamp>,
    /// An enhancement requires a second instance of this type to keep
    pub keep_predecessor: bool,
    pub work_radius: u32,

    pub counts: SiteCounts,
    pub necessity: Necessity,
    pub primary_priority: i32,
    pub last_construction: Option<Timestamp>,
    /// Mean productivity of complete sites, 0..=100
    pub average_productivity: u8,
}

impl BuildingTypeProfile {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_producer(&self) -> bool {
        matches!(self.role, Role::Producer)
    }

    pub fn is_mine(&self) -> bool {
        matches!(self.role, Role::Mine { .. })
    }

    pub fn is_military(&self) -> bool {
        matches!(self.role, Role::Military { .. })
    }

    pub fn is_warehouse(&self) -> bool {
        matches!(self.role, Role::Warehouse { .. })
    }

    pub fn is_trainingsite(&self) -> bool {
        matches!(self.role, Role::Trainingsite)
    }

    pub fn mined_resource(&self) -> Option<ResourceId> {
        match self.role {
            Role::Mine { resource } => Some(resource),
            _ => None,
        }
    }
}

// === TOML DESCRIPTIONS ===

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RoleDescription {
    Producer,
    Mine {
        resource: String,
    },
    Military {
        conquers: u32,
    },
    Warehouse {
        #[serde(default)]
        port: bool,
    },
    Trainingsite,
}

fn default_true() -> bool {
    true
}

fn default_work_radius() -> u32 {
    6
}

#[derive(Debug, Clone, Deserialize)]
struct BuildingDescription {
    name: String,
    size: BuildSize,
    role: RoleDescription,
    #[serde(default)]
    capabilities: Vec<Capability>,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    enhancement: Option<String>,
    #[serde(default = "default_true")]
    buildable: bool,
    #[serde(default)]
    substitutes: Vec<String>,
    #[serde(default)]
    basic_amount: u32,
    /// Seconds of game time
    #[serde(default)]
    forced_after: Option<u64>,
    #[serde(default)]
    keep_predecessor: bool,
    #[serde(default = "default_work_radius")]
    work_radius: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WareDescription {
    name: String,
    target: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogDescription {
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    workers: Vec<String>,
    #[serde(default)]
    soldier: Option<String>,
    #[serde(default)]
    wares: Vec<WareDescription>,
    #[serde(default)]
    buildings: Vec<BuildingDescription>,
}

/// All building types, wares and workers of the player's tribe
#[derive(Debug, Clone, Default)]
pub struct BuildingCatalog {
    wares: Vec<WareProfile>,
    workers: Vec<String>,
    resources: Vec<String>,
    soldier: Option<WorkerTypeId>,
    types: Vec<BuildingTypeProfile>,
}

impl BuildingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let description: CatalogDescription = toml::from_str(content)?;
        Self::from_description(description)
    }

    /// Load a catalog from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn from_description(description: CatalogDescription) -> Result<Self> {
        let mut catalog = Self::new();
        for name in description.resources {
            catalog.add_resource(&name);
        }
        for name in description.workers {
            catalog.add_worker(&name);
        }
        for ware in description.wares {
            catalog.add_ware(&ware.name, ware.target);
        }
        if let Some(soldier) = description.soldier {
            let id = catalog.worker_by_name(&soldier).ok_or_else(|| {
                CoreError::Catalog(format!("soldier worker '{}' is not listed", soldier))
            })?;
            catalog.soldier = Some(id);
        }

        // First pass: register names so enhancement links can point forward
        for (index, building) in description.buildings.iter().enumerate() {
            let role = match &building.role {
                RoleDescription::Producer => Role::Producer,
                RoleDescription::Mine { resource } => Role::Mine {
                    resource: catalog.resource_by_name(resource).ok_or_else(|| {
                        CoreError::Catalog(format!(
                            "{}: unknown resource '{}'",
                            building.name, resource
                        ))
                    })?,
                },
                RoleDescription::Military { conquers } => Role::Military {
                    conquers: *conquers,
                },
                RoleDescription::Warehouse { port } => Role::Warehouse { port: *port },
                RoleDescription::Trainingsite => Role::Trainingsite,
            };
            let inputs = catalog.resolve_wares(&building.name, &building.inputs)?;
            let outputs = catalog.resolve_wares(&building.name, &building.outputs)?;
            catalog.types.push(BuildingTypeProfile {
                id: BuildingTypeId(index as u16),
                name: building.name.clone(),
                size: building.size,
                role,
                capabilities: building.capabilities.iter().copied().collect(),
                inputs,
                outputs,
                enhancement: None,
                enhanced_from: None,
                buildable: building.buildable,
                substitutes: Vec::new(),
                basic_amount: building.basic_amount,
                forced_after: building.forced_after.map(|secs| secs * 1_000),
                keep_predecessor: building.keep_predecessor,
                work_radius: building.work_radius,
                counts: SiteCounts::default(),
                necessity: Necessity::NotNeeded,
                primary_priority: 0,
                last_construction: None,
                average_productivity: 0,
            });
        }

        // Second pass: links between types
        for (index, building) in description.buildings.iter().enumerate() {
            if let Some(next) = &building.enhancement {
                let next_id = catalog.type_by_name(next).ok_or_else(|| {
                    CoreError::Catalog(format!("{}: unknown enhancement '{}'", building.name, next))
                })?;
                catalog.types[index].enhancement = Some(next_id);
                catalog.types[next_id.0 as usize].enhanced_from =
                    Some(BuildingTypeId(index as u16));
            }
            let mut substitutes = Vec::new();
            for name in &building.substitutes {
                substitutes.push(catalog.type_by_name(name).ok_or_else(|| {
                    CoreError::Catalog(format!("{}: unknown substitute '{}'", building.name, name))
                })?);
            }
            catalog.types[index].substitutes = substitutes;
        }

        Ok(catalog)
    }

    fn resolve_wares(&self, building: &str, names: &[String]) -> Result<Vec<WareId>> {
        names
            .iter()
            .map(|name| {
                self.ware_by_name(name).ok_or_else(|| {
                    CoreError::Catalog(format!("{}: unknown ware '{}'", building, name))
                })
            })
            .collect()
    }

    // === PROGRAMMATIC CONSTRUCTION ===

    pub fn add_resource(&mut self, name: &str) -> ResourceId {
        self.resources.push(name.to_string());
        ResourceId((self.resources.len() - 1) as u8)
    }

    pub fn add_worker(&mut self, name: &str) -> WorkerTypeId {
        self.workers.push(name.to_string());
        WorkerTypeId((self.workers.len() - 1) as u16)
    }

    pub fn add_ware(&mut self, name: &str, target: u32) -> WareId {
        let id = WareId(self.wares.len() as u16);
        self.wares.push(WareProfile {
            id,
            name: name.to_string(),
            target,
        });
        id
    }

    pub fn set_soldier(&mut self, worker: WorkerTypeId) {
        self.soldier = Some(worker);
    }

    /// Add a building type with neutral defaults; adjust through `get_mut`
    pub fn add_type(&mut self, name: &str, size: BuildSize, role: Role) -> BuildingTypeId {
        let id = BuildingTypeId(self.types.len() as u16);
        self.types.push(BuildingTypeProfile {
            id,
            name: name.to_string(),
            size,
            role,
            capabilities: BTreeSet::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            enhancement: None,
            enhanced_from: None,
            buildable: true,
            substitutes: Vec::new(),
            basic_amount: 0,
            forced_after: None,
            keep_predecessor: false,
            work_radius: default_work_radius(),
            counts: SiteCounts::default(),
            necessity: Necessity::NotNeeded,
            primary_priority: 0,
            last_construction: None,
            average_productivity: 0,
        });
        id
    }

    /// Link `from` to its enhanced successor `to`
    pub fn link_enhancement(&mut self, from: BuildingTypeId, to: BuildingTypeId) {
        if let Some(profile) = self.get_mut(from) {
            profile.enhancement = Some(to);
        }
        if let Some(profile) = self.get_mut(to) {
            profile.enhanced_from = Some(from);
            profile.buildable = false;
        }
    }

    // === LOOKUP ===

    pub fn get(&self, id: BuildingTypeId) -> Option<&BuildingTypeProfile> {
        self.types.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: BuildingTypeId) -> Option<&mut BuildingTypeProfile> {
        self.types.get_mut(id.0 as usize)
    }

    pub fn types(&self) -> &[BuildingTypeProfile] {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut [BuildingTypeProfile] {
        &mut self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn wares(&self) -> &[WareProfile] {
        &self.wares
    }

    pub fn ware(&self, id: WareId) -> Option<&WareProfile> {
        self.wares.get(id.0 as usize)
    }

    pub fn ware_by_name(&self, name: &str) -> Option<WareId> {
        self.wares.iter().find(|w| w.name == name).map(|w| w.id)
    }

    pub fn type_by_name(&self, name: &str) -> Option<BuildingTypeId> {
        self.types.iter().find(|t| t.name == name).map(|t| t.id)
    }

    pub fn worker_by_name(&self, name: &str) -> Option<WorkerTypeId> {
        self.workers
            .iter()
            .position(|w| w == name)
            .map(|i| WorkerTypeId(i as u16))
    }

    pub fn resource_by_name(&self, name: &str) -> Option<ResourceId> {
        self.resources
            .iter()
            .position(|r| r == name)
            .map(|i| ResourceId(i as u8))
    }

    pub fn soldier(&self) -> Option<WorkerTypeId> {
        self.soldier
    }

    /// Types producing the given ware
    pub fn producers_of(&self, ware: WareId) -> impl Iterator<Item = &BuildingTypeProfile> {
        self.types.iter().filter(move |t| t.outputs.contains(&ware))
    }

    /// Number of standing (complete) sites of every type with the given role predicate
    pub fn count_built(&self, predicate: impl Fn(&BuildingTypeProfile) -> bool) -> u32 {
        self.types
            .iter()
            .filter(|t| predicate(t))
            .map(|t| t.counts.built)
            .sum()
    }

    pub fn count_under_construction(
        &self,
        predicate: impl Fn(&BuildingTypeProfile) -> bool,
    ) -> u32 {
        self.types
            .iter()
            .filter(|t| predicate(t))
            .map(|t| t.counts.under_construction)
            .sum()
    }

    // === COUNTERS ===

    /// Recount all sites from an engine snapshot of the player's sites
    pub fn recount(&mut self, sites: &[SiteInfo]) {
        let mut productivity_sum = vec![0u32; self.types.len()];
        for profile in &mut self.types {
            profile.counts = SiteCounts::default();
        }
        for site in sites {
            let Some(profile) = self.types.get_mut(site.building_type.0 as usize) else {
                continue;
            };
            if site.is_complete() {
                profile.counts.built += 1;
                if !site.is_occupied() {
                    profile.counts.unoccupied += 1;
                }
                if site.stopped {
                    profile.counts.stopped += 1;
                }
                productivity_sum[site.building_type.0 as usize] +=
                    u32::from(site.statistics_percent);
            } else {
                profile.counts.under_construction += 1;
            }
        }
        for (profile, sum) in self.types.iter_mut().zip(productivity_sum) {
            profile.average_productivity = if profile.counts.built > 0 {
                (sum / profile.counts.built).min(100) as u8
            } else {
                0
            };
        }
    }

    /// Configuration problems that disable a feature; logged, never fatal
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.types.iter().any(|t| t.is_warehouse()) {
            warnings.push("no warehouse type: warehouse expansion disabled".to_string());
        }
        if !self.types.iter().any(|t| t.is_military()) {
            warnings.push("no military type: territory expansion disabled".to_string());
        }
        if !self.types.iter().any(|t| t.has(Capability::Barracks)) {
            warnings.push("no barracks type: soldier production is never planned".to_string());
        }
        if self.soldier.is_none() {
            warnings.push("no soldier worker: military vacancy checks disabled".to_string());
        }
        let has_lumberjack = self.types.iter().any(|t| t.has(Capability::Lumberjack));
        let has_ranger = self.types.iter().any(|t| t.has(Capability::Ranger));
        if has_lumberjack && !has_ranger {
            warnings.push("lumberjacks without a ranger type: forests will not regrow".to_string());
        }
        for warning in &warnings {
            tracing::warn!("building catalog: {}", warning);
        }
        warnings
    }
}
