//! Phase A: does the settlement need another building of a type?
//!
//! `classify` is a pure function of the catalog counters and an
//! [`EconomySnapshot`] taken once per planning cycle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::PlannerConfig;
use crate::core::types::{BuildingTypeId, ResourceId, Timestamp, WareId};
use crate::planner::profile::{BuildingCatalog, BuildingTypeProfile, Capability, Role};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Necessity {
    /// Never build (enhancement-only types)
    Forbidden,
    #[default]
    NotNeeded,
    /// May be built if a good spot turns up
    Allowed,
    /// Needed, but an earlier site of the type is not productive yet
    NeededPending,
    Needed,
    /// Overdue; built before anything else
    Forced,
}

impl Necessity {
    /// Whether the planner scores sites for this type at all
    pub fn is_candidate(&self) -> bool {
        !matches!(self, Necessity::Forbidden | Necessity::NotNeeded)
    }
}

/// Settlement-wide facts for one planning cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EconomySnapshot {
    pub now: Timestamp,
    pub stock: BTreeMap<WareId, u32>,
    /// Basic-economy types still below their basic amount
    pub basic_remaining: BTreeSet<BuildingTypeId>,
    pub military_sites: u32,
    pub military_under_construction: u32,
    pub productionsites: u32,
    pub warehouses: u32,
    pub warehouses_under_construction: u32,
    /// Flags further from a warehouse than the configured limit
    pub far_flags: usize,
    /// Known mine spots per resource
    pub mine_spots: BTreeMap<ResourceId, usize>,
    pub vacant_soldier_positions: u32,
    pub soldier_stock: u32,
    /// The minimum interval since the last new mine has passed
    pub mine_gate_open: bool,
}

impl EconomySnapshot {
    pub fn basic_economy_complete(&self) -> bool {
        self.basic_remaining.is_empty()
    }

    pub fn stock_of(&self, ware: WareId) -> u32 {
        self.stock.get(&ware).copied().unwrap_or(0)
    }
}

/// Classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NecessityResult {
    pub necessity: Necessity,
    pub primary_priority: i32,
}

impl NecessityResult {
    fn new(necessity: Necessity, priority: i32) -> Self {
        let primary_priority = if necessity.is_candidate() {
            priority.max(0)
        } else {
            0
        };
        Self {
            necessity,
            primary_priority,
        }
    }

    fn not_needed() -> Self {
        Self::new(Necessity::NotNeeded, 0)
    }
}

/// Summed shortfall of the type's outputs against their targets
fn output_shortage(profile: &BuildingTypeProfile, catalog: &BuildingCatalog, snapshot: &EconomySnapshot) -> u32 {
    profile
        .outputs
        .iter()
        .filter_map(|w| catalog.ware(*w))
        .map(|w| w.target.saturating_sub(snapshot.stock_of(w.id)))
        .sum()
}

/// An input is missing from stock and nobody produces it
fn inputs_starved(profile: &BuildingTypeProfile, catalog: &BuildingCatalog, snapshot: &EconomySnapshot) -> bool {
    profile.inputs.iter().any(|ware| {
        snapshot.stock_of(*ware) == 0 && catalog.producers_of(*ware).all(|p| p.counts.built == 0)
    })
}

/// A substitute, predecessor or successor of the type already stands
fn replacement_exists(profile: &BuildingTypeProfile, catalog: &BuildingCatalog) -> bool {
    profile
        .substitutes
        .iter()
        .copied()
        .chain(profile.enhancement)
        .chain(profile.enhanced_from)
        .filter_map(|id| catalog.get(id))
        .any(|other| other.counts.total() > 0)
}

pub fn classify(
    catalog: &BuildingCatalog,
    id: BuildingTypeId,
    snapshot: &EconomySnapshot,
    config: &PlannerConfig,
) -> NecessityResult {
    let Some(profile) = catalog.get(id) else {
        return NecessityResult::new(Necessity::Forbidden, 0);
    };
    if !profile.buildable {
        return NecessityResult::new(Necessity::Forbidden, 0);
    }
    let counts = profile.counts;

    // Overdue types come first, whatever their role
    let overdue = profile.forced_after.is_some_and(|t| snapshot.now >= t);
    if overdue && counts.total() == 0 && !replacement_exists(profile, catalog) {
        return NecessityResult::new(Necessity::Forced, config.forced_priority);
    }

    match profile.role {
        Role::Military { .. } => classify_military(profile, snapshot, config),
        Role::Warehouse { .. } => classify_warehouse(profile, snapshot, config),
        Role::Trainingsite => {
            if snapshot.basic_economy_complete()
                && snapshot.military_sites >= config.trainingsite_military_threshold
                && counts.total() == 0
            {
                NecessityResult::new(Necessity::Allowed, config.needed_priority / 2)
            } else {
                NecessityResult::not_needed()
            }
        }
        Role::Mine { resource } => classify_mine(profile, resource, catalog, snapshot, config),
        Role::Producer => classify_producer(profile, catalog, snapshot, config),
    }
}

fn classify_military(
    profile: &BuildingTypeProfile,
    snapshot: &EconomySnapshot,
    config: &PlannerConfig,
) -> NecessityResult {
    let allowed_sites = config.max_military_constructionsites
        + snapshot.military_sites / config.military_sites_per_extra_site.max(1);
    if snapshot.military_under_construction >= allowed_sites {
        return NecessityResult::not_needed();
    }
    // Empty military buildings and nobody to send there
    if profile.counts.unoccupied > 0 && snapshot.soldier_stock == 0 {
        return NecessityResult::not_needed();
    }
    if snapshot.vacant_soldier_positions > snapshot.soldier_stock.saturating_mul(2) + 2 {
        return NecessityResult::new(Necessity::NeededPending, 0);
    }
    NecessityResult::new(Necessity::Allowed, 0)
}

fn classify_warehouse(
    profile: &BuildingTypeProfile,
    snapshot: &EconomySnapshot,
    config: &PlannerConfig,
) -> NecessityResult {
    if snapshot.warehouses_under_construction > 0 || profile.counts.under_construction > 0 {
        return NecessityResult::not_needed();
    }
    if snapshot.far_flags > 0 {
        let urgency = snapshot.far_flags.min(20) as i32 * 5;
        return NecessityResult::new(Necessity::Needed, config.needed_priority + urgency);
    }
    let by_size = snapshot.productionsites
        / config.productionsites_per_warehouse.max(1);
    if by_size >= snapshot.warehouses.max(1) {
        return NecessityResult::new(Necessity::Allowed, config.needed_priority / 2);
    }
    NecessityResult::not_needed()
}

fn classify_mine(
    profile: &BuildingTypeProfile,
    resource: ResourceId,
    catalog: &BuildingCatalog,
    snapshot: &EconomySnapshot,
    config: &PlannerConfig,
) -> NecessityResult {
    if !snapshot.mine_gate_open
        || snapshot.mine_spots.get(&resource).copied().unwrap_or(0) == 0
        || profile.counts.under_construction >= config.max_constructionsites_per_type
    {
        return NecessityResult::not_needed();
    }
    let same_resource: u32 = catalog
        .types()
        .iter()
        .filter(|t| t.mined_resource() == Some(resource))
        .map(|t| t.counts.total())
        .sum();
    let shortage = output_shortage(profile, catalog, snapshot);
    if shortage > 0 {
        let pending = profile.counts.unoccupied > 0 || inputs_starved(profile, catalog, snapshot);
        let necessity = if pending {
            Necessity::NeededPending
        } else {
            Necessity::Needed
        };
        let priority = config.needed_priority + shortage.min(50) as i32
            - same_resource.min(10) as i32 * 5;
        let priority = if pending { priority / 2 } else { priority };
        return NecessityResult::new(necessity, priority);
    }
    if same_resource == 0 {
        return NecessityResult::new(Necessity::Allowed, config.needed_priority / 3);
    }
    NecessityResult::not_needed()
}

fn classify_producer(
    profile: &BuildingTypeProfile,
    catalog: &BuildingCatalog,
    snapshot: &EconomySnapshot,
    config: &PlannerConfig,
) -> NecessityResult {
    let counts = profile.counts;
    if counts.under_construction >= config.max_constructionsites_per_type {
        return NecessityResult::not_needed();
    }

    // Bootstrap: basic types first, nothing else producing
    if !snapshot.basic_economy_complete() {
        if snapshot.basic_remaining.contains(&profile.id) && counts.total() < profile.basic_amount
        {
            let missing = (profile.basic_amount - counts.total()) as i32;
            return NecessityResult::new(Necessity::Needed, config.basic_priority + missing * 10);
        }
        return NecessityResult::not_needed();
    }

    if profile.has(Capability::Ranger) {
        return classify_ranger(profile, catalog, config);
    }
    if profile.has(Capability::Barracks) {
        if snapshot.vacant_soldier_positions > snapshot.soldier_stock
            || (counts.built == 0 && snapshot.military_sites > 0)
        {
            let missing = snapshot
                .vacant_soldier_positions
                .saturating_sub(snapshot.soldier_stock)
                .min(20) as i32;
            return NecessityResult::new(Necessity::Needed, config.needed_priority + missing * 3);
        }
        return NecessityResult::not_needed();
    }

    // Idle capacity already exists
    if counts.stopped > 0 {
        return NecessityResult::not_needed();
    }

    let shortage = output_shortage(profile, catalog, snapshot);
    if shortage > 0 {
        let pending = counts.unoccupied > 0
            || inputs_starved(profile, catalog, snapshot)
            || (counts.built > 0 && profile.average_productivity < 30);
        let priority = config.needed_priority + shortage.min(50) as i32 * 2
            - counts.total().min(10) as i32 * 10;
        if pending {
            return NecessityResult::new(Necessity::NeededPending, priority / 2);
        }
        return NecessityResult::new(Necessity::Needed, priority);
    }

    if counts.total() == 0 && !profile.outputs.is_empty() {
        return NecessityResult::new(Necessity::Allowed, config.needed_priority / 4);
    }
    NecessityResult::not_needed()
}

/// Rangers keep pace with lumberjacks
fn classify_ranger(
    profile: &BuildingTypeProfile,
    catalog: &BuildingCatalog,
    config: &PlannerConfig,
) -> NecessityResult {
    let lumberjacks = catalog.count_built(|t| t.has(Capability::Lumberjack))
        + catalog.count_under_construction(|t| t.has(Capability::Lumberjack));
    let rangers = catalog.count_built(|t| t.has(Capability::Ranger))
        + catalog.count_under_construction(|t| t.has(Capability::Ranger));
    if lumberjacks > rangers {
        let behind = (lumberjacks - rangers).min(10) as i32;
        let necessity = if profile.counts.unoccupied > 0 {
            Necessity::NeededPending
        } else {
            Necessity::Needed
        };
        return NecessityResult::new(necessity, config.needed_priority + behind * 10);
    }
    NecessityResult::not_needed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BuildSize;

    struct Fixture {
        catalog: BuildingCatalog,
        log: WareId,
        planks: WareId,
        lumberjack: BuildingTypeId,
        ranger: BuildingTypeId,
        sawmill: BuildingTypeId,
        sentry: BuildingTypeId,
        warehouse: BuildingTypeId,
    }

    fn fixture() -> Fixture {
        let mut catalog = BuildingCatalog::new();
        let log = catalog.add_ware("log", 20);
        let planks = catalog.add_ware("planks", 10);
        let lumberjack = catalog.add_type("lumberjack", BuildSize::Small, Role::Producer);
        let ranger = catalog.add_type("ranger", BuildSize::Small, Role::Producer);
        let sawmill = catalog.add_type("sawmill", BuildSize::Medium, Role::Producer);
        let sentry = catalog.add_type("sentry", BuildSize::Small, Role::Military { conquers: 6 });
        let warehouse =
            catalog.add_type("warehouse", BuildSize::Medium, Role::Warehouse { port: false });
        {
            let p = catalog.get_mut(lumberjack).unwrap();
            p.capabilities.insert(Capability::Lumberjack);
            p.outputs = vec![log];
            p.basic_amount = 1;
        }
        catalog
            .get_mut(ranger)
            .unwrap()
            .capabilities
            .insert(Capability::Ranger);
        {
            let p = catalog.get_mut(sawmill).unwrap();
            p.inputs = vec![log];
            p.outputs = vec![planks];
        }
        Fixture {
            catalog,
            log,
            planks,
            lumberjack,
            ranger,
            sawmill,
            sentry,
            warehouse,
        }
    }

    fn snapshot() -> EconomySnapshot {
        EconomySnapshot {
            mine_gate_open: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_economy_bootstrap() {
        let f = fixture();
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        snap.basic_remaining.insert(f.lumberjack);

        let lumberjack = classify(&f.catalog, f.lumberjack, &snap, &config);
        assert_eq!(lumberjack.necessity, Necessity::Needed);
        assert_eq!(lumberjack.primary_priority, config.basic_priority + 10);

        // Everything else waits for the basic economy
        let sawmill = classify(&f.catalog, f.sawmill, &snap, &config);
        assert_eq!(sawmill.necessity, Necessity::NotNeeded);
        assert_eq!(sawmill.primary_priority, 0);
    }

    #[test]
    fn test_forced_after_deadline() {
        let mut f = fixture();
        f.catalog.get_mut(f.sawmill).unwrap().forced_after = Some(60_000);
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        snap.basic_remaining.insert(f.lumberjack);

        snap.now = 59_999;
        assert_ne!(
            classify(&f.catalog, f.sawmill, &snap, &config).necessity,
            Necessity::Forced
        );
        snap.now = 60_000;
        let result = classify(&f.catalog, f.sawmill, &snap, &config);
        assert_eq!(result.necessity, Necessity::Forced);
        assert_eq!(result.primary_priority, config.forced_priority);

        // Not forced once a substitute stands
        f.catalog.get_mut(f.sawmill).unwrap().substitutes = vec![f.ranger];
        f.catalog.get_mut(f.ranger).unwrap().counts.built = 1;
        assert_ne!(
            classify(&f.catalog, f.sawmill, &snap, &config).necessity,
            Necessity::Forced
        );
    }

    #[test]
    fn test_output_shortage_makes_needed() {
        let mut f = fixture();
        f.catalog.get_mut(f.lumberjack).unwrap().counts.built = 1;
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        snap.stock.insert(f.log, 30);
        snap.stock.insert(f.planks, 2);

        let sawmill = classify(&f.catalog, f.sawmill, &snap, &config);
        assert_eq!(sawmill.necessity, Necessity::Needed);
        assert!(sawmill.primary_priority > 0);

        // Enough logs: another lumberjack is not needed
        let lumberjack = classify(&f.catalog, f.lumberjack, &snap, &config);
        assert_eq!(lumberjack.necessity, Necessity::NotNeeded);
    }

    #[test]
    fn test_starved_inputs_pending() {
        let f = fixture();
        let config = PlannerConfig::default();
        let snap = snapshot();
        // No logs, no lumberjack standing
        let sawmill = classify(&f.catalog, f.sawmill, &snap, &config);
        assert_eq!(sawmill.necessity, Necessity::NeededPending);
    }

    #[test]
    fn test_ranger_follows_lumberjacks() {
        let mut f = fixture();
        let config = PlannerConfig::default();
        let snap = snapshot();
        assert_eq!(
            classify(&f.catalog, f.ranger, &snap, &config).necessity,
            Necessity::NotNeeded
        );
        f.catalog.get_mut(f.lumberjack).unwrap().counts.built = 2;
        assert_eq!(
            classify(&f.catalog, f.ranger, &snap, &config).necessity,
            Necessity::Needed
        );
    }

    #[test]
    fn test_military_limited_by_construction_sites() {
        let f = fixture();
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        assert_eq!(
            classify(&f.catalog, f.sentry, &snap, &config).necessity,
            Necessity::Allowed
        );
        snap.military_under_construction = config.max_military_constructionsites;
        assert_eq!(
            classify(&f.catalog, f.sentry, &snap, &config).necessity,
            Necessity::NotNeeded
        );
    }

    #[test]
    fn test_warehouse_for_far_flags() {
        let f = fixture();
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        snap.warehouses = 1;
        assert_eq!(
            classify(&f.catalog, f.warehouse, &snap, &config).necessity,
            Necessity::NotNeeded
        );
        snap.far_flags = 3;
        let result = classify(&f.catalog, f.warehouse, &snap, &config);
        assert_eq!(result.necessity, Necessity::Needed);
        assert_eq!(result.primary_priority, config.needed_priority + 15);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let f = fixture();
        let config = PlannerConfig::default();
        let mut snap = snapshot();
        snap.stock.insert(f.planks, 3);
        for id in [f.lumberjack, f.ranger, f.sawmill, f.sentry, f.warehouse] {
            assert_eq!(
                classify(&f.catalog, id, &snap, &config),
                classify(&f.catalog, id, &snap, &config)
            );
        }
    }

    #[test]
    fn test_enhancement_only_type_forbidden() {
        let mut f = fixture();
        let big = f
            .catalog
            .add_type("big_sawmill", BuildSize::Medium, Role::Producer);
        f.catalog.link_enhancement(f.sawmill, big);
        assert_eq!(
            classify(&f.catalog, big, &snapshot(), &config_default()).necessity,
            Necessity::Forbidden
        );
    }

    fn config_default() -> PlannerConfig {
        PlannerConfig::default()
    }
}
