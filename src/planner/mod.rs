//! Construction planning
//!
//! One planning cycle runs three phases:
//!
//! - Phase A classifies every building type ([`necessity::classify`]) and
//!   stores necessity and primary priority on the catalog profile.
//! - Phase B scores every candidate (type, field) pair.
//! - Phase C commits to the single best pair, if any scores above zero.
//!
//! Ties go to the lowest building type id, then to the field that comes
//! first in survey rotation order.

pub mod blocked;
pub mod military_bounds;
pub mod necessity;
pub mod profile;
pub mod site_score;

pub use blocked::BlockedFields;
pub use military_bounds::{ExpansionPressure, MilitaryScoreBounds};
pub use necessity::{classify, EconomySnapshot, Necessity, NecessityResult};
pub use profile::{BuildingCatalog, BuildingTypeProfile, Capability, Role, SiteCounts};

use std::collections::BTreeSet;

use crate::core::config::PlannerConfig;
use crate::core::types::{BuildSize, BuildingTypeId, Timestamp};
use crate::core::Coords;
use crate::engine::{Command, GameEngine, SiteInfo};
use crate::roads::FlagDistances;
use crate::scoring::ScoringFunction;
use crate::survey::{BuildableField, FieldSurvey, SettlementOutlook};
use site_score::{score_military_site, score_mine, score_site, SiteContext};

/// The one construction a planning cycle commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub building_type: BuildingTypeId,
    pub location: Coords,
    pub score: i32,
}

/// Read-only inputs of a planning cycle
pub struct PlanningInputs<'a> {
    pub survey: &'a FieldSurvey,
    pub distances: &'a FlagDistances,
    pub scoring: &'a dyn ScoringFunction,
    pub outlook: &'a SettlementOutlook,
    /// Soldier positions in military sites nobody fills yet
    pub vacant_soldier_positions: u32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    building_type: BuildingTypeId,
    location: Coords,
    score: i32,
    /// Position in survey rotation order
    order: usize,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        (self.score, std::cmp::Reverse(self.building_type), std::cmp::Reverse(self.order))
            > (other.score, std::cmp::Reverse(other.building_type), std::cmp::Reverse(other.order))
    }
}

fn keep_best(best: &mut Option<Candidate>, candidate: Candidate) {
    if best.as_ref().map_or(true, |b| candidate.beats(b)) {
        *best = Some(candidate);
    }
}

#[derive(Debug, Clone)]
pub struct ConstructionPlanner {
    config: PlannerConfig,
    bounds: MilitaryScoreBounds,
    basic_remaining: BTreeSet<BuildingTypeId>,
    blocked: BlockedFields,
    next_mine_construction_due: Timestamp,
    last_action: Option<Action>,
    cycles: u64,
}

impl ConstructionPlanner {
    pub fn new(config: PlannerConfig, military_upper_limit: i32, catalog: &BuildingCatalog) -> Self {
        let bounds = MilitaryScoreBounds::new(military_upper_limit, &config);
        let basic_remaining = catalog
            .types()
            .iter()
            .filter(|t| t.basic_amount > 0 && t.buildable)
            .map(|t| t.id)
            .collect();
        Self {
            config,
            bounds,
            basic_remaining,
            blocked: BlockedFields::new(),
            next_mine_construction_due: 0,
            last_action: None,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn bounds(&self) -> &MilitaryScoreBounds {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> &mut MilitaryScoreBounds {
        &mut self.bounds
    }

    pub fn set_bounds(&mut self, bounds: MilitaryScoreBounds) {
        self.bounds = bounds;
    }

    pub fn basic_remaining(&self) -> &BTreeSet<BuildingTypeId> {
        &self.basic_remaining
    }

    pub fn set_basic_remaining(&mut self, remaining: BTreeSet<BuildingTypeId>) {
        self.basic_remaining = remaining;
    }

    pub fn basic_economy_complete(&self) -> bool {
        self.basic_remaining.is_empty()
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    pub fn next_mine_construction_due(&self) -> Timestamp {
        self.next_mine_construction_due
    }

    pub fn blocked(&self) -> &BlockedFields {
        &self.blocked
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    // === PHASE A ===

    /// Recount sites and reclassify every type
    fn update_necessities(
        &mut self,
        engine: &dyn GameEngine,
        catalog: &mut BuildingCatalog,
        inputs: &PlanningInputs,
        now: Timestamp,
    ) {
        let sites: Vec<SiteInfo> = engine
            .own_sites()
            .into_iter()
            .filter_map(|id| engine.site(id))
            .collect();
        catalog.recount(&sites);

        let before = self.basic_remaining.len();
        self.basic_remaining.retain(|id| {
            catalog
                .get(*id)
                .is_some_and(|t| t.counts.total() < t.basic_amount)
        });
        if before > 0 && self.basic_remaining.is_empty() {
            tracing::info!("basic economy complete at {} ms", now);
        }

        let snapshot = self.snapshot(engine, catalog, inputs, now);
        let results: Vec<(BuildingTypeId, NecessityResult)> = catalog
            .types()
            .iter()
            .map(|t| (t.id, classify(catalog, t.id, &snapshot, &self.config)))
            .collect();
        for (id, result) in results {
            if let Some(profile) = catalog.get_mut(id) {
                profile.necessity = result.necessity;
                profile.primary_priority = result.primary_priority;
            }
        }
    }

    fn snapshot(
        &self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        inputs: &PlanningInputs,
        now: Timestamp,
    ) -> EconomySnapshot {
        let mut snapshot = EconomySnapshot {
            now,
            basic_remaining: self.basic_remaining.clone(),
            military_sites: catalog.count_built(|t| t.is_military()),
            military_under_construction: catalog.count_under_construction(|t| t.is_military()),
            productionsites: catalog.count_built(|t| t.is_producer() || t.is_mine()),
            warehouses: catalog.count_built(|t| t.is_warehouse()),
            warehouses_under_construction: catalog.count_under_construction(|t| t.is_warehouse()),
            far_flags: inputs.distances.beyond(self.config.warehouse_flag_distance),
            vacant_soldier_positions: inputs.vacant_soldier_positions,
            soldier_stock: catalog.soldier().map_or(0, |s| engine.worker_stock(s)),
            mine_gate_open: now >= self.next_mine_construction_due,
            ..Default::default()
        };
        for ware in catalog.wares() {
            snapshot.stock.insert(ware.id, engine.ware_stock(ware.id));
        }
        for spot in inputs.survey.mineable() {
            if let Some(resource) = spot.resource.filter(|_| spot.amount > 0) {
                *snapshot.mine_spots.entry(resource).or_insert(0) += 1;
            }
        }
        snapshot
    }

    // === PHASE B ===

    fn best_candidate(
        &self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        inputs: &PlanningInputs,
        now: Timestamp,
    ) -> (Option<Candidate>, Option<i32>) {
        let ctx = SiteContext {
            catalog,
            scoring: inputs.scoring,
            config: &self.config,
            big_spots_scarce: inputs.survey.big_count() < self.config.big_spots_scarce,
        };

        // Live capacity, once per field; vanished spots are skipped this cycle
        let fields: Vec<(usize, &BuildableField, BuildSize)> = inputs
            .survey
            .buildable()
            .enumerate()
            .filter(|(_, f)| f.surveyed && !self.blocked.is_blocked(f.coords, now))
            .filter_map(|(order, f)| {
                let live = engine.field(f.coords)?.build_size;
                (live != BuildSize::None).then_some((order, f, live))
            })
            .collect();

        let mut best: Option<Candidate> = None;
        let mut best_military: Option<i32> = None;
        for profile in catalog.types() {
            if !profile.necessity.is_candidate() || profile.is_mine() {
                continue;
            }
            for (order, field, live) in &fields {
                if !live.fits(profile.size) {
                    continue;
                }
                let score = if profile.is_military() {
                    best_military = best_military.max(Some(field.military_score));
                    score_military_site(profile, field, &self.bounds, &ctx)
                } else {
                    let distance = engine
                        .flag_at(field.coords.flag_position())
                        .and_then(|flag| inputs.distances.distance(flag));
                    score_site(profile, field, distance, &ctx)
                };
                if let Some(score) = score {
                    keep_best(
                        &mut best,
                        Candidate {
                            building_type: profile.id,
                            location: field.coords,
                            score,
                            order: *order,
                        },
                    );
                }
            }
        }

        // Late pass: mines
        if now >= self.next_mine_construction_due {
            for profile in catalog.types() {
                if !profile.necessity.is_candidate() || !profile.is_mine() {
                    continue;
                }
                for (order, spot) in inputs.survey.mineable().enumerate() {
                    if self.blocked.is_blocked(spot.coords, now)
                        || !engine.field(spot.coords).is_some_and(|f| f.mineable)
                    {
                        continue;
                    }
                    if let Some(score) = score_mine(profile, spot, &ctx) {
                        keep_best(
                            &mut best,
                            Candidate {
                                building_type: profile.id,
                                location: spot.coords,
                                score,
                                order,
                            },
                        );
                    }
                }
            }
        }

        (best, best_military)
    }

    // === PHASE C ===

    fn cooldown_for(&self, profile: &BuildingTypeProfile) -> (u64, u32) {
        if profile.is_military() {
            (self.config.blocked_cooldown_military, self.config.blocked_radius)
        } else if profile.has(Capability::SpaceConsumer) {
            (
                self.config.blocked_cooldown_space_consumer,
                self.config.blocked_radius.max(profile.work_radius),
            )
        } else {
            (self.config.blocked_cooldown_default, self.config.blocked_radius)
        }
    }

    fn commit(
        &mut self,
        engine: &mut dyn GameEngine,
        catalog: &mut BuildingCatalog,
        candidate: Candidate,
        now: Timestamp,
    ) -> Option<Action> {
        let profile = catalog.get_mut(candidate.building_type)?;
        engine.send(Command::Build {
            building_type: profile.id,
            at: candidate.location,
        });
        profile.last_construction = Some(now);
        profile.counts.under_construction += 1;
        if profile.is_mine() {
            self.next_mine_construction_due = now + self.config.mine_interval;
        }
        let (cooldown, radius) = self.cooldown_for(profile);
        self.blocked.block(candidate.location, radius, now + cooldown);

        tracing::info!(
            "construct {} at {} (score {}, {:?})",
            profile.name,
            candidate.location,
            candidate.score,
            profile.necessity
        );
        let action = Action {
            building_type: candidate.building_type,
            location: candidate.location,
            score: candidate.score,
        };
        self.last_action = Some(action);
        Some(action)
    }

    /// Run one planning cycle; returns the construction committed to, if any
    pub fn plan_cycle(
        &mut self,
        engine: &mut dyn GameEngine,
        catalog: &mut BuildingCatalog,
        inputs: &PlanningInputs,
        now: Timestamp,
    ) -> Option<Action> {
        self.cycles += 1;
        self.blocked.purge(now);
        self.update_necessities(&*engine, catalog, inputs, now);

        let (best, best_military) = self.best_candidate(&*engine, catalog, inputs, now);
        let chosen = best.filter(|c| c.score > 0);
        let action = match chosen {
            Some(candidate) => self.commit(engine, catalog, candidate, now),
            None => {
                tracing::debug!("planning cycle {}: nothing worth building", self.cycles);
                None
            }
        };

        let expanded = action
            .and_then(|a| catalog.get(a.building_type))
            .is_some_and(|p| p.is_military());
        self.bounds.adapt(
            &ExpansionPressure {
                expanded,
                enemy_visible: inputs.outlook.enemy_visible,
                stronger_enemy: inputs.outlook.stronger_enemy,
                best_candidate: best_military,
            },
            &self.config,
        );
        debug_assert!(self.bounds.is_ordered());
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SurveyConfig;
    use crate::core::types::{Cover, PlayerNumber};
    use crate::engine::{SandboxField, SandboxWorld};
    use crate::scoring::WeightedScoring;
    use crate::survey::SurveyInputs;
    use ahash::AHashSet;

    struct Setup {
        world: SandboxWorld,
        catalog: BuildingCatalog,
        survey: FieldSurvey,
    }

    fn setup(catalog: BuildingCatalog) -> Setup {
        let mut world = SandboxWorld::new(PlayerNumber(1));
        world.add_land(Coords::new(0, 0), 5, Some(PlayerNumber(1)));
        Setup {
            world,
            catalog,
            survey: FieldSurvey::new(SurveyConfig {
                buildable_slice: 200,
                mineable_slice: 200,
                ..SurveyConfig::default()
            }),
        }
    }

    fn refresh(setup: &mut Setup, now: Timestamp) {
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        setup.survey.refresh_unusable(&setup.world, now);
        let inputs = SurveyInputs {
            engine: &setup.world,
            catalog: &setup.catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        setup.survey.refresh_buildable(&inputs, now);
        setup.survey.refresh_mineable(&inputs, now);
    }

    fn plan(setup: &mut Setup, planner: &mut ConstructionPlanner, now: Timestamp) -> Option<Action> {
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let distances = FlagDistances::new();
        let inputs = PlanningInputs {
            survey: &setup.survey,
            distances: &distances,
            scoring: &scoring,
            outlook: &outlook,
            vacant_soldier_positions: 0,
        };
        planner.plan_cycle(&mut setup.world, &mut setup.catalog, &inputs, now)
    }

    fn two_basic_types() -> BuildingCatalog {
        let mut catalog = BuildingCatalog::new();
        let log = catalog.add_ware("log", 20);
        let stone = catalog.add_ware("stone", 20);
        let quarry = catalog.add_type("quarry", BuildSize::Small, Role::Producer);
        let lumberjack = catalog.add_type("lumberjack", BuildSize::Small, Role::Producer);
        {
            let p = catalog.get_mut(quarry).unwrap();
            p.capabilities.insert(Capability::Quarry);
            p.outputs = vec![stone];
            p.basic_amount = 1;
        }
        {
            let p = catalog.get_mut(lumberjack).unwrap();
            p.capabilities.insert(Capability::Lumberjack);
            p.outputs = vec![log];
            p.basic_amount = 1;
        }
        catalog
    }

    #[test]
    fn test_basic_type_built_near_its_resource() {
        let mut setup = setup(two_basic_types());
        for c in Coords::new(4, -4).within(1) {
            setup.world.set_cover(c, Cover::Tree);
        }
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        assert_eq!(planner.basic_remaining().len(), 2);
        refresh(&mut setup, 0);

        let action = plan(&mut setup, &mut planner, 0).unwrap();
        // No rocks anywhere: only the lumberjack has a usable spot
        assert_eq!(Some(action.building_type), setup.catalog.type_by_name("lumberjack"));
        assert!(action.location.distance(&Coords::new(4, -4)) <= 6);
        assert!(setup.world.issued.contains(&Command::Build {
            building_type: action.building_type,
            at: action.location,
        }));
    }

    #[test]
    fn test_tie_goes_to_lowest_type_id() {
        let mut setup = setup(two_basic_types());
        // Fields around here see one tree and one rock
        setup.world.set_cover(Coords::new(0, 0), Cover::Tree);
        setup.world.set_cover(Coords::new(0, -1), Cover::Rock);
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        refresh(&mut setup, 0);
        let action = plan(&mut setup, &mut planner, 0).unwrap();
        // Equal scores: the quarry has the lower type id
        assert_eq!(Some(action.building_type), setup.catalog.type_by_name("quarry"));
    }

    #[test]
    fn test_vicinity_blocked_after_commit() {
        let mut setup = setup(two_basic_types());
        for c in Coords::new(0, 0).within(5) {
            if c.distance(&Coords::new(0, 0)) == 5 {
                setup.world.set_cover(c, Cover::Tree);
            }
        }
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        refresh(&mut setup, 0);
        let first = plan(&mut setup, &mut planner, 0).unwrap();
        assert!(planner.blocked().is_blocked(first.location, 1));
        assert!(!planner
            .blocked()
            .is_blocked(first.location, PlannerConfig::default().blocked_cooldown_default));
    }

    #[test]
    fn test_nothing_needed_nothing_built() {
        let mut setup = setup(two_basic_types());
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        refresh(&mut setup, 0);
        // Neither trees nor rocks: no positive candidate
        assert_eq!(plan(&mut setup, &mut planner, 0), None);
        assert!(setup.world.issued.is_empty());
        assert!(planner.bounds().is_ordered());
    }

    #[test]
    fn test_mines_gated_by_interval() {
        let mut catalog = BuildingCatalog::new();
        let coal = catalog.add_resource("coal");
        let coal_ware = catalog.add_ware("coal", 20);
        let mine = catalog.add_type("coalmine", BuildSize::Small, Role::Mine { resource: coal });
        catalog.get_mut(mine).unwrap().outputs = vec![coal_ware];
        let mut setup = setup(catalog);
        for (i, q) in [-3, 3].iter().enumerate() {
            setup.world.set_field(
                Coords::new(*q, 0),
                SandboxField {
                    owner: Some(PlayerNumber(1)),
                    cover: Cover::Open,
                    mineable: true,
                    resource: Some(coal),
                    resource_amount: 10 + i as u8,
                    ..SandboxField::default()
                },
            );
        }
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        refresh(&mut setup, 0);
        assert_eq!(setup.survey.mineable_count(), 2);

        let first = plan(&mut setup, &mut planner, 0).unwrap();
        assert_eq!(first.building_type, mine);
        assert_eq!(planner.next_mine_construction_due(), planner.config().mine_interval);
        // Gate closed until the interval has passed
        assert_eq!(plan(&mut setup, &mut planner, 1_000), None);
    }

    #[test]
    fn test_basic_set_shrinks_as_types_are_built() {
        let mut setup = setup(two_basic_types());
        let mut planner =
            ConstructionPlanner::new(PlannerConfig::default(), 200, &setup.catalog);
        let quarry = setup.catalog.type_by_name("quarry").unwrap();
        setup.world.place_site(quarry, Coords::new(2, 2), true);
        refresh(&mut setup, 0);
        plan(&mut setup, &mut planner, 0);
        assert!(!planner.basic_remaining().contains(&quarry));
        assert!(!planner.basic_economy_complete());
    }
}
