//! Reviews of standing sites
//!
//! Each review job looks at one site of its kind, round robin, and issues
//! at most one decision for it: evict a worker, dismantle, enhance, or stop
//! / restart an input-buffered site.

pub mod trend;

pub use trend::{TrendHistory, TrendSignals};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::LifecycleConfig;
use crate::core::types::{BuildingTypeId, SiteId, Timestamp};
use crate::economy::EconomyGraph;
use crate::engine::{Command, GameEngine, SiteInfo};
use crate::planner::{BuildingCatalog, BuildingTypeProfile, Role};
use crate::scoring::ScoringFunction;

/// Which sites a review job rotates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteKind {
    Production,
    Mine,
    Military,
    Trainingsite,
}

impl SiteKind {
    pub const ALL: [SiteKind; 4] = [
        SiteKind::Production,
        SiteKind::Mine,
        SiteKind::Military,
        SiteKind::Trainingsite,
    ];

    pub fn matches(&self, profile: &BuildingTypeProfile) -> bool {
        match self {
            SiteKind::Production => profile.is_producer(),
            SiteKind::Mine => profile.is_mine(),
            SiteKind::Military => profile.is_military(),
            SiteKind::Trainingsite => profile.is_trainingsite(),
        }
    }

    pub fn min_age(&self, config: &LifecycleConfig) -> u64 {
        match self {
            SiteKind::Production => config.min_age_production,
            SiteKind::Mine => config.min_age_mine,
            SiteKind::Military => config.min_age_military,
            SiteKind::Trainingsite => config.min_age_trainingsite,
        }
    }
}

/// Outcome of one site review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    EvictWorker { slot: usize },
    /// Dismantle, or bulldoze when no warehouse can take the wares back
    Dismantle { bulldoze: bool },
    Enhance,
    Stop,
    Start,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub reviewed: u32,
    pub evicted: u32,
    pub dismantled: u32,
    pub enhanced: u32,
    pub stopped: u32,
    pub started: u32,
}

/// Shared read-only inputs of a review
pub struct ReviewInputs<'a> {
    pub catalog: &'a BuildingCatalog,
    pub economies: &'a EconomyGraph,
    pub scoring: &'a dyn ScoringFunction,
    pub basic_economy_complete: bool,
}

#[derive(Debug, Clone)]
pub struct SiteLifecycleManager {
    config: LifecycleConfig,
    cursors: BTreeMap<SiteKind, usize>,
    last_dismantle: BTreeMap<BuildingTypeId, Timestamp>,
    trends: BTreeMap<SiteId, TrendHistory>,
    pub stats: LifecycleStats,
}

impl SiteLifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            cursors: BTreeMap::new(),
            last_dismantle: BTreeMap::new(),
            trends: BTreeMap::new(),
            stats: LifecycleStats::default(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn last_dismantle(&self, building_type: BuildingTypeId) -> Option<Timestamp> {
        self.last_dismantle.get(&building_type).copied()
    }

    pub fn trend(&self, site: SiteId) -> Option<&TrendHistory> {
        self.trends.get(&site)
    }

    /// Review the next site of `kind`; true if a command was issued
    pub fn review_site(
        &mut self,
        kind: SiteKind,
        engine: &mut dyn GameEngine,
        inputs: &ReviewInputs,
        now: Timestamp,
    ) -> bool {
        let sites: Vec<SiteInfo> = engine
            .own_sites()
            .into_iter()
            .filter_map(|id| engine.site(id))
            .collect();
        self.trends.retain(|id, _| sites.iter().any(|s| s.id == *id));

        let mut candidates: Vec<&SiteInfo> = sites
            .iter()
            .filter(|s| s.is_complete())
            .filter(|s| {
                inputs
                    .catalog
                    .get(s.building_type)
                    .is_some_and(|p| kind.matches(p))
            })
            .collect();
        if candidates.is_empty() {
            return false;
        }
        candidates.sort_by_key(|s| s.id);

        let cursor = self.cursors.entry(kind).or_insert(0);
        let site = candidates[*cursor % candidates.len()].clone();
        *cursor = (*cursor + 1) % candidates.len();

        let Some(profile) = inputs.catalog.get(site.building_type) else {
            return false;
        };
        let built_of_type = candidates
            .iter()
            .filter(|s| s.building_type == site.building_type)
            .count() as u32;
        let military_sites = sites
            .iter()
            .filter(|s| s.is_complete())
            .filter(|s| inputs.catalog.get(s.building_type).is_some_and(|p| p.is_military()))
            .count() as u32;

        self.stats.reviewed += 1;
        let decision = match kind {
            SiteKind::Military => {
                self.review_military(&*engine, inputs, profile, &site, military_sites, now)
            }
            _ => self.review_worksite(&*engine, inputs, kind, profile, &site, built_of_type, now),
        };
        self.apply(engine, inputs, profile, &site, decision, now)
    }

    // === DECISIONS ===

    fn review_worksite(
        &mut self,
        engine: &dyn GameEngine,
        inputs: &ReviewInputs,
        kind: SiteKind,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        built_of_type: u32,
        now: Timestamp,
    ) -> Decision {
        let window = self.config.trend_window;
        self.trends
            .entry(site.id)
            .or_default()
            .record(site.statistics_percent, window);

        if let Some(slot) = self.worker_to_evict(engine, site) {
            return Decision::EvictWorker { slot };
        }
        if self.should_dismantle(kind, profile, site, built_of_type, now) {
            let bulldoze = inputs
                .economies
                .economy_of(site.flag)
                .map_or(true, |e| !e.has_warehouse);
            return Decision::Dismantle { bulldoze };
        }
        if self.should_enhance(engine, inputs.catalog, profile, site, built_of_type, now) {
            return Decision::Enhance;
        }
        if kind == SiteKind::Production && !site.inputs.is_empty() && !profile.outputs.is_empty()
        {
            let Some(history) = self.trends.get(&site.id) else {
                return Decision::Keep;
            };
            let signals = TrendSignals::gather(
                engine,
                inputs.catalog,
                profile,
                site,
                history,
                inputs.basic_economy_complete,
            );
            let stop_score = signals.stop_score(inputs.scoring);
            tracing::debug!(
                "{} {:?}: stop score {} ({:?})",
                profile.name,
                site.id,
                stop_score,
                signals
            );
            if !site.stopped && stop_score > 0 && signals.shortage == 0 {
                return Decision::Stop;
            }
            if site.stopped && (stop_score <= 0 || signals.shortage > 0) {
                return Decision::Start;
            }
        }
        Decision::Keep
    }

    /// An experienced worker sits where a fresh one would do, and only the
    /// fresh kind is in stock
    fn worker_to_evict(&self, engine: &dyn GameEngine, site: &SiteInfo) -> Option<usize> {
        site.workers.iter().position(|slot| {
            slot.assigned.is_some_and(|assigned| {
                assigned != slot.required
                    && slot.level > slot.required_level
                    && engine.worker_stock(assigned) == 0
                    && engine.worker_stock(slot.required) > 0
            })
        })
    }

    fn dismantle_allowed(&self, building_type: BuildingTypeId, now: Timestamp) -> bool {
        self.last_dismantle
            .get(&building_type)
            .map_or(true, |last| now.saturating_sub(*last) >= self.config.dismantle_grace)
    }

    fn should_dismantle(
        &self,
        kind: SiteKind,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        built_of_type: u32,
        now: Timestamp,
    ) -> bool {
        if site.age(now) < kind.min_age(&self.config) || site.stopped {
            return false;
        }
        let useless =
            site.resources_depleted || site.statistics_percent <= self.config.poor_stats_threshold;
        useless && built_of_type > profile.basic_amount && self.dismantle_allowed(profile.id, now)
    }

    fn should_enhance(
        &self,
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        built_of_type: u32,
        now: Timestamp,
    ) -> bool {
        let Some(successor) = profile.enhancement.and_then(|id| catalog.get(id)) else {
            return false;
        };
        if site.age(now) < self.config.upgrade_min_age
            || site.statistics_percent < self.config.upgrade_stats_threshold
            || successor.counts.under_construction > 0
        {
            return false;
        }
        if successor.keep_predecessor && built_of_type < 2 {
            return false;
        }
        // Only worth it while the goods are still wanted
        profile
            .outputs
            .iter()
            .chain(successor.outputs.iter())
            .filter_map(|w| catalog.ware(*w))
            .any(|w| engine.ware_stock(w.id) < w.target)
    }

    fn review_military(
        &mut self,
        engine: &dyn GameEngine,
        inputs: &ReviewInputs,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        military_sites: u32,
        now: Timestamp,
    ) -> Decision {
        let Role::Military { conquers } = profile.role else {
            return Decision::Keep;
        };
        if site.age(now) < self.config.min_age_military
            || military_sites <= self.config.military_keep
            || !self.dismantle_allowed(profile.id, now)
        {
            return Decision::Keep;
        }
        let player = engine.player();
        let radius = conquers + self.config.interior_margin;
        // Off-map fields count as border
        let fields = engine.fields_within(site.coords, radius);
        let interior = fields.len() == site.coords.within(radius).len()
            && fields.iter().all(|f| f.owner == Some(player))
            && engine
                .sites_within(site.coords, radius)
                .iter()
                .all(|s| s.owner == player);
        if interior {
            let bulldoze = inputs
                .economies
                .economy_of(site.flag)
                .map_or(true, |e| !e.has_warehouse);
            return Decision::Dismantle { bulldoze };
        }
        Decision::Keep
    }

    // === COMMANDS ===

    fn apply(
        &mut self,
        engine: &mut dyn GameEngine,
        inputs: &ReviewInputs,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        decision: Decision,
        now: Timestamp,
    ) -> bool {
        match decision {
            Decision::Keep => return false,
            Decision::EvictWorker { slot } => {
                tracing::debug!("evict worker {} from {} {:?}", slot, profile.name, site.id);
                engine.send(Command::EvictWorker {
                    site: site.id,
                    slot,
                });
                self.stats.evicted += 1;
            }
            Decision::Dismantle { bulldoze } => {
                tracing::info!(
                    "{} {} at {} ({}%)",
                    if bulldoze { "bulldoze" } else { "dismantle" },
                    profile.name,
                    site.coords,
                    site.statistics_percent
                );
                let command = if bulldoze {
                    Command::Bulldoze { site: site.id }
                } else {
                    Command::Dismantle { site: site.id }
                };
                engine.send(command);
                self.last_dismantle.insert(profile.id, now);
                self.trends.remove(&site.id);
                self.stats.dismantled += 1;
            }
            Decision::Enhance => {
                let successor = profile
                    .enhancement
                    .and_then(|id| inputs.catalog.get(id))
                    .map_or("?", |p| p.name.as_str());
                tracing::info!("enhance {} at {} to {}", profile.name, site.coords, successor);
                engine.send(Command::Enhance { site: site.id });
                self.trends.remove(&site.id);
                self.stats.enhanced += 1;
            }
            Decision::Stop => {
                tracing::debug!("stop {} at {}", profile.name, site.coords);
                engine.send(Command::SetStopped {
                    site: site.id,
                    stopped: true,
                });
                let target = self.config.stopped_input_target;
                let history = self.trends.entry(site.id).or_default();
                history.saved_targets = site.inputs.iter().map(|q| (q.ware, q.target)).collect();
                for queue in &site.inputs {
                    engine.send(Command::SetInputTarget {
                        site: site.id,
                        ware: queue.ware,
                        target: target.min(queue.target),
                    });
                }
                self.stats.stopped += 1;
            }
            Decision::Start => {
                tracing::debug!("restart {} at {}", profile.name, site.coords);
                engine.send(Command::SetStopped {
                    site: site.id,
                    stopped: false,
                });
                let saved = self
                    .trends
                    .get_mut(&site.id)
                    .map(|h| std::mem::take(&mut h.saved_targets))
                    .unwrap_or_default();
                for queue in &site.inputs {
                    let target = saved
                        .iter()
                        .find(|(ware, _)| *ware == queue.ware)
                        .map_or(queue.capacity, |(_, t)| *t);
                    engine.send(Command::SetInputTarget {
                        site: site.id,
                        ware: queue.ware,
                        target,
                    });
                }
                self.stats.started += 1;
            }
        }
        true
    }
}
