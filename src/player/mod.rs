//! Computer player composition root
//!
//! `ComputerPlayer` owns every component plus the building catalog and the
//! scoring function, and is driven by the host once per host tick. The
//! scheduler decides which jobs run; `JobContext` maps each job to the
//! component entry point doing the work.

pub mod personality;
pub mod stats;

pub use personality::{load_personality, Personality};
pub use stats::PlayerStats;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::config::AiConfig;
use crate::core::error::Result;
use crate::core::types::{BuildingTypeId, Timestamp};
use crate::economy::EconomyGraph;
use crate::engine::GameEngine;
use crate::lifecycle::{ReviewInputs, SiteKind, SiteLifecycleManager};
use crate::planner::{BuildingCatalog, ConstructionPlanner, MilitaryScoreBounds, PlanningInputs};
use crate::roads::{RoadGraph, RoadMaintainer};
use crate::scheduler::{JobId, JobOutcome, JobRunner, Scheduler, TickReport};
use crate::scoring::ScoringFunction;
use crate::survey::{FieldSurvey, SurveyInputs};

/// State that outlives a session; job due times are not part of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    pub personality: Personality,
    pub military: MilitaryScoreBounds,
    pub basic_remaining: BTreeSet<BuildingTypeId>,
}

/// Everything the jobs work on
struct PlayerCore {
    config: AiConfig,
    catalog: BuildingCatalog,
    personality: Personality,
    scoring: Box<dyn ScoringFunction>,
    survey: FieldSurvey,
    economies: EconomyGraph,
    roads: RoadMaintainer,
    planner: ConstructionPlanner,
    lifecycle: SiteLifecycleManager,
    stats: PlayerStats,
}

pub struct ComputerPlayer {
    scheduler: Scheduler,
    core: PlayerCore,
    /// Set after an invariant violation; the player stops acting, the host goes on
    halted: bool,
}

impl ComputerPlayer {
    pub fn new(
        config: AiConfig,
        catalog: BuildingCatalog,
        personality: Personality,
        start: Timestamp,
    ) -> Result<Self> {
        config.validate()?;
        // Missing roles only disable features
        catalog.validate();
        let scoring = Box::new(personality.scoring()?);

        let planner = ConstructionPlanner::new(
            config.planner.clone(),
            personality.military_upper_limit,
            &catalog,
        );
        tracing::info!(
            "computer player '{}' ready: {} building types, {} basic types",
            personality.name,
            catalog.len(),
            planner.basic_remaining().len()
        );

        Ok(Self {
            scheduler: Scheduler::with_all_jobs(config.scheduler.clone(), start),
            core: PlayerCore {
                survey: FieldSurvey::new(config.survey.clone()),
                economies: EconomyGraph::new(),
                roads: RoadMaintainer::new(config.roads.clone()),
                lifecycle: SiteLifecycleManager::new(config.lifecycle.clone()),
                stats: PlayerStats::new(),
                planner,
                scoring,
                personality,
                catalog,
                config,
            },
            halted: false,
        })
    }

    /// Replace the scoring function built from the personality
    pub fn with_scoring(mut self, scoring: Box<dyn ScoringFunction>) -> Self {
        self.core.scoring = scoring;
        self
    }

    /// Run whatever jobs are due. Errors halt the player for good.
    pub fn tick(&mut self, engine: &mut dyn GameEngine) -> Result<TickReport> {
        if self.halted {
            return Ok(TickReport::default());
        }
        let now = engine.now();
        let mut context = JobContext {
            core: &mut self.core,
            engine,
        };
        match self.scheduler.tick(now, &mut context) {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("computer player halted: {}", e);
                self.halted = true;
                Err(e)
            }
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn save_state(&self) -> Result<String> {
        let state = PersistentState {
            personality: self.core.personality.clone(),
            military: *self.core.planner.bounds(),
            basic_remaining: self.core.planner.basic_remaining().clone(),
        };
        Ok(serde_json::to_string_pretty(&state)?)
    }

    pub fn restore_state(&mut self, json: &str) -> Result<()> {
        let state: PersistentState = serde_json::from_str(json)?;
        self.core.scoring = Box::new(state.personality.scoring()?);
        let config = self.core.planner.config().clone();
        self.core.planner.set_bounds(MilitaryScoreBounds::from_parts(
            state.military.least(),
            state.military.target(),
            state.military.upper_limit(),
            &config,
        ));
        let known: BTreeSet<BuildingTypeId> = state
            .basic_remaining
            .into_iter()
            .filter(|id| self.core.catalog.get(*id).is_some())
            .collect();
        self.core.planner.set_basic_remaining(known);
        tracing::info!("restored state of personality '{}'", state.personality.name);
        self.core.personality = state.personality;
        Ok(())
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &AiConfig {
        &self.core.config
    }

    pub fn catalog(&self) -> &BuildingCatalog {
        &self.core.catalog
    }

    pub fn personality(&self) -> &Personality {
        &self.core.personality
    }

    pub fn survey(&self) -> &FieldSurvey {
        &self.core.survey
    }

    pub fn economies(&self) -> &EconomyGraph {
        &self.core.economies
    }

    pub fn roads(&self) -> &RoadMaintainer {
        &self.core.roads
    }

    pub fn planner(&self) -> &ConstructionPlanner {
        &self.core.planner
    }

    pub fn lifecycle(&self) -> &SiteLifecycleManager {
        &self.core.lifecycle
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.core.stats
    }
}

// === JOB DISPATCH ===

/// One tick's view of the player and the engine
struct JobContext<'a, 'e> {
    core: &'a mut PlayerCore,
    engine: &'a mut (dyn GameEngine + 'e),
}

impl JobRunner for JobContext<'_, '_> {
    fn run_job(
        &mut self,
        job: JobId,
        now: Timestamp,
        wakeups: &mut Vec<(JobId, Timestamp)>,
    ) -> Result<JobOutcome> {
        let core = &mut *self.core;
        let engine = &mut *self.engine;
        let intervals = &core.config.intervals;
        let mut next = now + job.interval(intervals);

        match job {
            JobId::CheckEconomies => {
                let graph = RoadGraph::snapshot(&*engine, &core.catalog);
                let check = core.economies.check(&graph, now);
                if check.recomputed {
                    tracing::debug!(
                        "economies recomputed: {} economies over {} flags",
                        check.economies,
                        check.flags
                    );
                }
            }
            JobId::RoadCheck => {
                let mut graph = RoadGraph::snapshot(&*engine, &core.catalog);
                if core.economies.is_stale(&graph) {
                    wakeups.push((JobId::CheckEconomies, now));
                    return Ok(JobOutcome::AbortTick(next));
                }
                let changed = core.roads.improve_roads(
                    engine,
                    &mut graph,
                    &core.economies,
                    core.stats.outlook.cramped,
                    now,
                );
                if changed {
                    core.economies.mark_dirty();
                    wakeups.push((JobId::CheckEconomies, now));
                    next = now + intervals.road_check_busy;
                }
            }
            JobId::ConstructBuilding => {
                let inputs = PlanningInputs {
                    survey: &core.survey,
                    distances: core.roads.distances(),
                    scoring: &*core.scoring,
                    outlook: &core.stats.outlook,
                    vacant_soldier_positions: core.stats.vacant_soldier_positions,
                };
                if core
                    .planner
                    .plan_cycle(engine, &mut core.catalog, &inputs, now)
                    .is_some()
                {
                    wakeups.push((JobId::RoadCheck, now));
                    next = now + intervals.construct_after_commit;
                }
            }
            JobId::RefreshBuildable | JobId::RefreshMineable => {
                let inputs = SurveyInputs {
                    engine: &*engine,
                    catalog: &core.catalog,
                    scoring: &*core.scoring,
                    outlook: &core.stats.outlook,
                    enemies: &core.stats.enemies,
                };
                let report = if job == JobId::RefreshBuildable {
                    core.survey.refresh_buildable(&inputs, now)
                } else {
                    core.survey.refresh_mineable(&inputs, now)
                };
                tracing::debug!(
                    "{}: {} visited, {} surveyed, {} dropped",
                    job.label(),
                    report.visited,
                    report.surveyed,
                    report.dropped
                );
            }
            JobId::RefreshUnusable => {
                core.survey.refresh_unusable(&*engine, now);
            }
            JobId::ReviewProductionsites
            | JobId::ReviewMilitarysites
            | JobId::ReviewMines
            | JobId::ReviewTrainingsites => {
                let kind = match job {
                    JobId::ReviewMilitarysites => SiteKind::Military,
                    JobId::ReviewMines => SiteKind::Mine,
                    JobId::ReviewTrainingsites => SiteKind::Trainingsite,
                    _ => SiteKind::Production,
                };
                let inputs = ReviewInputs {
                    catalog: &core.catalog,
                    economies: &core.economies,
                    scoring: &*core.scoring,
                    basic_economy_complete: core.planner.basic_economy_complete(),
                };
                if core.lifecycle.review_site(kind, engine, &inputs, now) {
                    wakeups.push((JobId::CheckEconomies, now));
                }
            }
            JobId::FlagWarehouseDistances => {
                let graph = RoadGraph::snapshot(&*engine, &core.catalog);
                core.roads.check_flag_distances(&graph, now);
            }
            JobId::CountMilitaryVacant => {
                core.stats.count_military_vacant(&*engine, &core.catalog);
            }
            JobId::UpdateStats => {
                core.stats
                    .update(&*engine, &core.survey, core.planner.config(), now);
            }
            JobId::PrintStats => print_stats(core, now),
        }
        Ok(JobOutcome::Reschedule(next))
    }
}

fn print_stats(core: &PlayerCore, now: Timestamp) {
    let bounds = core.planner.bounds();
    let roads = &core.roads.stats;
    let lifecycle = &core.lifecycle.stats;
    tracing::info!(
        "[{}s] fields {} buildable / {} mineable / {} unusable, {} economies",
        now / 1_000,
        core.survey.buildable_count(),
        core.survey.mineable_count(),
        core.survey.unusable_count(),
        core.economies.len()
    );
    tracing::info!(
        "military score bounds {}/{}/{}, {} vacant positions, {} soldiers in stock",
        bounds.least(),
        bounds.target(),
        bounds.upper_limit(),
        core.stats.vacant_soldier_positions,
        core.stats.soldier_stock
    );
    tracing::info!(
        "roads: {} shortcuts, {} dispensable, {} dead ends, {} flags destroyed; mean warehouse distance {}",
        roads.shortcuts_built,
        roads.dispensable_removed,
        roads.dead_ends_removed,
        roads.flags_destroyed,
        core.roads.distances().weighted_mean()
    );
    tracing::info!(
        "sites: {} reviewed, {} dismantled, {} enhanced, {} stopped, {} started, {} evicted",
        lifecycle.reviewed,
        lifecycle.dismantled,
        lifecycle.enhanced,
        lifecycle.stopped,
        lifecycle.started,
        lifecycle.evicted
    );
}
