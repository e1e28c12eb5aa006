//! Rolling survey of the player's territory
//!
//! Three ring buffers (buildable, mineable, unusable) are refreshed a bounded
//! slice at a time: pop front, update if expired, push back. Big spots and
//! spots near the border get extra out-of-rotation refreshes. A record whose
//! field was lost is dropped the moment it is visited.

pub mod buildable;
pub mod military;

pub use buildable::{BuildableField, MineableField};
pub use military::{military_score, SettlementOutlook};

use ahash::AHashSet;
use std::collections::VecDeque;

use crate::core::config::SurveyConfig;
use crate::core::types::{BuildSize, PlayerNumber, Timestamp};
use crate::core::Coords;
use crate::engine::GameEngine;
use crate::planner::profile::BuildingCatalog;
use crate::scoring::ScoringFunction;

/// Counts from one refresh call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub visited: usize,
    pub surveyed: usize,
    pub dropped: usize,
    pub demoted: usize,
    pub promoted: usize,
}

/// Read-only inputs of a refresh
pub struct SurveyInputs<'a> {
    pub engine: &'a dyn GameEngine,
    pub catalog: &'a BuildingCatalog,
    pub scoring: &'a dyn ScoringFunction,
    pub outlook: &'a SettlementOutlook,
    pub enemies: &'a AHashSet<PlayerNumber>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldSurvey {
    config: SurveyConfig,
    buildable: VecDeque<BuildableField>,
    mineable: VecDeque<MineableField>,
    unusable: VecDeque<Coords>,
    known: AHashSet<Coords>,
    last_territory_scan: Option<Timestamp>,
}

impl FieldSurvey {
    pub fn new(config: SurveyConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn buildable(&self) -> impl Iterator<Item = &BuildableField> {
        self.buildable.iter()
    }

    pub fn mineable(&self) -> impl Iterator<Item = &MineableField> {
        self.mineable.iter()
    }

    pub fn buildable_count(&self) -> usize {
        self.buildable.len()
    }

    pub fn big_count(&self) -> usize {
        self.buildable
            .iter()
            .filter(|f| f.size == BuildSize::Big)
            .count()
    }

    pub fn mineable_count(&self) -> usize {
        self.mineable.len()
    }

    pub fn unusable_count(&self) -> usize {
        self.unusable.len()
    }

    pub fn is_known(&self, at: Coords) -> bool {
        self.known.contains(&at)
    }

    fn ttl_for(&self, near_border: bool) -> u64 {
        if near_border {
            self.config.border_ttl
        } else {
            self.config.buildable_ttl
        }
    }

    fn survey_buildable(&self, field: &mut BuildableField, inputs: &SurveyInputs, now: Timestamp) {
        field.survey(inputs.engine, inputs.catalog, inputs.enemies, &self.config);
        field.military_score = military_score(field, inputs.outlook, inputs.scoring);
        field.expires_at = now + self.ttl_for(field.near_border);
    }

    /// Refresh a slice of buildable records
    pub fn refresh_buildable(&mut self, inputs: &SurveyInputs, now: Timestamp) -> RefreshReport {
        let mut report = RefreshReport::default();
        let player = inputs.engine.player();

        // Out of rotation: expired big or border spots first
        let mut budget = self.config.priority_slice;
        let mut index = 0;
        while index < self.buildable.len() && budget > 0 {
            let candidate = &self.buildable[index];
            let urgent = candidate.surveyed
                && candidate.expires_at <= now
                && (candidate.size == BuildSize::Big || candidate.near_border);
            if !urgent {
                index += 1;
                continue;
            }
            budget -= 1;
            let coords = candidate.coords;
            match inputs.engine.field(coords).filter(|f| f.owner == Some(player)) {
                None => {
                    self.buildable.remove(index);
                    self.known.remove(&coords);
                    report.dropped += 1;
                }
                Some(field) if field.build_size == BuildSize::None => {
                    self.buildable.remove(index);
                    self.demote(coords, field.mineable);
                    report.demoted += 1;
                }
                Some(field) => {
                    let mut record = self.buildable[index].clone();
                    record.size = field.build_size;
                    self.survey_buildable(&mut record, inputs, now);
                    self.buildable[index] = record;
                    report.surveyed += 1;
                    index += 1;
                }
            }
        }

        let slice = self.config.buildable_slice.min(self.buildable.len());
        for _ in 0..slice {
            let Some(mut record) = self.buildable.pop_front() else {
                break;
            };
            report.visited += 1;
            let field = inputs.engine.field(record.coords);
            let Some(field) = field.filter(|f| f.owner == Some(player)) else {
                self.known.remove(&record.coords);
                report.dropped += 1;
                continue;
            };
            if field.build_size == BuildSize::None {
                self.demote(record.coords, field.mineable);
                report.demoted += 1;
                continue;
            }
            record.size = field.build_size;
            if !record.surveyed || record.expires_at <= now {
                self.survey_buildable(&mut record, inputs, now);
                report.surveyed += 1;
            }
            self.buildable.push_back(record);
        }
        report
    }

    fn demote(&mut self, coords: Coords, mineable: bool) {
        if mineable {
            self.mineable.push_back(MineableField::new(coords));
        } else {
            self.unusable.push_back(coords);
        }
    }

    /// Refresh a slice of mineable records
    pub fn refresh_mineable(&mut self, inputs: &SurveyInputs, now: Timestamp) -> RefreshReport {
        let mut report = RefreshReport::default();
        let player = inputs.engine.player();
        let slice = self.config.mineable_slice.min(self.mineable.len());
        for _ in 0..slice {
            let Some(mut record) = self.mineable.pop_front() else {
                break;
            };
            report.visited += 1;
            let field = inputs.engine.field(record.coords);
            let Some(field) = field.filter(|f| f.owner == Some(player)) else {
                self.known.remove(&record.coords);
                report.dropped += 1;
                continue;
            };
            if !field.mineable {
                self.unusable.push_back(record.coords);
                report.demoted += 1;
                continue;
            }
            if !record.surveyed || record.expires_at <= now {
                record.survey(inputs.engine, inputs.catalog, &self.config);
                record.expires_at = now + self.config.mineable_ttl;
                report.surveyed += 1;
            }
            self.mineable.push_back(record);
        }
        report
    }

    /// Pick up newly owned fields and re-check unusable ones
    pub fn refresh_unusable(&mut self, engine: &dyn GameEngine, now: Timestamp) -> RefreshReport {
        let mut report = RefreshReport::default();
        let player = engine.player();

        let scan_due = self
            .last_territory_scan
            .map_or(true, |last| now >= last + self.config.territory_scan_interval);
        if scan_due {
            self.last_territory_scan = Some(now);
            for coords in engine.owned_fields() {
                if self.known.insert(coords) {
                    self.classify(engine, coords, &mut report);
                }
            }
        }

        let slice = self.config.unusable_slice.min(self.unusable.len());
        for _ in 0..slice {
            let Some(coords) = self.unusable.pop_front() else {
                break;
            };
            report.visited += 1;
            let owned = engine
                .field(coords)
                .is_some_and(|f| f.owner == Some(player));
            if !owned {
                self.known.remove(&coords);
                report.dropped += 1;
                continue;
            }
            self.classify(engine, coords, &mut report);
        }
        report
    }

    /// New unsurveyed records go to the front so the next refresh covers them
    fn classify(&mut self, engine: &dyn GameEngine, coords: Coords, report: &mut RefreshReport) {
        let Some(field) = engine.field(coords) else {
            self.unusable.push_back(coords);
            return;
        };
        if field.build_size != BuildSize::None {
            self.buildable
                .push_front(BuildableField::new(coords, field.build_size));
            report.promoted += 1;
        } else if field.mineable {
            self.mineable.push_front(MineableField::new(coords));
            report.promoted += 1;
        } else {
            self.unusable.push_back(coords);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Cover;
    use crate::engine::SandboxWorld;
    use crate::scoring::WeightedScoring;

    fn world() -> SandboxWorld {
        let mut world = SandboxWorld::new(PlayerNumber(1));
        world.add_land(Coords::new(0, 0), 3, Some(PlayerNumber(1)));
        world
    }

    fn config() -> SurveyConfig {
        SurveyConfig {
            buildable_slice: 100,
            ..SurveyConfig::default()
        }
    }

    #[test]
    fn test_territory_scan_classifies_fields() {
        let mut world = world();
        world.set_cover(Coords::new(1, 0), Cover::Rock);
        let mut survey = FieldSurvey::new(config());
        let report = survey.refresh_unusable(&world, 0);
        assert_eq!(survey.buildable_count() + survey.unusable_count(), 37);
        assert!(report.promoted > 0);
        assert!(survey.is_known(Coords::new(1, 0)));
        // Second call before the scan interval finds nothing new
        let report = survey.refresh_unusable(&world, 1_000);
        assert_eq!(report.promoted, 0);
    }

    #[test]
    fn test_refresh_surveys_and_drops_lost_fields() {
        let mut world = world();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let mut survey = FieldSurvey::new(config());
        survey.refresh_unusable(&world, 0);

        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        survey.refresh_buildable(&inputs, 0);
        assert!(survey.buildable().all(|f| f.surveyed));
        let before = survey.buildable_count();

        world.set_owner(Coords::new(0, 0), None);
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let report = survey.refresh_buildable(&inputs, 100);
        assert_eq!(report.dropped, 1);
        // The neighbour whose flag would stand on the lost field is demoted too
        assert!(survey.buildable_count() < before);
        assert!(!survey.is_known(Coords::new(0, 0)));
    }

    #[test]
    fn test_unexpired_records_are_not_resurveyed() {
        let world = world();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let mut survey = FieldSurvey::new(config());
        survey.refresh_unusable(&world, 0);
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let first = survey.refresh_buildable(&inputs, 0);
        assert!(first.surveyed > 0);
        let second = survey.refresh_buildable(&inputs, 10);
        assert_eq!(second.surveyed, 0);
        assert_eq!(second.visited, survey.buildable_count());
    }

    #[test]
    fn test_occupied_field_is_demoted() {
        let mut world = world();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let mut survey = FieldSurvey::new(config());
        survey.refresh_unusable(&world, 0);

        world.place_flag(Coords::new(0, 0));
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let report = survey.refresh_buildable(&inputs, 0);
        assert!(report.demoted >= 1);
        assert!(survey.buildable().all(|f| f.coords != Coords::new(0, 0)));
    }

    // === PRIORITY REFRESH ===

    /// Survey state with hand-placed records, all expired at t=1000
    fn staged(
        records: &[(Coords, BuildSize, bool)],
        buildable_slice: usize,
        priority_slice: usize,
    ) -> FieldSurvey {
        let mut survey = FieldSurvey::new(SurveyConfig {
            buildable_slice,
            priority_slice,
            ..SurveyConfig::default()
        });
        for (coords, size, near_border) in records {
            let mut record = BuildableField::new(*coords, *size);
            record.surveyed = true;
            record.expires_at = 1_000;
            record.near_border = *near_border;
            survey.buildable.push_back(record);
            survey.known.insert(*coords);
        }
        survey
    }

    const PLAIN_FRONT: Coords = Coords::new(0, 0);
    const PLAIN_BEHIND: Coords = Coords::new(-1, 0);
    const BORDER: Coords = Coords::new(1, -1);
    const BIG: Coords = Coords::new(-1, 1);

    fn records() -> Vec<(Coords, BuildSize, bool)> {
        vec![
            (PLAIN_FRONT, BuildSize::Small, false),
            (PLAIN_BEHIND, BuildSize::Small, false),
            (BORDER, BuildSize::Small, true),
            (BIG, BuildSize::Big, false),
        ]
    }

    fn expiry(survey: &FieldSurvey, at: Coords) -> Option<Timestamp> {
        survey.buildable().find(|f| f.coords == at).map(|f| f.expires_at)
    }

    #[test]
    fn test_big_and_border_spots_refreshed_out_of_rotation() {
        let world = world();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let mut survey = staged(&records(), 1, 5);

        let report = survey.refresh_buildable(&inputs, 2_000);
        assert_eq!(report.visited, 1);
        assert_eq!(report.surveyed, 3);
        assert!(expiry(&survey, PLAIN_FRONT).unwrap() > 2_000);
        assert_eq!(expiry(&survey, PLAIN_BEHIND), Some(1_000));
        assert!(expiry(&survey, BORDER).unwrap() > 2_000);
        assert!(expiry(&survey, BIG).unwrap() > 2_000);
    }

    #[test]
    fn test_priority_slice_caps_extra_refreshes() {
        let world = world();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let mut survey = staged(&records(), 1, 1);

        let report = survey.refresh_buildable(&inputs, 2_000);
        assert_eq!(report.surveyed, 2);
        assert!(expiry(&survey, BORDER).unwrap() > 2_000);
        assert_eq!(expiry(&survey, BIG), Some(1_000));
    }

    #[test]
    fn test_priority_pass_drops_lost_spot() {
        let mut world = world();
        world.set_owner(BORDER, None);
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let mut survey = staged(&records(), 1, 5);

        let report = survey.refresh_buildable(&inputs, 2_000);
        assert_eq!(report.dropped, 1);
        assert_eq!(survey.buildable_count(), 3);
        assert_eq!(expiry(&survey, BORDER), None);
        assert!(!survey.is_known(BORDER));
        assert!(expiry(&survey, BIG).unwrap() > 2_000);
    }

    #[test]
    fn test_priority_pass_demotes_occupied_spot() {
        let mut world = world();
        world.place_flag(BORDER).unwrap();
        let catalog = BuildingCatalog::new();
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let enemies = AHashSet::new();
        let inputs = SurveyInputs {
            engine: &world,
            catalog: &catalog,
            scoring: &scoring,
            outlook: &outlook,
            enemies: &enemies,
        };
        let mut survey = staged(&records(), 1, 5);

        let report = survey.refresh_buildable(&inputs, 2_000);
        assert_eq!(report.demoted, 1);
        assert_eq!(expiry(&survey, BORDER), None);
        assert!(survey.is_known(BORDER));
        assert_eq!(survey.unusable_count(), 1);
    }
}
