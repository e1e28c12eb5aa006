//! Military value of a buildable spot
//!
//! `military_score` is a plain sum of independent signed contributions, each
//! produced by the injected scoring function from one derived input.

use crate::core::types::BuildSize;
use crate::scoring::{Feature, ScoringFunction};
use crate::survey::buildable::BuildableField;

/// Settlement-wide facts that feed every spot's military score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementOutlook {
    /// Some enemy territory has been seen
    pub enemy_visible: bool,
    /// The strongest visible enemy outmatches us
    pub stronger_enemy: bool,
    /// Buildable spots currently known
    pub free_spots: usize,
    /// Fewer buildable spots than the scarcity threshold
    pub cramped: bool,
}

/// Sum of all military contributions for one spot
pub fn military_score(
    field: &BuildableField,
    outlook: &SettlementOutlook,
    scoring: &dyn ScoringFunction,
) -> i32 {
    let count = |n: u32| n.min(i32::MAX as u32) as i32;
    let interior = !field.near_border && field.unowned_land == 0 && field.enemy_land == 0;
    let enemy_nearby = field.enemy_military_sites > 0 || field.enemy_land > 0;
    let size_rank = match field.size {
        BuildSize::None => 0,
        BuildSize::Small => 1,
        BuildSize::Medium => 2,
        BuildSize::Big => 3,
    };
    let foreign_land = field.unowned_land.saturating_add(field.enemy_land).max(1);
    let covered = field.own_military_sites > 0 || field.military_under_construction > 0;

    let contributions = [
        // land to gain
        scoring.score(Feature::UnownedLand, count(field.unowned_land)),
        scoring.score(Feature::UnownedOpenLand, count(field.unowned_open_land)),
        scoring.score(Feature::UnownedMineable, count(field.unowned_mineable)),
        scoring.score(Feature::UnownedWater, count(field.unowned_water)),
        // enemy pressure
        scoring.score(Feature::EnemyLand, count(field.enemy_land)),
        scoring.score(Feature::EnemyMilitarySites, count(field.enemy_military_sites)),
        scoring.score(Feature::EnemySoldiers, count(field.enemy_soldiers)),
        scoring.score_if(Feature::EnemyWarehouseNearby, field.enemy_warehouse_nearby),
        scoring.score_if(Feature::EnemyVisible, outlook.enemy_visible && enemy_nearby),
        scoring.score_if(
            Feature::StrongerEnemy,
            outlook.stronger_enemy && field.enemy_military_sites > 0,
        ),
        // own coverage
        scoring.score(Feature::OwnMilitarySites, count(field.own_military_sites)),
        scoring.score(Feature::OwnSoldierCapacity, count(field.own_soldier_capacity)),
        scoring.score(Feature::OwnSoldiersStationed, count(field.own_soldiers_stationed)),
        scoring.score(
            Feature::MilitaryUnderConstruction,
            count(field.military_under_construction),
        ),
        scoring.score(Feature::Loneliness, count(field.loneliness)),
        // position
        scoring.score_if(Feature::NearBorder, field.near_border),
        scoring.score(Feature::BorderDistance, count(field.border_distance)),
        scoring.score(Feature::TreesNearby, count(field.trees_nearby)),
        scoring.score(Feature::RocksNearby, count(field.rocks_nearby)),
        scoring.score(Feature::WaterNearby, count(field.water_nearby)),
        scoring.score_if(Feature::RoadNearby, field.road_nearby),
        // settlement
        scoring.score(Feature::OwnFreeSpots, (outlook.free_spots / 10) as i32),
        scoring.score_if(Feature::CrampedSettlement, outlook.cramped),
        scoring.score_if(Feature::InteriorSpot, interior),
        // combined signals
        scoring.score(Feature::SpotSize, size_rank),
        scoring.score(
            Feature::FreeLandPerBorderStep,
            count(field.unowned_open_land / field.border_distance.max(1)),
        ),
        scoring.score(Feature::EnemySoldierPressure, count(field.enemy_soldier_pressure)),
        scoring.score(Feature::EnemyCloseness, count(field.enemy_closeness)),
        scoring.score(Feature::EnemyLandShare, count(field.enemy_land * 10 / foreign_land)),
        scoring.score_if(
            Feature::Outnumbered,
            field.enemy_soldiers > field.own_soldiers_stationed,
        ),
        scoring.score_if(Feature::UndefendedBorder, field.near_border && !covered),
        scoring.score(
            Feature::LonelyBorderSpot,
            if field.near_border { count(field.loneliness) } else { 0 },
        ),
        scoring.score(
            Feature::VacantCapacityNearby,
            count(field.own_soldier_capacity.saturating_sub(field.own_soldiers_stationed)),
        ),
        scoring.score_if(
            Feature::ExpansionUnderway,
            field.near_border && field.military_under_construction > 0,
        ),
        scoring.score_if(
            Feature::MineableHinterland,
            field.unowned_mineable > 0 && field.enemy_land == 0,
        ),
        scoring.score_if(
            Feature::StrongerEnemyAtBorder,
            outlook.stronger_enemy && field.near_border && field.enemy_land > 0,
        ),
    ];

    contributions
        .iter()
        .fold(0i32, |acc, value| acc.saturating_add(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coords;
    use crate::scoring::WeightedScoring;

    fn spot() -> BuildableField {
        BuildableField::new(Coords::new(0, 0), BuildSize::Medium)
    }

    #[test]
    fn test_border_beats_interior() {
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();

        let interior = spot();
        let mut border = spot();
        border.near_border = true;
        border.unowned_land = 30;
        border.unowned_open_land = 20;

        assert!(
            military_score(&border, &outlook, &scoring)
                > military_score(&interior, &outlook, &scoring)
        );
    }

    #[test]
    fn test_each_contribution_goes_through_scoring() {
        // A scoring function that ignores everything scores every spot 0
        let zero = |_: Feature, _: i32| 0;
        let mut field = spot();
        field.enemy_military_sites = 3;
        field.near_border = true;
        assert_eq!(military_score(&field, &SettlementOutlook::default(), &zero), 0);
    }

    #[test]
    fn test_stronger_enemy_only_counts_with_enemy_presence() {
        let only_enemy = |feature: Feature, input: i32| {
            if feature == Feature::StrongerEnemy {
                input * 100
            } else {
                0
            }
        };
        let outlook = SettlementOutlook {
            stronger_enemy: true,
            ..Default::default()
        };
        let mut field = spot();
        assert_eq!(military_score(&field, &outlook, &only_enemy), 0);
        field.enemy_military_sites = 1;
        assert_eq!(military_score(&field, &outlook, &only_enemy), 100);
    }

    #[test]
    fn test_undefended_border_outranks_covered_border() {
        let scoring = WeightedScoring::new();
        let outlook = SettlementOutlook::default();
        let mut open = spot();
        open.near_border = true;
        open.unowned_land = 10;
        let mut covered = open.clone();
        covered.own_military_sites = 1;

        assert!(
            military_score(&open, &outlook, &scoring)
                > military_score(&covered, &outlook, &scoring)
        );
    }

    #[test]
    fn test_outnumbered_spot_scores_once() {
        let only_outnumbered = |feature: Feature, input: i32| {
            if feature == Feature::Outnumbered {
                input * 7
            } else {
                0
            }
        };
        let outlook = SettlementOutlook::default();
        let mut field = spot();
        field.enemy_soldiers = 4;
        field.own_soldiers_stationed = 4;
        assert_eq!(military_score(&field, &outlook, &only_outnumbered), 0);
        field.enemy_soldiers = 5;
        assert_eq!(military_score(&field, &outlook, &only_outnumbered), 7);
    }

    #[test]
    fn test_free_land_share_uses_border_distance() {
        let only_free_land = |feature: Feature, input: i32| {
            if feature == Feature::FreeLandPerBorderStep {
                input
            } else {
                0
            }
        };
        let outlook = SettlementOutlook::default();
        let mut field = spot();
        field.unowned_open_land = 12;
        field.border_distance = 3;
        assert_eq!(military_score(&field, &outlook, &only_free_land), 4);
        // A spot on the border itself divides by one
        field.border_distance = 0;
        assert_eq!(military_score(&field, &outlook, &only_free_land), 12);
    }
}
