//! Tunable scoring capability
//!
//! Every heuristic contribution in the decision core goes through an injected
//! [`ScoringFunction`]: the caller derives an input value for a [`Feature`]
//! and the function turns it into a signed score. The core only requires the
//! function to be pure and deterministic. How the weights are produced
//! (hand tuning, training) is not this crate's concern.

use ahash::AHashMap;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{CoreError, Result};

/// Named inputs of the scoring function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    // === MILITARY SITE VALUE ===
    UnownedLand,
    UnownedOpenLand,
    UnownedMineable,
    UnownedWater,
    EnemyLand,
    EnemyMilitarySites,
    EnemySoldiers,
    EnemyWarehouseNearby,
    EnemyVisible,
    StrongerEnemy,
    OwnMilitarySites,
    OwnSoldierCapacity,
    OwnSoldiersStationed,
    MilitaryUnderConstruction,
    Loneliness,
    NearBorder,
    BorderDistance,
    TreesNearby,
    RocksNearby,
    WaterNearby,
    OwnFreeSpots,
    RoadNearby,
    CrampedSettlement,
    InteriorSpot,
    SpotSize,
    FreeLandPerBorderStep,
    EnemySoldierPressure,
    EnemyCloseness,
    EnemyLandShare,
    Outnumbered,
    UndefendedBorder,
    LonelyBorderSpot,
    VacantCapacityNearby,
    ExpansionUnderway,
    MineableHinterland,
    StrongerEnemyAtBorder,

    // === SITE SELECTION ===
    ResourceProximity,
    SupporterProximity,
    SameTypeCrowding,
    SpaceConsumerCrowding,
    RangerSpace,
    BorderPenalty,
    EnemyProximityPenalty,
    RoadBonus,
    BigFieldWaste,
    WarehouseDistance,

    // === SITE REVIEW ===
    OutputSurplus,
    OutputShortage,
    InputScarcity,
    LowProductivity,
    BasicEconomyIncomplete,
}

impl Feature {
    /// Weight used when the personality does not override it
    pub fn default_weight(&self) -> i32 {
        match self {
            Feature::UnownedLand => 1,
            Feature::UnownedOpenLand => 2,
            Feature::UnownedMineable => 3,
            Feature::UnownedWater => 1,
            Feature::EnemyLand => 1,
            Feature::EnemyMilitarySites => 8,
            Feature::EnemySoldiers => 2,
            Feature::EnemyWarehouseNearby => 10,
            Feature::EnemyVisible => 5,
            Feature::StrongerEnemy => 10,
            Feature::OwnMilitarySites => -6,
            Feature::OwnSoldierCapacity => -1,
            Feature::OwnSoldiersStationed => -1,
            Feature::MilitaryUnderConstruction => -15,
            Feature::Loneliness => 2,
            Feature::NearBorder => 20,
            Feature::BorderDistance => -3,
            Feature::TreesNearby => 1,
            Feature::RocksNearby => 1,
            Feature::WaterNearby => 1,
            Feature::OwnFreeSpots => -1,
            Feature::RoadNearby => 5,
            Feature::CrampedSettlement => 15,
            Feature::InteriorSpot => -40,
            Feature::SpotSize => 2,
            Feature::FreeLandPerBorderStep => 1,
            Feature::EnemySoldierPressure => 1,
            Feature::EnemyCloseness => 3,
            Feature::EnemyLandShare => 2,
            Feature::Outnumbered => 15,
            Feature::UndefendedBorder => 25,
            Feature::LonelyBorderSpot => 2,
            Feature::VacantCapacityNearby => -3,
            Feature::ExpansionUnderway => -10,
            Feature::MineableHinterland => 8,
            Feature::StrongerEnemyAtBorder => 10,

            Feature::ResourceProximity => 3,
            Feature::SupporterProximity => 8,
            Feature::SameTypeCrowding => -20,
            Feature::SpaceConsumerCrowding => -10,
            Feature::RangerSpace => 2,
            Feature::BorderPenalty => -15,
            Feature::EnemyProximityPenalty => -30,
            Feature::RoadBonus => 10,
            Feature::BigFieldWaste => -25,
            Feature::WarehouseDistance => -2,

            Feature::OutputSurplus => 3,
            Feature::OutputShortage => -4,
            Feature::InputScarcity => 2,
            Feature::LowProductivity => 1,
            Feature::BasicEconomyIncomplete => -20,
        }
    }

    /// Resolve a feature from its snake_case name
    pub fn from_name(name: &str) -> Option<Feature> {
        let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            name.into_deserializer();
        Feature::deserialize(deserializer).ok()
    }
}

/// The opaque scoring capability consumed by the decision core
pub trait ScoringFunction {
    /// Signed contribution of `feature` for the derived `input`
    fn score(&self, feature: Feature, input: i32) -> i32;

    /// Contribution of a yes/no situation
    fn score_if(&self, feature: Feature, condition: bool) -> i32 {
        self.score(feature, i32::from(condition))
    }
}

impl<F> ScoringFunction for F
where
    F: Fn(Feature, i32) -> i32,
{
    fn score(&self, feature: Feature, input: i32) -> i32 {
        self(feature, input)
    }
}

/// Linear scoring: `input * weight`, saturating
#[derive(Debug, Clone, Default)]
pub struct WeightedScoring {
    overrides: AHashMap<Feature, i32>,
}

impl WeightedScoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a name -> weight table (personality file)
    pub fn from_table(table: &BTreeMap<String, i32>) -> Result<Self> {
        let mut scoring = Self::new();
        for (name, weight) in table {
            let feature = Feature::from_name(name)
                .ok_or_else(|| CoreError::InvalidConfig(format!("unknown feature '{}'", name)))?;
            scoring.overrides.insert(feature, *weight);
        }
        Ok(scoring)
    }

    pub fn with_weight(mut self, feature: Feature, weight: i32) -> Self {
        self.overrides.insert(feature, weight);
        self
    }

    pub fn weight(&self, feature: Feature) -> i32 {
        self.overrides
            .get(&feature)
            .copied()
            .unwrap_or_else(|| feature.default_weight())
    }
}

impl ScoringFunction for WeightedScoring {
    fn score(&self, feature: Feature, input: i32) -> i32 {
        input.saturating_mul(self.weight(feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_from_name() {
        assert_eq!(Feature::from_name("near_border"), Some(Feature::NearBorder));
        assert_eq!(Feature::from_name("road_bonus"), Some(Feature::RoadBonus));
        assert_eq!(Feature::from_name("no_such_feature"), None);
    }

    #[test]
    fn test_weighted_scoring_defaults_and_overrides() {
        let scoring = WeightedScoring::new().with_weight(Feature::NearBorder, 7);
        assert_eq!(scoring.score(Feature::NearBorder, 2), 14);
        assert_eq!(
            scoring.score(Feature::RoadBonus, 1),
            Feature::RoadBonus.default_weight()
        );
        assert_eq!(scoring.score_if(Feature::NearBorder, false), 0);
    }

    #[test]
    fn test_scoring_saturates() {
        let scoring = WeightedScoring::new().with_weight(Feature::UnownedLand, i32::MAX);
        assert_eq!(scoring.score(Feature::UnownedLand, 3), i32::MAX);
    }

    #[test]
    fn test_from_table_rejects_unknown() {
        let mut table = BTreeMap::new();
        table.insert("loneliness".to_string(), 4);
        let scoring = WeightedScoring::from_table(&table).unwrap();
        assert_eq!(scoring.weight(Feature::Loneliness), 4);

        table.insert("bogus".to_string(), 1);
        assert!(WeightedScoring::from_table(&table).is_err());
    }

    #[test]
    fn test_closure_is_a_scoring_function() {
        let flat = |_: Feature, input: i32| input * 10;
        assert_eq!(flat.score(Feature::EnemyLand, 3), 30);
        assert_eq!(flat.score_if(Feature::EnemyLand, true), 10);
    }
}
