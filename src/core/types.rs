//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game time in milliseconds since the start of the match
pub type Timestamp = u64;

/// Number of the player whose decisions this core makes (or any other player)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerNumber(pub u8);

/// Identifier of a flag, stable for the lifetime of the flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlagId(pub u32);

/// Identifier of a road between two flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadId(pub u32);

/// Identifier of a building or construction site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

/// Index of a building type in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingTypeId(pub u16);

/// Index of a ware type in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WareId(pub u16);

/// Index of a worker type in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerTypeId(pub u16);

/// Index of a map resource (coal, iron, fish, ...) in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u8);

/// Identifier of a connected economy, assigned by the economy graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EconomyId(pub u32);

/// How big a building a field can hold
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildSize {
    #[default]
    None,
    Small,
    Medium,
    Big,
}

impl BuildSize {
    /// Returns true if a building of `needed` size fits on a field of this capacity
    pub fn fits(&self, needed: BuildSize) -> bool {
        needed != BuildSize::None && *self >= needed
    }
}

/// What covers a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cover {
    #[default]
    Open,
    Tree,
    Rock,
    Water,
    /// Mountains, swamps and anything else nothing can be placed on
    Blocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_size_fits() {
        assert!(BuildSize::Big.fits(BuildSize::Small));
        assert!(BuildSize::Medium.fits(BuildSize::Medium));
        assert!(!BuildSize::Small.fits(BuildSize::Medium));
        assert!(!BuildSize::Big.fits(BuildSize::None));
    }

    #[test]
    fn test_build_size_ordering() {
        assert!(BuildSize::Big > BuildSize::Medium);
        assert!(BuildSize::Medium > BuildSize::Small);
        assert!(BuildSize::Small > BuildSize::None);
    }

    #[test]
    fn test_ids_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<FlagId, &str> = HashMap::new();
        map.insert(FlagId(1), "hq");
        assert_eq!(map.get(&FlagId(1)), Some(&"hq"));
        assert_eq!(map.get(&FlagId(2)), None);
    }
}
