//! AI personality loaded from TOML
//!
//! A personality is the named parameter vector the scoring function is
//! built from: feature weights plus the military upper limit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::scoring::WeightedScoring;

/// Complete AI personality configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    /// Name of this personality (set from filename)
    #[serde(default)]
    pub name: String,
    /// Starting upper bound of the military score triplet
    #[serde(default = "default_military_upper_limit")]
    pub military_upper_limit: i32,
    /// Feature name -> weight; missing features keep their default weight
    #[serde(default)]
    pub weights: BTreeMap<String, i32>,
}

fn default_military_upper_limit() -> i32 {
    200
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            military_upper_limit: default_military_upper_limit(),
            weights: BTreeMap::new(),
        }
    }
}

impl Personality {
    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        let mut personality: Personality = toml::from_str(content)?;
        personality.name = name.to_string();
        // Rejects unknown feature names early
        personality.scoring()?;
        Ok(personality)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_toml_str(&name, &contents)
    }

    /// Scoring function for this parameter vector
    pub fn scoring(&self) -> Result<WeightedScoring> {
        WeightedScoring::from_table(&self.weights)
    }
}

/// Load personality from TOML file
///
/// Loads from `data/personalities/{name}.toml`
pub fn load_personality(name: &str) -> Result<Personality> {
    Personality::load_from(&personality_path(name))
}

/// Get path to personality file
fn personality_path(name: &str) -> PathBuf {
    PathBuf::from("data/personalities").join(format!("{}.toml", name))
}
