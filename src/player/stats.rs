//! Settlement-wide statistics refreshed by the stats jobs

use ahash::AHashSet;

use crate::core::config::PlannerConfig;
use crate::core::types::{PlayerNumber, Timestamp};
use crate::engine::GameEngine;
use crate::planner::BuildingCatalog;
use crate::survey::{FieldSurvey, SettlementOutlook};

/// Visible enemies this much stronger than us count as a threat (percent)
const STRONGER_ENEMY_PERCENT: u32 = 120;

#[derive(Debug, Clone, Default)]
pub struct PlayerStats {
    pub outlook: SettlementOutlook,
    pub enemies: AHashSet<PlayerNumber>,
    pub own_strength: u32,
    pub strongest_enemy: u32,
    /// Soldier positions of complete military sites nobody fills yet
    pub vacant_soldier_positions: u32,
    pub soldier_stock: u32,
    pub military_sites: u32,
    pub updated_at: Option<Timestamp>,
}

impl PlayerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enemy visibility, relative strength and free space
    pub fn update(
        &mut self,
        engine: &dyn GameEngine,
        survey: &FieldSurvey,
        config: &PlannerConfig,
        now: Timestamp,
    ) {
        let me = engine.player();
        let strengths = engine.player_strengths();
        self.enemies = strengths
            .iter()
            .filter(|s| s.is_enemy && s.player != me)
            .map(|s| s.player)
            .collect();
        self.own_strength = strengths
            .iter()
            .find(|s| s.player == me)
            .map_or(0, |s| s.military_strength);
        self.strongest_enemy = strengths
            .iter()
            .filter(|s| s.is_enemy && s.visible && s.player != me)
            .map(|s| s.military_strength)
            .max()
            .unwrap_or(0);

        let free_spots = survey.buildable_count();
        self.outlook = SettlementOutlook {
            enemy_visible: strengths
                .iter()
                .any(|s| s.is_enemy && s.visible && s.player != me),
            stronger_enemy: self.strongest_enemy.saturating_mul(100)
                > self.own_strength.saturating_mul(STRONGER_ENEMY_PERCENT),
            free_spots,
            cramped: free_spots < config.spots_scarce,
        };
        self.updated_at = Some(now);
    }

    /// Vacant soldier positions against soldiers in stock
    pub fn count_military_vacant(&mut self, engine: &dyn GameEngine, catalog: &BuildingCatalog) {
        let mut vacant = 0;
        let mut sites = 0;
        for site in engine.own_sites().into_iter().filter_map(|id| engine.site(id)) {
            let military = catalog
                .get(site.building_type)
                .is_some_and(|p| p.is_military());
            if military && site.is_complete() {
                sites += 1;
                vacant += site.soldier_capacity.saturating_sub(site.soldiers);
            }
        }
        self.vacant_soldier_positions = vacant;
        self.military_sites = sites;
        self.soldier_stock = catalog.soldier().map_or(0, |s| engine.worker_stock(s));
    }
}
