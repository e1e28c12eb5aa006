//! Stop/start trend scoring for input-buffered sites

use std::collections::VecDeque;

use crate::core::types::WareId;
use crate::engine::{GameEngine, SiteInfo};
use crate::planner::BuildingTypeProfile;
use crate::planner::BuildingCatalog;
use crate::scoring::{Feature, ScoringFunction};

/// Recent productivity samples of one site plus the input targets it had
/// before it was stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendHistory {
    samples: VecDeque<u8>,
    pub saved_targets: Vec<(WareId, u32)>,
}

impl TrendHistory {
    pub fn record(&mut self, percent: u8, window: usize) {
        self.samples.push_back(percent);
        while self.samples.len() > window.max(1) {
            self.samples.pop_front();
        }
    }

    pub fn average(&self) -> u8 {
        if self.samples.is_empty() {
            return 0;
        }
        let sum: u32 = self.samples.iter().map(|s| u32::from(*s)).sum();
        (sum / self.samples.len() as u32) as u8
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Signals the stop score is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendSignals {
    /// Units of output stock above target, capped
    pub surplus: u32,
    /// Units of output stock missing to reach target, capped
    pub shortage: u32,
    pub empty_inputs: u32,
    pub average_productivity: u8,
    pub basic_economy_complete: bool,
}

impl TrendSignals {
    pub fn gather(
        engine: &dyn GameEngine,
        catalog: &BuildingCatalog,
        profile: &BuildingTypeProfile,
        site: &SiteInfo,
        history: &TrendHistory,
        basic_economy_complete: bool,
    ) -> Self {
        let mut signals = TrendSignals {
            average_productivity: history.average(),
            basic_economy_complete,
            ..Default::default()
        };
        for ware in profile.outputs.iter().filter_map(|w| catalog.ware(*w)) {
            let stock = engine.ware_stock(ware.id);
            signals.surplus += stock.saturating_sub(ware.target);
            signals.shortage += ware.target.saturating_sub(stock);
        }
        signals.surplus = signals.surplus.min(20);
        signals.shortage = signals.shortage.min(20);
        signals.empty_inputs = site.inputs.iter().filter(|q| q.filled == 0).count() as u32;
        signals
    }

    /// Positive means the site should rather stand still
    pub fn stop_score(&self, scoring: &dyn ScoringFunction) -> i32 {
        let idle = 100u8.saturating_sub(self.average_productivity) / 10;
        scoring
            .score(Feature::OutputSurplus, self.surplus as i32)
            .saturating_add(scoring.score(Feature::OutputShortage, self.shortage as i32))
            .saturating_add(scoring.score(Feature::InputScarcity, self.empty_inputs as i32))
            .saturating_add(scoring.score(Feature::LowProductivity, i32::from(idle)))
            .saturating_add(
                scoring.score_if(Feature::BasicEconomyIncomplete, !self.basic_economy_complete),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::WeightedScoring;

    #[test]
    fn test_history_window() {
        let mut history = TrendHistory::default();
        for p in [0, 0, 90, 90] {
            history.record(p, 2);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.average(), 90);
    }

    #[test]
    fn test_surplus_wants_stop_shortage_does_not() {
        let scoring = WeightedScoring::new();
        let surplus = TrendSignals {
            surplus: 10,
            average_productivity: 80,
            basic_economy_complete: true,
            ..Default::default()
        };
        assert!(surplus.stop_score(&scoring) > 0);

        let shortage = TrendSignals {
            shortage: 10,
            average_productivity: 80,
            basic_economy_complete: true,
            ..Default::default()
        };
        assert!(shortage.stop_score(&scoring) < 0);
    }

    #[test]
    fn test_bootstrap_keeps_sites_running() {
        let scoring = WeightedScoring::new();
        let signals = TrendSignals {
            surplus: 2,
            average_productivity: 100,
            basic_economy_complete: false,
            ..Default::default()
        };
        assert!(signals.stop_score(&scoring) < 0);
    }
}
