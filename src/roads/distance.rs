//! Flag to nearest-warehouse distances

use std::collections::BTreeMap;

use crate::core::types::{FlagId, Timestamp};
use crate::roads::graph::RoadGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDistance {
    /// Road steps to the warehouse flag
    pub distance: u32,
    pub warehouse: FlagId,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceReport {
    pub updated: usize,
    pub evicted: usize,
    pub warehouses: usize,
}

/// Global flag -> (distance, warehouse, last update) table
#[derive(Debug, Clone, Default)]
pub struct FlagDistances {
    entries: BTreeMap<FlagId, FlagDistance>,
}

impl FlagDistances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: FlagId) -> Option<&FlagDistance> {
        self.entries.get(&flag)
    }

    pub fn distance(&self, flag: FlagId) -> Option<u32> {
        self.entries.get(&flag).map(|e| e.distance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlagId, &FlagDistance)> {
        self.entries.iter()
    }

    /// Relax the table from every warehouse flag, then evict stale entries
    pub fn update(&mut self, graph: &RoadGraph, now: Timestamp, retention: u64) -> DistanceReport {
        let warehouses = graph.warehouse_flags();
        let mut report = DistanceReport {
            warehouses: warehouses.len(),
            ..Default::default()
        };

        for (flag, (distance, warehouse)) in graph.walk(&warehouses, None, &[]) {
            let entry = FlagDistance {
                distance,
                warehouse,
                updated_at: now,
            };
            match self.entries.get_mut(&flag) {
                // Already relaxed this round by a closer warehouse
                Some(existing) if existing.updated_at == now && existing.distance <= distance => {}
                Some(existing) => *existing = entry,
                None => {
                    self.entries.insert(flag, entry);
                }
            }
            report.updated += 1;
        }

        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_sub(e.updated_at) <= retention);
        report.evicted = before - self.entries.len();
        report
    }

    /// Mean distance over all known flags, weighting far flags more
    pub fn weighted_mean(&self) -> u32 {
        if self.entries.is_empty() {
            return 0;
        }
        let (sum, weights) = self.entries.values().fold((0u64, 0u64), |(s, w), e| {
            let weight = u64::from(e.distance) + 1;
            (s + u64::from(e.distance) * weight, w + weight)
        });
        (sum / weights) as u32
    }

    /// Flags further than `limit` from any warehouse
    pub fn beyond(&self, limit: u32) -> usize {
        self.entries.values().filter(|e| e.distance > limit).count()
    }
}
