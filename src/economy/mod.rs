//! Economy membership of flags
//!
//! An economy is a maximal set of road-connected flags. Membership is
//! recomputed from a network snapshot whenever it is marked dirty or a flag
//! shows up that no economy knows about. Ids survive recomputation when the
//! new component overlaps an old one.

use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{EconomyId, FlagId, Timestamp};
use crate::roads::graph::RoadGraph;

#[derive(Debug, Clone, PartialEq)]
pub struct Economy {
    pub id: EconomyId,
    pub flags: BTreeSet<FlagId>,
    pub has_warehouse: bool,
    /// Since when the economy has had no warehouse
    pub disconnected_since: Option<Timestamp>,
}

impl Economy {
    /// Warehouse-less for longer than `grace`
    pub fn lacks_warehouse_for(&self, now: Timestamp, grace: u64) -> bool {
        self.disconnected_since
            .is_some_and(|since| now.saturating_sub(since) >= grace)
    }
}

/// Outcome of a consistency check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EconomyCheck {
    pub recomputed: bool,
    pub economies: usize,
    pub flags: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EconomyGraph {
    economies: BTreeMap<EconomyId, Economy>,
    membership: AHashMap<FlagId, EconomyId>,
    next_id: u32,
    dirty: bool,
}

impl EconomyGraph {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn economies(&self) -> impl Iterator<Item = &Economy> {
        self.economies.values()
    }

    pub fn len(&self) -> usize {
        self.economies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.economies.is_empty()
    }

    /// Economy of a flag; None means membership is not settled yet
    pub fn economy_of(&self, flag: FlagId) -> Option<&Economy> {
        self.membership
            .get(&flag)
            .and_then(|id| self.economies.get(id))
    }

    /// Membership no longer matches the network
    pub fn is_stale(&self, graph: &RoadGraph) -> bool {
        self.dirty
            || graph.node_count() != self.membership.len()
            || graph.nodes().any(|n| !self.membership.contains_key(&n.id))
    }

    /// Recompute membership if needed
    pub fn check(&mut self, graph: &RoadGraph, now: Timestamp) -> EconomyCheck {
        let mut check = EconomyCheck::default();
        if self.is_stale(graph) {
            self.recompute(graph, now);
            check.recomputed = true;
        } else {
            self.refresh_warehouses(graph, now);
        }
        check.economies = self.economies.len();
        check.flags = self.membership.len();
        check
    }

    fn refresh_warehouses(&mut self, graph: &RoadGraph, now: Timestamp) {
        for economy in self.economies.values_mut() {
            let has_warehouse = economy
                .flags
                .iter()
                .any(|f| graph.node(*f).is_some_and(|n| n.warehouse));
            set_warehouse(economy, has_warehouse, now);
        }
    }

    fn recompute(&mut self, graph: &RoadGraph, now: Timestamp) {
        let mut old = std::mem::take(&mut self.economies);
        self.membership.clear();

        let mut assigned: BTreeSet<FlagId> = BTreeSet::new();
        for node in graph.nodes() {
            if assigned.contains(&node.id) {
                continue;
            }
            let flags = graph.component(node.id);
            assigned.extend(flags.iter().copied());
            let has_warehouse = flags
                .iter()
                .any(|f| graph.node(*f).is_some_and(|n| n.warehouse));

            // Reuse the id of the old economy sharing the most flags
            let inherited = old
                .values()
                .map(|e| (e.flags.intersection(&flags).count(), e.id))
                .filter(|(overlap, _)| *overlap > 0)
                .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
                .and_then(|(_, id)| old.remove(&id));

            let mut economy = match inherited {
                Some(mut previous) => {
                    previous.flags = flags;
                    previous
                }
                None => {
                    let id = EconomyId(self.next_id);
                    self.next_id += 1;
                    Economy {
                        id,
                        flags,
                        has_warehouse,
                        disconnected_since: None,
                    }
                }
            };
            set_warehouse(&mut economy, has_warehouse, now);
            for flag in &economy.flags {
                self.membership.insert(*flag, economy.id);
            }
            self.economies.insert(economy.id, economy);
        }

        tracing::debug!(
            "economies recomputed: {} economies over {} flags",
            self.economies.len(),
            self.membership.len()
        );
        self.dirty = false;
    }
}

fn set_warehouse(economy: &mut Economy, has_warehouse: bool, now: Timestamp) {
    economy.has_warehouse = has_warehouse;
    if has_warehouse {
        economy.disconnected_since = None;
    } else if economy.disconnected_since.is_none() {
        economy.disconnected_since = Some(now);
    }
}
