//! Fields temporarily excluded from site selection
//!
//! After a commit the vicinity of the new site is blocked for a while, so
//! the next cycles do not pile sites onto fields the engine is about to
//! occupy.

use std::collections::BTreeMap;

use crate::core::types::Timestamp;
use crate::core::Coords;

#[derive(Debug, Clone, Default)]
pub struct BlockedFields {
    until: BTreeMap<Coords, Timestamp>,
}

impl BlockedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block every field within `radius` of `center` until `until`
    pub fn block(&mut self, center: Coords, radius: u32, until: Timestamp) {
        for coords in center.within(radius) {
            let entry = self.until.entry(coords).or_insert(until);
            *entry = (*entry).max(until);
        }
    }

    pub fn is_blocked(&self, at: Coords, now: Timestamp) -> bool {
        self.until.get(&at).is_some_and(|t| *t > now)
    }

    /// Drop expired entries
    pub fn purge(&mut self, now: Timestamp) -> usize {
        let before = self.until.len();
        self.until.retain(|_, t| *t > now);
        before - self.until.len()
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_expire() {
        let mut blocked = BlockedFields::new();
        blocked.block(Coords::new(0, 0), 1, 5_000);
        assert_eq!(blocked.len(), 7);
        assert!(blocked.is_blocked(Coords::new(1, 0), 4_999));
        assert!(!blocked.is_blocked(Coords::new(1, 0), 5_000));
        assert!(!blocked.is_blocked(Coords::new(2, 0), 0));

        assert_eq!(blocked.purge(5_000), 7);
        assert!(blocked.is_empty());
    }

    #[test]
    fn test_longer_block_wins() {
        let mut blocked = BlockedFields::new();
        blocked.block(Coords::new(0, 0), 0, 9_000);
        blocked.block(Coords::new(0, 0), 0, 3_000);
        assert!(blocked.is_blocked(Coords::new(0, 0), 8_000));
    }
}
