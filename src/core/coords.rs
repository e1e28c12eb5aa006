//! Hex coordinate system for the game map (axial coordinates)
//!
//! Uses axial coordinates (q, r) for easy neighbor calculation. A building
//! standing on a field has its flag on the south-east neighbor.

use serde::{Deserialize, Serialize};

/// Axial hex coordinate of a map field
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Coords {
    pub q: i32,
    pub r: i32,
}

impl Coords {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Walking distance in hex space
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// All 6 neighboring fields
    pub fn neighbors(&self) -> [Coords; 6] {
        [
            Coords::new(self.q + 1, self.r),
            Coords::new(self.q + 1, self.r - 1),
            Coords::new(self.q, self.r - 1),
            Coords::new(self.q - 1, self.r),
            Coords::new(self.q - 1, self.r + 1),
            Coords::new(self.q, self.r + 1),
        ]
    }

    /// Field where the flag of a building standing here is placed
    pub fn flag_position(&self) -> Coords {
        Coords::new(self.q, self.r + 1)
    }

    /// Field a building would occupy if this were its flag
    pub fn building_position(&self) -> Coords {
        Coords::new(self.q, self.r - 1)
    }

    /// All fields within range (inclusive), in a stable order
    pub fn within(&self, range: u32) -> Vec<Coords> {
        let range = range as i32;
        let mut results = Vec::new();
        for q in -range..=range {
            for r in (-range).max(-q - range)..=range.min(-q + range) {
                results.push(Coords::new(self.q + q, self.r + r));
            }
        }
        results
    }
}

impl std::fmt::Display for Coords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
