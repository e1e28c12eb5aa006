pub mod config;
pub mod coords;
pub mod error;
pub mod types;

pub use coords::Coords;
