//! # StatStore
//!
//! Enriched NFL stat store for the projection engine.
//!
//! Holds cumulative (week 1 through week N) counting and advanced stats for every
//! player, indexed by season, player and week. The store is built once per data
//! refresh, either from an enriched-stats JSON export or from weekly box-score
//! lines via [`StatStoreBuilder`], and is immutable afterwards.

pub mod builder;
pub mod defense;
pub mod error;
pub mod store;
pub mod types;

pub use builder::{StatStoreBuilder, WeeklyLine};
pub use defense::{DefenseStrength, DefenseTable};
pub use error::StoreError;
pub use store::{CumulativeRecord, PlayerSeason, StatStore};
pub use types::{Position, Stat, StatLine};

/// Season identifier (e.g. 2025)
pub type Season = u16;

/// NFL week number (1-based)
pub type Week = u8;

/// Upstream player identifier (e.g. a gsis id)
pub type PlayerId = String;
