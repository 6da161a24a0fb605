//! # Playoff Simulator
//!
//! Monte Carlo tools built on player projections:
//!
//! - [`MatchupSimulator`]: head-to-head win probability from team or
//!   per-player score distributions
//! - [`optimal_lineup`]: greedy best lineup for a roster
//! - [`Bracket`]: validated playoff bracket topology
//! - [`PlayoffSimulator`]: championship and consolation odds from repeated
//!   end-to-end bracket runs
//!
//! All simulations are batched across rayon workers with one ChaCha8 stream
//! per batch, so a fixed seed gives identical results on any thread count.

pub mod bracket;
pub mod error;
pub mod lineup;
pub mod matchup;
pub mod playoffs;
pub mod trials;

/// League roster identifier
pub type RosterId = u32;
/// Bracket matchup identifier
pub type MatchupId = u32;

pub use bracket::{Bracket, BracketMatchup, BracketNode, BracketSpec, MatchOutcome, Slot, SourceRef};
pub use error::SimError;
pub use lineup::{optimal_lineup, Lineup, LineupSlots, PlayerOutlook};
pub use matchup::{MatchupProjection, MatchupSimulator, SideProjection, TeamSheet};
pub use playoffs::{finalize_completed, PlayoffOdds, PlayoffSimulator, RosterProjector, TeamOdds, TeamProjector};
