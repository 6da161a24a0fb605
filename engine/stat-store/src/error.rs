//! Error types for the StatStore

use thiserror::Error;

use crate::{Season, Stat, Week};

/// Errors that can occur while loading or building the stat store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown position tag '{0}'")]
    UnknownPosition(String),

    #[error(
        "Cumulative {stat} decreased for player {player_id} in {season} week {week} ({previous} -> {current})"
    )]
    NonMonotonic {
        season: Season,
        player_id: String,
        week: Week,
        stat: Stat,
        previous: f64,
        current: f64,
    },

    #[error("Duplicate week {week} for player {player_id} in {season}")]
    DuplicateWeek { season: Season, player_id: String, week: Week },

    #[error("Week 0 is not a valid NFL week (player {player_id}, {season})")]
    InvalidWeek { season: Season, player_id: String },
}
