//! Error types for matchup and playoff simulation

use thiserror::Error;

use crate::{MatchupId, RosterId};

/// Errors that can occur while building brackets or running simulations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Matchup {matchup} references unknown matchup {reference}")]
    UnknownMatchup { matchup: MatchupId, reference: MatchupId },

    #[error("Matchup {matchup} references matchup {reference} which is not in an earlier round")]
    ForwardReference { matchup: MatchupId, reference: MatchupId },

    #[error("Matchup {matchup} has a source reference with neither a winner nor a loser")]
    EmptyReference { matchup: MatchupId },

    #[error("No matchup with id {0}")]
    NoSuchMatchup(MatchupId),

    #[error("Duplicate matchup id {0}")]
    DuplicateMatchup(MatchupId),

    #[error("More than one matchup is flagged as the final")]
    DuplicateFinal,

    #[error("No matchup is flagged as the final")]
    MissingFinal,

    #[error("Roster {roster} is not a participant in matchup {matchup}")]
    NotAParticipant { matchup: MatchupId, roster: RosterId },

    #[error("Cannot simulate a matchup with an empty roster")]
    EmptyRoster,
}
