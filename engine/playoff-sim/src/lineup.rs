//! Lineups: summing starters and greedy optimal lineup construction.

use projection_engine::PlayerPrediction;
use serde::{Deserialize, Serialize};
use stat_store::{PlayerId, Position};

/// A player's weekly outlook as seen by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOutlook {
    pub player_id: PlayerId,
    pub position: Position,
    pub mean: f64,
    pub std_dev: f64,
    /// False for injured, suspended or otherwise inactive players
    #[serde(default = "default_available")]
    pub available: bool,
    /// True once the player's game is final and `mean` holds actual points
    #[serde(default)]
    pub played: bool,
}

fn default_available() -> bool {
    true
}

impl PlayerOutlook {
    pub fn new(player_id: impl Into<PlayerId>, position: Position, mean: f64, std_dev: f64) -> Self {
        Self { player_id: player_id.into(), position, mean, std_dev, available: true, played: false }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Outlook for a player whose game is already final
    pub fn finished(player_id: impl Into<PlayerId>, position: Position, points: f64) -> Self {
        Self { played: true, ..Self::new(player_id, position, points, 0.0) }
    }

    /// Players who already scored stay eligible even if since ruled out
    fn is_eligible(&self) -> bool {
        (self.available || self.played) && self.mean > 0.0
    }
}

impl From<&PlayerPrediction> for PlayerOutlook {
    fn from(prediction: &PlayerPrediction) -> Self {
        Self::new(prediction.player_id.clone(), prediction.position, prediction.mean, prediction.std_dev)
    }
}

/// Starting slot counts for a league
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineupSlots {
    pub qb: usize,
    pub rb: usize,
    pub wr: usize,
    pub te: usize,
    pub k: usize,
    pub def: usize,
    /// RB, WR or TE
    pub flex: usize,
    /// QB, RB, WR or TE
    pub superflex: usize,
}

impl Default for LineupSlots {
    fn default() -> Self {
        Self { qb: 1, rb: 2, wr: 3, te: 1, k: 0, def: 0, flex: 1, superflex: 1 }
    }
}

impl LineupSlots {
    fn required(&self) -> [(Position, usize); 6] {
        [
            (Position::QB, self.qb),
            (Position::RB, self.rb),
            (Position::WR, self.wr),
            (Position::TE, self.te),
            (Position::K, self.k),
            (Position::DEF, self.def),
        ]
    }

    pub fn total(&self) -> usize {
        self.qb + self.rb + self.wr + self.te + self.k + self.def + self.flex + self.superflex
    }
}

/// A set of starters with its combined projection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lineup {
    pub starters: Vec<PlayerId>,
    pub mean: f64,
    /// `sqrt(Σ std²)`, treating players as independent
    pub std_dev: f64,
}

impl Lineup {
    /// Sum the given players as they are, without any eligibility filter
    pub fn from_players<'a, I>(players: I) -> Self
    where
        I: IntoIterator<Item = &'a PlayerOutlook>,
    {
        let mut lineup = Lineup::default();
        let mut variance = 0.0;
        for player in players {
            lineup.starters.push(player.player_id.clone());
            lineup.mean += player.mean;
            variance += player.std_dev * player.std_dev;
        }
        lineup.std_dev = variance.sqrt();
        lineup
    }

    pub fn len(&self) -> usize {
        self.starters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starters.is_empty()
    }
}

fn by_mean_desc(a: &&PlayerOutlook, b: &&PlayerOutlook) -> std::cmp::Ordering {
    b.mean.total_cmp(&a.mean).then_with(|| a.player_id.cmp(&b.player_id))
}

/// Greedy best lineup: fill each fixed slot with the highest-mean eligible
/// player, then FLEX from the leftover RB/WR/TE, then SUPERFLEX from the
/// leftover QBs and flex pool. Unavailable players and players projected at
/// or below zero are never started. Slots with no candidate stay empty.
pub fn optimal_lineup(roster: &[PlayerOutlook], slots: &LineupSlots) -> Lineup {
    let mut chosen: Vec<&PlayerOutlook> = Vec::with_capacity(slots.total());
    let mut leftovers: Vec<&PlayerOutlook> = Vec::new();

    for (position, count) in slots.required() {
        let mut pool: Vec<&PlayerOutlook> =
            roster.iter().filter(|p| p.position == position && p.is_eligible()).collect();
        pool.sort_by(by_mean_desc);
        let take = count.min(pool.len());
        leftovers.extend(pool.drain(take..));
        chosen.extend(pool);
    }

    let mut flex_pool: Vec<&PlayerOutlook> =
        leftovers.iter().copied().filter(|p| p.position.is_flex()).collect();
    flex_pool.sort_by(by_mean_desc);
    let take = slots.flex.min(flex_pool.len());
    chosen.extend(flex_pool.drain(..take));

    let mut superflex_pool: Vec<&PlayerOutlook> = leftovers
        .iter()
        .copied()
        .filter(|p| p.position == Position::QB)
        .chain(flex_pool)
        .collect();
    superflex_pool.sort_by(by_mean_desc);
    let take = slots.superflex.min(superflex_pool.len());
    chosen.extend(superflex_pool.drain(..take));

    Lineup::from_players(chosen)
}
