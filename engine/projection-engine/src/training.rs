//! Training-set construction for the per-stat ridge models.

use stat_store::{CumulativeRecord, DefenseTable, PlayerSeason, Position, Season, Stat, StatStore, Week};
use tracing::debug;

use crate::features::{build_features, FeatureInput};

/// Weeks per season used to put samples from different seasons on one
/// recency scale
pub const WEEKS_PER_SEASON: i32 = 18;

/// Design matrix, targets and sample origins for one (position, stat) pair
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub feature_names: Vec<&'static str>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    /// (season, target week) of each sample
    pub origins: Vec<(Season, Week)>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn push(&mut self, names: &[&'static str], row: Vec<f64>, target: f64, origin: (Season, Week)) -> bool {
        if self.feature_names.is_empty() {
            self.feature_names = names.to_vec();
        } else if self.feature_names != names {
            return false;
        }
        self.rows.push(row);
        self.targets.push(target);
        self.origins.push(origin);
        true
    }
}

/// Minimum-volume filters applied to the cumulative window before a sample
/// is used
pub fn passes_exposure(position: Position, prev: &CumulativeRecord) -> bool {
    if prev.games_played < 1 {
        return false;
    }
    let stats = &prev.stats;
    match position {
        Position::QB => stats.attempts >= 10.0,
        Position::WR => stats.targets >= 3.0,
        Position::RB => stats.carries + stats.targets >= 5.0,
        Position::TE => stats.targets / f64::from(prev.games_played) >= 1.5,
        Position::K | Position::DEF => false,
    }
}

/// Collect every usable (player, week) sample for `position` and `stat`
/// across `seasons`.
///
/// Players are not filtered by their own position: anyone clearing the
/// position's exposure rule contributes, so a pass-catching back feeds the
/// receiver models. A sample at target week `w` needs exact records for
/// `w-1` and `w`; its
/// target is the single-week delta of `stat`, and negative deltas are
/// dropped as data artifacts. Players are visited in id order so the set is
/// deterministic.
pub fn build_training_set(
    store: &StatStore,
    defense: &DefenseTable,
    position: Position,
    stat: Stat,
    seasons: &[Season],
) -> TrainingSet {
    let mut set = TrainingSet::default();
    let mut negative = 0usize;
    let mut filtered = 0usize;

    for &season in seasons {
        let mut players: Vec<&PlayerSeason> = store.players(season).collect();
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        for player in players {
            for (&week, this) in player.weeks.range(2u8..) {
                let Some(prev) = player.exact(week - 1) else {
                    continue;
                };

                let target = this.stats.get(stat) - prev.stats.get(stat);
                if !target.is_finite() || target < 0.0 {
                    negative += 1;
                    continue;
                }
                if !passes_exposure(position, prev) {
                    filtered += 1;
                    continue;
                }

                let last_week = player.weekly_delta(week - 1);
                let opponent_ppg = defense.ppg_allowed(this.opponent.as_deref(), position);
                let input = FeatureInput {
                    position,
                    cumulative: &prev.stats,
                    games_played: prev.games_played,
                    last_week: last_week.as_ref(),
                    opponent_ppg,
                    target_week: week,
                };
                let Some(features) = build_features(&input) else {
                    continue;
                };

                let values = features.values().to_vec();
                if !set.push(features.names(), values, target, (season, week)) {
                    debug!("Dropping {} sample with mismatched feature names", position);
                }
            }
        }
    }

    debug!(
        "{} {} training set: {} samples ({} negative deltas, {} below exposure)",
        position,
        stat,
        set.len(),
        negative,
        filtered
    );
    set
}

/// Recency weights `decay^(weeks before the latest sample)`
pub fn recency_weights(origins: &[(Season, Week)], decay: f64) -> Vec<f64> {
    let Some(&max_season) = origins.iter().map(|(season, _)| season).max() else {
        return Vec::new();
    };
    let max_week = origins
        .iter()
        .filter(|(season, _)| *season == max_season)
        .map(|(_, week)| *week)
        .max()
        .unwrap_or(0);

    origins
        .iter()
        .map(|&(season, week)| {
            let seasons_ago = i32::from(max_season) - i32::from(season);
            let weeks_ago = seasons_ago * WEEKS_PER_SEASON + (i32::from(max_week) - i32::from(week));
            decay.powi(weeks_ago)
        })
        .collect()
}
