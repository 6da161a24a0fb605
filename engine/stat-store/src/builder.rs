//! Builds a [`StatStore`] from weekly box-score lines.
//!
//! Cumulative records are produced by running sums, so a store built here is
//! cumulative by construction.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{CumulativeRecord, PlayerSeason, StatStore};
use crate::types::{Position, StatLine};
use crate::{PlayerId, Season, Week};

/// One player's production in a single game week
#[derive(Debug, Clone)]
pub struct WeeklyLine {
    pub week: Week,
    pub team: String,
    pub opponent: Option<String>,
    pub stats: StatLine,
}

#[derive(Debug, Default)]
struct PendingPlayer {
    name: Option<String>,
    position: Option<Position>,
    weeks: BTreeMap<Week, WeeklyLine>,
}

/// Accumulates weekly lines per (season, player) and emits cumulative records
#[derive(Debug, Default)]
pub struct StatStoreBuilder {
    pending: BTreeMap<Season, HashMap<PlayerId, PendingPlayer>>,
}

impl StatStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register identity for a player; the position tag becomes authoritative
    pub fn player(
        &mut self,
        season: Season,
        player_id: &str,
        name: Option<&str>,
        position: Option<Position>,
    ) -> &mut Self {
        let entry = self.entry(season, player_id);
        if name.is_some() {
            entry.name = name.map(str::to_string);
        }
        if position.is_some() {
            entry.position = position;
        }
        self
    }

    /// Add a game line; a later line for the same week replaces the earlier one
    pub fn add_week(
        &mut self,
        season: Season,
        player_id: &str,
        line: WeeklyLine,
    ) -> Result<&mut Self, StoreError> {
        if line.week == 0 {
            return Err(StoreError::InvalidWeek { season, player_id: player_id.to_string() });
        }
        let entry = self.entry(season, player_id);
        if entry.weeks.insert(line.week, line).is_some() {
            debug!("Replaced duplicate weekly line for {} in {}", player_id, season);
        }
        Ok(self)
    }

    fn entry(&mut self, season: Season, player_id: &str) -> &mut PendingPlayer {
        self.pending.entry(season).or_default().entry(player_id.to_string()).or_default()
    }

    /// Produce the immutable store
    pub fn build(self) -> Result<StatStore, StoreError> {
        let mut store = StatStore::new();
        let mut records = 0usize;

        for (season, players) in self.pending {
            for (player_id, pending) in players {
                let mut player = PlayerSeason::new(player_id, pending.position);
                player.name = pending.name;

                let mut running = StatLine::default();
                let mut games = 0u32;
                for (week, line) in pending.weeks {
                    running.accumulate(&line.stats);
                    games += 1;
                    player.weeks.insert(
                        week,
                        CumulativeRecord {
                            through_week: week,
                            games_played: games,
                            team: line.team,
                            opponent: line.opponent,
                            stats: running.clone(),
                        },
                    );
                    records += 1;
                }

                store.insert(season, player)?;
            }
        }

        info!("Built stat store with {} cumulative records", records);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stat;
    use proptest::prelude::*;

    fn line(week: Week, receptions: f64, yards: f64) -> WeeklyLine {
        WeeklyLine {
            week,
            team: "MIN".to_string(),
            opponent: Some("GB".to_string()),
            stats: StatLine {
                targets: receptions + 2.0,
                receptions,
                receiving_yards: yards,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_build_accumulates_weeks() {
        let mut builder = StatStoreBuilder::new();
        builder.player(2025, "wr1", Some("Justin Jefferson"), Some(Position::WR));
        builder.add_week(2025, "wr1", line(1, 6.0, 80.0)).unwrap();
        builder.add_week(2025, "wr1", line(2, 9.0, 120.0)).unwrap();
        builder.add_week(2025, "wr1", line(4, 4.0, 45.0)).unwrap();

        let store = builder.build().unwrap();
        let player = store.player(2025, "wr1").unwrap();
        assert_eq!(player.position, Some(Position::WR));
        assert_eq!(player.name.as_deref(), Some("Justin Jefferson"));

        let week4 = player.exact(4).unwrap();
        assert_eq!(week4.games_played, 3);
        assert_eq!(week4.stats.receptions, 19.0);
        assert_eq!(week4.stats.receiving_yards, 245.0);

        // Bye in week 3 falls back to the week 2 record
        assert_eq!(player.through(3).unwrap().through_week, 2);
    }

    #[test]
    fn test_week_zero_rejected() {
        let mut builder = StatStoreBuilder::new();
        assert!(builder.add_week(2025, "wr1", line(0, 1.0, 10.0)).is_err());
    }

    proptest! {
        /// Cumulative counting stats never decrease week over week
        #[test]
        fn prop_cumulative_counts_monotonic(
            weeks in proptest::collection::vec((0.0f64..15.0, -10.0f64..200.0), 1..17)
        ) {
            let mut builder = StatStoreBuilder::new();
            for (i, (receptions, yards)) in weeks.iter().enumerate() {
                builder
                    .add_week(2025, "p", line(i as Week + 1, receptions.floor(), *yards))
                    .unwrap();
            }
            let store = builder.build().unwrap();
            let player = store.player(2025, "p").unwrap();

            let records: Vec<_> = player.weeks.values().collect();
            for pair in records.windows(2) {
                for stat in Stat::ALL.iter().filter(|s| s.is_counting()) {
                    prop_assert!(pair[1].stats.get(*stat) >= pair[0].stats.get(*stat));
                }
                prop_assert!(pair[1].games_played > pair[0].games_played);
            }
        }
    }
}
