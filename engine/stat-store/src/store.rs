use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::types::{Position, Stat, StatLine};
use crate::{PlayerId, Season, Week};

/// Cumulative stats for one player from week 1 through `through_week` inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeRecord {
    pub through_week: Week,
    pub games_played: u32,
    pub team: String,
    /// Opponent faced in `through_week`
    pub opponent: Option<String>,
    pub stats: StatLine,
}

/// One player's season: identity plus cumulative records keyed by week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player_id: PlayerId,
    pub name: Option<String>,
    /// Authoritative position tag from the data source, when supplied
    pub position: Option<Position>,
    pub weeks: BTreeMap<Week, CumulativeRecord>,
}

impl PlayerSeason {
    pub fn new(player_id: impl Into<PlayerId>, position: Option<Position>) -> Self {
        Self { player_id: player_id.into(), name: None, position, weeks: BTreeMap::new() }
    }

    /// Record for exactly `week`, if present
    pub fn exact(&self, week: Week) -> Option<&CumulativeRecord> {
        self.weeks.get(&week)
    }

    /// Record for `week`, falling back to the most recent earlier week
    pub fn through(&self, week: Week) -> Option<&CumulativeRecord> {
        self.weeks.range(..=week).next_back().map(|(_, r)| r)
    }

    /// Most recent record of the season
    pub fn latest(&self) -> Option<&CumulativeRecord> {
        self.weeks.values().next_back()
    }

    /// Stats produced in `week` alone: `cum[week] - cum[week-1]`.
    ///
    /// When `week-1` has no record the cumulative line for `week` is returned as-is.
    pub fn weekly_delta(&self, week: Week) -> Option<StatLine> {
        let this = self.exact(week)?;
        let prev = if week > 1 { self.exact(week - 1) } else { None };
        Some(match prev {
            Some(prev) => this.stats.delta(&prev.stats),
            None => this.stats.clone(),
        })
    }

    /// Position tag, or the stat-pattern heuristic when the source carried none
    pub fn resolved_position(&self, record: &CumulativeRecord) -> Position {
        match self.position {
            Some(position) => position,
            None => {
                let inferred = Position::infer_from_stats(&record.stats);
                debug!(
                    "No position tag for player {}, inferred {} from stat pattern",
                    self.player_id, inferred
                );
                inferred
            }
        }
    }

    /// Verify counting stats never decrease week over week
    pub fn check_monotonic(&self, season: Season) -> Result<(), StoreError> {
        let mut prev: Option<&CumulativeRecord> = None;
        for record in self.weeks.values() {
            if let Some(prev) = prev {
                for stat in Stat::ALL.iter().filter(|s| s.is_counting()) {
                    let (before, after) = (prev.stats.get(*stat), record.stats.get(*stat));
                    if after < before {
                        return Err(StoreError::NonMonotonic {
                            season,
                            player_id: self.player_id.clone(),
                            week: record.through_week,
                            stat: *stat,
                            previous: before,
                            current: after,
                        });
                    }
                }
            }
            prev = Some(record);
        }
        Ok(())
    }
}

/// Season → player → week indexed table of cumulative stats
#[derive(Debug, Clone, Default)]
pub struct StatStore {
    seasons: BTreeMap<Season, HashMap<PlayerId, PlayerSeason>>,
    generated_at: Option<DateTime<Utc>>,
}

// Enriched-stats export layout
#[derive(Debug, Deserialize)]
struct EnrichedStatsFile {
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    seasons: Vec<EnrichedSeason>,
}

#[derive(Debug, Deserialize)]
struct EnrichedSeason {
    season: Season,
    #[serde(default)]
    players: Vec<EnrichedPlayer>,
}

#[derive(Debug, Deserialize)]
struct EnrichedPlayer {
    player_id: PlayerId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    cumulative_by_week: Vec<EnrichedWeek>,
}

#[derive(Debug, Deserialize)]
struct EnrichedWeek {
    through_week: Week,
    #[serde(default)]
    games_played: f64,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    opponent: Option<String>,
    #[serde(default)]
    stats: HashMap<String, serde_json::Value>,
}

/// Export timestamps come either as RFC 3339 or as a naive UTC datetime
fn parse_generated_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert a loosely-typed upstream stats map into a [`StatLine`].
///
/// Unknown keys are ignored; nulls and non-numeric values become 0.0.
fn stat_line_from_map(raw: &HashMap<String, serde_json::Value>) -> StatLine {
    let mut line = StatLine::default();
    for (name, value) in raw {
        if let Some(stat) = Stat::from_name(name) {
            line.set(stat, value.as_f64().unwrap_or(0.0));
        }
    }
    line
}

fn player_season_from_weeks(
    season: Season,
    player: EnrichedPlayer,
    position: Option<Position>,
) -> Result<PlayerSeason, StoreError> {
    let mut player_season = PlayerSeason::new(player.player_id.clone(), position);
    player_season.name = player.name;

    for week in player.cumulative_by_week {
        if week.through_week == 0 {
            return Err(StoreError::InvalidWeek { season, player_id: player.player_id });
        }
        let record = CumulativeRecord {
            through_week: week.through_week,
            games_played: week.games_played.max(0.0) as u32,
            team: week.team.unwrap_or_else(|| "FA".to_string()),
            opponent: week.opponent.filter(|o| !o.is_empty()),
            stats: stat_line_from_map(&week.stats),
        };
        if player_season.weeks.insert(week.through_week, record).is_some() {
            return Err(StoreError::DuplicateWeek {
                season,
                player_id: player.player_id,
                week: week.through_week,
            });
        }
    }
    Ok(player_season)
}

impl StatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an enriched-stats JSON export
    pub async fn load_from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, StoreError> {
        info!("Loading enriched stats from: {:?}", file_path.as_ref());
        let json_content = tokio::fs::read_to_string(&file_path).await?;
        Self::from_json_str(&json_content)
    }

    /// Parse an enriched-stats JSON export, validating it once at ingestion
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let file: EnrichedStatsFile = serde_json::from_str(json)?;
        let mut store = StatStore::new();
        if let Some(raw) = &file.generated_at {
            store.generated_at = parse_generated_at(raw);
            match store.generated_at {
                Some(ts) => debug!("Enriched stats generated at {}", ts),
                None => warn!("Unparseable generated_at timestamp '{}'", raw),
            }
        }
        for season in file.seasons {
            for player in season.players {
                let position = match player.position.as_deref() {
                    Some(tag) if !tag.is_empty() => match tag.parse::<Position>() {
                        Ok(position) => Some(position),
                        Err(e) => {
                            warn!("Player {}: {}, falling back to inference", player.player_id, e);
                            None
                        }
                    },
                    _ => None,
                };

                let loaded = player_season_from_weeks(season.season, player, position)
                    .and_then(|player_season| store.insert(season.season, player_season));
                if let Err(e) = loaded {
                    warn!("Skipping player-season: {}", e);
                }
            }
        }

        info!(
            "Loaded {} player-seasons across {} seasons",
            store.player_season_count(),
            store.seasons.len()
        );
        Ok(store)
    }

    /// Insert a player's season, rejecting non-monotonic cumulative input
    pub fn insert(&mut self, season: Season, player: PlayerSeason) -> Result<(), StoreError> {
        player.check_monotonic(season)?;
        self.seasons.entry(season).or_default().insert(player.player_id.clone(), player);
        Ok(())
    }

    /// When the export was produced, if it said so
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    pub fn seasons(&self) -> impl Iterator<Item = Season> + '_ {
        self.seasons.keys().copied()
    }

    /// All players with data in `season`
    pub fn players(&self, season: Season) -> impl Iterator<Item = &PlayerSeason> + '_ {
        self.seasons.get(&season).into_iter().flat_map(|players| players.values())
    }

    pub fn player(&self, season: Season, player_id: &str) -> Option<&PlayerSeason> {
        self.seasons.get(&season)?.get(player_id)
    }

    /// Cumulative record through `week`, falling back to the latest earlier week
    pub fn cumulative_through(
        &self,
        season: Season,
        player_id: &str,
        week: Week,
    ) -> Option<&CumulativeRecord> {
        self.player(season, player_id)?.through(week)
    }

    /// Stats produced by a player in `week` alone
    pub fn weekly_delta(&self, season: Season, player_id: &str, week: Week) -> Option<StatLine> {
        self.player(season, player_id)?.weekly_delta(week)
    }

    pub fn player_season_count(&self) -> usize {
        self.seasons.values().map(|players| players.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.player_season_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "generated_at": "2025-12-01T00:00:00",
        "seasons": [{
            "season": 2025,
            "players": [{
                "player_id": "00-0034796",
                "name": "Lamar Jackson",
                "position": "QB",
                "cumulative_by_week": [
                    {"through_week": 1, "games_played": 1, "team": "BAL", "opponent": "BUF",
                     "stats": {"attempts": 30, "passing_yards": 250, "passing_interceptions": 1}},
                    {"through_week": 2, "games_played": 2, "team": "BAL", "opponent": "CLE",
                     "stats": {"attempts": 58, "passing_yards": 480, "passing_interceptions": 1,
                               "passing_cpoe": null, "passing_2pt": 1}},
                    {"through_week": 4, "games_played": 3, "team": "BAL", "opponent": "KC",
                     "stats": {"attempts": 90, "passing_yards": 720, "passing_interceptions": 2}}
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_parse_enriched_export() {
        let store = StatStore::from_json_str(SAMPLE).unwrap();
        assert_eq!(store.player_season_count(), 1);

        let player = store.player(2025, "00-0034796").unwrap();
        assert_eq!(player.position, Some(Position::QB));
        assert_eq!(player.weeks.len(), 3);
        assert_eq!(
            store.generated_at().unwrap().to_rfc3339(),
            "2025-12-01T00:00:00+00:00"
        );

        let week2 = player.exact(2).unwrap();
        assert_eq!(week2.stats.interceptions, 1.0);
        assert_eq!(week2.stats.passing_cpoe, 0.0);
        assert_eq!(week2.opponent.as_deref(), Some("CLE"));
    }

    #[test]
    fn test_missing_week_falls_back_to_latest_prior() {
        let store = StatStore::from_json_str(SAMPLE).unwrap();

        let week3 = store.cumulative_through(2025, "00-0034796", 3).unwrap();
        assert_eq!(week3.through_week, 2);

        let week10 = store.cumulative_through(2025, "00-0034796", 10).unwrap();
        assert_eq!(week10.through_week, 4);

        assert!(store.cumulative_through(2025, "unknown", 3).is_none());
        assert!(store.cumulative_through(2024, "00-0034796", 3).is_none());
    }

    #[test]
    fn test_weekly_delta() {
        let store = StatStore::from_json_str(SAMPLE).unwrap();

        let week2 = store.weekly_delta(2025, "00-0034796", 2).unwrap();
        assert_eq!(week2.attempts, 28.0);
        assert_eq!(week2.passing_yards, 230.0);

        // Week 1 has no predecessor, so the cumulative line is the weekly line
        let week1 = store.weekly_delta(2025, "00-0034796", 1).unwrap();
        assert_eq!(week1.attempts, 30.0);

        // Week 4 with week 3 missing returns the cumulative line unchanged
        let week4 = store.weekly_delta(2025, "00-0034796", 4).unwrap();
        assert_eq!(week4.attempts, 90.0);

        assert!(store.weekly_delta(2025, "00-0034796", 3).is_none());
    }

    #[test]
    fn test_non_monotonic_player_season_skipped() {
        let bad = SAMPLE.replace(r#""attempts": 90"#, r#""attempts": 40"#);
        let store = StatStore::from_json_str(&bad).unwrap();
        assert!(store.player(2025, "00-0034796").is_none());
    }

    #[test]
    fn test_bad_weeks_skip_only_that_player_season() {
        let json = r#"{
            "seasons": [{
                "season": 2025,
                "players": [
                    {"player_id": "wr_ok", "position": "WR", "cumulative_by_week": [
                        {"through_week": 1, "games_played": 1, "stats": {"targets": 4}}
                    ]},
                    {"player_id": "wr_zero", "position": "WR", "cumulative_by_week": [
                        {"through_week": 0, "games_played": 1, "stats": {"targets": 4}}
                    ]},
                    {"player_id": "wr_dup", "position": "WR", "cumulative_by_week": [
                        {"through_week": 1, "games_played": 1, "stats": {"targets": 4}},
                        {"through_week": 1, "games_played": 1, "stats": {"targets": 6}}
                    ]}
                ]
            }]
        }"#;

        let store = StatStore::from_json_str(json).unwrap();
        assert_eq!(store.player_season_count(), 1);
        assert_eq!(store.player(2025, "wr_ok").unwrap().exact(1).unwrap().stats.targets, 4.0);
        assert!(store.player(2025, "wr_zero").is_none());
        assert!(store.player(2025, "wr_dup").is_none());
    }

    #[test]
    fn test_insert_rejects_non_monotonic_counts() {
        let mut player = PlayerSeason::new("p1", Some(Position::WR));
        for (week, receptions) in [(1u8, 5.0), (2, 3.0)] {
            player.weeks.insert(
                week,
                CumulativeRecord {
                    through_week: week,
                    games_played: week as u32,
                    team: "DET".to_string(),
                    opponent: None,
                    stats: StatLine { receptions, ..Default::default() },
                },
            );
        }

        let mut store = StatStore::new();
        match store.insert(2025, player) {
            Err(StoreError::NonMonotonic { stat, week, .. }) => {
                assert_eq!(stat, Stat::Receptions);
                assert_eq!(week, 2);
            }
            other => panic!("Expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_position_uses_inference() {
        let untagged = SAMPLE.replace(r#""position": "QB","#, "");
        let store = StatStore::from_json_str(&untagged).unwrap();
        let player = store.player(2025, "00-0034796").unwrap();
        assert_eq!(player.position, None);
        let latest = player.latest().unwrap();
        assert_eq!(player.resolved_position(latest), Position::QB);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = StatStore::load_from_file(file.path()).await.unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.seasons().collect::<Vec<_>>(), vec![2025]);
    }
}
