//! League snapshot file consumed by the `playoffs` command.

use anyhow::{Context, Result};
use playoff_sim::{BracketSpec, LineupSlots, PlayerOutlook, RosterId, TeamSheet};
use serde::{Deserialize, Serialize};
use stat_store::{PlayerId, Position, Week};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub roster_id: RosterId,
    #[serde(default)]
    pub owner: Option<String>,
    /// Starting lineup as currently set
    #[serde(default)]
    pub starters: Vec<PlayerId>,
    /// Every rostered player, starters included
    #[serde(default)]
    pub players: Vec<PlayerId>,
    /// Players ruled out (IR, Out, Doubtful)
    #[serde(default)]
    pub inactive: Vec<PlayerId>,
    /// Points already scored this week by players whose game is final
    #[serde(default)]
    pub actual_points: HashMap<PlayerId, f64>,
    /// Roster positions as listed by the league host
    #[serde(default)]
    pub positions: HashMap<PlayerId, Position>,
}

/// Rosters and brackets for one league at one point in the playoffs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    /// NFL week currently being played
    pub week: Week,
    /// NFL week of playoff round 1
    pub playoff_week_start: Week,
    #[serde(default)]
    pub slots: LineupSlots,
    pub rosters: Vec<RosterEntry>,
    pub winners_bracket: BracketSpec,
    #[serde(default)]
    pub losers_bracket: Option<BracketSpec>,
}

impl LeagueSnapshot {
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading league snapshot {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing league snapshot")
    }

    /// Bracket round being played this week (1-based, 0 before the playoffs)
    pub fn current_round(&self) -> u32 {
        if self.week < self.playoff_week_start {
            0
        } else {
            u32::from(self.week - self.playoff_week_start) + 1
        }
    }

    /// Team sheets with each player's outlook. Players with a final score
    /// use it as a zero-variance outlook whether or not `project` knows them;
    /// the rest are looked up with `project`, and players it cannot project
    /// are left out. A finished player with no listed or projected position
    /// is tagged WR so the score can still fill a flex slot.
    pub fn team_sheets<F>(&self, project: F) -> Vec<TeamSheet>
    where
        F: Fn(&str) -> Option<PlayerOutlook>,
    {
        self.rosters
            .iter()
            .map(|entry| {
                let inactive: HashSet<&str> = entry.inactive.iter().map(String::as_str).collect();
                let outlook = |id: &PlayerId| -> Option<PlayerOutlook> {
                    let mut outlook = match entry.actual_points.get(id) {
                        Some(points) => {
                            let position = entry
                                .positions
                                .get(id)
                                .copied()
                                .or_else(|| project(id.as_str()).map(|p| p.position))
                                .unwrap_or(Position::WR);
                            PlayerOutlook::finished(id.clone(), position, *points)
                        }
                        None => project(id.as_str())?,
                    };
                    if inactive.contains(id.as_str()) {
                        outlook = outlook.unavailable();
                    }
                    Some(outlook)
                };

                let starters = entry.starters.iter().filter_map(&outlook).collect();
                let mut ids: Vec<&PlayerId> = entry.players.iter().collect();
                for id in &entry.starters {
                    if !entry.players.contains(id) {
                        ids.push(id);
                    }
                }
                let roster = ids.into_iter().filter_map(&outlook).collect();
                TeamSheet { roster_id: entry.roster_id, starters, roster }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playoff_sim::Lineup;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "week": 16,
        "playoff_week_start": 15,
        "rosters": [
            {
                "roster_id": 1,
                "starters": ["qb_a", "wr_a"],
                "players": ["qb_a", "wr_a", "rb_a"],
                "inactive": ["rb_a"],
                "actual_points": {"qb_a": 27.5}
            },
            {"roster_id": 2, "starters": ["qb_b", "ghost"], "players": ["qb_b"]}
        ],
        "winners_bracket": [
            {"r": 1, "m": 1, "t1": 1, "t2": 2, "w": 1, "l": 2},
            {"r": 2, "m": 2, "t1_from": {"w": 1}, "t2": 3, "p": 1}
        ]
    }"#;

    fn project(id: &str) -> Option<PlayerOutlook> {
        let position = match id {
            "qb_a" | "qb_b" => Position::QB,
            "wr_a" => Position::WR,
            "rb_a" => Position::RB,
            _ => return None,
        };
        Some(PlayerOutlook::new(id, position, 15.0, 5.0))
    }

    #[test]
    fn test_snapshot_parsing_and_round() {
        let snapshot = LeagueSnapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.current_round(), 2);
        assert_eq!(snapshot.slots, LineupSlots::default());
        assert!(snapshot.losers_bracket.is_none());
        assert_eq!(snapshot.winners_bracket.nodes.len(), 2);

        let before = LeagueSnapshot { week: 14, ..snapshot.clone() };
        assert_eq!(before.current_round(), 0);
        let first = LeagueSnapshot { week: 15, ..snapshot };
        assert_eq!(first.current_round(), 1);
    }

    #[test]
    fn test_team_sheets_apply_actuals_and_injuries() {
        let snapshot = LeagueSnapshot::from_json_str(SNAPSHOT).unwrap();
        let sheets = snapshot.team_sheets(project);

        let team_a = &sheets[0];
        assert_eq!(team_a.starters.len(), 2);
        assert!(team_a.starters[0].played);
        assert_eq!(team_a.starters[0].mean, 27.5);
        assert_eq!(team_a.starters[0].std_dev, 0.0);
        let rb = team_a.roster.iter().find(|p| p.player_id == "rb_a").unwrap();
        assert!(!rb.available);

        // Unknown players are dropped
        let team_b = &sheets[1];
        assert_eq!(team_b.starters.len(), 1);
        assert_eq!(team_b.roster.len(), 1);
    }

    #[test]
    fn test_finished_starter_counts_without_projection() {
        let snapshot = LeagueSnapshot::from_json_str(
            r#"{
                "week": 15,
                "playoff_week_start": 15,
                "rosters": [{
                    "roster_id": 1,
                    "starters": ["qb_a", "rookie", "call_up"],
                    "players": ["qb_a", "rookie", "call_up"],
                    "actual_points": {"qb_a": 20.0, "rookie": 31.0, "call_up": 4.0},
                    "positions": {"rookie": "TE"}
                }],
                "winners_bracket": [{"r": 1, "m": 1, "t1": 1, "t2": 2}]
            }"#,
        )
        .unwrap();
        let sheets = snapshot.team_sheets(project);

        let team = &sheets[0];
        assert_eq!(team.starters.len(), 3);
        assert_eq!(team.roster.len(), 3);
        assert_eq!(team.starters[0].position, Position::QB);
        assert_eq!(team.starters[1].position, Position::TE);
        assert_eq!(team.starters[2].position, Position::WR);
        assert!(team.starters.iter().all(|p| p.played));

        let lineup = Lineup::from_players(&team.starters);
        assert_eq!(lineup.mean, 55.0);
        assert_eq!(lineup.std_dev, 0.0);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        let snapshot = LeagueSnapshot::load_from_file(file.path()).await.unwrap();
        assert_eq!(snapshot.rosters.len(), 2);

        assert!(LeagueSnapshot::load_from_file("/nonexistent/league.json").await.is_err());
    }
}
