use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::StoreError;
use crate::types::Position;

/// League-average fantasy points allowed per game when a team has no entry
const LEAGUE_QB_PPG: f64 = 17.0;
const LEAGUE_RB_PPG: f64 = 15.0;
const LEAGUE_WR_PPG: f64 = 20.0;
const LEAGUE_TE_PPG: f64 = 8.0;
const LEAGUE_OTHER_PPG: f64 = 15.0;

fn default_qb_ppg() -> f64 {
    LEAGUE_QB_PPG
}

fn default_rb_ppg() -> f64 {
    LEAGUE_RB_PPG
}

fn default_wr_ppg() -> f64 {
    LEAGUE_WR_PPG
}

fn default_te_ppg() -> f64 {
    LEAGUE_TE_PPG
}

/// Average fantasy points a defense allows per game to each skill position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefenseStrength {
    #[serde(default = "default_qb_ppg")]
    pub qb_ppg: f64,
    #[serde(default = "default_rb_ppg")]
    pub rb_ppg: f64,
    #[serde(default = "default_wr_ppg")]
    pub wr_ppg: f64,
    #[serde(default = "default_te_ppg")]
    pub te_ppg: f64,
}

impl Default for DefenseStrength {
    fn default() -> Self {
        Self {
            qb_ppg: LEAGUE_QB_PPG,
            rb_ppg: LEAGUE_RB_PPG,
            wr_ppg: LEAGUE_WR_PPG,
            te_ppg: LEAGUE_TE_PPG,
        }
    }
}

impl DefenseStrength {
    pub fn ppg_for(&self, position: Position) -> f64 {
        match position {
            Position::QB => self.qb_ppg,
            Position::RB => self.rb_ppg,
            Position::WR => self.wr_ppg,
            Position::TE => self.te_ppg,
            Position::K | Position::DEF => LEAGUE_OTHER_PPG,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DefenseFile {
    #[serde(default)]
    defenses: Vec<DefenseEntry>,
}

#[derive(Debug, Deserialize)]
struct DefenseEntry {
    team: String,
    #[serde(flatten)]
    strength: DefenseStrength,
}

/// Team → defensive strength lookup
#[derive(Debug, Clone, Default)]
pub struct DefenseTable {
    teams: HashMap<String, DefenseStrength>,
}

impl DefenseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, StoreError> {
        info!("Loading defense stats from: {:?}", file_path.as_ref());
        let json_content = tokio::fs::read_to_string(&file_path).await?;
        Self::from_json_str(&json_content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let file: DefenseFile = serde_json::from_str(json)?;
        let mut table = Self::new();
        for entry in file.defenses {
            table.insert(entry.team, entry.strength);
        }
        info!("Loaded defensive stats for {} teams", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, team: impl Into<String>, strength: DefenseStrength) {
        self.teams.insert(team.into(), strength);
    }

    pub fn get(&self, team: &str) -> Option<&DefenseStrength> {
        self.teams.get(team)
    }

    /// Points per game allowed by `opponent` to `position`.
    ///
    /// Unknown or missing opponents get the league-average default.
    pub fn ppg_allowed(&self, opponent: Option<&str>, position: Position) -> f64 {
        opponent
            .and_then(|team| self.teams.get(team))
            .copied()
            .unwrap_or_default()
            .ppg_for(position)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
