use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Fantasy roster position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    #[serde(alias = "DST")]
    DEF,
}

impl Position {
    /// Positions that get a ridge stat model
    pub const SKILL: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
        }
    }

    /// True for QB/RB/WR/TE
    pub fn is_skill(&self) -> bool {
        Self::SKILL.contains(self)
    }

    /// Eligible for a FLEX slot (RB/WR/TE)
    pub fn is_flex(&self) -> bool {
        matches!(self, Position::RB | Position::WR | Position::TE)
    }

    /// Eligible for a SUPERFLEX slot (QB plus FLEX positions)
    pub fn is_superflex(&self) -> bool {
        *self == Position::QB || self.is_flex()
    }

    /// Infer a position from stat patterns.
    ///
    /// Only a degraded fallback for records that arrive without a position tag.
    pub fn infer_from_stats(stats: &StatLine) -> Position {
        if stats.attempts > 0.0 {
            Position::QB
        } else if stats.carries > stats.receptions {
            Position::RB
        } else if stats.targets > 0.0 {
            if stats.receptions > 5.0 {
                Position::WR
            } else {
                Position::TE
            }
        } else {
            Position::WR
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Position {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" | "FB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "K" | "PK" => Ok(Position::K),
            "DEF" | "DST" | "D/ST" => Ok(Position::DEF),
            other => Err(StoreError::UnknownPosition(other.to_string())),
        }
    }
}

/// A named stat tracked by the enriched store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Attempts,
    Completions,
    PassingYards,
    PassingTds,
    #[serde(alias = "passing_interceptions")]
    Interceptions,
    SacksSuffered,
    PassingAirYards,
    PassingCpoe,
    PassingEpa,
    Carries,
    RushingYards,
    RushingTds,
    Targets,
    Receptions,
    ReceivingYards,
    ReceivingTds,
    ReceivingAirYards,
    ReceivingEpa,
    TargetShare,
    AirYardsShare,
    Wopr,
    FumblesLost,
    RzTouches,
    RzTds,
    GlTouches,
    GlTds,
    FgMade,
    FgMissed,
    XpMade,
    XpMissed,
}

impl Stat {
    pub const ALL: [Stat; 30] = [
        Stat::Attempts,
        Stat::Completions,
        Stat::PassingYards,
        Stat::PassingTds,
        Stat::Interceptions,
        Stat::SacksSuffered,
        Stat::PassingAirYards,
        Stat::PassingCpoe,
        Stat::PassingEpa,
        Stat::Carries,
        Stat::RushingYards,
        Stat::RushingTds,
        Stat::Targets,
        Stat::Receptions,
        Stat::ReceivingYards,
        Stat::ReceivingTds,
        Stat::ReceivingAirYards,
        Stat::ReceivingEpa,
        Stat::TargetShare,
        Stat::AirYardsShare,
        Stat::Wopr,
        Stat::FumblesLost,
        Stat::RzTouches,
        Stat::RzTds,
        Stat::GlTouches,
        Stat::GlTds,
        Stat::FgMade,
        Stat::FgMissed,
        Stat::XpMade,
        Stat::XpMissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Attempts => "attempts",
            Stat::Completions => "completions",
            Stat::PassingYards => "passing_yards",
            Stat::PassingTds => "passing_tds",
            Stat::Interceptions => "interceptions",
            Stat::SacksSuffered => "sacks_suffered",
            Stat::PassingAirYards => "passing_air_yards",
            Stat::PassingCpoe => "passing_cpoe",
            Stat::PassingEpa => "passing_epa",
            Stat::Carries => "carries",
            Stat::RushingYards => "rushing_yards",
            Stat::RushingTds => "rushing_tds",
            Stat::Targets => "targets",
            Stat::Receptions => "receptions",
            Stat::ReceivingYards => "receiving_yards",
            Stat::ReceivingTds => "receiving_tds",
            Stat::ReceivingAirYards => "receiving_air_yards",
            Stat::ReceivingEpa => "receiving_epa",
            Stat::TargetShare => "target_share",
            Stat::AirYardsShare => "air_yards_share",
            Stat::Wopr => "wopr",
            Stat::FumblesLost => "fumbles_lost",
            Stat::RzTouches => "rz_touches",
            Stat::RzTds => "rz_tds",
            Stat::GlTouches => "gl_touches",
            Stat::GlTds => "gl_tds",
            Stat::FgMade => "fg_made",
            Stat::FgMissed => "fg_missed",
            Stat::XpMade => "xp_made",
            Stat::XpMissed => "xp_missed",
        }
    }

    /// Look up a stat by its upstream name, accepting known aliases
    pub fn from_name(name: &str) -> Option<Stat> {
        if name == "passing_interceptions" {
            return Some(Stat::Interceptions);
        }
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Counting stats must never decrease week over week.
    ///
    /// Yardage, CPOE and EPA accumulate signed per-week values (a -4 yard
    /// rushing day is real) and are exempt.
    pub fn is_counting(&self) -> bool {
        !matches!(
            self,
            Stat::PassingYards
                | Stat::RushingYards
                | Stat::ReceivingYards
                | Stat::PassingAirYards
                | Stat::ReceivingAirYards
                | Stat::PassingCpoe
                | Stat::PassingEpa
                | Stat::ReceivingEpa
        )
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One value per [`Stat`]; used for both cumulative totals and single-week deltas.
///
/// Missing fields deserialize to 0.0 so upstream exports without advanced
/// metrics load cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatLine {
    pub attempts: f64,
    pub completions: f64,
    pub passing_yards: f64,
    pub passing_tds: f64,
    #[serde(alias = "passing_interceptions")]
    pub interceptions: f64,
    pub sacks_suffered: f64,
    pub passing_air_yards: f64,
    pub passing_cpoe: f64,
    pub passing_epa: f64,
    pub carries: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    pub targets: f64,
    pub receptions: f64,
    pub receiving_yards: f64,
    pub receiving_tds: f64,
    pub receiving_air_yards: f64,
    pub receiving_epa: f64,
    pub target_share: f64,
    pub air_yards_share: f64,
    pub wopr: f64,
    pub fumbles_lost: f64,
    pub rz_touches: f64,
    pub rz_tds: f64,
    pub gl_touches: f64,
    pub gl_tds: f64,
    pub fg_made: f64,
    pub fg_missed: f64,
    pub xp_made: f64,
    pub xp_missed: f64,
}

impl StatLine {
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Attempts => self.attempts,
            Stat::Completions => self.completions,
            Stat::PassingYards => self.passing_yards,
            Stat::PassingTds => self.passing_tds,
            Stat::Interceptions => self.interceptions,
            Stat::SacksSuffered => self.sacks_suffered,
            Stat::PassingAirYards => self.passing_air_yards,
            Stat::PassingCpoe => self.passing_cpoe,
            Stat::PassingEpa => self.passing_epa,
            Stat::Carries => self.carries,
            Stat::RushingYards => self.rushing_yards,
            Stat::RushingTds => self.rushing_tds,
            Stat::Targets => self.targets,
            Stat::Receptions => self.receptions,
            Stat::ReceivingYards => self.receiving_yards,
            Stat::ReceivingTds => self.receiving_tds,
            Stat::ReceivingAirYards => self.receiving_air_yards,
            Stat::ReceivingEpa => self.receiving_epa,
            Stat::TargetShare => self.target_share,
            Stat::AirYardsShare => self.air_yards_share,
            Stat::Wopr => self.wopr,
            Stat::FumblesLost => self.fumbles_lost,
            Stat::RzTouches => self.rz_touches,
            Stat::RzTds => self.rz_tds,
            Stat::GlTouches => self.gl_touches,
            Stat::GlTds => self.gl_tds,
            Stat::FgMade => self.fg_made,
            Stat::FgMissed => self.fg_missed,
            Stat::XpMade => self.xp_made,
            Stat::XpMissed => self.xp_missed,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut f64 {
        match stat {
            Stat::Attempts => &mut self.attempts,
            Stat::Completions => &mut self.completions,
            Stat::PassingYards => &mut self.passing_yards,
            Stat::PassingTds => &mut self.passing_tds,
            Stat::Interceptions => &mut self.interceptions,
            Stat::SacksSuffered => &mut self.sacks_suffered,
            Stat::PassingAirYards => &mut self.passing_air_yards,
            Stat::PassingCpoe => &mut self.passing_cpoe,
            Stat::PassingEpa => &mut self.passing_epa,
            Stat::Carries => &mut self.carries,
            Stat::RushingYards => &mut self.rushing_yards,
            Stat::RushingTds => &mut self.rushing_tds,
            Stat::Targets => &mut self.targets,
            Stat::Receptions => &mut self.receptions,
            Stat::ReceivingYards => &mut self.receiving_yards,
            Stat::ReceivingTds => &mut self.receiving_tds,
            Stat::ReceivingAirYards => &mut self.receiving_air_yards,
            Stat::ReceivingEpa => &mut self.receiving_epa,
            Stat::TargetShare => &mut self.target_share,
            Stat::AirYardsShare => &mut self.air_yards_share,
            Stat::Wopr => &mut self.wopr,
            Stat::FumblesLost => &mut self.fumbles_lost,
            Stat::RzTouches => &mut self.rz_touches,
            Stat::RzTds => &mut self.rz_tds,
            Stat::GlTouches => &mut self.gl_touches,
            Stat::GlTds => &mut self.gl_tds,
            Stat::FgMade => &mut self.fg_made,
            Stat::FgMissed => &mut self.fg_missed,
            Stat::XpMade => &mut self.xp_made,
            Stat::XpMissed => &mut self.xp_missed,
        }
    }

    pub fn set(&mut self, stat: Stat, value: f64) {
        *self.get_mut(stat) = value;
    }

    /// Element-wise `self - prev`: the production between two cumulative snapshots
    pub fn delta(&self, prev: &StatLine) -> StatLine {
        let mut out = StatLine::default();
        for stat in Stat::ALL {
            out.set(stat, self.get(stat) - prev.get(stat));
        }
        out
    }

    /// Element-wise accumulate `week` into `self`
    pub fn accumulate(&mut self, week: &StatLine) {
        for stat in Stat::ALL {
            *self.get_mut(stat) += week.get(stat);
        }
    }

    /// Iterate `(stat, value)` pairs with a non-zero value
    pub fn non_zero(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        Stat::ALL.iter().map(move |s| (*s, self.get(*s))).filter(|(_, v)| *v != 0.0)
    }
}
