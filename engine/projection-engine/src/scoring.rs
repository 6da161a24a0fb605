use serde::{Deserialize, Serialize};
use stat_store::{Stat, StatLine};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ConfigError;

/// Fantasy scoring rules: points awarded per unit of each stat.
///
/// Stats absent from the table score zero. Serialized as a flat
/// `stat name -> points` map; `passing_interceptions` is accepted as an alias
/// for `interceptions` and unknown names are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ScoringConfig {
    points: BTreeMap<Stat, f64>,
}

impl ScoringConfig {
    /// Empty table; every stat scores zero
    pub fn empty() -> Self {
        Self { points: BTreeMap::new() }
    }

    fn with_receptions(receptions: f64) -> Self {
        let mut config = Self::empty();
        config
            .set(Stat::PassingYards, 0.04)
            .set(Stat::PassingTds, 4.0)
            .set(Stat::Interceptions, -2.0)
            .set(Stat::RushingYards, 0.1)
            .set(Stat::RushingTds, 6.0)
            .set(Stat::Receptions, receptions)
            .set(Stat::ReceivingYards, 0.1)
            .set(Stat::ReceivingTds, 6.0)
            .set(Stat::FumblesLost, -2.0)
            .set(Stat::FgMade, 3.0)
            .set(Stat::XpMade, 1.0)
            .set(Stat::FgMissed, -1.0)
            .set(Stat::XpMissed, -1.0);
        config
    }

    pub fn standard() -> Self {
        Self::with_receptions(0.0)
    }

    pub fn half_ppr() -> Self {
        Self::with_receptions(0.5)
    }

    pub fn ppr() -> Self {
        Self::with_receptions(1.0)
    }

    /// Look up a named preset (`standard`, `half_ppr`, `ppr`)
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" | "std" => Ok(Self::standard()),
            "half_ppr" | "half" => Ok(Self::half_ppr()),
            "ppr" | "full_ppr" => Ok(Self::ppr()),
            _ => Err(ConfigError::UnknownScoringPreset(name.to_string())),
        }
    }

    pub fn set(&mut self, stat: Stat, points: f64) -> &mut Self {
        self.points.insert(stat, points);
        self
    }

    pub fn points_for(&self, stat: Stat) -> f64 {
        self.points.get(&stat).copied().unwrap_or(0.0)
    }

    /// Points for an upstream stat name; unknown names score zero
    pub fn points_for_name(&self, name: &str) -> f64 {
        Stat::from_name(name).map(|stat| self.points_for(stat)).unwrap_or(0.0)
    }

    /// True when the table awards (or deducts) points for `stat`
    pub fn scores(&self, stat: Stat) -> bool {
        self.points.contains_key(&stat)
    }

    /// Fantasy points for a full stat line
    pub fn score(&self, line: &StatLine) -> f64 {
        self.points.iter().map(|(stat, points)| line.get(*stat) * points).sum()
    }

    /// Fantasy points for a sparse set of stat values
    pub fn score_stats<'a, I>(&self, stats: I) -> f64
    where
        I: IntoIterator<Item = (&'a Stat, &'a f64)>,
    {
        stats.into_iter().map(|(stat, value)| value * self.points_for(*stat)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        self.points.iter().map(|(stat, points)| (*stat, *points))
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::ppr()
    }
}

impl From<BTreeMap<String, f64>> for ScoringConfig {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let mut config = Self::empty();
        for (name, points) in raw {
            match Stat::from_name(&name) {
                Some(stat) => {
                    config.set(stat, points);
                }
                None => warn!("Ignoring unknown scoring key '{}'", name),
            }
        }
        config
    }
}

impl From<ScoringConfig> for BTreeMap<String, f64> {
    fn from(config: ScoringConfig) -> Self {
        config.points.into_iter().map(|(stat, points)| (stat.as_str().to_string(), points)).collect()
    }
}
