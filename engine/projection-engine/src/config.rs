use serde::{Deserialize, Serialize};
use stat_store::{Position, Season, Stat, Week};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;
use crate::scoring::ScoringConfig;

/// Configuration for the projection engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Input data locations
    pub data: DataConfig,

    /// Model training and calibration parameters
    pub model: ModelConfig,

    /// League scoring rules
    pub scoring: ScoringSection,

    /// Monte Carlo settings for matchup and playoff simulation
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Enriched cumulative stats export
    pub stats_path: PathBuf,

    /// Defensive points-allowed table; league averages are used when absent
    pub defense_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            stats_path: PathBuf::from("output/enriched_player_stats.json"),
            defense_path: Some(PathBuf::from("output/defense_stats.json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Season being predicted
    pub season: Season,

    /// Seasons used for training; defaults to the prior and current season
    pub training_seasons: Option<Vec<Season>>,

    /// Week used when a caller does not name one
    pub default_week: Week,

    /// Recency decay per week; 1.0 disables decay
    pub recency_decay: f64,

    /// Ridge regularization strength keyed by position then stat name;
    /// entries given in a file are merged over the built-in table
    #[serde(deserialize_with = "merge_ridge_alpha")]
    pub ridge_alpha: HashMap<String, HashMap<String, f64>>,

    pub ridge_alpha_default: f64,

    /// Std-dev inflation applied after blending, keyed by position
    #[serde(deserialize_with = "merge_calibration")]
    pub calibration: HashMap<String, f64>,

    pub calibration_default: f64,

    /// Student-t degrees of freedom keyed by position
    #[serde(deserialize_with = "merge_dist_df")]
    pub dist_df: HashMap<String, f64>,

    pub dist_df_default: f64,

    pub kicker: KickerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KickerConfig {
    pub std_multiplier: f64,
    pub confidence_multiplier: f64,
    pub df: f64,
}

impl Default for KickerConfig {
    fn default() -> Self {
        Self { std_multiplier: 1.3, confidence_multiplier: 0.7, df: 4.0 }
    }
}

fn alpha_table(entries: &[(Stat, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(stat, alpha)| (stat.as_str().to_string(), *alpha)).collect()
}

fn default_ridge_alpha() -> HashMap<String, HashMap<String, f64>> {
    let mut ridge_alpha = HashMap::new();
    ridge_alpha.insert(
        "QB".to_string(),
        alpha_table(&[
            (Stat::PassingYards, 5.0),
            (Stat::PassingTds, 8.0),
            (Stat::Interceptions, 10.0),
            (Stat::RushingYards, 7.0),
            (Stat::RushingTds, 10.0),
        ]),
    );
    ridge_alpha.insert(
        "RB".to_string(),
        alpha_table(&[
            (Stat::RushingYards, 5.0),
            (Stat::RushingTds, 8.0),
            (Stat::Receptions, 7.0),
            (Stat::ReceivingYards, 7.0),
            (Stat::ReceivingTds, 10.0),
        ]),
    );
    ridge_alpha.insert(
        "WR".to_string(),
        alpha_table(&[
            (Stat::Receptions, 5.0),
            (Stat::ReceivingYards, 5.0),
            (Stat::ReceivingTds, 8.0),
            (Stat::RushingYards, 10.0),
            (Stat::RushingTds, 15.0),
        ]),
    );
    ridge_alpha.insert(
        "TE".to_string(),
        alpha_table(&[
            (Stat::Receptions, 5.0),
            (Stat::ReceivingYards, 5.0),
            (Stat::ReceivingTds, 8.0),
        ]),
    );

    ridge_alpha
}

fn default_calibration() -> HashMap<String, f64> {
    let mut calibration = HashMap::new();
    calibration.insert("QB".to_string(), 1.60);
    calibration.insert("RB".to_string(), 1.45);
    calibration.insert("WR".to_string(), 1.35);
    calibration.insert("TE".to_string(), 1.30);

    calibration
}

fn default_dist_df() -> HashMap<String, f64> {
    let mut dist_df = HashMap::new();
    dist_df.insert("QB".to_string(), 6.0);
    dist_df.insert("RB".to_string(), 4.2);
    dist_df.insert("WR".to_string(), 3.8);
    dist_df.insert("TE".to_string(), 3.8);

    dist_df
}

fn merge_ridge_alpha<'de, D>(deserializer: D) -> Result<HashMap<String, HashMap<String, f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = HashMap::<String, HashMap<String, f64>>::deserialize(deserializer)?;
    let mut merged = default_ridge_alpha();
    for (position, stats) in overrides {
        merged.entry(position).or_default().extend(stats);
    }
    Ok(merged)
}

fn merge_calibration<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut merged = default_calibration();
    merged.extend(HashMap::<String, f64>::deserialize(deserializer)?);
    Ok(merged)
}

fn merge_dist_df<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut merged = default_dist_df();
    merged.extend(HashMap::<String, f64>::deserialize(deserializer)?);
    Ok(merged)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            season: 2025,
            training_seasons: None,
            default_week: 15,
            recency_decay: 1.0,
            ridge_alpha: default_ridge_alpha(),
            ridge_alpha_default: 15.0,
            calibration: default_calibration(),
            calibration_default: 1.40,
            dist_df: default_dist_df(),
            dist_df_default: 6.0,
            kicker: KickerConfig::default(),
        }
    }
}

impl ModelConfig {
    pub fn training_seasons(&self) -> Vec<Season> {
        match &self.training_seasons {
            Some(seasons) if !seasons.is_empty() => seasons.clone(),
            _ => vec![self.season.saturating_sub(1), self.season],
        }
    }

    pub fn ridge_alpha_for(&self, position: Position, stat: Stat) -> f64 {
        self.ridge_alpha
            .get(position.as_str())
            .and_then(|stats| stats.get(stat.as_str()))
            .copied()
            .unwrap_or(self.ridge_alpha_default)
    }

    pub fn calibration_for_position(&self, position: Position) -> f64 {
        self.calibration.get(position.as_str()).copied().unwrap_or(self.calibration_default)
    }

    pub fn dist_df_for_position(&self, position: Position) -> f64 {
        self.dist_df.get(position.as_str()).copied().unwrap_or(self.dist_df_default)
    }
}

/// Scoring is either a named preset or an explicit points table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub preset: Option<String>,
    pub points: Option<ScoringConfig>,
}

impl ScoringSection {
    /// Explicit points win over a preset; PPR when neither is given
    pub fn resolve(&self) -> Result<ScoringConfig, ConfigError> {
        match (&self.points, &self.preset) {
            (Some(points), _) => Ok(points.clone()),
            (None, Some(preset)) => ScoringConfig::preset(preset),
            (None, None) => Ok(ScoringConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Monte Carlo trials per matchup or bracket run
    pub simulations: usize,

    /// Student-t degrees of freedom for team and player score draws
    pub df: f64,

    /// Std-dev used when a supplied std is zero or negative
    pub std_floor: f64,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { simulations: 10_000, df: 6.0, std_floor: 5.0, seed: None }
    }
}

impl ProjectionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        info!("Loading projection config from: {:?}", path.as_ref());
        let content = std::fs::read_to_string(path)?;
        let mut config: ProjectionConfig = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(season) = std::env::var("PROJECTION_SEASON") {
            self.model.season = season.parse().unwrap_or(self.model.season);
        }

        if let Ok(week) = std::env::var("PROJECTION_WEEK") {
            self.model.default_week = week.parse().unwrap_or(self.model.default_week);
        }

        if let Ok(path) = std::env::var("PROJECTION_STATS_PATH") {
            self.data.stats_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("PROJECTION_DEFENSE_PATH") {
            self.data.defense_path = Some(PathBuf::from(path));
        }

        if let Ok(preset) = std::env::var("PROJECTION_SCORING") {
            self.scoring.preset = Some(preset);
            self.scoring.points = None;
        }

        if let Ok(simulations) = std::env::var("PROJECTION_SIMULATIONS") {
            self.simulation.simulations = simulations.parse().unwrap_or(self.simulation.simulations);
        }

        if let Ok(seed) = std::env::var("PROJECTION_SEED") {
            self.simulation.seed = seed.parse().ok();
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.default_week == 0 {
            return Err(ConfigError::Invalid("default_week must be at least 1".to_string()));
        }
        if !(self.model.recency_decay > 0.0 && self.model.recency_decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "recency_decay must be in (0, 1], got {}",
                self.model.recency_decay
            )));
        }
        if self.simulation.simulations == 0 {
            return Err(ConfigError::Invalid("simulations must be positive".to_string()));
        }
        if self.simulation.std_floor <= 0.0 {
            return Err(ConfigError::Invalid("std_floor must be positive".to_string()));
        }
        self.scoring.resolve()?;
        Ok(())
    }
}
