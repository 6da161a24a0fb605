//! Baseline estimate, ridge aggregation and the games-played blend.

use stat_store::{CumulativeRecord, Stat};
use std::collections::BTreeMap;

use crate::scoring::ScoringConfig;

/// Historical-average fantasy points per game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
    pub games_played: u32,
    /// `min(1, games / 10)`
    pub confidence: f64,
}

impl Baseline {
    pub fn new(mean: f64, std_dev: f64, games_played: u32) -> Self {
        Self { mean, std_dev, games_played, confidence: confidence_for_games(games_played) }
    }

    /// Per-game fantasy points from a cumulative record; `None` with zero
    /// games played
    pub fn from_record(record: &CumulativeRecord, scoring: &ScoringConfig) -> Option<Self> {
        if record.games_played == 0 {
            return None;
        }
        let games = f64::from(record.games_played);
        let mean: f64 =
            scoring.iter().map(|(stat, points)| record.stats.get(stat) / games * points).sum();
        let std_dev = if mean > 0.0 { mean * 0.4 } else { 5.0 };
        Some(Self::new(mean, std_dev, record.games_played))
    }
}

pub fn confidence_for_games(games_played: u32) -> f64 {
    (f64::from(games_played) / 10.0).min(1.0)
}

/// Ridge trust as a step function of games played this season
pub fn blend_weight(games_played: u32) -> f64 {
    match games_played {
        0..=2 => 0.4,
        3..=5 => 0.5,
        6..=8 => 0.6,
        _ => 0.7,
    }
}

/// Fantasy points implied by the per-stat forecasts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeEstimate {
    pub mean: f64,
    pub std_dev: f64,
}

impl RidgeEstimate {
    /// Sum of stat × points, with variance `Σ (std × points)²` assuming the
    /// stats are independent
    pub fn from_stats(
        predicted: &BTreeMap<Stat, f64>,
        std_devs: &BTreeMap<Stat, f64>,
        scoring: &ScoringConfig,
    ) -> Self {
        let mean = scoring.score_stats(predicted);
        let variance: f64 = std_devs
            .iter()
            .map(|(stat, std)| (std * scoring.points_for(*stat)).powi(2))
            .sum();
        Self { mean, std_dev: variance.sqrt() }
    }
}

/// Result of combining baseline and ridge estimates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blended {
    pub mean: f64,
    pub std_dev: f64,
    pub ridge_weight: f64,
}

/// Blend by games played, then inflate the std by `calibration`
pub fn blend(baseline: &Baseline, ridge: &RidgeEstimate, calibration: f64) -> Blended {
    let w = blend_weight(baseline.games_played);
    let mean = (1.0 - w) * baseline.mean + w * ridge.mean;
    let variance =
        (1.0 - w).powi(2) * baseline.std_dev.powi(2) + w.powi(2) * ridge.std_dev.powi(2);
    Blended { mean, std_dev: variance.sqrt() * calibration, ridge_weight: w }
}
