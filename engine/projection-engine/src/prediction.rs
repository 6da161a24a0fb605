use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use stat_store::{PlayerId, Position, Stat, Week};
use std::collections::BTreeMap;

use crate::distribution::{BoomMixture, PointDistribution};
use crate::scoring::ScoringConfig;

/// Projection for one player in one target week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPrediction {
    pub player_id: PlayerId,
    pub name: Option<String>,
    pub position: Position,
    pub team: String,
    pub target_week: Week,
    pub opponent: Option<String>,

    /// Predicted single-week stat line (empty for kickers)
    pub predicted_stats: BTreeMap<Stat, f64>,
    pub stat_std_devs: BTreeMap<Stat, f64>,

    /// Fantasy points
    pub mean: f64,
    pub std_dev: f64,

    pub games_played: u32,
    pub confidence: f64,

    // Provenance
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub ridge_mean: Option<f64>,
    pub ridge_weight: f64,

    pub dist_df: Option<f64>,
    #[serde(default)]
    pub boom: BoomMixture,
}

impl PlayerPrediction {
    pub fn with_boom(mut self, boom: BoomMixture) -> Self {
        self.boom = boom;
        self
    }

    pub fn distribution(&self) -> PointDistribution {
        PointDistribution::new(self.mean, self.std_dev, self.dist_df).with_boom(self.boom)
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.distribution().cdf(x)
    }

    pub fn probability_above(&self, threshold: f64) -> f64 {
        self.distribution().probability_above(threshold)
    }

    /// Score at probability `p` in (0, 1)
    pub fn percentile(&self, p: f64) -> f64 {
        self.distribution().percentile(p)
    }

    /// Rescore the predicted stat line under another league's rules
    pub fn fantasy_points_under(&self, scoring: &ScoringConfig) -> f64 {
        scoring.score_stats(&self.predicted_stats)
    }

    /// Draw `n` fantasy-point outcomes.
    ///
    /// With a scoring config each stat component is drawn from
    /// `Normal(mean, std)` clamped at zero and the line is rescored, so a
    /// different league's points apply without refitting. Without one (or
    /// when there is no stat line, as for kickers) the aggregate distribution
    /// is sampled.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        scoring: Option<&ScoringConfig>,
        rng: &mut R,
    ) -> Vec<f64> {
        match scoring {
            Some(scoring) if !self.predicted_stats.is_empty() => {
                (0..n).map(|_| self.sample_stat_line(scoring, rng)).collect()
            }
            _ => self.distribution().sample(n, rng),
        }
    }

    fn sample_stat_line<R: Rng + ?Sized>(&self, scoring: &ScoringConfig, rng: &mut R) -> f64 {
        self.predicted_stats
            .iter()
            .map(|(stat, mean)| {
                let std = self.stat_std_devs.get(stat).copied().unwrap_or(mean * 0.5);
                let value = match Normal::new(*mean, std) {
                    Ok(normal) if std > 0.0 => normal.sample(rng),
                    _ => *mean,
                };
                value.max(0.0) * scoring.points_for(*stat)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_prediction() -> PlayerPrediction {
        PlayerPrediction {
            player_id: "wr1".to_string(),
            name: Some("Test Receiver".to_string()),
            position: Position::WR,
            team: "MIN".to_string(),
            target_week: 8,
            opponent: Some("GB".to_string()),
            predicted_stats: BTreeMap::from([
                (Stat::Receptions, 6.0),
                (Stat::ReceivingYards, 80.0),
                (Stat::ReceivingTds, 0.5),
            ]),
            stat_std_devs: BTreeMap::from([
                (Stat::Receptions, 2.0),
                (Stat::ReceivingYards, 25.0),
                (Stat::ReceivingTds, 0.6),
            ]),
            mean: 17.0,
            std_dev: 6.0,
            games_played: 7,
            confidence: 0.7,
            baseline_mean: 16.0,
            baseline_std: 6.4,
            ridge_mean: Some(17.0),
            ridge_weight: 0.6,
            dist_df: Some(3.8),
            boom: BoomMixture::default(),
        }
    }

    #[test]
    fn test_fantasy_points_under_rescoring() {
        let prediction = create_test_prediction();
        let ppr = prediction.fantasy_points_under(&ScoringConfig::ppr());
        let standard = prediction.fantasy_points_under(&ScoringConfig::standard());
        assert!((ppr - 17.0).abs() < 1e-9);
        assert!((ppr - standard - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_stat_line_sampling_tracks_scoring() {
        let prediction = create_test_prediction();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let samples = prediction.sample(5_000, Some(&ScoringConfig::half_ppr()), &mut rng);
        assert!(samples.iter().all(|x| *x >= 0.0));
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        // Clamping at zero lifts the TD component slightly
        assert!((mean - 14.0).abs() < 1.0, "{mean}");
    }

    #[test]
    fn test_aggregate_sampling_without_scoring() {
        let prediction = create_test_prediction();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let samples = prediction.sample(2_000, None, &mut rng);
        assert_eq!(samples.len(), 2_000);
        assert!(samples.iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn test_empty_stat_line_falls_back_to_aggregate() {
        let mut prediction = create_test_prediction();
        prediction.predicted_stats.clear();
        prediction.stat_std_devs.clear();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let samples = prediction.sample(1_000, Some(&ScoringConfig::ppr()), &mut rng);
        assert!(samples.iter().any(|x| *x > 0.0));
    }

    #[test]
    fn test_json_round_trip_keeps_stat_keys() {
        let prediction = create_test_prediction();
        let json = serde_json::to_string(&prediction).unwrap();
        assert!(json.contains("\"receiving_yards\":80.0"));
        let back: PlayerPrediction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prediction);
    }
}
