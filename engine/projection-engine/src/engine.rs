use rayon::prelude::*;
use stat_store::{CumulativeRecord, DefenseTable, PlayerSeason, Position, Stat, StatStore, Week};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::blend::{blend, Baseline, RidgeEstimate};
use crate::config::{ModelConfig, ProjectionConfig};
use crate::error::ConfigError;
use crate::features::{build_features, FeatureInput};
use crate::models::{stat_components, StatModels};
use crate::prediction::PlayerPrediction;
use crate::scoring::ScoringConfig;

/// Owns the stat store, defense table, scoring rules and fitted models for
/// one season.
///
/// Instances are independent, so one engine per scoring system can run side
/// by side over the same shared store.
#[derive(Debug)]
pub struct ProjectionEngine {
    store: Arc<StatStore>,
    defense: Arc<DefenseTable>,
    config: ModelConfig,
    scoring: ScoringConfig,
    models: StatModels,
}

impl ProjectionEngine {
    pub fn new(
        store: Arc<StatStore>,
        defense: Arc<DefenseTable>,
        config: ModelConfig,
        scoring: ScoringConfig,
    ) -> Self {
        let models = StatModels::new(Arc::clone(&store), Arc::clone(&defense), config.clone());
        info!(
            "Projection engine for season {} (training seasons {:?})",
            config.season,
            config.training_seasons()
        );
        Self { store, defense, config, scoring, models }
    }

    pub fn from_config(
        store: Arc<StatStore>,
        defense: Arc<DefenseTable>,
        config: &ProjectionConfig,
    ) -> Result<Self, ConfigError> {
        let scoring = config.scoring.resolve()?;
        Ok(Self::new(store, defense, config.model.clone(), scoring))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn store(&self) -> &StatStore {
        &self.store
    }

    pub fn models(&self) -> &StatModels {
        &self.models
    }

    /// Fit every stat model now instead of on first use
    pub fn warm_up(&self) -> usize {
        self.models.warm_up()
    }

    /// Projection for `player_id` in `target_week` of the configured season.
    ///
    /// Uses the cumulative record through `target_week - 1`, falling back to
    /// the latest earlier week. `None` when the player has no record or has
    /// not played a game. The opponent defaults to the one stored on that
    /// record.
    pub fn predict_player_for_week(
        &self,
        player_id: &str,
        target_week: Week,
        opponent: Option<&str>,
    ) -> Option<PlayerPrediction> {
        let player = self.store.player(self.config.season, player_id)?;
        let record = player.through(target_week.saturating_sub(1))?;
        let baseline = Baseline::from_record(record, &self.scoring)?;
        let position = player.resolved_position(record);
        let opponent = opponent.map(str::to_string).or_else(|| record.opponent.clone());

        let prediction = match position {
            Position::K => self.kicker_prediction(player, record, &baseline, target_week, opponent),
            Position::DEF => {
                self.baseline_prediction(player, record, position, &baseline, target_week, opponent)
            }
            _ => self.ridge_prediction(player, record, position, &baseline, target_week, opponent),
        };
        Some(prediction)
    }

    /// Projection for the configured default week when `week` is `None`
    pub fn predict_player(&self, player_id: &str, week: Option<Week>) -> Option<PlayerPrediction> {
        self.predict_player_for_week(player_id, week.unwrap_or(self.config.default_week), None)
    }

    /// Projections for every player in the season, ordered by player id
    pub fn predict_all(&self, week: Week) -> Vec<PlayerPrediction> {
        let mut ids: Vec<&str> =
            self.store.players(self.config.season).map(|p| p.player_id.as_str()).collect();
        ids.sort_unstable();

        let predictions: Vec<PlayerPrediction> = ids
            .par_iter()
            .filter_map(|id| self.predict_player_for_week(id, week, None))
            .collect();
        info!("Predicted {}/{} players for week {}", predictions.len(), ids.len(), week);
        predictions
    }

    fn ridge_prediction(
        &self,
        player: &PlayerSeason,
        record: &CumulativeRecord,
        position: Position,
        baseline: &Baseline,
        target_week: Week,
        opponent: Option<String>,
    ) -> PlayerPrediction {
        let prior_week = target_week.saturating_sub(1);
        let last_week = player.weekly_delta(prior_week);
        let opponent_ppg = self.defense.ppg_allowed(opponent.as_deref(), position);
        let features = build_features(&FeatureInput {
            position,
            cumulative: &record.stats,
            games_played: record.games_played,
            last_week: last_week.as_ref(),
            opponent_ppg,
            target_week,
        });

        let mut predicted_stats = BTreeMap::new();
        let mut stat_std_devs = BTreeMap::new();
        for &stat in stat_components(position) {
            let fitted = features.as_ref().and_then(|features| {
                let model = self.models.get(position, stat)?;
                let value = model.predict_features(features)?;
                Some((value.max(0.0), model.residual_std))
            });
            let (mean, std) = match fitted {
                Some(estimate) => estimate,
                None => {
                    debug!("Per-game fallback for {} {} ({})", player.player_id, stat, position);
                    per_game_fallback(record, stat)
                }
            };
            predicted_stats.insert(stat, mean);
            stat_std_devs.insert(stat, std);
        }

        let ridge = RidgeEstimate::from_stats(&predicted_stats, &stat_std_devs, &self.scoring);
        let blended = blend(baseline, &ridge, self.config.calibration_for_position(position));

        PlayerPrediction {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            position,
            team: record.team.clone(),
            target_week,
            opponent,
            predicted_stats,
            stat_std_devs,
            mean: blended.mean,
            std_dev: blended.std_dev,
            games_played: baseline.games_played,
            confidence: baseline.confidence,
            baseline_mean: baseline.mean,
            baseline_std: baseline.std_dev,
            ridge_mean: Some(ridge.mean),
            ridge_weight: blended.ridge_weight,
            dist_df: Some(self.config.dist_df_for_position(position)),
            boom: Default::default(),
        }
    }

    /// Kickers are too event-driven for the stat models: baseline only with
    /// wider spread, lower confidence and heavier tails
    fn kicker_prediction(
        &self,
        player: &PlayerSeason,
        record: &CumulativeRecord,
        baseline: &Baseline,
        target_week: Week,
        opponent: Option<String>,
    ) -> PlayerPrediction {
        let kicker = &self.config.kicker;
        let mut prediction =
            self.baseline_prediction(player, record, Position::K, baseline, target_week, opponent);
        prediction.std_dev = baseline.std_dev * kicker.std_multiplier;
        prediction.confidence = baseline.confidence * kicker.confidence_multiplier;
        prediction.dist_df = Some(kicker.df);
        prediction
    }

    fn baseline_prediction(
        &self,
        player: &PlayerSeason,
        record: &CumulativeRecord,
        position: Position,
        baseline: &Baseline,
        target_week: Week,
        opponent: Option<String>,
    ) -> PlayerPrediction {
        PlayerPrediction {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            position,
            team: record.team.clone(),
            target_week,
            opponent,
            predicted_stats: BTreeMap::new(),
            stat_std_devs: BTreeMap::new(),
            mean: baseline.mean,
            std_dev: baseline.std_dev,
            games_played: baseline.games_played,
            confidence: baseline.confidence,
            baseline_mean: baseline.mean,
            baseline_std: baseline.std_dev,
            ridge_mean: None,
            ridge_weight: 0.0,
            dist_df: Some(self.config.dist_df_for_position(position)),
            boom: Default::default(),
        }
    }
}

/// Per-game average with a 60% std; mean 0 and std 1 with no games
fn per_game_fallback(record: &CumulativeRecord, stat: Stat) -> (f64, f64) {
    if record.games_played == 0 {
        return (0.0, 1.0);
    }
    let mean = record.stats.get(stat) / f64::from(record.games_played);
    (mean, mean * 0.6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stat_store::{DefenseStrength, StatLine, StatStoreBuilder, WeeklyLine};

    fn qb_line(week: Week, opponent: &str) -> WeeklyLine {
        WeeklyLine {
            week,
            team: "BAL".to_string(),
            opponent: Some(opponent.to_string()),
            stats: StatLine {
                attempts: 30.0,
                completions: 20.0,
                passing_yards: 240.0,
                passing_tds: 2.0,
                interceptions: if week == 2 { 2.0 } else { 0.0 },
                ..Default::default()
            },
        }
    }

    /// One QB with weeks 1-3, plus a kicker and a player who never played
    fn create_test_store() -> StatStore {
        let mut builder = StatStoreBuilder::new();
        builder.player(2025, "qb1", Some("Test Quarterback"), Some(Position::QB));
        for (week, opponent) in [(1u8, "BUF"), (2, "CLE"), (3, "KC")] {
            builder.add_week(2025, "qb1", qb_line(week, opponent)).unwrap();
        }

        builder.player(2025, "k1", Some("Test Kicker"), Some(Position::K));
        for week in 1..=4u8 {
            builder
                .add_week(
                    2025,
                    "k1",
                    WeeklyLine {
                        week,
                        team: "BAL".to_string(),
                        opponent: None,
                        stats: StatLine { fg_made: 2.0, xp_made: 2.0, ..Default::default() },
                    },
                )
                .unwrap();
        }
        builder.build().unwrap()
    }

    fn create_test_engine() -> ProjectionEngine {
        let mut defense = DefenseTable::new();
        defense.insert("KC", DefenseStrength { qb_ppg: 22.0, ..Default::default() });
        ProjectionEngine::new(
            Arc::new(create_test_store()),
            Arc::new(defense),
            ModelConfig::default(),
            ScoringConfig::ppr(),
        )
    }

    #[test]
    fn test_qb_prediction_blends_baseline_and_ridge() {
        let engine = create_test_engine();
        let prediction = engine.predict_player_for_week("qb1", 4, None).unwrap();

        // 720 yards, 6 TDs, 2 INTs over 3 games
        let baseline = 720.0 / 3.0 * 0.04 + 6.0 / 3.0 * 4.0 + 2.0 / 3.0 * -2.0;
        assert!((prediction.baseline_mean - baseline).abs() < 1e-9);
        assert_eq!(prediction.games_played, 3);
        assert_eq!(prediction.ridge_weight, 0.5);
        assert_eq!(prediction.opponent.as_deref(), Some("KC"));
        assert_eq!(prediction.dist_df, Some(6.0));

        let ridge = prediction.ridge_mean.unwrap();
        let expected = 0.5 * prediction.baseline_mean + 0.5 * ridge;
        assert!((prediction.mean - expected).abs() < 1e-9);
        assert_eq!(prediction.predicted_stats.len(), 6);
        assert!(prediction.predicted_stats.values().all(|v| *v >= 0.0));
        assert!(prediction.std_dev > 0.0);
    }

    #[test]
    fn test_caller_opponent_overrides_record() {
        let engine = create_test_engine();
        let against_kc = engine.predict_player_for_week("qb1", 4, None).unwrap();
        let against_mia = engine.predict_player_for_week("qb1", 4, Some("MIA")).unwrap();
        assert_eq!(against_mia.opponent.as_deref(), Some("MIA"));
        assert_eq!(against_kc.baseline_mean, against_mia.baseline_mean);
    }

    #[test]
    fn test_per_game_fallback() {
        let engine = create_test_engine();
        let record = engine.store().cumulative_through(2025, "qb1", 3).unwrap();
        let (mean, std) = per_game_fallback(record, Stat::PassingYards);
        assert!((mean - 240.0).abs() < 1e-9);
        assert!((std - 144.0).abs() < 1e-9);

        let empty = CumulativeRecord { games_played: 0, ..record.clone() };
        assert_eq!(per_game_fallback(&empty, Stat::PassingYards), (0.0, 1.0));
    }

    #[test]
    fn test_mismatched_model_falls_back_per_stat() {
        let reference = create_test_engine();
        let fitted = reference.models().get(Position::QB, Stat::PassingYards).unwrap();
        let td_model = reference.models().get(Position::QB, Stat::PassingTds).unwrap();

        let mut stale = (*fitted).clone();
        stale.feature_names.swap(0, 1);
        let engine = create_test_engine();
        assert!(engine.models().install(Position::QB, Stat::PassingYards, stale));

        let prediction = engine.predict_player_for_week("qb1", 4, None).unwrap();
        let yards = prediction.predicted_stats[&Stat::PassingYards];
        let yards_std = prediction.stat_std_devs[&Stat::PassingYards];
        assert!((yards - 240.0).abs() < 1e-9);
        assert!((yards_std - 144.0).abs() < 1e-9);

        // Other stats keep their ridge estimates
        let td_std = prediction.stat_std_devs[&Stat::PassingTds];
        assert!((td_std - td_model.residual_std).abs() < 1e-12);
        assert!(prediction.ridge_mean.is_some());
    }

    #[test]
    fn test_kicker_uses_scaled_baseline() {
        let engine = create_test_engine();
        let prediction = engine.predict_player_for_week("k1", 5, None).unwrap();

        // 2 FG and 2 XP per game
        assert!((prediction.mean - 8.0).abs() < 1e-9);
        assert!((prediction.baseline_std - 3.2).abs() < 1e-9);
        assert!((prediction.std_dev - 3.2 * 1.3).abs() < 1e-9);
        assert!((prediction.confidence - 0.4 * 0.7).abs() < 1e-9);
        assert_eq!(prediction.dist_df, Some(4.0));
        assert!(prediction.predicted_stats.is_empty());
        assert!(prediction.ridge_mean.is_none());
    }

    #[test]
    fn test_kicker_from_known_baseline() {
        let engine = create_test_engine();
        let player = engine.store().player(2025, "k1").unwrap();
        let record = player.latest().unwrap();
        let baseline = Baseline::new(8.0, 3.0, 4);

        let prediction = engine.kicker_prediction(player, record, &baseline, 5, None);
        assert!((prediction.std_dev - 3.9).abs() < 1e-9);
        assert!(prediction.predicted_stats.is_empty());
    }

    #[test]
    fn test_missing_data_returns_none() {
        let engine = create_test_engine();
        assert!(engine.predict_player_for_week("nobody", 4, None).is_none());
        // No record before week 1
        assert!(engine.predict_player_for_week("qb1", 1, None).is_none());
    }

    #[test]
    fn test_future_week_uses_latest_record() {
        let engine = create_test_engine();
        let prediction = engine.predict_player("qb1", None).unwrap();
        assert_eq!(prediction.target_week, 15);
        assert_eq!(prediction.games_played, 3);
    }

    #[test]
    fn test_predict_all_ordered_by_id() {
        let engine = create_test_engine();
        let predictions = engine.predict_all(5);
        let ids: Vec<&str> = predictions.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, vec!["k1", "qb1"]);
    }

    #[test]
    fn test_rescoring_changes_ridge_mean() {
        let store = Arc::new(create_test_store());
        let defense = Arc::new(DefenseTable::new());
        let mut six_point = ScoringConfig::ppr();
        six_point.set(Stat::PassingTds, 6.0);

        let ppr = ProjectionEngine::new(store.clone(), defense.clone(), ModelConfig::default(), ScoringConfig::ppr());
        let six = ProjectionEngine::new(store, defense, ModelConfig::default(), six_point);

        let a = ppr.predict_player_for_week("qb1", 4, None).unwrap();
        let b = six.predict_player_for_week("qb1", 4, None).unwrap();
        assert!(b.baseline_mean > a.baseline_mean);
        assert_eq!(a.predicted_stats, b.predicted_stats);
    }
}
