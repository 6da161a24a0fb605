use rayon::prelude::*;
use stat_store::{DefenseTable, Position, Stat, StatStore};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::ridge::{self, RidgeModel};
use crate::training::{build_training_set, recency_weights};

/// Stats forecast for each position; their fantasy points make up the ridge
/// estimate
pub fn stat_components(position: Position) -> &'static [Stat] {
    match position {
        Position::QB => &[
            Stat::PassingYards,
            Stat::PassingTds,
            Stat::Interceptions,
            Stat::RushingYards,
            Stat::RushingTds,
            Stat::FumblesLost,
        ],
        Position::RB => &[
            Stat::RushingYards,
            Stat::RushingTds,
            Stat::Receptions,
            Stat::ReceivingYards,
            Stat::ReceivingTds,
            Stat::FumblesLost,
        ],
        Position::WR => &[
            Stat::Receptions,
            Stat::ReceivingYards,
            Stat::ReceivingTds,
            Stat::RushingYards,
            Stat::RushingTds,
            Stat::FumblesLost,
        ],
        Position::TE => {
            &[Stat::Receptions, Stat::ReceivingYards, Stat::ReceivingTds, Stat::FumblesLost]
        }
        Position::K | Position::DEF => &[],
    }
}

type ModelKey = (Position, Stat);

/// Lazily fitted ridge models, one per (position, stat component).
///
/// Each key is fitted at most once for the life of this value. A key whose
/// training set is empty (or whose fit fails) caches "no model" so callers
/// fall back to per-game averages.
pub struct StatModels {
    store: Arc<StatStore>,
    defense: Arc<DefenseTable>,
    config: ModelConfig,
    cells: HashMap<ModelKey, OnceLock<Option<Arc<RidgeModel>>>>,
}

impl StatModels {
    pub fn new(store: Arc<StatStore>, defense: Arc<DefenseTable>, config: ModelConfig) -> Self {
        let cells = Position::SKILL
            .iter()
            .flat_map(|&position| {
                stat_components(position).iter().map(move |&stat| ((position, stat), OnceLock::new()))
            })
            .collect();
        Self { store, defense, config, cells }
    }

    /// Fitted model for `position`/`stat`, fitting on first use
    pub fn get(&self, position: Position, stat: Stat) -> Option<Arc<RidgeModel>> {
        let cell = self.cells.get(&(position, stat))?;
        cell.get_or_init(|| self.fit(position, stat)).clone()
    }

    /// Fit every model up front, in parallel
    pub fn warm_up(&self) -> usize {
        let mut keys: Vec<ModelKey> = self.cells.keys().copied().collect();
        keys.sort();
        let fitted = keys
            .par_iter()
            .filter(|(position, stat)| self.get(*position, *stat).is_some())
            .count();
        info!("Warmed up {}/{} stat models", fitted, keys.len());
        fitted
    }

    /// Install a pre-fitted model; `false` if the key is unknown or already set
    pub fn install(&self, position: Position, stat: Stat, model: RidgeModel) -> bool {
        match self.cells.get(&(position, stat)) {
            Some(cell) => cell.set(Some(Arc::new(model))).is_ok(),
            None => false,
        }
    }

    /// Number of keys that have been fitted (successfully or not)
    pub fn fitted_count(&self) -> usize {
        self.cells.values().filter(|cell| cell.get().is_some()).count()
    }

    fn fit(&self, position: Position, stat: Stat) -> Option<Arc<RidgeModel>> {
        let seasons = self.config.training_seasons();
        let set = build_training_set(&self.store, &self.defense, position, stat, &seasons);
        if set.is_empty() {
            debug!("No training samples for {} {}", position, stat);
            return None;
        }

        let weights = recency_weights(&set.origins, self.config.recency_decay);
        let alpha = self.config.ridge_alpha_for(position, stat);
        let names = set.feature_names.iter().map(|name| name.to_string()).collect();

        match ridge::fit(names, &set.rows, &set.targets, Some(&weights), alpha) {
            Ok(model) => {
                info!(
                    "Fitted {} {} model: {} samples, alpha {:.1}, residual std {:.3}",
                    position, stat, model.sample_count, alpha, model.residual_std
                );
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!("Failed to fit {} {} model: {}", position, stat, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for StatModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatModels")
            .field("keys", &self.cells.len())
            .field("fitted", &self.fitted_count())
            .finish()
    }
}
