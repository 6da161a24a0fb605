//! # Projection Engine
//!
//! Weekly fantasy-point projections for NFL skill players.
//!
//! One weighted ridge regression per (position, stat component) forecasts
//! the stat a player produces in the next week. The forecast stat line is
//! scored, blended with a per-game historical baseline according to games
//! played, calibrated per position and wrapped in a Student-t distribution
//! that supports CDF, percentile and Monte Carlo sampling.
//!
//! ```text
//! StatStore ──> features ──> StatModels (ridge per stat) ──┐
//!     │                                                     ├─> blend ──> PlayerPrediction
//!     └────────> Baseline (points per game) ───────────────┘
//! ```

pub mod blend;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod features;
pub mod models;
pub mod prediction;
pub mod ridge;
pub mod scoring;
pub mod training;

pub use blend::{blend_weight, Baseline};
pub use config::{ProjectionConfig, SimulationConfig};
pub use distribution::{BoomMixture, PointDistribution};
pub use engine::ProjectionEngine;
pub use error::{ConfigError, ModelError};
pub use features::{build_features, FeatureInput, FeatureVector};
pub use models::{stat_components, StatModels};
pub use prediction::PlayerPrediction;
pub use ridge::RidgeModel;
pub use scoring::ScoringConfig;
