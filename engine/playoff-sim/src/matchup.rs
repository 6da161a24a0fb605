//! Head-to-head Monte Carlo.

use projection_engine::SimulationConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::lineup::{optimal_lineup, Lineup, LineupSlots, PlayerOutlook};
use crate::trials::{resolve_seed, run_batched, ScoreSampler};
use crate::RosterId;

/// One side of a fantasy matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub roster_id: RosterId,
    /// Players currently set in the starting lineup
    pub starters: Vec<PlayerOutlook>,
    /// Everyone on the roster, starters included
    pub roster: Vec<PlayerOutlook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideProjection {
    pub roster_id: RosterId,
    pub current: Lineup,
    pub optimal: Lineup,
}

/// Current and optimal lineup outlooks for both sides of a matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupProjection {
    pub team_a: SideProjection,
    pub team_b: SideProjection,
    pub current_win_prob_a: f64,
    pub current_win_prob_b: f64,
    pub optimal_win_prob_a: f64,
    pub optimal_win_prob_b: f64,
}

/// Monte Carlo matchup simulator
#[derive(Debug, Clone)]
pub struct MatchupSimulator {
    config: SimulationConfig,
    sampler: ScoreSampler,
}

impl Default for MatchupSimulator {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl MatchupSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        let sampler = ScoreSampler::new(config.df, config.std_floor);
        Self { config, sampler }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Probability that A outscores B, counting ties as half a win
    pub fn simulate_matchup(&self, mean_a: f64, std_a: f64, mean_b: f64, std_b: f64) -> f64 {
        self.win_fraction(|rng| {
            let a = self.sampler.draw(mean_a, std_a, rng);
            let b = self.sampler.draw(mean_b, std_b, rng);
            (a, b)
        })
    }

    /// Like [`simulate_matchup`](Self::simulate_matchup) but each team's
    /// score is the sum of independent per-player draws
    pub fn simulate_rosters(
        &self,
        team_a: &[PlayerOutlook],
        team_b: &[PlayerOutlook],
    ) -> Result<f64, SimError> {
        if team_a.is_empty() || team_b.is_empty() {
            return Err(SimError::EmptyRoster);
        }
        Ok(self.win_fraction(|rng| {
            let a: f64 = team_a.iter().map(|p| self.sampler.draw(p.mean, p.std_dev, rng)).sum();
            let b: f64 = team_b.iter().map(|p| self.sampler.draw(p.mean, p.std_dev, rng)).sum();
            (a, b)
        }))
    }

    /// Project a matchup with both the lineups as set and the best
    /// available lineups
    pub fn project_matchup(
        &self,
        team_a: &TeamSheet,
        team_b: &TeamSheet,
        slots: &LineupSlots,
    ) -> MatchupProjection {
        let side = |team: &TeamSheet| SideProjection {
            roster_id: team.roster_id,
            current: Lineup::from_players(&team.starters),
            optimal: optimal_lineup(&team.roster, slots),
        };
        let (a, b) = (side(team_a), side(team_b));

        let current = self.simulate_matchup(a.current.mean, a.current.std_dev, b.current.mean, b.current.std_dev);
        let optimal = self.simulate_matchup(a.optimal.mean, a.optimal.std_dev, b.optimal.mean, b.optimal.std_dev);
        debug!(
            "Matchup {} vs {}: current {:.3}, optimal {:.3}",
            a.roster_id, b.roster_id, current, optimal
        );

        MatchupProjection {
            team_a: a,
            team_b: b,
            current_win_prob_a: current,
            current_win_prob_b: 1.0 - current,
            optimal_win_prob_a: optimal,
            optimal_win_prob_b: 1.0 - optimal,
        }
    }

    fn win_fraction<F>(&self, trial: F) -> f64
    where
        F: Fn(&mut rand_chacha::ChaCha8Rng) -> (f64, f64) + Sync,
    {
        let simulations = self.config.simulations;
        if simulations == 0 {
            return 0.5;
        }
        let seed = resolve_seed(self.config.seed);
        let wins: f64 = run_batched(simulations, seed, |rng, len| {
            (0..len)
                .map(|_| {
                    let (a, b) = trial(rng);
                    if a > b {
                        1.0
                    } else if a == b {
                        0.5
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
        })
        .into_iter()
        .sum();
        wins / simulations as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stat_store::Position;

    fn simulator(seed: u64) -> MatchupSimulator {
        MatchupSimulator::default().with_seed(seed)
    }

    #[test]
    fn test_matchup_symmetry() {
        let sim = simulator(7);
        let forward = sim.simulate_matchup(110.0, 18.0, 104.0, 22.0);
        let reverse = sim.simulate_matchup(104.0, 22.0, 110.0, 18.0);
        assert!((forward + reverse - 1.0).abs() < 0.03, "{forward} + {reverse}");
        assert!(forward > 0.5);
    }

    #[test]
    fn test_identical_teams_are_a_coin_flip() {
        let p = simulator(3).simulate_matchup(100.0, 15.0, 100.0, 15.0);
        assert!((p - 0.5).abs() < 0.03, "{p}");
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = simulator(99).simulate_matchup(95.0, 12.0, 100.0, 20.0);
        let b = simulator(99).simulate_matchup(95.0, 12.0, 100.0, 20.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_std_is_floored() {
        // With std 0 on both sides and no floor, A would always win
        let p = simulator(5).simulate_matchup(101.0, 0.0, 100.0, 0.0);
        assert!(p < 0.7, "{p}");
        assert!(p > 0.5, "{p}");
    }

    #[test]
    fn test_roster_simulation() {
        let strong = vec![
            PlayerOutlook::new("a1", Position::QB, 25.0, 6.0),
            PlayerOutlook::new("a2", Position::WR, 20.0, 6.0),
        ];
        let weak = vec![
            PlayerOutlook::new("b1", Position::QB, 12.0, 6.0),
            PlayerOutlook::new("b2", Position::WR, 8.0, 6.0),
        ];
        let sim = simulator(11);
        let p = sim.simulate_rosters(&strong, &weak).unwrap();
        assert!(p > 0.9, "{p}");
        assert_eq!(sim.simulate_rosters(&strong, &[]), Err(SimError::EmptyRoster));
    }

    #[test]
    fn test_project_matchup_reports_both_lineups() {
        let bench_qb = PlayerOutlook::new("a_qb2", Position::QB, 21.0, 6.0);
        let starter_qb = PlayerOutlook::new("a_qb1", Position::QB, 9.0, 6.0);
        let team_a = TeamSheet {
            roster_id: 1,
            starters: vec![starter_qb.clone()],
            roster: vec![starter_qb, bench_qb],
        };
        let b_qb = PlayerOutlook::new("b_qb1", Position::QB, 15.0, 6.0);
        let team_b = TeamSheet { roster_id: 2, starters: vec![b_qb.clone()], roster: vec![b_qb] };
        let slots = LineupSlots { superflex: 0, ..Default::default() };

        let projection = simulator(21).project_matchup(&team_a, &team_b, &slots);
        assert_eq!(projection.team_a.current.starters, vec!["a_qb1"]);
        assert_eq!(projection.team_a.optimal.starters, vec!["a_qb2"]);
        assert!(projection.current_win_prob_a < 0.5);
        assert!(projection.optimal_win_prob_a > 0.5);
        assert!((projection.current_win_prob_a + projection.current_win_prob_b - 1.0).abs() < 1e-12);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn prop_win_probability_in_unit_interval(
            mean_a in 0.0f64..200.0,
            std_a in -5.0f64..40.0,
            mean_b in 0.0f64..200.0,
            std_b in -5.0f64..40.0,
        ) {
            let sim = MatchupSimulator::new(SimulationConfig { simulations: 500, seed: Some(1), ..Default::default() });
            let p = sim.simulate_matchup(mean_a, std_a, mean_b, std_b);
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
