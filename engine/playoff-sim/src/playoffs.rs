//! Playoff odds: end-to-end bracket Monte Carlo.

use projection_engine::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::bracket::Bracket;
use crate::error::SimError;
use crate::lineup::{optimal_lineup, Lineup, LineupSlots};
use crate::matchup::TeamSheet;
use crate::trials::{resolve_seed, run_batched, ScoreSampler};
use crate::{MatchupId, RosterId};

/// Supplies a team's expected score and std for a bracket round
pub trait TeamProjector: Sync {
    fn project(&self, roster: RosterId, round: u32) -> (f64, f64);
}

impl<F> TeamProjector for F
where
    F: Fn(RosterId, u32) -> (f64, f64) + Sync,
{
    fn project(&self, roster: RosterId, round: u32) -> (f64, f64) {
        self(roster, round)
    }
}

/// Scores the current round with the lineups as set and every later round
/// with each roster's optimal lineup
#[derive(Debug, Clone, Default)]
pub struct RosterProjector {
    current_round: u32,
    current: HashMap<RosterId, Lineup>,
    optimal: HashMap<RosterId, Lineup>,
}

impl RosterProjector {
    pub fn new(current_round: u32, teams: &[TeamSheet], slots: &LineupSlots) -> Self {
        let current = teams
            .iter()
            .map(|team| (team.roster_id, Lineup::from_players(&team.starters)))
            .collect();
        let optimal = teams
            .iter()
            .map(|team| (team.roster_id, optimal_lineup(&team.roster, slots)))
            .collect();
        Self { current_round, current, optimal }
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn current_lineup(&self, roster: RosterId) -> Option<&Lineup> {
        self.current.get(&roster)
    }

    pub fn optimal_lineup(&self, roster: RosterId) -> Option<&Lineup> {
        self.optimal.get(&roster)
    }
}

impl TeamProjector for RosterProjector {
    /// Unknown rosters project to zero
    fn project(&self, roster: RosterId, round: u32) -> (f64, f64) {
        let lineups = if round == self.current_round { &self.current } else { &self.optimal };
        lineups.get(&roster).map_or((0.0, 0.0), |lineup| (lineup.mean, lineup.std_dev))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamOdds {
    pub championship_prob: f64,
    pub loser_bracket_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayoffOdds {
    pub simulations: usize,
    pub teams: BTreeMap<RosterId, TeamOdds>,
}

impl PlayoffOdds {
    pub fn championship_prob(&self, roster: RosterId) -> f64 {
        self.teams.get(&roster).map_or(0.0, |odds| odds.championship_prob)
    }

    pub fn loser_bracket_prob(&self, roster: RosterId) -> f64 {
        self.teams.get(&roster).map_or(0.0, |odds| odds.loser_bracket_prob)
    }
}

#[derive(Debug, Default)]
struct ChampionCounts {
    winners: HashMap<RosterId, u64>,
    losers: HashMap<RosterId, u64>,
}

impl ChampionCounts {
    fn merge(mut self, other: ChampionCounts) -> Self {
        for (roster, count) in other.winners {
            *self.winners.entry(roster).or_default() += count;
        }
        for (roster, count) in other.losers {
            *self.losers.entry(roster).or_default() += count;
        }
        self
    }
}

/// Re-simulates the remaining playoff brackets end to end
#[derive(Debug, Clone)]
pub struct PlayoffSimulator {
    config: SimulationConfig,
    sampler: ScoreSampler,
}

impl Default for PlayoffSimulator {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl PlayoffSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        let sampler = ScoreSampler::new(config.df, config.std_floor);
        Self { config, sampler }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Championship odds from the winners bracket and, when given, the
    /// consolation ("toilet bowl") odds from the losers bracket.
    ///
    /// Every undecided matchup with known participants is settled by one
    /// Student-t draw per side; the higher score advances and ties go to the
    /// second slot.
    pub fn simulate<P: TeamProjector>(
        &self,
        winners: &Bracket,
        losers: Option<&Bracket>,
        projector: &P,
    ) -> Result<PlayoffOdds, SimError> {
        if winners.final_matchup().is_none() || losers.is_some_and(|b| b.final_matchup().is_none()) {
            return Err(SimError::MissingFinal);
        }

        let simulations = self.config.simulations;
        let seed = resolve_seed(self.config.seed);
        info!(
            "Simulating playoffs: {} trials, {} winners-bracket matchups",
            simulations,
            winners.len()
        );

        let counts = run_batched(simulations, seed, |rng, len| {
            let mut counts = ChampionCounts::default();
            let mut outcomes = Vec::with_capacity(winners.len());
            for _ in 0..len {
                for (bracket, tally) in
                    [(Some(winners), &mut counts.winners), (losers, &mut counts.losers)]
                {
                    let Some(bracket) = bracket else { continue };
                    bracket.resolve_into(&mut outcomes, |matchup, t1, t2| {
                        let (mean_1, std_1) = projector.project(t1, matchup.round);
                        let (mean_2, std_2) = projector.project(t2, matchup.round);
                        let score_1 = self.sampler.draw(mean_1, std_1, rng);
                        let score_2 = self.sampler.draw(mean_2, std_2, rng);
                        if score_1 > score_2 {
                            t1
                        } else {
                            t2
                        }
                    });
                    if let Some(champion) = bracket.champion(&outcomes) {
                        *tally.entry(champion).or_default() += 1;
                    }
                }
            }
            counts
        })
        .into_iter()
        .fold(ChampionCounts::default(), ChampionCounts::merge);

        let mut teams: BTreeMap<RosterId, TeamOdds> = winners
            .participants()
            .into_iter()
            .chain(losers.map(|b| b.participants()).unwrap_or_default())
            .map(|roster| (roster, TeamOdds::default()))
            .collect();
        let trials = simulations.max(1) as f64;
        for (roster, count) in counts.winners {
            teams.entry(roster).or_default().championship_prob = count as f64 / trials;
        }
        for (roster, count) in counts.losers {
            teams.entry(roster).or_default().loser_bracket_prob = count as f64 / trials;
        }
        debug!("Playoff odds computed for {} rosters", teams.len());

        Ok(PlayoffOdds { simulations, teams })
    }
}

/// Record the current round's matchups whose starters have all played.
/// The higher actual score wins; ties go to the second slot. Returns the
/// ids of the matchups marked decided.
pub fn finalize_completed(
    bracket: &mut Bracket,
    round: u32,
    teams: &[TeamSheet],
) -> Result<Vec<MatchupId>, SimError> {
    let by_roster: HashMap<RosterId, &TeamSheet> = teams.iter().map(|t| (t.roster_id, t)).collect();
    let completed = |roster: RosterId| {
        by_roster
            .get(&roster)
            .filter(|team| !team.starters.is_empty() && team.starters.iter().all(|p| p.played))
            .map(|team| Lineup::from_players(&team.starters).mean)
    };

    let known = bracket.known_outcomes();
    let mut finished = Vec::new();
    for (matchup, outcome) in bracket.matchups().iter().zip(&known) {
        if matchup.round != round || matchup.decided.is_some() {
            continue;
        }
        let [Some(t1), Some(t2)] = outcome.teams else { continue };
        if let (Some(score_1), Some(score_2)) = (completed(t1), completed(t2)) {
            let winner = if score_1 > score_2 { t1 } else { t2 };
            finished.push((matchup.id, winner));
        }
    }

    for (id, winner) in &finished {
        bracket.record_result(*id, *winner)?;
        info!("Matchup {} final: roster {} wins", id, winner);
    }
    Ok(finished.into_iter().map(|(id, _)| id).collect())
}
