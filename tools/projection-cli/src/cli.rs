//! # Command Line Interface
//!
//! Player projections, weekly rankings and Monte Carlo odds.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use playoff_sim::{
    finalize_completed, Bracket, MatchupSimulator, PlayerOutlook, PlayoffSimulator, RosterProjector,
    TeamSheet,
};
use projection_engine::{PlayerPrediction, ProjectionConfig, ProjectionEngine};
use stat_store::{DefenseTable, Position, StatStore, Week};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::league::LeagueSnapshot;

/// Fantasy projection CLI
#[derive(Parser)]
#[command(name = "projection-cli")]
#[command(about = "Weekly fantasy projections, rankings and playoff odds")]
pub struct Cli {
    /// TOML configuration file; environment variables and defaults otherwise
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project one player
    Predict {
        /// Player id
        #[arg(long)]
        player: String,
        /// Target week; the configured default week otherwise
        #[arg(long)]
        week: Option<Week>,
        /// Opponent team abbreviation
        #[arg(long)]
        opponent: Option<String>,
        /// Print the full prediction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank every projectable player for a week
    Rankings {
        #[arg(long)]
        week: Week,
        /// Only this position (QB, RB, WR, TE, K, DEF)
        #[arg(long)]
        position: Option<Position>,
        #[arg(long, default_value = "25")]
        limit: usize,
    },
    /// Win probability for two team score distributions
    Matchup {
        #[arg(long)]
        mean_a: f64,
        #[arg(long)]
        std_a: f64,
        #[arg(long)]
        mean_b: f64,
        #[arg(long)]
        std_b: f64,
    },
    /// Championship and consolation odds for a league snapshot
    Playoffs {
        /// League snapshot JSON
        #[arg(long)]
        league: PathBuf,
    },
}

/// CLI handler
pub struct CliHandler {
    config: ProjectionConfig,
}

impl CliHandler {
    pub fn new(config_path: Option<&PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ProjectionConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ProjectionConfig::from_env().context("reading config from environment")?,
        };
        Ok(Self { config })
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Predict { player, week, opponent, json } => {
                self.predict(&player, week, opponent.as_deref(), json).await?;
            }
            Commands::Rankings { week, position, limit } => {
                self.rankings(week, position, limit).await?;
            }
            Commands::Matchup { mean_a, std_a, mean_b, std_b } => {
                self.matchup(mean_a, std_a, mean_b, std_b);
            }
            Commands::Playoffs { league } => {
                self.playoffs(&league).await?;
            }
        }
        Ok(())
    }

    async fn engine(&self) -> Result<ProjectionEngine> {
        let data = &self.config.data;
        let store = StatStore::load_from_file(&data.stats_path)
            .await
            .with_context(|| format!("loading stats {}", data.stats_path.display()))?;

        let defense = match &data.defense_path {
            Some(path) => match DefenseTable::load_from_file(path).await {
                Ok(table) => table,
                Err(e) => {
                    warn!("Defense table unavailable ({}), using league averages", e);
                    DefenseTable::new()
                }
            },
            None => DefenseTable::new(),
        };

        let engine = ProjectionEngine::from_config(Arc::new(store), Arc::new(defense), &self.config)?;
        Ok(engine)
    }

    async fn predict(&self, player: &str, week: Option<Week>, opponent: Option<&str>, json: bool) -> Result<()> {
        let engine = self.engine().await?;
        let week = week.unwrap_or(engine.config().default_week);
        let Some(prediction) = engine.predict_player_for_week(player, week, opponent) else {
            println!("{}", format!("No projection available for {player} in week {week}").yellow());
            return Ok(());
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&prediction)?);
            return Ok(());
        }

        let name = prediction.name.clone().unwrap_or_else(|| prediction.player_id.clone());
        println!(
            "{} ({} {}) week {} vs {}",
            name.cyan().bold(),
            prediction.position,
            prediction.team,
            prediction.target_week,
            prediction.opponent.as_deref().unwrap_or("?")
        );
        println!("{}", "=".repeat(50));
        println!(
            "  {} {:.2} ± {:.2}",
            "Projection:".bold(),
            prediction.mean,
            prediction.std_dev
        );
        println!(
            "  Floor / median / ceiling: {:.1} / {:.1} / {:.1}",
            prediction.percentile(0.1),
            prediction.percentile(0.5),
            prediction.percentile(0.9)
        );
        println!(
            "  Baseline {:.2}, ridge {}, ridge weight {:.1}, confidence {:.1} ({} games)",
            prediction.baseline_mean,
            prediction.ridge_mean.map_or("-".to_string(), |m| format!("{m:.2}")),
            prediction.ridge_weight,
            prediction.confidence,
            prediction.games_played
        );
        for (stat, value) in &prediction.predicted_stats {
            let std = prediction.stat_std_devs.get(stat).copied().unwrap_or(0.0);
            println!("    {:<18} {:>7.2} ± {:.2}", stat.as_str(), value, std);
        }
        Ok(())
    }

    async fn rankings(&self, week: Week, position: Option<Position>, limit: usize) -> Result<()> {
        let engine = self.engine().await?;
        let mut predictions: Vec<PlayerPrediction> = engine
            .predict_all(week)
            .into_iter()
            .filter(|p| position.map_or(true, |pos| p.position == pos))
            .collect();
        predictions.sort_by(|a, b| b.mean.total_cmp(&a.mean));

        let label = position.map_or("All positions".to_string(), |p| p.to_string());
        println!("{}", format!("Week {week} rankings: {label}").cyan().bold());
        println!("{}", "=".repeat(60));
        for (rank, prediction) in predictions.iter().take(limit).enumerate() {
            let name = prediction.name.as_deref().unwrap_or(&prediction.player_id);
            println!(
                "{:>3}. {:<24} {:<3} {:<4} {} ± {:.1}",
                rank + 1,
                name,
                prediction.position,
                prediction.team,
                format!("{:>6.2}", prediction.mean).green(),
                prediction.std_dev
            );
        }
        if predictions.is_empty() {
            println!("No data found");
        }
        Ok(())
    }

    fn matchup(&self, mean_a: f64, std_a: f64, mean_b: f64, std_b: f64) {
        let simulator = MatchupSimulator::new(self.config.simulation.clone());
        let win_a = simulator.simulate_matchup(mean_a, std_a, mean_b, std_b);
        println!("{}", "Matchup".cyan().bold());
        println!("  Team A {:.1} ± {:.1}: {}", mean_a, std_a, format_prob(win_a));
        println!("  Team B {:.1} ± {:.1}: {}", mean_b, std_b, format_prob(1.0 - win_a));
    }

    async fn playoffs(&self, league_path: &PathBuf) -> Result<()> {
        let snapshot = LeagueSnapshot::load_from_file(league_path).await?;
        let engine = self.engine().await?;
        let round = snapshot.current_round();
        info!("League snapshot: week {}, playoff round {}", snapshot.week, round);

        let sheets = snapshot.team_sheets(|id| {
            engine
                .predict_player_for_week(id, snapshot.week, None)
                .map(|prediction| PlayerOutlook::from(&prediction))
        });

        let mut winners = Bracket::from_spec(snapshot.winners_bracket.clone())?;
        let mut losers = snapshot.losers_bracket.clone().map(Bracket::from_spec).transpose()?;
        let mut finished = finalize_completed(&mut winners, round, &sheets)?;
        if let Some(losers) = losers.as_mut() {
            finished.extend(finalize_completed(losers, round, &sheets)?);
        }
        if !finished.is_empty() {
            info!("Recorded completed matchups {:?}", finished);
        }

        let owners: HashMap<u32, String> = snapshot
            .rosters
            .iter()
            .map(|r| (r.roster_id, r.owner.clone().unwrap_or_else(|| format!("Roster {}", r.roster_id))))
            .collect();
        let owner = |roster: u32| owners.get(&roster).cloned().unwrap_or_else(|| format!("Roster {roster}"));

        self.print_current_matchups(&winners, round, &sheets, &snapshot, &owner);

        let projector = RosterProjector::new(round, &sheets, &snapshot.slots);
        let odds = PlayoffSimulator::new(self.config.simulation.clone()).simulate(&winners, losers.as_ref(), &projector)?;

        let mut teams: Vec<_> = odds.teams.iter().collect();
        teams.sort_by(|a, b| b.1.championship_prob.total_cmp(&a.1.championship_prob));
        println!("{}", format!("Playoff odds ({} simulations)", odds.simulations).cyan().bold());
        println!("{}", "=".repeat(60));
        println!("  {:<24} {:>12} {:>14}", "Team", "Champion", "Consolation");
        for (roster, team) in teams {
            println!(
                "  {:<24} {:>12} {:>14}",
                owner(*roster),
                format_prob(team.championship_prob),
                format!("{:.1}%", team.loser_bracket_prob * 100.0)
            );
        }
        Ok(())
    }

    fn print_current_matchups(
        &self,
        bracket: &Bracket,
        round: u32,
        sheets: &[TeamSheet],
        snapshot: &LeagueSnapshot,
        owner: &dyn Fn(u32) -> String,
    ) {
        let by_roster: HashMap<u32, &TeamSheet> = sheets.iter().map(|s| (s.roster_id, s)).collect();
        let simulator = MatchupSimulator::new(self.config.simulation.clone());
        let known = bracket.known_outcomes();

        for (matchup, outcome) in bracket.matchups().iter().zip(&known) {
            if matchup.round != round || matchup.decided.is_some() {
                continue;
            }
            let [Some(t1), Some(t2)] = outcome.teams else { continue };
            let (Some(a), Some(b)) = (by_roster.get(&t1), by_roster.get(&t2)) else { continue };

            let projection = simulator.project_matchup(a, b, &snapshot.slots);
            println!("{}", format!("Week {} matchup {}", snapshot.week, matchup.id).bold());
            println!(
                "  {:<24} current {:>6.1} ({})  optimal {:>6.1} ({})",
                owner(t1),
                projection.team_a.current.mean,
                format_prob(projection.current_win_prob_a),
                projection.team_a.optimal.mean,
                format_prob(projection.optimal_win_prob_a)
            );
            println!(
                "  {:<24} current {:>6.1} ({})  optimal {:>6.1} ({})",
                owner(t2),
                projection.team_b.current.mean,
                format_prob(projection.current_win_prob_b),
                projection.team_b.optimal.mean,
                format_prob(projection.optimal_win_prob_b)
            );
        }
    }
}

fn format_prob(p: f64) -> ColoredString {
    let text = format!("{:.1}%", p * 100.0);
    if p >= 0.5 {
        text.green()
    } else {
        text.red()
    }
}
