//! Position-specific feature vectors for the ridge stat models.
//!
//! Features are derived from the cumulative record through the week before
//! the target week, the isolated stats of that prior week, the opponent's
//! points allowed to the position and the target week itself. The builder is
//! a pure function: identical inputs give bit-identical output.

use stat_store::{Position, StatLine, Week};

/// Multiplier applied to opponent points-allowed so it sits on a scale
/// comparable to the volume features
pub const OPPONENT_SCALE: f64 = 5.0;

/// Ratio that is exactly 0.0 whenever the denominator is zero
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Ordered, named feature values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<&'static str>,
    values: Vec<f64>,
}

impl FeatureVector {
    fn with_capacity(capacity: usize) -> Self {
        Self { names: Vec::with_capacity(capacity), values: Vec::with_capacity(capacity) }
    }

    fn add(&mut self, name: &'static str, value: f64) {
        self.names.push(name);
        self.values.push(value);
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| *n == name).map(|i| self.values[i])
    }

    /// True when `names` lists exactly this vector's features in order
    pub fn matches_names<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.len() == self.names.len()
            && names.iter().zip(&self.names).all(|(a, b)| a.as_ref() == *b)
    }
}

/// Everything the builder needs for one (player, target week)
#[derive(Debug, Clone, Copy)]
pub struct FeatureInput<'a> {
    pub position: Position,
    /// Cumulative stats through the week before `target_week`
    pub cumulative: &'a StatLine,
    pub games_played: u32,
    /// Isolated stats for the week before `target_week`
    pub last_week: Option<&'a StatLine>,
    /// Opponent's average fantasy points allowed to this position, unscaled
    pub opponent_ppg: f64,
    pub target_week: Week,
}

/// Build the feature vector for a skill position; `None` for K and DEF
pub fn build_features(input: &FeatureInput<'_>) -> Option<FeatureVector> {
    match input.position {
        Position::QB => Some(qb_features(input)),
        Position::RB => Some(rb_features(input)),
        Position::WR | Position::TE => Some(receiver_features(input)),
        Position::K | Position::DEF => None,
    }
}

/// Red-zone and goal-line opportunity rates shared by every position
struct RedZone {
    rz_touches_pg: f64,
    gl_touches_pg: f64,
    rz_td_rate: f64,
    gl_td_rate: f64,
}

impl RedZone {
    fn new(cum: &StatLine, games: f64) -> Self {
        Self {
            rz_touches_pg: cum.rz_touches / games,
            gl_touches_pg: cum.gl_touches / games,
            rz_td_rate: safe_div(cum.rz_tds, cum.rz_touches),
            gl_td_rate: safe_div(cum.gl_tds, cum.gl_touches),
        }
    }
}

fn games_denominator(input: &FeatureInput<'_>) -> f64 {
    f64::from(input.games_played.max(1))
}

fn qb_features(input: &FeatureInput<'_>) -> FeatureVector {
    let cum = input.cumulative;
    let g = games_denominator(input);
    let empty = StatLine::default();
    let last = input.last_week.unwrap_or(&empty);
    let rz = RedZone::new(cum, g);

    let att_pg = cum.attempts / g;
    let ypa = safe_div(cum.passing_yards, cum.attempts);
    let td_rate = safe_div(cum.passing_tds, cum.attempts);

    let mut f = FeatureVector::with_capacity(24);
    f.add("att_pg", att_pg);
    f.add("comp_pct", safe_div(cum.completions, cum.attempts));
    f.add("ypa", ypa);
    f.add("pass_td_rate", td_rate);
    f.add("int_rate", safe_div(cum.interceptions, cum.attempts));
    f.add("sack_rate", safe_div(cum.sacks_suffered, cum.attempts + cum.sacks_suffered));
    f.add("rush_att_pg", cum.carries / g);
    f.add("rush_ypc", safe_div(cum.rushing_yards, cum.carries));
    f.add("air_ypa", safe_div(cum.passing_air_yards, cum.attempts));
    f.add("cpoe_pg", cum.passing_cpoe / g);
    f.add("pass_epa_pg", cum.passing_epa / g);
    f.add("rush_td_pg", cum.rushing_tds / g);
    f.add("last_att", last.attempts);
    f.add("last_ypa", safe_div(last.passing_yards, last.attempts));
    f.add("last_rush_att", last.carries);
    f.add("att_trend", safe_div(last.attempts, att_pg));
    f.add("att_x_ypa", att_pg * ypa);
    f.add("att_x_td_rate", att_pg * td_rate);
    f.add("opp_def_qb_ppg", input.opponent_ppg * OPPONENT_SCALE);
    f.add("rz_touches_pg", rz.rz_touches_pg);
    f.add("gl_touches_pg", rz.gl_touches_pg);
    f.add("rz_td_rate", rz.rz_td_rate);
    f.add("week", f64::from(input.target_week));
    f.add("games", g);
    f
}

fn rb_features(input: &FeatureInput<'_>) -> FeatureVector {
    let cum = input.cumulative;
    let g = games_denominator(input);
    let empty = StatLine::default();
    let last = input.last_week.unwrap_or(&empty);
    let rz = RedZone::new(cum, g);

    let opportunities = cum.carries + cum.targets;
    let total_tds = cum.rushing_tds + cum.receiving_tds;
    let last_opps = last.carries + last.targets;
    let opps_pg = opportunities / g;
    let rush_att_pg = cum.carries / g;
    let tgt_pg = cum.targets / g;
    let ypc = safe_div(cum.rushing_yards, cum.carries);
    let ypt = safe_div(cum.receiving_yards, cum.targets);

    let mut f = FeatureVector::with_capacity(24);
    f.add("opps_pg", opps_pg);
    f.add("last_opps", last_opps);
    f.add("opps_trend", safe_div(last_opps, opps_pg));
    f.add("rush_att_pg", rush_att_pg);
    f.add("rush_ypc", ypc);
    f.add("rush_td_pg", cum.rushing_tds / g);
    f.add("tgt_pg", tgt_pg);
    f.add("rec_pg", cum.receptions / g);
    f.add("catch_rate", safe_div(cum.receptions, cum.targets));
    f.add("ypt", ypt);
    f.add("rec_td_pg", cum.receiving_tds / g);
    f.add("target_share_avg", cum.target_share / g);
    f.add("rec_epa_pg", cum.receiving_epa / g);
    f.add("rush_att_x_ypc", rush_att_pg * ypc);
    f.add("tgt_x_ypt", tgt_pg * ypt);
    f.add("opps_x_td_rate", opps_pg * safe_div(total_tds, opportunities));
    f.add("total_td_pg", total_tds / g);
    f.add("opp_def_rb_ppg", input.opponent_ppg * OPPONENT_SCALE);
    f.add("rz_touches_pg", rz.rz_touches_pg);
    f.add("gl_touches_pg", rz.gl_touches_pg);
    f.add("rz_td_rate", rz.rz_td_rate);
    f.add("gl_td_rate", rz.gl_td_rate);
    f.add("week", f64::from(input.target_week));
    f.add("games", g);
    f
}

fn receiver_features(input: &FeatureInput<'_>) -> FeatureVector {
    let cum = input.cumulative;
    let g = games_denominator(input);
    let empty = StatLine::default();
    let last = input.last_week.unwrap_or(&empty);
    let rz = RedZone::new(cum, g);

    let tgt_pg = cum.targets / g;
    let ypt = safe_div(cum.receiving_yards, cum.targets);
    let adot = safe_div(cum.receiving_air_yards, cum.targets);

    let mut f = FeatureVector::with_capacity(26);
    f.add("tgt_pg", tgt_pg);
    f.add("rec_pg", cum.receptions / g);
    f.add("catch_rate", safe_div(cum.receptions, cum.targets));
    f.add("ypt", ypt);
    f.add("ypr", safe_div(cum.receiving_yards, cum.receptions));
    f.add("adot", adot);
    f.add("rec_td_pg", cum.receiving_tds / g);
    f.add("target_share_avg", cum.target_share / g);
    f.add("air_share_avg", cum.air_yards_share / g);
    f.add("wopr_avg", cum.wopr / g);
    f.add("rec_epa_pg", cum.receiving_epa / g);
    f.add("last_tgt", last.targets);
    f.add("last_ypt", safe_div(last.receiving_yards, last.targets));
    f.add("last_air", last.receiving_air_yards);
    f.add("tgt_trend", safe_div(last.targets, tgt_pg));
    f.add("tgt_x_ypt", tgt_pg * ypt);
    f.add("tgt_x_adot", tgt_pg * adot);
    f.add("air_share_x_adot", (cum.air_yards_share / g) * adot);
    f.add("td_per_target", safe_div(cum.receiving_tds, cum.targets));
    f.add("opp_def_ppg", input.opponent_ppg * OPPONENT_SCALE);
    f.add("rz_touches_pg", rz.rz_touches_pg);
    f.add("gl_touches_pg", rz.gl_touches_pg);
    f.add("rz_td_rate", rz.rz_td_rate);
    f.add("gl_td_rate", rz.gl_td_rate);
    f.add("week", f64::from(input.target_week));
    f.add("games", g);
    f
}
