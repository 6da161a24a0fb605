//! Fantasy-point outcome distributions.
//!
//! A [`PointDistribution`] is a Student-t (or Normal when no df is set)
//! centred on the blended mean, optionally split into a two-component "boom"
//! mixture. `std_dev` is always the true standard deviation; the Student-t
//! scale is derived from it.

use rand::Rng;
use rand_distr::{Distribution, Normal, StudentT};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal as NormalCdf, StudentsT};

/// Optional breakout-week component. Disabled (weight 0) by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoomMixture {
    /// Probability of a boom week, clamped to [0, 1]
    pub weight: f64,
    /// Distance between the boom and normal component means
    pub shift: f64,
    /// Boom component scale relative to the base scale (at least 1)
    pub scale_mult: f64,
    /// Boom component df; `min(df, 3.8)` when unset
    pub df: Option<f64>,
}

impl Default for BoomMixture {
    fn default() -> Self {
        Self { weight: 0.0, shift: 0.0, scale_mult: 1.0, df: None }
    }
}

impl BoomMixture {
    pub fn is_active(&self) -> bool {
        self.weight.clamp(0.0, 1.0) > 0.0 && self.shift > 0.0
    }
}

/// One mixture component in location/scale form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub weight: f64,
    pub mean: f64,
    /// `None` means Normal
    pub df: Option<f64>,
    pub scale: f64,
}

impl Component {
    fn cdf(&self, x: f64) -> f64 {
        if self.scale <= 0.0 {
            return if x >= self.mean { 1.0 } else { 0.0 };
        }
        let z = (x - self.mean) / self.scale;
        match self.df {
            Some(df) => match StudentsT::new(0.0, 1.0, df) {
                Ok(t) => t.cdf(z),
                Err(_) => standard_normal_cdf(z),
            },
            None => standard_normal_cdf(z),
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.scale <= 0.0 {
            return self.mean;
        }
        match self.df {
            Some(df) => match StudentT::new(df) {
                Ok(t) => self.mean + self.scale * t.sample(rng),
                Err(_) => self.mean,
            },
            None => match Normal::new(self.mean, self.scale) {
                Ok(normal) => normal.sample(rng),
                Err(_) => self.mean,
            },
        }
    }
}

fn standard_normal_cdf(z: f64) -> f64 {
    match NormalCdf::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => 0.5,
    }
}

/// Weekly fantasy-point distribution for one player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointDistribution {
    pub mean: f64,
    pub std_dev: f64,
    /// Student-t degrees of freedom; `None` (or ≤ 2) uses the Normal
    pub df: Option<f64>,
    #[serde(default)]
    pub boom: BoomMixture,
}

impl PointDistribution {
    pub fn new(mean: f64, std_dev: f64, df: Option<f64>) -> Self {
        Self { mean, std_dev, df, boom: BoomMixture::default() }
    }

    pub fn with_boom(mut self, boom: BoomMixture) -> Self {
        self.boom = boom;
        self
    }

    fn student_df(&self) -> Option<f64> {
        self.df.filter(|df| *df > 2.0 && self.std_dev > 0.0)
    }

    /// Student-t scale giving a true std of `std_dev`
    pub fn t_scale(&self) -> f64 {
        match self.student_df() {
            Some(df) => self.std_dev * ((df - 2.0) / df).sqrt(),
            None => self.std_dev,
        }
    }

    /// Mixture components as (weight, mean, df, scale)
    pub fn components(&self) -> Vec<Component> {
        let df = self.student_df();
        let scale = self.t_scale();
        if !self.boom.is_active() {
            return vec![Component { weight: 1.0, mean: self.mean, df, scale }];
        }

        let w = self.boom.weight.clamp(0.0, 1.0);
        let shift = self.boom.shift;
        let boom_df = df.map(|df| match self.boom.df {
            Some(boom_df) if boom_df > 2.0 => boom_df,
            _ => df.min(3.8),
        });
        vec![
            Component { weight: 1.0 - w, mean: (self.mean - w * shift).max(0.0), df, scale },
            Component {
                weight: w,
                mean: self.mean + (1.0 - w) * shift,
                df: boom_df,
                scale: scale * self.boom.scale_mult.max(1.0),
            },
        ]
    }

    /// Mixture-weighted cumulative probability
    pub fn cdf(&self, x: f64) -> f64 {
        let total: f64 = self.components().iter().map(|c| c.weight * c.cdf(x)).sum();
        total.clamp(0.0, 1.0)
    }

    pub fn probability_above(&self, threshold: f64) -> f64 {
        if self.std_dev == 0.0 {
            return if self.mean > threshold { 1.0 } else { 0.0 };
        }
        1.0 - self.cdf(threshold)
    }

    /// Score at probability `p` in (0, 1), found by bisection on the CDF.
    ///
    /// The search is over non-negative scores, so the result is never below 0.
    pub fn percentile(&self, p: f64) -> f64 {
        let p = p.clamp(1e-6, 1.0 - 1e-6);

        let mut lo = 0.0;
        let mut hi = (self.mean + 12.0 * self.std_dev.max(1.0) + 2.0 * self.boom.shift.max(0.0)).max(1.0);
        while self.cdf(hi) < p && hi < 300.0 {
            hi *= 1.6;
        }

        for _ in 0..40 {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi.max(0.0)
    }

    /// One draw, clamped at zero
    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let components = self.components();
        let component = if components.len() == 1 {
            &components[0]
        } else {
            let total: f64 = components.iter().map(|c| c.weight).sum();
            let mut u = rng.gen::<f64>() * total;
            let mut chosen = &components[components.len() - 1];
            for c in &components {
                if u < c.weight {
                    chosen = c;
                    break;
                }
                u -= c.weight;
            }
            chosen
        };
        component.draw(rng).max(0.0)
    }

    /// `n` draws, clamped at zero
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.sample_one(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_cdf_percentile_round_trip() {
        let dist = PointDistribution::new(15.0, 5.0, Some(6.0));
        for x in [5.0, 15.0, 25.0] {
            let recovered = dist.percentile(dist.cdf(x));
            assert!((recovered - x).abs() < 0.01, "x={x} recovered={recovered}");
        }
    }

    #[test]
    fn test_cdf_symmetric_at_mean() {
        let dist = PointDistribution::new(12.0, 4.0, Some(4.2));
        assert!((dist.cdf(12.0) - 0.5).abs() < 1e-6);
        assert!((dist.probability_above(12.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_t_scale_preserves_std() {
        let dist = PointDistribution::new(10.0, 6.0, Some(6.0));
        assert!((dist.t_scale() - 6.0 * (4.0f64 / 6.0).sqrt()).abs() < 1e-12);

        // df at or below 2 has no finite variance; fall back to the Normal
        let normal = PointDistribution::new(10.0, 6.0, Some(2.0));
        assert_eq!(normal.t_scale(), 6.0);
        assert_eq!(normal.components()[0].df, None);
    }

    #[test]
    fn test_zero_std_is_point_mass() {
        let dist = PointDistribution::new(8.0, 0.0, Some(4.0));
        assert_eq!(dist.probability_above(7.9), 1.0);
        assert_eq!(dist.probability_above(8.0), 0.0);
        assert_eq!(dist.cdf(8.0), 1.0);
        assert_eq!(dist.cdf(7.99), 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(dist.sample(10, &mut rng).iter().all(|x| *x == 8.0));
    }

    #[test]
    fn test_boom_components() {
        let boom = BoomMixture { weight: 0.2, shift: 10.0, scale_mult: 1.5, df: None };
        let dist = PointDistribution::new(14.0, 5.0, Some(6.0)).with_boom(boom);
        let components = dist.components();
        assert_eq!(components.len(), 2);

        let (base, spike) = (components[0], components[1]);
        assert!((base.weight - 0.8).abs() < 1e-12);
        assert!((base.mean - 12.0).abs() < 1e-12);
        assert!((spike.mean - 22.0).abs() < 1e-12);
        assert_eq!(spike.df, Some(3.8));
        assert!((spike.scale - base.scale * 1.5).abs() < 1e-12);

        // Mixture mean is preserved
        let mixture_mean = base.weight * base.mean + spike.weight * spike.mean;
        assert!((mixture_mean - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_boom_is_single_component() {
        let dist = PointDistribution::new(14.0, 5.0, Some(6.0))
            .with_boom(BoomMixture { weight: 0.3, shift: 0.0, ..Default::default() });
        assert_eq!(dist.components().len(), 1);
    }

    #[test]
    fn test_samples_are_non_negative_and_centred() {
        let dist = PointDistribution::new(6.0, 5.0, Some(3.8));
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let samples = dist.sample(20_000, &mut rng);
        assert!(samples.iter().all(|x| *x >= 0.0));

        let unclamped = PointDistribution::new(40.0, 5.0, Some(6.0));
        let samples = unclamped.sample(20_000, &mut rng);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 40.0).abs() < 0.2, "{mean}");
    }

    #[test]
    fn test_percentile_monotone() {
        let dist = PointDistribution::new(18.0, 7.0, Some(6.0));
        let p10 = dist.percentile(0.1);
        let p50 = dist.percentile(0.5);
        let p90 = dist.percentile(0.9);
        assert!(p10 < p50 && p50 < p90);
        assert!((p50 - 18.0).abs() < 0.01);
    }
}
