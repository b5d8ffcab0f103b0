//! Population distributions.
//!
//! Parametric distributions with analytical moments, plus the closed set
//! of teaching populations sampled by the Central Limit Theorem widget.
//!
//! # Teaching Populations
//!
//! | Population | Generator | Mean | Std Dev |
//! |---|---|---|---|
//! | [`Population::Dice`] | ⌊6u⌋ + 1 | 3.5 | √(35/12) |
//! | [`Population::Bimodal`] | ½ N(120, 10) + ½ N(170, 10) | 145 | √(10² + 25²) |
//! | [`Population::Exponential`] | −ln(u) · 5 | 5 | 5 |
//! | [`Population::Skewed`] | exp(N(10.3, 0.7)) | exp(μ+σ²/2) | see [`LogNormal`] |
//!
//! The declared moments are derived from the generator parameters, never
//! typed in separately, so the overlay curve always matches what the
//! generator actually produces.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_sample_size, Result, SimError};
use crate::random;
use crate::special;

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal (Gaussian) distribution N(μ, σ²).
///
/// # Mathematical Definition
/// - PDF: φ(x) = (1/(σ√(2π))) exp(−(x−μ)²/(2σ²))
/// - CDF: Φ((x−μ)/σ)
/// - Mean: μ
/// - Variance: σ²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns `Err` if `sigma ≤ 0` or parameters are not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
            return Err(SimError::InvalidParameters(format!(
                "Normal requires finite μ and σ > 0, got μ={mu}, σ={sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    pub fn pdf(&self, x: f64) -> f64 {
        special::normal_pdf(x, self.mu, self.sigma)
    }

    /// Draws one value (Box-Muller).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        random::normal(rng, self.mu, self.sigma)
    }

    /// Draws `n ≥ 1` independent values.
    pub fn sample_n<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        check_sample_size(n, 1)?;
        Ok((0..n).map(|_| self.sample(rng)).collect())
    }
}

// ============================================================================
// LogNormal Distribution
// ============================================================================

/// Log-normal distribution: if X ~ LogNormal(μ, σ), then ln(X) ~ N(μ, σ²).
///
/// # Mathematical Definition
/// - Mean: exp(μ + σ²/2)
/// - Variance: (exp(σ²) − 1) · exp(2μ + σ²)
///
/// Reference: Johnson, Kotz & Balakrishnan (1994), *Continuous Univariate
/// Distributions*, Vol. 1, Chapter 14.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormal {
    mu: f64,
    sigma: f64,
}

impl LogNormal {
    /// Creates a new log-normal distribution. `mu` and `sigma` are the
    /// mean and std dev of ln(X).
    ///
    /// # Errors
    /// Returns `Err` if `sigma ≤ 0` or parameters are not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
            return Err(SimError::InvalidParameters(format!(
                "LogNormal requires finite μ and σ > 0, got μ={mu}, σ={sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    /// Mean = exp(μ + σ²/2).
    pub fn mean(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }

    /// Variance = (exp(σ²) − 1) · exp(2μ + σ²).
    pub fn variance(&self) -> f64 {
        let s2 = self.sigma * self.sigma;
        (s2.exp() - 1.0) * (2.0 * self.mu + s2).exp()
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// PDF for x > 0.
    pub fn pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        special::normal_pdf(x.ln(), self.mu, self.sigma) / x
    }

    /// Draws one value as `exp(N(μ, σ))`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        random::normal(rng, self.mu, self.sigma).exp()
    }
}

// ============================================================================
// Teaching populations
// ============================================================================

const BIMODAL_LOW: f64 = 120.0;
const BIMODAL_HIGH: f64 = 170.0;
const BIMODAL_SIGMA: f64 = 10.0;
const EXPONENTIAL_MEAN: f64 = 5.0;
const INCOME: LogNormal = LogNormal {
    mu: 10.3,
    sigma: 0.7,
};

/// Population shapes offered by the Central Limit Theorem widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    /// Fair six-sided die: every face equally likely.
    #[serde(rename = "uniform")]
    Dice,
    /// Two distinct groups, e.g. heights of children and adults.
    Bimodal,
    /// Waiting times with a long right tail.
    Exponential,
    /// Incomes: many modest, a few very large.
    Skewed,
}

impl Population {
    pub const ALL: [Population; 4] = [
        Population::Dice,
        Population::Bimodal,
        Population::Exponential,
        Population::Skewed,
    ];

    /// Stable identifier used by the widgets.
    pub fn id(self) -> &'static str {
        match self {
            Population::Dice => "uniform",
            Population::Bimodal => "bimodal",
            Population::Exponential => "exponential",
            Population::Skewed => "skewed",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Population::Dice => "Uniforme",
            Population::Bimodal => "Bimodale",
            Population::Exponential => "Esponenziale",
            Population::Skewed => "Fortemente Asimmetrica",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Population::Dice => "Dado a 6 facce: tutti gli esiti equiprobabili",
            Population::Bimodal => "Due gruppi distinti (es. altezze bambini + adulti)",
            Population::Exponential => "Tempi di attesa: coda lunga a destra",
            Population::Skewed => "Distribuzione redditi: pochi ricchissimi, molti poveri",
        }
    }

    /// True population mean μ.
    pub fn mean(self) -> f64 {
        match self {
            Population::Dice => 3.5,
            Population::Bimodal => (BIMODAL_LOW + BIMODAL_HIGH) / 2.0,
            Population::Exponential => EXPONENTIAL_MEAN,
            Population::Skewed => INCOME.mean(),
        }
    }

    /// True population standard deviation σ.
    pub fn std_dev(self) -> f64 {
        match self {
            // Var = (6² − 1) / 12
            Population::Dice => (35.0_f64 / 12.0).sqrt(),
            // Within-component variance plus between-component spread
            Population::Bimodal => {
                let half_gap = (BIMODAL_HIGH - BIMODAL_LOW) / 2.0;
                (BIMODAL_SIGMA * BIMODAL_SIGMA + half_gap * half_gap).sqrt()
            }
            Population::Exponential => EXPONENTIAL_MEAN,
            Population::Skewed => INCOME.std_dev(),
        }
    }

    /// Draws a single observation.
    pub fn sample<R: Rng>(self, rng: &mut R) -> f64 {
        match self {
            Population::Dice => (random::uniform01(rng) * 6.0).floor() + 1.0,
            Population::Bimodal => {
                let center = if random::bernoulli(rng, 0.5) {
                    BIMODAL_LOW
                } else {
                    BIMODAL_HIGH
                };
                random::normal(rng, center, BIMODAL_SIGMA)
            }
            Population::Exponential => random::exponential(rng, EXPONENTIAL_MEAN),
            Population::Skewed => INCOME.sample(rng),
        }
    }

    /// Draws an independent sample of size `n`.
    ///
    /// # Errors
    /// `InvalidSampleSize` if `n == 0`.
    pub fn generate<R: Rng>(self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        check_sample_size(n, 1)?;
        Ok((0..n).map(|_| self.sample(rng)).collect())
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Population {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        Population::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| SimError::InvalidParameters(format!("unknown population `{s}`")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::stats;

    // --- Normal ---

    #[test]
    fn test_normal_pdf() {
        let n = Normal::new(10.0, 2.0).unwrap();
        assert!((n.pdf(10.0) - 0.3989422804014327 / 2.0).abs() < 1e-15);
        assert!((n.variance() - 4.0).abs() < 1e-15);
    }

    #[test]
    fn test_normal_invalid() {
        assert!(Normal::new(0.0, 0.0).is_err());
        assert!(Normal::new(0.0, -1.0).is_err());
        assert!(Normal::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_normal_sample_n() {
        let n = Normal::new(170.0, 10.0).unwrap();
        let mut rng = create_rng(5);
        assert_eq!(n.sample_n(30, &mut rng).unwrap().len(), 30);
        assert!(matches!(
            n.sample_n(0, &mut rng),
            Err(SimError::InvalidSampleSize { got: 0, min: 1 })
        ));
    }

    // --- LogNormal ---

    #[test]
    fn test_lognormal_moments() {
        let ln = LogNormal::new(0.0, 1.0).unwrap();
        assert!((ln.mean() - 0.5_f64.exp()).abs() < 1e-12);
        let expected_var = (1.0_f64.exp() - 1.0) * 1.0_f64.exp();
        assert!((ln.variance() - expected_var).abs() < 1e-12);
        assert_eq!(ln.pdf(0.0), 0.0);
        assert!(LogNormal::new(0.0, 0.0).is_err());
    }

    // --- Population ---

    #[test]
    fn test_declared_moments() {
        assert_eq!(Population::Dice.mean(), 3.5);
        assert!((Population::Dice.std_dev() - 1.7078).abs() < 1e-4);
        assert_eq!(Population::Bimodal.mean(), 145.0);
        assert!((Population::Bimodal.std_dev() - 725.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(Population::Exponential.std_dev(), 5.0);
        assert!((Population::Skewed.mean() - 37_987.0).abs() < 50.0);
    }

    #[test]
    fn test_dice_faces() {
        let mut rng = create_rng(42);
        let rolls = Population::Dice.generate(6000, &mut rng).unwrap();
        for face in 1..=6 {
            let count = rolls.iter().filter(|&&r| r == face as f64).count();
            assert!((800..1200).contains(&count), "face {face} appeared {count} times");
        }
        assert!(rolls.iter().all(|&r| (1.0..=6.0).contains(&r) && r.fract() == 0.0));
    }

    #[test]
    fn test_generators_match_declared_moments() {
        let mut rng = create_rng(2024);
        for pop in Population::ALL {
            let data = pop.generate(200_000, &mut rng).unwrap();
            let m = stats::mean(&data);
            let sd = stats::standard_deviation(&data);
            assert!(
                (m - pop.mean()).abs() < 0.02 * pop.mean(),
                "{pop}: mean {m} vs declared {}",
                pop.mean()
            );
            assert!(
                (sd - pop.std_dev()).abs() < 0.05 * pop.std_dev(),
                "{pop}: std {sd} vs declared {}",
                pop.std_dev()
            );
        }
    }

    #[test]
    fn test_generate_zero_rejected() {
        let mut rng = create_rng(0);
        assert!(Population::Bimodal.generate(0, &mut rng).is_err());
    }

    #[test]
    fn test_population_ids_roundtrip() {
        for pop in Population::ALL {
            assert_eq!(pop.id().parse::<Population>().unwrap(), pop);
        }
        assert!("gaussian".parse::<Population>().is_err());
    }

    #[test]
    fn test_population_serde_ids() {
        let json = serde_json::to_string(&Population::Dice).unwrap();
        assert_eq!(json, "\"uniform\"");
        let p: Population = serde_json::from_str("\"skewed\"").unwrap();
        assert_eq!(p, Population::Skewed);
    }
}
