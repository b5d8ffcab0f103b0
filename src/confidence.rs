//! Confidence intervals for a mean with known σ.
//!
//! Intervals are z-intervals `x̄ ± z · σ/√n`. The repeated-sampling
//! simulation draws many independent samples ("researchers"), builds one
//! interval per sample and records whether it captured the true mean; the
//! long-run capture rate approaches the confidence level.
//!
//! # Reproducibility
//!
//! [`simulate_multiple_sampling`] and [`SamplingStudy`] consume the RNG in
//! the same order, so a seeded study yields identical results whether it is
//! collected at once or pulled in chunks.

use std::fmt;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::ConfidenceConfig;
use crate::distributions::Normal;
use crate::error::{check_probability, check_sample_size, check_std_dev, Result, SimError};
use crate::random;
use crate::stats;

// ============================================================================
// Confidence levels
// ============================================================================

/// A supported two-sided confidence level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ConfidenceLevel {
    P80,
    P85,
    P90,
    #[default]
    P95,
    P99,
    P99_5,
    P99_9,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 7] = [
        ConfidenceLevel::P80,
        ConfidenceLevel::P85,
        ConfidenceLevel::P90,
        ConfidenceLevel::P95,
        ConfidenceLevel::P99,
        ConfidenceLevel::P99_5,
        ConfidenceLevel::P99_9,
    ];

    /// The level in percent, e.g. `95.0`.
    pub fn percent(self) -> f64 {
        match self {
            ConfidenceLevel::P80 => 80.0,
            ConfidenceLevel::P85 => 85.0,
            ConfidenceLevel::P90 => 90.0,
            ConfidenceLevel::P95 => 95.0,
            ConfidenceLevel::P99 => 99.0,
            ConfidenceLevel::P99_5 => 99.5,
            ConfidenceLevel::P99_9 => 99.9,
        }
    }

    /// Two-sided critical value z such that P(|Z| ≤ z) equals the level.
    pub fn z(self) -> f64 {
        match self {
            ConfidenceLevel::P80 => 1.282,
            ConfidenceLevel::P85 => 1.440,
            ConfidenceLevel::P90 => 1.645,
            ConfidenceLevel::P95 => 1.960,
            ConfidenceLevel::P99 => 2.576,
            ConfidenceLevel::P99_5 => 2.807,
            ConfidenceLevel::P99_9 => 3.291,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = SimError;

    fn try_from(percent: f64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.percent() - percent).abs() < 1e-9)
            .ok_or(SimError::UnsupportedConfidenceLevel(percent))
    }
}

/// Looks up the critical value for a level given in percent.
///
/// # Errors
/// `UnsupportedConfidenceLevel` if `percent` is not one of
/// 80, 85, 90, 95, 99, 99.5, 99.9.
///
/// # Examples
/// ```
/// use u_probsim::confidence::z_value;
/// assert_eq!(z_value(95.0).unwrap(), 1.960);
/// assert!(z_value(97.0).is_err());
/// ```
pub fn z_value(percent: f64) -> Result<f64> {
    ConfidenceLevel::try_from(percent).map(ConfidenceLevel::z)
}

// ============================================================================
// Intervals
// ============================================================================

/// A symmetric interval around a sample statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: ConfidenceLevel,
    /// The statistic the interval is centered on.
    pub center: f64,
}

impl ConfidenceInterval {
    fn around(center: f64, margin: f64, level: ConfidenceLevel) -> Self {
        Self {
            lower: center - margin,
            upper: center + margin,
            level,
            center,
        }
    }

    /// `true` if `lower ≤ value ≤ upper`.
    pub fn captures(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Half-width.
    pub fn margin(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// Margin of error `z × σ/√n`.
///
/// # Errors
/// `InvalidSampleSize` if `n == 0`; `InvalidParameters` if `sigma` is
/// negative or not finite.
pub fn margin_of_error(sigma: f64, n: usize, level: ConfidenceLevel) -> Result<f64> {
    check_sample_size(n, 1)?;
    check_std_dev(sigma)?;
    Ok(level.z() * stats::standard_error(sigma, n))
}

/// z-interval for the mean, assuming the population σ is known.
///
/// # Examples
/// ```
/// use u_probsim::confidence::{confidence_interval, ConfidenceLevel};
/// let ci = confidence_interval(170.0, 10.0, 25, ConfidenceLevel::P95).unwrap();
/// assert!((ci.lower - 166.08).abs() < 1e-9);
/// assert!((ci.upper - 173.92).abs() < 1e-9);
/// ```
pub fn confidence_interval(
    sample_mean: f64,
    sigma: f64,
    n: usize,
    level: ConfidenceLevel,
) -> Result<ConfidenceInterval> {
    let margin = margin_of_error(sigma, n, level)?;
    Ok(ConfidenceInterval::around(sample_mean, margin, level))
}

/// Interval for a measured quantity with unknown σ: `x̄ ± z · s/√n`, where
/// `s` is the sample standard deviation (divisor n − 1).
///
/// # Errors
/// `InvalidSampleSize` if fewer than two measurements are given.
pub fn measurement_interval(sample: &[f64], level: ConfidenceLevel) -> Result<ConfidenceInterval> {
    check_sample_size(sample.len(), 2)?;
    let s = stats::sample_standard_deviation(sample);
    let margin = level.z() * stats::standard_error(s, sample.len());
    Ok(ConfidenceInterval::around(stats::mean(sample), margin, level))
}

/// Wald interval for a proportion, clamped to `[0, 1]`.
///
/// # Errors
/// `InvalidSampleSize` if `n == 0`; `InvalidParameters` if
/// `successes > n`.
pub fn proportion_interval(
    successes: usize,
    n: usize,
    level: ConfidenceLevel,
) -> Result<ConfidenceInterval> {
    check_sample_size(n, 1)?;
    if successes > n {
        return Err(SimError::InvalidParameters(format!(
            "{successes} successes out of {n} trials"
        )));
    }
    let p_hat = successes as f64 / n as f64;
    let margin = level.z() * (p_hat * (1.0 - p_hat) / n as f64).sqrt();
    Ok(ConfidenceInterval {
        lower: (p_hat - margin).max(0.0),
        upper: (p_hat + margin).min(1.0),
        level,
        center: p_hat,
    })
}

/// Number of successes in `n` Bernoulli(`p`) trials.
///
/// # Errors
/// `InvalidProbability` if `p` is outside `[0, 1]`.
pub fn simulate_binomial<R: Rng>(p: f64, n: usize, rng: &mut R) -> Result<usize> {
    check_probability("p", p)?;
    Ok((0..n).filter(|_| random::bernoulli(rng, p)).count())
}

// ============================================================================
// Repeated sampling
// ============================================================================

/// One researcher's outcome: their sample mean, interval and whether the
/// interval captured the true mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingResult {
    pub interval: ConfidenceInterval,
    pub captured: bool,
    pub sample_mean: f64,
}

/// Lazy repeated-sampling study.
///
/// Each call to `next` draws one fresh sample of size `n` from
/// N(`mu`, `sigma`), builds its interval and tests capture against `mu`.
/// The iterator ends after `count` researchers.
pub struct SamplingStudy<R> {
    population: Normal,
    n: usize,
    level: ConfidenceLevel,
    margin: f64,
    remaining: usize,
    rng: R,
}

impl<R: Rng> SamplingStudy<R> {
    /// # Errors
    /// `InvalidParameters` for a non-finite `mu` or `sigma ≤ 0`;
    /// `InvalidSampleSize` if `n == 0`.
    pub fn new(
        mu: f64,
        sigma: f64,
        n: usize,
        level: ConfidenceLevel,
        count: usize,
        rng: R,
    ) -> Result<Self> {
        let population = Normal::new(mu, sigma)?;
        let margin = margin_of_error(sigma, n, level)?;
        Ok(Self {
            population,
            n,
            level,
            margin,
            remaining: count,
            rng,
        })
    }

    /// A study at the configured level with the configured number of
    /// researchers.
    ///
    /// # Errors
    /// As [`SamplingStudy::new`], plus `UnsupportedConfidenceLevel`.
    pub fn from_config(
        config: &ConfidenceConfig,
        mu: f64,
        sigma: f64,
        n: usize,
        rng: R,
    ) -> Result<Self> {
        let level = config.confidence_level()?;
        Self::new(mu, sigma, n, level, config.researchers, rng)
    }

    /// Researchers not yet drawn.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<R: Rng> Iterator for SamplingStudy<R> {
    type Item = SamplingResult;

    fn next(&mut self) -> Option<SamplingResult> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut sum = 0.0;
        for _ in 0..self.n {
            sum += self.population.sample(&mut self.rng);
        }
        let sample_mean = sum / self.n as f64;
        let interval = ConfidenceInterval::around(sample_mean, self.margin, self.level);
        Some(SamplingResult {
            interval,
            captured: interval.captures(self.population.mu()),
            sample_mean,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for SamplingStudy<R> {}

/// Runs `count` independent researchers and returns their results in draw
/// order.
///
/// # Errors
/// Same as [`SamplingStudy::new`].
///
/// # Examples
/// ```
/// use u_probsim::confidence::{capture_rate, simulate_multiple_sampling, ConfidenceLevel};
/// use u_probsim::random::create_rng;
/// let mut rng = create_rng(1);
/// let runs = simulate_multiple_sampling(170.0, 10.0, 25, ConfidenceLevel::P95, 500, &mut rng).unwrap();
/// assert_eq!(runs.len(), 500);
/// assert!(capture_rate(&runs) > 0.9);
/// ```
pub fn simulate_multiple_sampling<R: Rng>(
    mu: f64,
    sigma: f64,
    n: usize,
    level: ConfidenceLevel,
    count: usize,
    rng: &mut R,
) -> Result<Vec<SamplingResult>> {
    let results: Vec<SamplingResult> =
        SamplingStudy::new(mu, sigma, n, level, count, rng)?.collect();
    debug!(
        count,
        n,
        level = level.percent(),
        capture_rate = capture_rate(&results),
        "repeated sampling finished"
    );
    Ok(results)
}

/// Fraction of results whose interval captured the true mean. `0.0` when
/// `results` is empty.
pub fn capture_rate(results: &[SamplingResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().filter(|r| r.captured).count() as f64 / results.len() as f64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::special;

    #[test]
    fn test_z_table() {
        assert_eq!(z_value(80.0), Ok(1.282));
        assert_eq!(z_value(99.5), Ok(2.807));
        assert_eq!(z_value(99.9), Ok(3.291));
        assert_eq!(z_value(97.0), Err(SimError::UnsupportedConfidenceLevel(97.0)));
        assert!(z_value(f64::NAN).is_err());
    }

    #[test]
    fn test_z_table_matches_normal_quantiles() {
        for level in ConfidenceLevel::ALL {
            let analytic = special::two_sided_critical_value(level.percent());
            assert!(
                (analytic - level.z()).abs() < 0.01,
                "{level}: table {} vs analytic {analytic}",
                level.z()
            );
        }
    }

    #[test]
    fn test_level_roundtrip() {
        for level in ConfidenceLevel::ALL {
            assert_eq!(ConfidenceLevel::try_from(level.percent()), Ok(level));
        }
        assert_eq!(ConfidenceLevel::default(), ConfidenceLevel::P95);
        assert_eq!(ConfidenceLevel::P99_5.to_string(), "99.5%");
    }

    #[test]
    fn test_interval_symmetric() {
        let ci = confidence_interval(50.0, 8.0, 16, ConfidenceLevel::P90).unwrap();
        assert!((ci.center - 50.0).abs() < 1e-12);
        assert!((ci.margin() - 1.645 * 2.0).abs() < 1e-12);
        assert!((ci.upper - ci.center - (ci.center - ci.lower)).abs() < 1e-12);
        assert!((ci.width() - 2.0 * ci.margin()).abs() < 1e-12);
    }

    #[test]
    fn test_captures_is_inclusive() {
        let ci = confidence_interval(0.0, 1.0, 1, ConfidenceLevel::P95).unwrap();
        assert!(ci.captures(ci.lower));
        assert!(ci.captures(ci.upper));
        assert!(!ci.captures(ci.upper + 1e-9));
    }

    #[test]
    fn test_zero_n_rejected() {
        assert!(matches!(
            margin_of_error(1.0, 0, ConfidenceLevel::P95),
            Err(SimError::InvalidSampleSize { got: 0, min: 1 })
        ));
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        assert!(matches!(
            confidence_interval(50.0, -10.0, 25, ConfidenceLevel::P95),
            Err(SimError::InvalidParameters(_))
        ));
        assert!(confidence_interval(50.0, f64::NAN, 25, ConfidenceLevel::P95).is_err());
        assert!(margin_of_error(f64::INFINITY, 25, ConfidenceLevel::P95).is_err());

        let ci = confidence_interval(50.0, 0.0, 25, ConfidenceLevel::P95).unwrap();
        assert_eq!((ci.lower, ci.upper), (50.0, 50.0));
    }

    #[test]
    fn test_margin_monotone_in_level() {
        let margins: Vec<f64> = ConfidenceLevel::ALL
            .iter()
            .map(|&l| margin_of_error(10.0, 30, l).unwrap())
            .collect();
        assert!(margins.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_coverage_95() {
        let mut rng = create_rng(2025);
        let runs =
            simulate_multiple_sampling(170.0, 10.0, 30, ConfidenceLevel::P95, 10_000, &mut rng)
                .unwrap();
        assert_eq!(runs.len(), 10_000);
        let rate = capture_rate(&runs);
        assert!((0.92..=0.98).contains(&rate), "capture rate {rate}");
    }

    #[test]
    fn test_coverage_80() {
        let mut rng = create_rng(8);
        let runs =
            simulate_multiple_sampling(0.0, 1.0, 10, ConfidenceLevel::P80, 10_000, &mut rng)
                .unwrap();
        let rate = capture_rate(&runs);
        assert!((0.77..=0.83).contains(&rate), "capture rate {rate}");
    }

    #[test]
    fn test_captured_flag_consistent() {
        let mut rng = create_rng(5);
        let runs =
            simulate_multiple_sampling(10.0, 3.0, 5, ConfidenceLevel::P90, 300, &mut rng).unwrap();
        for r in &runs {
            assert_eq!(r.captured, r.interval.lower <= 10.0 && 10.0 <= r.interval.upper);
            assert_eq!(r.interval.center, r.sample_mean);
        }
    }

    #[test]
    fn test_study_matches_batch() {
        let batch = simulate_multiple_sampling(
            5.0,
            2.0,
            12,
            ConfidenceLevel::P99,
            40,
            &mut create_rng(99),
        )
        .unwrap();
        let mut study =
            SamplingStudy::new(5.0, 2.0, 12, ConfidenceLevel::P99, 40, create_rng(99)).unwrap();
        assert_eq!(study.len(), 40);
        let mut chunked: Vec<SamplingResult> = study.by_ref().take(15).collect();
        assert_eq!(study.remaining(), 25);
        chunked.extend(study);
        assert_eq!(batch, chunked);
    }

    #[test]
    fn test_study_from_config() {
        let config = ConfidenceConfig {
            level: 99.0,
            researchers: 25,
        };
        let study = SamplingStudy::from_config(&config, 170.0, 10.0, 30, create_rng(3)).unwrap();
        assert_eq!(study.remaining(), 25);
        let results: Vec<_> = study.collect();
        assert_eq!(results.len(), 25);
        assert!(results.iter().all(|r| r.interval.level == ConfidenceLevel::P99));

        let config = ConfidenceConfig {
            level: 97.0,
            researchers: 25,
        };
        assert!(matches!(
            SamplingStudy::from_config(&config, 170.0, 10.0, 30, create_rng(3)),
            Err(SimError::UnsupportedConfidenceLevel(_))
        ));
    }

    #[test]
    fn test_empty_capture_rate() {
        assert_eq!(capture_rate(&[]), 0.0);
        let runs =
            simulate_multiple_sampling(0.0, 1.0, 5, ConfidenceLevel::P95, 0, &mut create_rng(1))
                .unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn test_measurement_interval() {
        let readings = [101.0, 99.0, 100.5, 99.5, 100.0];
        let ci = measurement_interval(&readings, ConfidenceLevel::P95).unwrap();
        let s = stats::sample_standard_deviation(&readings);
        assert!((ci.center - 100.0).abs() < 1e-12);
        assert!((ci.margin() - 1.96 * s / 5_f64.sqrt()).abs() < 1e-12);
        assert!(measurement_interval(&[1.0], ConfidenceLevel::P95).is_err());
    }

    #[test]
    fn test_proportion_interval_clamped() {
        let ci = proportion_interval(1, 20, ConfidenceLevel::P99).unwrap();
        assert_eq!(ci.lower, 0.0);
        assert!((ci.center - 0.05).abs() < 1e-12);
        let all = proportion_interval(20, 20, ConfidenceLevel::P95).unwrap();
        assert_eq!(all.upper, 1.0);
        assert!(proportion_interval(21, 20, ConfidenceLevel::P95).is_err());
        assert!(proportion_interval(0, 0, ConfidenceLevel::P95).is_err());
    }

    #[test]
    fn test_binomial_rate() {
        let mut rng = create_rng(13);
        let k = simulate_binomial(0.25, 40_000, &mut rng).unwrap();
        assert!(((k as f64 / 40_000.0) - 0.25).abs() < 0.01);
        assert!(simulate_binomial(1.5, 10, &mut rng).is_err());
    }
}
