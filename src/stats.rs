//! Descriptive statistics for simulated samples.
//!
//! Every function here is total: an empty or too-short sample yields a
//! defined fallback (0) instead of an error, because the widgets call them
//! on accumulators that start empty.
//!
//! # Conventions
//!
//! - **Variance**: [`variance`] is the *population* variance (÷n) and is the
//!   default everywhere a sample is being described. [`sample_variance`]
//!   (÷(n−1)) is used only where σ is estimated from the data to build an
//!   interval (see `confidence::measurement_interval`).
//! - **Skewness / kurtosis**: population standardized moments (÷n), no bias
//!   correction.
//! - **Quartiles**: linear interpolation at index `p/100 × (n − 1)`.
//! - **Mean**: Neumaier compensated summation.

use serde::Serialize;

/// Computes the arithmetic mean using compensated summation.
///
/// # Returns
/// `0.0` for an empty sample.
///
/// # Examples
/// ```
/// use u_probsim::stats::mean;
/// assert!((mean(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 3.0).abs() < 1e-15);
/// assert_eq!(mean(&[]), 0.0);
/// ```
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    kahan_sum(data) / data.len() as f64
}

/// Population variance (denominator `n`).
///
/// # Returns
/// `0.0` for an empty sample.
///
/// # Examples
/// ```
/// use u_probsim::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v) - 4.0).abs() < 1e-12);
/// ```
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    sum_squared_deviations(data) / data.len() as f64
}

/// Sample variance with Bessel's correction (denominator `n − 1`).
///
/// # Returns
/// `0.0` when fewer than 2 observations are given.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    sum_squared_deviations(data) / (data.len() - 1) as f64
}

/// Population standard deviation, `sqrt(variance(data))`.
pub fn standard_deviation(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Sample standard deviation, `sqrt(sample_variance(data))`.
pub fn sample_standard_deviation(data: &[f64]) -> f64 {
    sample_variance(data).sqrt()
}

/// Standard error of the mean, `σ / √n`.
///
/// `n` is a count of observations; callers validate it is at least 1.
///
/// # Examples
/// ```
/// use u_probsim::stats::standard_error;
/// assert!((standard_error(10.0, 25) - 2.0).abs() < 1e-15);
/// ```
pub fn standard_error(sigma: f64, n: usize) -> f64 {
    sigma / (n as f64).sqrt()
}

/// Population skewness: third standardized moment `m₃ / m₂^{3/2}`.
///
/// Positive for a long right tail, negative for a long left tail.
///
/// # Returns
/// `0.0` if `data.len() < 3` or the sample has zero spread.
///
/// # Examples
/// ```
/// use u_probsim::stats::skewness;
/// assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-14);
/// assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 50.0]) > 0.0);
/// ```
pub fn skewness(data: &[f64]) -> f64 {
    if data.len() < 3 {
        return 0.0;
    }
    let m = CentralMoments::of(data);
    if m.m2 == 0.0 {
        return 0.0;
    }
    m.m3 / m.m2.powf(1.5)
}

/// Population excess kurtosis: `m₄ / m₂² − 3`.
///
/// 0 for a normal distribution, positive for heavy tails, negative for
/// light tails.
///
/// # Returns
/// `0.0` if `data.len() < 4` or the sample has zero spread.
pub fn excess_kurtosis(data: &[f64]) -> f64 {
    if data.len() < 4 {
        return 0.0;
    }
    let m = CentralMoments::of(data);
    if m.m2 == 0.0 {
        return 0.0;
    }
    m.m4 / (m.m2 * m.m2) - 3.0
}

/// Returns `(min, max)` of the sample, or `None` if it is empty.
pub fn range(data: &[f64]) -> Option<(f64, f64)> {
    let first = *data.first()?;
    Some(data.iter().fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))))
}

// ---------------------------------------------------------------------------
// Quartiles
// ---------------------------------------------------------------------------

/// First quartile, median and third quartile of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Interquartile range `q3 − q1`.
    pub iqr: f64,
}

/// Computes Q1, median and Q3 by linear interpolation.
///
/// # Algorithm
/// For sorted data `x[0..n]` and percentile `p`:
/// 1. `h = p/100 × (n − 1)`
/// 2. `lo = ⌊h⌋`, `hi = ⌈h⌉`, `w = h − lo`
/// 3. `x[lo] × (1 − w) + x[hi] × w`
///
/// # Returns
/// All zeros for an empty sample.
///
/// # Examples
/// ```
/// use u_probsim::stats::quartiles;
/// let q = quartiles(&[1.0, 2.0, 3.0, 4.0]);
/// assert!((q.q1 - 1.75).abs() < 1e-15);
/// assert!((q.median - 2.5).abs() < 1e-15);
/// assert!((q.q3 - 3.25).abs() < 1e-15);
/// ```
pub fn quartiles(data: &[f64]) -> Quartiles {
    if data.is_empty() {
        return Quartiles {
            q1: 0.0,
            median: 0.0,
            q3: 0.0,
            iqr: 0.0,
        };
    }
    let sorted = sorted_copy(data);
    let q1 = percentile_sorted(&sorted, 25.0);
    let median = percentile_sorted(&sorted, 50.0);
    let q3 = percentile_sorted(&sorted, 75.0);
    Quartiles {
        q1,
        median,
        q3,
        iqr: q3 - q1,
    }
}

/// Percentile `p ∈ [0, 100]` of **pre-sorted**, non-empty data.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let index = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    sorted
}

// ---------------------------------------------------------------------------
// Normality assessment
// ---------------------------------------------------------------------------

/// Dominant shape of a sample relative to a normal distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalityShape {
    ApproximatelyNormal,
    RightSkewed,
    LeftSkewed,
    HeavyTails,
    LightTails,
}

impl NormalityShape {
    /// Message shown by the widgets.
    pub fn message(self) -> &'static str {
        match self {
            NormalityShape::ApproximatelyNormal => {
                "La distribuzione appare approssimativamente normale"
            }
            NormalityShape::RightSkewed => "Distribuzione asimmetrica a destra",
            NormalityShape::LeftSkewed => "Distribuzione asimmetrica a sinistra",
            NormalityShape::HeavyTails => "Code più pesanti della normale",
            NormalityShape::LightTails => "Code più leggere della normale",
        }
    }
}

/// Result of [`assess_normality`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalityAssessment {
    pub is_normal: bool,
    pub skewness: f64,
    pub kurtosis: f64,
    pub shape: NormalityShape,
}

impl NormalityAssessment {
    pub fn message(&self) -> &'static str {
        self.shape.message()
    }
}

/// |skewness| threshold below which a sample counts as symmetric.
pub const SKEWNESS_THRESHOLD: f64 = 0.5;
/// |excess kurtosis| threshold below which tails count as normal.
pub const KURTOSIS_THRESHOLD: f64 = 1.0;

/// Classifies a sample as approximately normal or reports its dominant
/// deviation.
///
/// Normal iff `|skewness| < 0.5` and `|excess kurtosis| < 1`. Otherwise
/// skew is reported before tail weight.
pub fn assess_normality(data: &[f64]) -> NormalityAssessment {
    let skew = skewness(data);
    let kurt = excess_kurtosis(data);
    let shape = if skew.abs() < SKEWNESS_THRESHOLD && kurt.abs() < KURTOSIS_THRESHOLD {
        NormalityShape::ApproximatelyNormal
    } else if skew.abs() >= SKEWNESS_THRESHOLD {
        if skew > 0.0 {
            NormalityShape::RightSkewed
        } else {
            NormalityShape::LeftSkewed
        }
    } else if kurt > 0.0 {
        NormalityShape::HeavyTails
    } else {
        NormalityShape::LightTails
    };
    NormalityAssessment {
        is_normal: shape == NormalityShape::ApproximatelyNormal,
        skewness: skew,
        kurtosis: kurt,
        shape,
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Complete descriptive summary of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveSummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Computes every descriptive statistic at once. All zeros for an empty
/// sample.
pub fn describe(data: &[f64]) -> DescriptiveSummary {
    let Some((min, max)) = range(data) else {
        return DescriptiveSummary {
            n: 0,
            mean: 0.0,
            median: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
        };
    };
    DescriptiveSummary {
        n: data.len(),
        mean: mean(data),
        median: quartiles(data).median,
        std: standard_deviation(data),
        min,
        max,
        skewness: skewness(data),
        kurtosis: excess_kurtosis(data),
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Biased central moments m₂, m₃, m₄ (denominator n).
struct CentralMoments {
    m2: f64,
    m3: f64,
    m4: f64,
}

impl CentralMoments {
    /// Two-pass: mean first, then all central moments in one sweep.
    fn of(data: &[f64]) -> Self {
        let nf = data.len() as f64;
        let m = mean(data);
        let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
        for &x in data {
            let d = x - m;
            let d2 = d * d;
            s2 += d2;
            s3 += d2 * d;
            s4 += d2 * d2;
        }
        Self {
            m2: s2 / nf,
            m3: s3 / nf,
            m4: s4 / nf,
        }
    }
}

fn sum_squared_deviations(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|&x| (x - m) * (x - m)).sum()
}

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Streaming accumulator for mean, variance, skewness and kurtosis.
///
/// Uses the same population conventions as the batch functions, so a CLT
/// run can report statistics of its accumulated means after every tick
/// without rescanning them.
///
/// # Algorithm
/// Maintains central moment sums M₂, M₃, M₄ incrementally. The update
/// order (M₄ → M₃ → M₂) matters since each uses the *previous* values of
/// lower moments.
///
/// References:
/// - Welford (1962), *Technometrics* 4(3), pp. 419–420.
/// - Pébay (2008), Sandia Report SAND2008-6212.
///
/// # Examples
/// ```
/// use u_probsim::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean() - 5.0).abs() < 1e-15);
/// assert!((acc.variance() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl WelfordAccumulator {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a new observation into the accumulator.
    pub fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;

        if n1 == 0 {
            self.mean_acc = value;
            return;
        }

        let n = self.count as f64;
        let delta = value - self.mean_acc;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1 as f64;

        // M₄ before M₃ before M₂
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.mean_acc += delta_n;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean_acc
        }
    }

    /// Running population variance, 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Population skewness `√n · M₃ / M₂^{3/2}`; 0 below 3 observations or
    /// with zero spread.
    pub fn skewness(&self) -> f64 {
        if self.count < 3 || self.m2 == 0.0 {
            return 0.0;
        }
        (self.count as f64).sqrt() * self.m3 / self.m2.powf(1.5)
    }

    /// Population excess kurtosis `n · M₄ / M₂² − 3`; 0 below 4
    /// observations or with zero spread.
    pub fn excess_kurtosis(&self) -> f64 {
        if self.count < 4 || self.m2 == 0.0 {
            return 0.0;
        }
        self.count as f64 * self.m4 / (self.m2 * self.m2) - 3.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
