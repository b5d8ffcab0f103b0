//! Equal-width histograms with an optional normal overlay.
//!
//! The bins of [`create_histogram`] always cover exactly `[min, max]` of the
//! data and their counts always sum to the number of observations: the
//! maximum is clamped into the last bin instead of overflowing.

use serde::Serialize;

use crate::error::{Result, SimError};
use crate::special;
use crate::stats;

/// Default number of bins used by the widgets.
pub const DEFAULT_BINS: usize = 30;

/// One bin of an empirical histogram, covering `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Left edge formatted with one decimal.
    pub label: String,
    pub count: usize,
    pub start: f64,
    pub end: f64,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// A histogram bin paired with the count expected under a normal curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBin {
    pub label: String,
    pub count: usize,
    /// Expected count: `pdf(x; μ, σ) × n × width`.
    pub theoretical: f64,
    /// Bin center.
    pub x: f64,
}

/// A point on a (scaled) normal density curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalCurvePoint {
    pub x: f64,
    pub y: f64,
}

/// Bins `data` into `num_bins` contiguous equal-width bins over
/// `[min(data), max(data)]`.
///
/// Each value goes to `⌊(x − min) / width⌋`, clamped to `[0, num_bins − 1]`.
/// When all values are equal the width is zero and every value lands in
/// the first bin.
///
/// # Errors
/// `InvalidBinCount` if `num_bins == 0`. Empty data is not an error and
/// yields no bins.
///
/// # Examples
/// ```
/// use u_probsim::histogram::create_histogram;
/// let bins = create_histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 2).unwrap();
/// assert_eq!(bins.len(), 2);
/// assert_eq!(bins[0].count + bins[1].count, 5);
/// assert_eq!(bins[1].label, "2.0");
/// ```
pub fn create_histogram(data: &[f64], num_bins: usize) -> Result<Vec<HistogramBin>> {
    if num_bins == 0 {
        return Err(SimError::InvalidBinCount);
    }
    let Some((min, max)) = stats::range(data) else {
        return Ok(Vec::new());
    };
    let width = (max - min) / num_bins as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| {
            let start = min + i as f64 * width;
            let end = if i + 1 == num_bins {
                max
            } else {
                min + (i + 1) as f64 * width
            };
            HistogramBin {
                label: format!("{start:.1}"),
                count: 0,
                start,
                end,
            }
        })
        .collect();

    for &x in data {
        bins[bin_index(x, min, width, num_bins)].count += 1;
    }
    Ok(bins)
}

fn bin_index(x: f64, min: f64, width: f64, num_bins: usize) -> usize {
    if width <= 0.0 {
        return 0;
    }
    let raw = ((x - min) / width).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(num_bins - 1)
    }
}

/// Builds a histogram and, for each bin, the count expected under
/// N(`mu`, `sigma`).
///
/// The density is scaled by `n × width` so its area over the bins
/// approximates the total count, letting a bell curve sit on the bars at
/// matching height.
pub fn create_histogram_with_normal(
    data: &[f64],
    mu: f64,
    sigma: f64,
    num_bins: usize,
) -> Result<Vec<OverlayBin>> {
    let bins = create_histogram(data, num_bins)?;
    let scale = data.len() as f64 * bins.first().map_or(0.0, HistogramBin::width);
    Ok(bins
        .into_iter()
        .map(|bin| {
            let x = bin.center();
            OverlayBin {
                theoretical: special::normal_pdf(x, mu, sigma) * scale,
                label: bin.label,
                count: bin.count,
                x,
            }
        })
        .collect())
}

/// Samples the normal density over `μ ± 4σ` at `num_points + 1` evenly
/// spaced points, multiplied by `scale`.
///
/// # Errors
/// `InvalidParameters` if `num_points == 0` or `sigma ≤ 0`.
pub fn normal_curve(
    mu: f64,
    sigma: f64,
    num_points: usize,
    scale: f64,
) -> Result<Vec<NormalCurvePoint>> {
    if num_points == 0 || sigma.is_nan() || sigma <= 0.0 {
        return Err(SimError::InvalidParameters(format!(
            "normal curve needs at least one step and σ > 0, got {num_points} steps, σ={sigma}"
        )));
    }
    let start = mu - 4.0 * sigma;
    let step = 8.0 * sigma / num_points as f64;
    Ok((0..=num_points)
        .map(|i| {
            let x = start + i as f64 * step;
            NormalCurvePoint {
                x,
                y: special::normal_pdf(x, mu, sigma) * scale,
            }
        })
        .collect())
}
