//! Error types for the simulation engine.
//!
//! Most edge cases in this crate have defined numeric fallbacks (an empty
//! sample has mean 0, a zero-evidence Bayesian update yields zeros). The
//! variants below cover inputs that are outside every function's domain and
//! would otherwise produce silently wrong statistics.

use thiserror::Error;

/// Errors returned by the simulation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A generator or estimator was asked for too few observations.
    #[error("invalid sample size {got}: at least {min} required")]
    InvalidSampleSize { got: usize, min: usize },

    /// A probability argument is outside `[0, 1]` (or not finite).
    #[error("probability `{name}` must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// The confidence level has no entry in the z-value table.
    #[error("unsupported confidence level {0}%")]
    UnsupportedConfidenceLevel(f64),

    /// A histogram was requested with zero bins.
    #[error("histogram requires at least one bin")]
    InvalidBinCount,

    /// Parameters violate a distribution or model constraint.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The CLT tick period is outside the supported range.
    #[error("tick period {0} ms outside supported range 50..=1000 ms")]
    InvalidTickPeriod(u64),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Validates that `value` is a probability in `[0, 1]`.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::InvalidProbability { name, value })
    }
}

/// Validates a known standard deviation: finite and non-negative.
pub(crate) fn check_std_dev(sigma: f64) -> Result<f64> {
    if sigma.is_finite() && sigma >= 0.0 {
        Ok(sigma)
    } else {
        Err(SimError::InvalidParameters(format!(
            "standard deviation must be finite and ≥ 0, got {sigma}"
        )))
    }
}

/// Validates that at least `min` observations are requested.
pub(crate) fn check_sample_size(got: usize, min: usize) -> Result<usize> {
    if got >= min {
        Ok(got)
    } else {
        Err(SimError::InvalidSampleSize { got, min })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_probability_bounds() {
        assert_eq!(check_probability("p", 0.0), Ok(0.0));
        assert_eq!(check_probability("p", 1.0), Ok(1.0));
        assert!(matches!(
            check_probability("p", 1.01),
            Err(SimError::InvalidProbability { name: "p", .. })
        ));
        assert!(check_probability("p", -0.1).is_err());
        assert!(check_probability("p", f64::NAN).is_err());
    }

    #[test]
    fn test_check_sample_size() {
        assert_eq!(check_sample_size(1, 1), Ok(1));
        assert_eq!(
            check_sample_size(0, 1),
            Err(SimError::InvalidSampleSize { got: 0, min: 1 })
        );
    }

    #[test]
    fn test_check_std_dev() {
        assert_eq!(check_std_dev(0.0), Ok(0.0));
        assert_eq!(check_std_dev(2.5), Ok(2.5));
        assert!(matches!(check_std_dev(-1.0), Err(SimError::InvalidParameters(_))));
        assert!(check_std_dev(f64::NAN).is_err());
        assert!(check_std_dev(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display_messages() {
        let e = SimError::UnsupportedConfidenceLevel(97.0);
        assert_eq!(e.to_string(), "unsupported confidence level 97%");
        let e = SimError::InvalidSampleSize { got: 0, min: 1 };
        assert_eq!(e.to_string(), "invalid sample size 0: at least 1 required");
    }
}
