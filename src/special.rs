//! Standard normal functions.
//!
//! Density and quantile of N(0, 1). The histogram overlay and the normal
//! curve use the density; the quantile backs the analytic check of the
//! confidence-level table.

/// 1/√(2π) ≈ 0.3989422804014327
const FRAC_1_SQRT_2PI: f64 = 0.3989422804014326779399460599343818684758586311649;

/// Standard normal PDF φ(x) = (1/√(2π)) exp(−x²/2).
///
/// # Examples
/// ```
/// use u_probsim::special::standard_normal_pdf;
/// let peak = standard_normal_pdf(0.0);
/// assert!((peak - 0.3989422804014327).abs() < 1e-15);
/// ```
pub fn standard_normal_pdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Normal PDF with location `mu` and scale `sigma`.
///
/// Returns 0 when `sigma ≤ 0`, so a degenerate overlay draws nothing
/// instead of dividing by zero.
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    standard_normal_pdf((x - mu) / sigma) / sigma
}

/// Φ⁻¹(p) by the Abramowitz & Stegun 26.2.23 rational fit (|error| < 4.5e-4).
/// NaN outside `[0, 1]`, ±∞ at the endpoints.
fn inverse_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let (q, sign) = if p > 0.5 { (1.0 - p, 1.0) } else { (p, -1.0) };
    let t = (-2.0 * q.ln()).sqrt();

    const C0: f64 = 2.515517;
    const C1: f64 = 0.802853;
    const C2: f64 = 0.010328;
    const D1: f64 = 1.432788;
    const D2: f64 = 0.189269;
    const D3: f64 = 0.001308;

    let z = t - (C0 + C1 * t + C2 * t * t) / (1.0 + D1 * t + D2 * t * t + D3 * t * t * t);
    sign * z
}

/// Two-sided critical value for a confidence level given in percent:
/// `Φ⁻¹(1 − (1 − level/100)/2)`.
///
/// The confidence module uses a fixed table; this is the analytic
/// counterpart the table is checked against.
pub fn two_sided_critical_value(level_percent: f64) -> f64 {
    let alpha = 1.0 - level_percent / 100.0;
    inverse_normal_cdf(1.0 - alpha / 2.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_at_zero() {
        assert!((standard_normal_pdf(0.0) - FRAC_1_SQRT_2PI).abs() < 1e-15);
    }

    #[test]
    fn test_pdf_symmetry() {
        for &x in &[0.3, 1.0, 2.2, 4.0] {
            assert_eq!(standard_normal_pdf(x), standard_normal_pdf(-x));
        }
    }

    #[test]
    fn test_normal_pdf_scaled() {
        // Peak of N(170, 10) is φ(0)/10
        let peak = normal_pdf(170.0, 170.0, 10.0);
        assert!((peak - FRAC_1_SQRT_2PI / 10.0).abs() < 1e-15);
        assert_eq!(normal_pdf(1.0, 0.0, 0.0), 0.0);
        assert_eq!(normal_pdf(1.0, 0.0, -1.0), 0.0);
    }

    #[test]
    fn test_inverse_cdf_known_values() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-4);
        assert!((inverse_normal_cdf(0.975) - 1.96).abs() < 0.01);
        assert!((inverse_normal_cdf(0.95) - 1.645).abs() < 0.01);
    }

    #[test]
    fn test_inverse_cdf_extremes() {
        assert_eq!(inverse_normal_cdf(0.0), f64::NEG_INFINITY);
        assert_eq!(inverse_normal_cdf(1.0), f64::INFINITY);
        assert!(inverse_normal_cdf(-0.1).is_nan());
        assert!(inverse_normal_cdf(f64::NAN).is_nan());
    }

    #[test]
    fn test_two_sided_critical_values() {
        assert!((two_sided_critical_value(90.0) - 1.645).abs() < 0.01);
        assert!((two_sided_critical_value(95.0) - 1.960).abs() < 0.01);
        assert!((two_sided_critical_value(99.0) - 2.576).abs() < 0.01);
    }
}
