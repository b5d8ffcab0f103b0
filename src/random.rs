//! Random variate generation.
//!
//! Provides seeded RNG construction and the sampling primitives every
//! simulation in this crate is built on: uniform draws, Box-Muller normal
//! draws, exponential draws, and Bernoulli trials.
//!
//! # Reproducibility
//!
//! For reproducible experiments, use [`create_rng`] with a fixed seed.
//! The underlying algorithm (SmallRng) is deterministic for a given seed
//! on the same platform. Interactive sessions use [`rng_from_entropy`].

use rand::{Rng, SeedableRng};
use rand::rngs::SmallRng;

/// Creates a fast, seeded random number generator.
///
/// Uses `SmallRng` (Xoshiro256++) for high performance.
/// The sequence is deterministic for a given seed on the same platform.
///
/// # Examples
/// ```
/// use u_probsim::random::{create_rng, uniform01};
/// let mut rng = create_rng(42);
/// let x = uniform01(&mut rng);
/// assert!(x >= 0.0 && x < 1.0);
/// ```
pub fn create_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Creates a `SmallRng` seeded from the operating system.
pub fn rng_from_entropy() -> SmallRng {
    SmallRng::from_os_rng()
}

/// Draws a uniform value in `[0, 1)`.
pub fn uniform01<R: Rng>(rng: &mut R) -> f64 {
    rng.random::<f64>()
}

/// Draws a uniform value in `(0, 1)`, resampling exact zeros.
///
/// Used wherever the draw is passed to `ln`, so the result is always finite.
fn nonzero_uniform01<R: Rng>(rng: &mut R) -> f64 {
    loop {
        let u = uniform01(rng);
        if u > 0.0 {
            return u;
        }
    }
}

/// Draws a standard normal variate with the Box-Muller transform.
///
/// # Algorithm
/// `z = √(−2 ln u₁) · cos(2π u₂)` with `u₁, u₂` uniform. `u₁ = 0` is
/// resampled so `ln(u₁)` never produces −∞.
///
/// Reference: Box & Muller (1958), "A Note on the Generation of Random
/// Normal Deviates", *Annals of Mathematical Statistics* 29(2).
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = nonzero_uniform01(rng);
    let u2 = uniform01(rng);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Draws from N(μ, σ²): `mu + sigma · z`.
///
/// # Examples
/// ```
/// use u_probsim::random::{create_rng, normal};
/// let mut rng = create_rng(7);
/// let x = normal(&mut rng, 170.0, 10.0);
/// assert!(x.is_finite());
/// ```
pub fn normal<R: Rng>(rng: &mut R, mu: f64, sigma: f64) -> f64 {
    mu + sigma * standard_normal(rng)
}

/// Draws from an exponential distribution with the given mean
/// (rate = 1/mean) by inversion: `−ln(u) · mean`.
pub fn exponential<R: Rng>(rng: &mut R, mean: f64) -> f64 {
    -nonzero_uniform01(rng).ln() * mean
}

/// A single Bernoulli trial: `true` with probability `p`.
pub fn bernoulli<R: Rng>(rng: &mut R, p: f64) -> bool {
    uniform01(rng) < p
}

// ============================================================================
// Tests
// ============================================================================
