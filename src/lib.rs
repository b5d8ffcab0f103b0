//! # u-probsim
//!
//! Statistical simulation engine behind a set of interactive probability
//! teaching widgets.
//!
//! The crate is a pure computational core: it draws random variates,
//! summarizes samples, builds histograms and confidence intervals, updates
//! Bayesian beliefs, answers causal queries on a small network, and drives
//! the Central Limit Theorem animation. Rendering is left to the caller;
//! every result record derives `serde::Serialize`.
//!
//! ## Modules
//!
//! - [`random`]: seeded RNGs and Box-Muller, exponential and Bernoulli draws
//! - [`special`]: standard normal density and critical values
//! - [`distributions`]: normal and log-normal laws, the CLT populations
//! - [`stats`]: descriptive statistics, normality check, Welford accumulator
//! - [`histogram`]: equal-width bins with a normal overlay
//! - [`confidence`]: z-intervals and the repeated-sampling study
//! - [`bayes`]: raven hypotheses and the biased-coin posterior
//! - [`causal`]: exact observational and interventional queries
//! - [`clt`]: the sample-means run and its Tokio ticker
//! - [`betting`]: fair odds and subjective probability elicitation
//! - [`config`]: TOML settings
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: Welford's algorithm for running
//!   moments, Kahan summation for means
//! - **Defined edge cases**: empty samples and zero-evidence updates return
//!   0; out-of-domain inputs return [`SimError`]
//! - **Reproducible**: every simulation takes an explicit RNG
//! - **Property-based testing**: invariants verified via proptest

pub mod bayes;
pub mod betting;
pub mod causal;
pub mod clt;
pub mod confidence;
pub mod config;
pub mod distributions;
pub mod error;
pub mod histogram;
pub mod random;
pub mod special;
pub mod stats;

pub use error::{Result, SimError};
