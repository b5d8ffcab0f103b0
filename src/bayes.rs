//! Discrete Bayesian updating.
//!
//! Two independent models:
//!
//! - **Ravens**: three hypotheses about the colour of ravens (all black,
//!   half black, none black) updated one observation at a time.
//! - **Coin**: a fair-vs-biased coin posterior after `k` consecutive heads,
//!   computed in closed form.
//!
//! An update whose evidence probability is zero does not divide by zero:
//! every posterior is defined as 0 instead.

use serde::Serialize;

use crate::error::{check_probability, Result};

/// P(black | h) for h1 (all black), h2 (half black), h3 (none black).
pub const RAVEN_LIKELIHOODS: [f64; 3] = [1.0, 0.5, 0.0];

/// Uniform prior over the three raven hypotheses.
pub const UNIFORM_PRIOR: [f64; 3] = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];

/// Result of one Bayes step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BayesStep {
    pub probabilities: [f64; 3],
    /// Evidence probability `Σ P(e|hᵢ) P(hᵢ)` under the prior of the step.
    pub ce: f64,
}

/// Applies Bayes' theorem once: `P(hᵢ|e) = P(e|hᵢ) P(hᵢ) / P(e)`.
///
/// If `P(e) = 0` every posterior is 0.
///
/// # Examples
/// ```
/// use u_probsim::bayes::{update_once, RAVEN_LIKELIHOODS, UNIFORM_PRIOR};
/// let step = update_once(RAVEN_LIKELIHOODS, UNIFORM_PRIOR);
/// assert!((step.ce - 0.5).abs() < 1e-12);
/// assert!((step.probabilities[0] - 2.0 / 3.0).abs() < 1e-12);
/// assert_eq!(step.probabilities[2], 0.0);
/// ```
pub fn update_once(likelihoods: [f64; 3], probs: [f64; 3]) -> BayesStep {
    let ce = evidence(likelihoods, probs);
    let probabilities = if ce == 0.0 {
        [0.0; 3]
    } else {
        [
            likelihoods[0] * probs[0] / ce,
            likelihoods[1] * probs[1] / ce,
            likelihoods[2] * probs[2] / ce,
        ]
    };
    BayesStep { probabilities, ce }
}

fn evidence(likelihoods: [f64; 3], probs: [f64; 3]) -> f64 {
    likelihoods.iter().zip(probs).map(|(l, p)| l * p).sum()
}

// ============================================================================
// Ravens
// ============================================================================

/// An observed raven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Observation {
    Black,
    NonBlack,
}

impl Observation {
    /// P(observation | h) for each hypothesis.
    pub fn likelihoods(self) -> [f64; 3] {
        match self {
            Observation::Black => RAVEN_LIKELIHOODS,
            Observation::NonBlack => RAVEN_LIKELIHOODS.map(|l| 1.0 - l),
        }
    }
}

/// Probabilities of the three raven hypotheses at one step, plus the
/// evidence probability of the observation that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilitySnapshot {
    /// All ravens are black.
    pub h1: f64,
    /// Half of the ravens are black.
    pub h2: f64,
    /// No raven is black.
    pub h3: f64,
    pub ce: f64,
}

/// Current belief over the raven hypotheses.
///
/// Starts uniform and changes only through [`RavenBelief::update`]. The
/// probabilities sum to 1 after every update with non-zero evidence. A
/// hypothesis reaches exactly 0 only when its likelihood for an observation
/// was 0, and then stays there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RavenBelief {
    probs: [f64; 3],
}

impl Default for RavenBelief {
    fn default() -> Self {
        Self::uniform()
    }
}

impl RavenBelief {
    pub fn uniform() -> Self {
        Self {
            probs: UNIFORM_PRIOR,
        }
    }

    pub fn probabilities(&self) -> [f64; 3] {
        self.probs
    }

    /// Conditions the belief on one observation and returns its evidence
    /// probability.
    pub fn update(&mut self, observation: Observation) -> f64 {
        let step = update_once(observation.likelihoods(), self.probs);
        self.probs = step.probabilities;
        step.ce
    }

    /// Predictive probability that the next raven is black.
    pub fn next_black_probability(&self) -> f64 {
        evidence(RAVEN_LIKELIHOODS, self.probs)
    }

    fn snapshot(&self, ce: f64) -> ProbabilitySnapshot {
        let [h1, h2, h3] = self.probs;
        ProbabilitySnapshot { h1, h2, h3, ce }
    }
}

/// Belief history after `observations` black ravens in a row.
///
/// Returns `observations + 1` snapshots. Step 0 is the uniform prior with
/// the predictive `ce` of the first observation; step `i` holds the
/// posterior after `i` ravens and the `ce` used to compute it.
///
/// # Examples
/// ```
/// use u_probsim::bayes::probability_history;
/// let history = probability_history(3);
/// assert_eq!(history.len(), 4);
/// assert!(history[3].h1 > history[2].h1);
/// ```
pub fn probability_history(observations: usize) -> Vec<ProbabilitySnapshot> {
    let mut belief = RavenBelief::uniform();
    let mut history = Vec::with_capacity(observations + 1);
    history.push(belief.snapshot(belief.next_black_probability()));
    for _ in 0..observations {
        let ce = belief.update(Observation::Black);
        history.push(belief.snapshot(ce));
    }
    history
}

// ============================================================================
// Coin
// ============================================================================

/// Posterior of the fair-vs-biased coin model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoinPosterior {
    /// P(k heads | fair) = 0.5ᵏ
    pub likelihood_fair: f64,
    /// P(k heads | biased) = biasᵏ
    pub likelihood_biased: f64,
    /// `likelihood_biased / likelihood_fair`.
    pub likelihood_ratio: f64,
    pub posterior_biased: f64,
    pub posterior_fair: f64,
}

impl CoinPosterior {
    /// Reading of the posterior for the widget, in Italian.
    pub fn interpretation(&self) -> &'static str {
        if self.posterior_biased > 0.7 {
            "L'evidenza è forte: molto probabilmente la moneta è truccata!"
        } else if self.posterior_biased > 0.5 {
            "È più probabile che la moneta sia truccata, ma non siamo sicurissimi."
        } else if self.posterior_biased > 0.3 {
            "L'evidenza è ancora debole. La rarità delle monete truccate bilancia l'evidenza osservata."
        } else {
            "Nonostante le teste consecutive, è ancora più probabile che sia una moneta giusta perché le monete truccate sono molto rare."
        }
    }
}

/// Posterior probability that a coin is biased after `heads` consecutive
/// heads.
///
/// `prior_biased` is the share of biased coins, `bias_level` the
/// probability of heads for a biased coin. The posterior is computed from
/// the log-odds `ln(prior / (1 − prior)) + k · ln(bias / 0.5)`, so long runs
/// stay normalized after both likelihoods underflow to 0. The raw
/// likelihoods are reported as-is and `likelihood_ratio` saturates to ∞.
/// With zero total evidence (prior 1, bias 0, at least one head) both
/// posteriors are 0.
///
/// # Errors
/// `InvalidProbability` if either argument is outside `[0, 1]`.
///
/// # Examples
/// ```
/// use u_probsim::bayes::coin_posterior;
/// let post = coin_posterior(0.10, 0.75, 5).unwrap();
/// assert!((post.posterior_biased - 0.4576).abs() < 1e-3);
/// ```
pub fn coin_posterior(prior_biased: f64, bias_level: f64, heads: u32) -> Result<CoinPosterior> {
    check_probability("prior_biased", prior_biased)?;
    check_probability("bias_level", bias_level)?;

    let exponent = i32::try_from(heads).unwrap_or(i32::MAX);
    let likelihood_fair = 0.5_f64.powi(exponent);
    let likelihood_biased = bias_level.powi(exponent);
    // −∞ when a coin that never lands heads has shown heads.
    let log_ratio = if heads == 0 {
        0.0
    } else {
        f64::from(heads) * (bias_level.ln() - 0.5_f64.ln())
    };
    let likelihood_ratio = log_ratio.exp();

    let (posterior_biased, posterior_fair) = if log_ratio == f64::NEG_INFINITY {
        if prior_biased == 1.0 {
            (0.0, 0.0)
        } else {
            (0.0, 1.0)
        }
    } else if prior_biased == 0.0 {
        (0.0, 1.0)
    } else if prior_biased == 1.0 {
        (1.0, 0.0)
    } else {
        let log_odds = prior_biased.ln() - (1.0 - prior_biased).ln() + log_ratio;
        (logistic(log_odds), logistic(-log_odds))
    };

    Ok(CoinPosterior {
        likelihood_fair,
        likelihood_biased,
        likelihood_ratio,
        posterior_biased,
        posterior_fair,
    })
}

/// `1 / (1 + e^(−x))` without overflowing for large |x|.
fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn observation() -> impl Strategy<Value = Observation> {
        prop_oneof![Just(Observation::Black), Just(Observation::NonBlack)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn belief_stays_normalized(seq in proptest::collection::vec(observation(), 0..40)) {
            let mut belief = RavenBelief::uniform();
            for obs in seq {
                let ce = belief.update(obs);
                prop_assert!(ce > 0.0, "raven sequences always have positive evidence");
                let total: f64 = belief.probabilities().iter().sum();
                prop_assert!((total - 1.0).abs() < 1e-9);
            }
        }

        #[test]
        fn zero_is_absorbing(seq in proptest::collection::vec(observation(), 1..40)) {
            let mut belief = RavenBelief::uniform();
            let mut dead = [false; 3];
            for obs in seq {
                belief.update(obs);
                for (i, p) in belief.probabilities().into_iter().enumerate() {
                    if dead[i] {
                        prop_assert_eq!(p, 0.0);
                    }
                    dead[i] |= p == 0.0;
                }
            }
        }

        #[test]
        fn coin_posterior_bounded(
            prior in 0.0_f64..=1.0,
            bias in 0.0_f64..=1.0,
            heads in 0_u32..5000,
        ) {
            let post = coin_posterior(prior, bias, heads).unwrap();
            prop_assert!((0.0..=1.0).contains(&post.posterior_biased));
            prop_assert!((0.0..=1.0).contains(&post.posterior_fair));
            let zero_evidence = prior == 1.0 && bias == 0.0 && heads > 0;
            if !zero_evidence {
                prop_assert!((post.posterior_biased + post.posterior_fair - 1.0).abs() < 1e-9);
            }
        }
    }
}
