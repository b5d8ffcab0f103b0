//! Fair bets and subjective probability.
//!
//! A bet is fair for someone who believes an event has probability `p` when
//! its expected value is zero: staking `s` to win `w` requires
//! `p·w = (1 − p)·s`. Read the other way, the stake someone is willing to
//! risk reveals the probability they assign. The same idea extends to
//! insurance premiums and selling prices.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::{check_probability, Result, SimError};
use crate::random;
use crate::stats;

fn check_open_probability(p: f64) -> Result<f64> {
    if p.is_finite() && p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(SimError::InvalidParameters(format!(
            "fair odds need 0 < p < 1, got {p}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimError::InvalidParameters(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

/// Win that makes a bet of `stake` fair at probability `p`:
/// `(1 − p)·stake / p`.
///
/// # Errors
/// `InvalidParameters` unless `0 < p < 1` and `stake > 0`.
///
/// # Examples
/// ```
/// use u_probsim::betting::fair_win;
/// assert!((fair_win(0.25, 10.0).unwrap() - 30.0).abs() < 1e-12);
/// ```
pub fn fair_win(p: f64, stake: f64) -> Result<f64> {
    let p = check_open_probability(p)?;
    let stake = check_positive("stake", stake)?;
    Ok((1.0 - p) * stake / p)
}

/// Expected value of staking `stake` to win `win` when the event has
/// probability `p`: `p·win − (1 − p)·stake`.
pub fn expected_value(p: f64, stake: f64, win: f64) -> f64 {
    p * win - (1.0 - p) * stake
}

/// Probability at which staking `stake` to win `win` is fair:
/// `stake / (stake + win)`.
///
/// # Errors
/// `InvalidParameters` unless both amounts are positive.
pub fn implied_probability(stake: f64, win: f64) -> Result<f64> {
    let stake = check_positive("stake", stake)?;
    let win = check_positive("win", win)?;
    Ok(stake / (stake + win))
}

/// Aggregate result of a sequence of simulated bets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BettingOutcome {
    pub games: usize,
    pub wins: usize,
    pub total_profit: f64,
    /// `total_profit / games`; 0 for no games.
    pub average_profit: f64,
    /// Win/loss of every game in play order.
    pub outcomes: Vec<bool>,
}

/// Plays `games` bets priced fairly at `subjective_p` while the event
/// actually occurs with probability `real_p`.
///
/// When the two probabilities agree the average profit tends to 0; an
/// overestimate of `p` pays too little on wins and loses money in the long
/// run.
///
/// # Errors
/// `InvalidProbability` if `real_p` is outside `[0, 1]`; otherwise as
/// [`fair_win`].
pub fn simulate_bets<R: Rng>(
    real_p: f64,
    subjective_p: f64,
    stake: f64,
    games: usize,
    rng: &mut R,
) -> Result<BettingOutcome> {
    check_probability("real_p", real_p)?;
    let win = fair_win(subjective_p, stake)?;

    let outcomes: Vec<bool> = (0..games)
        .map(|_| random::bernoulli(rng, real_p))
        .collect();
    let wins = outcomes.iter().filter(|&&won| won).count();
    let total_profit = wins as f64 * win - (games - wins) as f64 * stake;
    let average_profit = if games == 0 {
        0.0
    } else {
        total_profit / games as f64
    };
    debug!(games, wins, total_profit, "betting simulation finished");

    Ok(BettingOutcome {
        games,
        wins,
        total_profit,
        average_profit,
        outcomes,
    })
}

// ============================================================================
// Subjective probability elicitation
// ============================================================================

/// Probability implied by the highest premium someone would pay to insure
/// against `loss`: `premium / loss`.
///
/// The ratio is not clamped; a value above 1 means the premium exceeds the
/// loss it covers.
pub fn from_insurance(premium: f64, loss: f64) -> Result<f64> {
    let loss = check_positive("loss", loss)?;
    Ok(premium / loss)
}

/// Probability implied by the lowest price someone would accept for an
/// asset worth `value` that may lose `loss`: `(value − price) / loss`.
pub fn from_selling_price(value: f64, price: f64, loss: f64) -> Result<f64> {
    let loss = check_positive("loss", loss)?;
    Ok((value - price) / loss)
}

/// Probability implied by a bet: the same as [`implied_probability`].
pub fn from_bet(stake: f64, win: f64) -> Result<f64> {
    implied_probability(stake, win)
}

/// Verbal likelihood band of a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Likelihood {
    VeryLikely,
    Likely,
    Unlikely,
    VeryUnlikely,
}

impl Likelihood {
    /// Bands: `> 0.8`, `> 0.5`, `> 0.2`, otherwise very unlikely.
    pub fn classify(p: f64) -> Self {
        if p > 0.8 {
            Likelihood::VeryLikely
        } else if p > 0.5 {
            Likelihood::Likely
        } else if p > 0.2 {
            Likelihood::Unlikely
        } else {
            Likelihood::VeryUnlikely
        }
    }

    /// Italian label shown by the widget.
    pub fn label(self) -> &'static str {
        match self {
            Likelihood::VeryLikely => "Molto probabile",
            Likelihood::Likely => "Probabile",
            Likelihood::Unlikely => "Poco probabile",
            Likelihood::VeryUnlikely => "Molto improbabile",
        }
    }
}

/// Agreement between independent estimates of the same probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Consistency {
    /// Range below 0.1.
    High,
    /// Range below 0.3.
    Reasonable,
    Inconsistent,
}

impl Consistency {
    pub fn message(self) -> &'static str {
        match self {
            Consistency::High => "Le stime sono molto coerenti tra loro.",
            Consistency::Reasonable => "Le stime sono ragionevolmente coerenti.",
            Consistency::Inconsistent => {
                "Le stime mostrano una certa incoerenza. Roberto potrebbe rivedere le sue valutazioni."
            }
        }
    }
}

/// Classifies estimates by their range `max − min`. Returns `None` for an
/// empty slice.
pub fn consistency(estimates: &[f64]) -> Option<Consistency> {
    let (min, max) = stats::range(estimates)?;
    let spread = max - min;
    Some(if spread < 0.1 {
        Consistency::High
    } else if spread < 0.3 {
        Consistency::Reasonable
    } else {
        Consistency::Inconsistent
    })
}

/// One row of a premium sensitivity table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub premium: f64,
    pub probability: f64,
    pub likelihood: Likelihood,
}

/// Implied probability for each premium against the same `loss`.
pub fn premium_sensitivity(premiums: &[f64], loss: f64) -> Result<Vec<SensitivityRow>> {
    premiums
        .iter()
        .map(|&premium| {
            let probability = from_insurance(premium, loss)?;
            Ok(SensitivityRow {
                premium,
                probability,
                likelihood: Likelihood::classify(probability),
            })
        })
        .collect()
}
