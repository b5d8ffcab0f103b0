//! Central Limit Theorem simulation.
//!
//! [`CltRun`] is the synchronous state machine: each tick draws one sample
//! from a [`Population`], records its mean, and stops once the limit of
//! [`MAX_MEANS`] means is reached. [`CltDriver`] wraps a run in a Tokio
//! ticker task for interactive use.
//!
//! ```text
//!          start()               limit reached / pause()
//!   Idle ─────────► Running ───────────────────────────► Stopped
//!    ▲                 ▲                                    │
//!    │ reset()         └──────────── start() ───────────────┘
//!    └──────────────────────── (any state)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::distributions::Population;
use crate::error::{check_sample_size, Result, SimError};
use crate::histogram::{self, OverlayBin};
use crate::random;
use crate::stats::{self, WelfordAccumulator};

/// Number of sample means after which a run stops.
pub const MAX_MEANS: usize = 1000;

/// Bins of the driver's sample-means histogram unless configured.
pub const DEFAULT_MEANS_BINS: usize = 40;

/// Shortest accepted tick period.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(50);
/// Longest accepted tick period.
pub const MAX_TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Stopped,
}

/// Running moments of the accumulated means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeansSummary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

impl From<&WelfordAccumulator> for MeansSummary {
    fn from(acc: &WelfordAccumulator) -> Self {
        Self {
            count: acc.count(),
            mean: acc.mean(),
            std_dev: acc.standard_deviation(),
            skewness: acc.skewness(),
            excess_kurtosis: acc.excess_kurtosis(),
        }
    }
}

/// Immutable view of a run, published after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CltSnapshot {
    pub status: RunStatus,
    pub population: Population,
    pub sample_size: usize,
    pub means: Vec<f64>,
    pub current_sample: Vec<f64>,
    pub current_mean: Option<f64>,
    /// Percentage of the limit reached, in `[0, 100]`.
    pub progress: f64,
    pub summary: MeansSummary,
}

// ============================================================================
// CltRun
// ============================================================================

/// Accumulates sample means drawn from a population.
#[derive(Debug, Clone)]
pub struct CltRun {
    population: Population,
    sample_size: usize,
    limit: usize,
    status: RunStatus,
    means: Vec<f64>,
    current_sample: Vec<f64>,
    current_mean: Option<f64>,
    summary: WelfordAccumulator,
}

impl CltRun {
    /// A new idle run with the default limit of [`MAX_MEANS`].
    ///
    /// # Errors
    /// `InvalidSampleSize` if `sample_size == 0`.
    pub fn new(population: Population, sample_size: usize) -> Result<Self> {
        Self::with_limit(population, sample_size, MAX_MEANS)
    }

    /// A new idle run that stops after `limit` means.
    ///
    /// # Errors
    /// `InvalidSampleSize` if `sample_size` or `limit` is 0.
    pub fn with_limit(population: Population, sample_size: usize, limit: usize) -> Result<Self> {
        check_sample_size(sample_size, 1)?;
        check_sample_size(limit, 1)?;
        Ok(Self {
            population,
            sample_size,
            limit,
            status: RunStatus::Idle,
            means: Vec::with_capacity(limit),
            current_sample: Vec::new(),
            current_mean: None,
            summary: WelfordAccumulator::new(),
        })
    }

    pub fn population(&self) -> Population {
        self.population
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn current_sample(&self) -> &[f64] {
        &self.current_sample
    }

    pub fn current_mean(&self) -> Option<f64> {
        self.current_mean
    }

    pub fn summary(&self) -> &WelfordAccumulator {
        &self.summary
    }

    /// Percentage of the limit reached.
    pub fn progress(&self) -> f64 {
        self.means.len() as f64 / self.limit as f64 * 100.0
    }

    pub fn is_full(&self) -> bool {
        self.means.len() >= self.limit
    }

    /// Back to `Idle` with nothing accumulated.
    pub fn reset(&mut self) {
        self.status = RunStatus::Idle;
        self.clear();
    }

    fn clear(&mut self) {
        self.means.clear();
        self.current_sample.clear();
        self.current_mean = None;
        self.summary = WelfordAccumulator::new();
    }

    /// Enters `Running` unless the limit is already reached. Returns whether
    /// the run is now running.
    pub fn start(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.status = RunStatus::Running;
        true
    }

    /// Stops a running run. Idle and stopped runs are left unchanged.
    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Stopped;
        }
    }

    fn draw_mean<R: Rng>(&self, rng: &mut R) -> (Vec<f64>, f64) {
        let sample: Vec<f64> = (0..self.sample_size)
            .map(|_| self.population.sample(rng))
            .collect();
        let mean = stats::mean(&sample);
        (sample, mean)
    }

    /// Draws one sample and appends its mean. Does nothing unless running.
    /// Returns whether a mean was appended.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.status != RunStatus::Running {
            return false;
        }
        if self.is_full() {
            self.status = RunStatus::Stopped;
            return false;
        }

        let (sample, mean) = self.draw_mean(rng);
        self.current_sample = sample;
        self.current_mean = Some(mean);
        self.means.push(mean);
        self.summary.update(mean);
        trace!(count = self.means.len(), mean, "clt tick");

        if self.is_full() {
            self.status = RunStatus::Stopped;
            info!(count = self.means.len(), "clt run reached its limit");
        }
        true
    }

    /// Replaces the accumulated means with `limit` fresh ones and stops.
    pub fn skip_to_limit<R: Rng>(&mut self, rng: &mut R) {
        self.status = RunStatus::Stopped;
        self.clear();
        for _ in 0..self.limit {
            let (_, mean) = self.draw_mean(rng);
            self.means.push(mean);
            self.summary.update(mean);
        }
        debug!(
            count = self.means.len(),
            mean = self.summary.mean(),
            "clt run skipped to limit"
        );
    }

    /// Switches population. Accumulated means are discarded since they came
    /// from a different distribution; the status is kept.
    pub fn set_population(&mut self, population: Population) {
        self.population = population;
        self.clear();
    }

    /// Switches sample size, discarding accumulated means; the status is
    /// kept.
    ///
    /// # Errors
    /// `InvalidSampleSize` if `sample_size == 0`.
    pub fn set_sample_size(&mut self, sample_size: usize) -> Result<()> {
        self.sample_size = check_sample_size(sample_size, 1)?;
        self.clear();
        Ok(())
    }

    /// μ of the population, the center the means converge to.
    pub fn theoretical_mean(&self) -> f64 {
        self.population.mean()
    }

    /// σ/√n, the spread the means converge to.
    pub fn theoretical_standard_error(&self) -> f64 {
        stats::standard_error(self.population.std_dev(), self.sample_size)
    }

    /// Histogram of the means with the limiting normal curve overlaid.
    pub fn means_histogram(&self, num_bins: usize) -> Result<Vec<OverlayBin>> {
        histogram::create_histogram_with_normal(
            &self.means,
            self.theoretical_mean(),
            self.theoretical_standard_error(),
            num_bins,
        )
    }

    pub fn snapshot(&self) -> CltSnapshot {
        CltSnapshot {
            status: self.status,
            population: self.population,
            sample_size: self.sample_size,
            means: self.means.clone(),
            current_sample: self.current_sample.clone(),
            current_mean: self.current_mean,
            progress: self.progress(),
            summary: MeansSummary::from(&self.summary),
        }
    }
}

// ============================================================================
// CltDriver
// ============================================================================

/// Validates a tick period against `[MIN_TICK_PERIOD, MAX_TICK_PERIOD]`.
pub fn check_tick_period(period: Duration) -> Result<Duration> {
    if (MIN_TICK_PERIOD..=MAX_TICK_PERIOD).contains(&period) {
        Ok(period)
    } else {
        Err(SimError::InvalidTickPeriod(
            u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        ))
    }
}

struct DriverState {
    run: CltRun,
    rng: SmallRng,
    period: Duration,
    /// Bumped whenever the ticker is cancelled; a tick from an older
    /// generation must not touch the run.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<DriverState>,
    snapshots: watch::Sender<CltSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives a [`CltRun`] on a fixed period from a Tokio task.
///
/// The first tick fires as soon as the task is scheduled. Every tick runs
/// synchronously under the driver's mutex and publishes a [`CltSnapshot`]
/// before releasing it. Pausing, resetting or changing parameters bumps a
/// generation counter and aborts the task under the same mutex, so no tick
/// scheduled before the change mutates the run afterwards.
///
/// Methods that (re)start the ticker spawn onto the current Tokio runtime
/// and panic outside one.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use u_probsim::clt::{CltDriver, CltRun};
/// use u_probsim::distributions::Population;
/// use u_probsim::random::create_rng;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let run = CltRun::new(Population::Exponential, 30)?;
///     let driver = CltDriver::new(run, Duration::from_millis(100), create_rng(7))?;
///     let mut snapshots = driver.subscribe();
///     driver.start();
///     while snapshots.changed().await.is_ok() {
///         let snap = snapshots.borrow_and_update().clone();
///         println!("{:.0}% done", snap.progress);
///     }
///     Ok(())
/// }
/// ```
pub struct CltDriver {
    shared: Arc<Shared>,
    means_bins: usize,
}

impl CltDriver {
    /// # Errors
    /// `InvalidTickPeriod` if `period` is outside 50–1000 ms.
    pub fn new(run: CltRun, period: Duration, rng: SmallRng) -> Result<Self> {
        let period = check_tick_period(period)?;
        let (snapshots, _) = watch::channel(run.snapshot());
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DriverState {
                    run,
                    rng,
                    period,
                    generation: 0,
                    task: None,
                }),
                snapshots,
            }),
            means_bins: DEFAULT_MEANS_BINS,
        })
    }

    /// Sets the bin count used by [`CltDriver::means_histogram`].
    ///
    /// # Errors
    /// `InvalidBinCount` if `bins == 0`.
    pub fn with_means_bins(mut self, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(SimError::InvalidBinCount);
        }
        self.means_bins = bins;
        Ok(self)
    }

    /// Builds a driver from the `[clt]` section of `config`, seeded from
    /// `config.seed` when present.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let clt = &config.clt;
        let run = CltRun::with_limit(clt.population, clt.sample_size, clt.max_means)?;
        let rng = match config.seed {
            Some(seed) => random::create_rng(seed),
            None => random::rng_from_entropy(),
        };
        Self::new(run, Duration::from_millis(clt.tick_period_ms), rng)?
            .with_means_bins(clt.means_bins)
    }

    /// Receiver of the snapshots published after each mutation.
    pub fn subscribe(&self) -> watch::Receiver<CltSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> CltSnapshot {
        self.shared.lock().run.snapshot()
    }

    pub fn status(&self) -> RunStatus {
        self.shared.lock().run.status()
    }

    pub fn means_bins(&self) -> usize {
        self.means_bins
    }

    /// Current means binned with the limiting normal overlay.
    pub fn means_histogram(&self) -> Result<Vec<OverlayBin>> {
        self.shared.lock().run.means_histogram(self.means_bins)
    }

    pub fn period(&self) -> Duration {
        self.shared.lock().period
    }

    /// Starts ticking. Returns `false` if the run is already full; starting
    /// a running driver keeps the existing ticker.
    pub fn start(&self) -> bool {
        let mut state = self.shared.lock();
        if state.run.status() == RunStatus::Running && state.task.is_some() {
            return true;
        }
        if !state.run.start() {
            debug!("clt start ignored: run is full");
            return false;
        }
        info!(
            population = %state.run.population(),
            sample_size = state.run.sample_size(),
            period_ms = state.period.as_millis() as u64,
            "clt driver started"
        );
        self.restart_ticker(&mut state);
        self.publish(&state);
        true
    }

    pub fn pause(&self) {
        let mut state = self.shared.lock();
        Self::cancel_ticker(&mut state);
        state.run.pause();
        info!(count = state.run.means().len(), "clt driver paused");
        self.publish(&state);
    }

    pub fn reset(&self) {
        let mut state = self.shared.lock();
        Self::cancel_ticker(&mut state);
        state.run.reset();
        info!("clt driver reset");
        self.publish(&state);
    }

    /// Stops ticking and fills the run to its limit synchronously.
    pub fn skip_to_limit(&self) {
        let mut state = self.shared.lock();
        Self::cancel_ticker(&mut state);
        let DriverState { run, rng, .. } = &mut *state;
        run.skip_to_limit(rng);
        info!(count = state.run.means().len(), "clt driver skipped to limit");
        self.publish(&state);
    }

    /// Changes the population; a running driver restarts against it.
    pub fn set_population(&self, population: Population) {
        self.reconfigure(|run| run.set_population(population));
    }

    /// Changes the sample size; a running driver restarts against it.
    ///
    /// # Errors
    /// `InvalidSampleSize` if `sample_size == 0`. The driver is unchanged.
    pub fn set_sample_size(&self, sample_size: usize) -> Result<()> {
        let sample_size = check_sample_size(sample_size, 1)?;
        self.reconfigure(|run| {
            run.sample_size = sample_size;
            run.clear();
        });
        Ok(())
    }

    /// Changes the tick period; a running driver restarts with it.
    ///
    /// # Errors
    /// `InvalidTickPeriod` if `period` is outside 50–1000 ms.
    pub fn set_period(&self, period: Duration) -> Result<()> {
        let period = check_tick_period(period)?;
        let mut state = self.shared.lock();
        state.period = period;
        if state.run.status() == RunStatus::Running {
            self.restart_ticker(&mut state);
        }
        Ok(())
    }

    fn reconfigure<F>(&self, change: F)
    where
        F: FnOnce(&mut CltRun),
    {
        let mut state = self.shared.lock();
        let running = state.run.status() == RunStatus::Running;
        Self::cancel_ticker(&mut state);
        change(&mut state.run);
        debug!(
            population = %state.run.population(),
            sample_size = state.run.sample_size(),
            running,
            "clt driver reconfigured"
        );
        if running {
            self.restart_ticker(&mut state);
        }
        self.publish(&state);
    }

    fn cancel_ticker(state: &mut DriverState) {
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    fn restart_ticker(&self, state: &mut DriverState) {
        Self::cancel_ticker(state);
        let shared = Arc::clone(&self.shared);
        let generation = state.generation;
        let period = state.period;
        state.task = Some(tokio::spawn(tick_loop(shared, generation, period)));
    }

    fn publish(&self, state: &DriverState) {
        self.shared.snapshots.send_replace(state.run.snapshot());
    }
}

impl Drop for CltDriver {
    fn drop(&mut self) {
        Self::cancel_ticker(&mut self.shared.lock());
    }
}

async fn tick_loop(shared: Arc<Shared>, generation: u64, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut state = shared.lock();
        if state.generation != generation {
            trace!(generation, "stale clt tick dropped");
            return;
        }
        let DriverState { run, rng, .. } = &mut *state;
        run.tick(rng);
        shared.snapshots.send_replace(run.snapshot());
        if run.status() != RunStatus::Running {
            state.task = None;
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
