//! Timed progress loops standing in for backend work.
//!
//! Every plan reports a non-decreasing percentage that ends at exactly 100.
//! Waits are scaled by `time_scale` (0 means no real waiting) and race the
//! cancellation token, so a run either completes or resolves `Cancelled`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::logging::log_progress;
use crate::pipeline::jobs::JobRegistry;
use crate::pipeline::status::TransitionError;
use crate::project::Project;
use crate::wizard::record::StepOutputRecord;
use crate::wizard::steps::StepId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressPlan {
    /// 0, inc, 2*inc, ... 100 with one tick after each report, the last included.
    Stepped { increment: u32, tick: Duration },
    /// Previous + U(0, max_increment) per tick, clamped to 100.
    Jittered { max_increment: f64, tick: Duration },
    /// A single wait, then done.
    Delay { duration: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub step: StepId,
    pub label: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    Cancelled,
    /// The task panicked or was aborted by the runtime.
    Aborted(String),
    /// A status transition the simulator itself should never attempt.
    Transition(String),
}

impl From<TransitionError> for SimError {
    fn from(err: TransitionError) -> Self {
        SimError::Transition(err.msg)
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Cancelled => f.write_str("simulation cancelled"),
            SimError::Aborted(why) => write!(f, "simulation aborted: {}", why),
            SimError::Transition(why) => write!(f, "simulation state error: {}", why),
        }
    }
}

impl std::error::Error for SimError {}

/// What a step gets to look at. Simulators are free to ignore it, and most do.
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    pub project: Option<Project>,
    pub record: StepOutputRecord,
}

#[derive(Debug, Clone)]
pub struct SimContext {
    pub step: StepId,
    pub cancel: CancellationToken,
    pub inputs: StepInputs,
    time_scale: f64,
    seed: Option<u64>,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    job: Option<(JobRegistry, String)>,
}

impl SimContext {
    pub fn new(step: StepId, time_scale: f64) -> Self {
        Self {
            step,
            cancel: CancellationToken::new(),
            inputs: StepInputs::default(),
            time_scale: if time_scale.is_finite() { time_scale.max(0.0) } else { 0.0 },
            seed: None,
            progress_tx: None,
            job: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_inputs(mut self, inputs: StepInputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_job(mut self, registry: JobRegistry, job_id: String) -> Self {
        self.job = Some((registry, job_id));
        self
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Seeded when configured, entropy otherwise. `salt` keeps streams of
    /// different models apart under one seed.
    pub fn rng(&self, salt: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        }
    }

    pub fn report(&self, label: &str, percent: f64) {
        log_progress(self.step.key(), label, percent);
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(ProgressUpdate {
                step: self.step,
                label: label.to_string(),
                percent,
            });
        }
        if let Some((jobs, id)) = &self.job {
            jobs.report(id, label, percent);
        }
    }

    pub fn scaled(&self, d: Duration) -> Duration {
        Duration::try_from_secs_f64(d.as_secs_f64() * self.time_scale).unwrap_or(Duration::MAX)
    }

    /// Wait for `d` (scaled) unless cancelled first.
    pub async fn pause(&self, d: Duration) -> Result<(), SimError> {
        let d = self.scaled(d);
        if d.is_zero() {
            tokio::task::yield_now().await;
            return self.check_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SimError::Cancelled),
            _ = sleep(d) => Ok(()),
        }
    }

    pub fn check_cancelled(&self) -> Result<(), SimError> {
        if self.cancel.is_cancelled() {
            Err(SimError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Drive one progress loop to 100.
pub async fn run_plan(
    plan: &ProgressPlan,
    label: &str,
    ctx: &SimContext,
    rng: &mut StdRng,
) -> Result<(), SimError> {
    ctx.check_cancelled()?;
    match *plan {
        ProgressPlan::Stepped { increment, tick } => {
            let increment = increment.clamp(1, 100);
            let mut pct = 0u32;
            loop {
                ctx.report(label, pct as f64);
                ctx.pause(tick).await?;
                if pct >= 100 {
                    break;
                }
                pct = (pct + increment).min(100);
            }
        }
        ProgressPlan::Jittered { max_increment, tick } => {
            let max_increment = max_increment.max(1.0);
            let mut pct = 0.0_f64;
            ctx.report(label, pct);
            while pct < 100.0 {
                ctx.pause(tick).await?;
                pct = (pct + rng.gen::<f64>() * max_increment).min(100.0);
                ctx.report(label, pct);
            }
        }
        ProgressPlan::Delay { duration } => {
            ctx.report(label, 0.0);
            ctx.pause(duration).await?;
            ctx.report(label, 100.0);
        }
    }
    Ok(())
}

/// A spawned simulation plus the token that can stop it.
pub struct SimTask<T> {
    handle: JoinHandle<Result<T, SimError>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> SimTask<T> {
    pub fn spawn<F>(cancel: CancellationToken, fut: F) -> Self
    where
        F: Future<Output = Result<T, SimError>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
            cancel,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<T, SimError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(SimError::Aborted(err.to_string())),
        }
    }
}
