//! Drives the wizard end to end: owns the state, feeds events through the
//! reducer, runs each step's simulator on a tokio task and executes the
//! commands that come back.

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{monitor, summarize, MonitoringSnapshot, ProjectSummary};
use crate::config::WizardConfig;
use crate::logging::{log, log_audit, log_banner, log_session_summary, log_transition, obj, v_str, Domain, Level, ProfileScope};
use crate::pipeline::jobs::{JobKind, JobRegistry};
use crate::pipeline::progress::{ProgressUpdate, SimContext, SimError, SimTask, StepInputs};
use crate::pipeline::status::TransitionError;
use crate::pipeline::suggestions::{analyze, Suggestion};
use crate::pipeline::SimulatorSet;
use crate::project::{Project, ProjectDraft};
use crate::storage::{ProjectStore, StoreKind};
use crate::wizard::{reduce, Command, ReducerOutput, StepId, WizardEvent, WizardState};

/// A step simulation in flight.
pub struct StepRun {
    pub step: StepId,
    pub job_id: Option<String>,
    generation: u64,
    task: SimTask<Value>,
}

impl StepRun {
    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.task.token()
    }
}

pub struct WizardRunner {
    cfg: WizardConfig,
    state: WizardState,
    store: Box<dyn ProjectStore>,
    jobs: JobRegistry,
    sims: SimulatorSet,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    started: Instant,
}

impl WizardRunner {
    pub fn new(cfg: WizardConfig) -> Result<Self> {
        let store = StoreKind::from_path(cfg.store_path.as_deref()).build()?;
        Ok(Self::with_store(cfg, store))
    }

    pub fn with_store(cfg: WizardConfig, store: Box<dyn ProjectStore>) -> Self {
        let sims = SimulatorSet::from_config(&cfg);
        Self {
            cfg,
            state: WizardState::new(),
            store,
            jobs: JobRegistry::new(),
            sims,
            progress_tx: None,
            started: Instant::now(),
        }
    }

    pub fn with_simulators(mut self, sims: SimulatorSet) -> Self {
        self.sims = sims;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn config(&self) -> &WizardConfig {
        &self.cfg
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn store(&self) -> &dyn ProjectStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn ProjectStore {
        self.store.as_mut()
    }

    /// Apply one event and run the commands it produced.
    pub fn dispatch(&mut self, event: WizardEvent) -> ReducerOutput {
        let from = self.state.current_step;
        let name = event.name();
        let out = reduce(&mut self.state, event, &self.cfg);
        if self.state.current_step != from {
            log_transition(name, from.key(), self.state.current_step.key(), out.state_hash);
        }
        self.execute(&out.commands, out.state_hash);
        out
    }

    fn execute(&self, commands: &[Command], state_hash: u64) {
        for cmd in commands {
            match cmd {
                Command::Log { level, msg } => {
                    log(*level, Domain::Wizard, "reducer", obj(&[("msg", v_str(msg))]));
                }
                Command::StepEntered(step) => {
                    log(
                        Level::Info,
                        Domain::Wizard,
                        "step_entered",
                        obj(&[("step", v_str(step.key())), ("title", v_str(step.title()))]),
                    );
                }
                Command::Audit { step, digest } => log_audit(step.key(), digest, state_hash),
            }
        }
    }

    /// Create the project through the store. A failure raises the error
    /// banner and is returned to the caller.
    pub fn create_project(&mut self, draft: &ProjectDraft) -> Result<Project> {
        match self.store.create(draft) {
            Ok(project) => {
                log(
                    Level::Info,
                    Domain::Project,
                    "project_created",
                    obj(&[
                        ("project_id", v_str(&project.id)),
                        ("name", v_str(&project.name)),
                        ("problem_type", v_str(project.problem_type.as_str())),
                    ]),
                );
                self.dispatch(WizardEvent::ProjectCreated(project.clone()));
                Ok(project)
            }
            Err(err) => {
                let message = err.to_string();
                self.dispatch(WizardEvent::ProjectFailed { message: message.clone() });
                log_banner(&message);
                Err(err)
            }
        }
    }

    pub fn dismiss_banner(&mut self) {
        self.dispatch(WizardEvent::DismissBanner);
    }

    fn context(&self, step: StepId, cancel: CancellationToken) -> SimContext {
        let inputs = StepInputs {
            project: self.state.project.clone(),
            record: self.state.accumulated.clone(),
        };
        let mut ctx = SimContext::new(step, self.cfg.time_scale)
            .with_cancel(cancel)
            .with_inputs(inputs)
            .with_seed(self.cfg.seed);
        if let Some(tx) = &self.progress_tx {
            ctx = ctx.with_progress(tx.clone());
        }
        ctx
    }

    /// Spawn the current step's simulator. Results and monitoring have no job.
    pub fn begin_step(&self) -> Result<StepRun> {
        let step = self.state.current_step;
        let sim = self
            .sims
            .get(step)
            .ok_or_else(|| anyhow!("no simulator registered for step {}", step.key()))?;
        let cancel = CancellationToken::new();
        let mut ctx = self.context(step, cancel.clone());

        let project_id = self.state.project.as_ref().map(|p| p.id.as_str());
        let job_id = JobKind::for_step(step).map(|kind| self.jobs.create(project_id, kind));
        if let Some(id) = &job_id {
            ctx = ctx.with_job(self.jobs.clone(), id.clone());
        }

        let task = SimTask::spawn(cancel, async move { sim.simulate(&ctx).await });
        Ok(StepRun {
            step,
            job_id,
            generation: self.state.generation,
            task,
        })
    }

    /// Wait for a spawned step and fold its payload into the record. A run
    /// started before the last reset is discarded and its job cancelled.
    pub async fn finish_step(&mut self, run: StepRun) -> Result<Value> {
        let _profile = ProfileScope::with_context("step", &[("step", v_str(run.step.key()))]);
        let stale = run.generation != self.state.generation;
        if stale {
            run.task.cancel();
        }
        match run.task.join().await {
            Ok(_) if stale => {
                if let Some(id) = &run.job_id {
                    self.jobs.cancel(id);
                }
                log(
                    Level::Warn,
                    Domain::Pipeline,
                    "step_discarded",
                    obj(&[("step", v_str(run.step.key())), ("msg", v_str("started before reset"))]),
                );
                Err(anyhow!("step {} was started before a reset", run.step.key()))
            }
            Ok(payload) => {
                if let Some(id) = &run.job_id {
                    self.jobs.complete(id);
                }
                self.dispatch(WizardEvent::StepCompleted {
                    step: run.step,
                    payload: payload.clone(),
                });
                Ok(payload)
            }
            Err(err) => {
                if let Some(id) = &run.job_id {
                    self.jobs.cancel(id);
                }
                log(
                    Level::Warn,
                    Domain::Pipeline,
                    "step_stopped",
                    obj(&[("step", v_str(run.step.key())), ("msg", v_str(&err.to_string()))]),
                );
                Err(err.into())
            }
        }
    }

    pub async fn run_current_step(&mut self) -> Result<Value> {
        let run = self.begin_step()?;
        self.finish_step(run).await
    }

    pub fn advance(&mut self) -> Result<StepId, TransitionError> {
        let from = self.state.current_step;
        self.dispatch(WizardEvent::Advance);
        if !self.state.is_completed(from) {
            return Err(TransitionError::new(format!("step {} has not completed", from.key())));
        }
        Ok(self.state.current_step)
    }

    pub fn retreat(&mut self) -> StepId {
        self.dispatch(WizardEvent::Retreat);
        self.state.current_step
    }

    pub fn reset(&mut self) {
        self.dispatch(WizardEvent::Reset);
        let project_id = self.state.project.as_ref().map(|p| p.id.as_str());
        self.jobs.clear_finished(project_id);
    }

    /// Suggestions for the step on screen, after the analysis delay.
    pub async fn suggestions(&self) -> Result<Vec<Suggestion>, SimError> {
        let step = self.state.current_step;
        analyze(step, &self.context(step, CancellationToken::new())).await
    }

    /// Run every remaining step in order, advancing after each one.
    pub async fn run_to_end(&mut self) -> Result<ProjectSummary> {
        loop {
            if !self.state.is_completed(self.state.current_step) {
                self.run_current_step().await?;
            }
            if self.state.current_step.is_last() {
                break;
            }
            self.advance()?;
        }
        let summary = self.summary();
        log_session_summary(
            summary.project.as_ref().map(|p| p.id.as_str()).unwrap_or(""),
            self.started.elapsed().as_millis() as u64,
            self.state.completed_count(),
            summary.best_model.as_deref(),
            summary.best_accuracy,
        );
        Ok(summary)
    }

    pub fn summary(&self) -> ProjectSummary {
        summarize(self.state.project.as_ref(), &self.state.accumulated, &self.cfg.best_policy)
    }

    pub fn monitoring(&self) -> MonitoringSnapshot {
        monitor(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::jobs::JobStatus;
    use crate::project::ProblemType;
    use crate::storage::MemoryProjectStore;

    fn runner() -> WizardRunner {
        WizardRunner::with_store(WizardConfig::instant(), Box::new(MemoryProjectStore::new()))
    }

    #[tokio::test]
    async fn test_advance_before_running_is_rejected() {
        let mut r = runner();
        assert!(r.advance().is_err());
        assert_eq!(r.state().current_step, StepId::Upload);
        r.run_current_step().await.unwrap();
        assert_eq!(r.advance().unwrap(), StepId::Preprocessing);
        assert_eq!(r.retreat(), StepId::Upload);
    }

    #[tokio::test]
    async fn test_step_registers_completed_job() {
        let mut r = runner();
        r.create_project(&ProjectDraft::new("Heart", ProblemType::Classification)).unwrap();
        r.run_current_step().await.unwrap();
        let project_id = r.state().project.as_ref().map(|p| p.id.clone());
        let jobs = r.jobs().list(project_id.as_deref());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Ingestion);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert_eq!(jobs[0].progress, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_step_leaves_state_untouched() {
        let cfg = WizardConfig { time_scale: 1.0, ..WizardConfig::instant() };
        let mut r = WizardRunner::with_store(cfg, Box::new(MemoryProjectStore::new()));
        let run = r.begin_step().unwrap();
        let job_id = run.job_id.clone().unwrap();
        tokio::task::yield_now().await;
        run.cancel();
        assert!(r.finish_step(run).await.is_err());
        assert!(!r.state().is_completed(StepId::Upload));
        assert!(r.state().accumulated.is_empty());
        assert_eq!(r.jobs().get(&job_id).map(|j| j.status), Some(JobStatus::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_started_before_reset_is_discarded() {
        let mut r = runner();
        r.create_project(&ProjectDraft::new("Heart", ProblemType::Classification)).unwrap();
        for _ in 0..4 {
            r.run_current_step().await.unwrap();
            r.advance().unwrap();
        }
        assert_eq!(r.state().current_step, StepId::Tuning);

        let run = r.begin_step().unwrap();
        let job_id = run.job_id.clone().unwrap();
        r.reset();
        assert!(r.finish_step(run).await.is_err());

        let state = r.state();
        assert_eq!(state.current_step, StepId::Upload);
        assert_eq!(state.completed_count(), 0);
        assert!(state.accumulated.is_empty());
        assert!(r.summary().best_model.is_none());
        assert_eq!(r.jobs().get(&job_id).map(|j| j.status), Some(JobStatus::Cancelled));
        let project_id = state.project.as_ref().map(|p| p.id.clone());
        assert_eq!(r.jobs().list(project_id.as_deref()).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_project_raises_banner() {
        let mut r = runner();
        assert!(r.create_project(&ProjectDraft::new("  ", ProblemType::Regression)).is_err());
        assert!(r.state().banner.is_some());
        assert!(r.state().project.is_none());
        r.dismiss_banner();
        assert!(r.state().banner.is_none());
    }

    #[tokio::test]
    async fn test_suggestions_follow_current_step() {
        let r = runner();
        let s = r.suggestions().await.unwrap();
        assert_eq!(s.iter().map(|x| x.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
