//! Best-entry selection and the project-level summary built from the
//! accumulated step outputs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::pipeline::progress::{SimContext, SimError};
use crate::pipeline::status::{apply_status, RunStatus, StatusEvent, TransitionError};
use crate::pipeline::suggestions::{suggestions_for, Suggestion};
use crate::pipeline::training::ModelResult;
use crate::pipeline::tuning::TuningResult;
use crate::pipeline::upload::QualityReport;
use crate::pipeline::StepSimulator;
use crate::project::Project;
use crate::wizard::record::StepOutputRecord;
use crate::wizard::steps::StepId;

pub const DEFAULT_BEST_MODEL: &str = "LightGBM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestPolicy {
    /// First completed entry with exactly this name.
    NameMatch(String),
    /// Highest score among completed entries; ties go to the earliest.
    HighestScore,
}

impl Default for BestPolicy {
    fn default() -> Self {
        BestPolicy::NameMatch(DEFAULT_BEST_MODEL.to_string())
    }
}

impl BestPolicy {
    /// `name:<Model>` or `score`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("score") {
            return Some(BestPolicy::HighestScore);
        }
        s.strip_prefix("name:")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| BestPolicy::NameMatch(n.to_string()))
    }
}

pub trait Scored {
    fn name(&self) -> &str;
    fn score(&self) -> f64;
    fn status(&self) -> RunStatus;
    fn status_mut(&mut self) -> &mut RunStatus;
}

pub fn pick_best<T: Scored>(items: &[T], policy: &BestPolicy) -> Option<usize> {
    let mut done = items.iter().enumerate().filter(|(_, it)| it.status().is_done());
    match policy {
        BestPolicy::NameMatch(name) => done.find(|(_, it)| it.name() == name.as_str()).map(|(i, _)| i),
        BestPolicy::HighestScore => done
            .fold(None, |best: Option<(usize, f64)>, (i, it)| match best {
                Some((_, s)) if s >= it.score() => best,
                _ => Some((i, it.score())),
            })
            .map(|(i, _)| i),
    }
}

/// Mark exactly one entry best, demoting any previous best first.
pub fn mark_best<T: Scored>(items: &mut [T], policy: &BestPolicy) -> Result<Option<usize>, TransitionError> {
    for it in items.iter_mut() {
        if it.status() == RunStatus::Best {
            *it.status_mut() = RunStatus::Completed;
        }
    }
    let best = pick_best(items, policy);
    if let Some(i) = best {
        apply_status(items[i].status_mut(), StatusEvent::MarkBest)?;
    }
    Ok(best)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project: Option<Project>,
    pub best_model: Option<String>,
    pub best_accuracy: Option<f64>,
    pub training: Vec<ModelResult>,
    pub tuning: Vec<TuningResult>,
    pub quality: Option<QualityReport>,
    pub features_selected: Option<usize>,
    pub steps_recorded: Vec<String>,
}

fn list_at<T: serde::de::DeserializeOwned>(record: &StepOutputRecord, step: StepId, field: &str) -> Vec<T> {
    record
        .field(step.key(), field)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn summarize(project: Option<&Project>, record: &StepOutputRecord, policy: &BestPolicy) -> ProjectSummary {
    let mut training: Vec<ModelResult> = list_at(record, StepId::Training, "models");
    let mut tuning: Vec<TuningResult> = list_at(record, StepId::Tuning, "results");
    // Re-select under the caller's policy rather than trusting stored flags.
    // Cannot fail: old bests are demoted first and only done entries are picked.
    let _ = mark_best(&mut training, policy);
    let _ = mark_best(&mut tuning, policy);

    let (best_model, best_accuracy) = match pick_best(&tuning, policy) {
        Some(i) => (Some(tuning[i].model.clone()), Some(tuning[i].best_score)),
        None => match pick_best(&training, policy) {
            Some(i) => (Some(training[i].name.clone()), Some(training[i].accuracy)),
            None => (None, None),
        },
    };

    let quality = record
        .field(StepId::Upload.key(), "quality_report")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let features_selected = record
        .field(StepId::FeatureSelection.key(), "selected_count")
        .and_then(Value::as_u64)
        .map(|n| n as usize);

    ProjectSummary {
        project: project.cloned(),
        best_model,
        best_accuracy,
        training,
        tuning,
        quality,
        features_selected,
        steps_recorded: record.keys().map(str::to_string).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub model: Option<String>,
    pub baseline_accuracy: Option<f64>,
    pub status: String,
    pub suggestions: Vec<Suggestion>,
}

pub fn monitor(summary: &ProjectSummary) -> MonitoringSnapshot {
    MonitoringSnapshot {
        model: summary.best_model.clone(),
        baseline_accuracy: summary.best_accuracy,
        status: if summary.best_model.is_some() { "healthy" } else { "idle" }.to_string(),
        suggestions: suggestions_for(StepId::Monitoring),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultsSimulator {
    pub policy: BestPolicy,
}

#[async_trait]
impl StepSimulator for ResultsSimulator {
    fn step(&self) -> StepId {
        StepId::Results
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        ctx.check_cancelled()?;
        ctx.report("results", 100.0);
        let summary = summarize(ctx.inputs.project.as_ref(), &ctx.inputs.record, &self.policy);
        Ok(json!({
            "best_model": summary.best_model,
            "best_accuracy": summary.best_accuracy,
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonitoringSimulator {
    pub policy: BestPolicy,
}

#[async_trait]
impl StepSimulator for MonitoringSimulator {
    fn step(&self) -> StepId {
        StepId::Monitoring
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        ctx.check_cancelled()?;
        ctx.report("monitoring", 100.0);
        let summary = summarize(ctx.inputs.project.as_ref(), &ctx.inputs.record, &self.policy);
        let snapshot = monitor(&summary);
        Ok(json!({
            "model": snapshot.model,
            "baseline_accuracy": snapshot.baseline_accuracy,
            "status": snapshot.status,
        }))
    }
}
