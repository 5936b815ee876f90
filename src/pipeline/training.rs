//! Simulated model training.
//!
//! Known models resolve to fixed metrics. Anything else is a "custom" model
//! whose accuracy is drawn uniformly from [92, 98).

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use tokio::time::Duration;

use super::progress::{run_plan, ProgressPlan, SimContext, SimError};
use super::status::{apply_status, RunStatus, StatusEvent};
use super::StepSimulator;
use crate::aggregate::{mark_best, BestPolicy, Scored};
use crate::logging::log_model_result;
use crate::wizard::steps::StepId;

pub const TRAIN_INCREMENT: u32 = 10;
pub const TRAIN_TICK: Duration = Duration::from_millis(200);
pub const BETWEEN_MODELS: Duration = Duration::from_millis(2000);

pub const DEFAULT_MODELS: [&str; 3] = ["Random Forest", "XGBoost", "LightGBM"];
pub const CUSTOM_FALLBACK_NAME: &str = "Custom Model";

pub const CUSTOM_ACCURACY_MIN: f64 = 92.0;
pub const CUSTOM_ACCURACY_SPAN: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub training_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub training_time: f64,
    pub status: RunStatus,
}

impl ModelResult {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            training_time: 0.0,
            status: RunStatus::Pending,
        }
    }

    fn apply_metrics(&mut self, m: ModelMetrics) {
        self.accuracy = m.accuracy;
        self.precision = m.precision;
        self.recall = m.recall;
        self.f1 = m.f1;
        self.training_time = m.training_time;
    }
}

impl Scored for ModelResult {
    fn name(&self) -> &str {
        &self.name
    }
    fn score(&self) -> f64 {
        self.accuracy
    }
    fn status(&self) -> RunStatus {
        self.status
    }
    fn status_mut(&mut self) -> &mut RunStatus {
        &mut self.status
    }
}

pub fn known_metrics(name: &str) -> Option<ModelMetrics> {
    let (accuracy, precision, recall, f1, training_time) = match name {
        "Random Forest" => (96.89, 96.2, 97.1, 96.6, 1.2),
        "XGBoost" => (97.32, 97.0, 97.5, 97.2, 0.8),
        "LightGBM" => (98.54, 98.3, 98.7, 98.5, 0.6),
        _ => return None,
    };
    Some(ModelMetrics { accuracy, precision, recall, f1, training_time })
}

fn round_to(x: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (x * f).round() / f
}

pub fn custom_metrics(rng: &mut StdRng) -> ModelMetrics {
    let a = CUSTOM_ACCURACY_MIN + rng.gen::<f64>() * CUSTOM_ACCURACY_SPAN;
    ModelMetrics {
        accuracy: round_to(a, 2),
        precision: round_to(a - 0.5, 2),
        recall: round_to(a + 0.2, 2),
        f1: round_to(a - 0.1, 2),
        training_time: round_to(1.5 + rng.gen::<f64>() * 2.0, 1),
    }
}

pub fn generate_metrics(name: &str, rng: &mut StdRng) -> ModelMetrics {
    known_metrics(name).unwrap_or_else(|| custom_metrics(rng))
}

fn model_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\w+)\s*\(\)\s*\{").ok())
        .as_ref()
}

/// Name of a custom model from its `name() { ... }` snippet.
pub fn extract_model_name(code: &str) -> String {
    model_name_pattern()
        .and_then(|re| re.captures(code))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| CUSTOM_FALLBACK_NAME.to_string())
}

#[derive(Debug, Clone)]
pub struct TrainingSimulator {
    pub models: Vec<String>,
    pub custom_code: Option<String>,
    pub policy: BestPolicy,
}

impl Default for TrainingSimulator {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            custom_code: None,
            policy: BestPolicy::default(),
        }
    }
}

impl TrainingSimulator {
    pub fn with_custom(mut self, code: Option<String>) -> Self {
        self.custom_code = code;
        self
    }

    pub fn with_policy(mut self, policy: BestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Models in training order, custom model last.
    pub fn roster(&self) -> Vec<String> {
        let mut names = self.models.clone();
        if let Some(code) = self.custom_code.as_deref().filter(|c| !c.trim().is_empty()) {
            names.push(extract_model_name(code));
        }
        names
    }
}

#[async_trait]
impl StepSimulator for TrainingSimulator {
    fn step(&self) -> StepId {
        StepId::Training
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        let plan = ProgressPlan::Stepped {
            increment: TRAIN_INCREMENT,
            tick: TRAIN_TICK,
        };
        let roster = self.roster();
        let mut results: Vec<ModelResult> = roster.iter().map(|n| ModelResult::pending(n)).collect();
        let mut rng = ctx.rng(1);

        for model in results.iter_mut() {
            apply_status(&mut model.status, StatusEvent::Start)?;
            run_plan(&plan, &model.name, ctx, &mut rng).await?;
            model.apply_metrics(generate_metrics(&model.name, &mut rng));
            apply_status(&mut model.status, StatusEvent::Finish)?;
            log_model_result(
                &model.name,
                model.accuracy,
                model.f1,
                model.training_time,
                model.status.label("training"),
            );
            ctx.pause(BETWEEN_MODELS).await?;
        }

        let best = mark_best(&mut results, &self.policy)?.map(|i| results[i].name.clone());
        let custom = self
            .custom_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(extract_model_name);
        Ok(json!({
            "models": results,
            "best_model": best,
            "custom_model": custom,
        }))
    }
}
