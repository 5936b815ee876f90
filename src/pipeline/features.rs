use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Duration;

use super::progress::{run_plan, ProgressPlan, SimContext, SimError};
use super::StepSimulator;
use crate::wizard::steps::StepId;

pub const FEATURE_DELAY: Duration = Duration::from_millis(1500);

pub const HEART_FEATURES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub available: Vec<String>,
    pub selected: Vec<String>,
    pub method: String,
    pub threshold: f64,
    pub max_features: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let all: Vec<String> = HEART_FEATURES.iter().map(|f| f.to_string()).collect();
        Self {
            available: all.clone(),
            selected: all,
            method: "correlation".to_string(),
            threshold: 0.1,
            max_features: 10,
        }
    }
}

impl FeatureConfig {
    pub fn toggle(&mut self, feature: &str) {
        if let Some(pos) = self.selected.iter().position(|f| f == feature) {
            self.selected.remove(pos);
        } else if self.available.iter().any(|f| f == feature) {
            self.selected.push(feature.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.available.clone();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSimulator {
    pub config: FeatureConfig,
}

#[async_trait]
impl StepSimulator for FeatureSimulator {
    fn step(&self) -> StepId {
        StepId::FeatureSelection
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        let plan = ProgressPlan::Delay { duration: FEATURE_DELAY };
        run_plan(&plan, "feature_selection", ctx, &mut ctx.rng(0)).await?;
        Ok(json!({
            "config": self.config,
            "selected_count": self.config.selected.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_only_known_features() {
        let mut cfg = FeatureConfig::default();
        assert_eq!(cfg.selected.len(), 13);
        cfg.toggle("chol");
        assert_eq!(cfg.selected.len(), 12);
        cfg.toggle("chol");
        assert_eq!(cfg.selected.len(), 13);
        cfg.deselect_all();
        cfg.toggle("bmi");
        assert!(cfg.selected.is_empty());
        cfg.select_all();
        assert_eq!(cfg.selected, cfg.available);
    }

    #[tokio::test]
    async fn test_payload_reports_selection() {
        let mut sim = FeatureSimulator::default();
        sim.config.toggle("ca");
        let payload = sim
            .simulate(&SimContext::new(StepId::FeatureSelection, 0.0))
            .await
            .unwrap();
        assert_eq!(payload["selected_count"], 12);
        assert_eq!(payload["config"]["method"], "correlation");
    }
}
