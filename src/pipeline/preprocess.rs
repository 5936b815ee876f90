use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::time::Duration;

use super::progress::{run_plan, ProgressPlan, SimContext, SimError};
use super::StepSimulator;
use crate::wizard::steps::StepId;

pub const PREPROCESS_DELAY: Duration = Duration::from_millis(2000);

pub const IMPUTATION_METHODS: [&str; 5] = ["mean", "median", "mode", "knn", "iterative"];
pub const ENCODING_METHODS: [&str; 5] = ["onehot", "ordinal", "binary", "frequency", "target"];
pub const SCALING_METHODS: [&str; 5] = ["standard", "minmax", "robust", "maxabs", "quantile"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Zscore,
    ModifiedZscore,
    Iqr,
    IsolationForest,
    Lof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierAction {
    Remove,
    Cap,
    TransformLog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub method: OutlierMethod,
    pub threshold: f64,
    pub action: OutlierAction,
}

/// Method name → columns, per preprocessing section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub imputation: BTreeMap<String, Vec<String>>,
    pub encoding: BTreeMap<String, Vec<String>>,
    pub scaling: BTreeMap<String, Vec<String>>,
    pub outlier: OutlierConfig,
}

fn section(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(method, cols)| {
            (method.to_string(), cols.iter().map(|c| c.to_string()).collect())
        })
        .collect()
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            imputation: section(&[("mean", &["age", "trestbps", "chol"]), ("mode", &["sex", "cp", "fbs"])]),
            encoding: section(&[("onehot", &["cp", "restecg"]), ("binary", &["sex", "fbs"])]),
            scaling: section(&[("standard", &["age", "trestbps", "chol"])]),
            outlier: OutlierConfig {
                method: OutlierMethod::Zscore,
                threshold: 3.0,
                action: OutlierAction::Cap,
            },
        }
    }
}

impl PreprocessingConfig {
    /// Toggle one column under `section.method`. Unknown sections are ignored.
    pub fn toggle(&mut self, section: &str, method: &str, column: &str) {
        let target = match section {
            "imputation" => &mut self.imputation,
            "encoding" => &mut self.encoding,
            "scaling" => &mut self.scaling,
            _ => return,
        };
        let cols = target.entry(method.to_string()).or_default();
        if let Some(pos) = cols.iter().position(|c| c == column) {
            cols.remove(pos);
        } else {
            cols.push(column.to_string());
        }
    }

    pub fn configured_columns(&self) -> usize {
        [&self.imputation, &self.encoding, &self.scaling]
            .iter()
            .flat_map(|s| s.values())
            .map(Vec::len)
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessSimulator {
    pub config: PreprocessingConfig,
}

#[async_trait]
impl StepSimulator for PreprocessSimulator {
    fn step(&self) -> StepId {
        StepId::Preprocessing
    }

    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError> {
        let plan = ProgressPlan::Delay { duration: PREPROCESS_DELAY };
        run_plan(&plan, "preprocessing", ctx, &mut ctx.rng(0)).await?;
        Ok(json!({
            "config": self.config,
            "configured_columns": self.config.configured_columns(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_demo() {
        let cfg = PreprocessingConfig::default();
        assert_eq!(cfg.imputation["mean"], vec!["age", "trestbps", "chol"]);
        assert_eq!(cfg.encoding["binary"], vec!["sex", "fbs"]);
        assert_eq!(cfg.outlier.threshold, 3.0);
        assert_eq!(cfg.configured_columns(), 13);
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["outlier"]["method"], "zscore");
        assert_eq!(v["outlier"]["action"], "cap");
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut cfg = PreprocessingConfig::default();
        cfg.toggle("scaling", "robust", "chol");
        assert_eq!(cfg.scaling["robust"], vec!["chol"]);
        cfg.toggle("scaling", "robust", "chol");
        assert!(cfg.scaling["robust"].is_empty());
        cfg.toggle("nonsense", "x", "y");
        assert_eq!(cfg.configured_columns(), 13);
    }
}
