use crate::aggregate::BestPolicy;
use crate::pipeline::tuning::{TuningMethod, DEFAULT_MAX_TRIALS};
use crate::project::ProblemType;

#[derive(Clone, Debug)]
pub struct WizardConfig {
    /// Multiplier on every simulated wait. 0 runs the pipeline without sleeping.
    pub time_scale: f64,
    pub best_policy: BestPolicy,
    pub custom_model: Option<String>,
    pub tuning_method: TuningMethod,
    pub max_trials: u32,
    pub store_path: Option<String>,
    pub project_name: String,
    pub project_description: String,
    pub problem_type: ProblemType,
    pub file_name: String,
    pub file_size: u64,
    /// Fixes the jitter streams when set.
    pub seed: Option<u64>,
    /// Emit an audit record (record digest + state hash) after each step.
    pub audit_steps: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            best_policy: BestPolicy::default(),
            custom_model: None,
            tuning_method: TuningMethod::Bayesian,
            max_trials: DEFAULT_MAX_TRIALS,
            store_path: None,
            project_name: "Heart Disease Prediction".to_string(),
            project_description: String::new(),
            problem_type: ProblemType::Classification,
            file_name: "heart.csv".to_string(),
            file_size: 38_114,
            seed: None,
            audit_steps: true,
        }
    }
}

impl WizardConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            time_scale: std::env::var("TIME_SCALE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.time_scale),
            best_policy: std::env::var("BEST_POLICY").ok().and_then(|v| BestPolicy::parse(&v)).unwrap_or(d.best_policy),
            custom_model: std::env::var("CUSTOM_MODEL").ok().filter(|v| !v.trim().is_empty()),
            tuning_method: std::env::var("TUNING_METHOD").ok().and_then(|v| TuningMethod::parse(&v)).unwrap_or(d.tuning_method),
            max_trials: std::env::var("MAX_TRIALS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.max_trials),
            store_path: std::env::var("STORE_PATH").ok().filter(|v| !v.trim().is_empty()),
            project_name: std::env::var("PROJECT_NAME").unwrap_or(d.project_name),
            project_description: std::env::var("PROJECT_DESCRIPTION").unwrap_or(d.project_description),
            problem_type: std::env::var("PROBLEM_TYPE").ok().and_then(|v| ProblemType::parse(&v)).unwrap_or(d.problem_type),
            file_name: std::env::var("DATASET_FILE").unwrap_or(d.file_name),
            file_size: std::env::var("DATASET_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.file_size),
            seed: std::env::var("SIM_SEED").ok().and_then(|v| v.parse().ok()),
            audit_steps: std::env::var("AUDIT_STEPS").ok().map(|v| v != "0" && v != "false").unwrap_or(d.audit_steps),
        }
    }

    /// Defaults with no real waiting.
    pub fn instant() -> Self {
        Self {
            time_scale: 0.0,
            ..Self::default()
        }
    }

    pub fn with_custom_model(mut self, code: &str) -> Self {
        self.custom_model = Some(code.to_string());
        self
    }

    pub fn with_policy(mut self, policy: BestPolicy) -> Self {
        self.best_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = WizardConfig::default();
        assert_eq!(cfg.time_scale, 1.0);
        assert_eq!(cfg.best_policy, BestPolicy::NameMatch("LightGBM".to_string()));
        assert_eq!(cfg.max_trials, 50);
        assert!(cfg.store_path.is_none());
        assert_eq!(WizardConfig::instant().time_scale, 0.0);
    }

    #[test]
    fn test_builders() {
        let cfg = WizardConfig::instant()
            .with_custom_model("deepNet() {}")
            .with_policy(BestPolicy::HighestScore)
            .with_seed(3);
        assert_eq!(cfg.custom_model.as_deref(), Some("deepNet() {}"));
        assert_eq!(cfg.best_policy, BestPolicy::HighestScore);
        assert_eq!(cfg.seed, Some(3));
    }
}
