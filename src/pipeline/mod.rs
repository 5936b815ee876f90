//! Mock pipeline: one simulator per wizard step.

pub mod features;
pub mod jobs;
pub mod preprocess;
pub mod progress;
pub mod status;
pub mod suggestions;
pub mod training;
pub mod tuning;
pub mod upload;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aggregate::{MonitoringSimulator, ResultsSimulator};
use crate::config::WizardConfig;
use crate::wizard::steps::{StepId, ALL_STEPS};
use progress::{SimContext, SimError};

/// Produces the canned payload for one step after its progress loop.
#[async_trait]
pub trait StepSimulator: Send + Sync {
    fn step(&self) -> StepId;
    async fn simulate(&self, ctx: &SimContext) -> Result<Value, SimError>;
}

#[derive(Clone)]
pub struct SimulatorSet {
    sims: BTreeMap<StepId, Arc<dyn StepSimulator>>,
}

impl SimulatorSet {
    pub fn empty() -> Self {
        Self { sims: BTreeMap::new() }
    }

    pub fn from_config(cfg: &WizardConfig) -> Self {
        let mut set = Self::empty();
        set.insert(Arc::new(upload::UploadSimulator::new(&cfg.file_name, cfg.file_size)));
        set.insert(Arc::new(preprocess::PreprocessSimulator::default()));
        set.insert(Arc::new(features::FeatureSimulator::default()));
        set.insert(Arc::new(
            training::TrainingSimulator::default()
                .with_custom(cfg.custom_model.clone())
                .with_policy(cfg.best_policy.clone()),
        ));
        set.insert(Arc::new(tuning::TuningSimulator {
            method: cfg.tuning_method,
            max_trials: cfg.max_trials,
            policy: cfg.best_policy.clone(),
            ..Default::default()
        }));
        set.insert(Arc::new(ResultsSimulator { policy: cfg.best_policy.clone() }));
        set.insert(Arc::new(MonitoringSimulator { policy: cfg.best_policy.clone() }));
        set
    }

    /// Replaces whatever simulator was registered for the same step.
    pub fn insert(&mut self, sim: Arc<dyn StepSimulator>) {
        self.sims.insert(sim.step(), sim);
    }

    pub fn get(&self, step: StepId) -> Option<Arc<dyn StepSimulator>> {
        self.sims.get(&step).cloned()
    }

    pub fn is_complete(&self) -> bool {
        ALL_STEPS.iter().all(|s| self.sims.contains_key(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_covers_every_step() {
        let set = SimulatorSet::from_config(&WizardConfig::instant());
        assert!(set.is_complete());
        for step in ALL_STEPS {
            assert_eq!(set.get(step).map(|s| s.step()), Some(step));
        }
        assert!(!SimulatorSet::empty().is_complete());
    }
}
