use serde::{Deserialize, Serialize};

/// The seven wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Upload,
    Preprocessing,
    FeatureSelection,
    Training,
    Tuning,
    Results,
    Monitoring,
}

pub const STEP_COUNT: usize = 7;

pub const ALL_STEPS: [StepId; STEP_COUNT] = [
    StepId::Upload,
    StepId::Preprocessing,
    StepId::FeatureSelection,
    StepId::Training,
    StepId::Tuning,
    StepId::Results,
    StepId::Monitoring,
];

impl StepId {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_STEPS.get(index).copied()
    }

    /// Key under which the step's payload lands in the output record.
    pub fn key(&self) -> &'static str {
        match self {
            StepId::Upload => "upload",
            StepId::Preprocessing => "preprocessing",
            StepId::FeatureSelection => "feature_selection",
            StepId::Training => "training",
            StepId::Tuning => "tuning",
            StepId::Results => "results",
            StepId::Monitoring => "monitoring",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepId::Upload => "Data Upload",
            StepId::Preprocessing => "Data Preprocessing",
            StepId::FeatureSelection => "Feature Selection",
            StepId::Training => "Model Training",
            StepId::Tuning => "Hyperparameter Tuning",
            StepId::Results => "Results",
            StepId::Monitoring => "Model Monitoring",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_STEPS.iter().copied().find(|s| s.key() == key)
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn is_last(&self) -> bool {
        self.index() + 1 == STEP_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_neighbours() {
        for (i, step) in ALL_STEPS.iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(StepId::from_index(i), Some(*step));
            assert_eq!(StepId::from_key(step.key()), Some(*step));
        }
        assert_eq!(StepId::Upload.prev(), None);
        assert_eq!(StepId::Upload.next(), Some(StepId::Preprocessing));
        assert_eq!(StepId::Monitoring.next(), None);
        assert!(StepId::Monitoring.is_last());
        assert_eq!(StepId::from_index(STEP_COUNT), None);
    }
}
