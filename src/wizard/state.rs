//! Wizard state with a deterministic hash for audit logs.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::record::StepOutputRecord;
use super::steps::{StepId, STEP_COUNT};
use crate::pipeline::status::TransitionError;
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub dismissible: bool,
}

impl Banner {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            dismissible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step: StepId,
    pub completed: [bool; STEP_COUNT],
    pub accumulated: StepOutputRecord,
    pub project: Option<Project>,
    pub banner: Option<Banner>,
    /// Events applied so far.
    pub seq: u64,
    /// Bumped by every reset. Step runs started under an older value are stale.
    #[serde(default)]
    pub generation: u64,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            current_step: StepId::Upload,
            completed: [false; STEP_COUNT],
            accumulated: StepOutputRecord::new(),
            project: None,
            banner: None,
            seq: 0,
            generation: 0,
        }
    }

    pub fn is_completed(&self, step: StepId) -> bool {
        self.completed[step.index()]
    }

    pub fn mark_completed(&mut self, step: StepId) {
        self.completed[step.index()] = true;
    }

    pub fn completed_count(&self) -> usize {
        self.completed.iter().filter(|c| **c).count()
    }

    pub fn can_advance(&self) -> bool {
        self.is_completed(self.current_step) && !self.current_step.is_last()
    }

    /// Moves to the next step once the current one has completed. At the last
    /// step this is a no-op.
    pub fn advance(&mut self) -> Result<(), TransitionError> {
        if !self.is_completed(self.current_step) {
            return Err(TransitionError::new(format!(
                "step {} has not completed",
                self.current_step.key()
            )));
        }
        if let Some(next) = self.current_step.next() {
            self.current_step = next;
        }
        Ok(())
    }

    /// Floors at the first step.
    pub fn retreat(&mut self) {
        if let Some(prev) = self.current_step.prev() {
            self.current_step = prev;
        }
    }

    pub fn hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.current_step.hash(&mut h);
        self.completed.hash(&mut h);
        self.seq.hash(&mut h);
        self.generation.hash(&mut h);
        self.accumulated.digest().hash(&mut h);
        self.project.as_ref().map(|p| p.id.as_str()).hash(&mut h);
        self.banner.as_ref().map(|b| b.message.as_str()).hash(&mut h);
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_requires_completion() {
        let mut s = WizardState::new();
        assert!(s.advance().is_err());
        assert_eq!(s.current_step, StepId::Upload);
        s.mark_completed(StepId::Upload);
        s.advance().unwrap();
        assert_eq!(s.current_step, StepId::Preprocessing);
    }

    #[test]
    fn test_last_step_advance_is_noop() {
        let mut s = WizardState::new();
        s.current_step = StepId::Monitoring;
        s.mark_completed(StepId::Monitoring);
        assert!(!s.can_advance());
        s.advance().unwrap();
        assert_eq!(s.current_step, StepId::Monitoring);
    }

    #[test]
    fn test_retreat_floors_at_zero() {
        let mut s = WizardState::new();
        s.retreat();
        s.retreat();
        assert_eq!(s.current_step, StepId::Upload);
    }

    #[test]
    fn test_hash_tracks_changes() {
        let a = WizardState::new();
        let mut b = WizardState::new();
        assert_eq!(a.hash(), b.hash());
        b.accumulated.merge_step_output("upload", serde_json::json!({"file": "x"}));
        assert_ne!(a.hash(), b.hash());
    }
}
