//! Lifecycle of one simulated unit of work (a step, a model, a tuning run).
//!
//! `Pending → Running → Completed → Best`. There is no failed state; a
//! simulated run cannot fail, it can only be cancelled before completion.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Best,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Best => "best",
        }
    }

    /// Label shown next to a model; `verb` is "training" or "tuning".
    pub fn label<'a>(&self, verb: &'a str) -> &'a str {
        match self {
            RunStatus::Running => verb,
            other => other.as_str(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Best)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Start,
    Finish,
    MarkBest,
    /// Back to pending, used when a wizard run is reset.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub msg: String,
}

impl TransitionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for TransitionError {}

pub fn apply_status(status: &mut RunStatus, event: StatusEvent) -> Result<(), TransitionError> {
    match (*status, event) {
        (RunStatus::Pending, StatusEvent::Start) => {
            *status = RunStatus::Running;
            Ok(())
        }
        (RunStatus::Running, StatusEvent::Finish) => {
            *status = RunStatus::Completed;
            Ok(())
        }
        (RunStatus::Completed, StatusEvent::MarkBest) => {
            *status = RunStatus::Best;
            Ok(())
        }
        (RunStatus::Best, StatusEvent::MarkBest) => Ok(()),
        (_, StatusEvent::Reset) => {
            *status = RunStatus::Pending;
            Ok(())
        }
        (from, event) => Err(TransitionError::new(format!(
            "invalid status transition: {} on {:?}",
            from.as_str(),
            event
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut s = RunStatus::Pending;
        apply_status(&mut s, StatusEvent::Start).unwrap();
        assert_eq!(s, RunStatus::Running);
        apply_status(&mut s, StatusEvent::Finish).unwrap();
        assert_eq!(s, RunStatus::Completed);
        apply_status(&mut s, StatusEvent::MarkBest).unwrap();
        assert_eq!(s, RunStatus::Best);
        apply_status(&mut s, StatusEvent::MarkBest).unwrap();
        assert_eq!(s, RunStatus::Best);
    }

    #[test]
    fn test_rejects_skipping_running() {
        let mut s = RunStatus::Pending;
        assert!(apply_status(&mut s, StatusEvent::Finish).is_err());
        assert!(apply_status(&mut s, StatusEvent::MarkBest).is_err());
        assert_eq!(s, RunStatus::Pending);
    }

    #[test]
    fn test_rejects_restart_of_completed() {
        let mut s = RunStatus::Completed;
        assert!(apply_status(&mut s, StatusEvent::Start).is_err());
        apply_status(&mut s, StatusEvent::Reset).unwrap();
        assert_eq!(s, RunStatus::Pending);
    }

    #[test]
    fn test_labels() {
        assert_eq!(RunStatus::Running.label("training"), "training");
        assert_eq!(RunStatus::Running.label("tuning"), "tuning");
        assert_eq!(RunStatus::Best.label("tuning"), "best");
        assert!(RunStatus::Best.is_done());
        assert!(!RunStatus::Running.is_done());
    }
}
