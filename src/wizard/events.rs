use serde_json::Value;

use super::steps::StepId;
use crate::logging::Level;
use crate::project::Project;

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Advance,
    Retreat,
    /// A step's simulation resolved. Sets its flag and merges the payload.
    StepCompleted { step: StepId, payload: Value },
    /// Raw merge into the record without touching completion flags.
    MergeOutput { key: String, payload: Value },
    ProjectCreated(Project),
    ProjectFailed { message: String },
    DismissBanner,
    /// Back to the first step with an empty record. The project is kept.
    Reset,
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::Advance => "advance",
            WizardEvent::Retreat => "retreat",
            WizardEvent::StepCompleted { .. } => "step_completed",
            WizardEvent::MergeOutput { .. } => "merge_output",
            WizardEvent::ProjectCreated(_) => "project_created",
            WizardEvent::ProjectFailed { .. } => "project_failed",
            WizardEvent::DismissBanner => "dismiss_banner",
            WizardEvent::Reset => "reset",
        }
    }
}

/// Side effects requested by the reducer, executed by the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Log { level: Level, msg: String },
    /// The wizard now shows this step. Running it is up to the caller.
    StepEntered(StepId),
    Audit { step: StepId, digest: String },
}
