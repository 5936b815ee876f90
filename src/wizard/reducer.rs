//! Pure reducer: (WizardState, WizardEvent) -> (WizardState, Vec<Command>)
//!
//! Nothing here sleeps, spawns or logs. Side effects come back as commands.

use super::events::{Command, WizardEvent};
use super::state::{Banner, WizardState};
use super::steps::StepId;
use crate::config::WizardConfig;
use crate::logging::Level;

#[derive(Debug)]
pub struct ReducerOutput {
    pub commands: Vec<Command>,
    pub state_hash: u64,
}

pub fn reduce(state: &mut WizardState, event: WizardEvent, cfg: &WizardConfig) -> ReducerOutput {
    let mut commands = Vec::new();
    state.seq += 1;

    match event {
        WizardEvent::Advance => {
            let from = state.current_step;
            match state.advance() {
                Ok(()) if state.current_step != from => {
                    commands.push(Command::StepEntered(state.current_step));
                }
                Ok(()) => commands.push(Command::Log {
                    level: Level::Debug,
                    msg: format!("advance ignored: {} is the last step", from.key()),
                }),
                Err(e) => commands.push(Command::Log {
                    level: Level::Warn,
                    msg: format!("advance rejected: {}", e),
                }),
            }
        }

        WizardEvent::Retreat => {
            if state.current_step == StepId::Upload {
                commands.push(Command::Log {
                    level: Level::Debug,
                    msg: "retreat ignored: already at the first step".to_string(),
                });
            } else {
                state.retreat();
            }
        }

        WizardEvent::StepCompleted { step, payload } => {
            state.mark_completed(step);
            state.accumulated.merge_step_output(step.key(), payload);
            if cfg.audit_steps {
                commands.push(Command::Audit {
                    step,
                    digest: state.accumulated.digest(),
                });
            }
        }

        WizardEvent::MergeOutput { key, payload } => {
            state.accumulated.merge_step_output(&key, payload);
        }

        WizardEvent::ProjectCreated(project) => {
            state.project = Some(project);
            state.banner = None;
        }

        WizardEvent::ProjectFailed { message } => {
            commands.push(Command::Log {
                level: Level::Error,
                msg: format!("project creation failed: {}", message),
            });
            state.banner = Some(Banner::error(&message));
        }

        WizardEvent::DismissBanner => {
            if state.banner.as_ref().map(|b| b.dismissible).unwrap_or(false) {
                state.banner = None;
            }
        }

        WizardEvent::Reset => {
            state.current_step = StepId::Upload;
            state.completed = Default::default();
            state.accumulated.clear();
            state.banner = None;
            state.generation += 1;
            commands.push(Command::StepEntered(StepId::Upload));
        }
    }

    ReducerOutput {
        commands,
        state_hash: state.hash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ProblemType, Project, ProjectDraft};
    use crate::wizard::steps::{ALL_STEPS, STEP_COUNT};
    use serde_json::json;

    fn cfg() -> WizardConfig {
        WizardConfig::instant()
    }

    fn complete(state: &mut WizardState, step: StepId) -> ReducerOutput {
        reduce(state, WizardEvent::StepCompleted { step, payload: json!({"done": true}) }, &cfg())
    }

    #[test]
    fn test_advance_bounded_by_step_count() {
        for n in 0..12 {
            let mut s = WizardState::new();
            for step in ALL_STEPS {
                complete(&mut s, step);
            }
            for _ in 0..n {
                reduce(&mut s, WizardEvent::Advance, &cfg());
            }
            assert!(s.current_step.index() <= n.min(STEP_COUNT - 1));
            assert_eq!(s.current_step.index(), n.min(STEP_COUNT - 1));
        }
    }

    #[test]
    fn test_advance_gated_on_completion() {
        let mut s = WizardState::new();
        let out = reduce(&mut s, WizardEvent::Advance, &cfg());
        assert_eq!(s.current_step, StepId::Upload);
        assert!(matches!(out.commands[0], Command::Log { level: Level::Warn, .. }));

        complete(&mut s, StepId::Upload);
        let out = reduce(&mut s, WizardEvent::Advance, &cfg());
        assert_eq!(out.commands, vec![Command::StepEntered(StepId::Preprocessing)]);
    }

    #[test]
    fn test_retreat_at_first_step_stays() {
        let mut s = WizardState::new();
        reduce(&mut s, WizardEvent::Retreat, &cfg());
        assert_eq!(s.current_step, StepId::Upload);

        complete(&mut s, StepId::Upload);
        reduce(&mut s, WizardEvent::Advance, &cfg());
        reduce(&mut s, WizardEvent::Retreat, &cfg());
        assert_eq!(s.current_step, StepId::Upload);
        assert!(s.is_completed(StepId::Upload));
    }

    #[test]
    fn test_step_completed_merges_and_audits() {
        let mut s = WizardState::new();
        let out = reduce(
            &mut s,
            WizardEvent::StepCompleted { step: StepId::Training, payload: json!({"best_model": "LightGBM"}) },
            &cfg(),
        );
        assert!(s.is_completed(StepId::Training));
        assert_eq!(s.accumulated.field("training", "best_model"), Some(&json!("LightGBM")));
        assert_eq!(
            out.commands,
            vec![Command::Audit { step: StepId::Training, digest: s.accumulated.digest() }]
        );

        let quiet = WizardConfig { audit_steps: false, ..cfg() };
        let out = reduce(&mut s, WizardEvent::StepCompleted { step: StepId::Tuning, payload: json!({}) }, &quiet);
        assert!(out.commands.is_empty());
    }

    #[test]
    fn test_merge_output_last_write_wins() {
        let mut s = WizardState::new();
        reduce(&mut s, WizardEvent::MergeOutput { key: "tuning".into(), payload: json!({"method": "grid", "trials": 50}) }, &cfg());
        reduce(&mut s, WizardEvent::MergeOutput { key: "tuning".into(), payload: json!({"method": "random"}) }, &cfg());
        assert_eq!(s.accumulated.get("tuning"), Some(&json!({"method": "random", "trials": 50})));
        assert!(!s.is_completed(StepId::Tuning));
    }

    #[test]
    fn test_project_failure_sets_dismissible_banner() {
        let mut s = WizardState::new();
        reduce(&mut s, WizardEvent::ProjectFailed { message: "project name must not be empty".into() }, &cfg());
        assert_eq!(s.banner.as_ref().map(|b| b.message.as_str()), Some("project name must not be empty"));
        reduce(&mut s, WizardEvent::DismissBanner, &cfg());
        assert!(s.banner.is_none());
    }

    #[test]
    fn test_project_created_clears_banner() {
        let mut s = WizardState::new();
        reduce(&mut s, WizardEvent::ProjectFailed { message: "x".into() }, &cfg());
        let project = Project::from_draft(&ProjectDraft::new("Heart", ProblemType::Classification)).unwrap();
        reduce(&mut s, WizardEvent::ProjectCreated(project.clone()), &cfg());
        assert!(s.banner.is_none());
        assert_eq!(s.project, Some(project));
    }

    #[test]
    fn test_reset_keeps_project() {
        let mut s = WizardState::new();
        let project = Project::from_draft(&ProjectDraft::new("Heart", ProblemType::Classification)).unwrap();
        reduce(&mut s, WizardEvent::ProjectCreated(project), &cfg());
        complete(&mut s, StepId::Upload);
        reduce(&mut s, WizardEvent::Advance, &cfg());
        reduce(&mut s, WizardEvent::Reset, &cfg());
        assert_eq!(s.current_step, StepId::Upload);
        assert_eq!(s.completed_count(), 0);
        assert!(s.accumulated.is_empty());
        assert!(s.project.is_some());
        assert_eq!(s.generation, 1);
    }

    #[test]
    fn test_same_events_same_hash() {
        let run = || {
            let mut s = WizardState::new();
            complete(&mut s, StepId::Upload);
            reduce(&mut s, WizardEvent::Advance, &cfg()).state_hash
        };
        assert_eq!(run(), run());
    }
}
