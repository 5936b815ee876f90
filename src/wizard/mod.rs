//! Wizard controller: which step is showing, what has completed, and the
//! outputs gathered so far. All transitions go through [`reducer::reduce`].

pub mod events;
pub mod record;
pub mod reducer;
pub mod state;
pub mod steps;

pub use events::{Command, WizardEvent};
pub use reducer::{reduce, ReducerOutput};
pub use state::{Banner, WizardState};
pub use steps::StepId;
