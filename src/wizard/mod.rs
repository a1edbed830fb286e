//! Task creation wizard.
//!
//! A per-user, linear state machine that collects a task's fields one step
//! at a time and stages them in a [`Draft`] until the user confirms.
//!
//! # State Machine
//! ```text
//! Name -> Description -> Category -> Priority -> Deadline -> Confirmation -> [Committed]
//!                          (skip)     (skip)      (skip)
//! Back steps one stage toward Name; Back at Name or Cancel anywhere -> [Cancelled]
//! ```
//!
//! The wizard holds no IO. The dispatcher feeds it inputs, renders the prompt
//! for the step it lands on, and commits the returned [`NewTask`].

mod step;
mod transition;

pub use step::{Draft, WizardStep};
pub use transition::{transition, InputKind, Transition};

use crate::task::{validate_task_name, NewTask, Priority, TaskError};
use step::non_empty;

/// One user action addressed to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Text(String),
    /// Skip button belonging to a specific step.
    Skip(WizardStep),
    SetPriority(Priority),
    Back,
    Save,
    Cancel,
}

impl WizardInput {
    pub fn kind(&self) -> InputKind {
        match self {
            WizardInput::Text(_) => InputKind::Text,
            WizardInput::Skip(step) => InputKind::Skip(*step),
            WizardInput::SetPriority(_) => InputKind::Priority,
            WizardInput::Back => InputKind::Back,
            WizardInput::Save => InputKind::Save,
            WizardInput::Cancel => InputKind::Cancel,
        }
    }
}

/// What the caller should do after an input was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Session continues; show the prompt for this step.
    Prompt(WizardStep),
    /// Session is over; persist this task.
    Commit(NewTask),
    /// Session is over; the draft was discarded.
    Cancelled,
}

impl WizardOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WizardOutcome::Prompt(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("{input:?} is not valid at step {step:?}")]
    InvalidTransition { step: WizardStep, input: InputKind },

    #[error(transparent)]
    Invalid(#[from] TaskError),
}

/// A wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wizard {
    step: WizardStep,
    draft: Draft,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Apply one input.
    ///
    /// On error the step and the draft are left untouched.
    pub fn apply(&mut self, input: WizardInput) -> Result<WizardOutcome, WizardError> {
        let kind = input.kind();
        let transition = transition(self.step, kind).ok_or(WizardError::InvalidTransition {
            step: self.step,
            input: kind,
        })?;

        match transition {
            Transition::Advance(next) => {
                self.record(input)?;
                self.step = next;
                Ok(WizardOutcome::Prompt(next))
            }
            Transition::Retreat(previous) => {
                self.step = previous;
                Ok(WizardOutcome::Prompt(previous))
            }
            Transition::Commit => Ok(WizardOutcome::Commit(self.draft.to_new_task()?)),
            Transition::Cancel => Ok(WizardOutcome::Cancelled),
        }
    }

    fn record(&mut self, input: WizardInput) -> Result<(), WizardError> {
        let draft = &mut self.draft;
        match (self.step, input) {
            (WizardStep::Name, WizardInput::Text(text)) => {
                draft.name = Some(validate_task_name(&text)?);
            }
            (WizardStep::Description, WizardInput::Text(text)) => {
                draft.description = non_empty(&text);
            }
            (WizardStep::Category, WizardInput::Text(text)) => {
                draft.category = non_empty(&text);
            }
            (WizardStep::Priority, WizardInput::SetPriority(priority)) => {
                draft.priority = Some(priority);
            }
            (WizardStep::Deadline, WizardInput::Text(text)) => {
                draft.deadline = non_empty(&text);
            }
            (WizardStep::Category, WizardInput::Skip(_)) => draft.category = None,
            (WizardStep::Priority, WizardInput::Skip(_)) => draft.priority = None,
            (WizardStep::Deadline, WizardInput::Skip(_)) => draft.deadline = None,
            (step, input) => {
                return Err(WizardError::InvalidTransition {
                    step,
                    input: input.kind(),
                })
            }
        }
        Ok(())
    }
}
