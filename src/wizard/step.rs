//! Wizard steps and the draft they fill in.

use crate::task::{parse_deadline, validate_task_name, NewTask, Priority, TaskError};

/// A step of the task creation wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WizardStep {
    #[default]
    Name,
    Description,
    Category,
    Priority,
    Deadline,
    Confirmation,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Name,
        WizardStep::Description,
        WizardStep::Category,
        WizardStep::Priority,
        WizardStep::Deadline,
        WizardStep::Confirmation,
    ];

    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Name => Some(WizardStep::Description),
            WizardStep::Description => Some(WizardStep::Category),
            WizardStep::Category => Some(WizardStep::Priority),
            WizardStep::Priority => Some(WizardStep::Deadline),
            WizardStep::Deadline => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Name => None,
            WizardStep::Description => Some(WizardStep::Name),
            WizardStep::Category => Some(WizardStep::Description),
            WizardStep::Priority => Some(WizardStep::Category),
            WizardStep::Deadline => Some(WizardStep::Priority),
            WizardStep::Confirmation => Some(WizardStep::Deadline),
        }
    }

    /// Optional fields can be skipped.
    pub fn is_skippable(self) -> bool {
        matches!(
            self,
            WizardStep::Category | WizardStep::Priority | WizardStep::Deadline
        )
    }
}

/// Fields collected so far. Nothing here is persisted until commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// `None` when skipped; commits as the default priority.
    pub priority: Option<Priority>,
    /// Raw deadline text; parsed only at commit.
    pub deadline: Option<String>,
}

impl Draft {
    pub fn effective_priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// Build the task to commit.
    ///
    /// A deadline that does not match `DD-MM-YYYY HH:MM:SS` is dropped, not
    /// rejected.
    pub fn to_new_task(&self) -> Result<NewTask, TaskError> {
        let name = validate_task_name(self.name.as_deref().unwrap_or_default())?;
        let deadline = match self.deadline.as_deref() {
            Some(raw) => {
                let parsed = parse_deadline(raw);
                if parsed.is_none() {
                    tracing::debug!(raw, "Unparseable deadline dropped");
                }
                parsed
            }
            None => None,
        };

        Ok(NewTask {
            name,
            description: self.description.clone(),
            category: self.category.clone(),
            priority: self.effective_priority(),
            deadline,
        })
    }
}

/// Trimmed text, or `None` if nothing is left.
pub(crate) fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
