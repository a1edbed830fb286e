//! The wizard's transition table.
//!
//! Pure: maps `(step, input kind)` to a transition without touching the
//! draft. `None` means the input does not apply to that step.

use super::step::WizardStep;

/// Shape of a wizard input, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Free-text reply.
    Text,
    /// Skip button for the given step.
    Skip(WizardStep),
    /// One of the fixed priority buttons.
    Priority,
    /// Step back one stage.
    Back,
    /// Commit the draft.
    Save,
    /// Abandon the draft ("back to menu").
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Store the input into the draft and move forward.
    Advance(WizardStep),
    /// Move back one step, keeping the draft.
    Retreat(WizardStep),
    /// Commit the draft through the store.
    Commit,
    /// Discard the draft and end the session.
    Cancel,
}

/// Look up the transition for `input` at `step`.
///
/// ```text
/// Name -> Description -> Category -> Priority -> Deadline -> Confirmation -> Commit
///   ^ back     ^ back       ^ back      ^ back       ^ back
/// Back at Name cancels; Cancel is valid everywhere.
/// ```
pub fn transition(step: WizardStep, input: InputKind) -> Option<Transition> {
    use InputKind as I;
    use WizardStep as S;

    match (step, input) {
        (_, I::Cancel) => Some(Transition::Cancel),

        (S::Name, I::Back) => Some(Transition::Cancel),
        (step, I::Back) => step.previous().map(Transition::Retreat),

        (S::Name, I::Text) => Some(Transition::Advance(S::Description)),
        (S::Description, I::Text) => Some(Transition::Advance(S::Category)),
        (S::Category, I::Text) => Some(Transition::Advance(S::Priority)),
        (S::Priority, I::Priority) => Some(Transition::Advance(S::Deadline)),
        (S::Deadline, I::Text) => Some(Transition::Advance(S::Confirmation)),

        (step, I::Skip(target)) if step == target && step.is_skippable() => {
            step.next().map(Transition::Advance)
        }

        (S::Confirmation, I::Save) => Some(Transition::Commit),

        _ => None,
    }
}
