//! Button layouts attached to replies.

use super::event::{Action, Button, Keyboard, MenuButton};
use crate::task::Priority;
use crate::wizard::WizardStep;

fn inline(rows: Vec<Vec<Button>>) -> Keyboard {
    Keyboard::Inline { rows }
}

pub fn main_menu() -> Keyboard {
    inline(vec![
        vec![Button::new("➕ Add task", Action::AddTask)],
        vec![
            Button::new("📋 My tasks", Action::ListTasks),
            Button::new("📅 Today", Action::TodayTasks),
        ],
        vec![
            Button::new("🏷️ Categories", Action::Categories),
            Button::new("📊 Statistics", Action::Stats),
        ],
    ])
}

/// Persistent keyboard shown by `/next`.
pub fn reply_menu() -> Keyboard {
    Keyboard::Reply {
        rows: vec![
            vec![MenuButton::MainMenu.label().to_string()],
            vec![
                MenuButton::AddTask.label().to_string(),
                MenuButton::TaskList.label().to_string(),
            ],
            vec![MenuButton::Today.label().to_string()],
        ],
        placeholder: "Choose an action".to_string(),
    }
}

pub fn back_to_menu() -> Keyboard {
    inline(vec![vec![Button::new("🏠 Main menu", Action::BackToMenu)]])
}

/// Wizard steps that take free text.
pub fn back_in_task() -> Keyboard {
    inline(vec![
        vec![Button::new("⬅️ Back", Action::BackInTask)],
        vec![Button::new("🏠 Main menu", Action::BackToMenu)],
    ])
}

pub fn category_step() -> Keyboard {
    inline(vec![
        vec![Button::new("⏭️ Skip", Action::SkipCategory)],
        vec![
            Button::new("⬅️ Back", Action::BackInTask),
            Button::new("🏠 Main menu", Action::BackToMenu),
        ],
    ])
}

pub fn priority_step() -> Keyboard {
    let levels = [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .map(|p| {
            Button::new(
                &format!("{} {}", p.emoji(), p.label()),
                Action::SetPriority(p),
            )
        })
        .collect();

    inline(vec![
        levels,
        vec![Button::new("⏭️ Skip", Action::SkipPriority)],
        vec![
            Button::new("⬅️ Back", Action::BackInTask),
            Button::new("🏠 Main menu", Action::BackToMenu),
        ],
    ])
}

pub fn deadline_step() -> Keyboard {
    inline(vec![
        vec![Button::new("⏭️ Skip", Action::SkipDeadline)],
        vec![
            Button::new("⬅️ Back", Action::BackInTask),
            Button::new("🏠 Main menu", Action::BackToMenu),
        ],
    ])
}

pub fn confirmation() -> Keyboard {
    inline(vec![
        vec![Button::new("✅ Save", Action::SaveTask)],
        vec![
            Button::new("⬅️ Back", Action::BackInTask),
            Button::new("🏠 Main menu", Action::BackToMenu),
        ],
    ])
}

/// Keyboard attached to the prompt of a wizard step.
pub fn wizard_step(step: WizardStep) -> Keyboard {
    match step {
        WizardStep::Name | WizardStep::Description => back_in_task(),
        WizardStep::Category => category_step(),
        WizardStep::Priority => priority_step(),
        WizardStep::Deadline => deadline_step(),
        WizardStep::Confirmation => confirmation(),
    }
}

pub fn categories_menu() -> Keyboard {
    inline(vec![
        vec![Button::new("📂 Show categories", Action::ShowCategories)],
        vec![Button::new("➕ Create category", Action::CreateCategory)],
        vec![Button::new("🗑️ Delete category", Action::DeleteCategory)],
        vec![Button::new("🏠 Main menu", Action::BackToMenu)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_step_offers_every_level_and_skip() {
        let keyboard = priority_step();
        let Keyboard::Inline { rows } = keyboard else {
            panic!("expected inline keyboard");
        };
        let actions: Vec<&str> = rows.iter().flatten().map(|b| b.action.as_str()).collect();
        for token in ["priority_high", "priority_medium", "priority_low", "skip_priority"] {
            assert!(actions.contains(&token), "missing {}", token);
        }
    }

    #[test]
    fn test_reply_menu_labels_resolve() {
        let Keyboard::Reply { rows, .. } = reply_menu() else {
            panic!("expected reply keyboard");
        };
        for label in rows.iter().flatten() {
            assert!(MenuButton::from_label(label).is_some(), "{}", label);
        }
    }
}
