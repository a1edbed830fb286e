//! Text for every reply the bot sends.

use std::fmt::Write as _;

use crate::task::{CategorySummary, Priority, Statistics, Task};
use crate::wizard::{Draft, WizardStep};

const LIST_DEADLINE_FORMAT: &str = "%d.%m.%Y %H:%M";
const TODAY_DEADLINE_FORMAT: &str = "%H:%M";
const SEPARATOR: &str = "────────────────";

pub const GENERIC_FAILURE: &str = "⚠️ Something went wrong. Please try again later.";
pub const UNRECOGNIZED: &str = "🤔 I didn't understand that. Send /help to see what I can do.";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Send /help for the list of commands.";
pub const INVALID_POSITION: &str = "❌ Invalid task number. Check the list with 📋 My tasks.";
pub const USE_BUTTONS: &str = "👇 Please use the buttons below.";
pub const CATEGORY_DELETE_UNAVAILABLE: &str = "🚧 Deleting categories is not available yet.";

pub fn welcome(name: Option<&str>) -> String {
    let greeting = match name {
        Some(name) => format!("👋 Hi, {}!", name),
        None => "👋 Hi!".to_string(),
    };
    format!(
        "{}\n\nI'm UnderCtrl, your task manager. I keep your tasks, \
         their priorities and deadlines in one place.\n\nSend /help to get started.",
        greeting
    )
}

pub fn help() -> String {
    [
        "📖 Commands:",
        "/start - welcome message",
        "/help - this help and the main menu",
        "/next - show the quick keyboard",
        "/done <ID> - mark a task as done",
        "/delete <ID> - delete a task",
        "",
        "Task numbers are the IDs shown in 📋 My tasks.",
    ]
    .join("\n")
}

pub fn usage(command: &str) -> String {
    format!("Usage: /{} <ID>\nExample: /{} 1", command, command)
}

pub fn completed(task: &Task) -> String {
    format!("✅ Task «{}» marked as done!", task.name)
}

pub fn deleted(task: &Task) -> String {
    format!("🗑️ Task «{}» deleted!", task.name)
}

pub fn saved(task: &Task) -> String {
    format!("✅ Task saved! ID: {}", task.id)
}

pub fn cancelled() -> &'static str {
    "❌ Task creation cancelled."
}

/// Active task list. Entry numbers are the positions `/done` and `/delete` use.
pub fn task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "📭 You have no active tasks.".to_string();
    }

    let mut out = String::from("📋 Your tasks:\n\n");
    for (i, task) in tasks.iter().enumerate() {
        let _ = writeln!(out, "ID: {}", i + 1);
        let _ = writeln!(out, "📝 {}", task.name);
        let _ = writeln!(
            out,
            "📄 {}",
            task.description.as_deref().unwrap_or("No description")
        );
        if let Some(category) = task.category.as_deref() {
            let _ = writeln!(out, "🏷️ {}", category);
        }
        let _ = writeln!(out, "📊 {} {}", task.priority.emoji(), task.priority.label());
        match task.deadline {
            Some(deadline) => {
                let _ = writeln!(out, "⏰ Deadline: {}", deadline.format(LIST_DEADLINE_FORMAT));
            }
            None => {
                let _ = writeln!(out, "⏰ Deadline: no deadline");
            }
        }
        let _ = writeln!(out, "{}", SEPARATOR);
    }
    out.push_str("\n/done <ID> - mark as done\n/delete <ID> - delete");
    out
}

pub fn today_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "🎉 Nothing due today.".to_string();
    }

    let mut out = String::from("📅 Due today:\n\n");
    for task in tasks {
        let time = task
            .deadline
            .map(|d| d.format(TODAY_DEADLINE_FORMAT).to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{} {} {}", task.priority.emoji(), time, task.name);
        if let Some(description) = task.description.as_deref() {
            let _ = writeln!(out, "   📄 {}", description);
        }
    }
    out
}

pub fn statistics(stats: &Statistics) -> String {
    let mut out = String::from("📊 Statistics\n\n");
    let _ = writeln!(out, "Total tasks: {}", stats.total);
    let _ = writeln!(out, "✅ Completed: {}", stats.completed);
    let _ = writeln!(out, "⏳ Active: {}", stats.active);
    out.push_str("\nActive by priority:\n");
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        let _ = writeln!(
            out,
            "{} {}: {}",
            priority.emoji(),
            priority.label(),
            stats.active_with(priority)
        );
    }
    out
}

pub fn category_summaries(summaries: &[CategorySummary]) -> String {
    if summaries.is_empty() {
        return "🏷️ You have no categories yet.".to_string();
    }

    let mut out = String::from("🏷️ Your categories:\n\n");
    for summary in summaries {
        let _ = writeln!(out, "• {} ({} active)", summary.name, summary.active_tasks);
    }
    out
}

pub fn categories_menu() -> &'static str {
    "🏷️ Categories. Choose an action:"
}

pub fn category_name_prompt() -> String {
    format!(
        "✏️ Enter a name for the new category (up to {} characters):",
        crate::task::MAX_CATEGORY_NAME_LEN
    )
}

pub fn category_created(name: &str) -> String {
    format!("✅ Category «{}» created!", name)
}

pub fn category_exists(name: &str) -> String {
    format!("❌ Category «{}» already exists!", name)
}

/// Prompt for the wizard step the user just landed on.
pub fn wizard_prompt(
    step: WizardStep,
    draft: &Draft,
    categories: &[String],
    preview_limit: usize,
) -> String {
    match step {
        WizardStep::Name => "📝 Enter the task name:".to_string(),
        WizardStep::Description => "📄 Enter a description for the task:".to_string(),
        WizardStep::Category => category_prompt(categories, preview_limit),
        WizardStep::Priority => "📊 Choose a priority:".to_string(),
        WizardStep::Deadline => {
            "⏰ Enter the deadline as DD-MM-YYYY HH:MM:SS\nExample: 31-12-2025 18:00:00".to_string()
        }
        WizardStep::Confirmation => confirmation(draft),
    }
}

fn category_prompt(categories: &[String], preview_limit: usize) -> String {
    let mut out = String::from("🏷️ Enter a category for the task");
    if categories.is_empty() {
        out.push(':');
        return out;
    }

    out.push_str(".\n\nYour categories:\n");
    for name in categories.iter().take(preview_limit) {
        let _ = writeln!(out, "• {}", name);
    }
    if categories.len() > preview_limit {
        let _ = writeln!(out, "... and {} more", categories.len() - preview_limit);
    }
    out
}

pub fn confirmation(draft: &Draft) -> String {
    let priority = match draft.priority {
        Some(p) => format!("{} {}", p.emoji(), p.label()),
        None => {
            let p = draft.effective_priority();
            format!("{} {} (default)", p.emoji(), p.label())
        }
    };

    let mut out = String::from("📋 Check the task:\n\n");
    let _ = writeln!(out, "📝 Name: {}", draft.name.as_deref().unwrap_or_default());
    let _ = writeln!(
        out,
        "📄 Description: {}",
        draft.description.as_deref().unwrap_or("No description")
    );
    let _ = writeln!(
        out,
        "🏷️ Category: {}",
        draft.category.as_deref().unwrap_or("not specified")
    );
    let _ = writeln!(out, "📊 Priority: {}", priority);
    let _ = writeln!(
        out,
        "⏰ Deadline: {}",
        draft.deadline.as_deref().unwrap_or("not set")
    );
    out.push_str("\nSave the task?");
    out
}
