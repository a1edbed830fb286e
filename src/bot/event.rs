//! Inbound events from the messaging transport and the replies sent back.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::{Priority, UserId};

/// Who sent an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One event from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user: Sender,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A typed message: a command, a menu label, or free text.
    Message { text: String },
    /// A button press carrying an action token.
    Callback {
        data: String,
        /// Message the pressed button belongs to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<i64>,
    },
}

impl InboundEvent {
    pub fn message(user: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            user: Sender {
                id: user.into(),
                name: None,
            },
            kind: EventKind::Message { text: text.into() },
        }
    }

    pub fn callback(user: impl Into<UserId>, data: impl Into<String>) -> Self {
        Self {
            user: Sender {
                id: user.into(),
                name: None,
            },
            kind: EventKind::Callback {
                data: data.into(),
                message_id: None,
            },
        }
    }
}

/// A selectable button mapped to an action token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: String,
}

impl Button {
    pub fn new(label: &str, action: Action) -> Self {
        Self {
            label: label.to_string(),
            action: action.token(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Keyboard {
    /// Buttons attached to the reply; pressing one sends a callback.
    Inline { rows: Vec<Vec<Button>> },
    /// Persistent keyboard whose buttons send their label as a message.
    Reply {
        rows: Vec<Vec<String>>,
        placeholder: String,
    },
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
    /// Ask the transport to remove this earlier message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_message: Option<i64>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            dismiss_message: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn dismissing(mut self, message_id: Option<i64>) -> Self {
        self.dismiss_message = message_id;
        self
    }

    /// Action tokens of every inline button, in order.
    pub fn actions(&self) -> Vec<&str> {
        match &self.keyboard {
            Some(Keyboard::Inline { rows }) => rows
                .iter()
                .flatten()
                .map(|b| b.action.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Button-press action tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AddTask,
    ListTasks,
    TodayTasks,
    Categories,
    Stats,
    BackToMenu,
    BackInTask,
    SaveTask,
    SkipCategory,
    SkipPriority,
    SkipDeadline,
    SetPriority(Priority),
    ShowCategories,
    CreateCategory,
    DeleteCategory,
}

impl Action {
    pub fn token(self) -> String {
        match self {
            Action::AddTask => "add_task".to_string(),
            Action::ListTasks => "list_tasks".to_string(),
            Action::TodayTasks => "today_tasks".to_string(),
            Action::Categories => "categories".to_string(),
            Action::Stats => "stats".to_string(),
            Action::BackToMenu => "back_to_menu".to_string(),
            Action::BackInTask => "back_in_task".to_string(),
            Action::SaveTask => "save_task".to_string(),
            Action::SkipCategory => "skip_category".to_string(),
            Action::SkipPriority => "skip_priority".to_string(),
            Action::SkipDeadline => "skip_deadline".to_string(),
            Action::SetPriority(p) => format!("priority_{}", p.slug()),
            Action::ShowCategories => "show_categories".to_string(),
            Action::CreateCategory => "create_category".to_string(),
            Action::DeleteCategory => "delete_category".to_string(),
        }
    }
}

/// A token no button ever carries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action token: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "add_task" => Action::AddTask,
            "list_tasks" => Action::ListTasks,
            "today_tasks" => Action::TodayTasks,
            "categories" => Action::Categories,
            "stats" => Action::Stats,
            "back_to_menu" => Action::BackToMenu,
            "back_in_task" => Action::BackInTask,
            "save_task" => Action::SaveTask,
            "skip_category" => Action::SkipCategory,
            "skip_priority" => Action::SkipPriority,
            "skip_deadline" => Action::SkipDeadline,
            "show_categories" => Action::ShowCategories,
            "create_category" => Action::CreateCategory,
            "delete_category" => Action::DeleteCategory,
            other => {
                let priority = other
                    .strip_prefix("priority_")
                    .and_then(|slug| Priority::ALL.into_iter().find(|p| p.slug() == slug))
                    .ok_or_else(|| UnknownAction(other.to_string()))?;
                Action::SetPriority(priority)
            }
        };
        Ok(action)
    }
}

/// Slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Show the persistent reply keyboard.
    Next,
    Done,
    Delete,
    Unknown,
}

impl Command {
    /// Parse the leading `/command` of a message, if it has one.
    ///
    /// A `@botname` suffix (`/done@under_ctrl_bot 2`) is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let head = text.trim_start().split_whitespace().next()?;
        let name = head.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        Some(match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "next" => Command::Next,
            "done" => Command::Done,
            "delete" => Command::Delete,
            _ => Command::Unknown,
        })
    }
}

/// Labels of the persistent reply keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    MainMenu,
    AddTask,
    TaskList,
    Today,
}

impl MenuButton {
    pub const ALL: [MenuButton; 4] = [
        MenuButton::MainMenu,
        MenuButton::AddTask,
        MenuButton::TaskList,
        MenuButton::Today,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuButton::MainMenu => "Main menu",
            MenuButton::AddTask => "Add task",
            MenuButton::TaskList => "Task list",
            MenuButton::Today => "Today's tasks",
        }
    }

    pub fn from_label(text: &str) -> Option<MenuButton> {
        Self::ALL.into_iter().find(|b| b.label() == text.trim())
    }
}
