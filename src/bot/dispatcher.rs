use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use chrono::Local;
use futures::FutureExt;
use tokio::sync::RwLock;

use super::event::{
    Action, Command, EventKind, InboundEvent, MenuButton, Reply, Sender, UnknownAction,
};
use super::{keyboard, render};
use crate::store::{SharedTaskStore, StoreError};
use crate::task::{query, validate_category_name, UserId};
use crate::wizard::{Draft, Wizard, WizardError, WizardInput, WizardOutcome, WizardStep};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A multi-turn exchange the next free-text message belongs to.
#[derive(Debug, Clone)]
enum Conversation {
    Wizard(Wizard),
    AwaitingCategoryName,
}

#[derive(Debug, Default)]
struct ChatState {
    /// The user row exists in the store.
    registered: bool,
    conversation: Option<Conversation>,
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Complete,
    Delete,
}

impl Mutation {
    fn command(self) -> &'static str {
        match self {
            Mutation::Complete => "done",
            Mutation::Delete => "delete",
        }
    }
}

/// Routes inbound events to the wizard, the category flow or the query views.
///
/// Holds one [`ChatState`] per user. The sessions lock is never held across a
/// store call.
pub struct Dispatcher {
    store: SharedTaskStore,
    sessions: RwLock<HashMap<UserId, ChatState>>,
    category_preview_limit: usize,
}

impl Dispatcher {
    pub fn new(store: SharedTaskStore, category_preview_limit: usize) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            category_preview_limit,
        }
    }

    /// Handle one event and produce at most one reply.
    ///
    /// Store failures and panics become a generic failure notice. Only an
    /// action token that no button carries is returned as an error.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Option<Reply>, DispatchError> {
        let user = event.user.id.clone();
        match AssertUnwindSafe(self.handle(event)).catch_unwind().await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(DispatchError::Store(err))) => {
                tracing::error!(user = %user, error = %err, "Store failure while handling event");
                Ok(Some(Reply::text(render::GENERIC_FAILURE)))
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                tracing::error!(user = %user, "Event handler panicked");
                Ok(Some(Reply::text(render::GENERIC_FAILURE)))
            }
        }
    }

    /// Users with an unfinished wizard or category prompt.
    pub async fn active_conversations(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.conversation.is_some())
            .count()
    }

    async fn handle(&self, event: InboundEvent) -> Result<Option<Reply>, DispatchError> {
        let InboundEvent { user, kind } = event;
        self.ensure_registered(&user).await?;

        match kind {
            EventKind::Message { text } => self.on_message(&user, &text).await,
            EventKind::Callback { data, message_id } => {
                let action: Action = data.parse()?;
                tracing::debug!(user = %user.id, action = %data, "Callback");
                self.on_action(&user.id, action, message_id).await
            }
        }
    }

    async fn ensure_registered(&self, sender: &Sender) -> Result<(), StoreError> {
        let known = self
            .sessions
            .read()
            .await
            .get(&sender.id)
            .map(|s| s.registered)
            .unwrap_or(false);
        if known {
            return Ok(());
        }

        self.store
            .get_or_create_user(&sender.id, sender.name.as_deref())
            .await?;
        self.sessions
            .write()
            .await
            .entry(sender.id.clone())
            .or_default()
            .registered = true;
        Ok(())
    }

    async fn on_message(&self, sender: &Sender, text: &str) -> Result<Option<Reply>, DispatchError> {
        let user = &sender.id;

        if let Some(command) = Command::parse(text) {
            let reply = match command {
                Command::Start => Reply::text(render::welcome(sender.name.as_deref())),
                Command::Help => Reply::text(render::help()).with_keyboard(keyboard::main_menu()),
                Command::Next => {
                    Reply::text("⌨️ Choose an action:").with_keyboard(keyboard::reply_menu())
                }
                Command::Done => return self.mutate_position(user, text, Mutation::Complete).await,
                Command::Delete => return self.mutate_position(user, text, Mutation::Delete).await,
                Command::Unknown => Reply::text(render::UNKNOWN_COMMAND),
            };
            return Ok(Some(reply));
        }

        if let Some(button) = MenuButton::from_label(text) {
            return match button {
                MenuButton::MainMenu => self.back_to_menu(user).await,
                MenuButton::AddTask => self.start_wizard(user, None).await,
                MenuButton::TaskList => self.show_task_list(user).await,
                MenuButton::Today => self.show_today(user).await,
            };
        }

        let conversation = self
            .sessions
            .read()
            .await
            .get(user)
            .and_then(|s| s.conversation.as_ref())
            .map(|c| matches!(c, Conversation::Wizard(_)));

        match conversation {
            Some(true) => self.step_wizard(user, WizardInput::Text(text.to_string())).await,
            Some(false) => self.create_category(user, text).await,
            None => {
                tracing::debug!(user = %user, "Free text outside of any conversation");
                Ok(Some(Reply::text(render::UNRECOGNIZED)))
            }
        }
    }

    async fn on_action(
        &self,
        user: &UserId,
        action: Action,
        message_id: Option<i64>,
    ) -> Result<Option<Reply>, DispatchError> {
        match action {
            Action::AddTask => self.start_wizard(user, message_id).await,
            Action::ListTasks => self.show_task_list(user).await,
            Action::TodayTasks => self.show_today(user).await,
            Action::Stats => {
                let stats = query::statistics(self.store.as_ref(), user).await?;
                Ok(Some(
                    Reply::text(render::statistics(&stats)).with_keyboard(keyboard::back_to_menu()),
                ))
            }
            Action::Categories => Ok(Some(
                Reply::text(render::categories_menu()).with_keyboard(keyboard::categories_menu()),
            )),
            Action::ShowCategories => {
                let summaries = query::category_summaries(self.store.as_ref(), user).await?;
                Ok(Some(
                    Reply::text(render::category_summaries(&summaries))
                        .with_keyboard(keyboard::categories_menu()),
                ))
            }
            Action::CreateCategory => {
                let replaced = self
                    .set_conversation(user, Some(Conversation::AwaitingCategoryName))
                    .await;
                if let Some(Conversation::Wizard(_)) = replaced {
                    tracing::debug!(user = %user, "Wizard draft replaced by category prompt");
                }
                Ok(Some(
                    Reply::text(render::category_name_prompt())
                        .with_keyboard(keyboard::back_to_menu()),
                ))
            }
            Action::DeleteCategory => Ok(Some(
                Reply::text(render::CATEGORY_DELETE_UNAVAILABLE)
                    .with_keyboard(keyboard::categories_menu()),
            )),
            Action::BackToMenu => self.back_to_menu(user).await,
            Action::BackInTask => self.step_wizard(user, WizardInput::Back).await,
            Action::SaveTask => self.step_wizard(user, WizardInput::Save).await,
            Action::SkipCategory => {
                self.step_wizard(user, WizardInput::Skip(WizardStep::Category))
                    .await
            }
            Action::SkipPriority => {
                self.step_wizard(user, WizardInput::Skip(WizardStep::Priority))
                    .await
            }
            Action::SkipDeadline => {
                self.step_wizard(user, WizardInput::Skip(WizardStep::Deadline))
                    .await
            }
            Action::SetPriority(priority) => {
                self.step_wizard(user, WizardInput::SetPriority(priority))
                    .await
            }
        }
    }

    /// Replace the user's conversation, returning the previous one.
    async fn set_conversation(
        &self,
        user: &UserId,
        conversation: Option<Conversation>,
    ) -> Option<Conversation> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(user.clone()).or_default();
        std::mem::replace(&mut state.conversation, conversation)
    }

    async fn start_wizard(
        &self,
        user: &UserId,
        dismiss: Option<i64>,
    ) -> Result<Option<Reply>, DispatchError> {
        if self
            .set_conversation(user, Some(Conversation::Wizard(Wizard::new())))
            .await
            .is_some()
        {
            tracing::debug!(user = %user, "Restarting task wizard with an empty draft");
        }
        let reply = self.prompt(user, WizardStep::Name, &Draft::default()).await?;
        Ok(Some(reply.dismissing(dismiss)))
    }

    async fn back_to_menu(&self, user: &UserId) -> Result<Option<Reply>, DispatchError> {
        let in_wizard = matches!(
            self.sessions
                .read()
                .await
                .get(user)
                .and_then(|s| s.conversation.as_ref()),
            Some(Conversation::Wizard(_))
        );
        if in_wizard {
            return self.step_wizard(user, WizardInput::Cancel).await;
        }

        self.set_conversation(user, None).await;
        Ok(Some(
            Reply::text("🏠 Main menu:").with_keyboard(keyboard::main_menu()),
        ))
    }

    async fn prompt(
        &self,
        user: &UserId,
        step: WizardStep,
        draft: &Draft,
    ) -> Result<Reply, StoreError> {
        let categories = if step == WizardStep::Category {
            self.store.list_categories(user).await?
        } else {
            Vec::new()
        };
        let text = render::wizard_prompt(step, draft, &categories, self.category_preview_limit);
        Ok(Reply::text(text).with_keyboard(keyboard::wizard_step(step)))
    }

    /// Feed one input to the user's wizard. Without an active wizard the
    /// input is ignored.
    async fn step_wizard(
        &self,
        user: &UserId,
        input: WizardInput,
    ) -> Result<Option<Reply>, DispatchError> {
        let is_text = matches!(input, WizardInput::Text(_));

        let (result, step, draft) = {
            let mut sessions = self.sessions.write().await;
            let Some(state) = sessions.get_mut(user) else {
                return Ok(None);
            };
            let Some(Conversation::Wizard(wizard)) = state.conversation.as_mut() else {
                tracing::debug!(user = %user, "Wizard input without an active wizard ignored");
                return Ok(None);
            };

            let result = wizard.apply(input);
            let step = wizard.step();
            let draft = wizard.draft().clone();
            if matches!(&result, Ok(outcome) if outcome.is_terminal()) {
                state.conversation = None;
            }
            (result, step, draft)
        };

        match result {
            Ok(WizardOutcome::Prompt(next)) => {
                tracing::debug!(user = %user, step = ?next, "Wizard step");
                Ok(Some(self.prompt(user, next, &draft).await?))
            }
            Ok(WizardOutcome::Commit(new_task)) => {
                let task = self.store.create_task(user, new_task).await?;
                tracing::info!(user = %user, task_id = %task.id, "Task created");
                Ok(Some(
                    Reply::text(render::saved(&task)).with_keyboard(keyboard::main_menu()),
                ))
            }
            Ok(WizardOutcome::Cancelled) => {
                tracing::debug!(user = %user, "Task wizard cancelled");
                Ok(Some(
                    Reply::text(render::cancelled()).with_keyboard(keyboard::main_menu()),
                ))
            }
            Err(WizardError::Invalid(err)) => Ok(Some(
                Reply::text(format!("❌ {}. Try again:", err))
                    .with_keyboard(keyboard::wizard_step(step)),
            )),
            Err(WizardError::InvalidTransition { .. }) if is_text => {
                let prompt = self.prompt(user, step, &draft).await?;
                Ok(Some(Reply {
                    text: format!("{}\n\n{}", render::USE_BUTTONS, prompt.text),
                    ..prompt
                }))
            }
            Err(err) => {
                tracing::debug!(user = %user, step = ?step, error = %err, "Out-of-step wizard input ignored");
                Ok(None)
            }
        }
    }

    async fn create_category(&self, user: &UserId, text: &str) -> Result<Option<Reply>, DispatchError> {
        let name = match validate_category_name(text) {
            Ok(name) => name,
            Err(err) => {
                return Ok(Some(
                    Reply::text(format!("❌ {}. Try again:", err))
                        .with_keyboard(keyboard::back_to_menu()),
                ))
            }
        };

        self.set_conversation(user, None).await;
        let text = match self.store.create_category(user, &name).await? {
            Some(category) => {
                tracing::info!(user = %user, category = %category.name, "Category created");
                render::category_created(&category.name)
            }
            None => render::category_exists(&name),
        };
        Ok(Some(
            Reply::text(text).with_keyboard(keyboard::categories_menu()),
        ))
    }

    /// `/done <n>` and `/delete <n>` against the current active list.
    async fn mutate_position(
        &self,
        user: &UserId,
        text: &str,
        mutation: Mutation,
    ) -> Result<Option<Reply>, DispatchError> {
        let index = match query::parse_position(text) {
            Ok(index) => index,
            Err(_) => return Ok(Some(Reply::text(render::usage(mutation.command())))),
        };

        let tasks = query::active_tasks(self.store.as_ref(), user).await?;
        let task = match query::select_position(tasks, index) {
            Ok(task) => task,
            Err(err) => {
                tracing::debug!(user = %user, error = %err, "Task position rejected");
                return Ok(Some(Reply::text(render::INVALID_POSITION)));
            }
        };

        let changed = match mutation {
            Mutation::Complete => self.store.complete_task(user, task.id).await?,
            Mutation::Delete => self.store.delete_task(user, task.id).await?,
        };
        if !changed {
            return Ok(Some(Reply::text(render::INVALID_POSITION)));
        }

        tracing::info!(user = %user, task_id = %task.id, action = mutation.command(), "Task updated");
        let text = match mutation {
            Mutation::Complete => render::completed(&task),
            Mutation::Delete => render::deleted(&task),
        };
        Ok(Some(Reply::text(text)))
    }

    async fn show_task_list(&self, user: &UserId) -> Result<Option<Reply>, DispatchError> {
        let tasks = query::active_tasks(self.store.as_ref(), user).await?;
        Ok(Some(
            Reply::text(render::task_list(&tasks)).with_keyboard(keyboard::back_to_menu()),
        ))
    }

    async fn show_today(&self, user: &UserId) -> Result<Option<Reply>, DispatchError> {
        let today = Local::now().date_naive();
        let tasks = query::tasks_due_on(self.store.as_ref(), user, today).await?;
        Ok(Some(
            Reply::text(render::today_list(&tasks)).with_keyboard(keyboard::back_to_menu()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use crate::store::{InMemoryTaskStore, TaskStore};
    use crate::task::{Category, NewTask, Priority, Task, TaskId, User};

    fn dispatcher() -> (Dispatcher, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        (Dispatcher::new(store.clone(), 5), store)
    }

    async fn say(d: &Dispatcher, text: &str) -> Option<Reply> {
        d.dispatch(InboundEvent::message("alice", text)).await.unwrap()
    }

    async fn press(d: &Dispatcher, token: &str) -> Option<Reply> {
        d.dispatch(InboundEvent::callback("alice", token)).await.unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    #[tokio::test]
    async fn test_full_wizard_commits_task() {
        let (d, store) = dispatcher();

        let reply = press(&d, "add_task").await.unwrap();
        assert!(reply.text.contains("task name"));
        say(&d, "Write thesis").await.unwrap();
        say(&d, "Chapter 2").await.unwrap();
        say(&d, "Study").await.unwrap();
        let reply = press(&d, "priority_high").await.unwrap();
        assert!(reply.actions().contains(&"skip_deadline"));
        let reply = say(&d, "31-12-2030 18:00:00").await.unwrap();
        assert!(reply.text.contains("Check the task"));
        assert!(reply.text.contains("Write thesis"));
        assert_eq!(d.active_conversations().await, 1);

        let reply = press(&d, "save_task").await.unwrap();
        assert!(reply.text.contains("Task saved! ID:"));
        assert_eq!(d.active_conversations().await, 0);

        let tasks = store.list_tasks(&alice(), false).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "Write thesis");
        assert_eq!(tasks[0].description.as_deref(), Some("Chapter 2"));
        assert_eq!(tasks[0].category.as_deref(), Some("Study"));
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(tasks[0].deadline.is_some());
    }

    #[tokio::test]
    async fn test_skips_commit_defaults_and_show_default_priority() {
        let (d, store) = dispatcher();
        press(&d, "add_task").await;
        say(&d, "Buy milk").await;
        say(&d, "2 litres").await;
        press(&d, "skip_category").await;
        press(&d, "skip_priority").await;
        let reply = press(&d, "skip_deadline").await.unwrap();
        assert!(reply.text.contains("Medium (default)"));
        assert!(reply.text.contains("not specified"));
        press(&d, "save_task").await;

        let tasks = store.list_tasks(&alice(), false).await.unwrap();
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].category, None);
        assert_eq!(tasks[0].deadline, None);
    }

    #[tokio::test]
    async fn test_back_at_name_cancels_without_writing() {
        let (d, store) = dispatcher();
        press(&d, "add_task").await;
        say(&d, "Draft").await;
        press(&d, "back_in_task").await;
        let reply = press(&d, "back_in_task").await.unwrap();
        assert!(reply.text.contains("cancelled"));
        assert_eq!(d.active_conversations().await, 0);
        assert!(store.all_tasks(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_back_to_menu_discards_draft_at_any_step() {
        let inputs: [Option<&str>; 5] = [None, Some("name"), Some("desc"), Some("cat"), None];
        for steps in 0..inputs.len() {
            let (d, store) = dispatcher();
            press(&d, "add_task").await;
            for text in inputs.iter().take(steps).flatten() {
                say(&d, text).await;
            }
            press(&d, "back_to_menu").await.unwrap();
            assert_eq!(d.active_conversations().await, 0);
            assert!(store.all_tasks(&alice()).await.unwrap().is_empty());

            // Further wizard input has nowhere to go.
            assert_eq!(press(&d, "save_task").await, None);
        }
    }

    #[tokio::test]
    async fn test_category_prompt_lists_existing_categories() {
        let (d, store) = dispatcher();
        press(&d, "add_task").await;
        for name in ["a", "b", "c", "d", "e", "f"] {
            store.create_category(&alice(), name).await.unwrap();
        }
        say(&d, "Task").await;
        let reply = say(&d, "desc").await.unwrap();
        assert!(reply.text.contains("• e"));
        assert!(!reply.text.contains("• f"));
        assert!(reply.text.contains("... and 1 more"));
        assert!(reply.actions().contains(&"skip_category"));
    }

    #[tokio::test]
    async fn test_blank_and_long_names_rejected_in_place() {
        let (d, _) = dispatcher();
        press(&d, "add_task").await;
        let reply = say(&d, "   ").await.unwrap();
        assert!(reply.text.contains("cannot be empty"));
        let reply = say(&d, &"x".repeat(201)).await.unwrap();
        assert!(reply.text.contains("too long"));
        let reply = say(&d, "Fine").await.unwrap();
        assert!(reply.text.contains("description"));
    }

    #[tokio::test]
    async fn test_out_of_step_buttons_are_ignored() {
        let (d, _) = dispatcher();
        assert_eq!(press(&d, "priority_low").await, None);
        assert_eq!(press(&d, "back_in_task").await, None);

        press(&d, "add_task").await;
        assert_eq!(press(&d, "skip_deadline").await, None);
        assert_eq!(press(&d, "save_task").await, None);
        let reply = say(&d, "Still at name").await.unwrap();
        assert!(reply.text.contains("description"));
    }

    #[tokio::test]
    async fn test_text_at_button_step_reprompts() {
        let (d, _) = dispatcher();
        press(&d, "add_task").await;
        say(&d, "n").await;
        say(&d, "d").await;
        press(&d, "skip_category").await;
        let reply = say(&d, "high please").await.unwrap();
        assert!(reply.text.starts_with(render::USE_BUTTONS));
        assert!(reply.actions().contains(&"priority_high"));
    }

    #[tokio::test]
    async fn test_done_out_of_range_does_not_mutate() {
        let (d, store) = dispatcher();
        say(&d, "/start").await;
        store.create_task(&alice(), NewTask::named("one")).await.unwrap();
        store.create_task(&alice(), NewTask::named("two")).await.unwrap();

        let reply = say(&d, "/done 5").await.unwrap();
        assert_eq!(reply.text, render::INVALID_POSITION);
        let reply = say(&d, "/delete 0").await.unwrap();
        assert_eq!(reply.text, render::INVALID_POSITION);
        let reply = say(&d, "/done abc").await.unwrap();
        assert_eq!(reply.text, "Usage: /done <ID>\nExample: /done 1");
        let reply = say(&d, "/delete").await.unwrap();
        assert!(reply.text.starts_with("Usage: /delete"));

        assert_eq!(store.list_tasks(&alice(), false).await.unwrap().len(), 2);
        assert!(store.list_tasks(&alice(), true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_done_and_delete_follow_list_positions() {
        let (d, store) = dispatcher();
        say(&d, "/start").await;
        store
            .create_task(&alice(), NewTask::named("low").with_priority(Priority::Low))
            .await
            .unwrap();
        store
            .create_task(&alice(), NewTask::named("high").with_priority(Priority::High))
            .await
            .unwrap();

        let list = press(&d, "list_tasks").await.unwrap();
        assert!(list.text.contains("ID: 1\n📝 high"));

        let reply = say(&d, "/done 1").await.unwrap();
        assert_eq!(reply.text, "✅ Task «high» marked as done!");
        let reply = say(&d, "/delete 1").await.unwrap();
        assert_eq!(reply.text, "🗑️ Task «low» deleted!");

        assert!(store.list_tasks(&alice(), false).await.unwrap().is_empty());
        assert_eq!(store.list_tasks(&alice(), true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_creation_flow() {
        let (d, store) = dispatcher();
        let reply = press(&d, "create_category").await.unwrap();
        assert!(reply.text.contains("new category"));

        let reply = say(&d, &"c".repeat(51)).await.unwrap();
        assert!(reply.text.contains("too long"));
        assert_eq!(d.active_conversations().await, 1);

        let reply = say(&d, "Study").await.unwrap();
        assert!(reply.text.contains("created"));
        assert_eq!(d.active_conversations().await, 0);

        press(&d, "create_category").await;
        let reply = say(&d, "Study").await.unwrap();
        assert!(reply.text.contains("already exists"));
        assert_eq!(d.active_conversations().await, 0);

        assert_eq!(store.list_categories(&alice()).await.unwrap(), vec!["Study"]);
    }

    #[tokio::test]
    async fn test_delete_category_is_unavailable() {
        let (d, store) = dispatcher();
        say(&d, "/start").await;
        store.create_category(&alice(), "Home").await.unwrap();
        let reply = press(&d, "delete_category").await.unwrap();
        assert_eq!(reply.text, render::CATEGORY_DELETE_UNAVAILABLE);
        assert!(reply.actions().contains(&"show_categories"));
        assert_eq!(d.active_conversations().await, 0);
        assert_eq!(store.list_categories(&alice()).await.unwrap(), vec!["Home"]);
    }

    #[tokio::test]
    async fn test_show_categories_counts_active_tasks() {
        let (d, store) = dispatcher();
        say(&d, "/start").await;
        store.create_category(&alice(), "Home").await.unwrap();
        store
            .create_task(&alice(), NewTask::named("t").with_category("Work"))
            .await
            .unwrap();
        let reply = press(&d, "show_categories").await.unwrap();
        assert!(reply.text.contains("• Home (0 active)"));
        assert!(reply.text.contains("• Work (1 active)"));
    }

    #[tokio::test]
    async fn test_reply_keyboard_labels_work_mid_wizard() {
        let (d, _) = dispatcher();
        let reply = say(&d, "/next").await.unwrap();
        assert!(matches!(reply.keyboard, Some(crate::bot::Keyboard::Reply { .. })));

        press(&d, "add_task").await;
        say(&d, "half done").await;
        let reply = say(&d, "Add task").await.unwrap();
        assert!(reply.text.contains("task name"));
        let reply = say(&d, "Task list").await.unwrap();
        assert!(reply.text.contains("no active tasks"));
        assert_eq!(d.active_conversations().await, 1);
    }

    #[tokio::test]
    async fn test_add_task_button_dismisses_menu_message() {
        let (d, _) = dispatcher();
        let mut event = InboundEvent::callback("alice", "add_task");
        if let EventKind::Callback { message_id, .. } = &mut event.kind {
            *message_id = Some(42);
        }
        let reply = d.dispatch(event).await.unwrap().unwrap();
        assert_eq!(reply.dismiss_message, Some(42));
    }

    #[tokio::test]
    async fn test_free_text_without_conversation_and_unknown_command() {
        let (d, _) = dispatcher();
        assert_eq!(say(&d, "hello").await.unwrap().text, render::UNRECOGNIZED);
        assert_eq!(say(&d, "/weather").await.unwrap().text, render::UNKNOWN_COMMAND);
    }

    #[tokio::test]
    async fn test_unknown_action_token_is_an_error() {
        let (d, _) = dispatcher();
        let err = d
            .dispatch(InboundEvent::callback("alice", "launch_rockets"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAction(_)));
    }

    #[tokio::test]
    async fn test_today_view_and_stats() {
        let (d, store) = dispatcher();
        say(&d, "/start").await;
        let soon = Local::now().naive_local() + Duration::minutes(1);
        store
            .create_task(&alice(), NewTask::named("due now").with_deadline(soon))
            .await
            .unwrap();
        store
            .create_task(&alice(), NewTask::named("someday").with_priority(Priority::High))
            .await
            .unwrap();

        let reply = press(&d, "today_tasks").await.unwrap();
        if soon.date() == Local::now().date_naive() {
            assert!(reply.text.contains("due now"));
        }
        assert!(!reply.text.contains("someday"));

        let reply = press(&d, "stats").await.unwrap();
        assert!(reply.text.contains("Total tasks: 2"));
        assert!(reply.text.contains("🔴 High: 1"));
        assert!(reply.text.contains("🟡 Medium: 1"));
    }

    #[tokio::test]
    async fn test_users_do_not_share_sessions() {
        let (d, store) = dispatcher();
        press(&d, "add_task").await;
        say(&d, "alice task").await;

        let reply = d
            .dispatch(InboundEvent::message("bob", "not a task"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, render::UNRECOGNIZED);
        assert!(store.all_tasks(&UserId::new("bob")).await.unwrap().is_empty());
    }

    /// Store whose task queries fail or panic.
    struct BrokenStore {
        panic: bool,
    }

    impl BrokenStore {
        fn fail<T>(&self) -> Result<T, StoreError> {
            if self.panic {
                panic!("storage exploded");
            }
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[async_trait]
    impl TaskStore for BrokenStore {
        fn is_persistent(&self) -> bool {
            false
        }

        async fn get_or_create_user(
            &self,
            id: &UserId,
            display_name: Option<&str>,
        ) -> Result<User, StoreError> {
            Ok(User {
                id: id.clone(),
                display_name: display_name.map(str::to_string),
                created_at: Utc::now(),
            })
        }

        async fn create_task(&self, _: &UserId, _: NewTask) -> Result<Task, StoreError> {
            self.fail()
        }

        async fn list_tasks(&self, _: &UserId, _: bool) -> Result<Vec<Task>, StoreError> {
            self.fail()
        }

        async fn all_tasks(&self, _: &UserId) -> Result<Vec<Task>, StoreError> {
            self.fail()
        }

        async fn complete_task(&self, _: &UserId, _: TaskId) -> Result<bool, StoreError> {
            self.fail()
        }

        async fn delete_task(&self, _: &UserId, _: TaskId) -> Result<bool, StoreError> {
            self.fail()
        }

        async fn create_category(
            &self,
            _: &UserId,
            _: &str,
        ) -> Result<Option<Category>, StoreError> {
            self.fail()
        }

        async fn list_categories(&self, _: &UserId) -> Result<Vec<String>, StoreError> {
            self.fail()
        }

        async fn tasks_by_category(&self, _: &UserId, _: &str) -> Result<Vec<Task>, StoreError> {
            self.fail()
        }
    }

    #[tokio::test]
    async fn test_store_failure_becomes_generic_notice() {
        let d = Dispatcher::new(Arc::new(BrokenStore { panic: false }), 5);
        let reply = d
            .dispatch(InboundEvent::callback("alice", "list_tasks"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, render::GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_notice() {
        let d = Dispatcher::new(Arc::new(BrokenStore { panic: true }), 5);
        let reply = d
            .dispatch(InboundEvent::message("alice", "/done 1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, render::GENERIC_FAILURE);

        // The dispatcher is still usable afterwards.
        let reply = d
            .dispatch(InboundEvent::message("alice", "/help"))
            .await
            .unwrap()
            .unwrap();
        assert!(reply.text.contains("Commands"));
    }
}
