//! Task Query Engine: derived views over a user's stored tasks.
//!
//! Every function here re-reads the store. Nothing is cached between calls,
//! so positional numbering is recomputed identically for listing and for
//! `/done`/`/delete` within the same turn.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::task::{Priority, Task, UserId};
use crate::store::{StoreError, TaskStore};

/// Aggregate counts over all of a user's tasks.
///
/// # Invariants
/// - `active == total - completed`
/// - `by_priority.values().sum() == active`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Active tasks per priority; every level is present, possibly with 0.
    pub by_priority: BTreeMap<Priority, usize>,
    /// Active tasks per category name (tasks without a category are not counted).
    pub by_category: BTreeMap<String, usize>,
}

impl Statistics {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = Statistics {
            by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
            ..Default::default()
        };

        for task in tasks {
            stats.total += 1;
            if task.is_completed() {
                stats.completed += 1;
                continue;
            }
            *stats.by_priority.entry(task.priority).or_insert(0) += 1;
            if let Some(category) = task.category.as_deref().filter(|c| !c.is_empty()) {
                *stats.by_category.entry(category.to_string()).or_insert(0) += 1;
            }
        }

        stats.active = stats.total - stats.completed;
        stats
    }

    pub fn active_with(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }
}

/// A category name with its number of active tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub active_tasks: usize,
}

/// Why a positional index could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("missing or non-numeric task number")]
    Malformed,

    #[error("task number {index} is out of range (1..={len})")]
    OutOfRange { index: i64, len: usize },
}

/// Parse the argument of `/done <n>` or `/delete <n>`.
///
/// Only the first whitespace-separated argument after the command is read.
pub fn parse_position(command_text: &str) -> Result<i64, PositionError> {
    command_text
        .split_whitespace()
        .nth(1)
        .and_then(|arg| arg.parse::<i64>().ok())
        .ok_or(PositionError::Malformed)
}

/// Pick the task at 1-based `index` from an already ordered active list.
pub fn select_position(tasks: Vec<Task>, index: i64) -> Result<Task, PositionError> {
    let len = tasks.len();
    if index < 1 || index as u64 > len as u64 {
        return Err(PositionError::OutOfRange { index, len });
    }
    tasks
        .into_iter()
        .nth((index - 1) as usize)
        .ok_or(PositionError::OutOfRange { index, len })
}

/// Active tasks in display order (positions 1..N follow this order).
pub async fn active_tasks(store: &dyn TaskStore, owner: &UserId) -> Result<Vec<Task>, StoreError> {
    store.list_tasks(owner, false).await
}

/// Active tasks whose deadline falls on `today`, by priority then creation.
pub async fn tasks_due_on(
    store: &dyn TaskStore,
    owner: &UserId,
    today: NaiveDate,
) -> Result<Vec<Task>, StoreError> {
    let mut tasks: Vec<Task> = store
        .list_tasks(owner, false)
        .await?
        .into_iter()
        .filter(|t| t.deadline.map(|d| d.date() == today).unwrap_or(false))
        .collect();
    tasks.sort_by(Task::agenda_order);
    Ok(tasks)
}

/// Active tasks with exactly this category, by priority then creation.
pub async fn tasks_in_category(
    store: &dyn TaskStore,
    owner: &UserId,
    category: &str,
) -> Result<Vec<Task>, StoreError> {
    store.tasks_by_category(owner, category).await
}

/// Every known category for the owner with its active-task count.
pub async fn category_summaries(
    store: &dyn TaskStore,
    owner: &UserId,
) -> Result<Vec<CategorySummary>, StoreError> {
    let names = store.list_categories(owner).await?;
    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        let active_tasks = tasks_in_category(store, owner, &name).await?.len();
        summaries.push(CategorySummary { name, active_tasks });
    }
    Ok(summaries)
}

pub async fn statistics(store: &dyn TaskStore, owner: &UserId) -> Result<Statistics, StoreError> {
    let tasks = store.all_tasks(owner).await?;
    Ok(Statistics::from_tasks(&tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTaskStore;
    use crate::task::NewTask;
    use chrono::{Local, NaiveDateTime};

    async fn store_with_user(owner: &UserId) -> InMemoryTaskStore {
        let store = InMemoryTaskStore::new();
        store.get_or_create_user(owner, Some("Tester")).await.unwrap();
        store
    }

    fn today_at(hour: u32) -> NaiveDateTime {
        Local::now().date_naive().and_hms_opt(hour, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("/done 3"), Ok(3));
        assert_eq!(parse_position("/delete   12 extra"), Ok(12));
        assert_eq!(parse_position("/done -1"), Ok(-1));
        assert_eq!(parse_position("/done"), Err(PositionError::Malformed));
        assert_eq!(parse_position("/done two"), Err(PositionError::Malformed));
        assert_eq!(parse_position("/done 1.5"), Err(PositionError::Malformed));
    }

    #[tokio::test]
    async fn test_select_position_bounds() {
        let owner = UserId::new("u1");
        let store = store_with_user(&owner).await;
        store.create_task(&owner, NewTask::named("a")).await.unwrap();
        store.create_task(&owner, NewTask::named("b")).await.unwrap();

        let tasks = active_tasks(&store, &owner).await.unwrap();
        assert_eq!(select_position(tasks.clone(), 2).unwrap().name, "b");
        assert_eq!(
            select_position(tasks.clone(), 5),
            Err(PositionError::OutOfRange { index: 5, len: 2 })
        );
        assert_eq!(
            select_position(tasks, 0),
            Err(PositionError::OutOfRange { index: 0, len: 2 })
        );
    }

    #[tokio::test]
    async fn test_statistics_counts_are_consistent() {
        let owner = UserId::new("u1");
        let store = store_with_user(&owner).await;
        let high = store
            .create_task(&owner, NewTask::named("a").with_priority(Priority::High))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("b").with_priority(Priority::High).with_category("Work"))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("c").with_priority(Priority::Low).with_category("Work"))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("d").with_category("Home"))
            .await
            .unwrap();
        store.complete_task(&owner, high.id).await.unwrap();

        let stats = statistics(&store, &owner).await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, stats.total - stats.completed);
        assert_eq!(stats.by_priority.values().sum::<usize>(), stats.active);
        assert_eq!(stats.active_with(Priority::High), 1);
        assert_eq!(stats.active_with(Priority::Medium), 1);
        assert_eq!(stats.active_with(Priority::Low), 1);
        assert_eq!(stats.by_category.get("Work"), Some(&2));
        assert_eq!(stats.by_category.get("Home"), Some(&1));
    }

    #[tokio::test]
    async fn test_statistics_empty_user() {
        let owner = UserId::new("nobody");
        let store = store_with_user(&owner).await;
        let stats = statistics(&store, &owner).await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.by_priority.len(), 3);
        assert!(stats.by_category.is_empty());
    }

    #[tokio::test]
    async fn test_tasks_due_on_filters_and_orders() {
        let owner = UserId::new("u1");
        let store = store_with_user(&owner).await;
        let tomorrow = today_at(9) + chrono::Duration::days(1);

        store
            .create_task(&owner, NewTask::named("later").with_deadline(tomorrow))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("first medium").with_deadline(today_at(18)))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("no deadline").with_priority(Priority::High))
            .await
            .unwrap();
        store
            .create_task(
                &owner,
                NewTask::named("urgent").with_priority(Priority::High).with_deadline(today_at(20)),
            )
            .await
            .unwrap();
        let done = store
            .create_task(&owner, NewTask::named("done today").with_deadline(today_at(8)))
            .await
            .unwrap();
        store.complete_task(&owner, done.id).await.unwrap();

        let today = tasks_due_on(&store, &owner, Local::now().date_naive())
            .await
            .unwrap();
        let names: Vec<&str> = today.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["urgent", "first medium"]);
    }

    #[tokio::test]
    async fn test_category_summaries_include_ad_hoc_names() {
        let owner = UserId::new("u1");
        let store = store_with_user(&owner).await;
        store.create_category(&owner, "Study").await.unwrap();
        store
            .create_task(&owner, NewTask::named("gym").with_category("Health"))
            .await
            .unwrap();
        store
            .create_task(&owner, NewTask::named("run").with_category("Health"))
            .await
            .unwrap();

        let summaries = category_summaries(&store, &owner).await.unwrap();
        assert_eq!(
            summaries,
            vec![
                CategorySummary { name: "Health".to_string(), active_tasks: 2 },
                CategorySummary { name: "Study".to_string(), active_tasks: 0 },
            ]
        );

        let health = tasks_in_category(&store, &owner, "Health").await.unwrap();
        assert_eq!(health.len(), 2);
        assert!(tasks_in_category(&store, &owner, "health").await.unwrap().is_empty());
    }
}
