//! Task storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database
//!
//! Every operation takes the owner id and filters on it, so one user can
//! never read or mutate another user's rows.

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{Config, StoreBackend};
use crate::task::{Category, NewTask, Task, TaskId, User, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown owner: {0}")]
    UnknownOwner(UserId),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Return the user, creating it on first sight. An existing user is
    /// returned unchanged.
    async fn get_or_create_user(
        &self,
        id: &UserId,
        display_name: Option<&str>,
    ) -> Result<User, StoreError>;

    /// Create a task for a registered owner.
    async fn create_task(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError>;

    /// List tasks with the given completion flag, ordered by priority
    /// descending, deadline ascending (none last), then id.
    async fn list_tasks(&self, owner: &UserId, completed: bool) -> Result<Vec<Task>, StoreError>;

    /// Every task of the owner, completed or not, in id order.
    async fn all_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StoreError>;

    /// Mark a task completed. Returns `false` if no such active task for this
    /// owner; an already completed task keeps its completion time.
    async fn complete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError>;

    /// Delete a task. Returns `false` if no such task for this owner.
    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError>;

    /// Create a named category. Returns `None` if the owner already has a
    /// category with exactly this name.
    async fn create_category(
        &self,
        owner: &UserId,
        name: &str,
    ) -> Result<Option<Category>, StoreError>;

    /// Union of explicitly created categories and distinct category names used
    /// by the owner's tasks, sorted by name.
    async fn list_categories(&self, owner: &UserId) -> Result<Vec<String>, StoreError>;

    /// Active tasks whose category equals `name` exactly, by priority
    /// descending, then creation time, then id.
    async fn tasks_by_category(&self, owner: &UserId, name: &str)
        -> Result<Vec<Task>, StoreError>;
}

pub type SharedTaskStore = Arc<dyn TaskStore>;

/// Open the backend selected by the configuration.
pub async fn open(config: &Config) -> Result<SharedTaskStore, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory task store; data will not survive a restart");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
        StoreBackend::Sqlite => {
            let store = SqliteTaskStore::open(config.database_path.clone()).await?;
            tracing::info!("SQLite task store opened at {}", config.database_path.display());
            Ok(Arc::new(store))
        }
    }
}

/// Current timestamp.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    /// Behaviour every backend must share.
    async fn exercise_store(store: &dyn TaskStore) {
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let user = store.get_or_create_user(&alice, Some("Alice")).await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        let again = store.get_or_create_user(&alice, Some("Renamed")).await.unwrap();
        assert_eq!(again, user);
        store.get_or_create_user(&bob, None).await.unwrap();

        // Ordering: priority desc, deadline asc with none last, id asc.
        let deadline = |day| {
            NaiveDate::from_ymd_opt(2025, 6, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        };
        let low = store
            .create_task(&alice, NewTask::named("low").with_priority(Priority::Low))
            .await
            .unwrap();
        let high_late = store
            .create_task(
                &alice,
                NewTask::named("high late").with_priority(Priority::High).with_deadline(deadline(20)),
            )
            .await
            .unwrap();
        let medium = store
            .create_task(&alice, NewTask::named("medium").with_category("Work"))
            .await
            .unwrap();
        let high_none = store
            .create_task(&alice, NewTask::named("high none").with_priority(Priority::High))
            .await
            .unwrap();
        let high_soon = store
            .create_task(
                &alice,
                NewTask::named("high soon")
                    .with_priority(Priority::High)
                    .with_deadline(deadline(10))
                    .with_description("details"),
            )
            .await
            .unwrap();
        assert!(!high_soon.is_completed());
        assert_eq!(high_soon.description.as_deref(), Some("details"));

        let listed = store.list_tasks(&alice, false).await.unwrap();
        let ids: Vec<TaskId> = listed.iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec![high_soon.id, high_late.id, high_none.id, medium.id, low.id]
        );
        assert_eq!(store.list_tasks(&alice, false).await.unwrap(), listed);
        assert_eq!(listed[0].deadline, Some(deadline(10)));

        // Owner scoping.
        assert!(store.list_tasks(&bob, false).await.unwrap().is_empty());
        assert!(!store.complete_task(&bob, low.id).await.unwrap());
        assert!(!store.delete_task(&bob, low.id).await.unwrap());

        // Completion sets the timestamp and moves the task between lists.
        assert!(store.complete_task(&alice, low.id).await.unwrap());
        let completed = store.list_tasks(&alice, true).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].is_completed());
        assert!(completed[0].completed_at.is_some());
        assert_eq!(store.list_tasks(&alice, false).await.unwrap().len(), 4);

        // Completing twice keeps the first completion time.
        let first_completion = completed[0].completed_at;
        assert!(!store.complete_task(&alice, low.id).await.unwrap());
        let completed = store.list_tasks(&alice, true).await.unwrap();
        assert_eq!(completed[0].completed_at, first_completion);

        // Deletion removes the task from every listing.
        assert!(store.delete_task(&alice, high_none.id).await.unwrap());
        assert!(!store.delete_task(&alice, high_none.id).await.unwrap());
        assert!(store
            .all_tasks(&alice)
            .await
            .unwrap()
            .iter()
            .all(|t| t.id != high_none.id));
        assert_eq!(store.all_tasks(&alice).await.unwrap().len(), 4);

        // Categories: explicit plus ad hoc, unique per owner, case-sensitive.
        let study = store.create_category(&alice, "Study").await.unwrap();
        assert_eq!(study.as_ref().map(|c| c.name.as_str()), Some("Study"));
        assert!(store.create_category(&alice, "Study").await.unwrap().is_none());
        assert!(store.create_category(&alice, "study").await.unwrap().is_some());
        assert!(store.create_category(&bob, "Study").await.unwrap().is_some());
        assert_eq!(
            store.list_categories(&alice).await.unwrap(),
            vec!["Study".to_string(), "Work".to_string(), "study".to_string()]
        );
        assert_eq!(store.list_categories(&bob).await.unwrap(), vec!["Study".to_string()]);

        let work = store.tasks_by_category(&alice, "Work").await.unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].id, medium.id);
        store.complete_task(&alice, medium.id).await.unwrap();
        assert!(store.tasks_by_category(&alice, "Work").await.unwrap().is_empty());
        // A completed task still contributes its category name.
        assert!(store
            .list_categories(&alice)
            .await
            .unwrap()
            .contains(&"Work".to_string()));

        // Unknown owners cannot write.
        let ghost = UserId::new("ghost");
        assert!(matches!(
            store.create_task(&ghost, NewTask::named("x")).await,
            Err(StoreError::UnknownOwner(_))
        ));
        assert!(matches!(
            store.create_category(&ghost, "x").await,
            Err(StoreError::UnknownOwner(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_behaviour() {
        let store = InMemoryTaskStore::new();
        assert!(!store.is_persistent());
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_behaviour() {
        let dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::open(dir.path().join("tasks.db")).await.unwrap();
        assert!(store.is_persistent());
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let owner = UserId::new("42");
        {
            let store = SqliteTaskStore::open(path.clone()).await.unwrap();
            store.get_or_create_user(&owner, Some("Ann")).await.unwrap();
            store
                .create_task(&owner, NewTask::named("persisted").with_priority(Priority::High))
                .await
                .unwrap();
        }
        let store = SqliteTaskStore::open(path).await.unwrap();
        let tasks = store.list_tasks(&owner, false).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "persisted");
        assert_eq!(tasks[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_concurrent_users_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let store: SharedTaskStore =
            Arc::new(SqliteTaskStore::open(dir.path().join("tasks.db")).await.unwrap());

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let owner = UserId::new(format!("user-{}", n));
                store.get_or_create_user(&owner, None).await.unwrap();
                for i in 0..5 {
                    store
                        .create_task(&owner, NewTask::named(format!("{}-{}", n, i)))
                        .await
                        .unwrap();
                }
                owner
            }));
        }

        for handle in handles {
            let owner = handle.await.unwrap();
            let tasks = store.list_tasks(&owner, false).await.unwrap();
            assert_eq!(tasks.len(), 5);
            assert!(tasks.iter().all(|t| t.owner == owner));
        }
    }
}
