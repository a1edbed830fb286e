//! In-memory task store (non-persistent).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{now, StoreError, TaskStore};
use crate::task::category::DEFAULT_CATEGORY_COLOR;
use crate::task::{Category, NewTask, Task, TaskId, User, UserId};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    next_task_id: i64,
    next_category_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get_or_create_user(
        &self,
        id: &UserId,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.entry(id.clone()).or_insert_with(|| User {
            id: id.clone(),
            display_name: display_name.map(|s| s.to_string()),
            created_at: now(),
        });
        Ok(user.clone())
    }

    async fn create_task(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(owner) {
            return Err(StoreError::UnknownOwner(owner.clone()));
        }
        tables.next_task_id += 1;
        let task = Task {
            id: TaskId::new(tables.next_task_id),
            owner: owner.clone(),
            name: task.name,
            description: task.description,
            category: task.category,
            priority: task.priority,
            deadline: task.deadline,
            created_at: now(),
            completed_at: None,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, owner: &UserId, completed: bool) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| &t.owner == owner && t.is_completed() == completed)
            .cloned()
            .collect();
        tasks.sort_by(Task::list_order);
        Ok(tasks)
    }

    async fn all_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| &t.owner == owner)
            .cloned()
            .collect())
    }

    async fn complete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id && &t.owner == owner && !t.is_completed())
        {
            Some(task) => {
                task.completed_at = Some(now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|t| !(t.id == id && &t.owner == owner));
        Ok(tables.tasks.len() != before)
    }

    async fn create_category(
        &self,
        owner: &UserId,
        name: &str,
    ) -> Result<Option<Category>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(owner) {
            return Err(StoreError::UnknownOwner(owner.clone()));
        }
        if tables
            .categories
            .iter()
            .any(|c| &c.owner == owner && c.name == name)
        {
            return Ok(None);
        }
        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            owner: owner.clone(),
            name: name.to_string(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            created_at: now(),
        };
        tables.categories.push(category.clone());
        Ok(Some(category))
    }

    async fn list_categories(&self, owner: &UserId) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let explicit = tables
            .categories
            .iter()
            .filter(|c| &c.owner == owner)
            .map(|c| c.name.clone());
        let used = tables
            .tasks
            .iter()
            .filter(|t| &t.owner == owner)
            .filter_map(|t| t.category.clone())
            .filter(|c| !c.is_empty());
        let names: BTreeSet<String> = explicit.chain(used).collect();
        Ok(names.into_iter().collect())
    }

    async fn tasks_by_category(
        &self,
        owner: &UserId,
        name: &str,
    ) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| &t.owner == owner && !t.is_completed())
            .filter(|t| t.category.as_deref() == Some(name))
            .cloned()
            .collect();
        tasks.sort_by(Task::agenda_order);
        Ok(tasks)
    }
}
