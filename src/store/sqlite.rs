//! SQLite-based task store.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::{now, StoreError, TaskStore};
use crate::task::category::DEFAULT_CATEGORY_COLOR;
use crate::task::{Category, NewTask, Priority, Task, TaskId, User, UserId};

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    display_name TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT '#3498db',
    created_at TEXT NOT NULL,
    UNIQUE (owner, name),
    FOREIGN KEY (owner) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT,
    priority INTEGER NOT NULL DEFAULT 2,
    deadline TEXT,
    is_completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    CHECK ((is_completed = 0) = (completed_at IS NULL)),
    FOREIGN KEY (owner) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner_completed ON tasks(owner, is_completed);
CREATE INDEX IF NOT EXISTS idx_tasks_owner_category ON tasks(owner, category);
"#;

/// Deadlines are naive local date-times; this layout sorts lexicographically.
const DEADLINE_STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TASK_COLUMNS: &str =
    "id, owner, name, description, category, priority, deadline, created_at, completed_at";

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await?
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: i64 = row.get(5)?;
    let priority = Priority::from_value(priority)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, Box::new(e)))?;
    let deadline: Option<String> = row.get(6)?;
    let deadline = deadline
        .map(|raw| {
            NaiveDateTime::parse_from_str(&raw, DEADLINE_STORAGE_FORMAT)
                .map_err(|e| conversion_error(6, e))
        })
        .transpose()?;
    let created_at: String = row.get(7)?;
    let completed_at: Option<String> = row.get(8)?;

    Ok(Task {
        id: TaskId::new(row.get(0)?),
        owner: UserId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        priority,
        deadline,
        created_at: parse_timestamp(7, &created_at)?,
        completed_at: completed_at
            .map(|raw| parse_timestamp(8, &raw))
            .transpose()?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: UserId::new(row.get::<_, String>(0)?),
        display_name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
    })
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let created_at: String = row.get(4)?;
    Ok(Category {
        id: row.get(0)?,
        owner: UserId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        color: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn require_owner(conn: &Connection, owner: &UserId) -> Result<(), StoreError> {
    let known = conn
        .prepare("SELECT 1 FROM users WHERE id = ?1")?
        .exists(params![owner.as_str()])?;
    if known {
        Ok(())
    } else {
        Err(StoreError::UnknownOwner(owner.clone()))
    }
}

fn query_tasks(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get_or_create_user(
        &self,
        id: &UserId,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let id = id.clone();
        let display_name = display_name.map(|s| s.to_string());
        let created_at = timestamp(now());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), display_name, created_at],
            )?;
            let user = conn.query_row(
                "SELECT id, display_name, created_at FROM users WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )?;
            Ok(user)
        })
        .await
    }

    async fn create_task(&self, owner: &UserId, task: NewTask) -> Result<Task, StoreError> {
        let owner = owner.clone();
        let created_at = timestamp(now());
        self.with_conn(move |conn| {
            require_owner(conn, &owner)?;
            let deadline = task
                .deadline
                .map(|d| d.format(DEADLINE_STORAGE_FORMAT).to_string());
            conn.execute(
                "INSERT INTO tasks (owner, name, description, category, priority, deadline, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner.as_str(),
                    task.name,
                    task.description,
                    task.category,
                    task.priority.value(),
                    deadline,
                    created_at,
                ],
            )?;
            let id = conn.last_insert_rowid();
            let created = conn.query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id],
                row_to_task,
            )?;
            tracing::debug!(owner = %owner, task_id = id, "Task created");
            Ok(created)
        })
        .await
    }

    async fn list_tasks(&self, owner: &UserId, completed: bool) -> Result<Vec<Task>, StoreError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks
                     WHERE owner = ?1 AND is_completed = ?2
                     ORDER BY priority DESC, deadline IS NULL, deadline ASC, id ASC",
                    TASK_COLUMNS
                ),
                params![owner.as_str(), completed as i64],
            )
        })
        .await
    }

    async fn all_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StoreError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks WHERE owner = ?1 ORDER BY id ASC",
                    TASK_COLUMNS
                ),
                params![owner.as_str()],
            )
        })
        .await
    }

    async fn complete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError> {
        let owner = owner.clone();
        let completed_at = timestamp(now());
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET is_completed = 1, completed_at = ?1
                 WHERE id = ?2 AND owner = ?3 AND is_completed = 0",
                params![completed_at, id.get(), owner.as_str()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<bool, StoreError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner = ?2",
                params![id.get(), owner.as_str()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn create_category(
        &self,
        owner: &UserId,
        name: &str,
    ) -> Result<Option<Category>, StoreError> {
        let owner = owner.clone();
        let name = name.to_string();
        let created_at = timestamp(now());
        self.with_conn(move |conn| {
            require_owner(conn, &owner)?;
            let inserted = conn.execute(
                "INSERT INTO categories (owner, name, color, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner, name) DO NOTHING",
                params![owner.as_str(), name, DEFAULT_CATEGORY_COLOR, created_at],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            let category = conn
                .query_row(
                    "SELECT id, owner, name, color, created_at FROM categories WHERE id = ?1",
                    params![conn.last_insert_rowid()],
                    row_to_category,
                )
                .optional()?;
            Ok(category)
        })
        .await
    }

    async fn list_categories(&self, owner: &UserId) -> Result<Vec<String>, StoreError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM categories WHERE owner = ?1
                 UNION
                 SELECT category FROM tasks
                 WHERE owner = ?1 AND category IS NOT NULL AND category != ''
                 ORDER BY 1",
            )?;
            let names = stmt
                .query_map(params![owner.as_str()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
        .await
    }

    async fn tasks_by_category(
        &self,
        owner: &UserId,
        name: &str,
    ) -> Result<Vec<Task>, StoreError> {
        let owner = owner.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks
                     WHERE owner = ?1 AND category = ?2 AND is_completed = 0
                     ORDER BY priority DESC, created_at ASC, id ASC",
                    TASK_COLUMNS
                ),
                params![owner.as_str(), name],
            )
        })
        .await
    }
}
