//! Task domain: users, tasks, categories, and the derived query views.
//!
//! Pure validation and ordering live here; IO goes through [`crate::store`].

pub mod category;
pub mod query;
pub mod task;

pub use category::{validate_category_name, Category, MAX_CATEGORY_NAME_LEN};
pub use query::{CategorySummary, PositionError, Statistics};
pub use task::{
    parse_deadline, validate_task_name, NewTask, Priority, Task, TaskError, TaskId, User, UserId,
    MAX_TASK_NAME_LEN,
};
