//! Named categories a user creates explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{TaskError, UserId};

/// Maximum category name length, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 50;

/// Colour assigned to new categories.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3498db";

/// A category, unique per `(owner, name)`. Names compare case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub owner: UserId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Trim a category name and check its length.
pub fn validate_category_name(raw: &str) -> Result<String, TaskError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TaskError::EmptyCategoryName);
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(TaskError::CategoryNameTooLong {
            max: MAX_CATEGORY_NAME_LEN,
        });
    }
    Ok(name.to_string())
}
