//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bot::Reply;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Storage backend in use ("sqlite" or "memory")
    pub store_backend: String,

    /// Whether tasks survive a restart
    pub persistent: bool,

    /// Users currently in the middle of a wizard or category prompt
    pub active_conversations: usize,
}

/// Replies produced for one inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    /// Request id, for correlating transport logs
    pub id: Uuid,

    /// Replies to send, in order (currently at most one)
    pub replies: Vec<Reply>,
}

/// Query parameters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    /// List completed tasks instead of active ones
    #[serde(default)]
    pub completed: bool,
}
