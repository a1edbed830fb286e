//! HTTP API for UnderCtrl.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/events` - Deliver a transport event, returns the bot's replies
//! - `GET /api/users/{id}/tasks?completed=` - Tasks in display order
//! - `GET /api/users/{id}/tasks/today` - Active tasks due today
//! - `GET /api/users/{id}/stats` - Task statistics
//! - `GET /api/users/{id}/categories` - Categories with active-task counts
//! - `GET /api/users/{id}/categories/{name}/tasks` - Active tasks in one category
//!
//! The `/api/users` endpoints are read-only and never register a user.

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
