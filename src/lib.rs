//! # UnderCtrl
//!
//! A conversational task manager.
//!
//! Users add tasks through a step-by-step wizard, then list, complete and
//! delete them and browse per-day, per-category and aggregate views.
//!
//! ## Architecture
//!
//! ```text
//!   transport ──▶ api (POST /api/events)
//!                   │
//!                   ▼
//!              bot::Dispatcher ──▶ wizard (per-user draft)
//!                   │
//!                   ▼
//!             task::query ──▶ store (SQLite or in-memory)
//! ```
//!
//! ## Modules
//! - `task`: Task, category and user types, plus the query engine
//! - `store`: Owner-scoped persistence behind the `TaskStore` trait
//! - `wizard`: Task creation state machine
//! - `bot`: Event routing, keyboards and reply text
//! - `api`: HTTP webhook and read-only views

pub mod api;
pub mod bot;
pub mod config;
pub mod store;
pub mod task;
pub mod wizard;

pub use config::Config;
