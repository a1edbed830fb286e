//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::bot::{DispatchError, Dispatcher, InboundEvent};
use crate::config::{Config, StoreBackend};
use crate::store::{self, SharedTaskStore, StoreError};
use crate::task::{query, CategorySummary, Statistics, Task, UserId};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Task storage shared by the dispatcher and the read endpoints
    pub store: SharedTaskStore,
    /// Per-user conversation state
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Config, store: SharedTaskStore) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&store), config.category_preview_limit);
        Self {
            config,
            store,
            dispatcher,
        }
    }
}

/// Build the router over an existing state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/events", post(post_event))
        .route("/api/users/:id/tasks", get(list_tasks))
        .route("/api/users/:id/tasks/today", get(today_tasks))
        .route("/api/users/:id/stats", get(get_stats))
        .route("/api/users/:id/categories", get(list_categories))
        .route("/api/users/:id/categories/:name/tasks", get(category_tasks))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = store::open(&config).await?;
    let state = Arc::new(AppState::new(config.clone(), store));
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_state).await;
        })
        .await?;

    Ok(())
}

/// Wait for a shutdown signal. Unfinished conversations live only in memory
/// and are dropped.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let open = state.dispatcher.active_conversations().await;
    if open == 0 {
        tracing::info!("Shutdown signal received, no open conversations");
    } else {
        tracing::info!(
            "Shutdown signal received, discarding {} open conversation(s)",
            open
        );
    }
}

fn store_failure(e: StoreError) -> (StatusCode, String) {
    tracing::error!("Store failure: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_backend = match state.config.store_backend {
        StoreBackend::Sqlite => "sqlite",
        StoreBackend::Memory => "memory",
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_backend: store_backend.to_string(),
        persistent: state.store.is_persistent(),
        active_conversations: state.dispatcher.active_conversations().await,
    })
}

/// Feed one transport event through the dispatcher.
async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<EventResponse>, (StatusCode, String)> {
    let id = Uuid::new_v4();
    tracing::debug!(request = %id, user = %event.user.id, "Inbound event");

    match state.dispatcher.dispatch(event).await {
        Ok(reply) => Ok(Json(EventResponse {
            id,
            replies: reply.into_iter().collect(),
        })),
        Err(DispatchError::UnknownAction(e)) => {
            tracing::warn!(request = %id, "{}", e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(DispatchError::Store(e)) => Err(store_failure(e)),
    }
}

/// List a user's tasks in display order.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    state
        .store
        .list_tasks(&UserId::new(id), params.completed)
        .await
        .map(Json)
        .map_err(store_failure)
}

/// Active tasks due today, local time.
async fn today_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let today = Local::now().date_naive();
    query::tasks_due_on(state.store.as_ref(), &UserId::new(id), today)
        .await
        .map(Json)
        .map_err(store_failure)
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Statistics>, (StatusCode, String)> {
    query::statistics(state.store.as_ref(), &UserId::new(id))
        .await
        .map(Json)
        .map_err(store_failure)
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CategorySummary>>, (StatusCode, String)> {
    query::category_summaries(state.store.as_ref(), &UserId::new(id))
        .await
        .map(Json)
        .map_err(store_failure)
}

/// Active tasks in one category, exact name match.
async fn category_tasks(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    query::tasks_in_category(state.store.as_ref(), &UserId::new(id), &name)
        .await
        .map(Json)
        .map_err(store_failure)
}
