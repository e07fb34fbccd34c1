//! HTTP surface for the study organizer.
//!
//! Every route except `/health` requires a bearer token resolved through an
//! [`IdentityProvider`]; all reads and writes are scoped to that user.

#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use std::future::Future;
use std::io;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

pub use auth::{Caller, IdentityProvider, StaticTokens, TokenConfigError};
pub use error::ApiError;
pub use middleware::REQUEST_ID_HEADER;
pub use state::AppState;

use handlers::{dashboard, health, notes, pomodoro, subjects, tasks, topics};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::check))
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/tasks/:id",
            get(tasks::get).patch(tasks::update).delete(tasks::remove),
        )
        .route("/subjects", get(subjects::list).post(subjects::create))
        .route(
            "/subjects/:id",
            get(subjects::get)
                .patch(subjects::update)
                .delete(subjects::remove),
        )
        .route(
            "/subjects/:id/refresh-progress",
            post(subjects::refresh_progress),
        )
        .route("/topics", get(topics::list).post(topics::create))
        .route(
            "/topics/:id",
            get(topics::get).patch(topics::update).delete(topics::remove),
        )
        .route("/notes", get(notes::list).post(notes::create))
        .route(
            "/notes/:id",
            get(notes::get).patch(notes::update).delete(notes::remove),
        )
        .route(
            "/pomodoro-sessions",
            get(pomodoro::list).post(pomodoro::create),
        )
        .route("/pomodoro-sessions/stats", get(pomodoro::stats))
        .route(
            "/pomodoro-sessions/:id",
            get(pomodoro::get)
                .patch(pomodoro::update)
                .delete(pomodoro::remove),
        )
        .route("/dashboard", get(dashboard::show))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::trace_requests,
        ))
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the underlying I/O error if accepting connections fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
