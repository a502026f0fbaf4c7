//! HTTP API.
//!
//! [`router`] builds the axum application over a shared [`AppState`];
//! [`serve`] binds it with CORS and request tracing and runs until Ctrl-C.

pub mod auth;
pub mod response;
pub mod routes;

use crate::config::{AuthConfig, ServerConfig};
use crate::error::Result;
use crate::gantt::JsonFileStore;
use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The document store.
    pub store: Arc<JsonFileStore>,
    /// Login and session settings.
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Build state over `store` with `auth` settings.
    pub fn new(store: JsonFileStore, auth: AuthConfig) -> Self {
        Self { store: Arc::new(store), auth: Arc::new(auth) }
    }
}

/// Build the application router.
///
/// Every `/api` route sits behind [`auth::require_session`]; the `/auth`
/// routes do not.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api", get(routes::query_document).post(routes::replace_document))
        .route("/api/data", get(routes::get_document).post(routes::replace_document))
        .route("/api/tasks", get(routes::list_tasks).post(routes::post_tasks))
        .route("/api/tasks/:id", put(routes::put_task).delete(routes::delete_task))
        .route("/api/links", get(routes::list_links).post(routes::post_links))
        .route("/api/links/:id", put(routes::put_link).delete(routes::delete_link))
        .route("/api/users", get(routes::list_users).post(routes::post_users))
        .route("/api/:id", put(routes::legacy_put_task).delete(routes::legacy_delete_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    let sessions = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    Router::new().merge(api).merge(sessions).layer(TraceLayer::new_for_http()).with_state(state)
}

/// CORS for the configured origins, with credentials so the session cookie
/// is sent cross-origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: ServerConfig) -> Result<()> {
    config.log();

    let store = JsonFileStore::new(&config.data_path);
    match store.reconcile() {
        Ok((doc, _)) => {
            tracing::info!(tasks = doc.tasks.len(), links = doc.links.len(), "data file loaded");
        }
        Err(e) => tracing::warn!(error = %e, "data file unreadable; requests will fail until fixed"),
    }

    let app = router(AppState::new(store, config.auth.clone())).layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
