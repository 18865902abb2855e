use crate::{
    api::handlers::{
        api_not_found, auth, debug, groups, health, links, reorder, save, sections, settings,
    },
    store::{DocumentStore, MemoryBackend, SqliteBackend},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    routing::{any, get, post, put},
    Extension, Router,
};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;


pub use handlers::{auth::AuthConfig, links::IconPolicy};
pub use openapi::openapi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// DSN selecting the volatile in-process store.
pub const MEMORY_DSN: &str = "memory://";

/// Every API route. Handlers expect the extensions added by [`app`].
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/links", get(links::list_links))
        .route("/api/me", get(auth::me))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/debug/env", get(debug::debug_env))
        .route("/api/admin/groups", post(groups::create_group))
        .route(
            "/api/admin/groups/:id",
            put(groups::update_group).delete(groups::delete_group),
        )
        .route("/api/admin/sections", post(sections::create_section))
        .route(
            "/api/admin/sections/:id",
            put(sections::update_section).delete(sections::delete_section),
        )
        .route("/api/admin/links", post(links::create_link))
        .route(
            "/api/admin/links/:id",
            put(links::update_link).delete(links::delete_link),
        )
        .route("/api/admin/reorder", post(reorder::reorder))
        .route(
            "/api/admin/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/api/admin/save", post(save::save))
        .route("/api", any(api_not_found))
        .route("/api/*rest", any(api_not_found))
}

/// The full application: routes, static assets, request ids, tracing and
/// the shared state every handler pulls from its extensions.
#[must_use]
pub fn app(
    store: DocumentStore,
    auth_state: Arc<auth::AuthState>,
    icons: IconPolicy,
    assets_dir: Option<&Path>,
) -> Router {
    let guard = auth::LoginGuard::new(store.clone());

    let router = match assets_dir {
        // Unknown paths fall back to the app shell so client-side routes load.
        Some(dir) => router().fallback_service(
            ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html"))),
        ),
        None => router().fallback(|| async { StatusCode::NOT_FOUND }),
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth_state))
            .layer(Extension(store))
            .layer(Extension(guard))
            .layer(Extension(icons)),
    )
}

/// Start the server
/// # Errors
/// Return error if the store cannot be opened or the listener fails
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    icons: IconPolicy,
    assets_dir: Option<String>,
) -> Result<()> {
    let store = open_store(&dsn).await?;

    let auth_state = Arc::new(auth::AuthState::new(auth_config));
    if !auth_state.is_configured() {
        warn!("No admin password configured, admin routes will answer 503");
    }

    let app = app(store, auth_state, icons, assets_dir.as_deref().map(Path::new));

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Spawn the store task over the backend named by `dsn`.
///
/// # Errors
/// Return error if the database cannot be opened
pub async fn open_store(dsn: &str) -> Result<DocumentStore> {
    if dsn == MEMORY_DSN {
        warn!("Using the in-memory store, nothing survives a restart");
        return Ok(DocumentStore::spawn(MemoryBackend::new()));
    }

    let backend = SqliteBackend::connect(dsn)
        .await
        .context("Failed to open document store")?;

    Ok(DocumentStore::spawn(backend))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Gracefully shutdown"),
        Err(err) => {
            error!("Failed to listen for shutdown signal: {err}");
            std::future::pending::<()>().await;
        }
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
