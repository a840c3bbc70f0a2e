use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use http::{header, HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    error::{AppError, Result},
    handlers,
    middleware_layer::rate_limit::limit_credential_routes,
    state::AppState,
};

fn cors(frontend_origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = frontend_origin
        .parse()
        .map_err(|_| AppError::Internal(format!("Invalid FRONTEND_ORIGIN: {}", frontend_origin)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(86400)))
}

/// Builds the HTTP surface over `state`.
pub fn router(state: AppState) -> Result<Router> {
    let config = state.config.clone();

    let credential_routes = limit_credential_routes(
        Router::new()
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login)),
        &config,
    )?;

    let session_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/verify", get(handlers::auth::verify));

    let share_routes = Router::new()
        .route("/api/share/upload", post(handlers::share::upload))
        .route("/api/share/{share_id}", get(handlers::share::info))
        .route("/api/share/{share_id}/download", get(handlers::share::download));

    let storage_routes = Router::new()
        .route("/api/storage/upload", post(handlers::storage::upload))
        .route("/api/storage/files", get(handlers::storage::list))
        .route(
            "/api/storage/files/{file_id}/download",
            get(handlers::storage::download),
        )
        .route("/api/storage/files/{file_id}", delete(handlers::storage::delete));

    let app = Router::new()
        .route("/api/health", get(handlers::health::health))
        .merge(credential_routes)
        .merge(session_routes)
        .merge(share_routes)
        .merge(storage_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors(&config.frontend_origin)?)
        .with_state(state);

    Ok(app)
}
