use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::{
    commands::{dispatch, Command, RequestContext},
    error::Result,
    handlers::reply::render,
    state::AppState,
};

/// The request payload for registration and login.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Handles user registration.
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("📝 Register attempt - Payload: {:?}", payload);

    let command = Command::Register {
        username: payload.username,
        password: payload.password,
    };
    let reply = dispatch(&state, &ctx, command).await?;
    Ok(render(&state.config, reply))
}

/// Handles user login.
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("🔐 Login attempt - Payload: {:?}", payload);

    let command = Command::Login {
        username: payload.username,
        password: payload.password,
    };
    let reply = dispatch(&state, &ctx, command).await?;
    Ok(render(&state.config, reply))
}

/// Handles user logout.
pub async fn logout(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::Logout).await?;
    Ok(render(&state.config, reply))
}

/// Reports who the bearer token belongs to.
pub async fn verify(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::VerifySession).await?;
    Ok(render(&state.config, reply))
}
