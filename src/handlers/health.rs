use axum::{extract::State, response::Response};

use crate::{
    commands::{dispatch, Command, RequestContext},
    error::Result,
    handlers::reply::render,
    state::AppState,
};

pub async fn health(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::Health).await?;
    Ok(render(&state.config, reply))
}
