use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    response::Response,
};

use crate::{
    commands::{dispatch, Command, RequestContext},
    error::Result,
    handlers::{reply::render, transfer::read_upload_form},
    state::AppState,
    validation::upload::parse_expiry_hours,
};

/// Encrypts an upload into a new shared link.
pub async fn upload(
    State(state): State<AppState>,
    ctx: RequestContext,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let form = read_upload_form(multipart?).await?;
    let expiry_hours = parse_expiry_hours(
        form.expiry_hours.as_deref(),
        state.config.default_share_ttl_hours,
        state.config.max_share_ttl_hours,
    )?;

    tracing::info!("📤 Share upload: {} bytes, {}h", form.bytes.len(), expiry_hours);

    let command = Command::CreateShared {
        bytes: form.bytes,
        filename: form.filename,
        expiry_hours,
    };
    let reply = dispatch(&state, &ctx, command).await?;
    Ok(render(&state.config, reply))
}

/// Filename and expiry of a live link.
pub async fn info(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(share_id): Path<String>,
) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::ReadShared { share_id }).await?;
    Ok(render(&state.config, reply))
}

pub async fn download(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(share_id): Path<String>,
) -> Result<Response> {
    tracing::info!("📥 Shared link download {}", share_id);
    let reply = dispatch(&state, &ctx, Command::DownloadShared { share_id }).await?;
    Ok(render(&state.config, reply))
}
