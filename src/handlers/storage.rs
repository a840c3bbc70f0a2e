use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    response::Response,
};

use crate::{
    commands::{dispatch, Command, RequestContext},
    error::Result,
    handlers::{reply::render, transfer::read_upload_form},
    state::AppState,
};

pub async fn upload(
    State(state): State<AppState>,
    ctx: RequestContext,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    // Reject before buffering the body.
    state.access.authenticate(ctx.token()).await?;

    let form = read_upload_form(multipart?).await?;
    tracing::info!("📤 Cloud upload: {} bytes", form.bytes.len());

    let command = Command::UploadCloud {
        bytes: form.bytes,
        filename: form.filename,
    };
    let reply = dispatch(&state, &ctx, command).await?;
    Ok(render(&state.config, reply))
}

pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::ListCloud).await?;
    Ok(render(&state.config, reply))
}

pub async fn download(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(file_id): Path<String>,
) -> Result<Response> {
    tracing::info!("📥 Cloud download {}", file_id);
    let reply = dispatch(&state, &ctx, Command::DownloadCloud { file_id }).await?;
    Ok(render(&state.config, reply))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let reply = dispatch(&state, &ctx, Command::DeleteCloud { file_id }).await?;
    Ok(render(&state.config, reply))
}
