use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    commands::Reply,
    config::Config,
    crypto::{envelope, signing},
    handlers::transfer::attachment,
    models::cloud_file::CloudFile,
};

/// The algorithm suite protecting every envelope.
pub fn algorithm_suite() -> String {
    format!(
        "{} + {} + {}",
        envelope::KEM_ALGORITHM,
        envelope::AEAD_ALGORITHM,
        signing::SIGNATURE_ALGORITHM
    )
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub username: String,
    pub user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCreatedResponse {
    pub share_id: Uuid,
    pub share_link: String,
    pub expires_at: i64,
    pub algorithm: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfoResponse {
    pub filename: String,
    pub expires_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub size: i64,
}

#[derive(Serialize)]
pub struct FileEntry {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub created_at: i64,
}

impl From<CloudFile> for FileEntry {
    fn from(file: CloudFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            size: file.size,
            created_at: file.created_at.timestamp_millis(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub algorithm: String,
}

/// Turns a command reply into its HTTP response.
pub fn render(config: &Config, reply: Reply) -> Response {
    match reply {
        Reply::Authenticated { user, token } => Json(AuthResponse {
            token,
            username: user.username,
        })
        .into_response(),

        Reply::LoggedOut | Reply::CloudDeleted => Json(SuccessResponse { success: true }).into_response(),

        Reply::Session(user) => Json(SessionResponse {
            username: user.username,
            user_id: user.id,
        })
        .into_response(),

        Reply::SharedCreated(file) => Json(ShareCreatedResponse {
            share_id: file.id,
            share_link: format!("{}/{}", config.share_link_base.trim_end_matches('/'), file.id),
            expires_at: file.expires_at.timestamp_millis(),
            algorithm: algorithm_suite(),
        })
        .into_response(),

        Reply::SharedInfo(file) => Json(ShareInfoResponse {
            filename: file.filename,
            expires_at: file.expires_at.timestamp_millis(),
        })
        .into_response(),

        Reply::SharedContent(file, plaintext) => attachment(&file.filename, plaintext),

        Reply::CloudUploaded(file) => Json(UploadResponse {
            file_id: file.id,
            filename: file.filename,
            size: file.size,
        })
        .into_response(),

        Reply::CloudListing(files) => {
            Json(files.into_iter().map(FileEntry::from).collect::<Vec<_>>()).into_response()
        }

        Reply::CloudContent(file, plaintext) => attachment(&file.filename, plaintext),

        Reply::Health => Json(HealthResponse {
            status: "ok",
            algorithm: algorithm_suite(),
        })
        .into_response(),
    }
}
