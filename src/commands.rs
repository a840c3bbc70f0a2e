//! Boundary operations as data.
//!
//! Every externally reachable operation is a [`Command`]. Transports build a
//! command plus a [`RequestContext`], call [`dispatch`], and render the
//! [`Reply`]; they never reach into services directly.

use axum::body::Bytes;
use uuid::Uuid;

use crate::{
    crypto::envelope::Plaintext,
    error::{AppError, Result},
    models::{cloud_file::CloudFile, shared_file::SharedFile, user::User},
    state::AppState,
};

/// Caller-supplied context that is not part of any single command.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Bearer token from the `Authorization` header, if any.
    pub token: Option<String>,
}

impl RequestContext {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("token", &self.token.as_deref().map(crate::crypto::token::redact))
            .finish()
    }
}

pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    VerifySession,
    CreateShared { bytes: Bytes, filename: String, expiry_hours: i64 },
    ReadShared { share_id: String },
    DownloadShared { share_id: String },
    UploadCloud { bytes: Bytes, filename: String },
    ListCloud,
    DownloadCloud { file_id: String },
    DeleteCloud { file_id: String },
    Health,
}

impl Command {
    /// Stable operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::VerifySession => "verify-session",
            Command::CreateShared { .. } => "create-shared-link",
            Command::ReadShared { .. } => "read-shared-link",
            Command::DownloadShared { .. } => "download-shared-link",
            Command::UploadCloud { .. } => "upload-cloud-file",
            Command::ListCloud => "list-cloud-files",
            Command::DownloadCloud { .. } => "download-cloud-file",
            Command::DeleteCloud { .. } => "delete-cloud-file",
            Command::Health => "health",
        }
    }

    /// Whether the command needs a live session before it runs.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Command::VerifySession
                | Command::UploadCloud { .. }
                | Command::ListCloud
                | Command::DownloadCloud { .. }
                | Command::DeleteCloud { .. }
        )
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub enum Reply {
    Authenticated { user: User, token: String },
    LoggedOut,
    Session(User),
    SharedCreated(SharedFile),
    SharedInfo(SharedFile),
    SharedContent(SharedFile, Plaintext),
    CloudUploaded(CloudFile),
    CloudListing(Vec<CloudFile>),
    CloudContent(CloudFile, Plaintext),
    CloudDeleted,
    Health,
}

/// Resource ids that do not parse are indistinguishable from missing ones.
fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

/// Runs `command` against `state`.
pub async fn dispatch(state: &AppState, ctx: &RequestContext, command: Command) -> Result<Reply> {
    tracing::debug!("➡️ {}", command.name());

    let caller = if command.requires_session() {
        Some(state.access.authenticate(ctx.token()).await?)
    } else {
        None
    };
    let user_id = || caller.ok_or(AppError::Unauthorized);

    match command {
        Command::Register { username, password } => {
            let (user, token) = state.accounts.register(&username, &password).await?;
            Ok(Reply::Authenticated { user, token })
        }

        Command::Login { username, password } => {
            let (user, token) = state.accounts.login(&username, &password).await?;
            Ok(Reply::Authenticated { user, token })
        }

        Command::Logout => {
            state.accounts.logout(ctx.token()).await?;
            Ok(Reply::LoggedOut)
        }

        Command::VerifySession => Ok(Reply::Session(state.accounts.profile(user_id()?).await?)),

        Command::CreateShared { bytes, filename, expiry_hours } => {
            let file = state
                .envelopes
                .create_shared(&bytes, &filename, expiry_hours)
                .await?;
            Ok(Reply::SharedCreated(file))
        }

        Command::ReadShared { share_id } => {
            let file = state.envelopes.shared_info(parse_id(&share_id)?).await?;
            Ok(Reply::SharedInfo(file))
        }

        Command::DownloadShared { share_id } => {
            let (file, plaintext) = state.envelopes.fetch_shared(parse_id(&share_id)?).await?;
            Ok(Reply::SharedContent(file, plaintext))
        }

        Command::UploadCloud { bytes, filename } => {
            let file = state.envelopes.create_cloud(user_id()?, &bytes, &filename).await?;
            Ok(Reply::CloudUploaded(file))
        }

        Command::ListCloud => Ok(Reply::CloudListing(state.envelopes.list_cloud(user_id()?).await?)),

        Command::DownloadCloud { file_id } => {
            let (file, plaintext) = state.envelopes.fetch_cloud(user_id()?, parse_id(&file_id)?).await?;
            Ok(Reply::CloudContent(file, plaintext))
        }

        Command::DeleteCloud { file_id } => {
            state.envelopes.delete_cloud(user_id()?, parse_id(&file_id)?).await?;
            Ok(Reply::CloudDeleted)
        }

        Command::Health => Ok(Reply::Health),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn only_account_reads_and_cloud_operations_need_a_session() {
        let gated: Vec<&str> = [
            Command::Register { username: String::new(), password: String::new() },
            Command::Logout,
            Command::VerifySession,
            Command::ReadShared { share_id: String::new() },
            Command::ListCloud,
            Command::DeleteCloud { file_id: String::new() },
            Command::Health,
        ]
        .iter()
        .filter(|c| c.requires_session())
        .map(Command::name)
        .collect();

        assert_eq!(gated, ["verify-session", "list-cloud-files", "delete-cloud-file"]);
    }

    #[tokio::test]
    async fn cloud_commands_without_a_token_are_unauthorized() {
        let state = AppState::in_memory(Config::default());
        let err = dispatch(&state, &RequestContext::default(), Command::ListCloud)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Unauthorized));

        let ctx = RequestContext::with_token("never-issued");
        let err = dispatch(&state, &ctx, Command::ListCloud).await.err().unwrap();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn malformed_ids_are_not_found() {
        let state = AppState::in_memory(Config::default());
        let cmd = Command::ReadShared { share_id: "not-a-uuid".to_string() };
        let err = dispatch(&state, &RequestContext::default(), cmd).await.err().unwrap();
        assert!(matches!(err, AppError::NotFound));
    }
}
