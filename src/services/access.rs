use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{cloud_file::CloudFile, shared_file::SharedFile},
    services::sessions::SessionManager,
};

/// Gatekeeper for both resource kinds.
///
/// Shared links carry no identity and are guarded by expiry alone. Cloud files
/// need a live session, and a file owned by someone else is reported exactly
/// like a missing one.
#[derive(Clone)]
pub struct AccessController {
    sessions: Arc<SessionManager>,
}

impl AccessController {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Resolves the caller of a cloud operation.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Uuid> {
        self.authenticate_at(token, Utc::now()).await
    }

    pub async fn authenticate_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Uuid> {
        let token = token.ok_or(AppError::Unauthorized)?;
        self.sessions
            .validate_at(token, now)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Rejects a shared link past its expiry. A link is still valid at the
    /// exact instant it expires.
    pub fn ensure_not_expired(&self, file: &SharedFile, now: DateTime<Utc>) -> Result<()> {
        if file.is_expired_at(now) {
            tracing::debug!("⌛ Shared link {} expired at {}", file.id, file.expires_at);
            return Err(AppError::Expired);
        }
        Ok(())
    }

    /// Hands back the record only when `user_id` owns it.
    pub fn authorize_owner(&self, file: Option<CloudFile>, user_id: Uuid) -> Result<CloudFile> {
        match file {
            Some(file) if file.user_id == user_id => Ok(file),
            Some(file) => {
                tracing::warn!("🚫 User {} asked for file {} owned by someone else", user_id, file.id);
                Err(AppError::NotFound)
            }
            None => Err(AppError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::SharedSecret;
    use crate::repositories::MemoryStore;
    use chrono::Duration;

    fn controller() -> (AccessController, Arc<SessionManager>) {
        let sessions = Arc::new(SessionManager::new(
            Arc::new(MemoryStore::new()),
            Duration::hours(24),
        ));
        (AccessController::new(sessions.clone()), sessions)
    }

    fn cloud_file(owner: Uuid) -> CloudFile {
        CloudFile {
            id: Uuid::new_v4(),
            user_id: owner,
            filename: "notes.txt".to_string(),
            size: 3,
            kem_ciphertext: vec![0; 4],
            shared_secret: SharedSecret::from_bytes(vec![0; 32]),
            created_at: Utc::now(),
        }
    }

    fn shared_file(expires_at: DateTime<Utc>) -> SharedFile {
        SharedFile {
            id: Uuid::new_v4(),
            filename: "a.bin".to_string(),
            kem_ciphertext: vec![0; 4],
            shared_secret: SharedSecret::from_bytes(vec![0; 32]),
            signature: vec![],
            signer_public_key: vec![],
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn authenticate_requires_a_live_token() {
        let (access, sessions) = controller();
        let user_id = Uuid::new_v4();
        let token = sessions.issue(user_id).await.unwrap();

        assert_eq!(access.authenticate(Some(&token)).await.unwrap(), user_id);
        assert!(matches!(access.authenticate(None).await, Err(AppError::Unauthorized)));
        assert!(matches!(
            access.authenticate(Some("bogus")).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let (access, _) = controller();
        let t = Utc::now();
        let file = shared_file(t);

        assert!(access.ensure_not_expired(&file, t).is_ok());
        assert!(matches!(
            access.ensure_not_expired(&file, t + Duration::milliseconds(1)),
            Err(AppError::Expired)
        ));
    }

    #[test]
    fn foreign_and_missing_files_look_the_same() {
        let (access, _) = controller();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(access.authorize_owner(Some(cloud_file(owner)), owner).is_ok());

        let foreign = access.authorize_owner(Some(cloud_file(owner)), stranger).unwrap_err();
        let missing = access.authorize_owner(None, stranger).unwrap_err();
        assert_eq!(foreign.code(), missing.code());
        assert_eq!(foreign.status(), missing.status());
    }
}
