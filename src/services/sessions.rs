use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    crypto::token::{generate_session_token, redact},
    error::Result,
    models::session::Session,
    repositories::SessionStore,
};

/// Issues, validates and revokes bearer sessions.
///
/// Expiry is lazy: an expired record stays in the store until logout or the
/// backend reclaims it, and is simply treated as absent on lookup.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Creates a manager issuing sessions that live for `ttl`.
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Issues a new session for `user_id`.
    ///
    /// # Returns
    ///
    /// The opaque bearer token.
    pub async fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// Issues a session as if the current time were `now`.
    pub async fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let session = Session {
            token: generate_session_token(),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.store.insert(&session).await?;
        tracing::debug!("🔑 Session {}… issued for user {}", redact(&session.token), user_id);

        Ok(session.token)
    }

    /// Resolves a token to its user.
    ///
    /// # Returns
    ///
    /// `None` for unknown, revoked and expired tokens alike.
    pub async fn validate(&self, token: &str) -> Result<Option<Uuid>> {
        self.validate_at(token, Utc::now()).await
    }

    /// Resolves a token as if the current time were `now`.
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let Some(session) = self.store.find_by_token(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(now) {
            tracing::debug!("⌛ Session {}… expired at {}", redact(token), session.expires_at);
            return Ok(None);
        }

        Ok(Some(session.user_id))
    }

    /// Revokes a token. Unknown tokens are a no-op.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.delete_by_token(token).await?;
        tracing::debug!("👋 Session {}… revoked", redact(token));
        Ok(())
    }
}
