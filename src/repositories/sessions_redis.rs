use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::SessionStore;
use crate::{
    crypto::token::redact,
    error::{AppError, Result},
    models::session::Session,
};

/// Sessions stored as JSON under `session:{token}`.
///
/// Keys carry a Redis TTL equal to the session's remaining lifetime so Redis
/// reclaims the space eventually. Validity is still decided by the session
/// manager comparing `expires_at` at lookup time.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    /// Connects to `redis_url` through a pooled connection manager.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");
        Ok(Self { redis })
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let remaining = (session.expires_at - Utc::now()).num_seconds().max(1) as u64;

        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(Self::key(&session.token), &session_json, remaining)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                AppError::Redis(e)
            })?;

        tracing::debug!("✅ Session saved to Redis: session:{}…", redact(&session.token));
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(Self::key(token)).await?;

        session_json
            .map(|json| {
                sonic_rs::from_str::<Session>(&json)
                    .map_err(|e| AppError::Internal(format!("Invalid session JSON: {}", e)))
            })
            .transpose()
    }

    async fn delete_by_token(&self, token: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(Self::key(token)).await?;
        Ok(())
    }
}
