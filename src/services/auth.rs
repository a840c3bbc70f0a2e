use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{
    crypto::password,
    error::{AppError, Result},
    models::user::User,
    repositories::UserStore,
    services::sessions::SessionManager,
    validation::auth::{validate_password, validate_username},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Account registration, login, logout and profile lookup.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
}

/// Runs PBKDF2 off the async workers.
async fn hash_password(password: &str) -> Result<String> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))
}

async fn verify_password(password: &str, stored: Option<String>) -> Result<bool> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || match stored {
        Some(stored) => password::verify_password(&password, &stored),
        None => {
            password::dummy_verify(&password);
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }

    /// Creates a new user and signs them in.
    ///
    /// # Arguments
    ///
    /// * `username` - 3 to 255 characters of `[A-Za-z0-9_-]`.
    /// * `password` - 6 to 128 characters.
    ///
    /// # Returns
    ///
    /// The created `User` and a fresh session token.
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, String)> {
        validate_username(username)?;
        validate_password(password)?;

        tracing::debug!("🔐 Creating user: {}", username);

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::Validation("Username already exists".to_string()));
        }

        let password_hash = hash_password(password).await?;
        let user = User::new(username.to_string(), password_hash, Utc::now());
        self.users.insert(&user).await?;

        let token = self.sessions.issue(user.id).await?;
        tracing::info!("✅ User created with ID: {}", user.id);

        Ok((user, token))
    }

    /// Authenticates a user and issues a session.
    ///
    /// Unknown usernames and wrong passwords fail identically, after the same
    /// amount of key derivation work.
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String)> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("Username and password required".to_string()));
        }

        tracing::debug!("🔐 Authenticating user: {}", username);

        let user = self.users.find_by_username(username).await?;
        let stored = user.as_ref().map(|u| u.password_hash.clone());

        let valid = verify_password(password, stored).await?;
        let user = match user {
            Some(user) if valid => user,
            _ => return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string())),
        };

        let token = self.sessions.issue(user.id).await?;
        tracing::info!("✅ User authenticated: {}", user.id);

        Ok((user, token))
    }

    /// Ends a session. Succeeds whether or not the token was live.
    pub async fn logout(&self, token: Option<&str>) -> Result<()> {
        if let Some(token) = token {
            self.sessions.revoke(token).await?;
        }
        Ok(())
    }

    /// Looks up an already authenticated user. A session can outlive its
    /// account, in which case this is `NotFound`.
    pub async fn profile(&self, user_id: Uuid) -> Result<User> {
        self.users.find_by_id(user_id).await?.ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use chrono::Duration;

    fn accounts() -> AccountService {
        let store = MemoryStore::new();
        let sessions = Arc::new(SessionManager::new(Arc::new(store.clone()), Duration::hours(24)));
        AccountService::new(Arc::new(store), sessions)
    }

    #[tokio::test]
    async fn register_then_login_then_profile() {
        let accounts = accounts();

        let (user, first) = accounts.register("alice", "secret1").await.unwrap();
        let (again, second) = accounts.login("alice", "secret1").await.unwrap();
        assert_eq!(user.id, again.id);
        assert_ne!(first, second);

        let user_id = accounts.sessions.validate(&second).await.unwrap().unwrap();
        assert_eq!(accounts.profile(user_id).await.unwrap().username, "alice");
        assert!(matches!(accounts.profile(Uuid::new_v4()).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_validation_error() {
        let accounts = accounts();
        accounts.register("alice", "secret1").await.unwrap();

        let err = accounts.register("alice", "another1").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_alike() {
        let accounts = accounts();
        accounts.register("alice", "secret1").await.unwrap();

        let wrong = accounts.login("alice", "secret2").await.unwrap_err();
        let unknown = accounts.login("mallory", "secret1").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.code(), "invalid_credentials");
    }

    #[tokio::test]
    async fn logout_revokes_and_tolerates_anything() {
        let accounts = accounts();
        let (_, token) = accounts.register("alice", "secret1").await.unwrap();

        accounts.logout(Some(&token)).await.unwrap();
        assert_eq!(accounts.sessions.validate(&token).await.unwrap(), None);

        accounts.logout(Some(&token)).await.unwrap();
        accounts.logout(None).await.unwrap();
    }

    #[tokio::test]
    async fn weak_credentials_are_rejected_before_hashing() {
        let accounts = accounts();
        assert!(matches!(accounts.register("al", "secret1").await, Err(AppError::Validation(_))));
        assert!(matches!(accounts.register("alice", "123").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn blank_login_fields_are_a_validation_error() {
        let accounts = accounts();
        accounts.register("alice", "secret1").await.unwrap();

        for (username, password) in [("", "secret1"), ("  ", "secret1"), ("alice", "")] {
            let err = accounts.login(username, password).await.unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
    }
}
