use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a registered account.
#[derive(Clone)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's unique username.
    pub username: String,
    /// `salt$hex(pbkdf2)` as produced by `crypto::password::hash_password`.
    pub password_hash: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user record with a fresh id.
    pub fn new(username: String, password_hash: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
