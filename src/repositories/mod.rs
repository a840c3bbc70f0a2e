//! Persistence contract.
//!
//! Core services only ever talk to these traits. Each backend decides how
//! records are stored; the contracts fix what callers can rely on:
//!
//! * lookups return `Ok(None)` for absent records, never an error;
//! * `CloudFileStore::delete_by_id` is an atomic check-and-delete, so of two
//!   racing deletes exactly one observes `true`;
//! * `ContentStore::delete` is idempotent and reports whether bytes existed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{cloud_file::CloudFile, session::Session, shared_file::SharedFile, user::User};

pub mod content;
pub mod memory;
pub mod postgres;
pub mod sessions_redis;

pub use content::{FsContentStore, MemoryContentStore};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sessions_redis::RedisSessionStore;

/// Account records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. A taken username is a `Validation` error.
    async fn insert(&self, user: &User) -> Result<()>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Session records keyed by token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<()>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Removes the session. Removing an unknown token succeeds.
    async fn delete_by_token(&self, token: &str) -> Result<()>;
}

/// Shared link metadata.
#[async_trait]
pub trait SharedFileStore: Send + Sync {
    async fn insert(&self, file: &SharedFile) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SharedFile>>;

    /// Ids of every record whose expiry lies before `now`.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;

    /// Removes the record. `false` if it was already gone.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

/// Cloud file metadata.
#[async_trait]
pub trait CloudFileStore: Send + Sync {
    async fn insert(&self, file: &CloudFile) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CloudFile>>;

    /// All files owned by `user_id`, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CloudFile>>;

    /// Atomically removes the record. `false` if it was already gone.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

/// Ciphertext bytes keyed by resource id.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, id: Uuid, bytes: &[u8]) -> Result<()>;

    /// The stored bytes, or `AppError::NotFound`.
    async fn get(&self, id: Uuid) -> Result<Vec<u8>>;

    /// Removes the bytes. `false` if nothing was stored under `id`.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}
