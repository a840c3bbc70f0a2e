//! In-memory record stores for tests and `STORAGE_BACKEND=memory`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CloudFileStore, SessionStore, SharedFileStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{cloud_file::CloudFile, session::Session, shared_file::SharedFile, user::User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    shared_files: HashMap<Uuid, SharedFile>,
    cloud_files: HashMap<Uuid, CloudFile>,
}

/// Implements every record store over one lock-protected set of maps.
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live session records, expired ones included.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Validation("Username already exists".to_string()));
        }

        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl SharedFileStore for MemoryStore {
    async fn insert(&self, file: &SharedFile) -> Result<()> {
        self.tables
            .write()
            .await
            .shared_files
            .insert(file.id, file.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SharedFile>> {
        Ok(self.tables.read().await.shared_files.get(&id).cloned())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .shared_files
            .values()
            .filter(|f| f.is_expired_at(now))
            .map(|f| f.id)
            .collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.shared_files.remove(&id).is_some())
    }
}

#[async_trait]
impl CloudFileStore for MemoryStore {
    async fn insert(&self, file: &CloudFile) -> Result<()> {
        self.tables
            .write()
            .await
            .cloud_files
            .insert(file.id, file.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CloudFile>> {
        Ok(self.tables.read().await.cloud_files.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CloudFile>> {
        let tables = self.tables.read().await;

        let mut files: Vec<CloudFile> = tables
            .cloud_files
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(files)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.cloud_files.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::SharedSecret;
    use chrono::Duration;

    fn cloud_file(user_id: Uuid, created_at: DateTime<Utc>) -> CloudFile {
        CloudFile {
            id: Uuid::new_v4(),
            user_id,
            filename: "a.txt".into(),
            size: 1,
            kem_ciphertext: vec![],
            shared_secret: SharedSecret::from_bytes(vec![0; 32]),
            created_at,
        }
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        UserStore::insert(&store, &User::new("alice".into(), "h".into(), now)).await.unwrap();

        let err = UserStore::insert(&store, &User::new("alice".into(), "h".into(), now))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let old = cloud_file(owner, now - Duration::minutes(5));
        let new = cloud_file(owner, now);
        let foreign = cloud_file(Uuid::new_v4(), now);
        for f in [&old, &new, &foreign] {
            CloudFileStore::insert(&store, f).await.unwrap();
        }

        let ids: Vec<Uuid> = store.list_by_user(owner).await.unwrap().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = MemoryStore::new();
        let file = cloud_file(Uuid::new_v4(), Utc::now());
        CloudFileStore::insert(&store, &file).await.unwrap();

        assert!(CloudFileStore::delete_by_id(&store, file.id).await.unwrap());
        assert!(!CloudFileStore::delete_by_id(&store, file.id).await.unwrap());
    }
}
