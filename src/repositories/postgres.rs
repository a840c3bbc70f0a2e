use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};
use uuid::Uuid;

use super::{CloudFileStore, SharedFileStore, UserStore};
use crate::{
    crypto::envelope::SharedSecret,
    error::{AppError, Result},
    models::{cloud_file::CloudFile, shared_file::SharedFile, user::User},
};

/// PostgreSQL-backed user, shared file and cloud file records.
///
/// Statements are prepared per pooled connection through deadpool's
/// statement cache.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Wraps an existing pool. The schema must already exist; see
    /// `db::ensure_schema`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_shared_file(row: &Row) -> Result<SharedFile> {
    Ok(SharedFile {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        kem_ciphertext: row.try_get("kem_ciphertext")?,
        shared_secret: SharedSecret::from_bytes(row.try_get("shared_secret")?),
        signature: row.try_get("signature")?,
        signer_public_key: row.try_get("sig_public_key")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cloud_file(row: &Row) -> Result<CloudFile> {
    Ok(CloudFile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        filename: row.try_get("filename")?,
        size: row.try_get("size")?,
        kem_ciphertext: row.try_get("kem_ciphertext")?,
        shared_secret: SharedSecret::from_bytes(row.try_get("shared_secret")?),
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO users (id, username, password_hash, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .await?;

        client
            .execute(
                &statement,
                &[&user.id, &user.username, &user.password_hash, &user.created_at],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::Validation("Username already exists".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, username, password_hash, created_at
                FROM users
                WHERE username = $1
                "#,
            )
            .await?;

        let row = client.query_opt(&statement, &[&username]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, username, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .await?;

        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}

#[async_trait]
impl SharedFileStore for PgStore {
    async fn insert(&self, file: &SharedFile) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO shared_files (
                    id, filename, kem_ciphertext, shared_secret,
                    signature, sig_public_key, expires_at, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .await?;

        let shared_secret = file.shared_secret.as_bytes();
        client
            .execute(
                &statement,
                &[
                    &file.id,
                    &file.filename,
                    &file.kem_ciphertext,
                    &shared_secret,
                    &file.signature,
                    &file.signer_public_key,
                    &file.expires_at,
                    &file.created_at,
                ],
            )
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SharedFile>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, filename, kem_ciphertext, shared_secret,
                       signature, sig_public_key, expires_at, created_at
                FROM shared_files
                WHERE id = $1
                "#,
            )
            .await?;

        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_shared_file(&r)).transpose()
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id FROM shared_files
                WHERE expires_at < $1
                "#,
            )
            .await?;

        let rows = client.query(&statement, &[&now]).await?;
        rows.iter()
            .map(|r| r.try_get::<_, Uuid>("id").map_err(AppError::from))
            .collect()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                DELETE FROM shared_files
                WHERE id = $1
                "#,
            )
            .await?;

        let removed = client.execute(&statement, &[&id]).await?;
        Ok(removed == 1)
    }
}

#[async_trait]
impl CloudFileStore for PgStore {
    async fn insert(&self, file: &CloudFile) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO cloud_files (
                    id, user_id, filename, kem_ciphertext, shared_secret, size, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .await?;

        let shared_secret = file.shared_secret.as_bytes();
        client
            .execute(
                &statement,
                &[
                    &file.id,
                    &file.user_id,
                    &file.filename,
                    &file.kem_ciphertext,
                    &shared_secret,
                    &file.size,
                    &file.created_at,
                ],
            )
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CloudFile>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, user_id, filename, kem_ciphertext, shared_secret, size, created_at
                FROM cloud_files
                WHERE id = $1
                "#,
            )
            .await?;

        let row = client.query_opt(&statement, &[&id]).await?;
        row.map(|r| row_to_cloud_file(&r)).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CloudFile>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, user_id, filename, kem_ciphertext, shared_secret, size, created_at
                FROM cloud_files
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .await?;

        let rows = client.query(&statement, &[&user_id]).await?;
        rows.iter().map(row_to_cloud_file).collect()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                DELETE FROM cloud_files
                WHERE id = $1
                "#,
            )
            .await?;

        let removed = client.execute(&statement, &[&id]).await?;
        Ok(removed == 1)
    }
}
