use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    crypto::{envelope, envelope::Plaintext, signing},
    error::{AppError, Result},
    models::{cloud_file::CloudFile, shared_file::SharedFile},
    repositories::{CloudFileStore, ContentStore, SharedFileStore},
    services::access::AccessController,
    validation::upload::{validate_expiry_hours, validate_filename},
};

/// Record and blob stores the envelope service writes to.
#[derive(Clone)]
pub struct EnvelopeStores {
    pub shared_files: Arc<dyn SharedFileStore>,
    pub cloud_files: Arc<dyn CloudFileStore>,
    pub share_blobs: Arc<dyn ContentStore>,
    pub cloud_blobs: Arc<dyn ContentStore>,
}

/// Creates, reads and destroys encrypted envelopes for both resource kinds.
///
/// Only ciphertext ever reaches a store. Shared links are additionally signed
/// over the exact stored bytes, and the signature is checked before every
/// decrypt.
#[derive(Clone)]
pub struct EnvelopeService {
    stores: EnvelopeStores,
    access: AccessController,
    max_share_ttl_hours: i64,
}

impl EnvelopeService {
    pub fn new(stores: EnvelopeStores, access: AccessController, max_share_ttl_hours: i64) -> Self {
        Self {
            stores,
            access,
            max_share_ttl_hours,
        }
    }

    /// Encrypts, signs and stores `bytes` as a shared link valid for
    /// `ttl_hours`.
    pub async fn create_shared(&self, bytes: &[u8], filename: &str, ttl_hours: i64) -> Result<SharedFile> {
        self.create_shared_at(bytes, filename, ttl_hours, Utc::now()).await
    }

    pub async fn create_shared_at(
        &self,
        bytes: &[u8],
        filename: &str,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<SharedFile> {
        let filename = validate_filename(filename)?;
        let ttl_hours = validate_expiry_hours(ttl_hours, self.max_share_ttl_hours)?;

        let sealed = envelope::encrypt(bytes)?;
        let signature = signing::sign(&sealed.ciphertext)?;

        let file = SharedFile {
            id: Uuid::new_v4(),
            filename,
            kem_ciphertext: sealed.kem_ciphertext,
            shared_secret: sealed.shared_secret,
            signature: signature.signature,
            signer_public_key: signature.public_key,
            expires_at: now + Duration::hours(ttl_hours),
            created_at: now,
        };

        self.stores.share_blobs.put(file.id, &sealed.ciphertext).await?;

        if let Err(e) = self.stores.shared_files.insert(&file).await {
            discard_orphan(self.stores.share_blobs.as_ref(), file.id).await;
            return Err(e);
        }

        tracing::info!(
            "✅ Shared link {} created ({} bytes, expires {})",
            file.id,
            bytes.len(),
            file.expires_at
        );
        Ok(file)
    }

    /// Metadata of a live shared link. Nothing is decrypted.
    pub async fn shared_info(&self, share_id: Uuid) -> Result<SharedFile> {
        self.shared_info_at(share_id, Utc::now()).await
    }

    pub async fn shared_info_at(&self, share_id: Uuid, now: DateTime<Utc>) -> Result<SharedFile> {
        let file = self
            .stores
            .shared_files
            .find_by_id(share_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.access.ensure_not_expired(&file, now)?;
        Ok(file)
    }

    /// Verifies and decrypts a live shared link.
    pub async fn fetch_shared(&self, share_id: Uuid) -> Result<(SharedFile, Plaintext)> {
        self.fetch_shared_at(share_id, Utc::now()).await
    }

    pub async fn fetch_shared_at(&self, share_id: Uuid, now: DateTime<Utc>) -> Result<(SharedFile, Plaintext)> {
        let file = self.shared_info_at(share_id, now).await?;
        let ciphertext = self.stores.share_blobs.get(file.id).await?;

        if !signing::verify(&ciphertext, &file.signature, &file.signer_public_key) {
            tracing::warn!("🚨 Signature check failed for shared link {}", file.id);
            return Err(AppError::SignatureInvalid);
        }

        let plaintext = envelope::decrypt(&ciphertext, &file.shared_secret)?;
        tracing::info!("🔓 Shared link {} opened ({} bytes)", file.id, plaintext.len());
        Ok((file, plaintext))
    }

    /// Encrypts and stores `bytes` in `user_id`'s cloud storage.
    pub async fn create_cloud(&self, user_id: Uuid, bytes: &[u8], filename: &str) -> Result<CloudFile> {
        let filename = validate_filename(filename)?;
        let sealed = envelope::encrypt(bytes)?;

        let file = CloudFile {
            id: Uuid::new_v4(),
            user_id,
            filename,
            size: bytes.len() as i64,
            kem_ciphertext: sealed.kem_ciphertext,
            shared_secret: sealed.shared_secret,
            created_at: Utc::now(),
        };

        self.stores.cloud_blobs.put(file.id, &sealed.ciphertext).await?;

        if let Err(e) = self.stores.cloud_files.insert(&file).await {
            discard_orphan(self.stores.cloud_blobs.as_ref(), file.id).await;
            return Err(e);
        }

        tracing::info!("✅ Cloud file {} stored for user {} ({} bytes)", file.id, user_id, file.size);
        Ok(file)
    }

    /// The user's files, newest first.
    pub async fn list_cloud(&self, user_id: Uuid) -> Result<Vec<CloudFile>> {
        self.stores.cloud_files.list_by_user(user_id).await
    }

    /// Decrypts one of the user's files.
    pub async fn fetch_cloud(&self, user_id: Uuid, file_id: Uuid) -> Result<(CloudFile, Plaintext)> {
        let file = self.owned_cloud_file(user_id, file_id).await?;
        let ciphertext = self.stores.cloud_blobs.get(file.id).await?;
        let plaintext = envelope::decrypt(&ciphertext, &file.shared_secret)?;

        tracing::info!("🔓 Cloud file {} opened for user {}", file.id, user_id);
        Ok((file, plaintext))
    }

    /// Deletes one of the user's files, bytes first.
    ///
    /// Missing bytes do not block the metadata delete. If the record vanished
    /// in the meantime the call reports `NotFound`.
    pub async fn delete_cloud(&self, user_id: Uuid, file_id: Uuid) -> Result<()> {
        let file = self.owned_cloud_file(user_id, file_id).await?;

        if !self.stores.cloud_blobs.delete(file.id).await? {
            tracing::warn!("⚠️ Cloud file {} had no stored bytes", file.id);
        }

        if !self.stores.cloud_files.delete_by_id(file.id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!("🗑️ Cloud file {} deleted by user {}", file.id, user_id);
        Ok(())
    }

    /// Removes every shared link that expired before `now`, bytes included.
    ///
    /// Each link loses its bytes before its record, so a failed blob delete
    /// keeps the record and the next sweep retries it. Every link is attempted;
    /// the first failure is returned afterwards.
    ///
    /// # Returns
    ///
    /// The number of links removed.
    pub async fn purge_expired_shares(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self.stores.shared_files.find_expired(now).await?;
        let mut purged = 0;
        let mut failure = None;

        for id in expired {
            if let Err(e) = self.stores.share_blobs.delete(id).await {
                tracing::error!("❌ Failed to delete bytes of expired shared link {}: {}", id, e);
                failure.get_or_insert(e);
                continue;
            }

            match self.stores.shared_files.delete_by_id(id).await {
                Ok(true) => purged += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("❌ Failed to delete expired shared link {}: {}", id, e);
                    failure.get_or_insert(e);
                }
            }
        }

        if purged > 0 {
            tracing::info!("🧹 Purged {} expired shared links", purged);
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(purged),
        }
    }

    async fn owned_cloud_file(&self, user_id: Uuid, file_id: Uuid) -> Result<CloudFile> {
        let file = self.stores.cloud_files.find_by_id(file_id).await?;
        self.access.authorize_owner(file, user_id)
    }
}

async fn discard_orphan(blobs: &dyn ContentStore, id: Uuid) {
    tracing::warn!("🧹 Metadata insert failed, discarding stored bytes for {}", id);
    if let Err(e) = blobs.delete(id).await {
        tracing::error!("❌ Failed to discard bytes for {}: {}", id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryContentStore, MemoryStore};
    use crate::services::sessions::SessionManager;
    use async_trait::async_trait;

    struct FailingSharedFiles;

    #[async_trait]
    impl SharedFileStore for FailingSharedFiles {
        async fn insert(&self, _file: &SharedFile) -> Result<()> {
            Err(AppError::Internal("insert refused".to_string()))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<SharedFile>> {
            Ok(None)
        }

        async fn find_expired(&self, _now: DateTime<Utc>) -> Result<Vec<Uuid>> {
            Ok(Vec::new())
        }

        async fn delete_by_id(&self, _id: Uuid) -> Result<bool> {
            Ok(false)
        }
    }

    /// Refuses the first delete, then behaves like `MemoryContentStore`.
    #[derive(Clone)]
    struct FlakyBlobs {
        inner: MemoryContentStore,
        refused: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl ContentStore for FlakyBlobs {
        async fn put(&self, id: Uuid, bytes: &[u8]) -> Result<()> {
            self.inner.put(id, bytes).await
        }

        async fn get(&self, id: Uuid) -> Result<Vec<u8>> {
            self.inner.get(id).await
        }

        async fn delete(&self, id: Uuid) -> Result<bool> {
            if !self.refused.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::Internal("transient".to_string()));
            }
            self.inner.delete(id).await
        }
    }

    fn access() -> AccessController {
        AccessController::new(Arc::new(SessionManager::new(
            Arc::new(MemoryStore::new()),
            Duration::hours(24),
        )))
    }

    fn service() -> (EnvelopeService, MemoryContentStore) {
        let records = MemoryStore::new();
        let share_blobs = MemoryContentStore::new();
        let stores = EnvelopeStores {
            shared_files: Arc::new(records.clone()),
            cloud_files: Arc::new(records),
            share_blobs: Arc::new(share_blobs.clone()),
            cloud_blobs: Arc::new(MemoryContentStore::new()),
        };
        (EnvelopeService::new(stores, access(), 168), share_blobs)
    }

    #[tokio::test]
    async fn shared_link_opens_to_the_original_bytes() {
        let (envelopes, _) = service();
        let created = envelopes.create_shared(b"hello", "greeting.txt", 24).await.unwrap();

        let (file, plaintext) = envelopes.fetch_shared(created.id).await.unwrap();
        assert_eq!(file.filename, "greeting.txt");
        assert_eq!(plaintext.as_ref(), b"hello");
        assert_eq!(file.expires_at - file.created_at, Duration::hours(24));
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_rejected() {
        let (envelopes, blobs) = service();
        for hours in [0, -1, 169] {
            let err = envelopes.create_shared(b"x", "x.bin", hours).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{} hours", hours);
        }
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn failed_metadata_insert_leaves_no_bytes_behind() {
        let blobs = MemoryContentStore::new();
        let records = MemoryStore::new();
        let stores = EnvelopeStores {
            shared_files: Arc::new(FailingSharedFiles),
            cloud_files: Arc::new(records),
            share_blobs: Arc::new(blobs.clone()),
            cloud_blobs: Arc::new(MemoryContentStore::new()),
        };
        let envelopes = EnvelopeService::new(stores, access(), 168);

        assert!(envelopes.create_shared(b"payload", "p.bin", 1).await.is_err());
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn purge_removes_only_lapsed_links() {
        let (envelopes, blobs) = service();
        let t = Utc::now();

        let short = envelopes.create_shared_at(b"a", "a", 1, t).await.unwrap();
        let long = envelopes.create_shared_at(b"b", "b", 48, t).await.unwrap();

        let purged = envelopes.purge_expired_shares(t + Duration::hours(2)).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(blobs.len().await, 1);

        assert!(matches!(
            envelopes.shared_info_at(short.id, t).await,
            Err(AppError::NotFound)
        ));
        assert!(envelopes.shared_info_at(long.id, t).await.is_ok());
    }

    #[tokio::test]
    async fn purge_survives_a_failed_blob_delete() {
        let blobs = FlakyBlobs {
            inner: MemoryContentStore::new(),
            refused: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        };
        let records = MemoryStore::new();
        let stores = EnvelopeStores {
            shared_files: Arc::new(records.clone()),
            cloud_files: Arc::new(records),
            share_blobs: Arc::new(blobs.clone()),
            cloud_blobs: Arc::new(MemoryContentStore::new()),
        };
        let envelopes = EnvelopeService::new(stores, access(), 168);
        let t = Utc::now();

        for name in ["a", "b", "c"] {
            envelopes.create_shared_at(b"x", name, 1, t).await.unwrap();
        }
        let later = t + Duration::hours(2);

        // the other two links still go, the refused one stays for the next sweep
        assert!(envelopes.purge_expired_shares(later).await.is_err());
        assert_eq!(blobs.inner.len().await, 1);

        assert_eq!(envelopes.purge_expired_shares(later).await.unwrap(), 1);
        assert!(blobs.inner.is_empty().await);
        assert_eq!(envelopes.purge_expired_shares(later).await.unwrap(), 0);
    }
}
