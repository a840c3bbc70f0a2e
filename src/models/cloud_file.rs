use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crypto::envelope::SharedSecret;

/// A file in a user's persistent cloud storage.
///
/// The ciphertext lives in the cloud content store under `id`.
#[derive(Clone)]
pub struct CloudFile {
    /// File id; also the content store key.
    pub id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The uploader's original filename.
    pub filename: String,
    /// Plaintext size in bytes.
    pub size: i64,
    /// KEM encapsulation produced when the envelope was sealed.
    pub kem_ciphertext: Vec<u8>,
    /// Secret that re-derives the AEAD key.
    pub shared_secret: SharedSecret,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for CloudFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFile")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
