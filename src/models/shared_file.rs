use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crypto::envelope::SharedSecret;

/// An anonymous, time-limited shared link.
///
/// The ciphertext lives in the share content store under `id`.
#[derive(Clone)]
pub struct SharedFile {
    /// Share id; also the content store key.
    pub id: Uuid,
    /// The uploader's original filename.
    pub filename: String,
    /// KEM encapsulation produced when the envelope was sealed.
    pub kem_ciphertext: Vec<u8>,
    /// Secret that re-derives the AEAD key.
    pub shared_secret: SharedSecret,
    /// ML-DSA-44 signature over the stored ciphertext bytes.
    pub signature: Vec<u8>,
    /// Public key verifying `signature`.
    pub signer_public_key: Vec<u8>,
    /// When the link stops working.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SharedFile {
    /// Whether the link has lapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl std::fmt::Debug for SharedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFile")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
