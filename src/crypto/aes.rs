use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use aes_gcm::aead::rand_core::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// The size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    ///
    /// # Arguments
    ///
    /// * `key` - A 32-byte array representing the AES-256 key.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Builds a key from the leading `KEY_SIZE` bytes of `material`.
    ///
    /// Returns `None` when `material` is too short.
    pub fn from_prefix(material: &[u8]) -> Option<Self> {
        let prefix = material.get(..KEY_SIZE)?;
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(prefix);
        Some(Self(key))
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generates a new random AES-GCM nonce.
///
/// # Returns
///
/// A 12-byte array representing the nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts `plaintext` under `key` with a fresh nonce.
///
/// # Returns
///
/// `nonce ‖ ciphertext ‖ tag`.
pub fn seal(key: &SecureKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| AppError::CryptoFault(format!("AES-GCM encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypts the output of [`seal`].
///
/// Truncated input and tag mismatches both surface as
/// `AppError::AuthenticationFailure`.
pub fn open(key: &SecureKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(AppError::AuthenticationFailure);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| AppError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SecureKey {
        SecureKey::new([byte; KEY_SIZE])
    }

    #[test]
    fn sealed_output_is_nonce_prefixed() {
        let sealed = seal(&key(7), b"hello").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 5 + TAG_SIZE);
        assert_eq!(open(&key(7), &sealed).unwrap(), b"hello");
    }

    #[test]
    fn nonces_are_not_reused() {
        let a = seal(&key(1), b"same").unwrap();
        let b = seal(&key(1), b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }

    #[test]
    fn short_input_is_an_authentication_failure() {
        let err = open(&key(1), &[0u8; NONCE_SIZE + TAG_SIZE - 1]).unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure));
    }

    #[test]
    fn key_prefix_requires_enough_material() {
        assert!(SecureKey::from_prefix(&[0u8; 31]).is_none());
        let k = SecureKey::from_prefix(&[9u8; 40]).unwrap();
        assert_eq!(k.as_bytes(), &[9u8; KEY_SIZE]);
    }
}
