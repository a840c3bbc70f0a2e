//! Hybrid post-quantum envelope encryption.
//!
//! Every envelope is sealed under a fresh, one-time Kyber-512 keypair:
//!
//! ```text
//! keypair ──► encapsulate(pk) ──► (kem_ciphertext, shared_secret)
//!                                             │
//!                          key = shared_secret[..32]
//!                                             │
//! plaintext ─────────────────► AES-256-GCM(key, random nonce)
//!                                             │
//!                       ciphertext = nonce(12) ‖ AEAD output
//! ```
//!
//! The KEM secret key is zeroized immediately after encapsulation and never
//! leaves this function. Decryption therefore needs the shared secret itself,
//! which callers persist next to the metadata record. Anyone able to read that
//! record can decrypt; the KEM adds no confidentiality beyond AEAD at rest.

use pqc_kyber::{encapsulate, keypair, KYBER_CIPHERTEXTBYTES, KYBER_SSBYTES};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::aes::{self, SecureKey};
use crate::error::{AppError, Result};

/// Name of the KEM parameter set.
pub const KEM_ALGORITHM: &str = "Kyber512";
/// Name of the AEAD cipher.
pub const AEAD_ALGORITHM: &str = "AES-256-GCM";
/// Size of a KEM encapsulation in bytes.
pub const KEM_CIPHERTEXT_SIZE: usize = KYBER_CIPHERTEXTBYTES;
/// Size of the encapsulated shared secret in bytes.
pub const SHARED_SECRET_SIZE: usize = KYBER_SSBYTES;

/// Key material needed to re-derive an envelope's symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Wraps persisted secret bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw secret bytes, for persistence.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn symmetric_key(&self) -> Option<SecureKey> {
        SecureKey::from_prefix(&self.0)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// The output of [`encrypt`].
#[derive(Debug)]
pub struct SealedEnvelope {
    /// `nonce ‖ AEAD(plaintext)`; goes to the content store.
    pub ciphertext: Vec<u8>,
    /// The KEM encapsulation bound to the discarded one-time keypair.
    pub kem_ciphertext: Vec<u8>,
    /// The encapsulated secret, persisted with the metadata record.
    pub shared_secret: SharedSecret,
}

/// Decrypted file contents.
///
/// The buffer is wiped when the value is dropped, so holding a `Plaintext`
/// for the duration of a response is the only materialisation that exists.
pub struct Plaintext(Zeroizing<Vec<u8>>);

impl Plaintext {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Plaintext {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plaintext({} bytes)", self.0.len())
    }
}

/// Seals `plaintext` in a fresh envelope.
///
/// # Arguments
///
/// * `plaintext` - The bytes to protect. May be empty.
///
/// # Returns
///
/// The ciphertext, KEM encapsulation and shared secret.
pub fn encrypt(plaintext: &[u8]) -> Result<SealedEnvelope> {
    let mut rng = OsRng;

    let mut keys = keypair(&mut rng)
        .map_err(|e| AppError::CryptoFault(format!("{} keypair generation failed: {:?}", KEM_ALGORITHM, e)))?;

    let encapsulated = encapsulate(&keys.public, &mut rng);
    keys.secret.zeroize();

    let (kem_ciphertext, mut secret) = encapsulated
        .map_err(|e| AppError::CryptoFault(format!("{} encapsulation failed: {:?}", KEM_ALGORITHM, e)))?;

    let shared_secret = SharedSecret(secret.to_vec());
    secret.zeroize();

    let key = shared_secret
        .symmetric_key()
        .ok_or_else(|| AppError::CryptoFault("KEM shared secret shorter than an AES-256 key".to_string()))?;

    let ciphertext = aes::seal(&key, plaintext)?;

    tracing::debug!(
        "🔐 Sealed {} bytes ({} + {})",
        plaintext.len(),
        KEM_ALGORITHM,
        AEAD_ALGORITHM
    );

    Ok(SealedEnvelope {
        ciphertext,
        kem_ciphertext: kem_ciphertext.to_vec(),
        shared_secret,
    })
}

/// Opens an envelope sealed by [`encrypt`].
///
/// # Arguments
///
/// * `ciphertext` - `nonce ‖ AEAD output` as produced by `encrypt`.
/// * `shared_secret` - The secret persisted alongside the envelope.
///
/// # Returns
///
/// The plaintext, or `AppError::AuthenticationFailure` when the ciphertext was
/// tampered with, truncated, or paired with the wrong secret.
pub fn decrypt(ciphertext: &[u8], shared_secret: &SharedSecret) -> Result<Plaintext> {
    let key = shared_secret
        .symmetric_key()
        .ok_or(AppError::AuthenticationFailure)?;

    let plaintext = aes::open(&key, ciphertext)?;
    Ok(Plaintext(Zeroizing::new(plaintext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_payloads_of_various_sizes() {
        for size in [0usize, 1, 15, 16, 17, 500, 64 * 1024] {
            let payload: Vec<u8> = (0..size).map(|i| (i * 31 % 251) as u8).collect();
            let sealed = encrypt(&payload).unwrap();
            let opened = decrypt(&sealed.ciphertext, &sealed.shared_secret).unwrap();
            assert_eq!(opened.as_ref(), payload.as_slice(), "size {}", size);
        }
    }

    #[test]
    fn envelope_shapes_follow_the_parameter_set() {
        let sealed = encrypt(b"shape").unwrap();
        assert_eq!(sealed.kem_ciphertext.len(), KEM_CIPHERTEXT_SIZE);
        assert_eq!(sealed.shared_secret.as_bytes().len(), SHARED_SECRET_SIZE);
        assert_eq!(sealed.ciphertext.len(), aes::NONCE_SIZE + 5 + aes::TAG_SIZE);
    }

    #[test]
    fn every_envelope_uses_fresh_key_material() {
        let a = encrypt(b"same input").unwrap();
        let b = encrypt(b"same input").unwrap();
        assert_ne!(a.kem_ciphertext, b.kem_ciphertext);
        assert_ne!(a.shared_secret.as_bytes(), b.shared_secret.as_bytes());
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn flipping_any_bit_is_detected() {
        let payload = b"integrity matters for every single byte".to_vec();
        let sealed = encrypt(&payload).unwrap();

        for index in 0..sealed.ciphertext.len() {
            for bit in [0u8, 3, 7] {
                let mut tampered = sealed.ciphertext.clone();
                tampered[index] ^= 1 << bit;
                let err = decrypt(&tampered, &sealed.shared_secret).unwrap_err();
                assert!(
                    matches!(err, AppError::AuthenticationFailure),
                    "byte {} bit {} produced {:?}",
                    index,
                    bit,
                    err
                );
            }
        }
    }

    #[test]
    fn wrong_secret_is_an_authentication_failure() {
        let sealed = encrypt(b"secret payload").unwrap();
        let other = encrypt(b"other payload").unwrap();
        let err = decrypt(&sealed.ciphertext, &other.shared_secret).unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure));
    }

    #[test]
    fn truncated_inputs_are_authentication_failures() {
        let sealed = encrypt(b"truncate me").unwrap();

        let err = decrypt(&sealed.ciphertext[..sealed.ciphertext.len() - 1], &sealed.shared_secret).unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure));

        let err = decrypt(&sealed.ciphertext[..4], &sealed.shared_secret).unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure));

        let short = SharedSecret::from_bytes(sealed.shared_secret.as_bytes()[..16].to_vec());
        let err = decrypt(&sealed.ciphertext, &short).unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailure));
    }

    #[test]
    fn debug_output_never_contains_secret_bytes() {
        let secret = SharedSecret::from_bytes(vec![0xAB; 32]);
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("redacted"));
    }
}
