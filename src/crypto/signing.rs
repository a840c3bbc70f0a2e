//! Detached ML-DSA-44 signatures over stored ciphertext.
//!
//! ⚠️ Each call to [`sign`] mints a one-time keypair and hands back the public
//! half with the signature. Nothing binds that key to this service, so a valid
//! signature proves the bytes were not corrupted since signing. It does not
//! prove who signed them; anyone can produce a fresh keypair and a matching
//! signature. AEAD authentication remains the real tamper barrier.

use fips204::ml_dsa_44;
use fips204::traits::{SerDes, Signer, Verifier};

use crate::error::{AppError, Result};

/// Name of the signature parameter set.
pub const SIGNATURE_ALGORITHM: &str = "ML-DSA-44";
/// Size of an encoded public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = ml_dsa_44::PK_LEN;
/// Size of an encoded signature in bytes.
pub const SIGNATURE_SIZE: usize = ml_dsa_44::SIG_LEN;

/// Empty FIPS 204 context string.
const SIGNING_CONTEXT: &[u8] = b"";

/// A signature together with the public key that verifies it.
#[derive(Clone, Debug)]
pub struct DetachedSignature {
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Signs `data` with a freshly generated, immediately discarded keypair.
pub fn sign(data: &[u8]) -> Result<DetachedSignature> {
    let (public_key, private_key) = ml_dsa_44::try_keygen()
        .map_err(|e| AppError::CryptoFault(format!("{} keygen failed: {}", SIGNATURE_ALGORITHM, e)))?;

    let signature = private_key
        .try_sign(data, SIGNING_CONTEXT)
        .map_err(|e| AppError::CryptoFault(format!("{} signing failed: {}", SIGNATURE_ALGORITHM, e)))?;

    Ok(DetachedSignature {
        signature: signature.to_vec(),
        public_key: public_key.into_bytes().to_vec(),
    })
}

/// Verifies a detached signature.
///
/// Never fails: wrong lengths, undecodable keys and bad signatures all yield
/// `false`.
pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(signature) = <[u8; SIGNATURE_SIZE]>::try_from(signature) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; PUBLIC_KEY_SIZE]>::try_from(public_key) else {
        return false;
    };
    let Ok(public_key) = ml_dsa_44::PublicKey::try_from_bytes(key_bytes) else {
        return false;
    };

    public_key.verify(data, &signature, SIGNING_CONTEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_over_the_signed_bytes() {
        let data = b"ciphertext bytes";
        let signed = sign(data).unwrap();
        assert_eq!(signed.signature.len(), SIGNATURE_SIZE);
        assert_eq!(signed.public_key.len(), PUBLIC_KEY_SIZE);
        assert!(verify(data, &signed.signature, &signed.public_key));
    }

    #[test]
    fn different_data_does_not_verify() {
        let signed = sign(b"original").unwrap();
        assert!(!verify(b"originaL", &signed.signature, &signed.public_key));
    }

    #[test]
    fn different_public_key_does_not_verify() {
        let signed = sign(b"payload").unwrap();
        let other = sign(b"payload").unwrap();
        assert!(!verify(b"payload", &signed.signature, &other.public_key));
    }

    #[test]
    fn malformed_inputs_return_false() {
        let signed = sign(b"payload").unwrap();

        assert!(!verify(b"payload", &signed.signature[..10], &signed.public_key));
        assert!(!verify(b"payload", &signed.signature, &signed.public_key[1..]));
        assert!(!verify(b"payload", &[], &[]));

        let mut flipped = signed.signature.clone();
        flipped[0] ^= 0x01;
        assert!(!verify(b"payload", &flipped, &signed.public_key));
    }
}
