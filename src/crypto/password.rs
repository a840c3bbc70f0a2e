use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Random salt size in bytes, before hex encoding.
const SALT_SIZE: usize = 16;
/// Derived key size in bytes.
const DERIVED_SIZE: usize = 32;
/// Separator between salt and digest in the stored form.
const SEPARATOR: char = '$';

fn derive(password: &str, salt: &str) -> Zeroizing<[u8; DERIVED_SIZE]> {
    let mut derived = Zeroizing::new([0u8; DERIVED_SIZE]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut derived[..]);
    derived
}

/// Hashes a password with PBKDF2-HMAC-SHA256.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// `salt$hex(derived)` where the salt is 16 random bytes, hex encoded. The
/// salt's ASCII form is what goes into the KDF.
pub fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let derived = derive(password, &salt);
    tracing::debug!("Password hashed with PBKDF2-SHA256 ({} iterations)", PBKDF2_ITERATIONS);

    format!("{}{}{}", salt, SEPARATOR, hex::encode(&derived[..]))
}

/// Verifies a password against a stored hash.
///
/// # Arguments
///
/// * `password` - The password to verify.
/// * `stored` - A hash produced by [`hash_password`].
///
/// # Returns
///
/// `true` if the password matches. Malformed stored hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest_hex)) = stored.split_once(SEPARATOR) else {
        return false;
    };

    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };

    if salt.is_empty() || expected.len() != DERIVED_SIZE {
        return false;
    }

    let derived = derive(password, salt);
    derived[..].ct_eq(expected.as_slice()).into()
}

/// Burns the same amount of work as a real verification.
///
/// Used when the account does not exist so that unknown usernames and wrong
/// passwords take equally long.
pub fn dummy_verify(password: &str) {
    let _ = derive(password, "00000000000000000000000000000000");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_is_salt_dollar_hex() {
        let stored = hash_password("secret1");
        let (salt, digest) = stored.split_once('$').unwrap();
        assert_eq!(salt.len(), SALT_SIZE * 2);
        assert_eq!(digest.len(), DERIVED_SIZE * 2);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn correct_password_verifies_and_wrong_one_does_not() {
        let stored = hash_password("secret1");
        assert!(verify_password("secret1", &stored));
        assert!(!verify_password("secret2", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn identical_passwords_get_distinct_salts() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "no-separator"));
        assert!(!verify_password("pw", "salt$not-hex"));
        assert!(!verify_password("pw", "salt$abcd"));
        assert!(!verify_password("pw", &format!("${}", "00".repeat(DERIVED_SIZE))));
    }
}
