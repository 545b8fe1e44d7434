//! # Key Derivation Functions
//!
//! Two derivation paths live here: the password path (Argon2id, slow on
//! purpose) and the HKDF expansions used for domain separation.
//!
//! ## Password Key Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → WRAP KEY + VERIFIER                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password, salt (16 random bytes, per user)                            │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Argon2id v0x13 (KdfParams: m = 64 MiB, t = 1, p = 4)           │   │
//! │  │  → 32-byte password key (never stored)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │              ┌─────────────────┴─────────────────┐                     │
//! │              ▼                                   ▼                     │
//! │  ┌───────────────────────────┐   ┌───────────────────────────┐       │
//! │  │  HKDF-SHA256(             │   │  HKDF-SHA256(             │       │
//! │  │    info = "sealchat-      │   │    info = "sealchat-      │       │
//! │  │      password-wrap-v1")   │   │      password-auth-v1")   │       │
//! │  │                           │   │                           │       │
//! │  │  → WrapKey (KEK)          │   │  → AuthVerifier           │       │
//! │  │    client memory only     │   │    stored for login       │       │
//! │  └───────────────────────────┘   └───────────────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reading the verifier out of the credential store does not yield the
//! wrap key: the two are independent HKDF outputs of a value that is never
//! persisted.
//!
//! ## Parameter Stability
//!
//! [`KdfParams`] is process-wide. Records are only unlockable with the
//! parameters they were created with, and there is no re-wrapping path, so
//! the parameters must not change after deployment.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::encryption::EncryptionKey;
use super::fill_random;
use crate::error::{Error, Result};

/// Domain separation strings for HKDF
pub mod domain {
    /// Password key → key-encryption key for the private key
    pub const PASSWORD_WRAP: &[u8] = b"sealchat-password-wrap-v1";

    /// Password key → login verifier
    pub const PASSWORD_AUTH: &[u8] = b"sealchat-password-auth-v1";

    /// X25519 shared secret → message session key
    pub const SESSION: &[u8] = b"sealchat-session-v1";
}

/// Size of the per-user password salt (128 bits)
pub const SALT_SIZE: usize = 16;

/// Size of every derived key (256 bits)
pub const DERIVED_KEY_SIZE: usize = 32;

/// Argon2id cost parameters, shared by every wrap and unwrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost_kib: u32,
    /// Iterations
    pub t_cost: u32,
    /// Lanes
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: 64 * 1024,
            t_cost: 1,
            p_cost: 4,
        }
    }
}

impl KdfParams {
    fn to_argon2(self) -> Result<Params> {
        Params::new(
            self.m_cost_kib,
            self.t_cost,
            self.p_cost,
            Some(DERIVED_KEY_SIZE),
        )
        .map_err(|e| Error::InvalidInput(format!("invalid Argon2 parameters: {}", e)))
    }
}

/// Per-user random salt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Draw a fresh salt from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Decode a salt of unknown length
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!("salt must be {} bytes, got {}", SALT_SIZE, bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Draw a fresh per-user salt
pub fn generate_salt() -> Result<Salt> {
    Salt::generate()
}

/// Raw Argon2id output. Only ever used to derive [`PasswordSecrets`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PasswordKey([u8; DERIVED_KEY_SIZE]);

impl PasswordKey {
    /// Expand into the wrap key and the login verifier
    pub fn split(&self) -> Result<PasswordSecrets> {
        let wrap = Zeroizing::new(expand(&self.0, domain::PASSWORD_WRAP)?);
        let auth = Zeroizing::new(expand(&self.0, domain::PASSWORD_AUTH)?);

        Ok(PasswordSecrets {
            wrap_key: WrapKey(EncryptionKey::from_bytes(*wrap)),
            auth_verifier: AuthVerifier(*auth),
        })
    }
}

impl std::fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordKey([REDACTED])")
    }
}

/// The two independent values derived from one password
pub struct PasswordSecrets {
    /// Key-encryption key for the private key. Never persisted.
    pub wrap_key: WrapKey,
    /// Login verifier. Safe to persist.
    pub auth_verifier: AuthVerifier,
}

/// Key-encryption key derived from the password
#[derive(Debug)]
pub struct WrapKey(EncryptionKey);

impl WrapKey {
    pub(crate) fn as_key(&self) -> &EncryptionKey {
        &self.0
    }
}

/// Login verifier derived from the password
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AuthVerifier([u8; DERIVED_KEY_SIZE]);

impl AuthVerifier {
    /// Rebuild a verifier read back from storage
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode a stored verifier of unknown length
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; DERIVED_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "verifier must be {} bytes, got {}",
                DERIVED_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes (for persisting and comparing)
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for AuthVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthVerifier([REDACTED])")
    }
}

/// Derive the password key with Argon2id
///
/// Deterministic in `(password, salt, params)`. Empty passwords are
/// rejected here as well as at the account layer.
pub fn derive_password_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<PasswordKey> {
    if password.is_empty() {
        return Err(Error::InvalidInput("password must not be empty".into()));
    }

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut output = [0u8; DERIVED_KEY_SIZE];
    argon2
        .hash_password_into(password, salt.as_bytes(), &mut output)
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2id failed: {}", e)))?;

    let key = PasswordKey(output);
    output.zeroize();
    Ok(key)
}

/// Derive both password secrets in one step
pub fn derive_password_secrets(
    password: &[u8],
    salt: &Salt,
    params: &KdfParams,
) -> Result<PasswordSecrets> {
    derive_password_key(password, salt, params)?.split()
}

/// HKDF-SHA256 expand with no salt and a fixed label
pub(crate) fn expand(ikm: &[u8], info: &[u8]) -> Result<[u8; DERIVED_KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; DERIVED_KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

    Ok(okm)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Light parameters so the test suite stays fast
    pub(crate) fn test_params() -> KdfParams {
        KdfParams {
            m_cost_kib: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn salt(byte: u8) -> Salt {
        Salt::try_from_slice(&[byte; SALT_SIZE]).unwrap()
    }

    #[test]
    fn test_derive_deterministic() {
        let k1 = derive_password_key(b"alicepass", &salt(1), &test_params()).unwrap();
        let k2 = derive_password_key(b"alicepass", &salt(1), &test_params()).unwrap();
        assert_eq!(k1.0, k2.0);
    }

    #[test]
    fn test_different_salts_different_keys() {
        let k1 = derive_password_key(b"alicepass", &salt(1), &test_params()).unwrap();
        let k2 = derive_password_key(b"alicepass", &salt(2), &test_params()).unwrap();
        assert_ne!(k1.0, k2.0);
    }

    #[test]
    fn test_different_passwords_different_keys() {
        let k1 = derive_password_key(b"alicepass", &salt(1), &test_params()).unwrap();
        let k2 = derive_password_key(b"bobpass", &salt(1), &test_params()).unwrap();
        assert_ne!(k1.0, k2.0);
    }

    #[test]
    fn test_empty_password_rejected() {
        let result = derive_password_key(b"", &salt(1), &test_params());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let params = KdfParams {
            t_cost: 0,
            ..test_params()
        };
        let result = derive_password_key(b"pw", &salt(1), &params);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_wrap_key_and_verifier_are_independent() {
        let secrets = derive_password_secrets(b"alicepass", &salt(3), &test_params()).unwrap();
        assert_ne!(secrets.wrap_key.as_key().as_bytes(), secrets.auth_verifier.as_bytes());

        let raw = derive_password_key(b"alicepass", &salt(3), &test_params()).unwrap();
        assert_ne!(&raw.0, secrets.auth_verifier.as_bytes());
        assert_ne!(&raw.0, secrets.wrap_key.as_key().as_bytes());
    }

    #[test]
    fn test_split_matches_labelled_expansion() {
        let raw = derive_password_key(b"alicepass", &salt(4), &test_params()).unwrap();
        let secrets = raw.split().unwrap();

        let wrap = expand(&raw.0, domain::PASSWORD_WRAP).unwrap();
        let auth = expand(&raw.0, domain::PASSWORD_AUTH).unwrap();
        assert_eq!(secrets.wrap_key.as_key().as_bytes(), &wrap);
        assert_eq!(secrets.auth_verifier.as_bytes(), &auth);
    }

    #[test]
    fn test_salt_length_checked() {
        assert!(Salt::try_from_slice(&[0u8; 15]).is_err());
        assert!(Salt::try_from_slice(&[0u8; 16]).is_ok());
    }

    #[test]
    fn test_generated_salts_differ() {
        assert_ne!(Salt::generate().unwrap(), Salt::generate().unwrap());
    }

    #[test]
    fn test_expand_labels_separate() {
        let ikm = [42u8; 32];
        let a = expand(&ikm, domain::PASSWORD_WRAP).unwrap();
        let b = expand(&ikm, domain::PASSWORD_AUTH).unwrap();
        let c = expand(&ikm, domain::SESSION).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_default_params_match_deployment() {
        let params = KdfParams::default();
        assert_eq!(params.m_cost_kib, 65536);
        assert_eq!(params.t_cost, 1);
        assert_eq!(params.p_cost, 4);
    }
}
