//! # Key Management
//!
//! Long-term X25519 key pairs and password-based wrapping of the private
//! half.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY CUSTODY                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyPair (X25519)                                                      │
//! │  ├── PublicKey  (32 bytes)  stored in the clear, given to anyone       │
//! │  └── PrivateKey (32 bytes)  plaintext only in the caller's memory,     │
//! │                             zeroized on drop                           │
//! │                                                                         │
//! │  wrap:   AES-256-GCM(WrapKey, fresh nonce, PrivateKey)                 │
//! │          → WrappedPrivateKey { ciphertext (48 bytes), nonce (12) }     │
//! │                                                                         │
//! │  unwrap: AES-256-GCM-Open(WrapKey, nonce, ciphertext)                  │
//! │          → PrivateKey, or AuthenticationFailure for a wrong password   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unwrap tag check is the only thing that proves the password is right
//! for the private key. It is independent of the login verifier check.

use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::encryption::{self, Nonce, TAG_SIZE};
use super::fill_random;
use super::kdf::WrapKey;
use crate::error::{Error, Result};

/// Size of X25519 public and private keys in bytes
pub const KEY_LEN: usize = 32;

/// Length of a wrapped private key ciphertext
pub const WRAPPED_KEY_LEN: usize = KEY_LEN + TAG_SIZE;

/// Encodings of the low-order points of Curve25519, top bit cleared.
///
/// Multiplying any scalar by one of these yields a point of small order,
/// which would give a predictable shared secret.
const LOW_ORDER_POINTS: [[u8; KEY_LEN]; 7] = [
    // 0 (order 4)
    [0x00; KEY_LEN],
    // 1 (order 1)
    [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ],
    // order 8
    [
        0xe0, 0xeb, 0x7a, 0x7c, 0x3b, 0x41, 0xb8, 0xae, 0x16, 0x56, 0xe3, 0xfa, 0xf1, 0x9f, 0xc4,
        0x6a, 0xda, 0x09, 0x8d, 0xeb, 0x9c, 0x32, 0xb1, 0xfd, 0x86, 0x62, 0x05, 0x16, 0x5f, 0x49,
        0xb8, 0x00,
    ],
    // order 8
    [
        0x5f, 0x9c, 0x95, 0xbc, 0xa3, 0x50, 0x8c, 0x24, 0xb1, 0xd0, 0xb1, 0x55, 0x9c, 0x83, 0xef,
        0x5b, 0x04, 0x44, 0x5c, 0xc4, 0x58, 0x1c, 0x8e, 0x86, 0xd8, 0x22, 0x4e, 0xdd, 0xd0, 0x9f,
        0x11, 0x57,
    ],
    // p - 1
    [
        0xec, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p
    [
        0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p + 1
    [
        0xee, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
];

/// X25519 public key
///
/// Construction validates the encoding: wrong lengths and low-order points
/// are rejected, so every `PublicKey` value is usable for agreement.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    /// Validate and wrap raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Result<Self> {
        let mut masked = bytes;
        masked[KEY_LEN - 1] &= 0x7f;

        if LOW_ORDER_POINTS.iter().any(|p| *p == masked) {
            return Err(Error::InvalidInput("public key is a low-order point".into()));
        }

        Ok(Self(bytes))
    }

    /// Validate and wrap a slice of unknown length
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "public key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Self::from_bytes(arr)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> X25519PublicKey {
        X25519PublicKey::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// X25519 private key
///
/// `x25519_dalek::StaticSecret` zeroizes itself on drop.
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Create from raw scalar bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Copy out the scalar bytes (for wrapping)
    ///
    /// Never log or transmit these bytes unwrapped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEY_LEN]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(X25519PublicKey::from(&self.0).to_bytes())
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Long-term key pair
#[derive(Debug)]
pub struct KeyPair {
    /// Public half, safe to share
    pub public: PublicKey,
    /// Private half, zeroized on drop
    pub private: PrivateKey,
}

impl KeyPair {
    /// Generate a new random key pair from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let mut scalar = Zeroizing::new([0u8; KEY_LEN]);
        fill_random(&mut scalar[..])?;

        let private = PrivateKey::from_bytes(*scalar);
        let public = private.public_key();

        Ok(Self { public, private })
    }
}

/// Private key sealed under the password-derived wrap key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedPrivateKey {
    /// AES-GCM ciphertext with tag (48 bytes)
    pub ciphertext: Vec<u8>,
    /// Nonce used for this wrap; fresh for every wrap
    pub nonce: Nonce,
}

impl WrappedPrivateKey {
    /// Build from parts loaded from storage or the wire
    ///
    /// The ciphertext must be exactly one sealed scalar plus tag.
    pub fn try_new(ciphertext: Vec<u8>, nonce: Nonce) -> Result<Self> {
        if ciphertext.len() != WRAPPED_KEY_LEN {
            return Err(Error::InvalidInput(format!(
                "wrapped key must be {} bytes, got {}",
                WRAPPED_KEY_LEN,
                ciphertext.len()
            )));
        }
        Ok(Self { ciphertext, nonce })
    }
}

/// Seal the private key under the wrap key
pub fn wrap_private_key(private: &PrivateKey, kek: &WrapKey) -> Result<WrappedPrivateKey> {
    let scalar = private.to_bytes();
    let (nonce, ciphertext) = encryption::seal(kek.as_key(), &scalar[..], &[])?;

    WrappedPrivateKey::try_new(ciphertext, nonce)
}

/// Recover the private key
///
/// A wrong wrap key (wrong password) surfaces as `AuthenticationFailure`.
pub fn unwrap_private_key(wrapped: &WrappedPrivateKey, kek: &WrapKey) -> Result<PrivateKey> {
    let plaintext = Zeroizing::new(encryption::open(
        kek.as_key(),
        &wrapped.nonce,
        &wrapped.ciphertext,
        &[],
    )?);

    let scalar: Zeroizing<[u8; KEY_LEN]> = Zeroizing::new(
        plaintext
            .as_slice()
            .try_into()
            .map_err(|_| Error::AuthenticationFailure)?,
    );

    Ok(PrivateKey::from_bytes(*scalar))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{derive_password_secrets, tests::test_params, Salt};

    fn wrap_key(password: &[u8], salt: &Salt) -> WrapKey {
        derive_password_secrets(password, salt, &test_params())
            .unwrap()
            .wrap_key
    }

    #[test]
    fn test_keypair_generation() {
        let kp1 = KeyPair::generate().unwrap();
        let kp2 = KeyPair::generate().unwrap();

        assert_ne!(kp1.public, kp2.public);
        assert_eq!(kp1.private.public_key(), kp1.public);
    }

    #[test]
    fn test_wrap_unwrap_round_trip() {
        let salt = Salt::generate().unwrap();
        let kek = wrap_key(b"alicepass", &salt);
        let kp = KeyPair::generate().unwrap();

        let wrapped = wrap_private_key(&kp.private, &kek).unwrap();
        assert_eq!(wrapped.ciphertext.len(), WRAPPED_KEY_LEN);

        let recovered = unwrap_private_key(&wrapped, &kek).unwrap();
        assert_eq!(*recovered.to_bytes(), *kp.private.to_bytes());
    }

    #[test]
    fn test_unwrap_with_wrong_password_fails() {
        let salt = Salt::generate().unwrap();
        let kp = KeyPair::generate().unwrap();
        let wrapped = wrap_private_key(&kp.private, &wrap_key(b"alicepass", &salt)).unwrap();

        let result = unwrap_private_key(&wrapped, &wrap_key(b"wrongpass", &salt));
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_each_wrap_uses_fresh_nonce() {
        let salt = Salt::generate().unwrap();
        let kek = wrap_key(b"pw", &salt);
        let kp = KeyPair::generate().unwrap();

        let w1 = wrap_private_key(&kp.private, &kek).unwrap();
        let w2 = wrap_private_key(&kp.private, &kek).unwrap();
        assert_ne!(w1.nonce, w2.nonce);
        assert_ne!(w1.ciphertext, w2.ciphertext);
    }

    #[test]
    fn test_wrapped_key_length_checked() {
        let nonce = Nonce::from_bytes([1u8; 12]);

        assert!(WrappedPrivateKey::try_new(vec![0u8; WRAPPED_KEY_LEN], nonce).is_ok());
        for len in [0, KEY_LEN, WRAPPED_KEY_LEN - 1, WRAPPED_KEY_LEN + 1] {
            assert!(matches!(
                WrappedPrivateKey::try_new(vec![0u8; len], nonce),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_public_key_length_validated() {
        assert!(PublicKey::try_from_slice(&[9u8; 31]).is_err());
        assert!(PublicKey::try_from_slice(&[9u8; 33]).is_err());
        assert!(PublicKey::try_from_slice(&[9u8; 32]).is_ok());
    }

    #[test]
    fn test_low_order_points_rejected() {
        for point in LOW_ORDER_POINTS.iter() {
            assert!(PublicKey::from_bytes(*point).is_err());

            let mut high = *point;
            high[KEY_LEN - 1] |= 0x80;
            assert!(PublicKey::from_bytes(high).is_err());
        }
    }

    #[test]
    fn test_private_key_debug_redacted() {
        let kp = KeyPair::generate().unwrap();
        let shown = format!("{:?}", kp);
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains(&hex::encode(*kp.private.to_bytes())));
    }
}
