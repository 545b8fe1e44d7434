//! # Session Key Agreement
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 SHARED SECRET → SESSION KEY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  alice_private × bob_public  ==  bob_private × alice_public            │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  X25519 shared secret (32 bytes, must be contributory)                 │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  HKDF-SHA256(ikm = shared, salt = none, info = "sealchat-session-v1")  │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  SessionKey (32 bytes, AES-256-GCM)                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both sides reach the same key with no handshake. There is no forward
//! secrecy: the key is a pure function of the two long-term keys.

use zeroize::Zeroizing;

use super::encryption::EncryptionKey;
use super::kdf::{domain, expand};
use super::keys::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Symmetric key shared by one pair of users
///
/// Derived on demand and never persisted. Zeroized on drop.
#[derive(Debug)]
pub struct SessionKey(EncryptionKey);

impl SessionKey {
    pub(crate) fn as_key(&self) -> &EncryptionKey {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

/// Agree on the session key for (my private key, peer public key)
///
/// Fails closed with `InvalidInput` if the exchange is not contributory,
/// which catches any low-order point that slipped past `PublicKey`
/// validation.
pub fn agree(my_private: &PrivateKey, peer_public: &PublicKey) -> Result<SessionKey> {
    let shared = my_private.secret().diffie_hellman(&peer_public.to_dalek());

    if !shared.was_contributory() {
        return Err(Error::InvalidInput(
            "key exchange produced a non-contributory secret".into(),
        ));
    }

    let okm = Zeroizing::new(expand(shared.as_bytes(), domain::SESSION)?);
    Ok(SessionKey(EncryptionKey::from_bytes(*okm)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_session_key_symmetry() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let ab = agree(&alice.private, &bob.public).unwrap();
        let ba = agree(&bob.private, &alice.public).unwrap();

        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_different_peers_different_keys() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let carol = KeyPair::generate().unwrap();

        let ab = agree(&alice.private, &bob.public).unwrap();
        let ac = agree(&alice.private, &carol.public).unwrap();

        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn test_session_key_is_not_raw_shared_secret() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let raw = alice
            .private
            .secret()
            .diffie_hellman(&bob.public.to_dalek())
            .to_bytes();
        let key = agree(&alice.private, &bob.public).unwrap();

        assert_ne!(&raw, key.as_bytes());
    }

    #[test]
    fn test_known_vector_is_stable() {
        // RFC 7748 §6.1 key pairs
        let alice_priv: [u8; 32] = [
            0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d, 0x3c, 0x16, 0xc1, 0x72, 0x51, 0xb2,
            0x66, 0x45, 0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a, 0xb1, 0x77, 0xfb, 0xa5,
            0x1d, 0xb9, 0x2c, 0x2a,
        ];
        let bob_priv: [u8; 32] = [
            0x5d, 0xab, 0x08, 0x7e, 0x62, 0x4a, 0x8a, 0x4b, 0x79, 0xe1, 0x7f, 0x8b, 0x83, 0x80,
            0x0e, 0xe6, 0x6f, 0x3b, 0xb1, 0x29, 0x26, 0x18, 0xb6, 0xfd, 0x1c, 0x2f, 0x8b, 0x27,
            0xff, 0x88, 0xe0, 0xeb,
        ];
        let alice = PrivateKey::from_bytes(alice_priv);
        let bob = PrivateKey::from_bytes(bob_priv);

        let shared = alice.secret().diffie_hellman(&bob.public_key().to_dalek());
        assert_eq!(
            hex::encode(shared.as_bytes()),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );

        let k1 = agree(&alice, &bob.public_key()).unwrap();
        let k2 = agree(&bob, &alice.public_key()).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }
}
