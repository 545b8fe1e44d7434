//! # Client Session
//!
//! The unlocked side of a login: holds the user's private key in memory
//! and seals or opens envelopes with it.
//!
//! ```text
//! LoginGrant ──(password)──► Argon2id ──► WrapKey ──► unwrap ──► Session
//!                                                               │
//!                         seal_for(peer) ◄──────────────────────┤
//!                         open_from(envelope, peer) ◄───────────┘
//! ```
//!
//! Dropping the session zeroizes the private key.

use crate::account::LoginGrant;
use crate::crypto::{
    decrypt, decrypt_bound, derive_password_secrets, encrypt_bound, unwrap_private_key, KeyPair,
    MessageContext, PublicKey,
};
use crate::error::{Error, Result};
use crate::storage::{EnvelopeBinding, MessageEnvelope, NewEnvelope};

/// An unlocked user
#[derive(Debug)]
pub struct Session {
    user_id: i64,
    username: String,
    keys: KeyPair,
}

impl Session {
    /// Unlock the private key in a login grant
    ///
    /// A wrong password fails the unwrap tag check with
    /// `AuthenticationFailure`. So does a grant whose private key does not
    /// match its public key.
    pub fn unlock(grant: &LoginGrant, password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".into()));
        }

        let secrets = derive_password_secrets(password.as_bytes(), &grant.salt, &grant.kdf)?;
        let private = unwrap_private_key(&grant.wrapped_private_key, &secrets.wrap_key)?;

        let public = private.public_key();
        if public != grant.public_key {
            tracing::warn!("Unwrapped key does not match public key for user id {}", grant.id);
            return Err(Error::AuthenticationFailure);
        }

        Ok(Self {
            user_id: grant.id,
            username: grant.username.clone(),
            keys: KeyPair { public, private },
        })
    }

    /// This user's id
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// This user's name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// This user's public key
    pub fn public_key(&self) -> PublicKey {
        self.keys.public
    }

    /// Seal `plaintext` for a peer, bound to both user ids
    pub fn seal_for(
        &self,
        peer_id: i64,
        peer_public: &PublicKey,
        plaintext: &[u8],
    ) -> Result<NewEnvelope> {
        let context = MessageContext::new(self.user_id, peer_id);
        let sealed = encrypt_bound(&self.keys.private, peer_public, plaintext, &context)?;

        Ok(NewEnvelope {
            sender_id: self.user_id,
            receiver_id: peer_id,
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            binding: EnvelopeBinding::Participants,
        })
    }

    /// Open an envelope exchanged with the peer owning `peer_public`
    ///
    /// Works for envelopes in either direction. Envelopes this user is not
    /// part of are `InvalidInput`.
    pub fn open_from(&self, envelope: &MessageEnvelope, peer_public: &PublicKey) -> Result<Vec<u8>> {
        if envelope.sender_id != self.user_id && envelope.receiver_id != self.user_id {
            return Err(Error::InvalidInput(format!(
                "envelope {} is not addressed to or from user id {}",
                envelope.sequence, self.user_id
            )));
        }

        match envelope.binding {
            EnvelopeBinding::None => decrypt(
                &self.keys.private,
                peer_public,
                &envelope.ciphertext,
                &envelope.nonce,
            ),
            EnvelopeBinding::Participants => decrypt_bound(
                &self.keys.private,
                peer_public,
                &envelope.ciphertext,
                &envelope.nonce,
                &MessageContext::new(envelope.sender_id, envelope.receiver_id),
            ),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountService, Credentials};
    use crate::crypto::{encrypt, test_params};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn accounts() -> AccountService {
        AccountService::new(Arc::new(MemoryStore::new()), test_params())
    }

    fn login(accounts: &AccountService, username: &str, password: &str) -> Session {
        let creds = Credentials::new(username, password).unwrap();
        let grant = accounts.login(&creds).unwrap();
        Session::unlock(&grant, password).unwrap()
    }

    fn stored(envelope: NewEnvelope, sequence: i64) -> MessageEnvelope {
        MessageEnvelope {
            sequence,
            sender_id: envelope.sender_id,
            receiver_id: envelope.receiver_id,
            ciphertext: envelope.ciphertext,
            nonce: envelope.nonce,
            binding: envelope.binding,
            created_at: 0,
        }
    }

    #[test]
    fn test_unlock_with_wrong_password() {
        let accounts = accounts();
        accounts
            .register(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();
        let grant = accounts
            .login(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();

        assert!(matches!(
            Session::unlock(&grant, "wrong"),
            Err(Error::AuthenticationFailure)
        ));
        assert!(matches!(
            Session::unlock(&grant, ""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_seal_and_open_both_directions() {
        let accounts = accounts();
        let a = accounts
            .register(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();
        let b = accounts
            .register(&Credentials::new("bob", "bobpass").unwrap())
            .unwrap();

        let alice = login(&accounts, "alice", "alicepass");
        let bob = login(&accounts, "bob", "bobpass");

        let envelope = stored(alice.seal_for(b.id, &b.public_key, b"hello bob").unwrap(), 1);
        assert_eq!(envelope.binding, EnvelopeBinding::Participants);

        // Receiver and sender can both read it
        assert_eq!(bob.open_from(&envelope, &a.public_key).unwrap(), b"hello bob");
        assert_eq!(alice.open_from(&envelope, &b.public_key).unwrap(), b"hello bob");
    }

    #[test]
    fn test_relabelled_envelope_rejected() {
        let accounts = accounts();
        let a = accounts
            .register(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();
        let b = accounts
            .register(&Credentials::new("bob", "bobpass").unwrap())
            .unwrap();
        let alice = login(&accounts, "alice", "alicepass");
        let bob = login(&accounts, "bob", "bobpass");

        let mut envelope = stored(alice.seal_for(b.id, &b.public_key, b"hi").unwrap(), 1);
        std::mem::swap(&mut envelope.sender_id, &mut envelope.receiver_id);

        assert!(matches!(
            bob.open_from(&envelope, &a.public_key),
            Err(Error::AuthenticationFailure)
        ));

        // Downgrading the binding does not help either
        let mut downgraded = stored(alice.seal_for(b.id, &b.public_key, b"hi").unwrap(), 2);
        downgraded.binding = EnvelopeBinding::None;
        assert!(matches!(
            bob.open_from(&downgraded, &a.public_key),
            Err(Error::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_unbound_envelopes_still_open() {
        let accounts = accounts();
        let a = accounts
            .register(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();
        let b = accounts
            .register(&Credentials::new("bob", "bobpass").unwrap())
            .unwrap();
        let bob = login(&accounts, "bob", "bobpass");

        // An envelope produced by a client that does not bind participants
        let other_keys = KeyPair::generate().unwrap();
        let sealed = encrypt(&other_keys.private, &b.public_key, b"legacy").unwrap();
        let envelope = MessageEnvelope {
            sequence: 1,
            sender_id: a.id,
            receiver_id: b.id,
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            binding: EnvelopeBinding::None,
            created_at: 0,
        };

        assert_eq!(bob.open_from(&envelope, &other_keys.public).unwrap(), b"legacy");
    }

    #[test]
    fn test_foreign_envelope_rejected() {
        let accounts = accounts();
        accounts
            .register(&Credentials::new("alice", "alicepass").unwrap())
            .unwrap();
        let alice = login(&accounts, "alice", "alicepass");

        let peer = KeyPair::generate().unwrap();
        let envelope = MessageEnvelope {
            sequence: 1,
            sender_id: 7,
            receiver_id: 8,
            ciphertext: vec![0u8; 32],
            nonce: crate::crypto::Nonce::from_bytes([0u8; 12]),
            binding: EnvelopeBinding::None,
            created_at: 0,
        };

        assert!(matches!(
            alice.open_from(&envelope, &peer.public),
            Err(Error::InvalidInput(_))
        ));
    }
}
