//! # Message Codec
//!
//! Encrypts a message payload for one peer and decrypts what a peer sent.
//!
//! ```text
//! encrypt(A.priv, B.pub, m)  = seal(agree(A.priv, B.pub), m)
//! decrypt(B.priv, A.pub, c)  = open(agree(B.priv, A.pub), c)
//! ```
//!
//! Either side derives the same session key with no handshake, so
//! `decrypt(B.priv, A.pub, encrypt(A.priv, B.pub, m)) == m` for every pair.
//!
//! ## Participant Binding
//!
//! The `_bound` variants authenticate the sender and receiver ids as AEAD
//! associated data:
//!
//! ```text
//! aad = "sealchat-envelope-v1" || sender_id (i64 BE) || receiver_id (i64 BE)
//! ```
//!
//! A server that relabels a bound envelope (swapping sender and receiver,
//! or moving it into another conversation between the same keys) makes
//! decryption fail with `AuthenticationFailure`.

use super::agreement::agree;
use super::encryption::{self, Nonce};
use super::keys::{PrivateKey, PublicKey};
use crate::error::Result;

/// AAD prefix for participant-bound envelopes
const ENVELOPE_AAD_PREFIX: &[u8] = b"sealchat-envelope-v1";

/// Ciphertext and nonce as produced by [`encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    /// AES-256-GCM output with the tag appended
    pub ciphertext: Vec<u8>,
    /// Fresh nonce for this message
    pub nonce: Nonce,
}

/// The participants an envelope is addressed between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContext {
    /// User id of the sender
    pub sender_id: i64,
    /// User id of the receiver
    pub receiver_id: i64,
}

impl MessageContext {
    /// Create a new context
    pub fn new(sender_id: i64, receiver_id: i64) -> Self {
        Self {
            sender_id,
            receiver_id,
        }
    }

    /// Associated data bytes for this context
    pub fn aad(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(ENVELOPE_AAD_PREFIX.len() + 16);
        aad.extend_from_slice(ENVELOPE_AAD_PREFIX);
        aad.extend_from_slice(&self.sender_id.to_be_bytes());
        aad.extend_from_slice(&self.receiver_id.to_be_bytes());
        aad
    }
}

/// Encrypt `plaintext` from the sender to the receiver
pub fn encrypt(
    sender_private: &PrivateKey,
    receiver_public: &PublicKey,
    plaintext: &[u8],
) -> Result<SealedMessage> {
    seal_with(sender_private, receiver_public, plaintext, &[])
}

/// Decrypt a message the sender addressed to us
pub fn decrypt(
    receiver_private: &PrivateKey,
    sender_public: &PublicKey,
    ciphertext: &[u8],
    nonce: &Nonce,
) -> Result<Vec<u8>> {
    open_with(receiver_private, sender_public, ciphertext, nonce, &[])
}

/// Encrypt with the participants bound as associated data
pub fn encrypt_bound(
    sender_private: &PrivateKey,
    receiver_public: &PublicKey,
    plaintext: &[u8],
    context: &MessageContext,
) -> Result<SealedMessage> {
    seal_with(sender_private, receiver_public, plaintext, &context.aad())
}

/// Decrypt a participant-bound message
///
/// `context` must carry the same ids the sender used.
pub fn decrypt_bound(
    receiver_private: &PrivateKey,
    sender_public: &PublicKey,
    ciphertext: &[u8],
    nonce: &Nonce,
    context: &MessageContext,
) -> Result<Vec<u8>> {
    open_with(
        receiver_private,
        sender_public,
        ciphertext,
        nonce,
        &context.aad(),
    )
}

fn seal_with(
    my_private: &PrivateKey,
    peer_public: &PublicKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedMessage> {
    let session = agree(my_private, peer_public)?;
    let (nonce, ciphertext) = encryption::seal(session.as_key(), plaintext, aad)?;
    Ok(SealedMessage { ciphertext, nonce })
}

fn open_with(
    my_private: &PrivateKey,
    peer_public: &PublicKey,
    ciphertext: &[u8],
    nonce: &Nonce,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let session = agree(my_private, peer_public)?;
    encryption::open(session.as_key(), nonce, ciphertext, aad)
}

// ============================================================================
// TESTS
// ============================================================================
