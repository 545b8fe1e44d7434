//! # SealChat Core
//!
//! Key custody and end-to-end message cryptography for a relayed chat
//! service. The relay stores only ciphertext and password-wrapped keys;
//! plaintext and private keys exist only in client memory.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SEALCHAT CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Account   │  │   Session   │  │    Wire     │  │   Storage    │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Register  │  │ - Unlock    │  │ - JSON DTOs │  │ - Store trait│   │
//! │  │ - Login     │  │ - Seal      │  │ - base64    │  │ - Memory     │   │
//! │  │ - Directory │  │ - Open      │  │ - Validate  │  │ - SQLite     │   │
//! │  └──────┬──────┘  └──────┬──────┘  └─────────────┘  └──────▲───────┘   │
//! │         │                │                                  │           │
//! │         └────────────────┼──────────────────────────────────┘           │
//! │                          ▼                                              │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                           Crypto                                 │  │
//! │  │                                                                  │  │
//! │  │  kdf (Argon2id, HKDF)   encryption (AES-256-GCM)   keys (X25519) │  │
//! │  │  agreement (ECDH→HKDF)  codec (encrypt/decrypt)    verifier      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives
//! - [`account`] - Registration, login and public key directory
//! - [`session`] - Client-side unlocked key and envelope sealing
//! - [`storage`] - Credential and envelope stores
//! - [`wire`] - JSON request and response types
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Key Custody (Argon2id + AES-256-GCM)                         │
//! │  ─────────────────────────────────────────────                          │
//! │  Each private key is stored sealed under a key derived from the        │
//! │  user's password. The login verifier is a separate derivation, so a    │
//! │  leaked credential table does not unwrap anything.                     │
//! │                                                                         │
//! │  Layer 2: Message Encryption (X25519 + HKDF + AES-256-GCM)             │
//! │  ──────────────────────────────────────────────────────                 │
//! │  Every message is encrypted under a key both parties derive from       │
//! │  their own private key and the peer's public key.                      │
//! │                                                                         │
//! │  Layer 3: Participant Binding (AEAD associated data)                   │
//! │  ───────────────────────────────────────────────────                    │
//! │  Sender and receiver ids are authenticated with the ciphertext, so     │
//! │  the relay cannot relabel an envelope.                                 │
//! │                                                                         │
//! │  Not covered: forward secrecy, metadata (who talks to whom, when,     │
//! │  how much), multi-device key sync.                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sealchat_core::{AccountService, Credentials, KdfParams, MemoryStore, Session};
//!
//! # fn main() -> sealchat_core::Result<()> {
//! let accounts = AccountService::new(Arc::new(MemoryStore::new()), KdfParams::default());
//!
//! accounts.register(&Credentials::new("alice", "alicepass")?)?;
//! let bob = accounts.register(&Credentials::new("bob", "bobpass")?)?;
//!
//! let grant = accounts.login(&Credentials::new("alice", "alicepass")?)?;
//! let alice = Session::unlock(&grant, "alicepass")?;
//!
//! let envelope = alice.seal_for(bob.id, &bob.public_key, b"hello bob")?;
//! accounts.post_envelope(envelope)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod account;
pub mod crypto;
pub mod error;
pub mod session;
pub mod storage;
pub mod time;
pub mod wire;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use account::{AccountService, Credentials, LoginGrant, RegisteredUser};
pub use crypto::{KdfParams, KeyPair, PublicKey};
pub use error::{Error, Result};
pub use session::Session;
pub use storage::{Database, EnvelopeBinding, MemoryStore, MessageEnvelope, NewEnvelope, Store};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
