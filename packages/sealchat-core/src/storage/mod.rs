//! # Storage Module
//!
//! Persistence for user credentials and message envelopes.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Store (trait)                                                  │   │
//! │  │  ─────────────                                                   │   │
//! │  │  create_user       atomic create-if-absent on username          │   │
//! │  │  user_by_name / user_by_id                                      │   │
//! │  │  insert_envelope   assigns the next sequence number             │   │
//! │  │  envelopes_between ordered by sequence, symmetric in (a, b)     │   │
//! │  └───────────────┬──────────────────────────────┬──────────────────┘   │
//! │                  │                              │                       │
//! │                  ▼                              ▼                       │
//! │  ┌───────────────────────────┐   ┌───────────────────────────────┐    │
//! │  │  MemoryStore              │   │  Database (SQLite)            │    │
//! │  │  tests, ephemeral relays  │   │  UNIQUE(username)             │    │
//! │  │  RwLock-guarded maps      │   │  AUTOINCREMENT sequence       │    │
//! │  └───────────────────────────┘   └───────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is Stored
//!
//! Only public or already-sealed material: salt, login verifier, public
//! key, the wrapped private key and its nonce, and message ciphertexts.
//! Neither the password, the password key, the wrap key nor any plaintext
//! private key ever reaches a store. Records are never updated in place.
//!
//! Stores are explicit handles passed to whoever needs them. There is no
//! process-wide instance.

mod database;
mod memory;
mod schema;

pub use database::Database;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::crypto::{AuthVerifier, Nonce, PublicKey, Salt, WrappedPrivateKey};
use crate::error::{Error, Result};

/// How an envelope's ciphertext was sealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeBinding {
    /// No associated data
    #[default]
    None,
    /// Sender and receiver ids bound as associated data
    Participants,
}

impl EnvelopeBinding {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeBinding::None => "none",
            EnvelopeBinding::Participants => "participants",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(EnvelopeBinding::None),
            "participants" => Ok(EnvelopeBinding::Participants),
            other => Err(Error::InvalidInput(format!("unknown binding '{}'", other))),
        }
    }
}

/// A user to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique, case-sensitive username
    pub username: String,
    /// Per-user Argon2id salt
    pub salt: Salt,
    /// Login verifier (not the wrap key)
    pub verifier: AuthVerifier,
    /// X25519 public key
    pub public_key: PublicKey,
    /// Private key sealed under the wrap key
    pub wrapped_private_key: WrappedPrivateKey,
}

/// A stored user
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Store-assigned id, starting at 1
    pub id: i64,
    /// Username
    pub username: String,
    /// Argon2id salt
    pub salt: Salt,
    /// Login verifier
    pub verifier: AuthVerifier,
    /// X25519 public key
    pub public_key: PublicKey,
    /// Wrapped private key
    pub wrapped_private_key: WrappedPrivateKey,
    /// Created timestamp (unix seconds)
    pub created_at: i64,
}

/// An envelope to be stored
#[derive(Debug, Clone)]
pub struct NewEnvelope {
    /// Sending user id
    pub sender_id: i64,
    /// Receiving user id
    pub receiver_id: i64,
    /// AES-GCM ciphertext with tag
    pub ciphertext: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: Nonce,
    /// Associated data used when sealing
    pub binding: EnvelopeBinding,
}

/// A stored envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// Store-assigned, strictly increasing
    pub sequence: i64,
    /// Sending user id
    pub sender_id: i64,
    /// Receiving user id
    pub receiver_id: i64,
    /// AES-GCM ciphertext with tag
    pub ciphertext: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: Nonce,
    /// Associated data used when sealing
    pub binding: EnvelopeBinding,
    /// Created timestamp (unix seconds)
    pub created_at: i64,
}

/// Credential and envelope storage
///
/// Implementations must make `create_user` atomic with respect to the
/// username: of any number of concurrent calls with one name, exactly one
/// succeeds and the rest return `UserExists`.
pub trait Store: Send + Sync {
    /// Create a user unless the username is taken
    fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    /// Look up a user by exact username
    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Look up a user by id
    fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    /// Append an envelope, assigning the next sequence number
    fn insert_envelope(&self, envelope: NewEnvelope) -> Result<MessageEnvelope>;

    /// Envelopes exchanged between `a` and `b` in either direction,
    /// ordered by sequence, optionally only those after a sequence number
    fn envelopes_between(&self, a: i64, b: i64, after: Option<i64>)
        -> Result<Vec<MessageEnvelope>>;
}

// ============================================================================
// SHARED STORE TESTS
// ============================================================================
