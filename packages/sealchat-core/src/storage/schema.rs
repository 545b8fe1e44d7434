//! # Database Schema
//!
//! SQL schema definitions for the SealChat database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────┐      │
//! │  │         users            │        │        envelopes         │      │
//! │  ├──────────────────────────┤        ├──────────────────────────┤      │
//! │  │ id                       │◄───────│ sender_id                │      │
//! │  │ username (UNIQUE)        │◄───────│ receiver_id              │      │
//! │  │ password_salt            │        │ seq                      │      │
//! │  │ auth_verifier            │        │ ciphertext               │      │
//! │  │ public_key               │        │ nonce                    │      │
//! │  │ enc_private_key          │        │ binding                  │      │
//! │  │ enc_private_key_nonce    │        │ created_at               │      │
//! │  │ created_at               │        └──────────────────────────┘      │
//! │  └──────────────────────────┘                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Binary columns hold lowercase hex.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Users table
-- One row per registered user; never updated after insert
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    -- Case-sensitive, unique
    username TEXT NOT NULL UNIQUE,
    -- Argon2id salt (hex, 32 chars for 16 bytes)
    password_salt TEXT NOT NULL,
    -- HKDF "auth" output of the password key (hex, 64 chars)
    auth_verifier TEXT NOT NULL,
    -- X25519 public key (hex, 64 chars)
    public_key TEXT NOT NULL,
    -- AES-GCM sealed private key (hex, 96 chars for 48 bytes)
    enc_private_key TEXT NOT NULL,
    -- Nonce used to seal the private key (hex, 24 chars)
    enc_private_key_nonce TEXT NOT NULL,
    -- Unix seconds
    created_at INTEGER NOT NULL
);

-- Envelopes table
-- Ciphertexts only; seq is the only ordering guarantee
CREATE TABLE IF NOT EXISTS envelopes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id INTEGER NOT NULL,
    receiver_id INTEGER NOT NULL,
    -- AES-GCM ciphertext with tag (hex)
    ciphertext TEXT NOT NULL,
    -- AES-GCM nonce (hex, 24 chars)
    nonce TEXT NOT NULL,
    -- 'none' or 'participants'
    binding TEXT NOT NULL DEFAULT 'none',
    created_at INTEGER NOT NULL,
    FOREIGN KEY (sender_id) REFERENCES users(id),
    FOREIGN KEY (receiver_id) REFERENCES users(id),
    CONSTRAINT binding_kind CHECK (binding IN ('none', 'participants'))
);
CREATE INDEX IF NOT EXISTS idx_envelopes_pair ON envelopes(sender_id, receiver_id, seq);
"#;
