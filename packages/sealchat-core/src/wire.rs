//! # Wire Types
//!
//! JSON shapes exchanged between the relay and its clients.
//!
//! Every binary field crosses the wire as standard base64 with padding and
//! a `_base64` suffix on its name. Requests are decoded into tagged core
//! types exactly once, through their `into_*` methods; handlers never look
//! at raw strings after that.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::account::{Credentials, LoginGrant, RegisteredUser};
use crate::crypto::{KdfParams, Nonce, PublicKey, Salt, WrappedPrivateKey};
use crate::error::{Error, Result};
use crate::storage::{EnvelopeBinding, MessageEnvelope, NewEnvelope};

/// Encode bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a required base64 field
pub fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{} required", field)));
    }
    STANDARD
        .decode(value)
        .map_err(|e| Error::InvalidInput(format!("bad {}: {}", field, e)))
}

fn decode_public_key(value: &str) -> Result<PublicKey> {
    PublicKey::try_from_slice(&decode_base64("public_key_base64", value)?)
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// `POST /register` body
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Username
    #[serde(default)]
    pub username: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl RegisterRequest {
    /// Validate into credentials
    pub fn into_credentials(self) -> Result<Credentials> {
        Credentials::new(&self.username, self.password)
    }
}

/// `POST /login` body
pub type LoginRequest = RegisterRequest;

/// A user and their public key
///
/// Returned by `POST /register` and `GET /public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// User id
    pub id: i64,
    /// Username
    pub username: String,
    /// X25519 public key
    pub public_key_base64: String,
}

impl From<&RegisteredUser> for UserResponse {
    fn from(user: &RegisteredUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            public_key_base64: encode_base64(user.public_key.as_bytes()),
        }
    }
}

impl UserResponse {
    /// Decode the client-side view
    pub fn into_user(self) -> Result<RegisteredUser> {
        Ok(RegisteredUser {
            id: self.id,
            public_key: decode_public_key(&self.public_key_base64)?,
            username: self.username,
        })
    }
}

/// `POST /login` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// User id
    pub id: i64,
    /// Username
    pub username: String,
    /// X25519 public key
    pub public_key_base64: String,
    /// Argon2id salt
    pub password_salt_base64: String,
    /// Wrapped private key
    pub enc_private_key_base64: String,
    /// Nonce of the wrapped private key
    pub enc_private_key_nonce_base64: String,
    /// Argon2id parameters to re-derive the wrap key with
    #[serde(default)]
    pub kdf: KdfParams,
}

impl From<&LoginGrant> for LoginResponse {
    fn from(grant: &LoginGrant) -> Self {
        Self {
            id: grant.id,
            username: grant.username.clone(),
            public_key_base64: encode_base64(grant.public_key.as_bytes()),
            password_salt_base64: encode_base64(grant.salt.as_bytes()),
            enc_private_key_base64: encode_base64(&grant.wrapped_private_key.ciphertext),
            enc_private_key_nonce_base64: encode_base64(
                grant.wrapped_private_key.nonce.as_bytes(),
            ),
            kdf: grant.kdf,
        }
    }
}

impl LoginResponse {
    /// Decode the grant on the client
    pub fn into_grant(self) -> Result<LoginGrant> {
        let salt = Salt::try_from_slice(&decode_base64(
            "password_salt_base64",
            &self.password_salt_base64,
        )?)?;
        let nonce = Nonce::try_from_slice(&decode_base64(
            "enc_private_key_nonce_base64",
            &self.enc_private_key_nonce_base64,
        )?)?;
        let ciphertext = decode_base64("enc_private_key_base64", &self.enc_private_key_base64)?;

        Ok(LoginGrant {
            id: self.id,
            public_key: decode_public_key(&self.public_key_base64)?,
            username: self.username,
            salt,
            wrapped_private_key: WrappedPrivateKey::try_new(ciphertext, nonce)?,
            kdf: self.kdf,
        })
    }
}

/// `GET /public_key` query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeyQuery {
    /// Look up by name
    pub username: Option<String>,
    /// Look up by id
    pub id: Option<i64>,
}

/// A validated public key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// Exact username
    ByName(String),
    /// Store-assigned id
    ById(i64),
}

impl PublicKeyQuery {
    /// Exactly one of `username` and `id` must be given
    pub fn into_lookup(self) -> Result<UserLookup> {
        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        match (username, self.id) {
            (Some(name), None) => Ok(UserLookup::ByName(name)),
            (None, Some(id)) if id > 0 => Ok(UserLookup::ById(id)),
            (None, Some(_)) => Err(Error::InvalidInput("bad id".into())),
            (None, None) => Err(Error::InvalidInput("username required".into())),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "give either username or id, not both".into(),
            )),
        }
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

/// `POST /send_message` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Sender id
    #[serde(default)]
    pub from_user_id: i64,
    /// Receiver id
    #[serde(default)]
    pub to_user_id: i64,
    /// AES-GCM ciphertext with tag
    #[serde(default)]
    pub ciphertext_base64: String,
    /// AES-GCM nonce
    #[serde(default)]
    pub nonce_base64: String,
    /// Absent means `none`
    #[serde(default)]
    pub binding: EnvelopeBinding,
}

impl From<&NewEnvelope> for SendMessageRequest {
    fn from(envelope: &NewEnvelope) -> Self {
        Self {
            from_user_id: envelope.sender_id,
            to_user_id: envelope.receiver_id,
            ciphertext_base64: encode_base64(&envelope.ciphertext),
            nonce_base64: encode_base64(envelope.nonce.as_bytes()),
            binding: envelope.binding,
        }
    }
}

impl SendMessageRequest {
    /// Validate and decode into an envelope
    pub fn into_envelope(self) -> Result<NewEnvelope> {
        if self.from_user_id <= 0 || self.to_user_id <= 0 {
            return Err(Error::InvalidInput("missing fields".into()));
        }

        let ciphertext = decode_base64("ciphertext_base64", &self.ciphertext_base64)?;
        let nonce = Nonce::try_from_slice(&decode_base64("nonce_base64", &self.nonce_base64)?)?;

        Ok(NewEnvelope {
            sender_id: self.from_user_id,
            receiver_id: self.to_user_id,
            ciphertext,
            nonce,
            binding: self.binding,
        })
    }
}

/// `POST /send_message` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Sequence number assigned by the store
    pub id: i64,
}

/// `GET /messages` query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    /// One participant
    pub user_a: Option<i64>,
    /// The other participant
    pub user_b: Option<i64>,
    /// Only envelopes with a larger sequence number
    pub after: Option<i64>,
}

/// A validated conversation query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationQuery {
    /// One participant
    pub user_a: i64,
    /// The other participant
    pub user_b: i64,
    /// Only envelopes with a larger sequence number
    pub after: Option<i64>,
}

impl MessagesQuery {
    /// Both users are required and must be positive
    pub fn into_query(self) -> Result<ConversationQuery> {
        let user_a = self
            .user_a
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::InvalidInput("bad user_a".into()))?;
        let user_b = self
            .user_b
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::InvalidInput("bad user_b".into()))?;

        Ok(ConversationQuery {
            user_a,
            user_b,
            after: self.after,
        })
    }
}

/// One envelope in a `GET /messages` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    /// Sequence number
    pub id: i64,
    /// Sender id
    pub from_user_id: i64,
    /// Receiver id
    pub to_user_id: i64,
    /// AES-GCM ciphertext with tag
    pub ciphertext_base64: String,
    /// AES-GCM nonce
    pub nonce_base64: String,
    /// Associated data used when sealing
    #[serde(default)]
    pub binding: EnvelopeBinding,
    /// Unix seconds
    #[serde(default)]
    pub created_at: i64,
}

impl From<&MessageEnvelope> for MessageDto {
    fn from(envelope: &MessageEnvelope) -> Self {
        Self {
            id: envelope.sequence,
            from_user_id: envelope.sender_id,
            to_user_id: envelope.receiver_id,
            ciphertext_base64: encode_base64(&envelope.ciphertext),
            nonce_base64: encode_base64(envelope.nonce.as_bytes()),
            binding: envelope.binding,
            created_at: envelope.created_at,
        }
    }
}

impl MessageDto {
    /// Decode on the client
    pub fn into_envelope(self) -> Result<MessageEnvelope> {
        Ok(MessageEnvelope {
            sequence: self.id,
            sender_id: self.from_user_id,
            receiver_id: self.to_user_id,
            ciphertext: decode_base64("ciphertext_base64", &self.ciphertext_base64)?,
            nonce: Nonce::try_from_slice(&decode_base64("nonce_base64", &self.nonce_base64)?)?,
            binding: self.binding,
            created_at: self.created_at,
        })
    }
}

// ============================================================================
// MISC
// ============================================================================

/// Error body for every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always `false`
    pub ok: bool,
    /// Human-readable message
    pub error: String,
    /// Stable numeric code from [`Error::code`]
    #[serde(default)]
    pub code: i32,
}

impl ErrorBody {
    /// Build the body for a core error
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            ok: false,
            error: message.into(),
            code,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service is up
    pub ok: bool,
    /// Relay version
    pub version: String,
}

// ============================================================================
// TESTS
// ============================================================================
