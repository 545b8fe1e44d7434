//! # Account Module
//!
//! Registration, login and key directory, on top of an injected [`Store`].
//!
//! ## Registration Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        REGISTRATION FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Validate credentials (username trimmed, both non-empty)       │
//! │  Step 2: Salt ← 16 random bytes                                        │
//! │  Step 3: Password key ← Argon2id(password, salt)                       │
//! │          → split into WrapKey + AuthVerifier                           │
//! │  Step 4: KeyPair ← X25519 generate                                     │
//! │  Step 5: WrappedPrivateKey ← AES-256-GCM(WrapKey, private key)         │
//! │  Step 6: Store.create_user (atomic on username)                        │
//! │          {salt, verifier, public key, wrapped key, nonce}              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Login Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           LOGIN FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Look up the user by name                                      │
//! │  Step 2: Re-derive the password key with the stored salt               │
//! │  Step 3: Constant-time compare the derived verifier with the stored    │
//! │  Step 4: Return the grant {salt, wrapped key, public key, kdf params}  │
//! │          The caller unwraps the private key itself (see `Session`).    │
//! │                                                                         │
//! │  Unknown user and wrong password are the same AuthenticationFailure.  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The service never holds a plaintext private key beyond the scope of
//! `register`.

use std::sync::Arc;
use zeroize::Zeroizing;

use crate::crypto::{
    self, derive_password_secrets, generate_salt, wrap_private_key, KdfParams, KeyPair, PublicKey,
    Salt, WrappedPrivateKey, TAG_SIZE,
};
use crate::error::{Error, Result};
use crate::storage::{MessageEnvelope, NewEnvelope, NewUser, Store, UserRecord};

/// Username and password that passed boundary validation
///
/// The only way to build one is [`Credentials::new`], so every
/// `AccountService` call receives already-checked input.
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Validate raw credentials
    ///
    /// The username is trimmed. Both fields must be non-empty.
    pub fn new(username: &str, password: impl Into<String>) -> Result<Self> {
        let username = username.trim();
        let password = Zeroizing::new(password.into());

        if username.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("username and password required".into()));
        }

        Ok(Self {
            username: username.to_string(),
            password,
        })
    }

    /// The trimmed username
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &[u8] {
        self.password.as_bytes()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    /// Store-assigned id
    pub id: i64,
    /// Username
    pub username: String,
    /// X25519 public key
    pub public_key: PublicKey,
}

impl From<&UserRecord> for RegisteredUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            public_key: record.public_key,
        }
    }
}

/// What a successful login hands back to the client
///
/// Enough to unwrap the private key locally, nothing that can do so
/// without the password.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// User id
    pub id: i64,
    /// Username
    pub username: String,
    /// X25519 public key
    pub public_key: PublicKey,
    /// Argon2id salt
    pub salt: Salt,
    /// Private key sealed under the wrap key
    pub wrapped_private_key: WrappedPrivateKey,
    /// Parameters the wrap key was derived with
    pub kdf: KdfParams,
}

/// Account operations over an injected store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    kdf: KdfParams,
}

impl AccountService {
    /// Create a new account service
    pub fn new(store: Arc<dyn Store>, kdf: KdfParams) -> Self {
        Self { store, kdf }
    }

    /// The KDF parameters this service derives with
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    /// Register a new user
    ///
    /// CPU-heavy (one Argon2id derivation). Duplicate usernames fail with
    /// `UserExists`, also under concurrent registration.
    pub fn register(&self, credentials: &Credentials) -> Result<RegisteredUser> {
        let salt = generate_salt()?;
        let secrets = derive_password_secrets(credentials.password(), &salt, &self.kdf)?;

        let pair = KeyPair::generate()?;
        let wrapped = wrap_private_key(&pair.private, &secrets.wrap_key)?;

        let record = self
            .store
            .create_user(NewUser {
                username: credentials.username().to_string(),
                salt,
                verifier: secrets.auth_verifier.clone(),
                public_key: pair.public,
                wrapped_private_key: wrapped,
            })
            .map_err(|e| {
                if matches!(e, Error::UserExists) {
                    tracing::info!("Registration refused, '{}' is taken", credentials.username());
                }
                e
            })?;

        tracing::info!("Registered user '{}' (id {})", record.username, record.id);
        Ok(RegisteredUser::from(&record))
    }

    /// Check a password and hand out the wrapped key material
    ///
    /// Unknown usernames still pay for one key derivation, so both failure
    /// paths cost the same and return the same error.
    pub fn login(&self, credentials: &Credentials) -> Result<LoginGrant> {
        let record = self.store.user_by_name(credentials.username())?;

        let record = match record {
            Some(record) => record,
            None => {
                let dummy = Salt::try_from_slice(&[0u8; crypto::SALT_SIZE])?;
                let _ = derive_password_secrets(credentials.password(), &dummy, &self.kdf)?;
                tracing::warn!("Login failed");
                return Err(Error::AuthenticationFailure);
            }
        };

        let secrets = derive_password_secrets(credentials.password(), &record.salt, &self.kdf)?;

        if !crypto::verify(secrets.auth_verifier.as_bytes(), record.verifier.as_bytes()) {
            tracing::warn!("Login failed");
            return Err(Error::AuthenticationFailure);
        }

        tracing::info!("User id {} logged in", record.id);

        Ok(LoginGrant {
            id: record.id,
            username: record.username,
            public_key: record.public_key,
            salt: record.salt,
            wrapped_private_key: record.wrapped_private_key,
            kdf: self.kdf,
        })
    }

    /// Look up a user's public key by username
    pub fn public_key(&self, username: &str) -> Result<RegisteredUser> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username required".into()));
        }

        tracing::debug!("Public key lookup for '{}'", username);
        self.store
            .user_by_name(username)?
            .map(|r| RegisteredUser::from(&r))
            .ok_or(Error::UserNotFound)
    }

    /// Look up a user's public key by id
    pub fn public_key_by_id(&self, id: i64) -> Result<RegisteredUser> {
        require_id(id, "user id")?;

        tracing::debug!("Public key lookup for id {}", id);
        self.store
            .user_by_id(id)?
            .map(|r| RegisteredUser::from(&r))
            .ok_or(Error::UserNotFound)
    }

    /// Store an envelope and return its sequence number
    pub fn post_envelope(&self, envelope: NewEnvelope) -> Result<i64> {
        require_id(envelope.sender_id, "from_user_id")?;
        require_id(envelope.receiver_id, "to_user_id")?;

        if envelope.ciphertext.len() < TAG_SIZE {
            return Err(Error::InvalidInput(format!(
                "ciphertext must be at least {} bytes",
                TAG_SIZE
            )));
        }

        for id in [envelope.sender_id, envelope.receiver_id] {
            if self.store.user_by_id(id)?.is_none() {
                return Err(Error::UserNotFound);
            }
        }

        let stored = self.store.insert_envelope(envelope)?;
        tracing::debug!(
            "Stored envelope {} ({} -> {})",
            stored.sequence,
            stored.sender_id,
            stored.receiver_id
        );

        Ok(stored.sequence)
    }

    /// Envelopes between two users, oldest first
    pub fn conversation(
        &self,
        user_a: i64,
        user_b: i64,
        after: Option<i64>,
    ) -> Result<Vec<MessageEnvelope>> {
        require_id(user_a, "user_a")?;
        require_id(user_b, "user_b")?;

        self.store.envelopes_between(user_a, user_b, after)
    }
}

fn require_id(id: i64, field: &str) -> Result<()> {
    if id <= 0 {
        return Err(Error::InvalidInput(format!("bad {}", field)));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
