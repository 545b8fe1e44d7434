//! # Database
//!
//! SQLite-backed [`Store`].
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │ AccountService  │                                                   │
//! │  └────────┬────────┘                                                   │
//! │           │ &dyn Store                                                  │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  - Credential rows (insert, lookup)               │
//! │  │   (this file)   │  - Envelope log (append, list)                    │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    rusqlite     │  One connection behind a mutex                    │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  - In-memory for tests                            │
//! │  │                 │  - File for the relay                             │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::Arc;

use super::schema;
use super::{EnvelopeBinding, MessageEnvelope, NewEnvelope, NewUser, Store, UserRecord};
use crate::crypto::{AuthVerifier, Nonce, PublicKey, Salt, WrappedPrivateKey};
use crate::error::{Error, Result};

/// The main database handle
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Columns of a `users` row before decoding
struct RawUser {
    id: i64,
    username: String,
    salt: String,
    verifier: String,
    public_key: String,
    enc_private_key: String,
    enc_private_key_nonce: String,
    created_at: i64,
}

/// Columns of an `envelopes` row before decoding
struct RawEnvelope {
    seq: i64,
    sender_id: i64,
    receiver_id: i64,
    ciphertext: String,
    nonce: String,
    binding: String,
    created_at: i64,
}

const USER_COLUMNS: &str = "id, username, password_salt, auth_verifier, public_key, \
                            enc_private_key, enc_private_key_nonce, created_at";

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let has_version_table: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::DatabaseError(format!("Failed to read schema: {}", e)))?;

        let version: Option<i32> = if has_version_table {
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| Error::DatabaseError(format!("Failed to read schema version: {}", e)))?
            .flatten()
        } else {
            None
        };

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| {
                    Error::DatabaseError(format!("Failed to set schema version: {}", e))
                })?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v > schema::SCHEMA_VERSION => {
                return Err(Error::StorageCorrupted(format!(
                    "database schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    fn query_user(&self, clause: &str, param: &dyn rusqlite::ToSql) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();

        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
        let result = conn.query_row(&sql, [param], |row| {
            Ok(RawUser {
                id: row.get(0)?,
                username: row.get(1)?,
                salt: row.get(2)?,
                verifier: row.get(3)?,
                public_key: row.get(4)?,
                enc_private_key: row.get(5)?,
                enc_private_key_nonce: row.get(6)?,
                created_at: row.get(7)?,
            })
        });

        match result {
            Ok(raw) => Ok(Some(raw.decode()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get user: {}", e))),
        }
    }
}

impl Store for Database {
    fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let conn = self.conn.lock();
        let now = crate::time::now_timestamp();

        let inserted = conn.execute(
            "INSERT INTO users (username, password_salt, auth_verifier, public_key,
                                enc_private_key, enc_private_key_nonce, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                user.username,
                hex::encode(user.salt.as_bytes()),
                hex::encode(user.verifier.as_bytes()),
                hex::encode(user.public_key.as_bytes()),
                hex::encode(&user.wrapped_private_key.ciphertext),
                hex::encode(user.wrapped_private_key.nonce.as_bytes()),
                now,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(Error::UserExists);
            }
            Err(e) => return Err(Error::DatabaseError(format!("Failed to add user: {}", e))),
        }

        Ok(UserRecord {
            id: conn.last_insert_rowid(),
            username: user.username,
            salt: user.salt,
            verifier: user.verifier,
            public_key: user.public_key,
            wrapped_private_key: user.wrapped_private_key,
            created_at: now,
        })
    }

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>> {
        self.query_user("username = ?", &username)
    }

    fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        self.query_user("id = ?", &id)
    }

    fn insert_envelope(&self, envelope: NewEnvelope) -> Result<MessageEnvelope> {
        let conn = self.conn.lock();
        let now = crate::time::now_timestamp();

        conn.execute(
            "INSERT INTO envelopes (sender_id, receiver_id, ciphertext, nonce, binding, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                envelope.sender_id,
                envelope.receiver_id,
                hex::encode(&envelope.ciphertext),
                hex::encode(envelope.nonce.as_bytes()),
                envelope.binding.as_str(),
                now,
            ],
        )
        .map_err(|e| Error::DatabaseError(format!("Failed to store envelope: {}", e)))?;

        Ok(MessageEnvelope {
            sequence: conn.last_insert_rowid(),
            sender_id: envelope.sender_id,
            receiver_id: envelope.receiver_id,
            ciphertext: envelope.ciphertext,
            nonce: envelope.nonce,
            binding: envelope.binding,
            created_at: now,
        })
    }

    fn envelopes_between(
        &self,
        a: i64,
        b: i64,
        after: Option<i64>,
    ) -> Result<Vec<MessageEnvelope>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT seq, sender_id, receiver_id, ciphertext, nonce, binding, created_at
                 FROM envelopes
                 WHERE ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
                   AND seq > ?3
                 ORDER BY seq ASC",
            )
            .map_err(|e| Error::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![a, b, after.unwrap_or(0)], |row| {
                Ok(RawEnvelope {
                    seq: row.get(0)?,
                    sender_id: row.get(1)?,
                    receiver_id: row.get(2)?,
                    ciphertext: row.get(3)?,
                    nonce: row.get(4)?,
                    binding: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(|e| Error::DatabaseError(format!("Failed to query envelopes: {}", e)))?;

        let mut envelopes = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::DatabaseError(format!("Failed to read row: {}", e)))?;
            envelopes.push(raw.decode()?);
        }

        Ok(envelopes)
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn unhex(column: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| Error::StorageCorrupted(format!("{}: {}", column, e)))
}

/// Anything malformed in a stored row means the store is corrupted,
/// not that the caller sent bad input.
fn corrupted(column: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |e| Error::StorageCorrupted(format!("{}: {}", column, e))
}

impl RawUser {
    fn decode(self) -> Result<UserRecord> {
        let salt = Salt::try_from_slice(&unhex("password_salt", &self.salt)?)
            .map_err(corrupted("password_salt"))?;
        let verifier = AuthVerifier::try_from_slice(&unhex("auth_verifier", &self.verifier)?)
            .map_err(corrupted("auth_verifier"))?;
        let public_key = PublicKey::try_from_slice(&unhex("public_key", &self.public_key)?)
            .map_err(corrupted("public_key"))?;
        let nonce = Nonce::try_from_slice(&unhex(
            "enc_private_key_nonce",
            &self.enc_private_key_nonce,
        )?)
        .map_err(corrupted("enc_private_key_nonce"))?;

        Ok(UserRecord {
            id: self.id,
            username: self.username,
            salt,
            verifier,
            public_key,
            wrapped_private_key: WrappedPrivateKey::try_new(
                unhex("enc_private_key", &self.enc_private_key)?,
                nonce,
            )
            .map_err(corrupted("enc_private_key"))?,
            created_at: self.created_at,
        })
    }
}

impl RawEnvelope {
    fn decode(self) -> Result<MessageEnvelope> {
        Ok(MessageEnvelope {
            sequence: self.seq,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            ciphertext: unhex("ciphertext", &self.ciphertext)?,
            nonce: Nonce::try_from_slice(&unhex("nonce", &self.nonce)?)
                .map_err(corrupted("nonce"))?,
            binding: EnvelopeBinding::parse(&self.binding).map_err(corrupted("binding"))?,
            created_at: self.created_at,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::conformance;
    use super::*;

    fn memory_db() -> Database {
        Database::open(None).unwrap()
    }

    #[test]
    fn test_create_and_lookup() {
        conformance::create_and_lookup(&memory_db());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        conformance::duplicate_username_rejected(&memory_db());
    }

    #[test]
    fn test_concurrent_registration() {
        conformance::concurrent_registration(Arc::new(memory_db()));
    }

    #[test]
    fn test_envelope_ordering() {
        conformance::envelope_ordering(&memory_db());
    }

    #[test]
    fn test_envelope_for_unknown_user_rejected() {
        let db = memory_db();
        let result = db.insert_envelope(conformance::new_envelope(1, 2));
        assert!(matches!(result, Err(Error::DatabaseError(_))));
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealchat.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(Some(path)).unwrap();
            let alice = db.create_user(conformance::new_user("alice")).unwrap();
            let bob = db.create_user(conformance::new_user("bob")).unwrap();
            db.insert_envelope(conformance::new_envelope(alice.id, bob.id))
                .unwrap();
        }

        let db = Database::open(Some(path)).unwrap();
        let alice = db.user_by_name("alice").unwrap().unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(db.envelopes_between(1, 2, None).unwrap().len(), 1);

        // The schema is not recreated, so the username is still taken
        assert!(matches!(
            db.create_user(conformance::new_user("alice")),
            Err(Error::UserExists)
        ));
    }

    #[test]
    fn test_newer_schema_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        let path = path.to_str().unwrap();

        {
            let conn = Connection::open(path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                 INSERT INTO schema_version (version) VALUES (99);",
            )
            .unwrap();
        }

        assert!(matches!(
            Database::open(Some(path)),
            Err(Error::StorageCorrupted(_))
        ));
    }

    #[test]
    fn test_corrupted_row_detected() {
        let db = memory_db();
        db.create_user(conformance::new_user("alice")).unwrap();
        db.conn
            .lock()
            .execute("UPDATE users SET public_key = 'zz' WHERE id = 1", [])
            .unwrap();

        assert!(matches!(
            db.user_by_name("alice"),
            Err(Error::StorageCorrupted(_))
        ));
    }

    #[test]
    fn test_truncated_wrapped_key_detected() {
        let db = memory_db();
        db.create_user(conformance::new_user("alice")).unwrap();

        // Still valid hex, one byte short of a sealed scalar
        db.conn
            .lock()
            .execute(
                "UPDATE users SET enc_private_key = substr(enc_private_key, 1, 94) WHERE id = 1",
                [],
            )
            .unwrap();

        assert!(matches!(
            db.user_by_name("alice"),
            Err(Error::StorageCorrupted(_))
        ));
        assert!(matches!(db.user_by_id(1), Err(Error::StorageCorrupted(_))));
    }

    #[test]
    fn test_unreadable_file_is_database_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![0xA5u8; 8192]).unwrap();

        assert!(matches!(
            Database::open(Some(path.to_str().unwrap())),
            Err(Error::DatabaseError(_))
        ));
    }

    #[test]
    fn test_empty_version_table_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        let path = path.to_str().unwrap();

        {
            let conn = Connection::open(path).unwrap();
            conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
                .unwrap();
        }

        let db = Database::open(Some(path)).unwrap();
        db.create_user(conformance::new_user("alice")).unwrap();
    }
}
