//! In-memory store.
//!
//! Holds everything behind one `RwLock`, so `create_user` checks and
//! inserts under a single write guard.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{MessageEnvelope, NewEnvelope, NewUser, Store, UserRecord};
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    ids_by_name: HashMap<String, i64>,
    envelopes: Vec<MessageEnvelope>,
    next_sequence: i64,
}

/// A `Store` that lives only as long as the process
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut inner = self.inner.write();

        if inner.ids_by_name.contains_key(&user.username) {
            return Err(Error::UserExists);
        }

        let record = UserRecord {
            id: inner.users.len() as i64 + 1,
            username: user.username,
            salt: user.salt,
            verifier: user.verifier,
            public_key: user.public_key,
            wrapped_private_key: user.wrapped_private_key,
            created_at: crate::time::now_timestamp(),
        };

        inner.ids_by_name.insert(record.username.clone(), record.id);
        inner.users.push(record.clone());

        Ok(record)
    }

    fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .ids_by_name
            .get(username)
            .and_then(|id| inner.users.get((*id - 1) as usize))
            .cloned())
    }

    fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        if id < 1 {
            return Ok(None);
        }
        Ok(self.inner.read().users.get((id - 1) as usize).cloned())
    }

    fn insert_envelope(&self, envelope: NewEnvelope) -> Result<MessageEnvelope> {
        let mut inner = self.inner.write();

        inner.next_sequence += 1;
        let stored = MessageEnvelope {
            sequence: inner.next_sequence,
            sender_id: envelope.sender_id,
            receiver_id: envelope.receiver_id,
            ciphertext: envelope.ciphertext,
            nonce: envelope.nonce,
            binding: envelope.binding,
            created_at: crate::time::now_timestamp(),
        };
        inner.envelopes.push(stored.clone());

        Ok(stored)
    }

    fn envelopes_between(
        &self,
        a: i64,
        b: i64,
        after: Option<i64>,
    ) -> Result<Vec<MessageEnvelope>> {
        let inner = self.inner.read();
        let after = after.unwrap_or(0);

        // Pushed in sequence order, so no sort is needed
        Ok(inner
            .envelopes
            .iter()
            .filter(|e| e.sequence > after)
            .filter(|e| {
                (e.sender_id == a && e.receiver_id == b) || (e.sender_id == b && e.receiver_id == a)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::conformance;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_create_and_lookup() {
        conformance::create_and_lookup(&MemoryStore::new());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        conformance::duplicate_username_rejected(&MemoryStore::new());
    }

    #[test]
    fn test_concurrent_registration() {
        conformance::concurrent_registration(Arc::new(MemoryStore::new()));
    }

    #[test]
    fn test_envelope_ordering() {
        conformance::envelope_ordering(&MemoryStore::new());
    }

    #[test]
    fn test_stores_are_independent() {
        let one = MemoryStore::new();
        let two = MemoryStore::new();
        one.create_user(conformance::new_user("alice")).unwrap();

        assert!(two.user_by_name("alice").unwrap().is_none());
        two.create_user(conformance::new_user("alice")).unwrap();
    }
}
