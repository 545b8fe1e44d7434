//! End-to-end flows through the public API: register, login, unlock,
//! seal, store, list, open.

use std::sync::Arc;

use sealchat_core::wire::{LoginResponse, MessageDto, SendMessageRequest};
use sealchat_core::{
    AccountService, Credentials, Database, Error, KdfParams, MemoryStore, Session, Store,
};

fn light_kdf() -> KdfParams {
    KdfParams {
        m_cost_kib: 256,
        t_cost: 1,
        p_cost: 1,
    }
}

fn creds(username: &str, password: &str) -> Credentials {
    Credentials::new(username, password).unwrap()
}

#[test]
fn alice_sends_hello_bob() {
    let accounts = AccountService::new(Arc::new(MemoryStore::new()), light_kdf());

    accounts.register(&creds("alice", "alicepass")).unwrap();
    accounts.register(&creds("bob", "bobpass")).unwrap();

    // Each side logs in and unwraps its own private key
    let alice_grant = accounts.login(&creds("alice", "alicepass")).unwrap();
    let bob_grant = accounts.login(&creds("bob", "bobpass")).unwrap();
    let alice = Session::unlock(&alice_grant, "alicepass").unwrap();
    let bob = Session::unlock(&bob_grant, "bobpass").unwrap();

    // Alice looks up Bob in the directory and sends
    let bob_public = accounts.public_key("bob").unwrap();
    let envelope = alice
        .seal_for(bob_public.id, &bob_public.public_key, b"hello bob")
        .unwrap();
    accounts.post_envelope(envelope).unwrap();

    // Bob lists the conversation and opens it with Alice's public key
    let alice_public = accounts.public_key("alice").unwrap();
    let listed = accounts
        .conversation(bob.user_id(), alice_public.id, None)
        .unwrap();
    assert_eq!(listed.len(), 1);

    let plaintext = bob.open_from(&listed[0], &alice_public.public_key).unwrap();
    assert_eq!(plaintext, b"hello bob");
}

#[test]
fn grant_survives_the_wire() {
    let accounts = AccountService::new(Arc::new(MemoryStore::new()), light_kdf());
    accounts.register(&creds("alice", "alicepass")).unwrap();
    let bob = accounts.register(&creds("bob", "bobpass")).unwrap();

    // Server side serializes, client side decodes and unlocks
    let grant = accounts.login(&creds("alice", "alicepass")).unwrap();
    let json = serde_json::to_string(&LoginResponse::from(&grant)).unwrap();
    let decoded: LoginResponse = serde_json::from_str(&json).unwrap();
    let alice = Session::unlock(&decoded.into_grant().unwrap(), "alicepass").unwrap();

    // Envelope goes out as JSON and comes back as JSON
    let envelope = alice
        .seal_for(bob.id, &bob.public_key, b"over the wire")
        .unwrap();
    let request: SendMessageRequest =
        serde_json::from_str(&serde_json::to_string(&SendMessageRequest::from(&envelope)).unwrap())
            .unwrap();
    accounts
        .post_envelope(request.into_envelope().unwrap())
        .unwrap();

    let listed = accounts.conversation(alice.user_id(), bob.id, None).unwrap();
    let dto: MessageDto =
        serde_json::from_str(&serde_json::to_string(&MessageDto::from(&listed[0])).unwrap())
            .unwrap();

    let bob_session = Session::unlock(
        &accounts.login(&creds("bob", "bobpass")).unwrap(),
        "bobpass",
    )
    .unwrap();
    let plaintext = bob_session
        .open_from(&dto.into_envelope().unwrap(), &alice.public_key())
        .unwrap();
    assert_eq!(plaintext, b"over the wire");
}

#[test]
fn sqlite_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(Some(path)).unwrap();
        let accounts = AccountService::new(Arc::new(db), light_kdf());
        accounts.register(&creds("alice", "alicepass")).unwrap();
        let bob = accounts.register(&creds("bob", "bobpass")).unwrap();

        let alice = Session::unlock(
            &accounts.login(&creds("alice", "alicepass")).unwrap(),
            "alicepass",
        )
        .unwrap();
        accounts
            .post_envelope(alice.seal_for(bob.id, &bob.public_key, b"persisted").unwrap())
            .unwrap();
    }

    // A fresh process sees the same credentials and envelopes
    let db = Database::open(Some(path)).unwrap();
    let accounts = AccountService::new(Arc::new(db), light_kdf());
    let bob = Session::unlock(
        &accounts.login(&creds("bob", "bobpass")).unwrap(),
        "bobpass",
    )
    .unwrap();
    let alice = accounts.public_key("alice").unwrap();

    let listed = accounts.conversation(bob.user_id(), alice.id, None).unwrap();
    assert_eq!(bob.open_from(&listed[0], &alice.public_key).unwrap(), b"persisted");
}

#[test]
fn concurrent_registration_has_one_winner() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let accounts = AccountService::new(store, light_kdf());

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let accounts = accounts.clone();
            std::thread::spawn(move || {
                accounts.register(&creds("dave", &format!("password-{}", i)))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, Error::UserExists)));
}
