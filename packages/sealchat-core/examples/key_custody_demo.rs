//! # Key Custody Demo
//!
//! Registers two users against an in-memory store, logs them in, and
//! exchanges a participant-bound message.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example key_custody_demo
//! ```

use std::sync::Arc;

use sealchat_core::{AccountService, Credentials, KdfParams, MemoryStore, Session, Store};

fn main() {
    println!("=== SealChat Core: Key Custody Demo ===\n");

    let store = Arc::new(MemoryStore::new());
    let accounts = AccountService::new(store.clone(), KdfParams::default());

    // Step 1: Registration
    println!("Step 1: Registering alice and bob (Argon2id, 64 MiB)...");
    let alice_user = accounts
        .register(&Credentials::new("alice", "alicepass").expect("bad credentials"))
        .expect("Failed to register alice");
    let bob_user = accounts
        .register(&Credentials::new("bob", "bobpass").expect("bad credentials"))
        .expect("Failed to register bob");
    println!("  alice → id {}", alice_user.id);
    println!("  bob   → id {}", bob_user.id);
    println!();

    // Step 2: What the server holds
    println!("Step 2: What the store holds for alice...");
    let record = store
        .user_by_name("alice")
        .expect("store error")
        .expect("alice missing");
    println!("  salt:             {}", hex::encode(record.salt.as_bytes()));
    println!("  verifier:         {:?}", record.verifier);
    println!(
        "  wrapped key:      {} ({} bytes)",
        hex::encode(&record.wrapped_private_key.ciphertext),
        record.wrapped_private_key.ciphertext.len()
    );
    println!("  public key:       {:?}", record.public_key);
    println!("  (no password, no wrap key, no plaintext private key)");
    println!();

    // Step 3: Login and unlock
    println!("Step 3: Logging in and unlocking locally...");
    let alice_grant = accounts
        .login(&Credentials::new("alice", "alicepass").expect("bad credentials"))
        .expect("alice login failed");
    let alice = Session::unlock(&alice_grant, "alicepass").expect("alice unlock failed");

    let bob_grant = accounts
        .login(&Credentials::new("bob", "bobpass").expect("bad credentials"))
        .expect("bob login failed");
    let bob = Session::unlock(&bob_grant, "bobpass").expect("bob unlock failed");
    println!("  ✓ both sessions unlocked");

    match accounts.login(&Credentials::new("alice", "guess").expect("bad credentials")) {
        Ok(_) => println!("  ✗ wrong password accepted"),
        Err(e) => println!("  ✓ wrong password: {}", e),
    }
    println!();

    // Step 4: Message exchange through the store
    println!("Step 4: alice → bob, bound to (sender, receiver)...");
    let envelope = alice
        .seal_for(bob_user.id, &bob_user.public_key, b"hello bob")
        .expect("seal failed");
    let sequence = accounts.post_envelope(envelope).expect("post failed");
    println!("  stored as envelope #{}", sequence);

    for stored in accounts
        .conversation(bob.user_id(), alice.user_id(), None)
        .expect("listing failed")
    {
        let sender = accounts
            .public_key_by_id(stored.sender_id)
            .expect("sender lookup failed");
        let plaintext = bob
            .open_from(&stored, &sender.public_key)
            .expect("open failed");
        println!(
            "  #{} {} → bob: {:?}",
            stored.sequence,
            sender.username,
            String::from_utf8_lossy(&plaintext)
        );
    }
    println!();

    println!("=== Demo Complete ===");
}
