//! # Encryption Demo
//!
//! Demonstrates end-to-end encryption between two parties.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example encryption_demo
//! ```

use sealchat_core::crypto::{agree, decrypt, encrypt, KeyPair};

fn main() {
    println!("=== SealChat Core: End-to-End Encryption Demo ===\n");

    // Step 1: Create two parties (Alice and Bob)
    println!("Step 1: Generating X25519 keypairs for Alice and Bob...");

    let alice = KeyPair::generate().expect("Failed to create Alice's keypair");
    let bob = KeyPair::generate().expect("Failed to create Bob's keypair");

    println!(
        "  Alice's public key: {}...",
        hex::encode(&alice.public.as_bytes()[..8])
    );
    println!(
        "  Bob's public key:   {}...",
        hex::encode(&bob.public.as_bytes()[..8])
    );
    println!();

    // Step 2: Both sides derive the session key without talking
    println!("Step 2: Deriving the session key (X25519 → HKDF-SHA256)...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                    KEY AGREEMENT FLOW                       │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   Alice                              Bob                    │");
    println!("  │     │                                  │                    │");
    println!("  │     │  fetch Bob's public key          │                    │");
    println!("  │     │  from the relay directory        │                    │");
    println!("  │     ▼                                  ▼                    │");
    println!("  │  alice.priv × bob.pub       bob.priv × alice.pub            │");
    println!("  │       │                               │                    │");
    println!("  │       └───────────┐     ┌─────────────┘                    │");
    println!("  │                   ▼     ▼                                  │");
    println!("  │              ┌─────────────────┐                           │");
    println!("  │              │  SAME SESSION   │                           │");
    println!("  │              │      KEY        │                           │");
    println!("  │              └─────────────────┘                           │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let alice_side = agree(&alice.private, &bob.public).expect("Alice's agreement failed");
    let bob_side = agree(&bob.private, &alice.public).expect("Bob's agreement failed");
    println!("  Alice's session key: {:?}", alice_side);
    println!("  Bob's session key:   {:?}", bob_side);
    println!("  (keys never print; they are redacted and zeroized on drop)");
    println!();

    // Step 3: Alice encrypts
    println!("Step 3: Alice encrypts a message for Bob...");
    let message = b"hello bob";
    let sealed = encrypt(&alice.private, &bob.public, message).expect("Encryption failed");

    println!("  Plaintext:  {:?}", String::from_utf8_lossy(message));
    println!("  Nonce:      {}", hex::encode(sealed.nonce.as_bytes()));
    println!("  Ciphertext: {}", hex::encode(&sealed.ciphertext));
    println!(
        "  Size: {} bytes plaintext → {} bytes ciphertext (16-byte tag)",
        message.len(),
        sealed.ciphertext.len()
    );
    println!();

    // Step 4: Bob decrypts
    println!("Step 4: Bob decrypts with his private key and Alice's public key...");
    let plaintext = decrypt(&bob.private, &alice.public, &sealed.ciphertext, &sealed.nonce)
        .expect("Decryption failed");
    println!("  Decrypted: {:?}", String::from_utf8_lossy(&plaintext));
    assert_eq!(plaintext, message);
    println!();

    // Step 5: Tampering is detected
    println!("Step 5: Flipping one ciphertext bit...");
    let mut tampered = sealed.ciphertext.clone();
    tampered[0] ^= 0x01;
    match decrypt(&bob.private, &alice.public, &tampered, &sealed.nonce) {
        Ok(_) => println!("  ✗ Tampered message was accepted"),
        Err(e) => println!("  ✓ Rejected: {}", e),
    }
    println!();

    println!("=== Demo Complete ===");
}
