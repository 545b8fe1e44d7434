//! SealChat terminal client.
//!
//! Talks to a relay over JSON. The relay hands back the wrapped private
//! key at login; the client unwraps it with the password and does all
//! message encryption and decryption locally.
//!
//! ```bash
//! sealchat register --user alice --password alicepass
//! sealchat chat --user alice --password alicepass --peer bob
//! sealchat history --user bob --password bobpass --peer alice
//! sealchat demo
//! ```

mod client;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use client::{Registration, RelayClient};
use sealchat_core::{time, MessageEnvelope, RegisteredUser, Session};

/// How often `chat` asks the relay for new envelopes.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sealchat", version, about = "SealChat terminal client")]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true, default_value = "http://localhost:8080", env = "SEALCHAT_URL")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Account {
    /// Username
    #[arg(short, long, env = "SEALCHAT_USER")]
    user: String,

    /// Password
    #[arg(short, long, env = "SEALCHAT_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        #[command(flatten)]
        account: Account,
    },
    /// Chat with another user interactively
    Chat {
        #[command(flatten)]
        account: Account,
        /// Username to chat with
        #[arg(long)]
        peer: String,
    },
    /// Print and decrypt the whole conversation with a user
    History {
        #[command(flatten)]
        account: Account,
        /// Username of the other side
        #[arg(long)]
        peer: String,
    },
    /// Register alice and bob and send "hello bob"
    Demo,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sealchat=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let relay = RelayClient::new(&cli.base_url);

    match cli.command {
        Command::Register { account } => register(&relay, &account).await,
        Command::Chat { account, peer } => chat(&relay, &account, &peer).await,
        Command::History { account, peer } => history(&relay, &account, &peer).await,
        Command::Demo => demo(&relay).await,
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn register(relay: &RelayClient, account: &Account) -> Result<()> {
    match relay.register(&account.user, &account.password).await? {
        Registration::Created(user) => {
            println!("Registered {} (id={})", user.username, user.id);
            Ok(())
        }
        Registration::AlreadyExists => Err(eyre!("user {} already exists", account.user)),
    }
}

async fn chat(relay: &RelayClient, account: &Account, peer_name: &str) -> Result<()> {
    ensure_registered(relay, &account.user, &account.password).await?;
    let session = sign_in(relay, &account.user, &account.password).await?;
    let peer = relay.public_key(peer_name).await?;

    println!(
        "Logged in as {} (id={}). Peer {} (id={})",
        session.username(),
        session.user_id(),
        peer.username,
        peer.id
    );

    let mut last_seen = None;
    for envelope in relay.messages(session.user_id(), peer.id, None).await? {
        print_envelope(&session, &peer, &envelope);
        last_seen = Some(envelope.sequence);
    }

    println!("Type messages and press Enter to send. Type /quit to exit.");
    prompt().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();

                if text == "/quit" {
                    break;
                }
                if !text.is_empty() {
                    if let Err(e) = send(relay, &session, &peer, text).await {
                        println!("send error: {:#}", e);
                    }
                }
                prompt().await?;
            }
            _ = poll.tick() => {
                let incoming = match relay.messages(session.user_id(), peer.id, last_seen).await {
                    Ok(incoming) => incoming,
                    Err(e) => {
                        tracing::warn!("poll failed: {:#}", e);
                        continue;
                    }
                };

                for envelope in incoming {
                    last_seen = Some(envelope.sequence);
                    if envelope.receiver_id == session.user_id() {
                        println!();
                        print_envelope(&session, &peer, &envelope);
                        prompt().await?;
                    }
                }
            }
        }
    }

    println!("Exiting");
    Ok(())
}

async fn history(relay: &RelayClient, account: &Account, peer_name: &str) -> Result<()> {
    let session = sign_in(relay, &account.user, &account.password).await?;
    let peer = relay.public_key(peer_name).await?;

    let envelopes = relay.messages(session.user_id(), peer.id, None).await?;
    if envelopes.is_empty() {
        println!("No messages with {}", peer.username);
    }
    for envelope in &envelopes {
        print_envelope(&session, &peer, envelope);
    }

    Ok(())
}

async fn demo(relay: &RelayClient) -> Result<()> {
    println!("=== SealChat Demo ===\n");

    ensure_registered(relay, "alice", "alicepass").await?;
    ensure_registered(relay, "bob", "bobpass").await?;

    let alice = sign_in(relay, "alice", "alicepass").await?;
    let bob = sign_in(relay, "bob", "bobpass").await?;
    println!("alice id={}, bob id={}", alice.user_id(), bob.user_id());

    let bob_public = relay.public_key("bob").await?;
    let sequence = send(relay, &alice, &bob_public, "hello bob").await?;
    println!("alice → bob: envelope #{}", sequence);

    let alice_public = relay.public_key("alice").await?;
    let inbox = relay
        .messages(bob.user_id(), alice_public.id, Some(sequence - 1))
        .await?;
    let envelope = inbox
        .iter()
        .find(|e| e.sequence == sequence)
        .ok_or_else(|| eyre!("envelope #{} not listed", sequence))?;

    let plaintext = bob.open_from(envelope, &alice_public.public_key)?;
    println!("bob reads: {}", String::from_utf8_lossy(&plaintext));

    println!("\n=== Demo Complete ===");
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn ensure_registered(relay: &RelayClient, username: &str, password: &str) -> Result<()> {
    match relay.register(username, password).await? {
        Registration::Created(user) => println!("Registered {} (id={})", user.username, user.id),
        Registration::AlreadyExists => tracing::debug!("{} already registered", username),
    }
    Ok(())
}

/// Log in and unwrap the private key locally.
async fn sign_in(relay: &RelayClient, username: &str, password: &str) -> Result<Session> {
    let grant = relay.login(username, password).await?;
    let password = password.to_string();

    let session =
        tokio::task::spawn_blocking(move || Session::unlock(&grant, &password)).await??;
    Ok(session)
}

async fn send(
    relay: &RelayClient,
    session: &Session,
    peer: &RegisteredUser,
    text: &str,
) -> Result<i64> {
    let envelope = session.seal_for(peer.id, &peer.public_key, text.as_bytes())?;
    relay.send(&envelope).await
}

fn print_envelope(session: &Session, peer: &RegisteredUser, envelope: &MessageEnvelope) {
    let author = if envelope.sender_id == session.user_id() {
        session.username()
    } else {
        peer.username.as_str()
    };
    let when = time::format_timestamp(envelope.created_at);

    match session.open_from(envelope, &peer.public_key) {
        Ok(plaintext) => println!(
            "[{}] #{} {}: {}",
            when,
            envelope.sequence,
            author,
            String::from_utf8_lossy(&plaintext)
        ),
        Err(e) => println!("[{}] #{} {}: <cannot decrypt: {}>", when, envelope.sequence, author, e),
    }
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat() {
        let cli = Cli::parse_from([
            "sealchat",
            "--base-url",
            "http://relay:9000",
            "chat",
            "--user",
            "alice",
            "--password",
            "alicepass",
            "--peer",
            "bob",
        ]);
        assert_eq!(cli.base_url, "http://relay:9000");
        match cli.command {
            Command::Chat { account, peer } => {
                assert_eq!(account.user, "alice");
                assert_eq!(account.password, "alicepass");
                assert_eq!(peer, "bob");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_demo_needs_no_account() {
        let cli = Cli::parse_from(["sealchat", "demo"]);
        assert!(matches!(cli.command, Command::Demo));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
