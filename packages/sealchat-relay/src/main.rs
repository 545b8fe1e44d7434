//! SealChat Relay Server
//!
//! A small JSON HTTP server that provides:
//!
//! 1. **Accounts**: registration creates an X25519 key pair, wraps the
//!    private half under an Argon2id-derived key and stores only the
//!    wrapped blob, the salt and a login verifier.
//!
//! 2. **Key directory**: anyone can look up a user's public key by name or id.
//!
//! 3. **Envelope store**: sealed messages are stored and listed per pair of
//!    users in the order they arrived.
//!
//! **Privacy**: The relay never sees plaintext content or private keys.
//! Unwrapping and message decryption happen client-side.

mod api;
mod state;

use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sealchat_core::wire::HealthResponse;
use sealchat_core::KdfParams;
use state::{AppState, RelayConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sealchat-relay", version, about = "SealChat key custody relay")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "RELAY_PORT")]
    port: u16,

    /// SQLite database file, or ":memory:" for a throwaway store
    #[arg(long, default_value = "sealchat.db", env = "SEALCHAT_DB")]
    db: String,

    /// Argon2id memory cost in KiB
    #[arg(long, default_value_t = 65536, env = "SEALCHAT_ARGON_M_COST_KIB")]
    argon_m_cost_kib: u32,

    /// Argon2id iterations
    #[arg(long, default_value_t = 1, env = "SEALCHAT_ARGON_T_COST")]
    argon_t_cost: u32,

    /// Argon2id lanes
    #[arg(long, default_value_t = 4, env = "SEALCHAT_ARGON_P_COST")]
    argon_p_cost: u32,

    /// Emit logs as JSON lines
    #[arg(long, env = "SEALCHAT_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn config(&self) -> RelayConfig {
        RelayConfig {
            port: self.port,
            db_path: self.db.clone(),
            kdf: KdfParams {
                m_cost_kib: self.argon_m_cost_kib,
                t_cost: self.argon_t_cost,
                p_cost: self.argon_p_cost,
            },
        }
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sealchat_relay=info,tower_http=info".into());
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = args.config();
    tracing::info!(
        m_cost_kib = config.kdf.m_cost_kib,
        t_cost = config.kdf.t_cost,
        p_cost = config.kdf.p_cost,
        "Argon2id parameters"
    );

    let state = AppState::open(config)?;

    let addr = format!("0.0.0.0:{}", state.config.port);
    tracing::info!("SealChat relay server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Build the router with all routes and layers.
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/public_key", get(api::public_key))
        .route("/send_message", post(api::send_message))
        .route("/messages", get(api::messages))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sealchat_core::wire::{ErrorBody, LoginResponse, UserResponse};
    use sealchat_core::MemoryStore;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = RelayConfig {
            kdf: KdfParams {
                m_cost_kib: 256,
                t_cost: 1,
                p_cost: 1,
            },
            ..RelayConfig::default()
        };
        app(AppState::with_store(config, Arc::new(MemoryStore::new())))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(
        response: axum::response::Response,
    ) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, "sealchat.db");
        assert_eq!(config.kdf, KdfParams::default());
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from([
            "sealchat-relay",
            "--port",
            "9000",
            "--db",
            ":memory:",
            "--argon-m-cost-kib",
            "1024",
        ]);
        let config = args.config();
        assert_eq!(config.port, 9000);
        assert_eq!(config.db_path, state::MEMORY_STORE);
        assert_eq!(config.kdf.m_cost_kib, 1024);
        assert_eq!(config.kdf.t_cost, 1);
        assert_eq!(config.kdf.p_cost, 4);
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = body_json(response).await;
        assert!(health.ok);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = test_app()
            .oneshot(post_json("/register", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: ErrorBody = body_json(response).await;
        assert!(!body.ok);
        assert_eq!(body.code, 100);
    }

    #[tokio::test]
    async fn test_register_login_over_http() {
        let app = test_app();
        let alice = r#"{"username":"alice","password":"alicepass"}"#;

        let response = app
            .clone()
            .oneshot(post_json("/register", alice))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user: UserResponse = body_json(response).await;
        assert_eq!(user.username, "alice");

        let response = app
            .clone()
            .oneshot(post_json("/register", alice))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(post_json(
                "/login",
                r#"{"username":"alice","password":"wrong"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.code, 300);

        let response = app.clone().oneshot(post_json("/login", alice)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let grant: LoginResponse = body_json(response).await;
        assert_eq!(grant.id, user.id);
        assert_eq!(grant.public_key_base64, user.public_key_base64);

        let response = app
            .oneshot(get("/public_key?username=alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let found: UserResponse = body_json(response).await;
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_messages_requires_both_users() {
        let response = test_app()
            .oneshot(get("/messages?user_a=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
