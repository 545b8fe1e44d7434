//! HTTP API handlers.
//!
//! - `POST /register`      Create an account (server generates the key pair)
//! - `POST /login`         Check the password, return the wrapped key
//! - `GET  /public_key`    Directory lookup by `username` or `id`
//! - `POST /send_message`  Store a sealed envelope
//! - `GET  /messages`      Envelopes between `user_a` and `user_b`
//!
//! The relay only ever handles ciphertext and wrapped keys. Every store
//! call, and every Argon2id derivation, runs on the blocking pool so the
//! async workers never wait on disk or the KDF.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use sealchat_core::wire::{
    ErrorBody, LoginRequest, LoginResponse, MessageDto, MessagesQuery, PublicKeyQuery,
    RegisterRequest, SendMessageRequest, SendMessageResponse, UserLookup, UserResponse,
};
use sealchat_core::Error;

use crate::state::AppState;

// ── Errors ───────────────────────────────────────────────────────────────────

/// A core error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::UserExists => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(code = self.0.code(), "Request failed: {}", self.0);
            "internal error".to_string()
        } else {
            tracing::debug!(code = self.0.code(), "Request rejected: {}", self.0);
            self.0.to_string()
        };

        (status, Json(ErrorBody::new(message, self.0.code()))).into_response()
    }
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError(Error::InvalidInput(format!("bad json: {}", rejection.body_text())))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    ApiError(Error::InvalidInput(format!("bad query: {}", rejection.body_text())))
}

/// Run synchronous core work (KDF, store I/O) on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> sealchat_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError(Error::Internal(format!("worker failed: {}", e))))?
        .map_err(ApiError)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    let credentials = request.into_credentials()?;

    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.register(&credentials)).await?;

    Ok(Json(UserResponse::from(&user)))
}

/// POST /login
///
/// Wrong password and unknown username are both 401 with the same body.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    let credentials = request.into_credentials()?;

    let accounts = state.accounts.clone();
    let grant = blocking(move || accounts.login(&credentials)).await?;

    Ok(Json(LoginResponse::from(&grant)))
}

/// GET /public_key?username=… or ?id=…
pub async fn public_key(
    State(state): State<AppState>,
    query: Result<Query<PublicKeyQuery>, QueryRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;

    let lookup = query.into_lookup()?;

    let accounts = state.accounts.clone();
    let user = blocking(move || match lookup {
        UserLookup::ByName(name) => accounts.public_key(&name),
        UserLookup::ById(id) => accounts.public_key_by_id(id),
    })
    .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// POST /send_message
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    let envelope = request.into_envelope()?;

    let accounts = state.accounts.clone();
    let id = blocking(move || accounts.post_envelope(envelope)).await?;

    Ok(Json(SendMessageResponse { id }))
}

/// GET /messages?user_a=…&user_b=…[&after=…]
pub async fn messages(
    State(state): State<AppState>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let query = query.into_query()?;

    let accounts = state.accounts.clone();
    let envelopes =
        blocking(move || accounts.conversation(query.user_a, query.user_b, query.after)).await?;

    Ok(Json(envelopes.iter().map(MessageDto::from).collect()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
