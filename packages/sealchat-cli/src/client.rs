//! Typed HTTP client for the relay API.

use color_eyre::eyre::{eyre, Result, WrapErr};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use sealchat_core::wire::{
    ErrorBody, LoginRequest, LoginResponse, MessageDto, RegisterRequest, SendMessageRequest,
    SendMessageResponse, UserResponse,
};
use sealchat_core::{LoginGrant, MessageEnvelope, NewEnvelope, RegisteredUser};

/// Outcome of `POST /register`.
#[derive(Debug)]
pub enum Registration {
    Created(RegisteredUser),
    AlreadyExists,
}

/// Relay client.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Registration> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .wrap_err("register request failed")?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(Registration::AlreadyExists);
        }

        let user: UserResponse = decode(response, "register").await?;
        Ok(Registration::Created(user.into_user()?))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .wrap_err("login request failed")?;

        let grant: LoginResponse = decode(response, "login").await?;
        Ok(grant.into_grant()?)
    }

    pub async fn public_key(&self, username: &str) -> Result<RegisteredUser> {
        let response = self
            .http
            .get(self.url("/public_key"))
            .query(&[("username", username)])
            .send()
            .await
            .wrap_err("public key request failed")?;

        let user: UserResponse = decode(response, "public key lookup").await?;
        Ok(user.into_user()?)
    }

    pub async fn send(&self, envelope: &NewEnvelope) -> Result<i64> {
        let response = self
            .http
            .post(self.url("/send_message"))
            .json(&SendMessageRequest::from(envelope))
            .send()
            .await
            .wrap_err("send request failed")?;

        let sent: SendMessageResponse = decode(response, "send").await?;
        Ok(sent.id)
    }

    /// Envelopes between two users with a sequence number above `after`.
    pub async fn messages(
        &self,
        user_a: i64,
        user_b: i64,
        after: Option<i64>,
    ) -> Result<Vec<MessageEnvelope>> {
        let mut query = vec![("user_a", user_a), ("user_b", user_b)];
        if let Some(after) = after {
            query.push(("after", after));
        }

        let response = self
            .http
            .get(self.url("/messages"))
            .query(&query)
            .send()
            .await
            .wrap_err("messages request failed")?;

        let listed: Vec<MessageDto> = decode(response, "messages").await?;
        listed
            .into_iter()
            .map(|dto| dto.into_envelope().map_err(Into::into))
            .collect()
    }
}

/// Parse a 2xx body, or turn the relay's error body into a report.
async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .wrap_err_with(|| format!("{}: malformed response", what));
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(eyre!("{} failed ({}): {}", what, status.as_u16(), message))
}
