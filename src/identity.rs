//! Identity provider client over the provider's REST API.
//!
//! Thin HTTP wrapper for `accounts:signInWithPassword`, `accounts:signUp`,
//! `accounts:signInWithIdp` and the token refresh endpoint. Pure parsing in
//! `parse_*` helpers for testability.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{AuthError, normalize_provider_error};
use crate::session::{Credentials, FederatedCredential, IdentityProvider, Principal};

const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const IDP_REQUEST_URI: &str = "http://localhost";

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseIdentity {
    http: reqwest::Client,
    api_key: Option<String>,
    identity_url: String,
    token_url: String,
}

impl FirebaseIdentity {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.identity_api_key.clone(),
            identity_url: config.identity_url.clone(),
            token_url: config.token_url.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, AuthError> {
        self.api_key.as_deref().ok_or(AuthError::MissingApiKey)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String, AuthError> {
        let key = self.api_key()?;
        let response = self
            .http
            .post(url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AuthError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(parse_error(&text));
        }
        Ok(text)
    }

    async fn password_flow(&self, action: &str, email: &str, password: &str) -> Result<Credentials, AuthError> {
        let url = format!("{}/accounts:{action}", self.identity_url);
        let body = PasswordRequest { email, password, return_secure_token: true };
        let text = self.post(&url, &body).await?;
        parse_account_response(&text, Instant::now())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
        self.password_flow("signInWithPassword", email, password).await
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
        self.password_flow("signUp", email, password).await
    }

    async fn sign_in_federated(&self, credential: &FederatedCredential) -> Result<Credentials, AuthError> {
        let url = format!("{}/accounts:signInWithIdp", self.identity_url);
        let post_body = format!("id_token={}&providerId={}", credential.id_token, credential.provider_id);
        let body = IdpRequest {
            post_body: &post_body,
            request_uri: IDP_REQUEST_URI,
            return_idp_credential: true,
            return_secure_token: true,
        };
        let text = self.post(&url, &body).await?;
        parse_account_response(&text, Instant::now())
    }

    async fn refresh(&self, current: &Credentials) -> Result<Credentials, AuthError> {
        let url = format!("{}/token", self.token_url);
        let body = RefreshRequest { grant_type: "refresh_token", refresh_token: &current.refresh_token };
        let text = self.post(&url, &body).await?;
        parse_refresh_response(&text, &current.principal, Instant::now())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(default)]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    /// Set by `signInWithIdp` when the popup/OAuth flow was abandoned.
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn expires_at(now: Instant, expires_in: Option<&str>) -> Instant {
    let secs = expires_in
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    now + Duration::from_secs(secs)
}

fn parse_account_response(json: &str, now: Instant) -> Result<Credentials, AuthError> {
    let body: AccountResponse = serde_json::from_str(json).map_err(|e| AuthError::Parse(e.to_string()))?;
    if let Some(message) = body.error_message {
        return Err(AuthError::provider(normalize_provider_error(&message)));
    }
    if body.local_id.is_empty() || body.id_token.is_empty() {
        return Err(AuthError::Parse("account response without localId or idToken".to_owned()));
    }
    Ok(Credentials {
        principal: Principal { uid: body.local_id, email: body.email, photo_url: body.photo_url },
        id_token: body.id_token,
        refresh_token: body.refresh_token,
        expires_at: expires_at(now, body.expires_in.as_deref()),
    })
}

fn parse_refresh_response(json: &str, principal: &Principal, now: Instant) -> Result<Credentials, AuthError> {
    let body: RefreshResponse = serde_json::from_str(json).map_err(|e| AuthError::Parse(e.to_string()))?;
    if body.user_id.as_deref().is_some_and(|uid| uid != principal.uid) {
        return Err(AuthError::provider("auth/user-mismatch"));
    }
    Ok(Credentials {
        principal: principal.clone(),
        id_token: body.id_token,
        refresh_token: body.refresh_token,
        expires_at: expires_at(now, body.expires_in.as_deref()),
    })
}

fn parse_error(json: &str) -> AuthError {
    match serde_json::from_str::<ErrorEnvelope>(json) {
        Ok(envelope) => AuthError::provider(normalize_provider_error(&envelope.error.message)),
        Err(_) => AuthError::provider("auth/internal-error"),
    }
}
