//! Error types shared across the client core.
//!
//! ERROR HANDLING
//! ==============
//! Auth errors propagate to callers as `Err` and carry a provider code that
//! maps to a fixed set of user-facing messages. Gateway errors are `Clone` so
//! read views and the favorites cache can hold them inside observable state.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// =============================================================================
// AUTH
// =============================================================================

pub const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password. Try again.";
pub const MSG_EMAIL_IN_USE: &str = "This email is already in use.";
pub const MSG_WEAK_PASSWORD: &str = "The password is too weak. Try a stronger password.";
pub const MSG_POPUP_CLOSED: &str = "The Google sign-in window was closed.";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const MSG_AUTH_GENERIC: &str = "Something went wrong. Try again later.";

/// Errors produced by identity-provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the request with an `auth/...` code.
    #[error("identity provider rejected request: {code}")]
    Provider { code: String },

    /// Sign-up password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// No identity API key was configured.
    #[error("identity provider not configured: missing API key")]
    MissingApiKey,

    /// The HTTP request to the provider failed.
    #[error("identity request failed: {0}")]
    Request(String),

    /// The provider response body could not be deserialized.
    #[error("identity response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    /// Build a provider error from an `auth/...` code.
    pub fn provider(code: impl Into<String>) -> Self {
        Self::Provider { code: code.into() }
    }

    /// Provider error code, if the provider produced one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Provider { code } => Some(code),
            _ => None,
        }
    }

    /// Translated message suitable for the login form.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Provider { code } => translate_auth_code(code),
            Self::PasswordMismatch => MSG_PASSWORD_MISMATCH,
            _ => MSG_AUTH_GENERIC,
        }
    }
}

/// Map a provider error code to its user-facing message.
#[must_use]
pub fn translate_auth_code(code: &str) -> &'static str {
    match code {
        "auth/invalid-credential" | "auth/wrong-password" | "auth/user-not-found" => MSG_INVALID_CREDENTIALS,
        "auth/email-already-in-use" => MSG_EMAIL_IN_USE,
        "auth/weak-password" => MSG_WEAK_PASSWORD,
        "auth/popup-closed-by-user" => MSG_POPUP_CLOSED,
        _ => MSG_AUTH_GENERIC,
    }
}

/// Normalize a provider REST error string (`EMAIL_EXISTS`,
/// `WEAK_PASSWORD : Password should be ...`) into the `auth/...` code space.
#[must_use]
pub fn normalize_provider_error(raw: &str) -> String {
    let head = raw.split(" : ").next().unwrap_or(raw).trim();
    let code = match head {
        "EMAIL_NOT_FOUND" => "user-not-found",
        "INVALID_PASSWORD" => "wrong-password",
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => "invalid-credential",
        "EMAIL_EXISTS" => "email-already-in-use",
        "WEAK_PASSWORD" => "weak-password",
        "USER_DISABLED" => "user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too-many-requests",
        "TOKEN_EXPIRED" => "user-token-expired",
        "INVALID_REFRESH_TOKEN" => "invalid-refresh-token",
        "USER_CANCELLED" => "popup-closed-by-user",
        other => return format!("auth/{}", other.to_ascii_lowercase().replace('_', "-")),
    };
    format!("auth/{code}")
}

// =============================================================================
// GATEWAY
// =============================================================================

/// Errors produced by Remote Data Gateway calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// An authenticated call was attempted without a session.
    #[error("no active session")]
    NoSession,

    /// The bearer credential could not be obtained.
    #[error("credential unavailable: {0}")]
    Credential(#[from] AuthError),

    /// The HTTP request failed before a response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The gateway returned a non-success status.
    #[error("gateway returned status {status}")]
    Status { status: u16, message: Option<String> },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The configured base URL cannot carry path segments.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GatewayError {
    /// Server-provided message when present, otherwise `fallback`.
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Self::Status { message: Some(message), .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_owned(),
        }
    }
}
