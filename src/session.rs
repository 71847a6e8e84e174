//! Identity session: the signed-in principal and its bearer credential.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session is the trigger input for the favorites cache, the route guard
//! and account sync. Changes are published on a `watch` channel; consumers
//! hold receivers and react after the initial load resolves.
//!
//! The credential lock is never held across an await. A refresh clones the
//! refresh token, releases the lock, awaits the provider and stores the result.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::AuthError;

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

// =============================================================================
// SESSION STATE
// =============================================================================

/// The authenticated principal as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// Observable session status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Initial load has not resolved yet.
    #[default]
    Loading,
    SignedOut,
    SignedIn(Principal),
}

impl SessionState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::SignedIn(principal) => Some(principal),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.principal().is_some()
    }
}

// =============================================================================
// PROVIDER SEAM
// =============================================================================

/// Tokens issued by the identity provider for one principal.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub principal: Principal,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: Instant,
}

impl Credentials {
    fn needs_refresh(&self, now: Instant) -> bool {
        self.expires_at.saturating_duration_since(now) <= REFRESH_MARGIN
    }
}

/// Credential obtained from a federated popup/OAuth flow run elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedCredential {
    /// Provider identifier, e.g. `google.com`.
    pub provider_id: String,
    /// OAuth ID token issued by that provider.
    pub id_token: String,
}

impl FederatedCredential {
    pub fn google(id_token: impl Into<String>) -> Self {
        Self { provider_id: "google.com".to_owned(), id_token: id_token.into() }
    }
}

/// Remote identity provider operations.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credentials, AuthError>;
    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Credentials, AuthError>;
    async fn sign_in_federated(&self, credential: &FederatedCredential) -> Result<Credentials, AuthError>;
    /// Exchange a refresh token for fresh credentials.
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, AuthError>;
}

/// Source of the bearer token attached to authenticated gateway requests.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current bearer token, or `None` when signed out.
    async fn bearer_token(&self) -> Result<Option<String>, AuthError>;
}

// =============================================================================
// IDENTITY SESSION
// =============================================================================

/// Owns the credentials and publishes [`SessionState`] changes.
pub struct IdentitySession {
    provider: Arc<dyn IdentityProvider>,
    credentials: Mutex<Option<Credentials>>,
    state: watch::Sender<SessionState>,
}

impl IdentitySession {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { provider, credentials: Mutex::new(None), state }
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Resolve the initial load. A session that is still `Loading` becomes
    /// `SignedOut`; an already signed-in session is left alone.
    pub fn finish_loading(&self) {
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = SessionState::SignedOut;
                true
            } else {
                false
            }
        });
    }

    /// # Errors
    ///
    /// Returns the provider error; the session state is left unchanged.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let credentials = self.provider.sign_in_with_password(email, password).await?;
        self.install(credentials);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the provider error; the session state is left unchanged.
    pub async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let credentials = self.provider.sign_up_with_password(email, password).await?;
        self.install(credentials);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the provider error; the session state is left unchanged.
    pub async fn sign_in_federated(&self, credential: &FederatedCredential) -> Result<(), AuthError> {
        let credentials = self.provider.sign_in_federated(credential).await?;
        self.install(credentials);
        Ok(())
    }

    /// Drop the credentials and publish `SignedOut`.
    pub fn sign_out(&self) {
        self.replace_credentials(None);
        self.state.send_replace(SessionState::SignedOut);
        tracing::info!("signed out");
    }

    fn install(&self, credentials: Credentials) {
        let principal = credentials.principal.clone();
        self.replace_credentials(Some(credentials));
        tracing::info!(uid = %principal.uid, "signed in");
        self.state.send_replace(SessionState::SignedIn(principal));
    }

    fn replace_credentials(&self, credentials: Option<Credentials>) {
        match self.credentials.lock() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
    }

    fn snapshot_credentials(&self) -> Option<Credentials> {
        match self.credentials.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl CredentialSource for IdentitySession {
    async fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        let Some(current) = self.snapshot_credentials() else {
            return Ok(None);
        };
        if !current.needs_refresh(Instant::now()) {
            return Ok(Some(current.id_token));
        }

        tracing::debug!(uid = %current.principal.uid, "refreshing id token");
        let refreshed = self.provider.refresh(&current).await?;
        let token = refreshed.id_token.clone();

        // A sign-out or re-login while refreshing wins over the refreshed token.
        let mut guard = match self.credentials.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let same_principal = matches!(guard.as_ref(), Some(stored) if stored.principal == refreshed.principal);
        if same_principal {
            *guard = Some(refreshed);
            return Ok(Some(token));
        }
        Ok(guard.as_ref().map(|stored| stored.id_token.clone()))
    }
}

/// Fixed bearer token, for callers that obtained a token out of band.
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait::async_trait]
impl CredentialSource for StaticCredentials {
    async fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.token.clone())
    }
}
