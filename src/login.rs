//! Login form state: sign-in and sign-up modes over the identity session.
//!
//! A submission runs in three steps so a UI can render the busy state while
//! the provider call is in flight: [`LoginForm::begin_submit`] validates and
//! marks the form busy, [`Submission::run`] talks to the provider, and
//! [`LoginForm::finish`] records the outcome.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use crate::error::AuthError;
use crate::session::{FederatedCredential, IdentitySession};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoginMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    mode: LoginMode,
    pub email: String,
    pub password: String,
    pub repeat_password: String,
    error: Option<&'static str>,
    busy: bool,
}

/// A validated request, detached from the form while it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    Federated(FederatedCredential),
}

impl LoginForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> LoginMode {
        self.mode
    }

    /// Translated message from the last failed submission.
    #[must_use]
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self.mode {
            LoginMode::SignIn => "Login",
            LoginMode::SignUp => "Sign up",
        }
    }

    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        match (self.busy, self.mode) {
            (true, _) => "Loading...",
            (false, LoginMode::SignIn) => "Sign in",
            (false, LoginMode::SignUp) => "Create an account",
        }
    }

    /// Switch between sign-in and sign-up, clearing every field and the error.
    pub fn toggle_mode(&mut self) {
        let mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
        *self = Self { mode, busy: self.busy, ..Self::default() };
    }

    /// Validate the fields and mark the form busy.
    ///
    /// Returns `None` while a submission is already running. A sign-up whose
    /// passwords differ records the mismatch message and yields
    /// [`AuthError::PasswordMismatch`] without involving the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordMismatch`] on a sign-up mismatch.
    pub fn begin_submit(&mut self) -> Result<Option<Submission>, AuthError> {
        if self.busy {
            return Ok(None);
        }
        self.error = None;
        let email = self.email.trim().to_owned();
        let submission = match self.mode {
            LoginMode::SignIn => Submission::SignIn { email, password: self.password.clone() },
            LoginMode::SignUp => {
                if self.password != self.repeat_password {
                    let err = AuthError::PasswordMismatch;
                    self.error = Some(err.user_message());
                    return Err(err);
                }
                Submission::SignUp { email, password: self.password.clone() }
            }
        };
        self.busy = true;
        Ok(Some(submission))
    }

    /// Start a federated sign-in; `None` while busy.
    pub fn begin_federated(&mut self, credential: FederatedCredential) -> Option<Submission> {
        if self.busy {
            return None;
        }
        self.error = None;
        self.busy = true;
        Some(Submission::Federated(credential))
    }

    /// Record the outcome of a submission and clear the busy flag.
    pub fn finish(&mut self, result: &Result<(), AuthError>) {
        self.busy = false;
        self.error = result.as_ref().err().map(AuthError::user_message);
    }

    /// Validate, run against `session` and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`AuthError`]; the form keeps its translated
    /// message.
    pub async fn submit(&mut self, session: &IdentitySession) -> Result<(), AuthError> {
        let Some(submission) = self.begin_submit()? else {
            return Ok(());
        };
        let result = submission.run(session).await;
        self.finish(&result);
        result
    }
}

impl Submission {
    /// # Errors
    ///
    /// Returns the provider error unchanged.
    pub async fn run(self, session: &IdentitySession) -> Result<(), AuthError> {
        let result = match &self {
            Self::SignIn { email, password } => session.sign_in_with_password(email, password).await,
            Self::SignUp { email, password } => session.sign_up_with_password(email, password).await,
            Self::Federated(credential) => session.sign_in_federated(credential).await,
        };
        if let Err(e) = &result {
            tracing::warn!(code = e.code().unwrap_or("none"), error = %e, "login submission failed");
        }
        result
    }
}
