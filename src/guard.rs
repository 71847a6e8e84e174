//! Route guard: gates navigation on session state.
//!
//! DESIGN
//! ======
//! `RouteGuard::evaluate` is a pure function of `(session, path)`. Public
//! routes render immediately and never redirect. Every other route shows a
//! blocking loading view until the session resolves; after that a signed-out
//! user on a protected route goes to the auth route and a signed-in user on an
//! auth-only route goes home.
//!
//! Redirection is a side effect performed by [`RouteGuard::drive`], which
//! re-evaluates on every session or route change and calls
//! [`Navigator::replace`].

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::SessionState;

// =============================================================================
// ROUTES
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    /// Renders regardless of session, e.g. the shared list.
    Public,
    /// Only meaningful without a session, e.g. the login page.
    AuthOnly,
    Protected,
}

/// Prefix-based route classification plus the two redirect targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    pub public_prefixes: Vec<String>,
    pub auth_only_prefixes: Vec<String>,
    pub auth_route: String,
    pub home_route: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public_prefixes: vec!["/share".to_owned()],
            auth_only_prefixes: vec!["/login".to_owned()],
            auth_route: "/login".to_owned(),
            home_route: "/".to_owned(),
        }
    }
}

impl RouteTable {
    /// Classify `path`, ignoring any query string or fragment. Prefixes match
    /// whole segments only, so `/shared` is not under `/share`.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        if self.public_prefixes.iter().any(|p| under_prefix(path, p)) {
            RouteClass::Public
        } else if self.auth_only_prefixes.iter().any(|p| under_prefix(path, p)) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Protected
        }
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// =============================================================================
// EVALUATION
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardView {
    /// Blocking loading indicator; children are not rendered.
    Loading,
    Children,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardOutcome {
    pub view: GuardView,
    pub redirect: Option<String>,
}

impl GuardOutcome {
    fn render() -> Self {
        Self { view: GuardView::Children, redirect: None }
    }

    fn wait() -> Self {
        Self { view: GuardView::Loading, redirect: None }
    }

    fn redirect(to: &str) -> Self {
        Self { view: GuardView::Loading, redirect: Some(to.to_owned()) }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RouteGuard {
    routes: RouteTable,
}

impl RouteGuard {
    #[must_use]
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn evaluate(&self, session: &SessionState, path: &str) -> GuardOutcome {
        let class = self.routes.classify(path);
        if class == RouteClass::Public {
            return GuardOutcome::render();
        }
        match (session, class) {
            (SessionState::Loading, _) => GuardOutcome::wait(),
            (SessionState::SignedOut, RouteClass::Protected) => GuardOutcome::redirect(&self.routes.auth_route),
            (SessionState::SignedIn(_), RouteClass::AuthOnly) => GuardOutcome::redirect(&self.routes.home_route),
            _ => GuardOutcome::render(),
        }
    }

    /// Re-evaluate on every session or route change and perform redirects.
    ///
    /// An input pair identical to the last evaluated one is skipped, so a
    /// redirect is issued once per distinct `(session, path)`. The task ends
    /// when either sender is dropped.
    pub fn drive(
        &self,
        mut session: watch::Receiver<SessionState>,
        mut route: watch::Receiver<String>,
        navigator: Arc<dyn Navigator>,
    ) -> JoinHandle<()> {
        let guard = self.clone();
        tokio::spawn(async move {
            let mut last: Option<(SessionState, String)> = None;
            loop {
                let input = (session.borrow_and_update().clone(), route.borrow_and_update().clone());
                if last.as_ref() != Some(&input) {
                    if let Some(target) = guard.evaluate(&input.0, &input.1).redirect {
                        tracing::debug!(from = %input.1, to = %target, "route guard redirect");
                        navigator.replace(&target);
                    }
                    last = Some(input);
                }
                tokio::select! {
                    changed = session.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = route.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Replaces the current location without adding a history entry.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

/// In-memory navigation history that publishes the current path.
pub struct History {
    current: watch::Sender<String>,
    entries: std::sync::Mutex<Vec<String>>,
}

impl History {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let (current, _) = watch::channel(initial.clone());
        Self { current, entries: std::sync::Mutex::new(vec![initial]) }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    /// Navigate to `path`, adding a history entry.
    pub fn push(&self, path: impl Into<String>) {
        let path = path.into();
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(path.clone());
        }
        self.current.send_replace(path);
    }

    /// Number of history entries; `replace` overwrites the last one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Navigator for History {
    fn replace(&self, path: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(last) = entries.last_mut() {
                path.clone_into(last);
            }
        }
        self.current.send_replace(path.to_owned());
    }
}
