//! Application context: wires configuration to every client component.
//!
//! SYSTEM CONTEXT
//! ==============
//! `ClientConfig` -> `FirebaseIdentity` -> `IdentitySession` -> `HttpGateway`
//! (bearer tokens from the session) -> favorites store, catalog, shared-list
//! view and route guard. Every component receives its collaborators through
//! constructors, so [`AppContext::from_parts`] can assemble an isolated
//! instance around test doubles.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::config::{ClientConfig, ConfigError};
use crate::error::{AuthError, GatewayError};
use crate::favorites::FavoritesStore;
use crate::gateway::http::HttpGateway;
use crate::gateway::{AccountGateway, CatalogGateway, FavoritesGateway};
use crate::guard::RouteGuard;
use crate::identity::FirebaseIdentity;
use crate::session::{IdentitySession, SessionState};
use crate::share::{SharedListView, share_url};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] AuthError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Everything a presentation layer needs, cheaply cloneable.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ClientConfig>,
    pub session: Arc<IdentitySession>,
    pub favorites: FavoritesStore,
    pub catalog: Arc<Catalog>,
    pub shared: Arc<SharedListView>,
    pub guard: RouteGuard,
    account: Arc<dyn AccountGateway>,
}

/// Handles for the tasks started by [`AppContext::spawn_background`].
pub struct BackgroundTasks {
    pub favorites: JoinHandle<()>,
    pub account_sync: JoinHandle<()>,
}

impl BackgroundTasks {
    pub fn abort(&self) {
        self.favorites.abort();
        self.account_sync.abort();
    }
}

impl AppContext {
    /// Build the production wiring from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or the API base URL
    /// is unusable.
    pub fn from_config(config: ClientConfig) -> Result<Self, AppError> {
        let identity = FirebaseIdentity::new(&config)?;
        let session = Arc::new(IdentitySession::new(Arc::new(identity)));
        let gateway = Arc::new(HttpGateway::new(&config, session.clone())?);
        tracing::info!(api = %config.api_base_url, "client context initialized");
        Ok(Self::from_parts(config, session, gateway))
    }

    /// Assemble a context around an existing session and gateway.
    pub fn from_parts<G>(config: ClientConfig, session: Arc<IdentitySession>, gateway: Arc<G>) -> Self
    where
        G: FavoritesGateway + CatalogGateway + AccountGateway + 'static,
    {
        let favorites = FavoritesStore::new(gateway.clone(), session.subscribe());
        let catalog = Arc::new(Catalog::new(gateway.clone(), session.subscribe()));
        let shared = Arc::new(SharedListView::new(gateway.clone()));
        Self {
            config: Arc::new(config),
            session,
            favorites,
            catalog,
            shared,
            guard: RouteGuard::default(),
            account: gateway,
        }
    }

    /// Public link to the signed-in user's favorites, once the server has
    /// assigned a share id.
    #[must_use]
    pub fn share_url(&self) -> Option<String> {
        share_url(&self.config.share_origin, self.favorites.share_id().as_deref())
    }

    /// `POST /auth/sync` for the current session.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn sync_account(&self) -> Result<(), GatewayError> {
        if !self.session.current().is_signed_in() {
            return Err(GatewayError::NoSession);
        }
        self.account.sync_account().await
    }

    /// Start the favorites session watcher and account sync.
    #[must_use]
    pub fn spawn_background(&self) -> BackgroundTasks {
        BackgroundTasks {
            favorites: self.favorites.watch_session(),
            account_sync: spawn_account_sync(self.session.subscribe(), self.account.clone()),
        }
    }
}

/// Call `POST /auth/sync` once per sign-in. Failures are logged and ignored.
pub fn spawn_account_sync(mut session: watch::Receiver<SessionState>, account: Arc<dyn AccountGateway>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut synced_uid: Option<String> = None;
        loop {
            let uid = session.borrow_and_update().principal().map(|p| p.uid.clone());
            match uid {
                Some(uid) if synced_uid.as_deref() != Some(uid.as_str()) => {
                    match account.sync_account().await {
                        Ok(()) => tracing::info!(%uid, "account synced"),
                        Err(e) => tracing::warn!(%uid, error = %e, "account sync failed"),
                    }
                    synced_uid = Some(uid);
                }
                Some(_) => {}
                None => synced_uid = None,
            }
            if session.changed().await.is_err() {
                break;
            }
        }
    })
}
