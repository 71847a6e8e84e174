//! Favorites cache with optimistic mutations.
//!
//! DESIGN
//! ======
//! The store is the single source of truth for "is movie X a favorite" and
//! "what is my share link". State lives in a `watch` channel keyed by
//! [`FAVORITES_KEY`]; subscribers re-render on every publish.
//!
//! Each mutation runs in two phases:
//! 1. `begin` (synchronous, on the caller's stack): capture the current state
//!    as the rollback target, compute the replacement snapshot and publish it.
//! 2. `settle` (the returned future): call the gateway; on success keep the
//!    optimistic state, on failure log and restore the captured state.
//!
//! Because phase 1 completes before `add_favorite`/`remove_favorite`/
//! `toggle_favorite` return, a second toggle on the same movie always sees
//! the first one's optimistic state (last-invoked wins).
//!
//! CONCURRENCY
//! ===========
//! No queue and no lock around the network call. Rollback restores the state
//! captured by that specific mutation, not the state at settlement. Two
//! in-flight mutations on different movies can therefore interleave so that a
//! late failure reverts a newer successful mutation's optimistic entry. That
//! race is tolerated; `favorites_test.rs` pins the behavior. A rollback or
//! fetch that settles after the session changed is dropped, so one user's
//! data never lands in another user's cache.

#[cfg(test)]
#[path = "favorites_test.rs"]
mod favorites_test;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::GatewayError;
use crate::gateway::FavoritesGateway;
use crate::models::{FavoritesSnapshot, Movie, MovieId};
use crate::session::SessionState;

/// Stable cache key for the signed-in user's favorites.
pub const FAVORITES_KEY: &str = "/favorites";

// =============================================================================
// STATE
// =============================================================================

/// A snapshot plus its membership set, built once per snapshot.
#[derive(Clone, Debug)]
pub struct FavoritesView {
    snapshot: Arc<FavoritesSnapshot>,
    ids: Arc<HashSet<MovieId>>,
}

impl FavoritesView {
    #[must_use]
    pub fn new(snapshot: FavoritesSnapshot) -> Self {
        let ids = snapshot.movies.iter().map(|m| m.id).collect();
        Self { snapshot: Arc::new(snapshot), ids: Arc::new(ids) }
    }

    #[must_use]
    pub fn snapshot(&self) -> &Arc<FavoritesSnapshot> {
        &self.snapshot
    }

    #[must_use]
    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.ids.contains(&movie_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Observable state of the favorites cache.
#[derive(Clone, Debug, Default)]
pub enum FavoritesState {
    /// No session: nothing is fetched and every query answers "absent".
    #[default]
    NoSession,
    /// Session present, first fetch in flight.
    Loading,
    Loaded(FavoritesView),
    /// First fetch failed; no data to show.
    Failed(GatewayError),
}

impl FavoritesState {
    #[must_use]
    pub fn view(&self) -> Option<&FavoritesView> {
        match self {
            Self::Loaded(view) => Some(view),
            _ => None,
        }
    }
}

enum Mutation {
    Add(Movie),
    Remove(MovieId),
}

impl Mutation {
    fn movie_id(&self) -> MovieId {
        match self {
            Self::Add(movie) => movie.id,
            Self::Remove(id) => *id,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
        }
    }

    /// Replacement snapshot; `share_id` is carried over unchanged.
    fn apply(&self, base: &FavoritesSnapshot) -> FavoritesSnapshot {
        let mut movies = base.movies.clone();
        match self {
            Self::Add(movie) => {
                if !base.contains(movie.id) {
                    movies.push(movie.clone());
                }
            }
            Self::Remove(id) => movies.retain(|m| m.id != *id),
        }
        FavoritesSnapshot { movies, share_id: base.share_id.clone() }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Cheaply cloneable handle to one favorites cache instance.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<dyn FavoritesGateway>,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<FavoritesState>,
    /// Set when the next read should trigger a fetch.
    stale: AtomicBool,
    /// Bumped by every mutation; a fetch that overlaps a mutation is dropped.
    version: AtomicU64,
    /// Bumped whenever a session change purges the cache. Work begun under an
    /// older epoch never publishes.
    epoch: AtomicU64,
}

/// The session a fetch or mutation started under.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SessionKey {
    epoch: u64,
    uid: Option<String>,
}

impl FavoritesStore {
    #[must_use]
    pub fn new(gateway: Arc<dyn FavoritesGateway>, session: watch::Receiver<SessionState>) -> Self {
        let (state, _) = watch::channel(FavoritesState::NoSession);
        Self {
            inner: Arc::new(Inner {
                gateway,
                session,
                state,
                stale: AtomicBool::new(true),
                version: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        FAVORITES_KEY
    }

    /// Receiver notified on every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> FavoritesState {
        if !self.has_session() {
            return FavoritesState::NoSession;
        }
        self.inner.state.borrow().clone()
    }

    fn has_session(&self) -> bool {
        self.inner.session.borrow().is_signed_in()
    }

    fn session_key(&self) -> SessionKey {
        SessionKey {
            epoch: self.inner.epoch.load(Ordering::SeqCst),
            uid: self.inner.session.borrow().principal().map(|p| p.uid.clone()),
        }
    }

    fn current_view(&self) -> Option<FavoritesView> {
        if !self.has_session() {
            return None;
        }
        self.inner.state.borrow().view().cloned()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Current snapshot, or `None` without a session or before the first
    /// fetch resolves. Starts a background fetch when the cache is stale.
    #[must_use]
    pub fn get_snapshot(&self) -> Option<Arc<FavoritesSnapshot>> {
        if !self.has_session() {
            return None;
        }
        self.revalidate_if_stale();
        self.current_view().map(|view| view.snapshot)
    }

    /// Membership test against the derived id set. Never touches the network.
    #[must_use]
    pub fn is_favorite(&self, movie_id: MovieId) -> bool {
        self.current_view().is_some_and(|view| view.contains(movie_id))
    }

    /// Favorite movies in server order; empty when absent.
    #[must_use]
    pub fn favorite_movies(&self) -> Vec<Movie> {
        self.current_view().map(|view| view.snapshot.movies.clone()).unwrap_or_default()
    }

    /// Share token, when the server has assigned a non-empty one.
    #[must_use]
    pub fn share_id(&self) -> Option<String> {
        self.current_view()
            .map(|view| view.snapshot.share_id.clone())
            .filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.state(), FavoritesState::Loading)
    }

    /// Mark the cache stale; the next [`get_snapshot`](Self::get_snapshot)
    /// fetches again.
    pub fn invalidate(&self) {
        self.inner.stale.store(true, Ordering::SeqCst);
    }

    fn revalidate_if_stale(&self) {
        if !self.inner.stale.swap(false, Ordering::SeqCst) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = FAVORITES_KEY, "no async runtime; favorites fetch deferred");
            self.inner.stale.store(true, Ordering::SeqCst);
            return;
        };
        self.mark_loading();
        let store = self.clone();
        runtime.spawn(async move {
            if let Err(e) = store.refresh().await {
                tracing::warn!(key = FAVORITES_KEY, error = %e, "background favorites fetch failed");
            }
        });
    }

    fn mark_loading(&self) {
        self.inner.state.send_if_modified(|state| {
            if matches!(state, FavoritesState::NoSession | FavoritesState::Failed(_)) {
                *state = FavoritesState::Loading;
                true
            } else {
                false
            }
        });
    }

    /// Fetch the snapshot from the gateway and publish it.
    ///
    /// Without a session this publishes `NoSession` and makes no call. A fetch
    /// that overlaps a mutation or a session change is discarded and the cache
    /// stays stale, so the next read fetches again. A failure with no cached data publishes `Failed`; with
    /// cached data the cache is kept.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after publishing it.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        if !self.has_session() {
            self.inner.state.send_replace(FavoritesState::NoSession);
            return Ok(());
        }
        self.inner.stale.store(false, Ordering::SeqCst);
        self.mark_loading();
        let version = self.inner.version.load(Ordering::SeqCst);
        let session = self.session_key();

        let result = self.inner.gateway.fetch_favorites().await;

        if self.session_key() != session {
            tracing::debug!(key = FAVORITES_KEY, "discarding fetch from a previous session");
            self.invalidate();
            return Ok(());
        }
        if self.inner.version.load(Ordering::SeqCst) != version {
            tracing::debug!(key = FAVORITES_KEY, "discarding fetch that overlapped a mutation");
            self.invalidate();
            return Ok(());
        }
        match result {
            Ok(snapshot) => {
                tracing::debug!(key = FAVORITES_KEY, count = snapshot.movies.len(), "favorites fetched");
                self.inner.state.send_replace(FavoritesState::Loaded(FavoritesView::new(snapshot)));
                Ok(())
            }
            Err(e) => {
                self.inner.state.send_if_modified(|state| {
                    if state.view().is_some() {
                        false
                    } else {
                        *state = FavoritesState::Failed(e.clone());
                        true
                    }
                });
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Optimistically add `movie`, then confirm with the gateway.
    ///
    /// The optimistic state is published before this returns. The returned
    /// future performs the gateway call; it never fails, a rejected call rolls
    /// the cache back instead.
    pub fn add_favorite(&self, movie: Movie) -> impl Future<Output = ()> + Send + use<> {
        let pending = self.begin(Mutation::Add(movie));
        settle(pending)
    }

    /// Optimistically remove `movie_id`, then confirm with the gateway.
    ///
    /// Same contract as [`add_favorite`](Self::add_favorite).
    pub fn remove_favorite(&self, movie_id: MovieId) -> impl Future<Output = ()> + Send + use<> {
        let pending = self.begin(Mutation::Remove(movie_id));
        settle(pending)
    }

    /// Remove `movie` if it is a favorite in the latest optimistic state,
    /// otherwise add it.
    pub fn toggle_favorite(&self, movie: &Movie) -> impl Future<Output = ()> + Send + use<> {
        let mutation = if self.is_favorite(movie.id) {
            Mutation::Remove(movie.id)
        } else {
            Mutation::Add(movie.clone())
        };
        settle(self.begin(mutation))
    }

    fn begin(&self, mutation: Mutation) -> Option<PendingMutation> {
        if !self.has_session() {
            tracing::debug!(movie_id = mutation.movie_id(), op = mutation.label(), "favorites mutation ignored: no session");
            return None;
        }
        let stamp = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.inner.state.borrow().clone();
        let base = previous.view().map(|view| view.snapshot.as_ref().clone()).unwrap_or_default();
        let next = mutation.apply(&base);
        self.inner.state.send_replace(FavoritesState::Loaded(FavoritesView::new(next)));
        let session = self.session_key();
        Some(PendingMutation { store: self.clone(), mutation, previous, stamp, session })
    }

    /// Re-evaluate on every session change: purge on sign-out, refetch on
    /// sign-in.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut session = self.inner.session.clone();
        tokio::spawn(async move {
            let mut last_uid = session.borrow_and_update().principal().map(|p| p.uid.clone());
            store.apply_session(last_uid.as_deref(), None);
            while session.changed().await.is_ok() {
                let uid = session.borrow_and_update().principal().map(|p| p.uid.clone());
                if uid != last_uid {
                    store.apply_session(uid.as_deref(), last_uid.as_deref());
                    last_uid = uid;
                }
            }
        })
    }

    fn apply_session(&self, uid: Option<&str>, previous_uid: Option<&str>) {
        match uid {
            None => {
                self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                self.inner.state.send_replace(FavoritesState::NoSession);
                self.invalidate();
                if previous_uid.is_some() {
                    tracing::debug!(key = FAVORITES_KEY, "session ended; favorites cache purged");
                }
            }
            Some(uid) => {
                if previous_uid.is_some() {
                    self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                    self.inner.state.send_replace(FavoritesState::NoSession);
                }
                tracing::debug!(key = FAVORITES_KEY, %uid, "session started; fetching favorites");
                self.invalidate();
                self.revalidate_if_stale();
            }
        }
    }
}

// =============================================================================
// SETTLEMENT
// =============================================================================

struct PendingMutation {
    store: FavoritesStore,
    mutation: Mutation,
    /// State right before this mutation's optimistic publish.
    previous: FavoritesState,
    stamp: u64,
    session: SessionKey,
}

async fn settle(pending: Option<PendingMutation>) {
    let Some(PendingMutation { store, mutation, previous, stamp, session }) = pending else {
        return;
    };
    let movie_id = mutation.movie_id();
    let gateway = &store.inner.gateway;
    let result = match &mutation {
        Mutation::Add(movie) => gateway.add_favorite(movie.id).await,
        Mutation::Remove(id) => gateway.remove_favorite(*id).await,
    };
    match result {
        Ok(()) => {
            tracing::debug!(movie_id, op = mutation.label(), stamp, "favorites mutation confirmed");
        }
        Err(e) => {
            tracing::warn!(movie_id, op = mutation.label(), stamp, error = %e, "favorites mutation failed");
            if store.session_key() != session {
                tracing::debug!(movie_id, op = mutation.label(), stamp, "session changed; rollback skipped");
                return;
            }
            // Rolling back to Loading or Failed leaves no fetch to finish it.
            let refetch = previous.view().is_none();
            store.inner.state.send_replace(previous);
            if refetch {
                store.invalidate();
            }
        }
    }
}
