//! Catalog reads: home feed, search and movie details.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read-only views over the Remote Data Gateway. Results surface as a
//! [`FetchState`] the presentation layer renders directly; failures become an
//! inline message and are never retried automatically. Successful responses
//! are kept in a request-keyed [`ResponseCache`] so revisiting a view does not
//! refetch.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::error::GatewayError;
use crate::gateway::CatalogGateway;
use crate::models::{Movie, MovieId, PaginatedMovies};
use crate::session::SessionState;

/// Trending movies shown on the home feed.
pub const TRENDING_LIMIT: usize = 8;
/// Queries at or below this many characters fall back to trending.
pub const MIN_QUERY_CHARS: usize = 2;

pub const MSG_MOVIES_FAILED: &str = "Failed to load movies.";
pub const MSG_DETAILS_FAILED: &str = "Failed to load movie details.";
pub const MSG_NO_RESULTS: &str = "No results found.";

// =============================================================================
// FETCH STATE
// =============================================================================

/// Observable outcome of a read.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FetchState<T> {
    /// Not requested, e.g. no session.
    #[default]
    Idle,
    Loading,
    Ready(T),
    /// User-facing error message.
    Failed(String),
}

impl<T> FetchState<T> {
    /// Map a gateway result, preferring the server's message over `fallback`.
    pub fn from_result(result: Result<T, GatewayError>, fallback: &str) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed(e.message_or(fallback)),
        }
    }

    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchState<U> {
        match self {
            Self::Idle => FetchState::Idle,
            Self::Loading => FetchState::Loading,
            Self::Ready(value) => FetchState::Ready(f(value)),
            Self::Failed(message) => FetchState::Failed(message),
        }
    }
}

// =============================================================================
// RESPONSE CACHE
// =============================================================================

/// Successful responses keyed by request path plus query.
pub struct ResponseCache<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<T: Clone> ResponseCache<T> {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), value);
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// HOME FEED
// =============================================================================

/// What the home page lists for the current query.
#[derive(Clone, Debug, PartialEq)]
pub struct HomeFeed {
    pub title: String,
    pub movies: Vec<Movie>,
    pub searching: bool,
}

impl HomeFeed {
    /// Shown in place of the grid when a search matched nothing.
    #[must_use]
    pub fn empty_message(&self) -> Option<&'static str> {
        (self.searching && self.movies.is_empty()).then_some(MSG_NO_RESULTS)
    }
}

/// Whether `query` is long enough to run a search instead of trending.
#[must_use]
pub fn is_search_query(query: &str) -> bool {
    query.chars().count() > MIN_QUERY_CHARS
}

#[must_use]
pub fn trending_key() -> String {
    "/movies/trending".to_owned()
}

#[must_use]
pub fn search_key(query: &str) -> String {
    format!("/movies/search?query={query}")
}

#[must_use]
pub fn details_key(movie_id: MovieId) -> String {
    format!("/movies/details/{movie_id}")
}

// =============================================================================
// CATALOG
// =============================================================================

pub struct Catalog {
    gateway: Arc<dyn CatalogGateway>,
    session: watch::Receiver<SessionState>,
    lists: ResponseCache<PaginatedMovies>,
    details: ResponseCache<Movie>,
}

impl Catalog {
    #[must_use]
    pub fn new(gateway: Arc<dyn CatalogGateway>, session: watch::Receiver<SessionState>) -> Self {
        Self { gateway, session, lists: ResponseCache::default(), details: ResponseCache::default() }
    }

    fn has_session(&self) -> bool {
        self.session.borrow().is_signed_in()
    }

    /// Home feed for `query`: search results when the query is long enough,
    /// otherwise the top trending movies. `Idle` without a session.
    pub async fn home_feed(&self, query: &str) -> FetchState<HomeFeed> {
        if !self.has_session() {
            return FetchState::Idle;
        }
        if is_search_query(query) {
            let result = self.search(query).await;
            FetchState::from_result(result, MSG_MOVIES_FAILED).map(|page| HomeFeed {
                title: format!("Found {} results for \"{query}\"", page.total_results),
                movies: page.results,
                searching: true,
            })
        } else {
            let result = self.trending().await;
            FetchState::from_result(result, MSG_MOVIES_FAILED).map(|page| HomeFeed {
                title: "Trending".to_owned(),
                movies: page.results.into_iter().take(TRENDING_LIMIT).collect(),
                searching: false,
            })
        }
    }

    /// # Errors
    ///
    /// Returns the gateway error; failures are not cached.
    pub async fn trending(&self) -> Result<PaginatedMovies, GatewayError> {
        let key = trending_key();
        if let Some(hit) = self.lists.get(&key) {
            return Ok(hit);
        }
        let page = self.gateway.trending().await?;
        tracing::debug!(%key, count = page.results.len(), "catalog response cached");
        self.lists.insert(key, page.clone());
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns the gateway error; failures are not cached.
    pub async fn search(&self, query: &str) -> Result<PaginatedMovies, GatewayError> {
        let key = search_key(query);
        if let Some(hit) = self.lists.get(&key) {
            return Ok(hit);
        }
        let page = self.gateway.search(query).await?;
        tracing::debug!(%key, count = page.results.len(), "catalog response cached");
        self.lists.insert(key, page.clone());
        Ok(page)
    }

    /// Full movie record for the detail view.
    pub async fn movie_details(&self, movie_id: MovieId) -> FetchState<Movie> {
        let key = details_key(movie_id);
        if let Some(hit) = self.details.get(&key) {
            return FetchState::Ready(hit);
        }
        let result = self.gateway.movie_details(movie_id).await;
        match &result {
            Ok(movie) => self.details.insert(key, movie.clone()),
            Err(e) => tracing::warn!(movie_id, error = %e, "movie details fetch failed"),
        }
        FetchState::from_result(result, MSG_DETAILS_FAILED)
    }

    /// Drop cached responses, forcing the next read to hit the gateway.
    pub fn clear(&self) {
        self.lists.clear();
        self.details.clear();
    }
}
