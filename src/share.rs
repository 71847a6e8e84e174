//! Public share links and the read-only shared list.

#[cfg(test)]
#[path = "share_test.rs"]
mod share_test;

use std::sync::Arc;

use crate::catalog::FetchState;
use crate::gateway::CatalogGateway;
use crate::models::Movie;

pub const MSG_SHARE_FAILED: &str = "Could not load the shared list.";
pub const MSG_SHARE_EMPTY: &str = "This favorites list is empty.";

/// `{origin}/share/{share_id}`, or `None` when there is nothing to share.
#[must_use]
pub fn share_url(origin: &str, share_id: Option<&str>) -> Option<String> {
    let share_id = share_id.map(str::trim).filter(|id| !id.is_empty())?;
    Some(format!("{}/share/{share_id}", origin.trim_end_matches('/')))
}

/// Unauthenticated view of another user's favorites.
pub struct SharedListView {
    gateway: Arc<dyn CatalogGateway>,
}

impl SharedListView {
    #[must_use]
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self { gateway }
    }

    /// Movies behind `share_id`. A blank id is never requested.
    pub async fn load(&self, share_id: &str) -> FetchState<Vec<Movie>> {
        if share_id.trim().is_empty() {
            return FetchState::Idle;
        }
        let result = self.gateway.shared_list(share_id).await;
        if let Err(e) = &result {
            tracing::warn!(%share_id, error = %e, "shared list fetch failed");
        }
        FetchState::from_result(result, MSG_SHARE_FAILED).map(|list| list.movies)
    }
}

/// Placeholder for a loaded list with no movies.
#[must_use]
pub fn empty_message(state: &FetchState<Vec<Movie>>) -> Option<&'static str> {
    state.ready().filter(|movies| movies.is_empty()).map(|_| MSG_SHARE_EMPTY)
}
