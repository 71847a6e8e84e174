//! Remote Data Gateway seams.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway wraps the movie catalog and owns user favorites server-side.
//! Each concern gets its own trait so the favorites cache, catalog views and
//! account sync can be tested against small doubles. `http` implements all of
//! them over REST.

pub mod http;

use crate::error::GatewayError;
use crate::models::{FavoritesSnapshot, Movie, MovieId, PaginatedMovies, SharedList};

/// User-scoped favorites CRUD. Add and remove are idempotent server-side.
#[async_trait::async_trait]
pub trait FavoritesGateway: Send + Sync {
    /// `GET /favorites`
    async fn fetch_favorites(&self) -> Result<FavoritesSnapshot, GatewayError>;
    /// `POST /favorites/add`
    async fn add_favorite(&self, movie_id: MovieId) -> Result<(), GatewayError>;
    /// `POST /favorites/remove`
    async fn remove_favorite(&self, movie_id: MovieId) -> Result<(), GatewayError>;
}

/// Read-only catalog queries plus the public shared-list read.
#[async_trait::async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn trending(&self) -> Result<PaginatedMovies, GatewayError>;
    async fn search(&self, query: &str) -> Result<PaginatedMovies, GatewayError>;
    async fn movie_details(&self, movie_id: MovieId) -> Result<Movie, GatewayError>;
    /// Unauthenticated.
    async fn shared_list(&self, share_id: &str) -> Result<SharedList, GatewayError>;
}

/// Account bookkeeping performed after sign-in.
#[async_trait::async_trait]
pub trait AccountGateway: Send + Sync {
    /// `POST /auth/sync`
    async fn sync_account(&self) -> Result<(), GatewayError>;
}
