//! REST implementation of the gateway traits.
//!
//! Every authenticated call asks the [`CredentialSource`] for a bearer token
//! right before sending; a signed-out source simply sends no header. Non-2xx
//! responses become [`GatewayError::Status`] carrying the body's `message`
//! field when the server provides one.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{AccountGateway, CatalogGateway, FavoritesGateway};
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::models::{FavoritesSnapshot, Movie, MovieId, PaginatedMovies, SharedList};
use crate::session::CredentialSource;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpGateway {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// fails to build.
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self, GatewayError> {
        let base_url =
            Url::parse(&config.api_base_url).map_err(|e| GatewayError::InvalidBaseUrl(format!("{}: {e}", config.api_base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(config.api_base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url, credentials })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| GatewayError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, GatewayError> {
        let request = self.http.request(method, url);
        match self.credentials.bearer_token().await? {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Ok(request),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let text = send(request).await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    async fn post_authorized<B: Serialize + Sync>(&self, segments: &[&str], body: Option<&B>) -> Result<(), GatewayError> {
        let url = self.endpoint(segments)?;
        let mut request = self.authorized(Method::POST, url).await?;
        if let Some(body) = body {
            request = request.json(body);
        }
        send(request).await.map(|_| ())
    }
}

async fn send(request: RequestBuilder) -> Result<String, GatewayError> {
    let response = request.send().await.map_err(|e| GatewayError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| GatewayError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        return Err(GatewayError::Status { status, message: error_message(&text) });
    }
    Ok(text)
}

/// Extract `{"message": "..."}` from an error body.
fn error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }
    serde_json::from_str::<ErrorBody>(body).ok()?.message
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MovieIdBody {
    movie_id: MovieId,
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

#[async_trait::async_trait]
impl FavoritesGateway for HttpGateway {
    async fn fetch_favorites(&self) -> Result<FavoritesSnapshot, GatewayError> {
        let url = self.endpoint(&["favorites"])?;
        let request = self.authorized(Method::GET, url).await?;
        self.get_json(request).await
    }

    async fn add_favorite(&self, movie_id: MovieId) -> Result<(), GatewayError> {
        self.post_authorized(&["favorites", "add"], Some(&MovieIdBody { movie_id })).await
    }

    async fn remove_favorite(&self, movie_id: MovieId) -> Result<(), GatewayError> {
        self.post_authorized(&["favorites", "remove"], Some(&MovieIdBody { movie_id })).await
    }
}

#[async_trait::async_trait]
impl CatalogGateway for HttpGateway {
    async fn trending(&self) -> Result<PaginatedMovies, GatewayError> {
        let url = self.endpoint(&["movies", "trending"])?;
        let request = self.authorized(Method::GET, url).await?;
        self.get_json(request).await
    }

    async fn search(&self, query: &str) -> Result<PaginatedMovies, GatewayError> {
        let mut url = self.endpoint(&["movies", "search"])?;
        url.query_pairs_mut().append_pair("query", query);
        let request = self.authorized(Method::GET, url).await?;
        self.get_json(request).await
    }

    async fn movie_details(&self, movie_id: MovieId) -> Result<Movie, GatewayError> {
        let id = movie_id.to_string();
        let url = self.endpoint(&["movies", "details", id.as_str()])?;
        let request = self.authorized(Method::GET, url).await?;
        self.get_json(request).await
    }

    async fn shared_list(&self, share_id: &str) -> Result<SharedList, GatewayError> {
        let url = self.endpoint(&["share", share_id])?;
        self.get_json(self.http.get(url)).await
    }
}

#[async_trait::async_trait]
impl AccountGateway for HttpGateway {
    async fn sync_account(&self) -> Result<(), GatewayError> {
        self.post_authorized::<()>(&["auth", "sync"], None).await
    }
}
