//! In-process stubs of the Remote Data Gateway and the identity provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cinefav::config::ClientConfig;
use serde_json::{Value, json};

pub const API_KEY: &str = "test-key";
/// Movie id the stub gateway refuses to add.
pub const REJECTED_MOVIE: i64 = 666;

// =============================================================================
// GATEWAY STUB
// =============================================================================

pub struct GatewayStub {
    pub favorites: Mutex<HashMap<String, Vec<i64>>>,
    pub share_ids: Mutex<HashMap<String, String>>,
    pub syncs: AtomicUsize,
    pub authorizations: Mutex<Vec<Option<String>>>,
}

impl GatewayStub {
    fn new() -> Self {
        Self {
            favorites: Mutex::new(HashMap::new()),
            share_ids: Mutex::new(HashMap::new()),
            syncs: AtomicUsize::new(0),
            authorizations: Mutex::new(Vec::new()),
        }
    }

    pub fn favorites_of(&self, uid: &str) -> Vec<i64> {
        self.favorites.lock().unwrap().get(uid).cloned().unwrap_or_default()
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    /// Uid behind `Authorization: Bearer token-<uid>`.
    fn caller(&self, headers: &HeaderMap) -> Option<String> {
        let header = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
        self.authorizations.lock().unwrap().push(header.clone());
        header?.strip_prefix("Bearer token-").map(str::to_owned)
    }

    fn share_id_for(&self, uid: &str) -> String {
        self.share_ids
            .lock()
            .unwrap()
            .entry(uid.to_owned())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone()
    }
}

fn movie(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {id}"),
        "release_date": "1999-10-15",
        "poster_path": format!("/poster{id}.jpg"),
        "backdrop_path": null,
        "overview": "",
        "vote_average": 7.5
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

type Shared = State<Arc<GatewayStub>>;

async fn list_favorites(State(stub): Shared, headers: HeaderMap) -> Response {
    let Some(uid) = stub.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    let ids = stub.favorites_of(&uid);
    let share_id = stub.share_id_for(&uid);
    Json(json!({ "movieDetails": ids.into_iter().map(movie).collect::<Vec<_>>(), "shareId": share_id })).into_response()
}

async fn add_favorite(State(stub): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let Some(uid) = stub.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    let Some(movie_id) = body["movieId"].as_i64() else {
        return error(StatusCode::BAD_REQUEST, "movieId required");
    };
    if movie_id == REJECTED_MOVIE {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Could not add favorite");
    }
    let mut favorites = stub.favorites.lock().unwrap();
    let list = favorites.entry(uid).or_default();
    if !list.contains(&movie_id) {
        list.push(movie_id);
    }
    StatusCode::OK.into_response()
}

async fn remove_favorite(State(stub): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let Some(uid) = stub.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    let movie_id = body["movieId"].as_i64().unwrap_or_default();
    stub.favorites.lock().unwrap().entry(uid).or_default().retain(|id| *id != movie_id);
    StatusCode::OK.into_response()
}

async fn trending(State(stub): Shared, headers: HeaderMap) -> Response {
    if stub.caller(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let results: Vec<Value> = (1..=20).map(movie).collect();
    Json(json!({ "page": 1, "results": results, "total_pages": 1, "total_results": 20 })).into_response()
}

async fn search(State(stub): Shared, headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if stub.caller(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let query = params.get("query").cloned().unwrap_or_default();
    let results: Vec<Value> = (1..=20).filter(|id| format!("Movie {id}").contains(&query)).map(movie).collect();
    let total = results.len();
    Json(json!({ "page": 1, "results": results, "total_pages": 1, "total_results": total })).into_response()
}

async fn details(Path(movie_id): Path<i64>) -> Response {
    if movie_id <= 0 {
        return error(StatusCode::NOT_FOUND, "Movie not found");
    }
    let mut body = movie(movie_id);
    body["runtime"] = json!(139);
    body["genres"] = json!([{ "id": 18, "name": "Drama" }]);
    body["credits"] = json!({ "cast": [], "crew": [{ "id": 7467, "job": "Director", "name": "David Fincher" }] });
    Json(body).into_response()
}

async fn shared_list(State(stub): Shared, Path(share_id): Path<String>) -> Response {
    let owner = stub.share_ids.lock().unwrap().iter().find(|(_, id)| **id == share_id).map(|(uid, _)| uid.clone());
    let Some(uid) = owner else {
        return error(StatusCode::NOT_FOUND, "Shared list not found");
    };
    let ids = stub.favorites_of(&uid);
    Json(json!({ "movieDetails": ids.into_iter().map(movie).collect::<Vec<_>>() })).into_response()
}

async fn sync_account(State(stub): Shared, headers: HeaderMap) -> Response {
    if stub.caller(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    stub.syncs.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK.into_response()
}

// =============================================================================
// IDENTITY STUB
// =============================================================================

fn provider_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": { "code": 400, "message": message } }))).into_response()
}

fn account(email: &str) -> Response {
    let uid = email.split('@').next().unwrap_or(email);
    Json(json!({
        "localId": uid,
        "email": email,
        "idToken": format!("token-{uid}"),
        "refreshToken": format!("refresh-{uid}"),
        "expiresIn": "3600"
    }))
    .into_response()
}

async fn identity(Path(action): Path<String>, Query(params): Query<HashMap<String, String>>, Json(body): Json<Value>) -> Response {
    if params.get("key").map(String::as_str) != Some(API_KEY) {
        return provider_error("API key not valid. Please pass a valid API key.");
    }
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match action.as_str() {
        "accounts:signInWithPassword" if password == "secret" => account(email),
        "accounts:signInWithPassword" => provider_error("INVALID_LOGIN_CREDENTIALS"),
        "accounts:signUp" if email.starts_with("taken@") => provider_error("EMAIL_EXISTS"),
        "accounts:signUp" if password.len() < 6 => provider_error("WEAK_PASSWORD : Password should be at least 6 characters"),
        "accounts:signUp" => account(email),
        "accounts:signInWithIdp" => Json(json!({ "errorMessage": "USER_CANCELLED" })).into_response(),
        _ => (StatusCode::NOT_FOUND, "unknown action").into_response(),
    }
}

// =============================================================================
// SERVER
// =============================================================================

pub struct Stubs {
    pub gateway: Arc<GatewayStub>,
    pub addr: SocketAddr,
}

impl Stubs {
    pub async fn start() -> Self {
        let gateway = Arc::new(GatewayStub::new());
        let api = Router::new()
            .route("/favorites", get(list_favorites))
            .route("/favorites/add", post(add_favorite))
            .route("/favorites/remove", post(remove_favorite))
            .route("/movies/trending", get(trending))
            .route("/movies/search", get(search))
            .route("/movies/details/{movie_id}", get(details))
            .route("/share/{share_id}", get(shared_list))
            .route("/auth/sync", post(sync_account))
            .with_state(gateway.clone());
        let app = Router::new().nest("/api", api).route("/v1/{action}", post(identity));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { gateway, addr }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: format!("http://{}/api", self.addr),
            identity_api_key: Some(API_KEY.to_owned()),
            identity_url: format!("http://{}/v1", self.addr),
            token_url: format!("http://{}/token", self.addr),
            share_origin: "https://cinefav.test".to_owned(),
            ..ClientConfig::default()
        }
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
