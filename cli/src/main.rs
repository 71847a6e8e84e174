use std::collections::HashMap;

use cinefav::app::{AppContext, AppError};
use cinefav::catalog::{FetchState, HomeFeed};
use cinefav::config::{ClientConfig, ConfigError};
use cinefav::error::{AuthError, GatewayError};
use cinefav::guard::{GuardView, RouteGuard};
use cinefav::login::LoginForm;
use cinefav::models::{Movie, MovieId, format_runtime};
use cinefav::session::{FederatedCredential, Principal, SessionState};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};

const MSG_FAVORITES_FAILED: &str = "Failed to load favorites.";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup failed: {0}")]
    App(#[from] AppError),
    #[error("{message}")]
    Auth {
        message: &'static str,
        #[source]
        source: AuthError,
    },
    #[error("missing credentials; pass --email and --password or set CINEFAV_EMAIL and CINEFAV_PASSWORD")]
    MissingCredentials,
    #[error("{0}")]
    Fetch(String),
    #[error("movie {0} could not be {1}")]
    MutationRejected(MovieId, &'static str),
    #[error("no share link yet; the server has not assigned a share id")]
    NoShareLink,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<AuthError> for CliError {
    fn from(source: AuthError) -> Self {
        Self::Auth { message: source.user_message(), source }
    }
}

impl From<GatewayError> for CliError {
    fn from(error: GatewayError) -> Self {
        Self::Fetch(error.message_or(MSG_FAVORITES_FAILED))
    }
}

#[derive(Parser, Debug)]
#[command(name = "cinefav", about = "Movie catalog and favorites CLI")]
struct Cli {
    #[arg(long, env = "CINEFAV_API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "CINEFAV_IDENTITY_API_KEY", hide_env_values = true)]
    identity_api_key: Option<String>,

    #[arg(long, env = "CINEFAV_IDENTITY_URL")]
    identity_url: Option<String>,

    #[arg(long, env = "CINEFAV_TOKEN_URL")]
    token_url: Option<String>,

    #[arg(long, env = "CINEFAV_SHARE_ORIGIN")]
    share_origin: Option<String>,

    #[arg(long, env = "CINEFAV_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    #[arg(long, env = "CINEFAV_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: Option<u64>,

    #[command(flatten)]
    login: LoginArgs,

    /// Repeat for more log output on stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct LoginArgs {
    #[arg(long, env = "CINEFAV_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "CINEFAV_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "CINEFAV_GOOGLE_ID_TOKEN", hide_env_values = true, help = "Sign in with a Google id token instead of a password")]
    google_id_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the signed-in user.
    Signin,
    /// Create an account and sign in.
    Signup {
        #[arg(long, env = "CINEFAV_REPEAT_PASSWORD", hide_env_values = true)]
        repeat_password: Option<String>,
    },
    /// Top trending movies.
    Trending,
    Search {
        query: String,
    },
    Details {
        movie_id: MovieId,
    },
    Favorites(FavoritesCommand),
    /// Read a public shared list. No sign-in needed.
    Shared {
        share_id: String,
    },
    /// Show where the route guard sends `path` for a given session state.
    Route {
        path: String,
        #[arg(long, value_enum, default_value_t = SessionArg::SignedOut)]
        session: SessionArg,
    },
}

#[derive(Args, Debug)]
struct FavoritesCommand {
    #[command(subcommand)]
    command: FavoritesSubcommand,
}

#[derive(Subcommand, Debug)]
enum FavoritesSubcommand {
    List,
    Add { movie_id: MovieId },
    Remove { movie_id: MovieId },
    Toggle { movie_id: MovieId },
    ShareLink,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SessionArg {
    Loading,
    SignedOut,
    SignedIn,
}

impl Cli {
    fn config(&self) -> Result<ClientConfig, ConfigError> {
        let mut vars: HashMap<&'static str, String> = HashMap::new();
        let strings = [
            ("CINEFAV_API_BASE_URL", &self.api_base_url),
            ("CINEFAV_IDENTITY_API_KEY", &self.identity_api_key),
            ("CINEFAV_IDENTITY_URL", &self.identity_url),
            ("CINEFAV_TOKEN_URL", &self.token_url),
            ("CINEFAV_SHARE_ORIGIN", &self.share_origin),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                vars.insert(key, value.clone());
            }
        }
        let numbers = [
            ("CINEFAV_REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            ("CINEFAV_CONNECT_TIMEOUT_SECS", self.connect_timeout_secs),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                vars.insert(key, value.to_string());
            }
        }
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app = AppContext::from_config(cli.config()?)?;
    match cli.command {
        Command::Signin => run_signin(&app, &cli.login).await,
        Command::Signup { repeat_password } => run_signup(&app, &cli.login, repeat_password).await,
        Command::Trending => run_home_feed(&app, &cli.login, "").await,
        Command::Search { query } => run_home_feed(&app, &cli.login, &query).await,
        Command::Details { movie_id } => run_details(&app, movie_id).await,
        Command::Favorites(favorites) => run_favorites(&app, &cli.login, favorites).await,
        Command::Shared { share_id } => run_shared(&app, &share_id).await,
        Command::Route { path, session } => run_route(&app.guard, &path, session),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();
}

// =============================================================================
// SESSION
// =============================================================================

/// Sign in through the login form so failures carry the same messages the
/// form shows.
async fn sign_in(app: &AppContext, login: &LoginArgs) -> Result<Principal, CliError> {
    let mut form = LoginForm::new();
    if let Some(token) = &login.google_id_token {
        if let Some(submission) = form.begin_federated(FederatedCredential::google(token.clone())) {
            let result = submission.run(&app.session).await;
            form.finish(&result);
            result?;
        }
    } else {
        let (Some(email), Some(password)) = (&login.email, &login.password) else {
            return Err(CliError::MissingCredentials);
        };
        form.email.clone_from(email);
        form.password.clone_from(password);
        form.submit(&app.session).await?;
    }
    signed_in_principal(app)
}

fn signed_in_principal(app: &AppContext) -> Result<Principal, CliError> {
    match app.session.current() {
        SessionState::SignedIn(principal) => Ok(principal),
        _ => Err(CliError::MissingCredentials),
    }
}

async fn sync_account(app: &AppContext) {
    if let Err(e) = app.sync_account().await {
        tracing::warn!(error = %e, "account sync failed");
    }
}

fn principal_json(principal: &Principal) -> Value {
    json!({
        "uid": principal.uid,
        "email": principal.email,
        "photoUrl": principal.photo_url,
    })
}

async fn run_signin(app: &AppContext, login: &LoginArgs) -> Result<(), CliError> {
    let principal = sign_in(app, login).await?;
    sync_account(app).await;
    print_json(&principal_json(&principal))
}

async fn run_signup(app: &AppContext, login: &LoginArgs, repeat_password: Option<String>) -> Result<(), CliError> {
    let (Some(email), Some(password)) = (&login.email, &login.password) else {
        return Err(CliError::MissingCredentials);
    };
    let mut form = LoginForm::new();
    form.toggle_mode();
    form.email.clone_from(email);
    form.password.clone_from(password);
    form.repeat_password = repeat_password.unwrap_or_else(|| password.clone());
    form.submit(&app.session).await?;

    let principal = signed_in_principal(app)?;
    sync_account(app).await;
    print_json(&principal_json(&principal))
}

// =============================================================================
// CATALOG
// =============================================================================

fn card_json(movie: &Movie) -> Value {
    json!({
        "id": movie.id,
        "title": movie.title,
        "year": movie.release_year(),
        "image": movie.card_image_url(),
    })
}

fn details_json(movie: &Movie) -> Value {
    let release = movie.regional_release("BR");
    json!({
        "id": movie.id,
        "title": movie.title,
        "year": movie.release_year(),
        "rating": format!("{}%", movie.rating_percent()),
        "genres": movie.genre_names(),
        "runtime": format_runtime(movie.runtime),
        "directors": movie.directors(),
        "releaseDate": release.date,
        "certification": release.certification,
        "poster": movie.poster_url(),
        "overview": movie.overview,
    })
}

fn ready<T>(state: FetchState<T>) -> Result<T, CliError> {
    match state {
        FetchState::Ready(value) => Ok(value),
        FetchState::Failed(message) => Err(CliError::Fetch(message)),
        FetchState::Idle | FetchState::Loading => Err(CliError::MissingCredentials),
    }
}

async fn run_home_feed(app: &AppContext, login: &LoginArgs, query: &str) -> Result<(), CliError> {
    sign_in(app, login).await?;
    let feed: HomeFeed = ready(app.catalog.home_feed(query).await)?;
    let movies: Vec<Value> = feed.movies.iter().map(card_json).collect();
    print_json(&json!({
        "title": feed.title,
        "movies": movies,
        "message": feed.empty_message(),
    }))
}

async fn run_details(app: &AppContext, movie_id: MovieId) -> Result<(), CliError> {
    let movie = ready(app.catalog.movie_details(movie_id).await)?;
    print_json(&details_json(&movie))
}

async fn run_shared(app: &AppContext, share_id: &str) -> Result<(), CliError> {
    app.session.finish_loading();
    let state = app.shared.load(share_id).await;
    let message = cinefav::share::empty_message(&state);
    let movies = ready(state)?;
    let movies: Vec<Value> = movies.iter().map(card_json).collect();
    print_json(&json!({ "shareId": share_id, "movies": movies, "message": message }))
}

// =============================================================================
// FAVORITES
// =============================================================================

fn favorites_json(app: &AppContext) -> Value {
    let movies: Vec<Value> = app.favorites.favorite_movies().iter().map(card_json).collect();
    json!({
        "movies": movies,
        "shareId": app.favorites.share_id(),
        "shareUrl": app.share_url(),
    })
}

async fn run_favorites(app: &AppContext, login: &LoginArgs, favorites: FavoritesCommand) -> Result<(), CliError> {
    sign_in(app, login).await?;
    app.favorites.refresh().await?;

    match favorites.command {
        FavoritesSubcommand::List => print_json(&favorites_json(app)),
        FavoritesSubcommand::Add { movie_id } => {
            add(app, movie_id).await?;
            print_json(&favorites_json(app))
        }
        FavoritesSubcommand::Remove { movie_id } => {
            remove(app, movie_id).await?;
            print_json(&favorites_json(app))
        }
        FavoritesSubcommand::Toggle { movie_id } => {
            if app.favorites.is_favorite(movie_id) {
                remove(app, movie_id).await?;
            } else {
                add(app, movie_id).await?;
            }
            print_json(&json!({ "movieId": movie_id, "favorite": app.favorites.is_favorite(movie_id) }))
        }
        FavoritesSubcommand::ShareLink => {
            let url = app.share_url().ok_or(CliError::NoShareLink)?;
            println!("{url}");
            Ok(())
        }
    }
}

/// The store rolls back on failure, so membership after settling tells
/// whether the server accepted the change.
async fn add(app: &AppContext, movie_id: MovieId) -> Result<(), CliError> {
    let movie = ready(app.catalog.movie_details(movie_id).await)?;
    app.favorites.add_favorite(movie).await;
    if app.favorites.is_favorite(movie_id) {
        Ok(())
    } else {
        Err(CliError::MutationRejected(movie_id, "added"))
    }
}

async fn remove(app: &AppContext, movie_id: MovieId) -> Result<(), CliError> {
    let was_favorite = app.favorites.is_favorite(movie_id);
    app.favorites.remove_favorite(movie_id).await;
    if was_favorite && app.favorites.is_favorite(movie_id) {
        Err(CliError::MutationRejected(movie_id, "removed"))
    } else {
        Ok(())
    }
}

// =============================================================================
// ROUTING
// =============================================================================

fn run_route(guard: &RouteGuard, path: &str, session: SessionArg) -> Result<(), CliError> {
    let state = match session {
        SessionArg::Loading => SessionState::Loading,
        SessionArg::SignedOut => SessionState::SignedOut,
        SessionArg::SignedIn => SessionState::SignedIn(Principal { uid: "cli".into(), email: None, photo_url: None }),
    };
    let outcome = guard.evaluate(&state, path);
    print_json(&json!({
        "path": path,
        "class": format!("{:?}", guard.routes().classify(path)),
        "view": match outcome.view {
            GuardView::Loading => "loading",
            GuardView::Children => "children",
        },
        "redirect": outcome.redirect,
    }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
