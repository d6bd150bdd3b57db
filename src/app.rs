use crate::config::Config;
use crate::detail::{DetailSession, DetailState};
use crate::filter::filter_movies;
use crate::models::MovieSummary;
use crate::ratings::{FileStore, RatingStore, MAX_RATING};
use crate::render::{self, HomeView};
use crate::search::{SearchController, SearchSnapshot};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub ratings: RatingStore,
    pub search: Arc<SearchController>,
}

impl AppState {
    /// Wires the state together; must be called inside a tokio runtime because
    /// the search debouncer starts immediately.
    pub fn new(tmdb: Arc<dyn TmdbApi>, ratings: RatingStore, debounce: Duration) -> Self {
        let search = Arc::new(SearchController::spawn(Arc::clone(&tmdb), debounce));
        Self {
            tmdb,
            ratings,
            search,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config)?);
    let store = FileStore::new(&config.data_dir)?;
    info!("Storing ratings under {}", store.dir().display());
    let ratings = RatingStore::new(Arc::new(store));

    let state = AppState::new(tmdb, ratings, config.search_debounce);
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/dismiss", post(dismiss_error))
        .route("/movies/:id", get(movie_page))
        .route("/movies/:id/rating", post(rate_from_form))
        .route("/api/query", post(submit_query))
        .route("/api/movies", get(list_movies))
        .route("/api/movies/:id", get(movie_json))
        .route("/api/ratings", get(all_ratings))
        .route("/api/ratings/:id", get(get_rating).put(put_rating))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
pub struct HomeParams {
    pub query: Option<String>,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub genre: String,
}

async fn home(State(state): State<AppState>, Query(params): Query<HomeParams>) -> Response {
    if let Some(query) = &params.query {
        if state.search.set_query(query.clone()) {
            info!("Query changed to '{}'", query);
        }
    }
    let snapshot = state.search.snapshot();
    let genre = if params.genre.is_empty() {
        crate::genres::ALL_GENRES.to_string()
    } else {
        params.genre.clone()
    };
    let filtered = filter_movies(&snapshot.movies, &params.year, &genre);
    let cards = with_ratings(&state.ratings, filtered);
    let return_to = home_link(&snapshot.query, &params.year, &genre);

    Html(render::home_page(&HomeView {
        query: &snapshot.query,
        year: &params.year,
        genre: &genre,
        snapshot: &snapshot,
        cards: &cards,
        return_to: &return_to,
    }))
    .into_response()
}

async fn dismiss_error(State(state): State<AppState>) -> Redirect {
    state.search.dismiss_error();
    Redirect::to("/")
}

async fn movie_page(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let mut session = DetailSession::open(Arc::clone(&state.tmdb), id);
    let detail = session.settled().await;
    let rating = read_rating(&state.ratings, id);
    let status = match detail {
        DetailState::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    let html = render::detail_page(id, &detail, rating, &format!("/movies/{id}"));
    (status, Html(html)).into_response()
}

#[derive(Debug, Deserialize)]
struct RatingForm {
    rating: u8,
    return_to: Option<String>,
}

async fn rate_from_form(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RatingForm>,
) -> Response {
    if let Err(resp) = save_rating(&state.ratings, id, form.rating) {
        return resp;
    }
    let target = form
        .return_to
        .filter(|t| is_local_path(t))
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(&target).into_response()
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    query: String,
}

async fn submit_query(State(state): State<AppState>, Json(body): Json<QueryBody>) -> StatusCode {
    if state.search.set_query(body.query) {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    }
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    #[serde(default)]
    year: String,
    #[serde(default)]
    genre: String,
}

#[derive(Debug, Serialize)]
pub struct MoviesResponse {
    pub query: String,
    pub loading: bool,
    pub pending: bool,
    pub error: Option<String>,
    pub total: usize,
    pub movies: Vec<MovieSummary>,
}

async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Json<MoviesResponse> {
    let snapshot = state.search.snapshot();
    let movies = filter_movies(&snapshot.movies, &params.year, &params.genre);
    Json(MoviesResponse::new(&snapshot, movies))
}

impl MoviesResponse {
    /// Mirrors the home page: while loading, the error panel is not shown.
    fn new(snapshot: &SearchSnapshot, movies: Vec<MovieSummary>) -> Self {
        let loading = snapshot.is_loading();
        Self {
            query: snapshot.query.clone(),
            loading,
            pending: snapshot.pending,
            error: if loading { None } else { snapshot.error.clone() },
            total: snapshot.movies.len(),
            movies,
        }
    }
}

async fn movie_json(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let mut session = DetailSession::open(Arc::clone(&state.tmdb), id);
    match session.settled().await {
        DetailState::Loaded(detail) => Json(*detail).into_response(),
        DetailState::Failed(message) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
        }
        DetailState::Loading => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn all_ratings(State(state): State<AppState>) -> Response {
    match state.ratings.all() {
        Ok(all) => Json::<BTreeMap<String, u8>>(all).into_response(),
        Err(e) => {
            error!("Failed to read ratings: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingBody {
    pub rating: u8,
}

async fn get_rating(State(state): State<AppState>, Path(id): Path<i32>) -> Json<serde_json::Value> {
    let rating = read_rating(&state.ratings, id);
    Json(json!({ "movie_id": id, "rating": rating }))
}

async fn put_rating(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<RatingBody>,
) -> Response {
    match save_rating(&state.ratings, id, body.rating) {
        Ok(()) => Json(json!({ "movie_id": id, "rating": body.rating })).into_response(),
        Err(resp) => resp,
    }
}

fn save_rating(ratings: &RatingStore, id: i32, rating: u8) -> Result<(), Response> {
    if rating > MAX_RATING {
        warn!("Rejecting rating {} for movie {}", rating, id);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("rating must be between 0 and {MAX_RATING}") })),
        )
            .into_response());
    }
    ratings.set(id, rating).map_err(|e| {
        error!("Failed to save rating for movie {}: {:#}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })?;
    info!("Rated movie {} with {} stars", id, rating);
    Ok(())
}

/// Card views treat an unreadable store as "not rated".
fn read_rating(ratings: &RatingStore, id: i32) -> u8 {
    ratings.get(id).unwrap_or_else(|e| {
        warn!("Failed to read rating for movie {}: {:#}", id, e);
        0
    })
}

fn with_ratings(ratings: &RatingStore, movies: Vec<MovieSummary>) -> Vec<(MovieSummary, u8)> {
    movies
        .into_iter()
        .map(|m| {
            let rating = read_rating(ratings, m.id);
            (m, rating)
        })
        .collect()
}

fn home_link(query: &str, year: &str, genre: &str) -> String {
    format!(
        "/?query={}&year={}&genre={}",
        urlencoding::encode(query),
        urlencoding::encode(year),
        urlencoding::encode(genre)
    )
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
