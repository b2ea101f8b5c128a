//! In-memory show-tracker API used by the client integration tests.
//!
//! Every route lives under `/api`. Errors use the `{"error": "..."}` envelope.
//! `AppState::fail_path` makes a path answer 500 until cleared, which is how
//! tests exercise partial failures.

pub mod seed;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use seed::{Actor, Episode, Role, Show};

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "password123";

const DEFAULT_PER_PAGE: u32 = 12;
const MAX_PER_PAGE: u32 = 100;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub email_notifications: bool,
    pub created_at: String,
}

#[derive(Clone, Debug)]
struct FavoriteRow {
    id: u64,
    user_id: u64,
    tv_show_id: u64,
    created_at: String,
}

pub struct Db {
    shows: Vec<Show>,
    episodes: Vec<Episode>,
    actors: Vec<Actor>,
    roles: Vec<Role>,
    users: Vec<User>,
    tokens: HashMap<String, u64>,
    favorites: Vec<FavoriteRow>,
    next_id: u64,
    clock: u64,
}

impl Db {
    fn seeded() -> Self {
        let mut db = Self {
            shows: seed::shows(),
            episodes: seed::episodes(),
            actors: seed::actors(),
            roles: seed::roles(),
            users: Vec::new(),
            tokens: HashMap::new(),
            favorites: Vec::new(),
            next_id: 1,
            clock: 0,
        };
        let created_at = db.now();
        let id = db.next_id();
        db.users.push(User {
            id,
            username: DEMO_USERNAME.to_string(),
            email: "demo@example.test".to_string(),
            password: DEMO_PASSWORD.to_string(),
            email_notifications: true,
            created_at,
        });
        db
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Monotonic fake timestamp.
    fn now(&mut self) -> String {
        self.clock += 1;
        format!("2025-06-01T12:{:02}:{:02}", (self.clock / 60) % 60, self.clock % 60)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<u64, ErrorReply> {
        let token = bearer(headers)
            .ok_or_else(|| ErrorReply::unauthorized("Missing authorization header"))?;
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| ErrorReply::unauthorized("Invalid or expired token"))
    }

    fn user(&self, id: u64) -> Result<&User, ErrorReply> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| ErrorReply::not_found("User not found"))
    }

    fn show(&self, id: u64) -> Result<&Show, ErrorReply> {
        self.shows
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ErrorReply::not_found("TV show not found"))
    }

    fn actor(&self, id: u64) -> Result<&Actor, ErrorReply> {
        self.actors
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ErrorReply::not_found("Actor not found"))
    }

    fn favorites_of(&self, user_id: u64) -> impl Iterator<Item = &FavoriteRow> {
        self.favorites.iter().filter(move |f| f.user_id == user_id)
    }

    fn favorite_json(&self, row: &FavoriteRow) -> Value {
        json!({
            "id": row.id,
            "tv_show_id": row.tv_show_id,
            "tv_show": self.shows.iter().find(|s| s.id == row.tv_show_id),
            "created_at": row.created_at,
        })
    }

    /// Favorite counts per genre, largest first.
    fn genre_counts(&self, user_id: u64) -> Vec<(String, u64)> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for row in self.favorites_of(user_id) {
            if let Some(show) = self.shows.iter().find(|s| s.id == row.tv_show_id) {
                *counts.entry(show.genre.clone()).or_default() += 1;
            }
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

/// Shared server state. Clones share the same database and failure set.
#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    failures: Arc<Mutex<HashSet<String>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            db: Arc::new(RwLock::new(Db::seeded())),
            failures: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Answer 500 for every request to `path` (full path, e.g.
    /// `/api/tvshows/7/episodes`) until `clear_failures`.
    pub fn fail_path(&self, path: &str) {
        self.failures_lock().insert(path.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures_lock().clear();
    }

    fn should_fail(&self, path: &str) -> bool {
        self.failures_lock().contains(path)
    }

    fn failures_lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct ErrorReply {
    status: StatusCode,
    message: String,
}

impl ErrorReply {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type Reply = Result<Json<Value>, ErrorReply>;

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/tvshows", get(list_shows))
        .route("/tvshows/genres", get(genres))
        .route("/tvshows/types", get(show_types))
        .route("/tvshows/recommendations", get(recommendations))
        .route("/tvshows/favorites", get(list_favorites))
        .route("/tvshows/favorites/{id}", post(add_favorite).delete(remove_favorite))
        .route("/tvshows/{id}", get(get_show))
        .route("/tvshows/{id}/episodes", get(show_episodes))
        .route("/tvshows/{id}/actors", get(show_cast))
        .route("/actors", get(list_actors))
        .route("/actors/search", get(search_actors))
        .route("/actors/{id}", get(get_actor))
        .route("/actors/{id}/tvshows", get(actor_shows))
        .route("/users/profile", get(profile).put(update_profile))
        .route("/users/stats", get(stats))
        .route("/users/gdpr/data", get(export_data))
        .route("/users/gdpr/data/csv", get(export_csv))
        .route("/users/gdpr/delete-account", delete(delete_account));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), inject_failures))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn inject_failures(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if state.should_fail(path) {
        warn!(path, "injected failure");
        return ErrorReply::new(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure")
            .into_response();
    }
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Slice one page out of `items` and build the pagination block.
fn paginate<T: Clone>(items: &[T], page: Option<u32>, per_page: Option<u32>) -> (Vec<T>, Value) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let total = items.len();
    let pages = total.div_ceil(per_page as usize);
    let start = (page as usize - 1).saturating_mul(per_page as usize);
    let slice = items.iter().skip(start).take(per_page as usize).cloned().collect();
    let pagination = json!({
        "page": page,
        "pages": pages,
        "per_page": per_page,
        "total": total,
        "has_prev": page > 1,
        "has_next": (page as usize) < pages,
    });
    (slice, pagination)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Present and not blank.
fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// --- auth ---

#[derive(Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ErrorReply> {
    if input.username.trim().is_empty()
        || input.email.trim().is_empty()
        || input.password.is_empty()
    {
        return Err(ErrorReply::bad_request("Username, email and password are required"));
    }
    let mut db = state.db.write().await;
    if db.users.iter().any(|u| u.username == input.username) {
        return Err(ErrorReply::bad_request("Username already exists"));
    }
    if db.users.iter().any(|u| u.email == input.email) {
        return Err(ErrorReply::bad_request("Email already exists"));
    }
    let created_at = db.now();
    let user = User {
        id: db.next_id(),
        username: input.username,
        email: input.email,
        password: input.password,
        email_notifications: true,
        created_at,
    };
    info!(username = %user.username, "registered");
    db.users.push(user.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> Reply {
    let mut db = state.db.write().await;
    let user = db
        .users
        .iter()
        .find(|u| u.username == input.username && u.password == input.password)
        .cloned()
        .ok_or_else(|| ErrorReply::unauthorized("Invalid credentials"))?;
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone(), user.id);
    info!(username = %user.username, "logged in");
    Ok(Json(json!({ "access_token": token, "user": user })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let mut db = state.db.write().await;
    db.authorize(&headers)?;
    if let Some(token) = bearer(&headers) {
        db.tokens.remove(token);
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let user = db.user(db.authorize(&headers)?)?;
    Ok(Json(json!({ "user": user })))
}

// --- shows ---

#[derive(Deserialize, Default)]
pub struct ShowQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn list_shows(State(state): State<AppState>, Query(query): Query<ShowQuery>) -> Reply {
    let db = state.db.read().await;
    let mut shows: Vec<Show> = db
        .shows
        .iter()
        .filter(|s| {
            given(&query.search)
                .map_or(true, |q| contains_ci(&s.title, q) || contains_ci(&s.description, q))
                && given(&query.genre).map_or(true, |g| s.genre == g)
                && given(&query.show_type).map_or(true, |t| s.show_type == t)
                && given(&query.status).map_or(true, |st| s.status == st)
        })
        .cloned()
        .collect();

    shows.sort_by(|a, b| {
        let ord = match query.sort_by.as_deref() {
            Some("title") => a.title.cmp(&b.title),
            Some("rating") => a.rating.total_cmp(&b.rating),
            Some("release_date") => a.release_date.cmp(&b.release_date),
            _ => a.created_at.cmp(&b.created_at),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
    if query.sort_order.as_deref() != Some("asc") {
        shows.reverse();
    }

    let (page, pagination) = paginate(&shows, query.page, query.per_page);
    debug!(total = shows.len(), "listed shows");
    Ok(Json(json!({ "tv_shows": page, "pagination": pagination })))
}

async fn get_show(State(state): State<AppState>, Path(id): Path<u64>) -> Reply {
    let db = state.db.read().await;
    Ok(Json(json!({ "tv_show": db.show(id)? })))
}

async fn show_episodes(State(state): State<AppState>, Path(id): Path<u64>) -> Reply {
    let db = state.db.read().await;
    db.show(id)?;
    let episodes: Vec<&Episode> = db.episodes.iter().filter(|e| e.tv_show_id == id).collect();
    Ok(Json(json!({ "episodes": episodes })))
}

async fn show_cast(State(state): State<AppState>, Path(id): Path<u64>) -> Reply {
    let db = state.db.read().await;
    db.show(id)?;
    let cast: Vec<Value> = db
        .roles
        .iter()
        .filter(|r| r.tv_show_id == id)
        .map(|r| {
            json!({
                "id": r.id,
                "actor_id": r.actor_id,
                "role": r.role,
                "is_main_cast": r.is_main_cast,
                "actor": db.actors.iter().find(|a| a.id == r.actor_id),
            })
        })
        .collect();
    Ok(Json(json!({ "actors": cast })))
}

async fn genres(State(state): State<AppState>) -> Reply {
    let db = state.db.read().await;
    let genres: BTreeSet<&str> = db.shows.iter().map(|s| s.genre.as_str()).collect();
    Ok(Json(json!({ "genres": genres })))
}

async fn show_types(State(state): State<AppState>) -> Reply {
    let db = state.db.read().await;
    let types: BTreeSet<&str> = db.shows.iter().map(|s| s.show_type.as_str()).collect();
    Ok(Json(json!({ "types": types })))
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub per_page: Option<u32>,
}

/// Best-rated unfavorited shows in the user's favorite genres, or overall
/// when they have none.
async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Reply {
    let db = state.db.read().await;
    let user_id = db.authorize(&headers)?;
    let favorited: HashSet<u64> = db.favorites_of(user_id).map(|f| f.tv_show_id).collect();
    let liked: HashSet<String> = db
        .genre_counts(user_id)
        .into_iter()
        .take(2)
        .map(|(g, _)| g)
        .collect();

    let unseen = db.shows.iter().filter(|s| !favorited.contains(&s.id));
    let mut picks: Vec<&Show> = unseen.clone().filter(|s| liked.contains(&s.genre)).collect();
    if picks.is_empty() {
        picks = unseen.collect();
    }
    picks.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.id.cmp(&b.id)));
    picks.truncate(query.per_page.unwrap_or(10).clamp(1, MAX_PER_PAGE) as usize);
    Ok(Json(json!({ "recommendations": picks })))
}

// --- actors ---

#[derive(Deserialize)]
pub struct ActorQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn list_actors(State(state): State<AppState>, Query(query): Query<ActorQuery>) -> Reply {
    let db = state.db.read().await;
    let mut actors: Vec<Actor> = db
        .actors
        .iter()
        .filter(|a| given(&query.search).map_or(true, |q| contains_ci(&a.name, q)))
        .cloned()
        .collect();
    actors.sort_by(|a, b| a.name.cmp(&b.name));
    let (page, pagination) = paginate(&actors, query.page, query.per_page);
    Ok(Json(json!({ "actors": page, "pagination": pagination })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

async fn search_actors(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Reply {
    let q = given(&query.q).ok_or_else(|| ErrorReply::bad_request("Search query is required"))?;
    let db = state.db.read().await;
    let actors: Vec<&Actor> = db.actors.iter().filter(|a| contains_ci(&a.name, q)).collect();
    Ok(Json(json!({ "actors": actors })))
}

async fn get_actor(State(state): State<AppState>, Path(id): Path<u64>) -> Reply {
    let db = state.db.read().await;
    Ok(Json(json!({ "actor": db.actor(id)? })))
}

async fn actor_shows(State(state): State<AppState>, Path(id): Path<u64>) -> Reply {
    let db = state.db.read().await;
    db.actor(id)?;
    let credits: Vec<Value> = db
        .roles
        .iter()
        .filter(|r| r.actor_id == id)
        .map(|r| {
            json!({
                "id": r.id,
                "tv_show_id": r.tv_show_id,
                "role": r.role,
                "tv_show": db.shows.iter().find(|s| s.id == r.tv_show_id),
            })
        })
        .collect();
    Ok(Json(json!({ "tv_shows": credits })))
}

// --- favorites ---

async fn list_favorites(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let user_id = db.authorize(&headers)?;
    let favorites: Vec<Value> = db.favorites_of(user_id).map(|f| db.favorite_json(f)).collect();
    Ok(Json(json!({ "favorites": favorites })))
}

async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<(StatusCode, Json<Value>), ErrorReply> {
    let mut db = state.db.write().await;
    let user_id = db.authorize(&headers)?;
    db.show(id)?;
    if db.favorites_of(user_id).any(|f| f.tv_show_id == id) {
        return Err(ErrorReply::bad_request("TV show already in favorites"));
    }
    let created_at = db.now();
    let row = FavoriteRow {
        id: db.next_id(),
        user_id,
        tv_show_id: id,
        created_at,
    };
    let favorite = db.favorite_json(&row);
    db.favorites.push(row);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Added to favorites", "favorite": favorite })),
    ))
}

async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    let mut db = state.db.write().await;
    let user_id = db.authorize(&headers)?;
    let before = db.favorites.len();
    db.favorites.retain(|f| !(f.user_id == user_id && f.tv_show_id == id));
    if db.favorites.len() == before {
        return Err(ErrorReply::not_found("Favorite not found"));
    }
    Ok(Json(json!({ "message": "Removed from favorites" })))
}

// --- users ---

#[derive(Deserialize)]
pub struct ProfileInput {
    pub username: Option<String>,
    pub email_notifications: Option<bool>,
}

#[derive(Deserialize)]
pub struct DeleteAccountInput {
    pub password: String,
}

async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let user = db.user(db.authorize(&headers)?)?;
    Ok(Json(json!({ "user": user })))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Reply {
    let mut db = state.db.write().await;
    let user_id = db.authorize(&headers)?;
    if let Some(username) = &input.username {
        if username.trim().is_empty() {
            return Err(ErrorReply::bad_request("Username cannot be empty"));
        }
        if db.users.iter().any(|u| u.id != user_id && &u.username == username) {
            return Err(ErrorReply::bad_request("Username already exists"));
        }
    }
    let user = db
        .users
        .iter_mut()
        .find(|u| u.id == user_id)
        .ok_or_else(|| ErrorReply::not_found("User not found"))?;
    if let Some(username) = input.username {
        user.username = username;
    }
    if let Some(enabled) = input.email_notifications {
        user.email_notifications = enabled;
    }
    Ok(Json(json!({ "message": "Profile updated", "user": user })))
}

async fn stats(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let user_id = db.authorize(&headers)?;
    let user = db.user(user_id)?;
    let top_genres: Vec<Value> = db
        .genre_counts(user_id)
        .into_iter()
        .take(5)
        .map(|(genre, count)| json!({ "genre": genre, "count": count }))
        .collect();
    Ok(Json(json!({
        "stats": {
            "total_favorites": db.favorites_of(user_id).count(),
            "member_since": user.created_at,
            "top_genres": top_genres,
        }
    })))
}

async fn export_data(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let user_id = db.authorize(&headers)?;
    let favorites: Vec<Value> = db.favorites_of(user_id).map(|f| db.favorite_json(f)).collect();
    Ok(Json(json!({ "user": db.user(user_id)?, "favorites": favorites })))
}

async fn export_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ErrorReply> {
    let db = state.db.read().await;
    let user_id = db.authorize(&headers)?;
    let mut csv = String::from("tv_show_id,title,genre,added_at\n");
    for row in db.favorites_of(user_id) {
        let show = db.show(row.tv_show_id)?;
        csv.push_str(&format!(
            "{},\"{}\",{},{}\n",
            show.id,
            show.title.replace('"', "\"\""),
            show.genre,
            row.created_at
        ));
    }
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"favorites.csv\""),
        ],
        csv,
    )
        .into_response())
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<DeleteAccountInput>,
) -> Reply {
    let mut db = state.db.write().await;
    let user_id = db.authorize(&headers)?;
    if db.user(user_id)?.password != input.password {
        return Err(ErrorReply::bad_request("Invalid password"));
    }
    db.users.retain(|u| u.id != user_id);
    db.tokens.retain(|_, owner| *owner != user_id);
    db.favorites.retain(|f| f.user_id != user_id);
    info!(user_id, "account deleted");
    Ok(Json(json!({ "message": "Account deleted" })))
}
