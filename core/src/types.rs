//! Domain DTOs for the show-tracker API.
//!
//! # Design
//! Field names follow the server's snake_case JSON. Almost everything except
//! ids is optional because the API omits nulls freely and a missing poster or
//! rating must not fail a whole page. The envelope types (`ShowsEnvelope`
//! etc.) exist only to peel the single wrapping key off each response.

use serde::{Deserialize, Serialize};

pub type ShowId = u64;
pub type ActorId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(rename = "type", default)]
    pub show_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: u64,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    /// Runtime in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// One row of a show's cast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: u64,
    pub actor_id: ActorId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_main_cast: bool,
    #[serde(default)]
    pub actor: Option<Actor>,
}

/// One show an actor appeared in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorCredit {
    pub id: u64,
    pub tv_show_id: ShowId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tv_show: Option<Show>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    #[serde(default)]
    pub id: Option<u64>,
    pub tv_show_id: ShowId,
    #[serde(default)]
    pub tv_show: Option<Show>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total_favorites: u64,
    #[serde(default)]
    pub member_since: Option<String>,
    #[serde(default)]
    pub top_genres: Vec<GenreCount>,
}

/// Login form contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial profile update. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: Option<User>,
}

/// Server-side pagination block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub has_prev: bool,
    #[serde(default)]
    pub has_next: bool,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct LoginEnvelope {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowsEnvelope {
    #[serde(default)]
    pub tv_shows: Vec<Show>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowEnvelope {
    pub tv_show: Show,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EpisodesEnvelope {
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CastEnvelope {
    #[serde(default)]
    pub actors: Vec<CastMember>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorsEnvelope {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorEnvelope {
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreditsEnvelope {
    #[serde(default)]
    pub tv_shows: Vec<ActorCredit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FavoritesEnvelope {
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenresEnvelope {
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TypesEnvelope {
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationsEnvelope {
    #[serde(default)]
    pub recommendations: Vec<Show>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsEnvelope {
    pub stats: UserStats,
}
