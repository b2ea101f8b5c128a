//! Typed wrappers for every endpoint of the show API.
//!
//! Each method peels the response envelope (`{"tv_show": ...}`,
//! `{"episodes": [...]}`) and returns the domain value. Endpoints that only
//! make sense for a logged-in user fail with `ApiError::Validation` before
//! any request is sent when the session is empty.

use bytes::Bytes;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

use crate::catalog::FilterState;
use crate::client::{encode, RequestClient};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::pagination::PageResult;
use crate::types::*;

/// Query for the actor directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorQuery {
    pub search: String,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ActorQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            per_page: 12,
        }
    }
}

/// `path?k=v&...`, or just `path` when there are no pairs.
pub fn with_query<K: AsRef<str>, V: AsRef<str>>(path: &str, pairs: &[(K, V)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    format!("{path}?{}", serializer.finish())
}

#[derive(Debug, Deserialize)]
struct AddFavoriteEnvelope {
    #[serde(default)]
    favorite: Option<Favorite>,
}

impl RequestClient {
    fn require_session(&self) -> Result<(), ApiError> {
        if self.session().is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::auth_required())
        }
    }

    // -----------------------------------------------------------------------
    // Shows
    // -----------------------------------------------------------------------

    pub async fn list_shows(&self, filter: &FilterState) -> Result<PageResult<Show>, ApiError> {
        let endpoint = with_query("/tvshows", &filter.query_pairs());
        let envelope: ShowsEnvelope = self.get(&endpoint).await?;
        Ok(PageResult::from_server(
            envelope.tv_shows,
            filter.page,
            filter.per_page,
            envelope.pagination,
        ))
    }

    pub async fn get_show(&self, id: ShowId) -> Result<Show, ApiError> {
        let envelope: ShowEnvelope = self.get(&format!("/tvshows/{id}")).await?;
        Ok(envelope.tv_show)
    }

    pub async fn show_episodes(&self, id: ShowId) -> Result<Vec<Episode>, ApiError> {
        let envelope: EpisodesEnvelope = self.get(&format!("/tvshows/{id}/episodes")).await?;
        Ok(envelope.episodes)
    }

    pub async fn show_cast(&self, id: ShowId) -> Result<Vec<CastMember>, ApiError> {
        let envelope: CastEnvelope = self.get(&format!("/tvshows/{id}/actors")).await?;
        Ok(envelope.actors)
    }

    pub async fn genres(&self) -> Result<Vec<String>, ApiError> {
        let envelope: GenresEnvelope = self.get("/tvshows/genres").await?;
        Ok(envelope.genres)
    }

    pub async fn show_types(&self) -> Result<Vec<String>, ApiError> {
        let envelope: TypesEnvelope = self.get("/tvshows/types").await?;
        Ok(envelope.types)
    }

    /// Shows the server picks for the current user.
    pub async fn recommendations(&self, per_page: Option<u32>) -> Result<Vec<Show>, ApiError> {
        self.require_session()?;
        let pairs: Vec<(&str, String)> =
            per_page.map(|n| ("per_page", n.to_string())).into_iter().collect();
        let envelope: RecommendationsEnvelope =
            self.get(&with_query("/tvshows/recommendations", &pairs)).await?;
        Ok(envelope.recommendations)
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    pub async fn list_actors(&self, query: &ActorQuery) -> Result<PageResult<Actor>, ApiError> {
        if query.page == 0 || query.per_page == 0 {
            return Err(ApiError::Validation("page and per_page must be positive".to_string()));
        }
        let mut pairs = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if !query.search.trim().is_empty() {
            pairs.push(("search", query.search.clone()));
        }
        let envelope: ActorsEnvelope = self.get(&with_query("/actors", &pairs)).await?;
        Ok(PageResult::from_server(
            envelope.actors,
            query.page,
            query.per_page,
            envelope.pagination,
        ))
    }

    pub async fn get_actor(&self, id: ActorId) -> Result<Actor, ApiError> {
        let envelope: ActorEnvelope = self.get(&format!("/actors/{id}")).await?;
        Ok(envelope.actor)
    }

    pub async fn actor_shows(&self, id: ActorId) -> Result<Vec<ActorCredit>, ApiError> {
        let envelope: CreditsEnvelope = self.get(&format!("/actors/{id}/tvshows")).await?;
        Ok(envelope.tv_shows)
    }

    pub async fn search_actors(&self, q: &str) -> Result<Vec<Actor>, ApiError> {
        if q.trim().is_empty() {
            return Err(ApiError::Validation("search query is empty".to_string()));
        }
        let envelope: ActorsEnvelope = self.get(&with_query("/actors/search", &[("q", q)])).await?;
        Ok(envelope.actors)
    }

    // -----------------------------------------------------------------------
    // Favorites
    // -----------------------------------------------------------------------

    pub async fn favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        self.require_session()?;
        let envelope: FavoritesEnvelope = self.get("/tvshows/favorites").await?;
        Ok(envelope.favorites)
    }

    /// Returns the created favorite row when the server echoes it.
    pub async fn add_favorite(&self, id: ShowId) -> Result<Option<Favorite>, ApiError> {
        self.require_session()?;
        let envelope: Option<AddFavoriteEnvelope> = self
            .request(HttpMethod::Post, &format!("/tvshows/favorites/{id}"), None)
            .await?;
        Ok(envelope.and_then(|e| e.favorite))
    }

    pub async fn remove_favorite(&self, id: ShowId) -> Result<(), ApiError> {
        self.require_session()?;
        let _: IgnoredAny = self
            .request(HttpMethod::Delete, &format!("/tvshows/favorites/{id}"), None)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User
    // -----------------------------------------------------------------------

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.require_session()?;
        let envelope: UserEnvelope = self.get("/users/profile").await?;
        Ok(envelope.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.require_session()?;
        if update.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(ApiError::Validation("username cannot be empty".to_string()));
        }
        let envelope: UserEnvelope =
            self.send_json(HttpMethod::Put, "/users/profile", update).await?;
        Ok(envelope.user)
    }

    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        self.require_session()?;
        let envelope: StatsEnvelope = self.get("/users/stats").await?;
        Ok(envelope.stats)
    }

    /// Everything the server stores about the user, as JSON.
    pub async fn export_data(&self) -> Result<serde_json::Value, ApiError> {
        self.require_session()?;
        self.get("/users/gdpr/data").await
    }

    /// The user's favorites as a CSV file.
    pub async fn export_csv(&self) -> Result<Bytes, ApiError> {
        self.require_session()?;
        self.request_binary("/users/gdpr/data/csv").await
    }

    /// Delete the account. On success the local session is torn down too.
    pub async fn delete_account(&self, password: &str) -> Result<(), ApiError> {
        self.require_session()?;
        if password.is_empty() {
            return Err(ApiError::Validation("password is required".to_string()));
        }
        let body = encode(&serde_json::json!({ "password": password }))?;
        let _: IgnoredAny = self
            .request(HttpMethod::Delete, "/users/gdpr/delete-account", Some(body))
            .await?;
        debug!("account deleted, clearing session");
        self.session().teardown();
        Ok(())
    }
}
