//! One-entity detail views assembled from several concurrent requests.
//!
//! # Design
//! The primary record decides whether there is a page at all: if it fails,
//! the load fails. Secondary collections are best effort; a failed one is
//! rendered empty and noted in `partial_failures`. Views are immutable and
//! shared as `Arc<AggregateView>`; reloading builds a new one.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use crate::client::RequestClient;
use crate::error::ApiError;
use crate::favorites::FavoritesStore;
use crate::types::{Actor, ActorCredit, CastMember, Episode, Show};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Show,
    Actor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Episodes,
    Cast,
    Credits,
    Favorites,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Episodes => "episodes",
            Collection::Cast => "cast",
            Collection::Credits => "credits",
            Collection::Favorites => "favorites",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    Show(Show),
    Actor(Actor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialFailure {
    pub collection: Collection,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateView {
    pub kind: EntityKind,
    pub id: u64,
    pub primary: Primary,
    pub episodes: Vec<Episode>,
    pub cast: Vec<CastMember>,
    pub credits: Vec<ActorCredit>,
    /// Favorite status of a show. `None` for actors, when logged out, or
    /// when the favorites could not be loaded.
    pub favorited: Option<bool>,
    pub partial_failures: Vec<PartialFailure>,
}

impl AggregateView {
    pub fn show(&self) -> Option<&Show> {
        match &self.primary {
            Primary::Show(show) => Some(show),
            Primary::Actor(_) => None,
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        match &self.primary {
            Primary::Actor(actor) => Some(actor),
            Primary::Show(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.partial_failures.is_empty()
    }
}

#[derive(Default)]
struct Current {
    generation: u64,
    view: Option<Arc<AggregateView>>,
}

pub struct DetailAggregator {
    client: RequestClient,
    favorites: Option<Arc<FavoritesStore>>,
    current: Mutex<Current>,
}

impl DetailAggregator {
    pub fn new(client: RequestClient) -> Self {
        Self {
            client,
            favorites: None,
            current: Mutex::new(Current::default()),
        }
    }

    /// Include favorite status in show views, read from `favorites`.
    pub fn with_favorites(mut self, favorites: Arc<FavoritesStore>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    /// The view of the most recently started load, once it has completed.
    pub fn current(&self) -> Option<Arc<AggregateView>> {
        self.lock().view.clone()
    }

    #[instrument(skip(self))]
    pub async fn load_entity(
        &self,
        kind: EntityKind,
        id: u64,
    ) -> Result<Arc<AggregateView>, ApiError> {
        let generation = {
            let mut current = self.lock();
            current.generation += 1;
            current.generation
        };

        let outcome = match kind {
            EntityKind::Show => self.load_show(id).await,
            EntityKind::Actor => self.load_actor(id).await,
        };

        let mut current = self.lock();
        let is_latest = generation == current.generation;
        match outcome {
            Ok(view) => {
                let view = Arc::new(view);
                if is_latest {
                    current.view = Some(view.clone());
                } else {
                    debug!(
                        latest = current.generation,
                        "detail load superseded, not replacing current view"
                    );
                }
                Ok(view)
            }
            Err(error) => {
                warn!(%error, "primary record failed to load");
                if is_latest {
                    current.view = None;
                }
                Err(error)
            }
        }
    }

    async fn load_show(&self, id: u64) -> Result<AggregateView, ApiError> {
        let (show, episodes, cast, favorited) = futures::join!(
            self.client.get_show(id),
            self.client.show_episodes(id),
            self.client.show_cast(id),
            self.favorite_status(id),
        );
        let show = show?;

        let mut failures = Vec::new();
        let episodes = degrade(Collection::Episodes, episodes, &mut failures);
        let cast = degrade(Collection::Cast, cast, &mut failures);
        let favorited = match favorited {
            Some(status) => degrade_opt(Collection::Favorites, status, &mut failures),
            None => None,
        };

        Ok(AggregateView {
            kind: EntityKind::Show,
            id,
            primary: Primary::Show(show),
            episodes,
            cast,
            credits: Vec::new(),
            favorited,
            partial_failures: failures,
        })
    }

    async fn load_actor(&self, id: u64) -> Result<AggregateView, ApiError> {
        let (actor, credits) =
            futures::join!(self.client.get_actor(id), self.client.actor_shows(id));
        let actor = actor?;

        let mut failures = Vec::new();
        let credits = degrade(Collection::Credits, credits, &mut failures);

        Ok(AggregateView {
            kind: EntityKind::Actor,
            id,
            primary: Primary::Actor(actor),
            episodes: Vec::new(),
            cast: Vec::new(),
            credits,
            favorited: None,
            partial_failures: failures,
        })
    }

    /// `None` when favorite status does not apply (no store, logged out).
    async fn favorite_status(&self, id: u64) -> Option<Result<bool, ApiError>> {
        let favorites = self.favorites.as_ref()?;
        if !self.client.session().is_authenticated() {
            return None;
        }
        Some(favorites.ensure_hydrated().await.map(|()| favorites.is_favorite(id)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn degrade<T>(
    collection: Collection,
    result: Result<Vec<T>, ApiError>,
    failures: &mut Vec<PartialFailure>,
) -> Vec<T> {
    degrade_opt(collection, result, failures).unwrap_or_default()
}

fn degrade_opt<T>(
    collection: Collection,
    result: Result<T, ApiError>,
    failures: &mut Vec<PartialFailure>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(%collection, %error, "secondary fetch failed, degrading");
            failures.push(PartialFailure { collection, error });
            None
        }
    }
}
