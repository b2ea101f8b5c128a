//! The current user's favorite shows, with optimistic toggling.
//!
//! # Design
//! Each show id maps to a [`FavoriteEntry`]. A toggle moves the entry to
//! `Pending { favorited, previous }` before the request leaves, so the UI
//! shows the new state immediately; the response moves it back to
//! `Committed`, either with the new value (success) or `previous`
//! (rollback). While an entry is pending further toggles for that id are
//! refused, which keeps at most one mutation per id on the wire.
//!
//! The set belongs to whoever is logged in. `hydrate` records the session
//! epoch it loaded for, and `ensure_hydrated` reloads when the epoch has
//! moved since.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use crate::client::RequestClient;
use crate::error::ApiError;
use crate::observe::{Observers, SubscriptionId};
use crate::types::{Favorite, ShowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteEntry {
    Committed(bool),
    Pending { favorited: bool, previous: bool },
}

impl FavoriteEntry {
    /// The value to display; optimistic while pending.
    pub fn favorited(self) -> bool {
        match self {
            FavoriteEntry::Committed(favorited) | FavoriteEntry::Pending { favorited, .. } => {
                favorited
            }
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, FavoriteEntry::Pending { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server accepted the change.
    Committed { favorited: bool },
    /// A mutation for this id was already in flight; nothing was sent.
    AlreadyPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesEvent {
    Hydrating,
    Hydrated { count: usize },
    HydrateFailed { error: ApiError },
    TogglePending { id: ShowId, favorited: bool },
    ToggleCommitted { id: ShowId, favorited: bool },
    ToggleRolledBack { id: ShowId, favorited: bool, error: ApiError },
}

#[derive(Debug, Default)]
struct FavoritesState {
    entries: HashMap<ShowId, FavoriteEntry>,
    records: Vec<Favorite>,
    /// Session epoch each in-flight toggle started under.
    pending_epochs: HashMap<ShowId, u64>,
    hydrated_epoch: Option<u64>,
    hydrate_generation: u64,
    applied_generation: u64,
    last_error: Option<ApiError>,
}

pub struct FavoritesStore {
    client: RequestClient,
    state: Mutex<FavoritesState>,
    observers: Observers<FavoritesEvent>,
}

impl FavoritesStore {
    pub fn new(client: RequestClient) -> Self {
        Self {
            client,
            state: Mutex::new(FavoritesState::default()),
            observers: Observers::default(),
        }
    }

    /// Listeners run while the store's lock is held and must not call back
    /// into the store.
    pub fn subscribe(
        &self,
        listener: impl Fn(&FavoritesEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn is_favorite(&self, id: ShowId) -> bool {
        self.entry(id).is_some_and(FavoriteEntry::favorited)
    }

    pub fn is_pending(&self, id: ShowId) -> bool {
        self.entry(id).is_some_and(FavoriteEntry::is_pending)
    }

    pub fn entry(&self, id: ShowId) -> Option<FavoriteEntry> {
        self.lock().entries.get(&id).copied()
    }

    /// Ids currently shown as favorited.
    pub fn favorite_ids(&self) -> BTreeSet<ShowId> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| e.favorited())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Favorite rows from the last hydrate, minus committed removals.
    pub fn records(&self) -> Vec<Favorite> {
        self.lock().records.clone()
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.lock().last_error.clone()
    }

    pub fn is_hydrated(&self) -> bool {
        self.lock().hydrated_epoch == Some(self.client.session().epoch())
    }

    /// Rebuild the set for the current session. Without a session the set is
    /// emptied and no request is made.
    #[instrument(skip_all)]
    pub async fn hydrate(&self) -> Result<(), ApiError> {
        let session = self.client.session();
        let epoch = session.epoch();

        if !session.is_authenticated() {
            let mut state = self.lock();
            state.entries.clear();
            state.records.clear();
            state.pending_epochs.clear();
            state.hydrated_epoch = Some(epoch);
            state.last_error = None;
            self.observers.emit(&FavoritesEvent::Hydrated { count: 0 });
            return Ok(());
        }

        let generation = {
            let mut state = self.lock();
            state.hydrate_generation += 1;
            self.observers.emit(&FavoritesEvent::Hydrating);
            state.hydrate_generation
        };

        let outcome = self.client.favorites().await;

        let mut state = self.lock();
        if session.epoch() != epoch {
            debug!(
                epoch,
                current_epoch = session.epoch(),
                "discarding favorites loaded for another session"
            );
            return Ok(());
        }
        if generation < state.applied_generation {
            debug!(
                generation,
                applied = state.applied_generation,
                "newer favorites load already applied"
            );
            return Ok(());
        }
        match outcome {
            Ok(records) => {
                let mut entries: HashMap<ShowId, FavoriteEntry> = records
                    .iter()
                    .map(|f| (f.tv_show_id, FavoriteEntry::Committed(true)))
                    .collect();
                state.pending_epochs.retain(|_, started| *started == epoch);
                for id in state.pending_epochs.keys() {
                    if let Some(entry) = state.entries.get(id).filter(|e| e.is_pending()) {
                        entries.insert(*id, *entry);
                    }
                }
                let count = records.len();
                state.entries = entries;
                state.records = records;
                state.hydrated_epoch = Some(epoch);
                state.applied_generation = generation;
                state.last_error = None;
                debug!(count, "favorites hydrated");
                self.observers.emit(&FavoritesEvent::Hydrated { count });
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to load favorites");
                state.last_error = Some(error.clone());
                self.observers.emit(&FavoritesEvent::HydrateFailed { error: error.clone() });
                Err(error)
            }
        }
    }

    /// Hydrate unless the set already belongs to the current session.
    pub async fn ensure_hydrated(&self) -> Result<(), ApiError> {
        if self.is_hydrated() {
            return Ok(());
        }
        self.hydrate().await
    }

    /// Flip the favorite state of `id`, optimistically.
    #[instrument(skip(self))]
    pub async fn toggle(&self, id: ShowId) -> Result<ToggleOutcome, ApiError> {
        let session = self.client.session();
        if !session.is_authenticated() {
            return Err(ApiError::auth_required());
        }
        let epoch = session.epoch();

        let target = {
            let mut state = self.lock();
            let left_over = state.pending_epochs.get(&id).is_some_and(|started| *started != epoch);
            let current = match state.entries.get(&id).copied() {
                Some(entry) if !left_over => entry,
                _ => FavoriteEntry::Committed(false),
            };
            if current.is_pending() {
                debug!("toggle ignored, mutation already in flight");
                return Ok(ToggleOutcome::AlreadyPending);
            }
            let previous = current.favorited();
            let target = !previous;
            state.entries.insert(
                id,
                FavoriteEntry::Pending {
                    favorited: target,
                    previous,
                },
            );
            state.pending_epochs.insert(id, epoch);
            self.observers.emit(&FavoritesEvent::TogglePending { id, favorited: target });
            target
        };

        let outcome = if target {
            self.client.add_favorite(id).await
        } else {
            self.client.remove_favorite(id).await.map(|()| None)
        };

        let mut state = self.lock();
        if session.epoch() != epoch {
            if state.pending_epochs.get(&id) == Some(&epoch) {
                state.pending_epochs.remove(&id);
                state.entries.remove(&id);
            }
            debug!(
                epoch,
                current_epoch = session.epoch(),
                "session changed while the toggle was in flight"
            );
            return outcome.map(|_| ToggleOutcome::Committed { favorited: target });
        }
        state.pending_epochs.remove(&id);
        let Some(FavoriteEntry::Pending { favorited, previous }) = state.entries.get(&id).copied()
        else {
            debug!("favorite entry was reset while the toggle was in flight");
            return outcome.map(|_| ToggleOutcome::Committed { favorited: target });
        };

        match outcome {
            Ok(created) => {
                state.entries.insert(id, FavoriteEntry::Committed(favorited));
                if favorited {
                    if let Some(record) = created {
                        state.records.retain(|r| r.tv_show_id != id);
                        state.records.push(record);
                    }
                } else {
                    state.records.retain(|r| r.tv_show_id != id);
                }
                self.observers.emit(&FavoritesEvent::ToggleCommitted { id, favorited });
                Ok(ToggleOutcome::Committed { favorited })
            }
            Err(error) => {
                warn!(%error, "favorite toggle failed, rolling back");
                state.entries.insert(id, FavoriteEntry::Committed(previous));
                state.last_error = Some(error.clone());
                self.observers.emit(&FavoritesEvent::ToggleRolledBack {
                    id,
                    favorited: previous,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FavoritesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
