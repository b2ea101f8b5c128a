//! Filterable, sortable, paged view over the show catalog.
//!
//! # Design
//! Every accepted filter change issues exactly one `GET /tvshows` and tags it
//! with a generation number taken from a counter that only grows. When a
//! response comes back it is applied only if its generation is still the
//! newest one issued, so a slow response for an older filter can never
//! overwrite the result of a newer one. Superseded requests are not aborted;
//! their results are dropped on arrival.
//!
//! Fetch failures become engine state (`error`) and a `Failed` event. The
//! only error a caller sees from `set_filter` is a rejected change (page or
//! per_page of zero), which issues no request.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use crate::client::RequestClient;
use crate::error::ApiError;
use crate::observe::{Observers, SubscriptionId};
use crate::pagination::PageResult;
use crate::types::Show;

pub const DEFAULT_SORT_BY: &str = "created_at";
pub const DEFAULT_PER_PAGE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ApiError::Validation(format!("unknown sort order: {other}"))),
        }
    }
}

/// The catalog query as the user has configured it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub genre: String,
    pub show_type: String,
    pub status: String,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            genre: String::new(),
            show_type: String::new(),
            status: String::new(),
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_order: SortOrder::Desc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One edit to a [`FilterState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    Genre(String),
    Type(String),
    Status(String),
    SortBy(String),
    SortOrder(SortOrder),
    Page(u32),
    PerPage(u32),
}

impl FilterState {
    /// Apply `change`. Anything other than a page change sends the user back
    /// to page 1. The state is untouched when the change is rejected.
    pub fn apply(&mut self, change: FilterChange) -> Result<(), ApiError> {
        match change {
            FilterChange::Page(0) => {
                return Err(ApiError::Validation("page must be at least 1".to_string()));
            }
            FilterChange::PerPage(0) => {
                return Err(ApiError::Validation("per_page must be positive".to_string()));
            }
            FilterChange::Page(page) => {
                self.page = page;
                return Ok(());
            }
            FilterChange::Search(v) => self.search = v,
            FilterChange::Genre(v) => self.genre = v,
            FilterChange::Type(v) => self.show_type = v,
            FilterChange::Status(v) => self.status = v,
            FilterChange::SortBy(v) => self.sort_by = v,
            FilterChange::SortOrder(v) => self.sort_order = v,
            FilterChange::PerPage(v) => self.per_page = v,
        }
        self.page = 1;
        Ok(())
    }

    /// Query parameters for `GET /tvshows`. Empty optional filters are left
    /// out rather than sent as `genre=`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(8);
        for (key, value) in [
            ("search", &self.search),
            ("genre", &self.genre),
            ("type", &self.show_type),
            ("status", &self.status),
        ] {
            if !value.trim().is_empty() {
                pairs.push((key, value.clone()));
            }
        }
        if !self.sort_by.is_empty() {
            pairs.push(("sort_by", self.sort_by.clone()));
        }
        pairs.push(("sort_order", self.sort_order.to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// What the catalog view renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub filter: FilterState,
    pub result: Option<PageResult<Show>>,
    pub phase: LoadPhase,
    pub loading: bool,
    pub error: Option<ApiError>,
    /// Newest generation issued so far.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    Loading { generation: u64, filter: FilterState },
    Loaded { generation: u64, result: PageResult<Show> },
    Failed { generation: u64, error: ApiError },
}

/// Genre and type options for the filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub genres: Vec<String>,
    pub types: Vec<String>,
}

pub struct CatalogQueryEngine {
    client: RequestClient,
    state: Mutex<CatalogSnapshot>,
    observers: Observers<CatalogEvent>,
}

impl CatalogQueryEngine {
    pub fn new(client: RequestClient) -> Self {
        Self::with_filter(client, FilterState::default())
    }

    pub fn with_filter(client: RequestClient, filter: FilterState) -> Self {
        Self {
            client,
            state: Mutex::new(CatalogSnapshot {
                filter,
                ..CatalogSnapshot::default()
            }),
            observers: Observers::default(),
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.lock().clone()
    }

    pub fn filter(&self) -> FilterState {
        self.lock().filter.clone()
    }

    /// Register `listener` for every state transition. Events are delivered
    /// in the order the transitions happened, while the engine's state lock
    /// is held: a listener must not call back into the engine.
    pub fn subscribe(
        &self,
        listener: impl Fn(&CatalogEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Change one filter and fetch the matching page.
    ///
    /// Returns the engine state once this query resolved, which is not
    /// necessarily this query's result if a newer one was issued meanwhile.
    pub async fn set_filter(&self, change: FilterChange) -> Result<CatalogSnapshot, ApiError> {
        let (generation, filter) = {
            let mut state = self.lock();
            let mut filter = state.filter.clone();
            filter.apply(change)?;
            state.filter = filter;
            self.begin(&mut state)
        };
        Ok(self.run(generation, filter).await)
    }

    pub async fn set_page(&self, page: u32) -> Result<CatalogSnapshot, ApiError> {
        self.set_filter(FilterChange::Page(page)).await
    }

    /// Re-issue the current filter as a new generation.
    pub async fn refresh(&self) -> CatalogSnapshot {
        let (generation, filter) = {
            let mut state = self.lock();
            self.begin(&mut state)
        };
        self.run(generation, filter).await
    }

    /// Fetch the genre and type lists concurrently.
    pub async fn load_facets(&self) -> Result<Facets, ApiError> {
        let (genres, types) = futures::try_join!(self.client.genres(), self.client.show_types())
            .inspect_err(|e| warn!(error = %e, "failed to load catalog facets"))?;
        Ok(Facets { genres, types })
    }

    fn begin(&self, state: &mut CatalogSnapshot) -> (u64, FilterState) {
        state.generation += 1;
        state.loading = true;
        state.phase = LoadPhase::Loading;
        state.error = None;
        let generation = state.generation;
        self.observers.emit(&CatalogEvent::Loading {
            generation,
            filter: state.filter.clone(),
        });
        (generation, state.filter.clone())
    }

    #[instrument(skip(self, filter), fields(page = filter.page))]
    async fn run(&self, generation: u64, filter: FilterState) -> CatalogSnapshot {
        let outcome = self.client.list_shows(&filter).await;

        let mut state = self.lock();
        if generation != state.generation {
            debug!(
                latest = state.generation,
                ok = outcome.is_ok(),
                "discarding superseded catalog response"
            );
            return state.clone();
        }

        state.loading = false;
        match outcome {
            Ok(result) => {
                debug!(total = result.total, items = result.items.len(), "catalog page applied");
                state.phase = LoadPhase::Success;
                state.error = None;
                state.result = Some(result.clone());
                self.observers.emit(&CatalogEvent::Loaded { generation, result });
            }
            Err(error) => {
                warn!(%error, "catalog query failed");
                state.phase = LoadPhase::Error;
                state.error = Some(error.clone());
                self.observers.emit(&CatalogEvent::Failed { generation, error });
            }
        }
        state.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
