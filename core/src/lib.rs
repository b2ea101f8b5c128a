//! Client core for the showtrack TV-show catalog service.
//!
//! # Overview
//! Owns everything between a UI and the HTTP API: the persisted login
//! session, request building and error mapping, the filtered and paginated
//! catalog, the optimistic favorites set, and detail views assembled from
//! several endpoints at once.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`).
//!   The round-trip goes through the `Transport` trait so tests can script
//!   responses and release them in any order.
//! - `RequestClient` is cheap to clone; clones share one `Session`.
//! - Stateful components (`CatalogQueryEngine`, `FavoritesStore`,
//!   `DetailAggregator`) guard their state with a `std::sync::Mutex` that is
//!   never held across an `.await`, and publish changes to subscribers.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod detail;
pub mod error;
pub mod favorites;
pub mod http;
pub mod observe;
pub mod pagination;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

pub use api::ActorQuery;
pub use catalog::{
    CatalogEvent, CatalogQueryEngine, CatalogSnapshot, Facets, FilterChange, FilterState, LoadPhase,
    SortOrder,
};
pub use client::RequestClient;
pub use config::ClientConfig;
pub use detail::{AggregateView, Collection, DetailAggregator, EntityKind, PartialFailure, Primary};
pub use error::{ApiError, TransportError};
pub use favorites::{FavoriteEntry, FavoritesEvent, FavoritesStore, ToggleOutcome};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use observe::SubscriptionId;
pub use pagination::PageResult;
pub use session::{AuthState, FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::*;
