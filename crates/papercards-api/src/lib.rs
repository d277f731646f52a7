//! JSON REST API for papercards.
//!
//! Exposes an axum [`Router`] backed by any [`papercards_cache::Decks`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", papercards_api::api_router(cache.clone()))
//! ```

pub mod error;
pub mod flashcards;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get},
};
use papercards_cache::Decks;

pub use error::ApiError;

/// Build a fully-materialised API router for `decks`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D>(decks: Arc<D>) -> Router<()>
where
  D: Decks,
{
  Router::new()
    .route("/flashcards", get(flashcards::list::<D>))
    .route("/flashcards/expired", delete(flashcards::sweep::<D>))
    .with_state(decks)
}
