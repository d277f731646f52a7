//! SQLite backend for the papercards flashcard cache.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] serves both as the
//! [`FlashcardStore`](papercards_core::store::FlashcardStore) and as the
//! [`PaperSource`](papercards_core::store::PaperSource) over the ingestion
//! pipeline's `papers` table.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
