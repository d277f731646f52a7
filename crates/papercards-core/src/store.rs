//! The `FlashcardStore` and `PaperSource` traits.
//!
//! Both are implemented by storage backends (e.g. `papercards-store-sqlite`).
//! The cache orchestrator depends on these abstractions, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{category::Category, flashcard::Flashcard, paper::Paper};

// ─── FlashcardStore ──────────────────────────────────────────────────────────

/// Persistent table of flashcards keyed by `(category, paper_id)`.
///
/// An error from any method means the store itself is unavailable or
/// misbehaving; "nothing found" is always an empty `Ok`.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FlashcardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Up to `limit` records for `category` with `expires_at > as_of` (default
  /// now), ordered by `published_at` descending, ties broken by `paper_id`
  /// ascending. Never calls out to anything but the store.
  fn fresh_for_category(
    &self,
    category: Category,
    limit: usize,
    as_of: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<Flashcard>, Self::Error>> + Send + '_;

  /// Insert `card`, or replace every mutable field of the existing record
  /// with the same `(category, paper_id)`. Atomic per record.
  fn upsert(
    &self,
    card: Flashcard,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete every record with `expires_at < as_of` (default now) and return
  /// how many were removed.
  fn delete_expired(
    &self,
    as_of: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Number of records for `category`, fresh or not.
  fn count_for_category(
    &self,
    category: Category,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── PaperSource ─────────────────────────────────────────────────────────────

/// The candidate pool produced by the ingestion pipeline.
pub trait PaperSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Up to `count` processed papers tagged with `category`, most recently
  /// published first, ties broken by `paper_id` ascending. An empty pool is
  /// `Ok(vec![])`, not an error.
  fn fetch_recent(
    &self,
    category: Category,
    count: usize,
  ) -> impl Future<Output = Result<Vec<Paper>, Self::Error>> + Send + '_;
}
