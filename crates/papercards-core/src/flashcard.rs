//! Flashcard: one cached summary of one paper within one category.
//!
//! A flashcard is identified by `(category, paper_id)`. It is never edited in
//! place: regeneration replaces the whole record through an upsert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{category::Category, payload::SanitizedPayload};

/// A persisted flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
  pub category:        Category,
  pub paper_id:        String,
  pub headline:        String,
  pub insight:         String,
  pub why_it_matters:  Option<String>,
  /// Structured summarizer output kept for auditability.
  pub summary_payload: SanitizedPayload,
  /// Direct link to the source PDF, when the paper has one.
  pub source_url:      Option<String>,
  /// Publication date of the source paper; drives deck ordering.
  pub published_at:    DateTime<Utc>,
  pub generated_at:    DateTime<Utc>,
  /// `generated_at + TTL`; the record is stale from this instant on.
  pub expires_at:      DateTime<Utc>,
}

impl Flashcard {
  /// A record is fresh iff it expires strictly after `now`.
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool { self.expires_at > now }
}

/// The ordered set of flashcards returned for one category request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
  pub category:    Category,
  pub cards:       Vec<Flashcard>,
  /// Whether a regeneration pass ran (or was joined) to serve this deck.
  pub regenerated: bool,
}

impl Deck {
  pub fn len(&self) -> usize { self.cards.len() }

  pub fn is_empty(&self) -> bool { self.cards.is_empty() }
}
