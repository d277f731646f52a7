//! Handlers for `/flashcards` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/flashcards` | `?category=cs.AI[&limit=5][&refresh=true]` |
//! | `DELETE` | `/flashcards/expired` | Returns `{"removed": n}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::HeaderValue,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use papercards_cache::Decks;
use papercards_core::flashcard::Flashcard;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Response header telling whether a regeneration pass served the deck.
pub const REGENERATED_HEADER: &str = "x-deck-regenerated";

// ─── DTO ──────────────────────────────────────────────────────────────────────

/// A flashcard as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDto {
  pub category:       String,
  pub paper_id:       String,
  pub headline:       String,
  pub insight:        String,
  pub why_it_matters: Option<String>,
  pub generated_at:   DateTime<Utc>,
  pub expires_at:     DateTime<Utc>,
  pub source_url:     Option<String>,
}

impl From<Flashcard> for FlashcardDto {
  fn from(card: Flashcard) -> Self {
    Self {
      category:       card.category.to_string(),
      paper_id:       card.paper_id,
      headline:       card.headline,
      insight:        card.insight,
      why_it_matters: card.why_it_matters,
      generated_at:   card.generated_at,
      expires_at:     card.expires_at,
      source_url:     card.source_url,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: String,
  pub limit:    Option<usize>,
  #[serde(default)]
  pub refresh:  bool,
}

/// `GET /flashcards?category=<tag>[&limit=<n>][&refresh=<bool>]`
pub async fn list<D>(
  State(decks): State<Arc<D>>,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  D: Decks,
{
  if let Some(limit) = params.limit
    && !(1..=decks.max_limit()).contains(&limit)
  {
    return Err(ApiError::BadRequest(format!(
      "limit must be between 1 and {}",
      decks.max_limit()
    )));
  }

  let deck = decks
    .deck(&params.category, params.limit, params.refresh)
    .await?;

  let regenerated = HeaderValue::from_static(if deck.regenerated { "true" } else { "false" });
  let cards: Vec<FlashcardDto> = deck.cards.into_iter().map(FlashcardDto::from).collect();
  Ok(([(REGENERATED_HEADER, regenerated)], Json(cards)))
}

// ─── Sweep ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
  pub removed: u64,
}

/// `DELETE /flashcards/expired`
pub async fn sweep<D>(State(decks): State<Arc<D>>) -> Result<Json<SweepResponse>, ApiError>
where
  D: Decks,
{
  let removed = decks.sweep_expired().await?;
  Ok(Json(SweepResponse { removed }))
}
