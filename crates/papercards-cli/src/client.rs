//! Async HTTP client wrapping the papercards JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Connection settings for the papercards API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

/// A flashcard as the API serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
  pub category:       String,
  pub paper_id:       String,
  pub headline:       String,
  pub insight:        String,
  pub why_it_matters: Option<String>,
  pub generated_at:   DateTime<Utc>,
  pub expires_at:     DateTime<Utc>,
  pub source_url:     Option<String>,
}

/// A deck plus whether the server regenerated it for this request.
#[derive(Debug, Clone)]
pub struct DeckResponse {
  pub cards:       Vec<Card>,
  pub regenerated: bool,
}

#[derive(Deserialize)]
struct SweepResponse {
  removed: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the papercards JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api/v1{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// `GET /api/v1/flashcards?category=<tag>[&limit=<n>][&refresh=true]`
  pub async fn deck(
    &self,
    category: &str,
    limit: Option<usize>,
    refresh: bool,
  ) -> Result<DeckResponse> {
    let mut query = vec![("category", category.to_string())];
    if let Some(limit) = limit {
      query.push(("limit", limit.to_string()));
    }
    if refresh {
      query.push(("refresh", "true".to_string()));
    }

    tracing::debug!(category, ?limit, refresh, "requesting deck");
    let resp = self
      .client
      .get(self.url("/flashcards"))
      .query(&query)
      .send()
      .await
      .context("GET /flashcards failed")?;
    let resp = check("GET /flashcards", resp).await?;

    let regenerated = resp
      .headers()
      .get("x-deck-regenerated")
      .is_some_and(|v| v.as_bytes() == b"true");
    let cards = resp.json().await.context("deserialising flashcards")?;
    Ok(DeckResponse { cards, regenerated })
  }

  /// `DELETE /api/v1/flashcards/expired`
  pub async fn sweep(&self) -> Result<u64> {
    let resp = self
      .client
      .delete(self.url("/flashcards/expired"))
      .send()
      .await
      .context("DELETE /flashcards/expired failed")?;
    let resp = check("DELETE /flashcards/expired", resp).await?;

    let body: SweepResponse = resp.json().await.context("deserialising sweep result")?;
    Ok(body.removed)
  }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(what: &str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let message = serde_json::from_str::<ErrorBody>(&body)
    .map(|e| e.error)
    .unwrap_or(body);
  Err(anyhow!("{what} → {status}: {message}"))
}
