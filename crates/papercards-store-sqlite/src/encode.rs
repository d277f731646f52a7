//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so comparing two encoded values lexically gives the same answer
//! as comparing the instants. Structured fields (payload, paper categories)
//! are stored as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use papercards_core::{
  Category,
  flashcard::Flashcard,
  paper::Paper,
  payload::SanitizedPayload,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Payload ─────────────────────────────────────────────────────────────────

pub fn encode_payload(p: &SanitizedPayload) -> Result<String> {
  Ok(serde_json::to_string(p.as_json())?)
}

pub fn decode_payload(s: &str) -> Result<SanitizedPayload> {
  Ok(SanitizedPayload::from_stored(serde_json::from_str(s)?))
}

// ─── Categories ──────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawFlashcard`].
pub const FLASHCARD_COLUMNS: &str = "category, paper_id, headline, insight, \
   why_it_matters, summary_json, source_url, published_at, generated_at, \
   expires_at";

/// Raw strings read directly from a `flashcards` row.
pub struct RawFlashcard {
  pub category:       String,
  pub paper_id:       String,
  pub headline:       String,
  pub insight:        String,
  pub why_it_matters: Option<String>,
  pub summary_json:   String,
  pub source_url:     Option<String>,
  pub published_at:   String,
  pub generated_at:   String,
  pub expires_at:     String,
}

impl RawFlashcard {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category:       row.get(0)?,
      paper_id:       row.get(1)?,
      headline:       row.get(2)?,
      insight:        row.get(3)?,
      why_it_matters: row.get(4)?,
      summary_json:   row.get(5)?,
      source_url:     row.get(6)?,
      published_at:   row.get(7)?,
      generated_at:   row.get(8)?,
      expires_at:     row.get(9)?,
    })
  }

  pub fn into_flashcard(self) -> Result<Flashcard> {
    Ok(Flashcard {
      category:        Category::parse(&self.category)?,
      paper_id:        self.paper_id,
      headline:        self.headline,
      insight:         self.insight,
      why_it_matters:  self.why_it_matters,
      summary_payload: decode_payload(&self.summary_json)?,
      source_url:      self.source_url,
      published_at:    decode_dt(&self.published_at)?,
      generated_at:    decode_dt(&self.generated_at)?,
      expires_at:      decode_dt(&self.expires_at)?,
    })
  }
}

/// Column list matching the field order of [`RawPaper`].
pub const PAPER_COLUMNS: &str =
  "paper_id, title, abstract, raw_text, categories, published_at, pdf_url, processed";

/// Raw values read directly from a `papers` row.
pub struct RawPaper {
  pub paper_id:     String,
  pub title:        String,
  pub abstract_:    String,
  pub raw_text:     Option<String>,
  pub categories:   String,
  pub published_at: String,
  pub pdf_url:      Option<String>,
  pub processed:    bool,
}

impl RawPaper {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      paper_id:     row.get(0)?,
      title:        row.get(1)?,
      abstract_:    row.get(2)?,
      raw_text:     row.get(3)?,
      categories:   row.get(4)?,
      published_at: row.get(5)?,
      pdf_url:      row.get(6)?,
      processed:    row.get(7)?,
    })
  }

  pub fn into_paper(self) -> Result<Paper> {
    Ok(Paper {
      paper_id:      self.paper_id,
      title:         self.title,
      abstract_text: self.abstract_,
      raw_text:      self.raw_text,
      categories:    decode_tags(&self.categories)?,
      published_at:  decode_dt(&self.published_at)?,
      pdf_url:       self.pdf_url,
      processed:     self.processed,
    })
  }
}
