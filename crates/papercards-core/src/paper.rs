//! Paper: a candidate record supplied by the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// A parsed paper as persisted by the ingestion pipeline.
///
/// Only `processed` papers are ever offered to the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
  /// External identifier, e.g. the arXiv id `2401.01234`.
  pub paper_id:      String,
  pub title:         String,
  pub abstract_text: String,
  /// Full text extracted from the PDF, when parsing succeeded.
  pub raw_text:      Option<String>,
  /// Every arXiv tag the paper was filed under, including ones outside the
  /// [`Category`] domain.
  pub categories:    Vec<String>,
  pub published_at:  DateTime<Utc>,
  pub pdf_url:       Option<String>,
  /// Set once the PDF has been fetched and parsed.
  pub processed:     bool,
}

impl Paper {
  /// The best available text for summarization: the parsed full text, or the
  /// abstract when parsing produced nothing.
  pub fn content(&self) -> &str {
    match self.raw_text.as_deref() {
      Some(text) if !text.trim().is_empty() => text,
      _ => &self.abstract_text,
    }
  }

  pub fn has_category(&self, category: Category) -> bool {
    self.categories.iter().any(|tag| tag == category.as_tag())
  }
}
