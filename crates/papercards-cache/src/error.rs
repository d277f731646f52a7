//! Error type for `papercards-cache`.

use std::sync::Arc;

use papercards_core::Category;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by the orchestrator.
///
/// Per-paper summarization failures never appear here; they are absorbed by
/// the regeneration pass. Use [`Error::is_client_error`] to separate bad
/// input from infrastructure trouble.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("category {0} is not enabled")]
  CategoryDisabled(Category),

  #[error("flashcard store unavailable: {0}")]
  Store(#[source] BoxError),

  #[error("paper source unavailable: {0}")]
  PaperSource(#[source] BoxError),

  #[error("regeneration pass for {category} failed: {source}")]
  Regeneration {
    category: Category,
    #[source]
    source:   Arc<Error>,
  },

  #[error("regeneration pass for {category} aborted: {reason}")]
  PassAborted { category: Category, reason: String },
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn paper_source(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::PaperSource(Box::new(e))
  }

  /// `true` for errors caused by the request itself (bad category), which
  /// retrying cannot fix.
  pub fn is_client_error(&self) -> bool {
    match self {
      Self::UnknownCategory(_) | Self::CategoryDisabled(_) => true,
      Self::Regeneration { source, .. } => source.is_client_error(),
      Self::Store(_) | Self::PaperSource(_) | Self::PassAborted { .. } => false,
    }
  }
}

impl From<papercards_core::Error> for Error {
  fn from(e: papercards_core::Error) -> Self {
    match e {
      papercards_core::Error::UnknownCategory(tag) => Self::UnknownCategory(tag),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
