//! Error type for `papercards-summarizer`.

use thiserror::Error;

/// A single failed summarization call. Callers treat every variant as a
/// per-paper failure.
#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("completion endpoint returned {status}: {message}")]
  Status { status: u16, message: String },

  #[error("completion contained no usable text")]
  EmptyResponse,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
