//! The `Summarizer` capability: paper text in, flashcard fields out.

use std::future::Future;

use crate::{paper::Paper, payload::PayloadValue};

/// The structured result of summarizing one paper.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
  pub headline:       String,
  pub insight:        String,
  pub why_it_matters: Option<String>,
  /// Raw structured output; must be sanitized before it is persisted.
  pub payload:        PayloadValue,
}

/// A rate-limited external model that turns a paper into a [`Summary`].
///
/// Every call may fail on its own; a failure is always an `Err`, never an
/// empty `Summary`. Implementations must not retry internally: callers
/// budget their calls.
pub trait Summarizer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn summarize<'a>(
    &'a self,
    paper: &'a Paper,
  ) -> impl Future<Output = Result<Summary, Self::Error>> + Send + 'a;
}
