//! The flashcard cache orchestrator.
//!
//! [`FlashcardCache`] serves decks of fresh flashcards out of a
//! [`FlashcardStore`](papercards_core::store::FlashcardStore) and regenerates
//! missing or stale ones through a
//! [`Summarizer`](papercards_core::summarizer::Summarizer), running at most
//! one regeneration pass per category at a time.

mod cache;
mod lease;
mod pass;

pub mod config;
pub mod error;

pub use cache::{Decks, FlashcardCache};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use pass::PassReport;

#[cfg(test)]
mod tests;
