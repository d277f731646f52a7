//! Core types and trait definitions for the papercards flashcard cache.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, the summarizer adapter and the cache orchestrator all
//! depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod error;
pub mod flashcard;
pub mod paper;
pub mod payload;
pub mod store;
pub mod summarizer;

pub use category::Category;
pub use error::{Error, Result};
