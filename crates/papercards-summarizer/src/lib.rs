//! [`Summarizer`](papercards_core::summarizer::Summarizer) over an
//! OpenAI-compatible chat-completions endpoint.
//!
//! The default target is NVIDIA's hosted NIM endpoint, but any server that
//! speaks `/chat/completions` with `response_format = json_object` works.

mod client;
mod extract;
mod prompt;

pub mod error;

pub use client::{NimSummarizer, SummarizerConfig};
pub use error::{Error, Result};
