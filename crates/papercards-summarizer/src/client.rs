//! Async chat-completions client implementing [`Summarizer`].

use std::{fmt, time::Duration};

use chrono::Utc;
use papercards_core::{
  paper::Paper,
  payload::PayloadValue,
  summarizer::{Summarizer, Summary},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  Error, Result,
  extract::{extract, parse_completion},
  prompt::build_prompt,
};

const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
const DEFAULT_MODEL: &str = "meta/llama-3.3-70b-instruct";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Connection and sampling settings for the completion endpoint.
#[derive(Clone)]
pub struct SummarizerConfig {
  /// Base URL without the `/chat/completions` suffix.
  pub base_url:    String,
  pub model:       String,
  /// Sent as a bearer token when set.
  pub api_key:     Option<String>,
  /// Per-request timeout.
  pub timeout:     Duration,
  pub temperature: f32,
  pub top_p:       f32,
  pub max_tokens:  u32,
}

impl Default for SummarizerConfig {
  fn default() -> Self {
    Self {
      base_url:    DEFAULT_BASE_URL.to_string(),
      model:       DEFAULT_MODEL.to_string(),
      api_key:     None,
      timeout:     Duration::from_secs(60),
      temperature: 0.3,
      top_p:       0.9,
      max_tokens:  256,
    }
  }
}

impl fmt::Debug for SummarizerConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SummarizerConfig")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Summarizer backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone, Debug)]
pub struct NimSummarizer {
  client: Client,
  config: SummarizerConfig,
}

impl NimSummarizer {
  pub fn new(config: SummarizerConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn model(&self) -> &str { &self.config.model }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }

  fn request_body(&self, prompt: &str) -> Value {
    json!({
      "model": self.config.model,
      "messages": [{ "role": "user", "content": prompt }],
      "temperature": self.config.temperature,
      "top_p": self.config.top_p,
      "max_tokens": self.config.max_tokens,
      "response_format": { "type": "json_object" },
    })
  }

  /// Send one completion request and return the message content.
  async fn complete(&self, prompt: &str) -> Result<String> {
    let mut req = self.client.post(self.url()).json(&self.request_body(prompt));
    if let Some(key) = &self.config.api_key {
      req = req.bearer_auth(key);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or(body);
      return Err(Error::Status { status: status.as_u16(), message });
    }

    let parsed: ChatResponse = resp.json().await?;
    parsed
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|content| !content.trim().is_empty())
      .ok_or(Error::EmptyResponse)
  }
}

impl Summarizer for NimSummarizer {
  type Error = Error;

  async fn summarize(&self, paper: &Paper) -> Result<Summary> {
    tracing::debug!(paper_id = %paper.paper_id, model = %self.config.model, "requesting summary");

    let prompt = build_prompt(&paper.title, paper.content());
    let content = self.complete(&prompt).await?;
    let parsed = parse_completion(&content);
    let fields = extract(&parsed).ok_or(Error::EmptyResponse)?;

    let mut payload = PayloadValue::from(Value::Object(parsed));
    payload.insert("model", self.config.model.as_str());
    payload.insert("paper_title", paper.title.as_str());
    payload.insert("source_url", paper.pdf_url.clone());
    payload.insert("published_at", paper.published_at);
    payload.insert("summarized_at", Utc::now());

    Ok(Summary {
      headline:       fields.headline,
      insight:        fields.insight,
      why_it_matters: fields.why_it_matters,
      payload,
    })
  }
}
