//! Wiring for the papercards HTTP server: configuration, the top-level
//! router and the periodic expiry sweep.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{Router, routing::get};
use chrono::TimeDelta;
use papercards_cache::{CacheConfig, Decks, FlashcardCache};
use papercards_core::Category;
use papercards_store_sqlite::SqliteStore;
use papercards_summarizer::{NimSummarizer, SummarizerConfig};
use serde::{Deserialize, Deserializer, de::Error as _};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;

/// The cache as the server wires it.
pub type Cache = FlashcardCache<SqliteStore, SqliteStore, NimSummarizer>;

const ENV_PREFIX: &str = "PAPERCARDS";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PAPERCARDS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  pub ttl_hours:             i64,
  pub default_limit:         usize,
  pub max_limit:             usize,
  /// Categories this deployment serves; a list, or a comma-separated string
  /// when set from the environment.
  #[serde(deserialize_with = "categories")]
  pub category_domain:       Vec<Category>,
  pub candidate_factor:      usize,
  pub summarize_concurrency: usize,
  pub pass_timeout_secs:     u64,
  /// Run the expiry sweep this often. Unset or zero disables it.
  pub sweep_interval_secs:   Option<u64>,
  pub llm_base_url:          String,
  pub llm_model:             String,
  pub llm_api_key:           Option<String>,
  pub llm_timeout_secs:      u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let cache = CacheConfig::default();
    let llm = SummarizerConfig::default();
    Self {
      host:                  "127.0.0.1".to_string(),
      port:                  8000,
      store_path:            PathBuf::from("papercards.db"),
      ttl_hours:             cache.ttl.num_hours(),
      default_limit:         cache.default_limit,
      max_limit:             cache.max_limit,
      category_domain:       cache.categories,
      candidate_factor:      cache.candidate_factor,
      summarize_concurrency: cache.summarize_concurrency,
      pass_timeout_secs:     cache.pass_timeout.as_secs(),
      sweep_interval_secs:   None,
      llm_base_url:          llm.base_url,
      llm_model:             llm.model,
      llm_api_key:           None,
      llm_timeout_secs:      llm.timeout.as_secs(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(environment()),
    )
  }

  pub fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    builder.build()?.try_deserialize()
  }

  /// Fails when `ttl_hours` is not a positive number of hours `chrono` can
  /// represent.
  pub fn cache_config(&self) -> Result<CacheConfig, config::ConfigError> {
    let ttl = TimeDelta::try_hours(self.ttl_hours)
      .filter(|ttl| *ttl > TimeDelta::zero())
      .ok_or_else(|| {
        config::ConfigError::Message(format!("ttl_hours must be a positive number of hours, got {}", self.ttl_hours))
      })?;
    Ok(CacheConfig {
      ttl,
      default_limit:         self.default_limit,
      max_limit:             self.max_limit,
      categories:            self.category_domain.clone(),
      candidate_factor:      self.candidate_factor,
      summarize_concurrency: self.summarize_concurrency,
      pass_timeout:          Duration::from_secs(self.pass_timeout_secs),
    }
    .normalized())
  }

  pub fn summarizer_config(&self) -> SummarizerConfig {
    SummarizerConfig {
      base_url: self.llm_base_url.clone(),
      model: self.llm_model.clone(),
      api_key: self.llm_api_key.clone().filter(|k| !k.trim().is_empty()),
      timeout: Duration::from_secs(self.llm_timeout_secs),
      ..SummarizerConfig::default()
    }
  }

  pub fn sweep_interval(&self) -> Option<Duration> {
    self.sweep_interval_secs.filter(|s| *s > 0).map(Duration::from_secs)
  }
}

/// `PAPERCARDS_*` variables, with `PAPERCARDS_CATEGORY_DOMAIN` split on
/// commas.
pub fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .try_parsing(true)
    .list_separator(",")
    .with_list_parse_key("category_domain")
}

fn categories<'de, D>(deserializer: D) -> Result<Vec<Category>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Tags {
    List(Vec<String>),
    Csv(String),
  }

  let tags = match Tags::deserialize(deserializer)? {
    Tags::List(tags) => tags,
    Tags::Csv(csv) => csv.split(',').map(str::to_owned).collect(),
  };
  tags
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .map(|t| Category::parse(t).map_err(D::Error::custom))
    .collect()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: `/ping` plus the JSON API under `/api/v1`, with
/// request tracing.
pub fn router<D: Decks>(decks: Arc<D>) -> Router {
  Router::new()
    .route("/ping", get(|| async { "pong" }))
    .nest("/api/v1", papercards_api::api_router(decks))
    .layer(TraceLayer::new_for_http())
}

// ─── Periodic sweep ──────────────────────────────────────────────────────────

/// Sweep expired cards every `every`, starting immediately. Failures are
/// logged and retried on the next tick.
pub fn spawn_sweeper<D: Decks>(decks: Arc<D>, every: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      if let Err(e) = decks.sweep_expired().await {
        tracing::warn!(error = %e, "periodic sweep failed");
      }
    }
  })
}
