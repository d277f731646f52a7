//! papercards server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `PAPERCARDS_*` environment variables, opens the SQLite store, and serves
//! the flashcard API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use papercards_cache::FlashcardCache;
use papercards_server::{ServerConfig, router, spawn_sweeper};
use papercards_store_sqlite::SqliteStore;
use papercards_summarizer::NimSummarizer;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "papercards flashcard server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let summarizer_cfg = server_cfg.summarizer_config();
  if summarizer_cfg.api_key.is_none() {
    tracing::warn!("no LLM API key configured; summarizer requests will be unauthenticated");
  }
  let summarizer = NimSummarizer::new(summarizer_cfg).context("failed to build summarizer client")?;

  let cache_cfg = server_cfg.cache_config().context("invalid cache configuration")?;
  tracing::info!(
    categories = ?cache_cfg.categories,
    ttl_hours = cache_cfg.ttl.num_hours(),
    model = summarizer.model(),
    "flashcard cache ready"
  );
  let cache = Arc::new(FlashcardCache::new(store.clone(), store, summarizer, cache_cfg));

  if let Some(every) = server_cfg.sweep_interval() {
    tracing::info!(interval_secs = every.as_secs(), "periodic expiry sweep enabled");
    spawn_sweeper(cache.clone(), every);
  }

  let app = router(cache);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
