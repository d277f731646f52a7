//! `papercards`: command-line client for the papercards flashcard API.
//!
//! # Usage
//!
//! ```
//! papercards deck cs.AI --limit 5
//! papercards --url http://localhost:8000 deck stat.ML --refresh
//! papercards --config ~/.config/papercards/config.toml sweep
//! ```

mod client;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, Card};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "papercards", about = "Read research-paper flashcards from a papercards server")]
struct Args {
  /// Path to a TOML config file (url, timeout_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the papercards server (default: http://localhost:8000).
  #[arg(long, env = "PAPERCARDS_URL")]
  url: Option<String>,

  /// Request timeout in seconds. Regeneration can take a while.
  #[arg(long)]
  timeout_secs: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the flashcard deck for a category.
  Deck {
    /// arXiv category tag, e.g. cs.AI.
    category: String,

    /// Number of cards (1-10).
    #[arg(short, long)]
    limit: Option<usize>,

    /// Regenerate even if fresh cards exist.
    #[arg(short, long)]
    refresh: bool,

    /// Print the raw cards as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Delete expired flashcards on the server.
  Sweep,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  timeout_secs: Option<u64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    timeout:  Duration::from_secs(args.timeout_secs.or(file_cfg.timeout_secs).unwrap_or(180)),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Deck { category, limit, refresh, json } => {
      let deck = client.deck(&category, limit, refresh).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&deck.cards)?);
        return Ok(());
      }
      if deck.cards.is_empty() {
        println!("No flashcards available for {category} yet.");
        return Ok(());
      }
      let origin = if deck.regenerated { "freshly generated" } else { "cached" };
      println!("{} flashcards for {category} ({origin})\n", deck.cards.len());
      for (i, card) in deck.cards.iter().enumerate() {
        print_card(i + 1, card);
      }
    }
    Command::Sweep => {
      let removed = client.sweep().await?;
      println!("Removed {removed} expired flashcard(s).");
    }
  }

  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_card(n: usize, card: &Card) {
  println!("{n}. {}", card.headline);
  println!("   {}", card.insight);
  if let Some(why) = &card.why_it_matters {
    println!("   Why it matters: {why}");
  }
  let link = card.source_url.as_deref().unwrap_or(&card.paper_id);
  println!(
    "   {link}  (expires {})\n",
    card.expires_at.format("%Y-%m-%d %H:%M UTC")
  );
}
