//! Orchestrator tests against an in-memory SQLite store and scripted
//! summarizers.

use std::{
  collections::HashSet,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone as _, Utc};
use papercards_core::{
  Category,
  flashcard::Flashcard,
  paper::Paper,
  payload::{PayloadValue, sanitize},
  store::{FlashcardStore, PaperSource},
  summarizer::{Summarizer, Summary},
};
use papercards_store_sqlite::SqliteStore;
use serde_json::json;

use crate::{CacheConfig, Decks, Error, FlashcardCache};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(&'static str);

/// Summarizer with scripted failures and hangs that counts every call.
#[derive(Clone, Default)]
struct FakeSummarizer {
  calls:   Arc<AtomicUsize>,
  failing: Arc<HashSet<String>>,
  hanging: Arc<HashSet<String>>,
  delay:   Duration,
}

impl FakeSummarizer {
  fn failing(ids: &[&str]) -> Self {
    Self { failing: Arc::new(ids.iter().map(|s| s.to_string()).collect()), ..Self::default() }
  }

  fn hanging(ids: &[&str]) -> Self {
    Self { hanging: Arc::new(ids.iter().map(|s| s.to_string()).collect()), ..Self::default() }
  }

  fn slow(delay: Duration) -> Self { Self { delay, ..Self::default() } }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Summarizer for FakeSummarizer {
  type Error = FakeError;

  async fn summarize(&self, paper: &Paper) -> Result<Summary, FakeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    if self.hanging.contains(&paper.paper_id) {
      std::future::pending::<()>().await;
    }
    if self.failing.contains(&paper.paper_id) {
      return Err(FakeError("model unavailable"));
    }

    let mut meta = PayloadValue::map();
    meta.insert("seen_on", NaiveDate::from_ymd_opt(2024, 3, 1));
    let mut payload = PayloadValue::map();
    payload.insert("answer", format!("Summary of {}", paper.title));
    payload.insert("published_at", paper.published_at);
    payload.insert("generated_at", Utc::now());
    payload.insert("meta", meta);

    Ok(Summary {
      headline: format!("Headline {}", paper.paper_id),
      insight: "A short insight.".into(),
      why_it_matters: Some("It matters.".into()),
      payload,
    })
  }
}

/// A store whose backend is down.
struct BrokenStore;

impl FlashcardStore for BrokenStore {
  type Error = FakeError;

  async fn fresh_for_category(
    &self,
    _: Category,
    _: usize,
    _: Option<DateTime<Utc>>,
  ) -> Result<Vec<Flashcard>, FakeError> {
    Err(FakeError("store offline"))
  }

  async fn upsert(&self, _: Flashcard) -> Result<(), FakeError> { Err(FakeError("store offline")) }

  async fn delete_expired(&self, _: Option<DateTime<Utc>>) -> Result<u64, FakeError> {
    Err(FakeError("store offline"))
  }

  async fn count_for_category(&self, _: Category) -> Result<u64, FakeError> {
    Err(FakeError("store offline"))
  }
}

/// A paper source whose backend is down.
struct BrokenSource;

impl PaperSource for BrokenSource {
  type Error = FakeError;

  async fn fetch_recent(&self, _: Category, _: usize) -> Result<Vec<Paper>, FakeError> {
    Err(FakeError("paper source offline"))
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

type TestCache = FlashcardCache<SqliteStore, SqliteStore, FakeSummarizer>;

async fn setup(summarizer: FakeSummarizer, config: CacheConfig) -> (TestCache, SqliteStore) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let cache = FlashcardCache::new(store.clone(), store.clone(), summarizer, config);
  (cache, store)
}

fn published(i: usize) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 28, 12, 0, 0).unwrap() - TimeDelta::days(i as i64)
}

fn paper_id(i: usize) -> String { format!("2403.{i:05}") }

/// Seed `n` processed papers; index 0 is the most recently published.
async fn seed_papers(store: &SqliteStore, category: Category, n: usize) {
  for i in 0..n {
    store
      .upsert_paper(&Paper {
        paper_id:      paper_id(i),
        title:         format!("Paper {i}"),
        abstract_text: "An abstract.".into(),
        raw_text:      Some("Full text.".into()),
        categories:    vec![category.to_string()],
        published_at:  published(i),
        pdf_url:       Some(format!("https://arxiv.org/pdf/{}", paper_id(i))),
        processed:     true,
      })
      .await
      .unwrap();
  }
}

async fn seed_card(
  store: &SqliteStore,
  category: Category,
  id: &str,
  published_at: DateTime<Utc>,
  expires_at: DateTime<Utc>,
) {
  store
    .upsert(Flashcard {
      category,
      paper_id: id.into(),
      headline: format!("Seeded {id}"),
      insight: "Seeded insight.".into(),
      why_it_matters: None,
      summary_payload: sanitize(PayloadValue::map()),
      source_url: None,
      published_at,
      generated_at: expires_at - TimeDelta::hours(24),
      expires_at,
    })
    .await
    .unwrap();
}

fn ids(cards: &[Flashcard]) -> Vec<String> { cards.iter().map(|c| c.paper_id.clone()).collect() }

// ─── Cache hits and misses ───────────────────────────────────────────────────

#[tokio::test]
async fn stale_category_is_regenerated_with_ttl() {
  let summarizer = FakeSummarizer::default();
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 5).await;

  let before = Utc::now();
  let deck = cache.get_flashcards("cs.AI", Some(5), false).await.unwrap();

  assert!(deck.regenerated);
  assert_eq!(deck.category, Category::CsAi);
  assert_eq!(ids(&deck.cards), (0..5).map(paper_id).collect::<Vec<_>>());
  assert_eq!(summarizer.calls(), 5);
  for card in &deck.cards {
    assert_eq!(card.expires_at - card.generated_at, TimeDelta::hours(24));
    assert!((card.generated_at - before).num_seconds().abs() < 60);
    assert_eq!(card.source_url.as_deref(), Some(format!("https://arxiv.org/pdf/{}", card.paper_id).as_str()));
  }
  assert_eq!(store.count_for_category(Category::CsAi).await.unwrap(), 5);
  assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn fresh_category_is_served_without_summarizing() {
  let summarizer = FakeSummarizer::default();
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  let expires = Utc::now() + TimeDelta::hours(1);
  for i in 0..5 {
    seed_card(&store, Category::CsLg, &paper_id(i), published(i), expires).await;
  }

  let deck = cache.get_flashcards("cs.LG", Some(3), false).await.unwrap();

  assert!(!deck.regenerated);
  assert_eq!(ids(&deck.cards), (0..3).map(paper_id).collect::<Vec<_>>());
  assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn force_refresh_replaces_fresh_cards() {
  let summarizer = FakeSummarizer::default();
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 5).await;
  let expires = Utc::now() + TimeDelta::hours(1);
  for i in 0..5 {
    seed_card(&store, Category::CsAi, &paper_id(i), published(i), expires).await;
  }

  let deck = cache.get_flashcards("cs.AI", Some(5), true).await.unwrap();

  assert!(deck.regenerated);
  assert_eq!(summarizer.calls(), 5);
  assert_eq!(store.count_for_category(Category::CsAi).await.unwrap(), 5);
  assert!(deck.cards.iter().all(|c| c.expires_at > expires));
  assert!(deck.cards.iter().all(|c| c.headline.starts_with("Headline")));
}

#[tokio::test]
async fn partially_fresh_category_is_topped_up() {
  let summarizer = FakeSummarizer::default();
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 5).await;
  seed_card(&store, Category::CsAi, &paper_id(0), published(0), Utc::now() + TimeDelta::hours(1)).await;

  let deck = cache.get_flashcards("cs.AI", Some(5), false).await.unwrap();
  assert_eq!(deck.len(), 5);
  assert_eq!(store.count_for_category(Category::CsAi).await.unwrap(), 5);
  assert_eq!(summarizer.calls(), 4);
}

#[tokio::test]
async fn regeneration_keeps_unrelated_fresh_cards() {
  let (cache, store) = setup(FakeSummarizer::default(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 3).await;
  let old = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
  seed_card(&store, Category::CsAi, "2301.00001", old, Utc::now() + TimeDelta::hours(1)).await;

  let deck = cache.get_flashcards("cs.AI", Some(5), false).await.unwrap();

  let mut expected: Vec<String> = (0..3).map(paper_id).collect();
  expected.push("2301.00001".into());
  assert_eq!(ids(&deck.cards), expected);
}

// ─── Input validation ────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_and_disabled_categories_are_client_errors() {
  let summarizer = FakeSummarizer::default();
  let config = CacheConfig { categories: vec![Category::CsAi], ..CacheConfig::default() };
  let (cache, _) = setup(summarizer.clone(), config).await;

  let err = cache.get_flashcards("cs.XX", None, false).await.unwrap_err();
  assert!(matches!(err, Error::UnknownCategory(ref tag) if tag == "cs.XX"));
  assert!(err.is_client_error());

  let err = cache.get_flashcards("CS.AI", None, false).await.unwrap_err();
  assert!(matches!(err, Error::UnknownCategory(_)));

  let err = cache.get_flashcards("cs.LG", None, false).await.unwrap_err();
  assert!(matches!(err, Error::CategoryDisabled(Category::CsLg)));
  assert!(err.is_client_error());

  assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn limit_is_clamped() {
  let (cache, store) = setup(FakeSummarizer::default(), CacheConfig::default()).await;
  let expires = Utc::now() + TimeDelta::hours(1);
  for i in 0..12 {
    seed_card(&store, Category::StatMl, &paper_id(i), published(i), expires).await;
  }

  assert_eq!(cache.get_flashcards("stat.ML", Some(50), false).await.unwrap().len(), 10);
  assert_eq!(cache.get_flashcards("stat.ML", Some(0), false).await.unwrap().len(), 1);
  assert_eq!(cache.get_flashcards("stat.ML", None, false).await.unwrap().len(), 5);
}

// ─── Partial failure ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_papers_are_backfilled_from_spare_candidates() {
  let summarizer = FakeSummarizer::failing(&["2403.00001", "2403.00003"]);
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsCl, 8).await;

  let deck = cache.get_flashcards("cs.CL", Some(5), false).await.unwrap();

  assert_eq!(ids(&deck.cards), [0, 2, 4, 5, 6].map(paper_id));
  assert_eq!(summarizer.calls(), 7);
}

#[tokio::test]
async fn summarizer_is_not_called_beyond_the_limit() {
  for (limit, expected) in [(5, 5), (1, 1)] {
    let summarizer = FakeSummarizer::slow(Duration::from_millis(10));
    let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
    seed_papers(&store, Category::CsAi, 10).await;

    let deck = cache.get_flashcards("cs.AI", Some(limit), false).await.unwrap();
    assert_eq!(ids(&deck.cards), (0..expected).map(paper_id).collect::<Vec<_>>());
    assert_eq!(summarizer.calls(), expected);
  }
}

#[tokio::test]
async fn failures_without_spares_yield_a_short_deck() {
  let summarizer = FakeSummarizer::failing(&["2403.00001", "2403.00003"]);
  let (cache, store) = setup(summarizer, CacheConfig::default()).await;
  seed_papers(&store, Category::CsCv, 5).await;

  let deck = cache.get_flashcards("cs.CV", Some(5), false).await.unwrap();
  assert!(deck.regenerated);
  assert_eq!(ids(&deck.cards), [0, 2, 4].map(paper_id));
}

#[tokio::test]
async fn all_failures_yield_an_empty_deck() {
  let failing: Vec<String> = (0..3).map(paper_id).collect();
  let refs: Vec<&str> = failing.iter().map(String::as_str).collect();
  let (cache, store) = setup(FakeSummarizer::failing(&refs), CacheConfig::default()).await;
  seed_papers(&store, Category::CsIr, 3).await;

  let deck = cache.get_flashcards("cs.IR", None, false).await.unwrap();
  assert!(deck.is_empty());
  assert_eq!(store.count_for_category(Category::CsIr).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_candidate_pool_yields_an_empty_deck() {
  let summarizer = FakeSummarizer::default();
  let (cache, _) = setup(summarizer.clone(), CacheConfig::default()).await;

  let deck = cache.get_flashcards("cs.AI", None, false).await.unwrap();
  assert!(deck.is_empty());
  assert!(deck.regenerated);
  assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn deck_composition_is_deterministic() {
  let summarizer = FakeSummarizer::failing(&["2403.00002"]);
  let (cache, store) = setup(summarizer, CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 8).await;

  let first = cache.get_flashcards("cs.AI", Some(4), true).await.unwrap();
  let second = cache.get_flashcards("cs.AI", Some(4), true).await.unwrap();
  assert_eq!(ids(&first.cards), ids(&second.cards));
  assert_eq!(ids(&first.cards), [0, 1, 3, 4].map(paper_id));
}

// ─── Infrastructure failure ──────────────────────────────────────────────────

#[tokio::test]
async fn store_outage_is_not_a_cache_miss() {
  let summarizer = FakeSummarizer::default();
  let cache = FlashcardCache::new(BrokenStore, BrokenSource, summarizer.clone(), CacheConfig::default());

  let err = cache.get_flashcards("cs.AI", None, false).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  assert!(!err.is_client_error());
  assert_eq!(summarizer.calls(), 0);

  assert!(matches!(cache.sweep_expired().await, Err(Error::Store(_))));
}

#[tokio::test]
async fn paper_source_outage_fails_the_pass() {
  let summarizer = FakeSummarizer::default();
  let store = SqliteStore::open_in_memory().await.unwrap();
  let cache = FlashcardCache::new(store, BrokenSource, summarizer.clone(), CacheConfig::default());

  let err = cache.get_flashcards("cs.AI", None, false).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Regeneration { category: Category::CsAi, ref source } if matches!(**source, Error::PaperSource(_))
  ));
  assert!(!err.is_client_error());
  assert_eq!(summarizer.calls(), 0);
  assert_eq!(cache.in_flight(), 0);
}

// ─── Timeout ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pass_deadline_keeps_staged_cards() {
  let summarizer = FakeSummarizer::hanging(&["2403.00001"]);
  let config = CacheConfig {
    pass_timeout: Duration::from_millis(200),
    summarize_concurrency: 1,
    ..CacheConfig::default()
  };
  let (cache, store) = setup(summarizer.clone(), config).await;
  seed_papers(&store, Category::CsAi, 5).await;

  let deck = cache.get_flashcards("cs.AI", Some(5), false).await.unwrap();

  assert_eq!(ids(&deck.cards), [paper_id(0)]);
  assert_eq!(summarizer.calls(), 2);
  assert_eq!(cache.in_flight(), 0);
}

// ─── Single flight ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_pass() {
  let summarizer = FakeSummarizer::slow(Duration::from_millis(50));
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 5).await;

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let cache = cache.clone();
      tokio::spawn(async move { cache.get_flashcards("cs.AI", Some(5), false).await })
    })
    .collect();

  for handle in handles {
    let deck = handle.await.unwrap().unwrap();
    assert_eq!(deck.len(), 5);
  }
  assert_eq!(summarizer.calls(), 5);
  assert_eq!(store.count_for_category(Category::CsAi).await.unwrap(), 5);
  assert_eq!(cache.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joining_a_smaller_pass_still_fills_the_deck() {
  let summarizer = FakeSummarizer::slow(Duration::from_millis(30));
  let (cache, store) = setup(summarizer.clone(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 10).await;

  let small = {
    let cache = cache.clone();
    tokio::spawn(async move { cache.get_flashcards("cs.AI", Some(1), false).await })
  };
  for _ in 0..500 {
    if cache.in_flight() == 1 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
  }
  let large = cache.get_flashcards("cs.AI", Some(10), false).await.unwrap();

  assert_eq!(small.await.unwrap().unwrap().len(), 1);
  assert!(large.regenerated);
  assert_eq!(ids(&large.cards), (0..10).map(paper_id).collect::<Vec<_>>());
  assert_eq!(summarizer.calls(), 10);
  assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn cancelled_caller_does_not_abort_the_pass() {
  let summarizer = FakeSummarizer::slow(Duration::from_millis(50));
  let (cache, store) = setup(summarizer, CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 5).await;

  let caller = {
    let cache = cache.clone();
    tokio::spawn(async move { cache.get_flashcards("cs.AI", Some(5), false).await })
  };
  for _ in 0..500 {
    if cache.in_flight() == 1 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
  }
  assert_eq!(cache.in_flight(), 1);
  caller.abort();

  let mut count = 0;
  for _ in 0..100 {
    count = store.count_for_category(Category::CsAi).await.unwrap();
    if count == 5 && cache.in_flight() == 0 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  assert_eq!(count, 5);
  assert_eq!(cache.in_flight(), 0);
}

// ─── Payload and sweep ───────────────────────────────────────────────────────

#[tokio::test]
async fn persisted_payload_is_sanitized() {
  let (cache, store) = setup(FakeSummarizer::default(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 1).await;

  cache.get_flashcards("cs.AI", Some(1), false).await.unwrap();

  let card = store.get_flashcard(Category::CsAi, &paper_id(0)).await.unwrap().unwrap();
  let payload = card.summary_payload.as_json();
  assert!(payload.get("generated_at").is_none());
  assert_eq!(payload["published_at"], json!("2024-03-28T12:00:00Z"));
  assert_eq!(payload["meta"], json!({ "seen_on": "2024-03-01" }));
  assert_eq!(payload["answer"], json!("Summary of Paper 0"));
}

#[tokio::test]
async fn sweep_removes_expired_cards_once() {
  let (cache, store) = setup(FakeSummarizer::default(), CacheConfig::default()).await;
  let now = Utc::now();
  seed_card(&store, Category::CsAi, "stale-1", published(0), now - TimeDelta::hours(1)).await;
  seed_card(&store, Category::CsLg, "stale-2", published(0), now - TimeDelta::minutes(5)).await;
  seed_card(&store, Category::CsAi, "fresh", published(0), now + TimeDelta::hours(1)).await;

  assert_eq!(cache.sweep_expired().await.unwrap(), 2);
  assert_eq!(Decks::sweep_expired(&cache).await.unwrap(), 0);
  assert_eq!(store.count_for_category(Category::CsAi).await.unwrap(), 1);
}

#[tokio::test]
async fn decks_trait_delegates_to_the_cache() {
  let (cache, store) = setup(FakeSummarizer::default(), CacheConfig::default()).await;
  seed_papers(&store, Category::CsAi, 2).await;

  let deck = cache.deck("cs.AI", Some(2), false).await.unwrap();
  assert_eq!(deck.len(), 2);
  assert_eq!(cache.max_limit(), 10);
}
