//! [`FlashcardCache`] and the [`Decks`] seam the HTTP layer depends on.

use std::{future::Future, sync::Arc};

use futures::FutureExt as _;
use papercards_core::{
  Category,
  flashcard::{Deck, Flashcard},
  store::{FlashcardStore, PaperSource},
  summarizer::Summarizer,
};
use tracing::{debug, info};

use crate::{
  CacheConfig, Error, Result,
  lease::{Lease, LeaseGuard, Leases, PassHandle},
  pass::PassReport,
};

/// Passes one request may wait on: the one it joined or started, plus
/// follow-ups when it joined a pass sized for fewer cards.
const MAX_PASSES_PER_REQUEST: usize = 3;

// ─── Decks ───────────────────────────────────────────────────────────────────

/// Anything that can serve decks of flashcards.
///
/// Implemented by [`FlashcardCache`]; handlers are generic over it so they
/// can be exercised without a database or a model.
pub trait Decks: Send + Sync + 'static {
  /// Serve up to `limit` fresh cards for the category tag, regenerating
  /// first when the category is stale or `force_refresh` is set.
  fn deck<'a>(
    &'a self,
    category: &'a str,
    limit: Option<usize>,
    force_refresh: bool,
  ) -> impl Future<Output = Result<Deck>> + Send + 'a;

  /// Delete every expired card, returning how many were removed.
  fn sweep_expired(&self) -> impl Future<Output = Result<u64>> + Send + '_;

  /// The largest limit a request may ask for.
  fn max_limit(&self) -> usize;
}

// ─── FlashcardCache ──────────────────────────────────────────────────────────

pub(crate) struct Inner<St, Src, Sum> {
  pub store:      St,
  pub source:     Src,
  pub summarizer: Sum,
  pub config:     CacheConfig,
  pub leases:     Arc<Leases>,
}

/// Serves flashcard decks from the store, regenerating stale categories
/// through the summarizer with at most one pass per category in flight.
///
/// Cloning is cheap; clones share the store, the summarizer and the lease
/// registry.
pub struct FlashcardCache<St, Src, Sum> {
  inner: Arc<Inner<St, Src, Sum>>,
}

impl<St, Src, Sum> Clone for FlashcardCache<St, Src, Sum> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<St, Src, Sum> FlashcardCache<St, Src, Sum>
where
  St: FlashcardStore + 'static,
  Src: PaperSource + 'static,
  Sum: Summarizer + 'static,
{
  pub fn new(store: St, source: Src, summarizer: Sum, config: CacheConfig) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        source,
        summarizer,
        config: config.normalized(),
        leases: Arc::default(),
      }),
    }
  }

  pub fn config(&self) -> &CacheConfig { &self.inner.config }

  pub fn store(&self) -> &St { &self.inner.store }

  /// Number of regeneration passes currently running.
  pub fn in_flight(&self) -> usize { self.inner.leases.in_flight() }

  /// Parse a category tag and check it belongs to the served domain.
  pub fn resolve_category(&self, tag: &str) -> Result<Category> {
    let category = Category::parse(tag)?;
    if !self.inner.config.is_enabled(category) {
      return Err(Error::CategoryDisabled(category));
    }
    Ok(category)
  }

  /// Serve a deck for `category`.
  ///
  /// When at least `limit` fresh cards exist (and no refresh is forced) they
  /// are returned straight from the store. Otherwise the caller joins the
  /// category's in-flight pass or starts one, then re-reads the store. A
  /// caller that joined a pass started for a smaller limit and is still
  /// short runs a follow-up pass through the same registry. The deck may
  /// hold fewer than `limit` cards if summarization failed for some
  /// candidates; that is not an error.
  pub async fn get_flashcards(
    &self,
    category: &str,
    limit: Option<usize>,
    force_refresh: bool,
  ) -> Result<Deck> {
    let category = self.resolve_category(category)?;
    let limit = self.inner.config.clamp_limit(limit);

    if !force_refresh {
      let fresh = self.fresh(category, limit).await?;
      if fresh.len() >= limit {
        debug!(%category, limit, "cache hit");
        return Ok(Deck { category, cards: fresh, regenerated: false });
      }
    }

    let mut regenerated = false;
    for attempt in 0..MAX_PASSES_PER_REQUEST {
      let (report, covered) = self.regenerate(category, limit, force_refresh && attempt == 0).await?;
      regenerated |= !report.skipped;
      if covered {
        break;
      }
      let fresh = self.fresh(category, limit).await?;
      if fresh.len() >= limit {
        return Ok(Deck { category, cards: fresh, regenerated });
      }
      debug!(%category, limit, have = fresh.len(), "joined pass left the deck short");
    }

    let cards = self.fresh(category, limit).await?;
    Ok(Deck { category, cards, regenerated })
  }

  /// Delete every card whose TTL has elapsed.
  pub async fn sweep_expired(&self) -> Result<u64> {
    let removed = self.inner.store.delete_expired(None).await.map_err(Error::store)?;
    info!(removed, "swept expired flashcards");
    Ok(removed)
  }

  async fn fresh(&self, category: Category, limit: usize) -> Result<Vec<Flashcard>> {
    self
      .inner
      .store
      .fresh_for_category(category, limit, None)
      .await
      .map_err(Error::store)
  }

  /// Join or start the category's pass and wait for its outcome.
  ///
  /// Also returns whether the pass was sized for at least `limit` cards.
  async fn regenerate(
    &self,
    category: Category,
    limit: usize,
    force_refresh: bool,
  ) -> Result<(PassReport, bool)> {
    let lease = self.inner.leases.acquire(category, limit, || {
      spawn_pass(Arc::clone(&self.inner), category, limit, force_refresh)
    });
    let (handle, covered) = match lease {
      Lease::Started(handle) => (handle, true),
      Lease::Joined { handle, limit: pass_limit } => {
        debug!(%category, pass_limit, "joining in-flight regeneration pass");
        (handle, pass_limit >= limit)
      }
    };

    let report = handle.await.map_err(|source| Error::Regeneration { category, source })?;
    Ok((report, covered))
  }
}

/// Run the pass on its own task so a caller going away never cancels it.
fn spawn_pass<St, Src, Sum>(
  inner: Arc<Inner<St, Src, Sum>>,
  category: Category,
  limit: usize,
  force_refresh: bool,
) -> PassHandle
where
  St: FlashcardStore + 'static,
  Src: PaperSource + 'static,
  Sum: Summarizer + 'static,
{
  let task = tokio::spawn(async move {
    let _lease = LeaseGuard { leases: Arc::clone(&inner.leases), category };
    inner
      .run_pass(category, limit, force_refresh)
      .await
      .map_err(Arc::new)
  });

  async move {
    task.await.unwrap_or_else(|e| {
      Err(Arc::new(Error::PassAborted { category, reason: e.to_string() }))
    })
  }
  .boxed()
  .shared()
}

impl<St, Src, Sum> Decks for FlashcardCache<St, Src, Sum>
where
  St: FlashcardStore + 'static,
  Src: PaperSource + 'static,
  Sum: Summarizer + 'static,
{
  async fn deck(&self, category: &str, limit: Option<usize>, force_refresh: bool) -> Result<Deck> {
    self.get_flashcards(category, limit, force_refresh).await
  }

  async fn sweep_expired(&self) -> Result<u64> { FlashcardCache::sweep_expired(self).await }

  fn max_limit(&self) -> usize { self.inner.config.max_limit }
}
