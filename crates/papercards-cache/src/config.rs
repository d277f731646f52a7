//! Tunables for [`FlashcardCache`](crate::FlashcardCache).

use std::time::Duration;

use chrono::TimeDelta;
use papercards_core::Category;

/// Upper bound on the number of cards a single request may ask for.
pub const LIMIT_CEILING: usize = 10;

#[derive(Debug, Clone)]
pub struct CacheConfig {
  /// How long a generated card stays fresh.
  pub ttl:                   TimeDelta,
  /// Cards served when the caller gives no limit.
  pub default_limit:         usize,
  pub max_limit:             usize,
  /// The category domain this deployment serves.
  pub categories:            Vec<Category>,
  /// A pass fetches `limit * candidate_factor` papers so failures can be
  /// backfilled.
  pub candidate_factor:      usize,
  /// Summarizer calls in flight at once within one pass.
  pub summarize_concurrency: usize,
  /// Wall-clock budget for one pass, measured from its start.
  pub pass_timeout:          Duration,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl:                   TimeDelta::hours(24),
      default_limit:         5,
      max_limit:             LIMIT_CEILING,
      categories:            Category::all(),
      candidate_factor:      2,
      summarize_concurrency: 4,
      pass_timeout:          Duration::from_secs(120),
    }
  }
}

impl CacheConfig {
  /// Bring every field into its valid range. An empty category list means
  /// the whole domain.
  pub fn normalized(mut self) -> Self {
    self.max_limit = self.max_limit.clamp(1, LIMIT_CEILING);
    self.default_limit = self.default_limit.clamp(1, self.max_limit);
    self.candidate_factor = self.candidate_factor.max(1);
    self.summarize_concurrency = self.summarize_concurrency.max(1);
    if self.ttl <= TimeDelta::zero() {
      self.ttl = TimeDelta::hours(24);
    }
    if self.categories.is_empty() {
      self.categories = Category::all();
    }
    self.categories.sort();
    self.categories.dedup();
    self
  }

  /// The limit actually served for a requested one.
  pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
    requested
      .unwrap_or(self.default_limit)
      .clamp(1, self.max_limit)
  }

  pub fn is_enabled(&self, category: Category) -> bool {
    self.categories.contains(&category)
  }
}
