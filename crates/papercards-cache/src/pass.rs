//! One regeneration pass for one category.

use std::{collections::HashSet, time::Duration};

use chrono::{SubsecRound as _, Utc};
use futures::{
  FutureExt as _, StreamExt as _,
  future::BoxFuture,
  stream::FuturesOrdered,
};
use papercards_core::{
  Category,
  flashcard::Flashcard,
  paper::Paper,
  payload::{SanitizedPayload, sanitize},
  store::{FlashcardStore, PaperSource},
  summarizer::{Summarizer, Summary},
};
use tokio::time::{Instant, error::Elapsed, timeout_at};
use tracing::{debug, info, warn};

use crate::{Error, Result, cache::Inner};

/// What a regeneration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
  /// Papers fetched from the candidate pool.
  pub candidates: usize,
  /// Cards summarized and persisted.
  pub generated:  usize,
  /// Summarizer calls that failed and were skipped.
  pub failed:     usize,
  /// The pass deadline expired before `limit` cards were staged.
  pub timed_out:  bool,
  /// The category turned out to be fresh already; nothing ran.
  pub skipped:    bool,
  pub elapsed:    Duration,
}

/// A paper and the outcome of summarizing it within the pass deadline.
type Attempt<'a, E> = (&'a Paper, Result<Result<Summary, E>, Elapsed>);

/// A summary ready to be stamped and persisted.
struct Staged<'a> {
  paper:          &'a Paper,
  headline:       String,
  insight:        String,
  why_it_matters: Option<String>,
  payload:        SanitizedPayload,
}

impl<St, Src, Sum> Inner<St, Src, Sum>
where
  St: FlashcardStore,
  Src: PaperSource,
  Sum: Summarizer,
{
  pub(crate) async fn run_pass(
    &self,
    category: Category,
    limit: usize,
    force_refresh: bool,
  ) -> Result<PassReport> {
    let started = Instant::now();
    let deadline = started + self.config.pass_timeout;

    // A caller may have raced past a pass that finished just before this one
    // was registered. Papers that already have a fresh card are not
    // summarized again.
    let mut fresh_ids = HashSet::new();
    if !force_refresh {
      let fresh = self
        .store
        .fresh_for_category(category, limit, None)
        .await
        .map_err(Error::store)?;
      if fresh.len() >= limit {
        debug!(%category, "category already fresh; skipping pass");
        return Ok(PassReport { skipped: true, elapsed: started.elapsed(), ..PassReport::default() });
      }
      fresh_ids.extend(fresh.into_iter().map(|card| card.paper_id));
    }
    let target = limit - fresh_ids.len();

    let wanted = limit.saturating_mul(self.config.candidate_factor);
    let candidates: Vec<Paper> = self
      .source
      .fetch_recent(category, wanted)
      .await
      .map_err(Error::paper_source)?
      .into_iter()
      .filter(|paper| !fresh_ids.contains(&paper.paper_id))
      .collect();

    let mut report = PassReport { candidates: candidates.len(), ..PassReport::default() };
    if candidates.is_empty() {
      warn!(%category, "no processed papers to summarize");
      report.elapsed = started.elapsed();
      return Ok(report);
    }

    let staged = self.summarize_candidates(category, &candidates, target, deadline, &mut report).await;

    let generated_at = Utc::now().trunc_subsecs(6);
    let expires_at = generated_at + self.config.ttl;
    for Staged { paper, headline, insight, why_it_matters, payload } in staged {
      let card = Flashcard {
        category,
        paper_id: paper.paper_id.clone(),
        headline,
        insight,
        why_it_matters,
        summary_payload: payload,
        source_url: paper.pdf_url.clone(),
        published_at: paper.published_at,
        generated_at,
        expires_at,
      };
      self.store.upsert(card).await.map_err(Error::store)?;
      report.generated += 1;
    }

    report.elapsed = started.elapsed();
    info!(
      %category,
      candidates = report.candidates,
      generated = report.generated,
      failed = report.failed,
      timed_out = report.timed_out,
      elapsed_ms = report.elapsed.as_millis() as u64,
      "regeneration pass finished"
    );
    Ok(report)
  }

  /// Summarize candidates in order until `target` succeed, the candidates
  /// run out, or the deadline passes.
  ///
  /// At most `summarize_concurrency` calls are in flight, and a call is only
  /// started while `staged + in_flight < target`, so no call is made for a
  /// card that could not be used.
  async fn summarize_candidates<'s, 'a: 's>(
    &'s self,
    category: Category,
    candidates: &'a [Paper],
    target: usize,
    deadline: Instant,
    report: &mut PassReport,
  ) -> Vec<Staged<'a>> {
    let mut staged = Vec::with_capacity(target);
    let mut pending = candidates.iter();
    let mut in_flight: FuturesOrdered<BoxFuture<'s, Attempt<'a, Sum::Error>>> =
      FuturesOrdered::new();

    loop {
      while in_flight.len() < self.config.summarize_concurrency
        && staged.len() + in_flight.len() < target
      {
        let Some(paper) = pending.next() else { break };
        in_flight.push_back(self.attempt(paper, deadline));
      }
      let Some((paper, outcome)) = in_flight.next().await else {
        break;
      };

      match outcome {
        Ok(Ok(Summary { headline, insight, why_it_matters, payload })) => {
          if payload.contains_temporal() {
            debug!(paper_id = %paper.paper_id, "normalizing temporal values in payload");
          }
          let payload = sanitize(payload);
          staged.push(Staged { paper, headline, insight, why_it_matters, payload });
          if staged.len() >= target {
            break;
          }
        }
        Ok(Err(e)) => {
          report.failed += 1;
          warn!(%category, paper_id = %paper.paper_id, error = %e, "summarization failed; skipping paper");
        }
        Err(_) => {
          report.timed_out = true;
          warn!(
            %category,
            paper_id = %paper.paper_id,
            staged = staged.len(),
            "pass deadline reached; keeping staged cards"
          );
          break;
        }
      }
    }
    staged
  }

  /// One summarizer call bounded by the pass deadline.
  fn attempt<'s, 'a: 's>(
    &'s self,
    paper: &'a Paper,
    deadline: Instant,
  ) -> BoxFuture<'s, Attempt<'a, Sum::Error>> {
    async move { (paper, timeout_at(deadline, self.summarizer.summarize(paper)).await) }.boxed()
  }
}
