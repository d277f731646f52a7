//! [`SqliteStore`], the SQLite implementation of [`FlashcardStore`] and
//! [`PaperSource`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use papercards_core::{
  Category,
  flashcard::Flashcard,
  paper::Paper,
  store::{FlashcardStore, PaperSource},
};

use crate::{
  Result,
  encode::{
    FLASHCARD_COLUMNS, PAPER_COLUMNS, RawFlashcard, RawPaper, encode_dt,
    encode_payload, encode_tags,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A flashcard store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace a paper in the candidate pool. This is the ingestion
  /// pipeline's write path; the cache itself only ever reads papers.
  pub async fn upsert_paper(&self, paper: &Paper) -> Result<()> {
    let paper_id_str   = paper.paper_id.clone();
    let title          = paper.title.clone();
    let abstract_text  = paper.abstract_text.clone();
    let raw_text       = paper.raw_text.clone();
    let categories_str = encode_tags(&paper.categories)?;
    let published_str  = encode_dt(paper.published_at);
    let pdf_url        = paper.pdf_url.clone();
    let processed      = paper.processed;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO papers (
             paper_id, title, abstract, raw_text, categories,
             published_at, pdf_url, processed
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(paper_id) DO UPDATE SET
             title        = excluded.title,
             abstract     = excluded.abstract,
             raw_text     = excluded.raw_text,
             categories   = excluded.categories,
             published_at = excluded.published_at,
             pdf_url      = excluded.pdf_url,
             processed    = excluded.processed",
          rusqlite::params![
            paper_id_str,
            title,
            abstract_text,
            raw_text,
            categories_str,
            published_str,
            pdf_url,
            processed,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch the record for `(category, paper_id)` regardless of freshness.
  pub async fn get_flashcard(
    &self,
    category: Category,
    paper_id: &str,
  ) -> Result<Option<Flashcard>> {
    let category_str = category.to_string();
    let paper_id_str = paper_id.to_owned();

    let raw: Option<RawFlashcard> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {FLASHCARD_COLUMNS} FROM flashcards
               WHERE category = ?1 AND paper_id = ?2"
            ),
            rusqlite::params![category_str, paper_id_str],
            RawFlashcard::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFlashcard::into_flashcard).transpose()
  }
}

// ─── FlashcardStore impl ─────────────────────────────────────────────────────

impl FlashcardStore for SqliteStore {
  type Error = crate::Error;

  async fn fresh_for_category(
    &self,
    category: Category,
    limit:    usize,
    as_of:    Option<DateTime<Utc>>,
  ) -> Result<Vec<Flashcard>> {
    let category_str = category.to_string();
    let as_of_str    = encode_dt(as_of.unwrap_or_else(Utc::now));
    let limit_val    = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawFlashcard> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FLASHCARD_COLUMNS} FROM flashcards
           WHERE category = ?1
             AND expires_at > ?2
           ORDER BY published_at DESC, paper_id ASC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![category_str, as_of_str, limit_val],
            RawFlashcard::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFlashcard::into_flashcard).collect()
  }

  async fn upsert(&self, card: Flashcard) -> Result<()> {
    let category_str  = card.category.to_string();
    let payload_str   = encode_payload(&card.summary_payload)?;
    let published_str = encode_dt(card.published_at);
    let generated_str = encode_dt(card.generated_at);
    let expires_str   = encode_dt(card.expires_at);
    let now_str       = encode_dt(Utc::now());

    // One statement: a concurrent reader sees the old row or the new one.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO flashcards (
             category, paper_id, headline, insight, why_it_matters,
             summary_json, source_url, published_at, generated_at, expires_at,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
           ON CONFLICT(category, paper_id) DO UPDATE SET
             headline       = excluded.headline,
             insight        = excluded.insight,
             why_it_matters = excluded.why_it_matters,
             summary_json   = excluded.summary_json,
             source_url     = excluded.source_url,
             published_at   = excluded.published_at,
             generated_at   = excluded.generated_at,
             expires_at     = excluded.expires_at,
             updated_at     = excluded.updated_at",
          rusqlite::params![
            category_str,
            card.paper_id,
            card.headline,
            card.insight,
            card.why_it_matters,
            payload_str,
            card.source_url,
            published_str,
            generated_str,
            expires_str,
            now_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_expired(&self, as_of: Option<DateTime<Utc>>) -> Result<u64> {
    let as_of_str = encode_dt(as_of.unwrap_or_else(Utc::now));

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM flashcards WHERE expires_at < ?1",
          rusqlite::params![as_of_str],
        )?)
      })
      .await?;

    Ok(removed as u64)
  }

  async fn count_for_category(&self, category: Category) -> Result<u64> {
    let category_str = category.to_string();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM flashcards WHERE category = ?1",
          rusqlite::params![category_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }
}

// ─── PaperSource impl ────────────────────────────────────────────────────────

impl PaperSource for SqliteStore {
  type Error = crate::Error;

  async fn fetch_recent(&self, category: Category, count: usize) -> Result<Vec<Paper>> {
    let category_str = category.to_string();
    let limit_val    = i64::try_from(count).unwrap_or(i64::MAX);

    let raws: Vec<RawPaper> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAPER_COLUMNS} FROM papers p
           WHERE p.processed = 1
             AND EXISTS (
               SELECT 1 FROM json_each(p.categories) c WHERE c.value = ?1
             )
           ORDER BY p.published_at DESC, p.paper_id ASC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![category_str, limit_val], RawPaper::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPaper::into_paper).collect()
  }
}
