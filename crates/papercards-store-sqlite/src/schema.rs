//! SQL schema for the papercards SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Candidate pool, written by the ingestion pipeline.
CREATE TABLE IF NOT EXISTS papers (
    paper_id      TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    abstract      TEXT NOT NULL,
    raw_text      TEXT,
    categories    TEXT NOT NULL DEFAULT '[]',  -- JSON array of arXiv tags
    published_at  TEXT NOT NULL,               -- RFC 3339 UTC, fixed precision
    pdf_url       TEXT,
    processed     INTEGER NOT NULL DEFAULT 0
);

-- One row per (category, paper_id); regeneration replaces it in place.
CREATE TABLE IF NOT EXISTS flashcards (
    id              INTEGER PRIMARY KEY,
    category        TEXT NOT NULL,
    paper_id        TEXT NOT NULL,
    headline        TEXT NOT NULL,
    insight         TEXT NOT NULL,
    why_it_matters  TEXT,
    summary_json    TEXT NOT NULL DEFAULT '{}',
    source_url      TEXT,
    published_at    TEXT NOT NULL,
    generated_at    TEXT NOT NULL,
    expires_at      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CONSTRAINT uq_flashcards_category_paper_id UNIQUE (category, paper_id)
);

CREATE INDEX IF NOT EXISTS papers_published_idx          ON papers(published_at);
CREATE INDEX IF NOT EXISTS flashcards_category_expires_idx ON flashcards(category, expires_at);
CREATE INDEX IF NOT EXISTS flashcards_expires_idx        ON flashcards(expires_at);

PRAGMA user_version = 1;
";
