//! SQLite schema definition

/// SQL schema for the index database
pub const SCHEMA_SQL: &str = r#"
-- Sites: registered crawl roots
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    status_time TEXT NOT NULL,
    last_error TEXT
);

-- Pages: fetched documents, owned by one site
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    url TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL,
    code INTEGER NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    title TEXT,
    snippet TEXT,
    relevance REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    available INTEGER NOT NULL DEFAULT 1
);

-- Lemmas: base forms per site; frequency counts distinct pages
CREATE TABLE IF NOT EXISTS lemmas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lemma TEXT NOT NULL CHECK (length(trim(lemma)) > 0),
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    frequency INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'INDEXED',
    UNIQUE(lemma, site_id)
);

-- Indices: lemma postings with accumulated rank
CREATE TABLE IF NOT EXISTS indices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    lemma_id INTEGER NOT NULL REFERENCES lemmas(id) ON DELETE CASCADE,
    rank REAL NOT NULL,
    UNIQUE(page_id, lemma_id)
);

-- Fields: per-region scoring weights
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    selector TEXT NOT NULL,
    weight REAL NOT NULL CHECK (weight >= 0)
);

-- Indexing history: flushed session records
CREATE TABLE IF NOT EXISTS indexing_history (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    url TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_pages_site ON pages(site_id);
CREATE INDEX IF NOT EXISTS idx_lemmas_lemma ON lemmas(lemma);
CREATE INDEX IF NOT EXISTS idx_lemmas_site ON lemmas(site_id);
CREATE INDEX IF NOT EXISTS idx_indices_lemma ON indices(lemma_id);
CREATE INDEX IF NOT EXISTS idx_history_session ON indexing_history(session_id);
"#;
