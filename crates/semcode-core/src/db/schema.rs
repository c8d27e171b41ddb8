//! Store schema and connection handling

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Store file inside a project's index directory
pub const STORE_FILENAME: &str = "chunks.sqlite";

const READER_CONNECTIONS: usize = 2;

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- One row per chunk, keyed by chunk identity
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    file_path TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    language TEXT NOT NULL,
    seq INTEGER NOT NULL,
    mtime REAL NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

-- Full-text index over chunk names and content
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    name,
    content,
    tokenize='porter unicode61'
);

-- Embedding model the stored vectors were produced with
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_path);
"#;

const CREATE_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS chunks_ai
AFTER INSERT ON chunks
BEGIN
    INSERT INTO chunks_fts(rowid, name, content) VALUES (new.rowid, new.name, new.content);
END;

CREATE TRIGGER IF NOT EXISTS chunks_au
AFTER UPDATE ON chunks
BEGIN
    DELETE FROM chunks_fts WHERE rowid = old.rowid;
    INSERT INTO chunks_fts(rowid, name, content) VALUES (new.rowid, new.name, new.content);
END;

CREATE TRIGGER IF NOT EXISTS chunks_ad
AFTER DELETE ON chunks
BEGIN
    DELETE FROM chunks_fts WHERE rowid = old.rowid;
END;
"#;

/// Embedding of one stored chunk, as held in the in-memory snapshot
pub(crate) struct VectorRow {
    pub id: String,
    pub vector: Vec<f32>,
}

/// SQLite-backed vector store for one project.
///
/// Cloning is cheap; clones share the same connections.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    pub path: PathBuf,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
    /// Bumped after every committed write
    pub generation: AtomicU64,
    pub snapshot: RwLock<Option<(u64, Arc<Vec<VectorRow>>)>>,
}

impl SqliteStore {
    /// Open (creating if needed) the store inside `index_dir`
    pub fn open(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        let path = index_dir.join(STORE_FILENAME);

        let writer = Connection::open(&path).map_err(|e| Error::StoreWrite(e.to_string()))?;
        initialize(&writer).map_err(|e| Error::StoreWrite(e.to_string()))?;

        let mut readers = Vec::with_capacity(READER_CONNECTIONS);
        for _ in 0..READER_CONNECTIONS {
            let conn = Connection::open(&path)?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            readers.push(Mutex::new(conn));
        }

        tracing::debug!(path = %path.display(), "opened chunk store");

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                writer: Mutex::new(writer),
                readers,
                next_reader: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
                snapshot: RwLock::new(None),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA busy_timeout = 5000;",
    )?;
    conn.execute_batch(CREATE_TABLES)?;
    conn.execute_batch(CREATE_TRIGGERS)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

impl StoreInner {
    pub fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| Error::StoreWrite("writer connection lock poisoned".to_string()))
    }

    pub fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[idx]
            .lock()
            .map_err(|_| Error::StoreQuery("reader connection lock poisoned".to_string()))
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, rolling back on error
    pub fn write_txn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.writer()?;
        let write_err = |e: rusqlite::Error| Error::StoreWrite(e.to_string());

        conn.execute("BEGIN IMMEDIATE", []).map_err(write_err)?;
        let result = f(&conn);

        match result {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", []) {
                    let _ = conn.execute("ROLLBACK", []);
                    return Err(write_err(e));
                }
                drop(conn);
                self.generation.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(write_err(e))
            }
        }
    }
}
