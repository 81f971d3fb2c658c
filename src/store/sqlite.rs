//! SQLite-backed content store.

use super::{next_timestamp, ContentMatch, ContentStore, SourceRecord, StoreCounts};
use crate::dispatch::ContentKind;
use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reference TEXT NOT NULL,
        kind TEXT NOT NULL,
        ingested_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sources_ingested_at ON sources(ingested_at);

    CREATE TABLE IF NOT EXISTS contents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL REFERENCES sources(id),
        content TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_contents_source_id ON contents(source_id);
"#;

/// SQLite content store. One connection, serialized behind a mutex.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl SqliteContentStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::init(conn)?;
        info!("Opened content store at {:?}", path);
        Ok(store)
    }

    /// In-memory store, for tests.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        let last: Option<String> = conn
            .query_row("SELECT MAX(ingested_at) FROM sources", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(Self {
            conn: Mutex::new(conn),
            last_timestamp: Mutex::new(last.as_deref().and_then(parse_timestamp)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MedleyError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn stamp(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .last_timestamp
            .lock()
            .map_err(|e| MedleyError::Store(format!("Failed to acquire lock: {}", e)))?;
        let ts = next_timestamp(*last);
        *last = Some(ts);
        Ok(ts)
    }
}

/// Fixed-width RFC 3339 so lexical order matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    #[instrument(skip(self))]
    async fn record_source(&self, reference: &str, kind: ContentKind) -> Result<i64> {
        let ingested_at = self.stamp()?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO sources (reference, kind, ingested_at) VALUES (?1, ?2, ?3)",
            params![reference, kind.as_str(), format_timestamp(&ingested_at)],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Recorded source {}", id);
        Ok(id)
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn record_content(&self, source_id: i64, text: &str) -> Result<i64> {
        let conn = self.lock()?;

        match conn.execute(
            "INSERT INTO contents (source_id, content) VALUES (?1, ?2)",
            params![source_id, text],
        ) {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(MedleyError::IntegrityError(format!(
                    "No source with id {}",
                    source_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        debug!("Recorded content {} for source {}", id, source_id);
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<ContentMatch>> {
        let conn = self.lock()?;

        // instr() is case-sensitive, unlike LIKE
        let mut stmt = conn.prepare(
            r#"
            SELECT s.reference, c.content
            FROM sources AS s JOIN contents AS c ON s.id = c.source_id
            WHERE instr(c.content, ?1) > 0
            ORDER BY c.id
            "#,
        )?;

        let rows = stmt.query_map(params![query], |row| {
            Ok(ContentMatch {
                reference: row.get(0)?,
                text: row.get(1)?,
            })
        })?;

        let matches = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("{} matches", matches.len());
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn most_recent(&self, limit: usize) -> Result<Vec<ContentMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT s.reference, c.content
            FROM sources AS s JOIN contents AS c ON s.id = c.source_id
            ORDER BY s.ingested_at DESC, s.id DESC, c.id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(ContentMatch {
                reference: row.get(0)?,
                text: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<SourceRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, reference, kind, ingested_at FROM sources ORDER BY ingested_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(2)?;
            let ingested_at: String = row.get(3)?;
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, kind, ingested_at))
        })?;

        let mut sources = Vec::new();
        for row in rows {
            let (id, reference, kind, ingested_at) = row?;
            sources.push(SourceRecord {
                id,
                reference,
                kind: kind.parse().map_err(MedleyError::Store)?,
                ingested_at: parse_timestamp(&ingested_at).ok_or_else(|| {
                    MedleyError::Store(format!("Bad timestamp on source {}: {}", id, ingested_at))
                })?,
            });
        }

        Ok(sources)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let conn = self.lock()?;

        let sources: i64 = conn.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        let contents: i64 =
            conn.query_row("SELECT COUNT(*) FROM contents", [], |row| row.get(0))?;

        Ok(StoreCounts {
            sources: sources as usize,
            contents: contents as usize,
        })
    }
}
