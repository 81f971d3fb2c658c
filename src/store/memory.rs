//! In-memory content store.
//!
//! Useful for testing; same ordering rules as the SQLite store.

use super::{
    next_timestamp, ContentMatch, ContentStore, ExtractedContent, SourceRecord, StoreCounts,
};
use crate::dispatch::ContentKind;
use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    sources: Vec<SourceRecord>,
    contents: Vec<ExtractedContent>,
}

impl Tables {
    fn reference_of(&self, source_id: i64) -> Option<&SourceRecord> {
        self.sources.iter().find(|s| s.id == source_id)
    }
}

/// In-memory content store.
#[derive(Default)]
pub struct MemoryContentStore {
    tables: RwLock<Tables>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| MedleyError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| MedleyError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn record_source(&self, reference: &str, kind: ContentKind) -> Result<i64> {
        let mut tables = self.write()?;
        let id = tables.sources.len() as i64 + 1;
        let ingested_at = next_timestamp(tables.sources.last().map(|s| s.ingested_at));

        tables.sources.push(SourceRecord {
            id,
            reference: reference.to_string(),
            kind,
            ingested_at,
        });
        Ok(id)
    }

    async fn record_content(&self, source_id: i64, text: &str) -> Result<i64> {
        let mut tables = self.write()?;
        if tables.reference_of(source_id).is_none() {
            return Err(MedleyError::IntegrityError(format!(
                "No source with id {}",
                source_id
            )));
        }

        let id = tables.contents.len() as i64 + 1;
        tables.contents.push(ExtractedContent {
            id,
            source_id,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn search(&self, query: &str) -> Result<Vec<ContentMatch>> {
        let tables = self.read()?;

        Ok(tables
            .contents
            .iter()
            .filter(|c| c.text.contains(query))
            .filter_map(|c| {
                tables.reference_of(c.source_id).map(|s| ContentMatch {
                    reference: s.reference.clone(),
                    text: c.text.clone(),
                })
            })
            .collect())
    }

    async fn most_recent(&self, limit: usize) -> Result<Vec<ContentMatch>> {
        let tables = self.read()?;

        let mut rows: Vec<(&SourceRecord, &ExtractedContent)> = tables
            .contents
            .iter()
            .filter_map(|c| tables.reference_of(c.source_id).map(|s| (s, c)))
            .collect();

        rows.sort_by(|(sa, ca), (sb, cb)| {
            sb.ingested_at
                .cmp(&sa.ingested_at)
                .then(sb.id.cmp(&sa.id))
                .then(cb.id.cmp(&ca.id))
        });

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(s, c)| ContentMatch {
                reference: s.reference.clone(),
                text: c.text.clone(),
            })
            .collect())
    }

    async fn list_sources(&self) -> Result<Vec<SourceRecord>> {
        let tables = self.read()?;
        let mut sources = tables.sources.clone();
        sources.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at).then(b.id.cmp(&a.id)));
        Ok(sources)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let tables = self.read()?;
        Ok(StoreCounts {
            sources: tables.sources.len(),
            contents: tables.contents.len(),
        })
    }
}
