//! Content store: persisted sources and their extracted text.
//!
//! The store is append-only. Ingesting the same reference twice yields two
//! independent source/content pairs.

mod memory;
mod sqlite;

pub use memory::MemoryContentStore;
pub use sqlite::SqliteContentStore;

use crate::dispatch::ContentKind;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Store-assigned id.
    pub id: i64,
    /// Path or URL as given at ingestion time.
    pub reference: String,
    pub kind: ContentKind,
    /// Non-decreasing across inserts.
    pub ingested_at: DateTime<Utc>,
}

/// Text extracted from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub id: i64,
    pub source_id: i64,
    /// May be empty when extraction found nothing.
    pub text: String,
}

/// A `(reference, text)` pair returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub reference: String,
    pub text: String,
}

/// Row counts, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub sources: usize,
    pub contents: usize,
}

/// Storage backend for ingested content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Record a new source and return its id.
    async fn record_source(&self, reference: &str, kind: ContentKind) -> Result<i64>;

    /// Record extracted text for an existing source.
    ///
    /// Fails with `IntegrityError` when `source_id` is unknown.
    async fn record_content(&self, source_id: i64, text: &str) -> Result<i64>;

    /// All contents containing `query` (case-sensitive), in store order.
    async fn search(&self, query: &str) -> Result<Vec<ContentMatch>>;

    /// Up to `limit` contents, newest source first.
    async fn most_recent(&self, limit: usize) -> Result<Vec<ContentMatch>>;

    /// All sources, newest first.
    async fn list_sources(&self) -> Result<Vec<SourceRecord>>;

    async fn counts(&self) -> Result<StoreCounts>;
}

/// Next ingestion timestamp: now, but never earlier than `last`.
pub(crate) fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}
