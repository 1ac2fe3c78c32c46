//! Session-scoped cache of the fetched record set.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::SourceError;
use crate::record::CrashRecord;
use crate::services::record_source::RecordSource;

struct CacheEntry {
    records: Vec<CrashRecord>,
    fetched_at: Instant,
}

/// Holds one session's copy of the crash records.
///
/// The first call to [`RecordCache::records`] fetches from the source.
/// Later calls reuse that copy until it is older than the TTL or
/// [`RecordCache::invalidate`] is called. A failed fetch leaves the cache
/// empty.
pub struct RecordCache<S> {
    source: S,
    ttl: Option<Duration>,
    entry: Option<CacheEntry>,
}

impl<S: RecordSource> RecordCache<S> {
    /// `ttl: None` keeps the fetched records for the whole session.
    pub fn new(source: S, ttl: Option<Duration>) -> Self {
        Self {
            source,
            ttl,
            entry: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.fetched_at.elapsed() >= ttl)
    }

    /// Drops the cached records; the next access refetches.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            info!("Record cache invalidated");
        }
    }

    /// Returns the cached records, fetching them first if needed.
    pub async fn records(&mut self) -> Result<&[CrashRecord], SourceError> {
        let entry = match self.entry.take() {
            Some(entry) if !self.is_expired(&entry) => entry,
            stale => {
                if stale.is_some() {
                    debug!("Record cache expired");
                }
                let started = Instant::now();
                let records = self.source.fetch_records().await?;
                info!(
                    source = %self.source.describe(),
                    records = records.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Record cache filled"
                );
                CacheEntry {
                    records,
                    fetched_at: Instant::now(),
                }
            }
        };

        Ok(&self.entry.insert(entry).records)
    }
}
