//! Trait for fetching the full crash record set.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::record::CrashRecord;

/// Abstraction over a crash record provider (warehouse table, CSV export).
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns every crash record. Called once per session unless the
    /// cache is invalidated.
    async fn fetch_records(&self) -> Result<Vec<CrashRecord>, SourceError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    async fn fetch_records(&self) -> Result<Vec<CrashRecord>, SourceError> {
        (**self).fetch_records().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
