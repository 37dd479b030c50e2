use std::sync::Arc;

pub use crate::structs::{StatsSnapshot, StoredRecord, UrlRecord, VisitEvent};

use crate::config::AppConfig;
use crate::errors::Result;
use async_trait::async_trait;

pub mod file;
pub mod sqlite;

/// Durable keyed store of shortcode → URL record.
///
/// Backends own the concurrency discipline: `insert` is atomic with its
/// uniqueness check, and `record_visit` performs an indivisible
/// read-modify-write of the click counter and visit log. A successful write
/// has reached stable storage before `Ok` is returned.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Look up a record. Read failures are logged and surface as `None`.
    async fn get(&self, code: &str) -> Option<UrlRecord>;

    /// Persist a new record.
    ///
    /// Exactly one of two concurrent inserts with the same code succeeds;
    /// the loser gets `ShortcodeTaken`. On failure no partial record is
    /// visible.
    async fn insert(&self, record: UrlRecord) -> Result<()>;

    /// Append a visit and increment the click counter, atomically.
    ///
    /// Concurrent visits to the same code serialize; visits to different
    /// codes contend only as far as the backing medium requires.
    async fn record_visit(&self, code: &str, visit: VisitEvent) -> Result<()>;

    /// Atomically consistent record + visit log view, for statistics.
    async fn snapshot(&self, code: &str) -> Option<StatsSnapshot>;

    async fn get_backend_name(&self) -> String;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &AppConfig) -> Result<Arc<dyn Storage>> {
        let boxed: Box<dyn Storage> = match config.storage_backend.as_str() {
            "file" => Box::new(file::FileStorage::new(&config.links_file)?),
            _ => Box::new(sqlite::SqliteStorage::new_async(&config.db_file_name).await?),
        };

        Ok(Arc::from(boxed))
    }
}
