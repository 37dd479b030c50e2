//! JSON file storage backend
//!
//! Keeps the whole mapping in memory behind a `RwLock` and rewrites the
//! JSON file before acknowledging a write. The file medium serializes
//! writes globally; the lock makes each insert and visit append indivisible.

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::{StatsSnapshot, Storage, UrlRecord, VisitEvent};
use crate::errors::{MinilinkError, Result};
use crate::structs::{SerializableVisit, StoredRecord};

struct Entry {
    record: UrlRecord,
    visits: Vec<VisitEvent>,
}

pub struct FileStorage {
    file_path: String,
    cache: Arc<RwLock<HashMap<String, Entry>>>,
}

impl FileStorage {
    pub fn new(file_path: &str) -> Result<Self> {
        let storage = FileStorage {
            file_path: file_path.to_string(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        };

        let entries = storage.load_from_file()?;
        {
            let mut cache_guard = storage.cache.write().unwrap();
            *cache_guard = entries;
            info!(
                "FileStorage initialized, loaded {} records from {}",
                cache_guard.len(),
                storage.file_path
            );
        }

        Ok(storage)
    }

    fn load_from_file(&self) -> Result<HashMap<String, Entry>> {
        match fs::read_to_string(&self.file_path) {
            Ok(content) => match serde_json::from_str::<Vec<StoredRecord>>(&content) {
                Ok(stored) => {
                    let mut map = HashMap::new();
                    for record in stored {
                        map.insert(record.short_code.clone(), Self::entry_from_stored(record));
                    }
                    Ok(map)
                }
                Err(e) => {
                    error!("Failed to parse links file: {}", e);
                    Err(MinilinkError::serialization(format!(
                        "Failed to parse links file: {}",
                        e
                    )))
                }
            },
            Err(_) => {
                info!("Links file not found, creating empty store");
                fs::write(&self.file_path, "[]").map_err(|e| {
                    MinilinkError::store_unavailable(format!("Failed to create links file: {}", e))
                })?;
                Ok(HashMap::new())
            }
        }
    }

    fn entry_from_stored(stored: StoredRecord) -> Entry {
        let created_at = chrono::DateTime::parse_from_rfc3339(&stored.created_at)
            .unwrap_or_else(|_| chrono::Utc::now().into())
            .with_timezone(&chrono::Utc);

        let expires_at = stored.expires_at.and_then(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .ok()
        });

        let visits = stored
            .visits
            .iter()
            .map(|v| VisitEvent {
                visited_at: DateTime::parse_from_rfc3339(&v.visited_at)
                    .unwrap_or_else(|_| Utc::now().into())
                    .with_timezone(&Utc),
                ip: v.ip.clone(),
                country: v.country.clone(),
                city: v.city.clone(),
            })
            .collect();

        Entry {
            record: UrlRecord {
                code: stored.short_code,
                target: stored.target_url,
                created_at,
                expires_at,
                click: stored.click,
            },
            visits,
        }
    }

    fn save_to_file(&self, entries: &HashMap<String, Entry>) -> Result<()> {
        let stored: Vec<StoredRecord> = entries
            .values()
            .map(|entry| StoredRecord {
                short_code: entry.record.code.clone(),
                target_url: entry.record.target.clone(),
                created_at: entry.record.created_at.to_rfc3339(),
                expires_at: entry.record.expires_at.map(|dt| dt.to_rfc3339()),
                click: entry.record.click,
                visits: entry.visits.iter().map(SerializableVisit::from).collect(),
            })
            .collect();

        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.file_path, json)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, code: &str) -> Option<UrlRecord> {
        let cache_guard = self.cache.read().unwrap();
        cache_guard.get(code).map(|entry| entry.record.clone())
    }

    async fn insert(&self, record: UrlRecord) -> Result<()> {
        let mut cache_guard = self.cache.write().unwrap();

        if cache_guard.contains_key(&record.code) {
            return Err(MinilinkError::shortcode_taken(format!(
                "Shortcode '{}' already exists",
                record.code
            )));
        }

        let code = record.code.clone();
        cache_guard.insert(
            code.clone(),
            Entry {
                record,
                visits: Vec::new(),
            },
        );

        // Persist before acknowledging. A failed write must not leave the
        // record visible.
        if let Err(e) = self.save_to_file(&cache_guard) {
            cache_guard.remove(&code);
            error!("Failed to persist insert of '{}': {}", code, e);
            return Err(MinilinkError::store_unavailable(format!(
                "Failed to persist record: {}",
                e
            )));
        }

        Ok(())
    }

    async fn record_visit(&self, code: &str, visit: VisitEvent) -> Result<()> {
        let mut cache_guard = self.cache.write().unwrap();

        let entry = cache_guard.get_mut(code).ok_or_else(|| {
            MinilinkError::not_found(format!("Shortcode '{}' does not exist", code))
        })?;

        entry.record.click += 1;
        entry.visits.push(visit);

        if let Err(e) = self.save_to_file(&cache_guard) {
            // Roll the in-memory state back so click stays equal to the
            // persisted visit log length.
            if let Some(entry) = cache_guard.get_mut(code) {
                entry.record.click -= 1;
                entry.visits.pop();
            }
            error!("Failed to persist visit for '{}': {}", code, e);
            return Err(MinilinkError::store_unavailable(format!(
                "Failed to persist visit: {}",
                e
            )));
        }

        Ok(())
    }

    async fn snapshot(&self, code: &str) -> Option<StatsSnapshot> {
        let cache_guard = self.cache.read().unwrap();
        cache_guard.get(code).map(|entry| StatsSnapshot {
            code: entry.record.code.clone(),
            target: entry.record.target.clone(),
            created_at: entry.record.created_at,
            expires_at: entry.record.expires_at,
            clicks: entry.record.click,
            visits: entry.visits.iter().map(SerializableVisit::from).collect(),
        })
    }

    async fn get_backend_name(&self) -> String {
        "file".to_string()
    }
}
