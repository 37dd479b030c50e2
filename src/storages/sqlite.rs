//! SQLite storage backend (default)
//!
//! rusqlite behind an r2d2 pool, WAL journal for concurrent reads. The
//! shortcode primary key makes `insert` atomic with its uniqueness check;
//! `record_visit` bundles the counter update and the visit row in one
//! transaction. Blocking work runs on the blocking thread pool via
//! `actix_web::web::block`.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::{error, info};

use super::{StatsSnapshot, Storage, UrlRecord, VisitEvent};
use crate::errors::{MinilinkError, Result};
use crate::structs::SerializableVisit;
use async_trait::async_trait;

pub struct SqliteStorage {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStorage {
    pub async fn new_async(db_path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(db_path).with_init(|c| {
            // WAL mode for concurrent readers alongside the writer
            c.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA cache_size = -64000;
                 PRAGMA temp_store = memory;
                 PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(20)
            .min_idle(Some(4))
            .max_lifetime(Some(std::time::Duration::from_secs(1800)))
            .connection_timeout(std::time::Duration::from_secs(10))
            .build(manager)
            .map_err(|e| {
                MinilinkError::store_unavailable(format!("Failed to create connection pool: {}", e))
            })?;

        let storage = SqliteStorage { pool };
        storage.init_db()?;

        info!("SqliteStorage initialized, database path: {}", db_path);
        Ok(storage)
    }

    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            MinilinkError::store_unavailable(format!("Failed to get database connection: {}", e))
        })
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS short_links (
                short_code TEXT PRIMARY KEY,
                target_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT,
                click INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )
        .map_err(|e| MinilinkError::store_unavailable(format!("Failed to create table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS link_visits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL,
                visited_at TEXT NOT NULL,
                ip TEXT,
                country TEXT,
                city TEXT
            )",
            [],
        )
        .map_err(|e| {
            MinilinkError::store_unavailable(format!("Failed to create visits table: {}", e))
        })?;

        // Visit log reads are always per shortcode
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_visits_short_code ON link_visits(short_code)",
            [],
        )
        .map_err(|e| {
            MinilinkError::store_unavailable(format!("Failed to create visits index: {}", e))
        })?;

        Ok(())
    }

    fn record_from_row(
        short_code: String,
        target_url: String,
        created_at: String,
        expires_at: Option<String>,
        click: i64,
    ) -> Result<UrlRecord> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| MinilinkError::date_parse(format!("Bad created_at in store: {}", e)))?
            .with_timezone(&chrono::Utc);

        let expires_at = expires_at.and_then(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .ok()
        });

        Ok(UrlRecord {
            code: short_code,
            target: target_url,
            created_at,
            expires_at,
            click: click.max(0) as usize,
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, code: &str) -> Option<UrlRecord> {
        let conn = match self.get_connection() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to get database connection: {}", e);
                return None;
            }
        };

        let code = code.to_string();

        let result = actix_web::web::block(move || {
            let mut stmt = conn.prepare(
                "SELECT short_code, target_url, created_at, expires_at, click
                 FROM short_links WHERE short_code = ?1",
            )?;

            stmt.query_row(params![code], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
        })
        .await;

        match result {
            Ok(Ok((short_code, target_url, created_at, expires_at, click))) => {
                match Self::record_from_row(short_code, target_url, created_at, expires_at, click) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        error!("Failed to parse stored record: {}", e);
                        None
                    }
                }
            }
            Ok(Err(rusqlite::Error::QueryReturnedNoRows)) => None,
            Ok(Err(e)) => {
                error!("Record query failed: {}", e);
                None
            }
            Err(e) => {
                error!("Async query failed: {:?}", e);
                None
            }
        }
    }

    async fn insert(&self, record: UrlRecord) -> Result<()> {
        let pool = self.pool.clone();

        let result = actix_web::web::block(move || {
            let conn = pool.get().map_err(|e| {
                MinilinkError::store_unavailable(format!(
                    "Failed to get database connection: {}",
                    e
                ))
            })?;

            let created_at = record.created_at.to_rfc3339();
            let expires_at = record.expires_at.map(|dt| dt.to_rfc3339());

            // The primary key resolves concurrent same-code inserts: one
            // statement succeeds, the other hits the constraint.
            match conn.execute(
                "INSERT INTO short_links (short_code, target_url, created_at, expires_at, click)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.code,
                    record.target,
                    created_at,
                    expires_at,
                    record.click as i64
                ],
            ) {
                Ok(_) => {
                    info!("Short link created: {}", record.code);
                    Ok(())
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(MinilinkError::shortcode_taken(format!(
                        "Shortcode '{}' already exists",
                        record.code
                    )))
                }
                Err(e) => Err(MinilinkError::store_unavailable(format!(
                    "Failed to insert record: {}",
                    e
                ))),
            }
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(MinilinkError::store_unavailable(format!(
                "Async insert failed: {:?}",
                e
            ))),
        }
    }

    async fn record_visit(&self, code: &str, visit: VisitEvent) -> Result<()> {
        let pool = self.pool.clone();
        let code = code.to_string();

        let result = actix_web::web::block(move || {
            let mut conn = pool.get().map_err(|e| {
                MinilinkError::store_unavailable(format!(
                    "Failed to get database connection: {}",
                    e
                ))
            })?;

            let transaction = conn.transaction().map_err(|e| {
                MinilinkError::store_unavailable(format!("Failed to begin transaction: {}", e))
            })?;

            let rows_affected = transaction
                .execute(
                    "UPDATE short_links SET click = click + 1 WHERE short_code = ?1",
                    params![code],
                )
                .map_err(|e| {
                    MinilinkError::store_unavailable(format!("Failed to update clicks: {}", e))
                })?;

            if rows_affected == 0 {
                // Transaction rolls back on drop
                return Err(MinilinkError::not_found(format!(
                    "Shortcode '{}' does not exist",
                    code
                )));
            }

            transaction
                .execute(
                    "INSERT INTO link_visits (short_code, visited_at, ip, country, city)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        code,
                        visit.visited_at.to_rfc3339(),
                        visit.ip,
                        visit.country,
                        visit.city
                    ],
                )
                .map_err(|e| {
                    MinilinkError::store_unavailable(format!("Failed to insert visit: {}", e))
                })?;

            transaction.commit().map_err(|e| {
                MinilinkError::store_unavailable(format!("Failed to commit transaction: {}", e))
            })?;

            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(MinilinkError::store_unavailable(format!(
                "Async visit update failed: {:?}",
                e
            ))),
        }
    }

    async fn snapshot(&self, code: &str) -> Option<StatsSnapshot> {
        let pool = self.pool.clone();
        let code = code.to_string();

        let result = actix_web::web::block(move || -> Result<Option<StatsSnapshot>> {
            let mut conn = pool.get().map_err(|e| {
                MinilinkError::store_unavailable(format!(
                    "Failed to get database connection: {}",
                    e
                ))
            })?;

            // One transaction so clicks and the visit log agree.
            let transaction = conn.transaction().map_err(|e| {
                MinilinkError::store_unavailable(format!("Failed to begin transaction: {}", e))
            })?;

            let record = match transaction.query_row(
                "SELECT short_code, target_url, created_at, expires_at, click
                 FROM short_links WHERE short_code = ?1",
                params![code],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            ) {
                Ok((short_code, target_url, created_at, expires_at, click)) => {
                    Self::record_from_row(short_code, target_url, created_at, expires_at, click)?
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => {
                    return Err(MinilinkError::store_unavailable(format!(
                        "Record query failed: {}",
                        e
                    )));
                }
            };

            let visits = {
                let mut stmt = transaction
                    .prepare(
                        "SELECT visited_at, ip, country, city
                         FROM link_visits WHERE short_code = ?1 ORDER BY id",
                    )
                    .map_err(|e| {
                        MinilinkError::store_unavailable(format!(
                            "Failed to prepare visits query: {}",
                            e
                        ))
                    })?;

                let rows = stmt
                    .query_map(params![code], |row| {
                        Ok(SerializableVisit {
                            visited_at: row.get::<_, String>(0)?,
                            ip: row.get::<_, Option<String>>(1)?,
                            country: row.get::<_, Option<String>>(2)?,
                            city: row.get::<_, Option<String>>(3)?,
                        })
                    })
                    .map_err(|e| {
                        MinilinkError::store_unavailable(format!("Visits query failed: {}", e))
                    })?;

                rows.collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        MinilinkError::store_unavailable(format!("Failed to read visit row: {}", e))
                    })?
            };

            Ok(Some(StatsSnapshot {
                code: record.code,
                target: record.target,
                created_at: record.created_at,
                expires_at: record.expires_at,
                clicks: record.click,
                visits,
            }))
        })
        .await;

        match result {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                error!("Snapshot query failed: {}", e);
                None
            }
            Err(e) => {
                error!("Async snapshot failed: {:?}", e);
                None
            }
        }
    }

    async fn get_backend_name(&self) -> String {
        "sqlite".to_string()
    }
}
