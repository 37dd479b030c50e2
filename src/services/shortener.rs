//! Shortening service
//!
//! Validates creation requests, resolves shortcode collisions and persists
//! exactly one new record per successful call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::{MinilinkError, Result};
use crate::storages::Storage;
use crate::structs::UrlRecord;
use crate::utils::url_validator::validate_url;
use crate::utils::{self, CodeGenerator, TimeParser};

/// Request to create a new short link
#[derive(Debug, Clone)]
pub struct ShortenRequest {
    /// Target URL
    pub target: String,
    /// Shortcode (optional, generated when absent)
    pub code: Option<String>,
    /// Expiry (RFC3339 or relative like "1d", "2h")
    pub expires_at: Option<String>,
}

/// Result of link creation
#[derive(Debug, Clone)]
pub struct ShortenOutcome {
    pub record: UrlRecord,
    /// Fully qualified public short URL
    pub short_url: String,
    /// Whether the code was auto-generated
    pub generated_code: bool,
}

#[derive(Clone)]
pub struct ShortenerService {
    storage: Arc<dyn Storage>,
    generator: Arc<dyn CodeGenerator>,
    public_url: String,
    max_generate_retries: usize,
}

impl ShortenerService {
    pub fn new(
        storage: Arc<dyn Storage>,
        generator: Arc<dyn CodeGenerator>,
        public_url: &str,
        max_generate_retries: usize,
    ) -> Self {
        Self {
            storage,
            generator,
            public_url: public_url.trim_end_matches('/').to_string(),
            max_generate_retries,
        }
    }

    /// Create a new short link.
    ///
    /// A caller-supplied code that collides fails with `ShortcodeTaken`;
    /// the caller asked for that exact code. Generated codes regenerate on
    /// collision, up to the retry cap.
    ///
    /// A past expiry is accepted as-is. The record is legal, it just never
    /// redirects.
    pub async fn shorten(&self, req: ShortenRequest) -> Result<ShortenOutcome> {
        validate_url(&req.target).map_err(|e| MinilinkError::invalid_url(e.to_string()))?;

        let expires_at = self.parse_expires_at(req.expires_at.as_deref())?;

        match req.code.filter(|c| !c.is_empty()) {
            Some(code) => {
                if !utils::is_valid_short_code(&code) {
                    return Err(MinilinkError::invalid_shortcode(format!(
                        "Invalid shortcode '{}'. Only alphanumeric characters are allowed.",
                        code
                    )));
                }

                let record = Self::build_record(code, &req.target, expires_at);
                self.storage.insert(record.clone()).await?;

                info!(
                    "ShortenerService: created '{}' -> '{}'",
                    record.code, record.target
                );
                Ok(self.outcome(record, false))
            }
            None => self.shorten_generated(&req.target, expires_at).await,
        }
    }

    /// Allocate a generated code by inserting until the store accepts one.
    ///
    /// Insertion doubles as the uniqueness check, so two concurrent calls
    /// can never both claim the same code. Collisions stay internal; the
    /// caller only ever sees `StoreUnavailable` once the cap is exceeded.
    async fn shorten_generated(
        &self,
        target: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ShortenOutcome> {
        for attempt in 1..=self.max_generate_retries {
            let code = self.generator.generate();
            let record = Self::build_record(code, target, expires_at);

            match self.storage.insert(record.clone()).await {
                Ok(()) => {
                    info!(
                        "ShortenerService: created '{}' -> '{}' (generated)",
                        record.code, record.target
                    );
                    return Ok(self.outcome(record, true));
                }
                Err(MinilinkError::ShortcodeTaken(_)) => {
                    warn!(
                        "Generated code '{}' collided (attempt {}), regenerating",
                        record.code, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(MinilinkError::store_unavailable(format!(
            "Could not allocate a free shortcode after {} attempts",
            self.max_generate_retries
        )))
    }

    fn parse_expires_at(&self, expires_at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
        match expires_at {
            Some(s) if !s.is_empty() => TimeParser::parse_expire_time(s)
                .map(Some)
                .map_err(MinilinkError::date_parse),
            _ => Ok(None),
        }
    }

    fn build_record(code: String, target: &str, expires_at: Option<DateTime<Utc>>) -> UrlRecord {
        UrlRecord {
            code,
            target: target.to_string(),
            created_at: Utc::now(),
            expires_at,
            click: 0,
        }
    }

    fn outcome(&self, record: UrlRecord, generated_code: bool) -> ShortenOutcome {
        let short_url = format!("{}/go/{}", self.public_url, record.code);
        ShortenOutcome {
            record,
            short_url,
            generated_code,
        }
    }
}
