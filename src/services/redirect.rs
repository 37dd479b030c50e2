//! Redirect and statistics service
//!
//! Resolves a shortcode to its target, enforces expiry and records the
//! visit. Expiry is a pure function of wall-clock time against the stored
//! instant; records are never mutated to mark expiry.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::geoip::{GeoInfo, GeoIpLookup};
use crate::errors::{MinilinkError, Result};
use crate::storages::Storage;
use crate::structs::{StatsSnapshot, VisitContext, VisitEvent};
use crate::utils::ip::is_private_or_local;

#[derive(Clone)]
pub struct RedirectService {
    storage: Arc<dyn Storage>,
    geoip: Arc<dyn GeoIpLookup>,
}

impl RedirectService {
    pub fn new(storage: Arc<dyn Storage>, geoip: Arc<dyn GeoIpLookup>) -> Self {
        Self { storage, geoip }
    }

    /// Resolve a shortcode and record the visit.
    ///
    /// An expired code fails with `Expired` and leaves the record untouched;
    /// the click counter only moves together with a successful redirect.
    pub async fn resolve_and_record(&self, code: &str, ctx: &VisitContext) -> Result<String> {
        let record = self.storage.get(code).await.ok_or_else(|| {
            MinilinkError::not_found(format!("Shortcode '{}' not found", code))
        })?;

        let now = Utc::now();
        if record.is_expired(now) {
            debug!("Shortcode '{}' is expired, not recording visit", code);
            return Err(MinilinkError::expired(format!(
                "Shortcode '{}' has expired",
                code
            )));
        }

        let geo = self.annotate_geo(ctx.ip.as_deref()).await;
        let visit = VisitEvent {
            visited_at: now,
            ip: ctx.ip.clone(),
            country: geo.as_ref().and_then(|g| g.country.clone()),
            city: geo.as_ref().and_then(|g| g.city.clone()),
        };

        self.storage.record_visit(code, visit).await?;

        debug!("Recorded visit for '{}'", code);
        Ok(record.target)
    }

    /// Read-only statistics snapshot for a shortcode.
    pub async fn get_stats(&self, code: &str) -> Result<StatsSnapshot> {
        self.storage.snapshot(code).await.ok_or_else(|| {
            MinilinkError::not_found(format!("Shortcode '{}' not found", code))
        })
    }

    /// Best-effort geo annotation. Private and local addresses are skipped;
    /// provider failures come back as `None` and never reach the caller.
    async fn annotate_geo(&self, ip: Option<&str>) -> Option<GeoInfo> {
        let ip = ip?;

        if let Ok(addr) = ip.parse::<IpAddr>()
            && is_private_or_local(&addr)
        {
            return None;
        }

        self.geoip.lookup(ip).await
    }
}
