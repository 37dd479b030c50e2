//! Disabled GeoIP provider

use async_trait::async_trait;

use super::{GeoInfo, GeoIpLookup};

/// Provider used when GeoIP is disabled; every lookup misses.
pub struct NullProvider;

#[async_trait]
impl GeoIpLookup for NullProvider {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        None
    }

    fn name(&self) -> &'static str {
        "Null"
    }
}
