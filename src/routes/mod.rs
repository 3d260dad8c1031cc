use std::sync::Arc;

use crate::db::store::StoreClient;
use crate::services::cache::{Clock, FreshnessCache};
use crate::services::ergast::ErgastClient;
use crate::services::timezone::TimezoneResolver;
use crate::services::weather::WeatherClient;
use crate::services::youtube::YouTubeClient;

pub mod health;
pub mod latest;
pub mod update;

/// Shared application state: one client per upstream, the timezone
/// resolver, and the single-slot freshness cache.
#[derive(Clone)]
pub struct AppState {
    pub ergast: ErgastClient,
    pub weather: WeatherClient,
    pub youtube: YouTubeClient,
    pub store: StoreClient,
    pub tz: Arc<TimezoneResolver>,
    pub cache: Arc<FreshnessCache>,
    pub clock: Arc<dyn Clock>,
}
