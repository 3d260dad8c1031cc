//! Update orchestrator: the only path that runs the merge engine and the
//! only writer to the `races` collection.
//!
//! `run_update` is idempotent per `(season, round)`: an existence check
//! guards the insert, and a duplicate-key rejection from the store's unique
//! index (two truly concurrent triggers) is reported as "already up to
//! date" rather than an error. The read path never calls into here.

use chrono::Duration;

use crate::db::store::{InsertOutcome, StoreClient};
use crate::errors::AppError;
use crate::services::cache::{Clock, FreshnessCache};
use crate::services::ergast::ErgastClient;
use crate::services::merge;
use crate::services::timezone::TimezoneResolver;
use crate::services::weather::WeatherClient;
use crate::services::youtube::YouTubeClient;

/// How far back the highlights search looks for a freshly-published clip.
const HIGHLIGHTS_RECENCY_DAYS: i64 = 7;

/// Outcome of one update trigger.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The latest race is already persisted; nothing was fetched or written.
    AlreadyUpToDate { season: i32, round: i32 },
    /// A new record was assembled and inserted.
    Ingested {
        season: i32,
        round: i32,
        id: String,
    },
}

/// Outcome of one highlights-enrichment trigger.
#[derive(Debug)]
pub enum HighlightsOutcome {
    /// The persisted record now carries the found video URI.
    Updated { uri: String },
    /// No matching clip has been published yet. Neutral, not an error.
    NotFoundYet,
}

/// Fetch-merge-persist for the latest race, exactly once per
/// `(season, round)`.
pub async fn run_update(
    ergast: &ErgastClient,
    weather: &WeatherClient,
    store: &StoreClient,
    tz: &TimezoneResolver,
    cache: &FreshnessCache,
) -> Result<UpdateOutcome, AppError> {
    let latest = ergast.latest_race().await?;
    let (season, round) = (latest.season, latest.round);

    if store.race_exists(season, round).await? {
        tracing::info!("season {} round {} already ingested", season, round);
        return Ok(UpdateOutcome::AlreadyUpToDate { season, round });
    }

    let assembly = merge::assemble(&latest, ergast, weather, store, tz).await?;
    if !assembly.enriched {
        tracing::warn!(
            "persisting degraded record for season {} round {}",
            season,
            round
        );
    }

    match store.insert_race(&assembly.record).await? {
        InsertOutcome::Inserted { id } => {
            tracing::info!(
                "ingested season {} round {} as {}",
                season,
                round,
                id
            );
            // The next read must fall through to the durable store.
            cache.flush().await;
            Ok(UpdateOutcome::Ingested { season, round, id })
        }
        InsertOutcome::Duplicate => {
            tracing::info!(
                "concurrent trigger already ingested season {} round {}",
                season,
                round
            );
            Ok(UpdateOutcome::AlreadyUpToDate { season, round })
        }
    }
}

/// Search the video source for a highlights clip of the latest race and,
/// if found, patch `highlights.uri` on the persisted record.
pub async fn enrich_highlights(
    ergast: &ErgastClient,
    youtube: &YouTubeClient,
    store: &StoreClient,
    cache: &FreshnessCache,
    clock: &dyn Clock,
) -> Result<HighlightsOutcome, AppError> {
    let latest = ergast.latest_race_identity().await?;
    let query = format!("{} {} highlights", latest.name, latest.season);
    let published_after = clock.now() - Duration::days(HIGHLIGHTS_RECENCY_DAYS);

    match youtube.search_video(&query, published_after).await? {
        None => {
            tracing::info!("no highlights published yet for {:?}", query);
            Ok(HighlightsOutcome::NotFoundYet)
        }
        Some(uri) => {
            store
                .set_highlights_uri(latest.season, latest.round, &uri)
                .await?;
            tracing::info!(
                "highlights for season {} round {} set to {}",
                latest.season,
                latest.round,
                uri
            );
            cache.flush().await;
            Ok(HighlightsOutcome::Updated { uri })
        }
    }
}
