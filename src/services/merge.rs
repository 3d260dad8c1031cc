//! Merge engine: combines the results provider, weather provider and
//! reference store into one normalized `RaceRecord`.
//!
//! The primary race payload resolves first (it carries season, round, venue
//! and the next-round index); everything downstream of it is independent
//! and fetched concurrently, so end-to-end latency is bounded by the
//! slowest single call. Standings, weather and the next-race schedule are
//! hard dependencies; reference data (track, curated highlights) is not.

use chrono::{Duration, NaiveDate};

use crate::db::models::{
    ConstructorStandingEntry, DriverStandingEntry, Highlights, NextRace, RaceInfo, RaceRecord,
    ResultEntry, Track, Weather, WeatherEntry,
};
use crate::db::store::StoreClient;
use crate::errors::AppError;
use crate::services::ergast::{ConstructorStanding, DriverStanding, ErgastClient, LatestRace, RawResult};
use crate::services::timezone::TimezoneResolver;
use crate::services::weather::{condition_label, temperature_range, DayWeather, WeatherClient};

/// A fully-assembled record plus its enrichment status.
///
/// `enriched` is false when the reference store had no entry for the track:
/// the record still carries empty/zero track defaults and is valid, but the
/// caller records the degraded status instead of failing.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub record: RaceRecord,
    pub enriched: bool,
}

/// True for a "+N Lap(s)" status with N >= 1: a lapped but classified
/// finisher, which must keep its status text verbatim.
fn is_lapped_status(status: &str) -> bool {
    let Some(rest) = status.strip_prefix('+') else {
        return false;
    };
    let Some(count) = rest.strip_suffix(" Laps").or_else(|| rest.strip_suffix(" Lap")) else {
        return false;
    };
    matches!(count.parse::<u32>(), Ok(n) if n >= 1)
}

/// Three-way result-status classification.
///
/// "Finished" uses the recorded elapsed time; a lapped finisher keeps the
/// provider's "+N Lap(s)" text; every other status collapses to "DNF".
pub fn classify_time(status: &str, elapsed_time: Option<&str>) -> String {
    match (status, elapsed_time) {
        ("Finished", Some(time)) => time.to_string(),
        _ if is_lapped_status(status) => status.to_string(),
        _ => "DNF".to_string(),
    }
}

/// Classify raw results into presentation entries, ordered by finishing
/// position ascending.
pub fn build_results(raw: &[RawResult]) -> Vec<ResultEntry> {
    let mut entries: Vec<ResultEntry> = raw
        .iter()
        .map(|r| ResultEntry {
            position: r.position,
            name: r.driver_name.clone(),
            driver_code: r.driver_code.clone(),
            grid: r.grid,
            time: classify_time(&r.status, r.elapsed_time.as_deref()),
            points: r.points,
            team: r.team.clone(),
            team_logo_uri: r.team_logo_uri.clone(),
            fastest_lap: r
                .fastest_lap
                .as_ref()
                .map(|fl| fl.time.clone())
                .unwrap_or_default(),
            fastest_lap_rank: r.fastest_lap.as_ref().map(|fl| fl.rank).unwrap_or(0),
            position_change: r.grid - r.position,
        })
        .collect();
    entries.sort_by_key(|e| e.position);
    entries
}

fn build_weather(days: &[DayWeather]) -> Weather {
    let entry = |day: &DayWeather| WeatherEntry {
        condition: condition_label(day.code).to_string(),
        temperature: temperature_range(day),
    };
    Weather {
        qualifying: entry(&days[0]),
        race: entry(&days[1]),
    }
}

fn build_drivers_standings(standings: Vec<DriverStanding>) -> Vec<DriverStandingEntry> {
    standings
        .into_iter()
        .map(|s| DriverStandingEntry {
            position: s.position,
            name: s.name,
            driver_code: s.code,
            points: s.points,
            team: s.team,
            team_logo_uri: s.team_logo_uri,
        })
        .collect()
}

fn build_constructors_standings(
    standings: Vec<ConstructorStanding>,
) -> Vec<ConstructorStandingEntry> {
    standings
        .into_iter()
        .map(|s| ConstructorStandingEntry {
            position: s.position,
            name: s.name,
            points: s.points,
            team_logo_uri: s.logo_uri,
        })
        .collect()
}

/// Assemble one `RaceRecord` from a pre-fetched latest-race payload.
///
/// The caller (update orchestrator) has already fetched `race`; this
/// function performs the six remaining lookups concurrently and merges.
pub async fn assemble(
    race: &LatestRace,
    ergast: &ErgastClient,
    weather: &WeatherClient,
    store: &StoreClient,
    tz: &TimezoneResolver,
) -> Result<Assembly, AppError> {
    let race_date = NaiveDate::parse_from_str(&race.date, "%Y-%m-%d").map_err(|_| {
        AppError::UpstreamUnavailable(format!(
            "results provider sent unparseable date {:?}",
            race.date
        ))
    })?;
    let qualifying_date = (race_date - Duration::days(1)).format("%Y-%m-%d").to_string();

    let (weather_days, drivers, constructors, next, track_lookup, highlight_lookup) = futures::join!(
        weather.daily_forecast(race.latitude, race.longitude, &qualifying_date, &race.date),
        ergast.driver_standings(),
        ergast.constructor_standings(),
        ergast.race_schedule(race.season, race.round + 1),
        store.find_track(&race.circuit_name),
        store.find_highlight(race.season, race.round),
    );

    // Hard dependencies: a record without weather, standings or a next-race
    // preview is not valid.
    let weather_days = weather_days?;
    let drivers = drivers?;
    let constructors = constructors?;
    let next = next?;

    // Reference data: lookup failures and absent entries both degrade to
    // defaults; assembly continues.
    let track_profile = track_lookup.unwrap_or_else(|e| {
        tracing::warn!("track lookup failed, continuing without: {}", e);
        None
    });
    let highlight_doc = highlight_lookup.unwrap_or_else(|e| {
        tracing::warn!("highlight lookup failed, continuing without: {}", e);
        None
    });

    let race_times = tz.localize(&race.date, &race.time, race.latitude, race.longitude)?;
    let next_times = tz.localize(&next.date, &next.time, next.latitude, next.longitude)?;

    let enriched = track_profile.is_some();
    if !enriched {
        tracing::warn!(
            "no reference entry for track {:?}, assembling degraded record",
            race.circuit_name
        );
    }

    let record = RaceRecord {
        race: RaceInfo {
            name: race.name.clone(),
            city: race.city.clone(),
            country: race.country.clone(),
            season: race.season,
            round: race.round,
            start_time_local: race_times.local,
            start_time_utc: race_times.utc,
        },
        track: track_profile.map(Track::from).unwrap_or_default(),
        weather: build_weather(&weather_days),
        highlights: highlight_doc
            .map(|h| Highlights { uri: h.uri })
            .unwrap_or_default(),
        results: build_results(&race.results),
        drivers_standings: build_drivers_standings(drivers),
        constructors_standings: build_constructors_standings(constructors),
        next_race: NextRace {
            name: next.name,
            country: next.country,
            track: next.circuit_name,
            start_time_local: next_times.local,
            start_time_utc: next_times.utc,
        },
    };

    Ok(Assembly { record, enriched })
}
