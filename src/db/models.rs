//! Race record document model.
//!
//! One `RaceRecord` per `(season, round)`, immutable once persisted. The
//! serde names double as the document field names in the `races` collection
//! and as the JSON shape served by `GET /api/latest`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fully-assembled race record, the unit of truth.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RaceRecord {
    pub race: RaceInfo,
    pub track: Track,
    pub weather: Weather,
    pub highlights: Highlights,
    /// Ordered by finishing position ascending.
    pub results: Vec<ResultEntry>,
    #[serde(rename = "driversStandings")]
    pub drivers_standings: Vec<DriverStandingEntry>,
    #[serde(rename = "constructorsStandings")]
    pub constructors_standings: Vec<ConstructorStandingEntry>,
    #[serde(rename = "nextRace")]
    pub next_race: NextRace,
}

/// Identity and start time of the race the record describes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RaceInfo {
    pub name: String,
    pub city: String,
    pub country: String,
    pub season: i32,
    pub round: i32,
    /// Race start in the venue's own timezone (RFC 3339 with offset).
    #[serde(rename = "startTimeLocal")]
    pub start_time_local: String,
    /// The same instant in UTC (RFC 3339).
    #[serde(rename = "startTimeUtc")]
    pub start_time_utc: String,
}

/// Curated track metadata from the reference store.
///
/// All fields default to empty/zero when the store has no entry for the
/// track; the assembly is then flagged degraded rather than failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Track {
    pub name: String,
    #[serde(rename = "mapUri")]
    pub map_uri: String,
    pub turns: i32,
    #[serde(rename = "lengthKm")]
    pub length_km: f64,
    pub laps: i32,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "drsZones")]
    pub drs_zones: i32,
    #[serde(rename = "drsDetectionZones")]
    pub drs_detection_zones: i32,
}

/// Weather for the two competitive days of the race weekend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Weather {
    pub qualifying: WeatherEntry,
    pub race: WeatherEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeatherEntry {
    /// Human-readable category ("Overcast", "Slight rain", ...). Empty when
    /// the provider emitted a code outside the known table.
    pub condition: String,
    /// Min-max range string, e.g. "14-23°C".
    pub temperature: String,
}

/// Highlights video link, empty until the enrichment trigger finds one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Highlights {
    pub uri: String,
}

/// One classified finishing-order entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResultEntry {
    pub position: i32,
    pub name: String,
    #[serde(rename = "driverCode")]
    pub driver_code: String,
    /// Starting grid slot (0 = pit-lane start, as the provider reports it).
    pub grid: i32,
    /// Elapsed time for "Finished", "+N Lap(s)" verbatim for lapped
    /// finishers, the literal "DNF" for everything else.
    pub time: String,
    pub points: f64,
    pub team: String,
    #[serde(rename = "teamLogoUri")]
    pub team_logo_uri: String,
    /// Fastest-lap time as recorded; empty when none was set.
    #[serde(rename = "fastestLap")]
    pub fastest_lap: String,
    /// Provider's fastest-lap rank; 0 when no lap was recorded.
    #[serde(rename = "fastestLapRank")]
    pub fastest_lap_rank: i32,
    /// grid - position; negative means places lost.
    #[serde(rename = "positionChange")]
    pub position_change: i32,
}

/// Championship-wide driver standing, current as of fetch time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverStandingEntry {
    pub position: i32,
    pub name: String,
    #[serde(rename = "driverCode")]
    pub driver_code: String,
    pub points: f64,
    pub team: String,
    #[serde(rename = "teamLogoUri")]
    pub team_logo_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConstructorStandingEntry {
    pub position: i32,
    pub name: String,
    pub points: f64,
    #[serde(rename = "teamLogoUri")]
    pub team_logo_uri: String,
}

/// Preview of the following round. No results yet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NextRace {
    pub name: String,
    pub country: String,
    pub track: String,
    #[serde(rename = "startTimeLocal")]
    pub start_time_local: String,
    #[serde(rename = "startTimeUtc")]
    pub start_time_utc: String,
}

/// Curated track document in the `tracks` reference collection, keyed by
/// track name. Distinct from `Track` so that "no entry" stays an explicit
/// `Option` at the lookup boundary instead of a magic empty value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackProfile {
    pub name: String,
    #[serde(rename = "mapUri", default)]
    pub map_uri: String,
    #[serde(default)]
    pub turns: i32,
    #[serde(rename = "lengthKm", default)]
    pub length_km: f64,
    #[serde(default)]
    pub laps: i32,
    #[serde(rename = "distanceKm", default)]
    pub distance_km: f64,
    #[serde(rename = "drsZones", default)]
    pub drs_zones: i32,
    #[serde(rename = "drsDetectionZones", default)]
    pub drs_detection_zones: i32,
}

impl From<TrackProfile> for Track {
    fn from(p: TrackProfile) -> Self {
        Track {
            name: p.name,
            map_uri: p.map_uri,
            turns: p.turns,
            length_km: p.length_km,
            laps: p.laps,
            distance_km: p.distance_km,
            drs_zones: p.drs_zones,
            drs_detection_zones: p.drs_detection_zones,
        }
    }
}

/// Curated highlight link in the `highlights` reference collection, keyed by
/// season + round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(dead_code)] // Key fields come with the document; only the link is consumed
pub struct HighlightDoc {
    pub season: i32,
    pub round: i32,
    #[serde(default)]
    pub uri: String,
}
