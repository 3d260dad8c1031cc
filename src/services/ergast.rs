//! Ergast-compatible results/standings client.
//!
//! The provider is third-party: field names, the string-encoded numerics and
//! the "Z"-suffixed wall-clock timestamps are load-bearing. Everything is
//! validated here, at the edge, so shape mismatches surface as
//! `UpstreamUnavailable` instead of missing-key panics inside the merge.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;

/// Per-request timeout; a slow provider fails the assembly like any outage.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Ergast-compatible results API.
#[derive(Debug, Clone)]
pub struct ErgastClient {
    client: reqwest::Client,
    base_url: String,
}

// --- Validated outputs of the parse boundary ---

/// The most recent completed race, with its raw (unclassified) results.
#[derive(Debug, Clone)]
pub struct LatestRace {
    pub name: String,
    pub season: i32,
    pub round: i32,
    /// Provider date, "YYYY-MM-DD".
    pub date: String,
    /// Provider start time, "HH:MM:SSZ" wall clock at Greenwich.
    pub time: String,
    pub circuit_name: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub results: Vec<RawResult>,
}

/// One unclassified result row; status classification happens in the merge.
#[derive(Debug, Clone)]
pub struct RawResult {
    pub position: i32,
    pub grid: i32,
    pub points: f64,
    /// Provider status text ("Finished", "+1 Lap", "Collision", ...).
    pub status: String,
    pub driver_name: String,
    pub driver_code: String,
    pub team: String,
    pub team_logo_uri: String,
    /// Recorded elapsed time; absent for non-finishers.
    pub elapsed_time: Option<String>,
    /// Fastest lap as recorded; absent when the driver never set one.
    pub fastest_lap: Option<RawFastestLap>,
}

#[derive(Debug, Clone)]
pub struct RawFastestLap {
    pub time: String,
    pub rank: i32,
}

#[derive(Debug, Clone)]
pub struct DriverStanding {
    pub position: i32,
    pub name: String,
    pub code: String,
    pub points: f64,
    pub team: String,
    pub team_logo_uri: String,
}

#[derive(Debug, Clone)]
pub struct ConstructorStanding {
    pub position: i32,
    pub name: String,
    pub points: f64,
    pub logo_uri: String,
}

/// A scheduled race (no results), used for the next-race preview.
#[derive(Debug, Clone)]
pub struct ScheduledRace {
    pub name: String,
    pub country: String,
    pub circuit_name: String,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
}

// --- Ergast JSON response types ---

#[derive(Debug, Deserialize)]
struct MrDataEnvelope {
    #[serde(rename = "MRData")]
    mrdata: MrData,
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable")]
    race_table: Option<RaceTable>,
    #[serde(rename = "StandingsTable")]
    standings_table: Option<StandingsTable>,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races")]
    races: Vec<ErgastRace>,
}

#[derive(Debug, Deserialize)]
struct ErgastRace {
    season: String,
    round: String,
    #[serde(rename = "raceName")]
    race_name: String,
    date: String,
    time: Option<String>,
    #[serde(rename = "Circuit")]
    circuit: ErgastCircuit,
    #[serde(rename = "Results", default)]
    results: Vec<ErgastResult>,
}

#[derive(Debug, Deserialize)]
struct ErgastCircuit {
    #[serde(rename = "circuitName")]
    circuit_name: String,
    #[serde(rename = "Location")]
    location: ErgastLocation,
}

#[derive(Debug, Deserialize)]
struct ErgastLocation {
    lat: String,
    long: String,
    locality: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct ErgastResult {
    position: String,
    points: String,
    grid: String,
    status: String,
    #[serde(rename = "Driver")]
    driver: ErgastDriver,
    #[serde(rename = "Constructor")]
    constructor: ErgastConstructor,
    #[serde(rename = "Time")]
    time: Option<ErgastTime>,
    #[serde(rename = "FastestLap")]
    fastest_lap: Option<ErgastFastestLap>,
}

#[derive(Debug, Deserialize)]
struct ErgastDriver {
    #[serde(rename = "givenName")]
    given_name: String,
    #[serde(rename = "familyName")]
    family_name: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct ErgastConstructor {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErgastTime {
    time: String,
}

#[derive(Debug, Deserialize)]
struct ErgastFastestLap {
    rank: String,
    #[serde(rename = "Time")]
    time: ErgastTime,
}

#[derive(Debug, Deserialize)]
struct StandingsTable {
    #[serde(rename = "StandingsLists")]
    standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
struct StandingsList {
    #[serde(rename = "DriverStandings", default)]
    driver_standings: Vec<ErgastDriverStanding>,
    #[serde(rename = "ConstructorStandings", default)]
    constructor_standings: Vec<ErgastConstructorStanding>,
}

#[derive(Debug, Deserialize)]
struct ErgastDriverStanding {
    position: String,
    points: String,
    #[serde(rename = "Driver")]
    driver: ErgastDriver,
    #[serde(rename = "Constructors")]
    constructors: Vec<ErgastConstructor>,
}

#[derive(Debug, Deserialize)]
struct ErgastConstructorStanding {
    position: String,
    points: String,
    #[serde(rename = "Constructor")]
    constructor: ErgastConstructor,
}

// --- String-numeric validation ---

fn parse_i32(value: &str, field: &str) -> Result<i32, AppError> {
    value.parse::<i32>().map_err(|_| {
        AppError::UpstreamUnavailable(format!(
            "results provider sent non-numeric {}: {:?}",
            field, value
        ))
    })
}

fn parse_f64(value: &str, field: &str) -> Result<f64, AppError> {
    value.parse::<f64>().map_err(|_| {
        AppError::UpstreamUnavailable(format!(
            "results provider sent non-numeric {}: {:?}",
            field, value
        ))
    })
}

fn convert_result(entry: ErgastResult) -> Result<RawResult, AppError> {
    let fastest_lap = entry
        .fastest_lap
        .map(|fl| {
            Ok::<_, AppError>(RawFastestLap {
                rank: parse_i32(&fl.rank, "FastestLap.rank")?,
                time: fl.time.time,
            })
        })
        .transpose()?;

    Ok(RawResult {
        position: parse_i32(&entry.position, "position")?,
        grid: parse_i32(&entry.grid, "grid")?,
        points: parse_f64(&entry.points, "points")?,
        status: entry.status,
        driver_name: format!("{} {}", entry.driver.given_name, entry.driver.family_name),
        driver_code: entry.driver.code,
        team: entry.constructor.name,
        team_logo_uri: entry.constructor.url,
        elapsed_time: entry.time.map(|t| t.time),
        fastest_lap,
    })
}

fn convert_race(race: ErgastRace) -> Result<LatestRace, AppError> {
    let results = race
        .results
        .into_iter()
        .map(convert_result)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LatestRace {
        name: race.race_name,
        season: parse_i32(&race.season, "season")?,
        round: parse_i32(&race.round, "round")?,
        date: race.date,
        time: race.time.ok_or_else(|| {
            AppError::UpstreamUnavailable("results provider sent race without start time".to_string())
        })?,
        circuit_name: race.circuit.circuit_name,
        city: race.circuit.location.locality,
        country: race.circuit.location.country,
        latitude: parse_f64(&race.circuit.location.lat, "Circuit.Location.lat")?,
        longitude: parse_f64(&race.circuit.location.long, "Circuit.Location.long")?,
        results,
    })
}

impl ErgastClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("results provider request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "results provider returned HTTP {} for {}",
                response.status(),
                path
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("results provider JSON parse error: {}", e))
        })
    }

    fn race_table(envelope: MrDataEnvelope, context: &str) -> Result<ErgastRace, AppError> {
        envelope
            .mrdata
            .race_table
            .and_then(|t| t.races.into_iter().next())
            .ok_or_else(|| {
                AppError::UpstreamUnavailable(format!("results provider sent no race for {}", context))
            })
    }

    fn standings_list(envelope: MrDataEnvelope, context: &str) -> Result<StandingsList, AppError> {
        envelope
            .mrdata
            .standings_table
            .and_then(|t| t.standings_lists.into_iter().next())
            .ok_or_else(|| {
                AppError::UpstreamUnavailable(format!(
                    "results provider sent no standings for {}",
                    context
                ))
            })
    }

    /// The most recent completed race with its full results.
    pub async fn latest_race(&self) -> Result<LatestRace, AppError> {
        let envelope: MrDataEnvelope = self.get_json("current/last/results.json").await?;
        convert_race(Self::race_table(envelope, "current/last")?)
    }

    /// Identity of the most recent race (no results array). Used by the
    /// read path and the highlights trigger, which only need to know which
    /// round is current.
    pub async fn latest_race_identity(&self) -> Result<LatestRace, AppError> {
        let envelope: MrDataEnvelope = self.get_json("current/last.json").await?;
        convert_race(Self::race_table(envelope, "current/last")?)
    }

    /// Current championship-wide driver standings.
    pub async fn driver_standings(&self) -> Result<Vec<DriverStanding>, AppError> {
        let envelope: MrDataEnvelope = self.get_json("current/driverStandings.json").await?;
        let list = Self::standings_list(envelope, "driverStandings")?;
        list.driver_standings
            .into_iter()
            .map(|entry| {
                let constructor = entry.constructors.into_iter().next().ok_or_else(|| {
                    AppError::UpstreamUnavailable(
                        "driver standing without a constructor".to_string(),
                    )
                })?;
                Ok(DriverStanding {
                    position: parse_i32(&entry.position, "DriverStandings.position")?,
                    points: parse_f64(&entry.points, "DriverStandings.points")?,
                    name: format!("{} {}", entry.driver.given_name, entry.driver.family_name),
                    code: entry.driver.code,
                    team: constructor.name,
                    team_logo_uri: constructor.url,
                })
            })
            .collect()
    }

    /// Current championship-wide constructor standings.
    pub async fn constructor_standings(&self) -> Result<Vec<ConstructorStanding>, AppError> {
        let envelope: MrDataEnvelope = self.get_json("current/constructorStandings.json").await?;
        let list = Self::standings_list(envelope, "constructorStandings")?;
        list.constructor_standings
            .into_iter()
            .map(|entry| {
                Ok(ConstructorStanding {
                    position: parse_i32(&entry.position, "ConstructorStandings.position")?,
                    points: parse_f64(&entry.points, "ConstructorStandings.points")?,
                    name: entry.constructor.name,
                    logo_uri: entry.constructor.url,
                })
            })
            .collect()
    }

    /// Schedule entry for one round (no results). An empty race table means
    /// the provider has not published the round yet, which is an upstream
    /// failure from this system's point of view.
    pub async fn race_schedule(&self, season: i32, round: i32) -> Result<ScheduledRace, AppError> {
        let envelope: MrDataEnvelope = self
            .get_json(&format!("{}/{}.json", season, round))
            .await?;
        let race = Self::race_table(envelope, &format!("season {} round {}", season, round))?;

        Ok(ScheduledRace {
            name: race.race_name,
            country: race.circuit.location.country,
            circuit_name: race.circuit.circuit_name,
            date: race.date,
            time: race.time.ok_or_else(|| {
                AppError::UpstreamUnavailable(
                    "results provider sent schedule without start time".to_string(),
                )
            })?,
            latitude: parse_f64(&race.circuit.location.lat, "Circuit.Location.lat")?,
            longitude: parse_f64(&race.circuit.location.long, "Circuit.Location.long")?,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A trimmed current/last/results.json payload in the provider's dialect.
    pub fn sample_results_json() -> serde_json::Value {
        serde_json::json!({
            "MRData": {
                "RaceTable": {
                    "Races": [{
                        "season": "2024",
                        "round": "7",
                        "raceName": "Monaco Grand Prix",
                        "date": "2024-05-26",
                        "time": "13:00:00Z",
                        "Circuit": {
                            "circuitName": "Circuit de Monaco",
                            "Location": {
                                "lat": "43.7347",
                                "long": "7.42056",
                                "locality": "Monte-Carlo",
                                "country": "Monaco"
                            }
                        },
                        "Results": [
                            {
                                "position": "1",
                                "points": "25",
                                "grid": "1",
                                "status": "Finished",
                                "Driver": { "givenName": "Charles", "familyName": "Leclerc", "code": "LEC" },
                                "Constructor": { "name": "Ferrari", "url": "http://example.test/ferrari" },
                                "Time": { "time": "2:23:15.554" },
                                "FastestLap": { "rank": "4", "Time": { "time": "1:14.165" } }
                            },
                            {
                                "position": "2",
                                "points": "18",
                                "grid": "3",
                                "status": "Finished",
                                "Driver": { "givenName": "Oscar", "familyName": "Piastri", "code": "PIA" },
                                "Constructor": { "name": "McLaren", "url": "http://example.test/mclaren" },
                                "Time": { "time": "+7.152" },
                                "FastestLap": { "rank": "1", "Time": { "time": "1:13.812" } }
                            },
                            {
                                "position": "16",
                                "points": "0",
                                "grid": "10",
                                "status": "+1 Lap",
                                "Driver": { "givenName": "Logan", "familyName": "Sargeant", "code": "SAR" },
                                "Constructor": { "name": "Williams", "url": "http://example.test/williams" }
                            },
                            {
                                "position": "20",
                                "points": "0",
                                "grid": "13",
                                "status": "Collision",
                                "Driver": { "givenName": "Kevin", "familyName": "Magnussen", "code": "MAG" },
                                "Constructor": { "name": "Haas F1 Team", "url": "http://example.test/haas" }
                            }
                        ]
                    }]
                }
            }
        })
    }

    #[tokio::test]
    async fn test_latest_race_parses_and_validates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current/last/results.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_results_json()))
            .mount(&mock_server)
            .await;

        let client = ErgastClient::new(&mock_server.uri());
        let race = client.latest_race().await.unwrap();

        assert_eq!(race.season, 2024);
        assert_eq!(race.round, 7);
        assert_eq!(race.city, "Monte-Carlo");
        assert!((race.latitude - 43.7347).abs() < 1e-9);
        assert_eq!(race.results.len(), 4);
        assert_eq!(race.results[0].elapsed_time.as_deref(), Some("2:23:15.554"));
        assert_eq!(race.results[1].fastest_lap.as_ref().unwrap().rank, 1);
        assert!(race.results[2].elapsed_time.is_none());
        assert!(race.results[2].fastest_lap.is_none());
    }

    #[tokio::test]
    async fn test_non_numeric_field_is_upstream_unavailable() {
        let mock_server = MockServer::start().await;

        let mut body = sample_results_json();
        body["MRData"]["RaceTable"]["Races"][0]["round"] = serde_json::json!("seven");

        Mock::given(method("GET"))
            .and(path("/current/last/results.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let client = ErgastClient::new(&mock_server.uri());
        let err = client.latest_race().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_upstream_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current/last/results.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = ErgastClient::new(&mock_server.uri());
        let err = client.latest_race().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_schedule_is_upstream_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2024/25.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MRData": { "RaceTable": { "Races": [] } }
            })))
            .mount(&mock_server)
            .await;

        let client = ErgastClient::new(&mock_server.uri());
        let err = client.race_schedule(2024, 25).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_driver_standings() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current/driverStandings.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MRData": {
                    "StandingsTable": {
                        "StandingsLists": [{
                            "DriverStandings": [{
                                "position": "1",
                                "points": "161",
                                "Driver": { "givenName": "Max", "familyName": "Verstappen", "code": "VER" },
                                "Constructors": [{ "name": "Red Bull", "url": "http://example.test/rb" }]
                            }]
                        }]
                    }
                }
            })))
            .mount(&mock_server)
            .await;

        let client = ErgastClient::new(&mock_server.uri());
        let standings = client.driver_standings().await.unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].name, "Max Verstappen");
        assert_eq!(standings[0].points, 161.0);
    }
}
