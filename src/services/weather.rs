//! open-meteo-compatible daily forecast client.
//!
//! The provider takes latitude/longitude and an inclusive date range and
//! returns one WMO weather code plus temperature extremes per day. Codes are
//! mapped to labels through a static table; unknown codes map to an empty
//! string, never an error.

use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the daily-forecast API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
}

/// One day of the returned range.
#[derive(Debug, Clone)]
pub struct DayWeather {
    pub code: i32,
    pub temp_min: f64,
    pub temp_max: f64,
}

// --- open-meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    weathercode: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

impl WeatherClient {
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

    /// Fetch the daily forecast for an inclusive [start_date, end_date]
    /// range (dates as "YYYY-MM-DD"). Returns one entry per day; fewer than
    /// two days makes the qualifying/race split impossible and is treated as
    /// a provider failure.
    pub async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<DayWeather>, AppError> {
        let url = format!(
            "{}/forecast?latitude={:.4}&longitude={:.4}&daily=weathercode,temperature_2m_max,temperature_2m_min&start_date={}&end_date={}&timezone=auto",
            self.base_url, latitude, longitude, start_date, end_date
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("weather provider request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "weather provider returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ForecastResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("weather provider JSON parse error: {}", e))
        })?;

        let daily = parsed.daily;
        let n = daily
            .weathercode
            .len()
            .min(daily.temperature_2m_max.len())
            .min(daily.temperature_2m_min.len());
        if n < 2 {
            return Err(AppError::UpstreamUnavailable(format!(
                "weather provider returned {} day(s), expected at least 2",
                n
            )));
        }

        Ok((0..n)
            .map(|i| DayWeather {
                code: daily.weathercode[i],
                temp_min: daily.temperature_2m_min[i],
                temp_max: daily.temperature_2m_max[i],
            })
            .collect())
    }
}

/// Map a WMO weather code to its human-readable category.
///
/// Unknown codes map to an empty string so a provider extension can never
/// fail an assembly.
pub fn condition_label(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Heavy rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Slight thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy rain",
        _ => "",
    }
}

/// Render a day's temperature extremes as a "min-max°C" range string.
pub fn temperature_range(day: &DayWeather) -> String {
    format!("{:.0}-{:.0}°C", day.temp_min, day.temp_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_condition_label_known_codes() {
        assert_eq!(condition_label(0), "Clear sky");
        assert_eq!(condition_label(3), "Overcast");
        assert_eq!(condition_label(95), "Slight thunderstorm");
    }

    #[test]
    fn test_condition_label_unknown_code_is_empty() {
        assert_eq!(condition_label(999), "");
        assert_eq!(condition_label(-1), "");
        assert_eq!(condition_label(42), "");
    }

    #[test]
    fn test_temperature_range_rounds() {
        let day = DayWeather {
            code: 3,
            temp_min: 14.1,
            temp_max: 23.4,
        };
        assert_eq!(temperature_range(&day), "14-23°C");
    }

    #[test]
    fn test_temperature_range_negative() {
        let day = DayWeather {
            code: 71,
            temp_min: -3.6,
            temp_max: 1.2,
        };
        assert_eq!(temperature_range(&day), "-4-1°C");
    }

    #[tokio::test]
    async fn test_daily_forecast_two_days() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("start_date", "2024-05-25"))
            .and(query_param("end_date", "2024-05-26"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2024-05-25", "2024-05-26"],
                    "weathercode": [3, 95],
                    "temperature_2m_max": [22.7, 23.4],
                    "temperature_2m_min": [14.1, 15.2]
                }
            })))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri());
        let days = client
            .daily_forecast(43.7347, 7.42056, "2024-05-25", "2024-05-26")
            .await
            .unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].code, 3);
        assert_eq!(days[1].code, 95);
        assert_eq!(temperature_range(&days[1]), "15-23°C");
    }

    #[tokio::test]
    async fn test_single_day_response_is_upstream_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2024-05-26"],
                    "weathercode": [3],
                    "temperature_2m_max": [22.7],
                    "temperature_2m_min": [14.1]
                }
            })))
            .mount(&mock_server)
            .await;

        let client = WeatherClient::new(&mock_server.uri());
        let err = client
            .daily_forecast(43.7347, 7.42056, "2024-05-25", "2024-05-26")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
