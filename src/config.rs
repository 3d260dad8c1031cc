/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the Ergast-compatible results/standings API.
    pub ergast_base: String,
    /// Base URL of the open-meteo-compatible forecast API.
    pub weather_base: String,
    /// Base URL of the YouTube-compatible video search API.
    pub youtube_base: String,
    pub youtube_api_key: String,
    /// Atlas Data API endpoint (".../app/<id>/endpoint/data/v1").
    pub data_api_uri: String,
    pub data_api_key: String,
    pub data_api_source: String,
    pub data_api_database: String,
    /// Frontend origin allowed by CORS, if any.
    pub frontend_uri: Option<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            ergast_base: std::env::var("ERGAST_API_BASE")
                .unwrap_or_else(|_| "http://ergast.com/api/f1".to_string()),
            weather_base: std::env::var("WEATHER_API_BASE")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1".to_string()),
            youtube_base: std::env::var("YOUTUBE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".to_string()),
            youtube_api_key: std::env::var("YOUTUBE_API_KEY").unwrap_or_default(),
            data_api_uri: std::env::var("DATA_API_URI").expect("DATA_API_URI must be set"),
            data_api_key: std::env::var("DATA_API_KEY").expect("DATA_API_KEY must be set"),
            data_api_source: std::env::var("DATA_API_SOURCE")
                .unwrap_or_else(|_| "Cluster0".to_string()),
            data_api_database: std::env::var("DATA_API_DATABASE")
                .unwrap_or_else(|_| "racedata".to_string()),
            frontend_uri: std::env::var("FRONTEND_URI").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
        }
    }
}
