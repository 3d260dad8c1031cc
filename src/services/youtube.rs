//! YouTube-compatible video search client for highlights enrichment.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the video search API.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- search JSON response types ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

impl YouTubeClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Search for the newest matching video published after the given
    /// instant. `None` means nothing has been published yet, which is a
    /// neutral outcome for the enrichment trigger.
    pub async fn search_video(
        &self,
        query: &str,
        published_after: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let url = format!(
            "{}/search?part=snippet&type=video&order=date&maxResults=1&q={}&publishedAfter={}&key={}",
            self.base_url,
            urlencode(query),
            published_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("video search request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "video search returned HTTP {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("video search JSON parse error: {}", e))
        })?;

        Ok(parsed
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .next()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id)))
    }
}

/// Percent-encode a query string value. Only the characters the search
/// queries actually contain need escaping (spaces and a handful of
/// reserved ones); everything else passes through.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
