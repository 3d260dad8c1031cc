//! Atlas Data API client for the reference and race-record collections.
//!
//! The store is a document database reached through its HTTP data-API
//! facade: every operation is a POST to `{base}/action/<op>` carrying the
//! data source, database and collection alongside the filter/document.
//!
//! Collections:
//! - `races`      — persisted `RaceRecord`s, unique per `race.season` +
//!   `race.round` (insert-only; a duplicate-key insert reports `Duplicate`)
//! - `tracks`     — curated track metadata, keyed by track name
//! - `highlights` — curated highlight links, keyed by season + round

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::db::models::{HighlightDoc, RaceRecord, TrackProfile};
use crate::errors::AppError;

const RACES_COLLECTION: &str = "races";
const TRACKS_COLLECTION: &str = "tracks";
const HIGHLIGHTS_COLLECTION: &str = "highlights";

/// Per-request timeout. A slow store is treated like any other failed
/// upstream rather than holding the assembly open.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the document store's HTTP data-API facade.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    data_source: String,
    database: String,
}

/// Result of an insert into the `races` collection.
#[derive(Debug)]
pub enum InsertOutcome {
    /// The store acknowledged the write with a generated identifier.
    Inserted { id: String },
    /// The unique index on `race.season` + `race.round` rejected the write:
    /// a concurrent trigger already ingested this race.
    Duplicate,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    #[serde(rename = "dataSource")]
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projection: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FindOneResponse {
    document: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct InsertOneResponse {
    #[serde(rename = "insertedId")]
    inserted_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateOneResponse {
    #[serde(rename = "matchedCount")]
    matched_count: i64,
    #[serde(rename = "modifiedCount")]
    #[allow(dead_code)]
    modified_count: i64,
}

fn race_key_filter(season: i32, round: i32) -> Value {
    json!({ "race.season": season, "race.round": round })
}

impl StoreClient {
    pub fn new(base_url: &str, api_key: &str, data_source: &str, database: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            data_source: data_source.to_string(),
            database: database.to_string(),
        }
    }

    fn request<'a>(&'a self, collection: &'a str) -> ActionRequest<'a> {
        ActionRequest {
            data_source: &self.data_source,
            database: &self.database,
            collection,
            filter: None,
            projection: None,
            document: None,
            update: None,
        }
    }

    /// POST one data-API action and return the response body on success.
    async fn post_action(&self, action: &str, body: &ActionRequest<'_>) -> Result<reqwest::Response, AppError> {
        let url = format!("{}/action/{}", self.base_url, action);
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("store request failed: {}", e)))?;
        Ok(response)
    }

    async fn find_one(&self, collection: &str, filter: Value, projection: Option<Value>) -> Result<Option<Value>, AppError> {
        let mut body = self.request(collection);
        body.filter = Some(filter);
        body.projection = projection;

        let response = self.post_action("findOne", &body).await?;
        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "store findOne on {} returned HTTP {}",
                collection,
                response.status()
            )));
        }

        let parsed: FindOneResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("store findOne parse error: {}", e)))?;
        Ok(parsed.document)
    }

    /// Curated track metadata by track name. `None` when the operators have
    /// not added the track yet.
    pub async fn find_track(&self, name: &str) -> Result<Option<TrackProfile>, AppError> {
        let doc = self
            .find_one(TRACKS_COLLECTION, json!({ "name": name }), None)
            .await?;
        doc.map(|d| {
            serde_json::from_value(d).map_err(|e| {
                AppError::UpstreamUnavailable(format!("malformed track document: {}", e))
            })
        })
        .transpose()
    }

    /// Curated highlight link for a given season + round, if any.
    pub async fn find_highlight(&self, season: i32, round: i32) -> Result<Option<HighlightDoc>, AppError> {
        let doc = self
            .find_one(
                HIGHLIGHTS_COLLECTION,
                json!({ "season": season, "round": round }),
                None,
            )
            .await?;
        doc.map(|d| {
            serde_json::from_value(d).map_err(|e| {
                AppError::UpstreamUnavailable(format!("malformed highlight document: {}", e))
            })
        })
        .transpose()
    }

    /// The persisted record for one race, if it has been ingested.
    pub async fn find_race(&self, season: i32, round: i32) -> Result<Option<RaceRecord>, AppError> {
        let doc = self
            .find_one(RACES_COLLECTION, race_key_filter(season, round), None)
            .await?;
        doc.map(|d| {
            serde_json::from_value(d).map_err(|e| {
                AppError::UpstreamUnavailable(format!("malformed race document: {}", e))
            })
        })
        .transpose()
    }

    /// Existence check for the orchestrator's de-duplication guard.
    /// Projects `_id` only; the full document is never transferred.
    pub async fn race_exists(&self, season: i32, round: i32) -> Result<bool, AppError> {
        let doc = self
            .find_one(
                RACES_COLLECTION,
                race_key_filter(season, round),
                Some(json!({ "_id": 1 })),
            )
            .await?;
        Ok(doc.is_some())
    }

    /// Insert a fully-assembled record. Insert-only: a duplicate-key
    /// rejection from the store's unique index is a normal `Duplicate`
    /// outcome, not a failure.
    pub async fn insert_race(&self, record: &RaceRecord) -> Result<InsertOutcome, AppError> {
        let document = serde_json::to_value(record)
            .map_err(|e| AppError::Internal(format!("record serialization failed: {}", e)))?;
        let mut body = self.request(RACES_COLLECTION);
        body.document = Some(document);

        let response = self.post_action("insertOne", &body).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if text.contains("E11000") || text.contains("duplicate key") {
                return Ok(InsertOutcome::Duplicate);
            }
            return Err(AppError::StoreWriteUnacknowledged(format!(
                "store insertOne returned HTTP {}: {}",
                status, text
            )));
        }

        let parsed: InsertOneResponse = response.json().await.map_err(|e| {
            AppError::StoreWriteUnacknowledged(format!("store insertOne parse error: {}", e))
        })?;
        match parsed.inserted_id {
            Some(id) => Ok(InsertOutcome::Inserted { id }),
            None => Err(AppError::StoreWriteUnacknowledged(
                "store insertOne returned no insertedId".to_string(),
            )),
        }
    }

    /// Targeted partial update of `highlights.uri` on an already-persisted
    /// record. An update, never a re-insert.
    pub async fn set_highlights_uri(&self, season: i32, round: i32, uri: &str) -> Result<(), AppError> {
        let mut body = self.request(RACES_COLLECTION);
        body.filter = Some(race_key_filter(season, round));
        body.update = Some(json!({ "$set": { "highlights.uri": uri } }));

        let response = self.post_action("updateOne", &body).await?;
        if !response.status().is_success() {
            return Err(AppError::StoreWriteUnacknowledged(format!(
                "store updateOne returned HTTP {}",
                response.status()
            )));
        }

        let parsed: UpdateOneResponse = response.json().await.map_err(|e| {
            AppError::StoreWriteUnacknowledged(format!("store updateOne parse error: {}", e))
        })?;
        if parsed.matched_count == 0 {
            return Err(AppError::StoreWriteUnacknowledged(format!(
                "no persisted record for season {} round {}",
                season, round
            )));
        }
        Ok(())
    }
}
