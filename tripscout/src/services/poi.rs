//! Points-of-interest client
//!
//! The worker's dedicated nearby-search tool returns wrong results, so
//! [`PoiClient::search_nearby`] goes through the text search tool with a
//! synthesized query and a `latLong` argument. Do not switch it back.

use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::channel::ToolChannel;
use super::error::ServiceError;
use crate::domain::{Coordinate, PoiCategory, PoiDetails, PoiRecord, ReviewRecord};
use crate::rpc::ToolInfo;

pub const TOOL_SEARCH_LOCATIONS: &str = "search_locations";
pub const TOOL_LOCATION_DETAILS: &str = "get_location_details";
pub const TOOL_LOCATION_REVIEWS: &str = "get_location_reviews";

pub struct PoiClient {
    channel: ToolChannel,
    language: String,
}

impl PoiClient {
    pub fn new(channel: ToolChannel, language: impl Into<String>) -> Self {
        Self {
            channel,
            language: language.into(),
        }
    }

    /// Free-text location search
    pub async fn search_by_text(&mut self, query: &str, category: Option<PoiCategory>) -> Vec<PoiRecord> {
        debug!(%query, ?category, "PoiClient::search_by_text: called");
        let mut arguments = self.arguments();
        arguments.insert("searchQuery".to_string(), json!(query));
        if let Some(category) = category {
            arguments.insert("category".to_string(), json!(category.query_term()));
        }
        self.search(Value::Object(arguments)).await
    }

    /// Locations around a coordinate, as a text search carrying `latLong`
    pub async fn search_nearby(
        &mut self,
        latitude: f64,
        longitude: f64,
        category: Option<PoiCategory>,
        query: Option<&str>,
    ) -> Vec<PoiRecord> {
        debug!(latitude, longitude, ?category, ?query, "PoiClient::search_nearby: called");
        let query = match (query, category) {
            (Some(query), _) if !query.trim().is_empty() => query.to_string(),
            (_, Some(category)) => format!("{} near me", category.query_term()),
            _ => "places near me".to_string(),
        };

        let mut arguments = self.arguments();
        arguments.insert("searchQuery".to_string(), json!(query));
        arguments.insert("latLong".to_string(), json!(Coordinate::new(latitude, longitude).lat_long()));
        if let Some(category) = category {
            arguments.insert("category".to_string(), json!(category.query_term()));
        }
        self.search(Value::Object(arguments)).await
    }

    /// Description and features of one location; empty on failure
    pub async fn get_details(&mut self, location_id: &str) -> PoiDetails {
        debug!(%location_id, "PoiClient::get_details: called");
        let mut arguments = self.arguments();
        arguments.insert("locationId".to_string(), json!(location_id));

        match self.channel.call_tool(TOOL_LOCATION_DETAILS, Value::Object(arguments)).await {
            Ok(payload) => parse_details(&payload),
            Err(e) => {
                self.channel.note_failure(TOOL_LOCATION_DETAILS, &e).await;
                PoiDetails::default()
            }
        }
    }

    /// Reviews of one location; empty on failure
    pub async fn get_reviews(&mut self, location_id: &str) -> Vec<ReviewRecord> {
        debug!(%location_id, "PoiClient::get_reviews: called");
        match self.fetch_reviews(location_id).await {
            Ok(reviews) => reviews,
            Err(e) => {
                self.channel.note_failure(TOOL_LOCATION_REVIEWS, &e).await;
                Vec::new()
            }
        }
    }

    async fn fetch_reviews(&mut self, location_id: &str) -> Result<Vec<ReviewRecord>, ServiceError> {
        let mut arguments = self.arguments();
        arguments.insert("locationId".to_string(), json!(location_id));
        let payload = self
            .channel
            .call_tool(TOOL_LOCATION_REVIEWS, Value::Object(arguments))
            .await?;
        Ok(data_items(&payload).iter().filter_map(parse_review).collect())
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, ServiceError> {
        self.channel.list_tools().await
    }

    pub fn take_fault(&mut self) -> Option<String> {
        self.channel.take_fault()
    }

    pub async fn shutdown(&mut self) {
        self.channel.shutdown().await;
    }

    fn arguments(&self) -> Map<String, Value> {
        let mut arguments = Map::new();
        arguments.insert("language".to_string(), json!(self.language));
        arguments
    }

    async fn search(&mut self, arguments: Value) -> Vec<PoiRecord> {
        match self.channel.call_tool(TOOL_SEARCH_LOCATIONS, arguments).await {
            Ok(payload) => {
                let places: Vec<PoiRecord> = data_items(&payload).iter().filter_map(parse_place).collect();
                info!(count = places.len(), "POI search finished");
                places
            }
            Err(e) => {
                self.channel.note_failure(TOOL_SEARCH_LOCATIONS, &e).await;
                Vec::new()
            }
        }
    }
}

fn data_items(payload: &Value) -> &[Value] {
    match payload.get("data").and_then(Value::as_array) {
        Some(items) => items,
        None => {
            warn!("POI payload has no data array");
            &[]
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(non_empty).collect())
        .unwrap_or_default()
}

fn parse_place(item: &Value) -> Option<PoiRecord> {
    let Some(name) = non_empty(&item["name"]) else {
        warn!(%item, "Skipping location without a name");
        return None;
    };
    Some(PoiRecord {
        id: id_string(&item["location_id"]),
        name,
        address: non_empty(&item["address_obj"]["address_string"]).unwrap_or_default(),
        description: non_empty(&item["description"]),
        features: strings(&item["features"]),
    })
}

fn parse_details(payload: &Value) -> PoiDetails {
    PoiDetails {
        description: non_empty(&payload["description"]),
        features: strings(&payload["features"]),
    }
}

fn parse_review(item: &Value) -> Option<ReviewRecord> {
    if !item.is_object() {
        return None;
    }
    let rating = match &item["rating"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Some(ReviewRecord {
        title: non_empty(&item["title"]).unwrap_or_default(),
        text: non_empty(&item["text"]).unwrap_or_default(),
        rating,
        source: None,
    })
}
