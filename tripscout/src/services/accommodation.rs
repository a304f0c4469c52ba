//! Accommodation search client

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::channel::ToolChannel;
use super::error::ServiceError;
use crate::domain::{
    Coordinate, GuestCounts, ListingDetail, ListingSummary, SearchParams, SectionValue,
};
use crate::rpc::ToolInfo;

pub const TOOL_SEARCH: &str = "airbnb_search";
pub const TOOL_LISTING_DETAILS: &str = "airbnb_listing_details";

pub struct AccommodationClient {
    channel: ToolChannel,
    guests: GuestCounts,
}

impl AccommodationClient {
    pub fn new(channel: ToolChannel, guests: GuestCounts) -> Self {
        Self { channel, guests }
    }

    /// Search listings; any failure yields an empty list
    pub async fn search(&mut self, params: &SearchParams) -> Vec<ListingSummary> {
        debug!(location = %params.location, "AccommodationClient::search: called");
        let merged = params.clone().with_guest_defaults(&self.guests);
        let arguments = match serde_json::to_value(&merged) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(error = %e, "Failed to encode search parameters");
                return Vec::new();
            }
        };

        match self.channel.call_tool(TOOL_SEARCH, arguments).await {
            Ok(payload) => {
                let listings = parse_search_results(&payload);
                info!(location = %params.location, count = listings.len(), "Accommodation search finished");
                listings
            }
            Err(e) => {
                self.channel.note_failure(TOOL_SEARCH, &e).await;
                Vec::new()
            }
        }
    }

    /// Fetch details of one listing; any failure yields an empty detail record
    pub async fn get_details(&mut self, id: &str) -> ListingDetail {
        debug!(%id, "AccommodationClient::get_details: called");
        match self.channel.call_tool(TOOL_LISTING_DETAILS, json!({ "id": id })).await {
            Ok(payload) => parse_listing_detail(id, &payload),
            Err(e) => {
                self.channel.note_failure(TOOL_LISTING_DETAILS, &e).await;
                ListingDetail::new(id)
            }
        }
    }

    /// Schema of the search tool as advertised by the worker
    pub async fn search_tool(&mut self) -> Result<ToolInfo, ServiceError> {
        self.channel.find_tool(TOOL_SEARCH).await
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
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListing {
    id: Value,
    #[serde(default)]
    demand_stay_listing: RawStayListing,
    #[serde(default)]
    structured_display_price: RawPrice,
    #[serde(default)]
    avg_rating_a11y_label: String,
    #[serde(default)]
    badges: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawStayListing {
    #[serde(default)]
    description: Value,
    #[serde(default)]
    location: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrice {
    #[serde(default)]
    explanation_data: Value,
}

impl RawListing {
    fn into_summary(self) -> Option<ListingSummary> {
        let id = match self.id {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let name = self.demand_stay_listing.description["name"]["localizedStringWithTranslationPreference"]
            .as_str()
            .unwrap_or("Unnamed listing")
            .to_string();
        let coordinate = &self.demand_stay_listing.location["coordinate"];
        let coordinate = match (coordinate["latitude"].as_f64(), coordinate["longitude"].as_f64()) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };
        let price_details = self.structured_display_price.explanation_data["priceDetails"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Some(ListingSummary {
            id,
            name,
            price_details,
            rating_label: self.avg_rating_a11y_label,
            badges: self.badges,
            coordinate,
            url: self.url,
        })
    }
}

fn parse_search_results(payload: &Value) -> Vec<ListingSummary> {
    let Some(results) = payload.get("searchResults").and_then(Value::as_array) else {
        warn!("Search payload has no searchResults array");
        return Vec::new();
    };

    results
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let summary = serde_json::from_value::<RawListing>(raw.clone())
                .ok()
                .and_then(RawListing::into_summary);
            if summary.is_none() {
                warn!(index, "Skipping search result that could not be mapped");
            }
            summary
        })
        .collect()
}

fn section_name(id: &str) -> String {
    match id {
        "AMENITIES_DEFAULT" => "amenities".to_string(),
        "HIGHLIGHTS_DEFAULT" => "highlights".to_string(),
        "LOCATION_DEFAULT" => "location".to_string(),
        "POLICIES_DEFAULT" => "policies".to_string(),
        other => other.trim_end_matches("_DEFAULT").to_lowercase(),
    }
}

fn section_value(section: &serde_json::Map<String, Value>) -> Option<SectionValue> {
    let mut texts = Vec::new();
    let mut items = Vec::new();
    for (key, value) in section {
        if key == "id" {
            continue;
        }
        match value {
            Value::String(s) if !s.trim().is_empty() => texts.push(s.trim().to_string()),
            Value::Array(values) => items.extend(values.iter().filter_map(Value::as_str).map(String::from)),
            _ => {}
        }
    }

    if !items.is_empty() {
        Some(SectionValue::List(items))
    } else if !texts.is_empty() {
        Some(SectionValue::Text(texts.join("\n")))
    } else {
        None
    }
}

fn parse_listing_detail(id: &str, payload: &Value) -> ListingDetail {
    let mut detail = ListingDetail::new(id);
    detail.url = payload["listingUrl"].as_str().map(String::from);

    for section in payload["details"].as_array().into_iter().flatten() {
        let Some(section) = section.as_object() else { continue };
        let Some(section_id) = section.get("id").and_then(Value::as_str) else {
            continue;
        };
        if let Some(value) = section_value(section) {
            detail.sections.insert(section_name(section_id), value);
        }
    }
    debug!(%id, sections = detail.sections.len(), "parse_listing_detail: mapped sections");
    detail
}
