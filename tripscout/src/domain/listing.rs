//! Accommodation listings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::search::derive_search_city;

/// Geographic position of a listing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `"<lat>,<lon>"` as the POI service expects it
    pub fn lat_long(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub id: String,
    pub name: String,
    pub price_details: String,
    pub rating_label: String,
    pub badges: String,
    pub coordinate: Option<Coordinate>,
    pub url: String,
}

/// A detail section: either free text or a list of items
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    List(Vec<String>),
}

impl SectionValue {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionValue::Text(text) => text.trim().is_empty(),
            SectionValue::List(items) => items.is_empty(),
        }
    }

    /// Items of a list section, or a text section split on commas
    pub fn items(&self) -> Vec<String> {
        match self {
            SectionValue::List(items) => items.clone(),
            SectionValue::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

pub const SECTION_AMENITIES: &str = "amenities";
pub const SECTION_HIGHLIGHTS: &str = "highlights";
pub const SECTION_LOCATION: &str = "location";
pub const SECTION_POLICIES: &str = "policies";

/// Detail record for one listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingDetail {
    pub id: String,
    pub url: Option<String>,
    pub sections: BTreeMap<String, SectionValue>,
}

impl ListingDetail {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(SectionValue::is_empty)
    }

    pub fn section(&self, name: &str) -> Option<&SectionValue> {
        self.sections.get(name)
    }

    pub fn amenities(&self) -> Vec<String> {
        self.section(SECTION_AMENITIES).map(SectionValue::items).unwrap_or_default()
    }
}

/// A listing merged with its details and the city used for POI lookups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub summary: ListingSummary,
    pub details: ListingDetail,
    pub search_city: String,
}

impl EnrichedListing {
    pub fn new(summary: ListingSummary, details: ListingDetail, location: &str, fallback_city: &str) -> Self {
        Self {
            summary,
            details,
            search_city: derive_search_city(location, fallback_city),
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.summary.coordinate
    }
}
