//! Points of interest and their reviews

use std::fmt;

use serde::Serialize;

/// POI search category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Attraction,
    Restaurant,
}

impl PoiCategory {
    /// Value of the `category` argument and of the nearby query prefix
    pub fn query_term(&self) -> &'static str {
        match self {
            PoiCategory::Attraction => "attractions",
            PoiCategory::Restaurant => "restaurants",
        }
    }
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoiCategory::Attraction => write!(f, "attraction"),
            PoiCategory::Restaurant => write!(f, "restaurant"),
        }
    }
}

/// A place returned by the POI service
///
/// Raw records come from a search; `description` and `features` are set
/// once details have been fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoiRecord {
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub description: Option<String>,
    pub features: Vec<String>,
}

/// Fields returned by a POI detail lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoiDetails {
    pub description: Option<String>,
    pub features: Vec<String>,
}

impl PoiDetails {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.features.is_empty()
    }
}

impl PoiRecord {
    pub fn is_enriched(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    pub fn enrich(mut self, details: PoiDetails) -> Self {
        self.description = details.description;
        self.features = details.features;
        self
    }
}

/// Where an aggregated review came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSource {
    pub place_name: String,
    pub category: PoiCategory,
    pub place_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub title: String,
    pub text: String,
    pub rating: Option<f64>,
    pub source: Option<ReviewSource>,
}

impl ReviewRecord {
    pub fn with_source(mut self, source: ReviewSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_terms() {
        assert_eq!(PoiCategory::Restaurant.query_term(), "restaurants");
        assert_eq!(PoiCategory::Attraction.query_term(), "attractions");
        assert_eq!(PoiCategory::Attraction.to_string(), "attraction");
    }

    #[test]
    fn test_enrichment_state() {
        let raw = PoiRecord {
            id: Some("1".to_string()),
            name: "Opera".to_string(),
            ..Default::default()
        };
        assert!(!raw.is_enriched());

        let blank = raw.clone().enrich(PoiDetails {
            description: Some("   ".to_string()),
            features: vec![],
        });
        assert!(!blank.is_enriched());

        let enriched = raw.enrich(PoiDetails {
            description: Some("National opera house".to_string()),
            features: vec!["Tours".to_string()],
        });
        assert!(enriched.is_enriched());
        assert_eq!(enriched.features, vec!["Tours"]);
    }
}
