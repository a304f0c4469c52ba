//! Session state

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{EnrichedListing, ListingSummary, SearchParams};

/// Interaction phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Searching,
    ListingsShown,
    /// Index into the shown listings
    AnalyzingListing(usize),
    PostAnalysisMenu,
    PoiMenu,
    Exit,
}

/// Report categories of the POI menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Restaurants,
    Attractions,
    City,
    AreaReviews,
}

/// Everything one session has learned so far
#[derive(Debug, Default)]
pub struct SessionState {
    /// Free-text request behind the current search
    pub request: String,
    pub params: Option<SearchParams>,
    pub listings: Vec<ListingSummary>,
    pub active: Option<EnrichedListing>,
    pub report: Option<String>,
    reports: HashMap<Topic, String>,
}

impl SessionState {
    /// Start over with a fresh search result
    pub fn begin_search(&mut self, request: &str, params: SearchParams, listings: Vec<ListingSummary>) {
        debug!(%request, count = listings.len(), "SessionState::begin_search: called");
        *self = Self {
            request: request.to_string(),
            params: Some(params),
            listings,
            ..Self::default()
        };
    }

    /// Make `listing` the analysed one; cached POI reports belong to the previous one
    pub fn begin_analysis(&mut self, listing: EnrichedListing, report: Option<String>) {
        debug!(id = %listing.summary.id, "SessionState::begin_analysis: called");
        self.active = Some(listing);
        self.report = report;
        self.reports.clear();
    }

    /// Forget the current search
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn cached(&self, topic: Topic) -> Option<&str> {
        self.reports.get(&topic).map(String::as_str)
    }

    pub fn remember(&mut self, topic: Topic, text: String) {
        self.reports.insert(topic, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListingDetail;

    fn summary(id: &str) -> ListingSummary {
        ListingSummary {
            id: id.to_string(),
            name: format!("Flat {id}"),
            price_details: String::new(),
            rating_label: String::new(),
            badges: String::new(),
            coordinate: None,
            url: String::new(),
        }
    }

    fn enriched(id: &str) -> EnrichedListing {
        EnrichedListing::new(summary(id), ListingDetail::new(id), "Lviv, Ukraine", "Kiev")
    }

    #[test]
    fn test_new_analysis_clears_cached_reports() {
        let mut state = SessionState::default();
        state.begin_search("Lviv", SearchParams::at("Lviv, Ukraine"), vec![summary("1"), summary("2")]);
        state.begin_analysis(enriched("1"), Some("report".to_string()));
        state.remember(Topic::Restaurants, "food".to_string());
        assert_eq!(state.cached(Topic::Restaurants), Some("food"));
        assert_eq!(state.active.as_ref().map(|l| l.search_city.as_str()), Some("Lviv"));

        state.begin_analysis(enriched("2"), None);
        assert_eq!(state.cached(Topic::Restaurants), None);
        assert_eq!(state.listings.len(), 2);
    }

    #[test]
    fn test_new_search_clears_everything() {
        let mut state = SessionState::default();
        state.begin_search("Lviv", SearchParams::at("Lviv, Ukraine"), vec![summary("1")]);
        state.begin_analysis(enriched("1"), Some("report".to_string()));
        state.remember(Topic::City, "city".to_string());

        state.begin_search("Odesa", SearchParams::at("Odesa, Ukraine"), vec![]);
        assert!(state.active.is_none());
        assert!(state.report.is_none());
        assert!(state.listings.is_empty());
        assert_eq!(state.cached(Topic::City), None);
        assert_eq!(state.request, "Odesa");
    }
}
