//! Cross-request POI aggregation
//!
//! Enrichment keeps the first places (in search order) whose details carry a
//! description. Area reviews pool a few reviews from the attractions and
//! restaurants nearest a listing. Nothing here fails: empty results mean
//! "not found".

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::{Coordinate, PoiCategory, PoiRecord, ReviewRecord, ReviewSource};
use crate::services::PoiClient;

/// Enriched places kept per lookup
pub const MAX_ENRICHED_PLACES: usize = 5;

/// Nearby candidates consulted per category for area reviews
pub const CANDIDATES_PER_CATEGORY: usize = 4;

/// Reviews taken from one place
pub const REVIEWS_PER_PLACE: usize = 3;

/// Reviews pooled for one area
pub const MAX_AREA_REVIEWS: usize = 12;

/// Outcome of a place lookup followed by enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceLookup {
    /// Raw results returned by the search
    pub found: usize,
    /// Places that survived enrichment
    pub places: Vec<PoiRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaReviews {
    pub reviews: Vec<ReviewRecord>,
    /// Places that contributed at least one review
    pub contributing_places: usize,
    /// Candidates gathered from both nearby searches
    pub candidates: usize,
}

impl AreaReviews {
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Review count per source place, in collection order
    pub fn per_place(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for review in &self.reviews {
            let Some(source) = &review.source else { continue };
            let count = counts.entry(source.place_name.clone()).or_default();
            if *count == 0 {
                order.push(source.place_name.clone());
            }
            *count += 1;
        }
        order
            .into_iter()
            .map(|name| {
                let count = counts.get(&name).copied().unwrap_or_default();
                (name, count)
            })
            .collect()
    }
}

/// Fetch details for `places` in order and keep the described ones
pub async fn enrich_places(client: &mut PoiClient, places: Vec<PoiRecord>) -> Vec<PoiRecord> {
    debug!(candidates = places.len(), "enrich_places: called");
    let mut enriched = Vec::new();

    for place in places {
        if enriched.len() >= MAX_ENRICHED_PLACES {
            break;
        }
        let Some(id) = place.id.clone() else {
            debug!(name = %place.name, "enrich_places: skipping place without id");
            continue;
        };
        let details = client.get_details(&id).await;
        let place = place.enrich(details);
        if place.is_enriched() {
            enriched.push(place);
        } else {
            debug!(%id, "enrich_places: skipping place without description");
        }
    }

    info!(kept = enriched.len(), "Enriched places");
    enriched
}

/// Places of `category` around a coordinate
pub async fn nearby_places(client: &mut PoiClient, at: Coordinate, category: PoiCategory) -> PlaceLookup {
    debug!(?at, %category, "nearby_places: called");
    let raw = client.search_nearby(at.latitude, at.longitude, Some(category), None).await;
    lookup(client, raw).await
}

/// Attractions of a city, by name
pub async fn city_places(client: &mut PoiClient, city: &str) -> PlaceLookup {
    debug!(%city, "city_places: called");
    let raw = client.search_by_text(&format!("{} attractions", city), None).await;
    lookup(client, raw).await
}

async fn lookup(client: &mut PoiClient, raw: Vec<PoiRecord>) -> PlaceLookup {
    let found = raw.len();
    if found == 0 {
        return PlaceLookup::default();
    }
    PlaceLookup {
        found,
        places: enrich_places(client, raw).await,
    }
}

/// Pool reviews from the attractions, then restaurants, nearest `at`
pub async fn collect_area_reviews(client: &mut PoiClient, at: Coordinate) -> AreaReviews {
    debug!(?at, "collect_area_reviews: called");
    let mut candidates: Vec<(PoiCategory, PoiRecord)> = Vec::new();
    for category in [PoiCategory::Attraction, PoiCategory::Restaurant] {
        let places = client.search_nearby(at.latitude, at.longitude, Some(category), None).await;
        debug!(%category, found = places.len(), "collect_area_reviews: nearby search finished");
        candidates.extend(
            places
                .into_iter()
                .take(CANDIDATES_PER_CATEGORY)
                .map(|place| (category, place)),
        );
    }

    let mut result = AreaReviews {
        candidates: candidates.len(),
        ..Default::default()
    };

    for (category, place) in candidates {
        if result.reviews.len() >= MAX_AREA_REVIEWS {
            break;
        }
        let Some(id) = place.id else {
            debug!(name = %place.name, "collect_area_reviews: skipping place without id");
            continue;
        };
        let reviews = client.get_reviews(&id).await;
        if reviews.is_empty() {
            continue;
        }

        let room = MAX_AREA_REVIEWS - result.reviews.len();
        let take = REVIEWS_PER_PLACE.min(room);
        let source = ReviewSource {
            place_name: place.name,
            category,
            place_id: id,
        };
        result.reviews.extend(
            reviews
                .into_iter()
                .take(take)
                .map(|review| review.with_source(source.clone())),
        );
        result.contributing_places += 1;
    }

    info!(
        reviews = result.reviews.len(),
        places = result.contributing_places,
        "Collected area reviews"
    );
    result
}
