//! Embedded prompts
//!
//! Compiled into the binary from the .pmt files under `prompts/`.

use tracing::debug;

/// Search-parameter extraction, system part
pub const EXTRACT: &str = include_str!("../../prompts/extract.pmt");

/// Search-parameter extraction, user part
pub const EXTRACT_INPUT: &str = include_str!("../../prompts/extract-input.pmt");

pub const LISTING_REPORT: &str = include_str!("../../prompts/listing-report.pmt");

pub const LISTING_REPORT_INPUT: &str = include_str!("../../prompts/listing-report-input.pmt");

/// Restaurants, attractions and city places share one template
pub const PLACES_REPORT: &str = include_str!("../../prompts/places-report.pmt");

pub const PLACES_REPORT_INPUT: &str = include_str!("../../prompts/places-report-input.pmt");

pub const AREA_REVIEWS: &str = include_str!("../../prompts/area-reviews.pmt");

pub const AREA_REVIEWS_INPUT: &str = include_str!("../../prompts/area-reviews-input.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "extract" => Some(EXTRACT),
        "extract-input" => Some(EXTRACT_INPUT),
        "listing-report" => Some(LISTING_REPORT),
        "listing-report-input" => Some(LISTING_REPORT_INPUT),
        "places-report" => Some(PLACES_REPORT),
        "places-report-input" => Some(PLACES_REPORT_INPUT),
        "area-reviews" => Some(AREA_REVIEWS),
        "area-reviews-input" => Some(AREA_REVIEWS_INPUT),
        _ => None,
    };
    if found.is_none() {
        debug!(%name, "get_embedded: no match found");
    }
    found
}
