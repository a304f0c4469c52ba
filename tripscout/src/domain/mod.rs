//! Typed entities parsed at the service boundary

pub mod listing;
pub mod poi;
pub mod search;

pub use listing::{Coordinate, EnrichedListing, ListingDetail, ListingSummary, SectionValue};
pub use poi::{PoiCategory, PoiDetails, PoiRecord, ReviewRecord, ReviewSource};
pub use search::{GuestCounts, SearchParams, derive_search_city};
