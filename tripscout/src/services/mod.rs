//! Typed clients for the accommodation and points-of-interest workers
//!
//! Every operation degrades to an empty value on failure; callers check
//! `take_fault()` to tell a broken worker from an empty result.

pub mod accommodation;
pub mod channel;
mod error;
#[cfg(test)]
pub mod fixtures;
pub mod poi;

pub use accommodation::AccommodationClient;
pub use channel::ToolChannel;
pub use error::ServiceError;
pub use poi::PoiClient;

use eyre::Result;

use crate::config::Config;
use crate::rpc::ProcessWorker;

pub const ACCOMMODATION_WORKER: &str = "accommodation";
pub const POI_WORKER: &str = "poi";

/// Accommodation client backed by a subprocess; nothing is spawned yet
pub fn accommodation_client(config: &Config) -> Result<AccommodationClient> {
    let spec = config.accommodation.spec(ACCOMMODATION_WORKER)?;
    let channel = ToolChannel::new(Box::new(ProcessWorker::new(spec)), config.accommodation.initialize);
    Ok(AccommodationClient::new(channel, config.search.guests()))
}

/// POI client backed by a subprocess; nothing is spawned yet
pub fn poi_client(config: &Config) -> Result<PoiClient> {
    let spec = config.poi.spec(POI_WORKER)?;
    let channel = ToolChannel::new(Box::new(ProcessWorker::new(spec)), config.poi.initialize);
    Ok(PoiClient::new(channel, config.poi.language.clone()))
}
