//! Loop-driven interactive session
//!
//! Each phase handler does its I/O and returns the next phase; `run` loops
//! until a handler returns [`Phase::Exit`]. Re-entering listing selection or
//! a new search is a transition, never a nested call.

use colored::Colorize;
use eyre::Result;
use tracing::{debug, info, warn};

use super::console::Console;
use super::render;
use super::state::{Phase, SessionState, Topic};
use crate::aggregate::{self, PlaceLookup};
use crate::assistant::Assistant;
use crate::config::Config;
use crate::domain::{Coordinate, EnrichedListing, ListingSummary, PoiCategory, PoiRecord, SearchParams};
use crate::services::{AccommodationClient, PoiClient};

const EXIT_WORDS: [&str; 4] = ["exit", "quit", "q", "выход"];

/// Settings the session needs from [`Config`]
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub default_location: String,
    pub default_city: String,
    pub max_listings: usize,
    pub max_amenities: usize,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_location: config.search.default_location.clone(),
            default_city: config.search.default_city.clone(),
            max_listings: config.display.max_listings,
            max_amenities: config.display.max_amenities,
        }
    }
}

/// One interactive session over both workers
pub struct Session<C: Console> {
    settings: SessionSettings,
    assistant: Assistant,
    accommodation: AccommodationClient,
    poi: PoiClient,
    console: C,
    state: SessionState,
    phase: Phase,
}

impl<C: Console> Session<C> {
    pub fn new(
        settings: SessionSettings,
        assistant: Assistant,
        accommodation: AccommodationClient,
        poi: PoiClient,
        console: C,
    ) -> Self {
        Self {
            settings,
            assistant,
            accommodation,
            poi,
            console,
            state: SessionState::default(),
            phase: Phase::Searching,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Drive the session until the user leaves
    ///
    /// `first_request` is handled as if typed at the first search prompt.
    pub async fn run(&mut self, first_request: Option<String>) -> Result<()> {
        debug!(?first_request, "Session::run: called");
        self.console.show(&render::banner());
        let mut pending = first_request;

        loop {
            let next = match self.phase {
                Phase::Searching => self.searching(pending.take()).await?,
                Phase::ListingsShown => self.choose_listing().await?,
                Phase::AnalyzingListing(index) => self.analyze(index).await,
                Phase::PostAnalysisMenu => self.post_analysis_menu().await?,
                Phase::PoiMenu => self.poi_menu().await?,
                Phase::Exit => break,
            };
            debug!(from = ?self.phase, to = ?next, "Session::run: transition");
            self.phase = next;
        }

        self.console.show("Goodbye!");
        info!("Session finished");
        Ok(())
    }

    /// Extract, search and print the listings without entering the menus
    pub async fn search_once(&mut self, request: &str) -> Result<usize> {
        debug!(%request, "Session::search_once: called");
        let listings = self.search(request).await;
        let count = listings.len();
        if count > 0 {
            self.console.show(&render::listing_choices(&listings, self.settings.max_listings));
        }
        Ok(count)
    }

    /// Stop both workers; safe to call more than once
    pub async fn shutdown(&mut self) {
        debug!("Session::shutdown: called");
        self.accommodation.shutdown().await;
        self.poi.shutdown().await;
    }

    async fn searching(&mut self, seed: Option<String>) -> Result<Phase> {
        let input = match seed {
            Some(request) => {
                self.console.show(&format!("{} {}", "Your request:".bright_green(), request));
                request
            }
            None => match self.console.read_line("Your request:").await? {
                Some(line) => line,
                None => return Ok(Phase::Exit),
            },
        };
        if input.is_empty() {
            return Ok(Phase::Searching);
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            return Ok(Phase::Exit);
        }

        let listings = self.search(&input).await;
        if listings.is_empty() {
            return Ok(Phase::Searching);
        }
        Ok(Phase::ListingsShown)
    }

    /// Run one search; on success the session state holds the results
    async fn search(&mut self, request: &str) -> Vec<ListingSummary> {
        let params = self.extract(request).await;
        self.console.show(&render::search_summary(&params));
        self.console.show(&render::notice("Searching..."));

        let _ = self.accommodation.take_fault();
        let listings = self.accommodation.search(&params).await;
        if listings.is_empty() {
            match self.accommodation.take_fault() {
                Some(fault) => self
                    .console
                    .show(&render::error(&format!("Accommodation service unavailable: {}", fault))),
                None => self
                    .console
                    .show(&render::error("Nothing found. Try different dates, price or place.")),
            }
            return Vec::new();
        }

        self.state.begin_search(request, params, listings.clone());
        listings
    }

    async fn extract(&mut self, request: &str) -> SearchParams {
        let tool = match self.accommodation.search_tool().await {
            Ok(tool) => Some(tool),
            Err(e) => {
                warn!(error = %e, "Search tool schema unavailable");
                None
            }
        };
        let today = chrono::Local::now().date_naive();

        match self.assistant.extract_params(request, tool.as_ref(), today).await {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "Extraction failed, using default location");
                let location = self.assistant.default_location().to_string();
                self.console.show(&render::notice(&format!(
                    "Could not understand the request, searching in {}",
                    location
                )));
                SearchParams::at(location)
            }
        }
    }

    async fn choose_listing(&mut self) -> Result<Phase> {
        let bound = self.state.listings.len().min(self.settings.max_listings);
        if bound == 0 {
            return Ok(Phase::Searching);
        }
        self.console
            .show(&render::listing_choices(&self.state.listings, self.settings.max_listings));

        loop {
            let Some(input) = self.console.read_line(&format!("Choose a listing (0-{}):", bound)).await? else {
                return Ok(Phase::Exit);
            };
            if input == "0" || input.eq_ignore_ascii_case("back") {
                self.state.reset();
                return Ok(Phase::Searching);
            }
            match input.parse::<usize>() {
                Ok(n) if (1..=bound).contains(&n) => return Ok(Phase::AnalyzingListing(n - 1)),
                _ => self
                    .console
                    .show(&render::error(&format!("Enter a number from 0 to {}", bound))),
            }
        }
    }

    async fn analyze(&mut self, index: usize) -> Phase {
        let Some(summary) = self.state.listings.get(index).cloned() else {
            return Phase::ListingsShown;
        };
        info!(id = %summary.id, "Analysing listing");
        self.console
            .show(&render::notice(&format!("Fetching details for {}...", summary.name)));

        let _ = self.accommodation.take_fault();
        let details = self.accommodation.get_details(&summary.id).await;
        if details.is_empty() {
            match self.accommodation.take_fault() {
                Some(fault) => self
                    .console
                    .show(&render::error(&format!("Accommodation service unavailable: {}", fault))),
                None => self.console.show(&render::notice("No further details available")),
            }
        }

        let location = self
            .state
            .params
            .as_ref()
            .map(|p| p.location.clone())
            .unwrap_or_else(|| self.settings.default_location.clone());
        let listing = EnrichedListing::new(summary, details, &location, &self.settings.default_city);
        self.console
            .show(&render::listing_card(&listing, self.settings.max_amenities));

        self.console.show(&render::notice("Writing the analysis..."));
        let report = match self.assistant.listing_report(&listing, &self.state.request).await {
            Ok(text) => {
                self.console.show(&render::report("LISTING ANALYSIS", &text));
                Some(text)
            }
            Err(e) => {
                warn!(error = %e, "Listing report failed");
                self.console
                    .show(&render::error(&format!("Could not write the analysis: {}", e)));
                None
            }
        };

        self.state.begin_analysis(listing, report);
        Phase::PostAnalysisMenu
    }

    async fn post_analysis_menu(&mut self) -> Result<Phase> {
        self.console.show(&render::post_analysis_menu());
        loop {
            let Some(input) = self.console.read_line("Your choice (0-3):").await? else {
                return Ok(Phase::Exit);
            };
            match input.as_str() {
                "1" => return Ok(Phase::PoiMenu),
                "2" => return Ok(Phase::ListingsShown),
                "3" => {
                    self.state.reset();
                    return Ok(Phase::Searching);
                }
                "0" => return Ok(Phase::Exit),
                _ => self.console.show(&render::error("Enter a number from 0 to 3")),
            }
        }
    }

    async fn poi_menu(&mut self) -> Result<Phase> {
        let Some(listing) = self.state.active.clone() else {
            return Ok(Phase::Searching);
        };
        self.console.show(&render::poi_menu(&listing));

        loop {
            let Some(input) = self.console.read_line("Your choice (0-6):").await? else {
                return Ok(Phase::Exit);
            };
            let topic = match input.as_str() {
                "1" => Topic::Restaurants,
                "2" => Topic::Attractions,
                "3" => Topic::City,
                "4" => Topic::AreaReviews,
                "5" => return Ok(Phase::ListingsShown),
                "6" => {
                    self.state.reset();
                    return Ok(Phase::Searching);
                }
                "0" => return Ok(Phase::Exit),
                _ => {
                    self.console.show(&render::error("Enter a number from 0 to 6"));
                    continue;
                }
            };
            self.show_topic(topic, &listing).await;
            return Ok(Phase::PoiMenu);
        }
    }

    async fn show_topic(&mut self, topic: Topic, listing: &EnrichedListing) {
        let title = topic_title(topic, listing);
        if let Some(text) = self.state.cached(topic) {
            debug!(?topic, "Session::show_topic: cached");
            let shown = render::report(&title, text);
            self.console.show(&shown);
            return;
        }

        let _ = self.poi.take_fault();
        if let Some(text) = self.produce(topic, listing).await {
            self.console.show(&render::report(&title, &text));
            self.state.remember(topic, text);
        }
    }

    /// Gather data for `topic` and have it written up; `None` after telling the user why
    async fn produce(&mut self, topic: Topic, listing: &EnrichedListing) -> Option<String> {
        debug!(?topic, "Session::produce: called");
        let place = format!("near \"{}\"", listing.summary.name);

        let result = match topic {
            Topic::Restaurants | Topic::Attractions => {
                let category = match topic {
                    Topic::Restaurants => PoiCategory::Restaurant,
                    _ => PoiCategory::Attraction,
                };
                let at = self.coordinate(listing)?;
                self.console
                    .show(&render::notice(&format!("Looking for {} nearby...", category.query_term())));
                let lookup = aggregate::nearby_places(&mut self.poi, at, category).await;
                let places = self.surviving(lookup, category.query_term())?;
                self.assistant.places_report(category.query_term(), &place, &places).await
            }
            Topic::City => {
                let city = listing.search_city.clone();
                self.console
                    .show(&render::notice(&format!("Looking for places in {}...", city)));
                let lookup = aggregate::city_places(&mut self.poi, &city).await;
                let places = self.surviving(lookup, "places")?;
                self.assistant.places_report("places", &format!("in {}", city), &places).await
            }
            Topic::AreaReviews => {
                let at = self.coordinate(listing)?;
                self.console.show(&render::notice("Collecting reviews around the listing..."));
                let area = aggregate::collect_area_reviews(&mut self.poi, at).await;
                if area.is_empty() {
                    self.not_found("No reviews found around this listing");
                    return None;
                }
                self.console.show(&render::notice(&format!(
                    "Collected {} review(s) from {} place(s)",
                    area.reviews.len(),
                    area.contributing_places
                )));
                self.assistant.area_reviews_report(&place, &area).await
            }
        };

        match result {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(?topic, error = %e, "Report failed");
                self.console
                    .show(&render::error(&format!("Could not write the report: {}", e)));
                None
            }
        }
    }

    fn coordinate(&mut self, listing: &EnrichedListing) -> Option<Coordinate> {
        let at = listing.coordinate();
        if at.is_none() {
            self.console.show(&render::error("This listing has no coordinates"));
        }
        at
    }

    fn surviving(&mut self, lookup: PlaceLookup, kind: &str) -> Option<Vec<PoiRecord>> {
        if lookup.found == 0 {
            self.not_found(&format!("No {} found", kind));
            return None;
        }
        if lookup.places.is_empty() {
            self.not_found(&format!("No {} with descriptions found", kind));
            return None;
        }
        self.console.show(&render::notice(&format!(
            "{} of {} {} have descriptions",
            lookup.places.len(),
            lookup.found,
            kind
        )));
        Some(lookup.places)
    }

    /// Report a transport fault if one caused the empty result, else `message`
    fn not_found(&mut self, message: &str) {
        match self.poi.take_fault() {
            Some(fault) => self
                .console
                .show(&render::error(&format!("POI service unavailable: {}", fault))),
            None => self.console.show(&render::error(message)),
        }
    }
}

fn topic_title(topic: Topic, listing: &EnrichedListing) -> String {
    match topic {
        Topic::Restaurants => "RESTAURANTS NEARBY".to_string(),
        Topic::Attractions => "ATTRACTIONS NEARBY".to_string(),
        Topic::City => format!("PLACES IN {}", listing.search_city.to_uppercase()),
        Topic::AreaReviews => "AREA REVIEWS".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use crate::rpc::TransportError;
    use crate::rpc::transport::mock::{CallLog, ScriptedWorker, json_result, text_result};
    use crate::services::ToolChannel;
    use crate::services::fixtures::{details_payload, places_payload, reviews_payload, search_payload};
    use crate::domain::GuestCounts;
    use crate::session::console::mock::ScriptedConsole;

    const KIEV_REPLY: &str = r#"{"location": "Kiev, Ukraine", "adults": 2}"#;

    fn settings() -> SessionSettings {
        SessionSettings {
            default_location: "Kiev, Ukraine".to_string(),
            default_city: "Kiev".to_string(),
            max_listings: 10,
            max_amenities: 10,
        }
    }

    /// Accommodation worker returning `count` listings and their details
    fn accommodation_worker(count: usize) -> ScriptedWorker {
        ScriptedWorker::tools("accommodation", move |tool, args| match tool {
            "airbnb_search" => Some(text_result(search_payload(count))),
            "airbnb_listing_details" => Some(text_result(details_payload(args["id"].as_str().unwrap_or_default()))),
            _ => None,
        })
    }

    /// POI worker where every place is described and has two reviews
    fn poi_worker() -> ScriptedWorker {
        ScriptedWorker::tools("poi", |tool, args| {
            let id = args["locationId"].as_str().unwrap_or_default();
            let payload = match tool {
                "search_locations" => places_payload("p", 3),
                "get_location_details" => json!({"description": format!("About {}", id), "features": ["Wifi"]}),
                "get_location_reviews" => reviews_payload(id, 2),
                _ => return None,
            };
            Some(json_result(payload))
        })
    }

    struct Harness {
        session: Session<ScriptedConsole>,
        llm: Arc<MockLlmClient>,
        accommodation_log: CallLog,
        poi_log: CallLog,
    }

    fn harness(inputs: &[&str], accommodation: ScriptedWorker, poi: ScriptedWorker, replies: &[&str]) -> Harness {
        let llm = Arc::new(MockLlmClient::replies(replies));
        let accommodation_log = accommodation.call_log();
        let poi_log = poi.call_log();
        let session = Session::new(
            settings(),
            Assistant::new(llm.clone(), PromptLoader::embedded_only(), "Kiev, Ukraine"),
            AccommodationClient::new(ToolChannel::new(Box::new(accommodation), false), GuestCounts::default()),
            PoiClient::new(ToolChannel::new(Box::new(poi), false), "en"),
            ScriptedConsole::new(inputs),
        );
        Harness {
            session,
            llm,
            accommodation_log,
            poi_log,
        }
    }

    fn tool_calls(log: &CallLog, tool: &str) -> Vec<Value> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|c| c.tool() == Some(tool))
            .map(|c| c.arguments().clone())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_search_stays_in_searching() {
        let mut h = harness(
            &["Kiev for the weekend", "quit"],
            accommodation_worker(0),
            poi_worker(),
            &[KIEV_REPLY],
        );
        h.session.run(None).await.unwrap();

        let transcript = h.session.console().transcript();
        assert!(transcript.contains("Nothing found"));
        assert_eq!(h.session.console().prompts, vec!["Your request:", "Your request:"]);
        assert_eq!(h.session.phase(), Phase::Exit);
        assert!(tool_calls(&h.accommodation_log, "airbnb_listing_details").is_empty());
    }

    #[tokio::test]
    async fn test_back_from_selection_skips_details() {
        let mut h = harness(&["Kiev", "0", "exit"], accommodation_worker(7), poi_worker(), &[KIEV_REPLY]);
        h.session.run(None).await.unwrap();

        let transcript = h.session.console().transcript();
        assert!(transcript.contains("Found 7 listing(s)"));
        assert!(transcript.contains(" 7. Listing 7"));
        assert_eq!(
            h.session.console().prompts,
            vec!["Your request:", "Choose a listing (0-7):", "Your request:"]
        );
        assert!(tool_calls(&h.accommodation_log, "airbnb_listing_details").is_empty());
        assert!(h.session.state().listings.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_selection_reprompts() {
        let mut h = harness(
            &["Kiev", "abc", "12", "2", "0"],
            accommodation_worker(12),
            poi_worker(),
            &[KIEV_REPLY, "Report"],
        );
        h.session.run(None).await.unwrap();

        let transcript = h.session.console().transcript();
        assert_eq!(transcript.matches("Enter a number from 0 to 10").count(), 2);
        let details = tool_calls(&h.accommodation_log, "airbnb_listing_details");
        assert_eq!(details, vec![json!({"id": "2"})]);
        assert_eq!(h.session.state().active.as_ref().unwrap().summary.id, "2");
    }

    #[tokio::test]
    async fn test_search_merges_guest_defaults_and_reports() {
        let mut h = harness(
            &["1", "0"],
            accommodation_worker(3),
            poi_worker(),
            &[r#"{"location": "Lviv, Ukraine", "adults": 3}"#, "A lovely flat."],
        );
        h.session.run(Some("Lviv for three".to_string())).await.unwrap();

        let search = tool_calls(&h.accommodation_log, "airbnb_search");
        assert_eq!(search.len(), 1);
        assert_eq!(search[0]["location"], "Lviv, Ukraine");
        assert_eq!(search[0]["adults"], 3);
        assert_eq!(search[0]["children"], 0);

        let transcript = h.session.console().transcript();
        assert!(transcript.contains("Your request: Lviv for three"));
        assert!(transcript.contains("LISTING ANALYSIS"));
        assert!(transcript.contains("A lovely flat."));
        assert!(transcript.contains("City: Lviv"));

        let state = h.session.state();
        assert_eq!(state.request, "Lviv for three");
        assert_eq!(state.report.as_deref(), Some("A lovely flat."));
        assert!(h.llm.requests()[1].messages[0].content.contains("Lviv for three"));
    }

    #[tokio::test]
    async fn test_extraction_failure_falls_back_to_default_location() {
        let mut h = harness(&["???", "exit"], accommodation_worker(0), poi_worker(), &["not json"]);
        h.session.run(None).await.unwrap();

        let search = tool_calls(&h.accommodation_log, "airbnb_search");
        assert_eq!(search[0]["location"], "Kiev, Ukraine");
        assert!(h.session.console().transcript().contains("searching in Kiev, Ukraine"));
    }

    #[tokio::test]
    async fn test_nearby_restaurants_use_text_search_and_cache() {
        let mut h = harness(
            &["Kiev", "1", "1", "1", "1", "0"],
            accommodation_worker(3),
            poi_worker(),
            &[KIEV_REPLY, "Report", "Eat at p1."],
        );
        h.session.run(None).await.unwrap();

        let searches = tool_calls(&h.poi_log, "search_locations");
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0]["searchQuery"], "restaurants near me");
        assert_eq!(searches[0]["latLong"], "50.45,30.52");
        assert!(
            h.poi_log
                .lock()
                .unwrap()
                .iter()
                .all(|c| c.tool().is_none_or(|t| t != "search_nearby_locations"))
        );

        // the second request is served from the cache
        assert_eq!(h.llm.call_count(), 3);
        let transcript = h.session.console().transcript();
        assert_eq!(transcript.matches("Eat at p1.").count(), 2);
        assert!(transcript.contains("3 of 3 restaurants have descriptions"));
    }

    #[tokio::test]
    async fn test_another_listing_clears_cached_reports() {
        let mut h = harness(
            &["Kiev", "1", "1", "2", "5", "2", "1", "2", "0"],
            accommodation_worker(3),
            poi_worker(),
            &[KIEV_REPLY, "Report 1", "Sights 1", "Report 2", "Sights 2"],
        );
        h.session.run(None).await.unwrap();

        assert_eq!(tool_calls(&h.poi_log, "search_locations").len(), 2);
        assert_eq!(h.llm.call_count(), 5);
        assert_eq!(h.session.state().active.as_ref().unwrap().summary.id, "2");
        assert_eq!(h.session.state().cached(Topic::Attractions), Some("Sights 2"));
    }

    #[tokio::test]
    async fn test_city_places_and_area_reviews() {
        let mut h = harness(
            &["Kiev", "1", "1", "3", "4", "0"],
            accommodation_worker(1),
            poi_worker(),
            &[KIEV_REPLY, "Report", "City overview", "Quiet area"],
        );
        h.session.run(None).await.unwrap();

        let searches = tool_calls(&h.poi_log, "search_locations");
        assert_eq!(searches[0]["searchQuery"], "Kiev attractions");
        // area reviews: one nearby search per category
        assert_eq!(searches.len(), 3);

        let transcript = h.session.console().transcript();
        assert!(transcript.contains("PLACES IN KIEV"));
        assert!(transcript.contains("Collected 12 review(s) from 6 place(s)"));
        assert!(transcript.contains("Quiet area"));
    }

    #[tokio::test]
    async fn test_new_search_from_poi_menu() {
        let mut h = harness(
            &["Kiev", "1", "1", "6", "exit"],
            accommodation_worker(2),
            poi_worker(),
            &[KIEV_REPLY, "Report"],
        );
        h.session.run(None).await.unwrap();

        assert!(h.session.state().active.is_none());
        assert!(h.session.state().listings.is_empty());
        assert!(tool_calls(&h.poi_log, "search_locations").is_empty());
    }

    #[tokio::test]
    async fn test_worker_exit_is_reported_and_session_continues() {
        let worker = ScriptedWorker::new("accommodation", |method, params| {
            if method != "tools/call" {
                return Ok(Some(json!({"jsonrpc": "2.0", "id": 1, "result": {}})));
            }
            match params["name"].as_str() {
                Some("airbnb_search") => Ok(Some(text_result(search_payload(2)))),
                _ => Err(TransportError::WorkerExited {
                    worker: "accommodation".to_string(),
                    status: "exit status: 1".to_string(),
                }),
            }
        });
        let stops = worker.stop_count();
        let mut h = harness(&["Kiev", "1", "7", "0"], worker, poi_worker(), &[KIEV_REPLY, "Report"]);
        h.session.run(None).await.unwrap();

        let transcript = h.session.console().transcript();
        assert!(transcript.contains("Accommodation service unavailable"));
        assert!(transcript.contains("Enter a number from 0 to 3"));
        assert_eq!(*stops.lock().unwrap(), 1);
        assert_eq!(h.session.phase(), Phase::Exit);
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let mut h = harness(&[], accommodation_worker(1), poi_worker(), &[]);
        h.session.run(None).await.unwrap();
        assert_eq!(h.session.phase(), Phase::Exit);
        assert!(h.session.console().transcript().ends_with("Goodbye!"));
    }

    #[tokio::test]
    async fn test_search_once() {
        let mut h = harness(&[], accommodation_worker(4), poi_worker(), &[KIEV_REPLY]);
        let count = h.session.search_once("Kiev").await.unwrap();
        assert_eq!(count, 4);
        assert!(h.session.console().transcript().contains(" 4. Listing 4"));
        assert!(h.session.console().prompts.is_empty());
    }
}
