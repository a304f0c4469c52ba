//! Report writing

use serde::Serialize;
use tracing::{debug, info};

use super::{Assistant, AssistantError};
use crate::aggregate::AreaReviews;
use crate::domain::{EnrichedListing, PoiRecord};
use crate::llm::CompletionRequest;

const LISTING_MAX_TOKENS: u32 = 1500;
const LISTING_TEMPERATURE: f32 = 0.3;
const PLACES_MAX_TOKENS: u32 = 600;
const AREA_MAX_TOKENS: u32 = 800;

const DESCRIPTION_CHARS: usize = 200;
const REVIEW_TEXT_CHARS: usize = 250;
const FEATURES_SHOWN: usize = 5;

/// Cut `text` to `max` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Serialize)]
struct ListingContext<'a> {
    listing: String,
    request: &'a str,
}

#[derive(Serialize)]
struct PlaceLine {
    number: usize,
    name: String,
    address: String,
    description: String,
    features: String,
    more_features: usize,
}

#[derive(Serialize)]
struct PlacesContext<'a> {
    kind: &'a str,
    context: &'a str,
    places: Vec<PlaceLine>,
}

#[derive(Serialize)]
struct SourceLine {
    name: String,
    count: usize,
}

#[derive(Serialize)]
struct ReviewLine {
    number: usize,
    source: String,
    title: String,
    rating: String,
    text: String,
}

#[derive(Serialize)]
struct AreaContext<'a> {
    context: &'a str,
    sources: Vec<SourceLine>,
    reviews: Vec<ReviewLine>,
}

impl Assistant {
    /// Detailed report on one listing, tailored to the user's request
    pub async fn listing_report(&self, listing: &EnrichedListing, request: &str) -> Result<String, AssistantError> {
        debug!(id = %listing.summary.id, "Assistant::listing_report: called");
        let context = ListingContext {
            listing: serde_json::to_string_pretty(listing).map_err(crate::llm::LlmError::from)?,
            request,
        };
        let request = CompletionRequest::single(
            self.prompts.render("listing-report", &context)?,
            self.prompts.render("listing-report-input", &context)?,
            LISTING_MAX_TOKENS,
        )
        .with_temperature(LISTING_TEMPERATURE);
        self.complete_text(request).await
    }

    /// Overview of enriched places
    ///
    /// `kind` names the places ("restaurants"), `context` says where they are
    /// ("near Sunny loft").
    pub async fn places_report(&self, kind: &str, context: &str, places: &[PoiRecord]) -> Result<String, AssistantError> {
        debug!(%kind, %context, count = places.len(), "Assistant::places_report: called");
        let lines = places
            .iter()
            .enumerate()
            .map(|(i, place)| PlaceLine {
                number: i + 1,
                name: place.name.clone(),
                address: place.address.clone(),
                description: place
                    .description
                    .as_deref()
                    .map(|d| truncate_chars(d, DESCRIPTION_CHARS))
                    .unwrap_or_default(),
                features: place.features.iter().take(FEATURES_SHOWN).cloned().collect::<Vec<_>>().join(", "),
                more_features: place.features.len().saturating_sub(FEATURES_SHOWN),
            })
            .collect();
        let ctx = PlacesContext {
            kind,
            context,
            places: lines,
        };
        let request = CompletionRequest::single(
            self.prompts.render("places-report", &ctx)?,
            self.prompts.render("places-report-input", &ctx)?,
            PLACES_MAX_TOKENS,
        );
        self.complete_text(request).await
    }

    /// Character of the neighbourhood judged from pooled reviews
    pub async fn area_reviews_report(&self, context: &str, area: &AreaReviews) -> Result<String, AssistantError> {
        debug!(%context, reviews = area.reviews.len(), "Assistant::area_reviews_report: called");
        let sources = area
            .per_place()
            .into_iter()
            .map(|(name, count)| SourceLine { name, count })
            .collect();
        let reviews = area
            .reviews
            .iter()
            .enumerate()
            .map(|(i, review)| ReviewLine {
                number: i + 1,
                source: review
                    .source
                    .as_ref()
                    .map(|s| s.place_name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                title: review.title.clone(),
                rating: review.rating.map(|r| r.to_string()).unwrap_or_else(|| "n/a".to_string()),
                text: truncate_chars(&review.text, REVIEW_TEXT_CHARS),
            })
            .collect();
        let ctx = AreaContext {
            context,
            sources,
            reviews,
        };
        let request = CompletionRequest::single(
            self.prompts.render("area-reviews", &ctx)?,
            self.prompts.render("area-reviews-input", &ctx)?,
            AREA_MAX_TOKENS,
        );
        self.complete_text(request).await
    }

    async fn complete_text(&self, request: CompletionRequest) -> Result<String, AssistantError> {
        let response = self.llm.complete(request).await?;
        let text = response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(AssistantError::EmptyReply)?;
        info!(chars = text.len(), "Report written");
        Ok(text)
    }
}
