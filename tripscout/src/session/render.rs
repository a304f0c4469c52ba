//! Terminal presentation of listings, menus and reports

use colored::Colorize;

use crate::assistant::truncate_chars;
use crate::domain::{EnrichedListing, ListingSummary, SearchParams, SectionValue};
use crate::domain::listing::{SECTION_HIGHLIGHTS, SECTION_LOCATION, SECTION_POLICIES};

const NAME_CHARS: usize = 50;
const RULE_WIDTH: usize = 80;

/// `"$87 x 5 nights: $433"` becomes `"$87/night ($433 for 5 nights)"`
pub fn format_price(price: &str) -> String {
    let Some((per_night, rest)) = price.split_once(" x ") else {
        return price.to_string();
    };
    let per_night = per_night.trim().trim_start_matches('$');

    match rest.split_once(':') {
        Some((nights, total)) if nights.contains("night") => {
            let Some(count) = nights.split_whitespace().next() else {
                return price.to_string();
            };
            let total = total.trim().trim_end_matches(',').trim().trim_start_matches('$').replace(',', "");
            format!("${}/night (${} for {} nights)", per_night, total, count)
        }
        Some(_) => price.to_string(),
        None => format!("${}/night", per_night),
    }
}

/// `"4.85 out of 5 average rating"` becomes `"4.85"`; anything else is "New"
pub fn format_rating(label: &str) -> String {
    if label.contains("out of 5")
        && let Some(value) = label.split_whitespace().next()
    {
        return value.to_string();
    }
    "New".to_string()
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn banner() -> String {
    [
        rule(),
        "TripScout: accommodation search with a travel assistant".bright_cyan().bold().to_string(),
        rule(),
        "Describe your trip in plain words, for example:".to_string(),
        "  Lviv from July 1 to July 5 for two adults, up to $80".dimmed().to_string(),
        format!("Type {} to leave.", "exit".yellow()),
    ]
    .join("\n")
}

pub fn search_summary(params: &SearchParams) -> String {
    let mut lines = vec!["Search parameters:".bright_cyan().to_string()];
    lines.extend(params.describe().into_iter().map(|(label, value)| format!("  {}: {}", label, value)));
    lines.join("\n")
}

/// Numbered selection list of the first `max` listings
pub fn listing_choices(listings: &[ListingSummary], max: usize) -> String {
    let shown = listings.len().min(max);
    let mut lines = vec![
        format!("Found {} listing(s)", listings.len()).bright_cyan().to_string(),
        rule(),
    ];
    for (i, listing) in listings.iter().take(shown).enumerate() {
        lines.push(format!("{:2}. {}", i + 1, truncate_chars(&listing.name, NAME_CHARS).bold()));
        let mut info = vec![format!("rating {}", format_rating(&listing.rating_label))];
        if !listing.price_details.is_empty() {
            info.push(format_price(&listing.price_details));
        }
        if !listing.badges.is_empty() {
            info.push(listing.badges.clone());
        }
        lines.push(format!("    {}", info.join(" | ")));
        if !listing.url.is_empty() {
            lines.push(format!("    {}", listing.url.dimmed()));
        }
    }
    lines.push(String::new());
    lines.push(" 0. Back to search".to_string());
    lines.join("\n")
}

/// Detail card of the analysed listing
pub fn listing_card(listing: &EnrichedListing, max_amenities: usize) -> String {
    let summary = &listing.summary;
    let mut lines = vec![rule(), summary.name.bright_cyan().bold().to_string(), rule()];
    lines.push(format!("Rating: {}", format_rating(&summary.rating_label)));
    if !summary.price_details.is_empty() {
        lines.push(format!("Price: {}", format_price(&summary.price_details)));
    }
    if let Some(at) = summary.coordinate {
        lines.push(format!("Coordinates: {}, {}", at.latitude, at.longitude));
    }
    lines.push(format!("City: {}", listing.search_city));

    let amenities = listing.details.amenities();
    if !amenities.is_empty() {
        lines.push(format!("Amenities ({}):", amenities.len()));
        lines.extend(amenities.iter().take(max_amenities).map(|a| format!("  - {}", a)));
        if amenities.len() > max_amenities {
            lines.push(format!("  ... and {} more", amenities.len() - max_amenities));
        }
    }

    for (title, name) in [
        ("Highlights", SECTION_HIGHLIGHTS),
        ("Location", SECTION_LOCATION),
        ("Policies", SECTION_POLICIES),
    ] {
        match listing.details.section(name) {
            Some(SectionValue::Text(text)) if !text.trim().is_empty() => {
                lines.push(format!("{}: {}", title, text.trim()));
            }
            Some(SectionValue::List(items)) if !items.is_empty() => {
                lines.push(format!("{}:", title));
                lines.extend(items.iter().map(|item| format!("  - {}", item)));
            }
            _ => {}
        }
    }

    let url = listing.details.url.as_deref().unwrap_or(&summary.url);
    if !url.is_empty() {
        lines.push(format!("Link: {}", url.dimmed()));
    }
    lines.join("\n")
}

/// A titled block of generated text
pub fn report(title: &str, text: &str) -> String {
    [rule(), title.bright_cyan().bold().to_string(), rule(), text.to_string(), rule()].join("\n")
}

pub fn post_analysis_menu() -> String {
    [
        "What next?".bright_cyan().to_string(),
        "1. Nearby places and area information".to_string(),
        "2. Analyse another listing".to_string(),
        "3. New search".to_string(),
        "0. Exit".to_string(),
    ]
    .join("\n")
}

pub fn poi_menu(listing: &EnrichedListing) -> String {
    let mut lines = vec![
        "AREA INFORMATION".bright_cyan().bold().to_string(),
        rule(),
        format!("Listing: {}", listing.summary.name),
    ];
    if let Some(at) = listing.coordinate() {
        lines.push(format!("Coordinates: {}, {}", at.latitude, at.longitude));
    }
    lines.extend([
        String::new(),
        "1. Restaurants nearby".to_string(),
        "2. Attractions nearby".to_string(),
        format!("3. Places in {}", listing.search_city),
        "4. Area reviews".to_string(),
        "5. Choose another listing".to_string(),
        "6. New search".to_string(),
        "0. Exit".to_string(),
    ]);
    lines.join("\n")
}

pub fn error(text: &str) -> String {
    format!("{} {}", "!".red().bold(), text)
}

pub fn notice(text: &str) -> String {
    text.dimmed().to_string()
}
