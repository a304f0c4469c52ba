//! Wire payloads shaped like the real workers' output, for tests

use serde_json::{Value, json};

pub fn listing_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "demandStayListing": {
            "description": {"name": {"localizedStringWithTranslationPreference": name}},
            "location": {"coordinate": {"latitude": 50.45, "longitude": 30.52}}
        },
        "structuredDisplayPrice": {"explanationData": {"priceDetails": "$87 x 5 nights: $433"}},
        "avgRatingA11yLabel": "4.85 out of 5 average rating",
        "badges": "Guest favorite",
        "url": format!("https://www.airbnb.com/rooms/{}", id)
    })
}

/// `count` listings with ids `1..=count`
pub fn search_payload(count: usize) -> Value {
    let results: Vec<Value> = (1..=count)
        .map(|i| listing_json(&i.to_string(), &format!("Listing {}", i)))
        .collect();
    json!({ "searchResults": results })
}

pub fn details_payload(id: &str) -> Value {
    json!({
        "listingUrl": format!("https://www.airbnb.com/rooms/{}", id),
        "details": [
            {"id": "AMENITIES_DEFAULT", "seeAllAmenitiesGroups": "Wifi, Kitchen, Washer"},
            {"id": "HIGHLIGHTS_DEFAULT", "highlights": "Self check-in"}
        ]
    })
}

pub fn place_json(id: &str, name: &str) -> Value {
    json!({
        "location_id": id,
        "name": name,
        "address_obj": {"address_string": format!("{} street, Kyiv", name)}
    })
}

/// `count` places with ids `"<prefix>1"..`
pub fn places_payload(prefix: &str, count: usize) -> Value {
    let data: Vec<Value> = (1..=count)
        .map(|i| place_json(&format!("{}{}", prefix, i), &format!("{} place {}", prefix, i)))
        .collect();
    json!({ "data": data })
}

pub fn reviews_payload(place_id: &str, count: usize) -> Value {
    let data: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "title": format!("Review {} of {}", i, place_id),
                "text": "Lovely spot",
                "rating": 5
            })
        })
        .collect();
    json!({ "data": data })
}
