//! Accommodation search parameters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Structured accommodation search request
///
/// `location` is always present; every other field is either absent or a
/// validated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pets: Option<u32>,
    #[serde(rename = "minPrice", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u32>,
    #[serde(rename = "maxPrice", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
}

/// Guest counts applied when a request leaves them out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestCounts {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub pets: u32,
}

impl Default for GuestCounts {
    fn default() -> Self {
        Self {
            adults: 2,
            children: 0,
            infants: 0,
            pets: 0,
        }
    }
}

impl SearchParams {
    /// Parameters with only a location
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            checkin: None,
            checkout: None,
            adults: None,
            children: None,
            infants: None,
            pets: None,
            min_price: None,
            max_price: None,
        }
    }

    /// Build from loosely-typed JSON, dropping fields that fail validation
    ///
    /// Returns `None` when there is no usable location.
    pub fn from_loose_json(value: &Value) -> Option<Self> {
        debug!(%value, "SearchParams::from_loose_json: called");
        let location = value.get("location")?.as_str()?.trim();
        if location.is_empty() {
            debug!("SearchParams::from_loose_json: empty location");
            return None;
        }

        let mut params = Self::at(location);
        params.checkin = date_field(value, "checkin");
        params.checkout = date_field(value, "checkout");
        params.adults = count_field(value, "adults");
        params.children = count_field(value, "children");
        params.infants = count_field(value, "infants");
        params.pets = count_field(value, "pets");
        params.min_price = count_field(value, "minPrice");
        params.max_price = count_field(value, "maxPrice");

        if let (Some(checkin), Some(checkout)) = (params.checkin, params.checkout)
            && checkout <= checkin
        {
            warn!(%checkin, %checkout, "Checkout is not after checkin, dropping both dates");
            params.checkin = None;
            params.checkout = None;
        }

        Some(params)
    }

    /// Fill absent guest counts from `defaults`
    pub fn with_guest_defaults(mut self, defaults: &GuestCounts) -> Self {
        self.adults.get_or_insert(defaults.adults);
        self.children.get_or_insert(defaults.children);
        self.infants.get_or_insert(defaults.infants);
        self.pets.get_or_insert(defaults.pets);
        self
    }

    /// Present fields as label/value pairs, in wire order
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("Location", self.location.clone())];
        let dates = [("Check-in", self.checkin), ("Check-out", self.checkout)];
        for (label, date) in dates {
            if let Some(date) = date {
                out.push((label, date.format(DATE_FORMAT).to_string()));
            }
        }
        let numbers = [
            ("Adults", self.adults),
            ("Children", self.children),
            ("Infants", self.infants),
            ("Pets", self.pets),
            ("Min price", self.min_price),
            ("Max price", self.max_price),
        ];
        for (label, number) in numbers {
            if let Some(number) = number {
                out.push((label, number.to_string()));
            }
        }
        out
    }
}

fn date_field(value: &Value, key: &str) -> Option<NaiveDate> {
    let raw = value.get(key)?.as_str()?;
    match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(%key, %raw, error = %e, "Dropping unparseable date");
            None
        }
    }
}

fn count_field(value: &Value, key: &str) -> Option<u32> {
    let raw = value.get(key)?;
    let number = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match number.and_then(|n| u32::try_from(n).ok()) {
        Some(n) => Some(n),
        None => {
            if !raw.is_null() {
                warn!(%key, %raw, "Dropping invalid count");
            }
            None
        }
    }
}

/// City name used for POI lookups: the text before the first comma
///
/// Falls back to `fallback` when that text is empty. Applying it to its own
/// output returns the same city.
pub fn derive_search_city(location: &str, fallback: &str) -> String {
    let city = location.split(',').next().unwrap_or_default().trim();
    if city.is_empty() {
        fallback.to_string()
    } else {
        city.to_string()
    }
}
