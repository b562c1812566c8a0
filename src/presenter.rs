//! Text formatting for the results view.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::models::{GolfLocation, GroundingMetadata, SourceKind};

pub const FORMULA: &str = "50% Distance • 30% Rating • 20% Price";
pub const ATTRIBUTION: &str = "Results provided by Gemini with Google Maps Grounding";

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Google Maps search link for a location, built from its name and address.
pub fn deep_link(location: &GolfLocation) -> String {
    let query = [location.name.trim(), location.address.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{}{}",
        MAPS_SEARCH_URL,
        utf8_percent_encode(&query, NON_ALPHANUMERIC)
    )
}

/// Five-star bar for a rating, rounded to the nearest whole star.
pub fn stars(rating: f64) -> String {
    let filled = if rating.is_finite() {
        rating.round().clamp(0.0, 5.0) as usize
    } else {
        0
    };
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// One-line summary used in the ranked list: rating, price and distance.
pub fn summary_line(location: &GolfLocation) -> String {
    let mut parts = Vec::with_capacity(3);
    if location.rating > 0.0 {
        parts.push(format!("{} {:.1}", stars(location.rating), location.rating));
    }
    if !location.price_level.is_empty() {
        parts.push(location.price_level.clone());
    }
    if !location.distance.is_empty() {
        parts.push(location.distance.clone());
    }
    parts.join("  │  ")
}

/// The part of an address before the first comma.
pub fn short_address(address: &str) -> &str {
    address.split(',').next().unwrap_or("").trim()
}

/// Human-readable attribution lines, map citations first.
pub fn attribution_lines(meta: &GroundingMetadata) -> Vec<String> {
    let mut lines: Vec<String> = meta
        .ordered_sources()
        .filter(|s| s.uri.is_some() || s.title.is_some())
        .map(|s| {
            let label = match s.kind {
                SourceKind::Maps => "Maps",
                SourceKind::Web => "Web",
            };
            let title = s.title.as_deref().unwrap_or("Unknown Location");
            let mut line = match &s.uri {
                Some(uri) => format!("[{label}] {title} <{uri}>"),
                None => format!("[{label}] {title}"),
            };
            if let Some(snippet) = &s.review_snippet {
                line.push_str(&format!(" \"{snippet}\""));
            }
            line
        })
        .collect();

    if meta.search_entry_html.is_some() {
        lines.push("Google Search suggestions available for this query".to_string());
    }
    lines
}
