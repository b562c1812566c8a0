use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::ParseOutcome;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components finite and inside their geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One driving range as described by the ranking model.
///
/// Every field is optional on the wire. Missing (or `null`) strings become
/// `""` and a missing rating becomes `0.0`; coordinates stay `None` so the
/// map can skip the pin instead of drawing it at the equator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GolfLocation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price_level: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub distance: String,
}

impl GolfLocation {
    /// The position of this range, if the model supplied a usable one.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let coord = Coordinate::new(self.latitude?, self.longitude?);
        coord.is_valid().then_some(coord)
    }
}

// Model output is not schema-constrained, so numbers sometimes arrive quoted
// and strings sometimes arrive as numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or(0.0))
}

/// Where a grounding citation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Maps,
    Web,
}

/// One attribution entry taken from the provider's grounding chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingSource {
    pub kind: SourceKind,
    pub uri: Option<String>,
    pub title: Option<String>,
    pub review_snippet: Option<String>,
}

/// Attribution data passed through from the provider untouched in meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundingMetadata {
    pub sources: Vec<GroundingSource>,
    /// Pre-rendered HTML for the provider's search suggestions, if any.
    pub search_entry_html: Option<String>,
}

impl GroundingMetadata {
    /// Reads the `groundingMetadata` object of a candidate.
    ///
    /// Each chunk and field is picked out on its own; anything with an
    /// unexpected shape is skipped rather than failing the whole block.
    /// Returns `None` when nothing usable is left.
    pub fn from_value(value: &Value) -> Option<Self> {
        let mut sources = Vec::new();

        for chunk in value
            .get("groundingChunks")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(maps) = chunk.get("maps") {
                let review_snippet = maps
                    .pointer("/placeAnswerSources/reviewSnippets/0/content")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                sources.push(GroundingSource {
                    kind: SourceKind::Maps,
                    uri: str_field(maps, "uri"),
                    title: str_field(maps, "title"),
                    review_snippet,
                });
            }
            if let Some(web) = chunk.get("web") {
                sources.push(GroundingSource {
                    kind: SourceKind::Web,
                    uri: str_field(web, "uri"),
                    title: str_field(web, "title"),
                    review_snippet: None,
                });
            }
        }

        let search_entry_html = value
            .pointer("/searchEntryPoint/renderedContent")
            .and_then(Value::as_str)
            .filter(|html| !html.trim().is_empty())
            .map(str::to_string);

        if sources.is_empty() && search_entry_html.is_none() {
            return None;
        }
        Some(Self {
            sources,
            search_entry_html,
        })
    }

    /// Map citations first, then web citations, each in provider order.
    pub fn ordered_sources(&self) -> impl Iterator<Item = &GroundingSource> {
        let maps = self.sources.iter().filter(|s| s.kind == SourceKind::Maps);
        let web = self.sources.iter().filter(|s| s.kind == SourceKind::Web);
        maps.chain(web)
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Raw output of one ranking call: the completion text exactly as the
/// provider returned it, plus any attribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub grounding: Option<GroundingMetadata>,
}

/// The outcome of one successful search.
///
/// `locations` is in provider rank order and is never re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResultSet {
    pub locations: Vec<GolfLocation>,
    pub grounding: Option<GroundingMetadata>,
    pub outcome: ParseOutcome,
    /// The model's own answer, verbatim.
    pub text: String,
}

impl RankedResultSet {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
