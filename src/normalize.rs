//! Turns a free-form model completion into a typed list of driving ranges.
//!
//! The ranking request cannot use the provider's JSON mode (it is not
//! available together with Maps grounding), so the completion is only asked
//! to be a bare JSON array. In practice it may arrive wrapped in markdown
//! fences or surrounded by prose. [`parse_locations`] strips that wrapping,
//! parses what is left and degrades to an empty list instead of failing.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::models::GolfLocation;

const FENCE: &str = "```";

/// How the completion text was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The text held a well-formed array (possibly empty).
    Parsed,
    /// The text could not be read; the payload is the reason.
    Degraded(String),
}

impl ParseOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded(_))
    }
}

/// Result of normalizing one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub locations: Vec<GolfLocation>,
    pub outcome: ParseOutcome,
}

/// Extracts the ranked locations from `raw`, or an empty list.
pub fn normalize(raw: &str) -> Vec<GolfLocation> {
    parse_locations(raw).locations
}

/// Same as [`normalize`], but also reports whether the text was readable.
///
/// Never fails: a malformed completion yields no locations and a
/// [`ParseOutcome::Degraded`] carrying the parse error.
pub fn parse_locations(raw: &str) -> Normalized {
    let unfenced = strip_fences(raw);
    let candidate = slice_array(&unfenced);

    match serde_json::from_str::<Vec<GolfLocation>>(candidate) {
        Ok(locations) => {
            debug!("Normalized {} location(s) from completion", locations.len());
            Normalized {
                locations,
                outcome: ParseOutcome::Parsed,
            }
        }
        Err(e) => {
            warn!(
                "Could not parse ranking completion ({} bytes): {}",
                raw.len(),
                e
            );
            Normalized {
                locations: Vec::new(),
                outcome: ParseOutcome::Degraded(e.to_string()),
            }
        }
    }
}

/// Removes every code fence, together with a language tag written directly
/// after it (```` ```json ````).
fn strip_fences(raw: &str) -> Cow<'_, str> {
    if !raw.contains(FENCE) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Narrows `text` to the span from the first `[` to the last `]`, dropping
/// any preamble or trailing remarks. Left as is when no such span exists.
fn slice_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}
