//! Client for the Gemini `generateContent` endpoint.
//!
//! One request per search: a fixed ranking instruction, the Google Maps tool
//! and the user's coordinate as retrieval bias. The completion text is
//! returned exactly as received; reading locations out of it is the job of
//! [`normalize`](crate::normalize).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::models::{Completion, Coordinate, GroundingMetadata};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// The ranking instruction. JSON mode cannot be combined with the Maps tool,
/// so the output format is requested here instead of through a schema.
pub const RANKING_PROMPT: &str = "\
Find the 5 nearest top-rated golf driving ranges to my location. \
Rank them with this weighted formula: Distance 50% (highest priority), \
Rating 30% (medium priority), Price 20% (lowest priority). \
Return the ranges in ranked order, best first. \
Output ONLY a raw JSON array of objects, with no markdown code fences and no text before or after it. \
Each object must have exactly these fields: \
\"name\" (string), \"latitude\" (number), \"longitude\" (number), \"rating\" (number, 1-5), \
\"priceLevel\" (string such as \"$\", \"$$\" or \"$$$\"), \"address\" (string), \
\"description\" (string, a very brief summary of facilities such as Toptracer or heated bays), \
\"distance\" (string, e.g. \"1.2 miles\").";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub tools: Vec<Tool>,
    pub tool_config: ToolConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_maps: GoogleMaps,
}

#[derive(Debug, Serialize)]
pub struct GoogleMaps {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub retrieval_config: RetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub lat_lng: Coordinate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    // Kept untyped here and read field by field in `GroundingMetadata`.
    #[serde(default)]
    grounding_metadata: Option<Value>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentRequest {
    pub fn ranking(coord: Coordinate) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(RANKING_PROMPT.to_string()),
                }],
            }],
            tools: vec![Tool {
                google_maps: GoogleMaps {},
            }],
            tool_config: ToolConfig {
                retrieval_config: RetrievalConfig { lat_lng: coord },
            },
        }
    }
}

/// Asks Gemini for ranked driving ranges near a coordinate.
///
/// Built once at startup and shared with the search tasks.
pub struct RangeRanker {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RangeRanker {
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, config: &ApiConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Sends the ranking request for `coord`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Http`] on network failure.
    /// - [`ServiceError::Api`] on a non-2xx status, with the provider's
    ///   message when it sent one.
    /// - [`ServiceError::Blocked`] if the prompt was refused outright.
    /// - [`ServiceError::Decode`] if the envelope is not valid JSON.
    pub async fn rank(&self, coord: Coordinate) -> Result<Completion, ServiceError> {
        let request = GenerateContentRequest::ranking(coord);
        info!("Requesting ranked ranges from {}", self.model);

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            let message = api_error_message(&body);
            warn!("Gemini returned {}: {}", status, message);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&body)?;
        let Some(candidate) = envelope.candidates.into_iter().next() else {
            if let Some(reason) = envelope.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ServiceError::Blocked(reason));
            }
            warn!("Gemini returned no candidates");
            return Ok(Completion::default());
        };

        if let Some(reason) = &candidate.finish_reason {
            debug!("Candidate finish reason: {}", reason);
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let grounding = candidate
            .grounding_metadata
            .as_ref()
            .and_then(GroundingMetadata::from_value);

        debug!("Completion: {} bytes", text.len());
        Ok(Completion { text, grounding })
    }
}

/// Pulls `error.message` out of an error body, or returns the body itself.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
