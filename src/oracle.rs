//! Recognition and narrative-summary collaborators.
//!
//! Both are modeled as capability traits so any backing service can be
//! substituted without touching the aggregator or assembler. The bundled
//! backend talks to the Gemini REST API with a structured-text response
//! format; a disabled backend stands in when no credentials are
//! configured.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use crate::model::LandmarkEntity;

/// Errors from a collaborator call. Always recoverable per-call.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unusable collaborator response: {0}")]
    Malformed(String),
}

/// One candidate landmark as reported by the recognition collaborator.
///
/// Fields the collaborator omitted stay `None`; the observer backfills
/// them with an explicit unknown marker.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub category: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub utility: Option<String>,
    pub relevance: Option<String>,
    pub hazard: Option<String>,
}

/// Capability: identify candidate landmarks in one frame.
#[async_trait]
pub trait RecognitionOracle: Send + Sync {
    async fn classify(&self, jpeg: &[u8]) -> Result<Vec<Detection>, OracleError>;
}

/// Capability: narrate the mission's findings.
#[async_trait]
pub trait SummaryOracle: Send + Sync {
    async fn summarize(&self, entities: &[LandmarkEntity]) -> Result<String, OracleError>;
}

// ── Gemini backend ──

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const CLASSIFY_PROMPT: &str = "\
You are the landmark-recognition system for a Mars rover mission. An image \
taken by the rover's forward camera is provided. Identify every object that \
does not look like natural Martian terrain: man-made or artificial objects, \
tools, equipment, containers, infrastructure, objects with distinctive \
colors or regular geometric shapes. Ignore camera artifacts entirely: lens \
distortion, compression blocking, interference lines, lens flares, and \
smudges on the optics are not objects.

For each object found, emit exactly this block, repeated per object, with \
no markdown:
LANDMARK_START
CATEGORY: [short object name or category]
DESCRIPTION: [one or two sentences on material, shape, color, condition]
ORIGIN: [probable origin: natural, prior mission, current mission, anomalous]
UTILITY: [potential utility to this or future missions]
RELEVANCE: [how significant the finding is]
HAZARD: [dangers or special considerations]
LANDMARK_END

If the image contains no such objects, reply with exactly: NO_LANDMARKS";

/// Gemini-backed implementation of both oracle capabilities.
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiOracle {
    /// Build a client with the given per-call timeout.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    /// One `generateContent` call; returns the concatenated text parts.
    async fn generate(&self, parts: Vec<serde_json::Value>) -> Result<String, OracleError> {
        let url = format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model);
        let body = json!({ "contents": [{ "parts": parts }] });

        let response: GenerateResponse = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(OracleError::Malformed("response held no text".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl RecognitionOracle for GeminiOracle {
    async fn classify(&self, jpeg: &[u8]) -> Result<Vec<Detection>, OracleError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
        let parts = vec![
            json!({ "inline_data": { "mime_type": "image/jpeg", "data": encoded } }),
            json!({ "text": CLASSIFY_PROMPT }),
        ];
        let text = self.generate(parts).await?;
        Ok(parse_detections(&text))
    }
}

#[async_trait]
impl SummaryOracle for GeminiOracle {
    async fn summarize(&self, entities: &[LandmarkEntity]) -> Result<String, OracleError> {
        let mut listing = String::new();
        for entity in entities {
            listing.push_str(&format!(
                "{}: {} - {}\n",
                entity.id, entity.representative.category, entity.representative.description
            ));
        }
        let prompt = format!(
            "You are writing the executive summary of a Mars rover mission \
             report. The following distinct landmarks were observed along the \
             route:\n\n{listing}\nWrite a short plain-text summary (3-4 \
             sentences) of the mission's findings. No markdown."
        );
        let text = self.generate(vec![json!({ "text": prompt })]).await?;
        Ok(text.trim().to_string())
    }
}

/// JSON shape of a `generateContent` response.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    text: Option<String>,
}

// ── Response parsing ──

/// Parse the block-delimited classification format.
///
/// Tolerates markdown code fences around the whole response and unknown
/// lines inside blocks. Anything outside `LANDMARK_START`/`LANDMARK_END`
/// is ignored, so a "NO_LANDMARKS" reply parses to an empty list.
#[must_use]
pub fn parse_detections(text: &str) -> Vec<Detection> {
    let clean = strip_fences(text);
    let mut detections = Vec::new();

    for block in clean.split("LANDMARK_START").skip(1) {
        let Some(body) = block.split("LANDMARK_END").next() else {
            continue;
        };

        let mut detection = Detection::default();
        for line in body.lines() {
            let line = line.trim();
            if let Some(value) = field(line, "CATEGORY:") {
                detection.category = Some(value);
            } else if let Some(value) = field(line, "DESCRIPTION:") {
                detection.description = Some(value);
            } else if let Some(value) = field(line, "ORIGIN:") {
                detection.origin = Some(value);
            } else if let Some(value) = field(line, "UTILITY:") {
                detection.utility = Some(value);
            } else if let Some(value) = field(line, "RELEVANCE:") {
                detection.relevance = Some(value);
            } else if let Some(value) = field(line, "HAZARD:") {
                detection.hazard = Some(value);
            }
        }
        detections.push(detection);
    }

    detections
}

fn field(line: &str, prefix: &str) -> Option<String> {
    let value = line.strip_prefix(prefix)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Drop a surrounding markdown code fence, if present.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // The opening fence may carry a language tag on its own line.
    match inner.split_once('\n') {
        Some((tag, rest)) if tag.chars().all(|c| c.is_ascii_alphanumeric()) => rest.trim(),
        _ => inner.trim(),
    }
}

/// Stand-in oracle for runs without recognition credentials.
///
/// Classifies every frame as empty, so the pipeline still produces a
/// (landmark-free) report.
pub struct DisabledOracle;

#[async_trait]
impl RecognitionOracle for DisabledOracle {
    async fn classify(&self, _jpeg: &[u8]) -> Result<Vec<Detection>, OracleError> {
        Ok(Vec::new())
    }
}
