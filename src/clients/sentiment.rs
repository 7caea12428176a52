//! Client for the external LLM completion service.
//!
//! The transcript is embedded verbatim into a fixed instruction asking for a
//! specific nested JSON schema (no injection sanitization is performed; this
//! is a known limitation, not a security boundary). The raw completion text
//! comes back wrapped in whatever prose the model felt like adding, so it is
//! run through the JSON extractor before deserialization.
//!
//! Parse failures are soft: the caller gets `Ok(None)` semantics through the
//! pipeline's degraded outcome rather than a hard error. Only network and
//! non-2xx failures are hard `Analysis` errors.

use crate::config::SentimentConfig;
use crate::error::AppError;
use crate::extract::extract_json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Multi-dimensional scoring of a transcript's tone, structure and style.
///
/// The external model is asked for scores in [0,1] but is not contractually
/// bound to that range. Missing fields default to 0.0, unknown fields are
/// ignored, and a shape mismatch never panics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentReport {
    #[serde(default)]
    pub overall_sentiment: OverallSentiment,
    #[serde(default)]
    pub notable_phrases: Vec<NotablePhrase>,
    #[serde(default)]
    pub structure_analysis: StructureAnalysis,
    #[serde(default)]
    pub linguistic_style: LinguisticStyle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallSentiment {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub motivational: f64,
    #[serde(default)]
    pub inspirational: f64,
    #[serde(default)]
    pub pragmatic: f64,
    #[serde(default)]
    pub reflective: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotablePhrase {
    #[serde(default)]
    pub phrase: String,
    #[serde(default)]
    pub impact: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureAnalysis {
    #[serde(default)]
    pub introduction_clarity: f64,
    #[serde(default)]
    pub logical_flow: f64,
    #[serde(default)]
    pub conclusion_strength: f64,
    #[serde(default)]
    pub engagement_level: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinguisticStyle {
    #[serde(default)]
    pub formality: f64,
    #[serde(default)]
    pub conciseness: f64,
    #[serde(default)]
    pub use_of_imagery: f64,
    #[serde(default)]
    pub emphasis_on_action: f64,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMsg,
}

#[derive(Debug, Deserialize)]
struct CompletionMsg {
    #[serde(default)]
    content: String,
}

/// One-attempt client for the completion service.
pub struct SentimentClient {
    config: SentimentConfig,
    client: Client,
}

impl SentimentClient {
    pub fn new(config: SentimentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to build reqwest Client");
        Self { config, client }
    }

    /// Score a transcript.
    ///
    /// ## Returns:
    /// - `Ok(Some(report))` when the completion held a parseable report
    /// - `Ok(None)` when the completion held no usable JSON (soft failure;
    ///   the caller degrades to an empty report)
    /// - `Err(AppError::Validation)` on a blank transcript, raised before
    ///   any network call
    /// - `Err(AppError::Analysis)` on network failure or non-2xx upstream
    pub async fn analyze(&self, transcript: &str) -> Result<Option<SentimentReport>, AppError> {
        if transcript.trim().is_empty() {
            return Err(AppError::Validation("Transcript is required".to_string()));
        }

        if self.config.api_key.is_empty() {
            return Err(AppError::Config(
                "sentiment API key is not configured".to_string(),
            ));
        }

        let prompt = build_prompt(transcript);
        let body = CompletionRequest {
            model: &self.config.model,
            messages: vec![CompletionMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.config.model, transcript_chars = transcript.len(), "Requesting sentiment completion");

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Analysis(format!("request error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Analysis(format!(
                "upstream returned {}: {}",
                status, detail
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Analysis(format!("unexpected response shape: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(report_from_completion(&content))
    }
}

/// Deserialize the completion text into a report, treating every extraction
/// or shape problem as "no structured data available".
fn report_from_completion(content: &str) -> Option<SentimentReport> {
    let value = match extract_json(content) {
        Ok(Some(value)) => value,
        Ok(None) => {
            warn!("Completion contained no JSON object");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Completion JSON did not parse");
            return None;
        }
    };

    match serde_json::from_value::<SentimentReport>(value) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "Completion JSON did not match the report shape");
            None
        }
    }
}

/// The fixed analysis instruction with the transcript embedded verbatim.
fn build_prompt(transcript: &str) -> String {
    format!(
        r#"Analyze the following speech transcript and return valuable insights in JSON format. Focus on overall sentiment, notable phrases, structure, and linguistic style. Structure the JSON as follows:
{{
    "overall_sentiment": {{
        "positive": 0.0,
        "negative": 0.0,
        "neutral": 0.0,
        "motivational": 0.0,
        "inspirational": 0.0,
        "pragmatic": 0.0,
        "reflective": 0.0
    }},
    "notable_phrases": [
        {{
            "phrase": "string",
            "impact": 0.0
        }}
    ],
    "structure_analysis": {{
        "introduction_clarity": 0.0,
        "logical_flow": 0.0,
        "conclusion_strength": 0.0,
        "engagement_level": 0.0
    }},
    "linguistic_style": {{
        "formality": 0.0,
        "conciseness": 0.0,
        "use_of_imagery": 0.0,
        "emphasis_on_action": 0.0
    }}
}}
Transcript: "{}""#,
        transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_prompt_embeds_transcript_verbatim() {
        let prompt = build_prompt("hello world");
        assert!(prompt.contains("hello world"));
        assert!(prompt.contains("overall_sentiment"));
        assert!(prompt.contains("notable_phrases"));
        assert!(prompt.contains("structure_analysis"));
        assert!(prompt.contains("linguistic_style"));
    }

    #[test]
    fn test_request_body_carries_model_and_prompt() {
        let prompt = build_prompt("hello world");
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: vec![CompletionMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("hello world"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_report_parsed_from_prose_wrapped_completion() {
        let content = r#"Here is your analysis:
{
    "overall_sentiment": {"positive": 0.7, "negative": 0.1, "neutral": 0.2,
        "motivational": 0.9, "inspirational": 0.8, "pragmatic": 0.3, "reflective": 0.4},
    "notable_phrases": [{"phrase": "seize the day", "impact": 0.95}],
    "structure_analysis": {"introduction_clarity": 0.6, "logical_flow": 0.7,
        "conclusion_strength": 0.5, "engagement_level": 0.8},
    "linguistic_style": {"formality": 0.2, "conciseness": 0.6,
        "use_of_imagery": 0.9, "emphasis_on_action": 0.7}
}
Hope this helps!"#;

        let report = report_from_completion(content).unwrap();
        assert!((report.overall_sentiment.positive - 0.7).abs() < f64::EPSILON);
        assert_eq!(report.notable_phrases.len(), 1);
        assert_eq!(report.notable_phrases[0].phrase, "seize the day");
        assert!((report.linguistic_style.use_of_imagery - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_fields_default_to_zero_and_extras_are_ignored() {
        let content = r#"{"overall_sentiment": {"positive": 1.0, "sarcastic": 0.9},
                          "unexpected_section": {"x": 1}}"#;
        let report = report_from_completion(content).unwrap();
        assert!((report.overall_sentiment.positive - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.overall_sentiment.negative, 0.0);
        assert!(report.notable_phrases.is_empty());
        assert_eq!(report.structure_analysis.logical_flow, 0.0);
    }

    #[test]
    fn test_out_of_range_scores_are_tolerated() {
        let content = r#"{"overall_sentiment": {"positive": 1.7, "negative": -0.2}}"#;
        let report = report_from_completion(content).unwrap();
        assert!((report.overall_sentiment.positive - 1.7).abs() < f64::EPSILON);
        assert!((report.overall_sentiment.negative + 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unusable_completion_is_a_soft_none() {
        assert!(report_from_completion("I could not analyze that.").is_none());
        assert!(report_from_completion("{broken json").is_none());
        // A span that parses but is the wrong shape is also soft
        assert!(report_from_completion(r#"{"overall_sentiment": "very positive"}"#).is_none());
    }

    #[tokio::test]
    async fn test_blank_transcript_fails_fast_without_network() {
        let client = SentimentClient::new(AppConfig::default().sentiment);
        let err = client.analyze("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
