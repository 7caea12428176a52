//! Client for the external speech-to-text service.
//!
//! The service is Deepgram-shaped: the request is the stored audio bytes
//! with a token `Authorization` header and a content type matching the audio
//! format; the response nests transcript alternatives by channel, and the
//! first channel's first alternative is the result. Everything unexpected
//! (network failure, non-2xx, missing channels) surfaces as
//! `AppError::Transcription` carrying the upstream detail.

use crate::config::TranscriptionConfig;
use crate::error::AppError;
use crate::storage::StoredAudio;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Normalized transcription result handed to the caller.
///
/// Confidence is reported by the upstream model in [0,1] and is only
/// meaningful when the transcript is non-empty. Alternative transcriptions
/// beyond the first are ignored downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub transcript: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f64,
}

/// One-attempt client for the transcription service.
pub struct TranscriptionClient {
    config: TranscriptionConfig,
    client: Client,
}

impl TranscriptionClient {
    pub fn new(config: TranscriptionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to build reqwest Client");
        Self { config, client }
    }

    /// Transcribe a stored audio file.
    ///
    /// Reads the stored content back from disk (voice memos are small
    /// enough to buffer fully), posts it as the raw request body, and
    /// normalizes the response. Single attempt, bounded by the configured
    /// timeout.
    pub async fn transcribe(&self, audio: &StoredAudio) -> Result<TranscriptResult, AppError> {
        if self.config.api_key.is_empty() {
            return Err(AppError::Config(
                "transcription API key is not configured".to_string(),
            ));
        }

        let bytes = tokio::fs::read(&audio.path).await.map_err(|e| {
            AppError::Storage(format!(
                "failed to read stored audio {}: {}",
                audio.path.display(),
                e
            ))
        })?;

        debug!(
            filename = %audio.filename,
            bytes = bytes.len(),
            "Sending audio to transcription service"
        );

        let response = self
            .client
            .post(&self.config.base_url)
            .header(
                "Authorization",
                format!("Token {}", self.config.api_key),
            )
            .header("Content-Type", self.config.content_type.clone())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Transcription(format!("request error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Transcription(format!(
                "upstream returned {}: {}",
                status, detail
            )));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transcription(format!("unexpected response shape: {}", e)))?;

        Self::first_alternative(parsed)
    }

    /// Pull the first channel's first alternative out of the upstream shape.
    fn first_alternative(response: ListenResponse) -> Result<TranscriptResult, AppError> {
        let alternative = response
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|channel| channel.alternatives.into_iter().next())
            .ok_or_else(|| {
                AppError::Transcription(
                    "unexpected response shape: no transcript alternatives".to_string(),
                )
            })?;

        Ok(TranscriptResult {
            transcript: alternative.transcript,
            confidence: alternative.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn parse(raw: &str) -> Result<TranscriptResult, AppError> {
        let response: ListenResponse = serde_json::from_str(raw).unwrap();
        TranscriptionClient::first_alternative(response)
    }

    #[test]
    fn test_parses_first_channel_first_alternative() {
        let raw = r#"{
            "metadata": {"request_id": "abc"},
            "results": {
                "channels": [
                    {
                        "alternatives": [
                            {"transcript": "hello world", "confidence": 0.92, "words": []},
                            {"transcript": "hello word", "confidence": 0.41}
                        ]
                    }
                ]
            }
        }"#;

        let result = parse(raw).unwrap();
        assert_eq!(result.transcript, "hello world");
        assert!((result.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_channels_is_an_unexpected_shape() {
        let err = parse(r#"{"results": {"channels": []}}"#).unwrap_err();
        assert!(matches!(err, AppError::Transcription(_)));
        assert!(err.to_string().contains("Transcription failed"));
    }

    #[test]
    fn test_missing_fields_default_rather_than_fail() {
        // An alternative with neither transcript nor confidence still parses;
        // confidence is only meaningful when the transcript is non-empty.
        let result = parse(r#"{"results": {"channels": [{"alternatives": [{}]}]}}"#).unwrap();
        assert_eq!(result.transcript, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_empty_api_key_fails_before_any_network_call() {
        let client = TranscriptionClient::new(AppConfig::default().transcription);
        let audio = StoredAudio {
            path: "does-not-exist.mp3".into(),
            filename: "does-not-exist.mp3".to_string(),
        };
        // The missing key is reported before the (also missing) file is read.
        let err = client.transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
