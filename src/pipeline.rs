//! # Orchestration Pipeline
//!
//! Sequences the stages of one analysis session:
//!
//! ```text
//! Idle → Persisting → Transcribing → TranscriptReady → Analyzing → Complete
//! ```
//!
//! with an error state reachable from any non-terminal stage. The two halves
//! are separate round trips from the caller's perspective: stage one
//! (persist + transcribe) is triggered by the upload, stage two (analyze) is
//! triggered later with the transcript as its sole required input.
//!
//! No stage is retried automatically anywhere. Each stage failure maps to
//! its own `AppError` variant so the terminal error exposes which stage
//! broke and what the upstream said.

use crate::clients::{SentimentClient, SentimentReport, TranscriptResult, TranscriptionClient};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::storage::{AudioStore, UploadedAudio};
use std::fmt;
use tracing::{info, warn};

/// The stages an analysis session moves through. Used for structured
/// logging; failures carry the stage through the error variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Persisting,
    Transcribing,
    TranscriptReady,
    Analyzing,
    Complete,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::TranscriptReady => "transcript_ready",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of the analysis stage.
///
/// A hard upstream failure is an `Err` from the pipeline; a soft failure
/// (the completion held no usable JSON) degrades to an all-zero report with
/// `degraded` set, so the caller always receives a well-formed body.
#[derive(Debug, Clone)]
pub struct SentimentOutcome {
    pub report: SentimentReport,
    pub degraded: bool,
    pub detail: Option<String>,
}

/// Owns the store and both outbound clients; all stage sequencing lives here.
pub struct AnalysisPipeline {
    store: AudioStore,
    transcription: TranscriptionClient,
    sentiment: SentimentClient,
}

impl AnalysisPipeline {
    /// Build the pipeline from injected configuration. Clients never read
    /// the environment at call time, so tests can point them anywhere.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: AudioStore::new(config.storage.upload_dir.clone()),
            transcription: TranscriptionClient::new(config.transcription.clone()),
            sentiment: SentimentClient::new(config.sentiment.clone()),
        }
    }

    /// Stage one: persist the upload, then transcribe it.
    ///
    /// `Idle → Persisting → Transcribing → TranscriptReady`, failing to the
    /// stage's error variant (`Storage` or `Transcription`) on the way.
    /// Validation of the upload itself happens in the handler before the
    /// pipeline is entered.
    pub async fn transcribe_upload(&self, upload: UploadedAudio) -> AppResult<TranscriptResult> {
        info!(stage = %PipelineStage::Persisting, original_name = %upload.original_name, "Persisting upload");
        let stored = self.store.save(&upload).await?;

        info!(stage = %PipelineStage::Transcribing, filename = %stored.filename, "Transcribing stored audio");
        let result = self.transcription.transcribe(&stored).await?;

        info!(
            stage = %PipelineStage::TranscriptReady,
            transcript_chars = result.transcript.len(),
            confidence = result.confidence,
            "Transcript ready"
        );
        Ok(result)
    }

    /// Stage two: score the transcript.
    ///
    /// `TranscriptReady → Analyzing → Complete`. A soft extraction failure
    /// degrades to an empty report (never an absent body); network and
    /// non-2xx failures are hard `Analysis` errors.
    pub async fn analyze_transcript(&self, transcript: &str) -> AppResult<SentimentOutcome> {
        info!(stage = %PipelineStage::Analyzing, transcript_chars = transcript.len(), "Analyzing transcript");

        let outcome = match self.sentiment.analyze(transcript).await? {
            Some(report) => SentimentOutcome {
                report,
                degraded: false,
                detail: None,
            },
            None => {
                warn!("Sentiment completion yielded no parseable report, degrading to empty report");
                SentimentOutcome {
                    report: SentimentReport::default(),
                    degraded: true,
                    detail: Some(
                        "The analysis service returned no parseable report".to_string(),
                    ),
                }
            }
        };

        info!(stage = %PipelineStage::Complete, degraded = outcome.degraded, "Analysis complete");
        Ok(outcome)
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_stage_names_for_logging() {
        assert_eq!(PipelineStage::Persisting.to_string(), "persisting");
        assert_eq!(PipelineStage::TranscriptReady.to_string(), "transcript_ready");
        assert_eq!(PipelineStage::Complete.to_string(), "complete");
    }

    #[tokio::test]
    async fn test_blank_transcript_is_rejected_before_analysis() {
        let pipeline = AnalysisPipeline::new(&AppConfig::default());
        let err = pipeline.analyze_transcript("").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
