//! # Transcription Endpoint
//!
//! Accepts the uploaded audio file, runs pipeline stage one (persist +
//! transcribe) and returns the normalized transcript.

use crate::{clients::TranscriptResult, error::AppError, state::AppState, storage::UploadedAudio};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Serialize;

/// Response body: the normalized transcript plus simple text statistics so
/// the caller doesn't have to recount the text client-side.
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub confidence: f64,
    pub words: usize,
    pub chars: usize,
}

impl From<TranscriptResult> for TranscribeResponse {
    fn from(result: TranscriptResult) -> Self {
        let (words, chars) = text_stats(&result.transcript);
        Self {
            transcript: result.transcript,
            confidence: result.confidence,
            words,
            chars,
        }
    }
}

/// Word and character counts for a transcript. Words are whitespace-split
/// non-empty runs; characters count Unicode scalar values, not bytes.
fn text_stats(text: &str) -> (usize, usize) {
    (text.split_whitespace().count(), text.chars().count())
}

/// Transcribe an uploaded audio file.
///
/// ## Endpoint: `POST /transcribe`
///
/// ## Request:
/// Multipart form data with the audio in a field named "audioFile"
/// (expected MIME type audio/mpeg).
///
/// ## Response:
/// ```json
/// {
///   "transcript": "hello world",
///   "confidence": 0.92,
///   "words": 2,
///   "chars": 11
/// }
/// ```
///
/// 400 when the field is missing or empty, 500 with a structured error body
/// when storage or the upstream transcription call fails. The upload itself
/// is discarded from memory once persisted; only the stored handle travels
/// onward.
pub async fn transcribe(
    state: web::Data<AppState>,
    mut payload: actix_multipart::Multipart,
) -> Result<HttpResponse, AppError> {
    use actix_multipart::Field;

    let max_upload_bytes = state.get_config().storage.max_upload_bytes;

    let mut audio_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut mime_type: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::Validation("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::Validation("Missing field name".to_string()))?;

        if field_name == "audioFile" {
            filename = content_disposition.get_filename().map(|s| s.to_string());
            mime_type = field.content_type().map(|m| m.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::Validation(format!("Chunk error: {}", e)))?;
                if bytes.len() + chunk.len() > max_upload_bytes {
                    return Err(AppError::Validation(format!(
                        "File too large (max: {} bytes)",
                        max_upload_bytes
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            audio_data = Some(bytes);
        }
    }

    let data = match audio_data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(AppError::Validation("Audio file is required".to_string())),
    };

    let upload = UploadedAudio {
        data,
        mime_type: mime_type.unwrap_or_else(|| "audio/mpeg".to_string()),
        original_name: filename.unwrap_or_else(|| "unknown".to_string()),
    };

    state.increment_active_pipelines();
    let result = state.pipeline.transcribe_upload(upload).await;
    state.decrement_active_pipelines();

    Ok(HttpResponse::Ok().json(TranscribeResponse::from(result?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_stats_counts_words_and_chars() {
        assert_eq!(text_stats("hello world"), (2, 11));
        assert_eq!(text_stats(""), (0, 0));
        // Runs of whitespace don't create empty words
        assert_eq!(text_stats("  seize   the day  "), (3, 19));
    }

    #[test]
    fn test_text_stats_counts_scalar_values_not_bytes() {
        let (words, chars) = text_stats("voilà ✓");
        assert_eq!(words, 2);
        assert_eq!(chars, 7);
    }

    #[test]
    fn test_response_carries_stats_alongside_the_transcript() {
        let response = TranscribeResponse::from(TranscriptResult {
            transcript: "hello world".to_string(),
            confidence: 0.92,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["transcript"], "hello world");
        assert_eq!(json["confidence"], 0.92);
        assert_eq!(json["words"], 2);
        assert_eq!(json["chars"], 11);
    }
}
