//! # Configuration Endpoint
//!
//! Read-only view of the effective configuration with secrets masked. The
//! pipeline's clients are built once at startup from injected configuration,
//! so there is deliberately no runtime update endpoint.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> HttpResponse {
    let config = state.get_config();

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "storage": {
                "upload_dir": config.storage.upload_dir,
                "max_upload_bytes": config.storage.max_upload_bytes,
                "retention_minutes": config.storage.retention_minutes
            },
            "transcription": {
                "base_url": config.transcription.base_url,
                "api_key": mask(&config.transcription.api_key),
                "content_type": config.transcription.content_type,
                "timeout_seconds": config.transcription.timeout_seconds
            },
            "sentiment": {
                "base_url": config.sentiment.base_url,
                "api_key": mask(&config.sentiment.api_key),
                "model": config.sentiment.model,
                "timeout_seconds": config.sentiment.timeout_seconds
            }
        }
    }))
}

/// Secrets never leave the process; only their presence is reported.
fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "********"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_never_reveals_the_secret() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("sk-very-secret"), "********");
    }
}
