//! # Configuration Management
//!
//! This module handles loading and managing application configuration from
//! multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between
//!   Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits
//! - **Result<T, E>**: Error handling that forces you to handle failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER__HOST, DEEPGRAM_API_KEY, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! API keys are never hard-coded: they come from the environment (or a .env
//! file in development) and are injected into the outbound clients at
//! construction time, so tests can substitute their own configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, storage, and one
/// group per outbound service) keeps each client constructor's input small
/// and makes test doubles trivial to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub transcription: TranscriptionConfig,
    pub sentiment: SentimentConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Uploaded-audio storage settings.
///
/// ## Fields:
/// - `upload_dir`: directory where uploaded audio is written (created on
///   demand, one fresh UUID filename per request)
/// - `max_upload_bytes`: hard cap on accepted file size
/// - `retention_minutes`: age after which stored uploads are swept by the
///   background task; 0 disables the sweep entirely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub retention_minutes: u64,
}

/// External speech-to-text service settings.
///
/// The service is Deepgram-shaped: raw audio bytes in the request body,
/// token auth, transcript alternatives grouped by channel in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub base_url: String,
    pub api_key: String,
    /// Content type sent with the audio body (the upload form accepts MP3)
    pub content_type: String,
    pub timeout_seconds: u64,
}

/// External LLM completion service settings (chat-completions shaped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration
/// file exists. They also document reasonable starting values. API keys
/// default to empty and are checked by the clients before any network call.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                upload_dir: "uploads".to_string(),
                max_upload_bytes: 50 * 1024 * 1024, // 50MB cap on uploads
                retention_minutes: 0,               // sweep disabled by default
            },
            transcription: TranscriptionConfig {
                base_url: "https://api.deepgram.com/v1/listen".to_string(),
                api_key: String::new(),
                content_type: "audio/mpeg".to_string(),
                timeout_seconds: 90, // audio length varies, allow a long call
            },
            sentiment: SentimentConfig {
                base_url: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
                timeout_seconds: 30,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for variables that don't follow the APP_
    ///    convention but are what deployment platforms and the upstream
    ///    services conventionally use
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_SENTIMENT__MODEL=gpt-4o`: Override completion model
    /// - `HOST=0.0.0.0` / `PORT=3000`: Deployment platform overrides
    /// - `DEEPGRAM_API_KEY=...`: Transcription service credential
    /// - `LLM_API_KEY=...`: Completion service credential
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double underscore separates nesting levels so field names
            // containing underscores (api_key, base_url) survive the mapping
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("DEEPGRAM_API_KEY") {
            settings = settings.set_override("transcription.api_key", key)?;
        }

        if let Ok(key) = env::var("LLM_API_KEY") {
            settings = settings.set_override("sentiment.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be used)
    /// - Upload size cap and upload directory are non-empty
    /// - Both outbound calls carry a bounded timeout (the external calls
    ///   must never be allowed to hang a request forever)
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong. Missing API keys
    /// are deliberately not rejected here: the server can start without
    /// them, and the clients fail fast on first use instead.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.storage.upload_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload directory must not be empty"));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.transcription.timeout_seconds == 0 || self.sentiment.timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "Outbound call timeouts must be greater than 0"
            ));
        }

        if self.transcription.base_url.trim().is_empty()
            || self.sentiment.base_url.trim().is_empty()
        {
            return Err(anyhow::anyhow!("Upstream base URLs must not be empty"));
        }

        Ok(())
    }
}
