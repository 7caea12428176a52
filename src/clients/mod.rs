//! # Outbound Service Clients
//!
//! Thin clients for the two external services the pipeline delegates to:
//! - **transcription**: speech-to-text over raw audio bytes
//! - **sentiment**: LLM chat completion scored through the JSON extractor
//!
//! Both clients are constructed once from injected configuration (no
//! environment reads at call time), carry a bounded request timeout, and
//! make exactly one attempt per call. Retrying is the caller's decision.

pub mod sentiment;
pub mod transcription;

pub use sentiment::{SentimentClient, SentimentReport};
pub use transcription::{TranscriptResult, TranscriptionClient};
