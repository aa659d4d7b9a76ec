//! Extraction capability boundary.
//!
//! The pipeline treats structured extraction as an opaque, swappable
//! dependency: text in, a JSON document out. Test doubles implement
//! [`ExtractionCapability`] directly.

pub mod openai;

pub use openai::OpenAiCompatClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failures of the capability call itself. All variants are transient from
/// the pipeline's point of view and retryable by default.
#[derive(Error, Debug, Clone)]
pub enum CapabilityError {
    #[error("cannot reach extraction capability at {0}")]
    Connection(String),

    #[error("extraction capability request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("extraction capability returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed capability response: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

/// The external structured-extraction dependency.
#[async_trait]
pub trait ExtractionCapability: Send + Sync {
    /// Send one segment's text with its framing prompt. The returned string
    /// is expected to be a JSON document; schema validation happens upstream.
    async fn extract(
        &self,
        system_prompt: &str,
        segment_text: &str,
    ) -> Result<String, CapabilityError>;
}
