//! Pipeline-wide error taxonomy.
//!
//! Variants map to the error kinds the pipeline distinguishes:
//! validation, extraction, capability, schema, cancellation, and
//! retry exhaustion. User-facing mapping lives in `report`.

use thiserror::Error;

use crate::capability::CapabilityError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("no extractable text content in document")]
    EmptyContent,

    #[error("failed to obtain page text: {0}")]
    PageText(String),

    #[error("extraction capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("empty reply from extraction capability for segment {segment}")]
    EmptyResponse { segment: usize },

    #[error("segment {segment} reply failed schema validation: {reason}")]
    InvalidResponse { segment: usize, reason: String },

    #[error("processing cancelled")]
    Cancelled,

    #[error("no valid segment results to merge")]
    NoValidResults,

    #[error("operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Cancellation is terminal everywhere, including when it surfaces
    /// wrapped by the retry executor.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::RetryExhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Default retry classification: only capability-level faults (network,
/// timeout, server error) are transient. Schema and validation failures are
/// defects in that segment's answer, not faults worth repeating.
pub fn default_should_retry(e: &PipelineError) -> bool {
    matches!(e, PipelineError::Capability(_) | PipelineError::Io(_))
}
