//! Terminal-error reporting.
//!
//! A single mapping layer turns internal pipeline errors into an opaque code
//! plus a human-readable message; raw error detail never reaches callers
//! directly. Every terminal error is also recorded in a bounded in-memory
//! log for later inspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::PipelineError;
use crate::capability::CapabilityError;

/// Newest-first log capacity.
const MAX_LOG_ENTRIES: usize = 1000;

/// What presentation layers are allowed to see about a failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
}

/// Map a terminal pipeline error to its user-facing code and message.
pub fn user_message(error: &PipelineError) -> UserFacingError {
    let (code, message) = match error {
        PipelineError::Validation(msg) => (
            "VALIDATION_ERROR".to_string(),
            format!("Validation failed: {msg}"),
        ),
        PipelineError::EmptyContent => (
            "EMPTY_CONTENT".to_string(),
            "No text content found in the PDF. Please ensure the file contains readable text."
                .to_string(),
        ),
        PipelineError::PageText(_) => (
            "PDF_EXTRACTION_FAILED".to_string(),
            "Failed to extract text from PDF. Please ensure the file is not corrupted."
                .to_string(),
        ),
        PipelineError::Capability(inner) => capability_message(inner),
        PipelineError::EmptyResponse { .. } => (
            "EMPTY_AI_RESPONSE".to_string(),
            "The extraction service returned an empty response. Please try again.".to_string(),
        ),
        PipelineError::InvalidResponse { .. } => (
            "INVALID_AI_RESPONSE".to_string(),
            "Failed to process the document content. Please try again.".to_string(),
        ),
        PipelineError::Cancelled => (
            "CANCELLED".to_string(),
            "Processing was cancelled.".to_string(),
        ),
        PipelineError::NoValidResults => (
            "NO_VALID_RESULTS".to_string(),
            "No usable data could be extracted from any part of the document.".to_string(),
        ),
        PipelineError::RetryExhausted { attempts, .. } => (
            "RETRY_EXHAUSTED".to_string(),
            format!("Operation failed after {attempts} attempts"),
        ),
        PipelineError::Io(_) => (
            "IO_ERROR".to_string(),
            "Failed to read the file. Please try again.".to_string(),
        ),
    };
    UserFacingError { code, message }
}

fn capability_message(error: &CapabilityError) -> (String, String) {
    match error {
        CapabilityError::Api { status, .. } => {
            let message = match status {
                400 => "Invalid request format. Please check your input.",
                401 => "Authentication failed. Please check your API key.",
                403 => "Access denied. Please check your permissions.",
                429 => "Rate limit exceeded. Please wait a moment and try again.",
                500 => "Server error occurred. Please try again later.",
                _ => "The extraction service rejected the request. Please try again later.",
            };
            (format!("API_{status}"), message.to_string())
        }
        CapabilityError::Connection(_) => (
            "AI_UNAVAILABLE".to_string(),
            "Could not reach the extraction service. Please check your connection.".to_string(),
        ),
        CapabilityError::Timeout { .. } => (
            "AI_TIMEOUT".to_string(),
            "The extraction service took too long to respond. Please try again.".to_string(),
        ),
        CapabilityError::ResponseParsing(_) | CapabilityError::Http(_) => (
            "AI_PROCESSING_FAILED".to_string(),
            "Failed to process the document content. Please try again.".to_string(),
        ),
    }
}

/// One recorded terminal failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub id: Uuid,
    pub code: String,
    pub message: String,
    /// Internal error rendering, for diagnostics only.
    pub detail: String,
    pub file_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Bounded, newest-first log of terminal errors. Shared across a batch run.
#[derive(Default)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ErrorLogEntry>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal error and hand back its user-facing mapping.
    pub fn record_terminal(
        &self,
        file_name: Option<&str>,
        error: &PipelineError,
    ) -> UserFacingError {
        let mapped = user_message(error);

        tracing::error!(
            code = %mapped.code,
            file = file_name.unwrap_or("<none>"),
            error = %error,
            "terminal pipeline error"
        );

        let entry = ErrorLogEntry {
            id: Uuid::new_v4(),
            code: mapped.code.clone(),
            message: mapped.message.clone(),
            detail: error.to_string(),
            file_name: file_name.map(str::to_string),
            timestamp: Utc::now(),
        };

        // A poisoned log must not take the pipeline down with it
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_front(entry);
            if entries.len() > MAX_LOG_ENTRIES {
                entries.pop_back();
            }
        }

        mapped
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ErrorLogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_maps_to_readable_message() {
        let mapped = user_message(&PipelineError::EmptyContent);
        assert_eq!(mapped.code, "EMPTY_CONTENT");
        assert!(mapped.message.contains("No text content"));
    }

    #[test]
    fn api_status_maps_to_status_specific_code() {
        let error = PipelineError::Capability(CapabilityError::Api {
            status: 429,
            body: "slow down".into(),
        });
        let mapped = user_message(&error);
        assert_eq!(mapped.code, "API_429");
        assert!(mapped.message.contains("Rate limit"));
    }

    #[test]
    fn retry_exhausted_reports_attempt_count() {
        let error = PipelineError::RetryExhausted {
            attempts: 3,
            source: Box::new(PipelineError::Capability(CapabilityError::Connection(
                "refused".into(),
            ))),
        };
        let mapped = user_message(&error);
        assert_eq!(mapped.code, "RETRY_EXHAUSTED");
        assert!(mapped.message.contains("after 3 attempts"));
    }

    #[test]
    fn raw_detail_never_leaks_into_the_message() {
        let error = PipelineError::Capability(CapabilityError::Http(
            "hyper::Error(IncompleteMessage) at 10.0.0.7:443".into(),
        ));
        let mapped = user_message(&error);
        assert!(!mapped.message.contains("10.0.0.7"));
        assert!(!mapped.message.contains("hyper"));
    }

    #[test]
    fn log_records_newest_first() {
        let log = ErrorLog::new();
        log.record_terminal(Some("a.pdf"), &PipelineError::EmptyContent);
        log.record_terminal(Some("b.pdf"), &PipelineError::Cancelled);

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].code, "CANCELLED");
        assert_eq!(recent[0].file_name.as_deref(), Some("b.pdf"));
        assert_eq!(recent[1].code, "EMPTY_CONTENT");
    }

    #[test]
    fn log_is_bounded() {
        let log = ErrorLog::new();
        for _ in 0..(MAX_LOG_ENTRIES + 25) {
            log.record_terminal(None, &PipelineError::EmptyContent);
        }
        assert_eq!(log.len(), MAX_LOG_ENTRIES);
    }

    #[test]
    fn clear_empties_the_log() {
        let log = ErrorLog::new();
        log.record_terminal(None, &PipelineError::EmptyContent);
        log.clear();
        assert!(log.is_empty());
    }
}
