//! Document extraction pipeline.
//!
//! File → Segmenter → SegmentProcessor (under retry) → ResultMerger,
//! sequenced per file by the BatchOrchestrator.

pub mod cancel;
pub mod error;
pub mod merger;
pub mod orchestrator;
pub mod processor;
pub mod report;
pub mod retry;
pub mod segmenter;
pub mod types;

pub use cancel::CancelToken;
pub use error::{default_should_retry, PipelineError};
pub use merger::ResultMerger;
pub use orchestrator::BatchOrchestrator;
pub use processor::SegmentProcessor;
pub use report::{user_message, ErrorLog, UserFacingError};
pub use retry::{run_with_retry, RetryPolicy};
pub use segmenter::Segmenter;
pub use types::{
    ExtractedData, FileInput, PartialResult, PdfSegment, ProcessingPhase, ProcessingProgress,
    ProcessingResult,
};
