//! Batch orchestration.
//!
//! Drives the full pipeline per file: page text → segmentation → retried
//! capability calls → merge. Files are processed sequentially to bound load
//! on the extraction capability and keep progress reporting linear. A bad
//! file is recorded and skipped; only cancellation stops the batch.
//!
//! All collaborators arrive through constructor injection so the
//! orchestrator is fully testable with mock implementations.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::cancel::CancelToken;
use super::error::{default_should_retry, PipelineError};
use super::merger::ResultMerger;
use super::processor::SegmentProcessor;
use super::report::ErrorLog;
use super::retry::{run_with_retry, RetryPolicy};
use super::segmenter::Segmenter;
use super::types::{
    ExtractedData, FileInput, ProcessingPhase, ProcessingProgress, ProcessingResult,
};
use crate::capability::ExtractionCapability;
use crate::config::PipelineConfig;
use crate::pdftext::PageTextSource;

pub struct BatchOrchestrator {
    pages: Box<dyn PageTextSource>,
    processor: SegmentProcessor,
    segmenter: Segmenter,
    retry: RetryPolicy,
    errors: Arc<ErrorLog>,
}

impl BatchOrchestrator {
    pub fn new(
        pages: Box<dyn PageTextSource>,
        capability: Arc<dyn ExtractionCapability>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            pages,
            processor: SegmentProcessor::new(capability),
            segmenter: Segmenter::new(config.segment_budget, config.page_delay),
            retry: config.retry,
            errors: Arc::new(ErrorLog::new()),
        }
    }

    /// Terminal errors from every run are recorded here.
    pub fn error_log(&self) -> Arc<ErrorLog> {
        self.errors.clone()
    }

    /// Process `files` in order, one final [`ProcessingResult`] per file.
    ///
    /// `on_progress(file_index, progress)` reports each file on its own
    /// 0 to 100 scale: extraction covers the lower half, capability calls
    /// the upper. Once `cancel` is raised no further work is scheduled and
    /// every remaining file fails with a cancellation result.
    pub async fn batch_process(
        &self,
        files: &[FileInput],
        cancel: &CancelToken,
        mut on_progress: impl FnMut(usize, ProcessingProgress),
    ) -> Vec<ProcessingResult> {
        tracing::info!(files = files.len(), "starting batch");
        let mut results = Vec::with_capacity(files.len());

        for (file_index, file) in files.iter().enumerate() {
            let file_id = Uuid::new_v4();

            let outcome = if cancel.is_cancelled() {
                Err(PipelineError::Cancelled)
            } else {
                let span = tracing::info_span!("process_file", file = %file.name, index = file_index);
                self.process_file(file, cancel, |progress| on_progress(file_index, progress))
                    .instrument(span)
                    .await
            };

            results.push(match outcome {
                Ok(data) => {
                    tracing::info!(file = %file.name, "file processed");
                    ProcessingResult {
                        file_id,
                        file_name: file.name.clone(),
                        success: true,
                        data: Some(data),
                        error: None,
                        error_code: None,
                    }
                }
                Err(e) => {
                    let mapped = self.errors.record_terminal(Some(&file.name), &e);
                    ProcessingResult {
                        file_id,
                        file_name: file.name.clone(),
                        success: false,
                        data: None,
                        error: Some(mapped.message),
                        error_code: Some(mapped.code),
                    }
                }
            });
        }

        tracing::info!(
            files = files.len(),
            succeeded = results.iter().filter(|r| r.success).count(),
            "batch finished"
        );
        results
    }

    async fn process_file(
        &self,
        file: &FileInput,
        cancel: &CancelToken,
        mut progress: impl FnMut(ProcessingProgress),
    ) -> Result<ExtractedData, PipelineError> {
        if file.bytes.is_empty() {
            return Err(PipelineError::Validation(format!(
                "file {} is empty",
                file.name
            )));
        }

        let pages = self.pages.page_texts(&file.bytes)?;
        let total_pages = pages.len();

        let segments = self
            .segmenter
            .segment(&pages, cancel, |page, total| {
                progress(ProcessingProgress {
                    phase: ProcessingPhase::Extraction,
                    progress: ((page * 50) / total) as u8,
                    current_page: page,
                    total_pages: total,
                });
            })
            .await?;

        let total_segments = segments.len();
        let mut partials = Vec::with_capacity(total_segments);

        for (i, segment) in segments.iter().enumerate() {
            let attempt = run_with_retry(
                &self.retry,
                || self.processor.process(segment, i, total_segments, cancel),
                default_should_retry,
                |e, attempt| {
                    tracing::warn!(
                        file = %file.name,
                        segment = i,
                        attempt,
                        error = %e,
                        "segment extraction failed, retrying"
                    );
                },
            )
            .await;

            match attempt {
                Ok(partial) => partials.push(partial),
                Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
                Err(e) => {
                    // Isolation: one bad segment does not sink the file
                    tracing::warn!(
                        file = %file.name,
                        segment = i,
                        error = %e,
                        "segment failed terminally, skipping"
                    );
                }
            }

            progress(ProcessingProgress {
                phase: ProcessingPhase::Processing,
                progress: (50 + ((i + 1) * 50) / total_segments) as u8,
                current_page: total_pages,
                total_pages,
            });
        }

        ResultMerger::merge(&partials)
    }
}
