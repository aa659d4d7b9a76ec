//! Page-aligned text segmentation.
//!
//! Pages are appended to the segment in progress; a segment is flushed once
//! the cumulative size crosses the budget or the final page is reached, so a
//! page is never split across two segments.

use std::time::Duration;

use super::cancel::CancelToken;
use super::error::PipelineError;
use super::types::{PageRange, PdfSegment};
use crate::config;

pub struct Segmenter {
    budget: usize,
    page_delay: Duration,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            budget: config::SEGMENT_BUDGET,
            page_delay: Duration::from_millis(config::PAGE_DELAY_MS),
        }
    }
}

impl Segmenter {
    pub fn new(budget: usize, page_delay: Duration) -> Self {
        Self { budget, page_delay }
    }

    /// Split ordered per-page text into bounded segments.
    ///
    /// Every segment's text length is at least the budget except possibly the
    /// last. Pages without extractable text are skipped with a warning.
    /// `on_page(page_number, total_pages)` fires after each page for progress
    /// reporting. A document with zero pages, or only empty pages, is fatal.
    pub async fn segment(
        &self,
        pages: &[String],
        cancel: &CancelToken,
        mut on_page: impl FnMut(usize, usize),
    ) -> Result<Vec<PdfSegment>, PipelineError> {
        if pages.is_empty() {
            return Err(PipelineError::EmptyContent);
        }

        let total = pages.len();
        let mut segments: Vec<PdfSegment> = Vec::new();
        let mut current = String::new();
        let mut first_page = 1;

        for (i, page) in pages.iter().enumerate() {
            cancel.check()?;
            let page_number = i + 1;

            let text = page.trim();
            if text.is_empty() {
                tracing::warn!(page = page_number, "no text content found on page, skipping");
            } else {
                current.push_str(text);
                current.push(' ');
            }

            let last_page = page_number == total;
            if current.len() >= self.budget || last_page {
                let cleaned = normalize_whitespace(&current);
                if !cleaned.is_empty() {
                    segments.push(PdfSegment {
                        text: cleaned,
                        page_range: PageRange {
                            start: first_page,
                            end: page_number,
                        },
                        segment_index: segments.len(),
                        // Ordering key, not a byte offset
                        start_position: segments.len() * self.budget,
                    });
                }
                current.clear();
                first_page = page_number + 1;
            }

            on_page(page_number, total);

            // Pacing: avoid saturating the runtime on very large documents
            if !last_page && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
                cancel.check()?;
            }
        }

        if segments.is_empty() {
            return Err(PipelineError::EmptyContent);
        }

        Ok(segments)
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
