//! Tunable constants and the pipeline configuration bundle.

use std::time::Duration;

use crate::pipeline::retry::RetryPolicy;

/// Application-level constants
pub const APP_NAME: &str = "LedgerLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum character length of a non-final segment.
pub const SEGMENT_BUDGET: usize = 4000;

/// Pacing delay between pages during segmentation, to keep very large
/// documents from starving other tasks on the runtime.
pub const PAGE_DELAY_MS: u64 = 100;

/// Retry ceiling for one segment's capability call.
pub const MAX_RETRIES: u32 = 3;

/// First backoff delay.
pub const BASE_DELAY_MS: u64 = 1000;

/// Backoff cap.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Everything the orchestrator needs to tune one batch run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub segment_budget: usize,
    pub page_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_budget: SEGMENT_BUDGET,
            page_delay: Duration::from_millis(PAGE_DELAY_MS),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.segment_budget, 4000);
        assert_eq!(config.page_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn app_name_is_ledgerlens() {
        assert_eq!(APP_NAME, "LedgerLens");
    }

    #[test]
    fn log_filter_names_this_crate() {
        assert!(default_log_filter().contains("ledgerlens"));
    }
}
