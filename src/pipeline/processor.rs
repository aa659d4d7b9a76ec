//! Per-segment structured extraction.
//!
//! Sends one segment to the extraction capability, validates the reply
//! shape field by field, then decodes it strictly and translates it into a
//! [`PartialResult`] carrying the segment's source location.

use std::sync::Arc;

use serde_json::Value;

use super::cancel::CancelToken;
use super::error::PipelineError;
use super::types::{
    MemberData, PartialResult, PdfSegment, SegmentReply, SegmentTotals, SegmentTransaction,
    SourceLocation, Transaction,
};
use crate::capability::ExtractionCapability;

/// Fixed extraction instruction. Positional framing is appended per segment.
pub const SYSTEM_PROMPT: &str = "You are a data extraction specialist. Analyze the provided \
document segment and extract structured data about sales and staff performance. Extract all \
staff member details (ids, names, metrics), all sales and revenue figures, and all transaction \
details. Respond with a single valid JSON object with this shape: \
{\"members\": [{\"id\": string, \"name\": string, \"performance\": number, \"totalSales\": number}], \
\"financials\": {\"totalRevenue\": number, \"totalSales\": number}, \
\"transactions\": [{\"amount\": number, \"type\": string, \"memberId\": string}]}";

pub struct SegmentProcessor {
    capability: Arc<dyn ExtractionCapability>,
}

impl SegmentProcessor {
    pub fn new(capability: Arc<dyn ExtractionCapability>) -> Self {
        Self { capability }
    }

    /// Process one segment. The only side effect is the outbound capability
    /// call.
    ///
    /// `index`/`total` frame the prompt only. Empty replies and schema
    /// violations are non-retryable conditions for this segment.
    pub async fn process(
        &self,
        segment: &PdfSegment,
        index: usize,
        total: usize,
        cancel: &CancelToken,
    ) -> Result<PartialResult, PipelineError> {
        cancel.check()?;

        let prompt = format!(
            "Process this document segment ({}/{}): {}",
            index + 1,
            total,
            segment.text
        );

        let raw = self.capability.extract(SYSTEM_PROMPT, &prompt).await?;
        cancel.check()?;

        let body = strip_code_fences(&raw);
        if body.trim().is_empty() {
            return Err(PipelineError::EmptyResponse { segment: index });
        }

        let value: Value =
            serde_json::from_str(body).map_err(|e| PipelineError::InvalidResponse {
                segment: index,
                reason: e.to_string(),
            })?;

        validate_shape(&value).map_err(|reason| PipelineError::InvalidResponse {
            segment: index,
            reason,
        })?;

        let reply: SegmentReply =
            serde_json::from_value(value).map_err(|e| PipelineError::InvalidResponse {
                segment: index,
                reason: e.to_string(),
            })?;

        Ok(translate(reply, segment))
    }
}

/// Field-by-field shape check before the strict decode. Optional fields may
/// be absent, but a present field with the wrong shape is a schema violation.
fn validate_shape(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "reply is not a JSON object".to_string())?;

    if let Some(members) = obj.get("members") {
        if !members.is_array() {
            return Err("members is not an array".into());
        }
    }
    if let Some(financials) = obj.get("financials") {
        if !financials.is_object() && !financials.is_null() {
            return Err("financials is not an object".into());
        }
    }
    if let Some(transactions) = obj.get("transactions") {
        if !transactions.is_array() {
            return Err("transactions is not an array".into());
        }
    }
    Ok(())
}

/// Models often wrap JSON in a markdown fence; strip it before parsing.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the fence line
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end()
        .trim_end_matches("```")
        .trim()
}

/// Attach the originating segment's location to every extracted fact.
fn translate(reply: SegmentReply, segment: &PdfSegment) -> PartialResult {
    let location = SourceLocation {
        page: segment.page_range.start,
        index: segment.segment_index,
    };

    let members = reply
        .members
        .into_iter()
        .filter_map(|m| {
            let id = m.id.filter(|id| !id.trim().is_empty())?;
            Some(MemberData {
                id,
                name: m.name,
                contact: m.contact,
                performance: m.performance.unwrap_or(0.0),
                total_sales: m.total_sales.unwrap_or(0.0),
                source_location: location,
            })
        })
        .collect();

    let totals = reply
        .financials
        .map(|f| SegmentTotals {
            total_sales: f.total_sales,
            total_revenue: f.total_revenue,
        })
        .unwrap_or_default();

    let transactions = reply
        .transactions
        .into_iter()
        .filter_map(|t| {
            let amount = t.amount?;
            Some(SegmentTransaction {
                amount,
                kind: t.kind,
                member_id: t.member_id,
                source_location: location,
            })
        })
        .collect();

    PartialResult {
        segment_index: segment.segment_index,
        page_range: segment.page_range,
        members,
        totals,
        transactions,
    }
}

impl From<&SegmentTransaction> for Transaction {
    fn from(tx: &SegmentTransaction) -> Self {
        Self {
            amount: tx.amount,
            kind: tx.kind.clone(),
            source_location: tx.source_location,
        }
    }
}
