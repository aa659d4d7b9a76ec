//! Core types for the document extraction pipeline.
//!
//! These types model the full lifecycle:
//! File → Segments → Capability replies → Partial results → Merged record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ═══════════════════════════════════════════
// Input
// ═══════════════════════════════════════════

/// One uploaded file handed to the batch orchestrator: raw bytes plus the
/// declared MIME type. Page text acquisition happens behind `PageTextSource`.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

// ═══════════════════════════════════════════
// Segments
// ═══════════════════════════════════════════

/// Inclusive 1-based page span covered by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

/// A bounded, page-aligned slice of a document's extracted text, the unit
/// of work sent to the extraction capability. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfSegment {
    pub text: String,
    pub page_range: PageRange,
    pub segment_index: usize,
    /// Ordering key only: `segment_index * budget`, not a true byte offset.
    pub start_position: usize,
}

// ═══════════════════════════════════════════
// Extracted domain data
// ═══════════════════════════════════════════

/// Origin of an extracted fact, for traceability back to its segment/page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub page: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A staff member extracted from the document, unique by `id` after merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberData {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<MemberContact>,
    pub performance: f64,
    pub total_sales: f64,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub average_transaction: f64,
    pub source_location: SourceLocation,
}

/// Per-member financial roll-up, keyed uniquely by `member_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFinancials {
    pub member_id: String,
    pub total_sales: f64,
    pub transactions: Vec<Transaction>,
    pub summary: FinancialSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallTotals {
    pub total_sales: f64,
    pub total_revenue: f64,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub by_member: Vec<MemberFinancials>,
    pub overall: OverallTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub extraction_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_period: Option<String>,
    pub source_location: SourceLocation,
}

/// The canonical document-level aggregate produced by the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub members: Vec<MemberData>,
    pub financials: Financials,
    pub metadata: ExtractionMetadata,
}

// ═══════════════════════════════════════════
// Capability reply (wire format)
// ═══════════════════════════════════════════

/// Raw segment reply as the extraction capability is asked to produce it.
/// Decoded strictly after shape validation; every field may be absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentReply {
    #[serde(default)]
    pub members: Vec<ReplyMember>,
    #[serde(default)]
    pub financials: Option<ReplyFinancials>,
    #[serde(default)]
    pub transactions: Vec<ReplyTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub performance: Option<f64>,
    #[serde(default)]
    pub total_sales: Option<f64>,
    #[serde(default)]
    pub contact: Option<MemberContact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyFinancials {
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTransaction {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub member_id: Option<String>,
}

// ═══════════════════════════════════════════
// Partial result (merge input)
// ═══════════════════════════════════════════

/// Segment-level overall totals, rolled up into the document totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentTotals {
    pub total_sales: f64,
    pub total_revenue: f64,
}

/// A transaction before merge, still carrying its grouping key.
#[derive(Debug, Clone)]
pub struct SegmentTransaction {
    pub amount: f64,
    pub kind: String,
    pub member_id: Option<String>,
    pub source_location: SourceLocation,
}

/// The structured output of processing one segment, prior to merge.
/// Carries its origin for traceability.
#[derive(Debug, Clone)]
pub struct PartialResult {
    pub segment_index: usize,
    pub page_range: PageRange,
    pub members: Vec<MemberData>,
    pub totals: SegmentTotals,
    pub transactions: Vec<SegmentTransaction>,
}

impl PartialResult {
    /// True when the segment yielded nothing worth merging.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
            && self.transactions.is_empty()
            && self.totals == SegmentTotals::default()
    }
}

// ═══════════════════════════════════════════
// Progress & results
// ═══════════════════════════════════════════

/// Coarse phase of one file's processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Extraction,
    Processing,
}

impl ProcessingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Processing => "processing",
        }
    }
}

impl std::fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress report for one file. `progress` is monotonically non-decreasing
/// within a file: extraction covers 0–50, processing 50–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingProgress {
    pub phase: ProcessingPhase,
    pub progress: u8,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Terminal outcome for one file in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub file_id: Uuid,
    pub file_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedData>,
    /// Mapped human-readable message, never raw internal error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Opaque error code for programmatic handling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}
