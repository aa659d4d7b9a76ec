//! Merge of per-segment partial results into one document-level record.
//!
//! Numeric aggregates are order-independent sums; only traceability metadata
//! (which source location a fact points at) depends on input order. Empty
//! partials are skipped with a warning so a single bad segment never sinks
//! the whole document.

use std::collections::HashMap;

use chrono::Utc;

use super::error::PipelineError;
use super::types::{
    ExtractedData, ExtractionMetadata, FinancialSummary, Financials, MemberData,
    MemberFinancials, OverallTotals, PartialResult, SourceLocation, Transaction,
};

/// Grouping key for transactions whose reply omitted a member id.
const UNKNOWN_MEMBER: &str = "unknown";

pub struct ResultMerger;

impl ResultMerger {
    /// Combine all usable partials into one [`ExtractedData`].
    ///
    /// Members are deduplicated by id: first occurrence registers the member,
    /// later occurrences take the max performance and sum the sales. Overall
    /// totals are summed from segment-level totals, never recomputed from
    /// member detail, so missing member data does not skew the document sums.
    pub fn merge(partials: &[PartialResult]) -> Result<ExtractedData, PipelineError> {
        let mut members: Vec<MemberData> = Vec::new();
        let mut member_index: HashMap<String, usize> = HashMap::new();

        let mut overall_sales = 0.0;
        let mut overall_revenue = 0.0;

        let mut by_member: Vec<MemberFinancials> = Vec::new();
        let mut financials_index: HashMap<String, usize> = HashMap::new();

        let mut first_location: Option<SourceLocation> = None;
        let mut usable = 0usize;

        for partial in partials {
            if partial.is_empty() {
                tracing::warn!(
                    segment = partial.segment_index,
                    pages = ?partial.page_range,
                    "segment produced no usable data, skipping in merge"
                );
                continue;
            }
            usable += 1;

            let location = SourceLocation {
                page: partial.page_range.start,
                index: partial.segment_index,
            };
            first_location.get_or_insert(location);

            for member in &partial.members {
                match member_index.get(&member.id) {
                    Some(&i) => {
                        let existing = &mut members[i];
                        existing.performance = existing.performance.max(member.performance);
                        existing.total_sales += member.total_sales;
                        if existing.contact.is_none() {
                            existing.contact = member.contact.clone();
                        }
                    }
                    None => {
                        member_index.insert(member.id.clone(), members.len());
                        members.push(member.clone());
                    }
                }
            }

            overall_sales += partial.totals.total_sales;
            overall_revenue += partial.totals.total_revenue;

            for tx in &partial.transactions {
                let key = tx
                    .member_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or(UNKNOWN_MEMBER)
                    .to_string();

                let i = match financials_index.get(&key) {
                    Some(&i) => i,
                    None => {
                        financials_index.insert(key.clone(), by_member.len());
                        by_member.push(MemberFinancials {
                            member_id: key,
                            total_sales: 0.0,
                            transactions: Vec::new(),
                            summary: FinancialSummary {
                                total_revenue: 0.0,
                                average_transaction: 0.0,
                                source_location: tx.source_location,
                            },
                        });
                        by_member.len() - 1
                    }
                };

                let entry = &mut by_member[i];
                entry.total_sales += tx.amount;
                entry.summary.total_revenue += tx.amount;
                entry.transactions.push(Transaction::from(tx));
            }
        }

        if usable == 0 {
            return Err(PipelineError::NoValidResults);
        }

        for entry in &mut by_member {
            if !entry.transactions.is_empty() {
                entry.summary.average_transaction =
                    entry.summary.total_revenue / entry.transactions.len() as f64;
            }
        }

        // usable > 0 guarantees a location was recorded
        let location = first_location.unwrap_or_default();

        Ok(ExtractedData {
            members,
            financials: Financials {
                by_member,
                overall: OverallTotals {
                    total_sales: overall_sales,
                    total_revenue: overall_revenue,
                    source_location: location,
                },
            },
            metadata: ExtractionMetadata {
                extraction_timestamp: Utc::now(),
                document_date: None,
                report_period: None,
                source_location: location,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{PageRange, SegmentTotals, SegmentTransaction};

    fn empty_partial(index: usize) -> PartialResult {
        PartialResult {
            segment_index: index,
            page_range: PageRange {
                start: index + 1,
                end: index + 1,
            },
            members: Vec::new(),
            totals: SegmentTotals::default(),
            transactions: Vec::new(),
        }
    }

    fn member(id: &str, performance: f64, total_sales: f64, segment: usize) -> MemberData {
        MemberData {
            id: id.into(),
            name: format!("Member {id}"),
            contact: None,
            performance,
            total_sales,
            source_location: SourceLocation {
                page: segment + 1,
                index: segment,
            },
        }
    }

    fn tx(amount: f64, member_id: Option<&str>, segment: usize) -> SegmentTransaction {
        SegmentTransaction {
            amount,
            kind: "sale".into(),
            member_id: member_id.map(str::to_string),
            source_location: SourceLocation {
                page: segment + 1,
                index: segment,
            },
        }
    }

    fn partial_with(
        index: usize,
        members: Vec<MemberData>,
        totals: SegmentTotals,
        transactions: Vec<SegmentTransaction>,
    ) -> PartialResult {
        PartialResult {
            segment_index: index,
            page_range: PageRange {
                start: index + 1,
                end: index + 2,
            },
            members,
            totals,
            transactions,
        }
    }

    #[test]
    fn members_deduplicate_by_id() {
        let a = partial_with(
            0,
            vec![member("M1", 0.4, 100.0, 0)],
            SegmentTotals {
                total_sales: 1.0,
                total_revenue: 100.0,
            },
            vec![],
        );
        let b = partial_with(
            1,
            vec![member("M1", 0.9, 50.0, 1)],
            SegmentTotals {
                total_sales: 1.0,
                total_revenue: 50.0,
            },
            vec![],
        );

        let merged = ResultMerger::merge(&[a, b]).unwrap();

        assert_eq!(merged.members.len(), 1);
        assert_eq!(merged.members[0].id, "M1");
        assert_eq!(merged.members[0].performance, 0.9);
        assert_eq!(merged.members[0].total_sales, 150.0);
    }

    #[test]
    fn overall_totals_are_order_independent_sums() {
        let a = partial_with(
            0,
            vec![member("M1", 0.4, 1.0, 0)],
            SegmentTotals {
                total_sales: 3.0,
                total_revenue: 300.0,
            },
            vec![],
        );
        let b = partial_with(
            1,
            vec![member("M2", 0.4, 1.0, 1)],
            SegmentTotals {
                total_sales: 5.0,
                total_revenue: 500.0,
            },
            vec![],
        );

        let forward = ResultMerger::merge(&[a.clone(), b.clone()]).unwrap();
        let reverse = ResultMerger::merge(&[b, a]).unwrap();

        for merged in [&forward, &reverse] {
            assert_eq!(merged.financials.overall.total_sales, 8.0);
            assert_eq!(merged.financials.overall.total_revenue, 800.0);
        }
    }

    #[test]
    fn transactions_group_by_member_with_unknown_fallback() {
        let partial = partial_with(
            0,
            vec![member("M1", 0.5, 10.0, 0)],
            SegmentTotals {
                total_sales: 3.0,
                total_revenue: 60.0,
            },
            vec![
                tx(10.0, Some("M1"), 0),
                tx(20.0, Some("M1"), 0),
                tx(30.0, None, 0),
            ],
        );

        let merged = ResultMerger::merge(&[partial]).unwrap();
        let by_member = &merged.financials.by_member;

        assert_eq!(by_member.len(), 2);
        let m1 = by_member.iter().find(|m| m.member_id == "M1").unwrap();
        assert_eq!(m1.transactions.len(), 2);
        assert_eq!(m1.total_sales, 30.0);
        assert_eq!(m1.summary.total_revenue, 30.0);
        assert_eq!(m1.summary.average_transaction, 15.0);

        let unknown = by_member
            .iter()
            .find(|m| m.member_id == UNKNOWN_MEMBER)
            .unwrap();
        assert_eq!(unknown.transactions.len(), 1);
        assert_eq!(unknown.summary.average_transaction, 30.0);
    }

    #[test]
    fn empty_partials_are_skipped_not_fatal() {
        let good = partial_with(
            1,
            vec![member("M1", 0.5, 10.0, 1)],
            SegmentTotals {
                total_sales: 1.0,
                total_revenue: 10.0,
            },
            vec![],
        );

        let merged = ResultMerger::merge(&[empty_partial(0), good, empty_partial(2)]).unwrap();

        assert_eq!(merged.members.len(), 1);
        assert_eq!(merged.financials.overall.total_revenue, 10.0);
        // Traceability points at the first usable segment
        assert_eq!(merged.metadata.source_location.index, 1);
    }

    #[test]
    fn all_empty_partials_signal_no_valid_results() {
        let result = ResultMerger::merge(&[empty_partial(0), empty_partial(1)]);
        assert!(matches!(result, Err(PipelineError::NoValidResults)));
    }

    #[test]
    fn no_partials_at_all_signal_no_valid_results() {
        assert!(matches!(
            ResultMerger::merge(&[]),
            Err(PipelineError::NoValidResults)
        ));
    }

    #[test]
    fn members_without_transactions_keep_zero_average() {
        let partial = partial_with(
            0,
            vec![member("M1", 0.5, 10.0, 0)],
            SegmentTotals {
                total_sales: 1.0,
                total_revenue: 10.0,
            },
            vec![tx(10.0, Some("M2"), 0)],
        );

        let merged = ResultMerger::merge(&[partial]).unwrap();

        // M1 extracted as a member but had no transactions of its own
        assert!(merged
            .financials
            .by_member
            .iter()
            .all(|m| m.member_id != "M1"));
        let m2 = &merged.financials.by_member[0];
        assert_eq!(m2.member_id, "M2");
        assert_eq!(m2.summary.average_transaction, 10.0);
    }
}
