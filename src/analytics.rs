use std::collections::HashMap;

use crate::models::{CallMetrics, CallRecord, LeadRecord, OwnerStats};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const UNASSIGNED_OWNER: &str = "Unassigned";

/// Sorted distinct non-blank values of one field, drawn from the full
/// record set so the operator can always broaden a filter.
pub fn distinct_options<T>(records: &[T], accessor: impl Fn(&T) -> &str) -> Vec<String> {
    let mut values: Vec<String> = records
        .iter()
        .map(|r| accessor(r).trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Option lists backing the call filter controls.
pub fn call_options(calls: &[CallRecord]) -> Vec<(&'static str, Vec<String>)> {
    vec![
        ("owner", distinct_options(calls, |c| &c.owner)),
        ("city", distinct_options(calls, |c| &c.city)),
        ("state", distinct_options(calls, |c| &c.state)),
        ("course", distinct_options(calls, |c| &c.course)),
        ("call-type", distinct_options(calls, |c| &c.call_type)),
        ("lead-stage", distinct_options(calls, |c| &c.lead_stage)),
        ("disposition", distinct_options(calls, |c| &c.disposition)),
    ]
}

pub fn lead_options(leads: &[LeadRecord]) -> Vec<(&'static str, Vec<String>)> {
    vec![
        ("city", distinct_options(leads, |l| &l.city)),
        ("state", distinct_options(leads, |l| &l.state)),
        ("lead-stage", distinct_options(leads, |l| &l.lead_stage)),
        ("publisher", distinct_options(leads, |l| &l.publisher)),
    ]
}

/// Groups calls by counselor and accumulates count, score sum, and max
/// score. Sorted by call count descending; the sort is stable, so ties keep
/// the order in which each owner was first seen.
pub fn owner_stats(calls: &[CallRecord]) -> Vec<OwnerStats> {
    let mut order: Vec<OwnerStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for call in calls {
        let owner = if call.owner.is_empty() {
            UNASSIGNED_OWNER
        } else {
            call.owner.as_str()
        };
        let at = *index.entry(owner.to_owned()).or_insert_with(|| {
            order.push(OwnerStats {
                owner: owner.to_owned(),
                total_calls: 0,
                total_score: 0,
                max_score: 0,
                avg_score: 0,
            });
            order.len() - 1
        });
        let entry = &mut order[at];
        entry.total_calls += 1;
        entry.total_score += call.score;
        entry.max_score = entry.max_score.max(call.score);
    }

    for entry in order.iter_mut() {
        entry.avg_score = if entry.total_calls == 0 {
            0
        } else {
            ((entry.total_score as f64) / (entry.total_calls as f64)).round() as i64
        };
    }

    order.sort_by(|a, b| b.total_calls.cmp(&a.total_calls));
    order
}

pub fn call_metrics(calls: &[CallRecord]) -> CallMetrics {
    let total_calls = calls.len();
    let average_score = if total_calls == 0 {
        0
    } else {
        let sum: i64 = calls.iter().map(|c| c.score).sum();
        ((sum as f64) / (total_calls as f64)).round() as i64
    };
    let interested = calls
        .iter()
        .filter(|c| c.disposition == "interested" || c.lead_stage == "Interested")
        .count();
    let not_interested = calls
        .iter()
        .filter(|c| c.disposition == "not_interested" || c.lead_stage == "Not Interested")
        .count();
    CallMetrics {
        total_calls,
        average_score,
        interested,
        not_interested,
    }
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Reactive correction after the record set shrinks, not an error.
pub fn clamp_page(page: usize, total: usize) -> usize {
    page.clamp(1, total.max(1))
}

/// 1-indexed page window `[(p-1)*size, p*size)`, clipped to the set.
pub fn page_slice<T>(records: &[T], page_size: usize, page: usize) -> &[T] {
    let start = (page.max(1) - 1).saturating_mul(page_size).min(records.len());
    let end = start.saturating_add(page_size).min(records.len());
    &records[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use serde_json::json;

    fn call(owner: &str, score: i64) -> CallRecord {
        CallRecord::from_doc(&Document {
            id: format!("call-{owner}-{score}"),
            fields: json!({
                "Name": "sample",
                "Lead_owner": owner,
                "scores": { "overall": score },
            }),
        })
    }

    #[test]
    fn options_are_sorted_and_deduplicated() {
        let calls = vec![call("zara_khan", 10), call("arjun_mehta", 20), call("zara_khan", 30)];
        let owners = distinct_options(&calls, |c| &c.owner);
        assert_eq!(owners, vec!["arjun_mehta", "zara_khan"]);
    }

    #[test]
    fn blank_values_are_not_options() {
        let calls = vec![call("", 10), call("arjun_mehta", 20)];
        assert_eq!(distinct_options(&calls, |c| &c.owner), vec!["arjun_mehta"]);
    }

    #[test]
    fn owner_stats_accumulate_and_average() {
        let calls = vec![call("priya", 70), call("priya", 90), call("arjun", 40)];
        let stats = owner_stats(&calls);
        assert_eq!(stats[0].owner, "priya");
        assert_eq!(stats[0].total_calls, 2);
        assert_eq!(stats[0].total_score, 160);
        assert_eq!(stats[0].max_score, 90);
        assert_eq!(stats[0].avg_score, 80);
    }

    #[test]
    fn blank_owner_falls_into_unassigned() {
        let calls = vec![call("", 50)];
        let stats = owner_stats(&calls);
        assert_eq!(stats[0].owner, UNASSIGNED_OWNER);
    }

    #[test]
    fn group_counts_sum_to_input_length() {
        let calls = vec![
            call("a", 10),
            call("b", 20),
            call("a", 30),
            call("", 40),
            call("c", 50),
        ];
        let stats = owner_stats(&calls);
        let total: usize = stats.iter().map(|s| s.total_calls).sum();
        assert_eq!(total, calls.len());
    }

    #[test]
    fn count_ties_keep_encounter_order() {
        let calls = vec![call("beta", 10), call("alpha", 20)];
        let stats = owner_stats(&calls);
        assert_eq!(stats[0].owner, "beta");
        assert_eq!(stats[1].owner, "alpha");
    }

    #[test]
    fn metrics_round_the_average() {
        let calls = vec![call("a", 50), call("a", 51)];
        let metrics = call_metrics(&calls);
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.average_score, 51);
    }

    #[test]
    fn twenty_five_records_make_two_pages() {
        let records: Vec<u32> = (0..25).collect();
        assert_eq!(total_pages(records.len(), DEFAULT_PAGE_SIZE), 2);
        assert_eq!(page_slice(&records, DEFAULT_PAGE_SIZE, 1).len(), 20);
        assert_eq!(page_slice(&records, DEFAULT_PAGE_SIZE, 2).len(), 5);
    }

    #[test]
    fn pages_partition_the_record_set() {
        for len in [0usize, 1, 19, 20, 21, 40, 57] {
            let records: Vec<usize> = (0..len).collect();
            let pages = total_pages(len, DEFAULT_PAGE_SIZE);
            let mut seen = 0;
            for page in 1..=pages {
                let slice = page_slice(&records, DEFAULT_PAGE_SIZE, page);
                if page < pages && len > 0 {
                    assert_eq!(slice.len(), DEFAULT_PAGE_SIZE);
                }
                seen += slice.len();
            }
            assert_eq!(seen, len);
        }
    }

    #[test]
    fn empty_set_still_has_one_page() {
        assert_eq!(total_pages(0, DEFAULT_PAGE_SIZE), 1);
        assert!(page_slice::<u32>(&[], DEFAULT_PAGE_SIZE, 1).is_empty());
    }

    #[test]
    fn out_of_range_page_clamps() {
        assert_eq!(clamp_page(9, 2), 2);
        assert_eq!(clamp_page(0, 2), 1);
        assert_eq!(clamp_page(1, 0), 1);
    }
}
