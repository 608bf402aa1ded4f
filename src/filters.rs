use chrono::{Duration, NaiveDate};

use crate::dates::start_of_day;
use crate::models::{CallRecord, LeadRecord};

/// Optional predicates over call records. Every set field must hold for a
/// record to pass; unset fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct CallFilter {
    pub search: Option<String>,
    pub owner: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub course: Option<String>,
    pub call_type: Option<String>,
    pub lead_stage: Option<String>,
    pub disposition: Option<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub min_duration: Option<i64>,
    pub max_duration: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub lead_stage: Option<String>,
    pub publisher: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Keeps the calls satisfying every active predicate, in input order.
pub fn filter_calls<'a>(calls: &'a [CallRecord], filter: &CallFilter) -> Vec<&'a CallRecord> {
    calls.iter().filter(|call| call_matches(call, filter)).collect()
}

pub fn filter_leads<'a>(leads: &'a [LeadRecord], filter: &LeadFilter) -> Vec<&'a LeadRecord> {
    leads.iter().filter(|lead| lead_matches(lead, filter)).collect()
}

fn call_matches(call: &CallRecord, filter: &CallFilter) -> bool {
    if let Some(needle) = active(&filter.search) {
        if !contains_any(&[call.name.as_str(), call.lead_id.as_str()], needle) {
            return false;
        }
    }

    let exact = [
        (&filter.owner, &call.owner),
        (&filter.city, &call.city),
        (&filter.state, &call.state),
        (&filter.course, &call.course),
        (&filter.call_type, &call.call_type),
        (&filter.lead_stage, &call.lead_stage),
        (&filter.disposition, &call.disposition),
    ];
    for (wanted, actual) in exact {
        if let Some(wanted) = active(wanted) {
            if wanted != actual.as_str() {
                return false;
            }
        }
    }

    if !in_range(call.score, filter.min_score, filter.max_score) {
        return false;
    }
    if !in_range(call.duration_seconds, filter.min_duration, filter.max_duration) {
        return false;
    }

    date_in_range(call.date, filter.start_date, filter.end_date)
}

fn lead_matches(lead: &LeadRecord, filter: &LeadFilter) -> bool {
    if let Some(needle) = active(&filter.search) {
        let haystacks = [
            lead.name.as_str(),
            lead.email.as_str(),
            lead.display_id(),
            lead.mobile.as_str(),
        ];
        if !contains_any(&haystacks, needle) {
            return false;
        }
    }

    let exact = [
        (&filter.tag, &lead.tag),
        (&filter.city, &lead.city),
        (&filter.state, &lead.state),
        (&filter.lead_stage, &lead.lead_stage),
        (&filter.publisher, &lead.publisher),
    ];
    for (wanted, actual) in exact {
        if let Some(wanted) = active(wanted) {
            if wanted != actual.as_str() {
                return false;
            }
        }
    }

    date_in_range(lead.date, filter.start_date, filter.end_date)
}

/// Empty strings mean "no constraint", same as an unset field.
fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn contains_any(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

fn in_range(value: i64, min: Option<i64>, max: Option<i64>) -> bool {
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }
    true
}

/// The end bound covers the whole end day. Records without a resolvable
/// date fail any bounded range but pass an unbounded one.
fn date_in_range(
    date: Option<chrono::DateTime<chrono::Utc>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(date) = date else {
        return false;
    };
    if let Some(start) = start {
        if date < start_of_day(start) {
            return false;
        }
    }
    if let Some(end) = end {
        if date >= start_of_day(end) + Duration::days(1) {
            return false;
        }
    }
    true
}
