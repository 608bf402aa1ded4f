use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::dates;

pub const CALLS_COLLECTION: &str = "Call_logs";
pub const LEADS_COLLECTION: &str = "hot_warm_lead";

/// One raw document as the store hands it back: identifier plus fields.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

/// A call log normalized for the analytics layer. Built tolerantly from a
/// document; absent or mistyped fields degrade to empty values, never error.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: String,
    pub name: String,
    pub lead_id: String,
    pub owner: String,
    pub city: String,
    pub state: String,
    pub course: String,
    pub call_type: String,
    pub lead_stage: String,
    pub disposition: String,
    pub score: i64,
    pub confidence: String,
    pub duration_seconds: i64,
    pub date: Option<DateTime<Utc>>,
    pub summary: String,
    pub recording_url: String,
}

impl CallRecord {
    pub fn from_doc(doc: &Document) -> Self {
        let f = &doc.fields;
        CallRecord {
            id: doc.id.clone(),
            name: str_field(f, "Name"),
            lead_id: str_field(f, "Lead_id"),
            owner: str_field(f, "Lead_owner"),
            city: str_field(f, "City"),
            state: str_field(f, "State"),
            course: str_field(f, "course"),
            call_type: str_field(f, "Call_type"),
            lead_stage: str_field(f, "lead_stage"),
            disposition: nested_str(f, "Disposition", "counselor"),
            score: overall_score(f),
            confidence: nested_str(f, "scores", "confidence"),
            duration_seconds: duration_seconds(f),
            date: dates::record_date(f),
            summary: nested_str(f, "summary", "one_line"),
            recording_url: str_field(f, "recording_url"),
        }
    }
}

/// A hot/warm lead. Tag is "Hot" or "Warm" by construction: the store is
/// only ever queried for those two values.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub id: String,
    pub lead_id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub city: String,
    pub state: String,
    pub tag: String,
    pub lead_stage: String,
    pub publisher: String,
    pub date: Option<DateTime<Utc>>,
    pub activities: Vec<String>,
}

impl LeadRecord {
    pub fn from_doc(doc: &Document) -> Self {
        let f = &doc.fields;
        let updated = f.get("updated_at").and_then(dates::normalize_date);
        let created = f.get("created_at").and_then(dates::normalize_date);
        LeadRecord {
            id: doc.id.clone(),
            lead_id: str_field(f, "lead_id"),
            name: str_field(f, "name"),
            email: str_field(f, "email"),
            mobile: str_field(f, "mobile"),
            city: str_field(f, "city"),
            state: str_field(f, "state"),
            tag: str_field(f, "tag"),
            lead_stage: str_field(f, "lead_stage"),
            publisher: str_field(f, "publishername"),
            date: updated.or(created),
            activities: f
                .get("activity_performed")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Lead id shown to the operator; falls back to the document id.
    pub fn display_id(&self) -> &str {
        if self.lead_id.is_empty() {
            &self.id
        } else {
            &self.lead_id
        }
    }
}

/// Per-counselor aggregate over a call set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerStats {
    pub owner: String,
    pub total_calls: usize,
    pub total_score: i64,
    pub max_score: i64,
    pub avg_score: i64,
}

/// Overview numbers across a call set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMetrics {
    pub total_calls: usize,
    pub average_score: i64,
    pub interested: usize,
    pub not_interested: usize,
}

fn str_field(fields: &Value, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned()
}

fn nested_str(fields: &Value, outer: &str, inner: &str) -> String {
    fields
        .get(outer)
        .and_then(|v| v.get(inner))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned()
}

fn overall_score(fields: &Value) -> i64 {
    fields
        .get("scores")
        .and_then(|v| v.get("overall"))
        .and_then(Value::as_f64)
        .map(|f| (f.round() as i64).clamp(0, 100))
        .unwrap_or(0)
}

fn duration_seconds(fields: &Value) -> i64 {
    match fields.get("Duration") {
        Some(Value::Object(map)) => map
            .get("seconds")
            .and_then(Value::as_f64)
            .map(|f| f as i64)
            .unwrap_or(0),
        Some(value) => value.as_f64().map(|f| f as i64).unwrap_or(0),
        None => 0,
    }
}
