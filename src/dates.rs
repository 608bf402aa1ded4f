use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Field names that may carry the call date, checked in this order. The
/// first field that is present wins, even if its value fails to parse.
const DATE_FIELDS: [&str; 6] = [
    "Date",
    "call_timestamp",
    "created_at",
    "createdAt",
    "call_date",
    "callDate",
];

/// Converts one raw document value into a UTC instant. Handles the store's
/// timestamp shape (`{"seconds": .., "nanoseconds": ..}`), RFC 3339 and
/// plain date strings, and epoch-millisecond numbers. Anything else is None.
pub fn normalize_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map.get("seconds")?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                .clamp(0, 999_999_999) as u32;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        Value::String(raw) => parse_date_str(raw),
        Value::Number(n) => {
            let millis = n.as_f64()? as i64;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Resolves the date of a call document from its candidate fields. Done once
/// at the ingestion boundary; downstream code only ever sees the result.
pub fn record_date(fields: &Value) -> Option<DateTime<Utc>> {
    let raw = DATE_FIELDS.iter().find_map(|name| {
        fields
            .get(*name)
            .filter(|v| !v.is_null() && v.as_str().map_or(true, |s| !s.is_empty()))
    })?;
    normalize_date(raw)
}

/// Start of the given calendar day as a UTC instant, for range bounds.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_store_timestamp_objects() {
        let value = json!({ "seconds": 1_704_067_200, "nanoseconds": 0 });
        let dt = normalize_date(&value).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn reads_iso_strings_and_plain_dates() {
        let dt = normalize_date(&json!("2024-01-10T09:30:00Z")).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());

        let dt = normalize_date(&json!("2024-01-10")).unwrap();
        assert_eq!(dt, start_of_day(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
    }

    #[test]
    fn reads_epoch_millis() {
        let dt = normalize_date(&json!(1_704_067_200_000_i64)).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn unparseable_input_is_none_not_a_panic() {
        assert!(normalize_date(&json!("next tuesday")).is_none());
        assert!(normalize_date(&json!(true)).is_none());
        assert!(normalize_date(&json!({ "nanoseconds": 5 })).is_none());
        assert!(normalize_date(&Value::Null).is_none());
    }

    #[test]
    fn first_candidate_field_wins() {
        let fields = json!({
            "call_timestamp": "2024-02-01T00:00:00Z",
            "Date": "2024-01-15T00:00:00Z",
        });
        let dt = record_date(&fields).unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert!(record_date(&json!({ "Name": "Asha" })).is_none());
    }
}
