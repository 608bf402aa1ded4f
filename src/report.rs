use std::fmt::Write;

use crate::analytics;
use crate::models::{CallRecord, LeadRecord};

/// Renders the markdown overview: metrics, counselor leaderboard, lead tag
/// mix, and the most recent calls.
pub fn build_report(calls: &[CallRecord], leads: &[LeadRecord], scope: Option<&str>) -> String {
    let metrics = analytics::call_metrics(calls);
    let stats = analytics::owner_stats(calls);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all records");

    let _ = writeln!(output, "# Call Analytics Report");
    let _ = writeln!(output, "Generated for {scope_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total calls: {}", metrics.total_calls);
    let _ = writeln!(output, "- Average score: {}", metrics.average_score);
    let _ = writeln!(output, "- Interested: {}", metrics.interested);
    let _ = writeln!(output, "- Not interested: {}", metrics.not_interested);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Counselor Leaderboard");
    if stats.is_empty() {
        let _ = writeln!(output, "No calls recorded.");
    } else {
        for entry in stats.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} calls, avg score {}, max score {}",
                entry.owner, entry.total_calls, entry.avg_score, entry.max_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lead Mix");
    if leads.is_empty() {
        let _ = writeln!(output, "No hot or warm leads.");
    } else {
        let hot = leads.iter().filter(|l| l.tag == "Hot").count();
        let warm = leads.iter().filter(|l| l.tag == "Warm").count();
        let _ = writeln!(output, "- Hot: {hot}");
        let _ = writeln!(output, "- Warm: {warm}");
    }

    let mut recent: Vec<&CallRecord> = calls.iter().filter(|c| c.date.is_some()).collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Calls");
    if recent.is_empty() {
        let _ = writeln!(output, "No dated calls recorded.");
    } else {
        for call in recent.iter().take(5) {
            let date = call
                .date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let summary = if call.summary.is_empty() {
                "no summary"
            } else {
                call.summary.as_str()
            };
            let _ = writeln!(
                output,
                "- {} ({}, score {}) on {}: {}",
                call.name, call.owner, call.score, date, summary
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use serde_json::json;

    fn call(name: &str, owner: &str, score: i64, date: &str) -> CallRecord {
        CallRecord::from_doc(&Document {
            id: name.to_lowercase(),
            fields: json!({
                "Name": name,
                "Lead_owner": owner,
                "scores": { "overall": score },
                "Date": date,
                "summary": { "one_line": "Discussed admissions." },
            }),
        })
    }

    #[test]
    fn report_lists_leaderboard_and_recent_calls() {
        let calls = vec![
            call("Asha", "priya", 80, "2026-02-01T10:00:00Z"),
            call("Ravi", "priya", 60, "2026-02-02T10:00:00Z"),
            call("Meera", "arjun", 90, "2026-01-20T10:00:00Z"),
        ];
        let report = build_report(&calls, &[], None);

        assert!(report.contains("# Call Analytics Report"));
        assert!(report.contains("- Total calls: 3"));
        assert!(report.contains("- priya: 2 calls, avg score 70, max score 80"));
        // Most recent first.
        let ravi = report.find("Ravi").unwrap();
        let meera = report.find("Meera").unwrap();
        assert!(ravi < meera);
    }

    #[test]
    fn empty_inputs_render_placeholders() {
        let report = build_report(&[], &[], Some("the Mumbai team"));
        assert!(report.contains("Generated for the Mumbai team"));
        assert!(report.contains("No calls recorded."));
        assert!(report.contains("No hot or warm leads."));
        assert!(report.contains("No dated calls recorded."));
    }
}
