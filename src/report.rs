use std::fmt::Write;

use serde::Serialize;

use crate::db::{CaseStore, GroupCount, RecentCase};
use crate::error::StoreError;

const RECENT_LIMIT: usize = 5;
const NONE_LABEL: &str = "(none)";

/// Read-only analytics over the stored cases.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub outcomes: Vec<GroupCount>,
    pub areas: Vec<GroupCount>,
    pub recent: Vec<RecentCase>,
}

pub fn summarize(store: &CaseStore) -> Result<Summary, StoreError> {
    let total = store.count_cases()?;
    if total == 0 {
        return Ok(Summary {
            total,
            outcomes: Vec::new(),
            areas: Vec::new(),
            recent: Vec::new(),
        });
    }
    Ok(Summary {
        total,
        outcomes: store.outcome_counts()?,
        areas: store.area_counts()?,
        recent: store.recent_cases(RECENT_LIMIT)?,
    })
}

pub fn render(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Cases: {}", summary.total);
    if summary.total == 0 {
        out.push_str("No data available.\n");
        return out;
    }

    out.push_str("\n[Outcomes]\n");
    group_table(&mut out, "Outcome", &summary.outcomes);

    out.push_str("\n[Area of Law]\n");
    group_table(&mut out, "Area of Law", &summary.areas);

    out.push_str("\n[Recent Cases]\n");
    let _ = writeln!(out, "{:<20} | {:<40} | {:<20}", "Citation", "Case", "Decision Date");
    let _ = writeln!(out, "{}", "-".repeat(86));
    for case in &summary.recent {
        let _ = writeln!(
            out,
            "{:<20} | {:<40} | {:<20}",
            truncate(&case.citation, 20),
            truncate(case.case_name.as_deref().unwrap_or(NONE_LABEL), 40),
            case.decision_date.as_deref().unwrap_or(NONE_LABEL),
        );
    }
    out
}

fn group_table(out: &mut String, label: &str, rows: &[GroupCount]) {
    let _ = writeln!(out, "{:<48} | {:>5}", label, "Count");
    let _ = writeln!(out, "{}", "-".repeat(56));
    for row in rows {
        let value = row.value.as_deref().unwrap_or(NONE_LABEL);
        let _ = writeln!(out, "{:<48} | {:>5}", truncate(value, 48), row.count);
    }
}

/// Cut to `max` characters, marking the cut with `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CaseRecord;

    fn record(citation: &str, outcome: Option<&str>, date: &str) -> CaseRecord {
        CaseRecord {
            citation: citation.into(),
            case_name: Some(format!("Case {}", citation)),
            plaintiff_name: None,
            defendant_name: None,
            judge_name: None,
            decision_date: Some(date.into()),
            area_of_law: Some("Contract".into()),
            outcome: outcome.map(String::from),
            plaintiff_counsel: None,
            defendant_counsel: None,
            raw_judgment_text: String::new(),
        }
    }

    #[test]
    fn empty_store() {
        let store = CaseStore::open_in_memory().unwrap();
        let summary = summarize(&store).unwrap();
        assert_eq!(render(&summary), "Total Cases: 0\nNo data available.\n");
    }

    #[test]
    fn sections_and_counts() {
        let store = CaseStore::open_in_memory().unwrap();
        store.upsert(&record("A1", Some("Dismissed"), "2026-01-01")).unwrap();
        store.upsert(&record("A2", Some("Dismissed"), "2025-01-01")).unwrap();
        store.upsert(&record("A3", None, "2024-01-01")).unwrap();

        let summary = summarize(&store).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.recent[0].citation, "A1");

        let text = render(&summary);
        assert!(text.starts_with("Total Cases: 3\n"));
        let outcomes = text.find("[Outcomes]").unwrap();
        let areas = text.find("[Area of Law]").unwrap();
        let recent = text.find("[Recent Cases]").unwrap();
        assert!(outcomes < areas && areas < recent);
        assert!(text.contains(&format!("{:<48} | {:>5}", "Dismissed", 2)));
        assert!(text.contains(&format!("{:<48} | {:>5}", NONE_LABEL, 1)));
        assert!(text.contains(&format!("{:<48} | {:>5}", "Contract", 3)));
    }

    #[test]
    fn recent_is_capped() {
        let store = CaseStore::open_in_memory().unwrap();
        for i in 0..8 {
            store
                .upsert(&record(&format!("C{}", i), Some("Other"), &format!("2020-0{}-01", i + 1)))
                .unwrap();
        }
        let summary = summarize(&store).unwrap();
        assert_eq!(summary.recent.len(), RECENT_LIMIT);
        assert_eq!(summary.recent[0].citation, "C7");
    }

    #[test]
    fn json_shape() {
        let store = CaseStore::open_in_memory().unwrap();
        store.upsert(&record("A1", Some("Allowed"), "2026-01-01")).unwrap();
        let json = serde_json::to_value(summarize(&store).unwrap()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["outcomes"][0]["value"], "Allowed");
        assert_eq!(json["recent"][0]["citation"], "A1");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
