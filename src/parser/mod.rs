pub mod body;
pub mod dom;
pub mod html_meta;
pub mod text_meta;

use serde::Serialize;

/// Placeholder area of law when no topic signal exists.
pub const UNCLASSIFIED: &str = "Unclassified";

// Known outcome values. The vocabulary is open: stored as free text.
pub const OUTCOME_DISMISSED: &str = "Dismissed";
pub const OUTCOME_ALLOWED: &str = "Allowed";
pub const OUTCOME_ALLOWED_GRANTED: &str = "Allowed/Granted";
pub const OUTCOME_OTHER: &str = "Other";

/// Partial case metadata produced by one extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseMetadata {
    pub case_name: Option<String>,
    pub plaintiff_name: Option<String>,
    pub defendant_name: Option<String>,
    pub citation: Option<String>,
    pub decision_date: Option<String>,
    pub judge_name: Option<String>,
    pub area_of_law: Option<String>,
    pub outcome: Option<String>,
    pub plaintiff_counsel: Option<String>,
    pub defendant_counsel: Option<String>,
}

impl CaseMetadata {
    /// Text-derived values form the base; every non-empty HTML-derived value
    /// replaces the base value.
    pub fn merge(text: CaseMetadata, html: CaseMetadata) -> CaseMetadata {
        CaseMetadata {
            case_name: prefer(html.case_name, text.case_name),
            plaintiff_name: prefer(html.plaintiff_name, text.plaintiff_name),
            defendant_name: prefer(html.defendant_name, text.defendant_name),
            citation: prefer(html.citation, text.citation),
            decision_date: prefer(html.decision_date, text.decision_date),
            judge_name: prefer(html.judge_name, text.judge_name),
            area_of_law: prefer(html.area_of_law, text.area_of_law),
            outcome: prefer(html.outcome, text.outcome),
            plaintiff_counsel: prefer(html.plaintiff_counsel, text.plaintiff_counsel),
            defendant_counsel: prefer(html.defendant_counsel, text.defendant_counsel),
        }
    }
}

fn prefer(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary.filter(|v| !v.is_empty()).or(fallback)
}

/// Everything derived from one fetched page.
pub struct PageExtraction {
    pub html: CaseMetadata,
    pub text: CaseMetadata,
    pub body: String,
}

/// HTML pass, body text, then the regex pass over the body.
pub fn extract_page(html: &str) -> PageExtraction {
    let html_meta = html_meta::extract(html);
    let body = body::extract(html);
    let text_meta = text_meta::extract(&body);
    PageExtraction {
        html: html_meta,
        text: text_meta,
        body,
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// First `max` characters of `s`.
pub(crate) fn head_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Last `max` characters of `s`.
pub(crate) fn tail_chars(s: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn area(value: Option<&str>) -> CaseMetadata {
        CaseMetadata {
            area_of_law: value.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn text_fills_missing_html_field() {
        let merged = CaseMetadata::merge(area(Some("Contract")), area(None));
        assert_eq!(merged.area_of_law.as_deref(), Some("Contract"));
    }

    #[test]
    fn html_wins_when_present() {
        let merged = CaseMetadata::merge(area(Some("Contract")), area(Some("Tort")));
        assert_eq!(merged.area_of_law.as_deref(), Some("Tort"));
    }

    #[test]
    fn empty_html_value_does_not_override() {
        let merged = CaseMetadata::merge(area(Some("Contract")), area(Some("")));
        assert_eq!(merged.area_of_law.as_deref(), Some("Contract"));
    }

    #[test]
    fn merge_is_per_field() {
        let text = CaseMetadata {
            outcome: Some(OUTCOME_ALLOWED_GRANTED.into()),
            plaintiff_counsel: Some("Mr X (Firm A".into()),
            ..Default::default()
        };
        let html = CaseMetadata {
            case_name: Some("A v B".into()),
            plaintiff_counsel: Some("Mr X (Firm A)".into()),
            ..Default::default()
        };
        let merged = CaseMetadata::merge(text, html);
        assert_eq!(merged.case_name.as_deref(), Some("A v B"));
        assert_eq!(merged.outcome.as_deref(), Some(OUTCOME_ALLOWED_GRANTED));
        assert_eq!(merged.plaintiff_counsel.as_deref(), Some("Mr X (Firm A)"));
        assert_eq!(merged.judge_name, None);
    }

    #[test]
    fn char_windows_respect_boundaries() {
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(head_chars("hi", 10), "hi");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("hi", 10), "hi");
        assert_eq!(tail_chars("hi", 0), "");
    }

    #[test]
    fn fixture_page_end_to_end() {
        let html = std::fs::read_to_string("tests/fixtures/judgment.html").unwrap();
        let page = extract_page(&html);
        let merged = CaseMetadata::merge(page.text, page.html);
        assert_eq!(merged.citation.as_deref(), Some("[2026] SGHC 21"));
        assert_eq!(merged.judge_name.as_deref(), Some("Tan Siong Thye J"));
        assert_eq!(merged.area_of_law.as_deref(), Some("Contract; Breach; Damages"));
        assert_eq!(merged.outcome.as_deref(), Some(OUTCOME_DISMISSED));
        assert_eq!(merged.plaintiff_counsel.as_deref(), Some("Mr John Doe (Alpha LLP)"));
        assert!(page.body.contains("The plaintiff sued"));
    }
}
