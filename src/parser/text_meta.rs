use std::sync::LazyLock;

use regex::Regex;

use super::{
    head_chars, tail_chars, CaseMetadata, OUTCOME_ALLOWED_GRANTED, OUTCOME_DISMISSED,
    OUTCOME_OTHER, UNCLASSIFIED,
};

static COUNSEL_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Counsel\s*(.*?)\s*(?:Judgment|Introduction|Background|Reasons)").unwrap()
});
static CATCHWORDS_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Catchwords\s*[:\n]\s*(.*?)\s*(?:Case|Citation|Decision|Headnote)").unwrap()
});
static PLAINTIFF_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)for the (?:plaintiff|appellant|claimant)").unwrap());
static DEFENDANT_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)for the (?:defendant|respondent)").unwrap());

/// Window searched for counsel when the text has no Counsel section.
const COUNSEL_FALLBACK_CHARS: usize = 5000;
/// The orders are at the end of a judgment.
const OUTCOME_TAIL_CHARS: usize = 2000;
const CATCHWORDS_MAX_CHARS: usize = 100;

/// Regex pass over the judgment body: counsel, area of law and outcome.
/// Never fails; outcome is always set.
pub fn extract(text: &str) -> CaseMetadata {
    let (plaintiff_counsel, defendant_counsel) = counsel(text);
    CaseMetadata {
        area_of_law: Some(area_of_law(text)),
        outcome: Some(outcome(text).to_string()),
        plaintiff_counsel,
        defendant_counsel,
        ..Default::default()
    }
}

fn counsel(text: &str) -> (Option<String>, Option<String>) {
    let scope = match COUNSEL_SECTION_RE.captures(text).and_then(|c| c.get(1)) {
        Some(section) => section.as_str().trim(),
        None => head_chars(text, COUNSEL_FALLBACK_CHARS),
    };
    (
        names_before(scope, &PLAINTIFF_PHRASE_RE),
        names_before(scope, &DEFENDANT_PHRASE_RE),
    )
}

/// For every role phrase, the text back to the previous `;`, newline or `.`.
fn names_before(scope: &str, phrase: &Regex) -> Option<String> {
    let names: Vec<&str> = phrase
        .find_iter(scope)
        .map(|m| {
            let preceding = &scope[..m.start()];
            let start = preceding
                .rfind(|c: char| matches!(c, ';' | '\n' | '.'))
                .map_or(0, |i| i + 1);
            preceding[start..]
                .trim()
                .trim_end_matches(|c: char| matches!(c, '(' | ')' | ','))
        })
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join("; "))
    }
}

fn area_of_law(text: &str) -> String {
    match CATCHWORDS_SECTION_RE.captures(text).and_then(|c| c.get(1)) {
        Some(section) => {
            let first_line = section.as_str().trim().lines().next().unwrap_or_default();
            head_chars(first_line, CATCHWORDS_MAX_CHARS).to_string()
        }
        None => UNCLASSIFIED.to_string(),
    }
}

fn outcome(text: &str) -> &'static str {
    let tail = tail_chars(text, OUTCOME_TAIL_CHARS).to_lowercase();
    if tail.contains("dismissed") {
        OUTCOME_DISMISSED
    } else if tail.contains("allowed") || tail.contains("granted") {
        OUTCOME_ALLOWED_GRANTED
    } else {
        OUTCOME_OTHER
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counsel_section_split_by_role() {
        let text = "Coram Tan J\nCounsel\nMr X (Firm A) for the plaintiff; Ms Y (Firm B) for the defendant.\nJudgment\n1 Facts.";
        let m = extract(text);
        // trailing brackets are stripped with the rest of the punctuation
        assert_eq!(m.plaintiff_counsel.as_deref(), Some("Mr X (Firm A"));
        assert_eq!(m.defendant_counsel.as_deref(), Some("Ms Y (Firm B"));
    }

    #[test]
    fn counsel_multiple_per_side() {
        let text = "Counsel\nA and B (Firm) for the appellants;\nC for the appellant; D (Firm), for the respondent. Introduction";
        let m = extract(text);
        assert_eq!(m.plaintiff_counsel.as_deref(), Some("A and B (Firm; C"));
        assert_eq!(m.defendant_counsel.as_deref(), Some("D (Firm"));
    }

    #[test]
    fn counsel_scans_head_without_section() {
        let text = "Mr Lim for the claimant. Mr Goh for the respondent. Rest of judgment";
        let m = extract(text);
        assert_eq!(m.plaintiff_counsel.as_deref(), Some("Mr Lim"));
        assert_eq!(m.defendant_counsel.as_deref(), Some("Mr Goh"));
    }

    #[test]
    fn counsel_outside_fallback_window_is_ignored() {
        let text = format!("{}\nMr Lim for the plaintiff", "x".repeat(6000));
        let m = extract(&text);
        assert_eq!(m.plaintiff_counsel, None);
        assert_eq!(m.defendant_counsel, None);
    }

    #[test]
    fn catchwords_first_line() {
        let text = "Catchwords:\nTort - Negligence\nDamages - Quantum\nCase Number: 12";
        assert_eq!(extract(text).area_of_law.as_deref(), Some("Tort - Negligence"));
    }

    #[test]
    fn catchwords_truncated() {
        let text = format!("Catchwords: {}\nCitation", "Contract ".repeat(20));
        let area = extract(&text).area_of_law.unwrap();
        assert_eq!(area.chars().count(), 100);
    }

    #[test]
    fn missing_catchwords_unclassified() {
        assert_eq!(extract("Judgment text").area_of_law.as_deref(), Some(UNCLASSIFIED));
    }

    #[test]
    fn outcome_from_tail() {
        assert_eq!(extract("The appeal is DISMISSED.").outcome.as_deref(), Some(OUTCOME_DISMISSED));
        assert_eq!(
            extract("Leave is granted.").outcome.as_deref(),
            Some(OUTCOME_ALLOWED_GRANTED)
        );
        assert_eq!(
            extract("Appeal allowed; the application was dismissed below.").outcome.as_deref(),
            Some(OUTCOME_DISMISSED)
        );
        assert_eq!(extract("Judgment reserved.").outcome.as_deref(), Some(OUTCOME_OTHER));
    }

    #[test]
    fn outcome_ignores_early_text() {
        let text = format!("The earlier suit was dismissed. {} Appeal allowed.", "x".repeat(2500));
        assert_eq!(extract(&text).outcome.as_deref(), Some(OUTCOME_ALLOWED_GRANTED));
    }

    #[test]
    fn outcome_always_set() {
        for text in ["", "a", "ünïcödé", "\n\n"] {
            assert!(extract(text).outcome.is_some());
        }
    }

    #[test]
    fn fixture_body() {
        let html = std::fs::read_to_string("tests/fixtures/judgment.html").unwrap();
        let body = super::super::body::extract(&html);
        let m = extract(&body);
        assert_eq!(m.plaintiff_counsel.as_deref(), Some("Mr John Doe (Alpha LLP"));
        assert_eq!(m.defendant_counsel.as_deref(), Some("Ms Jane Roe (Beta Chambers"));
        assert_eq!(m.area_of_law.as_deref(), Some("Contract — Breach of contract — Damages"));
        assert_eq!(m.outcome.as_deref(), Some(OUTCOME_DISMISSED));
        assert_eq!(m.case_name, None);
    }
}
