use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::dom::{self, Landmarks};
use super::{non_empty, CaseMetadata, OUTCOME_ALLOWED, OUTCOME_DISMISSED, UNCLASSIFIED};

static TITLE_SELECTORS: LazyLock<[Selector; 3]> =
    LazyLock::new(|| ["h1", ".caseTitle", ".title"].map(|s| Selector::parse(s).unwrap()));
static HEADNOTE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".headnote").unwrap());
static TOPIC_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".lr_cw").unwrap());

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d{4}\]\s+[A-Z]+\s+\d+").unwrap());
static DECISION_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Decision Date").unwrap());
static CORAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Coram\s+(.*?)\s+(?:Counsel|Parties|Judgment|Introduction|\[)").unwrap()
});
static CORAM_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Coram|Before").unwrap());
static COUNSEL_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Representation|Counsel").unwrap());
static LEGAL_TOPICS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Legal Topics").unwrap());
static CATCHWORDS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Catchwords").unwrap());

static PLAINTIFF_ROLE: LazyLock<Role> = LazyLock::new(|| Role::new("plaintiff|appellant|claimant"));
static DEFENDANT_ROLE: LazyLock<Role> = LazyLock::new(|| Role::new("defendant|respondent"));

const PARTY_SEPARATOR: &str = " v ";
const TOPIC_CONTAINER_CLASS: &str = "lr_sec_content";
const MAX_TOPICS: usize = 10;
const TOPIC_TEXT_MAX_CHARS: usize = 200;
const TOPIC_WALK_LIMIT: usize = 5;
const CATCHWORDS_MAX_CHARS: usize = 100;

/// Matches a counsel fragment for one side and strips the role wording off it.
struct Role {
    mention: Regex,
    tail: Regex,
}

impl Role {
    fn new(alternatives: &str) -> Self {
        Role {
            mention: Regex::new(&format!("(?i){}", alternatives)).unwrap(),
            tail: Regex::new(&format!(r"(?i)(?:for|appearing)?\s*(?:the)?\s*(?:{}).*", alternatives))
                .unwrap(),
        }
    }

    /// Names from every `;`/`.` fragment of `block` that mentions this role.
    fn names(&self, block: &str) -> Option<String> {
        let names: Vec<String> = block
            .split(|c: char| c == ';' || c == '.')
            .filter(|fragment| self.mention.is_match(fragment))
            .map(|fragment| self.tail.replace_all(fragment, "").trim().to_string())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join("; "))
        }
    }
}

/// Metadata recoverable from the page markup. Never fails; a field whose
/// landmark is missing is left `None`.
pub fn extract(html: &str) -> CaseMetadata {
    let doc = Html::parse_document(html);
    let marks = Landmarks::new(&doc);
    let flat = marks.flat_text(" ");

    let case_name = case_name(&doc);
    let (plaintiff_name, defendant_name) = parties(case_name.as_deref());
    let (plaintiff_counsel, defendant_counsel) = counsel(&marks);

    CaseMetadata {
        case_name,
        plaintiff_name,
        defendant_name,
        citation: CITATION_RE.find(&flat).map(|m| m.as_str().to_string()),
        decision_date: decision_date(&marks),
        judge_name: judge(&marks, &flat),
        area_of_law: area_of_law(&marks),
        outcome: headnote_outcome(&doc),
        plaintiff_counsel,
        defendant_counsel,
    }
}

fn case_name(doc: &Html) -> Option<String> {
    let title = TITLE_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())?;
    non_empty(dom::clean_text(title))
}

fn parties(case_name: Option<&str>) -> (Option<String>, Option<String>) {
    match case_name.and_then(|name| name.split_once(PARTY_SEPARATOR)) {
        Some((plaintiff, defendant)) => (
            Some(plaintiff.trim().to_string()),
            Some(defendant.trim().to_string()),
        ),
        None => (None, None),
    }
}

fn decision_date(marks: &Landmarks) -> Option<String> {
    let idx = marks.find_text(&DECISION_DATE_RE)?;
    let date = match marks.next_element(idx) {
        Some(el) => dom::clean_text(el),
        None => marks.parent(idx).map(dom::clean_text).unwrap_or_default(),
    };
    non_empty(date)
}

fn judge(marks: &Landmarks, flat: &str) -> Option<String> {
    if let Some(caps) = CORAM_RE.captures(flat) {
        return non_empty(caps[1].trim().to_string());
    }
    let idx = marks.find_text(&CORAM_LABEL_RE)?;
    marks
        .next_element(idx)
        .map(dom::clean_text)
        .and_then(non_empty)
}

fn counsel(marks: &Landmarks) -> (Option<String>, Option<String>) {
    let Some(idx) = marks.find_text(&COUNSEL_LABEL_RE) else {
        return (None, None);
    };
    let block = match marks.next_element(idx) {
        Some(el) => dom::joined_text(el, " "),
        None => marks
            .parent(idx)
            .map(|el| dom::joined_text(el, " "))
            .unwrap_or_default(),
    };
    (PLAINTIFF_ROLE.names(&block), DEFENDANT_ROLE.names(&block))
}

/// Legal Topics section first, then Catchwords, then the placeholder.
fn area_of_law(marks: &Landmarks) -> Option<String> {
    if let Some(idx) = marks.find_text(&LEGAL_TOPICS_RE) {
        return Some(legal_topics(marks, idx));
    }
    if let Some(idx) = marks.find_text(&CATCHWORDS_RE) {
        let text = marks
            .next_element(idx)
            .map(|el| dom::joined_text(el, " "))
            .unwrap_or_default();
        let head = text.split('-').next().unwrap_or_default().trim();
        return non_empty(super::head_chars(head, CATCHWORDS_MAX_CHARS).to_string());
    }
    Some(UNCLASSIFIED.to_string())
}

fn legal_topics(marks: &Landmarks, idx: usize) -> String {
    if let Some(container) = marks.next_element_with_class(idx, TOPIC_CONTAINER_CLASS) {
        let mut seen = HashSet::new();
        let topics: Vec<String> = container
            .select(&TOPIC_SEL)
            .map(dom::clean_text)
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .take(MAX_TOPICS)
            .collect();
        if !topics.is_empty() {
            return topics.join("; ");
        }
        let text = dom::joined_text(container, " ");
        return super::head_chars(&text, TOPIC_TEXT_MAX_CHARS).to_string();
    }

    // No content container: read the next few elements until the section ends.
    let mut topics = Vec::new();
    for el in marks.elements_after(idx).take(TOPIC_WALK_LIMIT) {
        let text = dom::clean_text(el);
        if text.contains("Judgments") || text.contains("Case Details") {
            break;
        }
        if text.chars().count() > 2 {
            topics.push(text);
        }
    }
    if topics.is_empty() {
        UNCLASSIFIED.to_string()
    } else {
        topics.join("; ")
    }
}

fn headnote_outcome(doc: &Html) -> Option<String> {
    let headnote = doc.select(&HEADNOTE_SEL).next()?;
    let text = headnote.text().collect::<String>().to_lowercase();
    if text.contains("dismissed") {
        Some(OUTCOME_DISMISSED.to_string())
    } else if text.contains("allowed") {
        Some(OUTCOME_ALLOWED.to_string())
    } else {
        None
    }
}

// ── Tests ──
