//! Main judgment text.
//!
//! Text-block density picks the container that holds the judgment; when no
//! block is long enough, the container with the most visible text wins. Its
//! outermost block elements become lines, or its text nodes when it has no
//! blocks. Navigation, page chrome and tables never contribute. When nothing
//! scores, every visible text node of the page is returned instead.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;

use super::dom::{self, Landmarks};

static TEXT_BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, div, section").unwrap());
static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, main, section, div, body").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote, pre, dd, dt").unwrap()
});

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "dd", "dt",
];
/// Elements that break a `div` into separate text blocks.
const STRUCTURAL_TAGS: &[&str] = &[
    "article", "main", "section", "div", "ul", "ol", "dl", "table", "nav", "header",
    "footer", "aside", "form",
];
const EXCLUDED_TAGS: &[&str] = &[
    "table", "script", "style", "noscript", "template", "nav", "header", "footer", "aside",
    "form", "iframe", "svg", "button", "select",
];
const BOILERPLATE_MARKERS: &[&str] = &[
    "nav", "menu", "sidebar", "footer", "banner", "cookie", "consent", "breadcrumb", "advert",
    "promo", "subscribe", "newsletter",
];

/// Blocks shorter than this are captions or labels, not judgment prose.
const MIN_BLOCK_CHARS: i64 = 25;

pub fn extract(html: &str) -> String {
    let doc = Html::parse_document(html);
    if let Some(text) = main_content(&doc).filter(|t| !t.trim().is_empty()) {
        return text;
    }
    warn!("Main-content extraction returned no text, using raw page text");
    Landmarks::new(&doc).flat_text("\n")
}

fn main_content(doc: &Html) -> Option<String> {
    let root = densest_container(doc).or_else(|| longest_container(doc))?;
    let mut lines: Vec<String> = root
        .select(&BLOCK_SEL)
        .filter(|el| is_outermost_block(*el, root))
        .map(dom::clean_text)
        .filter(|t| !t.is_empty())
        .collect();
    if lines.is_empty() {
        lines = loose_lines(root);
    }
    Some(lines.join("\n"))
}

/// Each text block credits its parent fully and its grandparent by half.
fn densest_container(doc: &Html) -> Option<ElementRef<'_>> {
    let mut scores: Vec<(ElementRef<'_>, i64)> = Vec::new();

    for block in doc.select(&TEXT_BLOCK_SEL) {
        if !is_text_block(block) || is_hidden(block) {
            continue;
        }
        let chars = text_chars(block) - 2 * block.select(&LINK_SEL).map(text_chars).sum::<i64>();
        if chars < MIN_BLOCK_CHARS {
            continue;
        }
        let parent = block.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|el| el.parent()).and_then(ElementRef::wrap);
        credit(&mut scores, parent, chars);
        credit(&mut scores, grandparent, chars / 2);
    }

    let mut best: Option<(ElementRef<'_>, i64)> = None;
    for (el, score) in scores {
        let score = score + tag_bonus(el);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((el, score));
        }
    }
    best.map(|(el, _)| el)
}

/// Visible text length less twice the link text. Descendants follow their
/// ancestors in document order, so `>=` hands ties to the deepest element.
fn longest_container(doc: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(ElementRef<'_>, i64)> = None;
    for el in doc.select(&CONTAINER_SEL) {
        if is_hidden(el) {
            continue;
        }
        let mut score = 0;
        for (text, in_link) in visible_texts(el) {
            let chars = text.trim().chars().count() as i64;
            score += if in_link { -chars } else { chars };
        }
        if score > 0 && best.map_or(true, |(_, top)| score >= top) {
            best = Some((el, score));
        }
    }
    best.map(|(el, _)| el)
}

fn credit<'a>(scores: &mut Vec<(ElementRef<'a>, i64)>, el: Option<ElementRef<'a>>, points: i64) {
    let Some(el) = el else { return };
    match scores.iter_mut().find(|(seen, _)| seen.id() == el.id()) {
        Some((_, score)) => *score += points,
        None => scores.push((el, points)),
    }
}

fn tag_bonus(el: ElementRef<'_>) -> i64 {
    match el.value().name() {
        "article" => 200,
        "main" => 100,
        _ => 0,
    }
}

/// A `p`, or a `div`/`section` holding only inline content.
fn is_text_block(el: ElementRef<'_>) -> bool {
    if el.value().name() == "p" {
        return true;
    }
    !el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| {
            let name = d.value().name();
            BLOCK_TAGS.contains(&name) || STRUCTURAL_TAGS.contains(&name)
        })
}

fn is_excluded(el: ElementRef<'_>) -> bool {
    EXCLUDED_TAGS.contains(&el.value().name()) || is_boilerplate(el)
}

/// `el` or one of its ancestors is excluded.
fn is_hidden(el: ElementRef<'_>) -> bool {
    is_excluded(el) || el.ancestors().filter_map(ElementRef::wrap).any(is_excluded)
}

fn is_boilerplate(el: ElementRef<'_>) -> bool {
    let value = el.value();
    let mut marker = value.classes().collect::<Vec<_>>().join(" ");
    if let Some(id) = value.id() {
        marker.push(' ');
        marker.push_str(id);
    }
    let marker = marker.to_ascii_lowercase();
    BOILERPLATE_MARKERS.iter().any(|m| marker.contains(m))
}

/// True when no ancestor between `el` and `root` is excluded or itself a block.
fn is_outermost_block(el: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    for ancestor in el.ancestors() {
        if ancestor.id() == root.id() {
            return true;
        }
        if let Some(anc) = ElementRef::wrap(ancestor) {
            if is_excluded(anc) || BLOCK_TAGS.contains(&anc.value().name()) {
                return false;
            }
        }
    }
    true
}

/// Text nodes under `root` with no excluded element between them and `root`,
/// flagged when they sit inside a link.
fn visible_texts<'a>(root: ElementRef<'a>) -> impl Iterator<Item = (&'a str, bool)> + 'a {
    root.descendants().filter_map(move |node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let mut in_link = false;
        for anc in node
            .ancestors()
            .take_while(|anc| anc.id() != root.id())
            .filter_map(ElementRef::wrap)
        {
            if is_excluded(anc) {
                return None;
            }
            in_link |= anc.value().name() == "a";
        }
        Some((&**text, in_link))
    })
}

/// Container text when it has no block children, one text node per line.
fn loose_lines(root: ElementRef<'_>) -> Vec<String> {
    visible_texts(root)
        .map(|(text, _)| text.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn text_chars(el: ElementRef<'_>) -> i64 {
    el.text().map(|t| t.chars().count() as i64).sum()
}

// ── Tests ──
