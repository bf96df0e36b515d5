//! Document-order view over a parsed page.
//!
//! The metadata heuristics are phrased as "find the text that says X, then
//! read whatever element comes next". `Landmarks` flattens the tree into
//! pre-order so those lookups are plain index walks.

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Elements whose text never counts as page content.
const IGNORED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

enum Item<'a> {
    Element(ElementRef<'a>),
    Text {
        text: &'a str,
        parent: Option<ElementRef<'a>>,
    },
}

pub struct Landmarks<'a> {
    items: Vec<Item<'a>>,
}

impl<'a> Landmarks<'a> {
    pub fn new(doc: &'a Html) -> Self {
        let mut items = Vec::new();
        for node in doc.root_element().descendants() {
            match node.value() {
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(node) {
                        items.push(Item::Element(el));
                    }
                }
                Node::Text(text) => {
                    let parent = node.parent().and_then(ElementRef::wrap);
                    if parent.is_some_and(|p| IGNORED_TAGS.contains(&p.value().name())) {
                        continue;
                    }
                    items.push(Item::Text { text: &**text, parent });
                }
                _ => {}
            }
        }
        Self { items }
    }

    /// Index of the first text node matching `re`.
    pub fn find_text(&self, re: &Regex) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Text { text, .. } if re.is_match(text)))
    }

    /// Elements that follow `idx` in document order (descending into children).
    pub fn elements_after(&self, idx: usize) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        self.items
            .iter()
            .skip(idx + 1)
            .filter_map(|item| match item {
                Item::Element(el) => Some(*el),
                Item::Text { .. } => None,
            })
    }

    pub fn next_element(&self, idx: usize) -> Option<ElementRef<'a>> {
        self.elements_after(idx).next()
    }

    pub fn next_element_with_class(&self, idx: usize, class: &str) -> Option<ElementRef<'a>> {
        self.elements_after(idx)
            .find(|el| el.value().classes().any(|c| c == class))
    }

    /// Element directly containing the text node at `idx`.
    pub fn parent(&self, idx: usize) -> Option<ElementRef<'a>> {
        match self.items.get(idx)? {
            Item::Text { parent, .. } => *parent,
            Item::Element(el) => el.parent().and_then(ElementRef::wrap),
        }
    }

    /// All visible text nodes, trimmed, empties dropped, joined by `sep`.
    pub fn flat_text(&self, sep: &str) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Text { text, .. } => Some(text.trim()),
                Item::Element(_) => None,
            })
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Trimmed text fragments of `el` joined by `sep`.
pub fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Element text with all whitespace runs collapsed to a single space.
pub fn clean_text(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><script>var label = "Decision Date";</script></head>
        <body><table><tr><td>Decision Date</td><td> 19 January 2026 </td></tr></table>
        <div class="box"><span>first</span><p class="target">second</p></div></body></html>"#;

    #[test]
    fn script_text_is_not_a_landmark() {
        let doc = Html::parse_document(PAGE);
        let marks = Landmarks::new(&doc);
        let re = Regex::new("Decision Date").unwrap();
        let idx = marks.find_text(&re).unwrap();
        assert_eq!(marks.parent(idx).unwrap().value().name(), "td");
        assert!(!marks.flat_text(" ").contains("var label"));
    }

    #[test]
    fn next_element_follows_document_order() {
        let doc = Html::parse_document(PAGE);
        let marks = Landmarks::new(&doc);
        let idx = marks.find_text(&Regex::new("Decision Date").unwrap()).unwrap();
        let next = marks.next_element(idx).unwrap();
        assert_eq!(clean_text(next), "19 January 2026");

        let target = marks.next_element_with_class(idx, "target").unwrap();
        assert_eq!(clean_text(target), "second");

        // the div is entered before its children
        let names: Vec<_> = marks
            .elements_after(idx)
            .skip(1)
            .take(3)
            .map(|el| el.value().name().to_string())
            .collect();
        assert_eq!(names, vec!["div", "span", "p"]);
    }

    #[test]
    fn flat_text_joins_trimmed_nodes() {
        let doc = Html::parse_document("<p>  Coram  </p><p>Tan J</p><p>   </p>");
        let marks = Landmarks::new(&doc);
        assert_eq!(marks.flat_text(" "), "Coram Tan J");
        assert_eq!(marks.flat_text("\n"), "Coram\nTan J");
    }

    #[test]
    fn collapse_inline_markup() {
        let doc = Html::parse_document("<h1>Tan <i>v</i>\n  Lim</h1>");
        let marks = Landmarks::new(&doc);
        let h1 = marks.elements_after(0).find(|el| el.value().name() == "h1").unwrap();
        assert_eq!(clean_text(h1), "Tan v Lim");
        assert_eq!(joined_text(h1, "|"), "Tan|v|Lim");
    }
}
