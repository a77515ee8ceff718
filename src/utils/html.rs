// src/utils/html.rs

//! Text helpers over parsed HTML documents.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements that start a new visual line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "ul",
];

/// Elements whose text is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Parse a CSS selector that is known at compile time.
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-collapsed text of the first element matching `css`.
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

/// Visible text of the document split into trimmed, non-empty lines.
///
/// Block elements break lines; inline markup inside a block stays on one line,
/// so `<b>SS</b> 123456` reads as `SS 123456`.
pub fn visible_lines(document: &Html) -> Vec<String> {
    let mut buffer = String::new();
    walk(document.root_element(), &mut buffer);
    buffer
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
            }
            _ => {}
        }
    }

    if is_block {
        out.push('\n');
    }
}

/// `href` attributes of every anchor, paired with the anchor text.
pub fn anchors(document: &Html) -> Vec<(String, String)> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text = collapse_whitespace(&a.text().collect::<String>());
            Some((href.to_string(), text))
        })
        .collect()
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_lines_break_on_blocks() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head>
            <body><h1>Heading</h1><p>1st Prize Rs :10000000/-</p>
            <table><tr><td><b>SS</b> 123456</td><td>(KOTTAYAM)</td></tr></table>
            <script>var x = 1;</script></body></html>"#;
        let doc = Html::parse_document(html);
        let lines = visible_lines(&doc);
        assert_eq!(
            lines,
            vec!["Heading", "1st Prize Rs :10000000/-", "SS 123456", "(KOTTAYAM)"]
        );
    }

    #[test]
    fn test_plain_text_keeps_lines() {
        let doc = Html::parse_document("Title: Result\n\n1st Prize\nSS 123456\n");
        assert_eq!(visible_lines(&doc), vec!["Title: Result", "1st Prize", "SS 123456"]);
    }

    #[test]
    fn test_first_text_skips_empty() {
        let doc = Html::parse_document("<h2> </h2><h2>  Second   heading </h2>");
        assert_eq!(first_text(&doc, "h2"), Some("Second heading".to_string()));
        assert_eq!(first_text(&doc, "h1"), None);
    }

    #[test]
    fn test_anchors() {
        let doc = Html::parse_document(
            r#"<a href="/a">One</a><a href="">Empty</a><a>No href</a><a href="b.pdf"> Two </a>"#,
        );
        assert_eq!(
            anchors(&doc),
            vec![
                ("/a".to_string(), "One".to_string()),
                ("b.pdf".to_string(), "Two".to_string())
            ]
        );
    }
}
