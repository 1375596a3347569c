use scraper::{ElementRef, Html, Node, Selector};
use tracing::{error, warn};

/// Elements dropped from extracted content.
const EXCLUDED_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Pull the article body out of a full page.
///
/// Tries `<article>`, then the longest `<section>` whose `data-field`
/// mentions "body", then `[role=main]`; these return pruned HTML. Falls back
/// to the newline-joined text of `<body>`. `None` when there is no body.
pub fn extract_main_content(html: &str, url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(container) = find_container(&document) {
        let mut out = String::new();
        write_pruned(container, &mut out);
        return Some(out);
    }

    warn!(
        "Could not find the main article container for {}. Falling back to body text.",
        url
    );
    let body_selector = Selector::parse("body").ok()?;
    let Some(body) = document.select(&body_selector).next() else {
        error!("No body tag found for {}", url);
        return None;
    };

    let mut lines = Vec::new();
    collect_text(body, &mut lines);
    Some(lines.join("\n"))
}

fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    let article = Selector::parse("article").ok()?;
    if let Some(found) = document.select(&article).next() {
        return Some(found);
    }

    let sections = Selector::parse("section[data-field]").ok()?;
    let longest = document
        .select(&sections)
        .filter(|s| {
            s.value()
                .attr("data-field")
                .is_some_and(|v| v.to_lowercase().contains("body"))
        })
        .max_by_key(|s| s.text().map(str::len).sum::<usize>());
    if longest.is_some() {
        return longest;
    }

    let main = Selector::parse("[role=main]").ok()?;
    document.select(&main).next()
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_TAGS.contains(&name)
}

/// Serialize `element` and its subtree, skipping excluded elements and comments.
fn write_pruned(element: ElementRef<'_>, out: &mut String) {
    let tag = element.value().name();
    out.push('<');
    out.push_str(tag);
    for (name, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&tag) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape(text, false)),
            Node::Element(el) if is_excluded(el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_pruned(child_el, out);
                }
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(el) if is_excluded(el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, lines);
                }
            }
            _ => {}
        }
    }
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
