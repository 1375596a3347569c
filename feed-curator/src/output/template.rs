use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::ArticleCandidate;

/// Placeholder values for payload templates. `None` renders as "".
pub type Placeholders = BTreeMap<&'static str, Option<String>>;

pub fn placeholders(candidate: &ArticleCandidate, markdown: &str) -> Placeholders {
    BTreeMap::from([
        ("title", Some(candidate.title.clone())),
        ("link", Some(candidate.url.clone())),
        ("summary", Some(candidate.summary.clone())),
        ("published_iso", candidate.published_iso()),
        ("source_tag", Some(candidate.source_tag.clone())),
        ("content_markdown", Some(markdown.to_string())),
    ])
}

/// Substitute every known `{name}` in one pass; unknown placeholders stay
/// as written and substituted text is never rescanned.
pub fn render(template: &str, values: &Placeholders) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if values.contains_key(&after[..close]) => {
                let value = values.get(&after[..close]).and_then(|v| v.as_deref());
                out.push_str(value.unwrap_or(""));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render string templates; other JSON values pass through unchanged.
pub fn render_value(template: &Value, values: &Placeholders) -> Value {
    match template {
        Value::String(s) => Value::String(render(s, values)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> ArticleCandidate {
        ArticleCandidate {
            url: "https://example.com/a".to_string(),
            title: "Ownership".to_string(),
            summary: "About borrowing".to_string(),
            published_at: None,
            source_tag: "rust".to_string(),
        }
    }

    #[test]
    fn renders_known_and_keeps_unknown_placeholders() {
        let values = placeholders(&candidate(), "# Body");
        assert_eq!(
            render("{title} [{source_tag}] {published_iso}|{author}", &values),
            "Ownership [rust] |{author}"
        );
        assert_eq!(render("{{title}}", &values), "{Ownership}");
        assert_eq!(render_value(&json!(42), &values), json!(42));
        assert_eq!(render_value(&json!("{content_markdown}"), &values), json!("# Body"));
    }
}
