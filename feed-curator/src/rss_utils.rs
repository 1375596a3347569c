/// Feed URL helpers
pub mod url {
    use url::Url;

    pub const UNKNOWN_SOURCE: &str = "unknown_source";

    /// Derive a short source label from a feed URL path.
    ///
    /// `/feed/tag/rust` -> `rust`, `/feed/@alice` -> `alice`,
    /// `/feed/<pub>` and `/publication/<pub>` -> `<pub>`, anything else
    /// falls back to the last path segment.
    pub fn source_tag_from_feed_url(url_str: &str) -> String {
        let Ok(url) = Url::parse(url_str) else {
            return UNKNOWN_SOURCE.to_string();
        };
        let parts: Vec<&str> = url.path().split('/').filter(|p| !p.is_empty()).collect();

        match parts.as_slice() {
            [] => UNKNOWN_SOURCE.to_string(),
            [only] => (*only).to_string(),
            [.., "feed", last] if last.starts_with('@') => last[1..].to_string(),
            [.., _, last] => (*last).to_string(),
        }
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Character-based text helpers
pub mod text {
    /// Cut `s` to at most `limit` characters; the flag reports whether anything was cut.
    pub fn truncate_chars(s: &str, limit: usize) -> (&str, bool) {
        match s.char_indices().nth(limit) {
            Some((byte_idx, _)) => (&s[..byte_idx], true),
            None => (s, false),
        }
    }

    pub fn collapse_whitespace(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Feed entry content helpers
pub mod feed {
    use scraper::Html;

    /// Extract clean text content from an HTML snippet, text nodes joined by a space
    pub fn extract_text_from_html(html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        fragment
            .root_element()
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::feed::extract_text_from_html;
    use super::text::truncate_chars;
    use super::url::source_tag_from_feed_url;

    #[test]
    fn source_tags_follow_path_shape() {
        assert_eq!(source_tag_from_feed_url("https://medium.com/feed/tag/rust"), "rust");
        assert_eq!(source_tag_from_feed_url("https://medium.com/feed/@alice"), "alice");
        assert_eq!(source_tag_from_feed_url("https://medium.com/feed/better-programming"), "better-programming");
        assert_eq!(source_tag_from_feed_url("https://medium.com/publication/towards"), "towards");
        assert_eq!(source_tag_from_feed_url("https://example.com/blog/posts/rss"), "rss");
        assert_eq!(source_tag_from_feed_url("https://example.com/rss"), "rss");
        assert_eq!(source_tag_from_feed_url("https://example.com/"), "unknown_source");
        assert_eq!(source_tag_from_feed_url("not a url"), "unknown_source");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo", 3), ("hél", true));
        assert_eq!(truncate_chars("abc", 3), ("abc", false));
    }

    #[test]
    fn html_is_stripped_to_spaced_text() {
        assert_eq!(
            extract_text_from_html("<p>Hello <b>world</b></p><p>again</p>"),
            "Hello world again"
        );
        assert_eq!(extract_text_from_html(""), "");
    }
}
