use std::path::Path;

use tracing::{info, warn};

use crate::types::{CuratorError, Result};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

impl Cookie {
    /// Domain and path match against a request host and path.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        let host_ok = host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()));
        host_ok && path.starts_with(&self.path)
    }
}

/// Parse a Netscape/Mozilla `cookies.txt` export.
///
/// Expiry is ignored. Malformed lines are skipped.
pub fn parse_netscape_cookies(content: &str) -> Vec<Cookie> {
    content
        .lines()
        .filter_map(|line| {
            let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
                Some(rest) => rest,
                None if line.trim_start().starts_with('#') => return None,
                None => line,
            };
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 || fields[5].is_empty() {
                return None;
            }
            Some(Cookie {
                domain: fields[0].to_string(),
                path: fields[2].to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                name: fields[5].to_string(),
                value: fields[6..].join("\t"),
            })
        })
        .collect()
}

/// Read a cookie file. A missing or unreadable file is an error; a file
/// with no cookies only warns.
pub fn load_netscape_cookies(path: &Path) -> Result<Vec<Cookie>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CuratorError::Config(format!("cannot read cookie file {}: {}", path.display(), e))
    })?;
    let cookies = parse_netscape_cookies(&content);
    if cookies.is_empty() {
        warn!(
            "No cookies parsed from {}. Fetching might fail or hit paywalls.",
            path.display()
        );
    } else {
        info!("Parsed {} cookies from {}", cookies.len(), path.display());
    }
    Ok(cookies)
}

/// `Cookie` header value for a request URL, `None` when nothing applies.
pub fn cookie_header(cookies: &[Cookie], url: &url::Url) -> Option<String> {
    let host = url.host_str()?;
    let secure = url.scheme() == "https";
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| c.matches(host, url.path()) && (secure || !c.secure))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
        .medium.com\tTRUE\t/\tTRUE\t1999999999\tsid\tabc123\n\
        #HttpOnly_medium.com\tFALSE\t/\tTRUE\t0\tuid\tu-1\n\
        broken line\n\
        other.org\tFALSE\t/\tFALSE\t0\tx\ty\n";

    #[test]
    fn parses_regular_and_http_only_lines() {
        let cookies = parse_netscape_cookies(SAMPLE);
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[1].name, "uid");
        assert!(cookies[0].secure);
    }

    #[test]
    fn header_only_includes_matching_cookies() {
        let cookies = parse_netscape_cookies(SAMPLE);
        let url = url::Url::parse("https://medium.com/@a/post-1").unwrap();
        assert_eq!(cookie_header(&cookies, &url).as_deref(), Some("sid=abc123; uid=u-1"));

        let insecure = url::Url::parse("http://other.org/x").unwrap();
        assert_eq!(cookie_header(&cookies, &insecure).as_deref(), Some("x=y"));
    }
}
