use crate::config::FetchSettings;
use crate::cookies::{cookie_header, load_netscape_cookies};
use crate::extract::extract_main_content;
use crate::traits::ContentSource;
use crate::types::{CuratorError, FetchResult, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, DNT, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, Proxy};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub const FEED_USER_AGENT: &str = "feed-curator/0.1";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

fn build_client(user_agent: &str, settings: &FetchSettings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10));

    // Environment proxies are already folded into `settings.proxy`
    match &settings.proxy {
        Some(proxy) => {
            info!("Using proxy for fetching: {}", proxy);
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        None => builder = builder.no_proxy(),
    }

    Ok(builder.build()?)
}

/// Downloads raw feed documents.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(FEED_USER_AGENT, settings)?,
        })
    }

    /// Never errors; failures are reported through `FetchResult::error`.
    pub async fn fetch_feed(&self, url: &str) -> FetchResult {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let failed = |error: String, http_status: Option<u16>| FetchResult {
            url: url.to_string(),
            success: false,
            error: Some(error),
            response_time_ms: start_time.elapsed().as_millis() as u64,
            http_status,
            content: None,
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return failed(e.to_string(), None),
        };

        let status = response.status();
        if !status.is_success() {
            return failed(
                format!("HTTP {}: {}", status, status.canonical_reason().unwrap_or("Unknown")),
                Some(status.as_u16()),
            );
        }

        match response.text().await {
            Ok(content) => {
                info!("Successfully fetched feed: {} ({} bytes)", url, content.len());
                FetchResult {
                    url: url.to_string(),
                    success: true,
                    error: None,
                    response_time_ms: start_time.elapsed().as_millis() as u64,
                    http_status: Some(status.as_u16()),
                    content: Some(content),
                }
            }
            Err(e) => failed(e.to_string(), Some(status.as_u16())),
        }
    }
}

/// Fetches article pages with the user's session cookies and extracts the
/// main content.
pub struct ContentFetcher {
    client: Client,
    cookie_file: PathBuf,
}

impl ContentFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let cookie_file = settings
            .cookie_file
            .clone()
            .ok_or_else(|| CuratorError::Config("missing 'cookie_file' in [fetch]".to_string()))?;
        let user_agent = settings.user_agent.as_deref().unwrap_or(BROWSER_USER_AGENT);

        Ok(Self {
            client: build_client(user_agent, settings)?,
            cookie_file,
        })
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers
    }

    /// Full page HTML, or an error describing why it could not be fetched.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        let cookies = load_netscape_cookies(&self.cookie_file)?;

        let mut headers = Self::browser_headers();
        if let Some(value) = cookie_header(&cookies, &parsed) {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => warn!("Cookie header for {} is not a valid header value: {}", url, e),
            }
        }

        debug!("Fetching full content for {}", url);
        let response = self.client.get(parsed).headers(headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CuratorError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let html = response.text().await?;
        if looks_paywalled(&html) {
            warn!(
                "Potential paywall for {}. Cookies might be invalid, expired, or lack permissions.",
                url
            );
        }
        info!("Fetched HTML for {} ({} bytes)", url, html.len());
        Ok(html)
    }
}

pub fn looks_paywalled(html: &str) -> bool {
    html.contains("Member-only story") && html.contains("Upgrade") && html.contains("membership")
}

#[async_trait]
impl ContentSource for ContentFetcher {
    async fn fetch_content(&self, url: &str) -> Option<String> {
        let html = match self.fetch_page(url).await {
            Ok(html) => html,
            Err(CuratorError::Http(e)) if e.is_timeout() => {
                error!("Timeout fetching full content for {}", url);
                return None;
            }
            Err(e) => {
                error!("Failed to fetch full content for {}: {}", url, e);
                return None;
            }
        };

        let extracted = extract_main_content(&html, url).filter(|c| !c.trim().is_empty());
        match &extracted {
            Some(content) => info!(
                "Extracted main content for {} (~{} chars)",
                url,
                content.chars().count()
            ),
            None => error!("Failed to extract main content for {}", url),
        }
        extracted
    }
}
