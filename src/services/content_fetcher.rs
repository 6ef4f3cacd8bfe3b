use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ERROR_PREFIX;

const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const FIRECRAWL_SCRAPE_URL: &str = "https://api.firecrawl.dev/v1/scrape";
const MIN_CONTENT_CHARS: usize = 200;

/// Text pulled from a share page, plus a summary when the provider made one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub content: String,
    pub summary: Option<String>,
}

/// Retrieves the transcript behind a share link.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Content stored in place of a transcript when a fetch fails.
pub fn failure_placeholder(url: &str, error: &AppError) -> String {
    format!("{} Failed to scrape {}: {}", ERROR_PREFIX, url, error)
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    summary: Option<String>,
}

/// Fetches share pages through Firecrawl when a key is configured, otherwise
/// straight over HTTP with the page converted to plain text.
pub struct ContentFetcher {
    client: Client,
    firecrawl_api_key: Option<String>,
}

impl ContentFetcher {
    pub fn new(firecrawl_api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            firecrawl_api_key,
        })
    }

    async fn fetch_via_firecrawl(&self, url: &str, api_key: &str) -> Result<FetchedPage> {
        let request = ScrapeRequest {
            url,
            formats: vec!["markdown"],
        };

        let response = self
            .client
            .post(FIRECRAWL_SCRAPE_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!(
                "Firecrawl returned HTTP {}: {}",
                status, error_text
            )));
        }

        let scrape: ScrapeResponse = response.json().await?;
        if !scrape.success {
            return Err(AppError::Fetch(
                scrape
                    .error
                    .unwrap_or_else(|| "Firecrawl reported failure".to_string()),
            ));
        }

        let data = scrape
            .data
            .ok_or_else(|| AppError::Fetch(format!("Unexpected response format for {}", url)))?;
        let content = data
            .markdown
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| AppError::Fetch("No content to digest".to_string()))?;

        Ok(FetchedPage {
            content,
            summary: data.summary.filter(|s| !s.trim().is_empty()),
        })
    }

    async fn fetch_direct(&self, url: &str) -> Result<FetchedPage> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let response = self.client.get(url).headers(headers).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!("HTTP {}", response.status())));
        }

        let html = response.text().await?;
        let content = extract_content(&html)
            .ok_or_else(|| AppError::Fetch("No content to digest".to_string()))?;

        Ok(FetchedPage {
            content,
            summary: None,
        })
    }
}

#[async_trait]
impl Fetcher for ContentFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        Url::parse(url).map_err(|e| AppError::Fetch(format!("Invalid url {}: {}", url, e)))?;

        match &self.firecrawl_api_key {
            Some(key) => self.fetch_via_firecrawl(url, key).await,
            None => self.fetch_direct(url).await,
        }
    }
}

/// Extract readable text from HTML using html2text
fn extract_content(html: &str) -> Option<String> {
    let text = match html2text::from_read(html.as_bytes(), 80) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            return None;
        }
    };

    // Clean up the text - remove excessive whitespace
    let cleaned: String = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if cleaned.len() > MIN_CONTENT_CHARS {
        Some(cleaned)
    } else {
        tracing::debug!("Extracted content too short ({} chars)", cleaned.len());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::is_placeholder;

    #[test]
    fn extract_content_strips_markup_and_blank_lines() {
        let paragraph = "The user asked whether sourdough starters can be revived after a month in the fridge. ".repeat(4);
        let html = format!(
            "<html><body><h1>Shared chat</h1>\n\n<p>{}</p><p>   </p></body></html>",
            paragraph
        );

        let text = extract_content(&html).unwrap();
        assert!(text.contains("sourdough starters"));
        assert!(!text.contains("<p>"));
        assert!(text.lines().all(|l| !l.trim().is_empty()));
    }

    #[test]
    fn extract_content_rejects_near_empty_pages() {
        assert!(extract_content("<html><body><p>Loading...</p></body></html>").is_none());
    }

    #[test]
    fn failure_placeholder_is_recognisable() {
        let placeholder = failure_placeholder(
            "https://chatgpt.com/share/a",
            &AppError::Fetch("HTTP 404 Not Found".to_string()),
        );
        assert!(is_placeholder(&placeholder));
        assert!(placeholder.contains("https://chatgpt.com/share/a"));
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_request() {
        let fetcher = ContentFetcher::new(None, Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }
}
