use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;

use crate::config::{FetcherKind, Settings};
use crate::error::FetchError;

/// Page source for the pipeline. One call is one attempt; retries live in
/// the pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain GET with a fixed user agent and per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

/// Rendered fetch through spider.cloud, returning the page's raw HTML.
pub struct SpiderFetcher {
    spider: Spider,
}

impl SpiderFetcher {
    pub fn new(api_key: String) -> Result<Self, FetchError> {
        let spider = Spider::new(Some(api_key))
            .map_err(|e| FetchError::Spider(format!("Failed to create Spider client: {}", e)))?;
        Ok(Self { spider })
    }
}

#[async_trait]
impl Fetcher for SpiderFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| FetchError::Spider(e.to_string()))?;

        spider_content(response).ok_or_else(|| FetchError::Empty(url.to_string()))
    }
}

/// `content` of the first page in a spider response. The API sometimes
/// returns the JSON array as a string.
fn spider_content(response: serde_json::Value) -> Option<String> {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    parsed
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
}

pub fn build_fetcher(settings: &Settings) -> Result<Arc<dyn Fetcher>> {
    match settings.fetcher {
        FetcherKind::Http => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.fetch_timeout())
                .context("Failed to build HTTP client")?;
            Ok(Arc::new(fetcher))
        }
        FetcherKind::Spider => {
            let api_key = match &settings.spider_api_key {
                Some(key) => key.clone(),
                None => std::env::var("SPIDER_API_KEY").context(
                    "spider fetcher needs spider_api_key in settings or SPIDER_API_KEY set",
                )?,
            };
            Ok(Arc::new(SpiderFetcher::new(api_key)?))
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn http_fetch_returns_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search/judgment/1")
                    .header("user-agent", "court-test");
                then.status(200).body("<html><body>ok</body></html>");
            })
            .await;

        let fetcher = HttpFetcher::new("court-test", Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch(&server.url("/search/judgment/1")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, "<html><body>ok</body></html>");
    }

    #[tokio::test]
    async fn http_error_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(503);
            })
            .await;

        let fetcher = HttpFetcher::new("court-test", Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[test]
    fn spider_content_handles_both_shapes() {
        let direct = serde_json::json!([{ "content": "<html/>", "status": 200 }]);
        assert_eq!(spider_content(direct).as_deref(), Some("<html/>"));

        let stringified = serde_json::Value::String(r#"[{"content":"<p>x</p>"}]"#.into());
        assert_eq!(spider_content(stringified).as_deref(), Some("<p>x</p>"));

        assert_eq!(spider_content(serde_json::json!([])), None);
    }
}
