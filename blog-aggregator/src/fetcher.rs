use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{AggregatorError, FetchConfig, ParsedFeed, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| AggregatorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// One GET, no retries. Anything other than a 2xx response with a body
    /// under the size limit is a `Fetch` error naming the URL.
    pub async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let fetch_error = |reason: String| AggregatorError::Fetch {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let max_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        let too_large = |bytes: usize| {
            fetch_error(format!(
                "Feed too large: {} bytes exceeds {}MB",
                bytes, self.config.max_feed_size_mb
            ))
        };

        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_bytes {
                return Err(too_large(content_length as usize));
            }
        }

        // Chunked bodies carry no length up front, so the cap is applied as
        // the body streams in.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
        {
            if body.len() + chunk.len() > max_bytes {
                return Err(too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}

#[async_trait]
impl FeedSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let body = self.fetch_body(url).await?;
        FeedParser::parse(&body)
    }
}
