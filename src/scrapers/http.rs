use crate::error::ProviderError;
use crate::scrapers::traits::PageSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Plain HTTP page source
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Create an HTTP page source whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if let Some(status) = err.status() {
        ProviderError::HttpError(status.as_u16())
    } else {
        ProviderError::NetworkUnreachable(err.to_string())
    }
}

fn check_status(status: StatusCode) -> Result<(), ProviderError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ProviderError::HttpError(status.as_u16()))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        debug!("Fetching URL: {}", url);

        let response = self.client.get(url).send().await.map_err(classify)?;

        if let Err(e) = check_status(response.status()) {
            warn!(url, status = %response.status(), "Marketplace returned an error status");
            return Err(e);
        }

        let html = response.text().await.map_err(classify)?;
        debug!("Downloaded {} bytes of HTML", html.len());

        Ok(html)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
