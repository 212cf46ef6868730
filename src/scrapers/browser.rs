use crate::error::ProviderError;
use crate::scrapers::kleinanzeigen::CONTAINER_SELECTOR;
use crate::scrapers::traits::PageSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browser-based page source using headless Chrome.
/// Needed when the result list is only rendered client-side.
pub struct BrowserPageSource {
    browser: Arc<Browser>,
    navigation_timeout: Duration,
    render_wait: Duration,
}

impl BrowserPageSource {
    /// Launch headless Chrome. `render_wait` bounds how long we wait for the result list.
    pub fn new(navigation_timeout: Duration, render_wait: Duration) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser: Arc::new(browser),
            navigation_timeout,
            render_wait,
        })
    }

    fn load(
        browser: &Browser,
        url: &str,
        navigation_timeout: Duration,
        render_wait: Duration,
    ) -> Result<String, ProviderError> {
        let tab = TabGuard(browser.new_tab().map_err(classify)?);
        tab.0.set_default_timeout(navigation_timeout);

        tab.0
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(classify)?;

        // Dismiss the consent banner if present
        let _ = tab.0.evaluate(
            r#"
            const button = document.querySelector('#gdpr-banner-accept');
            if (button) button.click();
            "#,
            false,
        );

        if let Err(e) = tab
            .0
            .wait_for_element_with_custom_timeout(CONTAINER_SELECTOR, render_wait)
        {
            warn!(url, error = %e, "Listing container never appeared");
            return Err(ProviderError::BlockedOrEmpty);
        }

        let html = tab.0.get_content().map_err(classify)?;
        debug!("Captured {} bytes of rendered HTML", html.len());

        Ok(html)
    }
}

/// Closes the tab on every exit path
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            debug!(error = %e, "Could not close browser tab");
        }
    }
}

fn classify(e: anyhow::Error) -> ProviderError {
    if e.downcast_ref::<Timeout>().is_some() {
        return ProviderError::Timeout;
    }

    let timed_out = e.chain().any(|cause| {
        let text = cause.to_string().to_lowercase();
        text.contains("timed out") || text.contains("timeout")
    });
    if timed_out {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkUnreachable(e.to_string())
    }
}

#[async_trait]
impl PageSource for BrowserPageSource {
    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let browser = Arc::clone(&self.browser);
        let url = url.to_string();
        let navigation_timeout = self.navigation_timeout;
        let render_wait = self.render_wait;

        tokio::task::spawn_blocking(move || {
            Self::load(&browser, &url, navigation_timeout, render_wait)
        })
        .await
        .map_err(|e| ProviderError::NetworkUnreachable(format!("browser task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
