use crate::error::ProviderError;
use async_trait::async_trait;

/// Anything that can turn a search URL into page markup.
/// Plain HTTP and a headless browser are the two implementations; tests use canned pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the full markup of `url`
    async fn fetch(&self, url: &str) -> Result<String, ProviderError>;

    /// Get the name of the page source
    fn name(&self) -> &'static str;
}
