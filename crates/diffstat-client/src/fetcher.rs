use std::time::Duration;

use diffstat_core::error::AppError;
use diffstat_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::{ParseError, Url};

/// HTTP fetcher using reqwest.
///
/// Downloads pull-request pages with a configurable User-Agent and timeout.
/// Listing pages link to pull requests by path (`/owner/repo/pull/7`), so
/// relative locators are resolved against a base URL; absolute locators are
/// fetched as-is.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    base_url: Option<Url>,
    token: Option<String>,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

        let client = Client::builder()
            .user_agent("diffstat/0.3 (PR listing enricher)")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            base_url: None,
            token: None,
        })
    }

    /// Resolve relative locators against `base`.
    pub fn with_base_url(mut self, base: &str) -> Result<Self, AppError> {
        let url = Url::parse(base)
            .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{base}': {e}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Turn a locator into an absolute URL.
    pub fn resolve(&self, locator: &str) -> Result<Url, AppError> {
        match Url::parse(locator) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    AppError::HttpError(format!(
                        "Relative locator '{locator}' with no base URL configured"
                    ))
                })?;
                base.join(locator)
                    .map_err(|e| AppError::HttpError(format!("Invalid locator '{locator}': {e}")))
            }
            Err(e) => Err(AppError::HttpError(format!(
                "Invalid locator '{locator}': {e}"
            ))),
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, locator: &str) -> Result<String, AppError> {
        let url = self.resolve(locator)?;

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}
