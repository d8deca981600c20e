//! Fetching the watched page.

use std::future::Future;
use std::time::Duration;

use reqwest::redirect::Policy;

use super::model::PageSnapshot;

/// User agent sent with every page request.
pub const USER_AGENT: &str = concat!("pagewatch/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Errors from fetching the page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network, TLS, timeout, or decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// URL that produced it, after redirects.
        url: String,
    },
}

/// Something that can produce a snapshot of the watched page.
pub trait PageSource {
    /// Fetches the page once. No retries.
    fn fetch(&self) -> impl Future<Output = Result<PageSnapshot, FetchError>> + Send;
}

/// Page source that GETs a URL and follows redirects.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPageSource {
    /// Builds a source for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (for
    /// example, no TLS backend is available).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PageSource for HttpPageSource {
    async fn fetch(&self) -> Result<PageSnapshot, FetchError> {
        tracing::debug!(url = %self.url, "Fetching page");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let body = response.text().await?;
        tracing::debug!(
            status = status.as_u16(),
            %final_url,
            bytes = body.len(),
            "Page fetched"
        );

        Ok(PageSnapshot::new(body, final_url))
    }
}
