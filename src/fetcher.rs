use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, LOCATION};
use reqwest::{redirect, Client, ClientBuilder, StatusCode};
use url::Url;

use crate::error::ArchiveError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const BINARY_ACCEPT: &str = "*/*";

/// Downloading seam used by the archiver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches a text resource (the root document).
    async fn fetch_text(&self, url: &str) -> Result<String, ArchiveError>;
    /// Fetches a binary resource (stylesheet, script, image, font).
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ArchiveError>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for &F {
    async fn fetch_text(&self, url: &str) -> Result<String, ArchiveError> {
        (**self).fetch_text(url).await
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ArchiveError> {
        (**self).fetch_binary(url).await
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// reqwest-backed [`Fetch`] implementation.
///
/// Redirects are followed manually so the hop count stays bounded; the
/// client itself never auto-follows.
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, ArchiveError> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    pub fn with_defaults() -> Result<Self, ArchiveError> {
        Self::new(FetcherConfig::default())
    }

    /// Issues a GET, chasing `Location` headers up to the hop limit.
    async fn get_following_redirects(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<reqwest::Response, ArchiveError> {
        let mut current = url.to_string();

        for _hop in 0..=self.max_redirects {
            let response = self
                .client
                .get(&current)
                .header(ACCEPT, accept)
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
                .send()
                .await
                .map_err(|e| ArchiveError::transport(&current, e))?;

            let status = response.status();
            if is_redirect(status) {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                {
                    // Location may be relative to the URL that redirected.
                    let next = match Url::parse(&current).and_then(|base| base.join(location)) {
                        Ok(resolved) => resolved.to_string(),
                        Err(_) => location.to_string(),
                    };
                    log::debug!("following redirect {} -> {}", current, next);
                    current = next;
                    continue;
                }
            }

            if status != StatusCode::OK {
                return Err(ArchiveError::UpstreamStatus {
                    url: current,
                    status: status.as_u16(),
                });
            }
            return Ok(response);
        }

        Err(ArchiveError::RedirectLoop {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

fn is_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY
        || status == StatusCode::FOUND
        || status == StatusCode::SEE_OTHER
        || status == StatusCode::TEMPORARY_REDIRECT
        || status == StatusCode::PERMANENT_REDIRECT
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ArchiveError> {
        let response = self.get_following_redirects(url, HTML_ACCEPT).await?;
        response
            .text()
            .await
            .map_err(|e| ArchiveError::transport(url, e))
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ArchiveError> {
        let response = self.get_following_redirects(url, BINARY_ACCEPT).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArchiveError::transport(url, e))?;
        Ok(bytes.to_vec())
    }
}
