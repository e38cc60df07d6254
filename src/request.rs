use std::collections::HashMap;
use std::fs;

use url::Url;

use crate::archiver::PageArchiver;
use crate::error::ArchiveError;
use crate::fetcher::{Fetch, BROWSER_USER_AGENT, DEFAULT_TIMEOUT};

/// A single outgoing request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    url: String,
    method: String,
}

/// A normalized response: status, headers as received, body text.
///
/// Header keys are stored case-sensitively, exactly as the producing layer
/// emitted them. A freshly constructed response has status 0 and an empty
/// body until somebody fills them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status_code: status,
            ..Self::default()
        }
    }
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Archives the page behind this request and wraps the saved snapshot in
    /// a response. When archiving fails, falls back to a plain bounded GET so
    /// the caller still gets a classifiable response.
    pub async fn send<F: Fetch>(&self, archiver: &PageArchiver<F>) -> HttpResponse {
        match self.send_archived(archiver).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_retryable() {
                    log::warn!(
                        "transient failure archiving {}, falling back to direct request: {}",
                        self.url,
                        err
                    );
                } else {
                    log::warn!(
                        "page archive failed for {}, falling back to direct request: {}",
                        self.url,
                        err
                    );
                }
                self.send_simple().await
            }
        }
    }

    async fn send_archived<F: Fetch>(
        &self,
        archiver: &PageArchiver<F>,
    ) -> Result<HttpResponse, ArchiveError> {
        let summary = archiver.fetch(&self.url).await?;
        let body = fs::read_to_string(&summary.index_path)
            .map_err(|e| ArchiveError::io(&summary.index_path, e))?;

        let mut response = HttpResponse::with_status(200);
        response.body = body;
        response
            .headers
            .insert("Content-Type".to_string(), "text/html".to_string());
        response.headers.insert(
            "X-Cache-Dir".to_string(),
            summary.cache_root.display().to_string(),
        );
        response.headers.insert(
            "X-Index-Path".to_string(),
            summary.index_path.display().to_string(),
        );
        // A file:// URL lets an embedding shell load the snapshot with its
        // relative resources intact.
        let absolute = summary
            .index_path
            .canonicalize()
            .unwrap_or_else(|_| summary.index_path.clone());
        if let Ok(file_url) = Url::from_file_path(&absolute) {
            response
                .headers
                .insert("X-File-URL".to_string(), file_url.to_string());
        }
        response
            .headers
            .insert("X-Fetcher".to_string(), "PageArchiver".to_string());

        log::info!("page loaded from snapshot at {}", summary.cache_root.display());
        Ok(response)
    }

    /// Plain HTTP request used when the archive path fails: the upstream
    /// status, headers, and body pass through so the classification chain
    /// can work on the real failure.
    pub async fn send_simple(&self) -> HttpResponse {
        let mut response = HttpResponse::new();

        let client = match reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(DEFAULT_TIMEOUT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                response.status_code = 500;
                response.body = format!("Error: {}", err);
                return response;
            }
        };

        let method = self
            .method
            .parse::<reqwest::Method>()
            .unwrap_or(reqwest::Method::GET);

        match client.request(method, &self.url).send().await {
            Ok(upstream) => {
                response.status_code = upstream.status().as_u16();
                for (name, value) in upstream.headers() {
                    if let Ok(text) = value.to_str() {
                        response.headers.insert(name.to_string(), text.to_string());
                    }
                }
                response.body = upstream.text().await.unwrap_or_default();
            }
            Err(err) => {
                response.status_code = 500;
                response.body = format!("Error: {}", err);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_response_has_no_status_or_body() {
        let response = HttpResponse::new();
        assert_eq!(response.status_code, 0);
        assert!(response.body.is_empty());
        assert!(response.headers.is_empty());
    }

    #[test]
    fn request_exposes_url_and_method() {
        let request = HttpRequest::new("https://example.com", "GET");
        assert_eq!(request.url(), "https://example.com");
        assert_eq!(request.method(), "GET");
    }
}
