//! HTTP transport used by the liveness filter.
//!
//! [`PageFetcher`] separates "the server answered" from "the body was read"
//! so callers can reject a page from its headers alone without paying for
//! the download.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::PipelineConfig;
use crate::error::{Result, SearchError};
use crate::http::build_liveness_client;

/// Status line and headers of a fetched page, with a deferred body.
pub struct FetchedPage {
    /// HTTP status code of the final response.
    pub status: u16,
    /// URL after redirects, when the transport reports one.
    pub final_url: Option<String>,
    /// Value of the `Content-Type` header.
    pub content_type: Option<String>,
    /// Value of the `Content-Length` header.
    pub content_length: Option<u64>,
    body: BoxFuture<'static, Result<String>>,
}

impl FetchedPage {
    /// Create a page whose body is produced by `body` when first read.
    pub fn new<F>(status: u16, body: F) -> Self
    where
        F: std::future::Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            status,
            final_url: None,
            content_type: None,
            content_length: None,
            body: body.boxed(),
        }
    }

    /// Set the post-redirect URL.
    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = Some(url.into());
        self
    }

    /// Set the `Content-Type` header.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the `Content-Length` header.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    /// Returns `true` if the content type mentions `text/html`.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }

    /// Download and decode the body.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying transport reports.
    pub async fn text(self) -> Result<String> {
        self.body.await
    }
}

impl fmt::Debug for FetchedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedPage")
            .field("status", &self.status)
            .field("final_url", &self.final_url)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Resolves a URL with a GET request, following redirects.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its status and headers.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request cannot be completed.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// [`PageFetcher`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a liveness client from `config` (timeout, User-Agent, redirects).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(build_liveness_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = async move { response.text().await.map_err(SearchError::from) };

        let mut page = FetchedPage::new(status, body).with_final_url(final_url);
        page.content_type = content_type;
        page.content_length = content_length;
        Ok(page)
    }
}
