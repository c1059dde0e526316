use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::AppError;

/// Fetches a page body as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, AppError>;
}

/// `PageFetcher` backed by a shared reqwest client with a hard timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::FetchTimeout(self.timeout)
        } else {
            AppError::HttpError(e)
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let resp = self.client.get(url).send().await.map_err(|e| self.classify(e))?;
        debug!(status = %resp.status(), "Fetched page");
        // The body is scraped regardless of status, error pages included.
        resp.text().await.map_err(|e| self.classify(e))
    }
}
