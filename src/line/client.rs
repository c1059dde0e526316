use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::errors::AppError;

const REPLY_TIMEOUT_SECS: u64 = 10;
const ERROR_BODY_EXCERPT: usize = 200;

/// Sends a single text reply keyed to a webhook reply token.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<OutgoingMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutgoingMessage<'a> {
    Text { text: &'a str },
}

/// Client for the LINE reply endpoint.
#[derive(Clone)]
pub struct LineClient {
    client: Client,
    api_base: String,
    channel_token: String,
}

impl LineClient {
    pub fn new(api_base: &str, channel_token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REPLY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            channel_token: channel_token.to_string(),
        })
    }

    fn reply_endpoint(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base)
    }
}

#[async_trait]
impl ReplySender for LineClient {
    #[instrument(skip(self, text))]
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), AppError> {
        let body = ReplyRequest {
            reply_token,
            messages: vec![OutgoingMessage::Text { text }],
        };

        let resp = self
            .client
            .post(self.reply_endpoint())
            .bearer_auth(&self.channel_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::ReplyError {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }

        debug!(status = %status, "Reply delivered");
        Ok(())
    }
}
