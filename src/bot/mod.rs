use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::command;
use crate::errors::AppError;
use crate::line::{Event, ReplySender};
use crate::queue::{TaskEnvelope, TaskHandler};
use crate::search::{self, PageFetcher};

/// Turns one webhook event into at most one reply.
pub struct Bot {
    fetcher: Arc<dyn PageFetcher>,
    replier: Arc<dyn ReplySender>,
}

impl Bot {
    pub fn new(fetcher: Arc<dyn PageFetcher>, replier: Arc<dyn ReplySender>) -> Self {
        Self { fetcher, replier }
    }

    pub async fn handle_envelope(&self, envelope: &TaskEnvelope) -> Result<Option<String>, AppError> {
        let event = envelope.decode()?;
        self.handle_event(&event).await
    }

    /// Returns the reply text when a reply was sent.
    #[instrument(skip(self, event), fields(event_type = ?event.kind))]
    pub async fn handle_event(&self, event: &Event) -> Result<Option<String>, AppError> {
        info!(msg = ?event.message, "Processing event");

        let Some(text) = event.text() else {
            return Ok(None);
        };
        let Some(command) = command::parse(text) else {
            debug!("No command matched");
            return Ok(None);
        };
        let Some(reply_token) = event.reply_token.as_deref() else {
            warn!(intent = %command.intent, "Message event without reply token");
            return Ok(None);
        };

        let reply = search::build_reply(&command, self.fetcher.as_ref()).await;
        self.replier.reply_text(reply_token, &reply).await?;

        info!(intent = %command.intent, reply = %reply, "Reply sent");
        Ok(Some(reply))
    }
}

#[async_trait]
impl TaskHandler for Bot {
    async fn handle(&self, task: TaskEnvelope) -> Result<(), AppError> {
        self.handle_envelope(&task).await.map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Serves a fixed page, or fails when `body` is `None`.
    pub struct StaticFetcher {
        pub body: Option<String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, AppError> {
            self.body
                .clone()
                .ok_or(AppError::FetchTimeout(std::time::Duration::from_secs(1)))
        }
    }

    #[derive(Default)]
    pub struct RecordingReplier {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl ReplySender for RecordingReplier {
        async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::ReplyError { status: 400, body: "Invalid reply token".into() });
            }
            self.sent
                .lock()
                .unwrap()
                .push((reply_token.to_string(), text.to_string()));
            Ok(())
        }
    }

    pub fn bot(body: Option<&str>, replier: Arc<RecordingReplier>) -> Bot {
        Bot::new(
            Arc::new(StaticFetcher { body: body.map(str::to_string) }),
            replier,
        )
    }
}
