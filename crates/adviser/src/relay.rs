use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

use crate::assistants::base::AssistantApi;
use crate::assistants::types::{Run, RunStatus};
use crate::errors::{RelayError, RelayResult};
use crate::models::message::{validate_transcript, ChatMessage};
use crate::streamable::{streamable_value, OutputStream, StreamWriter};

/// Anything that turns a transcript into a stream of reply fragments.
///
/// The chat surface only depends on this, so the relay can be local, remote
/// over HTTP, or scripted in tests.
#[async_trait]
pub trait MessageStreamer: Send + Sync {
    async fn stream_message(&self, messages: Vec<ChatMessage>) -> RelayResult<OutputStream>;
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Identity of the pre-registered assistant every run targets
    pub assistant_id: String,
    pub poll_interval: Duration,
    /// Upper bound on how long a run may stay non-terminal. `None` waits forever.
    pub run_timeout: Option<Duration>,
    /// Delete the remote thread once the reply has been read
    pub cleanup_threads: bool,
}

impl RelayConfig {
    pub fn new<S: Into<String>>(assistant_id: S) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            poll_interval: Duration::from_secs(1),
            run_timeout: Some(Duration::from_secs(600)),
            cleanup_threads: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_cleanup_threads(mut self, cleanup_threads: bool) -> Self {
        self.cleanup_threads = cleanup_threads;
        self
    }
}

/// Relays a whole transcript into a fresh remote thread per call and streams
/// the assistant's answer back.
#[derive(Clone)]
pub struct Relay {
    api: Arc<dyn AssistantApi>,
    config: Arc<RelayConfig>,
}

impl Relay {
    pub fn new(api: Arc<dyn AssistantApi>, config: RelayConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Start relaying `messages` and return the reply stream right away.
    ///
    /// The stream always finishes: with the reply text, with nothing when the
    /// run produced no assistant text, or with the error that stopped it.
    pub fn open_stream(&self, messages: Vec<ChatMessage>) -> OutputStream {
        let (writer, stream) = streamable_value();
        let relay = self.clone();
        tokio::spawn(
            async move {
                relay.run_to_completion(messages, writer).await;
            }
            .in_current_span(),
        );
        stream
    }

    async fn run_to_completion(self, messages: Vec<ChatMessage>, writer: StreamWriter) {
        match self.exchange(&messages, &writer).await {
            Ok(Some(text)) => writer.update(text),
            Ok(None) => tracing::warn!("run completed without an assistant text reply"),
            Err(RelayError::Abandoned) => {
                tracing::info!("reply stream was dropped, stopped waiting for the run")
            }
            // Logged where the run id is known
            Err(e @ RelayError::RunFailed(_)) => writer.fail(e),
            Err(e) => {
                tracing::error!("Relay failed: {}", e);
                writer.fail(e);
            }
        }
        writer.done();
    }

    async fn exchange(
        &self,
        messages: &[ChatMessage],
        writer: &StreamWriter,
    ) -> RelayResult<Option<String>> {
        validate_transcript(messages)?;

        let thread = self.api.create_thread().await?;
        tracing::debug!(thread_id = %thread.id, turns = messages.len(), "created thread");

        let result = self.exchange_on_thread(&thread.id, messages, writer).await;

        if self.config.cleanup_threads {
            if let Err(e) = self.api.delete_thread(&thread.id).await {
                tracing::warn!(thread_id = %thread.id, "Failed to delete thread: {}", e);
            }
        }
        result
    }

    async fn exchange_on_thread(
        &self,
        thread_id: &str,
        messages: &[ChatMessage],
        writer: &StreamWriter,
    ) -> RelayResult<Option<String>> {
        for message in messages {
            self.api
                .create_message(thread_id, message.role, &message.content)
                .await?;
        }

        let run = self
            .api
            .create_run(thread_id, &self.config.assistant_id)
            .await?;
        let run = self.wait_for_run(thread_id, &run.id, writer).await?;

        match run.status {
            RunStatus::Completed => {
                let messages = self.api.list_messages(thread_id).await?;
                Ok(messages
                    .data
                    .first()
                    .and_then(|message| message.assistant_text())
                    .map(String::from))
            }
            RunStatus::Failed => {
                let detail = run
                    .last_error
                    .map(|error| error.to_string())
                    .unwrap_or_else(|| "no error detail".to_string());
                tracing::error!(run_id = %run.id, "Run failed: {}", detail);
                Err(RelayError::RunFailed(detail))
            }
            status => Err(RelayError::RunEnded {
                status: status.to_string(),
            }),
        }
    }

    async fn wait_for_run(
        &self,
        thread_id: &str,
        run_id: &str,
        writer: &StreamWriter,
    ) -> RelayResult<Run> {
        let started = Instant::now();
        loop {
            let run = self.api.retrieve_run(thread_id, run_id).await?;
            if run.status.is_terminal() {
                return Ok(run);
            }
            tracing::trace!(run_id, status = %run.status, "run still pending");

            if writer.is_closed() {
                return Err(RelayError::Abandoned);
            }
            if let Some(limit) = self.config.run_timeout {
                if started.elapsed() >= limit {
                    return Err(RelayError::Timeout(limit.as_secs()));
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl MessageStreamer for Relay {
    async fn stream_message(&self, messages: Vec<ChatMessage>) -> RelayResult<OutputStream> {
        Ok(self.open_stream(messages))
    }
}
