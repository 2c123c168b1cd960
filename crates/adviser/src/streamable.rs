//! A single-writer, single-reader conduit for the fragments of one reply.
//!
//! The writer pushes text fragments and finishes explicitly. The reader sees an
//! order-preserving sequence of fragments that terminates exactly once: after
//! `done`, after the first failure, or (with `RelayError::Abandoned`) when the
//! writer is dropped without finishing.
use futures::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;

use crate::errors::{RelayError, RelayResult};

enum Event {
    Text(String),
    Failed(RelayError),
    Done,
}

/// Create a connected writer/reader pair
pub fn streamable_value() -> (StreamWriter, OutputStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        StreamWriter { tx },
        OutputStream {
            rx,
            finished: false,
        },
    )
}

/// Producer side of the channel
pub struct StreamWriter {
    tx: mpsc::UnboundedSender<Event>,
}

impl StreamWriter {
    /// Push one text fragment
    pub fn update<S: Into<String>>(&self, text: S) {
        if self.tx.send(Event::Text(text.into())).is_err() {
            tracing::debug!("reply stream reader is gone, dropping fragment");
        }
    }

    /// Push a failure. The reader stops after receiving it.
    pub fn fail(&self, error: RelayError) {
        if self.tx.send(Event::Failed(error)).is_err() {
            tracing::debug!("reply stream reader is gone, dropping failure");
        }
    }

    /// Whether the reader has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Mark the stream finished
    pub fn done(self) {
        let _ = self.tx.send(Event::Done);
    }
}

/// Consumer side of the channel
pub struct OutputStream {
    rx: mpsc::UnboundedReceiver<Event>,
    finished: bool,
}

impl OutputStream {
    /// Drain the stream, concatenating every fragment
    pub async fn collect_text(mut self) -> RelayResult<String> {
        use futures::StreamExt;

        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for OutputStream {
    type Item = RelayResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let item = match ready!(this.rx.poll_recv(cx)) {
            Some(Event::Text(text)) => Some(Ok(text)),
            Some(Event::Failed(error)) => {
                this.finished = true;
                Some(Err(error))
            }
            Some(Event::Done) => {
                this.finished = true;
                None
            }
            None => {
                this.finished = true;
                Some(Err(RelayError::Abandoned))
            }
        };
        Poll::Ready(item)
    }
}
