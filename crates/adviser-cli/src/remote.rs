use adviser::errors::{RelayError, RelayResult};
use adviser::models::message::ChatMessage;
use adviser::protocol::{decode_line, DataStreamPart};
use adviser::relay::MessageStreamer;
use adviser::streamable::{streamable_value, OutputStream, StreamWriter};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::json;

/// Talks to a running `adviserd` over its `/reply` endpoint
pub struct RemoteRelay {
    client: Client,
    base_url: String,
}

impl RemoteRelay {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MessageStreamer for RemoteRelay {
    async fn stream_message(&self, messages: Vec<ChatMessage>) -> RelayResult<OutputStream> {
        let url = format!("{}/reply", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-protocol", "data")
            .json(&json!({ "messages": messages }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let (writer, stream) = streamable_value();
        tokio::spawn(forward_data_stream(response.bytes_stream(), writer));
        Ok(stream)
    }
}

/// Decode protocol lines from a byte stream into the writer. Lines may be split
/// across chunks at any byte, including inside a multi-byte character.
pub async fn forward_data_stream<S, E>(body: S, writer: StreamWriter)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<RelayError>,
{
    futures::pin_mut!(body);
    let mut pending: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                writer.fail(e.into());
                return;
            }
        };
        pending.extend_from_slice(&chunk);

        while let Some(end) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            match decode_line(&line) {
                Ok(Some(DataStreamPart::Text(text))) => writer.update(text),
                Ok(Some(DataStreamPart::Error(message))) => {
                    writer.fail(RelayError::Remote(message));
                    return;
                }
                Ok(Some(DataStreamPart::Finish { .. })) => {
                    writer.done();
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    writer.fail(e);
                    return;
                }
            }
        }
    }
    // Body ended without a finish line; dropping the writer reports it
    tracing::warn!("reply stream ended without a finish line");
}
