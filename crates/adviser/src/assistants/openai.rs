use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::base::AssistantApi;
use super::configs::OpenAiAssistantConfig;
use super::types::{MessageList, Run, Thread};
use crate::errors::{RelayError, RelayResult};
use crate::models::role::Role;

pub struct OpenAiAssistantClient {
    client: Client,
    config: OpenAiAssistantConfig,
}

impl OpenAiAssistantClient {
    pub fn new(config: OpenAiAssistantConfig) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.host.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "assistants=v2");
        match &self.config.organization {
            Some(organization) => request.header("OpenAI-Organization", organization),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RelayResult<T> {
        let response = self.authorize(request).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_status(response: Response) -> RelayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Prefer the service's own explanation when the body carries one
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or(body);

        Err(RelayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, payload: Value) -> RelayResult<T> {
        self.send(self.client.post(self.url(path)).json(&payload))
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> RelayResult<T> {
        self.send(self.client.get(self.url(path))).await
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_thread(&self) -> RelayResult<Thread> {
        self.post("threads", json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> RelayResult<()> {
        let payload = json!({
            "role": role,
            "content": content,
        });
        let _: Value = self
            .post(&format!("threads/{}/messages", thread_id), payload)
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> RelayResult<Run> {
        self.post(
            &format!("threads/{}/runs", thread_id),
            json!({ "assistant_id": assistant_id }),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> RelayResult<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id))
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> RelayResult<MessageList> {
        self.get(&format!("threads/{}/messages?order=desc", thread_id))
            .await
    }

    async fn delete_thread(&self, thread_id: &str) -> RelayResult<()> {
        let request = self.client.delete(self.url(&format!("threads/{}", thread_id)));
        let _: Value = self.send(request).await?;
        Ok(())
    }
}
