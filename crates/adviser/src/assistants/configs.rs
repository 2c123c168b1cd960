use std::time::Duration;

pub const OPENAI_HOST: &str = "https://api.openai.com";

/// Connection settings for the OpenAI assistants endpoints
#[derive(Debug, Clone)]
pub struct OpenAiAssistantConfig {
    pub host: String,
    pub api_key: String,
    pub organization: Option<String>,
    pub request_timeout: Duration,
}

impl OpenAiAssistantConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            organization: None,
            request_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }
}
