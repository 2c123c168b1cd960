use crate::error::{to_env_var, ConfigError};
use adviser::assistants::configs::{OpenAiAssistantConfig, OPENAI_HOST};
use adviser::relay::RelayConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    pub api_key: String,
    pub assistant_id: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Zero waits for a run indefinitely
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default)]
    pub cleanup_threads: bool,
}

impl AssistantSettings {
    pub fn client_config(&self) -> OpenAiAssistantConfig {
        OpenAiAssistantConfig::new(self.api_key.clone())
            .with_host(self.host.clone())
            .with_organization(self.organization.clone())
    }

    pub fn relay_config(&self) -> RelayConfig {
        let run_timeout = match self.run_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        RelayConfig::new(self.assistant_id.clone())
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_run_timeout(run_timeout)
            .with_cleanup_threads(self.cleanup_threads)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub assistant: AssistantSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.assistant.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                env_var: to_env_var("assistant.poll_interval_ms"),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("assistant.host", default_openai_host())?
            .add_source(
                Environment::with_prefix("ADVISER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => settings.validate(),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // "missing field `api_key`" only names the leaf; every field without
                // a default lives under `assistant`
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&format!("assistant.{}", field)),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_run_timeout_secs() -> u64 {
    600
}
