use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {env_var}: {reason}")]
    InvalidValue { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a nested settings field,
/// e.g. `assistant.api_key` -> `ADVISER_ASSISTANT__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    let parts: Vec<String> = field_path
        .split('.')
        .map(|part| part.to_uppercase())
        .collect();
    format!("ADVISER_{}", parts.join("__"))
}
