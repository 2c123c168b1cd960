use super::role::Role;
use crate::errors::{RelayError, RelayResult};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// One turn of the transcript
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Check the input constraints a relay expects of every turn
    pub fn validate(&self) -> RelayResult<()> {
        if self.content.trim().is_empty() {
            return Err(RelayError::InvalidMessage(format!(
                "{} message has empty content",
                self.role
            )));
        }
        Ok(())
    }
}

/// Validate a whole transcript before it is relayed
pub fn validate_transcript(messages: &[ChatMessage]) -> RelayResult<()> {
    if messages.is_empty() {
        return Err(RelayError::InvalidMessage(
            "transcript has no messages".to_string(),
        ));
    }
    messages.iter().try_for_each(ChatMessage::validate)
}
