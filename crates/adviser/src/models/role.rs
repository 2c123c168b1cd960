use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Map a remote role string onto the local vocabulary. Anything that is not
    /// "user" is treated as the assistant.
    pub fn from_remote(role: &str) -> Self {
        if role == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label shown next to a turn in the transcript
    pub fn speaker(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Adviser",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
