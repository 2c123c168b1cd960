use async_trait::async_trait;

use super::types::{MessageList, Run, Thread};
use crate::errors::RelayResult;
use crate::models::role::Role;

/// Operations the relay consumes from a hosted assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create an empty conversation thread
    async fn create_thread(&self) -> RelayResult<Thread>;

    /// Append one message to a thread
    async fn create_message(&self, thread_id: &str, role: Role, content: &str)
        -> RelayResult<()>;

    /// Start a run of the given assistant against a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> RelayResult<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> RelayResult<Run>;

    /// List the messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> RelayResult<MessageList>;

    async fn delete_thread(&self, thread_id: &str) -> RelayResult<()>;
}
