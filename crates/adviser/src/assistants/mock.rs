use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::base::AssistantApi;
use super::types::{ContentBlock, MessageList, Run, RunError, RunStatus, Thread, ThreadMessage};
use crate::errors::{RelayError, RelayResult};
use crate::models::role::Role;

pub const MOCK_THREAD_ID: &str = "thread_mock";
pub const MOCK_RUN_ID: &str = "run_mock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CreateThread,
    CreateMessage,
    CreateRun,
    RetrieveRun,
    ListMessages,
    DeleteThread,
}

/// A call the mock received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateThread,
    CreateMessage {
        thread_id: String,
        role: Role,
        content: String,
    },
    CreateRun {
        thread_id: String,
        assistant_id: String,
    },
    RetrieveRun {
        thread_id: String,
        run_id: String,
    },
    ListMessages {
        thread_id: String,
    },
    DeleteThread {
        thread_id: String,
    },
}

struct MockState {
    statuses: VecDeque<RunStatus>,
    last_error: Option<RunError>,
    messages: MessageList,
    failures: HashMap<MockOperation, RelayError>,
    calls: Vec<MockCall>,
}

/// A scripted assistant service for tests.
///
/// `retrieve_run` walks through the configured statuses and keeps returning
/// the last one once the script is exhausted.
pub struct MockAssistantApi {
    state: Mutex<MockState>,
}

impl Default for MockAssistantApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssistantApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                statuses: VecDeque::from(vec![RunStatus::Completed]),
                last_error: None,
                messages: MessageList { data: Vec::new() },
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn with_run_statuses(self, statuses: Vec<RunStatus>) -> Self {
        self.state.lock().unwrap().statuses = statuses.into();
        self
    }

    pub fn with_last_error(self, code: &str, message: &str) -> Self {
        self.state.lock().unwrap().last_error = Some(RunError {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Make the newest thread message an assistant text reply
    pub fn with_reply<S: Into<String>>(self, text: S) -> Self {
        self.with_messages(vec![ThreadMessage {
            id: "msg_reply".to_string(),
            role: "assistant".to_string(),
            content: vec![ContentBlock::text(text)],
        }])
    }

    /// Thread messages returned by `list_messages`, newest first
    pub fn with_messages(self, data: Vec<ThreadMessage>) -> Self {
        self.state.lock().unwrap().messages = MessageList { data };
        self
    }

    pub fn failing_on(self, operation: MockOperation, error: RelayError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, error);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, operation: MockOperation, call: MockCall) -> RelayResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn run(&self) -> Run {
        let mut state = self.state.lock().unwrap();
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        }
        .unwrap_or(RunStatus::Completed);
        let last_error = match status {
            RunStatus::Failed => state.last_error.clone(),
            _ => None,
        };
        Run {
            id: MOCK_RUN_ID.to_string(),
            status,
            last_error,
        }
    }
}

#[async_trait]
impl AssistantApi for MockAssistantApi {
    async fn create_thread(&self) -> RelayResult<Thread> {
        self.record(MockOperation::CreateThread, MockCall::CreateThread)?;
        Ok(Thread {
            id: MOCK_THREAD_ID.to_string(),
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> RelayResult<()> {
        self.record(
            MockOperation::CreateMessage,
            MockCall::CreateMessage {
                thread_id: thread_id.to_string(),
                role,
                content: content.to_string(),
            },
        )
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> RelayResult<Run> {
        self.record(
            MockOperation::CreateRun,
            MockCall::CreateRun {
                thread_id: thread_id.to_string(),
                assistant_id: assistant_id.to_string(),
            },
        )?;
        Ok(Run {
            id: MOCK_RUN_ID.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> RelayResult<Run> {
        self.record(
            MockOperation::RetrieveRun,
            MockCall::RetrieveRun {
                thread_id: thread_id.to_string(),
                run_id: run_id.to_string(),
            },
        )?;
        Ok(self.run())
    }

    async fn list_messages(&self, thread_id: &str) -> RelayResult<MessageList> {
        self.record(
            MockOperation::ListMessages,
            MockCall::ListMessages {
                thread_id: thread_id.to_string(),
            },
        )?;
        Ok(self.state.lock().unwrap().messages.clone())
    }

    async fn delete_thread(&self, thread_id: &str) -> RelayResult<()> {
        self.record(
            MockOperation::DeleteThread,
            MockCall::DeleteThread {
                thread_id: thread_id.to_string(),
            },
        )
    }
}
