//! The chat surface: the visible conversation, its draft input and the busy flag.
//!
//! `ChatSurface` is a cheap handle over shared state so a front-end can keep
//! rendering while a submit is suspended on the reply stream. Only one submit
//! is ever in flight; a second one while busy is ignored, not queued.
use futures::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{RelayError, RelayResult};
use crate::models::message::ChatMessage;
use crate::models::role::Role;
use crate::relay::MessageStreamer;
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: Key, shift: bool) -> Self {
        Self { key, shift }
    }

    pub fn enter() -> Self {
        Self::new(Key::Enter, false)
    }

    pub fn shift_enter() -> Self {
        Self::new(Key::Enter, true)
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c), false)
    }
}

/// What a key press asks the front-end to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Run `submit`; the newline was suppressed
    Submit,
    InsertNewline,
    Edited,
    /// Input is disabled while a reply is streaming
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank draft or a request already in flight
    Ignored,
    Replied,
    /// The stream finished without any text
    NoReply,
    Failed(RelayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Message,
    /// Transient "typing" placeholder shown while busy
    Typing,
    /// Transient notice about the last failed submit
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEntry {
    pub kind: EntryKind,
    pub role: Role,
    pub speaker: &'static str,
    pub html: String,
}

#[derive(Debug, Default)]
struct SurfaceState {
    messages: Vec<ChatMessage>,
    input: String,
    is_streaming: bool,
    last_error: Option<String>,
    revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl ChatSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface showing an existing transcript, idle and with an empty draft
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        let surface = Self::new();
        surface.state().messages = messages;
        surface
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn input(&self) -> String {
        self.state().input.clone()
    }

    pub fn set_input<S: Into<String>>(&self, input: S) {
        self.state().input = input.into();
    }

    pub fn is_streaming(&self) -> bool {
        self.state().is_streaming
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Bumped whenever the transcript or the busy flag changes. A front-end
    /// scrolls the transcript to the bottom when it sees a new value.
    pub fn revision(&self) -> u64 {
        self.state().revision
    }

    /// Height of the input in rows, growing with the draft
    pub fn input_rows(&self) -> usize {
        self.state().input.split('\n').count().max(1)
    }

    pub fn handle_key(&self, press: KeyPress) -> KeyAction {
        let mut state = self.state();
        if state.is_streaming {
            return KeyAction::Ignored;
        }
        match press.key {
            Key::Enter if !press.shift => KeyAction::Submit,
            Key::Enter => {
                state.input.push('\n');
                KeyAction::InsertNewline
            }
            Key::Backspace => {
                state.input.pop();
                KeyAction::Edited
            }
            Key::Char(c) => {
                state.input.push(c);
                KeyAction::Edited
            }
        }
    }

    /// Send the draft together with the whole transcript and wait for the reply
    pub async fn submit(&self, streamer: &dyn MessageStreamer) -> SubmitOutcome {
        let history = {
            let mut state = self.state();
            if state.input.trim().is_empty() || state.is_streaming {
                return SubmitOutcome::Ignored;
            }
            let content = std::mem::take(&mut state.input);
            state.messages.push(ChatMessage::user(content));
            state.is_streaming = true;
            state.last_error = None;
            state.revision += 1;
            state.messages.clone()
        };

        let result = Self::read_reply(streamer, history).await;

        let mut state = self.state();
        let outcome = match result {
            // Blank turns would fail transcript validation on every later submit
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!("reply stream finished without any text");
                SubmitOutcome::NoReply
            }
            Ok(text) => {
                state.messages.push(ChatMessage::assistant(text));
                SubmitOutcome::Replied
            }
            Err(e) => {
                tracing::warn!("Error streaming message: {}", e);
                state.last_error = Some(e.to_string());
                SubmitOutcome::Failed(e)
            }
        };
        state.is_streaming = false;
        state.revision += 1;
        outcome
    }

    async fn read_reply(
        streamer: &dyn MessageStreamer,
        history: Vec<ChatMessage>,
    ) -> RelayResult<String> {
        let mut stream = streamer.stream_message(history).await?;
        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            accumulated.push_str(&fragment?);
        }
        Ok(accumulated)
    }

    /// The transcript oldest to newest, followed by any transient entries
    pub fn render(&self) -> Vec<RenderedEntry> {
        let state = self.state();
        let mut entries: Vec<RenderedEntry> = state
            .messages
            .iter()
            .map(|message| RenderedEntry {
                kind: EntryKind::Message,
                role: message.role,
                speaker: message.role.speaker(),
                html: render::to_html(&message.content),
            })
            .collect();

        if state.is_streaming {
            entries.push(RenderedEntry {
                kind: EntryKind::Typing,
                role: Role::Assistant,
                speaker: Role::Assistant.speaker(),
                html: "<span class=\"typing-animation\">Typing</span>".to_string(),
            });
        } else if let Some(error) = &state.last_error {
            entries.push(RenderedEntry {
                kind: EntryKind::Error,
                role: Role::Assistant,
                speaker: Role::Assistant.speaker(),
                html: render::to_html(&format!("*{}*", error)),
            });
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistants::mock::{MockAssistantApi, MockCall};
    use crate::relay::{Relay, RelayConfig};
    use crate::streamable::{streamable_value, OutputStream};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Streams a fixed list of fragments, optionally waiting on a gate first
    struct ScriptedStreamer {
        fragments: Vec<String>,
        failure: Option<RelayError>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
        received: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedStreamer {
        fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
                failure: None,
                gate: Mutex::new(None),
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, error: RelayError) -> Self {
            self.failure = Some(error);
            self
        }

        fn gated(self) -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            *self.gate.lock().unwrap() = Some(rx);
            (self, tx)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageStreamer for ScriptedStreamer {
        async fn stream_message(
            &self,
            messages: Vec<ChatMessage>,
        ) -> RelayResult<OutputStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.received.lock().unwrap() = messages;

            let (writer, stream) = streamable_value();
            let fragments = self.fragments.clone();
            let failure = self.failure.clone();
            let gate = self.gate.lock().unwrap().take();
            tokio::spawn(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                for fragment in fragments {
                    writer.update(fragment);
                }
                if let Some(error) = failure {
                    writer.fail(error);
                }
                writer.done();
            });
            Ok(stream)
        }
    }

    /// Fails before any stream exists
    struct BrokenStreamer;

    #[async_trait]
    impl MessageStreamer for BrokenStreamer {
        async fn stream_message(&self, _messages: Vec<ChatMessage>) -> RelayResult<OutputStream> {
            Err(RelayError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_submit_accumulates_fragments_into_one_reply() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["Hello", " world"]);

        surface.set_input("Hi there");
        let outcome = surface.submit(&streamer).await;

        assert_eq!(outcome, SubmitOutcome::Replied);
        assert_eq!(
            surface.messages(),
            vec![
                ChatMessage::user("Hi there"),
                ChatMessage::assistant("Hello world"),
            ]
        );
        assert_eq!(surface.input(), "");
        assert!(!surface.is_streaming());
    }

    #[tokio::test]
    async fn test_submit_sends_full_history() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["first"]);
        surface.set_input("one");
        surface.submit(&streamer).await;

        surface.set_input("two");
        surface.submit(&streamer).await;

        assert_eq!(
            *streamer.received.lock().unwrap(),
            vec![
                ChatMessage::user("one"),
                ChatMessage::assistant("first"),
                ChatMessage::user("two"),
            ]
        );
        assert_eq!(surface.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_blank_draft_is_ignored() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["never"]);

        for draft in ["", "   ", "\n\t"] {
            surface.set_input(draft);
            let revision = surface.revision();
            assert_eq!(surface.submit(&streamer).await, SubmitOutcome::Ignored);
            assert_eq!(surface.revision(), revision);
        }
        assert!(surface.messages().is_empty());
        assert_eq!(streamer.calls(), 0);
    }

    #[tokio::test]
    async fn test_busy_flag_spans_the_request() {
        let surface = ChatSurface::new();
        let (streamer, gate) = ScriptedStreamer::new(&["svar"]).gated();
        let streamer = Arc::new(streamer);
        assert!(!surface.is_streaming());

        surface.set_input("fråga");
        let task = {
            let surface = surface.clone();
            let streamer = streamer.clone();
            tokio::spawn(async move { surface.submit(streamer.as_ref()).await })
        };

        while streamer.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(surface.is_streaming());
        // User turn is recorded before the reply arrives
        assert_eq!(surface.messages(), vec![ChatMessage::user("fråga")]);

        // A second submit while busy is a no-op
        surface.set_input("another");
        assert_eq!(surface.submit(streamer.as_ref()).await, SubmitOutcome::Ignored);
        assert_eq!(streamer.calls(), 1);
        assert_eq!(surface.messages().len(), 1);

        gate.send(()).unwrap();
        assert_eq!(task.await.unwrap(), SubmitOutcome::Replied);
        assert!(!surface.is_streaming());
        assert_eq!(surface.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_stream_appends_no_reply() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["partial"])
            .failing(RelayError::RunFailed("server_error: boom".to_string()));

        surface.set_input("hi");
        let outcome = surface.submit(&streamer).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed(RelayError::RunFailed("server_error: boom".to_string()))
        );
        assert_eq!(surface.messages(), vec![ChatMessage::user("hi")]);
        assert!(!surface.is_streaming());
        assert!(surface.last_error().is_some());
    }

    #[tokio::test]
    async fn test_streamer_error_clears_busy() {
        let surface = ChatSurface::new();
        surface.set_input("hi");
        let outcome = surface.submit(&BrokenStreamer).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(RelayError::Transport(_))));
        assert!(!surface.is_streaming());
        assert_eq!(surface.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_recorded() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&[]);
        surface.set_input("hi");
        assert_eq!(surface.submit(&streamer).await, SubmitOutcome::NoReply);
        assert_eq!(surface.messages(), vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_whitespace_reply_keeps_next_turn_valid() {
        let surface = ChatSurface::new();

        let blank = Relay::new(
            Arc::new(MockAssistantApi::new().with_reply("\n  ")),
            RelayConfig::new("asst_test"),
        );
        surface.set_input("Täcker den glasskador?");
        assert_eq!(surface.submit(&blank).await, SubmitOutcome::NoReply);
        assert_eq!(
            surface.messages(),
            vec![ChatMessage::user("Täcker den glasskador?")]
        );

        let api = Arc::new(MockAssistantApi::new().with_reply("Ja."));
        let relay = Relay::new(api.clone(), RelayConfig::new("asst_test"));
        surface.set_input("Hallå?");
        assert_eq!(surface.submit(&relay).await, SubmitOutcome::Replied);
        assert_eq!(
            surface.messages().last(),
            Some(&ChatMessage::assistant("Ja."))
        );
        assert!(surface.last_error().is_none());
        assert!(api
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::CreateRun { .. })));
    }

    #[test]
    fn test_with_messages_renders_markdown_entries() {
        let surface = ChatSurface::with_messages(vec![
            ChatMessage::user("Vad gäller?"),
            ChatMessage::assistant("## Villkor\n\n- stöld【4:0†villkor.pdf】\n- [brand](https://example.com)"),
        ]);
        assert!(!surface.is_streaming());
        assert_eq!(surface.input(), "");

        let entries = surface.render();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        let html = &entries[1].html;
        assert!(html.contains("<h2>Villkor</h2>"));
        assert!(html.contains("<li>stöld</li>"));
        assert!(html.contains("<a href=\"https://example.com\">brand</a>"));
    }

    #[tokio::test]
    async fn test_enter_submits_like_the_button() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["ok"]);
        for c in "hej".chars() {
            assert_eq!(surface.handle_key(KeyPress::char(c)), KeyAction::Edited);
        }

        assert_eq!(surface.handle_key(KeyPress::enter()), KeyAction::Submit);
        assert_eq!(surface.input(), "hej");
        assert_eq!(surface.submit(&streamer).await, SubmitOutcome::Replied);
        assert_eq!(
            surface.messages(),
            vec![ChatMessage::user("hej"), ChatMessage::assistant("ok")]
        );
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let surface = ChatSurface::new();
        surface.set_input("rad ett");
        assert_eq!(surface.input_rows(), 1);

        assert_eq!(
            surface.handle_key(KeyPress::shift_enter()),
            KeyAction::InsertNewline
        );
        surface.handle_key(KeyPress::char('x'));
        assert_eq!(surface.input(), "rad ett\nx");
        assert_eq!(surface.input_rows(), 2);
        assert!(surface.messages().is_empty());

        surface.handle_key(KeyPress::new(Key::Backspace, false));
        assert_eq!(surface.input(), "rad ett\n");
    }

    #[tokio::test]
    async fn test_render_strips_citations_and_shows_typing() {
        let surface = ChatSurface::new();
        let (streamer, gate) = ScriptedStreamer::new(&["Answer【cite1】 more"]).gated();
        let streamer = Arc::new(streamer);

        surface.set_input("question");
        let task = {
            let surface = surface.clone();
            let streamer = streamer.clone();
            tokio::spawn(async move { surface.submit(streamer.as_ref()).await })
        };
        while streamer.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let entries = surface.render();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].speaker, "You");
        assert_eq!(entries[1].kind, EntryKind::Typing);
        assert_eq!(surface.handle_key(KeyPress::char('x')), KeyAction::Ignored);

        gate.send(()).unwrap();
        task.await.unwrap();

        let entries = surface.render();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, EntryKind::Message);
        assert_eq!(entries[1].speaker, "Adviser");
        assert!(entries[1].html.contains("Answer more"));
    }

    #[tokio::test]
    async fn test_revision_tracks_transcript_changes() {
        let surface = ChatSurface::new();
        let streamer = ScriptedStreamer::new(&["ok"]);
        let start = surface.revision();

        surface.set_input("hi");
        assert_eq!(surface.revision(), start);

        surface.submit(&streamer).await;
        assert_eq!(surface.revision(), start + 2);
    }
}
