//! These models represent the chat turns passed between the surfaces and the relay
//!
//! Two formats overlap here:
//! - the transcript sent from a chat surface (browser page or terminal) to the relay
//! - the thread messages the relay replays into the hosted assistant service
//!
//! The transcript is the source of truth; remote shapes live in `assistants::types`
//! and are converted at the relay boundary.
pub mod message;
pub mod role;
