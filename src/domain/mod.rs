//! Domain layer: chat message record, channel and session identity.
//!
//! These are the only data types the relay moves around. There is no
//! persistent state; chat history is not stored.

pub mod channel;
pub mod chat_message;
pub mod session_id;

pub use channel::Channel;
pub use chat_message::{ANONYMOUS, ChatMessage};
pub use session_id::SessionId;
