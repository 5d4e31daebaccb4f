//! WebSocket layer: upgrade handling, connection sessions and relay duties.
//!
//! The endpoint at `/ws` bridges every browser connection to the shared
//! broker channel: what a client sends is published, and everything
//! published on the channel (its own lines included) is sent back.

pub mod handler;
pub mod relay;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use relay::{Duty, DutyOutcome};
pub use session::{ConnectionSession, SessionReport};
pub use supervisor::Supervisor;
