//! # chat-relay
//!
//! WebSocket chat relay bridging every browser connection to one shared
//! publish/subscribe channel.
//!
//! Each accepted connection becomes a session running two duties: the
//! inbound duty publishes what the client types, tagged with its
//! `username`; the outbound duty forwards everything published on the
//! channel back to the client. When either duty ends, the other is
//! cancelled and the connection is torn down.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /ws?username=…)
//!     │
//!     ├── WS Handler (ws/handler)
//!     ├── Supervisor (ws/supervisor)
//!     │     └── ConnectionSession (ws/session)
//!     │           ├── InboundRelay  ── publish ──┐
//!     │           └── OutboundRelay ◄─ subscribe ┤
//!     │                                          │
//!     └── Broker (broker/) ◄─────────────────────┘
//! ```
//!
//! ## Known limitations
//!
//! - `username` is taken from the query string and never authenticated.
//! - A client receives its own messages back through the channel; echoes
//!   are not suppressed.

pub mod api;
pub mod app;
pub mod app_state;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
