//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::ws::Supervisor;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection supervisor; owns the broker handle and the channel.
    pub supervisor: Arc<Supervisor>,
}

impl AppState {
    /// Wraps a supervisor for use as router state.
    #[must_use]
    pub const fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }
}
