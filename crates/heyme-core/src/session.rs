use async_trait::async_trait;

use crate::errors::SessionError;

/// Quality options a session handle is built with. They never change for
/// the lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Adjust each remote participant's video quality to how it is rendered.
    pub adaptive_stream: bool,
    /// Pause publishing layers nobody is subscribed to.
    pub dynacast: bool,
    pub auto_subscribe: bool,
}

impl SessionOptions {
    pub const FIXED: Self = Self {
        adaptive_stream: true,
        dynacast: true,
        auto_subscribe: true,
    };
}

/// A long-lived real-time session that can be connected and torn down
/// repeatedly.
///
/// Only the [`SessionController`](crate::lifecycle::SessionController)
/// calls `connect`/`disconnect`.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    async fn connect(&self, url: &str, token: &str) -> Result<(), SessionError>;

    /// Close the current connection, if any. Idempotent.
    async fn disconnect(&self);

    fn options(&self) -> SessionOptions;
}
