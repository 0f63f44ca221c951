//! The seam between the control layer and the compute backend.
//!
//! Everything the application knows about the backend goes through
//! [`BackendGateway`]: one asynchronous execute-command call plus a
//! synchronous key-dispatch probe. Auxiliary one-way notifications to the
//! platform shell travel over a separate crossbeam channel and never touch
//! the backend.

use async_trait::async_trait;
use shared::{error::GatewayError, protocol::KeyPayload, protocol::ResultValue};

mod notify;
mod rest;

pub use notify::{notification_channel, NotificationSender};
pub use rest::RestGateway;

/// Per-call execution options. `render` defaults to true; turning it off
/// suppresses the backend's implicit redraw after the command.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    pub render: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { render: true }
    }
}

#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Executes one command string against the backend. The command must
    /// already be trimmed; callers funnel through the dispatcher for that.
    async fn execute(
        &self,
        command: &str,
        options: ExecuteOptions,
    ) -> Result<ResultValue, GatewayError>;

    /// Blocking "is this keystroke a known shortcut" check. Returns the
    /// handled flag; an unhandled key is a normal branch, not an error.
    ///
    /// Must be driven from a non-async thread (the shell's input thread).
    fn key_press_probe(&self, payload: &KeyPayload) -> Result<bool, GatewayError>;
}

/// High-frequency commands are excluded from debug logging so the log stays
/// readable during pointer movement.
pub fn should_log(command: &str) -> bool {
    let path = command.split_whitespace().next().unwrap_or(command);
    !path.ends_with("mouseMove") && !path.ends_with("requestRedraw")
}
