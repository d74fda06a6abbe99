//! Logger backed by the `tracing` facade

use super::traits::Logger;

/// Forwards every message to `tracing` under the `toolrelay` target
///
/// Whatever subscriber the host installs decides filtering and output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "toolrelay", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "toolrelay", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "toolrelay", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "toolrelay", "{}", message);
    }
}
