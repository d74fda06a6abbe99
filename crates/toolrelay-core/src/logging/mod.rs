//! Logging abstractions
//!
//! Library code logs through the [`Logger`] trait so embedders decide where
//! messages go. The CLI installs [`TracingLogger`]; tests use
//! [`MemoryLogger`] to assert on warnings.

mod memory;
mod noop;
mod tracing_logger;
mod traits;

pub use memory::{LogEntry, LogLevel, MemoryLogger};
pub use noop::NoOpLogger;
pub use tracing_logger::TracingLogger;
pub use traits::{Logger, SharedLogger};
