//! # Observability
//!
//! Structured logging for the synthesizer binaries.
//!
//! - `logging`: `tracing-subscriber` setup driven by `LOG_LEVEL` / `LOG_FORMAT`

pub mod logging;

pub use logging::{init_logging, LogFormat, LogSettings};
