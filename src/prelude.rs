//! # Prelude
//!
//! Re-exports the types most callers need.
//!
//! ```rust
//! use bookstore_stack::prelude::*;
//! ```

pub use crate::config::{
    ConfigError, ConfigOverrides, EnvSource, NetworkSettings, RemovalPolicy, StackConfig, TeardownPolicy,
};
pub use crate::template::{LogicalId, OutputFormat, SynthError, Template, Value};
pub use crate::topology::{synthesize, Declaration, Topology};
