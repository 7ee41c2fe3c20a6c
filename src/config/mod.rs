//! # Configuration
//!
//! Stack configuration loading and validation.
//!
//! - `stack.rs` - `StackConfig` and its nested settings
//! - `env.rs` - Environment snapshot (process env + dotenv file)
//! - `overrides.rs` - Command-line overrides applied on top of a loaded config
//! - `validation.rs` - Field validation run before construction
//! - `error.rs` - `ConfigError`

pub mod env;
pub mod error;
pub mod overrides;
pub mod stack;
pub mod validation;

pub use env::EnvSource;
pub use error::ConfigError;
pub use overrides::ConfigOverrides;
pub use stack::{keys, NetworkSettings, RemovalPolicy, StackConfig, TeardownPolicy};
