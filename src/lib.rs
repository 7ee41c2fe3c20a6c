//! # Bookstore Stack
//!
//! Synthesizes the Bookstore deployment topology into a CloudFormation
//! template: a VPC with public and private subnets, a load-balanced Fargate
//! service, a private encrypted MySQL instance, generated database
//! credentials, and the environment binding that connects the service to the
//! database.
//!
//! ## Modules
//!
//! - `config` - `StackConfig`, loading from environment, dotenv and files, validation
//! - `constants` - Fixed sizing and naming
//! - `template` - Template document, logical IDs and intrinsic values
//! - `topology` - The components and the linear declaration pass
//! - `observability` - Logging setup for the binaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bookstore_stack::prelude::*;
//!
//! let config = StackConfig::new("shop", "admin");
//! let template = synthesize(&config)?;
//! println!("{}", template.to_json()?);
//! # Ok::<(), SynthError>(())
//! ```

pub mod config;
pub mod constants;
pub mod observability;
pub mod prelude;
pub mod template;
pub mod topology;
