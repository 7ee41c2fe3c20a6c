//! # Schema Generator
//!
//! Prints the JSON schema of the stack configuration file format.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin schemagen > config/stack-config.schema.json
//! ```

use bookstore_stack::config::StackConfig;

fn main() {
    let schema = schemars::schema_for!(StackConfig);

    match serde_json::to_string_pretty(&schema) {
        Ok(json) => {
            println!("{json}");
        }
        Err(e) => {
            eprintln!("Failed to serialize schema to JSON: {e}");
            std::process::exit(1);
        }
    }
}
