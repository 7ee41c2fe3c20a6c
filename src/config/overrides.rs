//! # Configuration Overrides
//!
//! Values given on the command line win over whatever the environment or a
//! configuration file supplied. Every field is optional; an unset field
//! leaves the loaded value alone, so boolean flags can switch a setting off
//! as well as on.

use super::error::ConfigError;
use super::stack::{RemovalPolicy, StackConfig};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub stack_name: Option<String>,
    pub removal_policy: Option<RemovalPolicy>,
    pub deletion_protection: Option<bool>,
    pub emit_outputs: Option<bool>,
}

impl ConfigOverrides {
    /// Apply every set field to `config`, then validate the result
    pub fn apply(&self, config: &mut StackConfig) -> Result<(), ConfigError> {
        if let Some(stack_name) = &self.stack_name {
            config.stack_name.clone_from(stack_name);
        }
        if let Some(policy) = self.removal_policy {
            config.teardown.removal_policy = policy;
        }
        if let Some(protection) = self.deletion_protection {
            config.teardown.deletion_protection = protection;
        }
        if let Some(emit) = self.emit_outputs {
            config.emit_outputs = emit;
        }

        if *self != Self::default() {
            debug!(overrides = ?self, "Applied configuration overrides");
        }
        config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protected_config() -> StackConfig {
        let mut config = StackConfig::new("shop", "admin");
        config.teardown.removal_policy = RemovalPolicy::Retain;
        config.teardown.deletion_protection = true;
        config.emit_outputs = true;
        config
    }

    #[test]
    fn test_empty_overrides_leave_config_unchanged() {
        let mut config = protected_config();
        ConfigOverrides::default().apply(&mut config).unwrap();
        assert_eq!(config, protected_config());
    }

    #[test]
    fn test_every_field_wins() {
        let mut config = protected_config();
        let overrides = ConfigOverrides {
            stack_name: Some("bookstore-prod".to_string()),
            removal_policy: Some(RemovalPolicy::Snapshot),
            deletion_protection: Some(false),
            emit_outputs: Some(false),
        };
        overrides.apply(&mut config).unwrap();

        assert_eq!(config.stack_name, "bookstore-prod");
        assert_eq!(config.teardown.removal_policy, RemovalPolicy::Snapshot);
        assert!(!config.teardown.deletion_protection, "override must switch protection off");
        assert!(!config.emit_outputs);
    }

    #[test]
    fn test_invalid_stack_name_is_rejected() {
        let mut config = StackConfig::new("shop", "admin");
        let overrides = ConfigOverrides {
            stack_name: Some("1bookstore".to_string()),
            ..ConfigOverrides::default()
        };
        let err = overrides.apply(&mut config).unwrap_err();
        assert_eq!(err.key(), Some("STACK_NAME"));
    }
}
