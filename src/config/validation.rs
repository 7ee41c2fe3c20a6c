//! # StackConfig Validation
//!
//! Field checks run before construction begins. Rules follow what RDS,
//! Secrets Manager and CloudFormation accept so that bad input fails here
//! with a named key rather than minutes into a deployment.

use super::error::ConfigError;
use super::stack::{keys, NetworkSettings, StackConfig};
use crate::constants::{MAX_SUBNET_CIDR_MASK, MAX_SUPPORTED_AZS, VPC_PREFIX_LEN};
use regex::Regex;
use std::sync::LazyLock;

/// Master usernames reserved by RDS for MySQL, plus the engine superuser
const RESERVED_USERNAMES: &[&str] = &["rdsadmin", "rdsrepladmin", "rdsproxyadmin", "root"];

static STACK_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("stack name pattern is a valid regex")
});

static DATABASE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,63}$").expect("database name pattern is a valid regex")
});

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,15}$").expect("username pattern is a valid regex")
});

/// Validate every field of a `StackConfig`
pub fn validate_stack_config(config: &StackConfig) -> Result<(), ConfigError> {
    validate_stack_name(&config.stack_name)?;
    validate_database_name(&config.database_name)?;
    validate_database_username(&config.database_username)?;
    validate_network(&config.network)?;
    Ok(())
}

/// Stack names: letter first, then alphanumerics or hyphens, at most 128 characters
pub fn validate_stack_name(name: &str) -> Result<(), ConfigError> {
    non_empty(keys::STACK_NAME, name)?;
    if name.len() > 128 {
        return Err(ConfigError::invalid(
            keys::STACK_NAME,
            name,
            format!("exceeds maximum length of 128 characters (got {})", name.len()),
        ));
    }
    matches_pattern(
        keys::STACK_NAME,
        name,
        &STACK_NAME_PATTERN,
        "must start with a letter and contain only alphanumeric characters and hyphens",
    )
}

/// MySQL database names: letter first, alphanumeric, 1-64 characters
pub fn validate_database_name(name: &str) -> Result<(), ConfigError> {
    non_empty(keys::DB_NAME, name)?;
    matches_pattern(
        keys::DB_NAME,
        name,
        &DATABASE_NAME_PATTERN,
        "must start with a letter, contain only alphanumeric characters and be at most 64 characters",
    )
}

/// MySQL master usernames: letter first, alphanumeric or underscore, 1-16 characters
pub fn validate_database_username(username: &str) -> Result<(), ConfigError> {
    non_empty(keys::DB_USER, username)?;
    matches_pattern(
        keys::DB_USER,
        username,
        &USERNAME_PATTERN,
        "must start with a letter, contain only alphanumeric characters or underscores and be at most 16 characters",
    )?;

    let lowered = username.to_lowercase();
    if RESERVED_USERNAMES.contains(&lowered.as_str()) {
        return Err(ConfigError::invalid(
            keys::DB_USER,
            username,
            "is reserved by the database engine",
        ));
    }
    Ok(())
}

/// Subnet sizing must fit a public and a private subnet per zone inside the VPC range
pub fn validate_network(network: &NetworkSettings) -> Result<(), ConfigError> {
    if network.max_azs == 0 || network.max_azs > MAX_SUPPORTED_AZS {
        return Err(ConfigError::invalid(
            keys::MAX_AZS,
            network.max_azs,
            format!("must be between 1 and {MAX_SUPPORTED_AZS}"),
        ));
    }

    let mask = network.subnet_cidr_mask;
    if !(VPC_PREFIX_LEN..=MAX_SUBNET_CIDR_MASK).contains(&mask) {
        return Err(ConfigError::invalid(
            keys::SUBNET_CIDR_MASK,
            mask,
            format!("must be between {VPC_PREFIX_LEN} and {MAX_SUBNET_CIDR_MASK}"),
        ));
    }

    let available = 1u32 << (mask - VPC_PREFIX_LEN);
    let required = 2 * u32::from(network.max_azs);
    if required > available {
        return Err(ConfigError::invalid(
            keys::SUBNET_CIDR_MASK,
            mask,
            format!(
                "/{VPC_PREFIX_LEN} network holds only {available} /{mask} subnets, {required} needed for {} zones",
                network.max_azs
            ),
        ));
    }
    Ok(())
}

fn non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty {
            key: key.to_string(),
        });
    }
    Ok(())
}

fn matches_pattern(key: &str, value: &str, pattern: &Regex, reason: &str) -> Result<(), ConfigError> {
    if !pattern.is_match(value) {
        return Err(ConfigError::invalid(key, value, reason));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_database_names() {
        let longest = "a".repeat(64);
        for name in ["shop", "Bookstore", "db1", longest.as_str()] {
            assert!(validate_database_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_database_names() {
        let too_long = "a".repeat(65);
        for name in ["1shop", "shop-db", "shop db", "shop_db", too_long.as_str()] {
            let err = validate_database_name(name).unwrap_err();
            assert_eq!(err.key(), Some("DB_NAME"), "{name} should be rejected");
        }
        assert!(matches!(
            validate_database_name(""),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn test_usernames() {
        assert!(validate_database_username("admin").is_ok());
        assert!(validate_database_username("book_admin").is_ok());
        assert!(validate_database_username("_admin").is_err());
        assert!(validate_database_username("a_very_long_username").is_err());
        assert!(validate_database_username("RdsAdmin").is_err());
        assert!(validate_database_username("root").is_err());
        assert!(validate_database_username("Root").is_err());
    }

    #[test]
    fn test_patterns_compile_once() {
        for pattern in [&STACK_NAME_PATTERN, &DATABASE_NAME_PATTERN, &USERNAME_PATTERN] {
            assert!(LazyLock::force(pattern).is_match("Bookstore"));
        }
    }

    #[test]
    fn test_stack_names() {
        assert!(validate_stack_name("BookstoreStack").is_ok());
        assert!(validate_stack_name("bookstore-dev").is_ok());
        assert!(validate_stack_name("-bookstore").is_err());
        assert!(validate_stack_name("bookstore_dev").is_err());
        assert!(validate_stack_name(&format!("b{}", "x".repeat(128))).is_err());
    }

    #[test]
    fn test_network_bounds() {
        let ok = |max_azs, subnet_cidr_mask| {
            validate_network(&NetworkSettings {
                max_azs,
                subnet_cidr_mask,
            })
            .is_ok()
        };

        assert!(ok(2, 24));
        assert!(ok(6, 28));
        assert!(ok(1, 17));
        assert!(!ok(0, 24));
        assert!(!ok(7, 24));
        assert!(!ok(2, 15));
        assert!(!ok(2, 29));
        // /16 cannot be split into a public and a private subnet
        assert!(!ok(1, 16));
        // /18 yields 4 subnets, three zones need 6
        assert!(!ok(3, 18));
    }
}
