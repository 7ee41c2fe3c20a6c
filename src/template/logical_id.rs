//! # Logical IDs
//!
//! Template-unique resource keys derived from a declaration path.
//!
//! A path such as `BookStoreVpc/PublicSubnet1/Subnet` becomes
//! `BookStoreVpcPublicSubnet1Subnet` followed by the first eight hex digits of
//! the MD5 of the full path, so two paths that collapse to the same
//! alphanumeric text still get distinct IDs. Top-level paths keep their name
//! unhashed. `Resource` and `Default` components only contribute to the hash.

use crate::constants::LOGICAL_ID_HASH_LEN;
use serde::Serialize;
use std::fmt;

/// CloudFormation limit on logical ID length
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Components hidden from the human-readable part of an ID
const HIDDEN_COMPONENTS: &[&str] = &["Resource", "Default"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Wrap an already-unique ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an ID from path components
    pub fn from_path<S: AsRef<str>>(components: &[S]) -> Self {
        let components: Vec<&str> = components.iter().map(AsRef::as_ref).collect();

        if let [single] = components.as_slice() {
            return Self(alphanumeric(single));
        }

        let human: String = components
            .iter()
            .filter(|c| !HIDDEN_COMPONENTS.contains(*c))
            .map(|c| alphanumeric(c))
            .collect();
        let digest = format!("{:X}", md5::compute(components.join("/")));
        let hash = &digest[..LOGICAL_ID_HASH_LEN];

        let max_human = MAX_LOGICAL_ID_LEN - LOGICAL_ID_HASH_LEN;
        let human = if human.len() > max_human {
            &human[..max_human]
        } else {
            human.as_str()
        };
        Self(format!("{human}{hash}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Position in the declaration tree
///
/// The root is the stack; it names resources (`Name` tags) but is not part
/// of their logical IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    stack: String,
    path: Vec<String>,
}

impl Scope {
    pub fn root(stack_name: impl Into<String>) -> Self {
        Self {
            stack: stack_name.into(),
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(name.into());
        Self {
            stack: self.stack.clone(),
            path,
        }
    }

    /// Logical ID of the resource declared at this scope
    pub fn logical_id(&self) -> LogicalId {
        LogicalId::from_path(&self.path)
    }

    /// Shorthand for `self.child(name).logical_id()`
    pub fn id(&self, name: &str) -> LogicalId {
        self.child(name).logical_id()
    }

    /// Full path including the stack, as used for `Name` tags
    pub fn path(&self) -> String {
        std::iter::once(self.stack.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("/")
    }
}
