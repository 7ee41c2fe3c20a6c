//! # Intrinsic Values
//!
//! Property values that are either literals or CloudFormation intrinsic
//! functions (`Ref`, `Fn::GetAtt`, `Fn::Join`, `Fn::Select`, `Fn::GetAZs`).

use super::logical_id::LogicalId;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Pseudo parameters resolved by the deployment engine
pub mod pseudo {
    pub const REGION: &str = "AWS::Region";
    pub const PARTITION: &str = "AWS::Partition";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain string literal
    Literal(String),
    /// `{"Ref": name}`, a logical ID or pseudo parameter
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`
    GetAtt(LogicalId, String),
    /// `{"Fn::Join": [separator, [parts...]]}`
    Join(String, Vec<Value>),
    /// `{"Fn::Select": [index, list]}`
    Select(u32, Box<Value>),
    /// `{"Fn::GetAZs": ""}`, the zones of the deploying region
    AvailabilityZones,
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Self {
        Value::Literal(s.into())
    }

    pub fn reference(id: &LogicalId) -> Self {
        Value::Ref(id.to_string())
    }

    pub fn pseudo(name: &str) -> Self {
        Value::Ref(name.to_string())
    }

    pub fn get_att(id: &LogicalId, attribute: impl Into<String>) -> Self {
        Value::GetAtt(id.clone(), attribute.into())
    }

    /// Concatenation without separator
    pub fn concat(parts: Vec<Value>) -> Self {
        Value::Join(String::new(), parts)
    }

    /// The `index`-th availability zone of the region
    pub fn availability_zone(index: u32) -> Self {
        Value::Select(index, Box::new(Value::AvailabilityZones))
    }

    /// Whether this value points at `id` through `Ref` or `Fn::GetAtt`
    pub fn references(&self, id: &LogicalId) -> bool {
        match self {
            Value::Ref(name) => name == id.as_str(),
            Value::GetAtt(target, _) => target == id,
            Value::Join(_, parts) => parts.iter().any(|p| p.references(id)),
            Value::Select(_, inner) => inner.references(id),
            Value::Literal(_) | Value::AvailabilityZones => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Literal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Literal(s)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Literal(s) => serializer.serialize_str(s),
            Value::Ref(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", name)?;
                map.end()
            }
            Value::GetAtt(id, attribute) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &(id, attribute))?;
                map.end()
            }
            Value::Join(separator, parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(separator, parts))?;
                map.end()
            }
            Value::Select(index, list) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &SelectArgs(*index, list))?;
                map.end()
            }
            Value::AvailabilityZones => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAZs", "")?;
                map.end()
            }
        }
    }
}

// Fn::Select takes its index as a string or number; templates conventionally use a number
struct SelectArgs<'a>(u32, &'a Value);

impl Serialize for SelectArgs<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.0)?;
        seq.serialize_element(self.1)?;
        seq.end()
    }
}
