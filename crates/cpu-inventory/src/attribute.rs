// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed device attribute values.
//!
//! Every attribute on an [`AllocatableUnit`](crate::AllocatableUnit) carries
//! exactly one kind of value. The kind is part of the serialized form:
//!
//! ```json
//! { "int": 5 }
//! { "string": "amd64" }
//! { "version": "1.0.0" }
//! ```

use crate::InventoryError;
use std::fmt;

/// A single attribute value, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    /// Free-form string (e.g., the CPU architecture).
    String(String),
    /// Signed integer (e.g., thread id, parent core id, NUMA node).
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// Semantic version string, `MAJOR.MINOR.PATCH`.
    Version(String),
}

impl AttributeValue {
    /// Creates a version attribute, rejecting anything that is not
    /// `MAJOR.MINOR.PATCH` with numeric components.
    pub fn version(s: &str) -> Result<Self, InventoryError> {
        let parts: Vec<&str> = s.split('.').collect();
        let well_formed = parts.len() == 3
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !well_formed {
            return Err(InventoryError::InvalidVersion(s.to_string()));
        }
        Ok(Self::Version(s.to_string()))
    }

    /// Returns the integer value, if this is an `Int` attribute.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value for `String` and `Version` attributes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Version(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the kind name used in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Version(_) => "version",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Version(v) => write!(f, "v{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_accepts_semver() {
        let v = AttributeValue::version("1.0.0").unwrap();
        assert_eq!(v.as_str(), Some("1.0.0"));
        assert_eq!(v.kind(), "version");
    }

    #[test]
    fn test_version_rejects_malformed() {
        assert!(AttributeValue::version("1.0").is_err());
        assert!(AttributeValue::version("1.x.0").is_err());
        assert!(AttributeValue::version("").is_err());
        assert!(AttributeValue::version("1..0").is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(AttributeValue::Int(5).as_int(), Some(5));
        assert_eq!(AttributeValue::Int(5).as_str(), None);
        assert_eq!(AttributeValue::String("amd64".into()).as_int(), None);
        assert_eq!(AttributeValue::Bool(true).as_str(), None);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = serde_json::to_string(&AttributeValue::Int(7)).unwrap();
        assert_eq!(json, r#"{"int":7}"#);

        let back: AttributeValue = serde_json::from_str(r#"{"version":"1.2.3"}"#).unwrap();
        assert_eq!(back, AttributeValue::Version("1.2.3".into()));
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Int(3).to_string(), "3");
        assert_eq!(AttributeValue::Version("1.0.0".into()).to_string(), "v1.0.0");
    }
}
