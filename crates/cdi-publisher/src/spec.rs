// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CDI spec model and naming rules.
//!
//! A spec file describes a set of devices under one `vendor/class` kind and
//! the container edits a runtime applies when a container requests them.
//!
//! # Format
//! ```json
//! {
//!   "cdiVersion": "0.3.0",
//!   "kind": "k8s.cpu.nvidia.com/cpu",
//!   "devices": [
//!     { "name": "abc-cpu-5" }
//!   ],
//!   "containerEdits": {
//!     "env": ["CPU_my-claim=5"]
//!   }
//! }
//! ```

use crate::CdiError;

/// Spec version written to every file. `0.3.0` is the oldest version that
/// can express named devices with environment edits.
pub const SPEC_VERSION: &str = "0.3.0";

/// Device class for CPU units.
pub const CDI_CLASS: &str = "cpu";

/// Name of the device in the common spec.
pub const COMMON_DEVICE_NAME: &str = "common";

/// Edits applied to a container's OCI spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEdits {
    /// Environment entries in `KEY=VALUE` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

impl ContainerEdits {
    /// Creates edits with a single environment entry.
    pub fn env(key: &str, value: &str) -> Self {
        Self {
            env: vec![format!("{key}={value}")],
        }
    }

    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.env.is_empty()
    }
}

/// One device entry in a spec.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdiDevice {
    /// Device name, unique within the spec's kind.
    pub name: String,
    /// Edits applied when this device is requested.
    #[serde(default, skip_serializing_if = "ContainerEdits::is_empty")]
    pub container_edits: ContainerEdits,
}

/// A complete CDI spec file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdiSpec {
    /// Spec format version.
    pub cdi_version: String,
    /// `vendor/class` of every device in the spec.
    pub kind: String,
    /// Devices described by this spec.
    pub devices: Vec<CdiDevice>,
    /// Edits applied whenever any device of this spec is requested.
    #[serde(default, skip_serializing_if = "ContainerEdits::is_empty")]
    pub container_edits: ContainerEdits,
}

/// The `vendor/class` pair that scopes all names this driver publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdiKind {
    vendor: String,
    class: String,
}

impl CdiKind {
    /// Kind for a driver: vendor `k8s.<driver>`, class `cpu`.
    pub fn for_driver(driver_name: &str) -> Self {
        Self {
            vendor: format!("k8s.{driver_name}"),
            class: CDI_CLASS.to_string(),
        }
    }

    /// Vendor part.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// `vendor/class`.
    pub fn kind(&self) -> String {
        format!("{}/{}", self.vendor, self.class)
    }

    /// Spec name for a transient spec: `vendor-class_<id>`.
    pub fn spec_name(&self, transient_id: &str) -> String {
        format!("{}_{transient_id}", self.spec_name_prefix())
    }

    /// Prefix shared by every spec name of this kind, without the `_`.
    pub fn spec_name_prefix(&self) -> String {
        format!("{}-{}", self.vendor, self.class)
    }

    /// Fully qualified device name: `vendor/class=name`.
    pub fn qualified_name(&self, device_name: &str) -> String {
        format!("{}/{}={device_name}", self.vendor, self.class)
    }

    /// Builds an empty spec of this kind.
    pub fn new_spec(&self) -> CdiSpec {
        CdiSpec {
            cdi_version: SPEC_VERSION.to_string(),
            kind: self.kind(),
            devices: Vec::new(),
            container_edits: ContainerEdits::default(),
        }
    }
}

/// Name of a claim's device inside the claim spec: `<claimUID>-<device>`.
pub fn claim_device_name(claim_uid: &str, device_name: &str) -> String {
    format!("{claim_uid}-{device_name}")
}

/// Checks that `name` may appear in a CDI device or spec name.
///
/// Allowed: ASCII alphanumerics plus `-`, `_`, `.` and `:`, starting with an
/// alphanumeric. This also keeps names from escaping the spec directory.
pub fn validate_name(name: &str) -> Result<(), CdiError> {
    let invalid = |detail: &str| CdiError::InvalidName {
        name: name.to_string(),
        detail: detail.to_string(),
    };
    let first = name.chars().next().ok_or_else(|| invalid("name is empty"))?;
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with a letter or digit"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
    {
        return Err(invalid(&format!("character '{c}' is not allowed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_naming() {
        let k = CdiKind::for_driver("cpu.nvidia.com");
        assert_eq!(k.vendor(), "k8s.cpu.nvidia.com");
        assert_eq!(k.kind(), "k8s.cpu.nvidia.com/cpu");
        assert_eq!(k.spec_name("abc"), "k8s.cpu.nvidia.com-cpu_abc");
        assert_eq!(
            k.qualified_name(&claim_device_name("abc", "cpu-5")),
            "k8s.cpu.nvidia.com/cpu=abc-cpu-5"
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("abc").is_ok());
        assert!(validate_name("0b1d-11ee.x:y_z").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("-abc").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[test]
    fn test_spec_serialization_skips_empty_edits() {
        let k = CdiKind::for_driver("cpu.nvidia.com");
        let mut spec = k.new_spec();
        spec.devices.push(CdiDevice {
            name: "abc-cpu-5".into(),
            container_edits: ContainerEdits::default(),
        });
        spec.container_edits = ContainerEdits::env("CPU_claim", "5");

        let json: serde_json::Value = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["cdiVersion"], "0.3.0");
        assert_eq!(json["kind"], "k8s.cpu.nvidia.com/cpu");
        assert!(json["devices"][0].get("containerEdits").is_none());
        assert_eq!(json["containerEdits"]["env"][0], "CPU_claim=5");
    }
}
