// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation claims as handed over by the scheduler.
//!
//! A [`Claim`] is read-only to this crate: the scheduler has already decided
//! which devices it gets. The driver only applies that decision.
//!
//! # JSON Format
//! ```json
//! {
//!   "uid": "abc",
//!   "name": "my-claim",
//!   "namespace": "default",
//!   "allocation": {
//!     "results": [
//!       { "request": "cpus", "driver": "cpu.nvidia.com", "pool": "worker-1", "device": "cpu-5" }
//!     ]
//!   }
//! }
//! ```

use crate::StateError;
use std::path::Path;

/// One device picked for one request of a claim.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceAllocationResult {
    /// Name of the request inside the claim.
    pub request: String,
    /// Driver that owns the device.
    pub driver: String,
    /// Resource pool the device belongs to.
    pub pool: String,
    /// Device name within the pool.
    pub device: String,
}

/// The scheduler's allocation decision for a claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AllocationResult {
    /// Picked devices, in scheduler order.
    #[serde(default)]
    pub results: Vec<DeviceAllocationResult>,
}

/// A resource claim.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Claim {
    /// Globally unique claim identifier.
    pub uid: String,
    /// Claim name; used in the environment edit.
    pub name: String,
    /// Namespace the claim lives in.
    #[serde(default)]
    pub namespace: String,
    /// `None` until the scheduler has allocated the claim.
    #[serde(default)]
    pub allocation: Option<AllocationResult>,
}

impl Claim {
    /// Parses a claim from JSON.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        serde_json::from_str(json)
            .map_err(|e| StateError::InvalidClaim(format!("malformed claim JSON: {e}")))
    }

    /// Loads a claim from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, StateError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StateError::InvalidClaim(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Checks the fields every operation relies on.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.uid.trim().is_empty() {
            return Err(StateError::InvalidClaim("claim uid must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(StateError::InvalidClaim(format!(
                "claim '{}' has an empty name",
                self.uid
            )));
        }
        Ok(())
    }

    /// Allocation results owned by `driver`, in scheduler order.
    ///
    /// Fails with [`StateError::ClaimNotAllocated`] if the claim has no
    /// allocation yet.
    pub fn results_for_driver(
        &self,
        driver: &str,
    ) -> Result<Vec<&DeviceAllocationResult>, StateError> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| StateError::ClaimNotAllocated {
                claim_uid: self.uid.clone(),
            })?;
        Ok(allocation
            .results
            .iter()
            .filter(|r| r.driver == driver)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "uid": "abc",
            "name": "my-claim",
            "allocation": {
                "results": [
                    { "request": "cpus", "driver": "cpu.nvidia.com", "pool": "node-a", "device": "cpu-5" },
                    { "request": "gpus", "driver": "gpu.nvidia.com", "pool": "node-a", "device": "gpu-0" }
                ]
            }
        }"#
    }

    #[test]
    fn test_parse() {
        let claim = Claim::from_json(sample_json()).unwrap();
        assert_eq!(claim.uid, "abc");
        assert_eq!(claim.namespace, "");
        assert_eq!(claim.allocation.as_ref().unwrap().results.len(), 2);
        assert!(claim.validate().is_ok());
    }

    #[test]
    fn test_filters_by_driver() {
        let claim = Claim::from_json(sample_json()).unwrap();
        let ours = claim.results_for_driver("cpu.nvidia.com").unwrap();
        assert_eq!(ours.len(), 1);
        assert_eq!(ours[0].device, "cpu-5");
        assert!(claim.results_for_driver("other.example.com").unwrap().is_empty());
    }

    #[test]
    fn test_unallocated() {
        let claim = Claim::from_json(r#"{"uid":"u1","name":"c"}"#).unwrap();
        assert!(matches!(
            claim.results_for_driver("cpu.nvidia.com"),
            Err(StateError::ClaimNotAllocated { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let mut claim = Claim::from_json(sample_json()).unwrap();
        claim.uid = "".into();
        assert!(matches!(claim.validate(), Err(StateError::InvalidClaim(_))));

        let mut claim = Claim::from_json(sample_json()).unwrap();
        claim.name = " ".into();
        assert!(claim.validate().is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            Claim::from_json("{ not json"),
            Err(StateError::InvalidClaim(_))
        ));
        assert!(Claim::from_file(Path::new("/nonexistent/claim.json")).is_err());
    }
}
