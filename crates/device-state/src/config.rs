// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Driver configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! node_name = "worker-1"
//! driver_name = "cpu.nvidia.com"
//! cdi_root = "/var/run/cdi"
//! plugin_data_dir = "/var/lib/kubelet/plugins/cpu.nvidia.com"
//! checkpoint_file = "checkpoint.json"
//! threads_per_core = 2
//! numa_nodes = 2
//! inventory = "synthetic"
//!
//! [cpu]
//! count = 16
//! ```

use crate::cpu_config::validate_config;
use crate::{CpuConfig, StateError};
use cpu_inventory::{CpuTopology, MAX_THREADS};
use std::path::{Path, PathBuf};

/// Lock file name; hidden from checkpoint listings.
const LOCK_FILE: &str = ".lock";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config object was required but absent.
    #[error("config is 'nil'")]
    Nil,

    /// A config value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The config file could not be read.
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The TOML is malformed.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be written as TOML.
    #[error("TOML serialise error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A JSON device config could not be decoded.
    #[error("failed to decode device config: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the inventory comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventorySource {
    /// `cpu.count` cores laid out deterministically.
    #[default]
    Synthetic,
    /// Online hardware threads of this host.
    Host,
}

/// Configuration for the node-local driver state.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Node this driver runs on; exported to containers by the common spec.
    pub node_name: String,
    /// Driver identity. Allocation results for other drivers are ignored.
    pub driver_name: String,
    /// Directory CDI specs are published into.
    pub cdi_root: PathBuf,
    /// Directory holding the checkpoint.
    pub plugin_data_dir: PathBuf,
    /// Checkpoint file name inside `plugin_data_dir`.
    pub checkpoint_file: String,
    /// SMT width used to lay out the inventory.
    pub threads_per_core: u32,
    /// NUMA nodes cores are split across.
    pub numa_nodes: u32,
    /// Inventory source.
    pub inventory: InventorySource,
    /// Device configuration; `count` is the synthetic core count.
    pub cpu: CpuConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            node_name: std::env::var("NODE_NAME").unwrap_or_else(|_| "localhost".to_string()),
            driver_name: crate::cpu_config::GROUP_NAME.to_string(),
            cdi_root: PathBuf::from("/var/run/cdi"),
            plugin_data_dir: PathBuf::from("/var/lib/kubelet/plugins/cpu.nvidia.com"),
            checkpoint_file: "checkpoint.json".to_string(),
            threads_per_core: 2,
            numa_nodes: 2,
            inventory: InventorySource::Synthetic,
            cpu: CpuConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string and normalizes the device
    /// config.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        crate::cpu_config::normalize_config(Some(&mut config.cpu))?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::Invalid("node_name must not be empty".into()));
        }
        if self.driver_name.trim().is_empty() {
            return Err(ConfigError::Invalid("driver_name must not be empty".into()));
        }
        if self.checkpoint_file.is_empty()
            || self.checkpoint_file.starts_with('.')
            || self.checkpoint_file.contains(['/', '\\'])
        {
            return Err(ConfigError::Invalid(format!(
                "checkpoint_file must be a plain, non-hidden file name, got '{}'",
                self.checkpoint_file
            )));
        }
        if self.threads_per_core == 0 || self.numa_nodes == 0 {
            return Err(ConfigError::Invalid(
                "threads_per_core and numa_nodes must be positive".into(),
            ));
        }
        validate_config(Some(&self.cpu))?;
        if self.inventory == InventorySource::Synthetic {
            let cores = self.cpu.count();
            if cores % i64::from(self.numa_nodes) != 0 {
                return Err(ConfigError::Invalid(format!(
                    "{cores} cores cannot be split evenly across {} NUMA nodes",
                    self.numa_nodes
                )));
            }
            if cores * i64::from(self.threads_per_core) > i64::from(MAX_THREADS) {
                return Err(ConfigError::Invalid(format!(
                    "{cores} cores x {} threads exceeds {MAX_THREADS} hardware threads",
                    self.threads_per_core
                )));
            }
        }
        Ok(())
    }

    /// Resolves the CPU topology the inventory is built from.
    pub fn topology(&self) -> Result<CpuTopology, StateError> {
        let topology = match self.inventory {
            InventorySource::Synthetic => {
                let cores = u32::try_from(self.cpu.count()).map_err(|_| {
                    ConfigError::Invalid(format!("core count {} out of range", self.cpu.count()))
                })?;
                CpuTopology::new(cores, self.threads_per_core, self.numa_nodes)?
            }
            InventorySource::Host => CpuTopology::detect(self.threads_per_core, self.numa_nodes)?,
        };
        Ok(topology)
    }

    /// Lock file serializing state changes across processes.
    pub fn lock_path(&self) -> PathBuf {
        self.plugin_data_dir.join(LOCK_FILE)
    }

    /// Full path of the checkpoint file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.plugin_data_dir.join(&self.checkpoint_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = DriverConfig::default();
        assert_eq!(c.driver_name, "cpu.nvidia.com");
        assert_eq!(c.cdi_root, PathBuf::from("/var/run/cdi"));
        assert_eq!(c.checkpoint_file, "checkpoint.json");
        assert_eq!(c.inventory, InventorySource::Synthetic);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
node_name = "worker-1"
cdi_root = "/tmp/cdi"
threads_per_core = 1
numa_nodes = 4
inventory = "synthetic"

[cpu]
count = 8
"#;
        let c = DriverConfig::from_toml(toml).unwrap();
        assert_eq!(c.node_name, "worker-1");
        assert_eq!(c.cdi_root, PathBuf::from("/tmp/cdi"));
        assert_eq!(c.driver_name, "cpu.nvidia.com");
        assert_eq!(c.cpu.count(), 8);
        assert_eq!(c.cpu.api_version, "cpu.nvidia.com/v1alpha1");

        let t = c.topology().unwrap();
        assert_eq!(t.total_threads(), 8);
        assert_eq!(t.numa_nodes, 4);
    }

    #[test]
    fn test_from_toml_fills_missing_count() {
        let c = DriverConfig::from_toml("[cpu]\nkind = \"CpuConfig\"\n").unwrap();
        assert_eq!(c.cpu.count, Some(16));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = DriverConfig {
            node_name: "n1".into(),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = DriverConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty_node = DriverConfig {
            node_name: " ".into(),
            ..Default::default()
        };
        assert!(empty_node.validate().is_err());

        let nested_checkpoint = DriverConfig {
            checkpoint_file: "a/b.json".into(),
            ..Default::default()
        };
        assert!(nested_checkpoint.validate().is_err());

        let uneven = DriverConfig {
            numa_nodes: 3,
            ..Default::default()
        };
        assert!(uneven.validate().is_err());

        let zero_threads = DriverConfig {
            threads_per_core: 0,
            ..Default::default()
        };
        assert!(zero_threads.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_hidden_checkpoint_file() {
        for name in [".checkpoint.json", ".", "..", "a\\b.json"] {
            let c = DriverConfig {
                checkpoint_file: name.into(),
                ..Default::default()
            };
            assert!(
                matches!(c.validate(), Err(ConfigError::Invalid(_))),
                "accepted '{name}'"
            );
        }
    }

    #[test]
    fn test_validate_rejects_oversized_inventory() {
        let mut c = DriverConfig::default();
        c.cpu.count = Some(3_000_000_000);
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        // Within the count limit, but too many threads once multiplied.
        let mut c = DriverConfig {
            threads_per_core: 4,
            ..Default::default()
        };
        c.cpu.count = Some(crate::cpu_config::MAX_COUNT);
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds 65536 hardware threads"));
        assert!(c.topology().is_err());
    }

    #[test]
    fn test_unknown_cpu_field_is_rejected() {
        assert!(DriverConfig::from_toml("[cpu]\ncores = 4\n").is_err());
    }

    #[test]
    fn test_default_topology() {
        let t = DriverConfig::default().topology().unwrap();
        assert_eq!(t.cores, 16);
        assert_eq!(t.total_threads(), 32);
    }

    #[test]
    fn test_from_missing_file() {
        let err = DriverConfig::from_file(Path::new("/nonexistent/driver.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
