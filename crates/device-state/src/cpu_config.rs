// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The driver's typed device configuration, `CpuConfig`.
//!
//! # JSON Format
//! ```json
//! {
//!   "apiVersion": "cpu.nvidia.com/v1alpha1",
//!   "kind": "CpuConfig",
//!   "count": 16
//! }
//! ```
//!
//! Decoding is strict: unknown fields are rejected, and a JSON `null` is a
//! nil config, which both [`normalize_config`] and [`validate_config`]
//! refuse.

use crate::ConfigError;

/// API group of the driver's configuration types.
pub const GROUP_NAME: &str = "cpu.nvidia.com";
/// API version of the configuration types.
pub const VERSION: &str = "v1alpha1";
/// Kind name of [`CpuConfig`].
pub const CPU_CONFIG_KIND: &str = "CpuConfig";
/// Unit count implied when none is given.
pub const DEFAULT_COUNT: i64 = 16;
/// Largest accepted unit count.
pub const MAX_COUNT: i64 = 1 << 15;

/// Parameters for configuring CPU units.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CpuConfig {
    /// `group/version` of this object.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Always `CpuConfig`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Unit count. Filled with [`DEFAULT_COUNT`] by normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

fn default_api_version() -> String {
    format!("{GROUP_NAME}/{VERSION}")
}

fn default_kind() -> String {
    CPU_CONFIG_KIND.to_string()
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            count: Some(DEFAULT_COUNT),
        }
    }
}

impl CpuConfig {
    /// Strictly decodes, normalizes and validates a JSON config.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let parsed: Option<CpuConfig> = serde_json::from_slice(bytes)?;
        let mut config = parsed.ok_or(ConfigError::Nil)?;
        normalize_config(Some(&mut config))?;
        validate_config(Some(&config))?;
        Ok(config)
    }

    /// The unit count, falling back to the default when unset.
    pub fn count(&self) -> i64 {
        self.count.unwrap_or(DEFAULT_COUNT)
    }
}

/// Fills implied defaults. Idempotent; fails only on a nil config.
pub fn normalize_config(config: Option<&mut CpuConfig>) -> Result<(), ConfigError> {
    let config = config.ok_or(ConfigError::Nil)?;
    if config.count.is_none() {
        config.count = Some(DEFAULT_COUNT);
    }
    Ok(())
}

/// Rejects nil or malformed configs. Never modifies its input.
pub fn validate_config(config: Option<&CpuConfig>) -> Result<(), ConfigError> {
    let config = config.ok_or(ConfigError::Nil)?;
    if config.api_version != default_api_version() {
        return Err(ConfigError::Invalid(format!(
            "unsupported apiVersion '{}', expected '{}'",
            config.api_version,
            default_api_version()
        )));
    }
    if config.kind != CPU_CONFIG_KIND {
        return Err(ConfigError::Invalid(format!(
            "unsupported kind '{}', expected '{CPU_CONFIG_KIND}'",
            config.kind
        )));
    }
    if let Some(count) = config.count {
        if count <= 0 {
            return Err(ConfigError::Invalid(format!(
                "count must be positive, got {count}"
            )));
        }
        if count > MAX_COUNT {
            return Err(ConfigError::Invalid(format!(
                "count must be at most {MAX_COUNT}, got {count}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = CpuConfig::default();
        assert_eq!(c.api_version, "cpu.nvidia.com/v1alpha1");
        assert_eq!(c.kind, "CpuConfig");
        assert_eq!(c.count, Some(16));
        assert!(validate_config(Some(&c)).is_ok());
    }

    #[test]
    fn test_nil_is_rejected() {
        assert!(matches!(normalize_config(None), Err(ConfigError::Nil)));
        assert!(matches!(validate_config(None), Err(ConfigError::Nil)));
        assert!(matches!(CpuConfig::decode(b"null"), Err(ConfigError::Nil)));
        assert_eq!(ConfigError::Nil.to_string(), "config is 'nil'");
    }

    #[test]
    fn test_normalize_fills_count_and_is_idempotent() {
        let mut c = CpuConfig {
            count: None,
            ..Default::default()
        };
        normalize_config(Some(&mut c)).unwrap();
        assert_eq!(c.count, Some(DEFAULT_COUNT));

        let before = c.clone();
        normalize_config(Some(&mut c)).unwrap();
        assert_eq!(c, before);
    }

    #[test]
    fn test_normalize_keeps_explicit_count() {
        let mut c = CpuConfig {
            count: Some(4),
            ..Default::default()
        };
        normalize_config(Some(&mut c)).unwrap();
        assert_eq!(c.count(), 4);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let bad_count = CpuConfig {
            count: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(Some(&bad_count)),
            Err(ConfigError::Invalid(_))
        ));

        let bad_kind = CpuConfig {
            kind: "GpuConfig".into(),
            ..Default::default()
        };
        assert!(validate_config(Some(&bad_kind)).is_err());

        let bad_version = CpuConfig {
            api_version: "cpu.nvidia.com/v2".into(),
            ..Default::default()
        };
        assert!(validate_config(Some(&bad_version)).is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_count() {
        let huge = CpuConfig {
            count: Some(3_000_000_000),
            ..Default::default()
        };
        let err = validate_config(Some(&huge)).unwrap_err();
        assert!(err.to_string().contains("at most 32768"));

        let largest = CpuConfig {
            count: Some(MAX_COUNT),
            ..Default::default()
        };
        assert!(validate_config(Some(&largest)).is_ok());
    }

    #[test]
    fn test_decode_strict() {
        let c = CpuConfig::decode(
            br#"{"apiVersion":"cpu.nvidia.com/v1alpha1","kind":"CpuConfig"}"#,
        )
        .unwrap();
        assert_eq!(c.count, Some(16));

        assert!(matches!(
            CpuConfig::decode(br#"{"kind":"CpuConfig","cores":4}"#),
            Err(ConfigError::Decode(_))
        ));
        assert!(CpuConfig::decode(br#"{"count":-1}"#).is_err());
    }
}
