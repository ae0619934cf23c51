// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! File-backed CDI spec publication.
//!
//! Specs are written as `<specName>.json` under the CDI root. Every write
//! goes to a hidden temporary file in the same directory, is synced, and is
//! then renamed over the target, so a runtime scanning the directory sees
//! either the old spec or the new one.

use crate::spec::{claim_device_name, validate_name, CdiDevice, CdiKind, COMMON_DEVICE_NAME};
use crate::{CdiError, CdiSpec, ContainerEdits, DescriptorPublisher};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const SPEC_EXTENSION: &str = "json";

/// Publishes CDI specs into a spec directory.
#[derive(Debug, Clone)]
pub struct CdiHandler {
    root: PathBuf,
    kind: CdiKind,
    driver_name: String,
    node_name: String,
}

impl CdiHandler {
    /// Creates a handler for `root`, creating the directory if needed.
    pub fn new(root: &Path, driver_name: &str, node_name: &str) -> Result<Self, CdiError> {
        std::fs::create_dir_all(root).map_err(|e| CdiError::Root {
            path: root.display().to_string(),
            source: e,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            kind: CdiKind::for_driver(driver_name),
            driver_name: driver_name.to_string(),
            node_name: node_name.to_string(),
        })
    }

    /// The spec directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `vendor/class` this handler publishes under.
    pub fn kind(&self) -> &CdiKind {
        &self.kind
    }

    /// Path of the spec file for a transient id.
    pub fn spec_path(&self, transient_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.{SPEC_EXTENSION}", self.kind.spec_name(transient_id)))
    }

    /// Reads a published spec back, if present.
    pub fn read_spec(&self, transient_id: &str) -> Result<Option<CdiSpec>, CdiError> {
        let spec = self.kind.spec_name(transient_id);
        let path = self.spec_path(transient_id);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CdiError::List {
                path: path.display().to_string(),
                source: e,
            }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CdiError::Encode { spec, source: e })
    }

    fn write_spec(&self, spec: &CdiSpec, transient_id: &str) -> Result<(), CdiError> {
        let name = self.kind.spec_name(transient_id);
        let payload = serde_json::to_vec_pretty(spec).map_err(|e| CdiError::Encode {
            spec: name.clone(),
            source: e,
        })?;

        let target = self.spec_path(transient_id);
        let tmp = self.root.join(format!(".{name}.{SPEC_EXTENSION}.tmp"));
        if let Err(e) = write_then_rename(&tmp, &target, &payload) {
            let _ = std::fs::remove_file(&tmp);
            return Err(CdiError::Write {
                spec: name,
                source: e,
            });
        }
        sync_directory(&self.root).map_err(|e| CdiError::Write {
            spec: name,
            source: e,
        })?;

        tracing::debug!("wrote CDI spec {}", target.display());
        Ok(())
    }
}

impl DescriptorPublisher for CdiHandler {
    fn publish_common(&self) -> Result<(), CdiError> {
        let mut spec = self.kind.new_spec();
        spec.devices.push(CdiDevice {
            name: COMMON_DEVICE_NAME.to_string(),
            container_edits: ContainerEdits {
                env: vec![
                    format!("KUBERNETES_NODE_NAME={}", self.node_name),
                    format!("DRA_RESOURCE_DRIVER_NAME={}", self.driver_name),
                ],
            },
        });
        self.write_spec(&spec, COMMON_DEVICE_NAME)?;
        tracing::info!("published common CDI spec for node '{}'", self.node_name);
        Ok(())
    }

    fn publish_claim(
        &self,
        claim_uid: &str,
        device_names: &[String],
        edits: &ContainerEdits,
    ) -> Result<(), CdiError> {
        validate_claim_uid(claim_uid)?;

        let mut spec = self.kind.new_spec();
        for device in device_names {
            let name = claim_device_name(claim_uid, device);
            validate_name(&name)?;
            spec.devices.push(CdiDevice {
                name,
                container_edits: ContainerEdits::default(),
            });
        }
        spec.container_edits = edits.clone();

        self.write_spec(&spec, claim_uid)
    }

    fn retract_claim(&self, claim_uid: &str) -> Result<(), CdiError> {
        validate_claim_uid(claim_uid)?;
        let path = self.spec_path(claim_uid);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("removed CDI spec {}", path.display());
                sync_directory(&self.root).map_err(|e| CdiError::Remove {
                    spec: self.kind.spec_name(claim_uid),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CdiError::Remove {
                spec: self.kind.spec_name(claim_uid),
                source: e,
            }),
        }
    }

    fn resolve_names(&self, claim_uid: &str, device_names: &[String]) -> Vec<String> {
        std::iter::once(self.kind.qualified_name(COMMON_DEVICE_NAME))
            .chain(
                device_names
                    .iter()
                    .map(|d| self.kind.qualified_name(&claim_device_name(claim_uid, d))),
            )
            .collect()
    }

    fn published_claims(&self) -> Result<Vec<String>, CdiError> {
        let list_err = |e: std::io::Error| CdiError::List {
            path: self.root.display().to_string(),
            source: e,
        };
        let prefix = format!("{}_", self.kind.spec_name_prefix());
        let suffix = format!(".{SPEC_EXTENSION}");

        let mut claims = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let claim_uid = file_name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(suffix.as_str()));
            if let Some(uid) = claim_uid {
                if uid != COMMON_DEVICE_NAME {
                    claims.push(uid.to_string());
                }
            }
        }
        claims.sort();
        Ok(claims)
    }
}

fn write_then_rename(tmp: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut f = File::create(tmp)?;
    f.write_all(payload)?;
    f.sync_all()?;
    std::fs::rename(tmp, target)
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> std::io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Claim UIDs become part of a file name and must not collide with the
/// common spec.
fn validate_claim_uid(claim_uid: &str) -> Result<(), CdiError> {
    validate_name(claim_uid)?;
    if claim_uid == COMMON_DEVICE_NAME {
        return Err(CdiError::InvalidName {
            name: claim_uid.to_string(),
            detail: "reserved for the common spec".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handler(dir: &TempDir) -> CdiHandler {
        CdiHandler::new(dir.path(), "cpu.nvidia.com", "node-a").unwrap()
    }

    #[test]
    fn test_publish_common() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        h.publish_common().unwrap();

        let spec = h.read_spec(COMMON_DEVICE_NAME).unwrap().unwrap();
        assert_eq!(spec.kind, "k8s.cpu.nvidia.com/cpu");
        assert_eq!(spec.devices.len(), 1);
        assert_eq!(spec.devices[0].name, "common");
        assert_eq!(
            spec.devices[0].container_edits.env,
            vec![
                "KUBERNETES_NODE_NAME=node-a".to_string(),
                "DRA_RESOURCE_DRIVER_NAME=cpu.nvidia.com".to_string(),
            ]
        );
        // Common spec is idempotent.
        h.publish_common().unwrap();
        assert!(h.published_claims().unwrap().is_empty());
    }

    #[test]
    fn test_publish_and_retract_claim() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        let edits = ContainerEdits::env("CPU_my-claim", "5");

        h.publish_claim("abc", &["cpu-5".to_string()], &edits).unwrap();
        assert!(dir.path().join("k8s.cpu.nvidia.com-cpu_abc.json").exists());

        let spec = h.read_spec("abc").unwrap().unwrap();
        assert_eq!(spec.devices[0].name, "abc-cpu-5");
        assert_eq!(spec.container_edits, edits);
        assert_eq!(h.published_claims().unwrap(), vec!["abc".to_string()]);

        h.retract_claim("abc").unwrap();
        assert!(h.read_spec("abc").unwrap().is_none());
        // Retracting again is a no-op.
        h.retract_claim("abc").unwrap();
    }

    #[test]
    fn test_republish_overwrites() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        h.publish_claim("abc", &["cpu-1".to_string()], &ContainerEdits::env("CPU_c", "1"))
            .unwrap();
        h.publish_claim("abc", &["cpu-2".to_string()], &ContainerEdits::env("CPU_c", "2"))
            .unwrap();

        let spec = h.read_spec("abc").unwrap().unwrap();
        assert_eq!(spec.devices.len(), 1);
        assert_eq!(spec.devices[0].name, "abc-cpu-2");
        assert_eq!(h.published_claims().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_names() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        let names = h.resolve_names("abc", &["cpu-5".to_string(), "cpu-6".to_string()]);
        assert_eq!(
            names,
            vec![
                "k8s.cpu.nvidia.com/cpu=common".to_string(),
                "k8s.cpu.nvidia.com/cpu=abc-cpu-5".to_string(),
                "k8s.cpu.nvidia.com/cpu=abc-cpu-6".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_unsafe_claim_uid() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        let edits = ContainerEdits::default();
        assert!(matches!(
            h.publish_claim("../x", &[], &edits),
            Err(CdiError::InvalidName { .. })
        ));
        assert!(matches!(
            h.publish_claim("common", &[], &edits),
            Err(CdiError::InvalidName { .. })
        ));
        assert!(h.retract_claim("a/b").is_err());
    }

    #[test]
    fn test_write_failure_leaves_no_spec() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        // A directory at the target path makes the rename fail.
        std::fs::create_dir(h.spec_path("abc")).unwrap();

        let err = h
            .publish_claim("abc", &["cpu-5".to_string()], &ContainerEdits::default())
            .unwrap_err();
        assert!(matches!(err, CdiError::Write { .. }));
        assert!(h.spec_path("abc").is_dir());
        assert!(!dir.path().join(".k8s.cpu.nvidia.com-cpu_abc.json.tmp").exists());
    }

    fn hidden_files(dir: &TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect()
    }

    #[test]
    fn test_stale_temp_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        let tmp = dir.path().join(".k8s.cpu.nvidia.com-cpu_abc.json.tmp");
        std::fs::write(&tmp, "partial").unwrap();

        h.publish_claim("abc", &["cpu-5".to_string()], &ContainerEdits::default())
            .unwrap();
        assert!(h.read_spec("abc").unwrap().is_some());
        assert!(hidden_files(&dir).is_empty());
    }

    #[test]
    fn test_temp_creation_failure_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        // A directory at the temp path makes the create fail.
        std::fs::create_dir(dir.path().join(".k8s.cpu.nvidia.com-cpu_abc.json.tmp")).unwrap();

        let err = h
            .publish_claim("abc", &["cpu-5".to_string()], &ContainerEdits::default())
            .unwrap_err();
        assert!(matches!(err, CdiError::Write { .. }));
        assert!(h.read_spec("abc").unwrap().is_none());
        assert!(h.published_claims().unwrap().is_empty());
    }

    #[test]
    fn test_successful_writes_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        h.publish_common().unwrap();
        h.publish_claim("abc", &["cpu-5".to_string()], &ContainerEdits::default())
            .unwrap();
        h.retract_claim("abc").unwrap();
        assert!(hidden_files(&dir).is_empty());
    }

    #[test]
    fn test_published_claims_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let h = handler(&dir);
        std::fs::write(dir.path().join("other-vendor-gpu_abc.json"), "{}").unwrap();
        std::fs::write(dir.path().join("k8s.cpu.nvidia.com-cpu_x.yaml"), "").unwrap();
        h.publish_common().unwrap();
        h.publish_claim("z1", &[], &ContainerEdits::default()).unwrap();
        assert_eq!(h.published_claims().unwrap(), vec!["z1".to_string()]);
    }
}
