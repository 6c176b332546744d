//! Trusted CA bundle
//!
//! The bundle is published as a ConfigMap and mounted read-only into every
//! workload that talks TLS to another component.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMapVolumeSource, Volume, VolumeMount};
use tracing::debug;
use vantage_common::kube_utils::deterministic_hash;
use vantage_common::{OsType, Result, HASH_ANNOTATION_PREFIX};

use crate::{validate_certificate_pem, TrustedBundleSource};

/// Name of the ConfigMap holding the bundle
pub const TRUSTED_CERT_CONFIG_MAP_NAME: &str = "tigera-ca-bundle";

/// Directory the bundle ConfigMap is mounted at
pub const TRUSTED_CERT_MOUNT_DIR: &str = "/etc/pki/tls/certs";

/// File name of the bundle inside the mount directory
pub const TRUSTED_BUNDLE_FILE_NAME: &str = "tigera-ca-bundle.crt";

/// Aggregated set of trusted CA certificates, keyed by certificate name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrustedBundle {
    certificates: BTreeMap<String, String>,
}

impl TrustedBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named PEM certificate, replacing any previous one with that name
    pub fn add_certificate(
        &mut self,
        name: impl Into<String>,
        pem: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let pem = pem.into();
        validate_certificate_pem(&name, &pem)?;
        debug!(certificate = %name, "adding certificate to trusted bundle");
        self.certificates.insert(name, pem);
        Ok(())
    }

    /// Builder-style [`add_certificate`](Self::add_certificate)
    pub fn with_certificate(
        mut self,
        name: impl Into<String>,
        pem: impl Into<String>,
    ) -> Result<Self> {
        self.add_certificate(name, pem)?;
        Ok(self)
    }

    /// Number of certificates in the bundle
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the bundle holds no certificates
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Concatenated PEM content, in certificate-name order
    pub fn pem(&self) -> String {
        self.certificates.values().map(String::as_str).collect()
    }
}

impl TrustedBundleSource for TrustedBundle {
    fn mount_path(&self) -> String {
        format!("{TRUSTED_CERT_MOUNT_DIR}/{TRUSTED_BUNDLE_FILE_NAME}")
    }

    fn volume(&self) -> Volume {
        Volume {
            name: TRUSTED_CERT_CONFIG_MAP_NAME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: TRUSTED_CERT_CONFIG_MAP_NAME.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn volume_mounts(&self, os: OsType) -> Vec<VolumeMount> {
        let mount_path = match os {
            OsType::Linux => TRUSTED_CERT_MOUNT_DIR.to_string(),
            OsType::Windows => format!("c:{TRUSTED_CERT_MOUNT_DIR}"),
        };
        vec![VolumeMount {
            name: TRUSTED_CERT_CONFIG_MAP_NAME.to_string(),
            mount_path,
            read_only: Some(true),
            ..Default::default()
        }]
    }

    fn hash_annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            format!("{HASH_ANNOTATION_PREFIX}/{TRUSTED_CERT_CONFIG_MAP_NAME}"),
            deterministic_hash(&self.pem()),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TEST_PEM;

    #[test]
    fn mount_path_points_at_bundle_file() {
        let bundle = TrustedBundle::new();
        assert_eq!(bundle.mount_path(), "/etc/pki/tls/certs/tigera-ca-bundle.crt");
    }

    #[test]
    fn volume_is_backed_by_config_map() {
        let volume = TrustedBundle::new().volume();
        assert_eq!(volume.name, TRUSTED_CERT_CONFIG_MAP_NAME);
        assert_eq!(volume.config_map.unwrap().name, TRUSTED_CERT_CONFIG_MAP_NAME);
    }

    #[test]
    fn mounts_are_read_only() {
        let mounts = TrustedBundle::new().volume_mounts(OsType::Linux);
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, TRUSTED_CERT_MOUNT_DIR);
        assert_eq!(mounts[0].read_only, Some(true));
    }

    #[test]
    fn hash_follows_content() {
        let empty = TrustedBundle::new().hash_annotations();
        let with_ca = TrustedBundle::new()
            .with_certificate("tigera-ca-private", TEST_PEM)
            .unwrap()
            .hash_annotations();
        let key = "hash.operator.tigera.io/tigera-ca-bundle";
        assert!(empty.contains_key(key));
        assert_ne!(empty[key], with_ca[key]);
    }

    #[test]
    fn adding_same_name_replaces() {
        let mut bundle = TrustedBundle::new();
        bundle.add_certificate("ca", TEST_PEM).unwrap();
        bundle.add_certificate("ca", TEST_PEM).unwrap();
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn invalid_certificate_is_rejected() {
        let mut bundle = TrustedBundle::new();
        assert!(bundle.add_certificate("ca", "garbage").is_err());
        assert!(bundle.is_empty());
    }
}
