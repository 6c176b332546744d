//! Certificate material consumed by component renderers
//!
//! Renderers never generate key material. They receive pre-resolved sources
//! through two read-only seams:
//!
//! - [`TrustedBundleSource`]: the aggregated CA bundle mounted into workloads
//! - [`KeyPairSource`]: a component's own TLS key pair, either stored in a
//!   secret or provisioned at pod start by an init container
//!
//! [`TrustedBundle`] and [`KeyPair`] are the concrete implementations used by
//! the operator and by tests.

mod key_pair;
mod trusted_bundle;

use std::collections::BTreeMap;
use std::fmt::Debug;

use k8s_openapi::api::core::v1::{Container, Volume, VolumeMount};
use vantage_common::OsType;

pub use key_pair::{CsrProvisioner, KeyPair, Provisioning};
pub use trusted_bundle::{
    TrustedBundle, TRUSTED_BUNDLE_FILE_NAME, TRUSTED_CERT_CONFIG_MAP_NAME, TRUSTED_CERT_MOUNT_DIR,
};

/// Read-only view of a trusted CA bundle
pub trait TrustedBundleSource: Debug + Send + Sync {
    /// Path of the bundle file inside the container
    fn mount_path(&self) -> String;

    /// Volume backing the bundle
    fn volume(&self) -> Volume;

    /// Mounts exposing the bundle to a container
    fn volume_mounts(&self, os: OsType) -> Vec<VolumeMount>;

    /// Pod annotations that change whenever the bundle content changes
    fn hash_annotations(&self) -> BTreeMap<String, String>;
}

/// Read-only view of a component key pair
pub trait KeyPairSource: Debug + Send + Sync {
    /// Name of the secret holding (or receiving) the key pair
    fn secret_name(&self) -> &str;

    /// How the key pair reaches the workload
    fn provisioning(&self) -> &Provisioning;

    /// Volume backing the key pair
    fn volume(&self) -> Volume;

    /// Mount exposing the key pair to a container
    fn volume_mount(&self, os: OsType) -> VolumeMount;

    /// Path of the certificate file inside the container
    fn cert_file_path(&self, os: OsType) -> String;

    /// Path of the private key file inside the container
    fn key_file_path(&self, os: OsType) -> String;

    /// Name of the init container provisioning the key pair
    fn init_container_name(&self) -> String {
        format!("{}{KEY_CERT_PROVISIONER_SUFFIX}", self.secret_name())
    }

    /// Init container that provisions the key pair, if provisioning needs one
    fn init_container(&self) -> Option<Container>;

    /// Pod annotations that change whenever the certificate changes
    fn hash_annotations(&self) -> BTreeMap<String, String>;
}

/// Suffix appended to the secret name to name the provisioning init container
pub const KEY_CERT_PROVISIONER_SUFFIX: &str = "-key-cert-provisioner";

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Check that `pem` holds at least one PEM certificate block.
fn validate_certificate_pem(secret: &str, pem: &str) -> vantage_common::Result<()> {
    if pem.trim().is_empty() {
        return Err(vantage_common::Error::certificate(
            secret,
            "certificate PEM is empty",
        ));
    }
    if !pem.contains(PEM_CERTIFICATE_HEADER) {
        return Err(vantage_common::Error::certificate(
            secret,
            "certificate PEM has no CERTIFICATE block",
        ));
    }
    Ok(())
}

/// Directory a secret-backed volume is mounted at
fn secret_mount_dir(name: &str, os: OsType) -> String {
    match os {
        OsType::Linux => format!("/{name}"),
        OsType::Windows => format!("c:/{name}"),
    }
}
