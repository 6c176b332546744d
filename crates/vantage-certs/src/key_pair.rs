//! Component TLS key pairs
//!
//! A key pair reaches its workload in one of three ways, recorded as a
//! [`Provisioning`] tag rather than a set of booleans:
//!
//! - `SelfSigned`: a literal self-signed secret supplied by the caller
//! - `OperatorManaged`: a secret signed by the operator's CA
//! - `InitContainer`: an emptyDir filled at pod start by a key-cert-provisioner
//!   init container that submits a CSR to an external signer

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, EnvVarSource, ObjectFieldSelector,
    SecretVolumeSource, Volume, VolumeMount,
};
use vantage_common::crd::CertificateManagement;
use vantage_common::kube_utils::{deterministic_hash, restricted_security_context};
use vantage_common::{Error, OsType, Result, HASH_ANNOTATION_PREFIX};

use crate::{secret_mount_dir, validate_certificate_pem, KeyPairSource};

const CSR_SHARE_DIR: &str = "/certs-share";
const DEFAULT_KEY_ALGORITHM: &str = "RSAWithSize2048";
const DEFAULT_SIGNATURE_ALGORITHM: &str = "SHA256WithRSA";

/// Settings of the key-cert-provisioner init container
#[derive(Clone, Debug, PartialEq)]
pub struct CsrProvisioner {
    /// Kubernetes signer the CSR is addressed to
    pub signer_name: String,
    /// Key algorithm for the generated key
    pub key_algorithm: String,
    /// Signature algorithm for the CSR
    pub signature_algorithm: String,
    /// Resolved key-cert-provisioner image reference
    pub image: String,
}

impl CsrProvisioner {
    /// Build provisioner settings from the installation's certificate management block
    pub fn from_certificate_management(
        cm: &CertificateManagement,
        image: impl Into<String>,
    ) -> Self {
        Self {
            signer_name: cm.signer_name.clone(),
            key_algorithm: cm
                .key_algorithm
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_ALGORITHM.to_string()),
            signature_algorithm: cm
                .signature_algorithm
                .clone()
                .unwrap_or_else(|| DEFAULT_SIGNATURE_ALGORITHM.to_string()),
            image: image.into(),
        }
    }
}

/// How a key pair reaches the workload
#[derive(Clone, Debug, PartialEq)]
pub enum Provisioning {
    /// Caller-supplied self-signed secret
    SelfSigned,
    /// Secret signed by the operator CA
    OperatorManaged,
    /// Provisioned at pod start through a CSR
    InitContainer(CsrProvisioner),
}

/// TLS key pair of a component
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPair {
    secret_name: String,
    provisioning: Provisioning,
    dns_names: Vec<String>,
    cert_pem: Option<String>,
}

impl KeyPair {
    /// Key pair backed by a caller-supplied self-signed certificate
    pub fn self_signed(
        secret_name: impl Into<String>,
        cert_pem: impl Into<String>,
    ) -> Result<Self> {
        let secret_name = secret_name.into();
        let cert_pem = cert_pem.into();
        validate_certificate_pem(&secret_name, &cert_pem)?;
        Ok(Self {
            secret_name,
            provisioning: Provisioning::SelfSigned,
            dns_names: Vec::new(),
            cert_pem: Some(cert_pem),
        })
    }

    /// Key pair signed by the operator CA
    pub fn operator_managed(
        secret_name: impl Into<String>,
        dns_names: Vec<String>,
        cert_pem: impl Into<String>,
    ) -> Result<Self> {
        let secret_name = secret_name.into();
        let cert_pem = cert_pem.into();
        validate_certificate_pem(&secret_name, &cert_pem)?;
        Ok(Self {
            secret_name,
            provisioning: Provisioning::OperatorManaged,
            dns_names,
            cert_pem: Some(cert_pem),
        })
    }

    /// Key pair provisioned by an init container through an external signer
    pub fn provisioned(
        secret_name: impl Into<String>,
        dns_names: Vec<String>,
        provisioner: CsrProvisioner,
    ) -> Result<Self> {
        let secret_name = secret_name.into();
        if provisioner.signer_name.is_empty() {
            return Err(Error::certificate(&secret_name, "signer name is empty"));
        }
        if provisioner.image.is_empty() {
            return Err(Error::certificate(
                &secret_name,
                "key-cert-provisioner image is empty",
            ));
        }
        Ok(Self {
            secret_name,
            provisioning: Provisioning::InitContainer(provisioner),
            dns_names,
            cert_pem: None,
        })
    }
}

impl KeyPairSource for KeyPair {
    fn secret_name(&self) -> &str {
        &self.secret_name
    }

    fn provisioning(&self) -> &Provisioning {
        &self.provisioning
    }

    fn volume(&self) -> Volume {
        match self.provisioning {
            Provisioning::InitContainer(_) => Volume {
                name: self.secret_name.clone(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            },
            Provisioning::SelfSigned | Provisioning::OperatorManaged => Volume {
                name: self.secret_name.clone(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(self.secret_name.clone()),
                    default_mode: Some(0o420),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn volume_mount(&self, os: OsType) -> VolumeMount {
        VolumeMount {
            name: self.secret_name.clone(),
            mount_path: secret_mount_dir(&self.secret_name, os),
            read_only: Some(true),
            ..Default::default()
        }
    }

    fn cert_file_path(&self, os: OsType) -> String {
        format!("{}/tls.crt", secret_mount_dir(&self.secret_name, os))
    }

    fn key_file_path(&self, os: OsType) -> String {
        format!("{}/tls.key", secret_mount_dir(&self.secret_name, os))
    }

    fn init_container(&self) -> Option<Container> {
        let Provisioning::InitContainer(csr) = &self.provisioning else {
            return None;
        };

        let env = vec![
            literal("SIGNER", &csr.signer_name),
            literal("DNS_NAMES", self.dns_names.join(",")),
            literal("CERTIFICATE_PATH", format!("{CSR_SHARE_DIR}/")),
            literal("KEY_ALGORITHM", &csr.key_algorithm),
            literal("SIGNATURE_ALGORITHM", &csr.signature_algorithm),
            literal("SECRET_NAME", &self.secret_name),
            field_ref("POD_NAME", "metadata.name"),
            field_ref("POD_NAMESPACE", "metadata.namespace"),
            field_ref("POD_IP", "status.podIP"),
        ];

        Some(Container {
            name: self.init_container_name(),
            image: Some(csr.image.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            env: Some(env),
            volume_mounts: Some(vec![VolumeMount {
                name: self.secret_name.clone(),
                mount_path: CSR_SHARE_DIR.to_string(),
                ..Default::default()
            }]),
            security_context: Some(restricted_security_context()),
            ..Default::default()
        })
    }

    fn hash_annotations(&self) -> BTreeMap<String, String> {
        self.cert_pem
            .as_deref()
            .map(|pem| {
                BTreeMap::from([(
                    format!("{HASH_ANNOTATION_PREFIX}/{}", self.secret_name),
                    deterministic_hash(pem),
                )])
            })
            .unwrap_or_default()
    }
}

fn literal(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

fn field_ref(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TEST_PEM;
    use rstest::rstest;

    const SECRET: &str = "policy-recommendation-tls";

    fn provisioner() -> CsrProvisioner {
        CsrProvisioner::from_certificate_management(
            &CertificateManagement {
                ca_cert: TEST_PEM.to_string(),
                signer_name: "example.com/signer".to_string(),
                key_algorithm: None,
                signature_algorithm: None,
            },
            "quay.io/tigera/key-cert-provisioner:v1.2.0",
        )
    }

    fn provisioned() -> KeyPair {
        KeyPair::provisioned(SECRET, vec!["svc".to_string()], provisioner()).unwrap()
    }

    #[test]
    fn paths_live_under_secret_mount() {
        let kp = KeyPair::self_signed(SECRET, TEST_PEM).unwrap();
        assert_eq!(kp.cert_file_path(OsType::Linux), "/policy-recommendation-tls/tls.crt");
        assert_eq!(kp.key_file_path(OsType::Linux), "/policy-recommendation-tls/tls.key");
        assert_eq!(kp.volume_mount(OsType::Linux).mount_path, "/policy-recommendation-tls");
    }

    #[rstest]
    #[case::self_signed(KeyPair::self_signed(SECRET, TEST_PEM).unwrap())]
    #[case::operator_managed(KeyPair::operator_managed(SECRET, vec![], TEST_PEM).unwrap())]
    fn secret_backed_pairs_have_no_init_container(#[case] kp: KeyPair) {
        assert!(kp.init_container().is_none());
        let volume = kp.volume();
        assert_eq!(volume.secret.unwrap().secret_name.as_deref(), Some(SECRET));
        assert!(!kp.hash_annotations().is_empty());
    }

    #[test]
    fn provisioned_pair_renders_init_container() {
        let kp = provisioned();
        let init = kp.init_container().unwrap();
        assert_eq!(init.name, "policy-recommendation-tls-key-cert-provisioner");
        assert_eq!(
            init.image.as_deref(),
            Some("quay.io/tigera/key-cert-provisioner:v1.2.0")
        );
        let env = init.env.unwrap();
        let signer = env.iter().find(|e| e.name == "SIGNER").unwrap();
        assert_eq!(signer.value.as_deref(), Some("example.com/signer"));
        let algo = env.iter().find(|e| e.name == "KEY_ALGORITHM").unwrap();
        assert_eq!(algo.value.as_deref(), Some(DEFAULT_KEY_ALGORITHM));
    }

    #[test]
    fn init_container_name_follows_secret_name() {
        let kp = KeyPair::provisioned("linseed-tls", vec![], provisioner()).unwrap();
        assert_eq!(kp.secret_name(), "linseed-tls");
        assert_eq!(kp.init_container_name(), "linseed-tls-key-cert-provisioner");
        assert_eq!(kp.init_container().unwrap().name, kp.init_container_name());
    }

    #[test]
    fn provisioned_pair_uses_empty_dir() {
        let volume = provisioned().volume();
        assert!(volume.empty_dir.is_some());
        assert!(volume.secret.is_none());
    }

    #[test]
    fn provisioned_pair_has_no_hash_annotation() {
        assert!(provisioned().hash_annotations().is_empty());
    }

    #[test]
    fn provisioned_pair_requires_signer() {
        let mut csr = provisioner();
        csr.signer_name.clear();
        let err = KeyPair::provisioned(SECRET, vec![], csr).unwrap_err();
        assert!(err.to_string().contains("signer name"));
    }

    #[test]
    fn self_signed_requires_certificate() {
        assert!(KeyPair::self_signed(SECRET, "").is_err());
    }
}
