//! Installation CRD types
//!
//! Only the fields a component render pass reads are modelled: image
//! location, platform provider, control-plane scheduling overrides and the
//! certificate management block.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Toleration;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kubernetes platform the product is installed on
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum Provider {
    /// Generic upstream Kubernetes
    #[default]
    #[serde(rename = "")]
    None,
    /// Amazon EKS
    EKS,
    /// Google GKE
    GKE,
    /// Azure AKS
    AKS,
    /// Red Hat OpenShift
    OpenShift,
    /// Mirantis Kubernetes Engine
    DockerEnterprise,
    /// Rancher RKE2
    RKE2,
    /// VMware Tanzu
    TKG,
}

impl Provider {
    /// Whether this is Google GKE
    pub fn is_gke(self) -> bool {
        self == Self::GKE
    }

    /// Whether this is Red Hat OpenShift
    pub fn is_openshift(self) -> bool {
        self == Self::OpenShift
    }
}

/// Certificate management configuration.
///
/// When set, component key pairs are not stored as secrets by the operator;
/// each workload runs a key-cert-provisioner init container that submits a
/// CSR to the configured signer.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateManagement {
    /// PEM encoded CA certificate of the signer
    pub ca_cert: String,

    /// Kubernetes signer name the CSRs are addressed to
    pub signer_name: String,

    /// Key algorithm for generated keys (e.g. "RSAWithSize2048")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,

    /// Signature algorithm for CSRs (e.g. "SHA256WithRSA")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
}

/// Cluster-wide installation configuration
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.tigera.io",
    version = "v1",
    kind = "Installation",
    plural = "installations"
)]
#[serde(rename_all = "camelCase")]
pub struct InstallationSpec {
    /// Registry prefix for all images (e.g. "quay.io/")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Replaces the path component between registry and image name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Prefix added to every image name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prefix: Option<String>,

    /// Platform the cluster runs on
    #[serde(default)]
    pub kubernetes_provider: Provider,

    /// Replaces the default node selector of control-plane components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_node_selector: Option<BTreeMap<String, String>>,

    /// Replaces the default tolerations of control-plane components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_tolerations: Option<Vec<Toleration>>,

    /// Certificate management via an external signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_management: Option<CertificateManagement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_deserializes_from_operator_spelling() {
        let spec: InstallationSpec =
            serde_json::from_str(r#"{"kubernetesProvider":"GKE","registry":"r.io/"}"#).unwrap();
        assert!(spec.kubernetes_provider.is_gke());
        assert_eq!(spec.registry.as_deref(), Some("r.io/"));
    }

    #[test]
    fn empty_provider_is_generic() {
        let spec: InstallationSpec = serde_json::from_str(r#"{"kubernetesProvider":""}"#).unwrap();
        assert_eq!(spec.kubernetes_provider, Provider::None);
        assert!(!spec.kubernetes_provider.is_openshift());
    }

    #[test]
    fn missing_provider_defaults_to_generic() {
        let spec: InstallationSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, InstallationSpec::default());
    }

    #[test]
    fn tolerations_parse_as_core_types() {
        let spec: InstallationSpec = serde_json::from_str(
            r#"{"controlPlaneTolerations":[{"key":"foo","operator":"Equal","value":"bar"}]}"#,
        )
        .unwrap();
        let tolerations = spec.control_plane_tolerations.unwrap();
        assert_eq!(tolerations[0].key.as_deref(), Some("foo"));
        assert_eq!(tolerations[0].operator.as_deref(), Some("Equal"));
    }
}
