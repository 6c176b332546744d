//! Render file loading
//!
//! A render file is a YAML document describing one configuration snapshot.
//! Certificate material is given declaratively and turned into the provider
//! objects the renderer consumes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use vantage_certs::{CsrProvisioner, KeyPair, TrustedBundle};
use vantage_common::crd::{
    InstallationSpec, PolicyRecommendationSpec, ProductVariant, Tenant, TenantSpec,
};
use vantage_common::{Error, Result, DEFAULT_CLUSTER_DOMAIN};
use vantage_render::images::{self, KEY_CERT_PROVISIONER_IMAGE};
use vantage_render::policy_recommendation::{
    POLICY_RECOMMENDATION_NAMESPACE, POLICY_RECOMMENDATION_TLS_SECRET_NAME,
};
use vantage_render::PolicyRecommendationConfig;

fn default_cluster_domain() -> String {
    DEFAULT_CLUSTER_DOMAIN.to_string()
}

/// Snapshot description read from disk
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenderFile {
    /// Cluster DNS domain
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,
    /// Installation settings
    #[serde(default)]
    pub installation: InstallationSpec,
    /// This cluster is managed by a management cluster
    #[serde(default)]
    pub managed_cluster: bool,
    /// This cluster manages other clusters
    #[serde(default)]
    pub management_cluster: bool,
    /// Tenant to render for
    #[serde(default)]
    pub tenant: Option<TenantFile>,
    /// Component namespace; defaults to the tenant's or the product namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Namespaces receiving namespace-scoped objects; defaults to `[namespace]`
    #[serde(default)]
    pub binding_namespaces: Vec<String>,
    /// Linseed and Elasticsearch run outside the cluster
    #[serde(default)]
    pub external_elastic: bool,
    /// Render OpenShift variants; implied by an OpenShift provider
    #[serde(default)]
    pub openshift: bool,
    /// PolicyRecommendation customisation
    #[serde(default)]
    pub policy_recommendation: Option<PolicyRecommendationSpec>,
    /// Trusted CA certificates by name
    #[serde(default)]
    pub trusted_certificates: BTreeMap<String, String>,
    /// Controller key pair
    pub key_pair: KeyPairFile,
    /// Image overrides keyed by `<path>/<name>`
    #[serde(default)]
    pub image_overrides: BTreeMap<String, String>,
}

/// Tenant description
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TenantFile {
    /// Tenant resource name
    pub name: String,
    /// Tenant namespace; absent for single-tenant installs
    #[serde(default)]
    pub namespace: Option<String>,
    /// Tenant identifier
    #[serde(default)]
    pub id: String,
    /// Product variant of the tenant's managed clusters
    #[serde(default)]
    pub managed_cluster_variant: Option<ProductVariant>,
}

impl TenantFile {
    fn into_tenant(self) -> Tenant {
        let mut tenant = Tenant::new(
            &self.name,
            TenantSpec {
                id: self.id,
                managed_cluster_variant: self.managed_cluster_variant,
            },
        );
        tenant.metadata.namespace = self.namespace;
        tenant
    }
}

/// Key pair description, tagged by how the pair reaches the workload
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "provisioning", rename_all = "camelCase")]
pub enum KeyPairFile {
    /// Caller-supplied self-signed certificate
    #[serde(rename_all = "camelCase")]
    SelfSigned {
        /// PEM certificate
        cert_pem: String,
    },
    /// Certificate signed by the operator CA
    #[serde(rename_all = "camelCase")]
    OperatorManaged {
        /// PEM certificate
        cert_pem: String,
        /// DNS names on the certificate
        #[serde(default)]
        dns_names: Vec<String>,
    },
    /// Provisioned at pod start through the installation's certificate management
    #[serde(rename_all = "camelCase")]
    InitContainer {
        /// DNS names requested in the CSR
        #[serde(default)]
        dns_names: Vec<String>,
    },
}

impl RenderFile {
    /// Read and parse a render file
    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(&origin, format!("failed to read: {e}")))?;
        Self::from_yaml(&content, &origin)
    }

    /// Parse a render file from YAML; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::config(origin, e.to_string()))
    }

    fn key_pair(&self, overrides: &BTreeMap<String, String>) -> Result<KeyPair> {
        let secret = POLICY_RECOMMENDATION_TLS_SECRET_NAME;
        match &self.key_pair {
            KeyPairFile::SelfSigned { cert_pem } => KeyPair::self_signed(secret, cert_pem.as_str()),
            KeyPairFile::OperatorManaged {
                cert_pem,
                dns_names,
            } => KeyPair::operator_managed(secret, dns_names.clone(), cert_pem.as_str()),
            KeyPairFile::InitContainer { dns_names } => {
                let cm = self
                    .installation
                    .certificate_management
                    .as_ref()
                    .ok_or_else(|| {
                        Error::certificate(
                            secret,
                            "initContainer provisioning needs installation.certificateManagement",
                        )
                    })?;
                let image = images::resolve(
                    &self.installation,
                    &KEY_CERT_PROVISIONER_IMAGE,
                    Some(overrides),
                )?;
                KeyPair::provisioned(
                    secret,
                    dns_names.clone(),
                    CsrProvisioner::from_certificate_management(cm, image),
                )
            }
        }
    }

    fn trusted_bundle(&self) -> Result<TrustedBundle> {
        let mut bundle = TrustedBundle::new();
        for (name, pem) in &self.trusted_certificates {
            bundle.add_certificate(name.as_str(), pem.as_str())?;
        }
        if let Some(cm) = &self.installation.certificate_management {
            bundle.add_certificate("certificate-management-ca", cm.ca_cert.as_str())?;
        }
        Ok(bundle)
    }

    /// Build the render snapshot and the merged image overrides.
    ///
    /// `extra_overrides` win over the file's own `imageOverrides`.
    pub fn into_config(
        self,
        extra_overrides: &BTreeMap<String, String>,
    ) -> Result<(PolicyRecommendationConfig, BTreeMap<String, String>)> {
        let mut overrides = self.image_overrides.clone();
        overrides.extend(extra_overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let key_pair = self.key_pair(&overrides)?;
        let trusted_bundle = self.trusted_bundle()?;
        let tenant = self.tenant.map(TenantFile::into_tenant);
        let openshift = self.openshift || self.installation.kubernetes_provider.is_openshift();

        let namespace = self.namespace.unwrap_or_else(|| match &tenant {
            Some(t) if t.multi_tenant() => t.tenant_namespace(),
            _ => POLICY_RECOMMENDATION_NAMESPACE.to_string(),
        });
        let binding_namespaces = if self.binding_namespaces.is_empty() {
            vec![namespace.clone()]
        } else {
            self.binding_namespaces
        };
        debug!(
            namespace = %namespace,
            bindings = binding_namespaces.len(),
            overrides = overrides.len(),
            "loaded render file"
        );

        let config = PolicyRecommendationConfig {
            cluster_domain: self.cluster_domain,
            trusted_bundle: Arc::new(trusted_bundle),
            installation: self.installation,
            managed_cluster: self.managed_cluster,
            management_cluster: self.management_cluster,
            tenant,
            namespace,
            binding_namespaces,
            external_elastic: self.external_elastic,
            key_pair: Arc::new(key_pair),
            policy_recommendation: self.policy_recommendation,
            openshift,
        };
        config.validate()?;
        Ok((config, overrides))
    }
}

/// Parse a `name=value` image override
pub fn parse_image_override(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected <path>/<name>=<reference>, got {s:?}")),
    }
}
