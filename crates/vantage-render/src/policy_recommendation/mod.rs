//! Policy recommendation component
//!
//! Renders the recommendation controller together with its RBAC and
//! `allow-tigera` policies. The controller is management-plane only: on a
//! managed cluster nothing is created and any leftovers are torn down.
//!
//! The service account and namespaced bindings are rendered once per binding
//! namespace. The ClusterRole and ClusterRoleBinding are shared across
//! tenants and rendered exactly once. The network policies and the deployment
//! carry this pass's tenant identity and are rendered only into the
//! component's own namespace, so passes for different tenants never write
//! the same object.

mod deployment;
mod policy;
mod rbac;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use tracing::{debug, info};
use vantage_certs::{KeyPairSource, TrustedBundleSource};
use vantage_common::crd::{is_multi_tenant, InstallationSpec, PolicyRecommendationSpec, Tenant};
use vantage_common::kube_utils::cluster_meta;
use vantage_common::{Error, OsType, Result};

use crate::component::{Component, ObjectSet, RenderedObject};
use crate::images::{self, POLICY_RECOMMENDATION_IMAGE};
use crate::network_policy::{self, PolicyHelper};

pub use deployment::{controller_env, managed_cluster_type, service_url};

/// Name shared by the service account, RBAC objects and deployment
pub const POLICY_RECOMMENDATION_NAME: &str = "tigera-policy-recommendation";

/// Product namespace in single-tenant installs
pub const POLICY_RECOMMENDATION_NAMESPACE: &str = "tigera-policy-recommendation";

/// Name of the controller container
pub const POLICY_RECOMMENDATION_CONTAINER_NAME: &str = "policy-recommendation-controller";

/// Secret holding the controller's client key pair
pub const POLICY_RECOMMENDATION_TLS_SECRET_NAME: &str = "policy-recommendation-tls";

/// Binding granting watch access on managed clusters
pub const MANAGED_CLUSTERS_WATCH_BINDING_NAME: &str =
    "tigera-policy-recommendation-managed-cluster-watch";

/// ClusterRole granting watch access on managed clusters
pub const MANAGED_CLUSTERS_WATCH_CLUSTER_ROLE_NAME: &str = "tigera-managed-cluster-watch";

/// Per-tenant binding granting access to that tenant's managed clusters
pub const MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_BINDING_NAME: &str =
    "tigera-policy-recommendation-managed-cluster-access";

/// ClusterRole granting access to a tenant's managed clusters
pub const MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_CLUSTER_ROLE_NAME: &str =
    "tigera-managed-cluster-access";

const COMPONENT: &str = POLICY_RECOMMENDATION_NAME;

/// Role of this cluster relative to the clusters it federates with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Neither managing nor managed
    Standalone,
    /// Manages other clusters
    Management,
    /// Managed by a management cluster
    Managed,
}

impl Topology {
    /// Topology from the two cluster-role flags; `managed` wins if both are set
    pub fn from_flags(managed_cluster: bool, management_cluster: bool) -> Self {
        match (managed_cluster, management_cluster) {
            (true, _) => Self::Managed,
            (false, true) => Self::Management,
            (false, false) => Self::Standalone,
        }
    }

    /// Value of the `CLUSTER_CONNECTION_TYPE` environment variable
    pub fn connection_type(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Management => "management",
            Self::Managed => "managed",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.connection_type())
    }
}

/// Everything one render pass of the component reads
#[derive(Clone, Debug)]
pub struct PolicyRecommendationConfig {
    /// Cluster DNS domain
    pub cluster_domain: String,
    /// Trusted CA bundle mounted into the controller
    pub trusted_bundle: Arc<dyn TrustedBundleSource>,
    /// Installation settings
    pub installation: InstallationSpec,
    /// This cluster is managed by a management cluster
    pub managed_cluster: bool,
    /// This cluster manages other clusters
    pub management_cluster: bool,
    /// Tenant the pass renders for, if any
    pub tenant: Option<Tenant>,
    /// Namespace the component is installed in
    pub namespace: String,
    /// Namespaces receiving the namespace-scoped objects
    pub binding_namespaces: Vec<String>,
    /// Linseed and Elasticsearch run outside the cluster
    pub external_elastic: bool,
    /// Controller client key pair
    pub key_pair: Arc<dyn KeyPairSource>,
    /// PolicyRecommendation customisation
    pub policy_recommendation: Option<PolicyRecommendationSpec>,
    /// Render OpenShift variants (SCC access, openshift-dns)
    pub openshift: bool,
}

impl PolicyRecommendationConfig {
    /// Cluster role derived from the two flags
    pub fn topology(&self) -> Topology {
        Topology::from_flags(self.managed_cluster, self.management_cluster)
    }

    /// Whether the pass renders for a tenant with its own namespace
    pub fn multi_tenant(&self) -> bool {
        is_multi_tenant(self.tenant.as_ref())
    }

    /// Where the manager and Linseed this pass talks to live.
    ///
    /// A multi-tenant pass against an external data store reaches the
    /// tenant's own instances; every other pass uses the fixed namespaces.
    pub fn service_locations(&self) -> PolicyHelper<'_> {
        let tenant_namespace = self
            .tenant
            .as_ref()
            .filter(|t| t.multi_tenant() && self.external_elastic)
            .and_then(|t| t.metadata.namespace.as_deref());
        PolicyHelper::new(tenant_namespace)
    }

    /// Check the snapshot contract before rendering
    pub fn validate(&self) -> Result<()> {
        if self.managed_cluster && self.management_cluster {
            return Err(Error::validation_for_field(
                COMPONENT,
                "managedCluster",
                "a cluster cannot be both managed and a management cluster",
            ));
        }
        if self.namespace.is_empty() {
            return Err(Error::validation_for_field(
                COMPONENT,
                "namespace",
                "namespace must not be empty",
            ));
        }
        if self.binding_namespaces.is_empty() {
            return Err(Error::validation_for_field(
                COMPONENT,
                "bindingNamespaces",
                "at least one binding namespace is required",
            ));
        }
        if let Some(ns) = self.binding_namespaces.iter().find(|ns| ns.is_empty()) {
            return Err(Error::validation_for_field(
                COMPONENT,
                "bindingNamespaces",
                format!("binding namespace {ns:?} is empty"),
            ));
        }
        if !self.binding_namespaces.contains(&self.namespace) {
            return Err(Error::validation_for_field(
                COMPONENT,
                "bindingNamespaces",
                format!(
                    "namespace {:?} must be a binding namespace so its service account is rendered",
                    self.namespace
                ),
            ));
        }
        if let Some(registry) = self.installation.registry.as_deref() {
            images::validate_registry(registry)?;
        }
        Ok(())
    }
}

/// The policy recommendation component
#[derive(Debug)]
pub struct PolicyRecommendationComponent {
    config: PolicyRecommendationConfig,
    image: String,
}

impl PolicyRecommendationComponent {
    /// Component rendering `config`, using the default image until images are resolved
    pub fn new(config: PolicyRecommendationConfig) -> Self {
        let image = images::default_reference(&config.installation, &POLICY_RECOMMENDATION_IMAGE);
        Self { config, image }
    }

    /// Validate `config` and build the component
    pub fn try_new(config: PolicyRecommendationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Snapshot the component renders from
    pub fn config(&self) -> &PolicyRecommendationConfig {
        &self.config
    }

    /// Controller image reference
    pub fn image(&self) -> &str {
        &self.image
    }

    fn render(&self) -> Vec<RenderedObject> {
        let cfg = &self.config;
        let namespaces = &cfg.binding_namespaces;
        let own = cfg.namespace.as_str();
        let mut objects: Vec<RenderedObject> = Vec::new();

        objects.extend(
            namespaces
                .iter()
                .map(|ns| RenderedObject::from(rbac::service_account(ns))),
        );
        objects.push(rbac::cluster_role(cfg).into());
        objects.push(rbac::cluster_role_binding(namespaces).into());
        if cfg.multi_tenant() {
            for ns in namespaces {
                objects.push(rbac::managed_clusters_watch_role_binding(ns).into());
                objects.push(rbac::managed_clusters_access_role_binding(ns).into());
            }
        } else {
            objects.push(rbac::managed_clusters_watch_cluster_role_binding(namespaces).into());
        }
        objects.push(network_policy::default_deny(own).into());
        objects.push(policy::allow_tigera_policy(cfg).into());
        objects.push(deployment::deployment(cfg, &self.image).into());
        objects
    }
}

/// Objects a non-managed install leaves behind, named statically
fn managed_cluster_teardown() -> Vec<RenderedObject> {
    vec![
        Namespace {
            metadata: cluster_meta(POLICY_RECOMMENDATION_NAMESPACE),
            ..Default::default()
        }
        .into(),
        ClusterRole {
            metadata: cluster_meta(POLICY_RECOMMENDATION_NAME),
            ..Default::default()
        }
        .into(),
        ClusterRoleBinding {
            metadata: cluster_meta(POLICY_RECOMMENDATION_NAME),
            ..Default::default()
        }
        .into(),
    ]
}

impl Component for PolicyRecommendationComponent {
    fn resolve_images(&mut self, overrides: Option<&BTreeMap<String, String>>) -> Result<()> {
        self.image = images::resolve(
            &self.config.installation,
            &POLICY_RECOMMENDATION_IMAGE,
            overrides,
        )?;
        debug!(image = %self.image, "resolved policy recommendation image");
        Ok(())
    }

    fn objects(&self) -> ObjectSet {
        let topology = self.config.topology();
        let set = match topology {
            Topology::Managed => ObjectSet {
                to_create: Vec::new(),
                to_delete: managed_cluster_teardown(),
            },
            Topology::Standalone | Topology::Management => ObjectSet {
                to_create: self.render(),
                to_delete: Vec::new(),
            },
        };
        info!(
            component = COMPONENT,
            %topology,
            multi_tenant = self.config.multi_tenant(),
            create = set.to_create.len(),
            delete = set.to_delete.len(),
            "rendered component"
        );
        set
    }

    fn supported_os_type(&self) -> OsType {
        OsType::Linux
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{config, tenant};
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::standalone(false, false, Topology::Standalone)]
    #[case::management(false, true, Topology::Management)]
    #[case::managed(true, false, Topology::Managed)]
    #[case::contradictory(true, true, Topology::Managed)]
    fn topology_from_flags(
        #[case] managed: bool,
        #[case] management: bool,
        #[case] expected: Topology,
    ) {
        assert_eq!(Topology::from_flags(managed, management), expected);
    }

    type Config = PolicyRecommendationConfig;

    fn both_roles(c: &mut Config) {
        c.managed_cluster = true;
        c.management_cluster = true;
    }

    fn no_bindings(c: &mut Config) {
        c.binding_namespaces.clear();
    }

    fn blank_binding(c: &mut Config) {
        c.binding_namespaces.push(String::new());
    }

    fn namespace_not_bound(c: &mut Config) {
        c.namespace = "other".to_string();
    }

    fn bad_registry(c: &mut Config) {
        c.installation.registry = Some("https://r.io/".to_string());
    }

    #[test]
    fn validate_accepts_default_snapshot() {
        assert!(config().validate().is_ok());
    }

    #[rstest]
    #[case::both_roles(both_roles, "managedCluster")]
    #[case::empty_namespace(|c: &mut Config| c.namespace.clear(), "namespace")]
    #[case::no_bindings(no_bindings, "bindingNamespaces")]
    #[case::blank_binding(blank_binding, "bindingNamespaces")]
    #[case::namespace_not_bound(namespace_not_bound, "bindingNamespaces")]
    #[case::bad_registry(bad_registry, "registry")]
    fn validate_rejects(#[case] mutate: fn(&mut Config), #[case] expected_field: &str) {
        let mut cfg = config();
        mutate(&mut cfg);
        match cfg.validate().unwrap_err() {
            Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some(expected_field)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(PolicyRecommendationComponent::try_new(cfg).is_err());
    }

    #[test]
    fn contradictory_flags_render_teardown_without_panicking() {
        let mut cfg = config();
        cfg.managed_cluster = true;
        cfg.management_cluster = true;
        let set = PolicyRecommendationComponent::new(cfg).objects();
        assert!(set.to_create.is_empty());
        assert_eq!(set.to_delete.len(), 3);
    }

    #[test]
    fn multi_tenant_requires_tenant_namespace() {
        let mut cfg = config();
        cfg.tenant = Some(tenant(None, "id"));
        assert!(!cfg.multi_tenant());
        cfg.tenant = Some(tenant(Some("tenant-a"), "id"));
        assert!(cfg.multi_tenant());
    }

    #[rstest]
    #[case::internal_store(false, None)]
    #[case::external_store(true, Some("tenant-a"))]
    fn service_locations_follow_data_store(
        #[case] external: bool,
        #[case] expected: Option<&str>,
    ) {
        let mut cfg = config();
        cfg.tenant = Some(tenant(Some("tenant-a"), "id"));
        cfg.external_elastic = external;
        let fixed = PolicyHelper::new(expected);
        let helper = cfg.service_locations();
        assert_eq!(helper.linseed_namespace(), fixed.linseed_namespace());
        assert_eq!(helper.manager_namespace(), fixed.manager_namespace());
    }

    #[test]
    fn single_tenant_services_stay_fixed_with_external_store() {
        let mut cfg = config();
        cfg.tenant = Some(tenant(None, "id"));
        cfg.external_elastic = true;
        assert_eq!(cfg.service_locations().linseed_namespace(), "tigera-elasticsearch");
    }

    #[test]
    fn objects_use_default_image_before_resolution() {
        let component = PolicyRecommendationComponent::new(config());
        assert!(component.image().starts_with("quay.io/tigera/policy-recommendation:"));
    }

    #[test]
    fn failed_resolution_keeps_previous_image() {
        let mut component = PolicyRecommendationComponent::new(config());
        let before = component.image().to_string();
        let overrides = BTreeMap::from([(
            "tigera/policy-recommendation".to_string(),
            "sha256:nothex".to_string(),
        )]);
        assert!(component.resolve_images(Some(&overrides)).is_err());
        assert_eq!(component.image(), before);
    }

    #[test]
    fn supports_linux_only() {
        let component = PolicyRecommendationComponent::new(config());
        assert_eq!(component.supported_os_type(), OsType::Linux);
    }
}
