//! Common types for Vantage: CRDs, errors, and shared constants

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Namespaces
// =============================================================================

/// Namespace hosting Linseed and the Elasticsearch stack in single-tenant installs
pub const ELASTICSEARCH_NAMESPACE: &str = "tigera-elasticsearch";

/// Namespace hosting the manager UI and its multi-cluster tunnel in single-tenant installs
pub const MANAGER_NAMESPACE: &str = "tigera-manager";

/// Default Kubernetes cluster DNS domain
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

// =============================================================================
// Labels and annotations
// =============================================================================

/// Label selecting the pods of a rendered component
pub const LABEL_K8S_APP: &str = "k8s-app";

/// Standard label for the name of the application
pub const LABEL_NAME: &str = "app.kubernetes.io/name";

/// Standard label for the tool managing a resource
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] on everything this operator renders
pub const MANAGED_BY_VALUE: &str = "tigera-operator";

/// Prefix of pod template annotations carrying content hashes of mounted material
pub const HASH_ANNOTATION_PREFIX: &str = "hash.operator.tigera.io";

// =============================================================================
// Operating system
// =============================================================================

/// Operating system a rendered workload is scheduled on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OsType {
    /// Linux nodes
    #[default]
    Linux,
    /// Windows nodes
    Windows,
}

// =============================================================================
// Identities
// =============================================================================

/// Group every service account belongs to
pub const ALL_SERVICE_ACCOUNTS_GROUP: &str = "system:serviceaccounts";

/// Group every authenticated identity belongs to
pub const AUTHENTICATED_GROUP: &str = "system:authenticated";

/// Prefix of the per-namespace service account group
pub const SERVICE_ACCOUNT_GROUP_PREFIX: &str = "system:serviceaccounts:";

/// Name of the per-namespace service account group
pub fn service_account_group(namespace: &str) -> String {
    format!("{SERVICE_ACCOUNT_GROUP_PREFIX}{namespace}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_group_is_prefixed() {
        assert_eq!(
            service_account_group("tigera-policy-recommendation"),
            "system:serviceaccounts:tigera-policy-recommendation"
        );
    }
}
