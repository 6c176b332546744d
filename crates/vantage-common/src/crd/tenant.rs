//! Tenant CRD types
//!
//! A `Tenant` lives in the namespace that hosts that tenant's copy of the
//! management-plane components. A tenant without a namespace describes a
//! single-tenant install that still reports a tenant ID.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Product variant running on the clusters a tenant manages
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ProductVariant {
    /// Open-source Calico
    Calico,
    /// Calico Enterprise
    TigeraSecureEnterprise,
}

/// Logical customer partition of a shared management cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.tigera.io",
    version = "v1",
    kind = "Tenant",
    plural = "tenants",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    /// Tenant identifier stamped into tenant-scoped data
    #[serde(default)]
    pub id: String,

    /// Product variant of the clusters this tenant manages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_cluster_variant: Option<ProductVariant>,
}

impl Tenant {
    /// Whether this tenant owns a dedicated namespace
    pub fn multi_tenant(&self) -> bool {
        self.namespace().is_some_and(|ns| !ns.is_empty())
    }

    /// The tenant's namespace, or an empty string for single-tenant installs
    pub fn tenant_namespace(&self) -> String {
        self.namespace().unwrap_or_default()
    }
}

/// Whether an optional tenant puts the render pass in multi-tenant mode
pub fn is_multi_tenant(tenant: Option<&Tenant>) -> bool {
    tenant.is_some_and(Tenant::multi_tenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(namespace: Option<&str>) -> Tenant {
        let mut t = Tenant::new(
            "tenant-a",
            TenantSpec {
                id: "tenant-a-id".to_string(),
                managed_cluster_variant: None,
            },
        );
        t.metadata.namespace = namespace.map(str::to_string);
        t
    }

    #[test]
    fn tenant_with_namespace_is_multi_tenant() {
        let t = tenant(Some("tenant-a"));
        assert!(t.multi_tenant());
        assert!(is_multi_tenant(Some(&t)));
        assert_eq!(t.tenant_namespace(), "tenant-a");
    }

    #[test]
    fn tenant_without_namespace_is_single_tenant() {
        assert!(!tenant(None).multi_tenant());
        assert!(!tenant(Some("")).multi_tenant());
        assert!(!is_multi_tenant(None));
    }

    #[test]
    fn variant_parses_from_operator_spelling() {
        let spec: TenantSpec =
            serde_json::from_str(r#"{"id":"x","managedClusterVariant":"Calico"}"#).unwrap();
        assert_eq!(spec.managed_cluster_variant, Some(ProductVariant::Calico));
    }
}
