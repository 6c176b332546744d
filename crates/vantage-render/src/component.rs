//! Component abstraction and render output

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use serde::Serialize;
use vantage_common::{OsType, Result};

use crate::calico::NetworkPolicy;

/// A renderable product component.
///
/// The reconcile driver calls [`resolve_images`](Component::resolve_images)
/// and then [`objects`](Component::objects), applying the create set as
/// upserts and the delete set as deletes-if-present.
pub trait Component: Send + Sync {
    /// Resolve container image references against optional overrides
    fn resolve_images(&mut self, overrides: Option<&BTreeMap<String, String>>) -> Result<()>;

    /// Objects that must exist and objects that must be removed
    fn objects(&self) -> ObjectSet;

    /// Operating system the component's workloads run on
    fn supported_os_type(&self) -> OsType;
}

/// An object produced by a render pass
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedObject {
    /// core/v1 Namespace
    Namespace(Namespace),
    /// core/v1 ServiceAccount
    ServiceAccount(ServiceAccount),
    /// rbac/v1 ClusterRole
    ClusterRole(ClusterRole),
    /// rbac/v1 ClusterRoleBinding
    ClusterRoleBinding(ClusterRoleBinding),
    /// rbac/v1 RoleBinding
    RoleBinding(RoleBinding),
    /// projectcalico.org/v3 NetworkPolicy
    NetworkPolicy(NetworkPolicy),
    /// apps/v1 Deployment
    Deployment(Deployment),
}

/// Identity used by the reconcile driver to diff objects
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdentity {
    /// API version, e.g. `rbac.authorization.k8s.io/v1`
    pub api_version: String,
    /// Kind, e.g. `ClusterRole`
    pub kind: String,
    /// Namespace, absent for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

fn identity_of<K>(obj: &K) -> ObjectIdentity
where
    K: kube::Resource<DynamicType = ()>,
{
    ObjectIdentity {
        api_version: K::api_version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
        namespace: obj.meta().namespace.clone(),
        name: obj.meta().name.clone().unwrap_or_default(),
    }
}

impl RenderedObject {
    /// (apiVersion, kind, namespace, name) of the object
    pub fn identity(&self) -> ObjectIdentity {
        match self {
            Self::Namespace(o) => identity_of(o),
            Self::ServiceAccount(o) => identity_of(o),
            Self::ClusterRole(o) => identity_of(o),
            Self::ClusterRoleBinding(o) => identity_of(o),
            Self::RoleBinding(o) => identity_of(o),
            Self::Deployment(o) => identity_of(o),
            Self::NetworkPolicy(o) => ObjectIdentity {
                api_version: o.api_version.clone(),
                kind: o.kind.clone(),
                namespace: o.metadata.namespace.clone(),
                name: o.metadata.name.clone().unwrap_or_default(),
            },
        }
    }

    /// Kind of the object
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Namespace(_) => "Namespace",
            Self::ServiceAccount(_) => "ServiceAccount",
            Self::ClusterRole(_) => "ClusterRole",
            Self::ClusterRoleBinding(_) => "ClusterRoleBinding",
            Self::RoleBinding(_) => "RoleBinding",
            Self::NetworkPolicy(_) => NetworkPolicy::KIND,
            Self::Deployment(_) => "Deployment",
        }
    }
}

macro_rules! impl_from_object {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for RenderedObject {
                fn from(o: $variant) -> Self {
                    Self::$variant(o)
                }
            }
        )*
    };
}

impl_from_object!(
    Namespace,
    ServiceAccount,
    ClusterRole,
    ClusterRoleBinding,
    RoleBinding,
    NetworkPolicy,
    Deployment,
);

/// Result of a render pass.
///
/// `to_create` and `to_delete` never share an identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSet {
    /// Objects to upsert, in apply order
    pub to_create: Vec<RenderedObject>,
    /// Objects to delete if present
    pub to_delete: Vec<RenderedObject>,
}

impl ObjectSet {
    /// Identities of the create set, in order
    pub fn create_identities(&self) -> Vec<ObjectIdentity> {
        self.to_create.iter().map(RenderedObject::identity).collect()
    }

    /// Identities of the delete set, in order
    pub fn delete_identities(&self) -> Vec<ObjectIdentity> {
        self.to_delete.iter().map(RenderedObject::identity).collect()
    }

    /// Number of objects of `kind` in the create set
    pub fn count_created(&self, kind: &str) -> usize {
        self.to_create.iter().filter(|o| o.kind() == kind).count()
    }

    /// Find an object in the create set by kind, namespace and name
    pub fn find_created(
        &self,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<&RenderedObject> {
        self.to_create.iter().find(|o| {
            let id = o.identity();
            id.kind == kind && id.namespace.as_deref() == namespace && id.name == name
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn sa(ns: &str) -> RenderedObject {
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some("tigera-policy-recommendation".to_string()),
                namespace: Some(ns.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn identity_carries_type_meta() {
        let id = sa("tenant-a").identity();
        assert_eq!(id.api_version, "v1");
        assert_eq!(id.kind, "ServiceAccount");
        assert_eq!(
            id.to_string(),
            "ServiceAccount/tenant-a/tigera-policy-recommendation"
        );
    }

    #[test]
    fn cluster_scoped_identity_has_no_namespace() {
        let role: RenderedObject = ClusterRole {
            metadata: ObjectMeta {
                name: Some("r".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .into();
        let id = role.identity();
        assert_eq!(id.api_version, "rbac.authorization.k8s.io/v1");
        assert!(id.namespace.is_none());
        assert_eq!(id.to_string(), "ClusterRole/r");
    }

    #[test]
    fn untagged_serialization_emits_type_meta() {
        let json = serde_json::to_value(sa("ns")).unwrap();
        assert_eq!(json["kind"], "ServiceAccount");
        assert_eq!(json["metadata"]["namespace"], "ns");
    }

    #[test]
    fn object_set_lookups() {
        let set = ObjectSet {
            to_create: vec![sa("a"), sa("b")],
            to_delete: vec![],
        };
        assert_eq!(set.count_created("ServiceAccount"), 2);
        assert!(set
            .find_created("ServiceAccount", Some("b"), "tigera-policy-recommendation")
            .is_some());
        assert!(set
            .find_created("ServiceAccount", None, "tigera-policy-recommendation")
            .is_none());
    }
}
