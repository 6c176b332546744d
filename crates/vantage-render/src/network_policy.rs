//! Shared building blocks for `allow-tigera` tier policies

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use vantage_common::kube_utils::namespaced_meta;
use vantage_common::{ELASTICSEARCH_NAMESPACE, MANAGER_NAMESPACE};

use crate::calico::{EntityRule, NetworkPolicy, NetworkPolicySpec, PolicyType, Protocol, Rule};

/// Tier holding the operator's own allow policies
pub const ALLOW_TIGERA_TIER: &str = "allow-tigera";

/// Name of the per-namespace default-deny policy
pub const DEFAULT_DENY_POLICY_NAME: &str = "allow-tigera.default-deny";

/// Order of allow policies, ahead of anything a user adds to the tier
pub const HIGH_PRECEDENCE_ORDER: f64 = 1.0;

/// Manager service port used for multi-cluster forwarding
pub const MANAGER_PORT: u16 = 9443;

/// Linseed API port
pub const LINSEED_PORT: u16 = 8444;

/// Name of a policy in the `allow-tigera` tier
pub fn tiered_policy_name(name: &str) -> String {
    format!("{ALLOW_TIGERA_TIER}.{name}")
}

/// Metadata for a tiered policy
pub fn policy_meta(name: impl Into<String>, namespace: impl Into<String>) -> ObjectMeta {
    namespaced_meta(name, namespace)
}

/// Deny everything in `namespace` that no higher-order policy allows
pub fn default_deny(namespace: &str) -> NetworkPolicy {
    NetworkPolicy::new(
        policy_meta(DEFAULT_DENY_POLICY_NAME, namespace),
        NetworkPolicySpec {
            tier: ALLOW_TIGERA_TIER.to_string(),
            selector: "all()".to_string(),
            types: vec![PolicyType::Ingress, PolicyType::Egress],
            ..Default::default()
        },
    )
}

/// Egress to cluster DNS, on UDP and TCP
pub fn dns_egress_rules(openshift: bool) -> Vec<Rule> {
    let destination = if openshift {
        EntityRule::pods(
            "dns.operator.openshift.io/daemonset-dns == 'default'",
            "projectcalico.org/name == 'openshift-dns'",
            vec![5353],
        )
    } else {
        EntityRule::pods(
            "k8s-app == 'kube-dns'",
            "projectcalico.org/name == 'kube-system'",
            vec![53],
        )
    };
    vec![
        Rule::allow(Protocol::UDP, destination.clone()),
        Rule::allow(Protocol::TCP, destination),
    ]
}

/// Egress to the Kubernetes API server
pub fn kube_api_egress_rule() -> Rule {
    Rule::allow(Protocol::TCP, EntityRule::service("kubernetes", "default"))
}

/// Selector expression matching pods by `k8s-app`
pub fn k8s_app_selector(app: &str) -> String {
    format!("k8s-app == '{app}'")
}

fn namespace_selector(namespace: &str) -> String {
    format!("projectcalico.org/name == '{namespace}'")
}

/// Resolves where the manager and Linseed a component talks to live.
///
/// With a tenant namespace both run there; otherwise they live in their
/// fixed namespaces. Environment URLs and egress rules must be built from
/// the same helper.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolicyHelper<'a> {
    tenant_namespace: Option<&'a str>,
}

impl<'a> PolicyHelper<'a> {
    /// Helper for services hosted in `tenant_namespace`, or in the fixed
    /// namespaces when it is `None`
    pub fn new(tenant_namespace: Option<&'a str>) -> Self {
        Self { tenant_namespace }
    }

    fn namespace_or(&self, fixed: &'a str) -> &'a str {
        self.tenant_namespace.unwrap_or(fixed)
    }

    /// Namespace the manager runs in
    pub fn manager_namespace(&self) -> &'a str {
        self.namespace_or(MANAGER_NAMESPACE)
    }

    /// Namespace Linseed runs in
    pub fn linseed_namespace(&self) -> &'a str {
        self.namespace_or(ELASTICSEARCH_NAMESPACE)
    }

    /// Destination matching the manager pods
    pub fn manager_entity_rule(&self) -> EntityRule {
        EntityRule::pods(
            k8s_app_selector("tigera-manager"),
            namespace_selector(self.manager_namespace()),
            vec![MANAGER_PORT],
        )
    }

    /// Destination matching the Linseed pods
    pub fn linseed_entity_rule(&self) -> EntityRule {
        EntityRule::pods(
            k8s_app_selector("tigera-linseed"),
            namespace_selector(self.linseed_namespace()),
            vec![LINSEED_PORT],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_deny_selects_everything() {
        let policy = default_deny("tenant-a");
        assert_eq!(policy.metadata.name.as_deref(), Some(DEFAULT_DENY_POLICY_NAME));
        assert_eq!(policy.metadata.namespace.as_deref(), Some("tenant-a"));
        assert_eq!(policy.spec.selector, "all()");
        assert!(policy.spec.ingress.is_empty());
        assert!(policy.spec.egress.is_empty());
        assert!(policy.spec.order.is_none());
    }

    #[rstest]
    #[case::kube_dns(false, 53, "projectcalico.org/name == 'kube-system'")]
    #[case::openshift_dns(true, 5353, "projectcalico.org/name == 'openshift-dns'")]
    fn dns_rules_follow_platform(#[case] openshift: bool, #[case] port: u16, #[case] ns: &str) {
        let rules = dns_egress_rules(openshift);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].protocol, Some(Protocol::UDP));
        assert_eq!(rules[1].protocol, Some(Protocol::TCP));
        assert_eq!(rules[0].destination.ports, vec![port]);
        assert_eq!(rules[0].destination.namespace_selector.as_deref(), Some(ns));
    }

    #[rstest]
    #[case::fixed(None, "tigera-manager", "tigera-elasticsearch")]
    #[case::tenant(Some("tenant-a"), "tenant-a", "tenant-a")]
    fn service_namespaces_follow_tenant_namespace(
        #[case] tenant_namespace: Option<&str>,
        #[case] manager: &str,
        #[case] linseed: &str,
    ) {
        let helper = PolicyHelper::new(tenant_namespace);
        assert_eq!(helper.manager_namespace(), manager);
        assert_eq!(helper.linseed_namespace(), linseed);
        assert_eq!(
            helper.linseed_entity_rule().namespace_selector,
            Some(format!("projectcalico.org/name == '{linseed}'"))
        );
    }

    #[test]
    fn tiered_names_are_prefixed() {
        assert_eq!(
            tiered_policy_name("tigera-policy-recommendation"),
            "allow-tigera.tigera-policy-recommendation"
        );
    }
}
