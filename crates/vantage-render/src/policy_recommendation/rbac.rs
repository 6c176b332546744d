//! Service account and RBAC for the recommendation controller

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, RoleBinding, RoleRef, Subject,
};
use vantage_common::kube_utils::{cluster_meta, namespaced_meta};
use vantage_common::{service_account_group, ALL_SERVICE_ACCOUNTS_GROUP, AUTHENTICATED_GROUP};

use super::{
    PolicyRecommendationConfig, MANAGED_CLUSTERS_WATCH_BINDING_NAME,
    MANAGED_CLUSTERS_WATCH_CLUSTER_ROLE_NAME, MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_BINDING_NAME,
    MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_CLUSTER_ROLE_NAME, POLICY_RECOMMENDATION_NAME,
    POLICY_RECOMMENDATION_NAMESPACE,
};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn rule(api_group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_string()]),
        resources: Some(strings(resources)),
        verbs: strings(verbs),
        ..Default::default()
    }
}

fn named_rule(api_group: &str, resource: &str, verb: &str, names: Vec<String>) -> PolicyRule {
    PolicyRule {
        resource_names: Some(names),
        ..rule(api_group, &[resource], &[verb])
    }
}

fn cluster_role_ref(name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: "ClusterRole".to_string(),
        name: name.to_string(),
    }
}

fn service_account_subject(namespace: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: POLICY_RECOMMENDATION_NAME.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

pub(super) fn service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced_meta(POLICY_RECOMMENDATION_NAME, namespace),
        ..Default::default()
    }
}

const READ: &[&str] = &["get", "list", "watch"];
const MANAGE: &[&str] = &["create", "delete", "get", "list", "patch", "update", "watch"];

fn base_rules() -> Vec<PolicyRule> {
    vec![
        rule("", &["namespaces"], READ),
        rule("projectcalico.org", &["licensekeys"], READ),
        rule("crd.projectcalico.org", &["licensekeys"], READ),
        rule(
            "projectcalico.org",
            &[
                "tiers",
                "policyrecommendationscopes",
                "policyrecommendationscopes/status",
                "stagednetworkpolicies",
                "tier.stagednetworkpolicies",
                "networkpolicies",
                "tier.networkpolicies",
                "globalnetworksets",
            ],
            MANAGE,
        ),
    ]
}

fn openshift_rules() -> Vec<PolicyRule> {
    vec![named_rule(
        "security.openshift.io",
        "securitycontextconstraints",
        "use",
        vec!["hostnetwork-v2".to_string()],
    )]
}

// The controller acts on a tenant's managed clusters by impersonating its own
// identity in the product namespace.
fn impersonation_rules() -> Vec<PolicyRule> {
    vec![
        named_rule(
            "",
            "serviceaccounts",
            "impersonate",
            vec![POLICY_RECOMMENDATION_NAME.to_string()],
        ),
        named_rule(
            "",
            "groups",
            "impersonate",
            vec![
                ALL_SERVICE_ACCOUNTS_GROUP.to_string(),
                AUTHENTICATED_GROUP.to_string(),
                service_account_group(POLICY_RECOMMENDATION_NAMESPACE),
            ],
        ),
    ]
}

pub(super) fn cluster_role(cfg: &PolicyRecommendationConfig) -> ClusterRole {
    let mut rules = base_rules();
    if cfg.openshift {
        rules.extend(openshift_rules());
    }
    if cfg.multi_tenant() {
        rules.extend(impersonation_rules());
    }
    ClusterRole {
        metadata: cluster_meta(POLICY_RECOMMENDATION_NAME),
        rules: Some(rules),
        ..Default::default()
    }
}

pub(super) fn cluster_role_binding(namespaces: &[String]) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_meta(POLICY_RECOMMENDATION_NAME),
        role_ref: cluster_role_ref(POLICY_RECOMMENDATION_NAME),
        subjects: Some(namespaces.iter().map(|ns| service_account_subject(ns)).collect()),
    }
}

pub(super) fn managed_clusters_watch_cluster_role_binding(
    namespaces: &[String],
) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_meta(MANAGED_CLUSTERS_WATCH_BINDING_NAME),
        role_ref: cluster_role_ref(MANAGED_CLUSTERS_WATCH_CLUSTER_ROLE_NAME),
        subjects: Some(namespaces.iter().map(|ns| service_account_subject(ns)).collect()),
    }
}

pub(super) fn managed_clusters_watch_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: namespaced_meta(MANAGED_CLUSTERS_WATCH_BINDING_NAME, namespace),
        role_ref: cluster_role_ref(MANAGED_CLUSTERS_WATCH_CLUSTER_ROLE_NAME),
        subjects: Some(vec![service_account_subject(namespace)]),
    }
}

pub(super) fn managed_clusters_access_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: namespaced_meta(MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_BINDING_NAME, namespace),
        role_ref: cluster_role_ref(MULTI_TENANT_MANAGED_CLUSTERS_ACCESS_CLUSTER_ROLE_NAME),
        subjects: Some(vec![service_account_subject(POLICY_RECOMMENDATION_NAMESPACE)]),
    }
}
