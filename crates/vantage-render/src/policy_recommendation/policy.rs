//! `allow-tigera` policy for the recommendation controller

use crate::calico::{NetworkPolicy, NetworkPolicySpec, PolicyType, Protocol, Rule};
use crate::network_policy::{
    dns_egress_rules, k8s_app_selector, kube_api_egress_rule, policy_meta, tiered_policy_name,
    ALLOW_TIGERA_TIER, HIGH_PRECEDENCE_ORDER,
};

use super::{PolicyRecommendationConfig, POLICY_RECOMMENDATION_NAME};

/// Egress the controller needs: DNS, the API server, the manager and Linseed.
///
/// Manager and Linseed destinations come from
/// [`PolicyRecommendationConfig::service_locations`], the same source the
/// controller's endpoint URLs are built from.
pub(super) fn allow_tigera_policy(cfg: &PolicyRecommendationConfig) -> NetworkPolicy {
    let services = cfg.service_locations();

    let mut egress = dns_egress_rules(cfg.openshift);
    egress.push(kube_api_egress_rule());
    egress.push(Rule::allow(Protocol::TCP, services.manager_entity_rule()));
    egress.push(Rule::allow(Protocol::TCP, services.linseed_entity_rule()));

    NetworkPolicy::new(
        policy_meta(
            tiered_policy_name(POLICY_RECOMMENDATION_NAME),
            cfg.namespace.as_str(),
        ),
        NetworkPolicySpec {
            tier: ALLOW_TIGERA_TIER.to_string(),
            order: Some(HIGH_PRECEDENCE_ORDER),
            selector: k8s_app_selector(POLICY_RECOMMENDATION_NAME),
            types: vec![PolicyType::Ingress, PolicyType::Egress],
            ingress: Vec::new(),
            egress,
        },
    )
}
