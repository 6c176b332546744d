//! Calico `projectcalico.org/v3` NetworkPolicy types
//!
//! Only the subset of the Calico policy model the renderers emit: tiered
//! namespaced policies with selector-based entity rules.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Calico namespaced network policy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    /// API version
    #[serde(default = "NetworkPolicy::api_version")]
    pub api_version: String,
    /// Kind
    #[serde(default = "NetworkPolicy::kind")]
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: NetworkPolicySpec,
}

impl NetworkPolicy {
    /// API version of Calico policies
    pub const API_VERSION: &'static str = "projectcalico.org/v3";
    /// Kind of Calico namespaced policies
    pub const KIND: &'static str = "NetworkPolicy";

    fn api_version() -> String {
        Self::API_VERSION.to_string()
    }
    fn kind() -> String {
        Self::KIND.to_string()
    }

    /// Create a new NetworkPolicy
    pub fn new(metadata: ObjectMeta, spec: NetworkPolicySpec) -> Self {
        Self {
            api_version: Self::API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec,
        }
    }
}

/// NetworkPolicy spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    /// Tier the policy belongs to
    pub tier: String,
    /// Evaluation order within the tier; unset sorts last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    /// Endpoint selector expression
    pub selector: String,
    /// Directions the policy applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<PolicyType>,
    /// Ingress rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<Rule>,
    /// Egress rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<Rule>,
}

/// Traffic direction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicyType {
    /// Inbound traffic
    Ingress,
    /// Outbound traffic
    Egress,
}

/// Rule action
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Action {
    /// Allow matching traffic
    Allow,
}

/// L4 protocol
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Protocol {
    /// TCP
    TCP,
    /// UDP
    UDP,
}

/// Policy rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Action for matching traffic
    pub action: Action,
    /// Protocol match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Source match
    #[serde(default, skip_serializing_if = "EntityRule::is_empty")]
    pub source: EntityRule,
    /// Destination match
    #[serde(default, skip_serializing_if = "EntityRule::is_empty")]
    pub destination: EntityRule,
}

impl Rule {
    /// Allow rule for `protocol` traffic towards `destination`
    pub fn allow(protocol: Protocol, destination: EntityRule) -> Self {
        Self {
            action: Action::Allow,
            protocol: Some(protocol),
            source: EntityRule::default(),
            destination,
        }
    }
}

/// Source or destination match
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRule {
    /// Endpoint selector expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Namespace selector expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<String>,
    /// Kubernetes service match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServiceMatch>,
    /// Port numbers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
}

impl EntityRule {
    /// Whether the rule matches everything
    pub fn is_empty(&self) -> bool {
        self.selector.is_none()
            && self.namespace_selector.is_none()
            && self.services.is_none()
            && self.ports.is_empty()
    }

    /// Match pods by selector in namespaces matching `namespace_selector`
    pub fn pods(
        selector: impl Into<String>,
        namespace_selector: impl Into<String>,
        ports: Vec<u16>,
    ) -> Self {
        Self {
            selector: Some(selector.into()),
            namespace_selector: Some(namespace_selector.into()),
            services: None,
            ports,
        }
    }

    /// Match the endpoints backing a Kubernetes service
    pub fn service(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            services: Some(ServiceMatch {
                name: name.into(),
                namespace: namespace.into(),
            }),
            ..Default::default()
        }
    }
}

/// Kubernetes service reference
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceMatch {
    /// Service name
    pub name: String,
    /// Service namespace
    pub namespace: String,
}
