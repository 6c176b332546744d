//! PolicyRecommendation CRD types
//!
//! The customisation surface is limited to per-container resource
//! requirements of the recommendation deployment.

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Policy recommendation installation and customisation
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.tigera.io",
    version = "v1",
    kind = "PolicyRecommendation",
    plural = "policyrecommendations"
)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecommendationSpec {
    /// Overrides for the recommendation deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_recommendation_deployment: Option<PolicyRecommendationDeployment>,
}

/// Deployment customisation wrapper
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PolicyRecommendationDeployment {
    /// Deployment spec overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PolicyRecommendationDeploymentSpec>,
}

/// Deployment spec overrides
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PolicyRecommendationDeploymentSpec {
    /// Pod template overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PolicyRecommendationDeploymentPodTemplateSpec>,
}

/// Pod template overrides
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PolicyRecommendationDeploymentPodTemplateSpec {
    /// Pod spec overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PolicyRecommendationDeploymentPodSpec>,
}

/// Pod spec overrides
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecommendationDeploymentPodSpec {
    /// Init container overrides, matched by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<PolicyRecommendationDeploymentInitContainer>,

    /// Container overrides, matched by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<PolicyRecommendationDeploymentContainer>,
}

/// Override for one container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PolicyRecommendationDeploymentContainer {
    /// Name of the container to override
    pub name: String,

    /// Replacement resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Override for one init container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PolicyRecommendationDeploymentInitContainer {
    /// Name of the init container to override
    pub name: String,

    /// Replacement resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl PolicyRecommendationSpec {
    fn pod_spec(&self) -> Option<&PolicyRecommendationDeploymentPodSpec> {
        self.policy_recommendation_deployment
            .as_ref()?
            .spec
            .as_ref()?
            .template
            .as_ref()?
            .spec
            .as_ref()
    }

    /// Container resource overrides as (name, requirements) pairs
    pub fn container_resources(&self) -> Vec<(&str, &ResourceRequirements)> {
        self.pod_spec()
            .map(|spec| {
                spec.containers
                    .iter()
                    .filter_map(|c| c.resources.as_ref().map(|r| (c.name.as_str(), r)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Init container resource overrides as (name, requirements) pairs
    pub fn init_container_resources(&self) -> Vec<(&str, &ResourceRequirements)> {
        self.pod_spec()
            .map(|spec| {
                spec.init_containers
                    .iter()
                    .filter_map(|c| c.resources.as_ref().map(|r| (c.name.as_str(), r)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
