//! Custom Resource Definitions consumed by the renderers
//!
//! These mirror the `operator.tigera.io/v1` resources a render pass reads:
//! the cluster-wide `Installation`, the per-tenant `Tenant` and the
//! `PolicyRecommendation` customisation resource.

mod installation;
mod policy_recommendation;
mod tenant;

pub use installation::{CertificateManagement, Installation, InstallationSpec, Provider};
pub use policy_recommendation::{
    PolicyRecommendation, PolicyRecommendationDeployment, PolicyRecommendationDeploymentContainer,
    PolicyRecommendationDeploymentInitContainer, PolicyRecommendationDeploymentPodSpec,
    PolicyRecommendationDeploymentPodTemplateSpec, PolicyRecommendationDeploymentSpec,
    PolicyRecommendationSpec,
};
pub use tenant::{is_multi_tenant, ProductVariant, Tenant, TenantSpec};
