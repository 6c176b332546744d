//! Pod scheduling defaults for control-plane components

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Toleration;
use vantage_common::crd::InstallationSpec;

/// Label carrying a node's operating system
pub const OS_LABEL: &str = "kubernetes.io/os";

/// Label carrying a node's CPU architecture
pub const ARCH_LABEL: &str = "kubernetes.io/arch";

fn toleration(
    key: &str,
    operator: Option<&str>,
    value: Option<&str>,
    effect: Option<&str>,
) -> Toleration {
    Toleration {
        key: Some(key.to_string()),
        operator: operator.map(str::to_string),
        value: value.map(str::to_string),
        effect: effect.map(str::to_string),
        ..Default::default()
    }
}

/// Tolerate the `CriticalAddonsOnly` taint
pub fn tolerate_critical_addons_only() -> Toleration {
    toleration("CriticalAddonsOnly", Some("Exists"), None, None)
}

/// Tolerate control-plane node taints, both current and legacy spelling
pub fn tolerate_control_plane() -> Vec<Toleration> {
    vec![
        toleration("node-role.kubernetes.io/master", None, None, Some("NoSchedule")),
        toleration("node-role.kubernetes.io/control-plane", None, None, Some("NoSchedule")),
    ]
}

/// Tolerate the arm64 taint GKE puts on Arm nodes
pub fn tolerate_gke_arm64() -> Toleration {
    toleration(ARCH_LABEL, Some("Equal"), Some("arm64"), Some("NoSchedule"))
}

/// Tolerations for a control-plane workload.
///
/// A non-empty installation override replaces the defaults entirely.
pub fn control_plane_tolerations(installation: &InstallationSpec) -> Vec<Toleration> {
    if let Some(overrides) = installation
        .control_plane_tolerations
        .as_ref()
        .filter(|t| !t.is_empty())
    {
        return overrides.clone();
    }

    let mut tolerations = vec![tolerate_critical_addons_only()];
    tolerations.extend(tolerate_control_plane());
    if installation.kubernetes_provider.is_gke() {
        tolerations.push(tolerate_gke_arm64());
    }
    tolerations
}

/// Node selector for a control-plane workload.
///
/// A non-empty installation override replaces the default entirely.
pub fn control_plane_node_selector(installation: &InstallationSpec) -> BTreeMap<String, String> {
    installation
        .control_plane_node_selector
        .as_ref()
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| BTreeMap::from([(OS_LABEL.to_string(), "linux".to_string())]))
}
