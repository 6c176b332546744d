//! Per-container resource overrides

use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
use tracing::debug;

/// Replace the `resources` of every container named in `overrides`.
///
/// Containers without an override keep their defaults. Overrides naming a
/// container that is not rendered are skipped.
pub fn apply_resource_overrides(
    containers: &mut [Container],
    overrides: &[(&str, &ResourceRequirements)],
) {
    for (name, resources) in overrides {
        match containers.iter_mut().find(|c| c.name == *name) {
            Some(container) => container.resources = Some((*resources).clone()),
            None => debug!(
                container = %name,
                "resource override names no rendered container, skipping"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn container(name: &str) -> Container {
        Container {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn limits(cpu: &str) -> ResourceRequirements {
        ResourceRequirements {
            limits: Some(BTreeMap::from([("cpu".to_string(), Quantity(cpu.to_string()))])),
            ..Default::default()
        }
    }

    #[test]
    fn matching_container_is_replaced() {
        let mut containers = vec![container("a"), container("b")];
        let resources = limits("2");
        apply_resource_overrides(&mut containers, &[("b", &resources)]);
        assert!(containers[0].resources.is_none());
        assert_eq!(containers[1].resources.as_ref(), Some(&resources));
    }

    #[test]
    fn unknown_container_is_ignored() {
        let mut containers = vec![container("a")];
        let before = containers.clone();
        apply_resource_overrides(&mut containers, &[("missing", &limits("1"))]);
        assert_eq!(containers, before);
    }
}
