//! Recommendation controller deployment

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use tracing::debug;
use vantage_common::crd::ProductVariant;
use vantage_common::kube_utils::{namespaced_meta, restricted_security_context};
use vantage_common::{OsType, LABEL_K8S_APP, LABEL_NAME};

use super::{
    PolicyRecommendationConfig, Topology, POLICY_RECOMMENDATION_CONTAINER_NAME,
    POLICY_RECOMMENDATION_NAME,
};
use crate::meta::{control_plane_node_selector, control_plane_tolerations};
use crate::network_policy::MANAGER_PORT;
use crate::overrides::apply_resource_overrides;

/// Internal URL of a service.
///
/// Windows pods do not get the cluster search path, so their URLs carry the
/// fully qualified host.
pub fn service_url(
    host: &str,
    namespace: &str,
    port: Option<u16>,
    os: OsType,
    cluster_domain: &str,
) -> String {
    let fqdn = match os {
        OsType::Linux => format!("{host}.{namespace}.svc"),
        OsType::Windows => format!("{host}.{namespace}.svc.{cluster_domain}"),
    };
    match port {
        Some(port) => format!("https://{fqdn}:{port}"),
        None => format!("https://{fqdn}"),
    }
}

/// `MANAGED_CLUSTER_TYPE` value for a tenant's managed-cluster variant.
///
/// Only Calico managed clusters need a hint; anything else yields no entry.
pub fn managed_cluster_type(variant: Option<ProductVariant>) -> Option<&'static str> {
    match variant {
        Some(ProductVariant::Calico) => Some("calico"),
        Some(ProductVariant::TigeraSecureEnterprise) | None => None,
    }
}

fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Environment of the controller container, fixed entries first
pub fn controller_env(cfg: &PolicyRecommendationConfig, os: OsType) -> Vec<EnvVar> {
    let services = cfg.service_locations();
    let topology = cfg.topology();

    let mut vars = vec![
        env(
            "LINSEED_URL",
            service_url(
                "tigera-linseed",
                services.linseed_namespace(),
                None,
                os,
                &cfg.cluster_domain,
            ),
        ),
        env("LINSEED_CA", cfg.trusted_bundle.mount_path()),
        env("LINSEED_CLIENT_CERT", cfg.key_pair.cert_file_path(os)),
        env("LINSEED_CLIENT_KEY", cfg.key_pair.key_file_path(os)),
        env(
            "MULTI_CLUSTER_FORWARDING_ENDPOINT",
            service_url(
                "tigera-manager",
                services.manager_namespace(),
                Some(MANAGER_PORT),
                os,
                &cfg.cluster_domain,
            ),
        ),
        env("CLUSTER_CONNECTION_TYPE", topology.connection_type()),
    ];

    if let Some(tenant) = &cfg.tenant {
        if tenant.multi_tenant() {
            vars.push(env("TENANT_NAMESPACE", tenant.tenant_namespace()));
        }
        vars.push(env("TENANT_ID", tenant.spec.id.as_str()));

        if topology == Topology::Management {
            match managed_cluster_type(tenant.spec.managed_cluster_variant) {
                Some(kind) => vars.push(env("MANAGED_CLUSTER_TYPE", kind)),
                None => debug!(
                    variant = ?tenant.spec.managed_cluster_variant,
                    "no managed cluster type for tenant variant"
                ),
            }
        }
    }
    vars
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_K8S_APP.to_string(), POLICY_RECOMMENDATION_NAME.to_string()),
        (LABEL_NAME.to_string(), POLICY_RECOMMENDATION_NAME.to_string()),
    ])
}

/// Controller deployment in the component's own namespace
pub(super) fn deployment(cfg: &PolicyRecommendationConfig, image: &str) -> Deployment {
    let os = OsType::Linux;

    let mut volume_mounts = cfg.trusted_bundle.volume_mounts(os);
    volume_mounts.push(cfg.key_pair.volume_mount(os));

    let mut containers = vec![Container {
        name: POLICY_RECOMMENDATION_CONTAINER_NAME.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(controller_env(cfg, os)),
        volume_mounts: Some(volume_mounts),
        security_context: Some(restricted_security_context()),
        ..Default::default()
    }];
    let mut init_containers: Vec<Container> =
        cfg.key_pair.init_container().into_iter().collect();

    if let Some(spec) = &cfg.policy_recommendation {
        apply_resource_overrides(&mut containers, &spec.container_resources());
        apply_resource_overrides(&mut init_containers, &spec.init_container_resources());
    }

    let mut annotations = cfg.trusted_bundle.hash_annotations();
    annotations.extend(cfg.key_pair.hash_annotations());

    let mut metadata = namespaced_meta(POLICY_RECOMMENDATION_NAME, cfg.namespace.as_str());
    metadata.labels.get_or_insert_with(BTreeMap::new).extend(labels());

    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    LABEL_K8S_APP.to_string(),
                    POLICY_RECOMMENDATION_NAME.to_string(),
                )])),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels()),
                    annotations: Some(annotations),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(POLICY_RECOMMENDATION_NAME.to_string()),
                    node_selector: Some(control_plane_node_selector(&cfg.installation)),
                    tolerations: Some(control_plane_tolerations(&cfg.installation)),
                    init_containers: (!init_containers.is_empty()).then_some(init_containers),
                    containers,
                    volumes: Some(vec![cfg.trusted_bundle.volume(), cfg.key_pair.volume()]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{config, tenant};
    use super::*;
    use rstest::rstest;

    fn value<'a>(vars: &'a [EnvVar], name: &str) -> Option<&'a str> {
        vars.iter()
            .find(|v| v.name == name)
            .and_then(|v| v.value.as_deref())
    }

    #[rstest]
    #[case::linux(OsType::Linux, "https://tigera-manager.tigera-manager.svc:9443")]
    #[case::windows(
        OsType::Windows,
        "https://tigera-manager.tigera-manager.svc.cluster.local:9443"
    )]
    fn urls_follow_os(#[case] os: OsType, #[case] expected: &str) {
        assert_eq!(
            service_url("tigera-manager", "tigera-manager", Some(9443), os, "cluster.local"),
            expected
        );
    }

    #[rstest]
    #[case::calico(Some(ProductVariant::Calico), Some("calico"))]
    #[case::enterprise(Some(ProductVariant::TigeraSecureEnterprise), None)]
    #[case::absent(None, None)]
    fn variant_mapping(
        #[case] variant: Option<ProductVariant>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(managed_cluster_type(variant), expected);
    }

    #[test]
    fn fixed_entries_come_first() {
        let vars = controller_env(&config(), OsType::Linux);
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "LINSEED_URL",
                "LINSEED_CA",
                "LINSEED_CLIENT_CERT",
                "LINSEED_CLIENT_KEY",
                "MULTI_CLUSTER_FORWARDING_ENDPOINT",
                "CLUSTER_CONNECTION_TYPE",
            ]
        );
        assert_eq!(
            value(&vars, "LINSEED_URL"),
            Some("https://tigera-linseed.tigera-elasticsearch.svc")
        );
        assert_eq!(
            value(&vars, "LINSEED_CA"),
            Some("/etc/pki/tls/certs/tigera-ca-bundle.crt")
        );
        assert_eq!(
            value(&vars, "LINSEED_CLIENT_CERT"),
            Some("/policy-recommendation-tls/tls.crt")
        );
        assert_eq!(value(&vars, "CLUSTER_CONNECTION_TYPE"), Some("standalone"));
    }

    #[rstest]
    #[case::internal_store(false, "https://tigera-linseed.tigera-elasticsearch.svc")]
    #[case::external_store(true, "https://tigera-linseed.tenant-a.svc")]
    fn endpoint_namespace_follows_data_store(#[case] external: bool, #[case] expected: &str) {
        let mut cfg = config();
        cfg.tenant = Some(tenant(Some("tenant-a"), "tenant-a-id"));
        cfg.external_elastic = external;
        let vars = controller_env(&cfg, OsType::Linux);
        assert_eq!(value(&vars, "LINSEED_URL"), Some(expected));
    }

    #[test]
    fn multi_tenant_appends_namespace_then_id() {
        let mut cfg = config();
        cfg.tenant = Some(tenant(Some("tenant-a"), "tenant-a-id"));
        let vars = controller_env(&cfg, OsType::Linux);
        let tail: Vec<&str> = vars[6..].iter().map(|v| v.name.as_str()).collect();
        assert_eq!(tail, vec!["TENANT_NAMESPACE", "TENANT_ID"]);
        assert_eq!(value(&vars, "TENANT_NAMESPACE"), Some("tenant-a"));
    }

    #[test]
    fn single_tenant_with_id_only_sets_id() {
        let mut cfg = config();
        cfg.tenant = Some(tenant(None, "tenant-id"));
        cfg.external_elastic = true;
        let vars = controller_env(&cfg, OsType::Linux);
        assert_eq!(value(&vars, "TENANT_ID"), Some("tenant-id"));
        assert_eq!(value(&vars, "TENANT_NAMESPACE"), None);
        assert_eq!(
            value(&vars, "LINSEED_URL"),
            Some("https://tigera-linseed.tigera-elasticsearch.svc")
        );
    }

    #[rstest]
    #[case::management_calico(true, Some(ProductVariant::Calico), Some("calico"))]
    #[case::management_enterprise(true, Some(ProductVariant::TigeraSecureEnterprise), None)]
    #[case::standalone_calico(false, Some(ProductVariant::Calico), None)]
    fn managed_cluster_type_needs_management_and_mappable_variant(
        #[case] management: bool,
        #[case] variant: Option<ProductVariant>,
        #[case] expected: Option<&str>,
    ) {
        let mut cfg = config();
        cfg.management_cluster = management;
        let mut t = tenant(None, "");
        t.spec.managed_cluster_variant = variant;
        cfg.tenant = Some(t);
        let vars = controller_env(&cfg, OsType::Linux);
        assert_eq!(value(&vars, "MANAGED_CLUSTER_TYPE"), expected);
    }

    #[test]
    fn management_without_tenant_has_no_managed_cluster_type() {
        let mut cfg = config();
        cfg.management_cluster = true;
        let vars = controller_env(&cfg, OsType::Linux);
        assert_eq!(value(&vars, "CLUSTER_CONNECTION_TYPE"), Some("management"));
        assert_eq!(value(&vars, "MANAGED_CLUSTER_TYPE"), None);
    }

    #[test]
    fn pod_mounts_bundle_first() {
        let d = deployment(&config(), "img");
        let pod = d.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.volumes.as_ref().unwrap()[0].name, "tigera-ca-bundle");
        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].name, "tigera-ca-bundle");
        assert_eq!(mounts[0].mount_path, "/etc/pki/tls/certs");
        assert!(pod.init_containers.is_none());
    }

    #[test]
    fn pod_template_carries_hash_annotations() {
        let d = deployment(&config(), "img");
        let annotations = d.spec.unwrap().template.metadata.unwrap().annotations.unwrap();
        assert!(annotations.contains_key("hash.operator.tigera.io/tigera-ca-bundle"));
        assert!(annotations.contains_key("hash.operator.tigera.io/policy-recommendation-tls"));
    }
}
