//! Manifest printing

use clap::ValueEnum;
use vantage_common::{Error, Result};
use vantage_render::{ObjectSet, RenderedObject};

/// Output encoding of rendered manifests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML
    #[default]
    Yaml,
    /// One JSON document holding both sets
    Json,
}

fn yaml_documents(out: &mut String, header: &str, objects: &[RenderedObject]) -> Result<()> {
    out.push_str(&format!("# {header}\n"));
    for object in objects {
        let doc = serde_yaml::to_string(object)
            .map_err(|e| Error::serialization_for(object.kind(), e.to_string()))?;
        out.push_str("---\n");
        out.push_str(&doc);
    }
    Ok(())
}

/// Render an object set as text
pub fn format_object_set(set: &ObjectSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(set)?),
        OutputFormat::Yaml => {
            let mut out = String::new();
            yaml_documents(&mut out, "create", &set.to_create)?;
            yaml_documents(&mut out, "delete", &set.to_delete)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Namespace;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn teardown() -> ObjectSet {
        ObjectSet {
            to_create: vec![],
            to_delete: vec![Namespace {
                metadata: ObjectMeta {
                    name: Some("tigera-policy-recommendation".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }
            .into()],
        }
    }

    #[test]
    fn yaml_has_both_sections() {
        let out = format_object_set(&teardown(), OutputFormat::Yaml).unwrap();
        let create = out.find("# create").unwrap();
        let delete = out.find("# delete").unwrap();
        assert!(create < delete);
        assert!(out[delete..].contains("kind: Namespace"));
    }

    #[test]
    fn json_is_a_single_document() {
        let out = format_object_set(&teardown(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["toCreate"].as_array().unwrap().len(), 0);
        assert_eq!(value["toDelete"][0]["kind"], "Namespace");
    }
}
