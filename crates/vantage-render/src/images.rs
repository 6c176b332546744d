//! Image reference resolution
//!
//! A reference is assembled as `<registry><path>/<prefix><name>` and pinned
//! either to the release tag or to a digest supplied through an override map
//! keyed by `<path>/<name>`.

use std::collections::BTreeMap;

use tracing::debug;
use vantage_common::crd::InstallationSpec;
use vantage_common::{Error, Result};

/// Registry used when the installation does not name one
pub const DEFAULT_REGISTRY: &str = "quay.io/";

/// Product release the default image tags point at
pub const RELEASE_VERSION: &str = "v3.21.0";

const DIGEST_PREFIX: &str = "sha256:";
const DIGEST_HEX_LEN: usize = 64;

/// A product image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSpec {
    /// Repository path between registry and image name
    pub path: &'static str,
    /// Image name
    pub name: &'static str,
    /// Default tag
    pub version: &'static str,
}

/// Policy recommendation controller image
pub const POLICY_RECOMMENDATION_IMAGE: ImageSpec = ImageSpec {
    path: "tigera",
    name: "policy-recommendation",
    version: RELEASE_VERSION,
};

/// Init container image that requests certificates through CSRs
pub const KEY_CERT_PROVISIONER_IMAGE: ImageSpec = ImageSpec {
    path: "tigera",
    name: "key-cert-provisioner",
    version: RELEASE_VERSION,
};

impl ImageSpec {
    /// Key of this image in an override map
    pub fn key(&self) -> String {
        format!("{}/{}", self.path, self.name)
    }
}

/// Check an installation registry for obvious mistakes
pub fn validate_registry(registry: &str) -> Result<()> {
    if registry.chars().any(char::is_whitespace) {
        return Err(Error::validation_for_field(
            "installation",
            "registry",
            format!("registry {registry:?} contains whitespace"),
        ));
    }
    if registry.contains("://") {
        return Err(Error::validation_for_field(
            "installation",
            "registry",
            format!("registry {registry:?} must not carry a URL scheme"),
        ));
    }
    Ok(())
}

/// Untagged reference for `image` under the installation's registry settings
fn repository(installation: &InstallationSpec, image: &ImageSpec) -> String {
    let registry = match installation.registry.as_deref() {
        Some(r) if !r.is_empty() && r.ends_with('/') => r.to_string(),
        Some(r) if !r.is_empty() => format!("{r}/"),
        _ => DEFAULT_REGISTRY.to_string(),
    };
    let path = installation
        .image_path
        .as_deref()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or(image.path);
    let prefix = installation.image_prefix.as_deref().unwrap_or_default();
    format!("{registry}{path}/{prefix}{}", image.name)
}

/// Default tagged reference, without consulting any overrides
pub fn default_reference(installation: &InstallationSpec, image: &ImageSpec) -> String {
    format!("{}:{}", repository(installation, image), image.version)
}

/// Resolve the reference of `image`, honoring an optional override map.
///
/// An override value is either a `sha256:` digest, which pins the default
/// repository, or a complete image reference used verbatim.
pub fn resolve(
    installation: &InstallationSpec,
    image: &ImageSpec,
    overrides: Option<&BTreeMap<String, String>>,
) -> Result<String> {
    if let Some(registry) = installation.registry.as_deref() {
        validate_registry(registry)
            .map_err(|e| Error::image_resolution(image.key(), e.to_string()))?;
    }

    let key = image.key();
    let Some(value) = overrides.and_then(|o| o.get(&key)) else {
        return Ok(default_reference(installation, image));
    };

    let value = value.trim();
    if value.is_empty() {
        return Err(Error::image_resolution(key, "override is empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(Error::image_resolution(key, "override contains whitespace"));
    }

    let reference = match value.strip_prefix(DIGEST_PREFIX) {
        Some(hex) => {
            if hex.len() != DIGEST_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::image_resolution(
                    key,
                    format!("digest must be {DIGEST_HEX_LEN} hex characters"),
                ));
            }
            format!("{}@{value}", repository(installation, image))
        }
        None => value.to_string(),
    };
    debug!(image = %key, reference = %reference, "resolved image override");
    Ok(reference)
}
