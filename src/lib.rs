//! Vantage - renders policy recommendation components from a snapshot file
//!
//! The binary loads a [`config::RenderFile`], runs one render pass and prints
//! the create and delete sets. Everything except file access is delegated to
//! the `vantage-render` crate.

pub mod config;
pub mod output;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;
use vantage_common::Result;
use vantage_render::{Component, ObjectSet, PolicyRecommendationComponent};

pub use config::{parse_image_override, RenderFile};
pub use output::{format_object_set, OutputFormat};

/// Load `path` and run one render pass.
///
/// `image_overrides` take precedence over overrides listed in the file.
pub fn render_file(path: &Path, image_overrides: &BTreeMap<String, String>) -> Result<ObjectSet> {
    let (config, overrides) = RenderFile::load(path)?.into_config(image_overrides)?;
    let mut component = PolicyRecommendationComponent::try_new(config)?;
    component.resolve_images(Some(&overrides))?;
    info!(path = %path.display(), image = component.image(), "rendering policy recommendation");
    Ok(component.objects())
}
