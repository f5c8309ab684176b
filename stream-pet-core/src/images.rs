//! Image path resolution and asset probing.

use std::fmt::Debug;
use std::path::PathBuf;

use crate::config::PetConfig;

/// Stand-in shown when an image asset is missing.
pub const PLACEHOLDER_IMAGE: &str = "data:image/svg+xml;utf8,\
<svg width='200' height='200' xmlns='http://www.w3.org/2000/svg'>\
<rect width='200' height='200' fill='%23f0f0f0' stroke='%23ddd' stroke-width='2'/>\
<text x='100' y='100' font-family='Arial' font-size='16' fill='%23999' text-anchor='middle'>No Image</text>\
</svg>";

/// Answers whether an image path points at something loadable.
pub trait AssetLookup: Debug + Send + Sync {
    fn exists(&self, path: &str) -> bool;
}

/// Treats every path as present.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAsset;

impl AssetLookup for AnyAsset {
    fn exists(&self, _path: &str) -> bool {
        true
    }
}

/// Looks relative paths up under a directory. Inline `data:` images and
/// remote URLs are assumed present.
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLookup for AssetDir {
    fn exists(&self, path: &str) -> bool {
        if is_inline_or_remote(path) {
            return true;
        }
        self.root.join(path).is_file()
    }
}

fn is_inline_or_remote(path: &str) -> bool {
    path.starts_with("data:") || path.starts_with("http://") || path.starts_with("https://")
}

/// Pick the image to display for `path`.
///
/// `field` names the pet setting the path came from (`defaultImage`,
/// `blinkImage`, ...). Without one, the field is inferred when `path`
/// equals the default or blink image; any other path is returned as-is.
/// A variant for the active season wins over one for the current growth
/// stage, which wins over the field's `default` variant.
pub fn resolve_image(config: &PetConfig, path: &str, field: Option<&str>) -> String {
    let field = match field {
        Some(field) => field,
        None if path == config.pet.default_image => "defaultImage",
        None if path == config.pet.blink_image => "blinkImage",
        None => return path.to_string(),
    };

    let Some(variants) = config.pet.image_variants.get(field) else {
        return path.to_string();
    };

    let season = config.seasonal.current_season.as_str();
    if config.seasonal.enabled && !matches!(season, "" | "none" | "default") {
        if let Some(image) = variants.seasonal.get(season).filter(|image| !image.is_empty()) {
            return image.clone();
        }
    }

    if config.growth.enabled {
        if let Some(image) = config
            .growth
            .current_stage()
            .and_then(|stage| variants.growth.get(&stage.name))
            .filter(|image| !image.is_empty())
        {
            return image.clone();
        }
    }

    match &variants.default {
        Some(image) if !image.is_empty() => image.clone(),
        _ => path.to_string(),
    }
}
