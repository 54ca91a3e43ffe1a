use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::shared::constants::IMAGE_EXTENSIONS;

#[derive(Error, Debug)]
pub enum OverlayAssetError {
    #[error("overlay image not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported overlay image format: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("failed to decode overlay {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid overlay: {0}")]
    Invalid(String),
}

/// Load an overlay image from disk as straight-alpha RGBA8.
///
/// Images without an alpha channel are treated as fully opaque.
pub fn load_overlay_asset(path: &Path) -> Result<OverlayAsset, OverlayAssetError> {
    if !path.exists() {
        return Err(OverlayAssetError::NotFound(path.to_path_buf()));
    }
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
    if !supported {
        return Err(OverlayAssetError::UnsupportedExtension(path.to_path_buf()));
    }

    let img = image::open(path)
        .map_err(|source| OverlayAssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    log::debug!("Loaded overlay {} ({width}x{height})", path.display());

    OverlayAsset::new(img.into_raw(), width, height).map_err(OverlayAssetError::Invalid)
}
