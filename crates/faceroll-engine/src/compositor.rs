//! Overlay compositing onto a face image.
//!
//! Placement comes from [`faceroll_core::overlay::placement`]; this module only
//! does the pixel work. The composited image is decorative output and is never
//! handed back to the detector or matcher.

use std::{collections::HashMap, path::Path};

use faceroll_core::{
  detection::Landmarks,
  overlay::{OverlayKind, placement},
};
use image::{DynamicImage, RgbaImage, imageops};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositeError {
  #[error("no overlay asset loaded for {0}")]
  MissingAsset(OverlayKind),

  #[error("image error: {0}")]
  Image(#[from] image::ImageError),
}

/// Holds the decoded overlay assets, one per kind.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
  assets: HashMap<OverlayKind, RgbaImage>,
}

impl Compositor {
  pub fn new() -> Self { Self::default() }

  pub fn with_asset(mut self, kind: OverlayKind, asset: RgbaImage) -> Self {
    self.assets.insert(kind, asset);
    self
  }

  /// Load `<kind>.png` for every kind found in `dir`. Missing files are logged
  /// and skipped; unreadable ones are an error.
  pub fn load_dir(dir: &Path) -> Result<Self, CompositeError> {
    let mut compositor = Self::new();
    for kind in OverlayKind::ALL {
      let path = dir.join(kind.asset_file());
      if !path.exists() {
        tracing::warn!(path = %path.display(), overlay = %kind, "overlay asset not found");
        continue;
      }
      let asset = image::open(&path)?.to_rgba8();
      tracing::info!(
        path = %path.display(),
        overlay = %kind,
        width = asset.width(),
        height = asset.height(),
        "loaded overlay asset"
      );
      compositor.assets.insert(kind, asset);
    }
    Ok(compositor)
  }

  pub fn has_asset(&self, kind: OverlayKind) -> bool { self.assets.contains_key(&kind) }

  /// Draw `kind` over `base`, positioned from `landmarks`.
  ///
  /// Without usable landmarks the overlay is stretched over the whole image.
  pub fn composite(
    &self,
    base: &RgbaImage,
    landmarks: Option<&Landmarks>,
    kind: OverlayKind,
  ) -> Result<RgbaImage, CompositeError> {
    let asset = self
      .assets
      .get(&kind)
      .ok_or(CompositeError::MissingAsset(kind))?;

    let spot = placement(kind, landmarks, asset.dimensions(), base.dimensions());
    let mut layer = imageops::resize(
      asset,
      spot.width,
      spot.height,
      imageops::FilterType::Lanczos3,
    );
    if spot.opacity < 1.0 {
      let factor = spot.opacity.clamp(0.0, 1.0);
      for pixel in layer.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f32 * factor).round() as u8;
      }
    }

    let mut out = base.clone();
    imageops::overlay(&mut out, &layer, spot.x, spot.y);
    Ok(out)
  }

  /// Mild contrast and brightness lift applied when no overlay is chosen.
  pub fn touch_up(base: &DynamicImage) -> DynamicImage {
    base.adjust_contrast(20.0).brighten(25)
  }
}
