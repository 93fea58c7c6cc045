//! Placement geometry for decorative overlays.
//!
//! Overlays are cosmetic. Nothing computed here ever feeds back into a
//! descriptor; the pixel work lives in `faceroll-engine`'s compositor.
//!
//! Each [`OverlayKind`] maps to a fixed [`OverlaySpec`] row. Given the face's
//! landmarks that row yields an [`OverlayPlacement`]:
//!
//! - `width  = inter_ocular * width_factor`
//! - `height = face_height * height_factor`, or the asset's aspect ratio when unset
//! - `x      = eye_center.x - width / 2`
//! - `y      = anchor.y - height * offset_ratio + face_height * face_offset`

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  detection::{Landmarks, Point},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
  Glasses,
  Dog,
  Cat,
  Raccoon,
}

/// Vertical reference point an overlay is offset from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
  /// Midpoint of the two outer eye corners.
  EyeCenter,
  /// Outer corner of the left eye.
  LeftEyeCorner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySpec {
  pub anchor:        Anchor,
  pub width_factor:  f32,
  pub height_factor: Option<f32>,
  pub offset_ratio:  f32,
  pub face_offset:   f32,
  pub opacity:       f32,
}

const GLASSES: OverlaySpec = OverlaySpec {
  anchor:        Anchor::EyeCenter,
  width_factor:  2.4,
  height_factor: None,
  offset_ratio:  1.0 / 1.9,
  face_offset:   0.0,
  opacity:       1.0,
};

const MASK: OverlaySpec = OverlaySpec {
  anchor:        Anchor::LeftEyeCorner,
  width_factor:  2.4,
  height_factor: Some(2.2),
  offset_ratio:  0.45,
  face_offset:   0.15,
  opacity:       1.0,
};

impl OverlayKind {
  pub const ALL: [OverlayKind; 4] =
    [Self::Glasses, Self::Dog, Self::Cat, Self::Raccoon];

  pub fn spec(self) -> OverlaySpec {
    match self {
      Self::Glasses => GLASSES,
      Self::Dog | Self::Cat | Self::Raccoon => MASK,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Glasses => "glasses",
      Self::Dog => "dog",
      Self::Cat => "cat",
      Self::Raccoon => "raccoon",
    }
  }

  /// File name of the PNG asset inside the overlay directory.
  pub fn asset_file(self) -> String { format!("{}.png", self.as_str()) }

  /// Parse a user-supplied filter name; `none`/`ninguno`/empty means no overlay.
  pub fn parse_optional(s: &str) -> Result<Option<Self>, Error> {
    match s.trim().to_lowercase().as_str() {
      "" | "none" | "ninguno" => Ok(None),
      other => other.parse().map(Some),
    }
  }
}

impl fmt::Display for OverlayKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OverlayKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "glasses" | "lentes" => Ok(Self::Glasses),
      "dog" | "perro" => Ok(Self::Dog),
      "cat" | "gato" => Ok(Self::Cat),
      "raccoon" | "mapache" => Ok(Self::Raccoon),
      other => Err(Error::UnknownOverlayKind(other.to_owned())),
    }
  }
}

// ─── Geometry ────────────────────────────────────────────────────────────────

/// Proxies derived from one face's landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
  pub eye_center:      Point,
  pub left_eye_corner: Point,
  pub inter_ocular:    f32,
  /// Vertical span from the left eye corner down to the chin.
  pub face_height:     f32,
}

impl FaceGeometry {
  /// `None` when the eye groups are too short or the eye span is zero. A
  /// missing chin point leaves `face_height` at zero.
  pub fn from_landmarks(landmarks: &Landmarks) -> Option<Self> {
    let left = *landmarks.left_eye.first()?;
    let right = *landmarks.right_eye.get(3)?;

    let inter_ocular = (right.x - left.x).abs();
    if !inter_ocular.is_finite() || inter_ocular <= 0.0 {
      return None;
    }

    Some(Self {
      eye_center: Point::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0),
      left_eye_corner: left,
      inter_ocular,
      face_height: landmarks
        .jaw
        .get(8)
        .map_or(0.0, |chin| (chin.y - left.y).abs()),
    })
  }
}

/// Where and how large to draw an overlay on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
  pub x:       i64,
  pub y:       i64,
  pub width:   u32,
  pub height:  u32,
  pub opacity: f32,
}

impl OverlayPlacement {
  /// Stretch the overlay across the whole base image.
  pub fn full_frame(base_size: (u32, u32)) -> Self {
    Self {
      x:       0,
      y:       0,
      width:   base_size.0.max(1),
      height:  base_size.1.max(1),
      opacity: 1.0,
    }
  }
}

/// Largest overlay, as a multiple of the base image's side, that still counts as
/// a usable placement.
pub const MAX_OVERLAY_SCALE: f32 = 4.0;

/// Compute the placement of `kind` on a face.
///
/// Falls back to [`OverlayPlacement::full_frame`] when landmarks are missing or
/// unusable, so a request with a coarse detection still gets a result. A
/// placement that is non-finite, or whose size or offset exceeds
/// [`MAX_OVERLAY_SCALE`] times the base image, counts as unusable.
pub fn placement(
  kind: OverlayKind,
  landmarks: Option<&Landmarks>,
  overlay_size: (u32, u32),
  base_size: (u32, u32),
) -> OverlayPlacement {
  landmarks
    .and_then(FaceGeometry::from_landmarks)
    .and_then(|geometry| placement_for(kind.spec(), &geometry, overlay_size, base_size))
    .unwrap_or_else(|| OverlayPlacement::full_frame(base_size))
}

fn placement_for(
  spec: OverlaySpec,
  geometry: &FaceGeometry,
  overlay_size: (u32, u32),
  base_size: (u32, u32),
) -> Option<OverlayPlacement> {
  let width = geometry.inter_ocular * spec.width_factor;
  let height = match spec.height_factor {
    Some(factor) => {
      if geometry.face_height <= 0.0 {
        return None;
      }
      geometry.face_height * factor
    }
    None => {
      let (ow, oh) = overlay_size;
      if ow == 0 {
        return None;
      }
      width * oh as f32 / ow as f32
    }
  };

  let anchor_y = match spec.anchor {
    Anchor::EyeCenter => geometry.eye_center.y,
    Anchor::LeftEyeCorner => geometry.left_eye_corner.y,
  };

  let x = geometry.eye_center.x - width / 2.0;
  let y = anchor_y - height * spec.offset_ratio + geometry.face_height * spec.face_offset;

  let max_w = base_size.0.max(1) as f32 * MAX_OVERLAY_SCALE;
  let max_h = base_size.1.max(1) as f32 * MAX_OVERLAY_SCALE;
  let in_bounds = [width, height, x, y].iter().all(|v| v.is_finite())
    && width <= max_w
    && height <= max_h
    && x.abs() <= max_w
    && y.abs() <= max_h;
  if !in_bounds {
    return None;
  }

  Some(OverlayPlacement {
    x:       x.round() as i64,
    y:       y.round() as i64,
    width:   (width.round() as u32).max(1),
    height:  (height.round() as u32).max(1),
    opacity: spec.opacity,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Eyes level at y=100, outer corners at x=100 and x=150, chin at y=200.
  fn landmarks() -> Landmarks {
    let eye = |x0: f32| -> Vec<Point> {
      (0..6).map(|i| Point::new(x0 + i as f32, 100.0)).collect()
    };
    let mut right: Vec<Point> = eye(140.0);
    right[3] = Point::new(150.0, 100.0);
    let mut jaw: Vec<Point> = (0..17).map(|i| Point::new(80.0 + i as f32 * 5.0, 150.0)).collect();
    jaw[8] = Point::new(125.0, 200.0);
    Landmarks {
      left_eye: eye(100.0),
      right_eye: right,
      nose: vec![],
      mouth: vec![],
      jaw,
    }
  }

  #[test]
  fn parses_spanish_and_english_names() {
    assert_eq!("lentes".parse::<OverlayKind>().unwrap(), OverlayKind::Glasses);
    assert_eq!("Perro".parse::<OverlayKind>().unwrap(), OverlayKind::Dog);
    assert_eq!("raccoon".parse::<OverlayKind>().unwrap(), OverlayKind::Raccoon);
    assert_eq!(OverlayKind::parse_optional("ninguno").unwrap(), None);
    assert!(matches!(
      "unicorn".parse::<OverlayKind>(),
      Err(Error::UnknownOverlayKind(_))
    ));
  }

  #[test]
  fn geometry_from_landmarks() {
    let g = FaceGeometry::from_landmarks(&landmarks()).unwrap();
    assert_eq!(g.eye_center, Point::new(125.0, 100.0));
    assert_eq!(g.inter_ocular, 50.0);
    assert_eq!(g.face_height, 100.0);
  }

  #[test]
  fn glasses_keep_asset_aspect() {
    let p = placement(OverlayKind::Glasses, Some(&landmarks()), (240, 95), (400, 400));
    // width = 50 * 2.4 = 120, height = 120 * 95 / 240 = 47.5
    assert_eq!(p.width, 120);
    assert_eq!(p.height, 48);
    assert_eq!(p.x, 65);
    // 100 - 47.5 / 1.9 = 75
    assert_eq!(p.y, 75);
    assert_eq!(p.opacity, 1.0);
  }

  #[test]
  fn masks_scale_with_face_height() {
    for kind in [OverlayKind::Dog, OverlayKind::Cat, OverlayKind::Raccoon] {
      let p = placement(kind, Some(&landmarks()), (10, 10), (400, 400));
      // width = 120, height = 100 * 2.2 = 220
      assert_eq!((p.width, p.height), (120, 220));
      assert_eq!(p.x, 65);
      // 100 - 220 * 0.45 + 100 * 0.15 = 16
      assert_eq!(p.y, 16);
    }
  }

  #[test]
  fn missing_landmarks_fall_back_to_full_frame() {
    let p = placement(OverlayKind::Dog, None, (10, 10), (320, 240));
    assert_eq!(p, OverlayPlacement::full_frame((320, 240)));

    let short = Landmarks { left_eye: vec![Point::new(1.0, 1.0)], ..Landmarks::default() };
    let p = placement(OverlayKind::Glasses, Some(&short), (10, 10), (320, 240));
    assert_eq!((p.x, p.y, p.width, p.height), (0, 0, 320, 240));
  }

  #[test]
  fn flat_face_height_falls_back_for_masks_only() {
    let mut lm = landmarks();
    lm.jaw[8] = Point::new(125.0, 100.0);
    let mask = placement(OverlayKind::Cat, Some(&lm), (10, 10), (64, 64));
    assert_eq!(mask, OverlayPlacement::full_frame((64, 64)));

    let glasses = placement(OverlayKind::Glasses, Some(&lm), (10, 10), (64, 64));
    assert_eq!(glasses.width, 120);
  }

  #[test]
  fn runaway_landmarks_fall_back_to_full_frame() {
    let mut lm = landmarks();
    lm.right_eye[3] = Point::new(1e30, 100.0);
    let p = placement(OverlayKind::Glasses, Some(&lm), (10, 4), (64, 64));
    assert_eq!(p, OverlayPlacement::full_frame((64, 64)));

    let mut lm = landmarks();
    lm.jaw[8] = Point::new(125.0, f32::INFINITY);
    let p = placement(OverlayKind::Dog, Some(&lm), (10, 10), (64, 64));
    assert_eq!(p, OverlayPlacement::full_frame((64, 64)));

    let mut lm = landmarks();
    lm.left_eye[0] = Point::new(100.0, -1e9);
    let p = placement(OverlayKind::Cat, Some(&lm), (10, 10), (400, 400));
    assert_eq!(p, OverlayPlacement::full_frame((400, 400)));
  }
}
