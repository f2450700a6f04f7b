//! Aspect-preserving fit of an image into a cell.

/// Size of an image after fitting, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
  pub width:  f32,
  pub height: f32,
  pub scale:  f32,
}

/// Fit a `src_w` × `src_h` pixel image inside `max_w` × `max_h` points.
///
/// The scale is the smaller of the two bound ratios, so neither bound is
/// exceeded and the aspect ratio is kept. It is capped at 1: an image that
/// already fits keeps its natural size (one pixel per point).
pub fn fit_within(src_w: u32, src_h: u32, max_w: f32, max_h: f32) -> Fit {
  if src_w == 0 || src_h == 0 {
    return Fit { width: 0.0, height: 0.0, scale: 0.0 };
  }

  let (w, h) = (src_w as f32, src_h as f32);
  let scale = (max_w / w).min(max_h / h).min(1.0);

  // Snap the bound-limited side exactly onto its bound so float error never
  // nudges it past the cell edge.
  let (width, height) = if scale == max_w / w {
    (max_w, (h * scale).min(max_h))
  } else if scale == max_h / h {
    ((w * scale).min(max_w), max_h)
  } else {
    (w * scale, h * scale)
  };

  Fit { width, height, scale }
}

/// Pixel size to resample a fitted image to: `density` pixels per point,
/// never more than the source has and never zero.
pub fn target_pixels(fit: &Fit, density: f32, src_w: u32, src_h: u32) -> (u32, u32) {
  let px = |points: f32, limit: u32| ((points * density).round() as u32).clamp(1, limit.max(1));
  (px(fit.width, src_w), px(fit.height, src_h))
}
