//! Photo — one watermarked capture plus its defect annotations.
//!
//! Image files live on disk; the store only records their paths.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position tag given to a photo when the inspector does not pick one (wall).
pub const DEFAULT_POSITION: &str = "牆";

/// Material code given to a photo when the inspector does not pick one.
pub const DEFAULT_MATERIAL: &str = "P";

/// Highest sequence number a photo may hold. Stored values stay well inside
/// SQLite's signed integer range and `next + 1` can never overflow.
pub const MAX_SEQUENCE: u32 = i32::MAX as u32;

/// Structured defect metadata attached to a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
  /// Where in the building the photo was taken: 全景/牆/平頂/地坪/樑/柱/其他.
  pub position:    String,
  pub material:    String,
  pub crack_width: String,
  pub crack_shape: String,
  pub crack_count: String,
  /// 剝落
  pub peeling:     bool,
  /// 滲水
  pub seepage:     bool,
  pub remark:      String,
}

impl Default for Annotation {
  fn default() -> Self {
    Self {
      position:    DEFAULT_POSITION.to_owned(),
      material:    DEFAULT_MATERIAL.to_owned(),
      crack_width: String::new(),
      crack_shape: String::new(),
      crack_count: String::new(),
      peeling:     false,
      seepage:     false,
      remark:      String::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
  pub photo_id:         Uuid,
  pub address_id:       Uuid,
  /// 1-based, unique within the owning address.
  pub sequence:         u32,
  pub original_path:    PathBuf,
  /// The burned-in version used for display and export.
  pub watermarked_path: PathBuf,
  pub thumbnail_path:   Option<PathBuf>,
  pub annotation:       Annotation,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::SurveyStore::add_photo`]. The sequence number is
/// always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPhoto {
  pub address_id:       Uuid,
  pub original_path:    PathBuf,
  /// Falls back to `original_path` when `None`.
  pub watermarked_path: Option<PathBuf>,
  pub thumbnail_path:   Option<PathBuf>,
  pub annotation:       Annotation,
}

impl NewPhoto {
  /// Convenience constructor with default annotation and no derived files.
  pub fn new(address_id: Uuid, original_path: impl Into<PathBuf>) -> Self {
    Self {
      address_id,
      original_path: original_path.into(),
      watermarked_path: None,
      thumbnail_path: None,
      annotation: Annotation::default(),
    }
  }

  pub fn watermarked(mut self, path: impl Into<PathBuf>) -> Self {
    self.watermarked_path = Some(path.into());
    self
  }
}

/// Replacement annotation for an existing photo.
#[derive(Debug, Clone)]
pub struct PhotoUpdate {
  pub photo_id:       Uuid,
  pub annotation:     Annotation,
  pub thumbnail_path: Option<PathBuf>,
}
