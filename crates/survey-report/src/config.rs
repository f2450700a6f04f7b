//! Report settings, deserialised from the `[report]` table of the
//! application config.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result, layout::LayoutConfig};

/// Folder created under `output_dir` to hold every report.
pub const DEFAULT_FOLDER: &str = "鑑定助手";

/// Centered heading on the first page.
pub const DEFAULT_TITLE: &str = "現況鑑定照片紀錄表";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  /// Parent directory of the report folder. A leading `~` is expanded.
  pub output_dir:   PathBuf,
  pub folder_name:  String,
  pub title:        String,
  /// JPEG quality (1–100) used when re-encoding photos for embedding.
  pub jpeg_quality: u8,
  /// Image pixels per point of printed size.
  pub image_scale:  f32,
  pub layout:       LayoutConfig,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      output_dir:   PathBuf::from("~/Documents"),
      folder_name:  DEFAULT_FOLDER.to_owned(),
      title:        DEFAULT_TITLE.to_owned(),
      jpeg_quality: 85,
      image_scale:  2.0,
      layout:       LayoutConfig::default(),
    }
  }
}

impl ReportConfig {
  /// The directory reports are written to.
  pub fn report_dir(&self) -> PathBuf { expand_tilde(&self.output_dir).join(&self.folder_name) }

  pub fn validate(&self) -> Result<()> {
    if !(1..=100).contains(&self.jpeg_quality) {
      return Err(Error::InvalidLayout(format!(
        "jpeg_quality must be within 1..=100, got {}",
        self.jpeg_quality
      )));
    }
    if !(self.image_scale > 0.0) {
      return Err(Error::InvalidLayout(format!(
        "image_scale must be positive, got {}",
        self.image_scale
      )));
    }
    if self.folder_name.trim().is_empty() {
      return Err(Error::InvalidLayout("folder_name must not be blank".into()));
    }
    self.layout.validate()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if s == "~"
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home);
  }
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
