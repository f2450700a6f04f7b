//! Application settings.
//!
//! Read from an optional TOML file, then overridden by `SURVEY_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `SURVEY_REPORT__OUTPUT_DIR`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use survey_report::{ReportConfig, config::expand_tilde};

#[derive(Debug, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub report:     ReportConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/survey/survey.db") }

impl Settings {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("SURVEY")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", file.display()))?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}
