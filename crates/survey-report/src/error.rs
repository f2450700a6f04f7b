//! Error type for `survey-report`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("pdf error: {0}")]
  Pdf(#[from] lopdf::Error),

  /// Serialising the finished document failed.
  #[error("failed to encode document: {0}")]
  Encode(String),

  #[error("invalid layout: {0}")]
  InvalidLayout(String),

  /// Another export on the same [`crate::Exporter`] has not finished yet.
  #[error("an export is already in progress")]
  ExportInProgress,

  #[error("export task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
