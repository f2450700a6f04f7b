//! Error type for `survey-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] survey_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The change feed closed underneath a live subscription.
  #[error("change feed closed")]
  FeedClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
