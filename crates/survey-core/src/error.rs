//! Error types for `survey-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("case not found: {0}")]
  CaseNotFound(Uuid),

  #[error("address not found: {0}")]
  AddressNotFound(Uuid),

  #[error("photo not found: {0}")]
  PhotoNotFound(Uuid),

  #[error("{0} must not be blank")]
  Blank(&'static str),

  #[error("sequence must be within 1..={max}, got {0}", max = crate::photo::MAX_SEQUENCE)]
  InvalidSequence(u32),

  /// The address already holds the highest assignable sequence number.
  #[error("no sequence number left for address {0}")]
  SequenceExhausted(Uuid),

  #[error("sequence {sequence} is already used by photo {holder}")]
  SequenceTaken { sequence: u32, holder: Uuid },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reject empty or whitespace-only text for a required field.
pub fn require_text(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Blank(field));
  }
  Ok(())
}
