//! Case — the top-level inspection job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error::require_text};

/// An inspection job. Owns zero or more addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
  pub case_id:     Uuid,
  pub case_number: String,
  pub case_name:   Option<String>,
  /// Free text as entered by the inspector; not parsed.
  pub case_date:   Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::SurveyStore::add_case`].
#[derive(Debug, Clone, Default)]
pub struct NewCase {
  pub case_number: String,
  pub case_name:   Option<String>,
  pub case_date:   Option<String>,
}

impl NewCase {
  pub fn new(case_number: impl Into<String>) -> Self {
    Self { case_number: case_number.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> { require_text("case number", &self.case_number) }
}

/// Replacement values for the editable fields of a case.
#[derive(Debug, Clone)]
pub struct CaseUpdate {
  pub case_id:     Uuid,
  pub case_number: String,
  pub case_name:   Option<String>,
  pub case_date:   Option<String>,
}

impl CaseUpdate {
  /// Start from the current state of `case`.
  pub fn from_case(case: &Case) -> Self {
    Self {
      case_id:     case.case_id,
      case_number: case.case_number.clone(),
      case_name:   case.case_name.clone(),
      case_date:   case.case_date.clone(),
    }
  }

  pub fn validate(&self) -> Result<()> { require_text("case number", &self.case_number) }
}

/// Aggregate counts shown alongside a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStats {
  pub addresses: u32,
  pub photos:    u32,
}

/// How many child rows a delete removed along with its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cascade {
  pub addresses: u32,
  pub photos:    u32,
}
