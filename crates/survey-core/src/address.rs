//! Address — a physical site under a case and the unit of photo capture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error::require_text};

/// A categorical survey value. `other` carries the inspector's free-text
/// detail when none of the predefined values apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
  pub value: String,
  pub other: Option<String>,
}

impl Choice {
  pub fn new(value: impl Into<String>) -> Self {
    Self { value: value.into(), other: None }
  }

  pub fn with_other(mut self, other: impl Into<String>) -> Self {
    self.other = Some(other.into());
    self
  }
}

/// Building information recorded once per site visit. Every field is
/// optional; the store keeps whatever text the inspector picked or typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSurvey {
  /// 構造
  pub structure:     Option<Choice>,
  /// 用途
  pub usage:         Option<Choice>,
  /// 牆面
  pub wall:          Option<Choice>,
  /// 平頂
  pub ceiling:       Option<Choice>,
  /// 地坪
  pub floor:         Option<Choice>,
  /// 會勘狀況
  pub survey_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub address_id: Uuid,
  pub case_id:    Uuid,
  pub address:    String,
  pub survey:     BuildingSurvey,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::SurveyStore::add_address`].
#[derive(Debug, Clone)]
pub struct NewAddress {
  pub case_id: Uuid,
  pub address: String,
  pub survey:  BuildingSurvey,
}

impl NewAddress {
  pub fn new(case_id: Uuid, address: impl Into<String>) -> Self {
    Self { case_id, address: address.into(), survey: BuildingSurvey::default() }
  }

  pub fn validate(&self) -> Result<()> { require_text("address", &self.address) }
}

/// Replacement values for the editable fields of an address. The owning case
/// cannot be changed.
#[derive(Debug, Clone)]
pub struct AddressUpdate {
  pub address_id: Uuid,
  pub address:    String,
  pub survey:     BuildingSurvey,
}

impl AddressUpdate {
  pub fn from_address(address: &Address) -> Self {
    Self {
      address_id: address.address_id,
      address:    address.address.clone(),
      survey:     address.survey.clone(),
    }
  }

  pub fn validate(&self) -> Result<()> { require_text("address", &self.address) }
}
