//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order matches chronological order. UUIDs are stored as
//! hyphenated lowercase strings, paths as lossy UTF-8.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use survey_core::{
  address::{Address, BuildingSurvey, Choice},
  case::Case,
  photo::{Annotation, Photo},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_path(path: &Path) -> String { path.to_string_lossy().into_owned() }

// ─── Choice ──────────────────────────────────────────────────────────────────

fn split_choice(choice: &Option<Choice>) -> (Option<String>, Option<String>) {
  match choice {
    Some(c) => (Some(c.value.clone()), c.other.clone()),
    None => (None, None),
  }
}

fn join_choice(value: Option<String>, other: Option<String>) -> Option<Choice> {
  value.map(|value| Choice { value, other })
}

// ─── Cases ───────────────────────────────────────────────────────────────────

pub const CASE_COLUMNS: &str =
  "case_id, case_number, case_name, case_date, created_at, updated_at";

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub case_id:     String,
  pub case_number: String,
  pub case_name:   Option<String>,
  pub case_date:   Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawCase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      case_id:     row.get(0)?,
      case_number: row.get(1)?,
      case_name:   row.get(2)?,
      case_date:   row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_case(self) -> Result<Case> {
    Ok(Case {
      case_id:     decode_uuid(&self.case_id)?,
      case_number: self.case_number,
      case_name:   self.case_name,
      case_date:   self.case_date,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Addresses ───────────────────────────────────────────────────────────────

pub const ADDRESS_COLUMNS: &str = "address_id, case_id, address, \
   structure, structure_other, usage, usage_other, wall, wall_other, \
   ceiling, ceiling_other, floor, floor_other, survey_status, \
   created_at, updated_at";

/// The eleven building-survey columns, in `ADDRESS_COLUMNS` order.
pub struct RawSurvey {
  pub structure:       Option<String>,
  pub structure_other: Option<String>,
  pub usage:           Option<String>,
  pub usage_other:     Option<String>,
  pub wall:            Option<String>,
  pub wall_other:      Option<String>,
  pub ceiling:         Option<String>,
  pub ceiling_other:   Option<String>,
  pub floor:           Option<String>,
  pub floor_other:     Option<String>,
  pub survey_status:   Option<String>,
}

impl RawSurvey {
  pub fn from_survey(s: &BuildingSurvey) -> Self {
    let (structure, structure_other) = split_choice(&s.structure);
    let (usage, usage_other) = split_choice(&s.usage);
    let (wall, wall_other) = split_choice(&s.wall);
    let (ceiling, ceiling_other) = split_choice(&s.ceiling);
    let (floor, floor_other) = split_choice(&s.floor);
    Self {
      structure,
      structure_other,
      usage,
      usage_other,
      wall,
      wall_other,
      ceiling,
      ceiling_other,
      floor,
      floor_other,
      survey_status: s.survey_status.clone(),
    }
  }

  pub fn into_survey(self) -> BuildingSurvey {
    BuildingSurvey {
      structure:     join_choice(self.structure, self.structure_other),
      usage:         join_choice(self.usage, self.usage_other),
      wall:          join_choice(self.wall, self.wall_other),
      ceiling:       join_choice(self.ceiling, self.ceiling_other),
      floor:         join_choice(self.floor, self.floor_other),
      survey_status: self.survey_status,
    }
  }
}

/// Raw strings read directly from an `addresses` row.
pub struct RawAddress {
  pub address_id: String,
  pub case_id:    String,
  pub address:    String,
  pub survey:     RawSurvey,
  pub created_at: String,
  pub updated_at: String,
}

impl RawAddress {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      address_id: row.get(0)?,
      case_id:    row.get(1)?,
      address:    row.get(2)?,
      survey:     RawSurvey {
        structure:       row.get(3)?,
        structure_other: row.get(4)?,
        usage:           row.get(5)?,
        usage_other:     row.get(6)?,
        wall:            row.get(7)?,
        wall_other:      row.get(8)?,
        ceiling:         row.get(9)?,
        ceiling_other:   row.get(10)?,
        floor:           row.get(11)?,
        floor_other:     row.get(12)?,
        survey_status:   row.get(13)?,
      },
      created_at: row.get(14)?,
      updated_at: row.get(15)?,
    })
  }

  pub fn into_address(self) -> Result<Address> {
    Ok(Address {
      address_id: decode_uuid(&self.address_id)?,
      case_id:    decode_uuid(&self.case_id)?,
      address:    self.address,
      survey:     self.survey.into_survey(),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Photos ──────────────────────────────────────────────────────────────────

pub const PHOTO_COLUMNS: &str = "photo_id, address_id, sequence, \
   original_path, watermarked_path, thumbnail_path, \
   position, material, crack_width, crack_shape, crack_count, \
   peeling, seepage, remark, created_at, updated_at";

/// Raw values read directly from a `photos` row.
pub struct RawPhoto {
  pub photo_id:         String,
  pub address_id:       String,
  pub sequence:         u32,
  pub original_path:    String,
  pub watermarked_path: String,
  pub thumbnail_path:   Option<String>,
  pub annotation:       Annotation,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawPhoto {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      photo_id:         row.get(0)?,
      address_id:       row.get(1)?,
      sequence:         row.get(2)?,
      original_path:    row.get(3)?,
      watermarked_path: row.get(4)?,
      thumbnail_path:   row.get(5)?,
      annotation:       Annotation {
        position:    row.get(6)?,
        material:    row.get(7)?,
        crack_width: row.get(8)?,
        crack_shape: row.get(9)?,
        crack_count: row.get(10)?,
        peeling:     row.get(11)?,
        seepage:     row.get(12)?,
        remark:      row.get(13)?,
      },
      created_at:       row.get(14)?,
      updated_at:       row.get(15)?,
    })
  }

  pub fn into_photo(self) -> Result<Photo> {
    Ok(Photo {
      photo_id:         decode_uuid(&self.photo_id)?,
      address_id:       decode_uuid(&self.address_id)?,
      sequence:         self.sequence,
      original_path:    PathBuf::from(self.original_path),
      watermarked_path: PathBuf::from(self.watermarked_path),
      thumbnail_path:   self.thumbnail_path.map(PathBuf::from),
      annotation:       self.annotation,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}
