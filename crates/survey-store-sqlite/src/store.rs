//! [`SqliteStore`] — the SQLite implementation of [`SurveyStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use survey_core::{
  address::{Address, AddressUpdate, NewAddress},
  case::{Cascade, Case, CaseStats, CaseUpdate, NewCase},
  entity::Entity,
  photo::{MAX_SEQUENCE, NewPhoto, Photo, PhotoUpdate},
  store::SurveyStore,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  encode::{
    ADDRESS_COLUMNS, CASE_COLUMNS, PHOTO_COLUMNS, RawAddress, RawCase, RawPhoto, RawSurvey,
    decode_uuid, encode_dt, encode_path, encode_uuid,
  },
  schema::SCHEMA,
  watch::{Change, Snapshot, Watch},
  Error, Result,
};

/// Pending notifications a slow subscriber may fall behind by before it is
/// told it lagged.
const CHANGE_FEED_CAPACITY: usize = 64;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A survey store backed by a single SQLite file.
///
/// Clones share one connection and publish to one change feed.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  changes: broadcast::Sender<Change>,
}

/// Outcome of a sequence move, decided inside the write transaction.
enum Resequence {
  PhotoMissing,
  Taken(String),
  Moved(RawPhoto),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    let store = Self { conn, changes };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Announce committed writes. Having no subscribers is not an error.
  fn publish(&self, changes: impl IntoIterator<Item = Change>) {
    for change in changes {
      let _ = self.changes.send(change);
    }
  }

  // ── Live queries ──────────────────────────────────────────────────────────

  /// Subscribe to the change feed before the first load so no write that
  /// lands in between is missed.
  fn watch<T: Snapshot>(&self, scope: Option<Uuid>) -> Watch<T> {
    Watch::new(self.clone(), self.changes.subscribe(), scope)
  }

  /// Live list of all cases.
  pub fn watch_cases(&self) -> Watch<Case> { self.watch(None) }

  /// Live list of the addresses of one case.
  pub fn watch_addresses(&self, case_id: Uuid) -> Watch<Address> { self.watch(Some(case_id)) }

  /// Live list of the photos of one address, in sequence order.
  pub fn watch_photos(&self, address_id: Uuid) -> Watch<Photo> { self.watch(Some(address_id)) }

  /// SQLite's `data_version` for this connection. It changes whenever
  /// another connection commits to the same database file.
  pub(crate) async fn data_version(&self) -> Result<i64> {
    let version = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA data_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  // ── Row helpers ───────────────────────────────────────────────────────────

  async fn fetch_case(&self, id: Uuid) -> Result<Option<RawCase>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1"),
            rusqlite::params![id_str],
            RawCase::from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(raw)
  }

  async fn fetch_address(&self, id: Uuid) -> Result<Option<RawAddress>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE address_id = ?1"),
            rusqlite::params![id_str],
            RawAddress::from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(raw)
  }

  async fn fetch_photo(&self, id: Uuid) -> Result<Option<RawPhoto>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE photo_id = ?1"),
            rusqlite::params![id_str],
            RawPhoto::from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(raw)
  }
}

/// The sequence the next photo of an address would get, decided inside the
/// caller's transaction.
enum NextSequence {
  AddressMissing,
  Exhausted,
  Free(u32),
}

impl NextSequence {
  fn into_result(self, address_id: Uuid) -> Result<u32> {
    match self {
      Self::AddressMissing => Err(survey_core::Error::AddressNotFound(address_id).into()),
      Self::Exhausted => Err(survey_core::Error::SequenceExhausted(address_id).into()),
      Self::Free(sequence) => Ok(sequence),
    }
  }
}

/// One past both the high-water mark and the largest sequence in use.
fn next_sequence_in(conn: &rusqlite::Connection, address_id: &str) -> rusqlite::Result<NextSequence> {
  let mark: Option<u32> = conn
    .query_row(
      "SELECT last_sequence FROM addresses WHERE address_id = ?1",
      rusqlite::params![address_id],
      |r| r.get(0),
    )
    .optional()?;

  let Some(mark) = mark else {
    return Ok(NextSequence::AddressMissing);
  };

  let max: u32 = conn.query_row(
    "SELECT COALESCE(MAX(sequence), 0) FROM photos WHERE address_id = ?1",
    rusqlite::params![address_id],
    |r| r.get(0),
  )?;

  Ok(match mark.max(max).checked_add(1) {
    Some(next) if next <= MAX_SEQUENCE => NextSequence::Free(next),
    _ => NextSequence::Exhausted,
  })
}

fn row_exists(conn: &rusqlite::Connection, sql: &str, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

// ─── SurveyStore impl ────────────────────────────────────────────────────────

impl SurveyStore for SqliteStore {
  type Error = Error;

  // ── Cases ─────────────────────────────────────────────────────────────────

  async fn add_case(&self, input: NewCase) -> Result<Case> {
    input.validate()?;

    let now = Utc::now();
    let case = Case {
      case_id:     Uuid::new_v4(),
      case_number: input.case_number,
      case_name:   input.case_name,
      case_date:   input.case_date,
      created_at:  now,
      updated_at:  now,
    };

    let id_str  = encode_uuid(case.case_id);
    let number  = case.case_number.clone();
    let name    = case.case_name.clone();
    let date    = case.case_date.clone();
    let at_str  = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cases (case_id, case_number, case_name, case_date, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, number, name, date, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.publish([Change::new(Entity::Case, None)]);
    Ok(case)
  }

  async fn get_case(&self, id: Uuid) -> Result<Option<Case>> {
    self.fetch_case(id).await?.map(RawCase::into_case).transpose()
  }

  async fn list_cases(&self) -> Result<Vec<Case>> {
    let raws: Vec<RawCase> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CASE_COLUMNS} FROM cases ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawCase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }

  async fn update_case(&self, update: CaseUpdate) -> Result<Case> {
    update.validate()?;

    let case_id = update.case_id;
    let id_str  = encode_uuid(case_id);
    let at_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases SET case_number = ?2, case_name = ?3, case_date = ?4, updated_at = ?5
           WHERE case_id = ?1",
          rusqlite::params![id_str, update.case_number, update.case_name, update.case_date, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(survey_core::Error::CaseNotFound(case_id).into());
    }

    self.publish([Change::new(Entity::Case, None)]);
    self
      .get_case(case_id)
      .await?
      .ok_or_else(|| survey_core::Error::CaseNotFound(case_id).into())
  }

  async fn delete_case(&self, id: Uuid) -> Result<Cascade> {
    let id_str = encode_uuid(id);

    let outcome: Option<(Cascade, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, "SELECT 1 FROM cases WHERE case_id = ?1", &id_str)? {
          return Ok(None);
        }

        let address_ids: Vec<String> = {
          let mut stmt = tx.prepare("SELECT address_id FROM addresses WHERE case_id = ?1")?;
          stmt
            .query_map(rusqlite::params![id_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        // Children first, so the fan-out does not depend on the engine's
        // own cascade support.
        let photos = tx.execute(
          "DELETE FROM photos WHERE address_id IN
             (SELECT address_id FROM addresses WHERE case_id = ?1)",
          rusqlite::params![id_str],
        )?;
        let addresses = tx.execute(
          "DELETE FROM addresses WHERE case_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute("DELETE FROM cases WHERE case_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;

        let cascade = Cascade { addresses: addresses as u32, photos: photos as u32 };
        Ok(Some((cascade, address_ids)))
      })
      .await?;

    let (cascade, address_ids) = outcome.ok_or(survey_core::Error::CaseNotFound(id))?;
    tracing::info!(
      case_id = %id,
      addresses = cascade.addresses,
      photos = cascade.photos,
      "deleted case"
    );

    let address_ids = address_ids
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<Result<Vec<_>>>()?;

    self.publish(
      [Change::new(Entity::Case, None), Change::new(Entity::Address, Some(id))]
        .into_iter()
        .chain(address_ids.into_iter().map(|a| Change::new(Entity::Photo, Some(a)))),
    );
    Ok(cascade)
  }

  async fn case_stats(&self, id: Uuid) -> Result<CaseStats> {
    let id_str = encode_uuid(id);

    let stats: Option<CaseStats> = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM cases WHERE case_id = ?1", &id_str)? {
          return Ok(None);
        }
        let addresses: u32 = conn.query_row(
          "SELECT COUNT(*) FROM addresses WHERE case_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        let photos: u32 = conn.query_row(
          "SELECT COUNT(*) FROM photos WHERE address_id IN
             (SELECT address_id FROM addresses WHERE case_id = ?1)",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        Ok(Some(CaseStats { addresses, photos }))
      })
      .await?;

    Ok(stats.ok_or(survey_core::Error::CaseNotFound(id))?)
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn add_address(&self, input: NewAddress) -> Result<Address> {
    input.validate()?;

    let now = Utc::now();
    let address = Address {
      address_id: Uuid::new_v4(),
      case_id:    input.case_id,
      address:    input.address,
      survey:     input.survey,
      created_at: now,
      updated_at: now,
    };

    let id_str      = encode_uuid(address.address_id);
    let case_id_str = encode_uuid(address.case_id);
    let text        = address.address.clone();
    let s           = RawSurvey::from_survey(&address.survey);
    let at_str      = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM cases WHERE case_id = ?1", &case_id_str)? {
          return Ok(false);
        }
        conn.execute(
          &format!(
            "INSERT INTO addresses ({ADDRESS_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)"
          ),
          rusqlite::params![
            id_str,
            case_id_str,
            text,
            s.structure,
            s.structure_other,
            s.usage,
            s.usage_other,
            s.wall,
            s.wall_other,
            s.ceiling,
            s.ceiling_other,
            s.floor,
            s.floor_other,
            s.survey_status,
            at_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(survey_core::Error::CaseNotFound(address.case_id).into());
    }

    self.publish([Change::new(Entity::Address, Some(address.case_id))]);
    Ok(address)
  }

  async fn get_address(&self, id: Uuid) -> Result<Option<Address>> {
    self.fetch_address(id).await?.map(RawAddress::into_address).transpose()
  }

  async fn list_addresses(&self, case_id: Uuid) -> Result<Vec<Address>> {
    let case_id_str = encode_uuid(case_id);

    let raws: Vec<RawAddress> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE case_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![case_id_str], RawAddress::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAddress::into_address).collect()
  }

  async fn update_address(&self, update: AddressUpdate) -> Result<Address> {
    update.validate()?;

    let address_id = update.address_id;
    let id_str     = encode_uuid(address_id);
    let s          = RawSurvey::from_survey(&update.survey);
    let text       = update.address;
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE addresses SET
             address = ?2,
             structure = ?3, structure_other = ?4,
             usage = ?5, usage_other = ?6,
             wall = ?7, wall_other = ?8,
             ceiling = ?9, ceiling_other = ?10,
             floor = ?11, floor_other = ?12,
             survey_status = ?13,
             updated_at = ?14
           WHERE address_id = ?1",
          rusqlite::params![
            id_str,
            text,
            s.structure,
            s.structure_other,
            s.usage,
            s.usage_other,
            s.wall,
            s.wall_other,
            s.ceiling,
            s.ceiling_other,
            s.floor,
            s.floor_other,
            s.survey_status,
            at_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(survey_core::Error::AddressNotFound(address_id).into());
    }

    let address = self
      .get_address(address_id)
      .await?
      .ok_or(survey_core::Error::AddressNotFound(address_id))?;
    self.publish([Change::new(Entity::Address, Some(address.case_id))]);
    Ok(address)
  }

  async fn delete_address(&self, id: Uuid) -> Result<Cascade> {
    let id_str = encode_uuid(id);

    let outcome: Option<(u32, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let case_id: Option<String> = tx
          .query_row(
            "SELECT case_id FROM addresses WHERE address_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(case_id) = case_id else {
          return Ok(None);
        };

        let photos =
          tx.execute("DELETE FROM photos WHERE address_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM addresses WHERE address_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;

        Ok(Some((photos as u32, case_id)))
      })
      .await?;

    let (photos, case_id) = outcome.ok_or(survey_core::Error::AddressNotFound(id))?;
    let case_id = decode_uuid(&case_id)?;
    tracing::info!(address_id = %id, photos, "deleted address");

    self.publish([
      Change::new(Entity::Address, Some(case_id)),
      Change::new(Entity::Photo, Some(id)),
    ]);
    Ok(Cascade { addresses: 1, photos })
  }

  async fn photo_count(&self, address_id: Uuid) -> Result<u32> {
    let id_str = encode_uuid(address_id);

    let count: Option<u32> = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM addresses WHERE address_id = ?1", &id_str)? {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          "SELECT COUNT(*) FROM photos WHERE address_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?))
      })
      .await?;

    Ok(count.ok_or(survey_core::Error::AddressNotFound(address_id))?)
  }

  // ── Photos ────────────────────────────────────────────────────────────────

  async fn add_photo(&self, input: NewPhoto) -> Result<Photo> {
    let now = Utc::now();
    let watermarked_path = input
      .watermarked_path
      .unwrap_or_else(|| input.original_path.clone());

    let mut photo = Photo {
      photo_id: Uuid::new_v4(),
      address_id: input.address_id,
      sequence: 0,
      original_path: input.original_path,
      watermarked_path,
      thumbnail_path: input.thumbnail_path,
      annotation: input.annotation,
      created_at: now,
      updated_at: now,
    };

    let id_str          = encode_uuid(photo.photo_id);
    let address_id_str  = encode_uuid(photo.address_id);
    let original_str    = encode_path(&photo.original_path);
    let watermarked_str = encode_path(&photo.watermarked_path);
    let thumbnail_str   = photo.thumbnail_path.as_deref().map(encode_path);
    let a               = photo.annotation.clone();
    let at_str          = encode_dt(now);

    let next: NextSequence = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sequence = match next_sequence_in(&tx, &address_id_str)? {
          NextSequence::Free(sequence) => sequence,
          unavailable => return Ok(unavailable),
        };

        tx.execute(
          &format!(
            "INSERT INTO photos ({PHOTO_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)"
          ),
          rusqlite::params![
            id_str,
            address_id_str,
            sequence,
            original_str,
            watermarked_str,
            thumbnail_str,
            a.position,
            a.material,
            a.crack_width,
            a.crack_shape,
            a.crack_count,
            a.peeling,
            a.seepage,
            a.remark,
            at_str,
          ],
        )?;
        tx.execute(
          "UPDATE addresses SET last_sequence = ?2 WHERE address_id = ?1",
          rusqlite::params![address_id_str, sequence],
        )?;
        tx.commit()?;

        Ok(NextSequence::Free(sequence))
      })
      .await?;

    photo.sequence = next.into_result(photo.address_id)?;
    tracing::debug!(photo_id = %photo.photo_id, sequence = photo.sequence, "assigned sequence");

    self.publish([Change::new(Entity::Photo, Some(photo.address_id))]);
    Ok(photo)
  }

  async fn get_photo(&self, id: Uuid) -> Result<Option<Photo>> {
    self.fetch_photo(id).await?.map(RawPhoto::into_photo).transpose()
  }

  async fn list_photos(&self, address_id: Uuid) -> Result<Vec<Photo>> {
    let address_id_str = encode_uuid(address_id);

    let raws: Vec<RawPhoto> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PHOTO_COLUMNS} FROM photos WHERE address_id = ?1 ORDER BY sequence ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![address_id_str], RawPhoto::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPhoto::into_photo).collect()
  }

  async fn next_sequence(&self, address_id: Uuid) -> Result<u32> {
    let address_id_str = encode_uuid(address_id);

    let next = self
      .conn
      .call(move |conn| Ok(next_sequence_in(conn, &address_id_str)?))
      .await?;

    next.into_result(address_id)
  }

  async fn update_photo(&self, update: PhotoUpdate) -> Result<Photo> {
    let photo_id      = update.photo_id;
    let id_str        = encode_uuid(photo_id);
    let thumbnail_str = update.thumbnail_path.as_deref().map(encode_path);
    let a             = update.annotation;
    let at_str        = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE photos SET
             thumbnail_path = ?2,
             position = ?3, material = ?4,
             crack_width = ?5, crack_shape = ?6, crack_count = ?7,
             peeling = ?8, seepage = ?9, remark = ?10,
             updated_at = ?11
           WHERE photo_id = ?1",
          rusqlite::params![
            id_str,
            thumbnail_str,
            a.position,
            a.material,
            a.crack_width,
            a.crack_shape,
            a.crack_count,
            a.peeling,
            a.seepage,
            a.remark,
            at_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(survey_core::Error::PhotoNotFound(photo_id).into());
    }

    let photo = self
      .get_photo(photo_id)
      .await?
      .ok_or(survey_core::Error::PhotoNotFound(photo_id))?;
    self.publish([Change::new(Entity::Photo, Some(photo.address_id))]);
    Ok(photo)
  }

  async fn update_sequence(&self, id: Uuid, sequence: u32) -> Result<Photo> {
    if sequence == 0 || sequence > MAX_SEQUENCE {
      return Err(survey_core::Error::InvalidSequence(sequence).into());
    }

    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let address_id: Option<String> = tx
          .query_row(
            "SELECT address_id FROM photos WHERE photo_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(address_id) = address_id else {
          return Ok(Resequence::PhotoMissing);
        };

        let holder: Option<String> = tx
          .query_row(
            "SELECT photo_id FROM photos
             WHERE address_id = ?1 AND sequence = ?2 AND photo_id != ?3",
            rusqlite::params![address_id, sequence, id_str],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(holder) = holder {
          return Ok(Resequence::Taken(holder));
        }

        tx.execute(
          "UPDATE photos SET sequence = ?2, updated_at = ?3 WHERE photo_id = ?1",
          rusqlite::params![id_str, sequence, at_str],
        )?;
        tx.execute(
          "UPDATE addresses SET last_sequence = MAX(last_sequence, ?2) WHERE address_id = ?1",
          rusqlite::params![address_id, sequence],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE photo_id = ?1"),
          rusqlite::params![id_str],
          RawPhoto::from_row,
        )?;
        tx.commit()?;

        Ok(Resequence::Moved(raw))
      })
      .await?;

    let photo = match outcome {
      Resequence::PhotoMissing => return Err(survey_core::Error::PhotoNotFound(id).into()),
      Resequence::Taken(holder) => {
        return Err(
          survey_core::Error::SequenceTaken { sequence, holder: decode_uuid(&holder)? }.into(),
        );
      }
      Resequence::Moved(raw) => raw.into_photo()?,
    };

    self.publish([Change::new(Entity::Photo, Some(photo.address_id))]);
    Ok(photo)
  }

  async fn delete_photo(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let address_id: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let address_id: Option<String> = tx
          .query_row(
            "SELECT address_id FROM photos WHERE photo_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        if address_id.is_some() {
          tx.execute("DELETE FROM photos WHERE photo_id = ?1", rusqlite::params![id_str])?;
        }
        tx.commit()?;
        Ok(address_id)
      })
      .await?;

    let address_id = address_id.ok_or(survey_core::Error::PhotoNotFound(id))?;
    self.publish([Change::new(Entity::Photo, Some(decode_uuid(&address_id)?))]);
    Ok(())
  }
}
