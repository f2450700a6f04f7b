//! Live queries over the store.
//!
//! Every committed write publishes a [`Change`] naming the entity it touched
//! and the parent the affected rows belong to. A [`Watch`] filters the feed
//! for its own entity and scope and answers each relevant change with a
//! complete, freshly loaded snapshot.

use std::{future::Future, time::Duration};

use survey_core::{address::Address, case::Case, entity::Entity, photo::Photo, store::SurveyStore};
use tokio::{
  sync::broadcast::{
    Receiver,
    error::{RecvError, TryRecvError},
  },
  time,
};
use uuid::Uuid;

use crate::{Error, Result, SqliteStore};

/// A committed write, as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
  pub entity: Entity,
  /// Id of the owning record: the case for addresses, the address for
  /// photos, `None` for cases.
  pub scope:  Option<Uuid>,
}

impl Change {
  pub fn new(entity: Entity, scope: Option<Uuid>) -> Self { Self { entity, scope } }
}

/// A record type that can be loaded as a full list for one scope.
pub trait Snapshot: Clone + PartialEq + Send + 'static {
  const ENTITY: Entity;

  fn load(
    store: &SqliteStore,
    scope: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Self>>> + Send + '_;
}

impl Snapshot for Case {
  const ENTITY: Entity = Entity::Case;

  fn load(
    store: &SqliteStore,
    _scope: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Self>>> + Send + '_ {
    store.list_cases()
  }
}

impl Snapshot for Address {
  const ENTITY: Entity = Entity::Address;

  fn load(
    store: &SqliteStore,
    scope: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Self>>> + Send + '_ {
    async move {
      match scope {
        Some(case_id) => store.list_addresses(case_id).await,
        None => Ok(Vec::new()),
      }
    }
  }
}

impl Snapshot for Photo {
  const ENTITY: Entity = Entity::Photo;

  fn load(
    store: &SqliteStore,
    scope: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Self>>> + Send + '_ {
    async move {
      match scope {
        Some(address_id) => store.list_photos(address_id).await,
        None => Ok(Vec::new()),
      }
    }
  }
}

/// How often a watch checks for commits made through other connections,
/// such as a second process sharing the database file.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What woke a watch up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
  /// A matching write on this store's own feed.
  Feed,
  /// Another connection committed. It may not touch this query at all.
  External,
}

/// A subscription yielding full snapshots of one query.
///
/// The first [`Watch::next`] returns the current rows immediately. Each later
/// call waits for a matching change, drains whatever else is queued, and
/// reloads once. Deliveries to one subscriber never overlap because `next`
/// takes `&mut self`.
///
/// Writes through this store arrive on its change feed. Commits from other
/// connections are noticed by polling `PRAGMA data_version` every
/// [`POLL_INTERVAL`]; since those carry no entity or scope, the reload is
/// only delivered when the rows actually differ from the last snapshot.
pub struct Watch<T> {
  store:   SqliteStore,
  rx:      Receiver<Change>,
  scope:   Option<Uuid>,
  last:    Option<Vec<T>>,
  version: i64,
}

impl<T: Snapshot> Watch<T> {
  pub(crate) fn new(store: SqliteStore, rx: Receiver<Change>, scope: Option<Uuid>) -> Self {
    Self { store, rx, scope, last: None, version: 0 }
  }

  /// The parent id this watch is restricted to, if any.
  pub fn scope(&self) -> Option<Uuid> { self.scope }

  fn matches(&self, change: &Change) -> bool {
    change.entity == T::ENTITY && (self.scope.is_none() || change.scope == self.scope)
  }

  /// Wait for the next snapshot.
  pub async fn next(&mut self) -> Result<Vec<T>> {
    loop {
      let wake = match self.last {
        Some(_) => self.wait_for_change().await?,
        None => Wake::Feed,
      };

      // Read the version before loading so a commit racing the load is
      // picked up by the next poll.
      self.version = self.store.data_version().await?;
      let rows = T::load(&self.store, self.scope).await?;

      if wake == Wake::External && self.last.as_ref() == Some(&rows) {
        continue;
      }
      self.last = Some(rows.clone());
      return Ok(rows);
    }
  }

  async fn wait_for_change(&mut self) -> Result<Wake> {
    let mut poll = time::interval_at(time::Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    let wake = loop {
      let received = tokio::select! {
        received = self.rx.recv() => Some(received),
        _ = poll.tick() => None,
      };

      match received {
        Some(Ok(change)) if self.matches(&change) => break Wake::Feed,
        Some(Ok(_)) => continue,
        // Missed notifications may have been relevant; reload to be sure.
        Some(Err(RecvError::Lagged(skipped))) => {
          let entity = T::ENTITY;
          tracing::debug!(%entity, skipped, "watch lagged");
          break Wake::Feed;
        }
        Some(Err(RecvError::Closed)) => return Err(Error::FeedClosed),
        None => {
          if self.store.data_version().await? != self.version {
            break Wake::External;
          }
        }
      }
    };

    // Coalesce the backlog into the single reload that follows.
    loop {
      match self.rx.try_recv() {
        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }
    Ok(wake)
  }
}
