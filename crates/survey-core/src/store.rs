//! The `SurveyStore` trait.
//!
//! Implemented by storage backends (e.g. `survey-store-sqlite`). The CLI and
//! the report exporter depend on this abstraction, not on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  address::{Address, AddressUpdate, NewAddress},
  case::{Cascade, Case, CaseStats, CaseUpdate, NewCase},
  photo::{NewPhoto, Photo, PhotoUpdate},
};

/// Abstraction over a survey store backend.
///
/// Ownership is strictly hierarchical: case → address → photo. Deleting a
/// parent removes every descendant in the same transaction.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait SurveyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Cases ─────────────────────────────────────────────────────────────

  fn add_case(
    &self,
    input: NewCase,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  fn get_case(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Case>, Self::Error>> + Send + '_;

  /// All cases, newest first.
  fn list_cases(&self) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + '_;

  /// Replace the editable fields of a case and bump `updated_at`.
  fn update_case(
    &self,
    update: CaseUpdate,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  /// Delete a case together with its addresses and their photos.
  fn delete_case(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Cascade, Self::Error>> + Send + '_;

  fn case_stats(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<CaseStats, Self::Error>> + Send + '_;

  // ── Addresses ─────────────────────────────────────────────────────────

  /// Returns an error if the owning case does not exist.
  fn add_address(
    &self,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  /// Addresses of one case, newest first.
  fn list_addresses(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Address>, Self::Error>> + Send + '_;

  fn update_address(
    &self,
    update: AddressUpdate,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  /// Delete an address together with its photos.
  fn delete_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Cascade, Self::Error>> + Send + '_;

  fn photo_count(
    &self,
    address_id: Uuid,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  // ── Photos ────────────────────────────────────────────────────────────

  /// Persist a photo and assign it the next sequence number of its address.
  fn add_photo(
    &self,
    input: NewPhoto,
  ) -> impl Future<Output = Result<Photo, Self::Error>> + Send + '_;

  fn get_photo(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Photo>, Self::Error>> + Send + '_;

  /// Photos of one address in ascending sequence order.
  fn list_photos(
    &self,
    address_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Photo>, Self::Error>> + Send + '_;

  /// The sequence number the next `add_photo` for this address would get.
  /// Does not reserve it.
  fn next_sequence(
    &self,
    address_id: Uuid,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  fn update_photo(
    &self,
    update: PhotoUpdate,
  ) -> impl Future<Output = Result<Photo, Self::Error>> + Send + '_;

  /// Move a photo to a different sequence number within its address.
  ///
  /// Returns an error if `sequence` is 0 or already held by a sibling.
  fn update_sequence(
    &self,
    id: Uuid,
    sequence: u32,
  ) -> impl Future<Output = Result<Photo, Self::Error>> + Send + '_;

  /// Delete one photo. Remaining photos keep their sequence numbers.
  fn delete_photo(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
