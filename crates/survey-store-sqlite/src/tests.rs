//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use survey_core::{
  address::{AddressUpdate, BuildingSurvey, Choice, NewAddress},
  case::{CaseUpdate, NewCase},
  photo::{Annotation, MAX_SEQUENCE, NewPhoto, PhotoUpdate},
  store::SurveyStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore, watch::POLL_INTERVAL};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store with one case and one address under it.
async fn store_with_address() -> (SqliteStore, Uuid, Uuid) {
  let s = store().await;
  let case = s.add_case(NewCase::new("113-0042")).await.unwrap();
  let address = s
    .add_address(NewAddress::new(case.case_id, "台北市中正區重慶南路一段122號"))
    .await
    .unwrap();
  (s, case.case_id, address.address_id)
}

fn is_core(err: &Error, pred: impl Fn(&survey_core::Error) -> bool) -> bool {
  matches!(err, Error::Core(inner) if pred(inner))
}

// ─── Cases ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_case() {
  let s = store().await;

  let mut input = NewCase::new("113-0042");
  input.case_name = Some("捷運共構鄰損".into());
  let case = s.add_case(input).await.unwrap();

  let fetched = s.get_case(case.case_id).await.unwrap().unwrap();
  assert_eq!(fetched.case_number, "113-0042");
  assert_eq!(fetched.case_name.as_deref(), Some("捷運共構鄰損"));
  assert_eq!(fetched.case_date, None);
  assert_eq!(fetched.created_at, case.created_at);
}

#[tokio::test]
async fn blank_case_number_is_rejected() {
  let s = store().await;
  let err = s.add_case(NewCase::new("   ")).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::Blank(_))));
}

#[tokio::test]
async fn get_case_missing_returns_none() {
  let s = store().await;
  assert!(s.get_case(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_cases_newest_first() {
  let s = store().await;
  let first = s.add_case(NewCase::new("A")).await.unwrap();
  let second = s.add_case(NewCase::new("B")).await.unwrap();
  let third = s.add_case(NewCase::new("C")).await.unwrap();

  let ids: Vec<_> = s.list_cases().await.unwrap().iter().map(|c| c.case_id).collect();
  assert_eq!(ids, vec![third.case_id, second.case_id, first.case_id]);
}

#[tokio::test]
async fn update_case_bumps_updated_at() {
  let s = store().await;
  let case = s.add_case(NewCase::new("A")).await.unwrap();

  let mut update = CaseUpdate::from_case(&case);
  update.case_date = Some("2024/05/01".into());
  let updated = s.update_case(update).await.unwrap();

  assert_eq!(updated.case_date.as_deref(), Some("2024/05/01"));
  assert_eq!(updated.created_at, case.created_at);
  assert!(updated.updated_at >= case.updated_at);
}

#[tokio::test]
async fn update_missing_case_fails() {
  let s = store().await;
  let case = s.add_case(NewCase::new("A")).await.unwrap();
  let mut update = CaseUpdate::from_case(&case);
  update.case_id = Uuid::new_v4();

  let err = s.update_case(update).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::CaseNotFound(_))));
}

#[tokio::test]
async fn case_stats_count_addresses_and_photos() {
  let (s, case_id, address_id) = store_with_address().await;
  let other = s.add_address(NewAddress::new(case_id, "隔壁")).await.unwrap();

  s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();
  s.add_photo(NewPhoto::new(other.address_id, "/p/3.jpg")).await.unwrap();

  let stats = s.case_stats(case_id).await.unwrap();
  assert_eq!(stats.addresses, 2);
  assert_eq!(stats.photos, 3);
  assert_eq!(s.photo_count(address_id).await.unwrap(), 2);
}

// ─── Cascade deletes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_case_cascades_to_photos() {
  let (s, case_id, address_id) = store_with_address().await;
  let other = s.add_address(NewAddress::new(case_id, "隔壁")).await.unwrap();
  let photo = s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  s.add_photo(NewPhoto::new(other.address_id, "/p/2.jpg")).await.unwrap();

  // An unrelated case must survive.
  let keep = s.add_case(NewCase::new("keep")).await.unwrap();
  let kept_address = s.add_address(NewAddress::new(keep.case_id, "留")).await.unwrap();

  let cascade = s.delete_case(case_id).await.unwrap();
  assert_eq!(cascade.addresses, 2);
  assert_eq!(cascade.photos, 2);

  assert!(s.get_case(case_id).await.unwrap().is_none());
  assert!(s.get_address(address_id).await.unwrap().is_none());
  assert!(s.get_photo(photo.photo_id).await.unwrap().is_none());
  assert!(s.get_address(kept_address.address_id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_address_cascades_to_photos() {
  let (s, case_id, address_id) = store_with_address().await;
  s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();

  let cascade = s.delete_address(address_id).await.unwrap();
  assert_eq!(cascade.photos, 2);
  assert!(s.list_photos(address_id).await.unwrap().is_empty());
  assert_eq!(s.case_stats(case_id).await.unwrap().addresses, 0);
}

#[tokio::test]
async fn delete_missing_case_fails() {
  let s = store().await;
  let err = s.delete_case(Uuid::new_v4()).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::CaseNotFound(_))));
}

// ─── Addresses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn address_requires_existing_case() {
  let s = store().await;
  let err = s
    .add_address(NewAddress::new(Uuid::new_v4(), "nowhere"))
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::CaseNotFound(_))));
}

#[tokio::test]
async fn building_survey_roundtrip() {
  let (s, case_id, _) = store_with_address().await;

  let mut input = NewAddress::new(case_id, "新北市板橋區");
  input.survey = BuildingSurvey {
    structure:     Some(Choice::new("RC")),
    usage:         Some(Choice::new("其他").with_other("宮廟")),
    wall:          None,
    ceiling:       Some(Choice::new("油漆")),
    floor:         None,
    survey_status: Some("屋主在場".into()),
  };
  let address = s.add_address(input).await.unwrap();

  let fetched = s.get_address(address.address_id).await.unwrap().unwrap();
  assert_eq!(fetched.survey, address.survey);
  assert_eq!(
    fetched.survey.usage.as_ref().and_then(|c| c.other.as_deref()),
    Some("宮廟")
  );
}

#[tokio::test]
async fn update_address_replaces_survey() {
  let (s, _, address_id) = store_with_address().await;
  let address = s.get_address(address_id).await.unwrap().unwrap();

  let mut update = AddressUpdate::from_address(&address);
  update.survey.wall = Some(Choice::new("磁磚"));
  let updated = s.update_address(update).await.unwrap();

  assert_eq!(updated.survey.wall, Some(Choice::new("磁磚")));
  assert_eq!(updated.case_id, address.case_id);
}

// ─── Sequences ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn sequences_increase_per_address() {
  let (s, case_id, address_id) = store_with_address().await;
  let other = s.add_address(NewAddress::new(case_id, "隔壁")).await.unwrap();

  let a1 = s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  let b1 = s.add_photo(NewPhoto::new(other.address_id, "/p/x.jpg")).await.unwrap();
  let a2 = s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();

  assert_eq!(a1.sequence, 1);
  assert_eq!(a2.sequence, 2);
  assert_eq!(b1.sequence, 1);
  assert_eq!(s.next_sequence(address_id).await.unwrap(), 3);
}

#[tokio::test]
async fn deleted_sequence_is_not_reused() {
  let (s, _, address_id) = store_with_address().await;
  s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  let second = s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();

  s.delete_photo(second.photo_id).await.unwrap();
  let third = s.add_photo(NewPhoto::new(address_id, "/p/3.jpg")).await.unwrap();

  assert_eq!(third.sequence, 3);
  let seqs: Vec<_> = s.list_photos(address_id).await.unwrap().iter().map(|p| p.sequence).collect();
  assert_eq!(seqs, vec![1, 3]);
}

#[tokio::test]
async fn update_sequence_reorders() {
  let (s, _, address_id) = store_with_address().await;
  let first = s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();

  let moved = s.update_sequence(first.photo_id, 10).await.unwrap();
  assert_eq!(moved.sequence, 10);

  let paths: Vec<_> = s
    .list_photos(address_id)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.original_path)
    .collect();
  assert_eq!(paths, vec![std::path::PathBuf::from("/p/2.jpg"), "/p/1.jpg".into()]);
  assert_eq!(s.next_sequence(address_id).await.unwrap(), 11);
}

#[tokio::test]
async fn update_sequence_rejects_zero_and_taken() {
  let (s, _, address_id) = store_with_address().await;
  let first = s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  let second = s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap();

  let err = s.update_sequence(first.photo_id, 0).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::InvalidSequence(0))));

  let err = s.update_sequence(first.photo_id, 2).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(
    e,
    survey_core::Error::SequenceTaken { sequence: 2, holder } if *holder == second.photo_id
  )));
}

#[tokio::test]
async fn sequence_ceiling_is_reported_not_fatal() {
  let (s, _, address_id) = store_with_address().await;
  let photo = s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();

  let err = s.update_sequence(photo.photo_id, u32::MAX).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::InvalidSequence(u32::MAX))));

  // The highest legal number leaves no successor to hand out.
  s.update_sequence(photo.photo_id, MAX_SEQUENCE).await.unwrap();
  let err = s.add_photo(NewPhoto::new(address_id, "/p/2.jpg")).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::SequenceExhausted(id) if *id == address_id)));
  let err = s.next_sequence(address_id).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::SequenceExhausted(_))));

  // The connection survived.
  assert_eq!(s.photo_count(address_id).await.unwrap(), 1);
  assert_eq!(s.list_cases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn photo_requires_existing_address() {
  let s = store().await;
  let err = s
    .add_photo(NewPhoto::new(Uuid::new_v4(), "/p/1.jpg"))
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, survey_core::Error::AddressNotFound(_))));
}

// ─── Photos ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn photo_defaults_and_watermark_fallback() {
  let (s, _, address_id) = store_with_address().await;
  let photo = s.add_photo(NewPhoto::new(address_id, "/p/raw.jpg")).await.unwrap();

  let fetched = s.get_photo(photo.photo_id).await.unwrap().unwrap();
  assert_eq!(fetched.watermarked_path, std::path::PathBuf::from("/p/raw.jpg"));
  assert_eq!(fetched.annotation.position, "牆");
  assert_eq!(fetched.annotation.material, "P");
  assert!(!fetched.annotation.peeling);
  assert!(fetched.thumbnail_path.is_none());
}

#[tokio::test]
async fn update_photo_annotation() {
  let (s, _, address_id) = store_with_address().await;
  let photo = s
    .add_photo(NewPhoto::new(address_id, "/p/raw.jpg").watermarked("/p/wm.jpg"))
    .await
    .unwrap();

  let updated = s
    .update_photo(PhotoUpdate {
      photo_id:       photo.photo_id,
      annotation:     Annotation {
        position: "平頂".into(),
        crack_width: "0.3mm".into(),
        seepage: true,
        ..Annotation::default()
      },
      thumbnail_path: Some("/p/thumb.jpg".into()),
    })
    .await
    .unwrap();

  assert_eq!(updated.annotation.position, "平頂");
  assert_eq!(updated.annotation.crack_width, "0.3mm");
  assert!(updated.annotation.seepage);
  assert_eq!(updated.sequence, photo.sequence);
  assert_eq!(updated.watermarked_path, std::path::PathBuf::from("/p/wm.jpg"));
}

// ─── Watches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn watch_photos_yields_snapshots() {
  let (s, case_id, address_id) = store_with_address().await;
  let other = s.add_address(NewAddress::new(case_id, "隔壁")).await.unwrap();

  let mut watch = s.watch_photos(address_id);
  assert!(watch.next().await.unwrap().is_empty());

  // A write to another address must not wake this watch.
  s.add_photo(NewPhoto::new(other.address_id, "/p/x.jpg")).await.unwrap();
  let pending = tokio::time::timeout(Duration::from_millis(50), watch.next()).await;
  assert!(pending.is_err());

  s.add_photo(NewPhoto::new(address_id, "/p/1.jpg")).await.unwrap();
  let snapshot = tokio::time::timeout(Duration::from_secs(1), watch.next())
    .await
    .expect("snapshot after insert")
    .unwrap();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot[0].sequence, 1);
}

#[tokio::test]
async fn watch_coalesces_backlog() {
  let s = store().await;
  let mut watch = s.watch_cases();
  assert!(watch.next().await.unwrap().is_empty());

  s.add_case(NewCase::new("A")).await.unwrap();
  s.add_case(NewCase::new("B")).await.unwrap();
  s.add_case(NewCase::new("C")).await.unwrap();

  let snapshot = watch.next().await.unwrap();
  assert_eq!(snapshot.len(), 3);

  // The backlog was drained, so nothing is pending now.
  let pending = tokio::time::timeout(Duration::from_millis(50), watch.next()).await;
  assert!(pending.is_err());
}

#[tokio::test]
async fn watch_addresses_sees_cascade_delete() {
  let (s, case_id, _) = store_with_address().await;
  let mut watch = s.watch_addresses(case_id);
  assert_eq!(watch.next().await.unwrap().len(), 1);

  s.delete_case(case_id).await.unwrap();
  assert!(watch.next().await.unwrap().is_empty());
}

#[tokio::test]
async fn watch_sees_commits_from_another_connection() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("survey.db");
  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();

  let mut watch = a.watch_cases();
  assert!(watch.next().await.unwrap().is_empty());

  b.add_case(NewCase::new("113-0077")).await.unwrap();
  let snapshot = tokio::time::timeout(Duration::from_secs(2), watch.next())
    .await
    .expect("snapshot after a write from the other handle")
    .unwrap();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot[0].case_number, "113-0077");
}

#[tokio::test]
async fn external_commit_elsewhere_yields_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("survey.db");
  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();

  let case = a.add_case(NewCase::new("113-0078")).await.unwrap();
  let address = a.add_address(NewAddress::new(case.case_id, "台南市")).await.unwrap();
  let mut watch = a.watch_photos(address.address_id);
  assert!(watch.next().await.unwrap().is_empty());

  // Touches the file but not this address's photos.
  b.add_case(NewCase::new("113-0079")).await.unwrap();
  let pending = tokio::time::timeout(POLL_INTERVAL * 4, watch.next()).await;
  assert!(pending.is_err());

  b.add_photo(NewPhoto::new(address.address_id, "/p/1.jpg")).await.unwrap();
  let snapshot = tokio::time::timeout(Duration::from_secs(2), watch.next())
    .await
    .expect("snapshot after a photo from the other handle")
    .unwrap();
  assert_eq!(snapshot.len(), 1);
}
