//! Tests for captions, fitting, pagination and the file-writing export.

use std::{
  path::{Path, PathBuf},
  sync::atomic::Ordering,
};

use chrono::{Local, TimeZone, Utc};
use image::{Rgb, RgbImage};
use survey_core::{
  address::{Address, BuildingSurvey},
  photo::{Annotation, Photo},
};
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
  Error, ExportOutcome, Exporter, ReportConfig,
  caption::caption,
  export::{MAX_STEM_BYTES, candidate_path, file_stem, report_base, write_new},
  fit::{fit_within, target_pixels},
  layout::{COLUMNS, LayoutConfig, plan, text_width},
  pdf::render,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn address(text: &str) -> Address {
  let now = Utc::now();
  Address {
    address_id: Uuid::new_v4(),
    case_id:    Uuid::new_v4(),
    address:    text.into(),
    survey:     BuildingSurvey::default(),
    created_at: now,
    updated_at: now,
  }
}

fn photo(sequence: u32, watermarked: impl Into<PathBuf>) -> Photo {
  let now = Utc::now();
  let path = watermarked.into();
  Photo {
    photo_id: Uuid::new_v4(),
    address_id: Uuid::new_v4(),
    sequence,
    original_path: path.clone(),
    watermarked_path: path,
    thumbnail_path: None,
    annotation: Annotation::default(),
    created_at: now,
    updated_at: now,
  }
}

fn photos(n: u32) -> Vec<Photo> { (1..=n).map(|i| photo(i, "/nonexistent.jpg")).collect() }

fn scratch_dir() -> TempDir { tempfile::tempdir().unwrap() }

fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
  let path = dir.join(name);
  RgbImage::from_pixel(w, h, Rgb([180, 90, 40])).save(&path).unwrap();
  path
}

fn exporter(output_dir: &Path) -> Exporter {
  Exporter::new(ReportConfig { output_dir: output_dir.to_path_buf(), ..ReportConfig::default() })
    .unwrap()
}

fn fixed_now() -> chrono::DateTime<Local> {
  Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

fn page_count(path: &Path) -> usize { lopdf::Document::load(path).unwrap().get_pages().len() }

// ─── Captions ────────────────────────────────────────────────────────────────

#[test]
fn caption_skips_empty_fields() {
  let mut p = photo(7, "/x.jpg");
  p.annotation = Annotation {
    position: "牆".into(),
    material: "P".into(),
    seepage: true,
    ..Annotation::default()
  };
  assert_eq!(caption(&p), "07 牆 P 滲水");
}

#[test]
fn caption_full_order() {
  let mut p = photo(12, "/x.jpg");
  p.annotation = Annotation {
    position:    "平頂".into(),
    material:    "RC".into(),
    crack_width: "0.5mm".into(),
    crack_shape: "斜向".into(),
    crack_count: "3".into(),
    peeling:     true,
    seepage:     true,
    remark:      "樑下".into(),
  };
  assert_eq!(caption(&p), "12 平頂 RC 裂縫:0.5mm 剝落 滲水 樑下");
}

#[test]
fn caption_ignores_whitespace_only_text() {
  let mut p = photo(3, "/x.jpg");
  p.annotation.crack_width = "  ".into();
  p.annotation.remark = " 門框 ".into();
  assert_eq!(caption(&p), "03 牆 P 門框");
}

#[test]
fn caption_pads_only_to_two_digits() {
  assert!(caption(&photo(123, "/x.jpg")).starts_with("123 "));
}

// ─── Fitting ─────────────────────────────────────────────────────────────────

#[test]
fn fit_large_landscape_fills_height() {
  let fit = fit_within(4000, 3000, 257.5, 150.0);
  assert_eq!(fit.height, 150.0);
  assert!(fit.width <= 257.5);
  assert!((fit.width / fit.height - 4000.0 / 3000.0).abs() < 1e-4);
}

#[test]
fn fit_large_wide_fills_width() {
  let fit = fit_within(6000, 1000, 257.5, 150.0);
  assert_eq!(fit.width, 257.5);
  assert!(fit.height <= 150.0);
}

#[test]
fn fit_small_image_is_not_enlarged() {
  let fit = fit_within(120, 80, 257.5, 150.0);
  assert_eq!((fit.width, fit.height), (120.0, 80.0));
  assert_eq!(fit.scale, 1.0);
}

#[test]
fn target_pixels_never_exceed_source() {
  let fit = fit_within(300, 200, 257.5, 150.0);
  let (w, h) = target_pixels(&fit, 2.0, 300, 200);
  assert!(w <= 300 && h <= 200);
  assert!(w >= 1 && h >= 1);
}

// ─── Layout ──────────────────────────────────────────────────────────────────

fn plan_for(n: u32) -> Option<crate::layout::ReportPlan> {
  let layout = LayoutConfig::default();
  let date = fixed_now().date_naive();
  plan(&layout, "標題", &address("台中市"), date, &photos(n))
}

#[test]
fn empty_photo_list_has_no_plan() {
  assert!(plan_for(0).is_none());
}

#[test]
fn page_capacity_follows_geometry() {
  let layout = LayoutConfig::default();
  let first = layout.rows_from(layout.margin + layout.header_height()) * COLUMNS;
  let continuation = layout.rows_from(layout.margin) * COLUMNS;
  assert_eq!(first, 6);
  assert_eq!(continuation, 8);
}

#[test]
fn page_counts() {
  for (n, pages) in [(1, 1), (2, 1), (3, 1), (6, 1), (7, 2), (10, 2), (14, 2), (15, 3)] {
    let plan = plan_for(n).unwrap();
    assert_eq!(plan.pages.len(), pages, "{n} photos");
  }
}

#[test]
fn cells_follow_input_order() {
  let plan = plan_for(10).unwrap();
  let indices: Vec<_> = plan.cells().map(|c| c.index).collect();
  assert_eq!(indices, (0..10).collect::<Vec<_>>());

  let layout = LayoutConfig::default();
  for pair in plan.pages[0].cells.chunks(2) {
    assert_eq!(pair[0].column, 0);
    assert_eq!(pair[1].column, 1);
    assert_eq!(pair[0].top, pair[1].top);
    assert!(pair[1].x > pair[0].x);
  }
  let tops: Vec<_> = plan.pages[0].cells.iter().step_by(2).map(|c| c.top).collect();
  assert_eq!(tops, vec![140.0, 140.0 + layout.row_pitch(), 140.0 + 2.0 * layout.row_pitch()]);
}

#[test]
fn odd_count_leaves_second_column_empty() {
  let plan = plan_for(3).unwrap();
  let cells = &plan.pages[0].cells;
  assert_eq!(cells.len(), 3);
  assert_eq!(cells[2].column, 0);
  assert!(cells[2].top > cells[0].top);
}

#[test]
fn header_only_on_first_page() {
  let plan = plan_for(10).unwrap();
  let header = plan.pages[0].header.as_ref().unwrap();
  assert_eq!(header.address.text, "地址: 台中市");
  assert_eq!(header.date.text, "日期: 2024/05/01");
  assert!(plan.pages[1].header.is_none());
  assert_eq!(plan.pages[1].cells[0].top, LayoutConfig::default().margin);
}

#[test]
fn title_is_centered() {
  let layout = LayoutConfig::default();
  let plan = plan_for(1).unwrap();
  let title = &plan.pages[0].header.as_ref().unwrap().title;
  let width = text_width(&title.text, title.size);
  assert!((title.x + width / 2.0 - layout.page_width / 2.0).abs() < 1e-3);
}

#[test]
fn cells_stay_inside_printable_area() {
  let layout = LayoutConfig::default();
  let plan = plan_for(15).unwrap();
  for cell in plan.cells() {
    assert!(cell.top + layout.row_pitch() <= layout.bottom_limit());
    assert!(cell.x + cell.width <= layout.page_width - layout.margin + 1e-3);
  }
}

#[test]
fn oversized_rows_are_rejected() {
  let layout = LayoutConfig { cell_height: 900.0, ..LayoutConfig::default() };
  assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));
}

// ─── Rendering ───────────────────────────────────────────────────────────────

#[test]
fn render_rejects_a_short_photo_list() {
  let plan = plan_for(4).unwrap();
  let err = render(&plan, &photos(3), &ReportConfig::default()).unwrap_err();
  assert!(matches!(err, Error::InvalidLayout(_)));
}

// ─── Export ──────────────────────────────────────────────────────────────────

fn written(outcome: ExportOutcome) -> crate::ReportFile {
  match outcome {
    ExportOutcome::Written(report) => report,
    ExportOutcome::NothingToExport => panic!("expected a report"),
  }
}

/// Names of everything in `dir`, sorted.
fn listing(dir: &Path) -> Vec<String> {
  let mut names: Vec<_> = std::fs::read_dir(dir)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}

#[test]
fn empty_export_writes_nothing() {
  let root = scratch_dir();
  let outcome = exporter(root.path()).export_blocking(&address("台中市"), &[]).unwrap();
  assert_eq!(outcome, ExportOutcome::NothingToExport);
  assert!(!root.path().join(crate::config::DEFAULT_FOLDER).exists());
}

#[test]
fn export_with_missing_image_still_writes_every_cell() {
  let root = scratch_dir();
  let images = scratch_dir();
  let list = vec![
    photo(1, write_image(images.path(), "a.png", 640, 480)),
    photo(2, images.path().join("gone.jpg")),
    photo(3, write_image(images.path(), "c.jpg", 300, 900)),
  ];

  let report =
    written(exporter(root.path()).export_at(&address("台中市西區"), &list, fixed_now()).unwrap());

  assert_eq!(report.photos, 3);
  assert_eq!(report.missing_images, 1);
  assert_eq!(report.pages, 1);
  assert_eq!(
    report.path,
    root.path().join("鑑定助手").join("台中市西區_20240501_093000.pdf")
  );
  assert_eq!(page_count(&report.path), 1);
  assert!(!report.path.with_extension("pdf.part").exists());
}

#[test]
fn undecodable_image_is_counted_missing() {
  let root = scratch_dir();
  let images = scratch_dir();
  let garbage = images.path().join("bad.jpg");
  std::fs::write(&garbage, b"\xff\xd8 definitely not a jpeg").unwrap();
  let list = vec![photo(1, write_image(images.path(), "ok.png", 320, 240)), photo(2, garbage)];

  let report =
    written(exporter(root.path()).export_at(&address("基隆"), &list, fixed_now()).unwrap());

  assert_eq!(report.photos, 2);
  assert_eq!(report.missing_images, 1);
  assert_eq!(page_count(&report.path), 1);
}

#[test]
fn ten_photos_span_two_pages() {
  let root = scratch_dir();
  let images = scratch_dir();
  let shared = write_image(images.path(), "wm.png", 800, 600);
  let list: Vec<_> = (1..=10).map(|i| photo(i, shared.clone())).collect();

  let report =
    written(exporter(root.path()).export_at(&address("高雄"), &list, fixed_now()).unwrap());
  assert_eq!(report.pages, 2);
  assert_eq!(report.missing_images, 0);
  assert_eq!(page_count(&report.path), 2);
}

#[test]
fn repeated_exports_never_overwrite() {
  let root = scratch_dir();
  let exporter = exporter(root.path());
  let list = photos(2);
  let addr = address("新竹");

  let a = written(exporter.export_at(&addr, &list, fixed_now()).unwrap());
  let b = written(exporter.export_at(&addr, &list, fixed_now()).unwrap());

  assert_ne!(a.path, b.path);
  assert!(a.path.exists() && b.path.exists());
  assert!(b.path.to_string_lossy().ends_with("_20240501_093000_2.pdf"));
}

#[test]
fn export_skips_names_claimed_elsewhere() {
  let root = scratch_dir();
  let dir = root.path().join(crate::config::DEFAULT_FOLDER);
  std::fs::create_dir_all(&dir).unwrap();
  let base = report_base("桃園", fixed_now());

  // A finished report and another writer's half-written one.
  let first = candidate_path(&dir, &base, 1);
  std::fs::write(&first, b"someone else's report").unwrap();
  let second = candidate_path(&dir, &base, 2);
  let foreign_part = dir.join(format!("{base}_2.pdf.part"));
  std::fs::write(&foreign_part, b"in progress").unwrap();

  let report =
    written(exporter(root.path()).export_at(&address("桃園"), &photos(1), fixed_now()).unwrap());

  assert_eq!(report.path, candidate_path(&dir, &base, 3));
  assert_eq!(std::fs::read(&first).unwrap(), b"someone else's report");
  assert!(!second.exists());
  assert_eq!(std::fs::read(&foreign_part).unwrap(), b"in progress");
  assert_eq!(page_count(&report.path), 1);
}

#[test]
fn write_new_leaves_an_occupied_target_alone() {
  let dir = scratch_dir();
  let target = dir.path().join("r.pdf");
  std::fs::write(&target, b"old").unwrap();

  let err = write_new(&target, b"new").unwrap_err();
  assert!(matches!(
    err,
    Error::Io { ref source, .. } if source.kind() == std::io::ErrorKind::AlreadyExists
  ));
  assert_eq!(std::fs::read(&target).unwrap(), b"old");
  assert_eq!(listing(dir.path()), vec!["r.pdf"]);
}

#[test]
fn failed_part_file_leaves_no_files() {
  let dir = scratch_dir();
  // The target's parent does not exist, so creating the part file fails.
  let target = dir.path().join("missing").join("r.pdf");
  assert!(matches!(write_new(&target, b"pdf").unwrap_err(), Error::Io { .. }));
  assert!(listing(dir.path()).is_empty());
}

#[cfg(unix)]
#[test]
fn failed_link_removes_the_part_file() {
  let dir = scratch_dir();
  // A dangling symlink passes the up-front check but makes the final link
  // fail, the same as a name claimed between check and link.
  let target = dir.path().join("r.pdf");
  std::os::unix::fs::symlink(dir.path().join("nowhere"), &target).unwrap();

  let err = write_new(&target, b"pdf").unwrap_err();
  assert!(matches!(err, Error::Io { .. }));
  assert_eq!(listing(dir.path()), vec!["r.pdf"]);
  assert!(std::fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
}

#[test]
fn concurrent_export_is_refused() {
  let root = scratch_dir();
  let exporter = exporter(root.path());
  exporter.in_flight.store(true, Ordering::SeqCst);

  let err = exporter.export_blocking(&address("x"), &photos(1)).unwrap_err();
  assert!(matches!(err, Error::ExportInProgress));

  exporter.in_flight.store(false, Ordering::SeqCst);
  assert!(exporter.export_blocking(&address("x"), &photos(1)).is_ok());
  assert!(!exporter.is_busy());
}

#[test]
fn failed_export_releases_the_guard() {
  let root = scratch_dir();
  // A file where the report folder should be makes directory creation fail.
  std::fs::write(root.path().join(crate::config::DEFAULT_FOLDER), b"").unwrap();
  let exporter = exporter(root.path());

  let err = exporter.export_blocking(&address("x"), &photos(1)).unwrap_err();
  assert!(matches!(err, Error::Io { .. }));
  assert!(!exporter.is_busy());
}

#[tokio::test]
async fn async_export_runs_off_thread() {
  let root = scratch_dir();
  let exporter = std::sync::Arc::new(exporter(root.path()));
  let outcome = exporter.clone().export(address("花蓮"), photos(3)).await.unwrap();
  assert!(matches!(outcome, ExportOutcome::Written(ref r) if r.pages == 1 && r.photos == 3));
}

#[test]
fn file_names_are_sanitised() {
  assert_eq!(file_stem("台北市/中正區:1號"), "台北市_中正區_1號");
  assert_eq!(file_stem("   "), "report");

  let dir = scratch_dir();
  let path = candidate_path(dir.path(), &report_base("a/b", fixed_now()), 1);
  assert_eq!(path.file_name().unwrap(), "a_b_20240501_093000.pdf");
}

#[test]
fn long_addresses_are_cut_on_a_char_boundary() {
  // 3-byte characters never line up with the byte limit.
  let long = "臺".repeat(200) + "1號";
  let stem = file_stem(&long);
  assert!(stem.len() <= MAX_STEM_BYTES);
  assert!(stem.len() > MAX_STEM_BYTES - 3);
  assert!(stem.chars().all(|c| c == '臺'));

  let root = scratch_dir();
  let report =
    written(exporter(root.path()).export_at(&address(&long), &photos(1), fixed_now()).unwrap());
  assert!(report.path.file_name().unwrap().len() < 255);
  assert_eq!(page_count(&report.path), 1);
}
