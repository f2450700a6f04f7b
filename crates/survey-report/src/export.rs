//! Write a report for one address to disk.

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{DateTime, Local};
use serde::Serialize;
use survey_core::{address::Address, photo::Photo};

use crate::{Error, Result, config::ReportConfig, layout, pdf};

/// Characters that cannot appear in a file name on common filesystems.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest address part of a file name, in bytes. Leaves room for the
/// timestamp, a collision suffix and `.pdf.part` under the usual 255-byte
/// name limit.
pub const MAX_STEM_BYTES: usize = 180;

/// Collision suffixes tried before giving up.
const MAX_ATTEMPTS: u32 = 1000;

/// Result of a finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFile {
  pub path:           PathBuf,
  pub pages:          usize,
  pub photos:         usize,
  /// Photos printed caption-only because their image was unreadable.
  pub missing_images: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
  Written(ReportFile),
  /// The photo list was empty; no file was created.
  NothingToExport,
}

/// Produces photo reports, one at a time.
///
/// A second export started while one is still running is refused with
/// [`Error::ExportInProgress`] rather than queued.
#[derive(Debug)]
pub struct Exporter {
  config:               ReportConfig,
  pub(crate) in_flight: AtomicBool,
}

/// Holds the in-flight flag for the duration of one export.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
  fn acquire(flag: &'a AtomicBool) -> Result<Self> {
    flag
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .map_err(|_| Error::ExportInProgress)?;
    Ok(Self(flag))
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

impl Exporter {
  pub fn new(config: ReportConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config, in_flight: AtomicBool::new(false) })
  }

  pub fn config(&self) -> &ReportConfig { &self.config }

  /// Whether an export is currently running on this exporter.
  pub fn is_busy(&self) -> bool { self.in_flight.load(Ordering::Acquire) }

  /// Export on a blocking worker thread so an async caller stays responsive.
  pub async fn export(self: Arc<Self>, address: Address, photos: Vec<Photo>) -> Result<ExportOutcome> {
    tokio::task::spawn_blocking(move || self.export_blocking(&address, &photos)).await?
  }

  /// Export synchronously, dated with the current local time.
  pub fn export_blocking(&self, address: &Address, photos: &[Photo]) -> Result<ExportOutcome> {
    self.export_at(address, photos, Local::now())
  }

  /// Export as if the clock read `now`. `now` dates the header and names
  /// the file.
  pub fn export_at(
    &self,
    address: &Address,
    photos: &[Photo],
    now: DateTime<Local>,
  ) -> Result<ExportOutcome> {
    let _guard = InFlight::acquire(&self.in_flight)?;

    let Some(plan) =
      layout::plan(&self.config.layout, &self.config.title, address, now.date_naive(), photos)
    else {
      tracing::info!(address_id = %address.address_id, "nothing to export");
      return Ok(ExportOutcome::NothingToExport);
    };

    tracing::info!(
      address_id = %address.address_id,
      photos = photos.len(),
      pages = plan.pages.len(),
      "exporting report"
    );

    let (mut document, stats) = pdf::render(&plan, photos, &self.config)?;
    let mut bytes = Vec::new();
    document
      .save_to(&mut bytes)
      .map_err(|e| Error::Encode(e.to_string()))?;
    drop(document);

    let dir = self.config.report_dir();
    fs::create_dir_all(&dir).map_err(Error::io(&dir))?;
    let path = write_report(&dir, &report_base(&address.address, now), &bytes)?;

    tracing::info!(
      path = %path.display(),
      pages = stats.pages,
      missing_images = stats.missing_images,
      "report written"
    );

    Ok(ExportOutcome::Written(ReportFile {
      path,
      pages: stats.pages,
      photos: stats.cells,
      missing_images: stats.missing_images,
    }))
  }
}

/// Make `address` usable as a file name stem, at most [`MAX_STEM_BYTES`]
/// long.
pub fn file_stem(address: &str) -> String {
  let mut stem = String::new();
  for c in address.trim().chars() {
    let c = if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c };
    if stem.len() + c.len_utf8() > MAX_STEM_BYTES {
      break;
    }
    stem.push(c);
  }
  if stem.is_empty() { "report".to_owned() } else { stem }
}

/// `<address>_<yyyyMMdd_HHmmss>`, the name shared by every candidate file of
/// one export.
pub fn report_base(address: &str, now: DateTime<Local>) -> String {
  format!("{}_{}", file_stem(address), now.format("%Y%m%d_%H%M%S"))
}

/// The `attempt`-th file name for `base`: `base.pdf`, then `base_2.pdf`,
/// `base_3.pdf`, and so on.
pub fn candidate_path(dir: &Path, base: &str, attempt: u32) -> PathBuf {
  match attempt {
    0 | 1 => dir.join(format!("{base}.pdf")),
    n => dir.join(format!("{base}_{n}.pdf")),
  }
}

fn part_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().unwrap_or_default().to_os_string();
  name.push(".part");
  path.with_file_name(name)
}

/// Write `bytes` under the first free candidate name in `dir`.
///
/// A name claimed by anyone else, including an export running in another
/// process, is skipped rather than overwritten.
fn write_report(dir: &Path, base: &str, bytes: &[u8]) -> Result<PathBuf> {
  let mut attempt = 1;
  loop {
    let path = candidate_path(dir, base, attempt);
    match write_new(&path, bytes) {
      Ok(()) => return Ok(path),
      Err(Error::Io { source, .. })
        if source.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_ATTEMPTS =>
      {
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

/// Write `bytes` to a fresh sibling `.part` file, sync it, then link it to
/// `path` without replacing anything already there.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] if either name is taken. On
/// every other failure the part file is removed, so `path` only ever holds a
/// complete report.
pub(crate) fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
  let part = part_path(path);
  if path.exists() {
    return Err(Error::Io { path: path.to_path_buf(), source: io::ErrorKind::AlreadyExists.into() });
  }
  let mut file = fs::File::create_new(&part).map_err(Error::io(&part))?;

  let result = (|| -> Result<()> {
    file.write_all(bytes).map_err(Error::io(&part))?;
    file.sync_all().map_err(Error::io(&part))?;
    fs::hard_link(&part, path).map_err(Error::io(path))
  })();
  drop(file);

  let _ = fs::remove_file(&part);
  result
}
