//! Page layout for the photo report.
//!
//! All coordinates are in PDF points measured from the top-left corner of
//! the page; the renderer flips them to PDF's bottom-up space. Text
//! positions are baselines.

use chrono::NaiveDate;
use serde::Deserialize;
use survey_core::{address::Address, photo::Photo};

use crate::{Error, Result, caption::caption};

/// Photos per row.
pub const COLUMNS: usize = 2;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Fixed page geometry and type sizes. The defaults describe an A4 page at
/// 72 dpi.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
  pub page_width:      f32,
  pub page_height:     f32,
  pub margin:          f32,
  /// Height of the image box in each cell.
  pub cell_height:     f32,
  /// Room left under the image box for the caption.
  pub caption_space:   f32,
  /// Distance from the bottom of the image box to the caption baseline.
  pub caption_offset:  f32,
  pub title_size:      f32,
  /// Vertical room taken by the title line.
  pub title_block:     f32,
  pub header_size:     f32,
  /// Advance after the address line.
  pub address_advance: f32,
  /// Advance after the date line, before the first row.
  pub date_advance:    f32,
  pub caption_size:    f32,
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      page_width:      595.0,
      page_height:     842.0,
      margin:          40.0,
      cell_height:     150.0,
      caption_space:   30.0,
      caption_offset:  15.0,
      title_size:      24.0,
      title_block:     50.0,
      header_size:     14.0,
      address_advance: 20.0,
      date_advance:    30.0,
      caption_size:    10.0,
    }
  }
}

impl LayoutConfig {
  /// Width of one grid column: the page minus three margins (left, gutter,
  /// right), split in two.
  pub fn column_width(&self) -> f32 {
    (self.page_width - self.margin * (COLUMNS as f32 + 1.0)) / COLUMNS as f32
  }

  /// Vertical distance between the tops of two consecutive rows.
  pub fn row_pitch(&self) -> f32 { self.cell_height + self.caption_space }

  /// Lowest y a row may reach.
  pub fn bottom_limit(&self) -> f32 { self.page_height - self.margin }

  /// Height of the first-page header, from the top margin to the first row.
  pub fn header_height(&self) -> f32 {
    self.title_block + self.address_advance + self.date_advance
  }

  /// A row must fit on a fresh continuation page, or pagination would
  /// never make progress.
  pub fn validate(&self) -> Result<()> {
    if self.column_width() <= 0.0 {
      return Err(Error::InvalidLayout(format!(
        "page width {} leaves no room for {COLUMNS} columns with margin {}",
        self.page_width, self.margin
      )));
    }
    if self.margin + self.row_pitch() > self.bottom_limit() {
      return Err(Error::InvalidLayout(format!(
        "a {}pt row does not fit on a {}pt page",
        self.row_pitch(),
        self.page_height
      )));
    }
    Ok(())
  }

  /// Rows that fit on a page whose first row starts at `top`.
  pub fn rows_from(&self, top: f32) -> usize {
    let mut rows = 0;
    let mut y = top;
    while y + self.row_pitch() <= self.bottom_limit() {
      rows += 1;
      y += self.row_pitch();
    }
    rows
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A line of text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
  pub text:     String,
  pub x:        f32,
  pub baseline: f32,
  pub size:     f32,
}

/// The first-page header block.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
  /// Centered, set in the bold face.
  pub title:   TextLine,
  pub address: TextLine,
  pub date:    TextLine,
}

/// One grid cell: an image box plus the caption under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
  /// Position of the photo in the input list.
  pub index:   usize,
  pub column:  usize,
  pub x:       f32,
  pub top:     f32,
  pub width:   f32,
  pub height:  f32,
  pub caption: TextLine,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PagePlan {
  pub header: Option<Header>,
  pub cells:  Vec<Cell>,
}

/// Every page of a report, decided before anything is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
  pub page_width:  f32,
  pub page_height: f32,
  pub pages:       Vec<PagePlan>,
}

impl ReportPlan {
  pub fn cells(&self) -> impl Iterator<Item = &Cell> { self.pages.iter().flat_map(|p| &p.cells) }
}

/// Estimated advance width of `text` at `size`: half an em for ASCII, a
/// full em for everything else. This matches the glyph widths the renderer
/// declares for its CJK fonts.
pub fn text_width(text: &str, size: f32) -> f32 {
  let ems: f32 = text.chars().map(|c| if c.is_ascii() { 0.5 } else { 1.0 }).sum();
  ems * size
}

/// Lay out a report for `address` dated `date`.
///
/// Returns `None` when there are no photos: an empty report is never
/// produced.
pub fn plan(
  layout: &LayoutConfig,
  title: &str,
  address: &Address,
  date: NaiveDate,
  photos: &[Photo],
) -> Option<ReportPlan> {
  if photos.is_empty() {
    return None;
  }

  let header = build_header(layout, title, &address.address, date);
  let column_width = layout.column_width();

  let mut pages = Vec::new();
  let mut page = PagePlan { header: Some(header), cells: Vec::new() };
  let mut y = layout.margin + layout.header_height();
  let mut column = 0;

  for (index, photo) in photos.iter().enumerate() {
    if y + layout.row_pitch() > layout.bottom_limit() {
      tracing::debug!(page = pages.len() + 1, index, "page break");
      pages.push(std::mem::take(&mut page));
      y = layout.margin;
    }

    let x = layout.margin + column as f32 * (column_width + layout.margin);
    page.cells.push(Cell {
      index,
      column,
      x,
      top: y,
      width: column_width,
      height: layout.cell_height,
      caption: TextLine {
        text:     caption(photo),
        x,
        baseline: y + layout.cell_height + layout.caption_offset,
        size:     layout.caption_size,
      },
    });

    column += 1;
    if column == COLUMNS {
      column = 0;
      y += layout.row_pitch();
    }
  }
  pages.push(page);

  Some(ReportPlan { page_width: layout.page_width, page_height: layout.page_height, pages })
}

fn build_header(layout: &LayoutConfig, title: &str, address: &str, date: NaiveDate) -> Header {
  let title_width = text_width(title, layout.title_size);
  let title_x = ((layout.page_width - title_width) / 2.0).max(layout.margin);
  let title_baseline = layout.margin + layout.title_size;

  let address_baseline = layout.margin + layout.title_block;
  let date_baseline = address_baseline + layout.address_advance;

  Header {
    title:   TextLine {
      text:     title.to_owned(),
      x:        title_x,
      baseline: title_baseline,
      size:     layout.title_size,
    },
    address: TextLine {
      text:     format!("地址: {address}"),
      x:        layout.margin,
      baseline: address_baseline,
      size:     layout.header_size,
    },
    date:    TextLine {
      text:     format!("日期: {}", date.format("%Y/%m/%d")),
      x:        layout.margin,
      baseline: date_baseline,
      size:     layout.header_size,
    },
  }
}
