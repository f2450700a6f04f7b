//! Draw a [`ReportPlan`] into a `lopdf` document.
//!
//! Text uses the Adobe-CNS1 CID fonts every conforming viewer ships
//! (`MSung-Light`, `MHei-Medium`) through the `UniCNS-UCS2-H` CMap, so
//! Traditional Chinese captions render without embedding a font file.
//! Photos are resampled to their printed size and embedded as JPEG.

use std::{io::Cursor, path::Path};

use image::{ImageError, codecs::jpeg::JpegEncoder, imageops::FilterType};
use lopdf::{
  Dictionary, Document, Object, ObjectId, Stream, StringFormat,
  content::{Content, Operation},
  dictionary,
};
use survey_core::photo::Photo;

use crate::{
  Error, Result,
  config::ReportConfig,
  fit::{Fit, fit_within, target_pixels},
  layout::{Cell, ReportPlan, TextLine},
};

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// What happened while drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
  pub pages:          usize,
  pub cells:          usize,
  /// Cells drawn caption-only because their image could not be read.
  pub missing_images: usize,
}

/// Render `plan` into a new document. `photos` must be the list the plan was
/// built from; a cell pointing past its end is an [`Error::InvalidLayout`].
pub fn render(
  plan: &ReportPlan,
  photos: &[Photo],
  config: &ReportConfig,
) -> Result<(Document, RenderStats)> {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let fonts_id = register_fonts(&mut doc);

  let mut stats = RenderStats::default();
  let mut kids: Vec<Object> = Vec::with_capacity(plan.pages.len());

  for page in &plan.pages {
    let mut ops = Vec::new();
    let mut xobjects = Dictionary::new();

    if let Some(header) = &page.header {
      ops.extend(text_ops(BOLD_FONT, &header.title, plan.page_height));
      ops.extend(text_ops(REGULAR_FONT, &header.address, plan.page_height));
      ops.extend(text_ops(REGULAR_FONT, &header.date, plan.page_height));
    }

    for cell in &page.cells {
      let Some(photo) = photos.get(cell.index) else {
        return Err(Error::InvalidLayout(format!(
          "cell {} has no photo, only {} were given",
          cell.index,
          photos.len()
        )));
      };
      match embed_photo(&mut doc, &photo.watermarked_path, cell, config) {
        Ok((image_id, fit)) => {
          let name = format!("Im{}", cell.index);
          ops.extend(image_ops(&name, cell, &fit, plan.page_height));
          xobjects.set(name, image_id);
        }
        Err(e) => {
          tracing::warn!(
            photo_id = %photo.photo_id,
            sequence = photo.sequence,
            path = %photo.watermarked_path.display(),
            error = %e,
            "skipping unreadable image"
          );
          stats.missing_images += 1;
        }
      }
      ops.extend(text_ops(REGULAR_FONT, &cell.caption, plan.page_height));
      stats.cells += 1;
    }

    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "MediaBox" => vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(plan.page_width),
        Object::Real(plan.page_height),
      ],
      "Contents" => content_id,
      "Resources" => dictionary! {
        "Font" => fonts_id,
        "XObject" => xobjects,
      },
    });
    kids.push(page_id.into());
    stats.pages += 1;
  }

  let count = kids.len() as i64;
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
    }),
  );

  let catalog_id = doc.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  doc.trailer.set("Root", catalog_id);
  doc.compress();

  Ok((doc, stats))
}

// ─── Fonts ───────────────────────────────────────────────────────────────────

/// Add both faces and return the id of the shared font resource dictionary.
fn register_fonts(doc: &mut Document) -> ObjectId {
  let regular = add_cid_font(doc, "MSung-Light", 6);
  let bold = add_cid_font(doc, "MHei-Medium", 4);
  doc.add_object(dictionary! {
    REGULAR_FONT => regular,
    BOLD_FONT => bold,
  })
}

fn add_cid_font(doc: &mut Document, base: &str, flags: i64) -> ObjectId {
  let descriptor = doc.add_object(dictionary! {
    "Type" => "FontDescriptor",
    "FontName" => base,
    "Flags" => flags,
    "FontBBox" => vec![
      Object::Integer(-160),
      Object::Integer(-250),
      Object::Integer(1000),
      Object::Integer(1000),
    ],
    "ItalicAngle" => 0,
    "Ascent" => 880,
    "Descent" => -120,
    "CapHeight" => 880,
    "StemV" => 93,
  });

  // Half-width ASCII (CIDs 1–95), full-width for everything else.
  let descendant = doc.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "CIDFontType0",
    "BaseFont" => base,
    "CIDSystemInfo" => dictionary! {
      "Registry" => Object::string_literal("Adobe"),
      "Ordering" => Object::string_literal("CNS1"),
      "Supplement" => 0,
    },
    "FontDescriptor" => descriptor,
    "DW" => 1000,
    "W" => vec![Object::Integer(1), Object::Integer(95), Object::Integer(500)],
  });

  doc.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "Type0",
    "BaseFont" => Object::Name(format!("{base}-UniCNS-UCS2-H").into_bytes()),
    "Encoding" => "UniCNS-UCS2-H",
    "DescendantFonts" => vec![Object::Reference(descendant)],
  })
}

/// UCS-2 big-endian code units. Characters outside the BMP have no UCS-2
/// form and print as `?`.
fn encode_ucs2(text: &str) -> Vec<u8> {
  text
    .chars()
    .flat_map(|c| u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?')).to_be_bytes())
    .collect()
}

// ─── Operators ───────────────────────────────────────────────────────────────

fn text_ops(font: &str, line: &TextLine, page_height: f32) -> Vec<Operation> {
  vec![
    Operation::new("BT", vec![]),
    Operation::new("Tf", vec![font.into(), Object::Real(line.size)]),
    Operation::new(
      "Td",
      vec![Object::Real(line.x), Object::Real(page_height - line.baseline)],
    ),
    Operation::new(
      "Tj",
      vec![Object::String(encode_ucs2(&line.text), StringFormat::Hexadecimal)],
    ),
    Operation::new("ET", vec![]),
  ]
}

/// Draw an image XObject with its top-left corner on the cell's top-left.
fn image_ops(name: &str, cell: &Cell, fit: &Fit, page_height: f32) -> Vec<Operation> {
  let bottom = page_height - (cell.top + fit.height);
  vec![
    Operation::new("q", vec![]),
    Operation::new(
      "cm",
      vec![
        Object::Real(fit.width),
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(fit.height),
        Object::Real(cell.x),
        Object::Real(bottom),
      ],
    ),
    Operation::new("Do", vec![name.into()]),
    Operation::new("Q", vec![]),
  ]
}

// ─── Images ──────────────────────────────────────────────────────────────────

/// Decode, fit, resample and embed one photo.
///
/// The decoded and resampled buffers live only inside this call, so memory
/// is released cell by cell whether embedding succeeds or not.
fn embed_photo(
  doc: &mut Document,
  path: &Path,
  cell: &Cell,
  config: &ReportConfig,
) -> Result<(ObjectId, Fit), ImageError> {
  let source = image::open(path)?;
  let fit = fit_within(source.width(), source.height(), cell.width, cell.height);
  let (px_w, px_h) = target_pixels(&fit, config.image_scale, source.width(), source.height());
  let rgb = source.resize_exact(px_w, px_h, FilterType::Triangle).to_rgb8();
  drop(source);

  let mut bytes = Cursor::new(Vec::new());
  rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, config.jpeg_quality))?;
  drop(rgb);

  let stream = Stream::new(
    dictionary! {
      "Type" => "XObject",
      "Subtype" => "Image",
      "Width" => i64::from(px_w),
      "Height" => i64::from(px_h),
      "ColorSpace" => "DeviceRGB",
      "BitsPerComponent" => 8,
      "Filter" => "DCTDecode",
    },
    bytes.into_inner(),
  )
  .with_compression(false);

  Ok((doc.add_object(stream), fit))
}
