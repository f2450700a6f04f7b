//! Photo report engine.
//!
//! Turns one address and its ordered photos into a paginated PDF: a title
//! and address/date header on the first page, then a two-column grid of
//! fitted images with one caption line per photo.
//!
//! The work is split in two stages. [`layout::plan`] is pure and decides
//! every page, cell position and caption up front; [`pdf::render`] then
//! draws that plan with `lopdf`, decoding each image only while its own cell
//! is being written.

pub mod caption;
pub mod config;
pub mod error;
pub mod export;
pub mod fit;
pub mod layout;
pub mod pdf;

pub use config::ReportConfig;
pub use error::{Error, Result};
pub use export::{ExportOutcome, Exporter, ReportFile};

#[cfg(test)]
mod tests;
