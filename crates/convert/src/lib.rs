// crates/convert/src/lib.rs
//! Document adapters for conversion jobs.
//!
//! - `LopdfExtractor` turns PDF pages into rows of text cells
//! - `XlsxWriter` writes rows into a single-sheet workbook

pub mod error;
pub mod pdf;
pub mod xlsx;

pub use error::ConvertError;
pub use pdf::{split_cells, LopdfExtractor, PdfDocument};
pub use xlsx::XlsxWriter;
