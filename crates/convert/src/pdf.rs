// crates/convert/src/pdf.rs
//! PDF page extraction on top of `lopdf`.
//!
//! There is no table detection: each non-blank text line on a page becomes one
//! row, so headings and footers land in the sheet next to the table body, and
//! a job reports "no rows" only when the text layer is empty.
//!
//! Cells are separated by tabs or by runs of two or more spaces, which is how
//! column gaps in tabular statements come out of the text layer. Every tab is
//! a column boundary, so consecutive tabs keep an empty cell and later columns
//! stay aligned. A space gap is one boundary however wide it is.

use std::path::Path;
use std::sync::Arc;

use lopdf::Document;
use sheetbot_jobs::{CapabilityError, ExtractionSource, Extractor, Row};

use crate::error::ConvertError;

/// Opens PDFs from the job workspace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn load(path: &Path) -> Result<PdfDocument, ConvertError> {
        let doc = Document::load(path)?;
        if doc.is_encrypted() {
            return Err(ConvertError::Encrypted);
        }
        let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();
        tracing::debug!(path = %path.display(), pages = page_numbers.len(), "Loaded PDF");
        Ok(PdfDocument { doc, page_numbers })
    }
}

impl Extractor for LopdfExtractor {
    fn open(&self, path: &Path) -> Result<Arc<dyn ExtractionSource>, CapabilityError> {
        let document = Self::load(path)?;
        Ok(Arc::new(document))
    }
}

/// A loaded document, shared read-only across page extractions.
pub struct PdfDocument {
    doc: Document,
    /// Page numbers in document order; index 0 is the first page.
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    pub fn page_count(&self) -> u64 {
        self.page_numbers.len() as u64
    }

    /// Rows for the 1-based page `index`.
    pub fn page_rows(&self, index: u64) -> Result<Vec<Row>, ConvertError> {
        let page_count = self.page_count();
        let page = index
            .checked_sub(1)
            .and_then(|i| self.page_numbers.get(i as usize))
            .copied()
            .ok_or(ConvertError::PageOutOfRange { page: index, page_count })?;
        let text = self.doc.extract_text(&[page])?;
        Ok(text_to_rows(&text))
    }
}

impl ExtractionSource for PdfDocument {
    fn unit_count(&self) -> u64 {
        self.page_count()
    }

    fn extract_unit(&self, index: u64) -> Result<Vec<Row>, CapabilityError> {
        Ok(self.page_rows(index)?)
    }
}

/// Split page text into rows, dropping blank lines.
pub fn text_to_rows(text: &str) -> Vec<Row> {
    text.lines()
        .map(split_cells)
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Split one line into trimmed cells on tabs or runs of 2+ spaces.
///
/// A single space stays inside the cell (`"Opening balance"` is one cell).
/// Empty cells between tabs are kept; trailing empty cells are not.
pub fn split_cells(line: &str) -> Row {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    for ch in line.chars() {
        match ch {
            '\t' => {
                push_cell(&mut cells, &mut current);
                spaces = 0;
            }
            ' ' => spaces += 1,
            _ => {
                if spaces >= 2 && !current.is_empty() {
                    push_cell(&mut cells, &mut current);
                } else if spaces == 1 && !current.is_empty() {
                    current.push(' ');
                }
                spaces = 0;
                current.push(ch);
            }
        }
    }
    push_cell(&mut cells, &mut current);
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

fn push_cell(cells: &mut Row, current: &mut String) {
    cells.push(current.trim().to_string());
    current.clear();
}
