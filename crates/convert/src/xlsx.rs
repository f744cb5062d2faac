// crates/convert/src/xlsx.rs
//! Workbook output via `rust_xlsxwriter`.

use std::path::Path;

use rust_xlsxwriter::Workbook;
use sheetbot_jobs::{CapabilityError, Row, Writer};

use crate::error::ConvertError;

/// Row limit of one worksheet, including the header row.
const MAX_SHEET_ROWS: usize = 1_048_576;

/// Writes rows to the first worksheet of a new workbook.
///
/// Row 0 is a numeric header `0..width` where `width` is the widest row.
/// Shorter rows leave their trailing cells empty, as do empty cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxWriter;

impl XlsxWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_rows(rows: &[Row], dest: &Path) -> Result<(), ConvertError> {
        if rows.len() + 1 > MAX_SHEET_ROWS {
            return Err(ConvertError::TooManyRows(rows.len()));
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for col in 0..width {
            sheet.write_number(0, column(col)?, col as f64)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let c = column(c)?;
                match numeric_value(cell) {
                    Some(n) => sheet.write_number(r, c, n)?,
                    None => sheet.write_string(r, c, cell)?,
                };
            }
        }
        workbook.save(dest)?;
        tracing::debug!(rows = rows.len(), width, dest = %dest.display(), "Workbook saved");
        Ok(())
    }
}

impl Writer for XlsxWriter {
    fn write(&self, rows: &[Row], dest: &Path) -> Result<(), CapabilityError> {
        Ok(Self::write_rows(rows, dest)?)
    }
}

fn column(index: usize) -> Result<u16, ConvertError> {
    u16::try_from(index).map_err(|_| ConvertError::Workbook(rust_xlsxwriter::XlsxError::RowColumnLimitError))
}

/// Longest digit run an `f64` cell holds without rounding.
const MAX_SIGNIFICANT_DIGITS: usize = 15;

/// Plain decimal numbers, optionally with `1,234,567` thousands separators.
///
/// Leading zeros (account numbers, dates like `01`), commas outside groups of
/// three (`12,50`) and digit runs an `f64` would round all stay text.
pub fn numeric_value(cell: &str) -> Option<f64> {
    let s = cell.trim();
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    if !valid_integer_part(int_part) {
        return None;
    }
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let digits: String = int_part
        .chars()
        .chain(frac.unwrap_or("").chars())
        .filter(char::is_ascii_digit)
        .collect();
    if digits.trim_start_matches('0').len() > MAX_SIGNIFICANT_DIGITS {
        return None;
    }

    let plain: String = s.chars().filter(|&c| c != ',').collect();
    plain.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `0`, `123`, `12,345`; never a leading zero or a short comma group.
fn valid_integer_part(int_part: &str) -> bool {
    let mut groups = int_part.split(',');
    let Some(head) = groups.next() else {
        return false;
    };
    let all_digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(head) || (head.len() > 1 && head.starts_with('0')) {
        return false;
    }
    if !int_part.contains(',') {
        return true;
    }
    head.len() <= 3 && head != "0" && groups.all(|g| g.len() == 3 && all_digits(g))
}
