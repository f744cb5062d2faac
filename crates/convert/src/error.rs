// crates/convert/src/error.rs
use sheetbot_jobs::CapabilityError;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("encrypted PDFs are not supported")]
    Encrypted,

    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u64, page_count: u64 },

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("too many rows for one worksheet: {0}")]
    TooManyRows(usize),
}

impl From<ConvertError> for CapabilityError {
    fn from(e: ConvertError) -> Self {
        CapabilityError::with_source(e.to_string(), e)
    }
}
