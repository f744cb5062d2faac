// crates/jobs/src/messages.rs
//! User-facing notification texts.

pub const GREETING: &str = "Send me a PDF and I’ll convert it to Excel 📊🔥";
pub const NOT_A_PDF: &str = "Please upload a PDF file 😄";
pub const ALREADY_RUNNING: &str =
    "⏳ A conversion is already running for this chat. Send /stop to cancel it.";
pub const STOP_REQUESTED: &str = "🛑 Stopping your conversion…";
pub const NOTHING_TO_STOP: &str = "There is no conversion running right now.";
pub const TOO_LARGE: &str = "⚠️ This PDF is larger than 20 MB, which is the most I can download.";

pub const STARTED: &str = "Processing your file… 0% done ⏳";
pub const EMPTY_SOURCE: &str = "⚠️ PDF seems to be empty.";
pub const NO_ROWS: &str = "⚠️ Could not extract any table from this PDF!";
pub const COMPLETE: &str = "Conversion complete ✅ Sending your Excel file...";
pub const ARTIFACT_CAPTION: &str = "Here is your converted Excel file 😊";
pub const FAILED: &str =
    "❌ Sorry, something went wrong while converting your file. Please try again.";

/// Periodic status line.
pub fn progress(percent: u64, done: u64, total: u64) -> String {
    format!("Processing your file… {percent}% done ({done}/{total} pages) ⏳")
}

/// Terminal notice for a stopped job.
pub fn cancelled(at_unit: u64, total: u64) -> String {
    format!("🛑 Conversion cancelled at page {at_unit} of {total}. Nothing was sent.")
}

/// Completion notice, mentioning truncation when the source was clamped.
pub fn complete(processed: u64, total: u64) -> String {
    if processed < total {
        format!("{COMPLETE}\n⚠️ Only the first {processed} of {total} pages were converted.")
    } else {
        COMPLETE.to_string()
    }
}
