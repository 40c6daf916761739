//! Error types for the edgequake-pdfpages library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfPagesError`]: **Fatal**: the operation cannot produce output
//!   (unreadable file, not a PDF, both assembly paths exhausted). Returned as
//!   `Err(PdfPagesError)` from every public entry point.
//!
//! * [`StructuralError`]: **Non-fatal**: the lossless page-copy path refused
//!   a document (typically because it is encrypted). The extractor and merger
//!   log it and fall back to rasterised reconstruction; callers only ever see
//!   it embedded in the reason of an exhausted-fallback error.
//!
//! Messages identify files by display name only. Full paths and library
//! debug dumps are kept out of the `Display` output.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfpages library.
#[derive(Debug, Error)]
pub enum PdfPagesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found.
    #[error("PDF file not found: '{name}'\nCheck the path exists and is readable.")]
    FileNotFound { name: String },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{name}'")]
    PermissionDenied { name: String },

    /// Any other I/O failure while reading the file into memory.
    #[error("Failed to read '{name}': {reason}")]
    ReadFailed { name: String, reason: String },

    /// The file was read, but its leading bytes are not `%PDF`.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' could not be opened: {detail}")]
    ParseFailed { name: String, detail: String },

    /// PDF requires a user password to open but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// A page number outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rasterising a page failed.
    #[error("Rendering page {page} failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Operation errors ──────────────────────────────────────────────────
    /// Extraction was requested with no pages selected.
    #[error("No pages selected for extraction")]
    EmptySelection,

    /// Both extraction paths were exhausted, or the fallback was needed but
    /// no renderer handle was supplied.
    #[error("Page extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    /// One merge item failed both the structural and the rasterised path.
    /// No partial output is produced.
    #[error("Merging failed at '{item}': {reason}")]
    MergeFailed { item: String, reason: String },

    /// Merge was requested with an empty item list.
    #[error("Nothing to merge: the file list is empty")]
    NothingToMerge,

    /// The caller raised the cancel flag between two pages.
    #[error("Operation cancelled after {completed} of {total} pages")]
    Cancelled { completed: usize, total: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place the pdfium library next to the executable or in the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why the lossless structural path refused a document.
///
/// Never returned from public entry points; it is the trigger for the
/// rasterised fallback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    /// The document is encrypted; its objects cannot be copied as-is.
    #[error("document is encrypted")]
    Encrypted,

    /// The document could not be parsed or an object could not be resolved.
    #[error("document structure is unreadable: {0}")]
    Malformed(String),

    /// The page tree has no entry for this 1-based page number.
    #[error("page {0} is missing from the page tree")]
    MissingPage(u32),
}

impl From<lopdf::Error> for StructuralError {
    fn from(e: lopdf::Error) -> Self {
        StructuralError::Malformed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_failed_names_item() {
        let e = PdfPagesError::MergeFailed {
            item: "b.pdf".into(),
            reason: "document is encrypted".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("b.pdf"), "got: {msg}");
        assert!(msg.contains("encrypted"), "got: {msg}");
    }

    #[test]
    fn page_out_of_range_display() {
        let e = PdfPagesError::PageOutOfRange { page: 12, total: 10 };
        assert!(e.to_string().contains("Page 12"));
        assert!(e.to_string().contains("10 pages"));
    }

    #[test]
    fn cancelled_display() {
        let e = PdfPagesError::Cancelled {
            completed: 3,
            total: 8,
        };
        assert!(e.to_string().contains("3 of 8"));
    }

    #[test]
    fn structural_error_from_lopdf() {
        let lopdf_err = lopdf::Document::load_mem(b"not a pdf at all").unwrap_err();
        let e: StructuralError = lopdf_err.into();
        assert!(matches!(e, StructuralError::Malformed(_)));
    }
}
