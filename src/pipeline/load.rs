//! Binary loading: read an input file fully into an owned byte buffer.
//!
//! ## Why is `SourceBytes` not `Clone`?
//!
//! pdfium takes ownership of the buffer it parses (`load_pdf_from_byte_vec`)
//! and keeps it for the lifetime of the document. Each consumer that parses a
//! buffer therefore needs its own copy, and making that copy an explicit
//! [`SourceBytes::copy`] call keeps every hand-off visible in the code.
//! Read-only consumers (the lopdf structural path) borrow instead.

use crate::error::PdfPagesError;
use std::path::Path;
use tracing::debug;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// One input PDF as originally read, tagged with its display name.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceBytes {
    name: String,
    data: Vec<u8>,
}

impl SourceBytes {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Independent buffer with identical content.
    pub fn copy(&self) -> SourceBytes {
        SourceBytes {
            name: self.name.clone(),
            data: self.data.clone(),
        }
    }

    /// Display name (file name without directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Give up ownership of the buffer (for consumers that take it over).
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Check the leading bytes are `%PDF`.
    pub fn verify_magic(&self) -> Result<(), PdfPagesError> {
        if self.data.starts_with(PDF_MAGIC) {
            Ok(())
        } else {
            Err(PdfPagesError::NotAPdf {
                name: self.name.clone(),
                magic: self.data.iter().take(4).copied().collect(),
            })
        }
    }
}

/// Loose pre-check by extension, the way a file picker filters uploads.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Display name for a path: its final component.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Read a file fully into memory.
pub async fn read_as_bytes(path: &Path) -> Result<SourceBytes, PdfPagesError> {
    let name = display_name(path);
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PdfPagesError::FileNotFound { name: name.clone() },
        std::io::ErrorKind::PermissionDenied => {
            PdfPagesError::PermissionDenied { name: name.clone() }
        }
        _ => PdfPagesError::ReadFailed {
            name: name.clone(),
            reason: e.kind().to_string(),
        },
    })?;
    debug!("Read '{}' ({} bytes)", name, data.len());
    Ok(SourceBytes::new(name, data))
}
