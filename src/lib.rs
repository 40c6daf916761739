//! # edgequake-pdfpages
//!
//! Extract pages from a PDF, or merge several PDFs into one, entirely on the
//! local machine.
//!
//! ## Why two strategies?
//!
//! Copying page objects from one PDF into another (lopdf) is lossless: text
//! stays selectable, vectors stay sharp and the output is small. It fails on
//! encrypted or permission-restricted documents. Those can still be
//! *rendered* (pdfium), so each affected page is rasterised at 300 DPI and
//! embedded as an image on a page of the original size. The fallback is
//! automatic, per document, and reported in [`OutputArtifact::sources`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Load       read into memory, verify %PDF magic
//!  ├─ 2. Render     parse with pdfium; thumbnails and previews
//!  ├─ 3. Select     page selection (toggle, shift-range, "1,3,5-7")
//!  ├─ 4. Assemble   structural copy, else rasterised pages at native size
//!  └─ 5. Deliver    save locally (prompted or into a default directory)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfpages::{extract, NoopProgress, PageSelection, PagesConfig, SourceBytes};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = SourceBytes::new("report.pdf", std::fs::read("report.pdf")?);
//!     let selection: PageSelection = [5, 2, 8].into_iter().collect();
//!     let output = extract(bytes, &selection, None, &PagesConfig::default(), &NoopProgress, None)?;
//!     std::fs::write(&output.file_name, &output.bytes)?; // report_selected.pdf
//!     Ok(())
//! }
//! ```
//!
//! Pass a parsed document as the `renderer` argument to support encrypted
//! inputs; see [`ExtractSession`] for the full load → select → extract flow.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfpages` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfpages = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{
    extract_file, inspect, load_source, merge_files, preview_file, thumbnails_file, DocumentInfo,
};
pub use cancel::CancelFlag;
pub use config::{PagesConfig, PagesConfigBuilder};
pub use engine::RenderEngine;
pub use error::{PdfPagesError, StructuralError};
pub use output::{
    extraction_file_name, merged_file_name, AssemblyPath, OutputArtifact, SourceReport,
};
pub use pipeline::deliver::{deliver, DeliveryOutcome, SaveLocationPicker, TerminalPicker};
pub use pipeline::encode::EncodedImage;
pub use pipeline::extract::extract;
pub use pipeline::load::{read_as_bytes, SourceBytes};
pub use pipeline::merge::{merge, MergeItem, MergeItemId, MergeList};
pub use pipeline::render::{
    parse, DocumentOpener, PageRasterizer, PageSize, ParsedDocument, RasterImage,
};
pub use pipeline::thumbnail::{
    generate_all as generate_thumbnails, render_lossless_preview,
    render_single_preview as render_preview,
    PageDescriptor, PreviewCache,
};
pub use progress::{NoopProgress, Operation, PageProgress};
pub use selection::PageSelection;
pub use session::ExtractSession;
