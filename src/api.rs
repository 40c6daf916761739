//! File-level entry points: read inputs from disk, run one operation, return
//! the result.
//!
//! These functions are `async` because reading inputs is. The page work
//! itself is synchronous and runs under [`tokio::task::block_in_place`]:
//! documents borrow the [`RenderEngine`], so they cannot move into a
//! `'static` blocking task. Call them from a multi-threaded runtime.

use crate::cancel::CancelFlag;
use crate::config::PagesConfig;
use crate::engine::RenderEngine;
use crate::error::PdfPagesError;
use crate::output::OutputArtifact;
use crate::pipeline::assemble::load_structural;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::extract::extract;
use crate::pipeline::load::{has_pdf_extension, read_as_bytes, SourceBytes};
use crate::pipeline::merge::{merge, MergeItem, MergeList};
use crate::pipeline::render::{parse, PageRasterizer, PageSize};
use crate::pipeline::thumbnail::{
    generate_all, render_lossless_preview, render_single_preview, PageDescriptor,
};
use crate::progress::PageProgress;
use crate::selection::PageSelection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of one PDF, without producing any output.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub file_size: usize,
    pub page_count: usize,
    /// Native size of every page, in order.
    pub page_sizes: Vec<PageSize>,
    /// Whether pages can be copied losslessly. When false, extract and merge
    /// rasterise this document.
    pub structural_copy: bool,
    /// Why the lossless copy is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_error: Option<String>,
}

/// Read a file and check it is a PDF.
///
/// The extension check is advisory; the `%PDF` magic bytes are not.
pub async fn load_source(path: &Path) -> Result<SourceBytes, PdfPagesError> {
    if !has_pdf_extension(path) {
        warn!("'{}' has no .pdf extension", path.display());
    }
    let source = read_as_bytes(path).await?;
    source.verify_magic()?;
    Ok(source)
}

/// Extract the pages named by `pages` (`"all"`, `"1,3,5-7"`, …).
pub async fn extract_file(
    engine: &RenderEngine,
    input: &Path,
    pages: &str,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<OutputArtifact, PdfPagesError> {
    let source = load_source(input).await?;
    tokio::task::block_in_place(|| {
        let document = parse(engine, source.copy(), config.password.as_deref())?;
        let selection = PageSelection::parse(pages, document.page_count())?;
        extract(source, &selection, Some(&document), config, progress, cancel)
    })
}

/// Merge `inputs` in the given order.
pub async fn merge_files(
    engine: &RenderEngine,
    inputs: &[PathBuf],
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<OutputArtifact, PdfPagesError> {
    let mut list = MergeList::new();
    for path in inputs {
        let source = load_source(path).await?;
        let item = tokio::task::block_in_place(|| {
            MergeItem::load(engine, source, config.password.as_deref())
        })?;
        list.add(item);
    }
    info!(
        "Merge list: {} files, {} pages",
        list.len(),
        list.total_pages()
    );
    tokio::task::block_in_place(|| merge(list.items(), Some(engine), config, progress, cancel))
}

/// Render the thumbnail gallery of one file.
pub async fn thumbnails_file(
    engine: &RenderEngine,
    input: &Path,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<Vec<PageDescriptor>, PdfPagesError> {
    let source = load_source(input).await?;
    tokio::task::block_in_place(|| {
        let document = parse(engine, source, config.password.as_deref())?;
        generate_all(&document, config, progress, cancel)
    })
}

/// Render one enlarged page preview, as JPEG or (`lossless`) PNG.
pub async fn preview_file(
    engine: &RenderEngine,
    input: &Path,
    page: usize,
    lossless: bool,
    config: &PagesConfig,
) -> Result<EncodedImage, PdfPagesError> {
    let source = load_source(input).await?;
    tokio::task::block_in_place(|| {
        let document = parse(engine, source, config.password.as_deref())?;
        if lossless {
            render_lossless_preview(&document, page, config)
        } else {
            render_single_preview(&document, page, config)
        }
    })
}

/// Page count, page sizes and structural-copy availability.
pub async fn inspect(
    engine: &RenderEngine,
    input: &Path,
    config: &PagesConfig,
) -> Result<DocumentInfo, PdfPagesError> {
    let source = load_source(input).await?;
    tokio::task::block_in_place(|| {
        let structural_error = load_structural(source.as_slice())
            .err()
            .map(|e| e.to_string());
        let name = source.name().to_string();
        let file_size = source.len();

        let document = parse(engine, source, config.password.as_deref())?;
        let page_sizes = (1..=document.page_count())
            .map(|page| document.page_size(page))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentInfo {
            name,
            file_size,
            page_count: page_sizes.len(),
            page_sizes,
            structural_copy: structural_error.is_none(),
            structural_error,
        })
    })
}
