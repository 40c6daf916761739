//! Document merging: concatenate every page of every item, in list order.
//!
//! Each item independently tries the structural copy and falls back to
//! rendering its pages when lopdf refuses it. An item that fails both ways
//! fails the whole merge; pages already gathered from earlier items are
//! dropped with the unfinished output.

use crate::cancel::{checkpoint, CancelFlag};
use crate::config::PagesConfig;
use crate::error::PdfPagesError;
use crate::output::{
    merged_file_name, total_page_count, AssemblyPath, OutputArtifact, SourceReport,
};
use crate::pipeline::assemble::{
    append_rasterized, append_structural, load_structural, OutputDocument,
};
use crate::pipeline::load::SourceBytes;
use crate::pipeline::render::DocumentOpener;
use crate::progress::{Operation, PageProgress};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique handle for one merge list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MergeItemId(u64);

impl MergeItemId {
    fn next() -> Self {
        MergeItemId(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MergeItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One document waiting to be merged.
#[derive(Debug)]
pub struct MergeItem {
    pub id: MergeItemId,
    pub display_name: String,
    /// Page count recorded when the item was added.
    pub page_count: usize,
    pub bytes: SourceBytes,
}

impl MergeItem {
    /// Wrap bytes whose page count is already known.
    pub fn new(bytes: SourceBytes, page_count: usize) -> Self {
        Self {
            id: MergeItemId::next(),
            display_name: bytes.name().to_string(),
            page_count,
            bytes,
        }
    }

    /// Open a copy of `bytes` to record its page count, keeping the original
    /// untouched for the merge itself.
    pub fn load(
        opener: &dyn DocumentOpener,
        bytes: SourceBytes,
        password: Option<&str>,
    ) -> Result<Self, PdfPagesError> {
        let page_count = {
            let doc = opener.open(bytes.copy(), password)?;
            doc.page_count()
        };
        debug!("Queued '{}' ({} pages)", bytes.name(), page_count);
        Ok(Self::new(bytes, page_count))
    }
}

/// The user-ordered list of documents to merge.
#[derive(Debug, Default)]
pub struct MergeList {
    items: Vec<MergeItem>,
}

impl MergeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and return its id.
    pub fn add(&mut self, item: MergeItem) -> MergeItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Remove an item by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: MergeItemId) -> Option<MergeItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Move the item at `from` so it ends up at index `to`, shifting the
    /// items in between. Returns false if either index is out of bounds.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[MergeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the recorded page counts.
    pub fn total_pages(&self) -> usize {
        total_page_count(self.items.iter().map(|item| item.page_count))
    }

    /// Suggested name for the merged file.
    pub fn output_file_name(&self) -> String {
        let names: Vec<&str> = self.items.iter().map(|i| i.display_name.as_str()).collect();
        merged_file_name(&names)
    }
}

/// Merge `items` into one PDF.
///
/// `opener` renders items the structural copy cannot handle; without it
/// such an item fails the merge.
pub fn merge(
    items: &[MergeItem],
    opener: Option<&dyn DocumentOpener>,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<OutputArtifact, PdfPagesError> {
    if items.is_empty() {
        return Err(PdfPagesError::NothingToMerge);
    }
    let total = total_page_count(items.iter().map(|item| item.page_count));
    info!("Merging {} documents ({} pages)", items.len(), total);
    progress.on_start(Operation::Merge, total);

    let mut output = OutputDocument::new();
    let mut sources = Vec::with_capacity(items.len());
    let mut done = 0;

    for item in items {
        checkpoint(cancel, done, total)?;
        let before = output.page_count();

        let structural = load_structural(item.bytes.as_slice())
            .and_then(|doc| append_structural(&mut output, &doc, None));

        let path = match structural {
            Ok(pages) => {
                for _ in 0..pages {
                    done += 1;
                    progress.on_page(done, total);
                }
                AssemblyPath::Structural
            }
            Err(reason) => {
                warn!(
                    "'{}' cannot be copied structurally ({}); rasterising its pages",
                    item.display_name, reason
                );
                progress.on_fallback(&item.display_name, &reason.to_string());
                let Some(opener) = opener else {
                    return Err(PdfPagesError::MergeFailed {
                        item: item.display_name.clone(),
                        reason: format!(
                            "{reason}; no renderer is available for the image fallback"
                        ),
                    });
                };
                let rasterized = rasterize_item(
                    item,
                    opener,
                    &mut output,
                    config,
                    progress,
                    cancel,
                    &mut done,
                    total,
                );
                rasterized.map_err(|e| match e {
                    PdfPagesError::Cancelled { .. } => e,
                    other => PdfPagesError::MergeFailed {
                        item: item.display_name.clone(),
                        reason: other.to_string(),
                    },
                })?;
                AssemblyPath::Rasterized
            }
        };

        let pages = output.page_count() - before;
        debug!("'{}' contributed {} pages ({:?})", item.display_name, pages, path);
        sources.push(SourceReport {
            name: item.display_name.clone(),
            path,
            pages,
        });
    }

    let page_count = output.page_count();
    let bytes = output.finish(config.compress_output)?;
    info!("Merged {} pages ({} bytes)", page_count, bytes.len());
    progress.on_complete(Operation::Merge, page_count);

    let names: Vec<&str> = items.iter().map(|i| i.display_name.as_str()).collect();
    Ok(OutputArtifact {
        bytes,
        file_name: merged_file_name(&names),
        page_count,
        sources,
    })
}

#[allow(clippy::too_many_arguments)]
fn rasterize_item(
    item: &MergeItem,
    opener: &dyn DocumentOpener,
    output: &mut OutputDocument,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
    done: &mut usize,
    total: usize,
) -> Result<(), PdfPagesError> {
    let doc = opener.open(item.bytes.copy(), config.password.as_deref())?;
    let pages: Vec<usize> = (1..=doc.page_count()).collect();
    append_rasterized(output, doc.as_ref(), &pages, config, progress, cancel, done, total)
}
