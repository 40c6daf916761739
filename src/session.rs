//! One open document in the extraction workflow.
//!
//! Ties together the steps a user goes through: load, browse thumbnails,
//! select pages, enlarge a page, extract. The session owns the original
//! bytes, the rendered document, the gallery, the selection and the preview
//! cache, and drops all of them together on [`ExtractSession::close`]. Open
//! a new session to switch documents; the old one must be closed (or
//! dropped) first so the renderer's memory for it is released.

use crate::cancel::CancelFlag;
use crate::config::PagesConfig;
use crate::engine::RenderEngine;
use crate::error::PdfPagesError;
use crate::output::OutputArtifact;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::extract::extract;
use crate::pipeline::load::SourceBytes;
use crate::pipeline::render::{parse, PageRasterizer, ParsedDocument};
use crate::pipeline::thumbnail::{generate_all, PageDescriptor, PreviewCache};
use crate::progress::PageProgress;
use crate::selection::PageSelection;
use tracing::{debug, info};

pub struct ExtractSession<D: PageRasterizer> {
    source: SourceBytes,
    document: D,
    pages: Vec<PageDescriptor>,
    selection: PageSelection,
    previews: PreviewCache,
    config: PagesConfig,
}

impl<'e> ExtractSession<ParsedDocument<'e>> {
    /// Verify and parse `source`, then render the thumbnail gallery.
    pub fn open(
        engine: &'e RenderEngine,
        source: SourceBytes,
        config: PagesConfig,
        progress: &dyn PageProgress,
        cancel: Option<&CancelFlag>,
    ) -> Result<Self, PdfPagesError> {
        source.verify_magic()?;
        let document = parse(engine, source.copy(), config.password.as_deref())?;
        Self::from_parts(source, document, config, progress, cancel)
    }
}

impl<D: PageRasterizer> ExtractSession<D> {
    /// Build a session around an already opened document.
    pub fn from_parts(
        source: SourceBytes,
        document: D,
        config: PagesConfig,
        progress: &dyn PageProgress,
        cancel: Option<&CancelFlag>,
    ) -> Result<Self, PdfPagesError> {
        let pages = generate_all(&document, &config, progress, cancel)?;
        info!("Opened '{}' with {} pages", source.name(), pages.len());
        Ok(Self {
            source,
            document,
            pages,
            selection: PageSelection::new(),
            previews: PreviewCache::new(),
            config,
        })
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Thumbnail gallery, one entry per page.
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn selection(&self) -> &PageSelection {
        &self.selection
    }

    /// Click on a page; `extend_range` is the shift-click behaviour.
    pub fn toggle(&mut self, page: usize, extend_range: bool) {
        if (1..=self.page_count()).contains(&page) {
            self.selection.toggle(page, extend_range);
        }
    }

    pub fn select_all(&mut self) {
        let total = self.page_count();
        self.selection.select_all(total);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Replace the selection wholesale, e.g. from a parsed page spec.
    pub fn set_selection(&mut self, selection: PageSelection) -> Result<(), PdfPagesError> {
        selection.validate(self.page_count())?;
        self.selection = selection;
        Ok(())
    }

    /// Enlarged preview of one page, cached for the life of the session.
    pub fn preview(&mut self, page: usize) -> Result<&EncodedImage, PdfPagesError> {
        self.previews.get_or_render(&self.document, page, &self.config)
    }

    /// Extract the current selection.
    pub fn extract(
        &self,
        progress: &dyn PageProgress,
        cancel: Option<&CancelFlag>,
    ) -> Result<OutputArtifact, PdfPagesError> {
        extract(
            self.source.copy(),
            &self.selection,
            Some(&self.document),
            &self.config,
            progress,
            cancel,
        )
    }

    /// Release the document and everything derived from it.
    pub fn close(mut self) {
        self.previews.clear();
        debug!("Closed '{}'", self.source.name());
    }
}
