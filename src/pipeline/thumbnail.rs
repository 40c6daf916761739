//! Thumbnail gallery and enlarged single-page previews.
//!
//! Pages are rendered strictly one at a time: a document with hundreds of
//! pages must never hold more than one raster surface alive. Each page's
//! render is encoded and dropped before the next render starts.

use crate::cancel::{checkpoint, CancelFlag};
use crate::config::PagesConfig;
use crate::error::PdfPagesError;
use crate::pipeline::encode::{encode_jpeg, encode_png, EncodedImage};
use crate::pipeline::render::PageRasterizer;
use crate::progress::{Operation, PageProgress};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// One gallery entry.
#[derive(Debug, Clone, Serialize)]
pub struct PageDescriptor {
    /// 1-based page number.
    pub page_number: usize,
    pub thumbnail: EncodedImage,
    /// Native width in points.
    pub width: f32,
    /// Native height in points.
    pub height: f32,
}

/// Render a thumbnail for every page, in order.
///
/// `progress.on_page(current, total)` fires exactly once per page with
/// `current` running from 1 to `total`.
pub fn generate_all(
    doc: &dyn PageRasterizer,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<Vec<PageDescriptor>, PdfPagesError> {
    let total = doc.page_count();
    info!("Generating {} thumbnails for '{}'", total, doc.name());
    progress.on_start(Operation::Thumbnails, total);

    let mut pages = Vec::with_capacity(total);
    for page_number in 1..=total {
        checkpoint(cancel, page_number - 1, total)?;

        let raster = doc.rasterize(page_number, config.thumbnail_scale)?;
        let thumbnail = encode_jpeg(&raster.image, config.thumbnail_quality).map_err(|e| {
            PdfPagesError::RenderFailed {
                page: page_number,
                detail: format!("thumbnail encoding failed: {e}"),
            }
        })?;
        let native = raster.native;
        drop(raster);

        pages.push(PageDescriptor {
            page_number,
            thumbnail,
            width: native.width,
            height: native.height,
        });
        progress.on_page(page_number, total);
    }

    progress.on_complete(Operation::Thumbnails, total);
    Ok(pages)
}

/// Render one page at preview scale.
pub fn render_single_preview(
    doc: &dyn PageRasterizer,
    page_number: usize,
    config: &PagesConfig,
) -> Result<EncodedImage, PdfPagesError> {
    let raster = doc.rasterize(page_number, config.preview_scale)?;
    encode_jpeg(&raster.image, config.preview_quality).map_err(|e| PdfPagesError::RenderFailed {
        page: page_number,
        detail: format!("preview encoding failed: {e}"),
    })
}

/// Render one page at preview scale as a lossless PNG, for saving to disk.
pub fn render_lossless_preview(
    doc: &dyn PageRasterizer,
    page_number: usize,
    config: &PagesConfig,
) -> Result<EncodedImage, PdfPagesError> {
    let raster = doc.rasterize(page_number, config.preview_scale)?;
    encode_png(&raster.image).map_err(|e| PdfPagesError::RenderFailed {
        page: page_number,
        detail: format!("preview encoding failed: {e}"),
    })
}

/// Previews keyed by page number, valid for one open document.
///
/// The source never changes while a document is open, so a rendered preview
/// stays correct until the document is closed; the owner clears the cache
/// at that point.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<usize, EncodedImage>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached preview, rendering it on first request.
    pub fn get_or_render(
        &mut self,
        doc: &dyn PageRasterizer,
        page_number: usize,
        config: &PagesConfig,
    ) -> Result<&EncodedImage, PdfPagesError> {
        if !self.entries.contains_key(&page_number) {
            let preview = render_single_preview(doc, page_number, config)?;
            self.entries.insert(page_number, preview);
        } else {
            debug!("Preview cache hit for page {}", page_number);
        }
        self.entries
            .get(&page_number)
            .ok_or_else(|| PdfPagesError::Internal("preview cache lost an entry".into()))
    }

    pub fn contains(&self, page_number: usize) -> bool {
        self.entries.contains_key(&page_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDocument;
    use std::sync::Mutex;

    #[test]
    fn progress_fires_once_per_page_in_order() {
        let doc = FakeDocument::new("a.pdf", vec![(72.0, 144.0); 4]);
        let calls = Mutex::new(Vec::new());
        let sink = |c: usize, t: usize| calls.lock().unwrap().push((c, t));

        let pages = generate_all(&doc, &PagesConfig::default(), &sink, None).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        let numbers: Vec<usize> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn descriptors_carry_native_size_and_small_thumbnail() {
        let doc = FakeDocument::new("a.pdf", vec![(612.0, 792.0), (792.0, 612.0)]);
        let quiet = |_: usize, _: usize| {};
        let pages = generate_all(&doc, &PagesConfig::default(), &quiet, None).unwrap();
        assert_eq!((pages[1].width, pages[1].height), (792.0, 612.0));
        assert_eq!(pages[0].thumbnail.width, (612.0f32 * 0.3).floor() as u32);
        assert_eq!(pages[0].thumbnail.mime_type, "image/jpeg");
    }

    #[test]
    fn cancelled_generation_stops_early() {
        let doc = FakeDocument::new("a.pdf", vec![(72.0, 72.0); 3]);
        let flag = CancelFlag::new();
        let sink = |c: usize, _t: usize| {
            if c == 1 {
                flag.cancel();
            }
        };
        let result = generate_all(&doc, &PagesConfig::default(), &sink, Some(&flag));
        assert!(matches!(
            result,
            Err(PdfPagesError::Cancelled { completed: 1, total: 3 })
        ));
        assert_eq!(doc.render_count(), 1);
    }

    #[test]
    fn preview_cache_renders_each_page_once() {
        let doc = FakeDocument::new("a.pdf", vec![(72.0, 72.0); 3]);
        let config = PagesConfig::default();
        let mut cache = PreviewCache::new();

        cache.get_or_render(&doc, 2, &config).unwrap();
        cache.get_or_render(&doc, 2, &config).unwrap();
        let preview = cache.get_or_render(&doc, 3, &config).unwrap();

        assert_eq!(preview.width, 108);
        assert_eq!(doc.render_count(), 2);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn preview_out_of_range_is_error() {
        let doc = FakeDocument::new("a.pdf", vec![(72.0, 72.0)]);
        let mut cache = PreviewCache::new();
        let err = cache
            .get_or_render(&doc, 5, &PagesConfig::default())
            .unwrap_err();
        assert!(matches!(err, PdfPagesError::PageOutOfRange { page: 5, total: 1 }));
        assert!(!cache.contains(5));
    }

    #[test]
    fn lossless_preview_is_png_at_preview_scale() {
        let doc = FakeDocument::new("a.pdf", vec![(100.0, 50.0)]);
        let image = render_lossless_preview(&doc, 1, &PagesConfig::default()).unwrap();
        assert_eq!(image.extension(), "png");
        assert_eq!((image.width, image.height), (150, 75));
    }
}
