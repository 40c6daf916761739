//! Page extraction: a new PDF holding exactly the selected pages.
//!
//! The selection is always consumed in ascending page order. The structural
//! copy is tried first; if lopdf cannot open or copy the source (encrypted,
//! damaged) every selected page is instead rendered at export resolution
//! and embedded at its native size. The fallback needs a document that was
//! already opened by the renderer, because only the renderer can read pages
//! the structural library refuses.

use crate::cancel::{checkpoint, CancelFlag};
use crate::config::PagesConfig;
use crate::error::PdfPagesError;
use crate::output::{extraction_file_name, AssemblyPath, OutputArtifact, SourceReport};
use crate::pipeline::assemble::{
    append_rasterized, append_structural, load_structural, OutputDocument,
};
use crate::pipeline::load::SourceBytes;
use crate::pipeline::render::PageRasterizer;
use crate::progress::{Operation, PageProgress};
use crate::selection::PageSelection;
use tracing::{info, warn};

/// Build a PDF from the selected pages of `source`.
///
/// `renderer` is the same document opened for rendering. Without it an
/// encrypted or damaged source fails with
/// [`PdfPagesError::ExtractionFailed`].
pub fn extract(
    source: SourceBytes,
    selection: &PageSelection,
    renderer: Option<&dyn PageRasterizer>,
    config: &PagesConfig,
    progress: &dyn PageProgress,
    cancel: Option<&CancelFlag>,
) -> Result<OutputArtifact, PdfPagesError> {
    let pages = selection.to_sorted_vec();
    if pages.is_empty() {
        return Err(PdfPagesError::EmptySelection);
    }
    let total = pages.len();
    info!("Extracting {} pages from '{}'", total, source.name());
    progress.on_start(Operation::Extract, total);

    let mut output = OutputDocument::new();
    let structural = match load_structural(source.as_slice()) {
        Ok(doc) => {
            selection.validate(doc.get_pages().len())?;
            checkpoint(cancel, 0, total)?;
            append_structural(&mut output, &doc, Some(&pages))
        }
        Err(e) => Err(e),
    };

    let path = match structural {
        Ok(_) => {
            for current in 1..=total {
                progress.on_page(current, total);
            }
            AssemblyPath::Structural
        }
        Err(reason) => {
            warn!(
                "'{}' cannot be copied structurally ({}); rasterising selected pages",
                source.name(),
                reason
            );
            progress.on_fallback(source.name(), &reason.to_string());

            let doc = renderer.ok_or_else(|| PdfPagesError::ExtractionFailed {
                reason: format!(
                    "'{}' cannot be copied structurally ({reason}) and no rendered document \
                     is available for the image fallback",
                    source.name()
                ),
            })?;
            selection.validate(doc.page_count())?;

            let mut done = 0;
            append_rasterized(
                &mut output,
                doc,
                &pages,
                config,
                progress,
                cancel,
                &mut done,
                total,
            )
            .map_err(|e| match e {
                PdfPagesError::Cancelled { .. } => e,
                other => PdfPagesError::ExtractionFailed {
                    reason: format!("image fallback failed: {other}"),
                },
            })?;
            AssemblyPath::Rasterized
        }
    };

    let page_count = output.page_count();
    let bytes = output.finish(config.compress_output)?;
    info!(
        "Extracted {} pages from '{}' ({:?}, {} bytes)",
        page_count,
        source.name(),
        path,
        bytes.len()
    );
    progress.on_complete(Operation::Extract, page_count);

    Ok(OutputArtifact {
        bytes,
        file_name: extraction_file_name(source.name()),
        page_count,
        sources: vec![SourceReport {
            name: source.name().to_string(),
            path,
            pages: page_count,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use crate::testutil::{build_encrypted_pdf, build_pdf, FakeDocument, CORRUPT_PDF};
    use lopdf::Document;
    use std::sync::Mutex;

    fn page_widths(bytes: &[u8]) -> Vec<f32> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let media_box = doc.get_dictionary(id).unwrap().get(b"MediaBox").unwrap();
                media_box.as_array().unwrap()[2].as_float().unwrap()
            })
            .collect()
    }

    fn distinct_widths_pdf() -> Vec<u8> {
        build_pdf(&(1..=10).map(|i| (100.0 * i as f32, 500.0)).collect::<Vec<_>>())
    }

    #[test]
    fn output_follows_ascending_page_order() {
        let mut selection = PageSelection::new();
        for page in [5, 2, 2, 8] {
            if !selection.contains(page) {
                selection.toggle(page, false);
            }
        }
        let source = SourceBytes::new("report.pdf", distinct_widths_pdf());

        let out = extract(source, &selection, None, &PagesConfig::default(), &NoopProgress, None)
            .unwrap();

        assert_eq!(out.page_count, 3);
        assert_eq!(page_widths(&out.bytes), vec![200.0, 500.0, 800.0]);
        assert_eq!(out.file_name, "report_selected.pdf");
        assert_eq!(out.sources[0].path, AssemblyPath::Structural);
    }

    #[test]
    fn extracting_every_page_keeps_content() {
        let source_bytes = build_pdf(&[(612.0, 792.0); 4]);
        let source = SourceBytes::new("all.pdf", source_bytes.clone());
        let out = extract(
            source,
            &PageSelection::all(4),
            None,
            &PagesConfig::default(),
            &NoopProgress,
            None,
        )
        .unwrap();

        let original = Document::load_mem(&source_bytes).unwrap();
        let copied = Document::load_mem(&out.bytes).unwrap();
        for (a, b) in original.get_pages().values().zip(copied.get_pages().values()) {
            assert_eq!(
                original.get_page_content(*a).unwrap(),
                copied.get_page_content(*b).unwrap()
            );
        }
    }

    #[test]
    fn empty_selection_is_rejected() {
        let source = SourceBytes::new("a.pdf", build_pdf(&[(612.0, 792.0)]));
        let err = extract(
            source,
            &PageSelection::new(),
            None,
            &PagesConfig::default(),
            &NoopProgress,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PdfPagesError::EmptySelection));
    }

    #[test]
    fn out_of_range_selection_is_a_caller_error() {
        let source = SourceBytes::new("a.pdf", build_pdf(&[(612.0, 792.0); 2]));
        let selection: PageSelection = [1, 3].into_iter().collect();
        let err = extract(source, &selection, None, &PagesConfig::default(), &NoopProgress, None)
            .unwrap_err();
        assert!(matches!(err, PdfPagesError::PageOutOfRange { page: 3, total: 2 }));
    }

    #[test]
    fn unreadable_source_falls_back_to_native_size_rasters() {
        let renderer = FakeDocument::new("locked.pdf", vec![(300.0, 400.0), (595.0, 842.0)]);
        let config = PagesConfig::builder().export_dpi(72).build().unwrap();
        let fallbacks = Mutex::new(Vec::new());
        struct Recorder<'a>(&'a Mutex<Vec<String>>);
        impl PageProgress for Recorder<'_> {
            fn on_page(&self, _current: usize, _total: usize) {}
            fn on_fallback(&self, source_name: &str, _reason: &str) {
                self.0.lock().unwrap().push(source_name.to_string());
            }
        }

        let out = extract(
            SourceBytes::new("locked.pdf", CORRUPT_PDF.to_vec()),
            &PageSelection::all(2),
            Some(&renderer),
            &config,
            &Recorder(&fallbacks),
            None,
        )
        .unwrap();

        assert_eq!(out.sources[0].path, AssemblyPath::Rasterized);
        assert_eq!(page_widths(&out.bytes), vec![300.0, 595.0]);
        assert_eq!(*fallbacks.lock().unwrap(), vec!["locked.pdf".to_string()]);
        assert_eq!(renderer.render_count(), 2);
    }

    #[test]
    fn encrypted_sources_are_rasterised() {
        let sizes = [(612.0, 792.0), (842.0, 595.0)];
        for user_password in ["", "secret"] {
            let renderer = FakeDocument::new("locked.pdf", sizes.to_vec());
            let selection: PageSelection = [2].into_iter().collect();
            let out = extract(
                SourceBytes::new("locked.pdf", build_encrypted_pdf(&sizes, user_password)),
                &selection,
                Some(&renderer),
                &PagesConfig::builder().export_dpi(72).build().unwrap(),
                &NoopProgress,
                None,
            )
            .unwrap();

            assert_eq!(out.sources[0].path, AssemblyPath::Rasterized, "{user_password:?}");
            assert_eq!(page_widths(&out.bytes), vec![842.0]);
            let copy = Document::load_mem(&out.bytes).unwrap();
            assert!(!copy.was_encrypted());
        }
    }

    #[test]
    fn fallback_without_renderer_fails() {
        let err = extract(
            SourceBytes::new("locked.pdf", CORRUPT_PDF.to_vec()),
            &PageSelection::all(1),
            None,
            &PagesConfig::default(),
            &NoopProgress,
            None,
        )
        .unwrap_err();
        match err {
            PdfPagesError::ExtractionFailed { reason } => assert!(reason.contains("locked.pdf")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn failing_render_surfaces_as_extraction_error() {
        let renderer = FakeDocument::new("x.pdf", vec![(72.0, 72.0); 3]).failing_on(2);
        let err = extract(
            SourceBytes::new("x.pdf", CORRUPT_PDF.to_vec()),
            &PageSelection::all(3),
            Some(&renderer),
            &PagesConfig::default(),
            &NoopProgress,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PdfPagesError::ExtractionFailed { .. }));
    }

    #[test]
    fn raster_progress_counts_every_page() {
        let renderer = FakeDocument::new("x.pdf", vec![(72.0, 72.0); 3]);
        let calls = Mutex::new(Vec::new());
        let sink = |c: usize, t: usize| calls.lock().unwrap().push((c, t));
        let selection: PageSelection = [3, 1].into_iter().collect();

        extract(
            SourceBytes::new("x.pdf", CORRUPT_PDF.to_vec()),
            &selection,
            Some(&renderer),
            &PagesConfig::default(),
            &sink,
            None,
        )
        .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }
}
