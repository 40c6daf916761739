//! Document parsing and page rasterisation via pdfium.
//!
//! ## Why pdfium for the fallback?
//!
//! pdfium opens documents whose owner password forbids copying or
//! modification; the permission bits restrict what an editor may do, not
//! what a viewer may display. Rendering therefore keeps working exactly where
//! the structural copy (lopdf) has to give up.
//!
//! ## Why opaque white?
//!
//! A transparent background would turn into black or grey once the raster is
//! flattened into an RGB image XObject. Every render clears to white first.

use crate::config::{PagesConfig, POINTS_PER_INCH};
use crate::engine::RenderEngine;
use crate::error::PdfPagesError;
use crate::pipeline::load::SourceBytes;
use image::RgbImage;
use pdfium_render::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Native page size in PDF points (1/72 inch), rotation applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Pixel dimensions of a render at `scale`.
    ///
    /// Scales such as 300/72 are not exact in `f32`; products that land
    /// within a thousandth of a pixel of an integer are taken as that integer.
    pub fn pixels_at(&self, scale: f32) -> (u32, u32) {
        (edge_pixels(self.width, scale), edge_pixels(self.height, scale))
    }

    /// Largest scale ≤ `scale` whose longest edge fits in `max_pixels`.
    pub fn capped_scale(&self, scale: f32, max_pixels: u32) -> f32 {
        let longest = self.width.max(self.height) * scale;
        if longest > max_pixels as f32 && longest > 0.0 {
            scale * max_pixels as f32 / longest
        } else {
            scale
        }
    }
}

fn edge_pixels(points: f32, scale: f32) -> u32 {
    let exact = f64::from(points) * f64::from(scale);
    let nearest = exact.round();
    let pixels = if (exact - nearest).abs() < 1e-3 {
        nearest
    } else {
        exact.floor()
    };
    (pixels as u32).max(1)
}

/// One rendered page: opaque RGB pixels plus the page's native size.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// 1-based page number.
    pub page_number: usize,
    pub image: RgbImage,
    pub native: PageSize,
}

impl RasterImage {
    /// Effective resolution of this raster.
    pub fn dpi(&self) -> f32 {
        self.image.width() as f32 / self.native.width * POINTS_PER_INCH
    }
}

/// A page-addressable document that can rasterise its pages.
///
/// Implemented by [`ParsedDocument`]; the thumbnail generator and the
/// rasterised fallback depend only on this trait.
pub trait PageRasterizer {
    /// Display name of the underlying source.
    fn name(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Native size of a 1-based page.
    fn page_size(&self, page_number: usize) -> Result<PageSize, PdfPagesError>;

    /// Render a 1-based page at `scale` over an opaque white background.
    fn rasterize(&self, page_number: usize, scale: f32) -> Result<RasterImage, PdfPagesError>;
}

/// Render a page for export: DPI-derived scale, capped by
/// [`PagesConfig::max_rendered_pixels`].
pub fn render_for_export(
    doc: &dyn PageRasterizer,
    page_number: usize,
    config: &PagesConfig,
) -> Result<RasterImage, PdfPagesError> {
    let size = doc.page_size(page_number)?;
    let scale = size.capped_scale(config.export_scale(), config.max_rendered_pixels);
    let raster = doc.rasterize(page_number, scale)?;
    debug!(
        "Export render of page {} at {:.0} DPI ({}x{} px)",
        page_number,
        raster.dpi(),
        raster.image.width(),
        raster.image.height()
    );
    Ok(raster)
}

/// Opens documents for rendering. Implemented by [`RenderEngine`].
pub trait DocumentOpener {
    fn open<'s>(
        &'s self,
        bytes: SourceBytes,
        password: Option<&str>,
    ) -> Result<Box<dyn PageRasterizer + 's>, PdfPagesError>;
}

/// A document parsed by pdfium.
///
/// Dropping it (or calling [`ParsedDocument::release`]) frees pdfium's
/// native memory for the document and the byte buffer it took over.
pub struct ParsedDocument<'e> {
    name: String,
    document: PdfDocument<'e>,
    page_count: usize,
}

/// Parse a buffer with pdfium. The buffer is moved into the document.
pub fn parse<'e>(
    engine: &'e RenderEngine,
    bytes: SourceBytes,
    password: Option<&str>,
) -> Result<ParsedDocument<'e>, PdfPagesError> {
    let name = bytes.name().to_string();
    let document = engine
        .pdfium()
        .load_pdf_from_byte_vec(bytes.into_vec(), password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    PdfPagesError::WrongPassword { name: name.clone() }
                } else {
                    PdfPagesError::PasswordRequired { name: name.clone() }
                }
            } else {
                PdfPagesError::ParseFailed {
                    name: name.clone(),
                    detail: e.to_string(),
                }
            }
        })?;

    let page_count = document.pages().len() as usize;
    info!("Parsed '{}': {} pages", name, page_count);

    Ok(ParsedDocument {
        name,
        document,
        page_count,
    })
}

impl<'e> ParsedDocument<'e> {
    /// Explicit teardown. Equivalent to dropping the document.
    pub fn release(self) {
        debug!("Released '{}'", self.name);
    }

    fn page(&self, page_number: usize) -> Result<PdfPage<'_>, PdfPagesError> {
        if page_number == 0 || page_number > self.page_count {
            return Err(PdfPagesError::PageOutOfRange {
                page: page_number,
                total: self.page_count,
            });
        }
        let index = PdfPageIndex::try_from(page_number - 1).map_err(|_| {
            PdfPagesError::PageOutOfRange {
                page: page_number,
                total: self.page_count,
            }
        })?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| PdfPagesError::RenderFailed {
                page: page_number,
                detail: e.to_string(),
            })
    }
}

impl PageRasterizer for ParsedDocument<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page_number: usize) -> Result<PageSize, PdfPagesError> {
        let page = self.page(page_number)?;
        Ok(PageSize {
            width: page.width().value,
            height: page.height().value,
        })
    }

    fn rasterize(&self, page_number: usize, scale: f32) -> Result<RasterImage, PdfPagesError> {
        let page = self.page(page_number)?;
        let native = PageSize {
            width: page.width().value,
            height: page.height().value,
        };

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_clear_color(PdfColor::WHITE)
            .render_form_data(true)
            .use_print_quality(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PdfPagesError::RenderFailed {
                page: page_number,
                detail: e.to_string(),
            })?;

        // The bitmap is released as soon as it has been converted.
        let image = bitmap.as_image().into_rgb8();
        debug!(
            "Rendered page {} → {}x{} px (scale {:.3})",
            page_number,
            image.width(),
            image.height(),
            scale
        );

        Ok(RasterImage {
            page_number,
            image,
            native,
        })
    }
}

impl DocumentOpener for RenderEngine {
    fn open<'s>(
        &'s self,
        bytes: SourceBytes,
        password: Option<&str>,
    ) -> Result<Box<dyn PageRasterizer + 's>, PdfPagesError> {
        Ok(Box::new(parse(self, bytes, password)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_at_scale() {
        let letter = PageSize {
            width: 612.0,
            height: 792.0,
        };
        assert_eq!(letter.pixels_at(300.0 / 72.0), (2550, 3300));
        assert_eq!(letter.pixels_at(0.3), (183, 237));
        let a4 = PageSize {
            width: 595.0,
            height: 842.0,
        };
        assert_eq!(a4.pixels_at(300.0 / 72.0), (2479, 3508));
    }

    #[test]
    fn capped_scale_limits_longest_edge() {
        let poster = PageSize {
            width: 2384.0,
            height: 3370.0,
        };
        let scale = poster.capped_scale(300.0 / 72.0, 10_000);
        let (_, h) = poster.pixels_at(scale);
        assert!(h <= 10_000, "height {h}");

        let small = PageSize {
            width: 100.0,
            height: 100.0,
        };
        assert_eq!(small.capped_scale(2.0, 10_000), 2.0);
    }

    #[test]
    fn raster_dpi_is_derived_from_pixels() {
        let r = RasterImage {
            page_number: 1,
            image: RgbImage::new(300, 300),
            native: PageSize {
                width: 72.0,
                height: 72.0,
            },
        };
        assert!((r.dpi() - 300.0).abs() < 1e-3);
    }

    #[test]
    fn export_render_uses_configured_dpi() {
        let doc = crate::testutil::FakeDocument::new("a.pdf", vec![(72.0, 144.0)]);
        let config = PagesConfig::builder().export_dpi(150).build().unwrap();
        let raster = render_for_export(&doc, 1, &config).unwrap();
        assert_eq!(raster.image.dimensions(), (150, 300));
        assert!((raster.dpi() - 150.0).abs() < 1e-3);
    }
}
