//! Configuration types for page extraction and merging.
//!
//! All rendering and output behaviour is controlled through [`PagesConfig`],
//! built via its [`PagesConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share a config between the thumbnail generator, the
//! extractor and the merger so that all three agree on resolutions.
//!
//! # One export resolution
//! The rasterised fallback renders at [`PagesConfig::export_dpi`] and derives
//! the scale from it (`dpi / 72`). There is deliberately no second, separate
//! scale constant that could drift out of step with the DPI.

use crate::error::PdfPagesError;
use std::fmt;
use std::path::PathBuf;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Configuration shared by every page operation.
///
/// # Example
/// ```rust
/// use edgequake_pdfpages::PagesConfig;
///
/// let config = PagesConfig::builder()
///     .export_dpi(200)
///     .thumbnail_scale(0.25)
///     .build()
///     .unwrap();
/// assert!((config.export_scale() - 200.0 / 72.0).abs() < 1e-6);
/// ```
#[derive(Clone)]
pub struct PagesConfig {
    /// Resolution of fallback page rasters. Range: 72–600. Default: 300.
    ///
    /// 300 DPI keeps body text legible when a restricted document has to be
    /// rebuilt from pixels; each A4 page is then ~2480 × 3508 px (~26 MB raw).
    pub export_dpi: u32,

    /// Longest raster edge for export renders, in pixels. Default: 14 400.
    ///
    /// A poster-sized page at 300 DPI would otherwise allocate gigabytes.
    /// The cap shrinks pixel density only; output page dimensions always
    /// equal the source page's native size.
    pub max_rendered_pixels: u32,

    /// Scale factor for gallery thumbnails. Default: 0.3.
    pub thumbnail_scale: f32,

    /// Scale factor for the enlarged single-page preview. Default: 1.5.
    pub preview_scale: f32,

    /// JPEG quality (1–100) for thumbnails. Default: 80.
    pub thumbnail_quality: u8,

    /// JPEG quality (1–100) for previews. Default: 90.
    pub preview_quality: u8,

    /// User password for documents that cannot be opened without one.
    pub password: Option<String>,

    /// Explicit location of the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Compress unfiltered streams when serialising output. Default: true.
    pub compress_output: bool,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            export_dpi: 300,
            max_rendered_pixels: 14_400,
            thumbnail_scale: 0.3,
            preview_scale: 1.5,
            thumbnail_quality: 80,
            preview_quality: 90,
            password: None,
            pdfium_lib_path: None,
            compress_output: true,
        }
    }
}

impl fmt::Debug for PagesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagesConfig")
            .field("export_dpi", &self.export_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("thumbnail_scale", &self.thumbnail_scale)
            .field("preview_scale", &self.preview_scale)
            .field("thumbnail_quality", &self.thumbnail_quality)
            .field("preview_quality", &self.preview_quality)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("compress_output", &self.compress_output)
            .finish()
    }
}

impl PagesConfig {
    /// Create a new builder for `PagesConfig`.
    pub fn builder() -> PagesConfigBuilder {
        PagesConfigBuilder {
            config: Self::default(),
        }
    }

    /// Render scale for export rasters, derived from [`Self::export_dpi`].
    pub fn export_scale(&self) -> f32 {
        scale_for_dpi(self.export_dpi)
    }
}

/// Scale factor that maps PDF points to pixels at `dpi`.
pub fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}

/// Builder for [`PagesConfig`].
#[derive(Debug)]
pub struct PagesConfigBuilder {
    config: PagesConfig,
}

impl PagesConfigBuilder {
    pub fn export_dpi(mut self, dpi: u32) -> Self {
        self.config.export_dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn thumbnail_scale(mut self, scale: f32) -> Self {
        self.config.thumbnail_scale = scale;
        self
    }

    pub fn preview_scale(mut self, scale: f32) -> Self {
        self.config.preview_scale = scale;
        self
    }

    pub fn thumbnail_quality(mut self, q: u8) -> Self {
        self.config.thumbnail_quality = q.clamp(1, 100);
        self
    }

    pub fn preview_quality(mut self, q: u8) -> Self {
        self.config.preview_quality = q.clamp(1, 100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn compress_output(mut self, v: bool) -> Self {
        self.config.compress_output = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PagesConfig, PdfPagesError> {
        let c = &self.config;
        if !(72..=600).contains(&c.export_dpi) {
            return Err(PdfPagesError::InvalidConfig(format!(
                "export DPI must be 72–600, got {}",
                c.export_dpi
            )));
        }
        for (label, scale) in [("thumbnail", c.thumbnail_scale), ("preview", c.preview_scale)] {
            if !scale.is_finite() || scale <= 0.0 || scale > 10.0 {
                return Err(PdfPagesError::InvalidConfig(format!(
                    "{label} scale must be in (0, 10], got {scale}"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_export_scale_is_300_dpi() {
        let c = PagesConfig::default();
        assert_eq!(c.export_dpi, 300);
        assert!((c.export_scale() - 300.0 / 72.0).abs() < 1e-6);
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        assert!(PagesConfig::builder().export_dpi(50).build().is_err());
        assert!(PagesConfig::builder().export_dpi(601).build().is_err());
        assert!(PagesConfig::builder().export_dpi(72).build().is_ok());
    }

    #[test]
    fn builder_rejects_bad_scales() {
        assert!(PagesConfig::builder().thumbnail_scale(0.0).build().is_err());
        assert!(PagesConfig::builder().preview_scale(f32::NAN).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = PagesConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
