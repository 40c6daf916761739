//! The pdfium rendering engine handle.
//!
//! Binding pdfium loads a ~30 MB shared library, so it happens exactly once,
//! at the application's composition root. The resulting [`RenderEngine`] is
//! passed by reference to everything that parses or renders documents; every
//! [`crate::pipeline::render::ParsedDocument`] borrows it, so the compiler
//! guarantees no document outlives the engine.
//!
//! ## Search order
//! 1. The explicit path from [`crate::PagesConfig::pdfium_lib_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. The directory containing the running executable
//! 4. The current working directory
//! 5. The system library search path

use crate::config::PagesConfig;
use crate::error::PdfPagesError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A bound pdfium library. Create once, share by reference.
pub struct RenderEngine {
    pdfium: Pdfium,
}

impl RenderEngine {
    /// Bind pdfium using the documented search order.
    pub fn bind(config: &PagesConfig) -> Result<Self, PdfPagesError> {
        let explicit = config
            .pdfium_lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        if let Some(path) = explicit {
            // An explicit location that fails to bind is an error, not a hint.
            return Self::bind_from_path(&path);
        }

        for dir in candidate_dirs() {
            let path = Pdfium::pdfium_platform_library_name_at_path(&dir);
            if let Ok(bindings) = Pdfium::bind_to_library(&path) {
                info!("Bound pdfium from {}", path.display());
                return Ok(Self::from_pdfium(Pdfium::new(bindings)));
            }
            debug!("No pdfium at {}", path.display());
        }

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| PdfPagesError::PdfiumBindingFailed(e.to_string()))?;
        info!("Bound system pdfium library");
        Ok(Self::from_pdfium(Pdfium::new(bindings)))
    }

    /// Bind pdfium at an explicit file or directory.
    pub fn bind_from_path(path: &Path) -> Result<Self, PdfPagesError> {
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(path)
        } else {
            path.to_path_buf()
        };
        let bindings = Pdfium::bind_to_library(&lib).map_err(|e| {
            PdfPagesError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e))
        })?;
        info!("Bound pdfium from {}", lib.display());
        Ok(Self::from_pdfium(Pdfium::new(bindings)))
    }

    /// Wrap an already-bound pdfium instance.
    pub fn from_pdfium(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }

    pub(crate) fn pdfium(&self) -> &Pdfium {
        &self.pdfium
    }
}

fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(dir);
    }
    dirs.push(PathBuf::from("."));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_dirs_end_with_working_directory() {
        let dirs = candidate_dirs();
        assert_eq!(dirs.last(), Some(&PathBuf::from(".")));
    }

    #[test]
    fn bind_from_missing_path_fails_cleanly() {
        let result = RenderEngine::bind_from_path(Path::new("/definitely/not/libpdfium.so"));
        assert!(matches!(result, Err(PdfPagesError::PdfiumBindingFailed(_))));
    }
}
