//! Output delivery: put a produced PDF on the local disk.
//!
//! With a [`SaveLocationPicker`] the user chooses where the file goes and may
//! cancel; cancelling is a normal [`DeliveryOutcome`], not an error. Without
//! one the file lands in a default directory under its suggested name,
//! renamed `name (1).pdf`, `name (2).pdf`, … when that name is taken.
//!
//! Files are written to a sibling temp file and renamed into place, so an
//! interrupted write never leaves a truncated PDF under the final name.

use crate::error::PdfPagesError;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What happened to a delivered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Saved(PathBuf),
    /// The user dismissed the save prompt.
    Cancelled,
}

/// Interactive choice of where to save.
pub trait SaveLocationPicker: Send + Sync {
    /// Ask for a destination, proposing `suggested`. `Ok(None)` means the
    /// user cancelled. May block while waiting for input.
    fn pick(&self, suggested: &Path) -> io::Result<Option<PathBuf>>;
}

/// Prompts on stderr and reads the answer from stdin.
///
/// An empty answer accepts the suggestion; `q` or end of input cancels. An
/// answer naming an existing directory saves there under the suggested name.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPicker;

impl SaveLocationPicker for TerminalPicker {
    fn pick(&self, suggested: &Path) -> io::Result<Option<PathBuf>> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "Save to [{}] (q to cancel): ", suggested.display())?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        let answer = (read > 0).then_some(line.as_str());
        Ok(interpret_answer(answer, suggested))
    }
}

fn interpret_answer(answer: Option<&str>, suggested: &Path) -> Option<PathBuf> {
    let answer = answer?.trim();
    if answer.eq_ignore_ascii_case("q") {
        return None;
    }
    if answer.is_empty() {
        return Some(suggested.to_path_buf());
    }
    let chosen = PathBuf::from(answer);
    if chosen.is_dir() {
        let name = suggested.file_name().unwrap_or_else(|| "output.pdf".as_ref());
        Some(chosen.join(name))
    } else {
        Some(chosen)
    }
}

/// First free path for `file_name` in `dir`, adding ` (n)` before the
/// extension on collision.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| dir.join(format!("{stem} ({n}){extension}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Deliver `bytes` as `file_name`.
///
/// With a picker, the user confirms or changes the destination; otherwise the
/// file is saved into `default_dir`. The picker blocks the calling worker
/// thread while it waits, so call this from a multi-threaded runtime.
pub async fn deliver(
    bytes: &[u8],
    file_name: &str,
    picker: Option<&dyn SaveLocationPicker>,
    default_dir: &Path,
) -> Result<DeliveryOutcome, PdfPagesError> {
    let suggested = unique_path(default_dir, file_name);
    let target = match picker {
        Some(picker) => match tokio::task::block_in_place(|| picker.pick(&suggested)) {
            Ok(Some(path)) => path,
            Ok(None) => {
                info!("Save of '{}' cancelled", file_name);
                return Ok(DeliveryOutcome::Cancelled);
            }
            Err(e) => {
                return Err(PdfPagesError::OutputWriteFailed {
                    path: suggested,
                    source: e,
                })
            }
        },
        None => suggested,
    };

    write_atomic(&target, bytes).await?;
    info!("Saved {} bytes to {}", bytes.len(), target.display());
    Ok(DeliveryOutcome::Saved(target))
}

/// Write to a temp file next to `path`, then rename over it.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdfPagesError> {
    let write_failed = |source| PdfPagesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    debug!("Renamed {} into place", tmp_path.display());
    Ok(())
}
