//! Output types for extract and merge operations.

use serde::Serialize;

/// File name used when a merge has no items to name it after.
pub const DEFAULT_MERGED_NAME: &str = "merged.pdf";

const EXTRACT_SUFFIX: &str = "_selected.pdf";
const MERGE_SUFFIX: &str = "_merged.pdf";

/// Which strategy produced a source's pages in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyPath {
    /// Page objects copied losslessly from the source.
    Structural,
    /// Pages rendered to images and embedded at native size.
    Rasterized,
}

/// How one source contributed to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Display name of the source.
    pub name: String,
    pub path: AssemblyPath,
    /// Number of output pages that came from this source.
    pub pages: usize,
}

/// A freshly produced PDF ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifact {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Suggested file name for delivery.
    pub file_name: String,
    /// Pages in the output.
    pub page_count: usize,
    /// One entry per source, in output order.
    pub sources: Vec<SourceReport>,
}

impl OutputArtifact {
    /// True if any source had to be rasterised.
    pub fn used_fallback(&self) -> bool {
        self.sources
            .iter()
            .any(|s| s.path == AssemblyPath::Rasterized)
    }
}

/// Strip a trailing `.pdf`, ignoring case.
pub fn base_name(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4
        && file_name.is_char_boundary(len - 4)
        && file_name[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        &file_name[..len - 4]
    } else {
        file_name
    }
}

/// `report.pdf` → `report_selected.pdf`.
pub fn extraction_file_name(source_name: &str) -> String {
    format!("{}{}", base_name(source_name), EXTRACT_SUFFIX)
}

/// Name a merge after its first item.
///
/// No items gives [`DEFAULT_MERGED_NAME`]; a single item keeps its own name
/// unchanged; two or more give `<first>_merged.pdf`.
pub fn merged_file_name<S: AsRef<str>>(item_names: &[S]) -> String {
    match item_names {
        [] => DEFAULT_MERGED_NAME.to_string(),
        [only] => only.as_ref().to_string(),
        [first, ..] => format!("{}{}", base_name(first.as_ref()), MERGE_SUFFIX),
    }
}

/// Sum of recorded page counts.
pub fn total_page_count(counts: impl IntoIterator<Item = usize>) -> usize {
    counts.into_iter().sum()
}
