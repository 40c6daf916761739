//! Page selection: which pages of the open document go into the extraction.
//!
//! A selection is a set of distinct 1-based page numbers. However pages were
//! added (single toggles, shift-ranges, select-all, a textual spec), the
//! extractor always consumes them in ascending order.

use crate::error::PdfPagesError;
use std::collections::BTreeSet;

/// A set of distinct 1-based page numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<usize>,
    /// Last page clicked; anchor for range extension.
    anchor: Option<usize>,
}

impl PageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection containing every page of a `total_pages` document.
    pub fn all(total_pages: usize) -> Self {
        Self {
            pages: (1..=total_pages).collect(),
            anchor: None,
        }
    }

    /// Toggle `page`, or with `extend_range` add every page between the last
    /// clicked page and `page` (inclusive).
    ///
    /// Range extension only ever adds pages. Without an anchor it behaves as
    /// a plain toggle.
    pub fn toggle(&mut self, page: usize, extend_range: bool) {
        match (extend_range, self.anchor) {
            (true, Some(anchor)) => {
                let (start, end) = (anchor.min(page), anchor.max(page));
                self.pages.extend(start..=end);
            }
            _ => {
                if !self.pages.remove(&page) {
                    self.pages.insert(page);
                }
            }
        }
        self.anchor = Some(page);
    }

    pub fn select_all(&mut self, total_pages: usize) {
        self.pages = (1..=total_pages).collect();
    }

    /// Deselect every page but keep the range anchor.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Deselect every page and forget the range anchor.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.anchor = None;
    }

    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains(&page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Selected page numbers, ascending and deduplicated.
    pub fn to_sorted_vec(&self) -> Vec<usize> {
        self.pages.iter().copied().collect()
    }

    /// Check every selected page lies in `1..=total_pages`.
    pub fn validate(&self, total_pages: usize) -> Result<(), PdfPagesError> {
        match self.pages.iter().find(|&&p| p == 0 || p > total_pages) {
            Some(&page) => Err(PdfPagesError::PageOutOfRange {
                page,
                total: total_pages,
            }),
            None => Ok(()),
        }
    }

    /// Parse a textual page spec such as `all`, `5`, `3-15` or `1,3,5-7`.
    ///
    /// Open-ended ranges (`4-`) run to the last page. Pages outside
    /// `1..=total_pages` are rejected.
    pub fn parse(spec: &str, total_pages: usize) -> Result<Self, PdfPagesError> {
        let spec = spec.trim().to_lowercase();
        if spec == "all" {
            return Ok(Self::all(total_pages));
        }

        let mut selection = Self::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(start)?;
                    let end = if end.trim().is_empty() {
                        total_pages
                    } else {
                        parse_page_number(end)?
                    };
                    if start > end {
                        return Err(PdfPagesError::InvalidConfig(format!(
                            "invalid page range '{part}': start must be <= end"
                        )));
                    }
                    selection.pages.extend(start..=end);
                }
                None => {
                    selection.pages.insert(parse_page_number(part)?);
                }
            }
        }

        selection.validate(total_pages)?;
        Ok(selection)
    }
}

impl FromIterator<usize> for PageSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
            anchor: None,
        }
    }
}

fn parse_page_number(s: &str) -> Result<usize, PdfPagesError> {
    let page: usize = s
        .trim()
        .parse()
        .map_err(|_| PdfPagesError::InvalidConfig(format!("invalid page number: '{}'", s.trim())))?;
    if page < 1 {
        return Err(PdfPagesError::InvalidConfig(
            "pages are 1-indexed, minimum is 1".into(),
        ));
    }
    Ok(page)
}
