//! Progress-callback trait for per-page events.
//!
//! Every multi-page operation (thumbnail generation, extraction, merge)
//! processes pages strictly one after another and reports through
//! [`PageProgress`] after each page, so a caller can drive a percentage bar
//! between pages.
//!
//! Any `Fn(usize, usize)` closure is a valid progress sink:
//!
//! ```rust
//! use edgequake_pdfpages::PageProgress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let last = AtomicUsize::new(0);
//! let sink = |current: usize, _total: usize| last.store(current, Ordering::SeqCst);
//! sink.on_page(3, 10);
//! assert_eq!(last.load(Ordering::SeqCst), 3);
//! ```

/// Which operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Thumbnails,
    Extract,
    Merge,
}

/// Called by page operations as they process each page.
///
/// All methods except [`PageProgress::on_page`] have default no-op
/// implementations so callers only override what they care about.
pub trait PageProgress: Send + Sync {
    /// Called once before the first page.
    fn on_start(&self, operation: Operation, total_pages: usize) {
        let _ = (operation, total_pages);
    }

    /// Called after each page completes.
    ///
    /// # Arguments
    /// * `current`: 1-based count of pages completed so far
    /// * `total`  : number of pages the operation will produce
    fn on_page(&self, current: usize, total: usize);

    /// Called when a source could not be copied losslessly and its pages
    /// will be rebuilt from rendered images.
    fn on_fallback(&self, source_name: &str, reason: &str) {
        let _ = (source_name, reason);
    }

    /// Called once after the last page.
    fn on_complete(&self, operation: Operation, total_pages: usize) {
        let _ = (operation, total_pages);
    }
}

impl<F> PageProgress for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_page(&self, current: usize, total: usize) {
        self(current, total)
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl PageProgress for NoopProgress {
    fn on_page(&self, _current: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingProgress {
        pages: Mutex<Vec<(usize, usize)>>,
        fallbacks: AtomicUsize,
    }

    impl PageProgress for TrackingProgress {
        fn on_page(&self, current: usize, total: usize) {
            self.pages.lock().unwrap().push((current, total));
        }

        fn on_fallback(&self, _source_name: &str, _reason: &str) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_progress_does_not_panic() {
        let p = NoopProgress;
        p.on_start(Operation::Merge, 3);
        p.on_page(1, 3);
        p.on_fallback("a.pdf", "document is encrypted");
        p.on_complete(Operation::Merge, 3);
    }

    #[test]
    fn tracking_progress_receives_events() {
        let t = TrackingProgress {
            pages: Mutex::new(Vec::new()),
            fallbacks: AtomicUsize::new(0),
        };
        t.on_page(1, 2);
        t.on_page(2, 2);
        t.on_fallback("x.pdf", "encrypted");
        assert_eq!(*t.pages.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(t.fallbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closure_is_a_progress_sink() {
        let count = AtomicUsize::new(0);
        let sink = |_c: usize, _t: usize| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        let dyn_sink: &dyn PageProgress = &sink;
        dyn_sink.on_page(1, 1);
        dyn_sink.on_complete(Operation::Extract, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
