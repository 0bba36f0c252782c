use crate::ansi::StyledSegment;
use std::sync::{Arc, RwLock};

/// A live display surface for styled log lines.
///
/// Implementations wrap a concrete UI element (a text widget, a scrollback
/// buffer). [`render`] is called from the pipeline's dispatch thread, one
/// call per formatted line, and must cap retained lines at the configured
/// maximum by evicting the oldest.
///
/// [`render`]: TextView::render
pub trait TextView: Send + Sync {
    /// Cap the number of rendered lines this view keeps.
    fn set_max_lines(&self, max_lines: usize);

    /// Render one formatted line, already decoded into styled segments in
    /// left-to-right order.
    fn render(&self, segments: &[StyledSegment<'_>]);
}

/// The set of views receiving dispatched lines.
///
/// Views are added and removed from arbitrary threads as UI surfaces
/// appear and disappear; the dispatch loop iterates a snapshot, so
/// mutation during dispatch is safe. Identity is the `Arc` allocation.
#[derive(Default)]
pub struct TextViewRegistry {
    views: RwLock<Vec<Arc<dyn TextView>>>,
}

impl TextViewRegistry {
    pub fn new() -> Self {
        TextViewRegistry::default()
    }

    pub fn add(&self, view: Arc<dyn TextView>) {
        let mut views = self.write();
        if !views.iter().any(|existing| Arc::ptr_eq(existing, &view)) {
            views.push(view);
        }
    }

    pub fn remove(&self, view: &Arc<dyn TextView>) {
        self.write().retain(|existing| !Arc::ptr_eq(existing, view));
    }

    /// Current views; the returned list is stable while dispatch uses it.
    pub fn snapshot(&self) -> Vec<Arc<dyn TextView>> {
        self.views
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Push a new retention cap to every registered view.
    pub fn set_max_lines(&self, max_lines: usize) {
        for view in self.snapshot() {
            view.set_max_lines(max_lines);
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn TextView>>> {
        self.views
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingView {
        rendered: AtomicUsize,
        max_lines: AtomicUsize,
    }

    impl CountingView {
        fn new() -> Arc<Self> {
            Arc::new(CountingView {
                rendered: AtomicUsize::new(0),
                max_lines: AtomicUsize::new(0),
            })
        }
    }

    impl TextView for CountingView {
        fn set_max_lines(&self, max_lines: usize) {
            self.max_lines.store(max_lines, Ordering::SeqCst);
        }

        fn render(&self, _segments: &[StyledSegment<'_>]) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn add_is_idempotent_per_allocation() {
        let registry = TextViewRegistry::new();
        let view = CountingView::new();
        registry.add(view.clone());
        registry.add(view.clone());
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn remove_detaches_only_the_given_view() {
        let registry = TextViewRegistry::new();
        let first = CountingView::new();
        let second = CountingView::new();
        registry.add(first.clone());
        registry.add(second.clone());

        registry.remove(&(first.clone() as Arc<dyn TextView>));
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &(second as Arc<dyn TextView>)));
    }

    #[test]
    fn retention_cap_reaches_every_view() {
        let registry = TextViewRegistry::new();
        let first = CountingView::new();
        let second = CountingView::new();
        registry.add(first.clone());
        registry.add(second.clone());

        registry.set_max_lines(42);
        assert_eq!(first.max_lines.load(Ordering::SeqCst), 42);
        assert_eq!(second.max_lines.load(Ordering::SeqCst), 42);
    }
}
