// ============================================================================
// spark-lists - Sizing Reconciler
// A section reconciler that also answers per-item size queries
// ============================================================================

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use tracing::trace;

use crate::binding::consumer::{live_counts, SharedConsumer};
use crate::binding::sections::SectionReconciler;
use crate::binding::sections::StructuralReconciler;
use crate::core::error::Result;
use crate::core::types::{IndexPath, Size};
use crate::stream::list::ObservableList;
use crate::stream::subscription::Subscription;

/// Computes the size of one item
pub type SizerFn<T> = Rc<dyn Fn(IndexPath, &T) -> Size>;

/// Per-item size queries, as asked by a layout.
pub trait SizeProvider {
    /// Size of the item at `path`. Never fails: paths the consumer has not
    /// materialized get the configured fallback.
    fn size_for_item(&self, path: IndexPath) -> Size;
}

/// A [`SectionReconciler`] plus a sizing function.
///
/// Layouts may ask for sizes at paths the consumer has not caught up with
/// yet, or while it is in the middle of an edit. Those queries are answered
/// with [`BindOptions::fallback`](crate::BindOptions::fallback) instead of
/// reaching into reconciler state.
///
/// # Example
///
/// ```
/// use spark_lists::{
///     shared, IndexPath, ObservableList, RecordingConsumer, SectionReconciler, Size,
///     SizeProvider, SizingReconciler, SnapshotSource, StructuralReconciler,
/// };
///
/// let sections = SnapshotSource::new(vec![3usize]);
/// let base = SectionReconciler::new(ObservableList::diff(sections), |n: &usize| {
///     ObservableList::of((0..*n).collect())
/// });
/// let sizing = SizingReconciler::new(base, |_, item: &usize| Size::new(100.0, *item as f64));
///
/// let consumer = shared(RecordingConsumer::new());
/// let _subscription = sizing.bind(consumer.clone()).unwrap();
/// consumer.borrow_mut().set_counts(vec![3]);
///
/// assert_eq!(sizing.size_for_item(IndexPath::new(0, 2)), Size::new(100.0, 2.0));
/// assert_eq!(sizing.size_for_item(IndexPath::new(0, 9)), Size::new(240.0, 240.0));
/// ```
pub struct SizingReconciler<S, T> {
    base: SectionReconciler<S, T>,
    sizer: SizerFn<T>,
}

impl<S: 'static, T: 'static> SizingReconciler<S, T> {
    pub fn new(
        base: SectionReconciler<S, T>,
        sizer: impl Fn(IndexPath, &T) -> Size + 'static,
    ) -> Self {
        Self {
            base,
            sizer: Rc::new(sizer),
        }
    }

    /// Build the base reconciler and the sizer in one go.
    pub fn with_sections(
        sections: ObservableList<S>,
        transformer: impl Fn(&S) -> ObservableList<T> + 'static,
        sizer: impl Fn(IndexPath, &T) -> Size + 'static,
    ) -> Self {
        Self::new(SectionReconciler::new(sections, transformer), sizer)
    }

    /// The wrapped reconciler.
    pub fn base(&self) -> &SectionReconciler<S, T> {
        &self.base
    }

    fn fallback(&self, path: IndexPath, reason: &'static str) -> Size {
        let size = self.base.options().fallback;
        trace!(%path, reason, "fallback size");
        size
    }
}

impl<S: 'static, T: 'static> SizeProvider for SizingReconciler<S, T> {
    fn size_for_item(&self, path: IndexPath) -> Size {
        let Some(consumer) = self.base.consumer() else {
            return self.fallback(path, "unbound");
        };
        let Some((sections, items)) = live_counts(&consumer, path.section) else {
            return self.fallback(path, "consumer busy");
        };
        if path.section >= sections || path.item >= items {
            return self.fallback(path, "beyond live counts");
        }

        match self
            .base
            .with_item(path, |item| (self.sizer)(path, item))
        {
            Ok(size) => size,
            Err(_) => self.fallback(path, "not bound"),
        }
    }
}

impl<S: 'static, T: Clone + 'static> StructuralReconciler<T> for SizingReconciler<S, T> {
    fn bind(&self, consumer: SharedConsumer) -> Result<Subscription> {
        self.base.bind(consumer)
    }

    fn number_of_sections(&self) -> usize {
        self.base.number_of_sections()
    }

    fn number_of_items(&self, section: usize) -> usize {
        self.base.number_of_items(section)
    }

    fn item(&self, path: IndexPath) -> Result<T> {
        self.base.item(path)
    }

    fn select_item(&self, path: IndexPath) -> Result<()> {
        self.base.select_item(path)
    }
}

impl<S, T> Deref for SizingReconciler<S, T> {
    type Target = SectionReconciler<S, T>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<S, T> Clone for SizingReconciler<S, T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            sizer: self.sizer.clone(),
        }
    }
}

impl<S, T> fmt::Debug for SizingReconciler<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizingReconciler")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
