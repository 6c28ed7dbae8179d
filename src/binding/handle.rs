// ============================================================================
// spark-lists - Bound Handles
// Owned bundles of a reconciler and the subscription driving it
// ============================================================================
//
// A handle keeps its reconciler and subscription together, so they are torn
// down together: dropping the handle disposes the binding.
// ============================================================================

use std::fmt;
use std::ops::Deref;

use crate::binding::consumer::SharedConsumer;
use crate::binding::item::ItemBinder;
use crate::binding::sections::{SectionReconciler, StructuralReconciler};
use crate::binding::sizing::SizingReconciler;
use crate::core::error::{ReconcileError, Result};
use crate::core::types::{IndexPath, Size};
use crate::stream::list::ObservableList;
use crate::stream::subscription::Subscription;

// =============================================================================
// BOUND SECTIONS
// =============================================================================

/// A bound sectioned reconciler.
///
/// Derefs to the reconciler for queries.
#[must_use = "dropping the handle disposes the binding"]
pub struct BoundSections<R> {
    reconciler: R,
    subscription: Subscription,
}

impl<R> BoundSections<R> {
    /// Bind `reconciler` to `consumer` and keep both together.
    pub fn bind<T>(reconciler: R, consumer: SharedConsumer) -> Result<Self>
    where
        R: StructuralReconciler<T>,
    {
        let subscription = reconciler.bind(consumer)?;
        Ok(Self {
            reconciler,
            subscription,
        })
    }

    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Stop reconciling. Idempotent.
    pub fn dispose(&self) {
        self.subscription.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.subscription.is_disposed()
    }
}

impl<S: 'static, T: 'static> BoundSections<SectionReconciler<S, T>> {
    /// The consistency violation that stopped the reconciler or, failing
    /// that, the first section that stopped.
    pub fn error(&self) -> Option<ReconcileError> {
        first_fault(&self.reconciler)
    }
}

impl<S: 'static, T: 'static> BoundSections<SizingReconciler<S, T>> {
    /// The consistency violation that stopped the reconciler or, failing
    /// that, the first section that stopped.
    pub fn error(&self) -> Option<ReconcileError> {
        first_fault(self.reconciler.base())
    }
}

fn first_fault<S: 'static, T: 'static>(
    reconciler: &SectionReconciler<S, T>,
) -> Option<ReconcileError> {
    reconciler.error().or_else(|| {
        reconciler
            .section_faults()
            .into_iter()
            .next()
            .map(|(_, err)| err)
    })
}

impl<R> Deref for BoundSections<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.reconciler
    }
}

impl<R: fmt::Debug> fmt::Debug for BoundSections<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSections")
            .field("reconciler", &self.reconciler)
            .field("disposed", &self.subscription.is_disposed())
            .finish()
    }
}

// =============================================================================
// BOUND LIST
// =============================================================================

/// A flat list bound as section 0 of a consumer.
#[must_use = "dropping the handle disposes the binding"]
pub struct BoundList<T> {
    binder: ItemBinder<T>,
    subscription: Subscription,
}

impl<T: 'static> BoundList<T> {
    pub fn binder(&self) -> &ItemBinder<T> {
        &self.binder
    }

    pub fn number_of_items(&self) -> usize {
        self.binder.number_of_items()
    }

    pub fn item(&self, index: usize) -> Result<T>
    where
        T: Clone,
    {
        self.binder.item(index)
    }

    pub fn dispose(&self) {
        self.subscription.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.subscription.is_disposed()
    }

    /// The consistency violation that stopped the binder, if any.
    pub fn error(&self) -> Option<ReconcileError> {
        self.binder.fault()
    }
}

impl<T> fmt::Debug for BoundList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundList")
            .field("binder", &self.binder)
            .field("disposed", &self.subscription.is_disposed())
            .finish()
    }
}

// =============================================================================
// LIST BINDING
// =============================================================================

impl<T: 'static> ObservableList<T> {
    /// Bind this list as the single section of `consumer`.
    ///
    /// ```
    /// use spark_lists::{shared, ObservableList, RecordingConsumer, SnapshotSource};
    ///
    /// let source = SnapshotSource::new(vec!['a', 'b']);
    /// let bound = ObservableList::diff(source.clone())
    ///     .bind(shared(RecordingConsumer::new()))
    ///     .unwrap();
    ///
    /// source.push(vec!['b']);
    /// assert_eq!(bound.number_of_items(), 1);
    /// assert_eq!(bound.item(0), Ok('b'));
    /// ```
    pub fn bind(&self, consumer: SharedConsumer) -> Result<BoundList<T>> {
        let binder = ItemBinder::new(self.updates(), 0);
        let subscription = binder.bind(consumer)?;
        Ok(BoundList {
            binder,
            subscription,
        })
    }

    /// Treat each element as a section whose items come from `transformer`.
    pub fn bind_sections<U: Clone + 'static>(
        &self,
        consumer: SharedConsumer,
        transformer: impl Fn(&T) -> ObservableList<U> + 'static,
    ) -> Result<BoundSections<SectionReconciler<T, U>>> {
        BoundSections::bind::<U>(SectionReconciler::new(self.clone(), transformer), consumer)
    }

    /// Like [`bind_sections`](Self::bind_sections), also answering size
    /// queries through `sizer`.
    pub fn bind_sized_sections<U: Clone + 'static>(
        &self,
        consumer: SharedConsumer,
        transformer: impl Fn(&T) -> ObservableList<U> + 'static,
        sizer: impl Fn(IndexPath, &U) -> Size + 'static,
    ) -> Result<BoundSections<SizingReconciler<T, U>>> {
        BoundSections::bind::<U>(
            SizingReconciler::with_sections(self.clone(), transformer, sizer),
            consumer,
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::consumer::{shared, ConsumerCall, RecordingConsumer};
    use crate::binding::sizing::SizeProvider;
    use crate::core::types::{sequence, Change, Update};
    use crate::stream::observable::{Just, SnapshotSource};

    #[test]
    fn dropping_handle_disposes_binding() {
        let source = SnapshotSource::new(vec![vec![1, 2]]);
        let consumer = shared(RecordingConsumer::new());
        let bound = ObservableList::diff(source.clone())
            .bind_sections(consumer.clone(), |items: &Vec<i32>| {
                ObservableList::of(items.clone())
            })
            .unwrap();
        let binder = bound.binder(0).unwrap();
        assert_eq!(source.observer_count(), 1);

        drop(bound);

        assert!(binder.is_disposed());
        assert_eq!(source.observer_count(), 0);
        let before = consumer.borrow().calls().len();
        source.push(vec![]);
        assert_eq!(consumer.borrow().calls().len(), before);
    }

    #[test]
    fn flat_list_edits_section_zero() {
        let source = SnapshotSource::new(vec![1, 2]);
        let consumer = shared(RecordingConsumer::new());
        let bound = ObservableList::diff(source.clone())
            .bind(consumer.clone())
            .unwrap();

        source.push(vec![1, 2, 3]);

        assert_eq!(bound.number_of_items(), 3);
        assert!(consumer
            .borrow()
            .calls()
            .contains(&ConsumerCall::InsertItem(IndexPath::new(0, 2))));
        bound.dispose();
        assert!(bound.is_disposed());
    }

    #[test]
    fn sized_sections_answer_size_queries() {
        let source = SnapshotSource::new(vec![2u32]);
        let consumer = shared(RecordingConsumer::new());
        let bound = ObservableList::diff(source)
            .bind_sized_sections(
                consumer.clone(),
                |n: &u32| ObservableList::of((0..*n).collect()),
                |_, item: &u32| Size::new(10.0, f64::from(*item)),
            )
            .unwrap();
        consumer.borrow_mut().set_counts(vec![2]);

        assert_eq!(bound.size_for_item(IndexPath::new(0, 1)), Size::new(10.0, 1.0));
        assert_eq!(bound.error(), None);
    }

    #[test]
    fn error_reports_stopped_section() {
        let source = SnapshotSource::new(vec!["ok", "bad"]);
        let bound = ObservableList::diff(source)
            .bind_sections(shared(RecordingConsumer::new()), |name: &&'static str| {
                if *name == "bad" {
                    let broken = Update::new(sequence([1]), vec![Change::Reload, Change::Delete(0)]);
                    ObservableList::from_updates(Just::new(broken))
                } else {
                    ObservableList::of(vec![1])
                }
            })
            .unwrap();

        assert_eq!(bound.error(), Some(ReconcileError::MixedReload { changes: 1 }));
        assert!(!bound.is_disposed());
        assert_eq!(bound.number_of_items(0), 1);
        assert_eq!(bound.number_of_items(1), 0);
    }
}
