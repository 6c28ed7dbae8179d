// ============================================================================
// spark-lists - Section Reconciler
// Applies section-level edit scripts to a consumer while keeping one item
// binder per section alive, indexed and subscribed
// ============================================================================
//
// Per update:
// - reload: dispose every binder (last to first), bind a fresh binder per
//   section (first to last), then one unconditional consumer reload
// - incremental: one consumer batch; the section list is replaced first,
//   then each change is applied in order:
//     insert -> shift later binders up, bind a new binder, insert_section
//     delete -> remove and dispose the binder, delete_section
//     move   -> reposition the binder (keeping its subscription), move_section
//   and every binder is renumbered to its position before the batch closes
//
// Scripts are validated against the committed state before anything is
// touched. A violation faults the reconciler: binders are released and
// later updates are ignored.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace};

use crate::binding::consumer::{BatchGuard, SharedConsumer};
use crate::binding::item::ItemBinder;
use crate::binding::options::BindOptions;
use crate::core::constants::*;
use crate::core::context::dispatch;
use crate::core::error::{ReconcileError, Result};
use crate::core::types::{Change, IndexPath, Sequence, Update};
use crate::stream::list::ObservableList;
use crate::stream::observable::Observable;
use crate::stream::subscription::Subscription;

/// Maps a section value to the list of its items
pub type SectionTransformer<S, T> = Box<dyn Fn(&S) -> ObservableList<T>>;

/// Callback invoked with a selected item
pub type SelectFn<T> = Box<dyn Fn(&T)>;

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Structural side of a sectioned data source: binding plus the queries a
/// consumer makes while laying out and interacting.
pub trait StructuralReconciler<T> {
    /// Start reconciling into `consumer`.
    fn bind(&self, consumer: SharedConsumer) -> Result<Subscription>;

    /// Sections in the last applied update; zero before the first one.
    fn number_of_sections(&self) -> usize;

    /// Items bound in `section`; zero when unknown.
    fn number_of_items(&self, section: usize) -> usize;

    /// The item at `path`.
    fn item(&self, path: IndexPath) -> Result<T>;

    /// Report the item at `path` as selected.
    fn select_item(&self, path: IndexPath) -> Result<()>;
}

// =============================================================================
// STATE
// =============================================================================

/// One section's binder together with the subscription feeding it.
struct BoundSection<T> {
    binder: ItemBinder<T>,
    subscription: Subscription,
}

enum Phase<S, T> {
    /// No update applied yet
    Unbound,
    /// `sections` and `bound` are parallel: same length, same order
    Live {
        sections: Sequence<S>,
        bound: Vec<BoundSection<T>>,
    },
    /// Stopped by a consistency violation
    Faulted(ReconcileError),
    /// Torn down
    Disposed,
}

struct ReconcilerInner<S, T> {
    flags: Cell<u32>,
    updates: Rc<dyn Observable<Update<S>>>,
    transformer: SectionTransformer<S, T>,
    on_select: Option<SelectFn<T>>,
    options: BindOptions,
    phase: RefCell<Phase<S, T>>,
    consumer: RefCell<Option<SharedConsumer>>,
}

impl<S: 'static, T: 'static> ReconcilerInner<S, T> {
    fn has_flag(&self, flag: u32) -> bool {
        (self.flags.get() & flag) != 0
    }

    fn set_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    fn clear_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() & !flag);
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    fn receive(&self, consumer: &SharedConsumer, update: Update<S>) {
        if self.has_flag(DISPOSED | FAULTED) {
            return;
        }

        self.set_flag(APPLYING);
        let result = self.apply(consumer, update);
        self.clear_flag(APPLYING);

        if let Err(err) = result {
            error!(%err, "section reconciler faulted");
            self.set_flag(FAULTED);
            self.release(Phase::Faulted(err));
        } else if self.has_flag(DISPOSED) {
            // Disposed from a consumer callback while the batch was open.
            self.release(Phase::Disposed);
        }
    }

    fn apply(&self, consumer: &SharedConsumer, update: Update<S>) -> Result<()> {
        update.validate(self.committed_len())?;

        if update.is_reload() {
            self.reload(consumer, update)
        } else {
            self.apply_incremental(consumer, update)
        }
    }

    fn committed_len(&self) -> usize {
        match &*self.phase.borrow() {
            Phase::Live { bound, .. } => bound.len(),
            _ => 0,
        }
    }

    fn bind_section(
        &self,
        consumer: &SharedConsumer,
        section: &S,
        index: usize,
    ) -> Result<BoundSection<T>> {
        let items = (self.transformer)(section);
        let binder = ItemBinder::new(items.updates(), index);
        let subscription = binder.bind(consumer.clone())?;
        Ok(BoundSection {
            binder,
            subscription,
        })
    }

    /// Run `f` on the live binder list, promoting `Unbound` to an empty live
    /// state first. The borrow never spans a consumer call.
    fn with_bound<R>(&self, f: impl FnOnce(&mut Vec<BoundSection<T>>) -> R) -> R {
        let mut phase = self.phase.borrow_mut();
        if !matches!(*phase, Phase::Live { .. }) {
            *phase = Phase::Live {
                sections: Rc::from(Vec::new()),
                bound: Vec::new(),
            };
        }
        match &mut *phase {
            Phase::Live { bound, .. } => f(bound),
            _ => f(&mut Vec::new()),
        }
    }

    fn set_sections(&self, list: Sequence<S>) {
        self.with_bound(|_| ());
        if let Phase::Live { sections, .. } = &mut *self.phase.borrow_mut() {
            *sections = list;
        }
    }

    // =========================================================================
    // RELOAD
    // =========================================================================

    fn reload(&self, consumer: &SharedConsumer, update: Update<S>) -> Result<()> {
        let previous = std::mem::replace(&mut *self.phase.borrow_mut(), Phase::Unbound);
        if let Phase::Live { bound, .. } = previous {
            for entry in bound.into_iter().rev() {
                entry.subscription.dispose();
            }
        }

        let mut bound = Vec::with_capacity(update.len());
        for (index, section) in update.list.iter().enumerate() {
            bound.push(self.bind_section(consumer, section, index)?);
        }

        debug!(sections = bound.len(), "sections reloaded");
        *self.phase.borrow_mut() = Phase::Live {
            sections: update.list,
            bound,
        };

        if !self.has_flag(DISPOSED) {
            consumer.borrow_mut().reload();
        }
        Ok(())
    }

    // =========================================================================
    // INCREMENTAL
    // =========================================================================

    fn apply_incremental(&self, consumer: &SharedConsumer, update: Update<S>) -> Result<()> {
        debug!(
            sections = update.len(),
            changes = update.changes.len(),
            "section batch"
        );

        self.set_sections(update.list.clone());
        if update.changes.is_empty() {
            return Ok(());
        }

        let _batch = BatchGuard::open(consumer);

        for change in update.changes.iter() {
            if self.has_flag(DISPOSED) {
                break;
            }
            trace!(%change, "applying section change");

            match *change {
                Change::Insert(index) => {
                    self.with_bound(|bound| {
                        for (position, entry) in bound.iter().enumerate().skip(index) {
                            entry.binder.set_section_index(position + 1);
                        }
                    });
                    let entry = self.bind_section(consumer, &update.list[index], index)?;
                    self.with_bound(|bound| bound.insert(index, entry));
                    consumer.borrow_mut().insert_section(index);
                }
                Change::Delete(index) => {
                    let removed = self.with_bound(|bound| bound.remove(index));
                    removed.subscription.dispose();
                    consumer.borrow_mut().delete_section(index);
                }
                Change::Move { from, to } => {
                    self.with_bound(|bound| {
                        let entry = bound.remove(from);
                        entry.binder.set_section_index(to);
                        bound.insert(to, entry);
                    });
                    consumer.borrow_mut().move_section(from, to);
                }
                // Rejected by validate().
                Change::Reload => {}
            }
        }

        self.with_bound(|bound| {
            for (position, entry) in bound.iter().enumerate() {
                entry.binder.set_section_index(position);
            }
        });
        Ok(())
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    fn teardown(&self) {
        self.set_flag(DISPOSED);
        self.clear_flag(ACTIVE);
        if self.has_flag(APPLYING) {
            // receive() releases once the open batch is closed.
            return;
        }
        if self.has_flag(FAULTED) {
            // Binders are already released; keep the fault readable.
            *self.consumer.borrow_mut() = None;
            return;
        }
        self.release(Phase::Disposed);
    }

    /// Dispose every binder (last to first) and park in `next`.
    fn release(&self, next: Phase<S, T>) {
        let Ok(mut phase) = self.phase.try_borrow_mut() else {
            error!("section state busy during release; binders left subscribed");
            return;
        };
        let previous = std::mem::replace(&mut *phase, next);
        drop(phase);

        if let Phase::Live { bound, .. } = previous {
            for entry in bound.into_iter().rev() {
                entry.subscription.dispose();
            }
        }
        *self.consumer.borrow_mut() = None;
    }
}

// =============================================================================
// SECTION RECONCILER
// =============================================================================

/// Reconciles a stream of section updates into a consumer, one
/// [`ItemBinder`] per section.
///
/// # Example
///
/// ```
/// use spark_lists::{
///     shared, ConsumerCall, ObservableList, RecordingConsumer, SectionReconciler,
///     SnapshotSource, StructuralReconciler,
/// };
///
/// let sections = SnapshotSource::new(vec!["A", "B"]);
/// let reconciler = SectionReconciler::new(
///     ObservableList::diff(sections.clone()),
///     |section: &&str| ObservableList::of(vec![section.to_lowercase()]),
/// );
///
/// let consumer = shared(RecordingConsumer::new());
/// let _subscription = reconciler.bind(consumer.clone()).unwrap();
/// assert_eq!(reconciler.number_of_sections(), 2);
///
/// sections.push(vec!["A", "C", "B"]);
/// assert_eq!(consumer.borrow().section_edits().last(), Some(&ConsumerCall::InsertSection(1)));
/// assert_eq!(reconciler.section_indices(), vec![0, 1, 2]);
/// ```
pub struct SectionReconciler<S, T> {
    inner: Rc<ReconcilerInner<S, T>>,
}

impl<S: 'static, T: 'static> SectionReconciler<S, T> {
    /// Create a reconciler over `sections`, building each section's items
    /// with `transformer`.
    pub fn new(
        sections: ObservableList<S>,
        transformer: impl Fn(&S) -> ObservableList<T> + 'static,
    ) -> Self {
        Self::builder(sections, transformer).build()
    }

    /// Start configuring a reconciler.
    pub fn builder(
        sections: ObservableList<S>,
        transformer: impl Fn(&S) -> ObservableList<T> + 'static,
    ) -> SectionReconcilerBuilder<S, T> {
        SectionReconcilerBuilder {
            sections,
            transformer: Box::new(transformer),
            on_select: None,
            options: BindOptions::default(),
        }
    }

    /// Options this reconciler was built with.
    pub fn options(&self) -> BindOptions {
        self.inner.options
    }

    /// The consumer bound to, while bound.
    pub fn consumer(&self) -> Option<SharedConsumer> {
        self.inner.consumer.borrow().clone()
    }

    /// Whether at least one update has been applied and the reconciler is
    /// still running.
    pub fn is_live(&self) -> bool {
        matches!(*self.inner.phase.borrow(), Phase::Live { .. })
    }

    /// Whether the binding was disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.has_flag(DISPOSED)
    }

    /// The consistency violation that stopped this reconciler, if any.
    pub fn error(&self) -> Option<ReconcileError> {
        match &*self.inner.phase.borrow() {
            Phase::Faulted(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// The section value at `index`.
    pub fn section(&self, index: usize) -> Result<S>
    where
        S: Clone,
    {
        match &*self.inner.phase.borrow() {
            Phase::Live { sections, .. } => {
                sections
                    .get(index)
                    .cloned()
                    .ok_or(ReconcileError::OutOfRange {
                        index,
                        len: sections.len(),
                    })
            }
            _ => Err(ReconcileError::NotBound),
        }
    }

    /// The current section list.
    pub fn sections(&self) -> Option<Sequence<S>> {
        match &*self.inner.phase.borrow() {
            Phase::Live { sections, .. } => Some(sections.clone()),
            _ => None,
        }
    }

    /// Handle to the binder of `section`.
    pub fn binder(&self, section: usize) -> Option<ItemBinder<T>> {
        match &*self.inner.phase.borrow() {
            Phase::Live { bound, .. } => bound.get(section).map(|entry| entry.binder.clone()),
            _ => None,
        }
    }

    /// Section index recorded by each binder, in position order.
    pub fn section_indices(&self) -> Vec<usize> {
        match &*self.inner.phase.borrow() {
            Phase::Live { bound, .. } => bound
                .iter()
                .map(|entry| entry.binder.section_index())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Sections whose item binder stopped on a consistency violation, with
    /// the violation. These sections keep their last good items.
    pub fn section_faults(&self) -> Vec<(usize, ReconcileError)> {
        match &*self.inner.phase.borrow() {
            Phase::Live { bound, .. } => bound
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| entry.binder.fault().map(|err| (index, err)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Run `f` on the item at `path`.
    pub fn with_item<R>(&self, path: IndexPath, f: impl FnOnce(&T) -> R) -> Result<R> {
        let binder = match &*self.inner.phase.borrow() {
            Phase::Live { bound, .. } => bound
                .get(path.section)
                .map(|entry| entry.binder.clone())
                .ok_or(ReconcileError::OutOfRange {
                    index: path.section,
                    len: bound.len(),
                })?,
            _ => return Err(ReconcileError::NotBound),
        };
        binder.with_item(path.item, f)
    }

    /// Hand the item at `path` to a cell factory.
    pub fn cell_for_item<V>(
        &self,
        path: IndexPath,
        factory: impl FnOnce(IndexPath, &T) -> V,
    ) -> Result<V> {
        self.with_item(path, |item| factory(path, item))
    }
}

impl<S: 'static, T: Clone + 'static> StructuralReconciler<T> for SectionReconciler<S, T> {
    fn bind(&self, consumer: SharedConsumer) -> Result<Subscription> {
        if self.inner.has_flag(ACTIVE | DISPOSED) {
            return Err(ReconcileError::AlreadyBound);
        }
        self.inner.set_flag(ACTIVE);
        *self.inner.consumer.borrow_mut() = Some(consumer.clone());

        // The delivery closure owns the reconciler state; the state never
        // owns this subscription. Updates are always applied on the
        // delivery context, whatever thread of control the source emits on.
        let state = self.inner.clone();
        let stream = self.inner.updates.subscribe(Box::new(move |update: Update<S>| {
            let state = state.clone();
            let consumer = consumer.clone();
            dispatch(move || state.receive(&consumer, update));
        }));

        let state = self.inner.clone();
        let subscription = Subscription::new(move || state.teardown());
        subscription.add(stream);
        Ok(subscription)
    }

    fn number_of_sections(&self) -> usize {
        match &*self.inner.phase.borrow() {
            Phase::Live { sections, .. } => sections.len(),
            _ => 0,
        }
    }

    fn number_of_items(&self, section: usize) -> usize {
        match &*self.inner.phase.borrow() {
            Phase::Live { bound, .. } => bound
                .get(section)
                .map_or(0, |entry| entry.binder.number_of_items()),
            _ => 0,
        }
    }

    fn item(&self, path: IndexPath) -> Result<T> {
        self.with_item(path, T::clone)
    }

    fn select_item(&self, path: IndexPath) -> Result<()> {
        let item = self.item(path)?;
        if let Some(on_select) = &self.inner.on_select {
            on_select(&item);
        }
        Ok(())
    }
}

impl<S, T> Clone for SectionReconciler<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, T> fmt::Debug for SectionReconciler<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &*self.inner.phase.borrow() {
            Phase::Unbound => "unbound".to_string(),
            Phase::Live { bound, .. } => format!("live({} sections)", bound.len()),
            Phase::Faulted(err) => format!("faulted({err})"),
            Phase::Disposed => "disposed".to_string(),
        };
        f.debug_struct("SectionReconciler")
            .field("phase", &phase)
            .field("flags", &self.inner.flags.get())
            .finish()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Configures a [`SectionReconciler`].
pub struct SectionReconcilerBuilder<S, T> {
    sections: ObservableList<S>,
    transformer: SectionTransformer<S, T>,
    on_select: Option<SelectFn<T>>,
    options: BindOptions,
}

impl<S: 'static, T: 'static> SectionReconcilerBuilder<S, T> {
    /// Callback for [`StructuralReconciler::select_item`].
    pub fn on_select(mut self, on_select: impl Fn(&T) + 'static) -> Self {
        self.on_select = Some(Box::new(on_select));
        self
    }

    pub fn options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> SectionReconciler<S, T> {
        SectionReconciler {
            inner: Rc::new(ReconcilerInner {
                flags: Cell::new(0),
                updates: self.sections.updates(),
                transformer: self.transformer,
                on_select: self.on_select,
                options: self.options,
                phase: RefCell::new(Phase::Unbound),
                consumer: RefCell::new(None),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
