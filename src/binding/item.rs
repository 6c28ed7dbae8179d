// ============================================================================
// spark-lists - Item Binder
// Binds one Update<T> stream to the items of one consumer section
// ============================================================================
//
// The binder owns the last bound snapshot of its section and applies each
// update to the consumer at row granularity:
// - reload: store the snapshot, reload the section
// - incremental: one batch with insert/delete/move item edits
//
// The section index is mutable. The parent reconciler reassigns it when
// sibling sections are inserted, deleted or moved.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace};

use crate::binding::consumer::{BatchGuard, SharedConsumer};
use crate::core::constants::*;
use crate::core::context::dispatch;
use crate::core::error::{ReconcileError, Result};
use crate::core::types::{Change, IndexPath, Sequence, Update};
use crate::stream::observable::Observable;
use crate::stream::subscription::Subscription;

// =============================================================================
// ITEM BINDER INNER
// =============================================================================

struct ItemBinderInner<T> {
    flags: Cell<u32>,
    section_index: Cell<usize>,
    current: RefCell<Option<Sequence<T>>>,
    updates: Rc<dyn Observable<Update<T>>>,
    fault: RefCell<Option<ReconcileError>>,
}

impl<T> ItemBinderInner<T> {
    fn has_flag(&self, flag: u32) -> bool {
        (self.flags.get() & flag) != 0
    }

    fn set_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    fn is_stopped(&self) -> bool {
        self.has_flag(DISPOSED | FAULTED)
    }

    fn apply(&self, consumer: &SharedConsumer, update: Update<T>) -> Result<()> {
        if self.is_stopped() {
            return Ok(());
        }

        let previous_len = self.current.borrow().as_ref().map_or(0, |list| list.len());
        update.validate(previous_len)?;

        let section = self.section_index.get();

        if update.is_reload() {
            debug!(section, items = update.len(), "items reloaded");
            *self.current.borrow_mut() = Some(update.list);
            self.set_flag(BOUND);
            consumer.borrow_mut().reload_section(section);
            return Ok(());
        }

        *self.current.borrow_mut() = Some(update.list);
        self.set_flag(BOUND);
        if update.changes.is_empty() {
            return Ok(());
        }

        trace!(section, changes = update.changes.len(), "item batch");
        let _batch = BatchGuard::open(consumer);
        for change in update.changes.iter() {
            if self.has_flag(DISPOSED) {
                break;
            }
            let mut consumer = consumer.borrow_mut();
            match *change {
                Change::Insert(item) => consumer.insert_item(IndexPath::new(section, item)),
                Change::Delete(item) => consumer.delete_item(IndexPath::new(section, item)),
                Change::Move { from, to } => consumer
                    .move_item(IndexPath::new(section, from), IndexPath::new(section, to)),
                // Rejected by validate().
                Change::Reload => {}
            }
        }
        Ok(())
    }
}

// =============================================================================
// ITEM BINDER
// =============================================================================

/// Item-level binder for one section.
///
/// Reports zero items and refuses item lookups until its first snapshot
/// arrives.
pub struct ItemBinder<T> {
    inner: Rc<ItemBinderInner<T>>,
}

impl<T: 'static> ItemBinder<T> {
    /// Create a binder for `updates`, initially at `section_index`.
    pub fn new(updates: Rc<dyn Observable<Update<T>>>, section_index: usize) -> Self {
        Self {
            inner: Rc::new(ItemBinderInner {
                flags: Cell::new(0),
                section_index: Cell::new(section_index),
                current: RefCell::new(None),
                updates,
                fault: RefCell::new(None),
            }),
        }
    }

    /// Start applying updates to `consumer`.
    ///
    /// Disposing the returned subscription stops all further consumer
    /// edits from this binder. A binder binds at most once.
    pub fn bind(&self, consumer: SharedConsumer) -> Result<Subscription> {
        if self.inner.has_flag(ACTIVE | DISPOSED) {
            return Err(ReconcileError::AlreadyBound);
        }
        self.inner.set_flag(ACTIVE);

        // The delivery closure owns the binder state; the state never owns
        // the subscription, so there is no cycle. Every update goes through
        // dispatch, even from sources that emit synchronously.
        let state = self.inner.clone();
        let stream = self.inner.updates.subscribe(Box::new(move |update: Update<T>| {
            let state = state.clone();
            let consumer = consumer.clone();
            dispatch(move || {
                if let Err(err) = state.apply(&consumer, update) {
                    error!(section = state.section_index.get(), %err, "item binder faulted");
                    state.set_flag(FAULTED);
                    *state.fault.borrow_mut() = Some(err);
                }
            });
        }));

        let state = self.inner.clone();
        let subscription = Subscription::new(move || {
            state.flags.set((state.flags.get() & !ACTIVE) | DISPOSED);
        });
        subscription.add(stream);
        Ok(subscription)
    }

    /// Current section index.
    pub fn section_index(&self) -> usize {
        self.inner.section_index.get()
    }

    pub(crate) fn set_section_index(&self, index: usize) {
        self.inner.section_index.set(index);
    }

    /// Items in the last bound snapshot; zero before the first bind.
    pub fn number_of_items(&self) -> usize {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map_or(0, |list| list.len())
    }

    /// The last bound snapshot.
    pub fn current_list(&self) -> Option<Sequence<T>> {
        self.inner.current.borrow().clone()
    }

    /// Whether the first snapshot has been bound.
    pub fn is_bound(&self) -> bool {
        self.inner.has_flag(BOUND)
    }

    /// Whether the binder's subscription was disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.has_flag(DISPOSED)
    }

    /// The consistency violation that stopped this binder, if any.
    pub fn fault(&self) -> Option<ReconcileError> {
        self.inner.fault.borrow().clone()
    }

    /// Run `f` on the item at `index`.
    pub fn with_item<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Result<R> {
        let current = self.inner.current.borrow();
        let list = current.as_ref().ok_or(ReconcileError::NotBound)?;
        let item = list.get(index).ok_or(ReconcileError::OutOfRange {
            index,
            len: list.len(),
        })?;
        Ok(f(item))
    }

    /// The item at `index`.
    pub fn item(&self, index: usize) -> Result<T>
    where
        T: Clone,
    {
        self.with_item(index, T::clone)
    }

    /// Hand the item at `index` and its full path to a cell factory.
    pub fn cell<V>(&self, index: usize, factory: impl FnOnce(IndexPath, &T) -> V) -> Result<V> {
        let path = IndexPath::new(self.section_index(), index);
        self.with_item(index, |item| factory(path, item))
    }
}

impl<T> Clone for ItemBinder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ItemBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemBinder")
            .field("section_index", &self.inner.section_index.get())
            .field(
                "items",
                &self.inner.current.borrow().as_ref().map(|list| list.len()),
            )
            .field("flags", &self.inner.flags.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
