// ============================================================================
// spark-lists - ObservableList
// A list exposed as a stream of updates
// ============================================================================

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::core::types::{Sequence, Update};
use crate::diff::{EditScriptGenerator, IdentityDiff};
use crate::stream::accumulator::Accumulated;
use crate::stream::observable::{Just, Observable, Observer};
use crate::stream::subscription::Subscription;

// =============================================================================
// OBSERVABLE LIST
// =============================================================================

/// A list whose changes are observed as [`Update`]s.
///
/// # Example
///
/// ```
/// use spark_lists::{Change, ObservableList, SnapshotSource, Update};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let source = SnapshotSource::new(vec!["a", "b"]);
/// let list = ObservableList::diff(source.clone());
///
/// let scripts = Rc::new(RefCell::new(Vec::new()));
/// let s = scripts.clone();
/// let _subscription = list.subscribe(move |update: Update<&str>| {
///     s.borrow_mut().push(update.changes.to_vec());
/// });
///
/// source.push(vec!["b"]);
/// assert_eq!(
///     *scripts.borrow(),
///     vec![vec![Change::Reload], vec![Change::Delete(0)]]
/// );
/// ```
pub struct ObservableList<T> {
    updates: Rc<dyn Observable<Update<T>>>,
}

impl<T: 'static> ObservableList<T> {
    /// Wrap an existing update stream.
    pub fn from_updates(updates: impl Observable<Update<T>> + 'static) -> Self {
        Self {
            updates: Rc::new(updates),
        }
    }

    /// A list that never changes: each subscriber gets a single reload.
    pub fn of(items: Vec<T>) -> Self {
        Self::from_updates(Just::new(Update::reload(items.into())))
    }

    /// Diff a snapshot stream with the default identity generator.
    pub fn diff(snapshots: impl Observable<Sequence<T>> + 'static) -> Self
    where
        T: Hash + Eq,
    {
        Self::diff_with(snapshots, IdentityDiff)
    }

    /// Diff a snapshot stream with a custom generator.
    pub fn diff_with<D>(snapshots: impl Observable<Sequence<T>> + 'static, generator: D) -> Self
    where
        D: EditScriptGenerator<T> + Clone + 'static,
    {
        Self::from_updates(Accumulated::new(Rc::new(snapshots), generator))
    }

    /// The underlying update stream.
    pub fn updates(&self) -> Rc<dyn Observable<Update<T>>> {
        self.updates.clone()
    }

    /// Observe updates with a closure.
    pub fn subscribe(&self, observer: impl FnMut(Update<T>) + 'static) -> Subscription {
        self.updates.subscribe(Box::new(observer))
    }

    /// Transform every element, keeping each update's edit script.
    pub fn map<U: 'static>(&self, transform: impl Fn(&T) -> U + 'static) -> ObservableList<U> {
        ObservableList::from_updates(Mapped {
            updates: self.updates.clone(),
            transform: Rc::new(transform),
        })
    }
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            updates: self.updates.clone(),
        }
    }
}

impl<T> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList").finish_non_exhaustive()
    }
}

// =============================================================================
// MAPPED
// =============================================================================

struct Mapped<T, U> {
    updates: Rc<dyn Observable<Update<T>>>,
    transform: Rc<dyn Fn(&T) -> U>,
}

impl<T: 'static, U: 'static> Observable<Update<U>> for Mapped<T, U> {
    fn subscribe(&self, mut observer: Observer<Update<U>>) -> Subscription {
        let transform = self.transform.clone();
        self.updates.subscribe(Box::new(move |update: Update<T>| {
            let list: Sequence<U> = update.list.iter().map(|item| transform(item)).collect();
            observer(Update {
                list,
                changes: update.changes,
            });
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
