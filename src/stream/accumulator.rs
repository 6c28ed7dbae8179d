// ============================================================================
// spark-lists - Update Accumulator
// Fold a snapshot stream into a stream of updates with edit scripts
// ============================================================================

use std::rc::Rc;

use tracing::trace;

use crate::core::types::{Change, Sequence, Update};
use crate::diff::EditScriptGenerator;
use crate::stream::observable::{Observable, Observer};
use crate::stream::subscription::Subscription;

// =============================================================================
// UPDATE ACCUMULATOR
// =============================================================================

/// Scan state turning snapshots into updates.
///
/// Starts from the empty seed. Whenever the previous update carried no
/// changes (the seed, or a snapshot identical to its predecessor) the next
/// update is a full reload; otherwise it carries the generator's script
/// against the previous snapshot.
///
/// # Example
///
/// ```
/// use spark_lists::{sequence, Change, IdentityDiff, UpdateAccumulator};
///
/// let mut acc = UpdateAccumulator::new(IdentityDiff);
/// assert_eq!(&*acc.next(sequence(["a", "b"])).changes, &[Change::Reload]);
/// assert_eq!(&*acc.next(sequence(["b"])).changes, &[Change::Delete(0)]);
/// ```
pub struct UpdateAccumulator<T, D> {
    previous: Update<T>,
    generator: D,
}

impl<T, D: EditScriptGenerator<T>> UpdateAccumulator<T, D> {
    /// Start from the empty seed.
    pub fn new(generator: D) -> Self {
        Self {
            previous: Update::seed(),
            generator,
        }
    }

    /// Fold in the next snapshot and return the emitted update.
    pub fn next(&mut self, snapshot: Sequence<T>) -> Update<T> {
        let update = if self.previous.changes.is_empty() {
            Update::reload(snapshot)
        } else {
            let changes: Vec<Change> = self.generator.diff(&self.previous.list, &snapshot);
            Update::new(snapshot, changes)
        };
        trace!(
            len = update.len(),
            changes = update.changes.len(),
            reload = update.is_reload(),
            "update accumulated"
        );
        self.previous = update.clone();
        update
    }

    /// The last emitted update (the seed before the first snapshot).
    pub fn previous(&self) -> &Update<T> {
        &self.previous
    }
}

// =============================================================================
// ACCUMULATED STREAM
// =============================================================================

/// An `Update<T>` stream over a snapshot stream.
///
/// Every subscription gets its own accumulator, so each subscriber starts
/// with a reload of whatever snapshot the source delivers first.
pub struct Accumulated<T, D> {
    snapshots: Rc<dyn Observable<Sequence<T>>>,
    generator: D,
}

impl<T, D> Accumulated<T, D> {
    pub fn new(snapshots: Rc<dyn Observable<Sequence<T>>>, generator: D) -> Self {
        Self {
            snapshots,
            generator,
        }
    }
}

impl<T, D> Observable<Update<T>> for Accumulated<T, D>
where
    T: 'static,
    D: EditScriptGenerator<T> + Clone + 'static,
{
    fn subscribe(&self, mut observer: Observer<Update<T>>) -> Subscription {
        let mut accumulator = UpdateAccumulator::new(self.generator.clone());
        self.snapshots.subscribe(Box::new(move |snapshot| {
            observer(accumulator.next(snapshot));
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
