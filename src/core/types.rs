// ============================================================================
// spark-lists - Core Types
// Sequences, edit scripts, updates and the geometry used by size queries
// ============================================================================

use std::fmt;
use std::rc::Rc;

use super::error::ReconcileError;

// =============================================================================
// SEQUENCE
// =============================================================================

/// An immutable, indexable, insertion-ordered snapshot.
///
/// Cloning is a reference-count bump, so the same snapshot can be handed to
/// every stage of the pipeline without copying elements.
pub type Sequence<T> = Rc<[T]>;

/// Build a sequence from any iterator.
pub fn sequence<T>(items: impl IntoIterator<Item = T>) -> Sequence<T> {
    items.into_iter().collect::<Vec<T>>().into()
}

// =============================================================================
// CHANGE
// =============================================================================

/// One step of an edit script.
///
/// Scripts are applied in order: each index refers to the collection as it
/// stands after all previous steps of the same script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// An element with no counterpart in the old sequence now lives at `index`.
    Insert(usize),
    /// The element at `index` is gone.
    Delete(usize),
    /// The element at `from` now lives at `to`. A self-move (`from == to`)
    /// asks the consumer to refresh that position in place.
    Move { from: usize, to: usize },
    /// No usable edit script; the consumer must refresh the whole level.
    Reload,
}

impl Change {
    /// Whether this change is the full-refresh marker.
    pub fn is_reload(&self) -> bool {
        matches!(self, Change::Reload)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Insert(index) => write!(f, "insert({index})"),
            Change::Delete(index) => write!(f, "delete({index})"),
            Change::Move { from, to } => write!(f, "move({from} -> {to})"),
            Change::Reload => write!(f, "reload"),
        }
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// A full snapshot together with the edit script that produced it from the
/// previous update of the same stream.
#[derive(Debug)]
pub struct Update<T> {
    pub list: Sequence<T>,
    pub changes: Sequence<Change>,
}

impl<T> Update<T> {
    /// Create an update from a snapshot and its edit script.
    pub fn new(list: Sequence<T>, changes: impl Into<Sequence<Change>>) -> Self {
        Self {
            list,
            changes: changes.into(),
        }
    }

    /// The synthetic predecessor of every stream: no elements, no changes.
    pub fn seed() -> Self {
        Self {
            list: Rc::from(Vec::new()),
            changes: Rc::from(Vec::new()),
        }
    }

    /// An update that asks the consumer to show `list` from scratch.
    pub fn reload(list: Sequence<T>) -> Self {
        Self {
            list,
            changes: Rc::from(vec![Change::Reload]),
        }
    }

    /// Whether the edit script contains a `Reload` marker.
    pub fn is_reload(&self) -> bool {
        self.changes.iter().any(Change::is_reload)
    }

    /// Check the edit script against the length of the previously committed
    /// snapshot.
    ///
    /// A `Reload` must be the only change. Otherwise every edit must stay
    /// within the bounds left by the edits before it, and the script must end
    /// at this update's length.
    pub fn validate(&self, previous_len: usize) -> Result<(), ReconcileError> {
        if self.is_reload() {
            if self.changes.len() != 1 {
                return Err(ReconcileError::MixedReload {
                    changes: self.changes.len() - 1,
                });
            }
            return Ok(());
        }

        let out_of_bounds = |change: &Change, len: usize| ReconcileError::IndexOutOfBounds {
            change: change.to_string(),
            len,
        };

        let mut len = previous_len;
        for change in self.changes.iter() {
            match *change {
                Change::Insert(index) => {
                    if index > len || index >= self.list.len() {
                        return Err(out_of_bounds(change, len));
                    }
                    len += 1;
                }
                Change::Delete(index) => {
                    if index >= len {
                        return Err(out_of_bounds(change, len));
                    }
                    len -= 1;
                }
                Change::Move { from, to } => {
                    if from >= len || to >= len {
                        return Err(out_of_bounds(change, len));
                    }
                }
                Change::Reload => {
                    return Err(ReconcileError::MixedReload {
                        changes: self.changes.len() - 1,
                    });
                }
            }
        }

        if len != self.list.len() {
            return Err(ReconcileError::LengthMismatch {
                expected: self.list.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Number of elements in the snapshot.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

// Manual impl: cloning only bumps the two reference counts, so `T: Clone`
// is not required.
impl<T> Clone for Update<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            changes: self.changes.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for Update<T> {
    fn eq(&self, other: &Self) -> bool {
        self.list == other.list && self.changes == other.changes
    }
}

// =============================================================================
// INDEX PATH
// =============================================================================

/// Position of an item inside a sectioned collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

// =============================================================================
// SIZE
// =============================================================================

/// Width and height reported for an item.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_empty_without_changes() {
        let seed: Update<i32> = Update::seed();
        assert!(seed.is_empty());
        assert!(seed.changes.is_empty());
        assert!(!seed.is_reload());
    }

    #[test]
    fn reload_update_carries_single_marker() {
        let update = Update::reload(sequence([1, 2, 3]));
        assert_eq!(&*update.changes, &[Change::Reload]);
        assert!(update.is_reload());
        assert_eq!(update.len(), 3);
    }

    #[test]
    fn clone_shares_snapshot() {
        let update = Update::new(sequence(["a", "b"]), vec![Change::Insert(1)]);
        let copy = update.clone();
        assert!(Rc::ptr_eq(&update.list, &copy.list));
        assert_eq!(update, copy);
    }

    #[test]
    fn validate_accepts_consistent_scripts() {
        let update = Update::new(
            sequence(["a", "x", "c"]),
            vec![Change::Delete(1), Change::Insert(1), Change::Move { from: 2, to: 2 }],
        );
        assert_eq!(update.validate(3), Ok(()));
        assert_eq!(Update::reload(sequence([1])).validate(99), Ok(()));
    }

    #[test]
    fn validate_rejects_mixed_reload() {
        let update = Update::new(sequence([1]), vec![Change::Reload, Change::Insert(0)]);
        assert_eq!(
            update.validate(0),
            Err(ReconcileError::MixedReload { changes: 1 })
        );
    }

    #[test]
    fn validate_rejects_out_of_bounds_and_bad_length() {
        let delete = Update::new(sequence([1]), vec![Change::Delete(2)]);
        assert!(matches!(
            delete.validate(2),
            Err(ReconcileError::IndexOutOfBounds { len: 2, .. })
        ));

        let short = Update::new(sequence([1, 2]), vec![Change::Insert(0)]);
        assert_eq!(
            short.validate(0),
            Err(ReconcileError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn change_display() {
        assert_eq!(Change::Move { from: 2, to: 0 }.to_string(), "move(2 -> 0)");
        assert_eq!(Change::Reload.to_string(), "reload");
        assert_eq!(IndexPath::new(1, 4).to_string(), "[1, 4]");
    }
}
