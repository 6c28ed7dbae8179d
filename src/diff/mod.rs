// ============================================================================
// spark-lists - Edit Script Generation
// Turn two snapshots into a sequentially applicable edit script
// ============================================================================
//
// The generator is a replaceable collaborator. Anything implementing
// `EditScriptGenerator` (including a plain closure) can drive the
// accumulator. The default `IdentityDiff` matches elements by identity hash
// and compares content with `Eq`.
//
// Script semantics: edits are applied one after another, each index
// referring to the collection as left by the previous edits.
// ============================================================================

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::core::types::Change;

// =============================================================================
// EDIT
// =============================================================================

/// Raw generator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edit {
    Insert(usize),
    Delete(usize),
    Move { from: usize, to: usize },
    /// Same identity, different content, at `index`.
    Replace(usize),
}

impl From<Edit> for Change {
    /// `Replace` becomes a self-move, read downstream as "refresh in place".
    fn from(edit: Edit) -> Self {
        match edit {
            Edit::Insert(index) => Change::Insert(index),
            Edit::Delete(index) => Change::Delete(index),
            Edit::Move { from, to } => Change::Move { from, to },
            Edit::Replace(index) => Change::Move {
                from: index,
                to: index,
            },
        }
    }
}

// =============================================================================
// GENERATOR TRAIT
// =============================================================================

/// Pure, deterministic diff between two snapshots.
pub trait EditScriptGenerator<T> {
    /// Raw edits turning `old` into `new`.
    fn edits(&self, old: &[T], new: &[T]) -> Vec<Edit>;

    /// The edit script in [`Change`] form.
    fn diff(&self, old: &[T], new: &[T]) -> Vec<Change> {
        self.edits(old, new).into_iter().map(Change::from).collect()
    }
}

impl<T, F> EditScriptGenerator<T> for F
where
    F: Fn(&[T], &[T]) -> Vec<Edit>,
{
    fn edits(&self, old: &[T], new: &[T]) -> Vec<Edit> {
        self(old, new)
    }
}

// =============================================================================
// IDENTITY DIFF
// =============================================================================

/// Default generator: identity by hash, content by equality.
///
/// Produces deletions first (descending old index), then walks the new
/// sequence left to right emitting an insert for each unmatched element and a
/// move for each matched element that is not yet in place. Matched elements
/// whose content changed get a `Replace` at their final position. Duplicate
/// identities pair up first-come-first-matched.
///
/// # Example
///
/// ```
/// use spark_lists::{Change, EditScriptGenerator, IdentityDiff};
///
/// let changes = IdentityDiff.diff(&["A", "B", "C"][..], &["B", "A", "C"][..]);
/// assert_eq!(changes, vec![Change::Move { from: 1, to: 0 }]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDiff;

fn identity<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl<T: Hash + Eq> EditScriptGenerator<T> for IdentityDiff {
    fn edits(&self, old: &[T], new: &[T]) -> Vec<Edit> {
        let mut edits = Vec::new();

        // Pair each new element with the first unused old element of the
        // same identity.
        let mut by_identity: HashMap<u64, VecDeque<usize>> = HashMap::new();
        for (index, item) in old.iter().enumerate() {
            by_identity.entry(identity(item)).or_default().push_back(index);
        }

        let mut kept = vec![false; old.len()];
        let matched: Vec<Option<usize>> = new
            .iter()
            .map(|item| {
                let source = by_identity
                    .get_mut(&identity(item))
                    .and_then(VecDeque::pop_front);
                if let Some(index) = source {
                    kept[index] = true;
                }
                source
            })
            .collect();

        for index in (0..old.len()).rev() {
            if !kept[index] {
                edits.push(Edit::Delete(index));
            }
        }

        // Old indices in their current order; `None` marks inserted slots.
        let mut working: Vec<Option<usize>> =
            (0..old.len()).filter(|&i| kept[i]).map(Some).collect();

        for (target, source) in matched.iter().enumerate() {
            match *source {
                None => {
                    working.insert(target, None);
                    edits.push(Edit::Insert(target));
                }
                Some(old_index) => {
                    let found = working[target..]
                        .iter()
                        .position(|slot| *slot == Some(old_index));
                    if let Some(offset) = found {
                        if offset != 0 {
                            let from = target + offset;
                            let slot = working.remove(from);
                            working.insert(target, slot);
                            edits.push(Edit::Move { from, to: target });
                        }
                    }
                    if old[old_index] != new[target] {
                        edits.push(Edit::Replace(target));
                    }
                }
            }
        }

        edits
    }
}

/// Replay an edit script on a copy of `old`, taking inserted and replaced
/// elements from `new`. Used to check scripts against their snapshots.
pub fn apply_edits<T: Clone>(old: &[T], new: &[T], edits: &[Edit]) -> Option<Vec<T>> {
    let mut result = old.to_vec();
    for edit in edits {
        match *edit {
            Edit::Insert(index) => {
                if index > result.len() {
                    return None;
                }
                result.insert(index, new.get(index)?.clone());
            }
            Edit::Delete(index) => {
                if index >= result.len() {
                    return None;
                }
                result.remove(index);
            }
            Edit::Move { from, to } => {
                if from >= result.len() || to >= result.len() {
                    return None;
                }
                let item = result.remove(from);
                result.insert(to, item);
            }
            Edit::Replace(index) => {
                *result.get_mut(index)? = new.get(index)?.clone();
            }
        }
    }
    Some(result)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check<T: Hash + Eq + Clone + std::fmt::Debug>(old: &[T], new: &[T]) -> Vec<Edit> {
        let edits = IdentityDiff.edits(old, new);
        assert_eq!(apply_edits(old, new, &edits).as_deref(), Some(new));
        edits
    }

    #[test]
    fn identical_snapshots_have_empty_script() {
        assert!(check(&[1, 2, 3], &[1, 2, 3]).is_empty());
    }

    #[test]
    fn insert_in_the_middle() {
        assert_eq!(check(&["A", "B"], &["A", "C", "B"]), vec![Edit::Insert(1)]);
    }

    #[test]
    fn delete_first() {
        assert_eq!(check(&["A", "B", "C"], &["B", "C"]), vec![Edit::Delete(0)]);
    }

    #[test]
    fn swap_front_pair_moves_second_to_front() {
        assert_eq!(
            check(&["A", "B", "C"], &["B", "A", "C"]),
            vec![Edit::Move { from: 1, to: 0 }]
        );
    }

    #[test]
    fn deletes_are_descending() {
        assert_eq!(
            check(&[1, 2, 3, 4], &[2, 4]),
            vec![Edit::Delete(2), Edit::Delete(0)]
        );
    }

    #[test]
    fn duplicates_pair_in_order() {
        check(&["x", "x", "y"], &["y", "x"]);
        check(&["x"], &["x", "x", "x"]);
    }

    #[derive(Debug, Clone)]
    struct Row {
        id: u32,
        label: &'static str,
    }

    impl Hash for Row {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl PartialEq for Row {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id && self.label == other.label
        }
    }

    impl Eq for Row {}

    #[test]
    fn content_change_becomes_replace_then_self_move() {
        let old = [Row { id: 1, label: "a" }, Row { id: 2, label: "b" }];
        let new = [Row { id: 1, label: "a" }, Row { id: 2, label: "B" }];
        let edits = IdentityDiff.edits(&old[..], &new[..]);
        assert_eq!(edits, vec![Edit::Replace(1)]);
        assert_eq!(
            IdentityDiff.diff(&old[..], &new[..]),
            vec![Change::Move { from: 1, to: 1 }]
        );
    }

    #[test]
    fn closures_are_generators() {
        let reverse_all = |old: &[i32], _new: &[i32]| -> Vec<Edit> {
            (0..old.len()).rev().map(Edit::Delete).collect()
        };
        assert_eq!(
            EditScriptGenerator::<i32>::diff(&reverse_all, &[1, 2], &[]),
            vec![Change::Delete(1), Change::Delete(0)]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn script_replays_to_new_snapshot(
            old in prop::collection::vec(0u8..8, 0..12),
            new in prop::collection::vec(0u8..8, 0..12),
        ) {
            let edits = IdentityDiff.edits(&old[..], &new[..]);
            prop_assert_eq!(apply_edits(&old, &new, &edits), Some(new.clone()));
            prop_assert!(!edits.iter().any(|e| matches!(e, Edit::Replace(_))));
        }
    }
}
