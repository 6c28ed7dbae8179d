// ============================================================================
// spark-lists - Consumer
// The structural-edit surface a reconciler drives
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::types::IndexPath;

// =============================================================================
// COLLECTION CONSUMER
// =============================================================================

/// A widget that only accepts incremental structural edits.
///
/// Edits between `begin_batch` and `end_batch` form one atomic transaction.
/// `reload` and `reload_section` are applied outside of batches.
pub trait CollectionConsumer {
    fn begin_batch(&mut self);
    fn end_batch(&mut self);

    fn insert_section(&mut self, index: usize);
    fn delete_section(&mut self, index: usize);
    /// `from == to` refreshes the section in place.
    fn move_section(&mut self, from: usize, to: usize);
    /// Drop every section and re-read the whole collection.
    fn reload(&mut self);

    fn insert_item(&mut self, path: IndexPath);
    fn delete_item(&mut self, path: IndexPath);
    /// `from == to` refreshes the item in place.
    fn move_item(&mut self, from: IndexPath, to: IndexPath);
    /// Re-read every item of one section.
    fn reload_section(&mut self, section: usize);

    /// Sections the consumer currently shows.
    fn number_of_sections(&self) -> usize;
    /// Items the consumer currently shows in `section`.
    fn number_of_items(&self, section: usize) -> usize;
}

/// A consumer shared between a reconciler and its item binders.
pub type SharedConsumer = Rc<RefCell<dyn CollectionConsumer>>;

/// Wrap a consumer for sharing.
pub fn shared<C: CollectionConsumer + 'static>(consumer: C) -> Rc<RefCell<C>> {
    Rc::new(RefCell::new(consumer))
}

// =============================================================================
// BATCH GUARD
// =============================================================================

/// Opens a consumer transaction and closes it when dropped, so an early
/// return or a panic never leaves a batch open.
pub(crate) struct BatchGuard<'a> {
    consumer: &'a SharedConsumer,
}

impl<'a> BatchGuard<'a> {
    pub(crate) fn open(consumer: &'a SharedConsumer) -> Self {
        consumer.borrow_mut().begin_batch();
        Self { consumer }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.consumer.borrow_mut().end_batch();
    }
}

/// Read the consumer's live counts without panicking if it is busy.
///
/// Returns `None` while the consumer is mutably borrowed, for example when a
/// size query arrives from inside one of its own edit callbacks.
pub(crate) fn live_counts(consumer: &SharedConsumer, section: usize) -> Option<(usize, usize)> {
    let consumer = consumer.try_borrow().ok()?;
    let sections = consumer.number_of_sections();
    let items = if section < sections {
        consumer.number_of_items(section)
    } else {
        0
    };
    Some((sections, items))
}

// =============================================================================
// RECORDING CONSUMER
// =============================================================================

/// One call received by a [`RecordingConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerCall {
    BeginBatch,
    EndBatch,
    InsertSection(usize),
    DeleteSection(usize),
    MoveSection(usize, usize),
    Reload,
    InsertItem(IndexPath),
    DeleteItem(IndexPath),
    MoveItem(IndexPath, IndexPath),
    ReloadSection(usize),
}

impl ConsumerCall {
    /// Whether this call changes structure at section level.
    pub fn is_section_edit(&self) -> bool {
        matches!(
            self,
            ConsumerCall::InsertSection(_)
                | ConsumerCall::DeleteSection(_)
                | ConsumerCall::MoveSection(..)
                | ConsumerCall::Reload
        )
    }
}

/// Headless consumer that records every call.
///
/// Reported counts are whatever was last set with
/// [`set_counts`](Self::set_counts); a real widget would re-read them from
/// its data source after each transaction.
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    calls: Vec<ConsumerCall>,
    counts: Vec<usize>,
    open_batches: usize,
    max_open_batches: usize,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in arrival order.
    pub fn calls(&self) -> &[ConsumerCall] {
        &self.calls
    }

    /// Return and forget the recorded calls.
    pub fn take_calls(&mut self) -> Vec<ConsumerCall> {
        std::mem::take(&mut self.calls)
    }

    /// Only the section-level edits, ignoring batch markers and item edits.
    pub fn section_edits(&self) -> Vec<ConsumerCall> {
        self.calls
            .iter()
            .copied()
            .filter(ConsumerCall::is_section_edit)
            .collect()
    }

    /// Set the counts reported through `number_of_sections/items`.
    pub fn set_counts(&mut self, items_per_section: Vec<usize>) {
        self.counts = items_per_section;
    }

    /// Batches opened and not yet closed.
    pub fn open_batches(&self) -> usize {
        self.open_batches
    }

    /// Deepest batch nesting observed.
    pub fn max_open_batches(&self) -> usize {
        self.max_open_batches
    }
}

impl CollectionConsumer for RecordingConsumer {
    fn begin_batch(&mut self) {
        self.open_batches += 1;
        self.max_open_batches = self.max_open_batches.max(self.open_batches);
        self.calls.push(ConsumerCall::BeginBatch);
    }

    fn end_batch(&mut self) {
        self.open_batches = self.open_batches.saturating_sub(1);
        self.calls.push(ConsumerCall::EndBatch);
    }

    fn insert_section(&mut self, index: usize) {
        self.calls.push(ConsumerCall::InsertSection(index));
    }

    fn delete_section(&mut self, index: usize) {
        self.calls.push(ConsumerCall::DeleteSection(index));
    }

    fn move_section(&mut self, from: usize, to: usize) {
        self.calls.push(ConsumerCall::MoveSection(from, to));
    }

    fn reload(&mut self) {
        self.calls.push(ConsumerCall::Reload);
    }

    fn insert_item(&mut self, path: IndexPath) {
        self.calls.push(ConsumerCall::InsertItem(path));
    }

    fn delete_item(&mut self, path: IndexPath) {
        self.calls.push(ConsumerCall::DeleteItem(path));
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        self.calls.push(ConsumerCall::MoveItem(from, to));
    }

    fn reload_section(&mut self, section: usize) {
        self.calls.push(ConsumerCall::ReloadSection(section));
    }

    fn number_of_sections(&self) -> usize {
        self.counts.len()
    }

    fn number_of_items(&self, section: usize) -> usize {
        self.counts.get(section).copied().unwrap_or(0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_guard_closes_on_drop() {
        let recorder = shared(RecordingConsumer::new());
        let consumer: SharedConsumer = recorder.clone();
        {
            let _batch = BatchGuard::open(&consumer);
            consumer.borrow_mut().insert_section(0);
            assert_eq!(recorder.borrow().open_batches(), 1);
        }
        assert_eq!(recorder.borrow().open_batches(), 0);
        assert_eq!(
            recorder.borrow().calls(),
            &[
                ConsumerCall::BeginBatch,
                ConsumerCall::InsertSection(0),
                ConsumerCall::EndBatch
            ]
        );
    }

    #[test]
    fn live_counts_degrade_while_busy() {
        let recorder = shared(RecordingConsumer::new());
        recorder.borrow_mut().set_counts(vec![2, 5]);
        let consumer: SharedConsumer = recorder.clone();

        assert_eq!(live_counts(&consumer, 1), Some((2, 5)));
        assert_eq!(live_counts(&consumer, 7), Some((2, 0)));

        let _held = recorder.borrow_mut();
        assert_eq!(live_counts(&consumer, 0), None);
    }

    #[test]
    fn section_edits_filter() {
        let mut recorder = RecordingConsumer::new();
        recorder.begin_batch();
        recorder.insert_section(1);
        recorder.insert_item(IndexPath::new(1, 0));
        recorder.end_batch();
        recorder.reload();
        assert_eq!(
            recorder.section_edits(),
            vec![ConsumerCall::InsertSection(1), ConsumerCall::Reload]
        );
    }
}
