// Shared helpers for the integration tests.

#![allow(dead_code)]

use spark_lists::{
    CollectionConsumer, ConsumerCall, IndexPath, RecordingConsumer, SectionReconciler,
    StructuralReconciler,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("spark_lists=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

/// Reads per-section item counts from the data source.
pub type CountsFn = Box<dyn Fn() -> Vec<usize>>;

/// Consumer that tracks counts the way a collection widget does and checks
/// them against the data source whenever a transaction closes.
///
/// Inserted sections have no count until the transaction ends, when the
/// widget asks the data source. Problems are collected instead of panicking
/// so the reconciler keeps running.
#[derive(Default)]
pub struct MirrorConsumer {
    pub recorder: RecordingConsumer,
    counts: Vec<Option<usize>>,
    source: Option<CountsFn>,
    depth: usize,
    pub violations: Vec<String>,
}

impl MirrorConsumer {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Attach the data source queried at the end of each transaction.
    pub fn watch<S: 'static, T: Clone + 'static>(&mut self, reconciler: &SectionReconciler<S, T>) {
        let r = reconciler.clone();
        self.source = Some(Box::new(move || {
            (0..r.number_of_sections())
                .map(|s| r.number_of_items(s))
                .collect()
        }));
    }

    pub fn counts(&self) -> Vec<usize> {
        self.counts.iter().map(|c| c.unwrap_or(0)).collect()
    }

    pub fn calls(&self) -> &[ConsumerCall] {
        self.recorder.calls()
    }

    fn source_counts(&self) -> Vec<usize> {
        self.source.as_ref().map(|f| f()).unwrap_or_default()
    }

    fn settle(&mut self, context: &str) {
        let source = self.source_counts();
        for (section, count) in self.counts.iter_mut().enumerate() {
            if count.is_none() {
                *count = source.get(section).copied();
            }
        }
        let mirrored = self.counts();
        if mirrored != source {
            self.violations
                .push(format!("{context}: widget {mirrored:?} vs source {source:?}"));
        }
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }
}

impl CollectionConsumer for MirrorConsumer {
    fn begin_batch(&mut self) {
        self.depth += 1;
        self.recorder.begin_batch();
    }

    fn end_batch(&mut self) {
        self.recorder.end_batch();
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.settle("end_batch");
        }
    }

    fn insert_section(&mut self, index: usize) {
        self.recorder.insert_section(index);
        if index > self.counts.len() {
            self.violation(format!("insert_section({index}) past {}", self.counts.len()));
            return;
        }
        self.counts.insert(index, None);
    }

    fn delete_section(&mut self, index: usize) {
        self.recorder.delete_section(index);
        if index >= self.counts.len() {
            self.violation(format!("delete_section({index}) past {}", self.counts.len()));
            return;
        }
        self.counts.remove(index);
    }

    fn move_section(&mut self, from: usize, to: usize) {
        self.recorder.move_section(from, to);
        if from >= self.counts.len() || to >= self.counts.len() {
            self.violation(format!("move_section({from}, {to}) past {}", self.counts.len()));
            return;
        }
        let count = self.counts.remove(from);
        self.counts.insert(to, count);
    }

    fn reload(&mut self) {
        self.recorder.reload();
        if self.depth > 0 {
            self.violation("reload inside a batch".to_string());
        }
        self.counts = self.source_counts().into_iter().map(Some).collect();
    }

    fn insert_item(&mut self, path: IndexPath) {
        self.recorder.insert_item(path);
        match self.counts.get_mut(path.section) {
            Some(Some(count)) if path.item <= *count => *count += 1,
            _ => self.violation(format!("insert_item({path})")),
        }
    }

    fn delete_item(&mut self, path: IndexPath) {
        self.recorder.delete_item(path);
        match self.counts.get_mut(path.section) {
            Some(Some(count)) if path.item < *count => *count -= 1,
            _ => self.violation(format!("delete_item({path})")),
        }
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        self.recorder.move_item(from, to);
        let in_range = from.section == to.section
            && matches!(
                self.counts.get(from.section),
                Some(Some(count)) if from.item < *count && to.item < *count
            );
        if !in_range {
            self.violation(format!("move_item({from}, {to})"));
        }
    }

    fn reload_section(&mut self, section: usize) {
        self.recorder.reload_section(section);
        if self.depth > 0 {
            self.violation(format!("reload_section({section}) inside a batch"));
        }
        let source = self.source_counts();
        match (self.counts.get_mut(section), source.get(section)) {
            (Some(count), Some(&fresh)) => *count = Some(fresh),
            _ => self.violation(format!("reload_section({section}) past the end")),
        }
    }

    fn number_of_sections(&self) -> usize {
        self.counts.len()
    }

    fn number_of_items(&self, section: usize) -> usize {
        self.counts.get(section).copied().flatten().unwrap_or(0)
    }
}
