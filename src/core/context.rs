// ============================================================================
// spark-lists - Delivery Context
// Thread-local serialized execution context for all deliveries
// ============================================================================
//
// Every delivery to an observer goes through `dispatch`. When nothing is
// being delivered the task runs immediately; otherwise it is queued and runs
// after the current task (and everything queued before it) has finished.
//
// This gives the reconcilers their ordering guarantees:
// - updates from one stream are processed in arrival order
// - a snapshot pushed from inside a consumer callback, or a nested binder
//   replaying its first value while a section batch is open, is delivered
//   only after the open transaction has closed
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

// =============================================================================
// DELIVERY CONTEXT
// =============================================================================

/// Thread-local state of the serialized delivery context.
pub struct DeliveryContext {
    /// Whether a task is currently running
    delivering: Cell<bool>,

    /// Tasks waiting for the current one to finish
    queue: RefCell<VecDeque<Task>>,

    /// Total tasks run on this thread
    delivered: Cell<u64>,
}

impl DeliveryContext {
    /// Create an idle context
    pub fn new() -> Self {
        Self {
            delivering: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            delivered: Cell::new(0),
        }
    }

    /// Whether a task is running right now
    pub fn is_delivering(&self) -> bool {
        self.delivering.get()
    }

    /// Mark the context busy/idle, returning the previous value
    pub fn set_delivering(&self, value: bool) -> bool {
        self.delivering.replace(value)
    }

    /// Queue a task behind the current one
    pub fn enqueue(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    /// Pop the oldest queued task
    pub fn next_task(&self) -> Option<Task> {
        self.queue.borrow_mut().pop_front()
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Count a finished task
    pub fn record_delivery(&self) {
        self.delivered.set(self.delivered.get() + 1);
    }

    /// Total tasks run on this thread
    pub fn delivered(&self) -> u64 {
        self.delivered.get()
    }
}

impl Default for DeliveryContext {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    /// The thread-local delivery context
    static CONTEXT: DeliveryContext = DeliveryContext::new();
}

/// Access the thread-local delivery context.
pub fn with_context<R>(f: impl FnOnce(&DeliveryContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Run `task` on the serialized context.
///
/// Runs immediately if the context is idle and then drains everything the
/// task queued. If called while another task is running, the task is queued
/// and this returns at once.
pub fn dispatch(task: impl FnOnce() + 'static) {
    let busy = with_context(|ctx| {
        if ctx.is_delivering() {
            ctx.enqueue(Box::new(task));
            return None;
        }
        ctx.set_delivering(true);
        Some(Box::new(task) as Task)
    });

    let Some(first) = busy else {
        return;
    };

    // Restores the idle state even if a task panics.
    struct DrainGuard;

    impl Drop for DrainGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_delivering(false));
        }
    }

    let _guard = DrainGuard;
    run(first);
    while let Some(task) = with_context(|ctx| ctx.next_task()) {
        run(task);
    }
}

fn run(task: Task) {
    task();
    with_context(|ctx| ctx.record_delivery());
}

/// Whether a delivery is in progress on this thread.
pub fn is_delivering() -> bool {
    with_context(|ctx| ctx.is_delivering())
}

/// Number of deliveries waiting behind the current one.
pub fn pending_deliveries() -> usize {
    with_context(|ctx| ctx.pending())
}

// =============================================================================
// TESTS
// =============================================================================
