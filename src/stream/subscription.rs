// ============================================================================
// spark-lists - Subscription
// Disposable handle owning one live consumption of a stream
// ============================================================================
//
// A subscription owns a teardown function and any number of child
// subscriptions. Disposing runs the teardown once and disposes the children.
//
// Key properties:
// - dispose() is idempotent
// - handles are cheap clones sharing one inner state
// - dropping the last handle disposes (RAII)
// - children added after disposal are disposed immediately
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;

/// Teardown function run once on disposal
pub type TeardownFn = Box<dyn FnOnce()>;

// =============================================================================
// SUBSCRIPTION INNER
// =============================================================================

/// Shared state behind every clone of a [`Subscription`].
pub struct SubscriptionInner {
    flags: Cell<u32>,
    teardown: RefCell<Option<TeardownFn>>,
    children: RefCell<Vec<Subscription>>,
}

impl SubscriptionInner {
    fn new(teardown: Option<TeardownFn>) -> Rc<Self> {
        Rc::new(Self {
            flags: Cell::new(ACTIVE),
            teardown: RefCell::new(teardown),
            children: RefCell::new(Vec::new()),
        })
    }

    /// Whether disposal has begun
    pub fn is_disposed(&self) -> bool {
        (self.flags.get() & DISPOSED) != 0
    }

    fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        // Flag first so re-entrant calls from the teardown are no-ops.
        self.flags.set((self.flags.get() & !ACTIVE) | DISPOSED);

        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.iter().rev() {
            child.dispose();
        }
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle to a live stream consumption.
///
/// # Example
///
/// ```
/// use spark_lists::Subscription;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let torn_down = Rc::new(Cell::new(0));
/// let t = torn_down.clone();
/// let subscription = Subscription::new(move || t.set(t.get() + 1));
///
/// subscription.dispose();
/// subscription.dispose();
/// assert_eq!(torn_down.get(), 1);
/// assert!(subscription.is_disposed());
/// ```
#[must_use = "dropping the last handle disposes the subscription"]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` when disposed.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: SubscriptionInner::new(Some(Box::new(teardown))),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            inner: SubscriptionInner::new(None),
        }
    }

    /// Whether this subscription has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Dispose: run the teardown and dispose all children. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Attach a child that is disposed together with this subscription.
    ///
    /// If this subscription is already disposed the child is disposed now.
    pub fn add(&self, child: Subscription) {
        if self.is_disposed() {
            child.dispose();
            return;
        }
        self.inner.children.borrow_mut().push(child);
    }

    /// A non-owning watch that reports whether disposal has begun.
    ///
    /// Delivery closures hold a watch instead of a handle so they never keep
    /// the subscription alive.
    pub fn watch(&self) -> DisposalWatch {
        DisposalWatch {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

// =============================================================================
// DISPOSAL WATCH
// =============================================================================

/// Weak view of a subscription's disposal state.
#[derive(Clone)]
pub struct DisposalWatch {
    inner: Weak<SubscriptionInner>,
}

impl DisposalWatch {
    /// True once the subscription is disposed or every handle is gone.
    pub fn is_disposed(&self) -> bool {
        self.inner.upgrade().is_none_or(|inner| inner.is_disposed())
    }
}

// =============================================================================
// TESTS
// =============================================================================
