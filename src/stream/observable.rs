// ============================================================================
// spark-lists - Observables
// Push-based streams delivered through the serialized context
// ============================================================================
//
// An observable hands each value to its observers by value. All deliveries
// go through `dispatch`, so observers always run on the delivery context and
// never overlap each other.
//
// Sources:
// - SnapshotSource: hot source holding the latest snapshot, replayed to
//   every new subscriber
// - SnapshotSender: Send handle feeding a source from another thread
// - Just: cold source emitting one value per subscription
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::trace;

use crate::core::constants::*;
use crate::core::context::dispatch;
use crate::core::types::Sequence;
use crate::stream::subscription::Subscription;

/// Callback receiving each delivered value
pub type Observer<T> = Box<dyn FnMut(T)>;

// =============================================================================
// OBSERVABLE
// =============================================================================

/// Anything that can be observed as a sequence of values.
pub trait Observable<T> {
    /// Start delivering values to `observer` until the returned
    /// subscription is disposed.
    fn subscribe(&self, observer: Observer<T>) -> Subscription;
}

impl<T, O: Observable<T> + ?Sized> Observable<T> for Rc<O> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (**self).subscribe(observer)
    }
}

// =============================================================================
// OBSERVER SLOT
// =============================================================================

/// One registered observer. Shared between the source's observer list and
/// the delivery closures; the flags are checked before every call.
pub(crate) struct ObserverSlot<T> {
    flags: Cell<u32>,
    observer: RefCell<Observer<T>>,
}

impl<T> ObserverSlot<T> {
    pub(crate) fn new(observer: Observer<T>) -> Rc<Self> {
        Rc::new(Self {
            flags: Cell::new(ACTIVE),
            observer: RefCell::new(observer),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        (self.flags.get() & DISPOSED) == 0
    }

    pub(crate) fn deactivate(&self) {
        self.flags.set((self.flags.get() & !ACTIVE) | DISPOSED);
    }

    /// Deliver one value unless the slot was disposed meanwhile.
    pub(crate) fn deliver(&self, value: T) {
        if !self.is_active() {
            return;
        }
        // A slot never receives re-entrant deliveries: everything goes
        // through dispatch, which runs one task at a time.
        if let Ok(mut observer) = self.observer.try_borrow_mut() {
            observer(value);
        }
    }
}

// =============================================================================
// SNAPSHOT SOURCE
// =============================================================================

struct SourceInner<T> {
    current: RefCell<Option<Sequence<T>>>,
    observers: RefCell<Vec<Rc<ObserverSlot<Sequence<T>>>>>,
    /// Created on the first `sender()` call and shared by every sender.
    channel: RefCell<Option<(Sender<Vec<T>>, Receiver<Vec<T>>)>>,
}

impl<T> SourceInner<T> {
    fn remove_slot(&self, slot: &Rc<ObserverSlot<Sequence<T>>>) {
        self.observers
            .borrow_mut()
            .retain(|other| !Rc::ptr_eq(other, slot));
    }
}

/// A hot stream of full snapshots.
///
/// Holds the latest snapshot and replays it to each new subscriber, so every
/// subscription starts from a complete value.
///
/// # Example
///
/// ```
/// use spark_lists::{Observable, SnapshotSource};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let source = SnapshotSource::new(vec![1, 2]);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let s = seen.clone();
/// let _subscription = source.subscribe(Box::new(move |snapshot| {
///     s.borrow_mut().push(snapshot.to_vec());
/// }));
///
/// source.push(vec![3]);
/// assert_eq!(*seen.borrow(), vec![vec![1, 2], vec![3]]);
/// ```
pub struct SnapshotSource<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T: 'static> SnapshotSource<T> {
    /// Create a source holding an initial snapshot.
    pub fn new(initial: Vec<T>) -> Self {
        let source = Self::empty();
        *source.inner.current.borrow_mut() = Some(initial.into());
        source
    }

    /// Create a source with no snapshot yet; subscribers wait for the first
    /// `push`.
    pub fn empty() -> Self {
        Self {
            inner: Rc::new(SourceInner {
                current: RefCell::new(None),
                observers: RefCell::new(Vec::new()),
                channel: RefCell::new(None),
            }),
        }
    }

    /// Replace the snapshot and deliver it to every observer.
    pub fn push(&self, snapshot: Vec<T>) {
        let snapshot: Sequence<T> = snapshot.into();
        *self.inner.current.borrow_mut() = Some(snapshot.clone());

        let slots = self.inner.observers.borrow().clone();
        trace!(
            len = snapshot.len(),
            observers = slots.len(),
            "snapshot pushed"
        );
        dispatch(move || {
            for slot in slots {
                slot.deliver(snapshot.clone());
            }
        });
    }

    /// The latest snapshot, if any.
    pub fn current(&self) -> Option<Sequence<T>> {
        self.inner.current.borrow().clone()
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// A `Send` handle for producing snapshots on another thread.
    ///
    /// Values sent through the handle are delivered when [`pump`](Self::pump)
    /// is called on this source's thread. All senders of one source share a
    /// single queue.
    pub fn sender(&self) -> SnapshotSender<T>
    where
        T: Send,
    {
        let mut channel = self.inner.channel.borrow_mut();
        let (tx, _) = channel.get_or_insert_with(mpsc::channel);
        SnapshotSender { tx: tx.clone() }
    }

    /// Deliver every snapshot received from the sender, in order.
    ///
    /// Returns the number of snapshots delivered.
    pub fn pump(&self) -> usize {
        let received: Vec<Vec<T>> = match self.inner.channel.borrow().as_ref() {
            Some((_, rx)) => rx.try_iter().collect(),
            None => return 0,
        };
        let count = received.len();
        for snapshot in received {
            self.push(snapshot);
        }
        count
    }
}

impl<T: 'static> Observable<Sequence<T>> for SnapshotSource<T> {
    fn subscribe(&self, observer: Observer<Sequence<T>>) -> Subscription {
        let slot = ObserverSlot::new(observer);
        self.inner.observers.borrow_mut().push(slot.clone());

        if let Some(current) = self.current() {
            let replay = slot.clone();
            dispatch(move || replay.deliver(current));
        }

        let source: Weak<SourceInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            slot.deactivate();
            if let Some(source) = source.upgrade() {
                source.remove_slot(&slot);
            }
        })
    }
}

impl<T> Clone for SnapshotSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for SnapshotSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotSource")
            .field("len", &self.inner.current.borrow().as_ref().map(|s| s.len()))
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

// =============================================================================
// SNAPSHOT SENDER
// =============================================================================

/// Thread-safe producer feeding a [`SnapshotSource`].
pub struct SnapshotSender<T> {
    tx: Sender<Vec<T>>,
}

impl<T> SnapshotSender<T> {
    /// Queue a snapshot. Returns false if the source is gone.
    pub fn send(&self, snapshot: Vec<T>) -> bool {
        self.tx.send(snapshot).is_ok()
    }
}

impl<T> Clone for SnapshotSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

// =============================================================================
// JUST
// =============================================================================

/// Cold source that delivers one value to each subscriber.
pub struct Just<T> {
    value: T,
}

impl<T> Just<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + 'static> Observable<T> for Just<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let slot = ObserverSlot::new(observer);
        let value = self.value.clone();
        let delivery = slot.clone();
        dispatch(move || delivery.deliver(value));
        Subscription::new(move || slot.deactivate())
    }
}

/// Emits its value straight from `subscribe`, outside any dispatch.
#[cfg(test)]
pub(crate) struct Immediate<T>(pub(crate) T);

#[cfg(test)]
impl<T: Clone> Observable<T> for Immediate<T> {
    fn subscribe(&self, mut observer: Observer<T>) -> Subscription {
        observer(self.0.clone());
        Subscription::empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + 'static>(
        source: &impl Observable<Sequence<T>>,
    ) -> (Rc<RefCell<Vec<Vec<T>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let sub = source.subscribe(Box::new(move |snapshot: Sequence<T>| {
            s.borrow_mut().push(snapshot.to_vec());
        }));
        (seen, sub)
    }

    #[test]
    fn empty_source_waits_for_first_push() {
        let source = SnapshotSource::<i32>::empty();
        let (seen, _sub) = collect(&source);
        assert!(seen.borrow().is_empty());

        source.push(vec![1]);
        assert_eq!(*seen.borrow(), vec![vec![1]]);
    }

    #[test]
    fn each_subscriber_gets_the_latest_snapshot() {
        let source = SnapshotSource::new(vec![1]);
        source.push(vec![1, 2]);
        let (seen, _sub) = collect(&source);
        assert_eq!(*seen.borrow(), vec![vec![1, 2]]);
    }

    #[test]
    fn disposed_subscription_stops_delivery() {
        let source = SnapshotSource::new(vec!['a']);
        let (seen, sub) = collect(&source);
        assert_eq!(source.observer_count(), 1);

        sub.dispose();
        assert_eq!(source.observer_count(), 0);
        source.push(vec!['b']);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn dispose_before_queued_delivery_suppresses_it() {
        let source = SnapshotSource::new(vec![1]);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let src = source.clone();
        let s = seen.clone();
        dispatch(move || {
            // The replay is queued behind this task...
            let s2 = s.clone();
            let sub = src.subscribe(Box::new(move |snap: Sequence<i32>| {
                s2.borrow_mut().push(snap.to_vec());
            }));
            // ...and disposed before it runs.
            sub.dispose();
        });

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn sender_feeds_source_from_another_thread() {
        let source = SnapshotSource::<u32>::empty();
        let (seen, _sub) = collect(&source);
        let sender = source.sender();

        std::thread::spawn(move || {
            sender.send(vec![1]);
            sender.send(vec![1, 2]);
        })
        .join()
        .unwrap();

        assert_eq!(source.pump(), 2);
        assert_eq!(*seen.borrow(), vec![vec![1], vec![1, 2]]);
        assert_eq!(source.pump(), 0);
    }

    #[test]
    fn senders_share_one_queue() {
        let source = SnapshotSource::<u32>::empty();
        let (seen, _sub) = collect(&source);

        let first = source.sender();
        assert!(first.send(vec![1]));
        let second = source.sender();
        assert!(first.send(vec![1, 2]));
        assert!(second.send(vec![3]));

        assert_eq!(source.pump(), 3);
        assert_eq!(*seen.borrow(), vec![vec![1], vec![1, 2], vec![3]]);
        assert_eq!(source.current().map(|s| s.to_vec()), Some(vec![3]));
    }

    #[test]
    fn sender_reports_dropped_source() {
        let source = SnapshotSource::<u32>::empty();
        let sender = source.sender();
        drop(source);
        assert!(!sender.send(vec![1]));
    }

    #[test]
    fn just_emits_once_per_subscriber() {
        let just = Just::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let s = seen.clone();
            let _sub = just.subscribe(Box::new(move |v| s.borrow_mut().push(v)));
        }
        assert_eq!(*seen.borrow(), vec![7, 7]);
    }
}
