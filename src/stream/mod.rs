// ============================================================================
// spark-lists - Stream Module
// Subscriptions, observable sources, the update accumulator and lists
// ============================================================================

pub mod accumulator;
pub mod list;
pub mod observable;
pub mod subscription;

// Re-export for convenience
pub use accumulator::{Accumulated, UpdateAccumulator};
pub use list::ObservableList;
pub use observable::{Just, Observable, Observer, SnapshotSender, SnapshotSource};
pub use subscription::{DisposalWatch, Subscription, TeardownFn};
