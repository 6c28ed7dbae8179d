// ============================================================================
// spark-lists - Reactive Sectioned Lists for Rust
// ============================================================================
//
// Turns streams of full snapshots into incremental edits on a collection
// widget that only accepts structural edits:
//
//   snapshots -> UpdateAccumulator -> Update<S> -> SectionReconciler
//             -> one ItemBinder per section -> consumer item edits
// ============================================================================

pub mod binding;
pub mod core;
pub mod diff;
pub mod stream;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{dispatch, is_delivering, pending_deliveries, with_context, DeliveryContext};
pub use crate::core::error::{ReconcileError, Result};
pub use crate::core::types::{sequence, Change, IndexPath, Sequence, Size, Update};

// Re-export the edit script generators
pub use diff::{apply_edits, Edit, EditScriptGenerator, IdentityDiff};

// Re-export streams
pub use stream::{
    Accumulated, DisposalWatch, Just, Observable, ObservableList, Observer, SnapshotSender,
    SnapshotSource, Subscription, TeardownFn, UpdateAccumulator,
};

// Re-export binding
pub use binding::{
    shared, BindOptions, BoundList, BoundSections, CollectionConsumer, ConsumerCall, ItemBinder,
    RecordingConsumer, SectionReconciler, SectionReconcilerBuilder, SectionTransformer, SelectFn,
    SharedConsumer, SizeProvider, SizerFn, SizingReconciler, StructuralReconciler,
};

// =============================================================================
// TESTS
// =============================================================================
