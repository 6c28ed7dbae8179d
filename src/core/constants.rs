// ============================================================================
// spark-lists - Constants
// Lifecycle flags for subscriptions and binders, plus query defaults
// ============================================================================

use super::types::Size;

// =============================================================================
// LIFECYCLE FLAGS
// =============================================================================

/// Observer slot or binder is registered and accepting deliveries
pub const ACTIVE: u32 = 1 << 0;

/// Binder has received its first full snapshot
pub const BOUND: u32 = 1 << 1;

/// Subscription, observer slot or binder has been disposed
pub const DISPOSED: u32 = 1 << 2;

/// Reconciler hit a consistency violation and stopped processing
pub const FAULTED: u32 = 1 << 3;

/// A delivery is currently applying edits for this binder or reconciler
pub const APPLYING: u32 = 1 << 4;

// =============================================================================
// QUERY DEFAULTS
// =============================================================================

/// Size reported for items the consumer has not materialized yet.
pub const DEFAULT_ITEM_SIZE: Size = Size::new(240.0, 240.0);

// =============================================================================
// TESTS
// =============================================================================
