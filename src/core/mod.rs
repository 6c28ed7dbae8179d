// ============================================================================
// spark-lists - Core Module
// Fundamental types, flags, errors and the delivery context
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{dispatch, is_delivering, pending_deliveries, with_context, DeliveryContext};
pub use error::{ReconcileError, Result};
pub use types::{sequence, Change, IndexPath, Sequence, Size, Update};
