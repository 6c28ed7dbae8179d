// ============================================================================
// spark-lists - Bind Options
// ============================================================================

use crate::core::constants::DEFAULT_ITEM_SIZE;
use crate::core::types::Size;

/// Options for binding a reconciler to a consumer.
///
/// # Example
///
/// ```
/// use spark_lists::{BindOptions, Size};
///
/// let options = BindOptions::default().fallback_size(Size::new(44.0, 44.0));
/// assert_eq!(options.fallback, Size::new(44.0, 44.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindOptions {
    /// Size reported for items the consumer has not materialized yet.
    pub fallback: Size,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size reported for not-yet-materialized items.
    pub fn fallback_size(mut self, size: Size) -> Self {
        self.fallback = size;
        self
    }
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_ITEM_SIZE,
        }
    }
}
