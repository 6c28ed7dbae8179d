// ============================================================================
// spark-lists - Binding Module
// Consumers, item binders, section reconcilers and their owned handles
// ============================================================================

pub mod consumer;
pub mod handle;
pub mod item;
pub mod options;
pub mod sections;
pub mod sizing;

// Re-export for convenience
pub use consumer::{shared, CollectionConsumer, ConsumerCall, RecordingConsumer, SharedConsumer};
pub use handle::{BoundList, BoundSections};
pub use item::ItemBinder;
pub use options::BindOptions;
pub use sections::{
    SectionReconciler, SectionReconcilerBuilder, SectionTransformer, SelectFn,
    StructuralReconciler,
};
pub use sizing::{SizeProvider, SizerFn, SizingReconciler};
