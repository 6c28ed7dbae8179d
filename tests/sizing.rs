mod common;

use common::MirrorConsumer;
use spark_lists::{
    BindOptions, IndexPath, ObservableList, SectionReconciler, Size, SizeProvider,
    SizingReconciler, SnapshotSource, StructuralReconciler,
};

const FALLBACK: Size = Size::new(240.0, 240.0);

fn sizing(sections: &SnapshotSource<u16>) -> SizingReconciler<u16, u16> {
    SizingReconciler::with_sections(
        ObservableList::diff(sections.clone()),
        |n: &u16| ObservableList::of((1..=*n).collect()),
        |path, item: &u16| Size::new(320.0, f64::from(*item) + path.section as f64),
    )
}

#[test]
fn test_default_fallback_is_240_square() {
    assert_eq!(BindOptions::default().fallback, FALLBACK);
}

#[test]
fn test_sizes_for_materialized_items() {
    let sections = SnapshotSource::new(vec![2, 3]);
    let r = sizing(&sections);
    let consumer = MirrorConsumer::new();
    consumer.borrow_mut().watch(r.base());
    let _sub = r.bind(consumer.clone()).unwrap();

    assert_eq!(r.size_for_item(IndexPath::new(0, 1)), Size::new(320.0, 2.0));
    assert_eq!(r.size_for_item(IndexPath::new(1, 2)), Size::new(320.0, 4.0));
}

#[test]
fn test_out_of_range_paths_get_fallback() {
    let sections = SnapshotSource::new(vec![1]);
    let r = sizing(&sections);
    let consumer = MirrorConsumer::new();
    consumer.borrow_mut().watch(r.base());
    let _sub = r.bind(consumer.clone()).unwrap();

    assert_eq!(r.size_for_item(IndexPath::new(0, 1)), FALLBACK);
    assert_eq!(r.size_for_item(IndexPath::new(4, 0)), FALLBACK);
}

#[test]
fn test_size_queries_during_edits_get_fallback() {
    let sections = SnapshotSource::new(vec![1]);
    let r = sizing(&sections);
    let consumer = MirrorConsumer::new();
    consumer.borrow_mut().watch(r.base());
    let _sub = r.bind(consumer.clone()).unwrap();

    // A layout asking while the consumer is in the middle of an edit.
    let held = consumer.borrow_mut();
    assert_eq!(r.size_for_item(IndexPath::new(0, 0)), FALLBACK);
    drop(held);
    assert_eq!(r.size_for_item(IndexPath::new(0, 0)), Size::new(320.0, 1.0));
}

#[test]
fn test_custom_fallback() {
    let sections = SnapshotSource::new(vec![1u16]);
    let base = SectionReconciler::builder(ObservableList::diff(sections.clone()), |n: &u16| {
        ObservableList::of((0..*n).collect())
    })
    .options(BindOptions::new().fallback_size(Size::new(44.0, 44.0)))
    .build();
    let r = SizingReconciler::new(base, |_, _: &u16| Size::new(1.0, 1.0));

    assert_eq!(r.size_for_item(IndexPath::new(0, 0)), Size::new(44.0, 44.0));
}

#[test]
fn test_sizing_tracks_section_moves() {
    let sections = SnapshotSource::new(vec![1, 5]);
    let r = sizing(&sections);
    let consumer = MirrorConsumer::new();
    consumer.borrow_mut().watch(r.base());
    let _sub = r.bind(consumer.clone()).unwrap();

    sections.push(vec![5, 1]);

    assert!(consumer.borrow().violations.is_empty());
    assert_eq!(consumer.borrow().counts(), vec![5, 1]);
    assert_eq!(r.size_for_item(IndexPath::new(0, 4)), Size::new(320.0, 5.0));
    assert_eq!(r.size_for_item(IndexPath::new(1, 0)), Size::new(320.0, 2.0));
}
