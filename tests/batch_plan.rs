use paper_batch::{batch_plan::BatchPlan, discover::WorkItem};
use std::num::NonZeroUsize;
use std::path::PathBuf;

fn items(n: usize) -> Vec<WorkItem> {
    (0..n)
        .map(|i| WorkItem {
            path: PathBuf::from(format!("doc{i:02}.pdf")),
            name: format!("doc{i:02}"),
            lang: "en".into(),
        })
        .collect()
}

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn twelve_by_five() {
    let plan = BatchPlan::partition(items(12), size(5));
    assert_eq!(plan.sizes(), vec![5, 5, 2]);
    assert_eq!(plan.item_count, 12);

    let flat: Vec<String> = plan
        .batches
        .iter()
        .flat_map(|b| b.items.iter().map(|i| i.name.clone()))
        .collect();
    let expected: Vec<String> = items(12).into_iter().map(|i| i.name).collect();
    assert_eq!(flat, expected);

    assert_eq!(plan.batches[2].first_item, 11);
    assert_eq!(plan.batches[2].last_item, 12);
}

#[test]
fn exact_multiple_has_no_short_batch() {
    let plan = BatchPlan::partition(items(10), size(5));
    assert_eq!(plan.sizes(), vec![5, 5]);
}

#[test]
fn empty_input_has_no_batches() {
    let plan = BatchPlan::partition(Vec::new(), size(5));
    assert!(plan.is_empty());
    assert_eq!(plan.item_count, 0);
}

#[test]
fn batch_size_one() {
    let plan = BatchPlan::partition(items(3), size(1));
    assert_eq!(plan.sizes(), vec![1, 1, 1]);
    assert_eq!(
        plan.batches.iter().map(|b| b.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
