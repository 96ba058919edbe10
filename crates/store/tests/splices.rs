#![forbid(unsafe_code)]

use sift_core::{Change, SourceList, Splice};
use sift_store::{Edit, FilterSpec, Projector, Route, SortSpec};

fn settle(p: &mut Projector<i32>, src: &SourceList<i32>) -> Vec<i32> {
    p.flush(Some(src.as_slice())).unwrap();
    p.projection().unwrap().to_vec()
}

fn fresh(src: &SourceList<i32>, filter: impl Fn(&i32) -> bool, asc: bool) -> Vec<i32> {
    let mut v: Vec<i32> = src.as_slice().iter().copied().filter(|x| filter(x)).collect();
    if asc { v.sort(); }
    v
}

#[test]
fn batch_inserts_land_in_ascending_target_order() {
    let mut src = SourceList::new(vec![1, 5, 9]);
    let mut p = Projector::new();
    p.set_sort(Some(SortSpec::new(|a: &i32, b: &i32| a.cmp(b))));
    assert_eq!(settle(&mut p, &src), vec![1, 5, 9]);
    p.take_edits();

    let c = src.splice(3, 0, [7, 2, 8]);
    assert_eq!(p.apply(src.as_slice(), &c).unwrap(), Route::Splice);
    assert!(!p.is_pending());
    assert_eq!(p.projection().unwrap(), &[1, 2, 5, 7, 8, 9]);
    assert_eq!(
        p.take_edits(),
        vec![
            Edit::Insert { index: 1, item: 2 },
            Edit::Insert { index: 3, item: 7 },
            Edit::Insert { index: 4, item: 8 },
        ]
    );
    assert_eq!(p.projection().unwrap(), fresh(&src, |_| true, true).as_slice());
}

#[test]
fn removing_a_filtered_out_item_is_a_noop() {
    let mut src = SourceList::new(vec![1, 2, 3, 4]);
    let mut p = Projector::new();
    p.set_filter(Some(FilterSpec::new(|x: &i32| x % 2 == 0)));
    assert_eq!(settle(&mut p, &src), vec![2, 4]);
    p.take_edits();

    let c = src.remove(0).unwrap();
    p.apply(src.as_slice(), &c).unwrap();
    assert_eq!(p.projection().unwrap(), &[2, 4]);
    assert!(p.take_edits().is_empty());
    // links follow the shifted source positions
    assert_eq!(p.links().projection_index(0), Some(0));
    assert_eq!(p.links().projection_index(2), Some(1));
    assert_eq!(p.links().projection_index(1), None);
}

#[test]
fn untouched_items_keep_relative_order() {
    let mut src = SourceList::new(vec![3, -1, 5, 2]);
    let mut p = Projector::new();
    p.set_filter(Some(FilterSpec::new(|x: &i32| *x > 0)));
    assert_eq!(settle(&mut p, &src), vec![3, 5, 2]);

    let c = src.insert(1, 4);
    p.apply(src.as_slice(), &c).unwrap();
    assert_eq!(p.projection().unwrap(), &[3, 4, 5, 2]);

    let c = src.splice(2, 2, [-7, 6]);
    p.apply(src.as_slice(), &c).unwrap();
    assert_eq!(src.as_slice(), &[3, 4, -7, 6, 2]);
    assert_eq!(p.projection().unwrap(), &[3, 4, 6, 2]);
    assert_eq!(p.projection().unwrap(), fresh(&src, |x| *x > 0, false).as_slice());
}

#[test]
fn multiple_regions_in_one_batch() {
    // [a, b, c, d] -> remove b, then append e
    let src = vec!["a", "c", "d", "e"];
    let mut p = Projector::<&str>::new();
    p.update();
    p.flush(Some(["a", "b", "c", "d"].as_slice())).unwrap();

    let batch = Change::Splices(vec![Splice::new(1, vec!["b"], 0), Splice::new(3, vec![], 1)]);
    p.apply(&src, &batch).unwrap();
    assert_eq!(p.projection().unwrap(), &["a", "c", "d", "e"]);
    assert_eq!(p.links().source_index(3), Some(3));
}

#[test]
fn string_descriptors_route_like_events() {
    let mut src = SourceList::new(vec![2, 1]);
    let mut p = Projector::new();
    p.set_sort(Some(SortSpec::new(|a: &i32, b: &i32| a.cmp(b))));
    settle(&mut p, &src);

    let length = Change::<i32>::from_descriptor("items", "items.length", None).unwrap();
    assert_eq!(p.apply(src.as_slice(), &length).unwrap(), Route::Ignore);

    src.push(0);
    let splices = Change::from_descriptor("items", "items.splices", Some(vec![Splice::new(2, vec![], 1)])).unwrap();
    assert_eq!(p.apply(src.as_slice(), &splices).unwrap(), Route::Splice);
    assert_eq!(p.projection().unwrap(), &[0, 1, 2]);

    // malformed descriptors never reach the engine
    assert!(Change::<i32>::from_descriptor("items", "items.x.y", None).is_none());

    let replace = Change::<i32>::from_descriptor("items", "items", None).unwrap();
    src.replace_all(vec![9, 8]);
    assert_eq!(p.apply(src.as_slice(), &replace).unwrap(), Route::Recompute);
    assert!(p.is_pending());
    assert_eq!(settle(&mut p, &src), vec![8, 9]);
}

#[test]
fn item_replaced_in_place_triggers_recompute() {
    let mut src = SourceList::new(vec![1, 2, 3]);
    let mut p = Projector::new();
    p.set_filter(Some(FilterSpec::new(|x: &i32| *x < 10)));
    settle(&mut p, &src);

    let c = src.set(1, 20).unwrap();
    assert_eq!(p.apply(src.as_slice(), &c).unwrap(), Route::Recompute);
    assert_eq!(settle(&mut p, &src), vec![1, 3]);
}

#[test]
fn incremental_edit_before_pending_recompute_is_harmless() {
    let mut src = SourceList::new(vec![1, 2, 3, 4]);
    let mut p = Projector::new();
    p.update();
    settle(&mut p, &src);

    p.set_filter(Some(FilterSpec::new(|x: &i32| x % 2 == 1)));
    let c = src.push(5);
    p.apply(src.as_slice(), &c).unwrap();
    assert!(p.is_pending());
    assert_eq!(settle(&mut p, &src), vec![1, 3, 5]);
}
