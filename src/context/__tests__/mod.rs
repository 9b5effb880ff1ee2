use crate::context::merge::merge;
use crate::context::{
    ContextCache, MergeCache, PredictionContext, EMPTY_RETURN_STATE,
};
use std::collections::HashMap;
use std::rc::Rc;

fn over_empty(return_state: i32) -> Rc<PredictionContext> {
    PredictionContext::singleton(Some(PredictionContext::empty()), return_state)
}

fn chain(return_states: &[i32]) -> Rc<PredictionContext> {
    let mut ctx = PredictionContext::empty();
    for return_state in return_states {
        ctx = PredictionContext::singleton(Some(ctx), *return_state);
    }
    ctx
}

#[test]
fn empty_context_compares_equal_only_to_itself() {
    let empty = PredictionContext::empty();
    assert_eq!(empty, PredictionContext::empty());
    assert!(empty.is_empty());
    assert!(empty.has_empty_path());
    assert_eq!(empty.size(), 1);
    assert_eq!(empty.return_state(0), EMPTY_RETURN_STATE);
    assert_ne!(empty, over_empty(7));
}

#[test]
fn singleton_collapse_of_empty_payload() {
    let collapsed = PredictionContext::singleton(None, EMPTY_RETURN_STATE);
    assert!(collapsed.is_empty());

    let real = PredictionContext::singleton(None, 4);
    assert!(!real.is_empty());
    assert_eq!(real.return_state(0), 4);
    assert!(real.parent(0).is_none());
}

#[test]
fn width_one_list_collapses_to_singleton() {
    let listed = PredictionContext::list(vec![Some(PredictionContext::empty())], vec![9]);
    assert_eq!(listed, over_empty(9));
    assert_eq!(listed.size(), 1);
}

#[test]
fn merge_is_idempotent() {
    let mut cache = MergeCache::new();
    let a = chain(&[10, 20]);
    let merged = merge(&a, &a, true, &mut cache);
    assert!(Rc::ptr_eq(&merged, &a));

    let structural_twin = chain(&[10, 20]);
    let merged = merge(&a, &structural_twin, true, &mut cache);
    assert!(Rc::ptr_eq(&merged, &a));
}

#[test]
fn merge_is_commutative() {
    for wildcard in [true, false] {
        let mut cache = MergeCache::new();
        let a = over_empty(10);
        let b = over_empty(20);
        assert_eq!(
            merge(&a, &b, wildcard, &mut cache),
            merge(&b, &a, wildcard, &mut cache)
        );

        let deep_a = chain(&[10, 30]);
        let deep_b = chain(&[20, 30]);
        assert_eq!(
            merge(&deep_a, &deep_b, wildcard, &mut cache),
            merge(&deep_b, &deep_a, wildcard, &mut cache)
        );
    }
}

#[test]
fn wildcard_root_absorbs() {
    let mut cache = MergeCache::new();
    let a = chain(&[10, 20]);
    assert!(merge(&a, &PredictionContext::empty(), true, &mut cache).is_empty());
    assert!(merge(&PredictionContext::empty(), &a, true, &mut cache).is_empty());
}

#[test]
fn full_context_empty_merge_keeps_both_chains() {
    let mut cache = MergeCache::new();
    let a = over_empty(10);
    let merged = merge(&a, &PredictionContext::empty(), false, &mut cache);
    assert_eq!(merged.size(), 2);
    assert_eq!(merged.return_state(0), 10);
    assert_eq!(merged.return_state(1), EMPTY_RETURN_STATE);
    assert!(merged.has_empty_path());
    assert!(merged.parent(1).is_none());
}

#[test]
fn equal_payloads_merge_parents_recursively() {
    let mut cache = MergeCache::new();
    let a = chain(&[10, 42]);
    let b = chain(&[20, 42]);
    let merged = merge(&a, &b, true, &mut cache);
    assert_eq!(merged.size(), 1);
    assert_eq!(merged.return_state(0), 42);
    let parent = merged.parent(0).unwrap();
    assert_eq!(parent.size(), 2);
    assert_eq!(parent.return_state(0), 10);
    assert_eq!(parent.return_state(1), 20);
}

#[test]
fn list_merge_keeps_payloads_sorted_and_disjoint() {
    let mut cache = MergeCache::new();
    let ab = merge(&over_empty(10), &over_empty(30), true, &mut cache);
    let cd = merge(&over_empty(20), &over_empty(40), true, &mut cache);
    let merged = merge(&ab, &cd, true, &mut cache);

    assert_eq!(merged.size(), 4);
    let payloads: Vec<i32> = (0..merged.size()).map(|i| merged.return_state(i)).collect();
    assert_eq!(payloads, vec![10, 20, 30, 40]);
}

#[test]
fn overlapping_list_merge_reuses_operand() {
    let mut cache = MergeCache::new();
    let ab = merge(&over_empty(10), &over_empty(30), true, &mut cache);
    let a = over_empty(10);
    let merged = merge(&ab, &a, true, &mut cache);
    // `a`'s chains are a subset, so the result is the wider operand itself.
    assert!(Rc::ptr_eq(&merged, &ab));
}

#[test]
fn merge_results_are_memoized_per_cache() {
    let mut cache = MergeCache::new();
    let a = over_empty(10);
    let b = over_empty(20);
    let first = merge(&a, &b, true, &mut cache);
    let second = merge(&a, &b, true, &mut cache);
    let swapped = merge(&b, &a, true, &mut cache);
    assert!(Rc::ptr_eq(&first, &second));
    assert!(Rc::ptr_eq(&first, &swapped));
}

#[test]
fn context_cache_interns_structurally() {
    let mut cache = ContextCache::new();
    let first = cache.add(chain(&[10, 20]));
    let second = cache.add(chain(&[10, 20]));
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cached_rewrite_reuses_interned_nodes() {
    let mut cache = ContextCache::new();
    let canonical_parent = cache.add(over_empty(10));

    let fresh = PredictionContext::singleton(Some(over_empty(10)), 30);
    let mut visited = HashMap::new();
    let rewritten = cache.cached(&fresh, &mut visited);

    assert_eq!(rewritten, fresh);
    assert!(Rc::ptr_eq(
        rewritten.parent(0).unwrap(),
        &canonical_parent
    ));

    // A second structurally equal tree resolves to the same canonical instance.
    let again = cache.cached(
        &PredictionContext::singleton(Some(over_empty(10)), 30),
        &mut HashMap::new(),
    );
    assert!(Rc::ptr_eq(&again, &rewritten));
}

#[test]
fn empty_context_is_never_interned() {
    let mut cache = ContextCache::new();
    let mut visited = HashMap::new();
    let empty = cache.cached(&PredictionContext::empty(), &mut visited);
    assert!(empty.is_empty());
    assert_eq!(cache.len(), 0);
}
