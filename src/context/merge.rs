//! The merge algebra over prediction contexts.
//!
//! Two configurations reaching the same network state with the same alternative fold their
//! stacks into one node. Under local (SLL) semantics the root of the stack is a wildcard and
//! absorbs everything it meets; under full-context semantics the empty root stays a distinct
//! chain. Merging never fails and terminates because return states strictly advance through
//! the sorted payload walk and context chains only reference older nodes.

use super::{ContextData, MergeCache, PredictionContext, EMPTY_RETURN_STATE};
use std::collections::HashMap;
use std::rc::Rc;

/// Merge two context nodes; `root_is_wildcard` selects local (SLL) semantics.
pub fn merge(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    if Rc::ptr_eq(a, b) || a == b {
        return Rc::clone(a);
    }
    if a.is_singleton() && b.is_singleton() {
        return merge_singletons(a, b, root_is_wildcard, cache);
    }
    // The wildcard root absorbs any other stack.
    if root_is_wildcard {
        if a.is_empty() {
            return Rc::clone(a);
        }
        if b.is_empty() {
            return Rc::clone(b);
        }
    }
    merge_lists(a, b, root_is_wildcard, cache)
}

fn merge_singletons(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    if let Some(previous) = cache.get(a, b).or_else(|| cache.get(b, a)) {
        return previous;
    }

    if let Some(root) = merge_root(a, b, root_is_wildcard) {
        remember(cache, a, b, &root);
        return root;
    }

    let (a_parent, a_return) = singleton_parts(a);
    let (b_parent, b_return) = singleton_parts(b);

    if a_return == b_return {
        let parent = match (&a_parent, &b_parent) {
            (Some(pa), Some(pb)) => Some(merge(pa, pb, root_is_wildcard, cache)),
            (None, None) => None,
            _ => panic!("Contexts with equal return states must agree on parent presence."),
        };
        // The merged parent equals an operand's parent; keep that operand to preserve sharing.
        if parents_alias(&parent, &a_parent) {
            return Rc::clone(a);
        }
        if parents_alias(&parent, &b_parent) {
            return Rc::clone(b);
        }
        let merged = PredictionContext::singleton(parent, a_return);
        remember(cache, a, b, &merged);
        return merged;
    }

    let shared_parent = match (&a_parent, &b_parent) {
        (Some(pa), Some(pb)) if Rc::ptr_eq(pa, pb) || pa == pb => Some(Rc::clone(pa)),
        (None, None) => None,
        _ => {
            // Distinct payloads with distinct parents become a two-chain list.
            let (parents, payloads) = if a_return > b_return {
                (vec![b_parent, a_parent], vec![b_return, a_return])
            } else {
                (vec![a_parent, b_parent], vec![a_return, b_return])
            };
            let merged = PredictionContext::list(parents, payloads);
            remember(cache, a, b, &merged);
            return merged;
        }
    };

    let payloads = if a_return > b_return {
        vec![b_return, a_return]
    } else {
        vec![a_return, b_return]
    };
    let merged = PredictionContext::list(vec![shared_parent.clone(), shared_parent], payloads);
    remember(cache, a, b, &merged);
    merged
}

/// Handle the empty-root cases; [None] means neither operand is the empty context.
fn merge_root(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
) -> Option<Rc<PredictionContext>> {
    if root_is_wildcard {
        if a.is_empty() || b.is_empty() {
            return Some(PredictionContext::empty());
        }
    } else {
        if a.is_empty() && b.is_empty() {
            return Some(PredictionContext::empty());
        }
        if a.is_empty() {
            let (parent, payload) = singleton_parts(b);
            return Some(PredictionContext::list(
                vec![parent, None],
                vec![payload, EMPTY_RETURN_STATE],
            ));
        }
        if b.is_empty() {
            let (parent, payload) = singleton_parts(a);
            return Some(PredictionContext::list(
                vec![parent, None],
                vec![payload, EMPTY_RETURN_STATE],
            ));
        }
    }
    None
}

fn merge_lists(
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Rc<PredictionContext> {
    if let Some(previous) = cache.get(a, b).or_else(|| cache.get(b, a)) {
        return previous;
    }

    let (a_parents, a_returns) = list_parts(a);
    let (b_parents, b_returns) = list_parts(b);

    let mut merged_parents = Vec::with_capacity(a_returns.len() + b_returns.len());
    let mut merged_returns = Vec::with_capacity(a_returns.len() + b_returns.len());
    let (mut i, mut j) = (0, 0);

    while i < a_returns.len() && j < b_returns.len() {
        if a_returns[i] == b_returns[j] {
            let payload = a_returns[i];
            let a_parent = &a_parents[i];
            let b_parent = &b_parents[j];
            let both_empty =
                payload == EMPTY_RETURN_STATE && a_parent.is_none() && b_parent.is_none();
            let parents_equal = match (a_parent, b_parent) {
                (Some(pa), Some(pb)) => Rc::ptr_eq(pa, pb) || pa == pb,
                _ => false,
            };
            if both_empty || parents_equal {
                merged_parents.push(a_parent.clone());
            } else {
                let parent = match (a_parent, b_parent) {
                    (Some(pa), Some(pb)) => Some(merge(pa, pb, root_is_wildcard, cache)),
                    (None, None) => None,
                    _ => panic!("Chains with equal return states must agree on parent presence."),
                };
                merged_parents.push(parent);
            }
            merged_returns.push(payload);
            i += 1;
            j += 1;
        } else if a_returns[i] < b_returns[j] {
            merged_parents.push(a_parents[i].clone());
            merged_returns.push(a_returns[i]);
            i += 1;
        } else {
            merged_parents.push(b_parents[j].clone());
            merged_returns.push(b_returns[j]);
            j += 1;
        }
    }
    while i < a_returns.len() {
        merged_parents.push(a_parents[i].clone());
        merged_returns.push(a_returns[i]);
        i += 1;
    }
    while j < b_returns.len() {
        merged_parents.push(b_parents[j].clone());
        merged_returns.push(b_returns[j]);
        j += 1;
    }

    if merged_returns.len() == 1 {
        let merged =
            PredictionContext::singleton(merged_parents.pop().unwrap(), merged_returns[0]);
        remember(cache, a, b, &merged);
        return merged;
    }

    combine_common_parents(&mut merged_parents);
    let merged = PredictionContext::list(merged_parents, merged_returns);
    // A merge which reproduces an operand returns that operand to preserve graph sharing.
    if &merged == a {
        remember(cache, a, b, a);
        return Rc::clone(a);
    }
    if &merged == b {
        remember(cache, a, b, b);
        return Rc::clone(b);
    }
    remember(cache, a, b, &merged);
    merged
}

/// Alias structurally identical parent entries so equal sub-stacks share one node.
fn combine_common_parents(parents: &mut [Option<Rc<PredictionContext>>]) {
    let mut unique: HashMap<Rc<PredictionContext>, Rc<PredictionContext>> = HashMap::new();
    for slot in parents.iter_mut() {
        if let Some(parent) = slot {
            match unique.get(parent) {
                Some(canonical) => *slot = Some(Rc::clone(canonical)),
                None => {
                    unique.insert(Rc::clone(parent), Rc::clone(parent));
                }
            }
        }
    }
}

fn singleton_parts(ctx: &Rc<PredictionContext>) -> (Option<Rc<PredictionContext>>, i32) {
    match &ctx.data {
        ContextData::Singleton {
            parent,
            return_state,
        } => (parent.clone(), *return_state),
        ContextData::Empty => (None, EMPTY_RETURN_STATE),
        ContextData::List { .. } => panic!("Expected a singleton context."),
    }
}

fn list_parts(ctx: &Rc<PredictionContext>) -> (Vec<Option<Rc<PredictionContext>>>, Vec<i32>) {
    match &ctx.data {
        ContextData::Empty => (vec![None], vec![EMPTY_RETURN_STATE]),
        ContextData::Singleton {
            parent,
            return_state,
        } => (vec![parent.clone()], vec![*return_state]),
        ContextData::List {
            parents,
            return_states,
        } => (parents.clone(), return_states.clone()),
    }
}

fn parents_alias(
    merged: &Option<Rc<PredictionContext>>,
    original: &Option<Rc<PredictionContext>>,
) -> bool {
    match (merged, original) {
        (None, None) => true,
        (Some(m), Some(o)) => Rc::ptr_eq(m, o),
        _ => false,
    }
}

fn remember(
    cache: &mut MergeCache,
    a: &Rc<PredictionContext>,
    b: &Rc<PredictionContext>,
    result: &Rc<PredictionContext>,
) {
    cache.put(Rc::clone(a), Rc::clone(b), Rc::clone(result));
    cache.put(Rc::clone(b), Rc::clone(a), Rc::clone(result));
}
