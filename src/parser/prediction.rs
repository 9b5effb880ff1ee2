//! Conflict analysis over reach sets.
//!
//! Local-context prediction stops early when the configurations provably cannot be told
//! apart by more input. The test groups configurations by (state, stack) — ignoring the
//! alternative and any predicate — and asks whether every group is undecided. A state still
//! associated with a single alternative keeps prediction going, because that alternative may
//! yet win on its own.

use crate::config_set::AtnConfigSet;
use crate::context::PredictionContext;
use crate::network::Atn;
use crate::predicate::SemanticContext;
use crate::INVALID_ALT;
use bit_set::BitSet;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How aggressively the parser simulator resolves conflicts.
pub enum PredictionMode {
    /// Local context only; a conflict is reported as an error instead of re-running with
    /// full context. Fastest, accepts a strict subset of inputs.
    Sll,
    /// Local context first, full context on conflict. The default.
    Ll,
    /// Like `Ll`, but full-context runs continue until the ambiguity is exact, so every
    /// truly ambiguous decision is reported.
    LlExactAmbigDetection,
}

/// The alternative shared by every configuration, or [INVALID_ALT].
pub fn unique_alt(configs: &AtnConfigSet) -> usize {
    let mut alt = INVALID_ALT;
    for config in configs.iter() {
        if alt == INVALID_ALT {
            alt = config.alt;
        } else if config.alt != alt {
            return INVALID_ALT;
        }
    }
    alt
}

/// Group configurations by (state, stack) and collect each group's alternatives.
pub fn conflicting_alt_subsets(configs: &AtnConfigSet) -> Vec<BitSet> {
    let mut groups: HashMap<(usize, Rc<PredictionContext>), BitSet> = HashMap::new();
    for config in configs.iter() {
        groups
            .entry((config.state, Rc::clone(&config.context)))
            .or_default()
            .insert(config.alt);
    }
    groups.into_values().collect()
}

fn state_to_alt_map(configs: &AtnConfigSet) -> HashMap<usize, BitSet> {
    let mut map: HashMap<usize, BitSet> = HashMap::new();
    for config in configs.iter() {
        map.entry(config.state).or_default().insert(config.alt);
    }
    map
}

fn has_state_associated_with_one_alt(configs: &AtnConfigSet) -> bool {
    state_to_alt_map(configs).values().any(|alts| alts.len() == 1)
}

pub fn has_conflicting_alt_set(alt_sets: &[BitSet]) -> bool {
    alt_sets.iter().any(|alts| alts.len() > 1)
}

pub fn all_subsets_conflict(alt_sets: &[BitSet]) -> bool {
    !alt_sets.iter().any(|alts| alts.len() == 1)
}

pub fn all_subsets_equal(alt_sets: &[BitSet]) -> bool {
    let mut iter = alt_sets.iter();
    match iter.next() {
        None => true,
        Some(first) => iter.all(|alts| alts == first),
    }
}

/// The union of all subsets.
pub fn all_alts(alt_sets: &[BitSet]) -> BitSet {
    let mut union = BitSet::new();
    for alts in alt_sets {
        union.union_with(alts);
    }
    union
}

/// If every subset agrees on its minimum alternative, that alternative; else [INVALID_ALT].
pub fn resolves_to_just_one_viable_alt(alt_sets: &[BitSet]) -> usize {
    let mut viable = INVALID_ALT;
    for alts in alt_sets {
        let min_alt = match alts.iter().next() {
            Some(alt) => alt,
            None => continue,
        };
        if viable == INVALID_ALT {
            viable = min_alt;
        } else if viable != min_alt {
            return INVALID_ALT;
        }
    }
    viable
}

pub fn has_config_in_rule_stop_state(atn: &Atn, configs: &AtnConfigSet) -> bool {
    configs.iter().any(|c| atn.state(c.state).is_rule_stop())
}

pub fn all_configs_in_rule_stop_states(atn: &Atn, configs: &AtnConfigSet) -> bool {
    configs.iter().all(|c| atn.state(c.state).is_rule_stop())
}

/// Whether local-context prediction must give up and re-run with full context.
///
/// Fires when every (state, stack) group conflicts and no state is still associated with a
/// single alternative. Under pure SLL the predicates are stripped first, since they are
/// evaluated at accept time and must not mask a conflict.
pub fn has_sll_conflict_terminating_prediction(
    mode: PredictionMode,
    configs: &AtnConfigSet,
    atn: &Atn,
) -> bool {
    // When every configuration sits at a rule end no further input can separate them.
    if all_configs_in_rule_stop_states(atn, configs) {
        return true;
    }

    let stripped;
    let configs = if mode == PredictionMode::Sll && configs.has_semantic_context {
        let mut merge = crate::context::MergeCache::new();
        let mut dup = AtnConfigSet::new(false);
        for config in configs.iter() {
            dup.add(
                config.with_new_semantic_context(SemanticContext::none()),
                &mut merge,
            );
        }
        stripped = dup;
        &stripped
    } else {
        configs
    };

    let alt_sets = conflicting_alt_subsets(configs);
    has_conflicting_alt_set(&alt_sets) && !has_state_associated_with_one_alt(configs)
}
