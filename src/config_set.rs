//! Insertion-ordered sets of configurations with merge-on-insert.
//!
//! The parser simulator folds configurations which differ only in their stack into one
//! element, merging the stacks through the context algebra; the lexer simulator keeps every
//! distinct configuration because its closure is priority ordered. Both behaviors live here,
//! selected at construction.
//!
//! A set becomes read-only when it is published inside an automaton state; the freeze is
//! one-way and a later mutation attempt panics.

use crate::config::AtnConfig;
use crate::context::merge::merge;
use crate::context::{ContextCache, MergeCache};
use crate::predicate::SemanticContext;
use crate::INVALID_ALT;
use bit_set::BitSet;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct AtnConfigSet {
    configs: Vec<AtnConfig>,
    lookup: HashMap<LookupKey, usize>,
    /// Whether this set was built under full-context semantics.
    pub full_ctx: bool,
    ordered: bool,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    /// The one alternative every element predicts, or [INVALID_ALT].
    pub unique_alt: usize,
    pub conflicting_alts: Option<BitSet>,
    readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LookupKey {
    /// Parser sets merge stacks of configurations agreeing on everything but the stack.
    Merged {
        state: usize,
        alt: usize,
        semantic_context: Rc<SemanticContext>,
    },
    /// Lexer sets key on the whole configuration and never merge.
    Full(AtnConfig),
}

impl AtnConfigSet {
    pub fn new(full_ctx: bool) -> Self {
        Self {
            configs: Vec::new(),
            lookup: HashMap::new(),
            full_ctx,
            ordered: false,
            has_semantic_context: false,
            dips_into_outer_context: false,
            unique_alt: INVALID_ALT,
            conflicting_alts: None,
            readonly: false,
        }
    }

    /// A set for the lexer's priority-ordered closure.
    pub fn ordered() -> Self {
        Self {
            ordered: true,
            ..Self::new(true)
        }
    }

    fn key_of(&self, config: &AtnConfig) -> LookupKey {
        if self.ordered {
            LookupKey::Full(config.clone())
        } else {
            LookupKey::Merged {
                state: config.state,
                alt: config.alt,
                semantic_context: Rc::clone(&config.semantic_context),
            }
        }
    }

    /// Insert a configuration, merging stacks when an equal-keyed element exists.
    ///
    /// Returns whether a new element was appended; `false` means the configuration folded
    /// into an existing element and only that element's stack and bookkeeping changed.
    pub fn add(&mut self, config: AtnConfig, merge_cache: &mut MergeCache) -> bool {
        if self.readonly {
            panic!("Config set is readonly and can not be altered.");
        }
        if !config.semantic_context.is_none() {
            self.has_semantic_context = true;
        }
        if config.reaches_into_outer_context > 0 {
            self.dips_into_outer_context = true;
        }
        let key = self.key_of(&config);
        match self.lookup.get(&key) {
            None => {
                self.lookup.insert(key, self.configs.len());
                self.configs.push(config);
                true
            }
            Some(&index) => {
                let root_is_wildcard = !self.full_ctx;
                let existing = &mut self.configs[index];
                let merged = merge(
                    &existing.context,
                    &config.context,
                    root_is_wildcard,
                    merge_cache,
                );
                existing.reaches_into_outer_context = existing
                    .reaches_into_outer_context
                    .max(config.reaches_into_outer_context);
                if config.precedence_filter_suppressed {
                    existing.precedence_filter_suppressed = true;
                }
                existing.context = merged;
                false
            }
        }
    }

    pub fn configs(&self) -> &[AtnConfig] {
        &self.configs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtnConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Every alternative some element predicts.
    pub fn alts(&self) -> BitSet {
        let mut alts = BitSet::new();
        for config in &self.configs {
            alts.insert(config.alt);
        }
        alts
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Freeze the set; the transition is irreversible.
    pub fn set_readonly(&mut self) {
        self.readonly = true;
    }

    /// Swap every stack for its interned counterpart; called when the set is published
    /// inside an automaton state.
    pub fn optimize_contexts(&mut self, cache: &mut ContextCache) {
        if self.readonly {
            panic!("Config set is readonly and can not be altered.");
        }
        let mut visited = HashMap::new();
        for config in &mut self.configs {
            config.context = cache.cached(&config.context, &mut visited);
        }
    }

    /// Structural hash over the elements, used to bucket automaton states.
    pub fn config_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for config in &self.configs {
            config.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.configs == other.configs
            && self.full_ctx == other.full_ctx
            && self.unique_alt == other.unique_alt
            && self.conflicting_alts == other.conflicting_alts
            && self.has_semantic_context == other.has_semantic_context
            && self.dips_into_outer_context == other.dips_into_outer_context
    }
}

impl Eq for AtnConfigSet {}
