//! The augmented transition network reconstructed from its serialized form.
//!
//! A grammar compiles offline into a directed graph of typed states connected by labeled
//! transitions. Rule invocations are ordinary transitions that record a follow state, so the
//! graph is NFA-like with an implicit call stack; loops make it cyclic. The runtime never
//! mutates the graph after [deserialization](AtnDeserializer) — simulators only read it and
//! build their own deterministic caches on the side.
//!
//! States live in one contiguous table indexed by state number and transitions address their
//! targets by index, which keeps the cyclic graph free of back-references and makes the
//! rule-bypass rewrite a plain table edit.

mod atn;
mod deserializer;
mod state;
mod transition;

pub mod analyzer;

#[cfg(test)]
mod __tests__;

pub use deserializer::{AtnDeserializer, DeserializeOptions};

use crate::interval::IntervalSet;
use once_cell::unsync::OnceCell;
use std::rc::Rc;

/// Marker for a state link which has not been resolved yet; never present in a verified network.
pub const INVALID_STATE: usize = usize::MAX;

/// The serialized stream format version understood by this runtime.
pub const SERIALIZED_VERSION: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether the network drives a lexer or a parser.
pub enum GrammarKind {
    Lexer,
    Parser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The format tag of a serialized network, reconstructed from eight 16-bit words.
pub struct Uuid([u16; 8]);

/// The network: a state table plus the rule, mode and decision indexes into it.
#[derive(Debug)]
pub struct Atn {
    pub grammar_kind: GrammarKind,
    pub max_token_type: i32,
    pub(crate) states: Vec<AtnState>,
    /// Decision number to state number.
    pub decision_to_state: Vec<usize>,
    pub rule_to_start_state: Vec<usize>,
    pub rule_to_stop_state: Vec<usize>,
    /// Lexer mode to its `TokensStart` state number.
    pub mode_to_start_state: Vec<usize>,
    /// For lexer grammars, the token type each rule emits; for parser grammars only
    /// populated by the rule-bypass rewrite.
    pub rule_to_token_type: Vec<i32>,
    pub lexer_actions: Vec<LexerAction>,
}

/// One state of the network.
#[derive(Debug)]
pub struct AtnState {
    pub number: usize,
    pub rule: usize,
    pub kind: AtnStateKind,
    /// Maintained on every transition append; true while all outgoing transitions are
    /// non-consuming.
    pub epsilon_only: bool,
    pub(crate) transitions: Vec<Transition>,
    /// Assigned when the state is registered as a decision point.
    pub decision: Option<usize>,
    pub non_greedy: bool,
    pub(crate) next_tokens_cache: OnceCell<IntervalSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The type of a state, with the structural links each type carries.
///
/// The discriminants 1..=12 are the type codes of the serialized form; `Invalid` (code 0)
/// is a numbering placeholder for states the offline compiler removed.
pub enum AtnStateKind {
    Invalid,
    Basic,
    RuleStart {
        stop_state: usize,
        left_recursive: bool,
    },
    BlockStart {
        end_state: usize,
    },
    PlusBlockStart {
        end_state: usize,
        loopback: usize,
    },
    StarBlockStart {
        end_state: usize,
    },
    TokensStart,
    RuleStop,
    BlockEnd {
        start_state: usize,
    },
    StarLoopback,
    StarLoopEntry {
        loopback: usize,
        precedence_decision: bool,
    },
    PlusLoopback,
    LoopEnd {
        loopback: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// An outgoing edge of a state.
///
/// The discriminants 1..=10 are the type codes of the serialized form. Every variant knows
/// its target state; `Rule` transitions additionally record where the caller continues after
/// the invoked rule returns.
pub enum Transition {
    Epsilon {
        target: usize,
        /// The invoked rule when this is the derived return edge leaving the outermost
        /// invocation of a precedence rule; consulted by the precedence filter.
        outermost_precedence_return: Option<usize>,
    },
    Range {
        target: usize,
        from: i32,
        to: i32,
    },
    Rule {
        /// The invoked rule's start state.
        target: usize,
        rule: usize,
        precedence: i32,
        /// Where the invoking rule continues after the invoked rule completes.
        follow_state: usize,
    },
    Predicate {
        target: usize,
        rule: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    Atom {
        target: usize,
        label: i32,
    },
    Action {
        target: usize,
        rule: usize,
        action_index: usize,
        ctx_dependent: bool,
    },
    Set {
        target: usize,
        set: Rc<IntervalSet>,
    },
    NotSet {
        target: usize,
        set: Rc<IntervalSet>,
    },
    Wildcard {
        target: usize,
    },
    Precedence {
        target: usize,
        precedence: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// A side effect executed when a lexer rule matches.
///
/// `Custom` actions observe the input position and are wrapped in `Indexed` before the match
/// position moves on, so the deterministic cache stays position-agnostic.
pub enum LexerAction {
    Channel(usize),
    Custom {
        rule: usize,
        action_index: usize,
    },
    Mode(usize),
    More,
    PopMode,
    PushMode(usize),
    Skip,
    Type(i32),
    Indexed {
        /// Offset from the token start at which the wrapped action was collected.
        offset: usize,
        action: Box<LexerAction>,
    },
}

impl Uuid {
    pub const fn from_words(words: [u16; 8]) -> Self {
        Self(words)
    }

    pub fn words(&self) -> [u16; 8] {
        self.0
    }
}

impl std::fmt::Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let w = &self.0;
        let least = (w[0] as u64) | (w[1] as u64) << 16 | (w[2] as u64) << 32 | (w[3] as u64) << 48;
        let most = (w[4] as u64) | (w[5] as u64) << 16 | (w[6] as u64) << 32 | (w[7] as u64) << 48;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
            most >> 32,
            (most >> 16) & 0xFFFF,
            most & 0xFFFF,
            least >> 48,
            least & 0xFFFF_FFFF_FFFF
        )
    }
}

/// The original serialized format.
pub const BASE_UUID: Uuid = Uuid::from_words([
    0xACF3, 0xEE8A, 0x4F5B, 0x8B0B, 0x4A43, 0x78BB, 0x1B2D, 0x3376,
]);

/// The format revision which introduced precedence transitions and precedence rule markers.
pub const ADDED_PRECEDENCE_TRANSITIONS_UUID: Uuid = Uuid::from_words([
    0x0F61, 0xB3CE, 0x10BC, 0x9B27, 0x438A, 0x6C06, 0xC57D, 0x1DA0,
]);

/// The format revision which moved lexer actions into a dedicated table.
pub const ADDED_LEXER_ACTIONS_UUID: Uuid = Uuid::from_words([
    0xADBE, 0x873C, 0x8050, 0x9B1F, 0x4415, 0xAEEF, 0x8D7E, 0xAADB,
]);

/// Every format revision this runtime accepts, oldest first.
pub const SUPPORTED_UUIDS: [Uuid; 3] = [
    BASE_UUID,
    ADDED_PRECEDENCE_TRANSITIONS_UUID,
    ADDED_LEXER_ACTIONS_UUID,
];
