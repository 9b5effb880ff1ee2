//! The per-decision deterministic automata the simulators build at run time.
//!
//! States live in an arena owned by their [Dfa] and are addressed by [DfaStateId]; edges
//! store target ids, so the automaton can grow while earlier states are read. A state is
//! deduplicated on insertion by the equality of its frozen configuration set and the
//! canonical id is returned to the caller.
//!
//! A decision inside a precedence rule gets a *precedence* automaton: instead of one fixed
//! start state it keeps a start-state table indexed by the parser's precedence at the time of
//! the decision, expanded on demand.

use crate::config_set::AtnConfigSet;
use crate::context::ContextCache;
use crate::lexer::LexerActionExecutor;
use crate::predicate::SemanticContext;
use crate::INVALID_ALT;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// A wrapper to indicate the index of a state in its automaton's arena.
pub struct DfaStateId(usize);

impl DfaStateId {
    /// The sentinel every dead edge points at; not a real arena index.
    pub const ERROR: DfaStateId = DfaStateId(usize::MAX);

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

impl Display for DfaStateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_error() {
            write!(f, "<error>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One state of a deterministic automaton: a frozen configuration set plus the prediction
/// facts derived from it.
pub struct DfaState {
    pub configs: Rc<AtnConfigSet>,
    edges: Vec<Option<DfaStateId>>,
    pub is_accept: bool,
    /// The predicted alternative of a parser accept state, [INVALID_ALT] when predicates
    /// decide at accept time.
    pub prediction: usize,
    /// The token type a lexer accept state emits.
    pub token_type: i32,
    /// Local-context prediction conflicted here; re-run the decision with full context.
    pub requires_full_context: bool,
    /// Predicate/alternative pairs evaluated at accept time, in decision order.
    pub predicates: Vec<(Rc<SemanticContext>, usize)>,
    /// Lexer automata: the actions to run when this state accepts.
    pub executor: Option<Rc<LexerActionExecutor>>,
}

/// A lazily grown deterministic automaton for one decision.
pub struct Dfa {
    pub decision: usize,
    /// The network state this decision starts from.
    pub atn_start_state: usize,
    states: Vec<DfaState>,
    by_hash: HashMap<u64, Vec<DfaStateId>>,
    edge_capacity: usize,
    pub s0: Option<DfaStateId>,
    precedence_dfa: bool,
    precedence_starts: Vec<Option<DfaStateId>>,
}

impl DfaState {
    pub fn new(configs: AtnConfigSet) -> Self {
        Self {
            configs: Rc::new(configs),
            edges: Vec::new(),
            is_accept: false,
            prediction: INVALID_ALT,
            token_type: crate::TOKEN_INVALID,
            requires_full_context: false,
            predicates: Vec::new(),
            executor: None,
        }
    }
}

impl Dfa {
    /// `edge_capacity` is the number of edge slots per state: the symbol vocabulary plus
    /// the end-of-input slot.
    pub fn new(decision: usize, atn_start_state: usize, edge_capacity: usize) -> Self {
        Self {
            decision,
            atn_start_state,
            states: Vec::new(),
            by_hash: HashMap::new(),
            edge_capacity,
            s0: None,
            precedence_dfa: false,
            precedence_starts: Vec::new(),
        }
    }

    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id.0]
    }

    pub fn state_mut(&mut self, id: DfaStateId) -> &mut DfaState {
        &mut self.states[id.0]
    }

    pub fn number_of_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> impl Iterator<Item = &DfaState> {
        self.states.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = DfaStateId> {
        (0..self.states.len()).map(DfaStateId)
    }

    /// The stored edges of a state as (edge index, target) pairs.
    pub fn edges_of(&self, from: DfaStateId) -> impl Iterator<Item = (usize, DfaStateId)> + '_ {
        self.states[from.0]
            .edges
            .iter()
            .enumerate()
            .filter_map(|(index, target)| target.map(|t| (index, t)))
    }

    /// Insert a state, or return the id of the equal state already present.
    ///
    /// A new state's configuration set is interned through `cache` and frozen; the freeze is
    /// one-way, so automaton states never change their identity after publication.
    pub fn add_state(&mut self, mut state: DfaState, cache: &mut ContextCache) -> DfaStateId {
        let hash = state.configs.config_hash();
        if let Some(candidates) = self.by_hash.get(&hash) {
            for &candidate in candidates {
                if self.states[candidate.0].configs == state.configs {
                    return candidate;
                }
            }
        }
        if !state.configs.is_readonly() {
            let configs = Rc::make_mut(&mut state.configs);
            configs.optimize_contexts(cache);
            configs.set_readonly();
        }
        let id = DfaStateId(self.states.len());
        self.states.push(state);
        self.by_hash.entry(hash).or_default().push(id);
        id
    }

    /// The stored edge for `index`, where index 0 is end-of-input.
    pub fn edge(&self, from: DfaStateId, index: usize) -> Option<DfaStateId> {
        let edges = &self.states[from.0].edges;
        if index < edges.len() {
            edges[index]
        } else {
            None
        }
    }

    /// Record an edge; an index outside the vocabulary is silently dropped.
    pub fn set_edge(&mut self, from: DfaStateId, index: usize, to: DfaStateId) {
        if index >= self.edge_capacity {
            return;
        }
        let capacity = self.edge_capacity;
        let edges = &mut self.states[from.0].edges;
        if edges.is_empty() {
            edges.resize(capacity, None);
        }
        edges[index] = Some(to);
    }

    pub fn is_precedence_dfa(&self) -> bool {
        self.precedence_dfa
    }

    /// Switch between the plain and the precedence start-state layout; switching clears
    /// everything built so far.
    pub fn set_precedence_dfa(&mut self, precedence_dfa: bool) {
        if self.precedence_dfa == precedence_dfa {
            return;
        }
        self.states.clear();
        self.by_hash.clear();
        self.s0 = None;
        self.precedence_starts.clear();
        self.precedence_dfa = precedence_dfa;
    }

    pub fn precedence_start_state(&self, precedence: i32) -> Option<DfaStateId> {
        if !self.precedence_dfa {
            panic!("Only precedence automata have per-precedence start states.");
        }
        if precedence < 0 {
            return None;
        }
        self.precedence_starts
            .get(precedence as usize)
            .copied()
            .flatten()
    }

    pub fn set_precedence_start_state(&mut self, precedence: i32, start: DfaStateId) {
        if !self.precedence_dfa {
            panic!("Only precedence automata have per-precedence start states.");
        }
        if precedence < 0 {
            return;
        }
        let index = precedence as usize;
        if index >= self.precedence_starts.len() {
            self.precedence_starts.resize(index + 1, None);
        }
        self.precedence_starts[index] = Some(start);
    }
}
