//! The lexer simulator.
//!
//! Tokenization runs the network of the current lexer mode against the character stream and
//! returns the token type of the longest match, preferring the rule listed first when several
//! rules match the same length. Every mode grows its own deterministic automaton; a position
//! where the automaton already has an edge costs one array lookup, everything else falls back
//! to a closure walk over the network.
//!
//! The closure is priority ordered: once an alternative reaches an accept state, later
//! configurations of the same alternative that crossed a non-greedy decision are dropped.
//! Actions collected mid-token are pinned to their offset (see
//! [LexerActionExecutor::fix_offset_before_match]) so the automaton stays position-agnostic,
//! and predicate transitions keep their edge out of the automaton so the predicate is
//! re-evaluated on every match.

mod executor;


pub use executor::LexerActionExecutor;

use crate::automaton::{Dfa, DfaState, DfaStateId};
use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{ContextCache, MergeCache, PredictionContext};
use crate::errors::LexerNoViableAlt;
use crate::network::{Atn, Transition};
use crate::{ICharStream, ILexer, Log, INVALID_ALT, TOKEN_EOF};
use once_cell::unsync::OnceCell;
use std::rc::Rc;

/// The smallest character stored as an automaton edge.
pub const MIN_DFA_EDGE: i32 = 0;
/// The largest character stored as an automaton edge; rarer characters always take the
/// closure path.
pub const MAX_DFA_EDGE: i32 = 127;

/// The largest code point a lexer rule can match.
pub const MAX_CHAR: i32 = 0x10FFFF;

/// Longest-match token recognition over the network of the current mode.
pub struct LexerAtnSimulator {
    atn: Rc<Atn>,
    dfas: Vec<Dfa>,
    cache: ContextCache,
    /// Line number of the current input position, starting at 1.
    pub line: usize,
    /// Character position within the current line, starting at 0.
    pub column: usize,
    log: OnceCell<Log<&'static str>>,
}

/// Checkpoint of the last accept state seen while extending a match.
struct SimState {
    index: Option<usize>,
    line: usize,
    column: usize,
    dfa_state: Option<DfaStateId>,
}

impl SimState {
    fn new() -> Self {
        Self {
            index: None,
            line: 0,
            column: 0,
            dfa_state: None,
        }
    }
}

impl LexerAtnSimulator {
    pub fn new(atn: Rc<Atn>) -> Self {
        let dfas = (0..atn.number_of_modes())
            .map(|mode| {
                Dfa::new(
                    mode,
                    atn.mode_to_start_state[mode],
                    (MAX_DFA_EDGE - MIN_DFA_EDGE + 1) as usize,
                )
            })
            .collect();
        Self {
            atn,
            dfas,
            cache: ContextCache::new(),
            line: 1,
            column: 0,
            log: OnceCell::new(),
        }
    }

    /// Set a log label to debug the simulator.
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    /// Reset the position tracking, e.g. when the input is replaced.
    pub fn reset(&mut self) {
        self.line = 1;
        self.column = 0;
    }

    /// The deterministic automaton grown for `mode` so far.
    pub fn dfa(&self, mode: usize) -> &Dfa {
        &self.dfas[mode]
    }

    /// A sorted text dump of the automaton grown for `mode`, for debugging.
    ///
    /// Accept states print as `:sN=>tokenType`; edge labels print as characters.
    pub fn dump_dfa(&self, mode: usize) -> String {
        use std::fmt::Write;
        let dfa = &self.dfas[mode];
        let mut out = String::new();
        for id in dfa.ids() {
            for (index, target) in dfa.edges_of(id) {
                let symbol = index as i32 + MIN_DFA_EDGE;
                let label = match char::from_u32(symbol as u32) {
                    Some(c) if !c.is_control() => format!("'{}'", c),
                    _ => symbol.to_string(),
                };
                writeln!(
                    out,
                    "{}-{}->{}",
                    lexer_state_label(dfa, id),
                    label,
                    lexer_state_label(dfa, target)
                )
                .unwrap();
            }
        }
        out
    }

    /// Match one token at `input.index()` in `mode` and return its token type.
    ///
    /// On success the input is positioned after the match and the accept state's actions
    /// have run against `lexer`. At end of input an EOF token type is returned.
    pub fn match_token(
        &mut self,
        input: &mut dyn ICharStream,
        mode: usize,
        lexer: &mut dyn ILexer,
    ) -> Result<i32, LexerNoViableAlt> {
        let start_index = input.index();
        let log = self.log.get().copied().unwrap_or(Log::None);
        let atn: &Atn = &self.atn;
        let dfa = &mut self.dfas[mode];
        let mut run = LexerRun {
            atn,
            dfa,
            cache: &mut self.cache,
            merge: MergeCache::new(),
            input,
            lexer,
            start_index,
            line: &mut self.line,
            column: &mut self.column,
            prev_accept: SimState::new(),
            log,
        };
        match run.dfa.s0 {
            Some(s0) => run.exec(s0),
            None => run.match_atn(),
        }
    }
}

struct LexerRun<'r> {
    atn: &'r Atn,
    dfa: &'r mut Dfa,
    cache: &'r mut ContextCache,
    merge: MergeCache,
    input: &'r mut dyn ICharStream,
    lexer: &'r mut dyn ILexer,
    start_index: usize,
    line: &'r mut usize,
    column: &'r mut usize,
    prev_accept: SimState,
    log: Log<&'static str>,
}

impl<'r> LexerRun<'r> {
    /// First visit of this mode: build the start state from the network.
    fn match_atn(&mut self) -> Result<i32, LexerNoViableAlt> {
        let start_state = self.dfa.atn_start_state;
        let mut s0_closure = self.compute_start_state(start_state);
        let suppress_edge = s0_closure.has_semantic_context;
        s0_closure.has_semantic_context = false;
        let next = self.add_dfa_state(s0_closure);
        if !suppress_edge {
            self.dfa.s0 = Some(next);
        }
        self.exec(next)
    }

    fn exec(&mut self, ds0: DfaStateId) -> Result<i32, LexerNoViableAlt> {
        #[cfg(debug_assertions)]
        if self.log.allows(Log::Verbose(())) {
            println!(
                "[{}; LexerMatch]: mode {} at input {}",
                self.log, self.dfa.decision, self.start_index
            );
        }

        if self.dfa.state(ds0).is_accept {
            self.capture_sim_state(ds0);
        }

        let mut s = ds0;
        let mut t = self.input.la(1);
        loop {
            let target = match self.existing_target_state(s, t) {
                Some(existing) => existing,
                None => self.compute_target_state(s, t),
            };
            if target.is_error() {
                break;
            }

            // Consume before checkpointing so the recorded index is the match end.
            if t != TOKEN_EOF {
                self.consume();
            }
            if self.dfa.state(target).is_accept {
                self.capture_sim_state(target);
                if t == TOKEN_EOF {
                    break;
                }
            }
            t = self.input.la(1);
            s = target;
        }

        self.fail_or_accept(s, t)
    }

    fn existing_target_state(&self, s: DfaStateId, t: i32) -> Option<DfaStateId> {
        if (MIN_DFA_EDGE..=MAX_DFA_EDGE).contains(&t) {
            self.dfa.edge(s, (t - MIN_DFA_EDGE) as usize)
        } else {
            None
        }
    }

    fn compute_target_state(&mut self, s: DfaStateId, t: i32) -> DfaStateId {
        let mut reach = AtnConfigSet::ordered();
        self.reachable_config_set(s, &mut reach, t);

        if reach.is_empty() {
            // A predicate blocked every path; without predicates the dead edge is cached.
            if !reach.has_semantic_context {
                self.add_dfa_edge(s, t, DfaStateId::ERROR);
            }
            return DfaStateId::ERROR;
        }

        let suppress_edge = reach.has_semantic_context;
        reach.has_semantic_context = false;
        let to = self.add_dfa_state(reach);
        if !suppress_edge {
            self.add_dfa_edge(s, t, to);
        }
        to
    }

    /// Advance every configuration of `s` along edges matching `t` and close over the
    /// results, honoring alternative priority.
    fn reachable_config_set(&mut self, s: DfaStateId, reach: &mut AtnConfigSet, t: i32) {
        let atn = self.atn;
        let closure_configs = Rc::clone(&self.dfa.state(s).configs);
        let mut skip_alt = INVALID_ALT;
        for config in closure_configs.iter() {
            let current_alt_reached_accept = config.alt == skip_alt;
            if current_alt_reached_accept && config.passed_non_greedy {
                continue;
            }
            for i in 0..atn.state(config.state).number_of_transitions() {
                let transition = atn.state(config.state).transition(i);
                if let Some(target) = reachable_target(transition, t) {
                    let executor = config
                        .executor
                        .as_ref()
                        .map(|e| e.fix_offset_before_match(self.input.index() - self.start_index));
                    let moved = config.lexer_moved_with_executor(atn, target, executor);
                    let treat_eof_as_epsilon = t == TOKEN_EOF;
                    if self.closure(moved, reach, current_alt_reached_accept, true, treat_eof_as_epsilon)
                    {
                        // The first alternative reaching an accept state shadows the rest
                        // of its own alternative.
                        skip_alt = config.alt;
                        break;
                    }
                }
            }
        }
    }

    fn compute_start_state(&mut self, start_state: usize) -> AtnConfigSet {
        let atn = self.atn;
        let initial_context = PredictionContext::empty();
        let mut configs = AtnConfigSet::ordered();
        for i in 0..atn.state(start_state).number_of_transitions() {
            let target = atn.state(start_state).transition(i).target();
            let config = AtnConfig::new(target, i + 1, Rc::clone(&initial_context));
            self.closure(config, &mut configs, false, false, false);
        }
        configs
    }

    /// Close over the epsilon reachability of `config`; returns whether an accept state was
    /// reached for the configuration's alternative.
    fn closure(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        mut current_alt_reached_accept: bool,
        speculative: bool,
        treat_eof_as_epsilon: bool,
    ) -> bool {
        let atn = self.atn;

        if atn.state(config.state).is_rule_stop() {
            if config.context.has_empty_path() {
                if config.context.is_empty() {
                    configs.add(config, &mut self.merge);
                    return true;
                } else {
                    let rebased =
                        config.moved_with_context(config.state, PredictionContext::empty());
                    configs.add(rebased, &mut self.merge);
                    current_alt_reached_accept = true;
                }
            }
            if !config.context.is_empty() {
                for i in 0..config.context.size() {
                    if config.context.return_state(i) == crate::context::EMPTY_RETURN_STATE {
                        continue;
                    }
                    let return_state = config.context.return_state(i) as usize;
                    let parent = config
                        .context
                        .parent(i)
                        .cloned()
                        .unwrap_or_else(PredictionContext::empty);
                    let popped = config.lexer_moved_with_context(atn, return_state, parent);
                    current_alt_reached_accept = self.closure(
                        popped,
                        configs,
                        current_alt_reached_accept,
                        speculative,
                        treat_eof_as_epsilon,
                    );
                }
            }
            return current_alt_reached_accept;
        }

        if !atn.state(config.state).only_has_epsilon_transitions()
            && (!current_alt_reached_accept || !config.passed_non_greedy)
        {
            configs.add(config.clone(), &mut self.merge);
        }

        for i in 0..atn.state(config.state).number_of_transitions() {
            let transition = atn.state(config.state).transition(i);
            if let Some(next) =
                self.epsilon_target(&config, transition, configs, speculative, treat_eof_as_epsilon)
            {
                current_alt_reached_accept = self.closure(
                    next,
                    configs,
                    current_alt_reached_accept,
                    speculative,
                    treat_eof_as_epsilon,
                );
            }
        }
        current_alt_reached_accept
    }

    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        transition: &Transition,
        configs: &mut AtnConfigSet,
        speculative: bool,
        treat_eof_as_epsilon: bool,
    ) -> Option<AtnConfig> {
        let atn = self.atn;
        match transition {
            Transition::Rule {
                target,
                follow_state,
                ..
            } => {
                let new_context = PredictionContext::singleton(
                    Some(Rc::clone(&config.context)),
                    *follow_state as i32,
                );
                Some(config.lexer_moved_with_context(atn, *target, new_context))
            }
            Transition::Precedence { .. } => {
                panic!("Precedence predicates are not supported in lexers.");
            }
            Transition::Predicate {
                target,
                rule,
                pred_index,
                ..
            } => {
                // The predicate keeps this edge out of the automaton so it is re-evaluated
                // on every match; the target state itself is still cached.
                configs.has_semantic_context = true;
                if self.evaluate_predicate(*rule, *pred_index, speculative) {
                    Some(config.lexer_moved(atn, *target))
                } else {
                    None
                }
            }
            Transition::Action {
                target,
                action_index,
                ..
            } => {
                if config.context.has_empty_path() {
                    let executor = LexerActionExecutor::append(
                        config.executor.as_ref(),
                        atn.lexer_actions[*action_index].clone(),
                    );
                    Some(config.lexer_moved_with_executor(atn, *target, Some(executor)))
                } else {
                    // Actions inside invoked rules run only for the invoking rule's match.
                    Some(config.lexer_moved(atn, *target))
                }
            }
            Transition::Epsilon { target, .. } => Some(config.lexer_moved(atn, *target)),
            consuming => {
                if treat_eof_as_epsilon && consuming.matches(TOKEN_EOF, MIN_DFA_EDGE, MAX_CHAR) {
                    Some(config.lexer_moved(atn, consuming.target()))
                } else {
                    None
                }
            }
        }
    }

    /// Evaluate a predicate, restoring the stream and position when the evaluation runs
    /// ahead of the match.
    fn evaluate_predicate(&mut self, rule: usize, pred_index: usize, speculative: bool) -> bool {
        if !speculative {
            return self.lexer.semantic_predicate(rule, pred_index);
        }
        let saved_line = *self.line;
        let saved_column = *self.column;
        let index = self.input.index();
        let marker = self.input.mark();
        self.consume();
        let result = self.lexer.semantic_predicate(rule, pred_index);
        *self.line = saved_line;
        *self.column = saved_column;
        self.input.seek(index);
        self.input.release(marker);
        result
    }

    fn consume(&mut self) {
        if self.input.la(1) == '\n' as i32 {
            *self.line += 1;
            *self.column = 0;
        } else {
            *self.column += 1;
        }
        self.input.consume();
    }

    fn capture_sim_state(&mut self, dfa_state: DfaStateId) {
        self.prev_accept = SimState {
            index: Some(self.input.index()),
            line: *self.line,
            column: *self.column,
            dfa_state: Some(dfa_state),
        };
    }

    fn add_dfa_edge(&mut self, from: DfaStateId, t: i32, to: DfaStateId) {
        if (MIN_DFA_EDGE..=MAX_DFA_EDGE).contains(&t) {
            self.dfa.set_edge(from, (t - MIN_DFA_EDGE) as usize, to);
        }
    }

    fn add_dfa_state(&mut self, configs: AtnConfigSet) -> DfaStateId {
        let atn = self.atn;
        let mut state = DfaState::new(configs);
        if let Some(stop_config) = state
            .configs
            .iter()
            .find(|c| atn.state(c.state).is_rule_stop())
        {
            state.is_accept = true;
            state.executor = stop_config.executor.clone();
            state.token_type = atn.rule_to_token_type[atn.state(stop_config.state).rule];
        }
        self.dfa.add_state(state, self.cache)
    }

    fn fail_or_accept(&mut self, s: DfaStateId, t: i32) -> Result<i32, LexerNoViableAlt> {
        if let (Some(index), Some(dfa_state)) = (self.prev_accept.index, self.prev_accept.dfa_state)
        {
            let line = self.prev_accept.line;
            let column = self.prev_accept.column;
            let executor = self.dfa.state(dfa_state).executor.clone();
            self.input.seek(index);
            *self.line = line;
            *self.column = column;
            if let Some(executor) = executor {
                executor.execute(self.lexer, self.input, self.start_index);
            }

            #[cfg(debug_assertions)]
            if self.log.allows(Log::Success(())) {
                println!(
                    "[{}; LexerAccept]: token type {} over {}..{}",
                    self.log,
                    self.dfa.state(dfa_state).token_type,
                    self.start_index,
                    index
                );
            }
            Ok(self.dfa.state(dfa_state).token_type)
        } else {
            if t == TOKEN_EOF && self.input.index() == self.start_index {
                return Ok(TOKEN_EOF);
            }
            #[cfg(debug_assertions)]
            if self.log.allows(Log::Result(())) {
                println!(
                    "[{}; LexerError]: no viable token at {}",
                    self.log, self.start_index
                );
            }
            Err(LexerNoViableAlt {
                start_index: self.start_index,
                offending_char: t,
                dead_end_configs: (*self.dfa.state(s).configs).clone(),
            })
        }
    }
}

fn lexer_state_label(dfa: &Dfa, id: DfaStateId) -> String {
    if id.is_error() {
        return "error".to_string();
    }
    let state = dfa.state(id);
    if state.is_accept {
        format!(":s{}=>{}", id, state.token_type)
    } else {
        format!("s{}", id)
    }
}

fn reachable_target(transition: &Transition, t: i32) -> Option<usize> {
    if transition.matches(t, MIN_DFA_EDGE, MAX_CHAR) {
        Some(transition.target())
    } else {
        None
    }
}
