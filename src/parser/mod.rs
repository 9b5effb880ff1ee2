//! The parser simulator: adaptive prediction with lazy automaton construction.
//!
//! [ParserAtnSimulator::adaptive_predict] answers "which alternative does this decision
//! take" for the token stream's current position. Prediction first runs with local (SLL)
//! context, which is correct for almost every decision and caches aggressively; when the
//! local answer is provably inconclusive the decision is re-run with the parser's full
//! invocation context. Every symbol consumed along the way extends the decision's
//! deterministic automaton, so repeated visits of the same decision degrade into array
//! lookups.
//!
//! Semantic predicates collected during closure are evaluated at accept time against the
//! recognizer; precedence decisions of left-recursive rules use per-precedence start states
//! and the precedence filter. Ambiguity and context sensitivity are reported through the
//! listener before prediction returns, and a failed prediction is returned as a value, not
//! unwound — the surrounding error strategy decides what to do with it.

mod prediction;


pub use prediction::PredictionMode;

use crate::automaton::{Dfa, DfaState, DfaStateId};
use crate::config::AtnConfig;
use crate::config_set::AtnConfigSet;
use crate::context::{ContextCache, MergeCache, PredictionContext, EMPTY_RETURN_STATE};
use crate::errors::NoViableAlt;
use crate::network::{Atn, Transition};
use crate::predicate::SemanticContext;
use crate::{
    IErrorListener, IIntStream, IRecognizer, Log, RuleContext, INVALID_ALT, TOKEN_EOF,
};
use bit_set::BitSet;
use once_cell::unsync::OnceCell;
use prediction::{
    all_subsets_conflict, all_subsets_equal, conflicting_alt_subsets,
    has_config_in_rule_stop_state, has_sll_conflict_terminating_prediction,
    resolves_to_just_one_viable_alt, unique_alt,
};
use std::collections::HashSet;
use std::rc::Rc;

/// Adaptive prediction over the network, one deterministic automaton per decision.
pub struct ParserAtnSimulator {
    atn: Rc<Atn>,
    dfas: Vec<Dfa>,
    cache: ContextCache,
    mode: PredictionMode,
    log: OnceCell<Log<&'static str>>,
}

impl ParserAtnSimulator {
    pub fn new(atn: Rc<Atn>) -> Self {
        let edge_capacity = (atn.max_token_type + 2) as usize;
        let dfas = (0..atn.number_of_decisions())
            .map(|decision| {
                let start = atn.decision_state(decision);
                let mut dfa = Dfa::new(decision, start, edge_capacity);
                if atn.state(start).is_precedence_decision() {
                    dfa.set_precedence_dfa(true);
                }
                dfa
            })
            .collect();
        Self {
            atn,
            dfas,
            cache: ContextCache::new(),
            mode: PredictionMode::Ll,
            log: OnceCell::new(),
        }
    }

    pub fn prediction_mode(&self) -> PredictionMode {
        self.mode
    }

    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        self.mode = mode;
    }

    /// Set a log label to debug the simulator.
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    pub fn dfa(&self, decision: usize) -> &Dfa {
        &self.dfas[decision]
    }

    /// A sorted text dump of the automaton grown for `decision`, for debugging.
    ///
    /// Accept states print as `:sN=>alt`; the end-of-input edge prints as `EOF`.
    pub fn dump_dfa(&self, decision: usize) -> String {
        use std::fmt::Write;
        let dfa = &self.dfas[decision];
        let mut out = String::new();
        for id in dfa.ids() {
            for (index, target) in dfa.edges_of(id) {
                let symbol = index as i32 - 1;
                let label = if symbol == TOKEN_EOF {
                    "EOF".to_string()
                } else {
                    symbol.to_string()
                };
                writeln!(
                    out,
                    "{}-{}->{}",
                    state_label(dfa, id),
                    label,
                    state_label(dfa, target)
                )
                .unwrap();
            }
        }
        out
    }

    /// Predict the alternative `decision` takes at the input's current position.
    ///
    /// The input is restored to its entry position before returning, whatever the outcome.
    pub fn adaptive_predict(
        &mut self,
        input: &mut dyn IIntStream,
        decision: usize,
        outer_context: &Rc<RuleContext>,
        recognizer: &mut dyn IRecognizer,
        listener: &mut dyn IErrorListener,
    ) -> Result<usize, NoViableAlt> {
        let index = input.index();
        let marker = input.mark();
        let log = self.log.get().copied().unwrap_or(Log::None);

        #[cfg(debug_assertions)]
        if log.allows(Log::Verbose(())) {
            println!(
                "[{}; Predict]: decision {} at input {}",
                log, decision, index
            );
        }

        let result = {
            let atn: &Atn = &self.atn;
            let mut run = PredictionRun {
                atn,
                dfa: &mut self.dfas[decision],
                cache: &mut self.cache,
                mode: self.mode,
                merge: MergeCache::new(),
                input: &mut *input,
                recognizer,
                listener,
                outer: Rc::clone(outer_context),
                start_index: index,
                decision,
                log,
            };
            run.predict()
        };
        // The per-prediction merge memo dies with the run; the caller consumes tokens itself.
        input.seek(index);
        input.release(marker);
        result
    }
}

struct PredictionRun<'r> {
    atn: &'r Atn,
    dfa: &'r mut Dfa,
    cache: &'r mut ContextCache,
    mode: PredictionMode,
    merge: MergeCache,
    input: &'r mut dyn IIntStream,
    recognizer: &'r mut dyn IRecognizer,
    listener: &'r mut dyn IErrorListener,
    outer: Rc<RuleContext>,
    start_index: usize,
    decision: usize,
    log: Log<&'static str>,
}

impl<'r> PredictionRun<'r> {
    fn predict(&mut self) -> Result<usize, NoViableAlt> {
        let existing_start = if self.dfa.is_precedence_dfa() {
            self.dfa
                .precedence_start_state(self.recognizer.precedence())
        } else {
            self.dfa.s0
        };

        let s0 = match existing_start {
            Some(s0) => s0,
            None => {
                let atn_start = self.dfa.atn_start_state;
                let s0_closure =
                    self.compute_start_state(atn_start, &RuleContext::empty(), false);
                if self.dfa.is_precedence_dfa() {
                    let filtered = self.apply_precedence_filter(&s0_closure);
                    let s0 = self.add_dfa_state(DfaState::new(filtered));
                    self.dfa
                        .set_precedence_start_state(self.recognizer.precedence(), s0);
                    s0
                } else {
                    let s0 = self.add_dfa_state(DfaState::new(s0_closure));
                    self.dfa.s0 = Some(s0);
                    s0
                }
            }
        };

        self.exec_atn(s0)
    }

    fn exec_atn(&mut self, s0: DfaStateId) -> Result<usize, NoViableAlt> {
        let mut previous = s0;
        let mut t = self.input.la(1);

        loop {
            let d = match self.existing_target_state(previous, t) {
                Some(d) => d,
                None => self.compute_target_state(previous, t),
            };

            if d.is_error() {
                // Before giving up, prefer an alternative that at least completed the
                // decision rule; downstream error messages point at a better token then.
                let previous_configs = Rc::clone(&self.dfa.state(previous).configs);
                let err = self.no_viable_alt(&previous_configs, t);
                self.input.seek(self.start_index);
                let alt = self.syn_valid_or_sem_invalid_alt(&previous_configs);
                if alt != INVALID_ALT {
                    return Ok(alt);
                }
                return Err(err);
            }

            if self.dfa.state(d).requires_full_context && self.mode != PredictionMode::Sll {
                let mut conflicting_alts = self
                    .dfa
                    .state(d)
                    .configs
                    .conflicting_alts
                    .clone()
                    .unwrap_or_default();
                let predicates = self.dfa.state(d).predicates.clone();
                if !predicates.is_empty() {
                    // Predicates may single out an alternative without full context.
                    let conflict_index = self.input.index();
                    if conflict_index != self.start_index {
                        self.input.seek(self.start_index);
                    }
                    conflicting_alts = self.eval_semantic_contexts(&predicates, true);
                    if conflicting_alts.len() == 1 {
                        return Ok(conflicting_alts.iter().next().unwrap());
                    }
                    if conflict_index != self.start_index {
                        self.input.seek(conflict_index);
                    }
                }

                #[cfg(debug_assertions)]
                if self.log.allows(Log::Default(())) {
                    println!(
                        "[{}; FullContext]: decision {} conflicted on {:?} at input {}",
                        self.log,
                        self.decision,
                        conflicting_alts.iter().collect::<Vec<usize>>(),
                        self.start_index
                    );
                }

                let d_configs = Rc::clone(&self.dfa.state(d).configs);
                let stop_index = self.input.index();
                self.listener.report_attempting_full_context(
                    self.decision,
                    self.start_index,
                    stop_index,
                    &conflicting_alts,
                    &d_configs,
                );
                let outer = Rc::clone(&self.outer);
                let s0_closure =
                    self.compute_start_state(self.dfa.atn_start_state, &outer, true);
                return self.exec_atn_with_full_context(s0_closure);
            }

            if self.dfa.state(d).is_accept {
                let predicates = self.dfa.state(d).predicates.clone();
                if predicates.is_empty() {
                    return Ok(self.dfa.state(d).prediction);
                }

                let stop_index = self.input.index();
                self.input.seek(self.start_index);
                let alts = self.eval_semantic_contexts(&predicates, true);
                return match alts.len() {
                    0 => {
                        let configs = Rc::clone(&self.dfa.state(d).configs);
                        let offending = self.input.la(1);
                        Err(self.no_viable_alt(&configs, offending))
                    }
                    1 => Ok(alts.iter().next().unwrap()),
                    _ => {
                        // Several alternatives survive their predicates; take the first and
                        // say so.
                        let configs = Rc::clone(&self.dfa.state(d).configs);
                        self.listener.report_ambiguity(
                            self.decision,
                            self.start_index,
                            stop_index,
                            false,
                            &alts,
                            &configs,
                        );
                        Ok(alts.iter().next().unwrap())
                    }
                };
            }

            previous = d;
            if t != TOKEN_EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        }
    }

    fn existing_target_state(&self, previous: DfaStateId, t: i32) -> Option<DfaStateId> {
        self.dfa.edge(previous, (t + 1) as usize)
    }

    fn compute_target_state(&mut self, previous: DfaStateId, t: i32) -> DfaStateId {
        let closure_configs = Rc::clone(&self.dfa.state(previous).configs);
        let reach = match self.compute_reach_set(&closure_configs, t, false) {
            Some(reach) => reach,
            None => {
                self.add_dfa_edge(previous, t, DfaStateId::ERROR);
                return DfaStateId::ERROR;
            }
        };

        let mut reach = reach;
        let predicted_alt = unique_alt(&reach);
        let mut is_accept = false;
        let mut prediction = INVALID_ALT;
        let mut requires_full_context = false;

        if predicted_alt != INVALID_ALT {
            reach.unique_alt = predicted_alt;
            is_accept = true;
            prediction = predicted_alt;
        } else if has_sll_conflict_terminating_prediction(self.mode, &reach, self.atn) {
            let conflicting = prediction::all_alts(&conflicting_alt_subsets(&reach));
            prediction = conflicting.iter().next().unwrap_or(INVALID_ALT);
            reach.conflicting_alts = Some(conflicting);
            is_accept = true;
            requires_full_context = true;
        }

        let mut state = DfaState::new(reach);
        state.is_accept = is_accept;
        state.prediction = prediction;
        state.requires_full_context = requires_full_context;

        if state.is_accept && state.configs.has_semantic_context {
            let decision_state = self.atn.decision_state(self.dfa.decision);
            self.predicate_dfa_state(&mut state, decision_state);
            if !state.predicates.is_empty() {
                state.prediction = INVALID_ALT;
            }
        }

        let d = self.add_dfa_state(state);
        self.add_dfa_edge(previous, t, d);
        d
    }

    /// Attach accept-time predicates when several alternatives stayed viable because of
    /// semantic context.
    fn predicate_dfa_state(&mut self, state: &mut DfaState, decision_state: usize) {
        let nalts = self.atn.state(decision_state).number_of_transitions();
        let alts_to_collect = conflicting_alts_or_unique_alt(&state.configs);
        match self.preds_for_ambig_alts(&alts_to_collect, &state.configs, nalts) {
            Some(alt_to_pred) => {
                state.predicates = predicate_predictions(&alts_to_collect, &alt_to_pred);
                state.prediction = INVALID_ALT;
            }
            None => {
                state.prediction = alts_to_collect.iter().next().unwrap_or(INVALID_ALT);
            }
        }
    }

    fn exec_atn_with_full_context(
        &mut self,
        s0: AtnConfigSet,
    ) -> Result<usize, NoViableAlt> {
        let full_ctx = true;
        let mut found_exact_ambig = false;
        let mut previous = s0;
        self.input.seek(self.start_index);
        let mut t = self.input.la(1);

        let (reach, predicted_alt) = loop {
            let mut reach = match self.compute_reach_set(&previous, t, full_ctx) {
                Some(reach) => reach,
                None => {
                    let err = self.no_viable_alt(&previous, t);
                    self.input.seek(self.start_index);
                    let alt = self.syn_valid_or_sem_invalid_alt(&previous);
                    if alt != INVALID_ALT {
                        return Ok(alt);
                    }
                    return Err(err);
                }
            };

            let alt_sub_sets = conflicting_alt_subsets(&reach);
            reach.unique_alt = unique_alt(&reach);
            if reach.unique_alt != INVALID_ALT {
                let alt = reach.unique_alt;
                break (reach, alt);
            }
            if self.mode != PredictionMode::LlExactAmbigDetection {
                let alt = resolves_to_just_one_viable_alt(&alt_sub_sets);
                if alt != INVALID_ALT {
                    break (reach, alt);
                }
            } else if all_subsets_conflict(&alt_sub_sets) && all_subsets_equal(&alt_sub_sets) {
                found_exact_ambig = true;
                let alt = prediction::all_alts(&alt_sub_sets)
                    .iter()
                    .next()
                    .unwrap_or(INVALID_ALT);
                break (reach, alt);
            }

            previous = reach;
            if t != TOKEN_EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        };

        if reach.unique_alt != INVALID_ALT {
            self.listener.report_context_sensitivity(
                self.decision,
                self.start_index,
                self.input.index(),
                predicted_alt,
                &reach,
            );
            return Ok(predicted_alt);
        }

        self.listener.report_ambiguity(
            self.decision,
            self.start_index,
            self.input.index(),
            found_exact_ambig,
            &reach.alts(),
            &reach,
        );
        Ok(predicted_alt)
    }

    /// Advance every configuration along edges matching `t`, then close over the results.
    fn compute_reach_set(
        &mut self,
        closure: &AtnConfigSet,
        t: i32,
        full_ctx: bool,
    ) -> Option<AtnConfigSet> {
        let atn = self.atn;
        let mut intermediate = AtnConfigSet::new(full_ctx);
        // Configurations already at a rule end can only match more input through the
        // surrounding context; they rejoin after closure unless real progress was made.
        let mut skipped_stop_states: Vec<AtnConfig> = Vec::new();

        for config in closure.iter() {
            if atn.state(config.state).is_rule_stop() {
                debug_assert!(config.context.is_empty());
                if full_ctx || t == TOKEN_EOF {
                    skipped_stop_states.push(config.clone());
                }
                continue;
            }
            for i in 0..atn.state(config.state).number_of_transitions() {
                let transition = atn.state(config.state).transition(i);
                if transition.matches(t, 0, atn.max_token_type) {
                    intermediate.add(config.moved(transition.target()), &mut self.merge);
                }
            }
        }

        let mut look_to_end_of_rule = false;
        let mut reach = None;
        if skipped_stop_states.is_empty() && t != TOKEN_EOF {
            if intermediate.len() == 1 || unique_alt(&intermediate) != INVALID_ALT {
                // Trivially unique; closure adds nothing the accept check needs.
                look_to_end_of_rule = true;
                reach = Some(intermediate.clone());
            }
        }
        let mut reach = match reach {
            Some(reach) => reach,
            None => {
                let mut result = AtnConfigSet::new(full_ctx);
                let mut closure_busy = HashSet::new();
                let treat_eof_as_epsilon = t == TOKEN_EOF;
                for config in intermediate.iter() {
                    self.closure(
                        config.clone(),
                        &mut result,
                        &mut closure_busy,
                        false,
                        full_ctx,
                        treat_eof_as_epsilon,
                    );
                }
                result
            }
        };

        if t == TOKEN_EOF {
            // End of input only accepts configurations which reached a rule end.
            reach = self.remove_non_rule_stop_configs(&reach, look_to_end_of_rule);
        }

        if !skipped_stop_states.is_empty()
            && (!full_ctx || !has_config_in_rule_stop_state(atn, &reach))
        {
            for config in skipped_stop_states {
                reach.add(config, &mut self.merge);
            }
        }

        if reach.is_empty() {
            None
        } else {
            Some(reach)
        }
    }

    fn remove_non_rule_stop_configs(
        &mut self,
        configs: &AtnConfigSet,
        look_to_end_of_rule: bool,
    ) -> AtnConfigSet {
        let atn = self.atn;
        if prediction::all_configs_in_rule_stop_states(atn, configs) {
            return configs.clone();
        }
        let mut result = AtnConfigSet::new(configs.full_ctx);
        for config in configs.iter() {
            if atn.state(config.state).is_rule_stop() {
                result.add(config.clone(), &mut self.merge);
                continue;
            }
            if look_to_end_of_rule && atn.state(config.state).only_has_epsilon_transitions() {
                let next_tokens = atn.next_tokens(config.state);
                if next_tokens.contains(crate::TOKEN_EPSILON) {
                    let end_of_rule = atn.rule_to_stop_state[atn.state(config.state).rule];
                    result.add(config.moved(end_of_rule), &mut self.merge);
                }
            }
        }
        result
    }

    fn compute_start_state(
        &mut self,
        p: usize,
        ctx: &Rc<RuleContext>,
        full_ctx: bool,
    ) -> AtnConfigSet {
        let atn = self.atn;
        let initial_context = PredictionContext::from_rule_context(atn, ctx);
        let mut configs = AtnConfigSet::new(full_ctx);
        for i in 0..atn.state(p).number_of_transitions() {
            let target = atn.state(p).transition(i).target();
            let config = AtnConfig::new(target, i + 1, Rc::clone(&initial_context));
            let mut closure_busy = HashSet::new();
            self.closure(config, &mut configs, &mut closure_busy, true, full_ctx, false);
        }
        configs
    }

    /// Keep, for alternatives above 1, only configurations the recursive alternative 1
    /// cannot also produce, and settle precedence checks in place.
    fn apply_precedence_filter(&mut self, configs: &AtnConfigSet) -> AtnConfigSet {
        use std::collections::HashMap;
        let mut states_from_alt1: HashMap<usize, Rc<PredictionContext>> = HashMap::new();
        let mut result = AtnConfigSet::new(configs.full_ctx);

        for config in configs.iter() {
            if config.alt != 1 {
                continue;
            }
            let updated = config
                .semantic_context
                .eval_precedence(self.recognizer, &Rc::clone(&self.outer));
            let updated = match updated {
                None => continue,
                Some(updated) => updated,
            };
            states_from_alt1.insert(config.state, Rc::clone(&config.context));
            if updated != *config.semantic_context {
                result.add(
                    config.with_new_semantic_context(Rc::new(updated)),
                    &mut self.merge,
                );
            } else {
                result.add(config.clone(), &mut self.merge);
            }
        }

        for config in configs.iter() {
            if config.alt == 1 {
                continue;
            }
            if !config.precedence_filter_suppressed {
                if let Some(context) = states_from_alt1.get(&config.state) {
                    if **context == *config.context {
                        continue;
                    }
                }
            }
            result.add(config.clone(), &mut self.merge);
        }

        result
    }

    fn closure(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        closure_busy: &mut HashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
    ) {
        self.closure_checking_stop_state(
            config,
            configs,
            closure_busy,
            collect_predicates,
            full_ctx,
            0,
            treat_eof_as_epsilon,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn closure_checking_stop_state(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        closure_busy: &mut HashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        let atn = self.atn;
        if atn.state(config.state).is_rule_stop() {
            if !config.context.is_empty() {
                for i in 0..config.context.size() {
                    if config.context.return_state(i) == EMPTY_RETURN_STATE {
                        if full_ctx {
                            let rebased = config
                                .moved_with_context(config.state, PredictionContext::empty());
                            configs.add(rebased, &mut self.merge);
                        } else {
                            // No stack left; chase the follow edges of the rule end.
                            self.closure_work(
                                config.clone(),
                                configs,
                                closure_busy,
                                collect_predicates,
                                full_ctx,
                                depth,
                                treat_eof_as_epsilon,
                            );
                        }
                        continue;
                    }
                    let return_state = config.context.return_state(i) as usize;
                    let new_context = match config.context.parent(i) {
                        Some(parent) => Rc::clone(parent),
                        None => panic!(
                            "Missing stack parent for return state {}.",
                            return_state
                        ),
                    };
                    let mut popped = AtnConfig::with_semantic_context(
                        return_state,
                        config.alt,
                        new_context,
                        Rc::clone(&config.semantic_context),
                    );
                    popped.reaches_into_outer_context = config.reaches_into_outer_context;
                    self.closure_checking_stop_state(
                        popped,
                        configs,
                        closure_busy,
                        collect_predicates,
                        full_ctx,
                        depth - 1,
                        treat_eof_as_epsilon,
                    );
                }
                return;
            } else if full_ctx {
                // The stack is exhausted under full context; this is a real stopping point.
                configs.add(config, &mut self.merge);
                return;
            }
        }
        self.closure_work(
            config,
            configs,
            closure_busy,
            collect_predicates,
            full_ctx,
            depth,
            treat_eof_as_epsilon,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn closure_work(
        &mut self,
        config: AtnConfig,
        configs: &mut AtnConfigSet,
        closure_busy: &mut HashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        let atn = self.atn;
        let p = config.state;
        if !atn.state(p).only_has_epsilon_transitions() {
            configs.add(config.clone(), &mut self.merge);
        }

        for i in 0..atn.state(p).number_of_transitions() {
            let transition = atn.state(p).transition(i);
            let continue_collecting =
                collect_predicates && !matches!(transition, Transition::Action { .. });
            let next = self.epsilon_target(
                &config,
                transition,
                continue_collecting,
                depth == 0,
                full_ctx,
                treat_eof_as_epsilon,
            );
            if let Some(mut next) = next {
                let mut new_depth = depth;
                if atn.state(config.state).is_rule_stop() {
                    debug_assert!(!full_ctx);
                    // Falling off the end of the decision entry rule into the caller's
                    // territory; local prediction treats that context as unknown.
                    if self.dfa.is_precedence_dfa() {
                        if let Transition::Epsilon {
                            outermost_precedence_return: Some(returned_rule),
                            ..
                        } = transition
                        {
                            if *returned_rule == atn.state(self.dfa.atn_start_state).rule {
                                next.precedence_filter_suppressed = true;
                            }
                        }
                    }
                    next.reaches_into_outer_context += 1;
                    if !closure_busy.insert(next.clone()) {
                        continue;
                    }
                    configs.dips_into_outer_context = true;
                    new_depth -= 1;
                } else {
                    if !transition.is_epsilon() && !closure_busy.insert(next.clone()) {
                        continue;
                    }
                    if matches!(transition, Transition::Rule { .. }) && new_depth >= 0 {
                        new_depth += 1;
                    }
                }
                self.closure_checking_stop_state(
                    next,
                    configs,
                    closure_busy,
                    continue_collecting,
                    full_ctx,
                    new_depth,
                    treat_eof_as_epsilon,
                );
            }
        }
    }

    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        transition: &Transition,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
    ) -> Option<AtnConfig> {
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
                Some(config.moved_with_context(*target, new_context))
            }
            Transition::Precedence { target, precedence } => self.precedence_transition(
                config,
                *target,
                *precedence,
                collect_predicates,
                in_context,
                full_ctx,
            ),
            Transition::Predicate {
                target,
                rule,
                pred_index,
                ctx_dependent,
            } => self.predicate_transition(
                config,
                *target,
                *rule,
                *pred_index,
                *ctx_dependent,
                collect_predicates,
                in_context,
                full_ctx,
            ),
            Transition::Action { target, .. } => Some(config.moved(*target)),
            Transition::Epsilon { target, .. } => Some(config.moved(*target)),
            Transition::Atom { .. } | Transition::Range { .. } | Transition::Set { .. } => {
                // The derived end-of-file edge is crossed at most once.
                if treat_eof_as_epsilon && transition.matches(TOKEN_EOF, 0, 1) {
                    Some(config.moved(transition.target()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn precedence_transition(
        &mut self,
        config: &AtnConfig,
        target: usize,
        precedence: i32,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
    ) -> Option<AtnConfig> {
        if collect_predicates && in_context {
            if full_ctx {
                // Under full context the input is already rewound to the decision start,
                // so the check can run now and prune dead branches.
                let current_position = self.input.index();
                self.input.seek(self.start_index);
                let outer = Rc::clone(&self.outer);
                let succeeds = self.recognizer.precedence_predicate(&outer, precedence);
                self.input.seek(current_position);
                if succeeds {
                    Some(config.moved(target))
                } else {
                    None
                }
            } else {
                let new_sem = SemanticContext::and(
                    &config.semantic_context,
                    &SemanticContext::Precedence { precedence },
                );
                Some(config.moved_with_semantic_context(target, Rc::new(new_sem)))
            }
        } else {
            Some(config.moved(target))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn predicate_transition(
        &mut self,
        config: &AtnConfig,
        target: usize,
        rule: usize,
        pred_index: usize,
        ctx_dependent: bool,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
    ) -> Option<AtnConfig> {
        if collect_predicates && (!ctx_dependent || in_context) {
            if full_ctx {
                let current_position = self.input.index();
                self.input.seek(self.start_index);
                let outer = Rc::clone(&self.outer);
                let predicate = SemanticContext::Predicate {
                    rule,
                    pred_index,
                    ctx_dependent,
                };
                let succeeds = predicate.eval(self.recognizer, &outer);
                self.input.seek(current_position);
                if succeeds {
                    Some(config.moved(target))
                } else {
                    None
                }
            } else {
                let new_sem = SemanticContext::and(
                    &config.semantic_context,
                    &SemanticContext::Predicate {
                        rule,
                        pred_index,
                        ctx_dependent,
                    },
                );
                Some(config.moved_with_semantic_context(target, Rc::new(new_sem)))
            }
        } else {
            Some(config.moved(target))
        }
    }

    /// Per ambiguous alternative, the disjunction of the predicates guarding it;
    /// [None] when no alternative carries a real predicate.
    fn preds_for_ambig_alts(
        &self,
        ambig_alts: &BitSet,
        configs: &AtnConfigSet,
        nalts: usize,
    ) -> Option<Vec<SemanticContext>> {
        let mut alt_to_pred: Vec<Option<SemanticContext>> = vec![None; nalts + 1];
        for config in configs.iter() {
            if ambig_alts.contains(config.alt) {
                let combined = match alt_to_pred[config.alt].take() {
                    None => (*config.semantic_context).clone(),
                    Some(existing) => {
                        SemanticContext::or(&existing, &config.semantic_context)
                    }
                };
                alt_to_pred[config.alt] = Some(combined);
            }
        }

        let mut n_pred_alts = 0;
        let mut result = Vec::with_capacity(nalts + 1);
        result.push(SemanticContext::None);
        for slot in alt_to_pred.into_iter().skip(1) {
            match slot {
                None => result.push(SemanticContext::None),
                Some(pred) => {
                    if !pred.is_none() {
                        n_pred_alts += 1;
                    }
                    result.push(pred);
                }
            }
        }

        if n_pred_alts == 0 {
            None
        } else {
            Some(result)
        }
    }

    /// Evaluate accept-time predicates; the result is the set of surviving alternatives.
    fn eval_semantic_contexts(
        &mut self,
        predicates: &[(Rc<SemanticContext>, usize)],
        complete: bool,
    ) -> BitSet {
        let mut predictions = BitSet::new();
        for (pred, alt) in predicates {
            if pred.is_none() {
                predictions.insert(*alt);
                if !complete {
                    break;
                }
                continue;
            }
            let outer = Rc::clone(&self.outer);
            if pred.eval(self.recognizer, &outer) {
                predictions.insert(*alt);
                if !complete {
                    break;
                }
            }
        }
        predictions
    }

    fn split_by_semantic_validity(
        &mut self,
        configs: &AtnConfigSet,
    ) -> (AtnConfigSet, AtnConfigSet) {
        let mut succeeded = AtnConfigSet::new(configs.full_ctx);
        let mut failed = AtnConfigSet::new(configs.full_ctx);
        for config in configs.iter() {
            if !config.semantic_context.is_none() {
                let outer = Rc::clone(&self.outer);
                if config.semantic_context.eval(self.recognizer, &outer) {
                    succeeded.add(config.clone(), &mut self.merge);
                } else {
                    failed.add(config.clone(), &mut self.merge);
                }
            } else {
                succeeded.add(config.clone(), &mut self.merge);
            }
        }
        (succeeded, failed)
    }

    /// An alternative that completed the decision entry rule: semantically valid if one
    /// exists, otherwise syntactically valid with a failed predicate.
    fn syn_valid_or_sem_invalid_alt(&mut self, configs: &AtnConfigSet) -> usize {
        let (sem_valid, sem_invalid) = self.split_by_semantic_validity(configs);
        let alt = self.alt_that_finished_decision_entry_rule(&sem_valid);
        if alt != INVALID_ALT {
            return alt;
        }
        if !sem_invalid.is_empty() {
            let alt = self.alt_that_finished_decision_entry_rule(&sem_invalid);
            if alt != INVALID_ALT {
                return alt;
            }
        }
        INVALID_ALT
    }

    fn alt_that_finished_decision_entry_rule(&self, configs: &AtnConfigSet) -> usize {
        let atn = self.atn;
        let mut alts = BitSet::new();
        for config in configs.iter() {
            if config.reaches_into_outer_context > 0
                || (atn.state(config.state).is_rule_stop() && config.context.has_empty_path())
            {
                alts.insert(config.alt);
            }
        }
        alts.iter().next().unwrap_or(INVALID_ALT)
    }

    fn no_viable_alt(&self, configs: &AtnConfigSet, offending_token: i32) -> NoViableAlt {
        NoViableAlt {
            decision: self.decision,
            start_index: self.start_index,
            offending_index: self.input.index(),
            offending_token,
            dead_end_configs: configs.clone(),
        }
    }

    fn add_dfa_state(&mut self, state: DfaState) -> DfaStateId {
        self.dfa.add_state(state, self.cache)
    }

    fn add_dfa_edge(&mut self, from: DfaStateId, t: i32, to: DfaStateId) {
        if t < -1 || t > self.atn.max_token_type {
            return;
        }
        self.dfa.set_edge(from, (t + 1) as usize, to);
    }
}

fn state_label(dfa: &Dfa, id: DfaStateId) -> String {
    if id.is_error() {
        return "error".to_string();
    }
    let state = dfa.state(id);
    if state.is_accept {
        format!(":s{}=>{}", id, state.prediction)
    } else {
        format!("s{}", id)
    }
}

fn conflicting_alts_or_unique_alt(configs: &AtnConfigSet) -> BitSet {
    if configs.unique_alt != INVALID_ALT {
        let mut alts = BitSet::new();
        alts.insert(configs.unique_alt);
        alts
    } else {
        configs.conflicting_alts.clone().unwrap_or_default()
    }
}

fn predicate_predictions(
    ambig_alts: &BitSet,
    alt_to_pred: &[SemanticContext],
) -> Vec<(Rc<SemanticContext>, usize)> {
    let mut pairs = Vec::new();
    let mut contains_predicate = false;
    for (alt, pred) in alt_to_pred.iter().enumerate().skip(1) {
        if ambig_alts.contains(alt) {
            pairs.push((Rc::new(pred.clone()), alt));
        }
        if !pred.is_none() {
            contains_predicate = true;
        }
    }
    if !contains_predicate {
        pairs.clear();
    }
    pairs
}
