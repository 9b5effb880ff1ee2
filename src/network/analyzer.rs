//! FIRST/FOLLOW-style lookahead analysis over the network.
//!
//! The analyzer walks epsilon reachability from a state, threading a prediction context to
//! follow rule returns precisely and a called-rule bit set to cut unbounded recursion into
//! left-recursive rules. It seeds the per-state follow caches of [Atn::next_tokens] and the
//! expected-token computation of error reporting.

use super::{Atn, Transition};
use crate::context::{PredictionContext, EMPTY_RETURN_STATE};
use crate::interval::IntervalSet;
use crate::{RuleContext, TOKEN_EOF, TOKEN_EPSILON, TOKEN_INVALID, TOKEN_MIN_USER};
use bit_set::BitSet;
use std::collections::HashSet;
use std::rc::Rc;

/// Reported in place of tokens hidden behind a semantic predicate when predicates are
/// not seen through.
pub const HIT_PREDICATE: i32 = TOKEN_INVALID;

pub struct LookaheadAnalyzer<'a> {
    atn: &'a Atn,
}

impl<'a> LookaheadAnalyzer<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// The set of tokens which can start at `state` and, when `stop_state` is given, lead
    /// into it. Without a context the analysis stays within the rule and reports
    /// `TOKEN_EPSILON` where the rule may complete.
    pub fn look(
        &self,
        state: usize,
        stop_state: Option<usize>,
        ctx: Option<&Rc<RuleContext>>,
    ) -> IntervalSet {
        let mut result = IntervalSet::new();
        let look_context = ctx.map(|c| PredictionContext::from_rule_context(self.atn, c));
        let mut busy = HashSet::new();
        let mut called_rule_stack = BitSet::new();
        self.walk(
            state,
            stop_state,
            look_context,
            &mut result,
            &mut busy,
            &mut called_rule_stack,
            true,
            true,
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        state: usize,
        stop_state: Option<usize>,
        ctx: Option<Rc<PredictionContext>>,
        look: &mut IntervalSet,
        busy: &mut HashSet<(usize, Option<Rc<PredictionContext>>)>,
        called_rule_stack: &mut BitSet,
        see_thru_preds: bool,
        add_eof: bool,
    ) {
        if !busy.insert((state, ctx.clone())) {
            return;
        }

        if Some(state) == stop_state {
            match &ctx {
                None => {
                    look.add(TOKEN_EPSILON);
                    return;
                }
                Some(c) if c.is_empty() && add_eof => {
                    look.add(TOKEN_EOF);
                    return;
                }
                _ => {}
            }
        }

        let s = self.atn.state(state);
        if s.is_rule_stop() {
            match &ctx {
                None => {
                    look.add(TOKEN_EPSILON);
                    return;
                }
                Some(c) if c.is_empty() && add_eof => {
                    look.add(TOKEN_EOF);
                    return;
                }
                _ => {}
            }
            let ctx_node = ctx.as_ref().unwrap();
            if !ctx_node.is_empty() {
                let removed = called_rule_stack.contains(s.rule);
                called_rule_stack.remove(s.rule);
                for i in 0..ctx_node.size() {
                    if ctx_node.return_state(i) == EMPTY_RETURN_STATE {
                        continue;
                    }
                    let return_state = ctx_node.return_state(i) as usize;
                    self.walk(
                        return_state,
                        stop_state,
                        ctx_node.parent(i).cloned(),
                        look,
                        busy,
                        called_rule_stack,
                        see_thru_preds,
                        add_eof,
                    );
                }
                if removed {
                    called_rule_stack.insert(s.rule);
                }
                return;
            }
        }

        for transition in s.transitions() {
            match transition {
                Transition::Rule {
                    target,
                    follow_state,
                    ..
                } => {
                    let target_rule = self.atn.state(*target).rule;
                    if called_rule_stack.contains(target_rule) {
                        continue;
                    }
                    let new_ctx =
                        PredictionContext::singleton(ctx.clone(), *follow_state as i32);
                    called_rule_stack.insert(target_rule);
                    self.walk(
                        *target,
                        stop_state,
                        Some(new_ctx),
                        look,
                        busy,
                        called_rule_stack,
                        see_thru_preds,
                        add_eof,
                    );
                    called_rule_stack.remove(target_rule);
                }
                Transition::Predicate { target, .. } | Transition::Precedence { target, .. } => {
                    if see_thru_preds {
                        self.walk(
                            *target,
                            stop_state,
                            ctx.clone(),
                            look,
                            busy,
                            called_rule_stack,
                            see_thru_preds,
                            add_eof,
                        );
                    } else {
                        look.add(HIT_PREDICATE);
                    }
                }
                Transition::Wildcard { .. } => {
                    look.add_range(TOKEN_MIN_USER, self.atn.max_token_type);
                }
                t if t.is_epsilon() => {
                    self.walk(
                        t.target(),
                        stop_state,
                        ctx.clone(),
                        look,
                        busy,
                        called_rule_stack,
                        see_thru_preds,
                        add_eof,
                    );
                }
                t => {
                    if let Some(mut set) = t.label() {
                        if matches!(t, Transition::NotSet { .. }) {
                            set = set.complement(&IntervalSet::of_range(
                                TOKEN_MIN_USER,
                                self.atn.max_token_type,
                            ));
                        }
                        look.add_set(&set);
                    }
                }
            }
        }
    }
}
