use super::analyzer::LookaheadAnalyzer;
use super::{Atn, AtnState, AtnStateKind, GrammarKind, Transition};
use crate::interval::IntervalSet;
use crate::{RuleContext, TOKEN_EOF, TOKEN_EPSILON};
use std::rc::Rc;

impl Atn {
    pub(crate) fn new(grammar_kind: GrammarKind, max_token_type: i32) -> Self {
        Self {
            grammar_kind,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            mode_to_start_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    pub fn state(&self, number: usize) -> &AtnState {
        &self.states[number]
    }

    pub(crate) fn state_mut(&mut self, number: usize) -> &mut AtnState {
        &mut self.states[number]
    }

    pub fn number_of_states(&self) -> usize {
        self.states.len()
    }

    pub fn number_of_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn number_of_modes(&self) -> usize {
        self.mode_to_start_state.len()
    }

    pub fn number_of_rules(&self) -> usize {
        self.rule_to_start_state.len()
    }

    /// The state number of the given decision.
    pub fn decision_state(&self, decision: usize) -> usize {
        self.decision_to_state[decision]
    }

    /// Append a state; its number is the current table length.
    pub(crate) fn add_state(&mut self, rule: usize, kind: AtnStateKind) -> usize {
        let number = self.states.len();
        self.states.push(AtnState::new(number, rule, kind));
        number
    }

    /// Register a state as a decision point and assign its decision number.
    pub(crate) fn define_decision_state(&mut self, state_number: usize) -> usize {
        let decision = self.decision_to_state.len();
        self.decision_to_state.push(state_number);
        self.states[state_number].decision = Some(decision);
        decision
    }

    /// The tokens which can follow `state` within its own rule; `TOKEN_EPSILON` marks that
    /// the rule may complete. The result is computed once and cached read-only.
    pub fn next_tokens(&self, state: usize) -> &IntervalSet {
        self.states[state].next_tokens_cache.get_or_init(|| {
            let mut set = LookaheadAnalyzer::new(self).look(state, None, None);
            set.set_readonly();
            set
        })
    }

    /// The tokens which can follow `state` under the given invocation chain.
    pub fn next_tokens_in_context(
        &self,
        state: usize,
        ctx: Option<&Rc<RuleContext>>,
    ) -> IntervalSet {
        LookaheadAnalyzer::new(self).look(state, None, ctx)
    }

    /// The tokens acceptable at `state_number`, following the invocation chain outward and
    /// substituting end-of-file at the outermost boundary.
    pub fn expected_tokens(&self, state_number: usize, ctx: &Rc<RuleContext>) -> IntervalSet {
        let mut following = self.next_tokens(state_number).clone();
        if !following.contains(TOKEN_EPSILON) {
            return following;
        }

        let mut expected = IntervalSet::new();
        expected.add_set(&following);
        expected.remove(TOKEN_EPSILON);

        let mut current = Some(Rc::clone(ctx));
        while let Some(c) = current {
            if !following.contains(TOKEN_EPSILON) {
                break;
            }
            let invoking_state = match c.invoking_state {
                Some(s) => s,
                None => break,
            };
            let follow_state = match self.states[invoking_state].transition(0) {
                Transition::Rule { follow_state, .. } => *follow_state,
                _ => panic!("Invoking state {} does not enter a rule.", invoking_state),
            };
            following = self.next_tokens(follow_state).clone();
            expected.add_set(&following);
            expected.remove(TOKEN_EPSILON);
            current = c.parent.clone();
        }

        if following.contains(TOKEN_EPSILON) {
            expected.add(TOKEN_EOF);
        }
        expected
    }
}
