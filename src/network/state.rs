use super::{AtnState, AtnStateKind, Transition};
use once_cell::unsync::OnceCell;

impl AtnState {
    pub(crate) fn new(number: usize, rule: usize, kind: AtnStateKind) -> Self {
        Self {
            number,
            rule,
            kind,
            epsilon_only: false,
            transitions: Vec::new(),
            decision: None,
            non_greedy: false,
            next_tokens_cache: OnceCell::new(),
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    pub fn number_of_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn only_has_epsilon_transitions(&self) -> bool {
        self.epsilon_only
    }

    pub(crate) fn add_transition(&mut self, transition: Transition) {
        if self.transitions.is_empty() {
            self.epsilon_only = transition.is_epsilon();
        } else if self.epsilon_only != transition.is_epsilon() {
            self.epsilon_only = false;
        }
        self.transitions.push(transition);
    }

    pub(crate) fn set_transition(&mut self, index: usize, transition: Transition) {
        self.transitions[index] = transition;
    }

    pub(crate) fn pop_transition(&mut self) -> Transition {
        self.transitions
            .pop()
            .expect("State has no transition to remove.")
    }

    /// Whether this state type opens a nondeterministic choice.
    pub fn is_decision_state(&self) -> bool {
        matches!(
            self.kind,
            AtnStateKind::BlockStart { .. }
                | AtnStateKind::PlusBlockStart { .. }
                | AtnStateKind::StarBlockStart { .. }
                | AtnStateKind::TokensStart
                | AtnStateKind::StarLoopEntry { .. }
                | AtnStateKind::PlusLoopback
        )
    }

    pub fn is_rule_stop(&self) -> bool {
        matches!(self.kind, AtnStateKind::RuleStop)
    }

    /// Whether this is the loop entry of the recursion suffix of a precedence rule.
    pub fn is_precedence_decision(&self) -> bool {
        matches!(
            self.kind,
            AtnStateKind::StarLoopEntry {
                precedence_decision: true,
                ..
            }
        )
    }
}
