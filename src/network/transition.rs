use super::Transition;
use crate::interval::IntervalSet;

impl Transition {
    /// The state this edge leads to. For `Rule` this is the invoked rule's start state.
    pub fn target(&self) -> usize {
        match self {
            Transition::Epsilon { target, .. }
            | Transition::Range { target, .. }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Action { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Precedence { target, .. } => *target,
        }
    }

    pub(crate) fn set_target(&mut self, new_target: usize) {
        match self {
            Transition::Epsilon { target, .. }
            | Transition::Range { target, .. }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Action { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Precedence { target, .. } => *target = new_target,
        }
    }

    /// Whether following this edge consumes no input symbol.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Predicate { .. }
                | Transition::Action { .. }
                | Transition::Precedence { .. }
        )
    }

    /// The label set of a consuming edge; [None] for non-consuming and wildcard edges.
    ///
    /// For `NotSet` this is the negated set itself; matching applies the complement.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { from, to, .. } => Some(IntervalSet::of_range(*from, *to)),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                Some(set.as_ref().clone())
            }
            _ => None,
        }
    }

    /// Whether this edge consumes `symbol`; `min_vocab`/`max_vocab` bound the negated and
    /// wildcard matches.
    pub fn matches(&self, symbol: i32, min_vocab: i32, max_vocab: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { from, to, .. } => *from <= symbol && symbol <= *to,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                min_vocab <= symbol && symbol <= max_vocab && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => min_vocab <= symbol && symbol <= max_vocab,
            _ => false,
        }
    }
}
