//! A configuration is one point of a simulation: a network state reached for a particular
//! alternative with a particular invocation stack.
//!
//! Configurations are the elements the simulators close over; a deterministic automaton state
//! is nothing but a frozen set of them. Equality deliberately ignores how deep a
//! configuration escaped into the surrounding context — two configurations differing only in
//! that counter predict the same way — and the lexer-only fields take part so the lexer's
//! priority closure can keep configurations of the same shape but different action chains
//! apart.

use crate::context::PredictionContext;
use crate::lexer::LexerActionExecutor;
use crate::network::Atn;
use crate::predicate::SemanticContext;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct AtnConfig {
    pub state: usize,
    /// 1-based alternative this configuration predicts.
    pub alt: usize,
    pub context: Rc<PredictionContext>,
    pub semantic_context: Rc<SemanticContext>,
    /// How many times closure fell off the end of the decision rule into the surrounding
    /// context; excluded from equality.
    pub reaches_into_outer_context: usize,
    /// Set on configurations returning from the outermost invocation of a precedence rule;
    /// excluded from equality.
    pub precedence_filter_suppressed: bool,
    /// Lexer simulation only: the actions collected along this configuration's path.
    pub executor: Option<Rc<LexerActionExecutor>>,
    /// Lexer simulation only: whether the path crossed a non-greedy decision.
    pub passed_non_greedy: bool,
}

impl AtnConfig {
    pub fn new(state: usize, alt: usize, context: Rc<PredictionContext>) -> Self {
        Self {
            state,
            alt,
            context,
            semantic_context: SemanticContext::none(),
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
            executor: None,
            passed_non_greedy: false,
        }
    }

    pub fn with_semantic_context(
        state: usize,
        alt: usize,
        context: Rc<PredictionContext>,
        semantic_context: Rc<SemanticContext>,
    ) -> Self {
        Self {
            semantic_context,
            ..Self::new(state, alt, context)
        }
    }

    /// This configuration moved to `state`, stack and predicates unchanged.
    pub fn moved(&self, state: usize) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn moved_with_context(&self, state: usize, context: Rc<PredictionContext>) -> Self {
        Self {
            state,
            context,
            ..self.clone()
        }
    }

    pub fn moved_with_semantic_context(
        &self,
        state: usize,
        semantic_context: Rc<SemanticContext>,
    ) -> Self {
        Self {
            state,
            semantic_context,
            ..self.clone()
        }
    }

    pub fn with_new_semantic_context(&self, semantic_context: Rc<SemanticContext>) -> Self {
        Self {
            semantic_context,
            ..self.clone()
        }
    }

    /// Lexer move: crossing into a non-greedy decision state is recorded on the result.
    pub fn lexer_moved(&self, atn: &Atn, state: usize) -> Self {
        Self {
            state,
            passed_non_greedy: check_non_greedy(self, atn, state),
            ..self.clone()
        }
    }

    pub fn lexer_moved_with_executor(
        &self,
        atn: &Atn,
        state: usize,
        executor: Option<Rc<LexerActionExecutor>>,
    ) -> Self {
        Self {
            state,
            executor,
            passed_non_greedy: check_non_greedy(self, atn, state),
            ..self.clone()
        }
    }

    pub fn lexer_moved_with_context(
        &self,
        atn: &Atn,
        state: usize,
        context: Rc<PredictionContext>,
    ) -> Self {
        Self {
            state,
            context,
            passed_non_greedy: check_non_greedy(self, atn, state),
            ..self.clone()
        }
    }
}

fn check_non_greedy(source: &AtnConfig, atn: &Atn, target: usize) -> bool {
    source.passed_non_greedy
        || (atn.state(target).is_decision_state() && atn.state(target).non_greedy)
}

impl PartialEq for AtnConfig {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.alt == other.alt
            && self.passed_non_greedy == other.passed_non_greedy
            && self.context == other.context
            && self.semantic_context == other.semantic_context
            && option_executor_eq(&self.executor, &other.executor)
    }
}

impl Eq for AtnConfig {}

impl Hash for AtnConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.state);
        state.write_usize(self.alt);
        state.write_u64(self.context.cached_hash());
        self.semantic_context.hash(state);
        if let Some(executor) = &self.executor {
            executor.hash(state);
        }
        state.write_u8(self.passed_non_greedy as u8);
    }
}

fn option_executor_eq(
    a: &Option<Rc<LexerActionExecutor>>,
    b: &Option<Rc<LexerActionExecutor>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Rc::ptr_eq(x, y) || x == y,
        _ => false,
    }
}
