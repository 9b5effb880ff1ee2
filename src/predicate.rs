//! Semantic predicate trees.
//!
//! Alternatives of a grammar rule can be gated by user predicates and by precedence checks of
//! left-recursive rules. During closure the simulator conjoins every predicate it crosses into
//! the configuration's [SemanticContext]; at accept time the tree is evaluated through the
//! recognizer callbacks. The combinators normalize at construction: nested conjunctions and
//! disjunctions of the same kind are flattened, duplicate operands are dropped, and of several
//! precedence checks only the meaningful one is retained (the lowest in a conjunction, the
//! highest in a disjunction).

use crate::{IRecognizer, RuleContext};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// A user predicate, a precedence check, or a Boolean combination of them.
///
/// [SemanticContext::None] is the neutral "no predicate" sentinel.
pub enum SemanticContext {
    None,
    Predicate {
        rule: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    Precedence {
        precedence: i32,
    },
    And {
        operands: Vec<SemanticContext>,
    },
    Or {
        operands: Vec<SemanticContext>,
    },
}

impl SemanticContext {
    pub fn none() -> Rc<Self> {
        Rc::new(SemanticContext::None)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SemanticContext::None)
    }

    /// The conjunction of two contexts; the sentinel is the neutral element.
    pub fn and(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        if a.is_none() {
            return b.clone();
        }
        if b.is_none() {
            return a.clone();
        }
        let mut operands = Vec::new();
        collect_operands(a, true, &mut operands);
        collect_operands(b, true, &mut operands);

        // Of several precedence checks only the lowest can matter in a conjunction.
        let precedences: Vec<i32> = operands
            .iter()
            .filter_map(|op| match op {
                SemanticContext::Precedence { precedence } => Some(*precedence),
                _ => None,
            })
            .collect();
        if !precedences.is_empty() {
            operands.retain(|op| !matches!(op, SemanticContext::Precedence { .. }));
            operands.push(SemanticContext::Precedence {
                precedence: precedences.into_iter().min().unwrap(),
            });
        }

        if operands.len() == 1 {
            return operands.pop().unwrap();
        }
        SemanticContext::And { operands }
    }

    /// The disjunction of two contexts; the sentinel dominates.
    pub fn or(a: &SemanticContext, b: &SemanticContext) -> SemanticContext {
        if a.is_none() || b.is_none() {
            return SemanticContext::None;
        }
        let mut operands = Vec::new();
        collect_operands(a, false, &mut operands);
        collect_operands(b, false, &mut operands);

        // Of several precedence checks only the highest can matter in a disjunction.
        let precedences: Vec<i32> = operands
            .iter()
            .filter_map(|op| match op {
                SemanticContext::Precedence { precedence } => Some(*precedence),
                _ => None,
            })
            .collect();
        if !precedences.is_empty() {
            operands.retain(|op| !matches!(op, SemanticContext::Precedence { .. }));
            operands.push(SemanticContext::Precedence {
                precedence: precedences.into_iter().max().unwrap(),
            });
        }

        if operands.len() == 1 {
            return operands.pop().unwrap();
        }
        SemanticContext::Or { operands }
    }

    /// Evaluate the tree through the recognizer callbacks.
    pub fn eval(&self, recognizer: &mut dyn IRecognizer, ctx: &Rc<RuleContext>) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate {
                rule,
                pred_index,
                ctx_dependent,
            } => {
                let local = if *ctx_dependent { Some(ctx) } else { None };
                recognizer.semantic_predicate(local, *rule, *pred_index)
            }
            SemanticContext::Precedence { precedence } => {
                recognizer.precedence_predicate(ctx, *precedence)
            }
            SemanticContext::And { operands } => {
                operands.iter().all(|op| op.eval(recognizer, ctx))
            }
            SemanticContext::Or { operands } => operands.iter().any(|op| op.eval(recognizer, ctx)),
        }
    }

    /// Partially evaluate the tree against the parser's current precedence.
    ///
    /// A precedence check which passes collapses to the sentinel, one which fails makes the
    /// whole branch unviable ([None]); user predicates are kept for accept-time evaluation.
    pub fn eval_precedence(
        &self,
        recognizer: &mut dyn IRecognizer,
        ctx: &Rc<RuleContext>,
    ) -> Option<SemanticContext> {
        match self {
            SemanticContext::None | SemanticContext::Predicate { .. } => Some(self.clone()),
            SemanticContext::Precedence { precedence } => {
                if recognizer.precedence_predicate(ctx, *precedence) {
                    Some(SemanticContext::None)
                } else {
                    None
                }
            }
            SemanticContext::And { operands } => {
                let mut differs = false;
                let mut remaining = Vec::new();
                for op in operands {
                    match op.eval_precedence(recognizer, ctx) {
                        None => return None,
                        Some(evaluated) => {
                            differs |= &evaluated != op;
                            if !evaluated.is_none() {
                                remaining.push(evaluated);
                            }
                        }
                    }
                }
                if !differs {
                    return Some(self.clone());
                }
                if remaining.is_empty() {
                    return Some(SemanticContext::None);
                }
                let mut result = remaining[0].clone();
                for op in &remaining[1..] {
                    result = SemanticContext::and(&result, op);
                }
                Some(result)
            }
            SemanticContext::Or { operands } => {
                let mut differs = false;
                let mut remaining = Vec::new();
                for op in operands {
                    match op.eval_precedence(recognizer, ctx) {
                        None => {
                            differs = true;
                        }
                        Some(evaluated) => {
                            if evaluated.is_none() {
                                // One branch is unconditionally true.
                                return Some(SemanticContext::None);
                            }
                            differs |= &evaluated != op;
                            remaining.push(evaluated);
                        }
                    }
                }
                if !differs {
                    return Some(self.clone());
                }
                if remaining.is_empty() {
                    return None;
                }
                let mut result = remaining[0].clone();
                for op in &remaining[1..] {
                    result = SemanticContext::or(&result, op);
                }
                Some(result)
            }
        }
    }
}

/// Flatten same-kind nesting and drop duplicate operands, keeping first-seen order.
fn collect_operands(ctx: &SemanticContext, conjunction: bool, into: &mut Vec<SemanticContext>) {
    let nested: Option<&Vec<SemanticContext>> = match (ctx, conjunction) {
        (SemanticContext::And { operands }, true) => Some(operands),
        (SemanticContext::Or { operands }, false) => Some(operands),
        _ => None,
    };
    match nested {
        Some(operands) => {
            for op in operands {
                if !into.contains(op) {
                    into.push(op.clone());
                }
            }
        }
        None => {
            if !into.contains(ctx) {
                into.push(ctx.clone());
            }
        }
    }
}
