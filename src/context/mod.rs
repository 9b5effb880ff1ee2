//! Graph-structured rule invocation stacks.
//!
//! During prediction the simulator follows rule invocations without a real call stack:
//! every configuration carries a [PredictionContext], an immutable DAG node describing one or
//! more chains of return states. Contexts for different alternatives share their common tails,
//! and the merge algebra of [merge](merge::merge) combines two contexts into one node whenever
//! two configurations meet in the same network state.
//!
//! A context takes one of three shapes:
//! * the *empty* context `$`, the bottom of every stack;
//! * a *singleton*, one parent and one return state;
//! * a *list*, parallel parent/return-state arrays sorted ascending by return state with
//!   [EMPTY_RETURN_STATE] (if present) in the last position.
//!
//! A list of width one is never built; construction collapses it to a singleton, and a
//! singleton without parent and with the empty return state collapses to the empty context.
//! Every node caches its structural hash at construction. The [ContextCache] interns published
//! nodes so that automaton states of the same grammar share one copy of each stack; the
//! [MergeCache] memoizes merges for the duration of a single prediction.

pub mod merge;
#[cfg(test)]
mod __tests__;

use crate::network::{Atn, Transition};
use crate::RuleContext;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The return state marking the bottom of a stack chain.
pub const EMPTY_RETURN_STATE: i32 = i32::MAX;

/// An immutable node of the graph-structured stack.
pub struct PredictionContext {
    hash: u64,
    pub(crate) data: ContextData,
}

pub(crate) enum ContextData {
    Empty,
    Singleton {
        parent: Option<Rc<PredictionContext>>,
        return_state: i32,
    },
    List {
        parents: Vec<Option<Rc<PredictionContext>>>,
        return_states: Vec<i32>,
    },
}

impl PredictionContext {
    /// The empty context `$`.
    pub fn empty() -> Rc<Self> {
        Rc::new(Self {
            hash: calculate_empty_hash(),
            data: ContextData::Empty,
        })
    }

    /// A context with one parent and one return state.
    ///
    /// Collapses to the empty context when there is no parent and the return state is
    /// [EMPTY_RETURN_STATE].
    pub fn singleton(parent: Option<Rc<Self>>, return_state: i32) -> Rc<Self> {
        if parent.is_none() && return_state == EMPTY_RETURN_STATE {
            return Self::empty();
        }
        Rc::new(Self {
            hash: calculate_singleton_hash(&parent, return_state),
            data: ContextData::Singleton {
                parent,
                return_state,
            },
        })
    }

    /// A context with parallel parent and return-state arrays.
    ///
    /// The caller keeps the arrays sorted ascending by return state; a width-one list is
    /// collapsed to a singleton.
    pub fn list(mut parents: Vec<Option<Rc<Self>>>, return_states: Vec<i32>) -> Rc<Self> {
        debug_assert_eq!(parents.len(), return_states.len());
        debug_assert!(!return_states.is_empty());
        if return_states.len() == 1 {
            return Self::singleton(parents.pop().unwrap(), return_states[0]);
        }
        Rc::new(Self {
            hash: calculate_list_hash(&parents, &return_states),
            data: ContextData::List {
                parents,
                return_states,
            },
        })
    }

    /// The context of the parser's current rule invocation chain.
    pub fn from_rule_context(atn: &Atn, ctx: &Rc<RuleContext>) -> Rc<Self> {
        match (&ctx.parent, ctx.invoking_state) {
            (Some(parent), Some(invoking_state)) => {
                let parent_ctx = Self::from_rule_context(atn, parent);
                let follow_state = match atn.state(invoking_state).transition(0) {
                    Transition::Rule { follow_state, .. } => *follow_state,
                    _ => panic!(
                        "Invoking state {} does not enter a rule.",
                        invoking_state
                    ),
                };
                Self::singleton(Some(parent_ctx), follow_state as i32)
            }
            _ => Self::empty(),
        }
    }

    /// The number of stack chains represented by this node.
    pub fn size(&self) -> usize {
        match &self.data {
            ContextData::Empty => 1,
            ContextData::Singleton { .. } => 1,
            ContextData::List { return_states, .. } => return_states.len(),
        }
    }

    pub fn return_state(&self, index: usize) -> i32 {
        match &self.data {
            ContextData::Empty => EMPTY_RETURN_STATE,
            ContextData::Singleton { return_state, .. } => {
                debug_assert_eq!(index, 0);
                *return_state
            }
            ContextData::List { return_states, .. } => return_states[index],
        }
    }

    pub fn parent(&self, index: usize) -> Option<&Rc<PredictionContext>> {
        match &self.data {
            ContextData::Empty => None,
            ContextData::Singleton { parent, .. } => {
                debug_assert_eq!(index, 0);
                parent.as_ref()
            }
            ContextData::List { parents, .. } => parents[index].as_ref(),
        }
    }

    /// Whether this is the empty context `$`.
    pub fn is_empty(&self) -> bool {
        matches!(self.data, ContextData::Empty)
    }

    /// Whether one of the chains bottoms out at the empty context.
    pub fn has_empty_path(&self) -> bool {
        self.return_state(self.size() - 1) == EMPTY_RETURN_STATE
    }

    pub fn cached_hash(&self) -> u64 {
        self.hash
    }

    /// Whether this node represents a single chain (empty or singleton shape).
    pub(crate) fn is_singleton(&self) -> bool {
        matches!(
            self.data,
            ContextData::Empty | ContextData::Singleton { .. }
        )
    }
}

fn calculate_empty_hash() -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u8(0);
    hasher.finish()
}

fn calculate_singleton_hash(parent: &Option<Rc<PredictionContext>>, return_state: i32) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u8(1);
    hasher.write_u64(parent.as_ref().map_or(0, |p| p.hash));
    hasher.write_i32(return_state);
    hasher.finish()
}

fn calculate_list_hash(
    parents: &[Option<Rc<PredictionContext>>],
    return_states: &[i32],
) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u8(2);
    for parent in parents {
        hasher.write_u64(parent.as_ref().map_or(0, |p| p.hash));
    }
    for return_state in return_states {
        hasher.write_i32(*return_state);
    }
    hasher.finish()
}

impl PartialEq for PredictionContext {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.hash != other.hash {
            return false;
        }
        match (&self.data, &other.data) {
            (ContextData::Empty, ContextData::Empty) => true,
            (
                ContextData::Singleton {
                    parent: pa,
                    return_state: ra,
                },
                ContextData::Singleton {
                    parent: pb,
                    return_state: rb,
                },
            ) => ra == rb && option_parent_eq(pa, pb),
            (
                ContextData::List {
                    parents: pa,
                    return_states: ra,
                },
                ContextData::List {
                    parents: pb,
                    return_states: rb,
                },
            ) => {
                ra == rb
                    && pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(x, y)| option_parent_eq(x, y))
            }
            _ => false,
        }
    }
}

fn option_parent_eq(
    a: &Option<Rc<PredictionContext>>,
    b: &Option<Rc<PredictionContext>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Rc::ptr_eq(x, y) || x == y,
        _ => false,
    }
}

impl Eq for PredictionContext {}

impl Hash for PredictionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl Debug for PredictionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ContextData::Empty => write!(f, "$"),
            ContextData::Singleton {
                parent,
                return_state,
            } => match parent {
                Some(p) => write!(f, "{} {:?}", return_state, p),
                None => write!(f, "{} ?", return_state),
            },
            ContextData::List {
                parents,
                return_states,
            } => {
                write!(f, "[")?;
                for (i, return_state) in return_states.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if *return_state == EMPTY_RETURN_STATE {
                        write!(f, "$")?;
                    } else {
                        match &parents[i] {
                            Some(p) => write!(f, "{} {:?}", return_state, p)?,
                            None => write!(f, "{} ?", return_state)?,
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Default)]
/// An interning table for published context nodes.
///
/// Insertions are monotonic; a node is never evicted during the recognizer's lifetime.
pub struct ContextCache {
    table: HashMap<Rc<PredictionContext>, Rc<PredictionContext>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Return the canonical instance for `context`, inserting it when absent.
    pub fn add(&mut self, context: Rc<PredictionContext>) -> Rc<PredictionContext> {
        if let Some(existing) = self.table.get(&context) {
            return Rc::clone(existing);
        }
        self.table.insert(Rc::clone(&context), Rc::clone(&context));
        context
    }

    pub fn get(&self, context: &Rc<PredictionContext>) -> Option<Rc<PredictionContext>> {
        self.table.get(context).cloned()
    }

    /// Rewrite `context` so that every node of its tree references interned nodes.
    ///
    /// Called when a new automaton state is published, not during closure; closures create
    /// many short-lived contexts which are not worth interning.
    pub fn cached(
        &mut self,
        context: &Rc<PredictionContext>,
        visited: &mut HashMap<*const PredictionContext, Rc<PredictionContext>>,
    ) -> Rc<PredictionContext> {
        if context.is_empty() {
            return Rc::clone(context);
        }
        if let Some(existing) = visited.get(&Rc::as_ptr(context)) {
            return Rc::clone(existing);
        }
        if let Some(existing) = self.get(context) {
            visited.insert(Rc::as_ptr(context), Rc::clone(&existing));
            return existing;
        }

        let mut changed = false;
        let mut parents = Vec::with_capacity(context.size());
        for i in 0..context.size() {
            match context.parent(i) {
                None => parents.push(None),
                Some(parent) => {
                    let cached = self.cached(parent, visited);
                    if !Rc::ptr_eq(&cached, parent) {
                        changed = true;
                    }
                    parents.push(Some(cached));
                }
            }
        }

        if !changed {
            let added = self.add(Rc::clone(context));
            visited.insert(Rc::as_ptr(context), Rc::clone(&added));
            return added;
        }

        let updated = if context.size() == 1 {
            PredictionContext::singleton(parents.pop().unwrap(), context.return_state(0))
        } else {
            let return_states = (0..context.size()).map(|i| context.return_state(i)).collect();
            PredictionContext::list(parents, return_states)
        };
        let added = self.add(updated);
        visited.insert(Rc::as_ptr(context), Rc::clone(&added));
        added
    }
}

#[derive(Default)]
/// A two-key memo for the merge algebra, scoped to one prediction.
///
/// Keys are node identities; the memo keeps the key nodes alive so an address is never
/// reused while its entry exists.
pub struct MergeCache {
    table: HashMap<
        (*const PredictionContext, *const PredictionContext),
        (
            Rc<PredictionContext>,
            Rc<PredictionContext>,
            Rc<PredictionContext>,
        ),
    >,
}

impl MergeCache {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn get(
        &self,
        a: &Rc<PredictionContext>,
        b: &Rc<PredictionContext>,
    ) -> Option<Rc<PredictionContext>> {
        self.table
            .get(&(Rc::as_ptr(a), Rc::as_ptr(b)))
            .map(|(_, _, result)| Rc::clone(result))
    }

    pub fn put(
        &mut self,
        a: Rc<PredictionContext>,
        b: Rc<PredictionContext>,
        result: Rc<PredictionContext>,
    ) {
        self.table
            .insert((Rc::as_ptr(&a), Rc::as_ptr(&b)), (a, b, result));
    }
}
