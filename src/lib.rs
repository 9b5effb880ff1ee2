//! Language recognition runtime (lang_atn) is a library to drive adaptive LL(*) lexers and
//! parsers from a compact serialized grammar transition network.
//!
//! # Overview
//! A parser generator usually compiles a grammar ahead of time into parsing code for the target
//! runtime language. However, generating the full prediction machinery for every grammar
//! increases the size and the maintenance cost of the generated parser.
//! Therefore, this library keeps the prediction machinery in one reusable runtime:
//! an offline tool serializes the grammar into an augmented transition network (ATN),
//! and the runtime reconstructs the network, simulates it against the input,
//! and resolves every nondeterministic choice point to a unique rule alternative.
//!
//! # Design
//!
//! The serialized network is decoded once at startup by the [AtnDeserializer](network::AtnDeserializer)
//! into an immutable [Atn](network::Atn) graph.
//! While input is consumed, the simulators lazily compile the visited parts of the network into
//! per-decision deterministic automata ([Dfa](automaton::Dfa)) so that a decision which has been
//! seen before is answered with a few array lookups instead of a new network walk.
//! The [ParserAtnSimulator](parser::ParserAtnSimulator) first predicts with fast local-context
//! (SLL) simulation and re-runs the decision with full context only when the local answer is
//! inconclusive. The [LexerAtnSimulator](lexer::LexerAtnSimulator) performs a priority-ordered
//! closure to produce longest-match tokens and threads mode, channel and custom commands through
//! [lexer actions](network::LexerAction).
//!
//! Semantic predicates and custom actions are evaluated through the [IRecognizer] and [ILexer]
//! callback interfaces, and ambiguity reports are delivered through [IErrorListener].
//! The runtime owns no I/O: input is consumed through the [IIntStream]/[ICharStream] interfaces.
//!
//! A recognizer instance is single threaded; nothing suspends and every long-running
//! operation runs to completion on the calling thread. The decoded network is immutable and
//! several recognizers of the same grammar may share one copy through [Rc](std::rc::Rc),
//! while each simulator owns its automata and caches exclusively.
//!
//! # Example
//!
//! ```
//! use lang_atn::{CharStream, ICharStream, IIntStream, Interval, IntervalSet, TOKEN_EOF};
//!
//! // Transition labels and follow sets are sorted, disjoint integer ranges.
//! let mut digits = IntervalSet::new();
//! digits.add_range('0' as i32, '9' as i32);
//! digits.add('_' as i32);
//! assert!(digits.contains('7' as i32));
//! assert_eq!(digits.size(), 11);
//!
//! // Input is consumed through a cursor over 32-bit symbols; -1 marks the end.
//! let mut input = CharStream::from("ab");
//! assert_eq!(input.la(1), 'a' as i32);
//! input.consume();
//! input.consume();
//! assert_eq!(input.la(1), TOKEN_EOF);
//! assert_eq!(input.text(Interval::of(0, 1)), "ab");
//! ```
//!
//! # License
//! [lang_atn](crate) is provided under the MIT license.

pub mod automaton;
pub mod config;
pub mod config_set;
pub mod context;
pub mod errors;
pub mod interval;
mod lex;
pub mod lexer;
mod listener;
mod logger;
pub mod network;
pub mod parser;
pub mod predicate;
mod rule_context;
#[cfg(test)]
pub(crate) mod samples;
pub mod stream;

use bit_set::BitSet;
use std::rc::Rc;

pub use interval::{Interval, IntervalSet};
pub use stream::{CharStream, TokenTypeStream};

/// End of input, reported by every stream when the cursor moves past the last symbol.
pub const TOKEN_EOF: i32 = -1;
/// The label of transitions which consume no input.
pub const TOKEN_EPSILON: i32 = -2;
/// Placeholder for an unknown token type; never produced by a well-formed network.
pub const TOKEN_INVALID: i32 = 0;
/// The smallest token type a grammar rule can match.
pub const TOKEN_MIN_USER: i32 = 1;
/// The default channel tokens are emitted on.
pub const CHANNEL_DEFAULT: usize = 0;
/// The alternative number reserved for "no prediction"; real alternatives are 1-based.
pub const INVALID_ALT: usize = 0;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// The line and column information at an input point.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Hash, Clone, PartialEq, Eq)]
/// Element of the tokenized data produced by a lexer driving the [LexerAtnSimulator](lexer::LexerAtnSimulator).
pub struct Lex {
    pub token: i32,
    pub channel: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A link in the parser's rule invocation chain.
///
/// The runtime does not build parse trees; prediction only needs to know through which
/// network states the surrounding rules were entered. The outermost context has no parent
/// and no invoking state.
pub struct RuleContext {
    pub parent: Option<Rc<RuleContext>>,
    pub invoking_state: Option<usize>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// A narration label for the simulators; the variant selects how much of a prediction or
/// tokenization run is printed.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

/// A cursor over a stream of 32-bit symbols.
///
/// The parser simulator consumes token types through this interface and the lexer simulator
/// consumes character code points through [ICharStream]. Looking past the end of the stream
/// returns [TOKEN_EOF]. `mark`/`release` exist for buffered sources; the in-memory
/// implementations of this crate treat them as no-ops.
pub trait IIntStream {
    /// Return the symbol `offset` positions ahead of the cursor; `la(1)` is the current symbol.
    fn la(&mut self, offset: isize) -> i32;
    fn index(&self) -> usize;
    fn consume(&mut self);
    fn seek(&mut self, index: usize);
    fn mark(&mut self) -> isize;
    fn release(&mut self, marker: isize);
    fn size(&self) -> usize;
}

/// A symbol stream which can also report the text it covers.
pub trait ICharStream: IIntStream {
    /// The text between the interval bounds, both inclusive.
    fn text(&self, interval: Interval) -> String;
}

/// Callback interface through which the parser simulator evaluates user predicates.
///
/// The runtime never interprets predicate bodies; it hands the rule-relative predicate
/// index back to the recognizer that was generated alongside the serialized network.
pub trait IRecognizer {
    /// Evaluate semantic predicate `pred_index` of rule `rule`.
    ///
    /// `ctx` is the parser call chain for context-dependent predicates and [None] otherwise.
    fn semantic_predicate(
        &mut self,
        ctx: Option<&Rc<RuleContext>>,
        rule: usize,
        pred_index: usize,
    ) -> bool;
    /// Whether the current parser precedence permits an alternative gated at `precedence`.
    fn precedence_predicate(&mut self, ctx: &Rc<RuleContext>, precedence: i32) -> bool;
    /// The parser's current precedence level, used to select a start state of a
    /// precedence [Dfa](automaton::Dfa).
    fn precedence(&self) -> i32;
}

/// Callback interface through which matched lexer actions reach the lexer driving the simulation.
pub trait ILexer {
    fn set_token_type(&mut self, token_type: i32);
    fn set_channel(&mut self, channel: usize);
    fn set_mode(&mut self, mode: usize);
    fn push_mode(&mut self, mode: usize);
    fn pop_mode(&mut self);
    fn skip(&mut self);
    fn more(&mut self);
    /// Execute custom action `action_index` of rule `rule`.
    fn action(&mut self, rule: usize, action_index: usize);
    /// Evaluate semantic predicate `pred_index` of rule `rule`.
    fn semantic_predicate(&mut self, rule: usize, pred_index: usize) -> bool;
}

/// A listener receiving prediction reports from the parser simulator.
///
/// Ambiguity and context sensitivity are ordinary outcomes of prediction, not errors;
/// every report is delivered before the triggering prediction returns.
pub trait IErrorListener {
    fn report_ambiguity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &BitSet,
        configs: &config_set::AtnConfigSet,
    );
    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        conflicting_alts: &BitSet,
        configs: &config_set::AtnConfigSet,
    );
    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        prediction: usize,
        configs: &config_set::AtnConfigSet,
    );
}

/// An [IErrorListener] which prints every report to standard output.
pub struct ConsoleErrorListener;

/// An [IErrorListener] which swallows every report.
pub struct SilentErrorListener;
