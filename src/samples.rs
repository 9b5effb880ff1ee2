//! Serialized sample networks used across the test suites.
//!
//! Networks can only be constructed through the deserializer, so the tests assemble the
//! serialized word stream directly with [AtnStream] and decode it like production code
//! would. The sample grammars mirror the shapes the offline compiler emits for the
//! constructs under test.

use crate::network::{Uuid, ADDED_LEXER_ACTIONS_UUID, BASE_UUID, SERIALIZED_VERSION};

// State type codes of the serialized form.
pub(crate) const ST_BASIC: u16 = 1;
pub(crate) const ST_RULE_START: u16 = 2;
pub(crate) const ST_BLOCK_START: u16 = 3;
pub(crate) const ST_PLUS_BLOCK_START: u16 = 4;
pub(crate) const ST_STAR_BLOCK_START: u16 = 5;
pub(crate) const ST_TOKENS_START: u16 = 6;
pub(crate) const ST_RULE_STOP: u16 = 7;
pub(crate) const ST_BLOCK_END: u16 = 8;
pub(crate) const ST_STAR_LOOPBACK: u16 = 9;
pub(crate) const ST_STAR_LOOP_ENTRY: u16 = 10;
pub(crate) const ST_PLUS_LOOPBACK: u16 = 11;
pub(crate) const ST_LOOP_END: u16 = 12;

// Transition type codes of the serialized form.
pub(crate) const TR_EPSILON: u16 = 1;
pub(crate) const TR_RANGE: u16 = 2;
pub(crate) const TR_RULE: u16 = 3;
pub(crate) const TR_PREDICATE: u16 = 4;
pub(crate) const TR_ATOM: u16 = 5;
pub(crate) const TR_ACTION: u16 = 6;
pub(crate) const TR_SET: u16 = 7;
pub(crate) const TR_NOT_SET: u16 = 8;
pub(crate) const TR_WILDCARD: u16 = 9;
pub(crate) const TR_PRECEDENCE: u16 = 10;

// Lexer action type codes.
pub(crate) const LA_CHANNEL: u16 = 0;
pub(crate) const LA_CUSTOM: u16 = 1;
pub(crate) const LA_MODE: u16 = 2;
pub(crate) const LA_MORE: u16 = 3;
pub(crate) const LA_POP_MODE: u16 = 4;
pub(crate) const LA_PUSH_MODE: u16 = 5;
pub(crate) const LA_SKIP: u16 = 6;
pub(crate) const LA_TYPE: u16 = 7;

pub(crate) const GRAMMAR_LEXER: u16 = 0;
pub(crate) const GRAMMAR_PARSER: u16 = 1;

/// Section-by-section assembly of a serialized network.
pub(crate) struct AtnStream {
    pub uuid: Uuid,
    pub grammar_kind: u16,
    pub max_token_type: u16,
    /// Per state: `[kind, rule, extra…]`; a bare `[0]` is an invalid-state placeholder.
    pub states: Vec<Vec<u16>>,
    pub non_greedy: Vec<u16>,
    pub precedence_states: Vec<u16>,
    /// Per rule: `[start]` for parsers, `[start, token_type]` (plus the legacy action
    /// index under the base format) for lexers.
    pub rules: Vec<Vec<u16>>,
    pub modes: Vec<u16>,
    pub sets: Vec<(bool, Vec<(u16, u16)>)>,
    pub edges: Vec<[u16; 6]>,
    pub decisions: Vec<u16>,
    pub lexer_actions: Vec<(u16, u16, u16)>,
}

impl AtnStream {
    pub fn parser(max_token_type: u16) -> Self {
        Self {
            uuid: ADDED_LEXER_ACTIONS_UUID,
            grammar_kind: GRAMMAR_PARSER,
            max_token_type,
            states: Vec::new(),
            non_greedy: Vec::new(),
            precedence_states: Vec::new(),
            rules: Vec::new(),
            modes: Vec::new(),
            sets: Vec::new(),
            edges: Vec::new(),
            decisions: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    pub fn lexer(max_token_type: u16) -> Self {
        Self {
            grammar_kind: GRAMMAR_LEXER,
            ..Self::parser(max_token_type)
        }
    }

    pub fn state(&mut self, kind: u16, rule: u16) -> u16 {
        let number = self.states.len() as u16;
        self.states.push(vec![kind, rule]);
        number
    }

    pub fn state_with_extra(&mut self, kind: u16, rule: u16, extra: u16) -> u16 {
        let number = self.states.len() as u16;
        self.states.push(vec![kind, rule, extra]);
        number
    }

    pub fn edge(&mut self, src: u16, trg: u16, kind: u16, arg1: u16, arg2: u16, arg3: u16) {
        self.edges.push([src, trg, kind, arg1, arg2, arg3]);
    }

    pub fn epsilon(&mut self, src: u16, trg: u16) {
        self.edge(src, trg, TR_EPSILON, 0, 0, 0);
    }

    pub fn atom(&mut self, src: u16, trg: u16, label: u16) {
        self.edge(src, trg, TR_ATOM, label, 0, 0);
    }

    pub fn rule_call(&mut self, src: u16, rule_start: u16, rule: u16, precedence: u16, follow: u16) {
        self.edge(src, follow, TR_RULE, rule_start, rule, precedence);
    }

    pub fn serialize(&self) -> Vec<u16> {
        let mut out = vec![SERIALIZED_VERSION];
        out.extend(self.uuid.words());
        out.push(self.grammar_kind);
        out.push(self.max_token_type);

        out.push(self.states.len() as u16);
        for state in &self.states {
            out.extend(state);
        }

        out.push(self.non_greedy.len() as u16);
        out.extend(&self.non_greedy);

        if self.uuid != BASE_UUID {
            out.push(self.precedence_states.len() as u16);
            out.extend(&self.precedence_states);
        }

        out.push(self.rules.len() as u16);
        for rule in &self.rules {
            out.extend(rule);
        }

        out.push(self.modes.len() as u16);
        out.extend(&self.modes);

        out.push(self.sets.len() as u16);
        for (contains_eof, intervals) in &self.sets {
            out.push(intervals.len() as u16);
            out.push(*contains_eof as u16);
            for (a, b) in intervals {
                out.push(*a);
                out.push(*b);
            }
        }

        out.push(self.edges.len() as u16);
        for edge in &self.edges {
            out.extend(edge);
        }

        out.push(self.decisions.len() as u16);
        out.extend(&self.decisions);

        if self.grammar_kind == GRAMMAR_LEXER && self.uuid == ADDED_LEXER_ACTIONS_UUID {
            out.push(self.lexer_actions.len() as u16);
            for (kind, data1, data2) in &self.lexer_actions {
                out.push(*kind);
                out.push(*data1);
                out.push(*data2);
            }
        }

        out.into_iter().map(|word| word.wrapping_add(2)).collect()
    }
}

pub(crate) const TOKEN_X: i32 = 1;
pub(crate) const TOKEN_Y: i32 = 2;

/// `a : 'x' | 'y' ;` — one decision with two single-token alternatives.
pub(crate) fn two_alts_parser() -> Vec<u16> {
    let mut s = AtnStream::parser(2);
    let rule_start = s.state(ST_RULE_START, 0); // 0
    let rule_stop = s.state(ST_RULE_STOP, 0); // 1
    let block_start = s.state_with_extra(ST_BLOCK_START, 0, 5); // 2
    let alt1 = s.state(ST_BASIC, 0); // 3
    let alt2 = s.state(ST_BASIC, 0); // 4
    let block_end = s.state(ST_BLOCK_END, 0); // 5

    s.epsilon(rule_start, block_start);
    s.epsilon(block_start, alt1);
    s.epsilon(block_start, alt2);
    s.atom(alt1, block_end, TOKEN_X as u16);
    s.atom(alt2, block_end, TOKEN_Y as u16);
    s.epsilon(block_end, rule_stop);

    s.rules.push(vec![rule_start]);
    s.decisions.push(block_start);
    s.serialize()
}

pub(crate) const TOKEN_ID: i32 = 1;

/// `s : ID | ID ID? ;` — locally ambiguous on a single `ID`.
pub(crate) fn optional_second_id_parser() -> Vec<u16> {
    let mut s = AtnStream::parser(1);
    let rule_start = s.state(ST_RULE_START, 0); // 0
    let rule_stop = s.state(ST_RULE_STOP, 0); // 1
    let outer_start = s.state_with_extra(ST_BLOCK_START, 0, 8); // 2
    let alt1 = s.state(ST_BASIC, 0); // 3
    let alt2 = s.state(ST_BASIC, 0); // 4
    let inner_start = s.state_with_extra(ST_BLOCK_START, 0, 7); // 5
    let inner_alt = s.state(ST_BASIC, 0); // 6
    let inner_end = s.state(ST_BLOCK_END, 0); // 7
    let outer_end = s.state(ST_BLOCK_END, 0); // 8

    s.epsilon(rule_start, outer_start);
    s.epsilon(outer_start, alt1);
    s.epsilon(outer_start, alt2);
    s.atom(alt1, outer_end, TOKEN_ID as u16);
    s.atom(alt2, inner_start, TOKEN_ID as u16);
    s.epsilon(inner_start, inner_alt);
    s.epsilon(inner_start, inner_end);
    s.atom(inner_alt, inner_end, TOKEN_ID as u16);
    s.epsilon(inner_end, outer_end);
    s.epsilon(outer_end, rule_stop);

    s.rules.push(vec![rule_start]);
    s.decisions.push(outer_start);
    s.decisions.push(inner_start);
    s.serialize()
}

/// `s : {p?}? ID | ID ;` — identical alternatives, the first gated by a predicate.
pub(crate) fn predicated_alts_parser() -> Vec<u16> {
    let mut s = AtnStream::parser(1);
    let rule_start = s.state(ST_RULE_START, 0); // 0
    let rule_stop = s.state(ST_RULE_STOP, 0); // 1
    let block_start = s.state_with_extra(ST_BLOCK_START, 0, 6); // 2
    let gate = s.state(ST_BASIC, 0); // 3
    let alt1 = s.state(ST_BASIC, 0); // 4
    let alt2 = s.state(ST_BASIC, 0); // 5
    let block_end = s.state(ST_BLOCK_END, 0); // 6

    s.epsilon(rule_start, block_start);
    s.epsilon(block_start, gate);
    s.epsilon(block_start, alt2);
    s.edge(gate, alt1, TR_PREDICATE, 0, 0, 0); // rule 0, predicate 0
    s.atom(alt1, block_end, TOKEN_ID as u16);
    s.atom(alt2, block_end, TOKEN_ID as u16);
    s.epsilon(block_end, rule_stop);

    s.rules.push(vec![rule_start]);
    s.decisions.push(block_start);
    s.serialize()
}

pub(crate) const TOKEN_INT: i32 = 1;
pub(crate) const TOKEN_STAR: i32 = 2;
pub(crate) const TOKEN_PLUS: i32 = 3;

/// `s : e ; e : e '*' e | e '+' e | INT ;` after the left-recursion rewrite:
/// `e[p] : INT ( {3>=p}? '*' e[4] | {2>=p}? '+' e[3] )* ;`
pub(crate) fn left_recursive_expr_parser() -> Vec<u16> {
    let mut s = AtnStream::parser(3);
    let rule_start = s.state(ST_RULE_START, 0); // 0
    let rule_stop = s.state(ST_RULE_STOP, 0); // 1
    let primary = s.state(ST_BASIC, 0); // 2
    let loop_entry = s.state(ST_STAR_LOOP_ENTRY, 0); // 3
    let block_start = s.state_with_extra(ST_STAR_BLOCK_START, 0, 11); // 4
    let star_gate = s.state(ST_BASIC, 0); // 5
    let star_op = s.state(ST_BASIC, 0); // 6
    let star_call = s.state(ST_BASIC, 0); // 7
    let plus_gate = s.state(ST_BASIC, 0); // 8
    let plus_op = s.state(ST_BASIC, 0); // 9
    let plus_call = s.state(ST_BASIC, 0); // 10
    let block_end = s.state(ST_BLOCK_END, 0); // 11
    let loopback = s.state(ST_STAR_LOOPBACK, 0); // 12
    let loop_end = s.state_with_extra(ST_LOOP_END, 0, 12); // 13
    let start_rule = s.state(ST_RULE_START, 1); // 14
    let start_stop = s.state(ST_RULE_STOP, 1); // 15
    let start_call = s.state(ST_BASIC, 1); // 16
    let start_follow = s.state(ST_BASIC, 1); // 17

    s.epsilon(rule_start, primary);
    s.atom(primary, loop_entry, TOKEN_INT as u16);
    s.epsilon(loop_entry, block_start);
    s.epsilon(loop_entry, loop_end);
    s.epsilon(block_start, star_gate);
    s.epsilon(block_start, plus_gate);
    s.edge(star_gate, star_op, TR_PRECEDENCE, 3, 0, 0);
    s.atom(star_op, star_call, TOKEN_STAR as u16);
    s.rule_call(star_call, rule_start, 0, 4, block_end);
    s.edge(plus_gate, plus_op, TR_PRECEDENCE, 2, 0, 0);
    s.atom(plus_op, plus_call, TOKEN_PLUS as u16);
    s.rule_call(plus_call, rule_start, 0, 3, block_end);
    s.epsilon(block_end, loopback);
    s.epsilon(loopback, loop_entry);
    s.epsilon(loop_end, rule_stop);

    s.epsilon(start_rule, start_call);
    s.rule_call(start_call, rule_start, 0, 0, start_follow);
    s.epsilon(start_follow, start_stop);

    s.rules.push(vec![rule_start]);
    s.rules.push(vec![start_rule]);
    s.precedence_states.push(rule_start);
    s.decisions.push(loop_entry);
    s.decisions.push(block_start);
    s.serialize()
}

/// `C : 'x' .*? 'y' ;` — a non-greedy inner loop, shortest match wins.
pub(crate) fn non_greedy_lexer() -> Vec<u16> {
    let mut s = AtnStream::lexer(1);
    let tokens_start = s.state(ST_TOKENS_START, 0xFFFF); // 0
    let rule_start = s.state(ST_RULE_START, 0); // 1
    let rule_stop = s.state(ST_RULE_STOP, 0); // 2
    let open = s.state(ST_BASIC, 0); // 3
    let loop_entry = s.state(ST_STAR_LOOP_ENTRY, 0); // 4
    let block_start = s.state_with_extra(ST_STAR_BLOCK_START, 0, 7); // 5
    let body = s.state(ST_BASIC, 0); // 6
    let block_end = s.state(ST_BLOCK_END, 0); // 7
    let loopback = s.state(ST_STAR_LOOPBACK, 0); // 8
    let loop_end = s.state_with_extra(ST_LOOP_END, 0, 8); // 9
    let close = s.state(ST_BASIC, 0); // 10

    s.epsilon(tokens_start, rule_start);
    s.epsilon(rule_start, open);
    s.atom(open, loop_entry, 'x' as u16);
    // A non-greedy loop lists the exit first.
    s.epsilon(loop_entry, loop_end);
    s.epsilon(loop_entry, block_start);
    s.epsilon(block_start, body);
    s.edge(body, block_end, TR_WILDCARD, 0, 0, 0);
    s.epsilon(block_end, loopback);
    s.epsilon(loopback, loop_entry);
    s.epsilon(loop_end, close);
    s.atom(close, rule_stop, 'y' as u16);

    s.rules.push(vec![rule_start, 1]);
    s.modes.push(tokens_start);
    s.non_greedy.push(loop_entry);
    s.decisions.push(loop_entry);
    s.serialize()
}

pub(crate) const LEX_TOKEN_ID: i32 = 1;
pub(crate) const LEX_TOKEN_WS: i32 = 2;

/// `ID : [a-z]+ ; WS : [ \t\n]+ -> skip ;`
pub(crate) fn skipping_lexer() -> Vec<u16> {
    let mut s = AtnStream::lexer(2);
    let tokens_start = s.state(ST_TOKENS_START, 0xFFFF); // 0
    let id_start = s.state(ST_RULE_START, 0); // 1
    let id_stop = s.state(ST_RULE_STOP, 0); // 2
    let ws_start = s.state(ST_RULE_START, 1); // 3
    let ws_stop = s.state(ST_RULE_STOP, 1); // 4

    let id_block = s.state_with_extra(ST_PLUS_BLOCK_START, 0, 7); // 5
    let id_body = s.state(ST_BASIC, 0); // 6
    let id_block_end = s.state(ST_BLOCK_END, 0); // 7
    let id_loopback = s.state(ST_PLUS_LOOPBACK, 0); // 8
    let id_loop_end = s.state_with_extra(ST_LOOP_END, 0, 8); // 9

    let ws_block = s.state_with_extra(ST_PLUS_BLOCK_START, 1, 12); // 10
    let ws_body = s.state(ST_BASIC, 1); // 11
    let ws_block_end = s.state(ST_BLOCK_END, 1); // 12
    let ws_loopback = s.state(ST_PLUS_LOOPBACK, 1); // 13
    let ws_loop_end = s.state_with_extra(ST_LOOP_END, 1, 13); // 14
    let ws_action = s.state(ST_BASIC, 1); // 15

    s.epsilon(tokens_start, id_start);
    s.epsilon(tokens_start, ws_start);

    s.epsilon(id_start, id_block);
    s.epsilon(id_block, id_body);
    s.edge(id_body, id_block_end, TR_SET, 0, 0, 0);
    s.epsilon(id_block_end, id_loopback);
    s.epsilon(id_loopback, id_block);
    s.epsilon(id_loopback, id_loop_end);
    s.epsilon(id_loop_end, id_stop);

    s.epsilon(ws_start, ws_block);
    s.epsilon(ws_block, ws_body);
    s.edge(ws_body, ws_block_end, TR_SET, 1, 0, 0);
    s.epsilon(ws_block_end, ws_loopback);
    s.epsilon(ws_loopback, ws_block);
    s.epsilon(ws_loopback, ws_loop_end);
    s.epsilon(ws_loop_end, ws_action);
    s.edge(ws_action, ws_stop, TR_ACTION, 1, 0, 0);

    s.sets.push((false, vec![(b'a' as u16, b'z' as u16)]));
    s.sets.push((false, vec![(9, 10), (32, 32)]));
    s.rules.push(vec![id_start, LEX_TOKEN_ID as u16]);
    s.rules.push(vec![ws_start, LEX_TOKEN_WS as u16]);
    s.modes.push(tokens_start);
    s.decisions.push(tokens_start);
    s.decisions.push(id_loopback);
    s.decisions.push(ws_loopback);
    s.lexer_actions.push((LA_SKIP, 0, 0));
    s.serialize()
}
