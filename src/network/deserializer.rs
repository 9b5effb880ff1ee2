//! Decoding of the serialized network.
//!
//! The serialized form is a stream of 16-bit code units, each shifted by two so the encoder
//! never emits the code units text tooling mangles. The stream starts with a version word and
//! an eight-word UUID naming the format revision; unknown versions and revisions are rejected
//! before anything else is read. Decoding is a single pass over the sections (states,
//! markers, rules, modes, sets, edges, decisions, lexer actions) followed by the link
//! resolution passes and a structural verification of the finished graph.

use super::{
    Atn, AtnStateKind, GrammarKind, LexerAction, Transition, Uuid, ADDED_LEXER_ACTIONS_UUID,
    ADDED_PRECEDENCE_TRANSITIONS_UUID, INVALID_STATE, SERIALIZED_VERSION, SUPPORTED_UUIDS,
};
use crate::errors::DeserializeError;
use crate::interval::IntervalSet;
use crate::TOKEN_EOF;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
/// Choices applied while decoding.
pub struct DeserializeOptions {
    /// Check the structural invariants of the decoded graph.
    pub verify: bool,
    /// Wrap every parser rule in a synthetic block so a whole rule can be matched as one
    /// token; used by tooling which steps over rules.
    pub generate_rule_bypass: bool,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self {
            verify: true,
            generate_rule_bypass: false,
        }
    }
}

/// Decoder for the serialized network. Decoding the same stream twice yields equal networks.
pub struct AtnDeserializer {
    options: DeserializeOptions,
}

struct StreamReader<'d> {
    data: &'d [u16],
    pos: usize,
}

impl<'d> StreamReader<'d> {
    fn new(data: &'d [u16]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Result<u16, DeserializeError> {
        match self.data.get(self.pos) {
            Some(raw) => {
                self.pos += 1;
                Ok(raw.wrapping_sub(2))
            }
            None => Err(DeserializeError::Corrupted(format!(
                "Serialized stream ended early at position {}.",
                self.pos
            ))),
        }
    }

    fn next_usize(&mut self) -> Result<usize, DeserializeError> {
        Ok(self.next()? as usize)
    }

    /// Read a state or rule index where the all-ones word marks "no value".
    fn next_index(&mut self) -> Result<usize, DeserializeError> {
        let value = self.next()?;
        Ok(if value == 0xFFFF {
            INVALID_STATE
        } else {
            value as usize
        })
    }
}

impl Default for AtnDeserializer {
    fn default() -> Self {
        Self::new(DeserializeOptions::default())
    }
}

impl AtnDeserializer {
    pub fn new(options: DeserializeOptions) -> Self {
        Self { options }
    }

    /// Decode `data` into an immutable network.
    pub fn deserialize(&self, data: &[u16]) -> Result<Atn, DeserializeError> {
        let mut reader = StreamReader::new(data);

        let version = reader.next()?;
        if version != SERIALIZED_VERSION {
            return Err(DeserializeError::UnsupportedVersion {
                found: version,
                expected: SERIALIZED_VERSION,
            });
        }

        let mut uuid_words = [0u16; 8];
        for word in uuid_words.iter_mut() {
            *word = reader.next()?;
        }
        let uuid = Uuid::from_words(uuid_words);
        if !SUPPORTED_UUIDS.contains(&uuid) {
            return Err(DeserializeError::UnsupportedUuid { found: uuid });
        }
        let supports_precedence = is_feature_supported(ADDED_PRECEDENCE_TRANSITIONS_UUID, uuid);
        let supports_lexer_actions = is_feature_supported(ADDED_LEXER_ACTIONS_UUID, uuid);

        let grammar_kind = match reader.next()? {
            0 => GrammarKind::Lexer,
            1 => GrammarKind::Parser,
            other => {
                return Err(DeserializeError::Corrupted(format!(
                    "Unknown grammar type {}.",
                    other
                )))
            }
        };
        let max_token_type = reader.next()? as i32;
        let mut atn = Atn::new(grammar_kind, max_token_type);

        self.read_states(&mut reader, &mut atn)?;
        self.read_non_greedy_markers(&mut reader, &mut atn)?;
        if supports_precedence {
            self.read_precedence_markers(&mut reader, &mut atn)?;
        }
        self.read_rules(&mut reader, &mut atn, supports_lexer_actions)?;
        self.read_modes(&mut reader, &mut atn)?;
        let sets = self.read_sets(&mut reader)?;
        self.read_edges(&mut reader, &mut atn, &sets)?;
        derive_rule_stop_returns(&mut atn)?;
        resolve_block_links(&mut atn)?;
        self.read_decisions(&mut reader, &mut atn)?;
        if atn.grammar_kind == GrammarKind::Lexer {
            if supports_lexer_actions {
                self.read_lexer_actions(&mut reader, &mut atn)?;
            } else {
                synthesize_legacy_lexer_actions(&mut atn);
            }
        }

        mark_precedence_decisions(&mut atn);
        if self.options.verify {
            verify(&atn)?;
        }
        if self.options.generate_rule_bypass && atn.grammar_kind == GrammarKind::Parser {
            atn.rule_to_token_type = (0..atn.number_of_rules())
                .map(|rule| atn.max_token_type + rule as i32 + 1)
                .collect();
            for rule in 0..atn.number_of_rules() {
                generate_rule_bypass(&mut atn, rule)?;
            }
            if self.options.verify {
                verify(&atn)?;
            }
        }

        Ok(atn)
    }

    fn read_states(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n_states = reader.next_usize()?;
        let mut loop_end_links = Vec::new();
        let mut block_start_links = Vec::new();
        for _ in 0..n_states {
            let kind_code = reader.next()?;
            if kind_code == 0 {
                // Placeholder for a state removed by the offline compiler; keeps numbering.
                atn.add_state(INVALID_STATE, AtnStateKind::Invalid);
                continue;
            }
            let rule = reader.next_index()?;
            let kind = match kind_code {
                1 => AtnStateKind::Basic,
                2 => AtnStateKind::RuleStart {
                    stop_state: INVALID_STATE,
                    left_recursive: false,
                },
                3 => AtnStateKind::BlockStart {
                    end_state: INVALID_STATE,
                },
                4 => AtnStateKind::PlusBlockStart {
                    end_state: INVALID_STATE,
                    loopback: INVALID_STATE,
                },
                5 => AtnStateKind::StarBlockStart {
                    end_state: INVALID_STATE,
                },
                6 => AtnStateKind::TokensStart,
                7 => AtnStateKind::RuleStop,
                8 => AtnStateKind::BlockEnd {
                    start_state: INVALID_STATE,
                },
                9 => AtnStateKind::StarLoopback,
                10 => AtnStateKind::StarLoopEntry {
                    loopback: INVALID_STATE,
                    precedence_decision: false,
                },
                11 => AtnStateKind::PlusLoopback,
                12 => AtnStateKind::LoopEnd {
                    loopback: INVALID_STATE,
                },
                other => {
                    return Err(DeserializeError::Corrupted(format!(
                        "Unknown state type {}.",
                        other
                    )))
                }
            };
            let number = atn.add_state(rule, kind);
            match atn.state(number).kind {
                AtnStateKind::LoopEnd { .. } => {
                    loop_end_links.push((number, reader.next_usize()?));
                }
                AtnStateKind::BlockStart { .. }
                | AtnStateKind::PlusBlockStart { .. }
                | AtnStateKind::StarBlockStart { .. } => {
                    block_start_links.push((number, reader.next_usize()?));
                }
                _ => {}
            }
        }

        for (number, loopback) in loop_end_links {
            match &mut atn.state_mut(number).kind {
                AtnStateKind::LoopEnd { loopback: slot } => *slot = loopback,
                _ => unreachable!(),
            }
        }
        for (number, end_state) in block_start_links {
            match &mut atn.state_mut(number).kind {
                AtnStateKind::BlockStart { end_state: slot }
                | AtnStateKind::PlusBlockStart {
                    end_state: slot, ..
                }
                | AtnStateKind::StarBlockStart { end_state: slot } => *slot = end_state,
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn read_non_greedy_markers(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n = reader.next_usize()?;
        for _ in 0..n {
            let state = reader.next_usize()?;
            atn.state_mut(state).non_greedy = true;
        }
        Ok(())
    }

    fn read_precedence_markers(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n = reader.next_usize()?;
        for _ in 0..n {
            let state = reader.next_usize()?;
            match &mut atn.state_mut(state).kind {
                AtnStateKind::RuleStart { left_recursive, .. } => *left_recursive = true,
                _ => {
                    return Err(DeserializeError::Corrupted(format!(
                        "Precedence marker on non rule start state {}.",
                        state
                    )))
                }
            }
        }
        Ok(())
    }

    fn read_rules(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
        supports_lexer_actions: bool,
    ) -> Result<(), DeserializeError> {
        let n_rules = reader.next_usize()?;
        for _ in 0..n_rules {
            let start_state = reader.next_usize()?;
            atn.rule_to_start_state.push(start_state);
            if atn.grammar_kind == GrammarKind::Lexer {
                let token_type = reader.next()?;
                atn.rule_to_token_type.push(if token_type == 0xFFFF {
                    TOKEN_EOF
                } else {
                    token_type as i32
                });
                if !supports_lexer_actions {
                    // The base format stored a per-rule action index here; the actions
                    // themselves are recovered from the action transitions below.
                    reader.next()?;
                }
            }
        }

        atn.rule_to_stop_state = vec![INVALID_STATE; n_rules];
        for number in 0..atn.number_of_states() {
            let (rule, is_stop) = {
                let state = atn.state(number);
                (state.rule, state.is_rule_stop())
            };
            if !is_stop {
                continue;
            }
            if rule >= n_rules {
                return Err(DeserializeError::Corrupted(format!(
                    "Rule stop state {} has no rule.",
                    number
                )));
            }
            atn.rule_to_stop_state[rule] = number;
            let start = atn.rule_to_start_state[rule];
            match &mut atn.state_mut(start).kind {
                AtnStateKind::RuleStart { stop_state, .. } => *stop_state = number,
                _ => {
                    return Err(DeserializeError::Corrupted(format!(
                        "Rule {} does not start with a rule start state.",
                        rule
                    )))
                }
            }
        }
        Ok(())
    }

    fn read_modes(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n_modes = reader.next_usize()?;
        for _ in 0..n_modes {
            let state = reader.next_usize()?;
            atn.mode_to_start_state.push(state);
        }
        Ok(())
    }

    fn read_sets(
        &self,
        reader: &mut StreamReader,
    ) -> Result<Vec<Rc<IntervalSet>>, DeserializeError> {
        let n_sets = reader.next_usize()?;
        let mut sets = Vec::with_capacity(n_sets);
        for _ in 0..n_sets {
            let n_intervals = reader.next_usize()?;
            let contains_eof = reader.next()? != 0;
            let mut set = IntervalSet::new();
            if contains_eof {
                set.add(TOKEN_EOF);
            }
            for _ in 0..n_intervals {
                let a = reader.next()? as i32;
                let b = reader.next()? as i32;
                set.add_range(a, b);
            }
            set.set_readonly();
            sets.push(Rc::new(set));
        }
        Ok(sets)
    }

    fn read_edges(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
        sets: &[Rc<IntervalSet>],
    ) -> Result<(), DeserializeError> {
        let n_edges = reader.next_usize()?;
        for _ in 0..n_edges {
            let src = reader.next_usize()?;
            let trg = reader.next_usize()?;
            let edge_kind = reader.next()?;
            let arg1 = reader.next()?;
            let arg2 = reader.next()?;
            let arg3 = reader.next()?;
            let transition = edge_factory(edge_kind, trg, arg1, arg2, arg3, sets)?;
            if src >= atn.number_of_states() {
                return Err(DeserializeError::Corrupted(format!(
                    "Edge source state {} does not exist.",
                    src
                )));
            }
            atn.state_mut(src).add_transition(transition);
        }
        Ok(())
    }

    fn read_decisions(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n_decisions = reader.next_usize()?;
        for _ in 0..n_decisions {
            let state = reader.next_usize()?;
            atn.define_decision_state(state);
        }
        Ok(())
    }

    fn read_lexer_actions(
        &self,
        reader: &mut StreamReader,
        atn: &mut Atn,
    ) -> Result<(), DeserializeError> {
        let n_actions = reader.next_usize()?;
        for _ in 0..n_actions {
            let action_kind = reader.next()?;
            let data1 = reader.next_index()?;
            let data2 = reader.next_index()?;
            let action = match action_kind {
                0 => LexerAction::Channel(data1),
                1 => LexerAction::Custom {
                    rule: data1,
                    action_index: data2,
                },
                2 => LexerAction::Mode(data1),
                3 => LexerAction::More,
                4 => LexerAction::PopMode,
                5 => LexerAction::PushMode(data1),
                6 => LexerAction::Skip,
                7 => LexerAction::Type(data1 as i32),
                other => {
                    return Err(DeserializeError::Corrupted(format!(
                        "Unknown lexer action type {}.",
                        other
                    )))
                }
            };
            atn.lexer_actions.push(action);
        }
        Ok(())
    }
}

fn is_feature_supported(feature: Uuid, actual: Uuid) -> bool {
    let feature_index = SUPPORTED_UUIDS.iter().position(|u| *u == feature);
    let actual_index = SUPPORTED_UUIDS.iter().position(|u| *u == actual);
    match (feature_index, actual_index) {
        (Some(f), Some(a)) => a >= f,
        _ => false,
    }
}

fn edge_factory(
    edge_kind: u16,
    trg: usize,
    arg1: u16,
    arg2: u16,
    arg3: u16,
    sets: &[Rc<IntervalSet>],
) -> Result<Transition, DeserializeError> {
    let set_at = |index: u16| -> Result<Rc<IntervalSet>, DeserializeError> {
        sets.get(index as usize).cloned().ok_or_else(|| {
            DeserializeError::Corrupted(format!("Edge references missing set {}.", index))
        })
    };
    Ok(match edge_kind {
        1 => Transition::Epsilon {
            target: trg,
            outermost_precedence_return: None,
        },
        2 => {
            if arg3 != 0 {
                Transition::Range {
                    target: trg,
                    from: TOKEN_EOF,
                    to: arg2 as i32,
                }
            } else {
                Transition::Range {
                    target: trg,
                    from: arg1 as i32,
                    to: arg2 as i32,
                }
            }
        }
        3 => Transition::Rule {
            target: arg1 as usize,
            rule: arg2 as usize,
            precedence: arg3 as i32,
            follow_state: trg,
        },
        4 => Transition::Predicate {
            target: trg,
            rule: arg1 as usize,
            pred_index: arg2 as usize,
            ctx_dependent: arg3 != 0,
        },
        5 => {
            if arg3 != 0 {
                Transition::Atom {
                    target: trg,
                    label: TOKEN_EOF,
                }
            } else {
                Transition::Atom {
                    target: trg,
                    label: arg1 as i32,
                }
            }
        }
        6 => Transition::Action {
            target: trg,
            rule: arg1 as usize,
            action_index: arg2 as usize,
            ctx_dependent: arg3 != 0,
        },
        7 => Transition::Set {
            target: trg,
            set: set_at(arg1)?,
        },
        8 => Transition::NotSet {
            target: trg,
            set: set_at(arg1)?,
        },
        9 => Transition::Wildcard { target: trg },
        10 => Transition::Precedence {
            target: trg,
            precedence: arg1 as i32,
        },
        other => {
            return Err(DeserializeError::Corrupted(format!(
                "Unknown transition type {}.",
                other
            )))
        }
    })
}

/// Give every rule stop state the epsilon return edges derived from the rule invocations.
fn derive_rule_stop_returns(atn: &mut Atn) -> Result<(), DeserializeError> {
    let mut returns = Vec::new();
    for number in 0..atn.number_of_states() {
        for transition in atn.state(number).transitions() {
            if let Transition::Rule {
                target,
                precedence,
                follow_state,
                ..
            } = transition
            {
                let invoked_rule = atn.state(*target).rule;
                if invoked_rule >= atn.rule_to_stop_state.len() {
                    return Err(DeserializeError::Corrupted(format!(
                        "Rule transition into unknown rule {}.",
                        invoked_rule
                    )));
                }
                let outermost_precedence_return = match atn
                    .state(atn.rule_to_start_state[invoked_rule])
                    .kind
                {
                    AtnStateKind::RuleStart {
                        left_recursive: true,
                        ..
                    } if *precedence == 0 => Some(invoked_rule),
                    _ => None,
                };
                returns.push((
                    atn.rule_to_stop_state[invoked_rule],
                    Transition::Epsilon {
                        target: *follow_state,
                        outermost_precedence_return,
                    },
                ));
            }
        }
    }
    for (stop_state, transition) in returns {
        atn.state_mut(stop_state).add_transition(transition);
    }
    Ok(())
}

/// Resolve the backward links block ends and loopback states carry.
fn resolve_block_links(atn: &mut Atn) -> Result<(), DeserializeError> {
    for number in 0..atn.number_of_states() {
        let end_state = match atn.state(number).kind {
            AtnStateKind::BlockStart { end_state }
            | AtnStateKind::PlusBlockStart { end_state, .. }
            | AtnStateKind::StarBlockStart { end_state } => end_state,
            _ => continue,
        };
        if end_state == INVALID_STATE || end_state >= atn.number_of_states() {
            return Err(DeserializeError::Corrupted(format!(
                "Block start state {} has no end state.",
                number
            )));
        }
        match &mut atn.state_mut(end_state).kind {
            AtnStateKind::BlockEnd { start_state } if *start_state == INVALID_STATE => {
                *start_state = number;
            }
            AtnStateKind::BlockEnd { .. } => {
                return Err(DeserializeError::Corrupted(format!(
                    "Block end state {} is linked from two block starts.",
                    end_state
                )));
            }
            _ => {
                return Err(DeserializeError::Corrupted(format!(
                    "Block start state {} does not end at a block end state.",
                    number
                )));
            }
        }
    }

    for number in 0..atn.number_of_states() {
        match atn.state(number).kind {
            AtnStateKind::PlusLoopback => {
                for i in 0..atn.state(number).number_of_transitions() {
                    let target = atn.state(number).transition(i).target();
                    if let AtnStateKind::PlusBlockStart { loopback, .. } =
                        &mut atn.state_mut(target).kind
                    {
                        *loopback = number;
                    }
                }
            }
            AtnStateKind::StarLoopback => {
                for i in 0..atn.state(number).number_of_transitions() {
                    let target = atn.state(number).transition(i).target();
                    if let AtnStateKind::StarLoopEntry { loopback, .. } =
                        &mut atn.state_mut(target).kind
                    {
                        *loopback = number;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Replace the per-rule action indices of the base format with a synthesized action table.
///
/// Every action transition is re-pointed at a fresh `Custom` action holding its original
/// rule-relative index; the transition keeps its context-dependence flag.
fn synthesize_legacy_lexer_actions(atn: &mut Atn) {
    let mut legacy_actions = Vec::new();
    for number in 0..atn.number_of_states() {
        for i in 0..atn.state(number).number_of_transitions() {
            let (target, rule, action_index, ctx_dependent) =
                match *atn.state(number).transition(i) {
                    Transition::Action {
                        target,
                        rule,
                        action_index,
                        ctx_dependent,
                    } => (target, rule, action_index, ctx_dependent),
                    _ => continue,
                };
            let new_index = legacy_actions.len();
            legacy_actions.push(LexerAction::Custom { rule, action_index });
            atn.state_mut(number).set_transition(
                i,
                Transition::Action {
                    target,
                    rule,
                    action_index: new_index,
                    ctx_dependent,
                },
            );
        }
    }
    atn.lexer_actions = legacy_actions;
}

/// Mark the star loop entries which decide whether to extend a precedence rule.
fn mark_precedence_decisions(atn: &mut Atn) {
    let mut precedence_states = Vec::new();
    for number in 0..atn.number_of_states() {
        let state = atn.state(number);
        if !matches!(state.kind, AtnStateKind::StarLoopEntry { .. }) {
            continue;
        }
        let rule_start = atn.rule_to_start_state[state.rule];
        if !matches!(
            atn.state(rule_start).kind,
            AtnStateKind::RuleStart {
                left_recursive: true,
                ..
            }
        ) {
            continue;
        }
        let last = state.transition(state.number_of_transitions() - 1).target();
        let maybe_loop_end = atn.state(last);
        if !matches!(maybe_loop_end.kind, AtnStateKind::LoopEnd { .. }) {
            continue;
        }
        if maybe_loop_end.only_has_epsilon_transitions()
            && atn
                .state(maybe_loop_end.transition(0).target())
                .is_rule_stop()
        {
            precedence_states.push(number);
        }
    }
    for number in precedence_states {
        if let AtnStateKind::StarLoopEntry {
            precedence_decision,
            ..
        } = &mut atn.state_mut(number).kind
        {
            *precedence_decision = true;
        }
    }
}

fn check(condition: bool, state: usize, message: &str) -> Result<(), DeserializeError> {
    if condition {
        Ok(())
    } else {
        Err(DeserializeError::Corrupted(format!(
            "State {}: {}",
            state, message
        )))
    }
}

/// Structural invariants of a decoded network.
fn verify(atn: &Atn) -> Result<(), DeserializeError> {
    for number in 0..atn.number_of_states() {
        let state = atn.state(number);
        match state.kind {
            AtnStateKind::Invalid => continue,
            _ => {}
        }
        check(
            state.only_has_epsilon_transitions() || state.number_of_transitions() <= 1,
            number,
            "a state consuming input can have at most one transition",
        )?;
        match state.kind {
            AtnStateKind::PlusBlockStart { loopback, .. } => {
                check(
                    loopback != INVALID_STATE,
                    number,
                    "plus block start without loopback",
                )?;
            }
            AtnStateKind::StarLoopEntry { loopback, .. } => {
                check(
                    loopback != INVALID_STATE,
                    number,
                    "star loop entry without loopback",
                )?;
                check(
                    state.number_of_transitions() == 2,
                    number,
                    "star loop entry must choose between block and exit",
                )?;
                let first = atn.state(state.transition(0).target());
                let second = atn.state(state.transition(1).target());
                match (&first.kind, &second.kind) {
                    (AtnStateKind::StarBlockStart { .. }, AtnStateKind::LoopEnd { .. }) => {
                        check(!state.non_greedy, number, "greedy loop entry exits last")?;
                    }
                    (AtnStateKind::LoopEnd { .. }, AtnStateKind::StarBlockStart { .. }) => {
                        check(state.non_greedy, number, "non-greedy loop entry exits first")?;
                    }
                    _ => {
                        return Err(DeserializeError::Corrupted(format!(
                            "State {}: star loop entry targets are malformed.",
                            number
                        )))
                    }
                }
            }
            AtnStateKind::StarLoopback => {
                check(
                    state.number_of_transitions() == 1,
                    number,
                    "star loopback has exactly one transition",
                )?;
                check(
                    matches!(
                        atn.state(state.transition(0).target()).kind,
                        AtnStateKind::StarLoopEntry { .. }
                    ),
                    number,
                    "star loopback returns to the loop entry",
                )?;
            }
            AtnStateKind::LoopEnd { loopback } => {
                check(
                    loopback != INVALID_STATE,
                    number,
                    "loop end without loopback",
                )?;
            }
            AtnStateKind::RuleStart { stop_state, .. } => {
                check(
                    stop_state != INVALID_STATE,
                    number,
                    "rule start without stop state",
                )?;
            }
            AtnStateKind::BlockStart { end_state }
            | AtnStateKind::PlusBlockStart { end_state, .. }
            | AtnStateKind::StarBlockStart { end_state } => {
                check(
                    end_state != INVALID_STATE,
                    number,
                    "block start without end state",
                )?;
            }
            AtnStateKind::BlockEnd { start_state } => {
                check(
                    start_state != INVALID_STATE,
                    number,
                    "block end without start state",
                )?;
            }
            _ => {}
        }
        if state.is_decision_state() {
            check(
                state.number_of_transitions() <= 1 || state.decision.is_some(),
                number,
                "decision state with several transitions needs a decision number",
            )?;
        } else {
            check(
                state.number_of_transitions() <= 1 || state.is_rule_stop(),
                number,
                "only decision and rule stop states branch",
            )?;
        }
    }
    Ok(())
}

/// Wrap rule `rule` in a synthetic block matched by a dedicated token type.
fn generate_rule_bypass(atn: &mut Atn, rule: usize) -> Result<(), DeserializeError> {
    let bypass_start = atn.add_state(
        rule,
        AtnStateKind::BlockStart {
            end_state: INVALID_STATE,
        },
    );
    let bypass_stop = atn.add_state(
        rule,
        AtnStateKind::BlockEnd {
            start_state: INVALID_STATE,
        },
    );
    if let AtnStateKind::BlockStart { end_state } = &mut atn.state_mut(bypass_start).kind {
        *end_state = bypass_stop;
    }
    atn.define_decision_state(bypass_start);
    if let AtnStateKind::BlockEnd { start_state } = &mut atn.state_mut(bypass_stop).kind {
        *start_state = bypass_start;
    }

    let rule_start = atn.rule_to_start_state[rule];
    let left_recursive = matches!(
        atn.state(rule_start).kind,
        AtnStateKind::RuleStart {
            left_recursive: true,
            ..
        }
    );

    // For a precedence rule the bypass covers the prefix section only; the loopback edge
    // that re-enters the recursion suffix keeps its target.
    let (end_state, exclude_edge) = if left_recursive {
        let mut entry = None;
        for number in 0..atn.number_of_states() {
            let state = atn.state(number);
            if state.rule != rule
                || !matches!(state.kind, AtnStateKind::StarLoopEntry { .. })
            {
                continue;
            }
            let last = state.transition(state.number_of_transitions() - 1).target();
            let maybe_loop_end = atn.state(last);
            if !matches!(maybe_loop_end.kind, AtnStateKind::LoopEnd { .. }) {
                continue;
            }
            if maybe_loop_end.only_has_epsilon_transitions()
                && atn
                    .state(maybe_loop_end.transition(0).target())
                    .is_rule_stop()
            {
                entry = Some(number);
                break;
            }
        }
        let entry = entry.ok_or_else(|| {
            DeserializeError::Corrupted(format!(
                "Could not identify the final state of the precedence rule {} prefix section.",
                rule
            ))
        })?;
        let loopback = match atn.state(entry).kind {
            AtnStateKind::StarLoopEntry { loopback, .. } => loopback,
            _ => unreachable!(),
        };
        (entry, Some((loopback, 0)))
    } else {
        (atn.rule_to_stop_state[rule], None)
    };

    // Re-point every transition that targeted the rule's end at the bypass block end.
    for number in 0..atn.number_of_states() {
        for i in 0..atn.state(number).number_of_transitions() {
            if exclude_edge == Some((number, i)) {
                continue;
            }
            if atn.state(number).transition(i).target() == end_state {
                let mut transition = atn.state(number).transition(i).clone();
                transition.set_target(bypass_stop);
                atn.state_mut(number).set_transition(i, transition);
            }
        }
    }

    while atn.state(rule_start).number_of_transitions() > 0 {
        let transition = atn.state_mut(rule_start).pop_transition();
        atn.state_mut(bypass_start).add_transition(transition);
    }
    atn.state_mut(rule_start).add_transition(Transition::Epsilon {
        target: bypass_start,
        outermost_precedence_return: None,
    });
    atn.state_mut(bypass_stop).add_transition(Transition::Epsilon {
        target: end_state,
        outermost_precedence_return: None,
    });

    let match_state = atn.add_state(rule, AtnStateKind::Basic);
    let label = atn.rule_to_token_type[rule];
    atn.state_mut(match_state).add_transition(Transition::Atom {
        target: bypass_stop,
        label,
    });
    atn.state_mut(bypass_start).add_transition(Transition::Epsilon {
        target: match_state,
        outermost_precedence_return: None,
    });
    Ok(())
}
