use crate::network::{
    AtnDeserializer, AtnStateKind, DeserializeOptions, GrammarKind, LexerAction, Transition,
    Uuid, ADDED_PRECEDENCE_TRANSITIONS_UUID,
};
use crate::samples::{
    self, AtnStream, GRAMMAR_PARSER, ST_BASIC, ST_RULE_START, ST_RULE_STOP, TR_ACTION,
    TR_EPSILON,
};
use crate::{RuleContext, TOKEN_EOF, TOKEN_EPSILON};

fn minimal_parser_stream() -> AtnStream {
    let mut s = AtnStream::parser(5);
    let rule_start = s.state(ST_RULE_START, 0);
    let rule_stop = s.state(ST_RULE_STOP, 0);
    s.epsilon(rule_start, rule_stop);
    s.rules.push(vec![rule_start]);
    s
}

#[test]
fn deserializes_a_minimal_rule() {
    let data = minimal_parser_stream().serialize();
    let atn = AtnDeserializer::default().deserialize(&data).unwrap();

    assert_eq!(atn.grammar_kind, GrammarKind::Parser);
    assert_eq!(atn.max_token_type, 5);
    assert_eq!(atn.number_of_states(), 2);
    assert_eq!(atn.rule_to_start_state, vec![0]);
    assert_eq!(atn.rule_to_stop_state, vec![1]);
    assert_eq!(
        atn.state(0).kind,
        AtnStateKind::RuleStart {
            stop_state: 1,
            left_recursive: false
        }
    );
    assert!(atn.state(1).is_rule_stop());
    assert_eq!(atn.state(0).number_of_transitions(), 1);
    assert_eq!(atn.state(0).transition(0).target(), 1);
}

#[test]
fn deserialization_is_idempotent_on_its_input() {
    let data = samples::two_alts_parser();
    let deserializer = AtnDeserializer::default();
    let first = deserializer.deserialize(&data).unwrap();
    let second = deserializer.deserialize(&data).unwrap();

    assert_eq!(first.number_of_states(), second.number_of_states());
    for number in 0..first.number_of_states() {
        assert_eq!(first.state(number).kind, second.state(number).kind);
        assert_eq!(
            first.state(number).transitions(),
            second.state(number).transitions()
        );
    }
    assert_eq!(first.decision_to_state, second.decision_to_state);
}

#[test]
fn rejects_unknown_version() {
    let mut data = minimal_parser_stream().serialize();
    data[0] = 9 + 2;
    let err = AtnDeserializer::default().deserialize(&data).unwrap_err();
    assert!(err.is_unsupported_version());
}

#[test]
fn rejects_unknown_uuid() {
    let mut stream = minimal_parser_stream();
    stream.uuid = Uuid::from_words([1, 2, 3, 4, 5, 6, 7, 8]);
    let err = AtnDeserializer::default()
        .deserialize(&stream.serialize())
        .unwrap_err();
    assert!(err.is_unsupported_uuid());
}

#[test]
fn rejects_truncated_stream() {
    let data = minimal_parser_stream().serialize();
    let err = AtnDeserializer::default()
        .deserialize(&data[..data.len() - 3])
        .unwrap_err();
    assert!(err.is_corrupted());
}

#[test]
fn verification_rejects_branching_non_decision_state() {
    let mut s = AtnStream::parser(2);
    let rule_start = s.state(ST_RULE_START, 0);
    let rule_stop = s.state(ST_RULE_STOP, 0);
    let branching = s.state(ST_BASIC, 0);
    s.epsilon(rule_start, branching);
    // Two consuming transitions out of a plain state; only decision states may branch.
    s.atom(branching, rule_stop, 1);
    s.atom(branching, rule_stop, 2);
    s.rules.push(vec![rule_start]);

    let err = AtnDeserializer::default()
        .deserialize(&s.serialize())
        .unwrap_err();
    assert!(err.is_corrupted());
}

#[test]
fn verification_can_be_disabled() {
    let mut s = AtnStream::parser(2);
    let rule_start = s.state(ST_RULE_START, 0);
    let rule_stop = s.state(ST_RULE_STOP, 0);
    let branching = s.state(ST_BASIC, 0);
    s.epsilon(rule_start, branching);
    s.atom(branching, rule_stop, 1);
    s.atom(branching, rule_stop, 2);
    s.rules.push(vec![rule_start]);

    let options = DeserializeOptions {
        verify: false,
        generate_rule_bypass: false,
    };
    assert!(AtnDeserializer::new(options)
        .deserialize(&s.serialize())
        .is_ok());
}

#[test]
fn invalid_state_placeholders_keep_numbering() {
    let mut s = AtnStream::parser(1);
    let rule_start = s.state(ST_RULE_START, 0);
    s.states.push(vec![0]); // removed state, number 1
    let rule_stop = s.state(ST_RULE_STOP, 0);
    s.epsilon(rule_start, rule_stop);
    s.rules.push(vec![rule_start]);

    let atn = AtnDeserializer::default().deserialize(&s.serialize()).unwrap();
    assert_eq!(atn.number_of_states(), 3);
    assert_eq!(atn.state(1).kind, AtnStateKind::Invalid);
    assert_eq!(atn.rule_to_stop_state, vec![2]);
}

#[test]
fn rule_invocations_derive_return_transitions() {
    // r0 invokes r1; r1's stop state must grow an epsilon edge back to the follow state.
    let mut s = AtnStream::parser(1);
    let r0_start = s.state(ST_RULE_START, 0); // 0
    let r0_stop = s.state(ST_RULE_STOP, 0); // 1
    let caller = s.state(ST_BASIC, 0); // 2
    let follow = s.state(ST_BASIC, 0); // 3
    let r1_start = s.state(ST_RULE_START, 1); // 4
    let r1_stop = s.state(ST_RULE_STOP, 1); // 5
    let r1_body = s.state(ST_BASIC, 1); // 6

    s.epsilon(r0_start, caller);
    s.rule_call(caller, r1_start, 1, 0, follow);
    s.epsilon(follow, r0_stop);
    s.epsilon(r1_start, r1_body);
    s.atom(r1_body, r1_stop, 1);
    s.rules.push(vec![r0_start]);
    s.rules.push(vec![r1_start]);

    let atn = AtnDeserializer::default().deserialize(&s.serialize()).unwrap();
    assert_eq!(atn.state(5).number_of_transitions(), 1);
    match atn.state(5).transition(0) {
        Transition::Epsilon {
            target,
            outermost_precedence_return,
        } => {
            assert_eq!(*target, 3);
            assert_eq!(*outermost_precedence_return, None);
        }
        other => panic!("Expected a derived epsilon return, found {:?}", other),
    }
}

#[test]
fn precedence_rule_marks_loop_entry_decision() {
    let data = samples::left_recursive_expr_parser();
    let atn = AtnDeserializer::default().deserialize(&data).unwrap();

    assert!(matches!(
        atn.state(0).kind,
        AtnStateKind::RuleStart {
            left_recursive: true,
            ..
        }
    ));
    assert!(atn.state(3).is_precedence_decision());
    // Only the outermost (precedence 0) invocation from the start rule marks its return
    // edge; the in-rule invocations use a non-zero precedence.
    let marked_returns: Vec<_> = atn
        .state(1)
        .transitions()
        .iter()
        .filter_map(|t| match t {
            Transition::Epsilon {
                outermost_precedence_return: Some(rule),
                ..
            } => Some(*rule),
            _ => None,
        })
        .collect();
    assert_eq!(marked_returns, vec![0]);
}

#[test]
fn legacy_format_synthesizes_custom_actions() {
    let mut s = AtnStream::lexer(1);
    s.uuid = ADDED_PRECEDENCE_TRANSITIONS_UUID;
    let tokens_start = s.state(samples::ST_TOKENS_START, 0xFFFF); // 0
    let rule_start = s.state(ST_RULE_START, 0); // 1
    let rule_stop = s.state(ST_RULE_STOP, 0); // 2
    let body = s.state(ST_BASIC, 0); // 3
    let action_state = s.state(ST_BASIC, 0); // 4

    s.epsilon(tokens_start, rule_start);
    s.epsilon(rule_start, body);
    s.atom(body, action_state, 1);
    // Rule-relative action index 7, context dependent.
    s.edge(action_state, rule_stop, TR_ACTION, 0, 7, 1);
    s.rules.push(vec![rule_start, 1, 7]); // legacy per-rule action index word
    s.modes.push(tokens_start);

    let atn = AtnDeserializer::default().deserialize(&s.serialize()).unwrap();
    assert_eq!(
        atn.lexer_actions,
        vec![LexerAction::Custom {
            rule: 0,
            action_index: 7
        }]
    );
    assert!(atn.lexer_actions[0].is_position_dependent());
    match atn.state(4).transition(0) {
        Transition::Action {
            action_index,
            ctx_dependent,
            ..
        } => {
            // Re-pointed at the synthesized table; the flag survives the rewrite.
            assert_eq!(*action_index, 0);
            assert!(*ctx_dependent);
        }
        other => panic!("Expected an action transition, found {:?}", other),
    }
}

#[test]
fn bypass_generation_adds_token_per_rule() {
    let options = DeserializeOptions {
        verify: true,
        generate_rule_bypass: true,
    };
    let atn = AtnDeserializer::new(options)
        .deserialize(&samples::two_alts_parser())
        .unwrap();

    assert_eq!(atn.rule_to_token_type, vec![3]); // max token type 2 + rule 0 + 1
    let bypass_labels: Vec<i32> = (0..atn.number_of_states())
        .flat_map(|n| atn.state(n).transitions())
        .filter_map(|t| match t {
            Transition::Atom { label, .. } => Some(*label),
            _ => None,
        })
        .filter(|label| *label == 3)
        .collect();
    assert_eq!(bypass_labels, vec![3]);

    // The rule start now funnels through the synthetic block.
    assert_eq!(atn.state(0).number_of_transitions(), 1);
    let bypass_start = atn.state(0).transition(0).target();
    assert!(atn.state(bypass_start).is_decision_state());
    assert!(atn.state(bypass_start).decision.is_some());
}

#[test]
fn next_tokens_within_rule_is_cached_readonly() {
    let atn = AtnDeserializer::default()
        .deserialize(&samples::two_alts_parser())
        .unwrap();

    let at_decision = atn.next_tokens(2);
    assert!(at_decision.contains(samples::TOKEN_X));
    assert!(at_decision.contains(samples::TOKEN_Y));
    assert!(at_decision.is_readonly());
    assert!(std::ptr::eq(at_decision, atn.next_tokens(2)));

    // At the rule end the rule may complete, reported as epsilon.
    let at_stop = atn.next_tokens(1);
    assert!(at_stop.contains(TOKEN_EPSILON));
}

#[test]
fn expected_tokens_follows_the_invocation_chain() {
    let atn = AtnDeserializer::default()
        .deserialize(&samples::two_alts_parser())
        .unwrap();

    let expected = atn.expected_tokens(2, &RuleContext::empty());
    assert!(expected.contains(samples::TOKEN_X));
    assert!(expected.contains(samples::TOKEN_Y));
    assert!(!expected.contains(TOKEN_EPSILON));

    // At the rule end with no surrounding invocation only end-of-input remains.
    let at_stop = atn.expected_tokens(1, &RuleContext::empty());
    assert!(at_stop.contains(TOKEN_EOF));
}

#[test]
fn next_tokens_with_context_resolves_the_rule_end() {
    let atn = AtnDeserializer::default()
        .deserialize(&samples::two_alts_parser())
        .unwrap();

    // Without a context the block end only reports that the rule may complete; with the
    // outermost context it resolves to end-of-input.
    let context_free = atn.next_tokens_in_context(5, None);
    assert!(context_free.contains(TOKEN_EPSILON));

    let outermost = atn.next_tokens_in_context(5, Some(&RuleContext::empty()));
    assert!(outermost.contains(TOKEN_EOF));
    assert!(!outermost.contains(TOKEN_EPSILON));
}

#[test]
fn lookahead_walks_into_invoked_rules() {
    // r0 : r1 'x' ; r1 : 'y' ; — the first token of r0 comes out of r1.
    let mut s = AtnStream::parser(2);
    let r0_start = s.state(ST_RULE_START, 0); // 0
    let r0_stop = s.state(ST_RULE_STOP, 0); // 1
    let caller = s.state(ST_BASIC, 0); // 2
    let follow = s.state(ST_BASIC, 0); // 3
    let r1_start = s.state(ST_RULE_START, 1); // 4
    let r1_stop = s.state(ST_RULE_STOP, 1); // 5
    let r1_body = s.state(ST_BASIC, 1); // 6

    s.epsilon(r0_start, caller);
    s.rule_call(caller, r1_start, 1, 0, follow);
    s.atom(follow, r0_stop, 1);
    s.epsilon(r1_start, r1_body);
    s.atom(r1_body, r1_stop, 2);
    s.rules.push(vec![r0_start]);
    s.rules.push(vec![r1_start]);

    let atn = AtnDeserializer::default().deserialize(&s.serialize()).unwrap();
    let first = atn.next_tokens(0);
    assert!(first.contains(2)); // 'y' through the invocation
    assert!(!first.contains(1));

    // From r1's end, within the rule alone, only completion is visible.
    let at_invoked_end = atn.next_tokens(5);
    assert!(at_invoked_end.contains(TOKEN_EPSILON));
}

#[test]
fn grammar_kind_word_is_checked() {
    let mut data = minimal_parser_stream().serialize();
    // The grammar kind word sits right after the version and UUID.
    assert_eq!(data[9], GRAMMAR_PARSER + 2);
    data[9] = 7 + 2;
    let err = AtnDeserializer::default().deserialize(&data).unwrap_err();
    assert!(err.is_corrupted());
}

#[test]
fn uuid_displays_canonically() {
    assert_eq!(
        ADDED_PRECEDENCE_TRANSITIONS_UUID.to_string(),
        "1DA0C57D-6C06-438A-9B27-10BCB3CE0F61"
    );
}

#[test]
fn epsilon_only_flag_tracks_appended_transitions() {
    let data = samples::two_alts_parser();
    let atn = AtnDeserializer::default().deserialize(&data).unwrap();
    assert!(atn.state(2).only_has_epsilon_transitions()); // decision block start
    assert!(!atn.state(3).only_has_epsilon_transitions()); // consumes a token

    let atom = atn.state(3).transition(0);
    assert!(!atom.is_epsilon());
    assert!(atom.matches(samples::TOKEN_X, 0, 2));
    assert!(!atom.matches(samples::TOKEN_Y, 0, 2));
    assert_eq!(atom.label().unwrap().single_element(), Some(samples::TOKEN_X));
}

#[test]
fn edge_kind_word_is_checked() {
    let mut s = AtnStream::parser(1);
    let rule_start = s.state(ST_RULE_START, 0);
    let rule_stop = s.state(ST_RULE_STOP, 0);
    s.edge(rule_start, rule_stop, TR_EPSILON + 90, 0, 0, 0);
    s.rules.push(vec![rule_start]);
    let err = AtnDeserializer::default()
        .deserialize(&s.serialize())
        .unwrap_err();
    assert!(err.is_corrupted());
}
