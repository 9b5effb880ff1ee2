use crate::network::LexerAction;
use crate::{ICharStream, ILexer};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

impl LexerAction {
    /// Whether the action observes the input position when it runs.
    pub fn is_position_dependent(&self) -> bool {
        matches!(
            self,
            LexerAction::Custom { .. } | LexerAction::Indexed { .. }
        )
    }

    pub(crate) fn execute(&self, lexer: &mut dyn ILexer) {
        match self {
            LexerAction::Channel(channel) => lexer.set_channel(*channel),
            LexerAction::Custom { rule, action_index } => lexer.action(*rule, *action_index),
            LexerAction::Mode(mode) => lexer.set_mode(*mode),
            LexerAction::More => lexer.more(),
            LexerAction::PopMode => lexer.pop_mode(),
            LexerAction::PushMode(mode) => lexer.push_mode(*mode),
            LexerAction::Skip => lexer.skip(),
            LexerAction::Type(token_type) => lexer.set_token_type(*token_type),
            LexerAction::Indexed { action, .. } => action.execute(lexer),
        }
    }
}

#[derive(Debug, Clone)]
/// The ordered list of actions a lexer accept state executes, with its hash precomputed so
/// configurations carrying the same chain compare cheaply.
pub struct LexerActionExecutor {
    actions: Vec<LexerAction>,
    hash: u64,
}

impl LexerActionExecutor {
    pub fn new(actions: Vec<LexerAction>) -> Self {
        let mut hasher = DefaultHasher::new();
        actions.hash(&mut hasher);
        let hash = hasher.finish();
        Self { actions, hash }
    }

    pub fn actions(&self) -> &[LexerAction] {
        &self.actions
    }

    /// Extend `executor` (possibly absent) with one more action.
    pub fn append(executor: Option<&Rc<Self>>, action: LexerAction) -> Rc<Self> {
        let mut actions = match executor {
            Some(existing) => existing.actions.clone(),
            None => Vec::new(),
        };
        actions.push(action);
        Rc::new(Self::new(actions))
    }

    /// Pin every position-dependent action to `offset` from the token start.
    ///
    /// Called before the match position moves past an action transition, so the automaton
    /// state the chain ends up in stays valid for any token the state accepts.
    pub fn fix_offset_before_match(self: &Rc<Self>, offset: usize) -> Rc<Self> {
        let mut updated: Option<Vec<LexerAction>> = None;
        for (i, action) in self.actions.iter().enumerate() {
            if action.is_position_dependent() && !matches!(action, LexerAction::Indexed { .. }) {
                let actions = updated.get_or_insert_with(|| self.actions.clone());
                actions[i] = LexerAction::Indexed {
                    offset,
                    action: Box::new(action.clone()),
                };
            }
        }
        match updated {
            Some(actions) => Rc::new(Self::new(actions)),
            None => Rc::clone(self),
        }
    }

    /// Run the chain for a token matched over `start_index..input.index()`.
    ///
    /// Indexed actions seek to their recorded offset before executing; the input is left at
    /// the match end afterwards.
    pub fn execute(
        &self,
        lexer: &mut dyn ILexer,
        input: &mut dyn ICharStream,
        start_index: usize,
    ) {
        let stop_index = input.index();
        let mut requires_seek = false;
        for action in &self.actions {
            match action {
                LexerAction::Indexed { offset, action } => {
                    input.seek(start_index + offset);
                    requires_seek = start_index + offset != stop_index;
                    action.execute(lexer);
                }
                action if action.is_position_dependent() => {
                    input.seek(stop_index);
                    requires_seek = false;
                    action.execute(lexer);
                }
                action => action.execute(lexer),
            }
        }
        if requires_seek {
            input.seek(stop_index);
        }
    }
}

impl PartialEq for LexerActionExecutor {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.actions == other.actions
    }
}

impl Eq for LexerActionExecutor {}

impl Hash for LexerActionExecutor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
