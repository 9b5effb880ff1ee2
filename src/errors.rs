//! Error values of the runtime.
//!
//! Deserialization failures are fatal and returned to the caller. A failed prediction is an
//! ordinary result the surrounding error strategy may recover from; it carries the dead-end
//! configurations so a recovery strategy can compute what would have been acceptable.
//! Ambiguity and context sensitivity are not errors at all — they are delivered through the
//! [IErrorListener](crate::IErrorListener) reports while prediction continues.

use crate::config_set::AtnConfigSet;
use crate::network::Uuid;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
/// A fatal failure while decoding a serialized network.
pub enum DeserializeError {
    UnsupportedVersion { found: u16, expected: u16 },
    UnsupportedUuid { found: Uuid },
    Corrupted(String),
}

#[derive(Debug)]
/// The parser simulator could not single out a viable alternative.
pub struct NoViableAlt {
    pub decision: usize,
    pub start_index: usize,
    pub offending_index: usize,
    pub offending_token: i32,
    pub dead_end_configs: AtnConfigSet,
}

#[derive(Debug)]
/// The lexer simulator could not extend nor accept a token at the current position.
pub struct LexerNoViableAlt {
    pub start_index: usize,
    pub offending_char: i32,
    pub dead_end_configs: AtnConfigSet,
}

impl DeserializeError {
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, DeserializeError::UnsupportedVersion { .. })
    }

    pub fn is_unsupported_uuid(&self) -> bool {
        matches!(self, DeserializeError::UnsupportedUuid { .. })
    }

    pub fn is_corrupted(&self) -> bool {
        matches!(self, DeserializeError::Corrupted(_))
    }
}

impl Display for DeserializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeserializeError::UnsupportedVersion { found, expected } => write!(
                f,
                "Could not deserialize the network with version {} (expected {}).",
                found, expected
            ),
            DeserializeError::UnsupportedUuid { found } => write!(
                f,
                "Could not deserialize the network with UUID {}.",
                found
            ),
            DeserializeError::Corrupted(message) => {
                write!(f, "CorruptedNetwork: {}", message)
            }
        }
    }
}

impl Display for NoViableAlt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No viable alternative in decision {} at input {} (prediction started at {}).",
            self.decision, self.offending_index, self.start_index
        )
    }
}

impl Display for LexerNoViableAlt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No viable token at input {} (character {}).",
            self.start_index, self.offending_char
        )
    }
}
