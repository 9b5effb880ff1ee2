//! Narration levels for the simulators.
//!
//! Both simulators accept a one-shot log label and narrate their runs at the level the
//! label selects: `Default` reports full-context fallbacks and conflict handling,
//! `Success` adds accepted tokens and resolved predictions, `Result` adds dead ends, and
//! `Verbose` traces every decision visit. The label itself is printed in front of each
//! line so interleaved output from several recognizers stays attributable.

use super::Log;
use std::fmt::{Display, Formatter};

impl<T> Log<T> {
    /// Whether a message at `level` should be narrated under this label.
    pub fn allows<U>(&self, level: Log<U>) -> bool {
        self.rank() >= level.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }

    fn label(&self) -> Option<&T> {
        match self {
            Log::None => None,
            Log::Default(label)
            | Log::Success(label)
            | Log::Result(label)
            | Log::Verbose(label) => Some(label),
        }
    }
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None => Ok(()),
        }
    }
}
