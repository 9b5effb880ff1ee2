use crate::{Lex, Position, CHANNEL_DEFAULT, TOKEN_EOF};
use std::fmt::{Display, Formatter};

impl Lex {
    pub fn new(token: i32, start: usize, end: usize) -> Self {
        Self {
            token,
            channel: CHANNEL_DEFAULT,
            start,
            end,
        }
    }

    pub fn with_channel(token: i32, start: usize, end: usize, channel: usize) -> Self {
        Self {
            token,
            channel,
            start,
            end,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.token == TOKEN_EOF
    }
}

impl Position {
    /// Create a new Position object based on the line and column number.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn origin() -> Self {
        Self { line: 1, column: 0 }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}
