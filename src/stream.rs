//! In-memory input sources.
//!
//! The simulators only depend on the [IIntStream]/[ICharStream] interfaces declared in the
//! crate root; the two implementations here cover the common cases of a character stream
//! decoded from a string and a plain token-type stream feeding a parser decision.

use crate::{ICharStream, IIntStream, Interval, TOKEN_EOF};

/// A character stream over the code points of a string.
pub struct CharStream {
    chars: Vec<char>,
    pointer: usize,
}

/// A stream of token types, usually collected from a lexer run.
pub struct TokenTypeStream {
    types: Vec<i32>,
    pointer: usize,
}

impl From<&str> for CharStream {
    fn from(code: &str) -> Self {
        Self {
            chars: code.chars().collect(),
            pointer: 0,
        }
    }
}

impl IIntStream for CharStream {
    fn la(&mut self, offset: isize) -> i32 {
        if offset == 0 {
            return TOKEN_EOF;
        }
        let index = self.pointer as isize + offset - 1;
        if index < 0 || index as usize >= self.chars.len() {
            TOKEN_EOF
        } else {
            self.chars[index as usize] as i32
        }
    }

    fn index(&self) -> usize {
        self.pointer
    }

    fn consume(&mut self) {
        if self.pointer < self.chars.len() {
            self.pointer += 1;
        }
    }

    fn seek(&mut self, index: usize) {
        self.pointer = index.min(self.chars.len());
    }

    fn mark(&mut self) -> isize {
        0
    }

    fn release(&mut self, _marker: isize) {}

    fn size(&self) -> usize {
        self.chars.len()
    }
}

impl ICharStream for CharStream {
    fn text(&self, interval: Interval) -> String {
        if interval.b < interval.a || interval.a < 0 {
            return String::new();
        }
        let start = interval.a as usize;
        let stop = (interval.b as usize + 1).min(self.chars.len());
        if start >= stop {
            return String::new();
        }
        self.chars[start..stop].iter().collect()
    }
}

impl From<Vec<i32>> for TokenTypeStream {
    fn from(types: Vec<i32>) -> Self {
        Self { types, pointer: 0 }
    }
}

impl IIntStream for TokenTypeStream {
    fn la(&mut self, offset: isize) -> i32 {
        if offset == 0 {
            return TOKEN_EOF;
        }
        let index = self.pointer as isize + offset - 1;
        if index < 0 || index as usize >= self.types.len() {
            TOKEN_EOF
        } else {
            self.types[index as usize]
        }
    }

    fn index(&self) -> usize {
        self.pointer
    }

    fn consume(&mut self) {
        if self.pointer < self.types.len() {
            self.pointer += 1;
        }
    }

    fn seek(&mut self, index: usize) {
        self.pointer = index.min(self.types.len());
    }

    fn mark(&mut self) -> isize {
        0
    }

    fn release(&mut self, _marker: isize) {}

    fn size(&self) -> usize {
        self.types.len()
    }
}
