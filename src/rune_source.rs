/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::mem;
use std::str::Chars;

use crate::preprocess::Preprocessor;

/// The line and column number for a given position within the input.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocation {
    /// The line number, starting at 1 for the first line.
    pub line: u32,

    /// The column number within a line, starting at 1 for the first code point of the line.
    pub column: u32,
}

impl SourceLocation {
    /// The location of the first code point of the input.
    pub const START: SourceLocation = SourceLocation { line: 1, column: 1 };

    /// Step over one (preprocessed) code point.
    #[inline]
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A mark in the input that a `RuneSource` can later be reset to.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SourcePosition {
    /// Counted in bytes of the preprocessed input, from 0.
    offset: usize,
    location: SourceLocation,
}

impl SourcePosition {
    /// Build a mark. Only meaningful to the source that produced `offset`.
    #[inline]
    pub fn new(offset: usize, location: SourceLocation) -> Self {
        SourcePosition { offset, location }
    }

    /// Offset in bytes of the preprocessed input.
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Line and column of this position.
    #[inline]
    pub fn location(&self) -> SourceLocation {
        self.location
    }
}

/// Supplies preprocessed code points to the tokenizer.
///
/// Implementations must support resetting to any position marked since the
/// last call to `take_text`, undoing all consumption since that mark.
///
/// # Conventions for scanning functions
///
/// A scanning production takes `&mut S` and returns `Result<_, ()>`.
/// `Err(())` means "does not match here", and any amount of input may have
/// been consumed. Callers either propagate it, or wrap the call in
/// `try_scan` which restores the position on failure.
pub trait RuneSource {
    /// The next code point, without consuming it. `None` at end of input.
    fn peek(&mut self) -> Option<char>;

    /// Consume and return the next code point.
    fn consume_char(&mut self) -> Option<char>;

    /// Mark the current position.
    fn position(&self) -> SourcePosition;

    /// Go back to a position marked since the last `take_text`.
    fn reset(&mut self, position: SourcePosition);

    /// Everything consumed since the previous call, which starts a new span.
    fn take_text(&mut self) -> String;

    /// Line and column of the next code point.
    #[inline]
    fn current_source_location(&self) -> SourceLocation {
        self.position().location()
    }

    /// Whether the input is exhausted.
    #[inline]
    fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Consume the next code point if it is `expected`.
    #[inline]
    fn accept_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.consume_char();
            true
        } else {
            false
        }
    }

    /// Consume the next code point if it matches `predicate`.
    #[inline]
    fn accept<P>(&mut self, predicate: P) -> bool
    where
        Self: Sized,
        P: FnOnce(char) -> bool,
    {
        match self.peek() {
            Some(c) if predicate(c) => {
                self.consume_char();
                true
            }
            _ => false,
        }
    }

    /// Consume code points while they match `predicate`. Returns how many were consumed.
    #[inline]
    fn accept_while<P>(&mut self, mut predicate: P) -> usize
    where
        Self: Sized,
        P: FnMut(char) -> bool,
    {
        let mut count = 0;
        while self.accept(&mut predicate) {
            count += 1;
        }
        count
    }

    /// Consume code points up to, but not including, the first one matching `stop`.
    ///
    /// Returns that code point, or `None` if the end of input was reached.
    #[inline]
    fn skip_until<P>(&mut self, mut stop: P) -> Option<char>
    where
        Self: Sized,
        P: FnMut(char) -> bool,
    {
        while let Some(c) = self.peek() {
            if stop(c) {
                return Some(c);
            }
            self.consume_char();
        }
        None
    }

    /// Consume `literal` entirely, or nothing at all.
    fn accept_str(&mut self, literal: &str) -> bool
    where
        Self: Sized,
    {
        self.lookahead_literal(literal, |a, b| a == b)
    }

    /// Consume `literal` entirely, or nothing at all, ignoring ASCII case.
    fn accept_str_ignore_ascii_case(&mut self, literal: &str) -> bool
    where
        Self: Sized,
    {
        self.lookahead_literal(literal, |a, b| a.eq_ignore_ascii_case(&b))
    }

    #[doc(hidden)]
    fn lookahead_literal<F>(&mut self, literal: &str, mut eq: F) -> bool
    where
        Self: Sized,
        F: FnMut(char, char) -> bool,
    {
        self.try_scan(|source| {
            for expected in literal.chars() {
                if !source.accept(|c| eq(c, expected)) {
                    return Err(());
                }
            }
            Ok(())
        })
        .is_ok()
    }

    /// Execute the given closure, passing it the source.
    /// If the result is `Err`, restore the position to where it was before the call.
    #[inline]
    fn try_scan<F, T>(&mut self, scan: F) -> Result<T, ()>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, ()>,
    {
        let start = self.position();
        let result = scan(self);
        if result.is_err() {
            self.reset(start)
        }
        result
    }

    /// Run `probe` and restore the position whatever it returned.
    #[inline]
    fn lookahead<F>(&mut self, probe: F) -> bool
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> bool,
    {
        let start = self.position();
        let result = probe(self);
        self.reset(start);
        result
    }
}

/// A backtracking `RuneSource` over any stream of code points.
///
/// The stream goes through the `Preprocessor` first.
/// Only the code points of the current span are buffered.
pub struct Runes<I: Iterator<Item = char>> {
    input: Preprocessor<I>,

    /// Code points pulled from `input` since the last `take_text`.
    buffer: String,

    /// Counted in bytes into `buffer`.
    cursor: usize,

    /// Offset of `buffer[0]` in the whole preprocessed input.
    consumed: usize,

    location: SourceLocation,
}

impl<'i> Runes<Chars<'i>> {
    /// A source over a string.
    #[inline]
    pub fn from_str(input: &'i str) -> Self {
        Runes::new(input.chars())
    }
}

impl<I: Iterator<Item = char>> Runes<I> {
    /// A source over a stream of raw (not yet preprocessed) code points.
    pub fn new(input: I) -> Self {
        Runes {
            input: Preprocessor::new(input),
            buffer: String::new(),
            cursor: 0,
            consumed: 0,
            location: SourceLocation::START,
        }
    }

    /// The raw stream.
    #[inline]
    pub fn get_ref(&self) -> &I {
        self.input.get_ref()
    }
}

impl<I: Iterator<Item = char>> RuneSource for Runes<I> {
    #[inline]
    fn peek(&mut self) -> Option<char> {
        if let Some(c) = self.buffer[self.cursor..].chars().next() {
            return Some(c);
        }
        let c = self.input.next()?;
        self.buffer.push(c);
        Some(c)
    }

    #[inline]
    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        self.location.advance(c);
        Some(c)
    }

    #[inline]
    fn position(&self) -> SourcePosition {
        SourcePosition::new(self.consumed + self.cursor, self.location)
    }

    #[inline]
    fn reset(&mut self, position: SourcePosition) {
        debug_assert!(
            position.offset >= self.consumed && position.offset <= self.consumed + self.buffer.len(),
            "position from before the current span"
        );
        self.cursor = position.offset.saturating_sub(self.consumed).min(self.buffer.len());
        self.location = position.location;
    }

    fn take_text(&mut self) -> String {
        let rest = self.buffer.split_off(self.cursor);
        self.consumed += self.cursor;
        self.cursor = 0;
        mem::replace(&mut self.buffer, rest)
    }
}
