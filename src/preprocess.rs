/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

// https://drafts.csswg.org/css-syntax/#input-preprocessing

/// Normalizes line endings of a stream of code points.
///
/// CR LF, a lone CR and FF each become a single LF.
/// Every other code point passes through unchanged.
pub struct Preprocessor<I: Iterator<Item = char>> {
    input: I,
    /// A code point pulled while looking for the LF of a CR LF pair.
    pending: Option<char>,
}

impl<I: Iterator<Item = char>> Preprocessor<I> {
    /// Wrap a raw stream of code points.
    #[inline]
    pub fn new(input: I) -> Self {
        Preprocessor {
            input,
            pending: None,
        }
    }

    /// The wrapped stream.
    #[inline]
    pub fn get_ref(&self) -> &I {
        &self.input
    }
}

impl<I: Iterator<Item = char>> Iterator for Preprocessor<I> {
    type Item = char;

    #[inline]
    fn next(&mut self) -> Option<char> {
        let c = match self.pending.take() {
            Some(c) => c,
            None => self.input.next()?,
        };
        match c {
            '\r' => {
                match self.input.next() {
                    Some('\n') | None => {}
                    other => self.pending = other,
                }
                Some('\n')
            }
            '\x0C' => Some('\n'),
            c => Some(c),
        }
    }
}

/// Apply the line-ending substitutions to a whole string.
pub fn preprocess(input: &str) -> String {
    Preprocessor::new(input.chars()).collect()
}
