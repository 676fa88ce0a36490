/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::rune_source::SourceLocation;
use crate::tokenizer::BlockType;

/// The cause of a fatal tokenization error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The input ended inside a `/* ... */` comment.
    #[error("unterminated comment")]
    UnterminatedComment,

    /// The input ended while a `(`, `[` or `{` was still open.
    #[error("unclosed block, expected `{}`", .0.closing_char())]
    UnclosedBlock(BlockType),
}

/// A fatal tokenization error. It ends the token stream.
///
/// Malformed strings and URLs are not errors: they are reported
/// as `BadString` and `BadUrl` tokens, and tokenization goes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unexpected EOF at {location}: {kind}")]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,

    /// Where the token that could not be completed started.
    pub location: SourceLocation,
}
