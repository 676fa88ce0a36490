/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

#![crate_name = "css_tokenizer"]
#![crate_type = "rlib"]
#![cfg_attr(feature = "bench", feature(test))]
#![deny(missing_docs)]

/*!

Implementation of the tokenization stage of
[CSS Syntax Module Level 3](https://drafts.csswg.org/css-syntax/) for Rust.

# Input

A `Tokenizer` pulls code points from a `RuneSource`.
`Tokenizer::new` borrows a `&str`;
if you have bytes (from a file, the network, or something),
see the `from_bytes` module, which decodes them as a stream.
Line endings are normalized (CR LF, CR and FF become LF) before anything else.

# Output

Each token is a `TokenKind` and the exact text it was made of:
concatenating the text of every token reproduces the (normalized) input.
Escapes are not resolved and numbers are not parsed;
that is left to whatever consumes the tokens.

Malformed strings and URLs become `BadString` and `BadUrl` tokens,
and tokenization goes on.
An unterminated comment, or the end of the input inside a `(`, `[` or `{` block,
is a fatal `Error`.

```rust
use css_tokenizer::{Tokenizer, TokenKind};

let mut tokenizer = Tokenizer::new("a { color: red }");
let token = tokenizer.next_token().unwrap();
assert_eq!(token.kind, TokenKind::Ident);
assert_eq!(token.text, "a");

let kinds = tokenizer.map(|token| token.unwrap().kind).collect::<Vec<_>>();
assert_eq!(kinds, [
    TokenKind::Whitespace, TokenKind::OpenBrace, TokenKind::Whitespace,
    TokenKind::Ident, TokenKind::Colon, TokenKind::Whitespace,
    TokenKind::Ident, TokenKind::Whitespace, TokenKind::CloseBrace,
]);
```

# Conventions for scanning functions

* Take (at least) a `source: &mut S` parameter, where `S: RuneSource`
* Return `Result<_, ()>`
* When returning `Ok(_)`,
  the function must have consumed exactly the text of what it recognized.
* When returning `Err(())`, any amount of input may have been consumed.

As a consequence, when calling another scanning function, either:

* Any `Err(())` return value must be propagated.
  This happens by definition for tail calls,
  and can otherwise be done with the `?` operator.
* Or the call must be wrapped in a `RuneSource::try_scan` call.
  `try_scan` takes a closure that takes a source and returns a `Result`,
  calls it once,
  and returns itself that same result.
  If the result is `Err`,
  it restores the position inside the input to the one saved before calling the closure.

The stack of open blocks is only touched once a token is certain,
never inside a closure given to `try_scan`.

*/

#[cfg(all(test, feature = "bench"))]
extern crate test;

pub use crate::error::{Error, ErrorKind};
pub use crate::from_bytes::{decode_stylesheet_bytes, stylesheet_encoding, DecodeReader};
pub use crate::preprocess::{preprocess, Preprocessor};
pub use crate::rune_source::{RuneSource, Runes, SourceLocation, SourcePosition};
pub use crate::tokenizer::{tokenize, BlockType, Token, TokenKind, Tokenizer};

mod error;
pub mod from_bytes;
mod preprocess;
mod rune_source;
mod tokenizer;

#[cfg(test)]
mod tests;
