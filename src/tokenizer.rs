/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

// https://drafts.csswg.org/css-syntax/#tokenization

use std::fmt;
use std::str::Chars;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{Error, ErrorKind};
use crate::rune_source::{RuneSource, Runes, SourceLocation};

/// The type of one of the pieces the CSS input is broken into.
///
/// This is a closed set: consumers are expected to match on it exhaustively.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// A maximal run of whitespace.
    Whitespace,

    /// A `/* ... */` comment, markers included.
    Comment,

    /// An [`<ident-token>`](https://drafts.csswg.org/css-syntax/#ident-token-diagram)
    Ident,

    /// A [`<function-token>`](https://drafts.csswg.org/css-syntax/#function-token-diagram)
    ///
    /// The text includes the `(` marker, which opens a parenthesis block.
    Function,

    /// An [`<at-keyword-token>`](https://drafts.csswg.org/css-syntax/#at-keyword-token-diagram)
    AtKeyword,

    /// A [`<hash-token>`](https://drafts.csswg.org/css-syntax/#hash-token-diagram)
    Hash,

    /// A [`<string-token>`](https://drafts.csswg.org/css-syntax/#string-token-diagram),
    /// quotes included.
    String,

    /// A `<bad-string-token>`
    ///
    /// This token always indicates a parse error.
    BadString,

    /// A [`<url-token>`](https://drafts.csswg.org/css-syntax/#url-token-diagram),
    /// `url(` and `)` included.
    Url,

    /// A `<bad-url-token>`
    ///
    /// This token always indicates a parse error.
    BadUrl,

    /// A [`<number-token>`](https://drafts.csswg.org/css-syntax/#number-token-diagram)
    Number,

    /// A [`<percentage-token>`](https://drafts.csswg.org/css-syntax/#percentage-token-diagram)
    Percentage,

    /// A [`<dimension-token>`](https://drafts.csswg.org/css-syntax/#dimension-token-diagram)
    Dimension,

    /// A `<delim-token>`: a single code point that matches nothing else.
    Delim,

    /// A `,` `<comma-token>`
    Comma,

    /// A `:` `<colon-token>`
    Colon,

    /// A `;` `<semicolon-token>`
    Semicolon,

    /// A `(` `<(-token>`
    OpenParen,

    /// A `)` `<)-token>` that closes the innermost open block.
    CloseParen,

    /// A `[` `<[-token>`
    OpenBracket,

    /// A `]` `<]-token>` that closes the innermost open block.
    CloseBracket,

    /// A `{` `<{-token>`
    OpenBrace,

    /// A `}` `<}-token>` that closes the innermost open block.
    CloseBrace,

    /// A `<!--` [`<CDO-token>`](https://drafts.csswg.org/css-syntax/#CDO-token-diagram)
    CDO,

    /// A `-->` [`<CDC-token>`](https://drafts.csswg.org/css-syntax/#CDC-token-diagram)
    CDC,

    /// The end of the input, with every block closed.
    Done,

    /// A fatal error. Only produced by converting an `Error` into a `Token`.
    Error,
}

static TOKEN_KINDS_BY_NAME: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "whitespace" => TokenKind::Whitespace,
    "comment" => TokenKind::Comment,
    "ident" => TokenKind::Ident,
    "function" => TokenKind::Function,
    "at-keyword" => TokenKind::AtKeyword,
    "hash" => TokenKind::Hash,
    "string" => TokenKind::String,
    "bad-string" => TokenKind::BadString,
    "url" => TokenKind::Url,
    "bad-url" => TokenKind::BadUrl,
    "number" => TokenKind::Number,
    "percentage" => TokenKind::Percentage,
    "dimension" => TokenKind::Dimension,
    "delim" => TokenKind::Delim,
    "comma" => TokenKind::Comma,
    "colon" => TokenKind::Colon,
    "semicolon" => TokenKind::Semicolon,
    "open-paren" => TokenKind::OpenParen,
    "close-paren" => TokenKind::CloseParen,
    "open-bracket" => TokenKind::OpenBracket,
    "close-bracket" => TokenKind::CloseBracket,
    "open-brace" => TokenKind::OpenBrace,
    "close-brace" => TokenKind::CloseBrace,
    "cdo" => TokenKind::CDO,
    "cdc" => TokenKind::CDC,
    "done" => TokenKind::Done,
    "error" => TokenKind::Error,
};

impl TokenKind {
    /// A stable, lower-case name for this kind, e.g. `"bad-url"`.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::Ident => "ident",
            TokenKind::Function => "function",
            TokenKind::AtKeyword => "at-keyword",
            TokenKind::Hash => "hash",
            TokenKind::String => "string",
            TokenKind::BadString => "bad-string",
            TokenKind::Url => "url",
            TokenKind::BadUrl => "bad-url",
            TokenKind::Number => "number",
            TokenKind::Percentage => "percentage",
            TokenKind::Dimension => "dimension",
            TokenKind::Delim => "delim",
            TokenKind::Comma => "comma",
            TokenKind::Colon => "colon",
            TokenKind::Semicolon => "semicolon",
            TokenKind::OpenParen => "open-paren",
            TokenKind::CloseParen => "close-paren",
            TokenKind::OpenBracket => "open-bracket",
            TokenKind::CloseBracket => "close-bracket",
            TokenKind::OpenBrace => "open-brace",
            TokenKind::CloseBrace => "close-brace",
            TokenKind::CDO => "cdo",
            TokenKind::CDC => "cdc",
            TokenKind::Done => "done",
            TokenKind::Error => "error",
        }
    }

    /// The kind with the given `name()`, if any.
    pub fn from_name(name: &str) -> Option<TokenKind> {
        TOKEN_KINDS_BY_NAME.get(name).cloned()
    }

    /// Whether this is `BadString` or `BadUrl`.
    #[inline]
    pub fn is_bad(self) -> bool {
        matches!(self, TokenKind::BadString | TokenKind::BadUrl)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the pieces the CSS input is broken into.
///
/// `text` is exactly what was consumed from the (preprocessed) input:
/// escapes are not resolved, and quotes and markers are kept.
#[derive(PartialEq, Eq, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// The type of the token.
    pub kind: TokenKind,

    /// The literal text of the token.
    pub text: String,
}

impl Token {
    /// Make a token.
    #[inline]
    pub fn new<T: Into<String>>(kind: TokenKind, text: T) -> Token {
        Token {
            kind,
            text: text.into(),
        }
    }
}

/// Writes the literal text, so that writing every token reproduces the input.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<Error> for Token {
    fn from(error: Error) -> Token {
        Token::new(TokenKind::Error, error.to_string())
    }
}

/// One of the three kinds of nested blocks.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockType {
    /// `( ... )`, also opened by a `Function` token.
    Parenthesis,
    /// `[ ... ]`
    SquareBracket,
    /// `{ ... }`
    CurlyBracket,
}

impl BlockType {
    fn opening(c: char) -> Option<BlockType> {
        match c {
            '(' => Some(BlockType::Parenthesis),
            '[' => Some(BlockType::SquareBracket),
            '{' => Some(BlockType::CurlyBracket),
            _ => None,
        }
    }

    /// The code point that closes this block.
    pub fn closing_char(self) -> char {
        match self {
            BlockType::Parenthesis => ')',
            BlockType::SquareBracket => ']',
            BlockType::CurlyBracket => '}',
        }
    }

    fn open_token(self) -> TokenKind {
        match self {
            BlockType::Parenthesis => TokenKind::OpenParen,
            BlockType::SquareBracket => TokenKind::OpenBracket,
            BlockType::CurlyBracket => TokenKind::OpenBrace,
        }
    }

    fn close_token(self) -> TokenKind {
        match self {
            BlockType::Parenthesis => TokenKind::CloseParen,
            BlockType::SquareBracket => TokenKind::CloseBracket,
            BlockType::CurlyBracket => TokenKind::CloseBrace,
        }
    }
}

/// Breaks CSS input into tokens, one `next_token` call at a time.
///
/// The tokenizer keeps the stack of open blocks: a closing `)`, `]` or `}`
/// is only a closing token if it matches the innermost open block,
/// otherwise it is a `Delim`. Reaching the end of the input inside a block
/// or a comment is a fatal `Error`, after which the tokenizer only
/// returns that same error.
pub struct Tokenizer<S> {
    source: S,
    blocks: SmallVec<[BlockType; 16]>,
    error: Option<Error>,
    finished: bool,
}

impl<'i> Tokenizer<Runes<Chars<'i>>> {
    /// Tokenize a string.
    #[inline]
    pub fn new(input: &'i str) -> Self {
        Tokenizer::from_source(Runes::from_str(input))
    }
}

impl<S: RuneSource> Tokenizer<S> {
    /// Tokenize the code points of any source.
    ///
    /// The source is expected to be preprocessed already, as `Runes` is.
    pub fn from_source(source: S) -> Self {
        Tokenizer {
            source,
            blocks: SmallVec::new(),
            error: None,
            finished: false,
        }
    }

    /// Consume and return the next token.
    ///
    /// At the end of the input, this returns a `Done` token with empty text,
    /// as many times as it is called.
    pub fn next_token(&mut self) -> Result<Token, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let location = self.source.current_source_location();
        match self.consume_token() {
            Ok(kind) => {
                let token = Token::new(kind, self.source.take_text());
                trace!(kind = %token.kind, text = ?token.text, "token");
                if kind.is_bad() {
                    debug!(%location, kind = %kind, "recovered from malformed input");
                }
                Ok(token)
            }
            Err(kind) => {
                let error = Error { kind, location };
                debug!(%error, "tokenization failed");
                self.error = Some(error);
                Err(error)
            }
        }
    }

    /// How many blocks are currently open.
    #[inline]
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    /// Line and column of the start of the next token.
    #[inline]
    pub fn current_source_location(&self) -> SourceLocation {
        self.source.current_source_location()
    }

    /// The underlying source.
    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stop tokenizing and return the underlying source.
    #[inline]
    pub fn into_source(self) -> S {
        self.source
    }

    fn consume_token(&mut self) -> Result<TokenKind, ErrorKind> {
        let c = match self.source.peek() {
            Some(c) => c,
            None => {
                return match self.blocks.last() {
                    None => Ok(TokenKind::Done),
                    Some(&block) => Err(ErrorKind::UnclosedBlock(block)),
                }
            }
        };
        let source = &mut self.source;
        let kind = match c {
            '/' if source.accept_str("/*") => consume_comment(source)?,
            c if is_whitespace(c) => {
                source.accept_while(is_whitespace);
                TokenKind::Whitespace
            }
            '"' | '\'' => {
                source.consume_char();
                consume_string(source, c)
            }
            '#' => {
                source.consume_char();
                if source.lookahead(consume_word_char) {
                    consume_name(source);
                    TokenKind::Hash
                } else {
                    TokenKind::Delim
                }
            }
            '(' | '[' | '{' => {
                source.consume_char();
                match BlockType::opening(c) {
                    Some(block) => {
                        self.blocks.push(block);
                        block.open_token()
                    }
                    None => TokenKind::Delim,
                }
            }
            ')' | ']' | '}' => {
                source.consume_char();
                match self.blocks.last() {
                    Some(&block) if block.closing_char() == c => {
                        self.blocks.pop();
                        block.close_token()
                    }
                    _ => TokenKind::Delim,
                }
            }
            ',' => {
                source.consume_char();
                TokenKind::Comma
            }
            ':' => {
                source.consume_char();
                TokenKind::Colon
            }
            ';' => {
                source.consume_char();
                TokenKind::Semicolon
            }
            '.' | '+' if source.lookahead(starts_number) => consume_numeric(source),
            '<' if source.accept_str("<!--") => TokenKind::CDO,
            '@' => {
                source.consume_char();
                source
                    .try_scan(|source| consume_ident_like(source, TokenKind::AtKeyword))
                    .unwrap_or(TokenKind::Delim)
            }
            '0'..='9' => consume_numeric(source),
            '-' => {
                if source.accept_str("-->") {
                    TokenKind::CDC
                } else if let Ok(kind) =
                    source.try_scan(|source| consume_ident_like(source, TokenKind::Ident))
                {
                    kind
                } else if source.lookahead(starts_number) {
                    consume_numeric(source)
                } else {
                    source.consume_char();
                    TokenKind::Delim
                }
            }
            // An escape or a name-start code point. A `\` before a newline is a `Delim`.
            '\\' | '_' | 'a'..='z' | 'A'..='Z' | '\u{80}'..=char::MAX => {
                match source.try_scan(|source| consume_ident_like(source, TokenKind::Ident)) {
                    Ok(kind) => kind,
                    Err(()) => {
                        source.consume_char();
                        TokenKind::Delim
                    }
                }
            }
            _ => {
                source.consume_char();
                TokenKind::Delim
            }
        };
        // The `(` of a function is committed together with its name.
        if kind == TokenKind::Function {
            self.blocks.push(BlockType::Parenthesis);
        }
        Ok(kind)
    }
}

impl<S: RuneSource> Iterator for Tokenizer<S> {
    type Item = Result<Token, Error>;

    /// Like `next_token`, but stops at `Done`, and after yielding an error once.
    fn next(&mut self) -> Option<Result<Token, Error>> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Done => {
                self.finished = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<S: RuneSource> std::iter::FusedIterator for Tokenizer<S> {}

/// Tokenize a whole string.
///
/// The last token is either `Done`, or an `Error` token carrying the error message.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    loop {
        match tokenizer.next_token() {
            Ok(token) => {
                let done = token.kind == TokenKind::Done;
                tokens.push(token);
                if done {
                    return tokens;
                }
            }
            Err(error) => {
                tokens.push(error.into());
                return tokens;
            }
        }
    }
}

#[inline]
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

#[inline]
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

#[inline]
fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}

#[inline]
fn is_name_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_') || !c.is_ascii()
}

#[inline]
fn is_name_char(c: char) -> bool {
    is_name_start(c) || matches!(c, '0'..='9' | '-')
}

/// Code points that may appear unescaped in an unquoted URL.
#[inline]
fn is_url_char(c: char) -> bool {
    !matches!(
        c,
        ' ' | '\t' | '\n' | '\r' | '\x0C'
            | '"' | '\'' | '(' | ')' | '\\'
            | '\x00'..='\x08' | '\x0B' | '\x0E'..='\x1F' | '\x7F'
    )
}

// Assumes that the `/*` has already been consumed.
fn consume_comment<S: RuneSource>(source: &mut S) -> Result<TokenKind, ErrorKind> {
    loop {
        if source.skip_until(|c| c == '*').is_none() {
            return Err(ErrorKind::UnterminatedComment);
        }
        source.consume_char();
        if source.accept_char('/') {
            return Ok(TokenKind::Comment);
        }
    }
}

// Assumes that the opening quote has already been consumed.
fn consume_string<S: RuneSource>(source: &mut S, quote: char) -> TokenKind {
    loop {
        match source.skip_until(|c| c == quote || c == '\\' || c == '\n') {
            // The newline is not part of the string.
            None | Some('\n') => return TokenKind::BadString,
            Some('\\') => {
                source.consume_char();
                // Escaped newline
                if source.accept_char('\n') {
                    continue;
                }
                if consume_escape(source).is_err() {
                    return TokenKind::BadString;
                }
            }
            Some(_) => {
                source.consume_char();
                return TokenKind::String;
            }
        }
    }
}

/// Assumes that the `\` has already been consumed.
///
/// Fails without consuming anything before a newline or the end of input.
/// Hex escapes are at most six digits, plus one optional whitespace.
fn consume_escape<S: RuneSource>(source: &mut S) -> Result<(), ()> {
    let c = match source.peek() {
        None | Some('\n') | Some('\r') | Some('\x0C') => return Err(()),
        Some(c) => c,
    };
    source.consume_char();
    if c.is_ascii_hexdigit() {
        let mut digits = 1;
        while digits < 6 && source.accept(|c| c.is_ascii_hexdigit()) {
            digits += 1;
        }
        source.accept(is_whitespace);
    }
    Ok(())
}

/// Consume one code point that can continue a name, or a valid escape.
fn consume_word_char<S: RuneSource>(source: &mut S) -> bool {
    if source.accept(is_name_char) {
        return true;
    }
    source.accept_char('\\') && consume_escape(source).is_ok()
}

fn consume_name<S: RuneSource>(source: &mut S) {
    loop {
        source.accept_while(is_name_char);
        if source.peek() != Some('\\') {
            return;
        }
        let escaped = source.try_scan(|source| {
            source.consume_char();
            consume_escape(source)
        });
        if escaped.is_err() {
            return;
        }
    }
}

/// Whether a number starts here: `[+-]?` then a digit, or `.` and a digit.
fn starts_number<S: RuneSource>(source: &mut S) -> bool {
    source.accept(is_sign);
    source.accept(is_digit) || (source.accept_char('.') && source.accept(is_digit))
}

fn consume_ident<S: RuneSource>(source: &mut S) -> Result<(), ()> {
    if source.accept_char('-') && source.accept_char('-') {
        consume_name(source);
        return Ok(());
    }
    if source.accept(is_name_start) {
        consume_name(source);
        Ok(())
    } else if source.accept_char('\\') {
        consume_escape(source)?;
        consume_name(source);
        Ok(())
    } else {
        Err(())
    }
}

/// `kind` is either `Ident` or `AtKeyword` (with the `@` already consumed).
fn consume_ident_like<S: RuneSource>(source: &mut S, kind: TokenKind) -> Result<TokenKind, ()> {
    if kind == TokenKind::Ident && source.accept_str_ignore_ascii_case("url(") {
        let after_parenthesis = source.position();
        source.accept_while(is_whitespace);
        return Ok(match source.peek() {
            // A quoted URL is a plain function call.
            Some('"') | Some('\'') => {
                source.reset(after_parenthesis);
                TokenKind::Function
            }
            _ => consume_url(source),
        });
    }
    consume_ident(source)?;
    if kind == TokenKind::Ident && source.accept_char('(') {
        Ok(TokenKind::Function)
    } else {
        Ok(kind)
    }
}

// Parse [+-]?\d*(\.\d+)?([eE][+-]?\d+)?
// But this is always called so that there is at least one digit in \d*(\.\d+)?
fn consume_numeric<S: RuneSource>(source: &mut S) -> TokenKind {
    source.accept(is_sign);
    source.accept_while(is_digit);
    let _ = source.try_scan(|source| {
        if source.accept_char('.') && source.accept_while(is_digit) > 0 {
            Ok(())
        } else {
            Err(())
        }
    });
    let _ = source.try_scan(|source| {
        if !source.accept(|c| c == 'e' || c == 'E') {
            return Err(());
        }
        source.accept(is_sign);
        if source.accept_while(is_digit) > 0 {
            Ok(())
        } else {
            Err(())
        }
    });
    if source.accept_char('%') {
        TokenKind::Percentage
    } else if source.try_scan(consume_ident).is_ok() {
        TokenKind::Dimension
    } else {
        TokenKind::Number
    }
}

// Assumes that `url(` and any whitespace after it have already been consumed,
// and that what follows is not a quote.
fn consume_url<S: RuneSource>(source: &mut S) -> TokenKind {
    let mut kind = TokenKind::Url;
    loop {
        match source.skip_until(|c| !is_url_char(c)) {
            None => return TokenKind::BadUrl,
            Some(')') => {
                source.consume_char();
                return kind;
            }
            Some(c) if is_whitespace(c) => {
                source.accept_while(is_whitespace);
                if source.accept_char(')') {
                    return kind;
                }
                kind = TokenKind::BadUrl;
            }
            Some('\\') => {
                source.consume_char();
                if consume_escape(source).is_err() {
                    kind = TokenKind::BadUrl;
                }
            }
            // Quotes, `(` and non-printable code points: consume the remnants of a bad url.
            Some(_) => {
                source.consume_char();
                kind = TokenKind::BadUrl;
            }
        }
    }
}
