/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use difference::Changeset;
use proptest::prelude::*;
use serde_json::{json, Value};

use super::{
    preprocess, tokenize, BlockType, Error, ErrorKind, RuneSource, SourceLocation, SourcePosition,
    Token, TokenKind, Tokenizer,
};

fn print_json_diff(results: &Value, expected: &Value) {
    let results = serde_json::to_string_pretty(results).unwrap() + "\n";
    let expected = serde_json::to_string_pretty(expected).unwrap() + "\n";
    println!("{}", Changeset::new(&expected, &results, "\n"));
}

fn assert_json_eq(results: Value, expected: Value, message: &str) {
    if results != expected {
        print_json_diff(&results, &expected);
        panic!("{:?}", message)
    }
}

fn run_raw_json_tests<F: Fn(Value, Value)>(json_data: &str, run: F) {
    let items = match serde_json::from_str(json_data) {
        Ok(Value::Array(items)) => items,
        _ => panic!("Invalid JSON"),
    };
    assert!(items.len() % 2 == 0);
    let mut input = None;
    for item in items.into_iter() {
        match (&input, item) {
            (&None, json_obj) => input = Some(json_obj),
            (&Some(_), expected) => {
                let input = input.take().unwrap();
                run(input, expected)
            }
        };
    }
}

fn run_json_tests<F: Fn(&str) -> Value>(json_data: &str, parse: F) {
    run_raw_json_tests(json_data, |input, expected| match input {
        Value::String(input) => {
            let result = parse(&input);
            assert_json_eq(result, expected, &input);
        }
        _ => panic!("Unexpected JSON"),
    });
}

fn tokens_to_json(tokens: Vec<Token>) -> Value {
    Value::Array(
        tokens
            .into_iter()
            .map(|token| json!([token.kind.name(), token.text]))
            .collect(),
    )
}

#[test]
fn token_list() {
    run_json_tests(include_str!("tokenizer-tests/tokens.json"), |input| {
        tokens_to_json(tokenize(input))
    });
}

/// The same expectations, through a source that is not `Runes`.
#[test]
fn token_list_from_custom_source() {
    run_json_tests(include_str!("tokenizer-tests/tokens.json"), |input| {
        let mut tokenizer = Tokenizer::from_source(CharsSource::new(&preprocess(input)));
        let mut tokens = Vec::new();
        loop {
            match tokenizer.next_token() {
                Ok(token) => {
                    let done = token.kind == TokenKind::Done;
                    tokens.push(token);
                    if done {
                        break;
                    }
                }
                Err(error) => {
                    tokens.push(error.into());
                    break;
                }
            }
        }
        tokens_to_json(tokens)
    });
}

/// A minimal `RuneSource` over already preprocessed code points.
struct CharsSource {
    chars: Vec<char>,
    position: usize,
    span_start: usize,
    location: SourceLocation,
}

impl CharsSource {
    fn new(input: &str) -> Self {
        CharsSource {
            chars: input.chars().collect(),
            position: 0,
            span_start: 0,
            location: SourceLocation::START,
        }
    }
}

impl RuneSource for CharsSource {
    fn peek(&mut self) -> Option<char> {
        self.chars.get(self.position).cloned()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        self.location.advance(c);
        Some(c)
    }

    fn position(&self) -> SourcePosition {
        SourcePosition::new(self.position, self.location)
    }

    fn reset(&mut self, position: SourcePosition) {
        self.position = position.byte_offset();
        self.location = position.location();
    }

    fn take_text(&mut self) -> String {
        let text = self.chars[self.span_start..self.position].iter().collect();
        self.span_start = self.position;
        text
    }
}

fn kinds_and_texts(input: &str) -> Vec<(TokenKind, String)> {
    tokenize(input).into_iter().map(|token| (token.kind, token.text)).collect()
}

#[test]
fn numeric_suffixes() {
    assert_eq!(kinds_and_texts("1"), [(TokenKind::Number, "1".into()), (TokenKind::Done, "".into())]);
    assert_eq!(kinds_and_texts("1%"), [(TokenKind::Percentage, "1%".into()), (TokenKind::Done, "".into())]);
    assert_eq!(kinds_and_texts("1px"), [(TokenKind::Dimension, "1px".into()), (TokenKind::Done, "".into())]);
    assert_eq!(
        kinds_and_texts("10 px"),
        [
            (TokenKind::Number, "10".into()),
            (TokenKind::Whitespace, " ".into()),
            (TokenKind::Ident, "px".into()),
            (TokenKind::Done, "".into()),
        ]
    );
}

#[test]
fn hex_escapes_stop_after_six_digits() {
    // Six digits: the whitespace after them belongs to the escape.
    let mut tokenizer = Tokenizer::new("\\10FFFF x");
    assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Ident, "\\10FFFF x")));
    // Seven: the seventh is an ordinary name code point, and the whitespace ends the ident.
    let mut tokenizer = Tokenizer::new("\\10FFFFF x");
    assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Ident, "\\10FFFFF")));
    assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Whitespace, " ")));
    // Only one whitespace is part of an escape.
    let mut tokenizer = Tokenizer::new("#\\41  a");
    assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Hash, "#\\41 ")));
    assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Whitespace, " ")));
}

#[test]
fn line_numbers() {
    let mut input = Tokenizer::new("foo bar\nbaz\r\n\n\"a\\\r\nb\"");
    assert_eq!(input.current_source_location(), SourceLocation { line: 1, column: 1 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Ident, "foo")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 1, column: 4 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Whitespace, " ")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 1, column: 5 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Ident, "bar")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 1, column: 8 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Whitespace, "\n")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 2, column: 1 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Ident, "baz")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 2, column: 4 });

    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Whitespace, "\n\n")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 4, column: 1 });

    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::String, "\"a\\\nb\"")));
    assert_eq!(input.current_source_location(), SourceLocation { line: 5, column: 3 });
    assert_eq!(input.next_token(), Ok(Token::new(TokenKind::Done, "")));
}

#[test]
fn done_is_repeatable() {
    let mut tokenizer = Tokenizer::new("a");
    assert_eq!(tokenizer.next_token().map(|t| t.kind), Ok(TokenKind::Ident));
    for _ in 0..3 {
        assert_eq!(tokenizer.next_token(), Ok(Token::new(TokenKind::Done, "")));
    }
}

#[test]
fn no_tokens_after_error() {
    let expected = Error {
        kind: ErrorKind::UnclosedBlock(BlockType::CurlyBracket),
        location: SourceLocation { line: 1, column: 7 },
    };
    let mut tokenizer = Tokenizer::new("a { b ");
    let mut kinds = Vec::new();
    let error = loop {
        match tokenizer.next_token() {
            Ok(token) => kinds.push(token.kind),
            Err(error) => break error,
        }
    };
    assert_eq!(error, expected);
    assert_eq!(
        kinds,
        [
            TokenKind::Ident,
            TokenKind::Whitespace,
            TokenKind::OpenBrace,
            TokenKind::Whitespace,
            TokenKind::Ident,
            TokenKind::Whitespace,
        ]
    );
    for _ in 0..3 {
        assert_eq!(tokenizer.next_token(), Err(expected));
    }
    assert_eq!(error.to_string(), "unexpected EOF at 1:7: unclosed block, expected `}`");

    // The iterator yields the error once, then ends.
    let results = Tokenizer::new("/* a").collect::<Vec<_>>();
    assert_eq!(
        results,
        [Err(Error {
            kind: ErrorKind::UnterminatedComment,
            location: SourceLocation::START,
        })]
    );
    let mut tokenizer = Tokenizer::new("(");
    assert_eq!(tokenizer.next().map(|r| r.map(|t| t.kind)), Some(Ok(TokenKind::OpenParen)));
    assert!(matches!(tokenizer.next(), Some(Err(_))));
    assert_eq!(tokenizer.next(), None);
    assert_eq!(tokenizer.next(), None);
}

#[test]
fn block_depth() {
    let mut tokenizer = Tokenizer::new("f([{x}]) ]");
    let mut depths = Vec::new();
    while let Some(token) = tokenizer.next() {
        depths.push((token.unwrap().kind, tokenizer.depth()));
    }
    assert_eq!(
        depths,
        [
            (TokenKind::Function, 1),
            (TokenKind::OpenBracket, 2),
            (TokenKind::OpenBrace, 3),
            (TokenKind::Ident, 3),
            (TokenKind::CloseBrace, 2),
            (TokenKind::CloseBracket, 1),
            (TokenKind::CloseParen, 0),
            (TokenKind::Whitespace, 0),
            (TokenKind::Delim, 0),
        ]
    );
}

/// Backtracking must never leave a speculative block open.
#[test]
fn failed_lookahead_does_not_touch_blocks() {
    for input in &["@(", "-(", "1(", "#(", "\\\n(", "url( 'a'"] {
        let mut tokenizer = Tokenizer::new(input);
        let mut last_depth = 0;
        while let Some(Ok(token)) = tokenizer.next() {
            let expected = match token.kind {
                TokenKind::Function | TokenKind::OpenParen => last_depth + 1,
                _ => last_depth,
            };
            assert_eq!(tokenizer.depth(), expected, "{:?} in {:?}", token, input);
            last_depth = expected;
        }
        assert_eq!(tokenizer.depth(), 1, "{:?}", input);
    }
}

#[test]
fn token_kind_names() {
    let all = [
        TokenKind::Whitespace,
        TokenKind::Comment,
        TokenKind::Ident,
        TokenKind::Function,
        TokenKind::AtKeyword,
        TokenKind::Hash,
        TokenKind::String,
        TokenKind::BadString,
        TokenKind::Url,
        TokenKind::BadUrl,
        TokenKind::Number,
        TokenKind::Percentage,
        TokenKind::Dimension,
        TokenKind::Delim,
        TokenKind::Comma,
        TokenKind::Colon,
        TokenKind::Semicolon,
        TokenKind::OpenParen,
        TokenKind::CloseParen,
        TokenKind::OpenBracket,
        TokenKind::CloseBracket,
        TokenKind::OpenBrace,
        TokenKind::CloseBrace,
        TokenKind::CDO,
        TokenKind::CDC,
        TokenKind::Done,
        TokenKind::Error,
    ];
    for &kind in all.iter() {
        assert_eq!(TokenKind::from_name(kind.name()), Some(kind));
        assert_eq!(kind.to_string(), kind.name());
        assert_eq!(kind.is_bad(), kind == TokenKind::BadString || kind == TokenKind::BadUrl);
    }
    assert_eq!(TokenKind::from_name("Ident"), None);
    assert_eq!(TokenKind::from_name(""), None);
}

#[test]
fn serialization_reproduces_input() {
    let css = "@media screen {\r\n  a:hover > b[href^='x'] { color: #FFF; width: calc(100% - 2.5em) }\r\n}\x0C<!-- -->";
    let tokens = tokenize(css);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Done));
    let serialization = tokens.iter().map(|t| t.to_string()).collect::<String>();
    assert_eq!(serialization, preprocess(css));
}

fn tokens_until_end(input: &str) -> (String, Option<Error>) {
    let mut serialization = String::new();
    let mut tokenizer = Tokenizer::new(input);
    loop {
        match tokenizer.next_token() {
            Ok(token) if token.kind == TokenKind::Done => return (serialization, None),
            Ok(token) => serialization.push_str(&token.text),
            Err(error) => return (serialization, Some(error)),
        }
    }
}

proptest! {
    #[test]
    #[cfg_attr(feature = "skip_long_tests", ignore)]
    fn no_code_point_is_dropped_or_duplicated(
        input in r#"[ \t\r\n\x0C/*"'#()\[\]{},:;.<>!@\\+\-0-9a-zA-Z_%é€]{0,48}"#
    ) {
        let (serialization, error) = tokens_until_end(&input);
        let expected = preprocess(&input);
        if error.is_none() {
            prop_assert_eq!(serialization, expected);
        } else {
            prop_assert!(expected.starts_with(&serialization));
        }
    }

    #[test]
    #[cfg_attr(feature = "skip_long_tests", ignore)]
    fn any_string_round_trips(input in "\\PC{0,64}") {
        let (serialization, error) = tokens_until_end(&input);
        let expected = preprocess(&input);
        prop_assert!(expected.starts_with(&serialization));
        if error.is_none() {
            prop_assert_eq!(serialization, expected);
        }
    }

    #[test]
    #[cfg_attr(feature = "skip_long_tests", ignore)]
    fn whitespace_is_one_token(input in "[ \t\r\n\x0C]{1,32}") {
        let tokens = tokenize(&input);
        prop_assert_eq!(tokens, vec![
            Token::new(TokenKind::Whitespace, preprocess(&input)),
            Token::new(TokenKind::Done, ""),
        ]);
    }
}

#[cfg(feature = "bench")]
const BENCH_STYLESHEET: &str = "\
@import url(print.css) print;
/* A rule */
body > .content #main-title::before {
    content: '\\201C';
    margin: -0.5em 1e-3px +2% 0;
    background: url(data:image/png;base64,iVBORw0KGgo=) no-repeat;
    font-family: \"Helvetica Neue\", sans-serif;
}
<!-- a:not([href]) { color: #FFF } -->
";

#[cfg(feature = "bench")]
#[bench]
fn tokenize_stylesheet(b: &mut test::Bencher) {
    let input = BENCH_STYLESHEET.repeat(100);
    b.iter(|| {
        let mut tokenizer = Tokenizer::new(&input);
        let mut count = 0;
        while let Some(Ok(_)) = tokenizer.next() {
            count += 1;
        }
        test::black_box(count)
    });
}
