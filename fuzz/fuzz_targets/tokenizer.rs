#![no_main]

use css_tokenizer::*;

const DEBUG: bool = false;

fn fuzz(data: &str) {
    let expected = preprocess(data);
    let mut serialization = String::new();
    let mut tokenizer = Tokenizer::new(data);
    let finished = loop {
        match tokenizer.next_token() {
            Ok(token) if token.kind == TokenKind::Done => break true,
            Ok(token) => {
                if DEBUG {
                    println!("{:?}", token);
                }
                assert!(!token.text.is_empty(), "Empty {} token", token.kind);
                serialization.push_str(&token.text);
            }
            Err(error) => {
                if DEBUG {
                    println!("{}", error);
                }
                break false;
            }
        }
    };
    if finished {
        assert_eq!(tokenizer.depth(), 0);
        assert_eq!(serialization, expected, "Tokens should cover the whole input");
    } else {
        assert!(expected.starts_with(&serialization), "Tokens should be a prefix of the input");
    }
}

libfuzzer_sys::fuzz_target!(|data: &str| {
    fuzz(data);
});
