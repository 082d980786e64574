use core_types::LineIndex;
use parser::lexer::{TemplatePart, TokenValue};
use parser::{Keyword, Lexer, Punctuator, TokenKind};
use proptest::prelude::*;

#[test]
fn test_tokenize_simple_statement() {
    let tokens = Lexer::tokenize("var answer = 42;").unwrap();
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Keyword(Keyword::Var),
            TokenKind::Identifier,
            TokenKind::Punctuator(Punctuator::Assign),
            TokenKind::Number,
            TokenKind::Punctuator(Punctuator::Semicolon),
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokens_report_line_and_column() {
    let tokens = Lexer::tokenize("a\n  bb").unwrap();
    assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    assert!(tokens[1].newline_before);
}

#[test]
fn test_bad_unicode_escape_leaves_template_closed() {
    for (source, raw) in [("tag`a\\u{z`", "a\\u{z"), ("tag`\\u{`", "\\u{")] {
        let tokens = Lexer::tokenize(source).unwrap();
        assert_eq!(tokens.len(), 3, "{}", source);
        assert_eq!(tokens[1].kind, TokenKind::Template(TemplatePart::NoSubstitution));
        assert_eq!(
            tokens[1].value,
            TokenValue::Template {
                cooked: None,
                raw: raw.to_string(),
            }
        );
    }
}

#[test]
fn test_unterminated_template_is_syntax_error() {
    let err = Lexer::tokenize("`abc").unwrap_err();
    assert_eq!(err.kind, core_types::ErrorKind::SyntaxError);
}

proptest! {
    #[test]
    fn lexer_never_panics(source in "\\PC{0,64}") {
        let _ = Lexer::tokenize(&source);
    }

    #[test]
    fn token_spans_cover_their_text(source in "[a-z0-9 \n+*=;(){}.,<>!&|?:-]{0,48}") {
        if let Ok(tokens) = Lexer::tokenize(&source) {
            let lines = LineIndex::new(&source);
            let mut previous_end = 0;
            for token in &tokens {
                prop_assert_eq!(token.span.slice(&source), token.text);
                prop_assert!(token.span.start >= previous_end);
                let position = lines.position(token.span.start);
                prop_assert_eq!((token.line, token.column), (position.line, position.column));
                previous_end = token.span.end;
            }
            prop_assert!(tokens.last().map(|t| t.is_eof()).unwrap_or(false));
        }
    }
}
