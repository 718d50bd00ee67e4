use rulox as lox;

use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn test_scanner_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_one_and_two_char_operators() {
    assert_token_sequence(
        "! != = == < <= > >= /",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::SLASH, "/"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_line_comment_runs_to_newline() {
    assert_token_sequence(
        "var x; // the rest is ignored ====\nx",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_keywords_and_identifiers() {
    assert_token_sequence(
        "class klass fun fungus var variable _under score99",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "klass"),
            (TokenType::FUN, "fun"),
            (TokenType::IDENTIFIER, "fungus"),
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "variable"),
            (TokenType::IDENTIFIER, "_under"),
            (TokenType::IDENTIFIER, "score99"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_number_literals() {
    let tokens: Vec<Token> = Scanner::new(b"12 12.5 7.")
        .filter_map(Result::ok)
        .collect();

    assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 12.0));
    assert_eq!(tokens[0].lexeme, "12");

    assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 12.5));
    assert_eq!(tokens[1].lexeme, "12.5");

    // A trailing dot is not part of the number.
    assert!(matches!(tokens[2].token_type, TokenType::NUMBER(n) if n == 7.0));
    assert_eq!(tokens[2].lexeme, "7");
    assert_eq!(tokens[3].token_type, TokenType::DOT);
}

#[test]
fn test_scanner_string_literal_keeps_quotes_in_lexeme() {
    let tokens: Vec<Token> = Scanner::new(b"\"hello\"").filter_map(Result::ok).collect();

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "hello"),
        other => panic!("expected string token, got {:?}", other),
    }
    assert_eq!(tokens[0].lexeme, "\"hello\"");
}

#[test]
fn test_scanner_multiline_string_counts_lines() {
    let tokens: Vec<Token> = Scanner::new(b"\"a\nb\" x").filter_map(Result::ok).collect();

    // The string token carries its opening line.
    assert_eq!(tokens[0].line, 1);

    // Whatever follows is past the embedded newline.
    assert_eq!(tokens[1].lexeme, "x");
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn test_scanner_unterminated_string_reports_opening_line() {
    let results: Vec<_> = Scanner::new(b"\n\"abc\ndef").collect();

    let error = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("expected a lex error");

    assert_eq!(error.to_string(), "[line 2] Error: Unterminated string.");
}

#[test]
fn test_scanner_unexpected_characters_do_not_stop_the_iterator() {
    let results: Vec<_> = Scanner::new(b",.$(#").collect();

    // COMMA, DOT, error($), LEFT_PAREN, error(#), EOF
    assert_eq!(results.len(), 6);

    let error_count = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(error_count, 2);

    for error in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            error.to_string().contains("Unexpected character"),
            "unexpected message: {}",
            error
        );
    }

    let tokens: Vec<&Token> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(tokens[0].token_type, TokenType::COMMA);
    assert_eq!(tokens[1].token_type, TokenType::DOT);
    assert_eq!(tokens[2].token_type, TokenType::LEFT_PAREN);
    assert_eq!(tokens[3].token_type, TokenType::EOF);
}

#[test]
fn test_scanner_line_numbers_advance() {
    let tokens: Vec<Token> = Scanner::new(b"a\nb\n\nc").filter_map(Result::ok).collect();

    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
    assert_eq!(tokens[2].line, 4);
}

#[test]
fn test_scanner_lexemes_reproduce_source() {
    let source = "var answer = 6 * 7;";
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    let rebuilt: String = tokens
        .iter()
        .filter(|t| t.token_type != TokenType::EOF)
        .map(|t| t.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    assert_eq!(rebuilt, "var answer = 6 * 7 ;");
}
