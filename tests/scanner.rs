#[cfg(test)]
mod scanner_tests {
    use rlox::scanner::*;
    use rlox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
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
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var foo = fun_ifx while",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "fun_ifx"),
                (TokenType::WHILE, "while"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_whitespace() {
        assert_token_sequence(
            "var a; // the rest is ignored\nprint a;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::PRINT, "print"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_literal_payloads() {
        let scanner = Scanner::new(b"\"hi there\" 42 3.25");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi there"),
            other => panic!("expected string literal, got {:?}", other),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 42.0),
            ref other => panic!("expected number literal, got {:?}", other),
        }

        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.25),
            ref other => panic!("expected number literal, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_06_line_tracking() {
        let scanner = Scanner::new(b"var a;\nvar b;\n\nvar c;");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let lines: Vec<usize> = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::VAR)
            .map(|t| t.line)
            .collect();

        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_unexpected_chars_do_not_stop_the_stream() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            let rendered = err.to_string();
            assert!(
                rendered.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                rendered
            );
        }
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = scan_tokens(b"var a = \"oops");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated string."));

        // The tokens before the bad literal are still delivered.
        assert_eq!(tokens[0].token_type, TokenType::VAR);
        assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[2].token_type, TokenType::EQUAL);
    }

    fn assert_token_matches(
        result: &Result<Token, rlox::error::LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }
}
