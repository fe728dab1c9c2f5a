pub mod token;

use crate::error::ScanError;
use crate::keywords::keyword;
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use log::debug;
use std::time::Instant;

/// Converts source text into tokens, always terminated by exactly one `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScanError> {
    let started = Instant::now();
    let tokens = Scanner::new(source).scan_tokens()?;
    debug!(
        "tokenized {} chars into {} tokens in {:?}",
        source.chars().count(),
        tokens.len(),
        started.elapsed()
    );
    Ok(tokens)
}

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
}

impl Scanner {
    pub fn new(source: impl Into<String>) -> Self {
        Scanner {
            source: source.into().chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, ScanError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        let eof_span = Span {
            line: self.line,
            col: self.current - self.line_start + 1,
            length: 0,
        };
        self.tokens.push(Token::new(TokenType::Eof, "", eof_span));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            ':' => self.add_token(TokenType::Colon),
            ';' => self.add_token(TokenType::Semicolon),

            '+' => {
                let t = if self.match_char('+') {
                    TokenType::PlusPlus
                } else if self.match_char('=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                };
                self.add_token(t);
            }
            '-' => {
                let t = if self.match_char('-') {
                    TokenType::MinusMinus
                } else if self.match_char('=') {
                    TokenType::MinusEqual
                } else {
                    TokenType::Minus
                };
                self.add_token(t);
            }
            '*' => {
                let t = if self.match_char('=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                };
                self.add_token(t);
            }
            '%' => {
                let t = if self.match_char('=') {
                    TokenType::PercentEqual
                } else {
                    TokenType::Percent
                };
                self.add_token(t);
            }
            '/' => {
                if self.match_char('=') {
                    self.add_token(TokenType::SlashEqual);
                } else if self.match_char('/') {
                    // Comment goes until end of line
                    while !matches!(self.peek(), Some('\n') | Some('\r') | None) {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            // One or two character tokens
            '?' => {
                let t = if self.match_char('?') {
                    TokenType::Nullish
                } else {
                    TokenType::Question
                };
                self.add_token(t);
            }
            '!' => {
                let t = if self.match_char('=') {
                    TokenType::NotEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(t);
            }
            '=' => {
                let t = if self.match_char('=') {
                    TokenType::Equal
                } else {
                    TokenType::Assign
                };
                self.add_token(t);
            }
            '>' => {
                let t = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(t);
            }
            '<' => {
                let t = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(t);
            }

            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.line_start = self.current;
            }

            '"' => self.handle_string()?,
            c if c.is_ascii_digit() => self.handle_number()?,
            c if c.is_alphabetic() => self.handle_identifier(),

            _ => return Err(self.error_at(self.start, c, "unrecognized character")),
        }
        Ok(())
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn handle_string(&mut self) -> Result<(), ScanError> {
        // Strings may span lines, so pin the span to the opening quote
        let opening = self.span_from_start();

        while self.peek().is_some_and(|c| c != '"') {
            if self.advance() == '\n' {
                self.line += 1;
                self.line_start = self.current;
            }
        }

        if self.is_at_end() {
            return Err(ScanError {
                span: Span {
                    length: 1,
                    ..opening
                },
                found: '"',
                message: "unterminated string literal".into(),
            });
        }

        self.advance(); // closing quote
        let text: String = self.source[self.start + 1..self.current - 1].iter().collect();
        let span = Span {
            length: self.current - self.start,
            ..opening
        };
        self.tokens.push(Token::new(TokenType::String, text, span));
        Ok(())
    }

    fn handle_number(&mut self) -> Result<(), ScanError> {
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c == '.' {
                if seen_dot {
                    return Err(self.error_at(
                        self.current,
                        c,
                        "numeric literal has more than one decimal point",
                    ));
                }
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            self.advance();
        }

        self.add_token(TokenType::Number);
        Ok(())
    }

    fn handle_identifier(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_alphabetic() || c.is_ascii_digit())
        {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn span_from_start(&self) -> Span {
        Span {
            line: self.line,
            col: self.start - self.line_start + 1,
            length: self.current - self.start,
        }
    }

    fn add_token(&mut self, t: TokenType) {
        let text: String = self.source[self.start..self.current].iter().collect();
        let span = self.span_from_start();
        self.tokens.push(Token::new(t, text, span));
    }

    fn error_at(&self, position: usize, found: char, message: &str) -> ScanError {
        ScanError {
            span: Span {
                line: self.line,
                col: position - self.line_start + 1,
                length: 1,
            },
            found,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<Token> {
        tokenize(source).unwrap()
    }

    fn token_types(source: &str) -> Vec<TokenType> {
        scan(source).iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn scan_basic_tokens() {
        assert_eq!(
            token_types("let x = 5;"),
            vec![
                TokenType::Let,
                TokenType::Identifier,
                TokenType::Assign,
                TokenType::Number,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn empty_source_is_just_eof() {
        let tokens = scan("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::Eof);
    }

    #[test]
    fn exactly_one_eof_at_the_end() {
        let tokens = scan("print(1) // trailing comment");
        let eofs = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::Eof)
            .count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::Eof));
    }

    #[test]
    fn multi_character_operators_are_greedy() {
        assert_eq!(
            token_types("?? != >= <= ++ -- += -= *= /= %= =="),
            vec![
                TokenType::Nullish,
                TokenType::NotEqual,
                TokenType::GreaterEqual,
                TokenType::LessEqual,
                TokenType::PlusPlus,
                TokenType::MinusMinus,
                TokenType::PlusEqual,
                TokenType::MinusEqual,
                TokenType::StarEqual,
                TokenType::SlashEqual,
                TokenType::PercentEqual,
                TokenType::Equal,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn single_character_operators() {
        assert_eq!(
            token_types("? ! = > < + - * / %"),
            vec![
                TokenType::Question,
                TokenType::Bang,
                TokenType::Assign,
                TokenType::Greater,
                TokenType::Less,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Star,
                TokenType::Slash,
                TokenType::Percent,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_emits_nothing() {
        assert_eq!(
            token_types("// hello\n5 // world"),
            vec![TokenType::Number, TokenType::Eof]
        );
    }

    #[test]
    fn keywords_are_reclassified() {
        assert_eq!(
            token_types("let const function async return while for if break"),
            vec![
                TokenType::Let,
                TokenType::Const,
                TokenType::Function,
                TokenType::Async,
                TokenType::Return,
                TokenType::While,
                TokenType::For,
                TokenType::If,
                TokenType::Break,
                TokenType::Eof,
            ]
        );
        assert_eq!(
            token_types("new extends this class public private super"),
            vec![
                TokenType::New,
                TokenType::Extends,
                TokenType::This,
                TokenType::Class,
                TokenType::Public,
                TokenType::Private,
                TokenType::Super,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn true_false_null_are_identifiers() {
        assert_eq!(
            token_types("true false null"),
            vec![
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn identifiers_continue_with_digits() {
        let tokens = scan("abc123 x2y");
        assert_eq!(tokens[0].value, "abc123");
        assert_eq!(tokens[1].value, "x2y");
    }

    #[test]
    fn numbers_allow_one_decimal_point() {
        let tokens = scan("3.14 42");
        assert_eq!(tokens[0].token_type, TokenType::Number);
        assert_eq!(tokens[0].value, "3.14");
        assert_eq!(tokens[1].value, "42");
    }

    #[test]
    fn string_value_excludes_quotes() {
        let tokens = scan("\"hello world\"");
        assert_eq!(tokens[0].token_type, TokenType::String);
        assert_eq!(tokens[0].value, "hello world");
        assert_eq!(tokens[0].span.length, 13);
    }

    #[test]
    fn positions_track_line_and_column() {
        let tokens = scan("let x\n  = 5");
        assert_eq!((tokens[0].span.line, tokens[0].span.col), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.col), (1, 5));
        assert_eq!((tokens[2].span.line, tokens[2].span.col), (2, 3));
        assert_eq!((tokens[3].span.line, tokens[3].span.col), (2, 5));
    }

    #[test]
    fn error_on_unterminated_string() {
        let err = tokenize("let s = \"oops").unwrap_err();
        assert_eq!(err.found, '"');
        assert_eq!((err.span.line, err.span.col), (1, 9));
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn error_on_second_decimal_point() {
        let err = tokenize("1.2.3").unwrap_err();
        assert_eq!(err.found, '.');
        assert_eq!(err.span.col, 4);
        assert!(err.message.contains("more than one decimal point"));
    }

    #[test]
    fn error_on_unrecognized_character() {
        let err = tokenize("let a = 1;\nlet b = #;").unwrap_err();
        assert_eq!(err.found, '#');
        assert_eq!((err.span.line, err.span.col), (2, 9));
    }

    #[test]
    fn underscore_is_not_an_identifier_character() {
        assert!(tokenize("my_var").is_err());
    }

    #[test]
    fn retokenizing_joined_values_gives_same_kinds() {
        let source = "let a = (b + c) * d[e] / f.g; print(a, { h: 1 });";
        let tokens = scan(source);
        let joined = tokens
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let original: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(token_types(&joined), original);
    }
}
