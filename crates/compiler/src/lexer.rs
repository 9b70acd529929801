//! Lexer (spec §4.1).
//!
//! Produces tokens for keywords, identifiers, numeric literals (with
//! optional suffix), string literals (flagged when any byte >= 0x80),
//! operators, punctuation, and structural newlines. Keywords match
//! case-insensitively. Conceptually the lexer is a lazy stream - `next`
//! produces the next token - with no generator machinery required (§9);
//! `tokenize` is a thin convenience that drains the stream into a `Vec`
//! for the parser, the way the teacher's `Parser::new` calls a module-level
//! `tokenize(source)` up front.

use fbasic_core::{DiagnosticSink, ErrorKind, SourceLocation};
use std::path::PathBuf;

use crate::token::{Keyword, NumericLiteral, Suffix, Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a [u8],
    file: PathBuf,
    pos: usize,
    line: usize,
    column: usize,
}

/// Operators and punctuation, longest-match-first so `<=` is not lexed as
/// `<` followed by `=`.
const OPERATORS: &[&str] = &[
    "<=", ">=", "<>", "><", "=", "<", ">", "+", "-", "*", "/", "\\", "^",
    "(", ")", ",", ";", ":", ".",
];

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: PathBuf) -> Self {
        Lexer {
            source: source.as_bytes(),
            file,
            pos: 0,
            line: 0,
            column: 0,
        }
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            self.advance();
        }
    }

    /// Produces the next token, guaranteeing monotonic source positions:
    /// every call either advances `pos` or returns `Eof`.
    pub fn next(&mut self, sink: &mut DiagnosticSink) -> Token {
        self.skip_inline_whitespace();
        let start = self.loc();

        let Some(b) = self.peek() else {
            return Token::new(TokenKind::Eof, start);
        };

        if b == b'\n' {
            self.advance();
            return Token::new(TokenKind::Newline, start);
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.lex_number(start);
        }

        if b == b'"' {
            return self.lex_string(start, sink);
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            return self.lex_identifier_or_keyword(start);
        }

        for op in OPERATORS {
            if self.matches_literal(op) {
                for _ in 0..op.len() {
                    self.advance();
                }
                return Token::new(TokenKind::Op(op), start);
            }
        }

        sink.error(
            ErrorKind::Lex,
            start.clone(),
            format!("unknown character '{}'", b as char),
        );
        self.advance();
        self.next(sink)
    }

    fn matches_literal(&self, text: &str) -> bool {
        let bytes = text.as_bytes();
        if self.pos + bytes.len() > self.source.len() {
            return false;
        }
        &self.source[self.pos..self.pos + bytes.len()] == bytes
    }

    fn lex_identifier_or_keyword(&mut self, start: SourceLocation) -> Token {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        // A trailing type-suffix character is part of the identifier's
        // spelling (spec §6.1): `TRIM$`, `count%`, `total#`.
        if let Some(c) = self.peek() {
            if Suffix::from_char(c as char).is_some() {
                self.advance();
            }
        }
        let text = String::from_utf8_lossy(&self.source[begin..self.pos]).into_owned();

        if let Some(kw) = Keyword::lookup(&text) {
            return Token::new(TokenKind::Keyword(kw), start);
        }
        Token::new(TokenKind::Identifier(text), start)
    }

    fn lex_number(&mut self, start: SourceLocation) -> Token {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos]).unwrap_or("0");

        let suffix = self.peek().and_then(|c| Suffix::from_char(c as char));
        // A decimal point or the `!`/`#` suffix marks a float literal
        // (spec §4.3: "SINGLE/DOUBLE literals are recognised by !/# suffix
        // or decimal point").
        if matches!(suffix, Some(Suffix::Single) | Some(Suffix::Double)) {
            is_float = true;
        }
        if suffix.is_some() {
            self.advance();
        }

        let literal = if is_float {
            NumericLiteral::Float(text.parse().unwrap_or(0.0))
        } else {
            NumericLiteral::Integer(text.parse().unwrap_or(0))
        };
        Token::new(TokenKind::Number(literal, suffix), start)
    }

    fn lex_string(&mut self, start: SourceLocation, sink: &mut DiagnosticSink) -> Token {
        self.advance(); // opening quote
        let mut text = String::new();
        let mut raw_bytes: Vec<u8> = Vec::new();
        let mut closed = false;
        while let Some(b) = self.peek() {
            if b == b'"' {
                // `""` inside a string is an escaped quote.
                if self.peek_at(1) == Some(b'"') {
                    self.advance();
                    self.advance();
                    text.push('"');
                    raw_bytes.push(b'"');
                    continue;
                }
                self.advance();
                closed = true;
                break;
            }
            if b == b'\n' {
                break;
            }
            self.advance();
            raw_bytes.push(b);
        }
        if !closed {
            sink.error(ErrorKind::Lex, start.clone(), "unterminated string literal");
        }
        // Bytes >= 0x80 mark a literal as non-ASCII (spec §3.1, §6.1),
        // independent of whether they form valid UTF-8 on their own.
        let has_non_ascii = raw_bytes.iter().any(|b| *b >= 0x80);
        if text.is_empty() && !raw_bytes.is_empty() {
            text = String::from_utf8_lossy(&raw_bytes).into_owned();
        }
        Token::new(
            TokenKind::StringLiteral { text, has_non_ascii },
            start,
        )
    }
}

/// Drains a `Lexer` into a `Vec<Token>`, used by the parser the way the
/// teacher's `Parser::new` calls a module-level `tokenize`.
pub fn tokenize(source: &str, file: PathBuf, sink: &mut DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer::new(source, file);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next(sink);
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> (Vec<Token>, DiagnosticSink) {
        let mut sink = DiagnosticSink::new();
        let tokens = tokenize(src, PathBuf::from("t.bas"), &mut sink);
        (tokens, sink)
    }

    #[test]
    fn suffixed_identifier_keeps_suffix_in_spelling() {
        let (tokens, _) = lex_all("TRIM$");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Identifier("TRIM$".to_string())
        );
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let (tokens, _) = lex_all("print If wHiLe");
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Print));
        assert_eq!(tokens[1].kind, TokenKind::Keyword(Keyword::If));
        assert_eq!(tokens[2].kind, TokenKind::Keyword(Keyword::While));
    }

    #[test]
    fn string_literal_flags_non_ascii_bytes() {
        let (tokens, _) = lex_all("\"hi 🌍\"");
        match &tokens[0].kind {
            TokenKind::StringLiteral { has_non_ascii, .. } => assert!(*has_non_ascii),
            other => panic!("expected string literal, got {other:?}"),
        }
        let (tokens, _) = lex_all("\"hi\"");
        match &tokens[0].kind {
            TokenKind::StringLiteral { has_non_ascii, .. } => assert!(!*has_non_ascii),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let (_, sink) = lex_all("\"unterminated");
        assert!(sink.has_errors());
        assert_eq!(sink.iter().next().unwrap().kind.code(), "LEX");
    }

    #[test]
    fn numeric_suffix_selects_float_vs_integer() {
        let (tokens, _) = lex_all("3.14 10% 2.5! 7#");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Number(NumericLiteral::Float(3.14), None)
        );
        assert_eq!(
            tokens[1].kind,
            TokenKind::Number(NumericLiteral::Integer(10), Some(Suffix::Integer))
        );
        assert_eq!(
            tokens[2].kind,
            TokenKind::Number(NumericLiteral::Float(2.5), Some(Suffix::Single))
        );
        assert_eq!(
            tokens[3].kind,
            TokenKind::Number(NumericLiteral::Float(7.0), Some(Suffix::Double))
        );
    }

    #[test]
    fn positions_are_monotonic() {
        let (tokens, _) = lex_all("LET x = 1\nLET y = 2");
        let mut last = (0usize, 0usize);
        for t in &tokens {
            let pos = (t.location.line, t.location.column);
            assert!(pos >= last, "token positions must be monotonic");
            last = pos;
        }
    }
}
