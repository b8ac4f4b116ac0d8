//! Tokenizer (Component E).
//!
//! Source bytes → a flat token stream terminated by `Eof`. Newlines are
//! treated as ordinary whitespace: the spec's "newlines are tolerated but
//! transparent" contract (§4.3) is satisfied here rather than by emitting
//! newline tokens the parser then has to skip — simpler, and a newline
//! token with no consumer anywhere in the grammar would just be dead
//! weight (see DESIGN.md).
//!
//! Recovery policy (§7): on an unrecognized character or unterminated
//! literal, push an error diagnostic, emit `TokenKind::Error`, and keep
//! scanning. The tokenizer never aborts.

use crate::token::{Token, TokenKind};
use nova_core::{DiagnosticCollector, SourceLocation, Stage};
use std::rc::Rc;

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    file: Rc<str>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: Rc<str>) -> Self {
        Lexer { source: source.as_bytes(), pos: 0, line: 1, column: 1, file }
    }

    pub fn tokenize(mut self, diagnostics: &mut DiagnosticCollector) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token(diagnostics);
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(Rc::clone(&self.file), self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self, diagnostics: &mut DiagnosticCollector) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'#') => {
                    self.skip_block_comment(diagnostics);
                }
                _ => break,
            }
        }
    }

    /// `/# ... #/`, nestable.
    fn skip_block_comment(&mut self, diagnostics: &mut DiagnosticCollector) {
        let start = self.loc();
        self.advance(); // '/'
        self.advance(); // '#'
        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'/'), Some(b'#')) => {
                    self.advance();
                    self.advance();
                    depth += 1;
                }
                (Some(b'#'), Some(b'/')) => {
                    self.advance();
                    self.advance();
                    depth -= 1;
                }
                (Some(_), _) => {
                    self.advance();
                }
                (None, _) => {
                    diagnostics.error(Stage::Token, "unterminated block comment", start);
                    return;
                }
            }
        }
    }

    fn next_token(&mut self, diagnostics: &mut DiagnosticCollector) -> Token {
        self.skip_whitespace_and_comments(diagnostics);
        let start = self.loc();
        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, start);
        };

        if c.is_ascii_digit() {
            return self.scan_number(start);
        }
        if c == b'_' || c.is_ascii_alphabetic() {
            return self.scan_identifier(start);
        }
        if c == b'"' {
            return self.scan_string(start, diagnostics);
        }
        if c == b'\'' {
            return self.scan_char(start, diagnostics);
        }

        self.advance();
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::EqEq
            }
            b'=' => TokenKind::Assign,
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::NotEq
            }
            b'!' => TokenKind::Bang,
            b'<' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::LtEq
            }
            b'<' => TokenKind::Lt,
            b'>' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::GtEq
            }
            b'>' => TokenKind::Gt,
            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                TokenKind::AndAnd
            }
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                TokenKind::OrOr
            }
            other => {
                let msg = format!("unexpected character '{}'", other as char);
                diagnostics.error(Stage::Token, msg.clone(), start.clone());
                TokenKind::Error(msg)
            }
        };
        Token::new(kind, start)
    }

    fn scan_number(&mut self, start: SourceLocation) -> Token {
        let begin = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos]).unwrap_or("0");
        let kind = if is_float {
            TokenKind::FloatLiteral(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::IntLiteral(text.parse().unwrap_or(0))
        };
        Token::new(kind, start)
    }

    fn scan_identifier(&mut self, start: SourceLocation) -> Token {
        let begin = self.pos;
        while self.peek().is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos]).unwrap_or("");
        let kind = match text {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(text.to_string()),
        };
        Token::new(kind, start)
    }

    fn decode_escape(&mut self, diagnostics: &mut DiagnosticCollector, at: &SourceLocation) -> Option<u8> {
        match self.advance() {
            Some(b'n') => Some(b'\n'),
            Some(b't') => Some(b'\t'),
            Some(b'r') => Some(b'\r'),
            Some(b'\\') => Some(b'\\'),
            Some(b'"') => Some(b'"'),
            Some(b'\'') => Some(b'\''),
            Some(b'0') => Some(0),
            Some(other) => {
                diagnostics.error(Stage::Token, format!("unknown escape '\\{}'", other as char), at.clone());
                Some(other)
            }
            None => {
                diagnostics.error(Stage::Token, "unterminated escape sequence", at.clone());
                None
            }
        }
    }

    fn scan_string(&mut self, start: SourceLocation, diagnostics: &mut DiagnosticCollector) -> Token {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    let at = self.loc();
                    self.advance();
                    if let Some(b) = self.decode_escape(diagnostics, &at) {
                        bytes.push(b);
                    }
                }
                Some(c) => {
                    bytes.push(c);
                    self.advance();
                }
                None => {
                    diagnostics.error(Stage::Token, "unterminated string literal", start.clone());
                    let msg = "unterminated string literal".to_string();
                    return Token::new(TokenKind::Error(msg), start);
                }
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Token::new(TokenKind::StringLiteral(text), start)
    }

    fn scan_char(&mut self, start: SourceLocation, diagnostics: &mut DiagnosticCollector) -> Token {
        self.advance(); // opening quote
        let value = match self.peek() {
            Some(b'\\') => {
                let at = self.loc();
                self.advance();
                self.decode_escape(diagnostics, &at).unwrap_or(0)
            }
            Some(c) => {
                self.advance();
                c
            }
            None => {
                diagnostics.error(Stage::Token, "unterminated char literal", start.clone());
                return Token::new(TokenKind::Error("unterminated char literal".to_string()), start);
            }
        };
        if self.peek() == Some(b'\'') {
            self.advance();
        } else {
            diagnostics.error(Stage::Token, "unterminated char literal", start.clone());
        }
        Token::new(TokenKind::CharLiteral(value), start)
    }
}
