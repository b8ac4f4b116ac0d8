//! Token stream contract (Component E's output, Component F's input).
//!
//! The tokenizer is an external collaborator per spec §1 — this is still a
//! full implementation (§ "Supplemental features" in SPEC_FULL.md), just one
//! the parser only depends on at this narrow interface.

use nova_core::SourceLocation;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    CharLiteral(u8),
    True,
    False,
    Identifier(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Assign,

    /// An error token: the tokenizer's recovery policy (§7) is "emit an
    /// error token and advance", never abort.
    Error(String),

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Token { kind, location }
    }

    /// The raw lexeme for identifiers, used by the parser's type-name
    /// lookahead (§4.3) and by call-site resolution. `None` for anything
    /// that isn't an identifier.
    pub fn ident_lexeme(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
