//! Syntax tree (Component D). Tagged nodes for declarations, statements,
//! and expressions, each carrying the source location of its leading
//! token so the resolver and code generator can anchor diagnostics.

use crate::types::TypeAnnotation;
use nova_core::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    CharLit(u8),
    BoolLit(bool),
    Identifier(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    /// `target = value`. `target` is constrained by the parser to an
    /// `Identifier` or `Index` node (§4.3).
    Assign(Box<Expr>, Box<Expr>),
    /// `callee(args)`, or `callee(format : args)` when `colon_mode` is set
    /// (the formatted-print colon syntax, §4.3/§9).
    Call { callee: String, args: Vec<Expr>, colon_mode: bool },
    Index(Box<Expr>, Box<Expr>),
    /// A placeholder emitted by the parser's error-recovery policy (§7):
    /// "insert a placeholder node and continue; never throw."
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Expr { kind, location }
    }

    /// Whether this expression is a legal assignment target (§4.3: "only
    /// valid when the left side is an identifier or index access").
    pub fn is_assignable(&self) -> bool {
        matches!(self.kind, ExprKind::Identifier(_) | ExprKind::Index(_, _))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub return_type: Option<TypeAnnotation>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    /// Either declaration form from §4.3 (`Let name : Type = init?` or
    /// `Type name = init?`) — both collapse into this one syntactic
    /// category, as the spec requires.
    VarDecl { name: String, ty: TypeAnnotation, init: Option<Expr> },
    Block(Vec<Stmt>),
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Box<Stmt> },
    Return(Option<Expr>),
    Break,
    Continue,
    FuncDecl(FuncDecl),
    /// `Import < identifier (. identifier)? >` — retained with no runtime
    /// effect (§4.3).
    Import(Vec<String>),
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Stmt { kind, location }
    }
}

/// The whole program: top-level variable declarations, function
/// declarations, imports, and bare statements, in source order — the code
/// generator makes three passes over this list (§4.6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub top_level: Vec<Stmt>,
}
