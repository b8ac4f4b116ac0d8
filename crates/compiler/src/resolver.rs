//! Type/symbol resolver (Component G, §4.5): an advisory pass over the
//! syntax tree that only ever appends diagnostics — the tree is never
//! rewritten, and per spec the pipeline proceeds to code generation even
//! when this pass reports errors, unless the caller opts into
//! `--strict-types` (SPEC_FULL.md §4).
//!
//! Required checks: undefined identifier, redeclaration in the current
//! scope, function arity mismatch. Recommended: operator-type
//! compatibility, implemented here as a best-effort check over literals and
//! declared variable types (not a full type system — see `infer_type`).

use crate::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind};
use crate::types::TypeName;
use nova_core::{self, DiagnosticCollector, SourceLocation, Stage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct FuncSig {
    param_count: usize,
}

struct Scope {
    names: HashMap<String, TypeName>,
}

pub struct Resolver<'d> {
    diagnostics: &'d mut DiagnosticCollector,
    functions: HashMap<String, FuncSig>,
    scopes: Vec<Scope>,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d mut DiagnosticCollector) -> Self {
        Resolver { diagnostics, functions: HashMap::new(), scopes: vec![Scope { names: HashMap::new() }] }
    }

    pub fn check(&mut self, program: &Program) {
        self.collect_function_signatures(program);
        self.declare_top_level_vars(program);
        for stmt in &program.top_level {
            self.check_top_level_stmt(stmt);
        }
    }

    fn collect_function_signatures(&mut self, program: &Program) {
        for stmt in &program.top_level {
            if let StmtKind::FuncDecl(f) = &stmt.kind {
                if self.functions.contains_key(&f.name) {
                    self.diagnostics.error(Stage::Resolve, format!("function '{}' redeclared", f.name), f.location.clone());
                } else {
                    self.functions.insert(f.name.clone(), FuncSig { param_count: f.params.len() });
                }
            }
        }
    }

    /// Mirrors `collect_function_signatures`: pre-declare every direct
    /// top-level `VarDecl` name into the global scope before checking any
    /// function body, so a function that runs before the declaration in
    /// source order (but necessarily after it at runtime, since codegen
    /// allocates all top-level globals up front — see DESIGN.md) can still
    /// see it as a known identifier.
    fn declare_top_level_vars(&mut self, program: &Program) {
        for stmt in &program.top_level {
            if let StmtKind::VarDecl { name, ty, .. } = &stmt.kind {
                let scope = self.scopes.last_mut().expect("at least one scope");
                if scope.names.contains_key(name) {
                    self.diagnostics.error(Stage::Resolve, format!("'{name}' is already declared in this scope"), stmt.location.clone());
                } else {
                    scope.names.insert(name.clone(), ty.name);
                }
            }
        }
    }

    /// Top-level statements reuse `check_stmt` for everything except
    /// `VarDecl`: a top-level variable's name is already in scope from
    /// `declare_top_level_vars`, so only its initializer needs checking —
    /// routing it through `check_stmt`'s ordinary `declare` call would
    /// report it as redeclaring itself.
    fn check_top_level_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                if let Some(init) = init {
                    self.check_expr(init);
                    if let Some(actual) = self.infer_type(init) {
                        if !types_compatible_for_assign(ty.name, actual) {
                            self.diagnostics.warning(
                                Stage::Resolve,
                                format!("initializer for '{name}' has type {actual:?}, declared as {:?}", ty.name),
                                stmt.location.clone(),
                            );
                        }
                    }
                }
            }
            _ => self.check_stmt(stmt),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope { names: HashMap::new() });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: TypeName, loc: &SourceLocation) {
        let scope = self.scopes.last_mut().expect("at least one scope");
        if scope.names.contains_key(name) {
            self.diagnostics.error(Stage::Resolve, format!("'{name}' is already declared in this scope"), loc.clone());
        } else {
            scope.names.insert(name.to_string(), ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<TypeName> {
        self.scopes.iter().rev().find_map(|s| s.names.get(name).copied())
    }

    fn is_known(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.names.contains_key(name))
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.check_expr(e);
            }
            StmtKind::VarDecl { name, ty, init } => {
                if let Some(init) = init {
                    self.check_expr(init);
                    if let Some(actual) = self.infer_type(init) {
                        if !types_compatible_for_assign(ty.name, actual) {
                            self.diagnostics.warning(
                                Stage::Resolve,
                                format!("initializer for '{name}' has type {actual:?}, declared as {:?}", ty.name),
                                stmt.location.clone(),
                            );
                        }
                    }
                }
                self.declare(name, ty.name, &stmt.location);
            }
            StmtKind::Block(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.check_stmt(s);
                }
                self.pop_scope();
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.check_expr(cond);
                self.check_stmt(then_branch);
                if let Some(e) = else_branch {
                    self.check_stmt(e);
                }
            }
            StmtKind::While { cond, body } => {
                self.check_expr(cond);
                self.check_stmt(body);
            }
            StmtKind::For { init, cond, step, body } => {
                self.push_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_expr(cond);
                }
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.check_stmt(body);
                self.pop_scope();
            }
            StmtKind::Return(value) => {
                if let Some(v) = value {
                    self.check_expr(v);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Import(_) | StmtKind::Error => {}
            StmtKind::FuncDecl(f) => {
                self.push_scope();
                for p in &f.params {
                    self.declare(&p.name, p.ty.name, &f.location);
                }
                for s in &f.body {
                    self.check_stmt(s);
                }
                self.pop_scope();
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if !self.is_known(name) {
                    self.diagnostics.error(Stage::Resolve, format!("undefined identifier '{name}'"), expr.location.clone());
                }
            }
            ExprKind::Unary(_, inner) => self.check_expr(inner),
            ExprKind::Binary(op, l, r) => {
                self.check_expr(l);
                self.check_expr(r);
                self.check_operator_types(*op, l, r, &expr.location);
            }
            ExprKind::Logical(_, l, r) => {
                self.check_expr(l);
                self.check_expr(r);
            }
            ExprKind::Assign(target, value) => {
                self.check_expr(target);
                self.check_expr(value);
            }
            ExprKind::Index(base, index) => {
                self.check_expr(base);
                self.check_expr(index);
            }
            ExprKind::Call { callee, args, .. } => {
                for a in args {
                    self.check_expr(a);
                }
                self.check_call_arity(callee, args.len(), &expr.location);
            }
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::Error => {}
        }
    }

    fn check_call_arity(&mut self, callee: &str, argc: usize, loc: &SourceLocation) {
        if let Some(sig) = self.functions.get(callee) {
            if sig.param_count != argc {
                self.diagnostics.error(
                    Stage::Resolve,
                    format!("function '{callee}' expects {} argument(s), got {argc}", sig.param_count),
                    loc.clone(),
                );
            }
            return;
        }
        if let Some(b) = nova_core::find_builtin(callee) {
            if !b.arity.accepts(argc) {
                self.diagnostics.error(Stage::Resolve, format!("builtin '{callee}' called with {argc} argument(s)"), loc.clone());
            }
            return;
        }
        self.diagnostics.error(Stage::Resolve, format!("call to undefined function '{callee}'"), loc.clone());
    }

    /// Best-effort operand-type compatibility: only fires when both sides
    /// have a statically inferable type (literals and variables with a
    /// known declared type); says nothing when either side can't be
    /// inferred. Always a warning — this check never blocks codegen
    /// (§4.5: advisory).
    fn check_operator_types(&mut self, op: BinaryOp, l: &Expr, r: &Expr, loc: &SourceLocation) {
        let (Some(lt), Some(rt)) = (self.infer_type(l), self.infer_type(r)) else {
            return;
        };
        let numeric = |t: TypeName| matches!(t, TypeName::Int | TypeName::Float);
        let ok = match op {
            BinaryOp::Add => (lt == TypeName::String && rt == TypeName::String) || (numeric(lt) && numeric(rt)),
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => numeric(lt) && numeric(rt),
            BinaryOp::Equal | BinaryOp::NotEqual => true,
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => numeric(lt) && numeric(rt),
        };
        if !ok {
            self.diagnostics.warning(
                Stage::Resolve,
                format!("operator {op:?} not defined between {lt:?} and {rt:?}"),
                loc.clone(),
            );
        }
    }

    fn infer_type(&self, expr: &Expr) -> Option<TypeName> {
        match &expr.kind {
            ExprKind::IntLit(_) => Some(TypeName::Int),
            ExprKind::FloatLit(_) => Some(TypeName::Float),
            ExprKind::StringLit(_) => Some(TypeName::String),
            ExprKind::CharLit(_) => Some(TypeName::Char),
            ExprKind::BoolLit(_) => Some(TypeName::Bool),
            ExprKind::Identifier(name) => self.lookup(name),
            ExprKind::Unary(_, inner) => self.infer_type(inner),
            _ => None,
        }
    }
}

fn types_compatible_for_assign(declared: TypeName, actual: TypeName) -> bool {
    declared == actual || matches!((declared, actual), (TypeName::Float, TypeName::Int))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use std::rc::Rc;

    fn check(src: &str) -> DiagnosticCollector {
        let mut diags = DiagnosticCollector::new();
        let tokens = Lexer::new(src, Rc::from("t.nv")).tokenize(&mut diags);
        let program = Parser::new(tokens, &mut diags).parse_program();
        let mut resolver = Resolver::new(&mut diags);
        resolver.check(&program);
        diags
    }

    #[test]
    fn undefined_identifier_is_an_error() {
        let diags = check("print(undeclared);");
        assert!(diags.has_errors());
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        let diags = check("Int x = 1; Int x = 2;");
        assert!(diags.has_errors());
    }

    #[test]
    fn shadowing_in_nested_scope_is_allowed() {
        let diags = check("Int x = 1; { Int x = 2; print(x); }");
        assert!(!diags.has_errors());
    }

    #[test]
    fn function_arity_mismatch_is_an_error() {
        let diags = check("func Int add(a:Int, b:Int){ return a+b; } func void main(){ print(add(1)); }");
        assert!(diags.has_errors());
    }

    #[test]
    fn builtin_arity_is_checked() {
        let diags = check(r#"print("a", "b");"#);
        assert!(diags.has_errors());
    }

    #[test]
    fn forward_call_to_later_function_is_fine() {
        let diags = check("func void main(){ helper(); } func void helper(){ print(1); }");
        assert!(!diags.has_errors());
    }

    #[test]
    fn forward_reference_to_a_later_global_is_fine() {
        let diags = check("func void main(){ print(g); } Int g = 9;");
        assert!(!diags.has_errors());
    }
}
