//! Recursive-descent parser with Pratt-style precedence climbing (Component
//! F, §4.3). Token stream in, syntax tree out; newlines are already absent
//! from the stream (the tokenizer strips them), so the "newlines are
//! tolerated but transparent" contract needs no special handling here.
//!
//! Error strategy (§7): on a missing expected token, record a diagnostic at
//! the offending location and synthesize a placeholder — never abort.

use crate::ast::{BinaryOp, Expr, ExprKind, FuncDecl, LogicalOp, Param, Program, Stmt, StmtKind, UnaryOp};
use crate::token::{Token, TokenKind};
use crate::types::{TypeAnnotation, TypeName};
use nova_core::{DiagnosticCollector, SourceLocation, Stage};

pub struct Parser<'d> {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: &'d mut DiagnosticCollector,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'d mut DiagnosticCollector) -> Self {
        Parser { tokens, pos: 0, diagnostics }
    }

    pub fn parse_program(mut self) -> Program {
        let mut top_level = Vec::new();
        while !self.is_eof() {
            let before = self.pos;
            top_level.push(self.parse_statement());
            if self.pos == before {
                // Guarantee forward progress even if a rule matched zero
                // tokens (e.g. a stray token nothing recognizes).
                self.advance();
            }
        }
        Program { top_level }
    }

    // -- token cursor -----------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn loc(&self) -> SourceLocation {
        self.current().location.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_ident(&self) -> Option<&str> {
        self.current().ident_lexeme()
    }

    fn peek_ident_at(&self, offset: usize) -> Option<&str> {
        self.tokens.get(self.pos + offset).and_then(|t| t.ident_lexeme())
    }

    /// Consume a token matching `kind`, or record a diagnostic and leave
    /// the cursor where it is (the caller's `parse_program` forward-progress
    /// guard prevents infinite loops on repeated failures).
    fn expect(&mut self, kind: &TokenKind, what: &str) {
        if !self.matches(kind) {
            let loc = self.loc();
            self.diagnostics.error(Stage::Parse, format!("expected {what}"), loc);
        }
    }

    fn expect_identifier(&mut self, what: &str) -> String {
        if let Some(name) = self.current_ident() {
            let name = name.to_string();
            self.advance();
            name
        } else {
            let loc = self.loc();
            self.diagnostics.error(Stage::Parse, format!("expected {what}"), loc);
            String::new()
        }
    }

    // -- statements ---------------------------------------------------------

    fn parse_statement(&mut self) -> Stmt {
        let loc = self.loc();
        if self.current_ident() == Some("Let") {
            return self.parse_let_decl(loc);
        }
        if let Some(lexeme) = self.current_ident() {
            if TypeName::is_type_lexeme(lexeme) && self.peek_ident_at(1).is_some() {
                return self.parse_typed_decl(loc);
            }
        }
        match self.current_ident() {
            Some("func") => return self.parse_func_decl(loc),
            Some("if") => return self.parse_if(loc),
            Some("while") => return self.parse_while(loc),
            Some("for") => return self.parse_for(loc),
            Some("return") => return self.parse_return(loc),
            Some("break") => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';' after 'break'");
                return Stmt::new(StmtKind::Break, loc);
            }
            Some("continue") => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';' after 'continue'");
                return Stmt::new(StmtKind::Continue, loc);
            }
            Some("Import") => return self.parse_import(loc),
            _ => {}
        }
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let expr = self.parse_expression();
        self.expect(&TokenKind::Semicolon, "';' after expression");
        Stmt::new(StmtKind::Expr(expr), loc)
    }

    fn parse_block(&mut self) -> Stmt {
        let loc = self.loc();
        self.expect(&TokenKind::LBrace, "'{'");
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let before = self.pos;
            stmts.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(&TokenKind::RBrace, "'}'");
        Stmt::new(StmtKind::Block(stmts), loc)
    }

    fn parse_type_annotation(&mut self) -> TypeAnnotation {
        let lexeme = self.current_ident().unwrap_or("").to_string();
        let name = TypeName::from_lexeme(&lexeme).unwrap_or(TypeName::Void);
        if !lexeme.is_empty() {
            self.advance();
        } else {
            let loc = self.loc();
            self.diagnostics.error(Stage::Parse, "expected type name", loc);
        }
        let mut ty = TypeAnnotation::new(name);
        if let TokenKind::IntLiteral(n) = self.current().kind {
            if n == 32 || n == 64 {
                ty.bit_width = Some(n as u8);
                self.advance();
            }
        }
        if self.check(&TokenKind::LBracket) {
            self.advance();
            self.expect(&TokenKind::RBracket, "']'");
            ty.is_array = true;
        }
        ty
    }

    /// `Let name : Type = initializer?`
    fn parse_let_decl(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'Let'
        let name = self.expect_identifier("variable name");
        self.expect(&TokenKind::Colon, "':' after variable name");
        let ty = self.parse_type_annotation();
        let init = self.parse_optional_initializer();
        self.expect(&TokenKind::Semicolon, "';' after declaration");
        Stmt::new(StmtKind::VarDecl { name, ty, init }, loc)
    }

    /// `Type name = initializer?`
    fn parse_typed_decl(&mut self, loc: SourceLocation) -> Stmt {
        let ty = self.parse_type_annotation();
        let name = self.expect_identifier("variable name");
        let init = self.parse_optional_initializer();
        self.expect(&TokenKind::Semicolon, "';' after declaration");
        Stmt::new(StmtKind::VarDecl { name, ty, init }, loc)
    }

    fn parse_optional_initializer(&mut self) -> Option<Expr> {
        if self.matches(&TokenKind::Assign) {
            Some(self.parse_expression())
        } else {
            None
        }
    }

    fn parse_func_decl(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'func'
        let return_type = match self.current_ident() {
            Some(lexeme) if TypeName::is_type_lexeme(lexeme) => Some(self.parse_type_annotation()),
            _ => None,
        };
        let name = self.expect_identifier("function name");
        self.expect(&TokenKind::LParen, "'(' after function name");
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let pname = self.expect_identifier("parameter name");
                self.expect(&TokenKind::Colon, "':' after parameter name");
                let ty = self.parse_type_annotation();
                params.push(Param { name: pname, ty });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after parameters");
        let body = match self.parse_block().kind {
            StmtKind::Block(stmts) => stmts,
            _ => unreachable!("parse_block always returns a Block"),
        };
        Stmt::new(StmtKind::FuncDecl(FuncDecl { name, return_type, params, body, location: loc.clone() }), loc)
    }

    fn parse_if(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'if'
        self.expect(&TokenKind::LParen, "'(' after 'if'");
        let cond = self.parse_expression();
        self.expect(&TokenKind::RParen, "')' after condition");
        let then_branch = Box::new(self.parse_block());
        let else_branch = if self.current_ident() == Some("else") {
            self.advance();
            if self.current_ident() == Some("if") {
                let loc = self.loc();
                Some(Box::new(self.parse_if(loc)))
            } else {
                Some(Box::new(self.parse_block()))
            }
        } else {
            None
        };
        Stmt::new(StmtKind::If { cond, then_branch, else_branch }, loc)
    }

    fn parse_while(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'while'
        self.expect(&TokenKind::LParen, "'(' after 'while'");
        let cond = self.parse_expression();
        self.expect(&TokenKind::RParen, "')' after condition");
        let body = Box::new(self.parse_block());
        Stmt::new(StmtKind::While { cond, body }, loc)
    }

    fn parse_for(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'for'
        self.expect(&TokenKind::LParen, "'(' after 'for'");
        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_for_clause_init()))
        };
        self.expect(&TokenKind::Semicolon, "';' after for-init");
        let cond = if self.check(&TokenKind::Semicolon) { None } else { Some(self.parse_expression()) };
        self.expect(&TokenKind::Semicolon, "';' after for-condition");
        let step = if self.check(&TokenKind::RParen) { None } else { Some(self.parse_expression()) };
        self.expect(&TokenKind::RParen, "')' after for-clauses");
        let body = Box::new(self.parse_block());
        Stmt::new(StmtKind::For { init, cond, step, body }, loc)
    }

    /// The for-loop init clause may be a declaration or a bare expression,
    /// but never consumes the separating `;` itself (the caller does).
    fn parse_for_clause_init(&mut self) -> Stmt {
        let loc = self.loc();
        if self.current_ident() == Some("Let") {
            self.advance();
            let name = self.expect_identifier("variable name");
            self.expect(&TokenKind::Colon, "':' after variable name");
            let ty = self.parse_type_annotation();
            let init = self.parse_optional_initializer();
            return Stmt::new(StmtKind::VarDecl { name, ty, init }, loc);
        }
        if let Some(lexeme) = self.current_ident() {
            if TypeName::is_type_lexeme(lexeme) && self.peek_ident_at(1).is_some() {
                let ty = self.parse_type_annotation();
                let name = self.expect_identifier("variable name");
                let init = self.parse_optional_initializer();
                return Stmt::new(StmtKind::VarDecl { name, ty, init }, loc);
            }
        }
        let expr = self.parse_expression();
        Stmt::new(StmtKind::Expr(expr), loc)
    }

    fn parse_return(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'return'
        let value = if self.check(&TokenKind::Semicolon) { None } else { Some(self.parse_expression()) };
        self.expect(&TokenKind::Semicolon, "';' after return value");
        Stmt::new(StmtKind::Return(value), loc)
    }

    fn parse_import(&mut self, loc: SourceLocation) -> Stmt {
        self.advance(); // 'Import'
        self.expect(&TokenKind::Lt, "'<' after 'Import'");
        let mut path = vec![self.expect_identifier("module name")];
        while self.matches(&TokenKind::Dot) {
            path.push(self.expect_identifier("module segment"));
        }
        self.expect(&TokenKind::Gt, "'>' closing import");
        self.expect(&TokenKind::Semicolon, "';' after import");
        Stmt::new(StmtKind::Import(path), loc)
    }

    // -- expressions: precedence climbing, low to high -----------------------

    fn parse_expression(&mut self) -> Expr {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Expr {
        let loc = self.loc();
        let left = self.parse_logical_or();
        if self.check(&TokenKind::Assign) {
            self.advance();
            let value = self.parse_assignment(); // right-associative
            if !left.is_assignable() {
                self.diagnostics.error(Stage::Parse, "left side of assignment must be a variable or index expression", loc.clone());
            }
            return Expr::new(ExprKind::Assign(Box::new(left), Box::new(value)), loc);
        }
        left
    }

    fn parse_logical_or(&mut self) -> Expr {
        let mut left = self.parse_logical_and();
        while self.check(&TokenKind::OrOr) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_logical_and();
            left = Expr::new(ExprKind::Logical(LogicalOp::Or, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_logical_and(&mut self) -> Expr {
        let mut left = self.parse_equality();
        while self.check(&TokenKind::AndAnd) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_equality();
            left = Expr::new(ExprKind::Logical(LogicalOp::And, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_equality(&mut self) -> Expr {
        let mut left = self.parse_comparison();
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinaryOp::Equal,
                TokenKind::NotEq => BinaryOp::NotEqual,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_comparison();
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_comparison(&mut self) -> Expr {
        let mut left = self.parse_additive();
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Less,
                TokenKind::LtEq => BinaryOp::LessEqual,
                TokenKind::Gt => BinaryOp::Greater,
                TokenKind::GtEq => BinaryOp::GreaterEqual,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_additive();
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_multiplicative();
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_unary();
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), loc);
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        let loc = self.loc();
        match self.current().kind {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary();
                Expr::new(ExprKind::Unary(UnaryOp::Negate, Box::new(operand)), loc)
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary();
                Expr::new(ExprKind::Unary(UnaryOp::Not, Box::new(operand)), loc)
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let loc = self.loc();
        let mut expr = self.parse_primary();
        loop {
            if self.check(&TokenKind::LParen) {
                let callee = match &expr.kind {
                    ExprKind::Identifier(name) => name.clone(),
                    _ => {
                        self.diagnostics.error(Stage::Parse, "call target must be a function name", loc.clone());
                        String::new()
                    }
                };
                expr = self.parse_call(callee, loc.clone());
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expression();
                self.expect(&TokenKind::RBracket, "']' after index expression");
                expr = Expr::new(ExprKind::Index(Box::new(expr), Box::new(index)), loc.clone());
            } else {
                break;
            }
        }
        expr
    }

    /// `f ( args? )`, with the formatted-print colon form (§4.3, §9): if
    /// `callee == "printf"` and the token right after the first argument is
    /// `:`, the rest of the arguments follow the colon instead of a comma.
    fn parse_call(&mut self, callee: String, loc: SourceLocation) -> Expr {
        self.advance(); // '('
        let mut args = Vec::new();
        let mut colon_mode = false;
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expression());
            if callee == "printf" && self.check(&TokenKind::Colon) {
                colon_mode = true;
                self.advance();
                if !self.check(&TokenKind::RParen) {
                    args.push(self.parse_expression());
                    while self.matches(&TokenKind::Comma) {
                        args.push(self.parse_expression());
                    }
                }
            } else {
                while self.matches(&TokenKind::Comma) {
                    args.push(self.parse_expression());
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after arguments");
        Expr::new(ExprKind::Call { callee, args, colon_mode }, loc)
    }

    fn parse_primary(&mut self) -> Expr {
        let loc = self.loc();
        let tok = self.advance();
        match tok.kind {
            TokenKind::IntLiteral(n) => Expr::new(ExprKind::IntLit(n), loc),
            TokenKind::FloatLiteral(f) => Expr::new(ExprKind::FloatLit(f), loc),
            TokenKind::StringLiteral(s) => Expr::new(ExprKind::StringLit(s), loc),
            TokenKind::CharLiteral(c) => Expr::new(ExprKind::CharLit(c), loc),
            TokenKind::True => Expr::new(ExprKind::BoolLit(true), loc),
            TokenKind::False => Expr::new(ExprKind::BoolLit(false), loc),
            TokenKind::Identifier(name) => Expr::new(ExprKind::Identifier(name), loc),
            TokenKind::LParen => {
                let inner = self.parse_expression();
                self.expect(&TokenKind::RParen, "')' after expression");
                inner
            }
            _ => {
                self.diagnostics.error(Stage::Parse, "expected an expression", loc.clone());
                Expr::new(ExprKind::Error, loc)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use std::rc::Rc;

    fn parse(src: &str) -> (Program, DiagnosticCollector) {
        let mut diags = DiagnosticCollector::new();
        let tokens = Lexer::new(src, Rc::from("t.nv")).tokenize(&mut diags);
        let program = Parser::new(tokens, &mut diags).parse_program();
        (program, diags)
    }

    #[test]
    fn let_declaration_roundtrips() {
        let (program, diags) = parse(r#"Let s : String = "hello";"#);
        assert!(!diags.has_errors());
        assert_eq!(program.top_level.len(), 1);
        match &program.top_level[0].kind {
            StmtKind::VarDecl { name, ty, init } => {
                assert_eq!(name, "s");
                assert_eq!(ty.name, TypeName::String);
                assert!(init.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_declaration_form() {
        let (program, diags) = parse("Int x = 7;");
        assert!(!diags.has_errors());
        match &program.top_level[0].kind {
            StmtKind::VarDecl { name, ty, .. } => {
                assert_eq!(name, "x");
                assert_eq!(ty.name, TypeName::Int);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_declaration_not_confused_with_call_expression() {
        // `print` is not a type lexeme, so this must parse as an expression
        // statement, not a declaration.
        let (program, diags) = parse("print(1);");
        assert!(!diags.has_errors());
        assert!(matches!(program.top_level[0].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn precedence_climbs_correctly() {
        let (program, _) = parse("1 + 2 * 3;");
        let StmtKind::Expr(e) = &program.top_level[0].kind else { panic!() };
        match &e.kind {
            ExprKind::Binary(BinaryOp::Add, l, r) => {
                assert!(matches!(l.kind, ExprKind::IntLit(1)));
                assert!(matches!(r.kind, ExprKind::Binary(BinaryOp::Multiply, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative_and_low_precedence() {
        let (program, diags) = parse("a = b = 1 + 2;");
        assert!(!diags.has_errors());
        let StmtKind::Expr(e) = &program.top_level[0].kind else { panic!() };
        assert!(matches!(e.kind, ExprKind::Assign(_, _)));
    }

    #[test]
    fn printf_colon_syntax() {
        let (program, diags) = parse(r#"printf("%s is %d\n": "x", 7);"#);
        assert!(!diags.has_errors());
        let StmtKind::Expr(e) = &program.top_level[0].kind else { panic!() };
        match &e.kind {
            ExprKind::Call { callee, args, colon_mode } => {
                assert_eq!(callee, "printf");
                assert!(colon_mode);
                assert_eq!(args.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn printf_comma_form_accepted_same_as_colon() {
        let (program, diags) = parse(r#"printf("hi"); "#);
        assert!(!diags.has_errors());
        assert!(matches!(program.top_level[0].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn function_declaration_with_void_return() {
        let (program, diags) = parse("func void main() { return; }");
        assert!(!diags.has_errors());
        match &program.top_level[0].kind {
            StmtKind::FuncDecl(f) => {
                assert_eq!(f.name, "main");
                assert!(f.return_type.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_declaration_with_typed_return_and_params() {
        let (program, diags) = parse("func Int add(a:Int, b:Int){ return a+b; }");
        assert!(!diags.has_errors());
        match &program.top_level[0].kind {
            StmtKind::FuncDecl(f) => {
                assert_eq!(f.return_type.as_ref().unwrap().name, TypeName::Int);
                assert_eq!(f.params.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn for_loop_with_declaration_init() {
        let (program, diags) = parse("for (Int i = 0; i < 3; i = i + 1) { print(i); }");
        assert!(!diags.has_errors());
        assert!(matches!(program.top_level[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn missing_semicolon_is_a_diagnostic_not_a_panic() {
        let (program, diags) = parse("Let x : Int = 1");
        assert!(diags.has_errors());
        assert_eq!(program.top_level.len(), 1);
    }

    #[test]
    fn index_chains_left_to_right() {
        let (program, diags) = parse("a[0][1];");
        assert!(!diags.has_errors());
        let StmtKind::Expr(e) = &program.top_level[0].kind else { panic!() };
        assert!(matches!(e.kind, ExprKind::Index(_, _)));
    }

    #[test]
    fn import_has_no_runtime_effect_but_parses() {
        let (program, diags) = parse("Import <std.io>;");
        assert!(!diags.has_errors());
        match &program.top_level[0].kind {
            StmtKind::Import(path) => assert_eq!(path, &vec!["std".to_string(), "io".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
