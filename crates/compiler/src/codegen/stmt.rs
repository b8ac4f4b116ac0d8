//! Statement and control-flow emission (§4.6). `if`/`while`/`for` follow
//! the backpatch algorithms given there exactly; `break`/`continue` record
//! a pending jump in the innermost `LoopCtx` rather than resolving their
//! target immediately.

use super::{CodeGen, LoopCtx};
use crate::ast::{Stmt, StmtKind};
use nova_core::{OpCode, SourceLocation, Stage, Value, SENTINEL_IP};

impl<'d> CodeGen<'d> {
    pub(super) fn emit_stmt(&mut self, stmt: &Stmt) {
        let loc = stmt.location.clone();
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.emit_expr(e);
                self.chunk.emit(OpCode::Pop, 0, 0, loc);
            }
            StmtKind::VarDecl { name, init, .. } => self.emit_local_var_decl(name, init.as_ref(), &loc),
            StmtKind::Block(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.emit_stmt(s);
                }
                self.pop_scope();
            }
            StmtKind::If { cond, then_branch, else_branch } => self.emit_if(cond, then_branch, else_branch.as_deref(), &loc),
            StmtKind::While { cond, body } => self.emit_while(cond, body, &loc),
            StmtKind::For { init, cond, step, body } => self.emit_for(init.as_deref(), cond.as_ref(), step.as_ref(), body, &loc),
            StmtKind::Return(value) => {
                match value {
                    Some(v) => self.emit_expr(v),
                    None => {
                        let c = self.chunk.add_constant(Value::null());
                        self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
                    }
                }
                self.chunk.emit(OpCode::Return, 0, 0, loc);
            }
            StmtKind::Break => self.emit_loop_exit_jump(&loc, true),
            StmtKind::Continue => self.emit_loop_exit_jump(&loc, false),
            StmtKind::FuncDecl(f) => {
                self.diagnostics.error(Stage::Resolve, format!("nested function declaration '{}' is not supported", f.name), loc);
            }
            StmtKind::Import(_) | StmtKind::Error => {}
        }
    }

    fn emit_local_var_decl(&mut self, name: &str, init: Option<&crate::ast::Expr>, loc: &SourceLocation) {
        match init {
            Some(init) => self.emit_expr(init),
            None => {
                let c = self.chunk.add_constant(Value::null());
                self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
            }
        }
        let slot = self.declare_var(name, loc);
        let store = if self.in_function { OpCode::StoreLocal } else { OpCode::StoreGlobal };
        self.chunk.emit(store, slot, 0, loc.clone());
    }

    fn emit_if(&mut self, cond: &crate::ast::Expr, then_branch: &Stmt, else_branch: Option<&Stmt>, loc: &SourceLocation) {
        self.emit_expr(cond);
        let jf = self.chunk.emit(OpCode::JumpIfFalse, SENTINEL_IP, 0, loc.clone());
        self.emit_stmt(then_branch);
        match else_branch {
            Some(else_b) => {
                let j = self.chunk.emit(OpCode::Jump, SENTINEL_IP, 0, loc.clone());
                let else_ip = self.chunk.current_ip();
                self.chunk.patch(jf, else_ip);
                self.emit_stmt(else_b);
                let end_ip = self.chunk.current_ip();
                self.chunk.patch(j, end_ip);
            }
            None => {
                let end_ip = self.chunk.current_ip();
                self.chunk.patch(jf, end_ip);
            }
        }
    }

    fn emit_while(&mut self, cond: &crate::ast::Expr, body: &Stmt, loc: &SourceLocation) {
        let loop_start = self.chunk.current_ip();
        self.emit_expr(cond);
        let jf = self.chunk.emit(OpCode::JumpIfFalse, SENTINEL_IP, 0, loc.clone());

        self.loop_stack.push(LoopCtx { continue_target: loop_start, break_jumps: Vec::new(), continue_jumps: Vec::new() });
        self.emit_stmt(body);
        self.chunk.emit(OpCode::Jump, loop_start, 0, loc.clone());

        let end_ip = self.chunk.current_ip();
        self.chunk.patch(jf, end_ip);
        self.finish_loop(end_ip);
    }

    fn emit_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&crate::ast::Expr>,
        step: Option<&crate::ast::Expr>,
        body: &Stmt,
        loc: &SourceLocation,
    ) {
        self.push_scope();
        if let Some(init) = init {
            self.emit_stmt(init);
        }

        let loop_start = self.chunk.current_ip();
        let jf = cond.map(|c| {
            self.emit_expr(c);
            self.chunk.emit(OpCode::JumpIfFalse, SENTINEL_IP, 0, loc.clone())
        });

        self.loop_stack.push(LoopCtx { continue_target: loop_start, break_jumps: Vec::new(), continue_jumps: Vec::new() });
        self.emit_stmt(body);

        let step_ip = self.chunk.current_ip();
        if let Some(step) = step {
            self.emit_expr(step);
            self.chunk.emit(OpCode::Pop, 0, 0, loc.clone());
        }
        if let Some(ctx) = self.loop_stack.last_mut() {
            ctx.continue_target = step_ip;
        }
        self.chunk.emit(OpCode::Jump, loop_start, 0, loc.clone());

        let end_ip = self.chunk.current_ip();
        if let Some(jf) = jf {
            self.chunk.patch(jf, end_ip);
        }
        self.finish_loop(end_ip);
        self.pop_scope();
    }

    fn finish_loop(&mut self, end_ip: u32) {
        let ctx = self.loop_stack.pop().expect("a loop context was pushed by the caller");
        for b in ctx.break_jumps {
            self.chunk.patch(b, end_ip);
        }
        for c in ctx.continue_jumps {
            self.chunk.patch(c, ctx.continue_target);
        }
    }

    fn emit_loop_exit_jump(&mut self, loc: &SourceLocation, is_break: bool) {
        let j = self.chunk.emit(OpCode::Jump, SENTINEL_IP, 0, loc.clone());
        match self.loop_stack.last_mut() {
            Some(ctx) => {
                if is_break {
                    ctx.break_jumps.push(j);
                } else {
                    ctx.continue_jumps.push(j);
                }
            }
            None => {
                let what = if is_break { "break" } else { "continue" };
                self.diagnostics.error(Stage::Resolve, format!("'{what}' outside any loop"), loc.clone());
            }
        }
    }
}
