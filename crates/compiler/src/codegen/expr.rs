//! Expression emission: strictly post-order (operands first, then the
//! operator), per §4.6. Every expression, once emitted, leaves exactly one
//! value on the stack — including assignment, whose store opcodes consume
//! the right-hand side, so assignment re-loads the stored slot to give
//! `a = b = 1` a well-defined value and to let `emit_stmt`'s expression-
//! statement case always close with a single, uniform `pop`.

use super::CodeGen;
use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
use nova_core::{OpCode, Stage, Value};

impl<'d> CodeGen<'d> {
    pub(super) fn emit_expr(&mut self, expr: &Expr) {
        let loc = expr.location.clone();
        match &expr.kind {
            ExprKind::IntLit(n) => {
                let c = self.chunk.add_constant(Value::int(*n));
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
            ExprKind::FloatLit(f) => {
                let c = self.chunk.add_constant(Value::float(*f));
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
            ExprKind::StringLit(s) => {
                let c = self.chunk.add_constant(Value::string_copy(s));
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
            ExprKind::CharLit(ch) => {
                let c = self.chunk.add_constant(Value::char(*ch));
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
            ExprKind::BoolLit(b) => {
                let c = self.chunk.add_constant(Value::bool(*b));
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
            ExprKind::Identifier(name) => self.emit_identifier_load(name, &loc),
            ExprKind::Unary(op, inner) => {
                self.emit_expr(inner);
                let op = match op {
                    UnaryOp::Negate => OpCode::Negate,
                    UnaryOp::Not => OpCode::Not,
                };
                self.chunk.emit(op, 0, 0, loc);
            }
            ExprKind::Binary(op, l, r) => {
                self.emit_expr(l);
                self.emit_expr(r);
                self.chunk.emit(binary_opcode(*op), 0, 0, loc);
            }
            ExprKind::Logical(op, l, r) => {
                self.emit_expr(l);
                self.emit_expr(r);
                let op = match op {
                    LogicalOp::And => OpCode::And,
                    LogicalOp::Or => OpCode::Or,
                };
                self.chunk.emit(op, 0, 0, loc);
            }
            ExprKind::Assign(target, value) => self.emit_assign(target, value, &loc),
            ExprKind::Index(base, index) => {
                self.emit_expr(base);
                self.emit_expr(index);
                self.chunk.emit(OpCode::ArrayGet, 0, 0, loc);
            }
            ExprKind::Call { callee, args, .. } => self.emit_call(callee, args, &loc),
            ExprKind::Error => {
                let c = self.chunk.add_constant(Value::null());
                self.chunk.emit(OpCode::PushConst, c, 0, loc);
            }
        }
    }

    fn emit_identifier_load(&mut self, name: &str, loc: &nova_core::SourceLocation) {
        match self.resolve_var(name) {
            Some((true, slot)) => {
                self.chunk.emit(OpCode::LoadGlobal, slot, 0, loc.clone());
            }
            Some((false, slot)) => {
                self.chunk.emit(OpCode::LoadLocal, slot, 0, loc.clone());
            }
            None => {
                self.diagnostics.error(Stage::Resolve, format!("undefined identifier '{name}'"), loc.clone());
                let c = self.chunk.add_constant(Value::null());
                self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
            }
        }
    }

    fn emit_assign(&mut self, target: &Expr, value: &Expr, loc: &nova_core::SourceLocation) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                self.emit_expr(value);
                match self.resolve_var(name) {
                    Some((true, slot)) => {
                        self.chunk.emit(OpCode::StoreGlobal, slot, 0, loc.clone());
                        self.chunk.emit(OpCode::LoadGlobal, slot, 0, loc.clone());
                    }
                    Some((false, slot)) => {
                        self.chunk.emit(OpCode::StoreLocal, slot, 0, loc.clone());
                        self.chunk.emit(OpCode::LoadLocal, slot, 0, loc.clone());
                    }
                    None => {
                        self.diagnostics.error(Stage::Resolve, format!("assignment to undefined identifier '{name}'"), loc.clone());
                        // The right-hand side is already on the stack; leave it
                        // as this expression's value rather than unbalancing
                        // the stack with a store that has nowhere to go.
                    }
                }
            }
            ExprKind::Index(base, index) => {
                self.emit_expr(base);
                self.emit_expr(index);
                self.emit_expr(value);
                self.chunk.emit(OpCode::ArraySet, 0, 0, loc.clone());
            }
            _ => {
                self.diagnostics.error(Stage::Resolve, "left side of assignment is not assignable".to_string(), loc.clone());
                let c = self.chunk.add_constant(Value::null());
                self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
            }
        }
    }

    fn emit_call(&mut self, callee: &str, args: &[Expr], loc: &nova_core::SourceLocation) {
        for a in args {
            self.emit_expr(a);
        }
        let argc = args.len() as u32;
        if let Some(b) = nova_core::find_builtin(callee) {
            self.chunk.emit(OpCode::CallBuiltin, b.id, argc, loc.clone());
        } else if let Some(ord) = self.chunk.find_function(callee) {
            self.chunk.emit(OpCode::Call, ord, argc, loc.clone());
        } else {
            self.diagnostics.error(Stage::Resolve, format!("call to undefined function '{callee}'"), loc.clone());
            self.chunk.emit(OpCode::Call, nova_core::SENTINEL_IP, argc, loc.clone());
        }
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Subtract => OpCode::Subtract,
        BinaryOp::Multiply => OpCode::Multiply,
        BinaryOp::Divide => OpCode::Divide,
        BinaryOp::Modulo => OpCode::Modulo,
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::NotEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEqual,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEqual,
    }
}
