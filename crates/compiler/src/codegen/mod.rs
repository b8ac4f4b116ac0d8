//! Code generator (Component H, §4.6): three ordered passes over the
//! top-level forms — global slot allocation, function registration with a
//! sentinel `start_ip`, then emission (function bodies first, then
//! top-level statements, then an implicit call to `main` if one exists,
//! then halt).
//!
//! Step 2 before step 3 lets forward calls resolve to a known function
//! ordinal before any body is emitted; function-bodies-before-top-level in
//! step 3 means top-level code, which may call any function, always sees a
//! complete function table. It also means ip 0 is a function body rather
//! than the program's actual start, so step 3 records where top-level code
//! begins in `Chunk::entry_ip` for the VM to start from.
//!
//! Diagnostics this module emits (duplicate top-level declaration,
//! undefined identifier, call to an undefined function, `break`/`continue`
//! outside a loop) are tagged `Stage::Resolve`: they are symbol-resolution
//! facts, just ones the generator must catch on its own because the
//! advisory resolver (§4.5) can be skipped or may not have run.

use crate::ast::{FuncDecl, Program, StmtKind};
use nova_core::{Chunk, DiagnosticCollector, OpCode, Stage, Value, SENTINEL_IP};
use std::fmt;
use std::rc::Rc;

mod expr;
mod stmt;

/// A fatal, unrecoverable defect in the generated chunk. Everything else
/// the generator encounters (duplicate declarations, unknown callees,
/// misplaced `break`) is handled per §7's recovery policy: record a
/// diagnostic, emit a deterministic fallback, and keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeGenError {
    /// A jump-family instruction's target is still the sentinel, or points
    /// past the end of the instruction stream, after generation finished —
    /// a violation of the testable invariant in §8 ("every emitted jump
    /// operand is a valid instruction index by program start").
    UnresolvedJump { ip: usize },
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::UnresolvedJump { ip } => {
                write!(f, "instruction {ip} is a jump with an unresolved or out-of-range target")
            }
        }
    }
}

impl std::error::Error for CodeGenError {}

#[derive(Debug, Clone)]
struct VarEntry {
    name: String,
    slot: u32,
    scope_level: u32,
}

/// One enclosing loop's pending backpatch lists (§3 "Loop context"). `pop`
/// resolves `continue_target` against `continue_jumps` and the loop's exit
/// ip against `break_jumps`.
struct LoopCtx {
    continue_target: u32,
    break_jumps: Vec<usize>,
    continue_jumps: Vec<usize>,
}

pub struct CodeGen<'d> {
    chunk: Chunk,
    diagnostics: &'d mut DiagnosticCollector,
    file: Rc<str>,

    global_vars: Vec<VarEntry>,
    global_slot_counter: u32,

    locals: Vec<VarEntry>,
    local_slot_counter: u32,
    in_function: bool,

    scope_level: u32,
    loop_stack: Vec<LoopCtx>,
}

/// Run the three passes over `program` and return the resulting chunk.
pub fn generate(program: &Program, file: Rc<str>, diagnostics: &mut DiagnosticCollector) -> Result<Chunk, CodeGenError> {
    let mut r#gen = CodeGen::new(file, diagnostics);
    r#gen.global_allocation_pass(program);
    r#gen.function_registration_pass(program);
    r#gen.emit_top_level(program);

    for (ip, instr) in r#gen.chunk.instructions.iter().enumerate() {
        let is_jump = matches!(instr.op, OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue);
        if is_jump && instr.a as usize >= r#gen.chunk.instructions.len() {
            return Err(CodeGenError::UnresolvedJump { ip });
        }
    }
    Ok(r#gen.chunk)
}

impl<'d> CodeGen<'d> {
    fn new(file: Rc<str>, diagnostics: &'d mut DiagnosticCollector) -> Self {
        CodeGen {
            chunk: Chunk::new(),
            diagnostics,
            file,
            global_vars: Vec::new(),
            global_slot_counter: 0,
            locals: Vec::new(),
            local_slot_counter: 0,
            in_function: false,
            scope_level: 0,
            loop_stack: Vec::new(),
        }
    }

    fn loc(&self) -> nova_core::SourceLocation {
        nova_core::SourceLocation::synthetic(Rc::clone(&self.file))
    }

    /// Pass 1: assign a global slot to every direct top-level variable
    /// declaration, before any function body is emitted, so a function
    /// defined earlier in the source can still reference a global declared
    /// later.
    fn global_allocation_pass(&mut self, program: &Program) {
        for stmt in &program.top_level {
            if let StmtKind::VarDecl { name, .. } = &stmt.kind {
                self.declare_var(name, &stmt.location);
            }
        }
    }

    /// Pass 2: register every top-level function under a sentinel
    /// `start_ip` so call sites emitted before the function's own body can
    /// still resolve to its ordinal.
    fn function_registration_pass(&mut self, program: &Program) {
        for stmt in &program.top_level {
            if let StmtKind::FuncDecl(f) = &stmt.kind {
                if self.chunk.find_function(&f.name).is_some() {
                    self.diagnostics.error(Stage::Resolve, format!("function '{}' redeclared", f.name), f.location.clone());
                    continue;
                }
                self.chunk.add_function(&f.name, SENTINEL_IP, f.params.len() as u32);
            }
        }
    }

    /// Pass 3: function bodies, then top-level statements in source order
    /// (reusing the slots pass 1 already assigned to direct top-level
    /// declarations), then the implicit call to `main`, then halt.
    ///
    /// Function bodies are emitted before top-level code so that top-level
    /// statements see a complete function table (§4.6), which means ip 0 is
    /// the first function's body, not where execution should start.
    /// `chunk.entry_ip` is set to the ip where top-level code actually
    /// begins; the VM starts there instead of at ip 0.
    fn emit_top_level(&mut self, program: &Program) {
        for stmt in &program.top_level {
            if let StmtKind::FuncDecl(f) = &stmt.kind {
                self.emit_function(f);
            }
        }

        self.chunk.entry_ip = self.chunk.current_ip();

        for stmt in &program.top_level {
            match &stmt.kind {
                StmtKind::FuncDecl(_) => {}
                StmtKind::VarDecl { name, init, .. } => {
                    self.emit_toplevel_var_decl(name, init.as_ref(), &stmt.location);
                }
                _ => self.emit_stmt(stmt),
            }
        }

        if let Some(ord) = self.chunk.find_function("main") {
            let loc = self.loc();
            self.chunk.emit(OpCode::Call, ord, 0, loc.clone());
            self.chunk.emit(OpCode::Pop, 0, 0, loc);
        }
        let loc = self.loc();
        self.chunk.emit(OpCode::Halt, 0, 0, loc);
    }

    /// A direct top-level `VarDecl` already has a slot from pass 1; unlike
    /// the general statement path, this must not call `declare_var` again
    /// (that would report the declaration as redeclaring itself).
    fn emit_toplevel_var_decl(&mut self, name: &str, init: Option<&crate::ast::Expr>, loc: &nova_core::SourceLocation) {
        if let Some(init) = init {
            self.emit_expr(init);
        } else {
            let c = self.chunk.add_constant(Value::null());
            self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
        }
        let slot = self
            .global_vars
            .iter()
            .rev()
            .find(|v| v.name == name)
            .map(|v| v.slot)
            .unwrap_or_else(|| self.declare_var(name, loc));
        self.chunk.emit(OpCode::StoreGlobal, slot, 0, loc.clone());
    }

    fn emit_function(&mut self, f: &FuncDecl) {
        let ordinal = self.chunk.find_function(&f.name).unwrap_or_else(|| self.chunk.add_function(&f.name, SENTINEL_IP, f.params.len() as u32));
        let start_ip = self.chunk.current_ip();
        self.chunk.add_function(&f.name, start_ip, f.params.len() as u32);

        self.in_function = true;
        self.scope_level = 0;
        self.locals.clear();
        self.local_slot_counter = 0;
        for (i, p) in f.params.iter().enumerate() {
            self.locals.push(VarEntry { name: p.name.clone(), slot: i as u32, scope_level: 0 });
        }
        self.local_slot_counter = f.params.len() as u32;

        for stmt in &f.body {
            self.emit_stmt(stmt);
        }

        let ends_in_return = self.chunk.instructions.last().map(|i| i.op) == Some(OpCode::Return);
        if !ends_in_return {
            let loc = f.location.clone();
            let c = self.chunk.add_constant(Value::null());
            self.chunk.emit(OpCode::PushConst, c, 0, loc.clone());
            self.chunk.emit(OpCode::Return, 0, 0, loc);
        }

        if let Some(entry) = self.chunk.functions.get_mut(ordinal as usize) {
            entry.local_count = self.local_slot_counter;
        }

        self.in_function = false;
        self.locals.clear();
        self.local_slot_counter = 0;
        self.scope_level = 0;
    }

    fn resolve_var(&self, name: &str) -> Option<(bool, u32)> {
        if self.in_function {
            if let Some(e) = self.locals.iter().rev().find(|v| v.name == name) {
                return Some((false, e.slot));
            }
        }
        self.global_vars.iter().rev().find(|v| v.name == name).map(|e| (true, e.slot))
    }

    /// Declare `name` in the active table (locals if inside a function,
    /// globals otherwise) at the current scope level. A same-scope
    /// redeclaration is a diagnostic; the existing slot is reused as the
    /// deterministic fallback (§7).
    fn declare_var(&mut self, name: &str, loc: &nova_core::SourceLocation) -> u32 {
        if self.in_function {
            if let Some(existing) = self.locals.iter().find(|v| v.name == name && v.scope_level == self.scope_level) {
                self.diagnostics.error(Stage::Resolve, format!("'{name}' is already declared in this scope"), loc.clone());
                return existing.slot;
            }
            let slot = self.local_slot_counter;
            self.local_slot_counter += 1;
            self.locals.push(VarEntry { name: name.to_string(), slot, scope_level: self.scope_level });
            slot
        } else {
            if let Some(existing) = self.global_vars.iter().find(|v| v.name == name && v.scope_level == self.scope_level) {
                self.diagnostics.error(Stage::Resolve, format!("'{name}' is already declared at the top level"), loc.clone());
                return existing.slot;
            }
            let slot = self.global_slot_counter;
            self.global_slot_counter += 1;
            self.global_vars.push(VarEntry { name: name.to_string(), slot, scope_level: self.scope_level });
            slot
        }
    }

    /// Slots are never reused: exiting a block only hides the shadowed
    /// names from lookup (§4.6 "the generator does not compact").
    fn push_scope(&mut self) {
        self.scope_level += 1;
    }

    fn pop_scope(&mut self) {
        let level = self.scope_level;
        if self.in_function {
            self.locals.retain(|v| v.scope_level < level);
        } else {
            self.global_vars.retain(|v| v.scope_level < level);
        }
        self.scope_level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use nova_core::DiagnosticCollector;

    fn compile(src: &str) -> (Chunk, DiagnosticCollector) {
        let mut diags = DiagnosticCollector::new();
        let tokens = Lexer::new(src, Rc::from("t.nv")).tokenize(&mut diags);
        let program = Parser::new(tokens, &mut diags).parse_program();
        let chunk = generate(&program, Rc::from("t.nv"), &mut diags).expect("generation succeeds");
        (chunk, diags)
    }

    #[test]
    fn empty_program_is_just_halt() {
        let (chunk, _) = compile("");
        assert_eq!(chunk.instructions.len(), 1);
        assert_eq!(chunk.instructions[0].op, OpCode::Halt);
        assert_eq!(chunk.entry_ip, 0);
    }

    #[test]
    fn entry_ip_lands_past_every_function_body() {
        let (chunk, _) = compile("func void a(){ print(1); } func void b(){ print(2); }");
        for f in &chunk.functions {
            assert!(f.start_ip < chunk.entry_ip, "function body must sit before the entry ip");
        }
    }

    #[test]
    fn function_table_matches_declaration_count() {
        let (chunk, _) = compile("func void a(){} func void b(){}");
        assert_eq!(chunk.function_count(), 2);
    }

    #[test]
    fn forward_call_resolves_to_known_ordinal() {
        let (chunk, diags) = compile("func void main(){ helper(); } func void helper(){ print(1); }");
        assert!(!diags.has_errors());
        let main_ord = chunk.find_function("main").unwrap();
        let helper_ord = chunk.find_function("helper").unwrap();
        let main_body_start = chunk.function(main_ord).unwrap().start_ip;
        let call = &chunk.instructions[main_body_start as usize];
        assert_eq!(call.op, OpCode::Call);
        assert_eq!(call.a, helper_ord);
    }

    #[test]
    fn all_jump_targets_are_in_range() {
        let src = "Let i : Int = 0; while (i < 3) { if (i == 1) { continue; } print(i); i = i + 1; }";
        let (chunk, _) = compile(src);
        for instr in &chunk.instructions {
            if matches!(instr.op, OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue) {
                assert!((instr.a as usize) < chunk.instructions.len());
            }
        }
    }

    #[test]
    fn function_without_explicit_return_gets_one_appended() {
        let (chunk, _) = compile("func void a(){ print(1); }");
        let ord = chunk.find_function("a").unwrap();
        let start = chunk.function(ord).unwrap().start_ip as usize;
        let last = chunk.instructions[start..].iter().find(|i| i.op == OpCode::Return);
        assert!(last.is_some());
    }

    #[test]
    fn shadowing_a_global_inside_a_block_does_not_consume_a_new_global_slot() {
        let (chunk, diags) = compile("Let x : Int = 1; { Int x = 2; print(x); } print(x);");
        assert!(!diags.has_errors());
        assert_eq!(chunk.function_count(), 0);
    }

    #[test]
    fn undefined_callee_is_a_diagnostic_with_a_sentinel_fallback() {
        let (chunk, diags) = compile("mystery();");
        assert!(diags.has_errors());
        assert!(chunk.instructions.iter().any(|i| i.op == OpCode::Call && i.a == SENTINEL_IP));
    }

    #[test]
    fn break_outside_a_loop_is_a_diagnostic() {
        let (_, diags) = compile("break;");
        assert!(diags.has_errors());
    }
}
