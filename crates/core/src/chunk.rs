//! Bytecode chunk (Component B): an append-only instruction array, constant
//! pool, and function table. Written only during code generation; read-only
//! during execution (§3).

use crate::diagnostics::SourceLocation;
use crate::value::Value;

/// Sentinel used for a function entry whose `start_ip` is not yet known
/// (first pass of two-pass function registration, §4.6) and for jump
/// operands the code generator could not resolve (e.g. a call to an unknown
/// function, §4.6 "Call emission").
pub const SENTINEL_IP: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    PushConst,
    Pop,
    LoadLocal,
    StoreLocal,
    LoadGlobal,
    StoreGlobal,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
    Not,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Jump,
    JumpIfFalse,
    JumpIfTrue,
    Call,
    Return,
    Halt,
    CallBuiltin,
    ToInt,
    ToFloat,
    ToString,
    Concat,
    /// Reserved per spec §9 "Reserved array opcodes": allocated but this
    /// core never emits them, and the VM reports "not implemented" if one
    /// is ever encountered.
    ArrayNew,
    ArrayGet,
    ArraySet,
}

/// An opcode plus its two operands and the source location that produced it
/// (used to anchor runtime-error diagnostics back to source text).
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: OpCode,
    pub a: u32,
    pub b: u32,
    pub location: SourceLocation,
}

/// `{name, start_ip, param_count, local_count}` per §3. `start_ip` may be
/// `SENTINEL_IP` until the second code-generation pass patches it;
/// `local_count` is finalized after the body is emitted.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub start_ip: u32,
    pub param_count: u32,
    pub local_count: u32,
}

#[derive(Debug, Default)]
pub struct Chunk {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    pub functions: Vec<FunctionEntry>,
    /// Where the VM starts executing. Function bodies are emitted before
    /// top-level code (§4.6, so top-level statements always see a complete
    /// function table), so ip 0 is almost never where a program should
    /// actually begin; this is the ip the generator lands on once every
    /// function body has been emitted. Defaults to 0, which is correct for
    /// a chunk with no functions.
    pub entry_ip: u32,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Append an instruction, returning its index (the ip a backpatch will
    /// later target via `patch`).
    pub fn emit(&mut self, op: OpCode, a: u32, b: u32, location: SourceLocation) -> usize {
        self.instructions.push(Instruction { op, a, b, location });
        self.instructions.len() - 1
    }

    /// Overwrite an already-emitted instruction's first operand. Used to
    /// backpatch jump targets once the destination ip is known (§9
    /// "Backpatch").
    pub fn patch(&mut self, idx: usize, new_a: u32) {
        self.instructions[idx].a = new_a;
    }

    pub fn current_ip(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Deep-copy a string value into the pool so the pool owns its storage
    /// independent of whatever produced it; return the constant's ordinal.
    /// Non-string values are inserted as given (there is nothing to copy).
    pub fn add_constant(&mut self, v: Value) -> u32 {
        let v = match v {
            Value::String(s) => Value::string_copy(&s),
            other => other,
        };
        self.constants.push(v);
        (self.constants.len() - 1) as u32
    }

    pub fn constant(&self, ordinal: u32) -> &Value {
        &self.constants[ordinal as usize]
    }

    /// Register a function entry, or update an existing one (matched by
    /// name) that is still carrying the sentinel `start_ip` from the
    /// registration pass. Returns the function's ordinal.
    pub fn add_function(&mut self, name: &str, start_ip: u32, param_count: u32) -> u32 {
        if let Some(idx) = self.functions.iter().position(|f| f.name == name) {
            if start_ip != SENTINEL_IP {
                self.functions[idx].start_ip = start_ip;
            }
            return idx as u32;
        }
        self.functions.push(FunctionEntry {
            name: name.to_string(),
            start_ip,
            param_count,
            local_count: 0,
        });
        (self.functions.len() - 1) as u32
    }

    pub fn find_function(&self, name: &str) -> Option<u32> {
        self.functions.iter().position(|f| f.name == name).map(|i| i as u32)
    }

    pub fn function(&self, ordinal: u32) -> Option<&FunctionEntry> {
        self.functions.get(ordinal as usize)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::synthetic(Rc::from("t.nv"))
    }

    #[test]
    fn add_function_preserves_start_ip_when_sentinel_passed() {
        let mut c = Chunk::new();
        let ord = c.add_function("add", 42, 2);
        assert_eq!(c.add_function("add", SENTINEL_IP, 2), ord);
        assert_eq!(c.function(ord).unwrap().start_ip, 42);
    }

    #[test]
    fn add_function_updates_start_ip_on_second_pass() {
        let mut c = Chunk::new();
        let ord = c.add_function("add", SENTINEL_IP, 2);
        c.add_function("add", 99, 2);
        assert_eq!(c.function(ord).unwrap().start_ip, 99);
    }

    #[test]
    fn add_constant_deep_copies_strings() {
        let mut c = Chunk::new();
        let s: Rc<str> = Rc::from("hello");
        let ord = c.add_constant(Value::String(Rc::clone(&s)));
        if let Value::String(pooled) = c.constant(ord) {
            assert_eq!(pooled.as_ref(), "hello");
            assert!(!Rc::ptr_eq(&s, pooled));
        } else {
            panic!("expected string constant");
        }
    }

    #[test]
    fn patch_overwrites_operand_a() {
        let mut c = Chunk::new();
        let idx = c.emit(OpCode::Jump, SENTINEL_IP, 0, loc());
        c.patch(idx, 5);
        assert_eq!(c.instructions[idx].a, 5);
    }
}
