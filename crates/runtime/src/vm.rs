//! The virtual machine (Component I, §4.7): a stack machine that reads a
//! `Chunk` built by the code generator and never mutates it.
//!
//! Runtime-error recovery follows one rule throughout: push `Value::Null`
//! to keep the operand stack balanced, report the error at `Stage::Runtime`,
//! and set the halt flag so execution stops at the current instruction
//! (§7's "these are runtime errors: ... set the halted flag and exit code
//! 1", read together with §4.7's per-instruction "push Null").

use crate::builtins;
use nova_core::{Chunk, DiagnosticCollector, OpCode, SourceLocation, Stage, Value, PRINT_ID, PRINTF_ID};
use std::io::{BufRead, Write};

/// Value-stack depth past which a runaway program is treated as a runtime
/// error rather than left to exhaust host memory.
const MAX_STACK: usize = 1 << 16;
/// Call-frame depth past which unbounded recursion is treated as a runtime
/// error.
const MAX_FRAMES: usize = 1024;

struct Frame {
    return_ip: u32,
    stack_base: usize,
    locals: Vec<Value>,
}

/// Owns the value stack, call-frame stack, and globals vector for one run
/// of a `Chunk`. `W`/`R` are the `print`/`printf` sink and the
/// `input`/`readLine` source, generic so tests can swap in an in-memory
/// buffer instead of real stdio.
pub struct Vm<'c, 'd, W: Write, R: BufRead> {
    chunk: &'c Chunk,
    diagnostics: &'d mut DiagnosticCollector,
    out: W,
    input: R,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    globals: Vec<Value>,
    pc: u32,
    halted: bool,
    exit_code: i32,
}

impl<'c, 'd, W: Write, R: BufRead> Vm<'c, 'd, W, R> {
    pub fn new(chunk: &'c Chunk, diagnostics: &'d mut DiagnosticCollector, out: W, input: R) -> Self {
        Vm {
            chunk,
            diagnostics,
            out,
            input,
            stack: Vec::new(),
            frames: Vec::new(),
            globals: Vec::new(),
            pc: chunk.entry_ip,
            halted: false,
            exit_code: 0,
        }
    }

    /// Runs to completion (either `halt`, an unrecovered runtime error, or
    /// the program counter running off the end of the chunk) and returns
    /// the process exit code.
    pub fn run(mut self) -> i32 {
        while !self.halted {
            let ip = self.pc as usize;
            let Some(instr) = self.chunk.instructions.get(ip) else {
                break;
            };
            let (op, a, b, loc) = (instr.op, instr.a, instr.b, instr.location.clone());
            self.pc += 1;
            self.execute(op, a, b, &loc);
        }
        self.exit_code
    }

    fn runtime_error(&mut self, msg: impl Into<String>, loc: &SourceLocation) {
        self.diagnostics.error(Stage::Runtime, msg, loc.clone());
        self.halted = true;
        self.exit_code = 1;
    }

    fn push(&mut self, v: Value, loc: &SourceLocation) {
        if self.stack.len() >= MAX_STACK {
            self.runtime_error("value stack overflow", loc);
            return;
        }
        self.stack.push(v);
    }

    fn pop(&mut self, loc: &SourceLocation) -> Value {
        match self.stack.pop() {
            Some(v) => v,
            None => {
                self.runtime_error("value stack underflow", loc);
                Value::Null
            }
        }
    }

    fn execute(&mut self, op: OpCode, a: u32, b: u32, loc: &SourceLocation) {
        match op {
            OpCode::PushConst => {
                let v = match self.chunk.constant(a) {
                    Value::String(rc) => Value::string_borrow(rc),
                    other => other.clone(),
                };
                self.push(v, loc);
            }
            OpCode::Pop => {
                self.pop(loc);
            }
            OpCode::LoadLocal => self.load_local(a, loc),
            OpCode::StoreLocal => self.store_local(a, loc),
            OpCode::LoadGlobal => self.load_global(a, loc),
            OpCode::StoreGlobal => self.store_global(a, loc),
            OpCode::Add => self.add(loc),
            OpCode::Subtract => self.arith(loc, i64::wrapping_sub, |x, y| x - y),
            OpCode::Multiply => self.arith(loc, i64::wrapping_mul, |x, y| x * y),
            OpCode::Divide => self.divide(loc),
            OpCode::Modulo => self.modulo(loc),
            OpCode::Negate => self.negate(loc),
            OpCode::Not => {
                let v = self.pop(loc);
                self.push(Value::Bool(!v.is_truthy()), loc);
            }
            OpCode::Equal => {
                let (l, r) = self.pop_pair(loc);
                self.push(Value::Bool(values_equal(&l, &r)), loc);
            }
            OpCode::NotEqual => {
                let (l, r) = self.pop_pair(loc);
                self.push(Value::Bool(!values_equal(&l, &r)), loc);
            }
            OpCode::Less => self.compare(loc, |x, y| x < y, |x, y| x < y),
            OpCode::LessEqual => self.compare(loc, |x, y| x <= y, |x, y| x <= y),
            OpCode::Greater => self.compare(loc, |x, y| x > y, |x, y| x > y),
            OpCode::GreaterEqual => self.compare(loc, |x, y| x >= y, |x, y| x >= y),
            OpCode::And => {
                let (l, r) = self.pop_pair(loc);
                self.push(Value::Bool(l.is_truthy() && r.is_truthy()), loc);
            }
            OpCode::Or => {
                let (l, r) = self.pop_pair(loc);
                self.push(Value::Bool(l.is_truthy() || r.is_truthy()), loc);
            }
            OpCode::Jump => self.pc = a,
            OpCode::JumpIfFalse => {
                let v = self.pop(loc);
                if !v.is_truthy() {
                    self.pc = a;
                }
            }
            OpCode::JumpIfTrue => {
                let v = self.pop(loc);
                if v.is_truthy() {
                    self.pc = a;
                }
            }
            OpCode::Call => self.call(a, b, loc),
            OpCode::Return => self.do_return(loc),
            OpCode::Halt => self.halt(),
            OpCode::CallBuiltin => self.call_builtin(a, b, loc),
            OpCode::ToInt => {
                let v = self.pop(loc);
                self.push(builtins::to_int(&[v]), loc);
            }
            OpCode::ToFloat => {
                let v = self.pop(loc);
                self.push(builtins::to_float(&[v]), loc);
            }
            OpCode::ToString => {
                let v = self.pop(loc);
                self.push(builtins::to_string(&[v]), loc);
            }
            OpCode::Concat => {
                let (l, r) = self.pop_pair(loc);
                let s = format!("{}{}", l.to_display(), r.to_display());
                self.push(Value::string_owned(s), loc);
            }
            OpCode::ArrayNew => {
                self.runtime_error("array-new is not implemented", loc);
                self.push(Value::Null, loc);
            }
            OpCode::ArrayGet => {
                self.pop(loc); // index
                self.pop(loc); // base
                self.runtime_error("array-get is not implemented", loc);
                self.push(Value::Null, loc);
            }
            OpCode::ArraySet => {
                self.pop(loc); // value
                self.pop(loc); // index
                self.pop(loc); // base
                self.runtime_error("array-set is not implemented", loc);
                self.push(Value::Null, loc);
            }
        }
    }

    fn pop_pair(&mut self, loc: &SourceLocation) -> (Value, Value) {
        let r = self.pop(loc);
        let l = self.pop(loc);
        (l, r)
    }

    fn load_local(&mut self, slot: u32, loc: &SourceLocation) {
        let Some(frame) = self.frames.last() else {
            self.runtime_error("load-local with no active call frame", loc);
            self.push(Value::Null, loc);
            return;
        };
        let v = match frame.locals.get(slot as usize) {
            Some(Value::String(rc)) => Value::string_borrow(rc),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        self.push(v, loc);
    }

    fn store_local(&mut self, slot: u32, loc: &SourceLocation) {
        let v = self.pop(loc).own_copy();
        let Some(frame) = self.frames.last_mut() else {
            self.runtime_error("store-local with no active call frame", loc);
            return;
        };
        let slot = slot as usize;
        if slot >= frame.locals.len() {
            frame.locals.resize(slot + 1, Value::Null);
        }
        frame.locals[slot] = v;
    }

    fn load_global(&mut self, slot: u32, loc: &SourceLocation) {
        let v = match self.globals.get(slot as usize) {
            Some(Value::String(rc)) => Value::string_borrow(rc),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        self.push(v, loc);
    }

    fn store_global(&mut self, slot: u32, loc: &SourceLocation) {
        let v = self.pop(loc).own_copy();
        let slot = slot as usize;
        if slot >= self.globals.len() {
            self.globals.resize(slot + 1, Value::Null);
        }
        self.globals[slot] = v;
    }

    fn add(&mut self, loc: &SourceLocation) {
        let (l, r) = self.pop_pair(loc);
        let result = match (&l, &r) {
            (Value::String(a), Value::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Value::string_owned(s)
            }
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
            _ => match (builtins::as_f64(&l), builtins::as_f64(&r)) {
                (Some(a), Some(b)) => Value::Float(a + b),
                _ => Value::Null,
            },
        };
        self.push(result, loc);
    }

    fn arith(&mut self, loc: &SourceLocation, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) {
        let (l, r) = self.pop_pair(loc);
        let result = match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Value::Int(int_op(*a, *b)),
            _ => match (builtins::as_f64(&l), builtins::as_f64(&r)) {
                (Some(a), Some(b)) => Value::Float(float_op(a, b)),
                _ => Value::Null,
            },
        };
        self.push(result, loc);
    }

    fn divide(&mut self, loc: &SourceLocation) {
        let (l, r) = self.pop_pair(loc);
        let is_zero = matches!(&r, Value::Int(0)) || matches!(&r, Value::Float(f) if *f == 0.0);
        if is_zero {
            self.runtime_error("division by zero", loc);
            self.push(Value::Null, loc);
            return;
        }
        let result = match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_div(*b)),
            _ => match (builtins::as_f64(&l), builtins::as_f64(&r)) {
                (Some(a), Some(b)) => Value::Float(a / b),
                _ => Value::Null,
            },
        };
        self.push(result, loc);
    }

    /// Int+Int with a non-zero divisor only; a zero divisor is a runtime
    /// error, and any non-integer operand yields `Null` without one (the
    /// table gives modulo no float-promotion path, unlike `divide`).
    fn modulo(&mut self, loc: &SourceLocation) {
        let (l, r) = self.pop_pair(loc);
        let result = match (&l, &r) {
            (Value::Int(_), Value::Int(0)) => {
                self.runtime_error("modulo by zero", loc);
                Value::Null
            }
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_rem(*b)),
            _ => Value::Null,
        };
        self.push(result, loc);
    }

    fn negate(&mut self, loc: &SourceLocation) {
        let v = self.pop(loc);
        let result = match v {
            Value::Int(n) => Value::Int(n.wrapping_neg()),
            Value::Float(f) => Value::Float(-f),
            _ => Value::Null,
        };
        self.push(result, loc);
    }

    fn compare(&mut self, loc: &SourceLocation, int_cmp: fn(i64, i64) -> bool, float_cmp: fn(f64, f64) -> bool) {
        let (l, r) = self.pop_pair(loc);
        let result = match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => int_cmp(*a, *b),
            _ => match (builtins::as_f64(&l), builtins::as_f64(&r)) {
                (Some(a), Some(b)) => float_cmp(a, b),
                _ => false,
            },
        };
        self.push(Value::Bool(result), loc);
    }

    fn call(&mut self, func_idx: u32, argc: u32, loc: &SourceLocation) {
        let argc = argc as usize;
        let Some(entry) = self.chunk.function(func_idx) else {
            self.runtime_error(format!("call to invalid function index {func_idx}"), loc);
            self.pop_n(argc, loc);
            self.push(Value::Null, loc);
            return;
        };
        if self.frames.len() >= MAX_FRAMES {
            self.runtime_error("call frame stack overflow", loc);
            return;
        }
        if self.stack.len() < argc {
            self.runtime_error("value stack underflow during call", loc);
            return;
        }
        let local_count = entry.local_count.max(argc as u32) as usize;
        let mut locals = vec![Value::Null; local_count];
        let args_start = self.stack.len() - argc;
        for (i, v) in self.stack.drain(args_start..).enumerate() {
            locals[i] = v.own_copy();
        }
        let stack_base = self.stack.len();
        let return_ip = self.pc;
        let start_ip = entry.start_ip;
        self.frames.push(Frame { return_ip, stack_base, locals });
        self.pc = start_ip;
    }

    fn pop_n(&mut self, n: usize, loc: &SourceLocation) {
        for _ in 0..n {
            self.pop(loc);
        }
    }

    /// A `return` with no enclosing call frame is top-level code returning
    /// from the program itself: it behaves like `halt`, taking its exit
    /// code from the returned value (§8: `Let x : Int = 7; return x;`
    /// exits 7).
    fn do_return(&mut self, loc: &SourceLocation) {
        let v = self.pop(loc).own_copy();
        let Some(frame) = self.frames.pop() else {
            self.push(v, loc);
            self.halt();
            return;
        };
        self.stack.truncate(frame.stack_base);
        self.push(v, loc);
        self.pc = frame.return_ip;
    }

    fn halt(&mut self) {
        self.halted = true;
        if let Some(top) = self.stack.last() {
            self.exit_code = match top {
                Value::Int(n) => *n as i32,
                Value::Bool(b) => i32::from(*b),
                Value::Float(f) => *f as i32,
                _ => self.exit_code,
            };
        }
    }

    fn call_builtin(&mut self, id: u32, argc: u32, loc: &SourceLocation) {
        let argc = argc as usize;
        if self.stack.len() < argc {
            self.runtime_error("value stack underflow during builtin call", loc);
            return;
        }
        let start = self.stack.len() - argc;
        let args: Vec<Value> = self.stack.drain(start..).collect();
        let result = match id {
            PRINT_ID => {
                let text = args.first().map(Value::to_display).unwrap_or_default();
                let _ = writeln!(self.out, "{text}");
                Value::Null
            }
            PRINTF_ID => {
                let text = builtins::format_printf(&args);
                let _ = write!(self.out, "{text}");
                Value::Null
            }
            2 => {
                if let Some(prompt) = args.first() {
                    let _ = write!(self.out, "{}", prompt.to_display());
                    let _ = self.out.flush();
                }
                builtins::read_line(&mut self.input).map(Value::string_owned).unwrap_or(Value::Null)
            }
            3 => builtins::read_line(&mut self.input).map(Value::string_owned).unwrap_or(Value::Null),
            4 => builtins::abs(&args),
            5 => builtins::sqrt(&args),
            6 => builtins::pow(&args),
            7 => builtins::sin(&args),
            8 => builtins::cos(&args),
            9 => builtins::tan(&args),
            10 => builtins::floor(&args),
            11 => builtins::ceil(&args),
            12 => builtins::round(&args),
            13 => builtins::max(&args),
            14 => builtins::min(&args),
            15 => builtins::str_len(&args),
            16 => builtins::substr(&args),
            17 => builtins::to_upper_case(&args),
            18 => builtins::to_lower_case(&args),
            19 => builtins::str_contains(&args),
            20 => builtins::str_index_of(&args),
            21 => builtins::str_replace(&args),
            22 => builtins::str_trim(&args),
            23 => builtins::str_split(&args),
            24 => builtins::to_int(&args),
            25 => builtins::to_float(&args),
            26 => builtins::to_string(&args),
            27 => builtins::to_bool(&args),
            28 => builtins::type_of(&args),
            29 => {
                self.halted = true;
                self.exit_code = builtins::exit_code(&args);
                Value::Null
            }
            30 => match builtins::assert_check(&args) {
                Ok(()) => Value::Null,
                Err(msg) => {
                    self.runtime_error(format!("assertion failed: {msg}"), loc);
                    Value::Null
                }
            },
            31 => builtins::is_null(&args),
            32 => builtins::is_int(&args),
            33 => builtins::is_float(&args),
            34 => builtins::is_string(&args),
            35 => builtins::is_bool(&args),
            _ => {
                self.runtime_error(format!("unknown builtin id {id}"), loc);
                Value::Null
            }
        };
        self.push(result, loc);
    }
}

/// Type-equal operands compared by variant; strings by bytes; `Null` equal
/// only to `Null`; cross-type pairs (including Int/Float) are unequal.
fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::String(a), Value::String(b)) => a.as_bytes() == b.as_bytes(),
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::SENTINEL_IP;
    use std::io::Cursor;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::synthetic(Rc::from("t.nv"))
    }

    fn run_chunk(chunk: &Chunk) -> (String, i32) {
        let mut diags = DiagnosticCollector::new();
        let mut out = Vec::new();
        let code = Vm::new(chunk, &mut diags, &mut out, Cursor::new(Vec::<u8>::new())).run();
        (String::from_utf8(out).unwrap(), code)
    }

    #[test]
    fn arithmetic_precedence() {
        // 1 + 2 * 3 = 7
        let mut c = Chunk::new();
        let one = c.add_constant(Value::int(1));
        let two = c.add_constant(Value::int(2));
        let three = c.add_constant(Value::int(3));
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::PushConst, two, 0, loc());
        c.emit(OpCode::PushConst, three, 0, loc());
        c.emit(OpCode::Multiply, 0, 0, loc());
        c.emit(OpCode::Add, 0, 0, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let (_, code) = run_chunk(&c);
        assert_eq!(code, 7);
    }

    #[test]
    fn string_concat_via_add() {
        let mut c = Chunk::new();
        let a = c.add_constant(Value::string_copy("hello, "));
        let b = c.add_constant(Value::string_copy("world"));
        c.emit(OpCode::PushConst, a, 0, loc());
        c.emit(OpCode::PushConst, b, 0, loc());
        c.emit(OpCode::Add, 0, 0, loc());
        c.emit(OpCode::CallBuiltin, PRINT_ID, 1, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let (out, _) = run_chunk(&c);
        assert_eq!(out, "hello, world\n");
    }

    #[test]
    fn recursive_factorial() {
        // func Int fact(n: Int) { if (n <= 1) return 1; return n * fact(n - 1); }
        // print(fact(6)); -> 720
        let mut c = Chunk::new();
        let fact = c.add_function("fact", SENTINEL_IP, 1);
        let start = c.current_ip();
        c.add_function("fact", start, 1);

        // if (n <= 1) return 1;
        c.emit(OpCode::LoadLocal, 0, 0, loc());
        let one = c.add_constant(Value::int(1));
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::LessEqual, 0, 0, loc());
        let jf = c.emit(OpCode::JumpIfFalse, SENTINEL_IP, 0, loc());
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::Return, 0, 0, loc());
        let after_base_case = c.current_ip();
        c.patch(jf, after_base_case);

        // return n * fact(n - 1);
        c.emit(OpCode::LoadLocal, 0, 0, loc());
        c.emit(OpCode::LoadLocal, 0, 0, loc());
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::Subtract, 0, 0, loc());
        c.emit(OpCode::Call, fact, 1, loc());
        c.emit(OpCode::Multiply, 0, 0, loc());
        c.emit(OpCode::Return, 0, 0, loc());

        c.entry_ip = c.current_ip();

        // top level: print(fact(6));
        let six = c.add_constant(Value::int(6));
        c.emit(OpCode::PushConst, six, 0, loc());
        c.emit(OpCode::Call, fact, 1, loc());
        c.emit(OpCode::CallBuiltin, PRINT_ID, 1, loc());
        c.emit(OpCode::Halt, 0, 0, loc());

        let (out, _) = run_chunk(&c);
        assert_eq!(out, "720\n");
    }

    #[test]
    fn while_loop_counts_up() {
        // Int i = 0; while (i < 3) { print(i); i = i + 1; }
        let mut c = Chunk::new();
        let zero = c.add_constant(Value::int(0));
        c.emit(OpCode::PushConst, zero, 0, loc());
        c.emit(OpCode::StoreGlobal, 0, 0, loc());

        let loop_start = c.current_ip();
        c.emit(OpCode::LoadGlobal, 0, 0, loc());
        let three = c.add_constant(Value::int(3));
        c.emit(OpCode::PushConst, three, 0, loc());
        c.emit(OpCode::Less, 0, 0, loc());
        let jf = c.emit(OpCode::JumpIfFalse, SENTINEL_IP, 0, loc());

        c.emit(OpCode::LoadGlobal, 0, 0, loc());
        c.emit(OpCode::CallBuiltin, PRINT_ID, 1, loc());
        c.emit(OpCode::LoadGlobal, 0, 0, loc());
        let one = c.add_constant(Value::int(1));
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::Add, 0, 0, loc());
        c.emit(OpCode::StoreGlobal, 0, 0, loc());
        c.emit(OpCode::Jump, loop_start, 0, loc());

        let end = c.current_ip();
        c.patch(jf, end);
        c.emit(OpCode::Halt, 0, 0, loc());

        let (out, _) = run_chunk(&c);
        assert_eq!(out, "0\n1\n2\n");
    }

    #[test]
    fn division_by_zero_halts_with_exit_code_one() {
        let mut c = Chunk::new();
        let one = c.add_constant(Value::int(1));
        let zero = c.add_constant(Value::int(0));
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::PushConst, zero, 0, loc());
        c.emit(OpCode::Divide, 0, 0, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let mut diags = DiagnosticCollector::new();
        let vm = Vm::new(&c, &mut diags, Vec::new(), Cursor::new(Vec::<u8>::new()));
        let code = vm.run();
        assert_eq!(code, 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn integer_addition_wraps_on_overflow() {
        let mut c = Chunk::new();
        let max = c.add_constant(Value::int(i64::MAX));
        let one = c.add_constant(Value::int(1));
        c.emit(OpCode::PushConst, max, 0, loc());
        c.emit(OpCode::PushConst, one, 0, loc());
        c.emit(OpCode::Add, 0, 0, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let mut diags = DiagnosticCollector::new();
        let vm = Vm::new(&c, &mut diags, Vec::new(), Cursor::new(Vec::<u8>::new()));
        let code = vm.run();
        assert_eq!(code, i64::MIN as i32);
        assert!(!diags.has_errors());
    }

    #[test]
    fn empty_program_exits_zero() {
        let mut c = Chunk::new();
        c.emit(OpCode::Halt, 0, 0, loc());
        let mut diags = DiagnosticCollector::new();
        let vm = Vm::new(&c, &mut diags, Vec::new(), Cursor::new(Vec::<u8>::new()));
        assert_eq!(vm.run(), 0);
    }

    #[test]
    fn empty_string_is_falsy_and_has_zero_length() {
        let mut c = Chunk::new();
        let s = c.add_constant(Value::string_copy(""));
        c.emit(OpCode::PushConst, s, 0, loc());
        c.emit(OpCode::Not, 0, 0, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let mut diags = DiagnosticCollector::new();
        let vm = Vm::new(&c, &mut diags, Vec::new(), Cursor::new(Vec::<u8>::new()));
        assert_eq!(vm.run(), 1); // Bool(true) -> exit code 1
    }

    #[test]
    fn unimplemented_array_get_halts_but_keeps_stack_balanced() {
        let mut c = Chunk::new();
        let z = c.add_constant(Value::int(0));
        c.emit(OpCode::PushConst, z, 0, loc());
        c.emit(OpCode::PushConst, z, 0, loc());
        c.emit(OpCode::ArrayGet, 0, 0, loc());
        c.emit(OpCode::Halt, 0, 0, loc());
        let mut diags = DiagnosticCollector::new();
        let vm = Vm::new(&c, &mut diags, Vec::new(), Cursor::new(Vec::<u8>::new()));
        let code = vm.run();
        assert_eq!(code, 1);
        assert!(diags.has_errors());
    }
}
