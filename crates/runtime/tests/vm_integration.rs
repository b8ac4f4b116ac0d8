//! VM-level integration tests: hand-built chunks exercised through the
//! public `Vm` API, without a compiler front end in the loop (mirrors the
//! teacher's `crates/runtime/tests/test_closures.rs`, which drives
//! `seq_runtime`'s own primitives directly rather than compiling source).

use nova_core::{Chunk, DiagnosticCollector, OpCode, SourceLocation, Value, PRINT_ID};
use nova_runtime::Vm;
use std::io::{BufReader, Cursor, Write};
use std::rc::Rc;

fn loc() -> SourceLocation {
    SourceLocation::synthetic(Rc::from("it.nv"))
}

#[test]
fn input_reads_a_prompt_and_a_real_line_from_a_tempfile() {
    let mut file = tempfile::tempfile().expect("tempfile");
    writeln!(file, "Ada Lovelace").unwrap();
    file.sync_all().unwrap();
    use std::io::Seek;
    file.seek(std::io::SeekFrom::Start(0)).unwrap();

    let mut c = Chunk::new();
    let prompt = c.add_constant(Value::string_copy("name? "));
    c.emit(OpCode::PushConst, prompt, 0, loc());
    c.emit(OpCode::CallBuiltin, 2, 1, loc()); // input(prompt)
    c.emit(OpCode::CallBuiltin, PRINT_ID, 1, loc());
    c.emit(OpCode::Halt, 0, 0, loc());

    let mut diagnostics = DiagnosticCollector::new();
    let mut out = Vec::new();
    let code = Vm::new(&c, &mut diagnostics, &mut out, BufReader::new(file)).run();

    assert_eq!(code, 0);
    assert_eq!(String::from_utf8(out).unwrap(), "name? Ada Lovelace\n");
}

#[test]
fn read_line_returns_null_at_end_of_input() {
    let mut c = Chunk::new();
    c.emit(OpCode::CallBuiltin, 3, 0, loc()); // readLine()
    c.emit(OpCode::CallBuiltin, 31, 1, loc()); // isNull(...)
    c.emit(OpCode::Halt, 0, 0, loc());

    let mut diagnostics = DiagnosticCollector::new();
    let code = Vm::new(&c, &mut diagnostics, Vec::new(), Cursor::new(Vec::<u8>::new())).run();
    assert_eq!(code, 1); // Bool(true) on top of stack
}

#[test]
fn call_frames_keep_separate_locals_across_calls() {
    // func Int id(n: Int) { return n; }
    // print(id(3) + id(9));
    let mut c = Chunk::new();
    let id_fn = c.add_function("id", nova_core::SENTINEL_IP, 1);
    let start = c.current_ip();
    c.add_function("id", start, 1);
    c.emit(OpCode::LoadLocal, 0, 0, loc());
    c.emit(OpCode::Return, 0, 0, loc());

    c.entry_ip = c.current_ip();

    let three = c.add_constant(Value::int(3));
    let nine = c.add_constant(Value::int(9));
    c.emit(OpCode::PushConst, three, 0, loc());
    c.emit(OpCode::Call, id_fn, 1, loc());
    c.emit(OpCode::PushConst, nine, 0, loc());
    c.emit(OpCode::Call, id_fn, 1, loc());
    c.emit(OpCode::Add, 0, 0, loc());
    c.emit(OpCode::CallBuiltin, PRINT_ID, 1, loc());
    c.emit(OpCode::Halt, 0, 0, loc());

    let mut diagnostics = DiagnosticCollector::new();
    let mut out = Vec::new();
    Vm::new(&c, &mut diagnostics, &mut out, Cursor::new(Vec::<u8>::new())).run();
    assert_eq!(String::from_utf8(out).unwrap(), "12\n");
}

#[test]
fn assert_failure_halts_with_the_custom_message_reported() {
    let mut c = Chunk::new();
    let no = c.add_constant(Value::bool(false));
    let msg = c.add_constant(Value::string_copy("x must be positive"));
    c.emit(OpCode::PushConst, no, 0, loc());
    c.emit(OpCode::PushConst, msg, 0, loc());
    c.emit(OpCode::CallBuiltin, 30, 2, loc()); // assert(false, "x must be positive")
    c.emit(OpCode::Halt, 0, 0, loc());

    let mut diagnostics = DiagnosticCollector::new();
    let code = Vm::new(&c, &mut diagnostics, Vec::new(), Cursor::new(Vec::<u8>::new())).run();
    assert_eq!(code, 1);
    assert!(diagnostics.iter().any(|d| d.message.contains("x must be positive")));
}
