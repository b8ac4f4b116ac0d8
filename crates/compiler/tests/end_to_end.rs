//! End-to-end pipeline tests: Nova source text in, stdout and exit code
//! out, through the real tokenizer → parser → resolver → codegen → VM
//! chain. Mirrors spec §8's literal end-to-end scenarios plus the
//! boundary behaviors named alongside them.

use nova_core::DiagnosticCollector;
use nova_compiler::pipeline;
use nova_runtime::Vm;
use std::io::Cursor;
use std::rc::Rc;

fn run(src: &str) -> (String, i32) {
    let mut diagnostics = DiagnosticCollector::new();
    let chunk = pipeline::compile(src, Rc::from("t.nv"), false, &mut diagnostics).expect("pipeline succeeds");
    let mut out = Vec::new();
    let code = Vm::new(&chunk, &mut diagnostics, &mut out, Cursor::new(Vec::<u8>::new())).run();
    (String::from_utf8(out).unwrap(), code)
}

#[test]
fn arithmetic_precedence() {
    let (out, code) = run("print(1 + 2 * 3);");
    assert_eq!(out, "7\n");
    assert_eq!(code, 0);
}

#[test]
fn string_concatenation() {
    let (out, _) = run(r#"print("hello, " + "world");"#);
    assert_eq!(out, "hello, world\n");
}

#[test]
fn function_call() {
    let (out, code) = run("func Int add(a:Int, b:Int){ return a+b; } func void main(){ print(add(40,2)); }");
    assert_eq!(out, "42\n");
    assert_eq!(code, 0);
}

#[test]
fn recursive_factorial() {
    let (out, _) = run("func Int fact(n:Int){ if (n<=1){ return 1; } return n*fact(n-1); } func void main(){ print(fact(6)); }");
    assert_eq!(out, "720\n");
}

#[test]
fn while_loop() {
    let (out, _) = run("Int i = 0; while (i < 3) { print(i); i = i + 1; }");
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn printf_colon_syntax() {
    let (out, _) = run(r#"printf("x is %d\n", 7);"#);
    assert_eq!(out, "x is 7\n");
}

#[test]
fn division_by_zero_halts_with_exit_one() {
    let mut diagnostics = DiagnosticCollector::new();
    let chunk = pipeline::compile("print(1 / 0);", Rc::from("t.nv"), false, &mut diagnostics).unwrap();
    let code = Vm::new(&chunk, &mut diagnostics, Vec::new(), Cursor::new(Vec::<u8>::new())).run();
    assert_eq!(code, 1);
    assert!(diagnostics.has_errors());
}

#[test]
fn integer_overflow_wraps_instead_of_panicking() {
    let (_, code) = run("Int x = 9223372036854775807; x = x + 1; Bool ok = x < 0; exit(toInt(ok));");
    assert_eq!(code, 1);
}

#[test]
fn empty_string_is_falsy_and_empty() {
    let (out, _) = run(r#"print(strLen("")); print(toBool(""));"#);
    assert_eq!(out, "0\nfalse\n");
}

#[test]
fn empty_program_exits_zero() {
    let (out, code) = run("");
    assert_eq!(out, "");
    assert_eq!(code, 0);
}

#[test]
fn top_level_return_sets_exit_code() {
    let (_, code) = run("Let x : Int = 7; return x;");
    assert_eq!(code, 7);
}

#[test]
fn to_int_of_to_string_round_trips() {
    let (out, _) = run(r#"print(toInt(toString(123)) == 123);"#);
    assert_eq!(out, "true\n");
}

#[test]
fn to_bool_of_to_string_round_trips() {
    let (out, _) = run(r#"print(toBool(toString(true)) == true);"#);
    assert_eq!(out, "true\n");
}

#[test]
fn str_trim_is_idempotent() {
    let (out, _) = run(r#"Let once : String = strTrim("  hi  "); print(strTrim(once) == once);"#);
    assert_eq!(out, "true\n");
}

#[test]
fn to_upper_of_to_lower_equals_to_upper() {
    let (out, _) = run(r#"Let s : String = "MiXeD"; print(toUpperCase(toLowerCase(s)) == toUpperCase(s));"#);
    assert_eq!(out, "true\n");
}

#[test]
fn forward_reference_to_a_later_global_resolves() {
    let (out, _) = run("func void main(){ print(g); } Int g = 9;");
    assert_eq!(out, "9\n");
}

#[test]
fn shadowing_a_global_inside_a_block_is_local_to_the_block() {
    let (out, _) = run("Int x = 1; { Int x = 2; print(x); } print(x);");
    assert_eq!(out, "2\n1\n");
}
