//! `interpreter` — compiles and runs a single Nova source file (§6).
//!
//! `source-file [--time] [--dump-bytecode] [--strict-types]`. Diagnostics
//! from every pipeline stage, plus any the VM appends while running, print
//! to stderr once the program has finished; the process exit code is the
//! VM's (0 on normal completion, the top-of-stack scalar on `halt`, 1 on a
//! pipeline or runtime error).

use clap::Parser as ClapParser;
use nova_compiler::pipeline;
use nova_core::{Chunk, DiagnosticCollector};
use nova_runtime::Vm;
use std::io;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(ClapParser)]
#[command(name = "interpreter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run a Nova source file", long_about = None)]
struct Cli {
    /// Nova source file to run
    source: PathBuf,

    /// Print elapsed execution time to stderr
    #[arg(long)]
    time: bool,

    /// Print the disassembled bytecode chunk to stderr before running
    #[arg(long)]
    dump_bytecode: bool,

    /// Stop before code generation if the advisory resolver reported errors
    #[arg(long)]
    strict_types: bool,
}

fn main() {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", cli.source.display());
            process::exit(1);
        }
    };

    let file: Rc<str> = Rc::from(cli.source.display().to_string());
    let mut diagnostics = DiagnosticCollector::new();

    let chunk = match pipeline::compile(&source, Rc::clone(&file), cli.strict_types, &mut diagnostics) {
        Ok(chunk) => chunk,
        Err(e) => {
            print_diagnostics(&diagnostics);
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if cli.dump_bytecode {
        dump_bytecode(&chunk);
    }

    let stdin = io::stdin();
    let start = Instant::now();
    let exit_code = Vm::new(&chunk, &mut diagnostics, io::stdout(), stdin.lock()).run();
    let elapsed = start.elapsed();

    print_diagnostics(&diagnostics);
    if cli.time {
        eprintln!("elapsed: {}", format_elapsed(elapsed));
    }
    process::exit(exit_code);
}

fn print_diagnostics(diagnostics: &DiagnosticCollector) {
    for d in diagnostics.iter() {
        eprintln!("{d}");
    }
}

fn dump_bytecode(chunk: &Chunk) {
    eprintln!("-- functions --");
    for (i, f) in chunk.functions.iter().enumerate() {
        eprintln!("  [{i}] {} (start_ip={}, params={}, locals={})", f.name, f.start_ip, f.param_count, f.local_count);
    }
    eprintln!("-- instructions --");
    for (ip, instr) in chunk.instructions.iter().enumerate() {
        eprintln!("{ip:>5}: {:?} {} {}", instr.op, instr.a, instr.b);
    }
}

fn format_elapsed(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{micros}\u{b5}s")
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    }
}
