//! Front end and code generator for Nova: tokenizer, parser, syntax tree,
//! advisory resolver, and the bytecode code generator. Mirrors the
//! teacher's `seq-compiler` crate layout (library + CLI binary in one
//! package) scaled down to this spec's single-pipeline CLI.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod pipeline;
pub mod resolver;
pub mod token;
pub mod types;

pub mod parser;

pub use ast::Program;
pub use codegen::{CodeGenError, generate};
pub use lexer::Lexer;
pub use parser::Parser;
pub use pipeline::{PipelineError, compile};
pub use resolver::Resolver;
