//! End-to-end compilation pipeline (Components E through H strung
//! together): source text in, a runnable `Chunk` out. `main.rs` layers the
//! CLI flags and the VM run on top of this, so the pipeline itself stays
//! testable without a filesystem or stdio.

use crate::codegen::{self, CodeGenError};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;
use nova_core::{Chunk, DiagnosticCollector};
use std::fmt;
use std::rc::Rc;

/// A failure that stops the pipeline before a `Chunk` exists to run.
/// Runtime errors are not represented here — the VM reports those straight
/// into the shared `DiagnosticCollector`, the same channel every earlier
/// stage uses, rather than a second error type wrapping the same fact.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// `--strict-types` was requested and the advisory resolver (§4.5)
    /// reported at least one error.
    StrictTypeCheckFailed,
    CodeGen(CodeGenError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::StrictTypeCheckFailed => write!(f, "type checking failed under --strict-types"),
            PipelineError::CodeGen(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CodeGenError> for PipelineError {
    fn from(e: CodeGenError) -> Self {
        PipelineError::CodeGen(e)
    }
}

/// Runs tokenizer → parser → advisory resolver → code generator over
/// `source`. Diagnostics from every stage land in `diagnostics`; the
/// pipeline only returns `Err` when `strict_types` turns resolver errors
/// into a hard stop, or when the generator reports a defect in its own
/// output (§8's jump-target invariant).
pub fn compile(source: &str, file: Rc<str>, strict_types: bool, diagnostics: &mut DiagnosticCollector) -> Result<Chunk, PipelineError> {
    let tokens = Lexer::new(source, Rc::clone(&file)).tokenize(diagnostics);
    let program = Parser::new(tokens, diagnostics).parse_program();

    Resolver::new(diagnostics).check(&program);
    if strict_types && diagnostics.has_errors() {
        return Err(PipelineError::StrictTypeCheckFailed);
    }

    let chunk = codegen::generate(&program, file, diagnostics)?;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_source_compiles_with_no_diagnostics() {
        let mut diags = DiagnosticCollector::new();
        let chunk = compile("func Int add(a:Int, b:Int){ return a+b; } func void main(){ print(add(40,2)); }", Rc::from("t.nv"), false, &mut diags).unwrap();
        assert!(!diags.has_errors());
        assert!(chunk.instruction_count() > 0);
    }

    #[test]
    fn strict_types_rejects_a_resolver_error() {
        let mut diags = DiagnosticCollector::new();
        let err = compile("print(undeclared);", Rc::from("t.nv"), true, &mut diags).unwrap_err();
        assert_eq!(err, PipelineError::StrictTypeCheckFailed);
    }

    #[test]
    fn non_strict_mode_still_compiles_past_resolver_errors() {
        let mut diags = DiagnosticCollector::new();
        let result = compile("print(undeclared);", Rc::from("t.nv"), false, &mut diags);
        assert!(result.is_ok());
        assert!(diags.has_errors());
    }
}
