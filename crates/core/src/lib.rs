//! Core data model shared by the Nova compiler and runtime.
//!
//! Mirrors the layering of a stack-based language toolchain: `Value` is the
//! unit of stack traffic, `Chunk` is the append-only bytecode container the
//! code generator writes and the VM reads, `diagnostics` is the append-only
//! collector threaded through every pipeline stage, and `builtins` is the
//! static id table both the code generator (to resolve call sites) and the
//! VM (to dispatch `call-builtin`) consult.

pub mod builtins;
pub mod chunk;
pub mod diagnostics;
pub mod value;

pub use builtins::{BuiltinDef, BUILTINS, PRINT_ID, PRINTF_ID, find_builtin};
pub use chunk::{Chunk, FunctionEntry, Instruction, OpCode, SENTINEL_IP};
pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, SourceLocation, Stage};
pub use value::Value;
