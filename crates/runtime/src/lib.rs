//! The Nova virtual machine (Component I, §4.7) and built-in handler
//! implementations (§4.4, §6). This is the only crate with I/O access —
//! `nova-core` carries only the built-in registry's `{id, name, arity}`
//! metadata, and `nova-compiler` never touches a byte of program output.

pub mod builtins;
pub mod vm;

pub use vm::Vm;
