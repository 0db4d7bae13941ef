//! Effector – composable interpreters for effectful programs
//!
//! Programs are plain data: operations drawn from named algebras, arranged in
//! composites that bind intermediate results by name. Interpreters translate each
//! operation into a value, into further operations, or eventually into a single-shot
//! `io` side effect, and the executor steps through the result in strict program
//! order. Swapping the interpreters swaps the back end; the program never changes.
//!
//! This crate provides:
//! - Algebras, dynamic or as closed serde enums, with arity-checked constructors
//! - Interpreters with a rewrite capability over the rest of the running composite
//! - A non-recursive executor that suspends only at `io` steps
//! - A sample application and a CLI that drives it

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Engine core: algebras, interpreters, the executor
pub mod engine;

/// Sample algebras, interpreters and programs
pub mod sample;

// Re-export key types for convenience
pub use engine::{
    Algebra, Composite, EngineError, Executor, ExecutorConfig, Interpreter, Operation, Outcome,
    Registry, Step, composite, io, io_async, returning,
};

/// Current version of the effector crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
