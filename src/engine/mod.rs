//! Effect engine core
//!
//! Programs are inert data built from algebra operations and three builtins (`io`,
//! `composite`, `returning`). Interpreters give operations their meaning, and the
//! executor walks a program step by step, dispatching each operation to the
//! interpreter registered for its algebra.

pub mod algebra;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod interpreter;
pub mod io;
pub mod operation;
pub mod registry;
pub mod value;

pub use algebra::{Algebra, AlgebraBuilder, Constructor, Signature, TypedAlgebra};
pub use config::ExecutorConfig;
pub use environment::Environment;
pub use error::{EngineError, Result};
pub use executor::{
    Event, Execution, ExecutionId, ExecutionState, Executor, Outcome, PendingIo,
};
pub use interpreter::{
    Fanout, Interpret, Interpretation, Interpreter, InterpreterBuilder, Rewrite,
    TypedInterpreter,
};
pub use io::{Io, IoCallback};
pub use operation::{
    AlgebraOp, Composite, DeferredFn, Operation, Step, composite, io, io_async, returning,
};
pub use registry::{Registry, SharedInterpreter};
pub use value::{Args, Arguments, Value};
