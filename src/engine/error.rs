//! Error types for the effect engine
//!
//! Every variant is a construction-time or dispatch-time defect. None of them are
//! recoverable by the engine: they abort the current execution and surface to the
//! caller through `Result`, never through the completion callback. Business-level
//! failures travel as ordinary values through `returning` instead.

use thiserror::Error;

use super::executor::ExecutionState;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation constructor received the wrong number of arguments
    #[error(
        "Called {algebra}.{operation} with {received} arguments; {expected} arguments are expected"
    )]
    Arity {
        /// Algebra the constructor belongs to
        algebra: String,
        /// Operation being constructed
        operation: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        received: usize,
    },

    /// An interpreter was handed an operation from another algebra
    #[error(
        "Tried to interpret operation {rendered} as an operation in the {interpreter} algebra, but it belongs to the {algebra} algebra"
    )]
    AlgebraMismatch {
        /// Algebra served by the interpreter
        interpreter: String,
        /// Algebra the operation belongs to
        algebra: String,
        /// Rendering of the rejected operation
        rendered: String,
    },

    /// The operation name is not part of the algebra or has no handler
    #[error("Tried to interpret unknown operation |{operation}| as an operation in the {algebra} algebra")]
    UnknownOperation {
        /// Algebra that was consulted
        algebra: String,
        /// Operation name that was not found
        operation: String,
    },

    /// A name was bound twice within one composite scope
    #[error("Tried to bind to variable |{name}|, but it was already defined in this scope")]
    DuplicateBinding {
        /// The rebound name
        name: String,
    },

    /// The program contains an algebra with no registered interpreter
    #[error("Executor received operation that it does not have an interpreter for: {rendered}")]
    MissingInterpreter {
        /// Algebra with no interpreter
        algebra: String,
        /// Rendering of the operation
        rendered: String,
    },

    /// A step or deferred step had a malformed shape
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// A handler or io function broke its contract with the engine
    #[error("Handler contract violated: {0}")]
    HandlerContract(String),

    /// A handler reported a failure of its own
    #[error("Handler for {algebra}.{operation} failed: {source}")]
    Handler {
        /// Algebra of the failing handler
        algebra: String,
        /// Operation of the failing handler
        operation: String,
        /// Underlying handler error
        #[source]
        source: anyhow::Error,
    },

    /// A handler asked for an argument the operation does not carry
    #[error("Operation {algebra}.{operation} has no argument |{name}|")]
    MissingArgument {
        /// Algebra of the operation
        algebra: String,
        /// Operation name
        operation: String,
        /// Requested parameter name
        name: String,
    },

    /// An argument could not be decoded into the requested type
    #[error("Argument |{name}| of {algebra}.{operation} is invalid: {detail} (got {rendered})")]
    InvalidArgument {
        /// Algebra of the operation
        algebra: String,
        /// Operation name
        operation: String,
        /// Parameter name
        name: String,
        /// Decoder message
        detail: String,
        /// Rendering of the argument value
        rendered: String,
    },

    /// Two interpreters were registered for one algebra
    #[error("An interpreter for the {0} algebra is already registered")]
    DuplicateInterpreter(String),

    /// Composite nesting exceeded the configured limit
    #[error("Composite nesting exceeded the limit of {limit} frames")]
    DepthExceeded {
        /// Configured maximum depth
        limit: usize,
    },

    /// The execution was driven while not in the `Running` state
    #[error("Execution cannot advance while {0:?}")]
    NotRunning(ExecutionState),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Render a value for diagnostics
pub(crate) fn render(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}
