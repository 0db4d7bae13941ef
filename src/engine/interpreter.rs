//! Interpreters: per-algebra dispatch from operations to their meaning
//!
//! An interpreter never performs the result it returns. It answers with a value, a new
//! operation, or a sequence of operations, and the executor carries on from there. This
//! is what lets one program run against a test double or a live back end.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::algebra::TypedAlgebra;
use super::error::{EngineError, Result};
use super::operation::{AlgebraOp, Composite, Operation, Step, returning};
use super::value::{Args, Value};

/// What a handler made of an operation
#[derive(Debug)]
pub enum Interpretation {
    /// Completed with no value; a binding receives `null`.
    Unit,
    /// The operation's resolved value
    Return(Value),
    /// Resolve this operation in place of the original
    Op(Operation),
    /// Run these steps as a nested composite
    Sequence(Vec<Step>),
}

impl Interpretation {
    /// Shorthand for [`Interpretation::Return`]
    pub fn value(value: impl Into<Value>) -> Self {
        Interpretation::Return(value.into())
    }
}

impl From<()> for Interpretation {
    fn from(_: ()) -> Self {
        Interpretation::Unit
    }
}

impl From<Operation> for Interpretation {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Returning(value) => Interpretation::Return(value),
            other => Interpretation::Op(other),
        }
    }
}

impl From<AlgebraOp> for Interpretation {
    fn from(op: AlgebraOp) -> Self {
        Interpretation::Op(Operation::Algebra(op))
    }
}

impl From<Composite> for Interpretation {
    fn from(composite: Composite) -> Self {
        Interpretation::Op(Operation::Composite(composite))
    }
}

impl From<Vec<Operation>> for Interpretation {
    fn from(ops: Vec<Operation>) -> Self {
        Interpretation::Sequence(ops.into_iter().map(Step::Op).collect())
    }
}

impl From<Vec<Step>> for Interpretation {
    fn from(steps: Vec<Step>) -> Self {
        Interpretation::Sequence(steps)
    }
}

/// Capability to replace the unexecuted remainder of the composite a dispatch runs in.
///
/// A fresh `Rewrite` is built for every dispatch and lent to the handler for the
/// duration of the call only. The executor applies the replacement after the handler
/// returns.
#[derive(Debug, Default)]
pub struct Rewrite {
    replacement: Option<Vec<Step>>,
}

impl Rewrite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Discard every step not yet executed and run `steps` instead.
    ///
    /// Calling this again within the same dispatch supersedes the earlier replacement.
    pub fn replace_remainder<I, S>(&mut self, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        self.replacement = Some(steps.into_iter().map(Into::into).collect());
    }

    /// Whether the handler asked for a replacement
    pub fn replaced(&self) -> bool {
        self.replacement.is_some()
    }

    pub(crate) fn into_replacement(self) -> Option<Vec<Step>> {
        self.replacement
    }
}

/// Dispatch function for one algebra
pub trait Interpret: Send + Sync {
    /// The algebra this interpreter serves
    fn algebra(&self) -> &str;

    /// Interpret `op`, which must belong to [`algebra`](Self::algebra)
    fn interpret(&self, op: &AlgebraOp, rewrite: &mut Rewrite) -> Result<Interpretation>;
}

/// Handler for one operation of a table-driven [`Interpreter`]
pub type Handler =
    Arc<dyn Fn(Args<'_>, &mut Rewrite) -> anyhow::Result<Interpretation> + Send + Sync>;

/// Interpreter built from a table of per-operation handlers
#[derive(Clone)]
pub struct Interpreter {
    algebra: String,
    handlers: HashMap<String, Handler>,
}

impl Interpreter {
    /// Start an interpreter for `algebra`
    pub fn builder(algebra: impl Into<String>) -> InterpreterBuilder {
        InterpreterBuilder {
            algebra: algebra.into(),
            handlers: HashMap::new(),
        }
    }

    /// Operation names this interpreter handles
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Dispatch without a program to rewrite; any replacement is dropped.
    pub fn interpret_detached(&self, op: &AlgebraOp) -> Result<Interpretation> {
        self.interpret(op, &mut Rewrite::new())
    }
}

impl Interpret for Interpreter {
    fn algebra(&self) -> &str {
        &self.algebra
    }

    fn interpret(&self, op: &AlgebraOp, rewrite: &mut Rewrite) -> Result<Interpretation> {
        if op.algebra() != self.algebra {
            return Err(EngineError::AlgebraMismatch {
                interpreter: self.algebra.clone(),
                algebra: op.algebra().to_string(),
                rendered: op.to_string(),
            });
        }

        let handler =
            self.handlers
                .get(op.operation())
                .ok_or_else(|| EngineError::UnknownOperation {
                    algebra: self.algebra.clone(),
                    operation: op.operation().to_string(),
                })?;

        let args = Args::new(op.algebra(), op.operation(), op.arguments());
        handler(args, rewrite).map_err(|err| handler_failure(op, err))
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<_> = self.operations().collect();
        operations.sort_unstable();
        f.debug_struct("Interpreter")
            .field("algebra", &self.algebra)
            .field("operations", &operations)
            .finish()
    }
}

/// Incremental [`Interpreter`] construction
pub struct InterpreterBuilder {
    algebra: String,
    handlers: HashMap<String, Handler>,
}

impl InterpreterBuilder {
    /// Register the handler for `operation`. A later registration replaces an earlier one.
    pub fn handle<F, R>(mut self, operation: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Args<'_>, &mut Rewrite) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Interpretation>,
    {
        self.handlers.insert(
            operation.into(),
            Arc::new(
                move |args: Args<'_>, rewrite: &mut Rewrite| -> anyhow::Result<Interpretation> {
                    handler(args, rewrite).map(Into::into)
                },
            ),
        );
        self
    }

    /// Finish the interpreter
    pub fn build(self) -> Interpreter {
        Interpreter {
            algebra: self.algebra,
            handlers: self.handlers,
        }
    }
}

type TypedHandler<A> =
    Box<dyn Fn(A, &mut Rewrite) -> anyhow::Result<Interpretation> + Send + Sync>;

/// Interpreter for a [`TypedAlgebra`]: one function matching exhaustively on the enum
pub struct TypedInterpreter<A> {
    handler: TypedHandler<A>,
    _algebra: PhantomData<fn() -> A>,
}

impl<A: TypedAlgebra> TypedInterpreter<A> {
    /// Wrap the dispatch function
    pub fn new<F, R>(handler: F) -> Self
    where
        F: Fn(A, &mut Rewrite) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Interpretation>,
    {
        Self {
            handler: Box::new(
                move |op: A, rewrite: &mut Rewrite| -> anyhow::Result<Interpretation> {
                    handler(op, rewrite).map(Into::into)
                },
            ),
            _algebra: PhantomData,
        }
    }
}

impl<A: TypedAlgebra> Interpret for TypedInterpreter<A> {
    fn algebra(&self) -> &str {
        A::NAME
    }

    fn interpret(&self, op: &AlgebraOp, rewrite: &mut Rewrite) -> Result<Interpretation> {
        let typed = A::from_operation(op)?;
        (self.handler)(typed, rewrite).map_err(|err| handler_failure(op, err))
    }
}

/// Several interpreters of one algebra applied to the same operation.
///
/// Each branch's result becomes one step of a nested sequence, in branch order, so
/// one operation can compile to several back ends (log it, then send it). The
/// fan-out resolves to the value of its last branch; earlier values are dropped.
pub struct Fanout {
    algebra: String,
    branches: Vec<Arc<dyn Interpret>>,
}

impl Fanout {
    /// Combine `branches`, which must all serve `algebra`
    pub fn new(algebra: impl Into<String>, branches: Vec<Arc<dyn Interpret>>) -> Result<Self> {
        let algebra = algebra.into();
        if let Some(stray) = branches.iter().find(|b| b.algebra() != algebra) {
            return Err(EngineError::AlgebraMismatch {
                interpreter: algebra,
                algebra: stray.algebra().to_string(),
                rendered: format!("fan-out branch for {}", stray.algebra()),
            });
        }
        Ok(Self { algebra, branches })
    }
}

impl Interpret for Fanout {
    fn algebra(&self) -> &str {
        &self.algebra
    }

    fn interpret(&self, op: &AlgebraOp, rewrite: &mut Rewrite) -> Result<Interpretation> {
        let mut steps = Vec::with_capacity(self.branches.len() + 1);
        let last = self.branches.len().saturating_sub(1);
        for (index, branch) in self.branches.iter().enumerate() {
            let interpretation = match branch.interpret(op, rewrite)? {
                // A value, not an escape: it must not cut the remaining branches short.
                Interpretation::Op(Operation::Returning(value)) => Interpretation::Return(value),
                other => other,
            };
            let step: Step = match interpretation {
                Interpretation::Unit => continue,
                Interpretation::Return(value) if index == last => {
                    steps.push(returning(value).into());
                    continue;
                }
                Interpretation::Return(_) => continue,
                Interpretation::Op(next) => next.into(),
                Interpretation::Sequence(nested) => Composite::from(nested).into(),
            };
            if index == last {
                // The sequence runs in its own scope, so this name cannot collide.
                steps.push(Step::bind("last", step));
                steps.push(Step::deferred(|env| Ok(returning(env["last"].clone()).into())));
            } else {
                steps.push(step);
            }
        }
        Ok(Interpretation::Sequence(steps))
    }
}

fn handler_failure(op: &AlgebraOp, err: anyhow::Error) -> EngineError {
    match err.downcast::<EngineError>() {
        Ok(engine) => engine,
        Err(source) => EngineError::Handler {
            algebra: op.algebra().to_string(),
            operation: op.operation().to_string(),
            source,
        },
    }
}
