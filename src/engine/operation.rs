//! Program representation: operations, steps and composites
//!
//! Everything here is inert data. Building an operation or a composite never performs a
//! side effect; only the executor does, and only at `io` steps.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use super::environment::Environment;
use super::error::{Result, render};
use super::io::{Io, IoCallback};
use super::value::{Arguments, Value};

/// One unit of work or control action
#[derive(Debug)]
pub enum Operation {
    /// An operation from a user algebra, resolved by that algebra's interpreter
    Algebra(AlgebraOp),
    /// A single-shot side effect
    Io(Io),
    /// A nested program with its own scope
    Composite(Composite),
    /// Escape from the current composite with a terminal value
    Returning(Value),
}

impl Operation {
    /// Whether this is one of the builtin operations the executor handles itself
    pub fn is_special(&self) -> bool {
        !matches!(self, Operation::Algebra(_))
    }

    /// The algebra operation, if this is one
    pub fn as_algebra(&self) -> Option<&AlgebraOp> {
        match self {
            Operation::Algebra(op) => Some(op),
            _ => None,
        }
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Operation::Algebra(op) => op.to_string(),
            Operation::Io(_) => "io".to_string(),
            Operation::Composite(c) => format!("composite({} steps)", c.len()),
            Operation::Returning(value) => format!("returning({})", render(value)),
        }
    }
}

impl From<AlgebraOp> for Operation {
    fn from(op: AlgebraOp) -> Self {
        Operation::Algebra(op)
    }
}

impl From<Composite> for Operation {
    fn from(composite: Composite) -> Self {
        Operation::Composite(composite)
    }
}

impl From<Io> for Operation {
    fn from(io: Io) -> Self {
        Operation::Io(io)
    }
}

/// A tagged request against a user algebra.
///
/// Fields are private: once constructed the arguments are never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgebraOp {
    algebra: String,
    operation: String,
    arguments: Arguments,
}

impl AlgebraOp {
    pub(crate) fn new(
        algebra: impl Into<String>,
        operation: impl Into<String>,
        arguments: Arguments,
    ) -> Self {
        Self {
            algebra: algebra.into(),
            operation: operation.into(),
            arguments,
        }
    }

    /// Name of the algebra this operation belongs to
    pub fn algebra(&self) -> &str {
        &self.algebra
    }

    /// Name of the operation within its algebra
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Arguments in declared parameter order
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

impl fmt::Display for AlgebraOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.algebra,
            self.operation,
            render(&self.arguments.to_value())
        )
    }
}

/// A step computed from the bindings made so far in its composite
pub type DeferredFn = Box<dyn FnOnce(&Environment) -> Result<Step> + Send>;

/// One element of a composite
pub enum Step {
    /// Run an operation and discard its value
    Op(Operation),
    /// Run the inner step and bind its value under `name` in the current scope
    Bind {
        /// Binding name, unique within the scope
        name: String,
        /// The bound step: an operation or a deferred step
        step: Box<Step>,
    },
    /// Compute the step to run from the current scope. Invoked at most once.
    Deferred(DeferredFn),
}

impl Step {
    /// A plain operation step
    pub fn op(op: impl Into<Operation>) -> Self {
        Step::Op(op.into())
    }

    /// `{ name: op }`: bind the operation's resolved value
    pub fn bind(name: impl Into<String>, step: impl Into<Step>) -> Self {
        Step::Bind {
            name: name.into(),
            step: Box::new(step.into()),
        }
    }

    /// A step computed from the environment when the executor reaches it
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce(&Environment) -> Result<Step> + Send + 'static,
    {
        Step::Deferred(Box::new(f))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Op(op) => f.debug_tuple("Op").field(op).finish(),
            Step::Bind { name, step } => f
                .debug_struct("Bind")
                .field("name", name)
                .field("step", step)
                .finish(),
            Step::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Operation> for Step {
    fn from(op: Operation) -> Self {
        Step::Op(op)
    }
}

impl From<AlgebraOp> for Step {
    fn from(op: AlgebraOp) -> Self {
        Step::Op(Operation::Algebra(op))
    }
}

impl From<Composite> for Step {
    fn from(composite: Composite) -> Self {
        Step::Op(Operation::Composite(composite))
    }
}

/// An ordered program, consumed front to back
#[derive(Debug, Default)]
pub struct Composite {
    steps: VecDeque<Step>,
}

impl Composite {
    /// Build a composite from steps
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a step
    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push_back(step.into());
    }

    /// Builder form of [`push`](Self::push)
    pub fn then(mut self, step: impl Into<Step>) -> Self {
        self.push(step);
        self
    }

    /// Builder form of a bound step
    pub fn bind(self, name: impl Into<String>, step: impl Into<Step>) -> Self {
        self.then(Step::bind(name, step))
    }

    /// Builder form of a deferred step
    pub fn deferred<F>(self, f: F) -> Self
    where
        F: FnOnce(&Environment) -> Result<Step> + Send + 'static,
    {
        self.then(Step::deferred(f))
    }

    /// Steps not yet consumed
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether every step has been consumed
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn pop_front(&mut self) -> Option<Step> {
        self.steps.pop_front()
    }

    /// Drop the unconsumed tail and put `steps` in its place
    pub(crate) fn replace_remainder(&mut self, steps: Vec<Step>) {
        self.steps = steps.into();
    }
}

impl From<Vec<Step>> for Composite {
    fn from(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl From<Vec<Operation>> for Composite {
    fn from(ops: Vec<Operation>) -> Self {
        Composite::new(ops)
    }
}

impl From<Step> for Composite {
    fn from(step: Step) -> Self {
        Composite::new([step])
    }
}

impl From<AlgebraOp> for Composite {
    fn from(op: AlgebraOp) -> Self {
        Composite::new([Step::from(op)])
    }
}

/// Accepts a program in any of its shapes; a composite passes through unwrapped.
impl From<Operation> for Composite {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Composite(composite) => composite,
            other => Composite::new([Step::Op(other)]),
        }
    }
}

impl FromIterator<Step> for Composite {
    fn from_iter<T: IntoIterator<Item = Step>>(iter: T) -> Self {
        Composite::new(iter)
    }
}

/// Builtin: wrap a callback-style side effect
pub fn io<F>(f: F) -> Operation
where
    F: FnOnce(IoCallback) + Send + 'static,
{
    Operation::Io(Io::from_callback(f))
}

/// Builtin: wrap a future as a side effect
pub fn io_async<Fut>(future: Fut) -> Operation
where
    Fut: Future<Output = Value> + Send + 'static,
{
    Operation::Io(Io::from_future(future))
}

/// Builtin: a nested program with its own scope
pub fn composite<I, S>(steps: I) -> Operation
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    Operation::Composite(Composite::new(steps))
}

/// Builtin: escape the current composite with `value`
pub fn returning(value: impl Into<Value>) -> Operation {
    Operation::Returning(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(name: &str) -> AlgebraOp {
        AlgebraOp::new(
            "test",
            name,
            Arguments::from_pairs([("x".to_string(), json!(1))]),
        )
    }

    #[test]
    fn builtins_are_special() {
        assert!(returning(1).is_special());
        assert!(composite(Vec::<Step>::new()).is_special());
        assert!(io(|done| drop(done)).is_special());
        assert!(!Operation::from(op("a")).is_special());
    }

    #[test]
    fn composite_is_a_queue() {
        let mut program = Composite::new([op("a"), op("b")]).then(op("c"));
        let names: Vec<String> = std::iter::from_fn(|| program.pop_front())
            .map(|step| match step {
                Step::Op(Operation::Algebra(op)) => op.operation().to_string(),
                other => panic!("unexpected step {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn replacing_the_remainder_keeps_nothing_of_the_old_tail() {
        let mut program = Composite::new([op("a"), op("b"), op("c")]);
        program.pop_front();
        program.replace_remainder(vec![Step::op(returning(json!({"status": 401})))]);
        assert_eq!(program.len(), 1);
        match program.pop_front() {
            Some(Step::Op(Operation::Returning(value))) => {
                assert_eq!(value, json!({"status": 401}))
            }
            other => panic!("expected returning, got {:?}", other),
        }
    }

    #[test]
    fn bare_operation_program_is_wrapped_but_composite_is_not() {
        assert_eq!(Composite::from(Operation::from(op("a"))).len(), 1);
        let nested = composite([op("a"), op("b")]);
        assert_eq!(Composite::from(nested).len(), 2);
    }

    #[test]
    fn display_renders_arguments() {
        assert_eq!(op("a").to_string(), r#"test.a({"x":1})"#);
    }
}
