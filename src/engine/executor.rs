//! The executor: a step-at-a-time state machine over nested composites
//!
//! Nesting is an explicit stack of [`Frame`]s rather than recursion, so an execution
//! costs constant native stack per step however long or deep the program is. Each
//! frame owns the unconsumed steps of one composite, its environment, and the name
//! its parent will bind the composite's result to.
//!
//! [`Execution::step`] performs exactly one synchronous transition. The only
//! suspension point is an `io` step, which surfaces as [`Event::Io`]; the caller
//! performs it and hands the result back through [`Execution::resume`].
//! [`Execution::run`] is the usual driver that does this on tokio.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use super::config::ExecutorConfig;
use super::environment::Environment;
use super::error::{EngineError, Result};
use super::interpreter::{Interpretation, Rewrite};
use super::io::Io;
use super::operation::{AlgebraOp, Composite, Operation, Step};
use super::registry::Registry;
use super::value::Value;

/// Identifier of one execution, carried on its tracing span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    /// Create a new random ExecutionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an execution stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Ready for the next [`Execution::step`]
    Running,
    /// Suspended on an io step until [`Execution::resume`]
    AwaitingIo,
    /// Delivered its outcome
    Done,
    /// Aborted by an engine error
    Failed,
}

/// What a finished execution delivers
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The top-level composite ran out of steps; its bindings.
    Environment(Environment),
    /// The top-level composite escaped with `returning`
    Returned(Value),
}

impl Outcome {
    /// The escaped value, if the program escaped
    pub fn returned(&self) -> Option<&Value> {
        match self {
            Outcome::Returned(value) => Some(value),
            Outcome::Environment(_) => None,
        }
    }

    /// The final environment, if the program ran to exhaustion
    pub fn environment(&self) -> Option<&Environment> {
        match self {
            Outcome::Environment(env) => Some(env),
            Outcome::Returned(_) => None,
        }
    }

    /// Either form as a plain value; an environment becomes a JSON object.
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Environment(env) => env.into_value(),
            Outcome::Returned(value) => value,
        }
    }
}

/// An io step the execution is suspended on
#[derive(Debug)]
pub struct PendingIo {
    io: Io,
}

impl PendingIo {
    /// Perform the side effect and wait for its single result
    pub async fn perform(self) -> Result<Value> {
        self.io.start().await
    }
}

/// Result of one [`Execution::step`]
#[derive(Debug)]
pub enum Event {
    /// A synchronous transition happened
    Progress,
    /// The execution needs this io performed before it can continue
    Io(PendingIo),
    /// The program finished
    Finished(Outcome),
}

/// One composite being consumed
struct Frame {
    steps: Composite,
    env: Environment,
    binding: Option<String>,
    /// Stands in for an exhausted composite, which delivers `null` whatever this
    /// one produces.
    discards_result: bool,
}

/// Unit of work inside a single step. Operations an interpreter hands back resolve
/// differently from the ones written in the program: their `returning` is a value,
/// not an escape.
enum Unit {
    Step(Step),
    Interpreted(Operation),
}

/// A single run of a program against a registry
pub struct Execution {
    id: ExecutionId,
    registry: Registry,
    config: ExecutorConfig,
    frames: Vec<Frame>,
    state: ExecutionState,
    pending_binding: Option<String>,
    span: tracing::Span,
}

impl Execution {
    /// Prepare `program` for execution. Nothing runs until the first step.
    pub fn new(registry: Registry, config: ExecutorConfig, program: Composite) -> Self {
        let id = ExecutionId::new();
        Self {
            id,
            registry,
            config,
            frames: vec![Frame {
                steps: program,
                env: Environment::new(),
                binding: None,
                discards_result: false,
            }],
            state: ExecutionState::Running,
            pending_binding: None,
            span: tracing::info_span!("execution", id = %id),
        }
    }

    /// This execution's identifier
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Number of composites currently open, the top level included
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Perform one synchronous transition
    pub fn step(&mut self) -> Result<Event> {
        if self.state != ExecutionState::Running {
            return Err(EngineError::NotRunning(self.state));
        }

        let span = self.span.clone();
        let _entered = span.enter();
        match self.advance() {
            Ok(event) => {
                match &event {
                    Event::Progress => {}
                    Event::Io(_) => self.state = ExecutionState::AwaitingIo,
                    Event::Finished(_) => {
                        tracing::debug!("execution finished");
                        self.state = ExecutionState::Done;
                    }
                }
                Ok(event)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Deliver the result of the io step the execution is suspended on
    pub fn resume(&mut self, value: Value) -> Result<()> {
        if self.state != ExecutionState::AwaitingIo {
            return Err(EngineError::NotRunning(self.state));
        }

        let span = self.span.clone();
        let _entered = span.enter();
        self.state = ExecutionState::Running;
        let binding = self.pending_binding.take();
        self.bind(binding, value).map_err(|err| self.fail(err))
    }

    /// Drive the execution to completion, performing io steps as they come up
    pub async fn run(&mut self) -> Result<Outcome> {
        loop {
            match self.step()? {
                Event::Progress => {
                    if self.config.yield_between_steps {
                        tokio::task::yield_now().await;
                    }
                }
                Event::Io(pending) => {
                    match pending.perform().instrument(self.span.clone()).await {
                        Ok(value) => self.resume(value)?,
                        Err(err) => return Err(self.fail(err)),
                    }
                }
                Event::Finished(outcome) => return Ok(outcome),
            }
        }
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        tracing::debug!(parent: &self.span, error = %err, "execution failed");
        self.state = ExecutionState::Failed;
        self.frames.clear();
        self.pending_binding = None;
        err
    }

    fn advance(&mut self) -> Result<Event> {
        let frame = self.frames.last_mut().ok_or_else(no_frame)?;
        let Some(step) = frame.steps.pop_front() else {
            return self.leave(None);
        };
        self.resolve(None, Unit::Step(step))
    }

    fn resolve(&mut self, mut binding: Option<String>, mut unit: Unit) -> Result<Event> {
        loop {
            let (op, interpreted) = match unit {
                Unit::Step(Step::Bind { name, step }) => {
                    if let Some(outer) = binding {
                        return Err(EngineError::InvalidStep(format!(
                            "binding |{}| wraps another binding |{}|",
                            outer, name
                        )));
                    }
                    self.check_binding(&name)?;
                    binding = Some(name);
                    unit = Unit::Step(*step);
                    continue;
                }
                Unit::Step(Step::Deferred(deferred)) => {
                    let env = &self.frames.last().ok_or_else(no_frame)?.env;
                    unit = Unit::Step(deferred(env)?);
                    continue;
                }
                Unit::Step(Step::Op(op)) => (op, false),
                Unit::Interpreted(op) => (op, true),
            };

            match op {
                Operation::Returning(value) if interpreted => {
                    return self.bind(binding, value).map(|()| Event::Progress);
                }
                Operation::Returning(value) => {
                    tracing::debug!(depth = self.frames.len(), "escaping composite");
                    return self.leave(Some(value));
                }
                Operation::Io(io) => {
                    self.pending_binding = binding;
                    return Ok(Event::Io(PendingIo { io }));
                }
                Operation::Composite(composite) => {
                    self.enter(composite, binding)?;
                    return Ok(Event::Progress);
                }
                Operation::Algebra(op) => match self.dispatch(&op)? {
                    Interpretation::Unit => {
                        return self.bind(binding, Value::Null).map(|()| Event::Progress);
                    }
                    Interpretation::Return(value) => {
                        return self.bind(binding, value).map(|()| Event::Progress);
                    }
                    Interpretation::Op(next) => unit = Unit::Interpreted(next),
                    Interpretation::Sequence(steps) => {
                        self.enter(Composite::from(steps), binding)?;
                        return Ok(Event::Progress);
                    }
                },
            }
        }
    }

    fn dispatch(&mut self, op: &AlgebraOp) -> Result<Interpretation> {
        let interpreter = self
            .registry
            .get(op.algebra())
            .cloned()
            .ok_or_else(|| EngineError::MissingInterpreter {
                algebra: op.algebra().to_string(),
                rendered: op.to_string(),
            })?;

        tracing::debug!(
            algebra = op.algebra(),
            operation = op.operation(),
            "dispatching operation"
        );
        let mut rewrite = Rewrite::new();
        let interpretation = interpreter.interpret(op, &mut rewrite)?;

        if let Some(steps) = rewrite.into_replacement() {
            tracing::debug!(
                algebra = op.algebra(),
                operation = op.operation(),
                steps = steps.len(),
                "replacing remainder of composite"
            );
            let frame = self.frames.last_mut().ok_or_else(no_frame)?;
            frame.steps.replace_remainder(steps);
        }
        Ok(interpretation)
    }

    fn check_binding(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(EngineError::InvalidStep("binding name is empty".into()));
        }
        let frame = self.frames.last().ok_or_else(no_frame)?;
        if frame.env.contains(name) {
            return Err(EngineError::DuplicateBinding {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn bind(&mut self, binding: Option<String>, value: Value) -> Result<()> {
        let Some(name) = binding else {
            return Ok(());
        };
        tracing::trace!(name = %name, "binding");
        let frame = self.frames.last_mut().ok_or_else(no_frame)?;
        frame.env.bind(name, value)
    }

    fn enter(&mut self, steps: Composite, binding: Option<String>) -> Result<()> {
        // Once an inner composite's last step has started, nothing can read its
        // scope again: take its place so tail-position loops keep a flat stack.
        let exhausted = self.frames.len() > 1
            && self.frames.last().is_some_and(|frame| frame.steps.is_empty());
        if exhausted {
            let frame = self.frames.pop().ok_or_else(no_frame)?;
            tracing::trace!(
                depth = self.frames.len() + 1,
                steps = steps.len(),
                "replacing exhausted composite"
            );
            self.frames.push(Frame {
                steps,
                env: Environment::new(),
                binding: frame.binding,
                discards_result: true,
            });
            return Ok(());
        }

        if let Some(limit) = self.config.max_depth {
            if self.frames.len() >= limit {
                return Err(EngineError::DepthExceeded { limit });
            }
        }
        tracing::debug!(
            depth = self.frames.len() + 1,
            steps = steps.len(),
            "entering composite"
        );
        self.frames.push(Frame {
            steps,
            env: Environment::new(),
            binding,
            discards_result: false,
        });
        Ok(())
    }

    /// Close the current composite. `escaped` is the `returning` value, if any.
    fn leave(&mut self, escaped: Option<Value>) -> Result<Event> {
        let frame = self.frames.pop().ok_or_else(no_frame)?;
        tracing::debug!(depth = self.frames.len() + 1, "leaving composite");

        if self.frames.is_empty() {
            let outcome = match escaped {
                Some(value) => Outcome::Returned(value),
                None => Outcome::Environment(frame.env),
            };
            return Ok(Event::Finished(outcome));
        }

        let value = match escaped {
            Some(value) if !frame.discards_result => value,
            _ => Value::Null,
        };
        self.bind(frame.binding, value)?;
        Ok(Event::Progress)
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("depth", &self.frames.len())
            .finish()
    }
}

fn no_frame() -> EngineError {
    EngineError::InvalidStep("execution has no open composite".into())
}

/// Runs programs against a fixed set of interpreters.
///
/// Cheap to clone; every execution it starts shares the same read-only registry and
/// owns its own environments.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Registry,
    config: ExecutorConfig,
}

impl Executor {
    /// Executor with the default configuration
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Executor with an explicit configuration
    pub fn with_config(registry: Registry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// The interpreters this executor dispatches to
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The active configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Prepare an execution to be driven by hand
    pub fn start(&self, program: impl Into<Composite>) -> Execution {
        Execution::new(self.registry.clone(), self.config.clone(), program.into())
    }

    /// Run `program` to completion
    pub async fn execute(&self, program: impl Into<Composite>) -> Result<Outcome> {
        let mut execution = self.start(program);
        execution.run().await
    }

    /// Run `program` and hand its outcome to `on_complete`.
    ///
    /// Engine errors are returned from this call and never reach the callback.
    pub async fn execute_with<F>(&self, program: impl Into<Composite>, on_complete: F) -> Result<()>
    where
        F: FnOnce(Outcome),
    {
        let outcome = self.execute(program).await?;
        on_complete(outcome);
        Ok(())
    }
}
