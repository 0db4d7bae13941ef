//! Interpreter registry
//!
//! Maps algebra names to interpreters. An executor holds an immutable snapshot behind
//! an `Arc`, so one registry can back any number of concurrent executions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{EngineError, Result};
use super::interpreter::Interpret;

/// Shared handle to an interpreter
pub type SharedInterpreter = Arc<dyn Interpret>;

/// Interpreters keyed by the algebra they serve
#[derive(Clone, Default)]
pub struct Registry {
    interpreters: Arc<HashMap<String, SharedInterpreter>>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<I>(mut self, interpreter: I) -> Result<Self>
    where
        I: Interpret + 'static,
    {
        self.register(interpreter)?;
        Ok(self)
    }

    /// Register an interpreter under its algebra name.
    ///
    /// At most one interpreter serves an algebra; combine several with
    /// [`Fanout`](super::interpreter::Fanout) instead.
    pub fn register<I>(&mut self, interpreter: I) -> Result<()>
    where
        I: Interpret + 'static,
    {
        self.register_shared(Arc::new(interpreter))
    }

    /// Register an interpreter that is already shared
    pub fn register_shared(&mut self, interpreter: SharedInterpreter) -> Result<()> {
        let algebra = interpreter.algebra().to_string();
        if self.interpreters.contains_key(&algebra) {
            return Err(EngineError::DuplicateInterpreter(algebra));
        }
        tracing::debug!(algebra = %algebra, "registered interpreter");
        Arc::make_mut(&mut self.interpreters).insert(algebra, interpreter);
        Ok(())
    }

    /// Interpreter for `algebra`, if one is registered
    pub fn get(&self, algebra: &str) -> Option<&SharedInterpreter> {
        self.interpreters.get(algebra)
    }

    /// Check whether an interpreter is registered for `algebra`
    pub fn contains(&self, algebra: &str) -> bool {
        self.interpreters.contains_key(algebra)
    }

    /// List all algebra names known to this registry, sorted
    pub fn algebras(&self) -> Vec<String> {
        let mut names: Vec<String> = self.interpreters.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered interpreters
    pub fn len(&self) -> usize {
        self.interpreters.len()
    }

    /// Whether no interpreter is registered
    pub fn is_empty(&self) -> bool {
        self.interpreters.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("algebras", &self.algebras())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::interpreter::Interpreter;

    #[test]
    fn lookup_by_algebra_name() {
        let registry = Registry::new()
            .with(Interpreter::builder("log").build())
            .unwrap()
            .with(Interpreter::builder("http").build())
            .unwrap();
        assert!(registry.contains("log"));
        assert_eq!(registry.get("http").map(|i| i.algebra()), Some("http"));
        assert!(registry.get("db").is_none());
        assert_eq!(registry.algebras(), vec!["http", "log"]);
    }

    #[test]
    fn second_interpreter_for_an_algebra_is_rejected() {
        let mut registry = Registry::new();
        registry.register(Interpreter::builder("log").build()).unwrap();
        match registry.register(Interpreter::builder("log").build()) {
            Err(EngineError::DuplicateInterpreter(name)) => assert_eq!(name, "log"),
            other => panic!("expected duplicate interpreter, got {:?}", other),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_are_snapshots() {
        let mut registry = Registry::new();
        registry.register(Interpreter::builder("log").build()).unwrap();
        let snapshot = registry.clone();
        registry.register(Interpreter::builder("http").build()).unwrap();
        assert!(!snapshot.contains("http"));
        assert!(registry.contains("http"));
    }
}
