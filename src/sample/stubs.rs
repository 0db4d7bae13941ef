//! Recording stand-ins for external services
//!
//! A [`TracingStub`] honours the same contract as a real callback-style service call:
//! it completes its io exactly once, with a preset value.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{Operation, Value, io};

/// Records every call, logs it, and completes with a preset value
#[derive(Debug, Clone)]
pub struct TracingStub {
    name: Arc<str>,
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
    result: Arc<Mutex<Value>>,
}

impl TracingStub {
    /// A stub that completes with `null`
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            calls: Arc::default(),
            result: Arc::new(Mutex::new(Value::Null)),
        }
    }

    /// Complete every later call with `value` instead
    pub fn with_result(self, value: Value) -> Self {
        *self.result.lock() = value;
        self
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a call and return the value it completes with
    pub fn record(&self, args: Vec<Value>) -> Value {
        if args.is_empty() {
            tracing::info!(stub = %self.name, "called with no arguments");
        } else {
            tracing::info!(stub = %self.name, args = ?args, "called");
        }
        self.calls.lock().push(args);
        self.result.lock().clone()
    }

    /// An io step that calls this stub
    pub fn io(&self, args: Vec<Value>) -> Operation {
        let stub = self.clone();
        io(move |done| {
            let value = stub.record(args);
            if let Err(err) = done.complete(value) {
                tracing::warn!(stub = %stub.name, error = %err, "stub completion rejected");
            }
        })
    }

    /// Arguments of every call so far, oldest first
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Stubs for each HTTP verb
#[derive(Debug, Clone)]
pub struct HttpStubs {
    /// `GET`
    pub get: TracingStub,
    /// `PUT`
    pub put: TracingStub,
    /// `POST`
    pub post: TracingStub,
    /// `DELETE`
    pub delete: TracingStub,
}

impl HttpStubs {
    /// Every verb succeeds with `null`
    pub fn new() -> Self {
        Self {
            get: TracingStub::new("http.get"),
            put: TracingStub::new("http.put"),
            post: TracingStub::new("http.post"),
            delete: TracingStub::new("http.delete"),
        }
    }
}

impl Default for HttpStubs {
    fn default() -> Self {
        Self::new()
    }
}
