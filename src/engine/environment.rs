//! Per-composite binding scope

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};
use super::value::Value;

/// Names bound by the steps of one composite, in binding order.
///
/// A fresh environment is created for every composite invocation and dropped when the
/// composite finishes. Nested composites never see their parent's bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(serde_json::Map<String, Value>);

impl Environment {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, refusing to rebind a name already in scope
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if self.0.contains_key(&name) {
            return Err(EngineError::DuplicateBinding { name });
        }
        self.0.insert(name, value);
        Ok(())
    }

    /// Look up a bound value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether `name` is bound in this scope
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been bound yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bindings in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The scope as a JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

static NULL: Value = Value::Null;

impl std::ops::Index<&str> for Environment {
    type Output = Value;

    /// Missing names index to `null`, mirroring an unbound lookup
    fn index(&self, name: &str) -> &Value {
        self.0.get(name).unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_rebinding() {
        let mut env = Environment::new();
        env.bind("x", json!(5)).unwrap();
        match env.bind("x", json!(6)) {
            Err(EngineError::DuplicateBinding { name }) => assert_eq!(name, "x"),
            other => panic!("expected duplicate binding, got {:?}", other),
        }
        assert_eq!(env["x"], json!(5));
    }

    #[test]
    fn null_bindings_still_occupy_the_name() {
        let mut env = Environment::new();
        env.bind("nothing", Value::Null).unwrap();
        assert!(env.contains("nothing"));
        assert!(env.bind("nothing", json!(1)).is_err());
    }

    #[test]
    fn into_value_keeps_binding_order() {
        let mut env = Environment::new();
        env.bind("b", json!(2)).unwrap();
        env.bind("a", json!(1)).unwrap();
        let rendered = serde_json::to_string(&env.into_value()).unwrap();
        assert_eq!(rendered, r#"{"b":2,"a":1}"#);
    }
}
