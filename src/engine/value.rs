//! Operation argument values
//!
//! Values are plain JSON. `null` stands in for both "null" and "undefined" and is
//! preserved verbatim wherever it appears.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result, render};

/// Runtime value carried by arguments, bindings and results
pub type Value = serde_json::Value;

/// Ordered mapping from parameter name to argument value.
///
/// Iteration order is the declared parameter order. There are no mutating accessors:
/// once an operation is built its arguments never change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(serde_json::Map<String, Value>);

impl Arguments {
    /// Pair parameter names with positional values
    pub(crate) fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self(pairs.into_iter().collect())
    }

    pub(crate) fn from_map(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }

    /// Look up an argument by parameter name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the operation carries the named parameter
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Parameter names in declared order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// (name, value) pairs in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the operation takes no arguments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arguments as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// The arguments a handler receives, together with the name of the operation they
/// belong to so that accessor errors can say where they came from.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    pub(crate) algebra: &'a str,
    pub(crate) operation: &'a str,
    pub(crate) arguments: &'a Arguments,
}

impl<'a> Args<'a> {
    pub(crate) fn new(algebra: &'a str, operation: &'a str, arguments: &'a Arguments) -> Self {
        Self {
            algebra,
            operation,
            arguments,
        }
    }

    /// Borrow the underlying arguments
    pub fn arguments(&self) -> &'a Arguments {
        self.arguments
    }

    /// Fetch an argument, failing if the parameter is absent
    pub fn require(&self, name: &str) -> Result<&'a Value> {
        self.arguments
            .get(name)
            .ok_or_else(|| EngineError::MissingArgument {
                algebra: self.algebra.to_string(),
                operation: self.operation.to_string(),
                name: name.to_string(),
            })
    }

    /// Decode an argument into `T`
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.require(name)?;
        serde_json::from_value(value.clone()).map_err(|err| EngineError::InvalidArgument {
            algebra: self.algebra.to_string(),
            operation: self.operation.to_string(),
            name: name.to_string(),
            detail: err.to_string(),
            rendered: render(value),
        })
    }
}

impl std::ops::Deref for Args<'_> {
    type Target = Arguments;

    fn deref(&self) -> &Arguments {
        self.arguments
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Arguments {
        Arguments::from_pairs([
            ("zeta".to_string(), json!(1)),
            ("alpha".to_string(), Value::Null),
            ("mid".to_string(), json!({"foo": "bar"})),
        ])
    }

    #[test]
    fn preserves_declared_order() {
        let args = sample();
        let names: Vec<_> = args.names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn null_is_kept_verbatim() {
        let args = sample();
        assert!(args.contains("alpha"));
        assert_eq!(args.get("alpha"), Some(&Value::Null));
    }

    #[test]
    fn view_reports_missing_and_invalid_arguments() {
        let args = sample();
        let view = Args {
            algebra: "alg",
            operation: "op",
            arguments: &args,
        };

        assert_eq!(view.parse::<i64>("zeta").unwrap(), 1);
        assert!(matches!(
            view.require("nope"),
            Err(EngineError::MissingArgument { ref name, .. }) if name == "nope"
        ));
        match view.parse::<String>("mid") {
            Err(EngineError::InvalidArgument { rendered, .. }) => {
                assert_eq!(rendered, r#"{"foo":"bar"}"#)
            }
            other => panic!("expected invalid argument, got {:?}", other),
        }
    }
}
