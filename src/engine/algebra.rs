//! Algebras: named families of operation constructors
//!
//! An [`Algebra`] is a runtime table of operation names and parameter lists. Its
//! constructors only build data and check arity. A [`TypedAlgebra`] is the closed,
//! compile-time-checked variant: a serde enum whose variants are the operations.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{EngineError, Result, render};
use super::operation::AlgebraOp;
use super::value::{Arguments, Value};

/// Parameter list of one operation, plus an optional documented result type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<String>,
    returns: Option<String>,
}

impl Signature {
    /// Signature with the given parameter names, in positional order
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            returns: None,
        }
    }

    /// Document the type callers should expect the resolved value to have.
    ///
    /// The label is informational; it does not count toward arity and is not enforced.
    pub fn returns(mut self, label: impl Into<String>) -> Self {
        self.returns = Some(label.into());
        self
    }

    /// Declared parameter names
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Documented result type, if any
    pub fn return_label(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    /// Number of positional arguments a constructor accepts
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A named group of operation constructors. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Algebra {
    name: String,
    operations: Vec<(String, Signature)>,
}

impl Algebra {
    /// Build an algebra from `(operation name, signature)` pairs
    pub fn new<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = (S, Signature)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            operations: operations
                .into_iter()
                .map(|(op, sig)| (op.into(), sig))
                .collect(),
        }
    }

    /// Start building an algebra operation by operation
    pub fn builder(name: impl Into<String>) -> AlgebraBuilder {
        AlgebraBuilder {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// The algebra's namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation names in declaration order
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|(name, _)| name.as_str())
    }

    /// Signature of an operation
    pub fn signature(&self, operation: &str) -> Option<&Signature> {
        self.operations
            .iter()
            .find(|(name, _)| name == operation)
            .map(|(_, sig)| sig)
    }

    /// Constructor for one operation
    pub fn constructor(&self, operation: &str) -> Result<Constructor<'_>> {
        let (name, signature) = self
            .operations
            .iter()
            .find(|(name, _)| name == operation)
            .ok_or_else(|| EngineError::UnknownOperation {
                algebra: self.name.clone(),
                operation: operation.to_string(),
            })?;
        Ok(Constructor {
            algebra: &self.name,
            operation: name,
            signature,
        })
    }

    /// Construct an operation from positional arguments
    pub fn call<I>(&self, operation: &str, args: I) -> Result<AlgebraOp>
    where
        I: IntoIterator<Item = Value>,
    {
        self.constructor(operation)?.call(args)
    }
}

/// Incremental [`Algebra`] construction
#[derive(Debug)]
pub struct AlgebraBuilder {
    name: String,
    operations: Vec<(String, Signature)>,
}

impl AlgebraBuilder {
    /// Declare an operation with the given parameters
    pub fn operation<I, S>(mut self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operations.push((name.into(), Signature::new(params)));
        self
    }

    /// Declare an operation whose resolved value callers should treat as `returns`
    pub fn operation_returning<I, S>(
        mut self,
        name: impl Into<String>,
        params: I,
        returns: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operations
            .push((name.into(), Signature::new(params).returns(returns)));
        self
    }

    /// Finish the algebra
    pub fn build(self) -> Algebra {
        Algebra {
            name: self.name,
            operations: self.operations,
        }
    }
}

/// Constructor for a single operation of an algebra
#[derive(Debug, Clone, Copy)]
pub struct Constructor<'a> {
    algebra: &'a str,
    operation: &'a str,
    signature: &'a Signature,
}

impl Constructor<'_> {
    /// Build the operation. Fails unless exactly `arity` values are supplied.
    pub fn call<I>(&self, args: I) -> Result<AlgebraOp>
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = args.into_iter().collect();
        if values.len() != self.signature.arity() {
            return Err(EngineError::Arity {
                algebra: self.algebra.to_string(),
                operation: self.operation.to_string(),
                expected: self.signature.arity(),
                received: values.len(),
            });
        }

        let arguments =
            Arguments::from_pairs(self.signature.params().iter().cloned().zip(values));
        Ok(AlgebraOp::new(self.algebra, self.operation, arguments))
    }

    /// The operation's signature
    pub fn signature(&self) -> &Signature {
        self.signature
    }
}

impl fmt::Display for Constructor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.algebra,
            self.operation,
            self.signature.params().join(", ")
        )
    }
}

/// An algebra expressed as a closed Rust enum.
///
/// Implementors derive serde with `#[serde(tag = "operation", content = "arguments")]`
/// and use struct variants (`Variant {}` for operations without parameters); field
/// order is parameter order. `OPERATIONS` must list every variant with its fields.
pub trait TypedAlgebra: Serialize + DeserializeOwned + Send + 'static {
    /// Algebra namespace
    const NAME: &'static str;

    /// `(operation, parameters)` for every variant
    const OPERATIONS: &'static [(&'static str, &'static [&'static str])];

    /// The equivalent dynamic algebra
    fn algebra() -> Algebra {
        Algebra::new(
            Self::NAME,
            Self::OPERATIONS
                .iter()
                .map(|(name, params)| (*name, Signature::new(params.iter().copied()))),
        )
    }

    /// Lower this value into an operation
    fn into_operation(self) -> Result<AlgebraOp> {
        let tagged = serde_json::to_value(&self).map_err(|err| {
            EngineError::InvalidStep(format!("{} operation failed to encode: {}", Self::NAME, err))
        })?;
        let mut fields = match tagged {
            Value::Object(fields) => fields,
            other => return Err(malformed::<Self>(&other)),
        };

        let operation = match fields.remove("operation") {
            Some(Value::String(name)) => name,
            _ => return Err(malformed::<Self>(&Value::Object(fields))),
        };
        let arguments = match fields.remove("arguments") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(other) => return Err(malformed::<Self>(&other)),
        };

        let declared = Self::OPERATIONS
            .iter()
            .find(|(name, _)| *name == operation)
            .ok_or_else(|| EngineError::UnknownOperation {
                algebra: Self::NAME.to_string(),
                operation: operation.clone(),
            })?;
        if declared.1.len() != arguments.len() {
            return Err(EngineError::Arity {
                algebra: Self::NAME.to_string(),
                operation,
                expected: declared.1.len(),
                received: arguments.len(),
            });
        }

        Ok(AlgebraOp::new(
            Self::NAME,
            operation,
            Arguments::from_map(arguments),
        ))
    }

    /// Recover the typed value from an operation of this algebra
    fn from_operation(op: &AlgebraOp) -> Result<Self> {
        if op.algebra() != Self::NAME {
            return Err(EngineError::AlgebraMismatch {
                interpreter: Self::NAME.to_string(),
                algebra: op.algebra().to_string(),
                rendered: op.to_string(),
            });
        }
        if !Self::OPERATIONS
            .iter()
            .any(|(name, _)| *name == op.operation())
        {
            return Err(EngineError::UnknownOperation {
                algebra: Self::NAME.to_string(),
                operation: op.operation().to_string(),
            });
        }

        let tagged = serde_json::json!({
            "operation": op.operation(),
            "arguments": op.arguments().to_value(),
        });
        serde_json::from_value(tagged).map_err(|err| EngineError::InvalidArgument {
            algebra: Self::NAME.to_string(),
            operation: op.operation().to_string(),
            name: "arguments".to_string(),
            detail: err.to_string(),
            rendered: render(&op.arguments().to_value()),
        })
    }
}

fn malformed<A: TypedAlgebra>(value: &Value) -> EngineError {
    EngineError::InvalidStep(format!(
        "{} operation must encode as {{operation, arguments}}, got {}",
        A::NAME,
        render(value)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn example() -> Algebra {
        Algebra::builder("example")
            .operation("plainOperation", ["arg1", "arg2", "arg3"])
            .operation("arglessOperation", Vec::<String>::new())
            .operation_returning("arglessGet", Vec::<String>::new(), "number")
            .operation_returning("operationReturningValue", ["firstArg"], "string")
            .build()
    }

    #[test]
    fn exposes_a_constructor_per_operation() {
        let algebra = example();
        let names: Vec<_> = algebra.operation_names().collect();
        assert_eq!(
            names,
            vec![
                "plainOperation",
                "arglessOperation",
                "arglessGet",
                "operationReturningValue"
            ]
        );
        assert_eq!(
            algebra.signature("arglessGet").and_then(Signature::return_label),
            Some("number")
        );
    }

    #[test]
    fn builds_operation_descriptors() {
        let algebra = example();
        let op = algebra
            .call("plainOperation", [json!(1), json!({"foo": "bar"}), json!("a")])
            .unwrap();
        assert_eq!(op.algebra(), "example");
        assert_eq!(op.operation(), "plainOperation");
        assert_eq!(
            op.arguments().to_value(),
            json!({"arg1": 1, "arg2": {"foo": "bar"}, "arg3": "a"})
        );

        let argless = algebra.call("arglessGet", []).unwrap();
        assert!(argless.arguments().is_empty());
    }

    #[test]
    fn returns_marker_does_not_count_toward_arity() {
        let algebra = example();
        match algebra.call("operationReturningValue", [json!(1), json!(2)]) {
            Err(EngineError::Arity {
                expected, received, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(received, 2);
            }
            other => panic!("expected arity error, got {:?}", other),
        }
        assert!(algebra.call("arglessGet", [Value::Null]).is_err());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert!(matches!(
            example().constructor("nope"),
            Err(EngineError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn constructor_display_lists_parameters() {
        let algebra = example();
        let ctor = algebra.constructor("plainOperation").unwrap();
        assert_eq!(ctor.to_string(), "example.plainOperation(arg1, arg2, arg3)");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "operation", content = "arguments", rename_all = "camelCase")]
    enum Files {
        #[serde(rename_all = "camelCase")]
        SaveFile { path: String, bytes: String },
        ListAll {},
    }

    impl TypedAlgebra for Files {
        const NAME: &'static str = "cloudFiles";
        const OPERATIONS: &'static [(&'static str, &'static [&'static str])] =
            &[("saveFile", &["path", "bytes"]), ("listAll", &[])];
    }

    #[test]
    fn typed_algebra_lowers_and_recovers() {
        let op = Files::SaveFile {
            path: "a/b".into(),
            bytes: "xyz".into(),
        }
        .into_operation()
        .unwrap();
        assert_eq!(op.algebra(), "cloudFiles");
        assert_eq!(op.operation(), "saveFile");
        let names: Vec<_> = op.arguments().names().collect();
        assert_eq!(names, vec!["path", "bytes"]);

        let back = Files::from_operation(&op).unwrap();
        assert_eq!(
            back,
            Files::SaveFile {
                path: "a/b".into(),
                bytes: "xyz".into()
            }
        );

        let empty = Files::ListAll {}.into_operation().unwrap();
        assert!(empty.arguments().is_empty());
        assert_eq!(Files::from_operation(&empty).unwrap(), Files::ListAll {});
    }

    #[test]
    fn typed_algebra_matches_dynamic_algebra() {
        let dynamic = Files::algebra();
        let built = dynamic
            .call("saveFile", [json!("a/b"), json!("xyz")])
            .unwrap();
        assert!(Files::from_operation(&built).is_ok());
        assert!(matches!(
            Files::from_operation(&example().call("arglessGet", []).unwrap()),
            Err(EngineError::AlgebraMismatch { .. })
        ));
    }
}
