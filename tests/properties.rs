use std::sync::Arc;

use effector::engine::{
    Algebra, Composite, EngineError, Event, Execution, ExecutorConfig, Interpretation,
    Interpreter, Operation, Outcome, Registry, Result, Step,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{Value, json};

fn arbitrary_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

/// Drive an execution with no io steps to completion.
fn run_sync(registry: Registry, program: Composite) -> Result<Outcome> {
    let mut execution = Execution::new(registry, ExecutorConfig::default(), program);
    loop {
        match execution.step()? {
            Event::Progress => {}
            Event::Io(_) => panic!("program performed io"),
            Event::Finished(outcome) => return Ok(outcome),
        }
    }
}

proptest! {
    #[test]
    fn constructors_accept_exactly_the_declared_arity(
        declared in 0usize..6,
        supplied in prop::collection::vec(arbitrary_value(), 0..8),
    ) {
        let params: Vec<String> = (0..declared).map(|i| format!("p{}", i)).collect();
        let algebra = Algebra::builder("prop").operation("op", params.clone()).build();

        match algebra.call("op", supplied.clone()) {
            Ok(op) => {
                prop_assert_eq!(supplied.len(), declared);
                let names: Vec<&str> = op.arguments().names().collect();
                prop_assert_eq!(names, params.iter().map(String::as_str).collect::<Vec<_>>());
                let values: Vec<Value> = op.arguments().iter().map(|(_, v)| v.clone()).collect();
                prop_assert_eq!(values, supplied);
            }
            Err(EngineError::Arity { expected, received, .. }) => {
                prop_assert_ne!(supplied.len(), declared);
                prop_assert_eq!(expected, declared);
                prop_assert_eq!(received, supplied.len());
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn handlers_fire_in_program_order_depth_first(
        expansions in prop::collection::vec(0usize..4, 1..12),
    ) {
        let outer = Algebra::builder("outer").operation("run", ["index"]).build();
        let inner = Algebra::builder("inner").operation("part", ["index", "part"]).build();

        let trace: Arc<Mutex<Vec<String>>> = Arc::default();
        let (outer_trace, inner_trace) = (trace.clone(), trace.clone());
        let widths = expansions.clone();
        let expander = inner.clone();

        let outer_interpreter = Interpreter::builder("outer")
            .handle("run", move |args, _| {
                let index: usize = args.parse("index")?;
                outer_trace.lock().push(format!("run{}", index));
                let parts: Vec<Operation> = (0..widths[index])
                    .map(|part| expander.call("part", [json!(index), json!(part)]).map(Operation::from))
                    .collect::<Result<_>>()?;
                Ok(parts)
            })
            .build();
        let inner_interpreter = Interpreter::builder("inner")
            .handle("part", move |args, _| {
                let index: usize = args.parse("index")?;
                let part: usize = args.parse("part")?;
                inner_trace.lock().push(format!("part{}.{}", index, part));
                Ok(Interpretation::Unit)
            })
            .build();

        let registry = Registry::new()
            .with(outer_interpreter).unwrap()
            .with(inner_interpreter).unwrap();
        let program: Composite = (0..expansions.len())
            .map(|i| outer.call("run", [json!(i)]).map(Step::from))
            .collect::<Result<Composite>>()
            .unwrap();

        run_sync(registry, program).unwrap();

        let mut expected = Vec::new();
        for (index, width) in expansions.iter().enumerate() {
            expected.push(format!("run{}", index));
            for part in 0..*width {
                expected.push(format!("part{}.{}", index, part));
            }
        }
        prop_assert_eq!(trace.lock().clone(), expected);
    }
}
