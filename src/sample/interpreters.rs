//! Interpreters of the sample application
//!
//! Handlers stay pure: anything with an effect is returned as an `io` step and run
//! by the executor.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use super::algebras::{self, CloudFiles};
use super::stubs::{HttpStubs, TracingStub};
use crate::engine::{
    Args, Fanout, Interpret, Interpretation, Interpreter, Result, Rewrite, TypedAlgebra,
    TypedInterpreter, Value, io, returning,
};

/// Authorization checks against the token object `{isValid, userId}`
pub fn authorization() -> Interpreter {
    Interpreter::builder("authorization")
        .handle("isValidToken", |args, _| {
            let token = args.require("token")?;
            Ok(Interpretation::value(
                token.get("isValid").and_then(Value::as_bool) == Some(true),
            ))
        })
        .handle("isAuthed", |args, _| {
            let user_id = args.require("userId")?;
            let token = args.require("token")?;
            Ok(Interpretation::value(token.get("userId") == Some(user_id)))
        })
        .build()
}

/// Each error discards the rest of its composite and returns a response instead
pub fn errors() -> Interpreter {
    Interpreter::builder("errors")
        .handle("authorization", |args, rewrite| {
            let message = format!(
                "User {} does not have access to resource {}",
                text(args.require("identity")?),
                text(args.require("requestedResource")?)
            );
            rewrite.replace_remainder([returning(json!({"status": 401, "body": message}))]);
            Ok(())
        })
        .handle("internalServer", |args, rewrite| {
            let source = args.require("sourceError")?.clone();
            rewrite.replace_remainder([returning(json!({"status": 500, "body": source}))]);
            Ok(())
        })
        .build()
}

/// User records are rows of the `users` table
pub fn user_records() -> Interpreter {
    let database = algebras::database();
    Interpreter::builder("userRecords")
        .handle("updateField", move |args, _| {
            let field: String = args.parse("fieldName")?;
            let mut patch = serde_json::Map::new();
            patch.insert(field, args.require("fieldValue")?.clone());
            Ok(database.call(
                "upsert",
                [
                    json!("users"),
                    args.require("entityId")?.clone(),
                    Value::Object(patch),
                ],
            )?)
        })
        .build()
}

/// Database operations run against `db`
pub fn database(db: MemoryDatabase) -> Interpreter {
    Interpreter::builder("coconutDb/dbOperations")
        .handle("upsert", move |args, _| {
            let table: String = args.parse("table")?;
            let id = text(args.require("id")?);
            let patch = args.require("patch")?.clone();
            let db = db.clone();
            Ok(io(move |done| {
                let status = db.upsert(&table, &id, &patch);
                if let Err(err) = done.complete(status) {
                    tracing::warn!(error = %err, "upsert completion rejected");
                }
            }))
        })
        .build()
}

/// Log messages go to `logger` as `[level, message]`
pub fn logging(logger: TracingStub) -> Interpreter {
    let leveled = |level: &'static str, logger: TracingStub| {
        move |args: Args<'_>, _: &mut Rewrite| -> anyhow::Result<Interpretation> {
            let message = args.require("message")?.clone();
            Ok(logger.io(vec![json!(level), message]).into())
        }
    };
    Interpreter::builder("log")
        .handle("log", leveled("log", logger.clone()))
        .handle("warn", leveled("warn", logger.clone()))
        .handle("error", leveled("error", logger))
        .build()
}

/// Responses are handed to `responder`; the io resolves to the descriptor sent.
pub fn api_responses(responder: TracingStub) -> Interpreter {
    Interpreter::builder("someRestFramework/respond")
        .handle("respond", move |args, _| {
            let descriptor = args.require("responseDescriptor")?.clone();
            let responder = responder.clone();
            Ok(io(move |done| {
                responder.record(vec![descriptor.clone()]);
                if let Err(err) = done.complete(descriptor) {
                    tracing::warn!(error = %err, "respond completion rejected");
                }
            }))
        })
        .build()
}

/// Cloud files as requests to the storage service
pub fn cloud_files_to_http() -> TypedInterpreter<CloudFiles> {
    let http = algebras::http();
    TypedInterpreter::<CloudFiles>::new(move |op, _| match op {
        CloudFiles::SaveFile { path, bytes } => {
            Ok(http.call("post", [json!(service_url(&path.name)), json!(bytes)])?)
        }
        CloudFiles::ListFiles { path } => Ok(http.call("get", [json!(service_url(&path.name))])?),
    })
}

/// Cloud files as log lines
pub fn cloud_files_to_log() -> TypedInterpreter<CloudFiles> {
    let log = algebras::logging();
    TypedInterpreter::<CloudFiles>::new(move |op, _| {
        let message = match op {
            CloudFiles::SaveFile { path, .. } => format!("Saving a file to {}", path),
            CloudFiles::ListFiles { path } => format!("Listing files at {}", path),
        };
        Ok(log.call("log", [json!(message)])?)
    })
}

/// Cloud files logged, then sent; resolves to the HTTP result.
pub fn cloud_files_to_log_and_http() -> Result<Fanout> {
    let branches: Vec<Arc<dyn Interpret>> = vec![
        Arc::new(cloud_files_to_log()),
        Arc::new(cloud_files_to_http()),
    ];
    Fanout::new(CloudFiles::NAME, branches)
}

/// HTTP verbs performed through `stubs`
pub fn http_to_io(stubs: HttpStubs) -> Interpreter {
    let HttpStubs {
        get,
        put,
        post,
        delete,
    } = stubs;
    Interpreter::builder("http")
        .handle("get", move |args, _| {
            Ok(get.io(vec![args.require("path")?.clone()]))
        })
        .handle("put", move |args, _| {
            Ok(put.io(vec![
                args.require("path")?.clone(),
                args.require("bytes")?.clone(),
            ]))
        })
        .handle("post", move |args, _| {
            Ok(post.io(vec![
                args.require("path")?.clone(),
                args.require("bytes")?.clone(),
            ]))
        })
        .handle("delete", move |args, _| {
            Ok(delete.io(vec![args.require("path")?.clone()]))
        })
        .build()
}

fn service_url(name: &str) -> String {
    format!("cloudFiles.fooService.com/{}", name)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type Table = HashMap<String, serde_json::Map<String, Value>>;

/// In-memory stand-in for the `coconutDb` back end.
///
/// An upsert resolves to `{}` on success and `{"error": message}` when the database
/// was built with [`failing`](Self::failing).
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    failure: Option<Arc<str>>,
}

impl MemoryDatabase {
    /// An empty, healthy database
    pub fn new() -> Self {
        Self::default()
    }

    /// A database whose writes all fail with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(Arc::from(message)),
            ..Self::default()
        }
    }

    /// Merge `patch` into the row `id` of `table`, creating it if needed
    pub fn upsert(&self, table: &str, id: &str, patch: &Value) -> Value {
        if let Some(message) = &self.failure {
            tracing::warn!(table, id, error = %message, "upsert failed");
            return json!({ "error": message.to_string() });
        }
        let Some(fields) = patch.as_object() else {
            return json!({ "error": format!("patch for {}/{} is not an object", table, id) });
        };

        tracing::info!(table, id, patch = %patch, "UPSERT");
        let mut tables = self.tables.lock();
        let row = tables
            .entry(table.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (field, value) in fields {
            row.insert(field.clone(), value.clone());
        }
        json!({})
    }

    /// Current contents of a row
    pub fn row(&self, table: &str, id: &str) -> Option<Value> {
        self.tables
            .lock()
            .get(table)
            .and_then(|rows| rows.get(id))
            .map(|row| Value::Object(row.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Operation, Step};

    #[test]
    fn authorization_checks_the_token() {
        let interpreter = authorization();
        let token = json!({"isValid": true, "userId": "u1"});

        let valid = algebras::authorization()
            .call("isValidToken", [token.clone()])
            .unwrap();
        match interpreter.interpret_detached(&valid).unwrap() {
            Interpretation::Return(value) => assert_eq!(value, json!(true)),
            other => panic!("expected return, got {:?}", other),
        }

        let authed = algebras::authorization()
            .call("isAuthed", [json!("u2"), token])
            .unwrap();
        match interpreter.interpret_detached(&authed).unwrap() {
            Interpretation::Return(value) => assert_eq!(value, json!(false)),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn authorization_error_rewrites_to_401() {
        let op = algebras::errors()
            .call("authorization", [json!("u2"), json!("u1")])
            .unwrap();
        let mut rewrite = Rewrite::new();
        errors().interpret(&op, &mut rewrite).unwrap();

        let steps = rewrite.into_replacement().unwrap();
        match steps.as_slice() {
            [Step::Op(Operation::Returning(value))] => assert_eq!(
                value,
                &json!({"status": 401, "body": "User u2 does not have access to resource u1"})
            ),
            other => panic!("expected a single returning step, got {:?}", other),
        }
    }

    #[test]
    fn update_field_compiles_to_an_upsert() {
        let op = algebras::user_records()
            .call(
                "updateField",
                [json!("u1"), json!("emailAddress"), json!("a@b.c")],
            )
            .unwrap();
        match user_records().interpret_detached(&op).unwrap() {
            Interpretation::Op(Operation::Algebra(upsert)) => assert_eq!(
                upsert.to_string(),
                r#"coconutDb/dbOperations.upsert({"table":"users","id":"u1","patch":{"emailAddress":"a@b.c"}})"#
            ),
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[test]
    fn memory_database_merges_patches() {
        let db = MemoryDatabase::new();
        assert_eq!(db.upsert("users", "u1", &json!({"a": 1})), json!({}));
        db.upsert("users", "u1", &json!({"b": 2}));
        assert_eq!(db.row("users", "u1"), Some(json!({"a": 1, "b": 2})));

        let broken = MemoryDatabase::failing("disk full");
        assert_eq!(
            broken.upsert("users", "u1", &json!({"a": 1})),
            json!({"error": "disk full"})
        );
        assert_eq!(broken.row("users", "u1"), None);
    }

    #[test]
    fn cloud_files_compile_to_http_requests() {
        let op = CloudFiles::SaveFile {
            path: algebras::FilePath::new("some/path", "someFile"),
            bytes: "file contents".into(),
        }
        .into_operation()
        .unwrap();
        match cloud_files_to_http().interpret(&op, &mut Rewrite::new()).unwrap() {
            Interpretation::Op(Operation::Algebra(post)) => assert_eq!(
                post.to_string(),
                r#"http.post({"path":"cloudFiles.fooService.com/someFile","bytes":"file contents"})"#
            ),
            other => panic!("expected http.post, got {:?}", other),
        }
    }
}
