//! Programs of the sample application, and the wiring that runs them
//!
//! Building a program performs nothing. The request handlers below assemble the
//! registry the application uses and hand the program to an executor.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::algebras::{self, CloudFiles, FilePath};
use super::interpreters::{self, MemoryDatabase};
use super::stubs::{HttpStubs, TracingStub};
use crate::engine::{
    Composite, EngineError, Executor, Operation, Outcome, Registry, Result, Step, TypedAlgebra,
    Value, composite, returning,
};

/// Bearer token as the authorization interpreter sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Whether the signature checked out
    pub is_valid: bool,
    /// User the token was issued to
    pub user_id: String,
}

/// Change a user's email address, answering with a response descriptor.
///
/// The composite keeps its bindings to itself; callers only see the response it
/// escapes with: `{status: 200}` on success, 401 when the token does not authorize
/// the change, 500 when the write fails.
pub fn change_email(user_id: &str, token: &Token, email_address: &str) -> Result<Operation> {
    let token_value = serde_json::to_value(token)
        .map_err(|err| EngineError::InvalidStep(format!("token failed to encode: {}", err)))?;
    let authorization = algebras::authorization();
    let user_records = algebras::user_records();

    let identity = token.user_id.clone();
    let resource = user_id.to_string();

    Ok(composite([
        Step::bind(
            "isValidToken",
            authorization.call("isValidToken", [token_value.clone()])?,
        ),
        Step::bind(
            "isAuthed",
            authorization.call("isAuthed", [json!(user_id), token_value])?,
        ),
        Step::deferred(move |env| {
            let permitted = env["isValidToken"].as_bool() == Some(true)
                && env["isAuthed"].as_bool() == Some(true);
            if permitted {
                return Ok(nothing());
            }
            Ok(algebras::errors()
                .call("authorization", [json!(identity), json!(resource)])?
                .into())
        }),
        Step::bind(
            "writeStatus",
            user_records.call(
                "updateField",
                [json!(user_id), json!("emailAddress"), json!(email_address)],
            )?,
        ),
        Step::deferred(|env| match env["writeStatus"].get("error") {
            Some(error) if !error.is_null() => Ok(algebras::errors()
                .call("internalServer", [error.clone()])?
                .into()),
            _ => Ok(returning(json!({"status": 200})).into()),
        }),
    ]))
}

fn nothing() -> Step {
    composite(Vec::<Step>::new()).into()
}

/// An incoming change-email request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    /// User whose address changes
    pub user_id: String,
    /// Caller's token
    pub token: Token,
    /// New address
    pub email_address: String,
}

/// Interpreters the application runs its request programs with
pub fn app_registry(db: MemoryDatabase, responder: TracingStub) -> Result<Registry> {
    Registry::new()
        .with(interpreters::authorization())?
        .with(interpreters::errors())?
        .with(interpreters::user_records())?
        .with(interpreters::database(db))?
        .with(interpreters::api_responses(responder))
}

/// Run the request's program, then send whatever it produced as the response
pub fn respond_to(request: &ChangeEmailRequest) -> Result<Composite> {
    let program = change_email(&request.user_id, &request.token, &request.email_address)?;
    Ok(Composite::new([
        Step::bind("result", program),
        Step::bind(
            "response",
            Step::deferred(|env| {
                Ok(algebras::api_responses()
                    .call("respond", [env["result"].clone()])?
                    .into())
            }),
        ),
    ]))
}

/// Serve one request; resolves to the response that was sent.
pub async fn serve(executor: &Executor, request: &ChangeEmailRequest) -> Result<Value> {
    let outcome = executor.execute(respond_to(request)?).await?;
    Ok(match outcome {
        Outcome::Environment(env) => env["response"].clone(),
        Outcome::Returned(value) => value,
    })
}

/// Save `contents` at `path`
pub fn save_file(path: FilePath, contents: &str) -> Result<Operation> {
    Ok(CloudFiles::SaveFile {
        path,
        bytes: contents.to_string(),
    }
    .into_operation()?
    .into())
}

/// Interpreters for file storage: log the save, then POST it
pub fn file_registry(logger: TracingStub, http: HttpStubs) -> Result<Registry> {
    Registry::new()
        .with(interpreters::cloud_files_to_log_and_http()?)?
        .with(interpreters::http_to_io(http))?
        .with(interpreters::logging(logger))
}

/// Run a save; resolves to the HTTP result, `null` on success.
pub async fn run_save_file(executor: &Executor, path: FilePath, contents: &str) -> Result<Value> {
    let program = Composite::new([Step::bind("saved", save_file(path, contents)?)]);
    let outcome = executor.execute(program).await?;
    Ok(outcome
        .environment()
        .map(|env| env["saved"].clone())
        .unwrap_or(Value::Null))
}
