//! Algebras of the sample application
//!
//! Only the operations the sample programs need are declared. Third-party style
//! algebras namespace themselves (`coconutDb/dbOperations`) to avoid collisions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Algebra, TypedAlgebra};

/// Token checks
pub fn authorization() -> Algebra {
    Algebra::builder("authorization")
        .operation_returning("isValidToken", ["token"], "boolean")
        .operation_returning("isAuthed", ["userId", "token"], "boolean")
        .build()
}

/// Domain-level failures, each ending the current composite with a response
pub fn errors() -> Algebra {
    Algebra::builder("errors")
        .operation("authorization", ["identity", "requestedResource"])
        .operation("internalServer", ["sourceError"])
        .build()
}

/// User record edits; compiles to database operations.
pub fn user_records() -> Algebra {
    Algebra::builder("userRecords")
        // resolves to an object carrying `error` when the write failed
        .operation_returning("updateField", ["entityId", "fieldName", "fieldValue"], "object")
        .build()
}

/// A database driver's operations
pub fn database() -> Algebra {
    Algebra::builder("coconutDb/dbOperations")
        .operation("upsert", ["table", "id", "patch"])
        .build()
}

/// Leveled log messages
pub fn logging() -> Algebra {
    Algebra::builder("log")
        .operation("log", ["message"])
        .operation("warn", ["message"])
        .operation("error", ["message"])
        .build()
}

/// Sending a response through a web framework
pub fn api_responses() -> Algebra {
    Algebra::builder("someRestFramework/respond")
        .operation("respond", ["responseDescriptor"])
        .build()
}

/// Plain HTTP verbs
pub fn http() -> Algebra {
    Algebra::builder("http")
        .operation("get", ["path"])
        .operation("put", ["path", "bytes"])
        .operation("post", ["path", "bytes"])
        .operation("delete", ["path"])
        .build()
}

/// Location of a stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePath {
    /// Directory holding the file
    pub parent_dir: String,
    /// File name within the directory
    pub name: String,
}

impl FilePath {
    /// Path from its directory and name
    pub fn new(parent_dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent_dir: parent_dir.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent_dir, self.name)
    }
}

/// Cloud file storage, as a closed enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "camelCase")]
pub enum CloudFiles {
    /// Store `bytes` at `path`
    SaveFile {
        /// Destination
        path: FilePath,
        /// File contents
        bytes: String,
    },
    /// List the files under `path`
    ListFiles {
        /// Directory to list
        path: FilePath,
    },
}

impl TypedAlgebra for CloudFiles {
    const NAME: &'static str = "cloudFiles";
    const OPERATIONS: &'static [(&'static str, &'static [&'static str])] =
        &[("saveFile", &["path", "bytes"]), ("listFiles", &["path"])];
}
