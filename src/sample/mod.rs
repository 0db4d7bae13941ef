//! A small application written against the engine
//!
//! A change-email request handler and a cloud-file save, with their algebras,
//! interpreters and recording stubs. Nothing here reaches into engine internals.

pub mod algebras;
pub mod interpreters;
pub mod programs;
pub mod stubs;

pub use interpreters::MemoryDatabase;
pub use programs::{ChangeEmailRequest, Token};
pub use stubs::{HttpStubs, TracingStub};
