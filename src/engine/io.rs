//! Single-shot side effects
//!
//! `io` is the only primitive the executor performs itself. Everything an interpreter
//! produces eventually bottoms out here.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::error::{EngineError, Result};
use super::value::Value;

type CallbackFn = Box<dyn FnOnce(IoCallback) + Send>;

enum IoKind {
    Callback(CallbackFn),
    Future(BoxFuture<'static, Value>),
}

/// A deferred side effect. Nothing runs until the executor reaches the step.
pub struct Io {
    kind: IoKind,
}

impl Io {
    /// Wrap a callback-style function. It must call [`IoCallback::complete`] exactly once.
    pub fn from_callback<F>(f: F) -> Self
    where
        F: FnOnce(IoCallback) + Send + 'static,
    {
        Self {
            kind: IoKind::Callback(Box::new(f)),
        }
    }

    /// Wrap a future; its output is the io result.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Value> + Send + 'static,
    {
        Self {
            kind: IoKind::Future(future.boxed()),
        }
    }

    /// Start the effect and wait for its single result
    pub(crate) fn start(self) -> BoxFuture<'static, Result<Value>> {
        match self.kind {
            IoKind::Future(future) => future.map(Ok).boxed(),
            IoKind::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                f(IoCallback {
                    sender: Arc::new(Mutex::new(Some(tx))),
                });
                async move {
                    rx.await.map_err(|_| {
                        EngineError::HandlerContract(
                            "io completion callback was dropped without being invoked".into(),
                        )
                    })
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for Io {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IoKind::Callback(_) => "callback",
            IoKind::Future(_) => "future",
        };
        f.debug_struct("Io").field("kind", &kind).finish()
    }
}

/// Completion handle handed to a callback-style io function.
///
/// Clones share one slot, so racing completions (an effect against a timer, say) can
/// each hold a handle; only the first `complete` is delivered.
#[derive(Clone)]
pub struct IoCallback {
    sender: Arc<Mutex<Option<oneshot::Sender<Value>>>>,
}

impl IoCallback {
    /// Deliver the io result. A second call is a contract violation and is rejected.
    pub fn complete(&self, value: Value) -> Result<()> {
        let Some(sender) = self.sender.lock().take() else {
            tracing::warn!("io completion invoked more than once");
            return Err(EngineError::HandlerContract(
                "io completion callback invoked more than once".into(),
            ));
        };
        if sender.send(value).is_err() {
            tracing::debug!("io result delivered after its execution was dropped");
        }
        Ok(())
    }

    /// Whether the result has already been delivered
    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl fmt::Debug for IoCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoCallback")
            .field("completed", &self.is_completed())
            .finish()
    }
}
