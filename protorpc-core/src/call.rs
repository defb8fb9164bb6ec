//! Per-call state machine.
//!
//! A call starts in [`CallState::Running`] and moves exactly once to a
//! terminal state. The write side is a [`CallCompleter`] handed to whoever
//! performs the exchange; everybody else holds a [`Call`], which can read
//! state, subscribe to the terminal transition, await it, or cancel.

use futures::future::BoxFuture;
use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::descriptor::MethodDescriptor;
use crate::ids::CallId;
use crate::{CallError, ErrorKind, Message, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Running,
    Ok,
    RequestError,
    ServerError,
    NetworkError,
    ApplicationError,
    Cancelled,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        self != CallState::Running
    }

    pub fn is_error(self) -> bool {
        self.error_kind().is_some()
    }

    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            CallState::Running | CallState::Ok => None,
            CallState::RequestError => Some(ErrorKind::Request),
            CallState::ServerError => Some(ErrorKind::Server),
            CallState::NetworkError => Some(ErrorKind::Network),
            CallState::ApplicationError => Some(ErrorKind::Application),
            CallState::Cancelled => Some(ErrorKind::Cancelled),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Running => "running",
            CallState::Ok => "ok",
            CallState::RequestError => "request_error",
            CallState::ServerError => "server_error",
            CallState::NetworkError => "network_error",
            CallState::ApplicationError => "application_error",
            CallState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of a call.
pub type CallResult = Result<Message, CallError>;

type Subscriber = Box<dyn FnOnce(&CallResult) + Send>;

struct CallInner {
    state: CallState,
    response: Option<Message>,
    error: Option<CallError>,
    subscribers: Vec<Subscriber>,
}

struct Shared {
    id: CallId,
    method: Arc<MethodDescriptor>,
    request: Message,
    inner: Mutex<CallInner>,
    state_tx: watch::Sender<CallState>,
    cancel: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CallInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outcome(&self) -> Option<CallResult> {
        let inner = self.lock();
        match inner.state {
            CallState::Running => None,
            CallState::Ok => inner.response.clone().map(Ok),
            _ => inner.error.clone().map(Err),
        }
    }

    /// Move from Running to the terminal state implied by `result`, then
    /// notify subscribers outside the lock.
    fn transition(&self, result: CallResult) -> Result<(), TransitionError> {
        let subscribers = {
            let mut inner = self.lock();
            if inner.state.is_terminal() {
                return Err(TransitionError::AlreadyTerminal(inner.state));
            }

            let state = match &result {
                Ok(response) => {
                    inner.response = Some(response.clone());
                    CallState::Ok
                }
                Err(error) => {
                    inner.error = Some(error.clone());
                    error.kind.state()
                }
            };
            inner.state = state;
            self.state_tx.send_replace(state);
            std::mem::take(&mut inner.subscribers)
        };

        debug!(
            call_id = %self.id,
            method = self.method.name(),
            subscribers = subscribers.len(),
            "call finished: {}",
            match &result {
                Ok(_) => "ok".to_string(),
                Err(e) => e.to_string(),
            }
        );

        for subscriber in subscribers {
            subscriber(&result);
        }
        Ok(())
    }
}

/// Read handle for one in-flight RPC. Clones observe the same call.
#[derive(Clone)]
pub struct Call {
    shared: Arc<Shared>,
}

impl Call {
    /// Create a call in the Running state together with its single writer.
    pub fn new(id: CallId, method: Arc<MethodDescriptor>, request: Message) -> (Call, CallCompleter) {
        let (state_tx, _) = watch::channel(CallState::Running);
        let shared = Arc::new(Shared {
            id,
            method,
            request,
            inner: Mutex::new(CallInner {
                state: CallState::Running,
                response: None,
                error: None,
                subscribers: Vec::new(),
            }),
            state_tx,
            cancel: CancellationToken::new(),
        });

        let completer = CallCompleter {
            shared: Arc::clone(&shared),
            completed: false,
        };
        (Call { shared }, completer)
    }

    pub fn id(&self) -> CallId {
        self.shared.id
    }

    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.shared.method
    }

    pub fn request(&self) -> &Message {
        &self.shared.request
    }

    pub fn state(&self) -> CallState {
        self.shared.lock().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// The decoded response; present only in the Ok state.
    pub fn response(&self) -> Option<Message> {
        self.shared.lock().response.clone()
    }

    /// The recorded error; present only in error states.
    pub fn error(&self) -> Option<CallError> {
        self.shared.lock().error.clone()
    }

    /// The terminal outcome, or `None` while still running.
    pub fn outcome(&self) -> Option<CallResult> {
        self.shared.outcome()
    }

    /// Register a callback for the terminal transition.
    ///
    /// Fires exactly once. If the call already finished, fires immediately on
    /// the current thread.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: FnOnce(&CallResult) + Send + 'static,
    {
        let finished = {
            let mut inner = self.shared.lock();
            match inner.state {
                CallState::Running => {
                    inner.subscribers.push(Box::new(subscriber));
                    return;
                }
                CallState::Ok => inner.response.clone().map(Ok),
                _ => inner.error.clone().map(Err),
            }
        };

        if let Some(result) = finished {
            subscriber(&result);
        }
    }

    /// Abort the call if it is still running.
    ///
    /// Returns `false` if the call had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        match self.shared.transition(Err(CallError::cancelled())) {
            Ok(()) => {
                self.shared.cancel.cancel();
                true
            }
            Err(_) => false,
        }
    }

    /// Wait for the terminal transition.
    pub async fn wait(&self) -> CallResult {
        let mut rx = self.shared.state_tx.subscribe();
        // The sender lives in `shared`, which `self` keeps alive.
        let _ = rx.wait_for(|state| state.is_terminal()).await;
        self.outcome()
            .unwrap_or_else(|| Err(CallError::network("call state channel closed")))
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.shared.id)
            .field("method", &self.shared.method.name())
            .field("state", &self.state())
            .finish()
    }
}

impl IntoFuture for Call {
    type Output = CallResult;
    type IntoFuture = BoxFuture<'static, CallResult>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

/// Write half of a call. Consumed by the single terminal transition.
///
/// Dropping it without completing resolves the call as a network error so
/// that no caller waits forever.
pub struct CallCompleter {
    shared: Arc<Shared>,
    completed: bool,
}

impl CallCompleter {
    pub fn id(&self) -> CallId {
        self.shared.id
    }

    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.shared.method
    }

    /// Token cancelled when the caller cancels the call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn succeed(self, response: Message) -> Result<(), TransitionError> {
        self.complete(Ok(response))
    }

    pub fn fail(self, error: CallError) -> Result<(), TransitionError> {
        self.complete(Err(error))
    }

    pub fn complete(mut self, result: CallResult) -> Result<(), TransitionError> {
        self.completed = true;
        self.shared.transition(result)
    }
}

impl Drop for CallCompleter {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self
            .shared
            .transition(Err(CallError::network("call abandoned by transport")))
            .is_ok()
        {
            warn!(call_id = %self.shared.id, "completer dropped while call was running");
        }
    }
}

impl fmt::Debug for CallCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCompleter")
            .field("id", &self.shared.id)
            .field("completed", &self.completed)
            .finish()
    }
}
