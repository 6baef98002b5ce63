//! Pending operation results.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

enum RequestState<T> {
    Pending(JoinHandle<CoreResult<T>>),
    Failed(Option<CoreError>),
}

/// The result of an operation, available once it settles.
///
/// Operations start as soon as they are issued: the work is spawned on the
/// current Tokio runtime and runs whether or not the request is awaited.
/// Dropping a request detaches it; the operation still runs and the
/// enclosing transaction still waits for it.
///
/// A request settles exactly once.
#[must_use = "the operation runs regardless, but its result is only observed by awaiting"]
pub struct Request<T> {
    state: RequestState<T>,
}

impl<T: Send + 'static> Request<T> {
    /// Spawns the operation on the current runtime.
    pub(crate) fn spawn<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => Self {
                state: RequestState::Pending(handle.spawn(fut)),
            },
            Err(_) => Self::failed(CoreError::NoRuntime),
        }
    }
}

impl<T> Request<T> {
    /// A request that settles with `err`.
    pub(crate) fn failed(err: CoreError) -> Self {
        Self {
            state: RequestState::Failed(Some(err)),
        }
    }

    /// Returns true if the operation has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            RequestState::Pending(handle) => handle.is_finished(),
            RequestState::Failed(_) => true,
        }
    }
}

impl<T> Future for Request<T> {
    type Output = CoreResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RequestState::Pending(handle) => Pin::new(handle).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| Err(CoreError::task_failed(err.to_string())))
            }),
            RequestState::Failed(err) => Poll::Ready(Err(err
                .take()
                .unwrap_or_else(|| CoreError::task_failed("request polled after it settled")))),
        }
    }
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            RequestState::Pending(_) if self.is_finished() => "finished",
            RequestState::Pending(_) => "pending",
            RequestState::Failed(_) => "failed",
        };
        f.debug_struct("Request").field("state", &state).finish()
    }
}
